pub mod calendar;
pub mod content;
pub mod day;
pub mod profile;
pub mod recommend;

mod common;
