//! # Respite Core Library
//!
//! This library provides the core business logic for Respite, a daily
//! break recommender: it turns a user's calendar for one day into a
//! single suggested restorative-break slot. The CLI binary is a thin
//! layer over the same library.
//!
//! ## Architecture
//!
//! - **Engine**: a pure pipeline -- workday boundaries, gap finding,
//!   opportunity scoring, break-category matching -- orchestrated per
//!   user-day with a get-or-generate idempotency rule
//! - **Storage**: SQLite-based profiles, meetings, content library,
//!   and recommendation rows, plus TOML-based configuration
//!
//! ## Key Components
//!
//! - [`RecommendationEngine`]: composes the analysis pipeline
//! - [`MeetingClassifier`]: intensity scores and type tags per meeting
//! - [`GapFinder`]: candidate break slots from calendar gaps
//! - [`Database`]: store-collaborator implementation
//! - [`Config`]: application configuration management

pub mod calendar;
pub mod classify;
pub mod error;
pub mod gaps;
pub mod matcher;
pub mod recommend;
pub mod scoring;
pub mod storage;
pub mod workday;

pub use calendar::Meeting;
pub use classify::{KeywordTable, MeetingClassifier, MeetingContext, MeetingTag};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use gaps::{BreakOpportunity, GapFinder, GapKind};
pub use matcher::{BreakCategory, BreakMatcher, Challenge, ContentItem};
pub use recommend::{
    CalendarStore, ContentStore, DayAnalysis, EngineConfig, ProfileStore, Recommendation,
    RecommendationEngine, RecommendationStatus, RecommendationStore, UserProfile,
};
pub use scoring::{OpportunityScorer, ScoredOpportunity};
pub use storage::{Config, Database};
pub use workday::WorkdayWindow;
