//! News-to-representative scoring pipeline.
//!
//! Scores article importance, selects the newsworthy share of a batch,
//! collapses coverage of one event to a canonical article, finds politicians
//! substantially mentioned, judges each mention's impact, and folds the
//! judgments into per-politician ratings and ideology profiles.

pub mod analyzer;
pub mod backend;
pub mod bootstrap;
pub mod dedup;
pub mod error;
pub mod ideology;
pub mod importance;
pub mod judgment;
pub mod mentions;
pub mod pg_store;
pub mod pipeline;
pub mod rating;
pub mod store;
pub mod types;

mod prompts;

pub use analyzer::{merge_panel, ImpactAnalyzer, PanelAnalyzer, SinglePassAnalyzer};
pub use backend::CompletionBackend;
pub use bootstrap::build_pipeline;
pub use dedup::{cluster, content_fingerprint, DedupCandidate, DedupOutcome, EventCluster};
pub use error::ScoringError;
pub use ideology::{apply_adjustments, IdeologyParams, IdeologyProfile, IdeologyUpdate};
pub use importance::{select_by_importance, ImportanceScorer, LlmImportanceScorer};
pub use judgment::{AnalysisContext, ImpactJudgment, Sentiment};
pub use mentions::{MentionExtractor, RosterExtractor};
pub use pg_store::PgStore;
pub use pipeline::{Pipeline, PipelineSettings};
pub use rating::{update_rating, PoliticianRating, RatingParams, RatingUpdate};
pub use store::{PipelineStore, PoliticianState, RunOutcome};
pub use types::{
    Article, ImportanceAssessment, PoliticianMention, ProcessingOptions, ProcessingStats,
    ProcessingStatus, RosterEntry,
};
