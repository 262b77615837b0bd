//! Service layer for announcement extraction.
//!
//! This module contains domain logic separated from UI concerns.
//! Services can be used by the CLI or embedded by a dashboard backend.

pub mod aggregate;
pub mod date_detection;
pub mod extraction;
pub mod market_session;

pub use aggregate::aggregate;
pub use date_detection::{parse_events, parse_lines, DateGrammar, DateTimeCandidate};
pub use extraction::{
    ExtractionEvent, ExtractionPipeline, PipelineError, PipelineOptions, RunPhase, RunState,
};
pub use market_session::{classify, is_after_close};
