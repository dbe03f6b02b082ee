//! gazecheck - Validate automated infant gaze coding against human coding
//!
//! gazecheck reconciles per-frame look/away classifications from a video annotator
//! with a human coder's per-trial looking times through a deterministic pipeline:
//! frame timing → annotation loading → trial assignment → duration aggregation →
//! comparison against the human reference.
//!
//! ## Modules
//!
//! - **Single subject**: [`reconcile_subject`] runs one paired set of files
//! - **Batch**: [`ReconcileProcessor`] runs every annotation file in a directory,
//!   isolating per-subject failures

pub mod aggregate;
pub mod annotation;
pub mod compare;
pub mod config;
pub mod error;
pub mod frame_time;
pub mod human;
pub mod logging;
pub mod pairing;
pub mod pipeline;
pub mod report;
mod tabular;
pub mod trials;
pub mod types;

pub use config::{PairingMode, ReconcileConfig};
pub use error::ReconcileError;
pub use frame_time::{FfprobeResolver, FrameTimeResolver, FrameTimes, StaticFrameTimes};
pub use pipeline::{reconcile_subject, ReconcileProcessor};
pub use report::{BatchReport, SubjectOutcome, SubjectReport};
pub use types::{ComparisonResult, FrameRecord, LookState, TrialInterval, TrialLookTotals};

/// Crate version embedded in every report
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "gazecheck";
