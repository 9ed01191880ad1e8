//! chordroll - MIDI corpus to chord-label sequences
//!
//! This library provides:
//! - `corpus`: lexicographically ordered MIDI file discovery
//! - `workers`: bounded, order-preserving per-file worker pool with timeouts
//! - `driver`: extraction and re-index runs
//! - `store`: output directory layout and JSON persistence
//! - `tempo`: fixed-tempo corpus rewrite
//! - `survey`: scale, key and chord statistics
//! - `report`: per-run outcome report

pub mod corpus;
pub mod driver;
pub mod report;
pub mod store;
pub mod survey;
pub mod tempo;
pub mod workers;

pub use driver::{build_extractor, run_extract, run_reindex};
pub use report::{RunReport, SongOutcome};
pub use store::OutputStore;
pub use survey::Survey;
pub use tempo::{run_normalize_tempo, NormalizeSummary};
