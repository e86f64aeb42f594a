//! Suncast Pipeline
//!
//! Sequences one run from the archive index to the finished animation:
//!
//! ```text
//! Init → Locate → FetchAll → TransformAll → WriteScratch → Encode → Optimize → Done
//!   └──────────────────────────── Cleanup (always) ───────────────────────────┘
//! ```
//!
//! Each run owns a private scratch directory that is removed when the run
//! ends, whether it succeeded or not. Only the durable frame cache and the
//! final artifact outlive it.

pub mod run;

pub use run::*;
