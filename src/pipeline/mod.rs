// Background audio-processing pipeline
//
// One job runs chunk -> transcribe -> summarize -> parse -> persist on a
// worker pool, decoupled from the HTTP request that accepted the upload:
// - Job: the work tuple, status values and the observable tracker
// - Lease: per-record mutual exclusion while a job is in flight
// - Runner: bounded queue, workers, cancellation, blanket error capture
// - Merge: locally enforced additive updates of the clinical fields
// - Sink: success/failure writes into patient and record rows

pub mod job;
pub mod lease;
pub mod merge;
pub mod runner;
pub mod sink;

pub use job::*;
pub use lease::*;
pub use merge::*;
pub use runner::*;
pub use sink::*;
