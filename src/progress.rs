//! Cumulative progress reporting shared by the pipeline, the sentence-aware
//! translator, and the proofreader. Per §4.2.4/§9 the callback MUST receive
//! cumulative `(current, total)` counts within a stage, never per-batch
//! deltas — enforced here by making the callback signature absolute.

use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgressStage {
    Extracting,
    Transcribing,
    Translating,
    Proofreading,
    Exporting,
}

pub type ProgressCallback = Arc<dyn Fn(ProgressStage, u64, u64) + Send + Sync>;
