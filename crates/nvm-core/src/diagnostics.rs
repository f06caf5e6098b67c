//! Aggregated counters surfaced through `NvmController::get_diagnostics`.
//! Each subsystem keeps its own counters; this struct is just the read-only
//! snapshot assembled from them.

use crate::medium::MediumDiagnostics;
use crate::queue::QueueDiagnostics;
use crate::seqlock::SeqlockDiagnostics;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NvmDiagnostics {
    pub queue: QueueDiagnostics,
    pub medium: MediumDiagnostics,
    pub seqlock: SeqlockDiagnostics,
}
