//! Compliance readiness scoring.

mod scorer;

pub use scorer::{ReadinessReport, ReadinessScorer, ReadinessSignal, SignalResult};
