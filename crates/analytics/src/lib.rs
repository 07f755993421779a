// In crates/analytics/src/lib.rs

pub mod engine;
pub mod types;

pub use engine::{AnalyticsEngine, compute_metrics, risk_report};
pub use types::{Metrics, RiskReport};
