//! Flag escalation
//!
//! Combines flags from every registered producer into one prioritized,
//! append-only review queue.

mod aggregator;
mod rules;

pub use aggregator::EscalationAggregator;
pub use rules::{assign_priority, default_keywords, DEFAULT_VIOLENCE_KEYWORDS, EXTREME_POLARITY};
