use crate::domain::model::{RatingDistribution, RatingEntry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub rating_count: u64,
    pub avg: f64,
}

/// Reduces a star distribution to a count and an average.
///
/// A server-provided average is trusted as long as there is at least one
/// rating. With zero ratings the average is zero whatever the server says.
pub fn compute_summary(distribution: Option<&RatingDistribution>) -> RatingSummary {
    let Some(distribution) = distribution else {
        return RatingSummary::default();
    };

    let counts = distribution.counts();
    // Saturates rather than overflowing on absurd server counts.
    let rating_count = counts
        .iter()
        .fold(0u64, |total, count| total.saturating_add(*count));
    if rating_count == 0 {
        return RatingSummary::default();
    }

    let avg = match distribution.average {
        Some(average) => average,
        None => {
            let total: f64 = counts.iter().map(|count| *count as f64).sum();
            let weighted: f64 = counts
                .iter()
                .zip(1u32..)
                .map(|(count, stars)| *count as f64 * f64::from(stars))
                .sum();
            weighted / total
        }
    };

    RatingSummary { rating_count, avg }
}

/// Orders entries newest first. Entries created at the same instant keep
/// their relative order.
pub fn most_recent_first(mut entries: Vec<RatingEntry>) -> Vec<RatingEntry> {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    entries
}
