//! Campaign ranking for ranking intents

use adpilot_tools::{Campaign, Metric};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Default list size
pub const DEFAULT_TOP_N: usize = 10;

/// Rank campaigns best-first by `metric` and keep the first `top_n`.
///
/// Duplicate ids keep their first occurrence. `worst_first` reverses the
/// order. Ties break by id so the result is stable across platforms.
#[must_use]
pub fn rank_campaigns(
    campaigns: Vec<Campaign>,
    metric: Metric,
    top_n: usize,
    worst_first: bool,
) -> Vec<Campaign> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Campaign> = campaigns
        .into_iter()
        .filter(|c| seen.insert(c.id.clone()))
        .collect();

    let descending = metric.lower_is_better() == worst_first;
    unique.sort_by(|a, b| {
        let (x, y) = (a.metric(metric), b.metric(metric));
        let ord = if descending {
            y.partial_cmp(&x)
        } else {
            x.partial_cmp(&y)
        };
        ord.unwrap_or(Ordering::Equal).then_with(|| a.id.cmp(&b.id))
    });
    unique.truncate(top_n);
    unique
}
