use std::cmp::Reverse;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{EnrichedCase, Urgency};
use crate::views::{active, percent};

pub const CHANNEL_TOP: usize = 4;
pub const CATEGORY_TOP: usize = 5;
pub const OTHER: &str = "Other";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MixRow {
    pub label: String,
    pub count: usize,
    pub pct: u32,
}

/// Frequency table over `labels`, most common first (alphabetical on ties),
/// with everything past `top` folded into an "Other" row.
pub fn breakdown<'a>(labels: impl IntoIterator<Item = &'a str>, top: usize) -> Vec<MixRow> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut total = 0;
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
        total += 1;
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by_key(|(_, count)| Reverse(*count));

    let remainder: usize = ranked.iter().skip(top).map(|(_, count)| count).sum();
    let mut rows: Vec<MixRow> = ranked
        .into_iter()
        .take(top)
        .map(|(label, count)| MixRow {
            label: label.to_string(),
            count,
            pct: percent(count, total),
        })
        .collect();
    if remainder > 0 {
        rows.push(MixRow {
            label: OTHER.to_string(),
            count: remainder,
            pct: percent(remainder, total),
        });
    }
    rows
}

pub fn channel_mix(cases: &[EnrichedCase]) -> Vec<MixRow> {
    breakdown(active(cases).map(|item| item.record.channel.as_str()), CHANNEL_TOP)
}

pub fn category_mix(cases: &[EnrichedCase]) -> Vec<MixRow> {
    breakdown(active(cases).map(|item| item.record.category.as_str()), CATEGORY_TOP)
}

/// Known urgency levels in severity order; levels with no active cases are left out.
pub fn urgency_mix(cases: &[EnrichedCase]) -> Vec<MixRow> {
    let total = active(cases).count();
    Urgency::LEVELS
        .iter()
        .filter_map(|level| {
            let count = active(cases)
                .filter(|item| &item.record.urgency == level)
                .count();
            (count > 0).then(|| MixRow {
                label: level.to_string(),
                count,
                pct: percent(count, total),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;
    use crate::priority::enrich;
    use crate::priority::tests::{sample_case, today};

    #[test]
    fn breakdown_rolls_tail_into_other() {
        let labels = ["Email", "Phone", "Email", "Slack", "Form", "Text", "Email"];
        let rows = breakdown(labels, 3);
        let summary: Vec<_> = rows
            .iter()
            .map(|row| (row.label.as_str(), row.count, row.pct))
            .collect();
        assert_eq!(
            summary,
            [("Email", 3, 43), ("Form", 1, 14), ("Phone", 1, 14), ("Other", 2, 29)]
        );
    }

    #[test]
    fn breakdown_of_nothing_is_empty() {
        assert!(breakdown(std::iter::empty(), 4).is_empty());
    }

    #[test]
    fn channel_mix_uses_unspecified_label() {
        let mut blank = sample_case(Urgency::Low, Status::Open);
        blank.channel = String::new();
        let email = sample_case(Urgency::Low, Status::Open);
        let cases = enrich(&[blank, email], today());
        let rows = channel_mix(&cases);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|row| row.label == "Unspecified" && row.pct == 50));
    }

    #[test]
    fn urgency_mix_keeps_severity_order_and_skips_absent() {
        let cases = enrich(
            &[
                sample_case(Urgency::Low, Status::Open),
                sample_case(Urgency::Critical, Status::Open),
                sample_case(Urgency::Low, Status::Pending),
                sample_case(Urgency::High, Status::Resolved),
                sample_case(Urgency::Unrecognized("Severe".into()), Status::Open),
            ],
            today(),
        );
        let rows = urgency_mix(&cases);
        let summary: Vec<_> = rows
            .iter()
            .map(|row| (row.label.as_str(), row.count, row.pct))
            .collect();
        assert_eq!(summary, [("Critical", 1, 25), ("Low", 2, 50)]);
    }
}
