use std::fmt::Write;

use chrono::NaiveDate;

use crate::dashboard::DashboardSnapshot;
use crate::mix::{self, MixRow};
use crate::models::{EnrichedCase, UNASSIGNED};
use crate::trends::{self, OutlookKind};
use crate::views;
use crate::workload::{self, Coverage};

pub const BRIEF_TOP_CASES: usize = 3;
pub const BRIEF_TOP_OWNERS: usize = 3;
pub const BRIEF_COVERAGE: usize = 2;

pub fn format_delta(delta: i64, prefix: &str) -> String {
    match delta {
        0 => format!("{prefix} today"),
        days if days > 0 => format!("{prefix} in {days}d"),
        days => format!("{prefix} overdue by {}d", days.abs()),
    }
}

fn percent_label(value: Option<u32>) -> String {
    value.map_or_else(|| "n/a".to_string(), |pct| format!("{pct}%"))
}

fn case_line(item: &EnrichedCase) -> String {
    format!(
        "{}: {} ({}, owner: {})",
        item.record.scholar,
        item.record.summary,
        item.record.urgency,
        item.record.owner.as_deref().unwrap_or("unassigned")
    )
}

fn lead_label(rows: &[MixRow]) -> String {
    rows.first()
        .map_or_else(|| "n/a".to_string(), |row| format!("{} ({}%)", row.label, row.pct))
}

fn coverage_lines(output: &mut String, coverage: &Coverage<'_>) {
    match coverage {
        Coverage::Suggestions(suggestions) => {
            for suggestion in suggestions {
                let _ = writeln!(
                    output,
                    "- Assign {} ({}) to {} (current load {})",
                    suggestion.item.record.scholar,
                    suggestion.item.record.urgency,
                    suggestion.owner,
                    suggestion.current_load
                );
            }
        }
        other => {
            let _ = writeln!(output, "- {}", other.empty_reason().unwrap_or_default());
        }
    }
}

/// Plain-text daily brief, in a fixed section order.
pub fn build_brief(cases: &[EnrichedCase], today: NaiveDate) -> String {
    let metrics = views::metrics(cases);
    let velocity = trends::resolution_velocity(cases);
    let cadence = trends::touchpoint_cadence(cases);
    let top_cases = views::top_actions(cases, BRIEF_TOP_CASES);
    let owners: Vec<_> = workload::owner_workload(cases)
        .into_iter()
        .filter(|row| row.owner != UNASSIGNED)
        .take(BRIEF_TOP_OWNERS)
        .collect();
    let coverage = workload::coverage_suggestions(cases, BRIEF_COVERAGE);

    let mut output = String::new();
    let _ = writeln!(output, "Support Triage Brief ({today})");
    let _ = writeln!(output, "Active cases: {}", metrics.total);
    let _ = writeln!(output, "Overdue: {}", metrics.overdue);
    let _ = writeln!(output, "High urgency: {}", metrics.high_urgency);
    let _ = writeln!(output, "Unassigned: {}", metrics.unassigned);
    let _ = writeln!(output, "Due soon (<=2d): {}", metrics.due_soon);
    let _ = writeln!(output, "Touch overdue: {}", metrics.touch_overdue);
    let _ = writeln!(output);

    let _ = writeln!(
        output,
        "Throughput (7d): {} opened, {} resolved, net {:+}",
        velocity.intake7, velocity.resolved7, velocity.net7
    );
    let _ = writeln!(
        output,
        "Resolution (30d): median {}, on-time {}",
        velocity
            .median_resolution
            .map_or_else(|| "n/a".to_string(), |days| format!("{days}d")),
        percent_label(velocity.on_time_rate)
    );
    let _ = writeln!(output);

    let _ = writeln!(output, "Touchpoint cadence:");
    let hotspots: Vec<_> = cadence.iter().filter(|row| row.is_hotspot()).collect();
    if hotspots.is_empty() {
        let _ = writeln!(output, "- All touchpoints on schedule");
    }
    for row in hotspots {
        let _ = writeln!(
            output,
            "- {}: {} overdue, {} due soon (avg {}d since touch)",
            row.urgency,
            row.touch_overdue,
            row.touch_due_soon,
            row.avg_days_since_last.unwrap_or(0)
        );
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "Top priorities:");
    if top_cases.is_empty() {
        let _ = writeln!(output, "- None yet");
    }
    for item in top_cases {
        let _ = writeln!(output, "- {}", case_line(item));
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "Owner load:");
    if owners.is_empty() {
        let _ = writeln!(output, "- No owners assigned");
    }
    for row in owners {
        let _ = writeln!(
            output,
            "- {}: {} active ({} overdue, {} touch overdue)",
            row.owner, row.total, row.overdue, row.touch_overdue
        );
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "Coverage suggestions:");
    coverage_lines(&mut output, &coverage);
    let _ = writeln!(output);

    let _ = writeln!(output, "Mix:");
    let _ = writeln!(output, "- Top channel: {}", lead_label(&mix::channel_mix(cases)));
    let _ = writeln!(output, "- Top category: {}", lead_label(&mix::category_mix(cases)));
    let _ = writeln!(output, "- Leading urgency: {}", lead_label(&mix::urgency_mix(cases)));
    let _ = writeln!(output);

    let _ = writeln!(output, "Watch list:");
    if metrics.overdue > 0 {
        let _ = writeln!(output, "- Overdue cases: {}", metrics.overdue);
    } else {
        let _ = writeln!(output, "- No overdue cases");
    }
    if metrics.unassigned > 0 {
        let _ = write!(output, "- Unassigned cases: {}", metrics.unassigned);
    } else {
        let _ = write!(output, "- All cases have owners");
    }

    output
}

fn mix_section(output: &mut String, title: &str, rows: &[MixRow]) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## {title}");
    if rows.is_empty() {
        let _ = writeln!(output, "No active cases to break down.");
    }
    for row in rows {
        let _ = writeln!(output, "- {}: {} ({}%)", row.label, row.count, row.pct);
    }
}

/// Markdown rendering of every dashboard panel.
pub fn build_report(snapshot: &DashboardSnapshot<'_>) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Support Triage Dashboard");
    let _ = writeln!(output, "Generated for {}", snapshot.today);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Metrics");
    for (label, value) in snapshot.metrics.labelled() {
        let _ = writeln!(output, "- {label}: {value}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Radar");
    for signal in &snapshot.risk_radar {
        let _ = writeln!(
            output,
            "- [{:?}] {}: {}",
            signal.severity, signal.label, signal.count
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Queue");
    if snapshot.queue.is_empty() {
        let _ = writeln!(output, "No cases match the current filters.");
    }
    for item in &snapshot.queue {
        let touch = match (item.next_touch_due, item.days_to_next_touch) {
            (Some(date), Some(delta)) => format!("{date} ({})", format_delta(delta, "touch")),
            _ => "touch SLA n/a".to_string(),
        };
        let due = match (item.record.due, item.due_in_days) {
            (Some(date), Some(delta)) => format!("{date} ({})", format_delta(delta, "due")),
            _ => "SLA n/a".to_string(),
        };
        let _ = writeln!(
            output,
            "- [{} {}] {} · {} | {} / {} | {} | {} | {} | next: {}",
            item.band,
            item.score,
            item.record.scholar,
            item.record.summary,
            item.record.category,
            item.record.channel,
            item.record.owner_label(),
            touch,
            due,
            item.record.next_step.as_deref().unwrap_or("TBD")
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Actions");
    if snapshot.actions.is_empty() {
        let _ = writeln!(output, "No active cases yet.");
    }
    for item in &snapshot.actions {
        let _ = writeln!(
            output,
            "- {} ({}): {}",
            item.record.scholar, item.score, item.recommendation
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Outreach Plan");
    if snapshot.outreach.is_empty() {
        let _ = writeln!(output, "No outreach needed today.");
    }
    for entry in &snapshot.outreach {
        let _ = writeln!(
            output,
            "- {} ({}): {}",
            entry.item.record.scholar,
            entry.reasons.join(", "),
            entry.item.recommendation
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Owner Workload");
    if snapshot.owner_workload.is_empty() {
        let _ = writeln!(output, "No active cases to assign.");
    }
    for row in &snapshot.owner_workload {
        let _ = writeln!(
            output,
            "- {}: {} active, {} overdue, {} touch overdue, {} high urgency",
            row.owner, row.total, row.overdue, row.touch_overdue, row.high_urgency
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Owner Focus");
    if snapshot.owner_focus.is_empty() {
        let _ = writeln!(output, "No owned active cases.");
    }
    for entry in &snapshot.owner_focus {
        let cases: Vec<_> = entry
            .top_cases
            .iter()
            .map(|item| format!("{} ({})", item.record.scholar, item.score))
            .collect();
        let _ = writeln!(
            output,
            "- {}: {} active, {} overdue, {} touch overdue; focus on {}",
            entry.load.owner,
            entry.load.total,
            entry.load.overdue,
            entry.load.touch_overdue,
            cases.join(", ")
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Coverage Suggestions");
    coverage_lines(&mut output, &snapshot.coverage);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Response Playbook");
    if snapshot.playbook.is_empty() {
        let _ = writeln!(output, "No active categories.");
    }
    for entry in &snapshot.playbook {
        let _ = writeln!(
            output,
            "- {} ({} active, {}% high urgency), lead: {}",
            entry.category, entry.active, entry.high_urgency_pct, entry.lead
        );
        for (idx, step) in entry.steps.iter().enumerate() {
            let _ = writeln!(output, "  {}. {}", idx + 1, step);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Resolution Velocity");
    let velocity = &snapshot.velocity;
    let _ = writeln!(
        output,
        "- Last 7 days: {} opened, {} resolved, net {:+}",
        velocity.intake7, velocity.resolved7, velocity.net7
    );
    if velocity.resolved30 == 0 {
        let _ = writeln!(output, "- No cases resolved in the last 30 days.");
    } else {
        let _ = writeln!(
            output,
            "- Last 30 days: {} resolved, median {}d, on-time {}",
            velocity.resolved30,
            velocity.median_resolution.unwrap_or(0),
            percent_label(velocity.on_time_rate)
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## SLA Compliance");
    let _ = writeln!(output, "- On-time resolution: {}", percent_label(snapshot.sla.on_time_rate));
    let _ = writeln!(
        output,
        "- Touchpoint compliance: {}",
        percent_label(snapshot.sla.touch_compliance)
    );
    let _ = writeln!(output, "- Upcoming SLA risk: {}", snapshot.sla.upcoming_risk);
    let _ = writeln!(output, "- Overdue: {}", snapshot.sla.overdue);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Touchpoint Cadence");
    for row in &snapshot.cadence {
        if row.count == 0 {
            let _ = writeln!(output, "- {}: no active cases", row.urgency);
            continue;
        }
        let _ = writeln!(
            output,
            "- {}: {} active, {} overdue / {} due soon, avg {}d since touch [{}% | {}% | {}%]",
            row.urgency,
            row.count,
            row.touch_overdue,
            row.touch_due_soon,
            row.avg_days_since_last.unwrap_or(0),
            row.overdue_pct,
            row.due_soon_pct,
            row.ok_pct
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Aging");
    if snapshot.aging.total == 0 {
        let _ = writeln!(output, "No active cases.");
    } else {
        for bucket in &snapshot.aging.buckets {
            let _ = writeln!(output, "- {}: {} ({}%)", bucket.label, bucket.count, bucket.pct);
        }
        let _ = writeln!(
            output,
            "- Median age: {}d",
            snapshot.aging.median_age.unwrap_or(0)
        );
    }

    mix_section(&mut output, "Channel Mix", &snapshot.channel_mix);
    mix_section(&mut output, "Category Mix", &snapshot.category_mix);
    mix_section(&mut output, "Urgency Mix", &snapshot.urgency_mix);

    let _ = writeln!(output);
    let _ = writeln!(output, "## SLA Outlook");
    if snapshot.outlook.is_empty() {
        let _ = writeln!(output, "Nothing due in the next few days.");
    }
    for day in &snapshot.outlook {
        let _ = writeln!(output, "- {}", day.date);
        for entry in &day.entries {
            let (what, prefix) = match entry.kind {
                OutlookKind::CaseDue => ("case", "due"),
                OutlookKind::TouchDue => ("touchpoint", "touch"),
            };
            let _ = writeln!(
                output,
                "  - {} {} ({}, {})",
                entry.item.record.scholar,
                what,
                format_delta(entry.delta, prefix),
                entry.item.record.owner_label()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Activity");
    if snapshot.activity.is_empty() {
        let _ = writeln!(output, "No activity logged yet.");
    }
    for item in &snapshot.activity {
        let _ = writeln!(
            output,
            "- {} · {} · {} ({}, {})",
            item.when, item.label, item.detail, item.owner, item.urgency
        );
    }

    output
}
