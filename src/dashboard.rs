use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::activity::{self, FeedItem};
use crate::mix::{self, MixRow};
use crate::models::{EnrichedCase, Event};
use crate::trends::{self, AgingSummary, CadenceRow, OutlookDay, SlaCompliance, Velocity};
use crate::views::{self, Metrics, OutreachItem, QueueFilter, RiskSignal};
use crate::workload::{self, Coverage, OwnerFocus, OwnerLoad, PlaybookEntry};

/// Every dashboard panel, computed once from the same enriched case list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot<'a> {
    pub today: NaiveDate,
    pub metrics: Metrics,
    pub queue: Vec<&'a EnrichedCase>,
    pub actions: Vec<&'a EnrichedCase>,
    pub owner_workload: Vec<OwnerLoad>,
    pub risk_radar: Vec<RiskSignal>,
    pub coverage: Coverage<'a>,
    pub playbook: Vec<PlaybookEntry>,
    pub velocity: Velocity,
    pub sla: SlaCompliance,
    pub outreach: Vec<OutreachItem<'a>>,
    pub cadence: Vec<CadenceRow>,
    pub owner_focus: Vec<OwnerFocus<'a>>,
    pub aging: AgingSummary,
    pub channel_mix: Vec<MixRow>,
    pub category_mix: Vec<MixRow>,
    pub urgency_mix: Vec<MixRow>,
    pub outlook: Vec<OutlookDay<'a>>,
    pub activity: Vec<FeedItem>,
}

impl<'a> DashboardSnapshot<'a> {
    pub fn build(
        cases: &'a [EnrichedCase],
        events: &[Event],
        filter: &QueueFilter,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        let metrics = views::metrics(cases);
        let velocity = trends::resolution_velocity(cases);
        let sla = trends::sla_compliance(cases, &velocity);
        Self {
            today,
            risk_radar: views::risk_radar(&metrics),
            metrics,
            queue: views::queue(cases, filter),
            actions: views::top_actions(cases, views::TOP_ACTIONS),
            owner_workload: workload::owner_workload(cases),
            coverage: workload::coverage_suggestions(cases, workload::COVERAGE_LIMIT),
            playbook: workload::response_playbook(cases),
            velocity,
            sla,
            outreach: views::outreach_plan(cases),
            cadence: trends::touchpoint_cadence(cases),
            owner_focus: workload::owner_focus(cases, workload::OWNER_FOCUS_LIMIT),
            aging: trends::aging_summary(cases),
            channel_mix: mix::channel_mix(cases),
            category_mix: mix::category_mix(cases),
            urgency_mix: mix::urgency_mix(cases),
            outlook: trends::sla_outlook(cases),
            activity: activity::activity_feed(events, now),
        }
    }
}
