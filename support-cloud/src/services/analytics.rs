//! Dashboard aggregation over a window of tickets

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use shared::support::{SlaTarget, Ticket, TicketPriority};
use shared::util::{HOUR_MILLIS, millis_to_hours};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComplianceStat {
    pub met: usize,
    pub breached: usize,
    /// `met / (met + breached)` in percent; `None` when nothing was measurable
    pub percentage: Option<f64>,
}

impl ComplianceStat {
    fn record(&mut self, met: bool) {
        if met {
            self.met += 1;
        } else {
            self.breached += 1;
        }
    }

    fn finish(mut self) -> Self {
        let measured = self.met + self.breached;
        self.percentage =
            (measured > 0).then(|| round1(self.met as f64 * 100.0 / measured as f64));
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SlaCompliance {
    pub first_response: ComplianceStat,
    pub resolution: ComplianceStat,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub total: usize,
    /// Tickets not yet resolved or closed
    pub open_backlog: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub by_product: BTreeMap<String, usize>,
    pub by_issue_type: BTreeMap<String, usize>,
    pub by_source: BTreeMap<String, usize>,
    /// Tickets created per UTC day (`YYYY-MM-DD`)
    pub created_per_day: BTreeMap<String, usize>,
    pub avg_first_response_hours: Option<f64>,
    pub avg_resolution_hours: Option<f64>,
    pub sla: SlaCompliance,
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn average(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: i64 = values.iter().sum();
    Some(round1(millis_to_hours(sum) / values.len() as f64))
}

pub(crate) fn utc_day(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Aggregate `tickets` as of `now`.
///
/// A ticket without a first response (or resolution) counts against the SLA
/// only once its target has already elapsed; until then it is not measured.
pub fn summarize(tickets: &[Ticket], sla: &[SlaTarget], now: i64) -> AnalyticsSummary {
    let targets: HashMap<TicketPriority, &SlaTarget> =
        sla.iter().map(|t| (t.priority, t)).collect();

    let mut summary = AnalyticsSummary {
        total: tickets.len(),
        ..Default::default()
    };
    let mut first_response_spans = Vec::new();
    let mut resolution_spans = Vec::new();
    let mut compliance = SlaCompliance::default();

    for ticket in tickets {
        *summary
            .by_status
            .entry(ticket.status.as_db().to_string())
            .or_default() += 1;
        *summary
            .by_priority
            .entry(ticket.priority.as_db().to_string())
            .or_default() += 1;
        *summary.by_product.entry(ticket.product.clone()).or_default() += 1;
        *summary
            .by_issue_type
            .entry(ticket.issue_type.clone())
            .or_default() += 1;
        *summary
            .by_source
            .entry(ticket.source.as_db().to_string())
            .or_default() += 1;
        *summary
            .created_per_day
            .entry(utc_day(ticket.created_at))
            .or_default() += 1;

        if !ticket.status.is_finished() {
            summary.open_backlog += 1;
        }

        let first_response = ticket.first_response_at.map(|at| at - ticket.created_at);
        let resolution = ticket.resolved_at.map(|at| at - ticket.created_at);
        first_response_spans.extend(first_response);
        resolution_spans.extend(resolution);

        let Some(target) = targets.get(&ticket.priority) else {
            continue;
        };
        let first_limit = (target.first_response_hours * HOUR_MILLIS as f64) as i64;
        let resolution_limit = (target.resolution_hours * HOUR_MILLIS as f64) as i64;
        let age = now - ticket.created_at;

        match first_response {
            Some(span) => compliance.first_response.record(span <= first_limit),
            None if age > first_limit => compliance.first_response.record(false),
            None => {}
        }
        match resolution {
            Some(span) => compliance.resolution.record(span <= resolution_limit),
            None if age > resolution_limit => compliance.resolution.record(false),
            None => {}
        }
    }

    summary.avg_first_response_hours = average(&first_response_spans);
    summary.avg_resolution_hours = average(&resolution_spans);
    summary.sla = SlaCompliance {
        first_response: compliance.first_response.finish(),
        resolution: compliance.resolution.finish(),
    };
    summary
}
