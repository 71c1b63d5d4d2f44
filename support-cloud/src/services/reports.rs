//! Per-company annual report

use std::collections::BTreeMap;

use chrono::{Datelike, TimeZone, Utc};
use serde::Serialize;

use shared::support::{Company, Ticket};
use shared::util::millis_to_hours;

#[derive(Debug, Clone, Serialize)]
pub struct ReportTicket {
    pub id: uuid::Uuid,
    pub ticket_id: String,
    pub subject: String,
    pub status: String,
    pub priority: String,
    pub product: String,
    pub issue_type: String,
    pub created_at: i64,
    pub resolved_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyReport {
    pub company: Company,
    pub year: i32,
    pub total_tickets: usize,
    pub resolved_tickets: usize,
    /// Index 0 is January
    pub tickets_per_month: [usize; 12],
    pub by_product: BTreeMap<String, usize>,
    pub by_issue_type: BTreeMap<String, usize>,
    pub avg_resolution_hours: Option<f64>,
    pub tickets: Vec<ReportTicket>,
}

/// `[start, end)` of a calendar year in UTC milliseconds
pub fn year_bounds(year: i32) -> Option<(i64, i64)> {
    let start = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single()?;
    let end = Utc.with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0).single()?;
    Some((start.timestamp_millis(), end.timestamp_millis()))
}

pub fn build(company: Company, year: i32, tickets: &[Ticket]) -> CompanyReport {
    let mut tickets_per_month = [0usize; 12];
    let mut by_product = BTreeMap::new();
    let mut by_issue_type = BTreeMap::new();
    let mut resolution_spans = Vec::new();

    for ticket in tickets {
        if let Some(created) = chrono::DateTime::from_timestamp_millis(ticket.created_at) {
            tickets_per_month[created.month0() as usize] += 1;
        }
        *by_product.entry(ticket.product.clone()).or_insert(0) += 1;
        *by_issue_type.entry(ticket.issue_type.clone()).or_insert(0) += 1;
        if let Some(resolved_at) = ticket.resolved_at {
            resolution_spans.push(resolved_at - ticket.created_at);
        }
    }

    let avg_resolution_hours = (!resolution_spans.is_empty()).then(|| {
        let total: i64 = resolution_spans.iter().sum();
        (millis_to_hours(total) / resolution_spans.len() as f64 * 10.0).round() / 10.0
    });

    CompanyReport {
        company,
        year,
        total_tickets: tickets.len(),
        resolved_tickets: resolution_spans.len(),
        tickets_per_month,
        by_product,
        by_issue_type,
        avg_resolution_hours,
        tickets: tickets
            .iter()
            .map(|t| ReportTicket {
                id: t.id,
                ticket_id: t.display_id(),
                subject: t.subject.clone(),
                status: t.status.as_db().to_string(),
                priority: t.priority.as_db().to_string(),
                product: t.product.clone(),
                issue_type: t.issue_type.clone(),
                created_at: t.created_at,
                resolved_at: t.resolved_at,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_ticket;
    use shared::util::HOUR_MILLIS;

    fn company() -> Company {
        Company {
            id: uuid::Uuid::nil(),
            name: "ACME".into(),
            domain: "acme.com".into(),
            created_at: 0,
        }
    }

    #[test]
    fn test_year_bounds() {
        let (start, end) = year_bounds(2026).unwrap();
        assert_eq!(start, 1_767_225_600_000);
        assert_eq!(end - start, 365 * 24 * HOUR_MILLIS);
    }

    #[test]
    fn test_monthly_and_grouped_counts() {
        let (start, _) = year_bounds(2026).unwrap();
        let mut jan = sample_ticket(1);
        jan.created_at = start;
        jan.resolved_at = Some(start + 6 * HOUR_MILLIS);
        let mut feb = sample_ticket(2);
        feb.created_at = start + 31 * 24 * HOUR_MILLIS;
        feb.product = "erp".into();

        let report = build(company(), 2026, &[jan, feb]);
        assert_eq!(report.total_tickets, 2);
        assert_eq!(report.resolved_tickets, 1);
        assert_eq!(report.tickets_per_month[0], 1);
        assert_eq!(report.tickets_per_month[1], 1);
        assert_eq!(report.by_product["erp"], 1);
        assert_eq!(report.avg_resolution_hours, Some(6.0));
        assert_eq!(report.tickets[0].ticket_id, "TKT-0001");
    }
}
