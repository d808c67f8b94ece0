//! Read-side records for clients and plans.
//!
//! Client and plan management lives outside this service; orders only need
//! an explicit by-id fetch of these records at checkout time. No lazy
//! navigation between aggregates.

use chrono::{DateTime, Datelike, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Customer record as seen by the order flow
#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Subscription plan record as seen by the order flow
#[derive(Debug, Clone)]
pub struct PlanRecord {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price_minor: i64,
    pub billing_period: BillingPeriod,
    pub active: bool,
}

/// Billing period of a plan, used to derive an order's end date at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingPeriod {
    Monthly,
    Semiannual,
    Annual,
}

impl BillingPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingPeriod::Monthly => "monthly",
            BillingPeriod::Semiannual => "semiannual",
            BillingPeriod::Annual => "annual",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "monthly" => Some(BillingPeriod::Monthly),
            "semiannual" => Some(BillingPeriod::Semiannual),
            "annual" => Some(BillingPeriod::Annual),
            _ => None,
        }
    }

    /// End of the billing window that starts at `start`. Month arithmetic
    /// clamps to the last valid day (Jan 31 + 1 month = Feb 28/29).
    pub fn end_date_from(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            BillingPeriod::Monthly => start + Months::new(1),
            BillingPeriod::Semiannual => start + Months::new(6),
            BillingPeriod::Annual => start
                .with_year(start.year() + 1)
                .unwrap_or(start + Months::new(12)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_end_date_monthly() {
        let start = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let end = BillingPeriod::Monthly.end_date_from(start);
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 2, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_end_date_monthly_clamps_to_month_end() {
        let start = Utc.with_ymd_and_hms(2026, 1, 31, 0, 0, 0).unwrap();
        let end = BillingPeriod::Monthly.end_date_from(start);
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 2, 28, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_end_date_semiannual_and_annual() {
        let start = Utc.with_ymd_and_hms(2026, 3, 10, 8, 30, 0).unwrap();
        assert_eq!(
            BillingPeriod::Semiannual.end_date_from(start),
            Utc.with_ymd_and_hms(2026, 9, 10, 8, 30, 0).unwrap()
        );
        assert_eq!(
            BillingPeriod::Annual.end_date_from(start),
            Utc.with_ymd_and_hms(2027, 3, 10, 8, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_billing_period_round_trip() {
        for period in [
            BillingPeriod::Monthly,
            BillingPeriod::Semiannual,
            BillingPeriod::Annual,
        ] {
            assert_eq!(BillingPeriod::parse(period.as_str()), Some(period));
        }
        assert_eq!(BillingPeriod::parse("weekly"), None);
    }
}
