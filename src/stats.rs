use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::ledger::FeeLedger;
use crate::payments::Payment;

/// externally configured dashboard values, passed through unchanged
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct DashboardSettings {
    pub pending_approvals: u32,
    pub monthly_target: Money,
}

/// point-in-time school-wide rollup; derived, never authoritative
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct DashboardAggregate {
    pub total_fees: Money,
    pub collected: Money,
    pub pending: Money,
    pub overdue: Money,
    pub payments_today: u32,
    pub todays_collection: Money,
    pub pending_approvals: u32,
    pub monthly_target: Money,
}

/// calendar date of a timestamp in the tenant's local time
pub fn local_date(timestamp: DateTime<Utc>, utc_offset_minutes: i32) -> NaiveDate {
    match FixedOffset::east_opt(utc_offset_minutes * 60) {
        Some(offset) => timestamp.with_timezone(&offset).date_naive(),
        None => timestamp.date_naive(),
    }
}

/// recomputes the dashboard rollup after each mutation
///
/// two strategies: a full scan of the ledger, and an incremental delta for
/// the payment hot path. both must produce identical results; the engine's
/// tests hold them to that.
pub struct AggregateStatsEngine;

impl AggregateStatsEngine {
    /// full recomputation from fee records and the payment log
    pub fn recompute(
        ledger: &FeeLedger,
        settings: &DashboardSettings,
        today: NaiveDate,
        utc_offset_minutes: i32,
    ) -> DashboardAggregate {
        let mut aggregate = DashboardAggregate {
            pending_approvals: settings.pending_approvals,
            monthly_target: settings.monthly_target,
            ..Default::default()
        };

        for record in ledger.records() {
            aggregate.total_fees += record.total_amount;
            aggregate.collected += record.paid_amount;
            aggregate.pending += record.pending_amount;
            aggregate.overdue += record.overdue_amount;
        }

        for payment in ledger.payments() {
            if local_date(payment.timestamp, utc_offset_minutes) == today {
                aggregate.payments_today += 1;
                aggregate.todays_collection += payment.amount;
            }
        }

        aggregate
    }

    /// incremental delta for one committed payment; `as_of` tracks the
    /// tenant-local day the cached today-counters refer to
    pub fn apply_payment(
        aggregate: &mut DashboardAggregate,
        as_of: &mut NaiveDate,
        payment: &Payment,
        utc_offset_minutes: i32,
    ) {
        let payment_day = local_date(payment.timestamp, utc_offset_minutes);
        if payment_day != *as_of {
            aggregate.payments_today = 0;
            aggregate.todays_collection = Money::ZERO;
            *as_of = payment_day;
        }

        aggregate.collected += payment.allocation.total_applied();
        aggregate.pending = aggregate
            .pending
            .saturating_sub(payment.allocation.pending_applied);
        aggregate.overdue = aggregate
            .overdue
            .saturating_sub(payment.allocation.overdue_applied);
        aggregate.payments_today += 1;
        aggregate.todays_collection += payment.amount;
    }

    /// refresh pass-through values on a cached aggregate
    pub fn apply_settings(aggregate: &mut DashboardAggregate, settings: &DashboardSettings) {
        aggregate.pending_approvals = settings.pending_approvals;
        aggregate.monthly_target = settings.monthly_target;
    }
}
