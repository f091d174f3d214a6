use crate::decimal::Money;
use crate::errors::{FeeError, Result};
use crate::ledger::FeeRecord;
use crate::types::{FeeRecordId, PaymentAllocation};

/// balance buckets in application order: overdue retires before pending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BalanceBucket {
    Overdue,
    Pending,
}

/// allocation outcome: the split plus which records were touched
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationResult {
    pub allocation: PaymentAllocation,
    pub touched: Vec<FeeRecordId>,
}

impl AllocationResult {
    /// true when nothing could be applied (no matching outstanding balance)
    pub fn is_fully_unapplied(&self) -> bool {
        self.allocation.total_applied().is_zero()
    }
}

/// pure allocation algorithm over a student's fee records
pub struct PaymentAllocator;

impl PaymentAllocator {
    /// split `amount` across `records`: overdue pass first, then pending,
    /// each oldest due date first; the remainder is reported as unapplied
    pub fn allocate(amount: Money, records: &mut [FeeRecord]) -> Result<AllocationResult> {
        if !amount.is_positive() {
            return Err(FeeError::InvalidPaymentAmount { amount });
        }

        // allocation depends on due-date order, oldest obligation first
        records.sort_by(|a, b| a.due_date.cmp(&b.due_date));

        let mut remaining = amount;
        let mut allocation = PaymentAllocation::default();
        let mut touched = Vec::new();

        for bucket in [BalanceBucket::Overdue, BalanceBucket::Pending] {
            remaining = Self::apply_pass(bucket, remaining, records, &mut allocation, &mut touched);
            if remaining.is_zero() {
                break;
            }
        }

        // overpayment is reported, never discarded or folded back into totals
        allocation.unapplied = remaining;

        debug_assert_eq!(allocation.total(), amount);
        debug_assert!(records.iter().all(FeeRecord::is_balanced));

        Ok(AllocationResult { allocation, touched })
    }

    fn apply_pass(
        bucket: BalanceBucket,
        available: Money,
        records: &mut [FeeRecord],
        allocation: &mut PaymentAllocation,
        touched: &mut Vec<FeeRecordId>,
    ) -> Money {
        let mut remaining = available;

        for record in records.iter_mut() {
            if remaining.is_zero() {
                break;
            }

            let balance = match bucket {
                BalanceBucket::Overdue => record.overdue_amount,
                BalanceBucket::Pending => record.pending_amount,
            };

            let applied = remaining.min(balance);
            if applied.is_zero() {
                continue;
            }

            match bucket {
                BalanceBucket::Overdue => {
                    record.overdue_amount -= applied;
                    allocation.overdue_applied += applied;
                }
                BalanceBucket::Pending => {
                    record.pending_amount -= applied;
                    allocation.pending_applied += applied;
                }
            }
            record.paid_amount += applied;
            remaining -= applied;

            if !touched.contains(&record.record_id) {
                touched.push(record.record_id);
            }
        }

        remaining
    }
}
