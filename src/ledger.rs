use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::payments::Payment;
use crate::types::{FeeRecordId, FeeType, StudentId};

/// one obligation for one student and fee type
///
/// invariant: total_amount == paid_amount + pending_amount + overdue_amount,
/// all four non-negative. Mutated only by the allocation and late-fee paths;
/// retained as history once fully paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeRecord {
    pub record_id: FeeRecordId,
    pub student_id: StudentId,
    pub fee_type: FeeType,
    pub total_amount: Money,
    pub paid_amount: Money,
    pub pending_amount: Money,
    pub overdue_amount: Money,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl FeeRecord {
    /// new obligation, fully pending
    pub fn new(
        student_id: StudentId,
        fee_type: FeeType,
        total_amount: Money,
        due_date: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            student_id,
            fee_type,
            total_amount,
            paid_amount: Money::ZERO,
            pending_amount: total_amount,
            overdue_amount: Money::ZERO,
            due_date,
            created_at,
        }
    }

    /// unpaid portion: pending plus overdue
    pub fn outstanding(&self) -> Money {
        self.pending_amount + self.overdue_amount
    }

    pub fn is_settled(&self) -> bool {
        self.outstanding().is_zero()
    }

    /// conservation invariant check
    pub fn is_balanced(&self) -> bool {
        self.total_amount == self.paid_amount + self.pending_amount + self.overdue_amount
            && !self.total_amount.is_negative()
            && !self.paid_amount.is_negative()
            && !self.pending_amount.is_negative()
            && !self.overdue_amount.is_negative()
    }

    /// move the pending balance into overdue once the due date has passed;
    /// returns the amount rolled
    pub fn roll_overdue(&mut self, as_of: NaiveDate) -> Money {
        if as_of <= self.due_date || self.pending_amount.is_zero() {
            return Money::ZERO;
        }
        let rolled = self.pending_amount;
        self.overdue_amount += rolled;
        self.pending_amount = Money::ZERO;
        rolled
    }

    /// add a flat late fee; grows total and overdue together so the
    /// conservation invariant holds
    pub fn add_late_fee(&mut self, fee: Money) {
        if fee.is_positive() {
            self.total_amount += fee;
            self.overdue_amount += fee;
        }
    }
}

/// per-tenant fee ledger: obligation records plus the immutable payment log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeeLedger {
    records: Vec<FeeRecord>,
    payments: Vec<Payment>,
}

impl FeeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[FeeRecord] {
        &self.records
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    /// all records for one student, every fee type
    pub fn student_records(&self, student_id: StudentId) -> Vec<FeeRecord> {
        self.records
            .iter()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect()
    }

    /// working copies of the records a payment allocates against
    pub fn matching_records(&self, student_id: StudentId, fee_type: &FeeType) -> Vec<FeeRecord> {
        self.records
            .iter()
            .filter(|r| r.student_id == student_id && &r.fee_type == fee_type)
            .cloned()
            .collect()
    }

    pub fn has_record(&self, student_id: StudentId, fee_type: &FeeType, due_date: NaiveDate) -> bool {
        self.records
            .iter()
            .any(|r| r.student_id == student_id && &r.fee_type == fee_type && r.due_date == due_date)
    }

    pub fn insert_record(&mut self, record: FeeRecord) {
        self.records.push(record);
    }

    /// write back mutated working copies by record id
    pub fn apply_updates(&mut self, updated: &[FeeRecord]) {
        for new in updated {
            if let Some(existing) = self
                .records
                .iter_mut()
                .find(|r| r.record_id == new.record_id)
            {
                *existing = new.clone();
            }
        }
    }

    pub fn records_mut(&mut self) -> &mut [FeeRecord] {
        &mut self.records
    }

    /// append to the immutable payment log
    pub fn record_payment(&mut self, payment: Payment) {
        self.payments.push(payment);
    }

    /// newest-first slice of the payment log
    pub fn recent_payments(&self, limit: usize) -> Vec<Payment> {
        self.payments.iter().rev().take(limit).cloned().collect()
    }

    /// conservation holds for every record in the ledger
    pub fn is_balanced(&self) -> bool {
        self.records.iter().all(FeeRecord::is_balanced)
    }
}
