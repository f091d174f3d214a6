use crate::decimal::Money;
use crate::errors::{FeeError, Result};
use crate::payments::Payment;
use crate::stats::DashboardAggregate;
use crate::types::{FeeType, PaymentMode, StudentId};

/// one coordinated collection across multiple students
#[derive(Debug, Clone, PartialEq)]
pub struct BulkPaymentRequest {
    pub student_ids: Vec<StudentId>,
    pub fee_type: FeeType,
    pub mode: PaymentMode,
    pub transaction_id: Option<String>,
    pub remarks: Option<String>,
}

/// per-student outcome inside a bulk batch
#[derive(Debug)]
pub enum StudentCollection {
    Collected { payment: Payment },
    Failed { student_id: StudentId, error: FeeError },
}

impl StudentCollection {
    pub fn is_collected(&self) -> bool {
        matches!(self, StudentCollection::Collected { .. })
    }

    pub fn student_id(&self) -> StudentId {
        match self {
            StudentCollection::Collected { payment } => payment.student_id,
            StudentCollection::Failed { student_id, .. } => *student_id,
        }
    }
}

/// batch summary: per-student results plus the single consistent snapshot
/// taken after all successful writes
#[derive(Debug)]
pub struct BulkPaymentOutcome {
    pub payments_count: usize,
    pub total_amount: Money,
    pub results: Vec<StudentCollection>,
    pub dashboard_stats: DashboardAggregate,
}

impl BulkPaymentOutcome {
    pub fn failed_count(&self) -> usize {
        self.results.len() - self.payments_count
    }

    pub fn failures(&self) -> impl Iterator<Item = &StudentCollection> {
        self.results.iter().filter(|r| !r.is_collected())
    }
}

/// applies a per-student payment operation across a batch
///
/// a failure for one student never aborts the batch: it is recorded and
/// excluded from the totals. the caller takes the aggregate snapshot once,
/// after the loop.
pub struct BulkPaymentCoordinator;

impl BulkPaymentCoordinator {
    pub fn collect<F>(
        student_ids: &[StudentId],
        mut pay_one: F,
    ) -> Result<(Vec<StudentCollection>, usize, Money)>
    where
        F: FnMut(StudentId) -> Result<Payment>,
    {
        if student_ids.is_empty() {
            return Err(FeeError::NoStudentsSelected);
        }

        let mut results = Vec::with_capacity(student_ids.len());
        let mut payments_count = 0;
        let mut total_amount = Money::ZERO;

        for &student_id in student_ids {
            match pay_one(student_id) {
                Ok(payment) => {
                    payments_count += 1;
                    total_amount += payment.allocation.total_applied();
                    results.push(StudentCollection::Collected { payment });
                }
                Err(error) => {
                    results.push(StudentCollection::Failed { student_id, error });
                }
            }
        }

        Ok((results, payments_count, total_amount))
    }
}
