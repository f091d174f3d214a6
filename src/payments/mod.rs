pub mod allocator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{FeeType, PaymentAllocation, PaymentId, PaymentMode, ReceiptNumber, StudentId};

pub use allocator::{AllocationResult, PaymentAllocator};

/// a payment submission, before allocation
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub student_id: StudentId,
    pub fee_type: FeeType,
    pub amount: Money,
    pub mode: PaymentMode,
    pub transaction_id: Option<String>,
    pub remarks: Option<String>,
}

/// immutable record of money received; never mutated or deleted once committed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub student_id: StudentId,
    pub fee_type: FeeType,
    pub amount: Money,
    pub mode: PaymentMode,
    pub transaction_id: Option<String>,
    pub remarks: Option<String>,
    pub receipt_no: ReceiptNumber,
    pub allocation: PaymentAllocation,
    pub timestamp: DateTime<Utc>,
}

impl Payment {
    /// conservation check: the allocation split accounts for the full amount
    pub fn is_balanced(&self) -> bool {
        self.allocation.total() == self.amount
    }
}
