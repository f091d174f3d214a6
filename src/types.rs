use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a tenant (one school)
pub type TenantId = Uuid;

/// unique identifier for a student
pub type StudentId = Uuid;

/// unique identifier for a fee record
pub type FeeRecordId = Uuid;

/// unique identifier for a payment
pub type PaymentId = Uuid;

/// class identifier as used by the school (e.g. "10-A")
pub type ClassId = String;

/// fee type key (e.g. "tuition", "transport", "exam")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeeType(String);

impl FeeType {
    pub fn new(name: impl Into<String>) -> Self {
        FeeType(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FeeType {
    fn from(s: &str) -> Self {
        FeeType(s.to_string())
    }
}

/// how a payment was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    Cash,
    Card,
    Upi,
    BankTransfer,
    Cheque,
    Online,
}

/// billing frequency for a fee configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeFrequency {
    Monthly,
    Quarterly,
    HalfYearly,
    Yearly,
    OneTime,
}

/// which classes a fee configuration applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassScope {
    /// every class in the school
    All,
    /// one specific class
    Class(ClassId),
}

impl ClassScope {
    pub fn matches(&self, class_id: &str) -> bool {
        match self {
            ClassScope::All => true,
            ClassScope::Class(c) => c == class_id,
        }
    }

    /// specific-class scope outranks the "all" sentinel
    pub fn is_specific(&self) -> bool {
        matches!(self, ClassScope::Class(_))
    }
}

/// split of one payment across overdue, pending, and unapplied portions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PaymentAllocation {
    pub overdue_applied: Money,
    pub pending_applied: Money,
    pub unapplied: Money,
}

impl PaymentAllocation {
    pub fn total_applied(&self) -> Money {
        self.overdue_applied + self.pending_applied
    }

    pub fn total(&self) -> Money {
        self.overdue_applied + self.pending_applied + self.unapplied
    }
}

/// receipt identifier, monotonic per tenant, formatted RCP<year>-<sequence>
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReceiptNumber {
    pub year: i32,
    pub sequence: u64,
}

impl fmt::Display for ReceiptNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RCP{}-{:06}", self.year, self.sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_number_format() {
        let receipt = ReceiptNumber { year: 2026, sequence: 42 };
        assert_eq!(receipt.to_string(), "RCP2026-000042");
    }

    #[test]
    fn test_receipt_number_ordering() {
        let a = ReceiptNumber { year: 2025, sequence: 999 };
        let b = ReceiptNumber { year: 2026, sequence: 1 };
        let c = ReceiptNumber { year: 2026, sequence: 2 };
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_class_scope_precedence() {
        let all = ClassScope::All;
        let specific = ClassScope::Class("10-A".to_string());

        assert!(all.matches("10-A"));
        assert!(specific.matches("10-A"));
        assert!(!specific.matches("10-B"));
        assert!(specific.is_specific());
        assert!(!all.is_specific());
    }

    #[test]
    fn test_allocation_totals() {
        let allocation = PaymentAllocation {
            overdue_applied: Money::from_major(2000),
            pending_applied: Money::from_major(1500),
            unapplied: Money::from_major(500),
        };
        assert_eq!(allocation.total_applied(), Money::from_major(3500));
        assert_eq!(allocation.total(), Money::from_major(4000));
    }
}
