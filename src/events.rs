use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{ClassId, FeeType, PaymentId, ReceiptNumber, StudentId};

/// all events that can be emitted by the fee engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // roster and configuration events
    StudentEnrolled {
        student_id: StudentId,
        class_id: ClassId,
        timestamp: DateTime<Utc>,
    },
    ConfigurationCreated {
        fee_type: FeeType,
        amount: Money,
        records_seeded: usize,
        timestamp: DateTime<Utc>,
    },
    ConfigurationUpdated {
        fee_type: FeeType,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    ConfigurationDeleted {
        fee_type: FeeType,
        timestamp: DateTime<Utc>,
    },
    FeeRecordSeeded {
        student_id: StudentId,
        fee_type: FeeType,
        total_amount: Money,
        due_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentReceived {
        payment_id: PaymentId,
        student_id: StudentId,
        fee_type: FeeType,
        amount: Money,
        overdue_applied: Money,
        pending_applied: Money,
        unapplied: Money,
        receipt_no: ReceiptNumber,
        timestamp: DateTime<Utc>,
    },
    OverpaymentRetained {
        payment_id: PaymentId,
        student_id: StudentId,
        unapplied: Money,
        timestamp: DateTime<Utc>,
    },
    BulkCollectionCompleted {
        fee_type: FeeType,
        requested: usize,
        succeeded: usize,
        failed: usize,
        total_amount: Money,
        timestamp: DateTime<Utc>,
    },

    // ledger maintenance events
    LateFeeApplied {
        student_id: StudentId,
        fee_type: FeeType,
        fee_amount: Money,
        due_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    PendingRolledOverdue {
        student_id: StudentId,
        fee_type: FeeType,
        amount: Money,
        due_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
