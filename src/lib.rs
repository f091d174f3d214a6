pub mod bulk;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod payments;
pub mod receipt;
pub mod state;
pub mod stats;
pub mod types;

// re-export key types
pub use bulk::{BulkPaymentCoordinator, BulkPaymentOutcome, BulkPaymentRequest, StudentCollection};
pub use config::{FeeConfiguration, FeeConfigurationRegistry};
pub use decimal::{Money, Rate};
pub use engine::{FeeEngine, PaymentReceipt};
pub use errors::{FeeError, Result};
pub use events::{Event, EventStore};
pub use ledger::{FeeLedger, FeeRecord};
pub use payments::{AllocationResult, Payment, PaymentAllocator, PaymentRequest};
pub use receipt::ReceiptSequencer;
pub use state::{StateSnapshot, TenantState};
pub use stats::{AggregateStatsEngine, DashboardAggregate, DashboardSettings};
pub use types::{
    ClassId, ClassScope, FeeFrequency, FeeRecordId, FeeType, PaymentAllocation, PaymentId,
    PaymentMode, ReceiptNumber, StudentId, TenantId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
