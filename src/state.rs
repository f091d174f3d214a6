use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::config::FeeConfigurationRegistry;
use crate::errors::{FeeError, Result};
use crate::ledger::FeeLedger;
use crate::stats::{DashboardAggregate, DashboardSettings};
use crate::types::{ClassId, ReceiptNumber, StudentId, TenantId};

/// full persistent state of one tenant (one school)
///
/// everything the engine needs to resume: the ledger, configurations, the
/// enrollment roster, dashboard settings, the cached aggregate, and the
/// receipt watermark so the sequence continues instead of repeating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantState {
    pub tenant_id: TenantId,
    pub utc_offset_minutes: i32,
    pub ledger: FeeLedger,
    pub configurations: FeeConfigurationRegistry,
    pub roster: HashMap<StudentId, ClassId>,
    pub settings: DashboardSettings,
    pub aggregate: DashboardAggregate,
    pub stats_date: NaiveDate,
    pub receipt_watermark: ReceiptNumber,
}

impl TenantState {
    pub fn new(tenant_id: TenantId, utc_offset_minutes: i32, today: NaiveDate) -> Self {
        Self {
            tenant_id,
            utc_offset_minutes,
            ledger: FeeLedger::new(),
            configurations: FeeConfigurationRegistry::new(),
            roster: HashMap::new(),
            settings: DashboardSettings::default(),
            aggregate: DashboardAggregate::default(),
            stats_date: today,
            receipt_watermark: ReceiptNumber { year: 0, sequence: 0 },
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| FeeError::StateSerialization {
            message: e.to_string(),
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| FeeError::StateSerialization {
            message: e.to_string(),
        })
    }
}

/// state snapshot for audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub snapshot_id: Uuid,
    pub tenant_id: TenantId,
    pub timestamp: DateTime<Utc>,
    pub state: TenantState,
    pub trigger: String,
}

impl StateSnapshot {
    pub fn capture(state: &TenantState, trigger: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            snapshot_id: Uuid::new_v4(),
            tenant_id: state.tenant_id,
            timestamp,
            state: state.clone(),
            trigger,
        }
    }
}
