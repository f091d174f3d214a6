use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{FeeError, Result};
use crate::types::{ClassScope, FeeFrequency, FeeType};

/// administrator-defined fee-type definition; drives fee record creation
/// and payment amount suggestions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeConfiguration {
    pub config_id: Uuid,
    pub fee_type: FeeType,
    pub amount: Money,
    pub frequency: FeeFrequency,
    pub due_date: NaiveDate,
    pub apply_to_classes: ClassScope,
    pub late_fee: Money,
    pub discount: Money,
    pub created_at: DateTime<Utc>,
}

impl FeeConfiguration {
    pub fn new(
        fee_type: FeeType,
        amount: Money,
        frequency: FeeFrequency,
        due_date: NaiveDate,
        apply_to_classes: ClassScope,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            config_id: Uuid::new_v4(),
            fee_type,
            amount,
            frequency,
            due_date,
            apply_to_classes,
            late_fee: Money::ZERO,
            discount: Money::ZERO,
            created_at,
        }
    }

    pub fn with_late_fee(mut self, late_fee: Money) -> Self {
        self.late_fee = late_fee;
        self
    }

    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self
    }

    /// amount prefilled for a payment: configured amount net of discount
    pub fn suggested_amount(&self) -> Money {
        self.amount.saturating_sub(self.discount)
    }

    fn validate(&self) -> Result<()> {
        if !self.amount.is_positive() {
            return Err(FeeError::InvalidConfiguration {
                message: format!("amount must be positive, got {}", self.amount),
            });
        }
        if self.discount.is_negative() || self.discount > self.amount {
            return Err(FeeError::InvalidConfiguration {
                message: format!(
                    "discount {} must be between zero and the amount {}",
                    self.discount, self.amount
                ),
            });
        }
        if self.late_fee.is_negative() {
            return Err(FeeError::InvalidConfiguration {
                message: format!("late fee must not be negative, got {}", self.late_fee),
            });
        }
        Ok(())
    }
}

/// stores fee configurations; deleting one never alters records already
/// materialized from it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeeConfigurationRegistry {
    configurations: Vec<FeeConfiguration>,
}

impl FeeConfigurationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> &[FeeConfiguration] {
        &self.configurations
    }

    pub fn create(&mut self, config: FeeConfiguration) -> Result<FeeConfiguration> {
        config.validate()?;
        self.configurations.push(config.clone());
        Ok(config)
    }

    pub fn update(&mut self, config: FeeConfiguration) -> Result<FeeConfiguration> {
        config.validate()?;
        let existing = self
            .configurations
            .iter_mut()
            .find(|c| c.config_id == config.config_id)
            .ok_or_else(|| FeeError::InvalidConfiguration {
                message: format!("no configuration with id {}", config.config_id),
            })?;
        *existing = config.clone();
        Ok(config)
    }

    pub fn delete(&mut self, config_id: Uuid) -> Result<FeeConfiguration> {
        let index = self
            .configurations
            .iter()
            .position(|c| c.config_id == config_id)
            .ok_or_else(|| FeeError::InvalidConfiguration {
                message: format!("no configuration with id {}", config_id),
            })?;
        Ok(self.configurations.remove(index))
    }

    pub fn list_by_type(&self, fee_type: &FeeType) -> Vec<&FeeConfiguration> {
        self.configurations
            .iter()
            .filter(|c| &c.fee_type == fee_type)
            .collect()
    }

    /// configurations whose scope covers the given class
    pub fn applicable_to_class(&self, class_id: &str) -> Vec<&FeeConfiguration> {
        self.configurations
            .iter()
            .filter(|c| c.apply_to_classes.matches(class_id))
            .collect()
    }

    /// precedence rule: a configuration scoped to the student's specific
    /// class beats one scoped to all classes; within the same scope the
    /// newest wins
    pub fn resolve_for_class(&self, class_id: &str, fee_type: &FeeType) -> Option<&FeeConfiguration> {
        self.configurations
            .iter()
            .filter(|c| &c.fee_type == fee_type && c.apply_to_classes.matches(class_id))
            .max_by_key(|c| (c.apply_to_classes.is_specific(), c.created_at))
    }
}
