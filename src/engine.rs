use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::Datelike;
use hourglass_rs::SafeTimeProvider;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bulk::{BulkPaymentCoordinator, BulkPaymentOutcome, BulkPaymentRequest};
use crate::config::FeeConfiguration;
use crate::decimal::Money;
use crate::errors::{FeeError, Result};
use crate::events::{Event, EventStore};
use crate::ledger::{FeeLedger, FeeRecord};
use crate::payments::{Payment, PaymentAllocator, PaymentRequest};
use crate::receipt::ReceiptSequencer;
use crate::state::TenantState;
use crate::stats::{local_date, AggregateStatsEngine, DashboardAggregate, DashboardSettings};
use crate::types::{ClassId, FeeType, PaymentAllocation, StudentId, TenantId};

/// response to a successful payment submission: the committed payment, its
/// allocation split, and the aggregate snapshot taken inside the same
/// transaction, so the caller never needs a read-after-write round trip
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub allocation: PaymentAllocation,
    pub dashboard_stats: DashboardAggregate,
}

/// per-tenant runtime: the serializable state behind a reader-writer lock,
/// a lock registry keyed by student id, the receipt sequencer, and the
/// audit event buffer
struct TenantHandle {
    state: RwLock<TenantState>,
    student_locks: Mutex<HashMap<StudentId, Arc<Mutex<()>>>>,
    sequencer: ReceiptSequencer,
    events: Mutex<EventStore>,
}

impl TenantHandle {
    fn new(state: TenantState) -> Self {
        let sequencer = ReceiptSequencer::resume_from(state.receipt_watermark);
        Self {
            state: RwLock::new(state),
            student_locks: Mutex::new(HashMap::new()),
            sequencer,
            events: Mutex::new(EventStore::new()),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, TenantState>> {
        self.state.read().map_err(|_| FeeError::TransactionAborted {
            reason: "tenant state lock poisoned".to_string(),
        })
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, TenantState>> {
        self.state.write().map_err(|_| FeeError::TransactionAborted {
            reason: "tenant state lock poisoned".to_string(),
        })
    }

    /// lock serializing payments for one student; two concurrent payments
    /// for the same student must not interleave their balance reductions
    fn student_lock(&self, student_id: StudentId) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .student_locks
            .lock()
            .map_err(|_| FeeError::TransactionAborted {
                reason: "student lock registry poisoned".to_string(),
            })?;
        Ok(Arc::clone(locks.entry(student_id).or_default()))
    }

    fn emit(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.emit(event);
        }
    }

    fn emit_all(&self, batch: Vec<Event>) {
        if let Ok(mut events) = self.events.lock() {
            for event in batch {
                events.emit(event);
            }
        }
    }
}

/// fee-payment allocation and financial-aggregate engine, partitioned by
/// tenant; every ledger, aggregate, and receipt sequence belongs to exactly
/// one school
#[derive(Default)]
pub struct FeeEngine {
    tenants: RwLock<HashMap<TenantId, Arc<TenantHandle>>>,
}

impl FeeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// register a school; idempotent for an already-known tenant
    pub fn register_tenant(
        &self,
        tenant_id: TenantId,
        utc_offset_minutes: i32,
        time: &SafeTimeProvider,
    ) -> Result<()> {
        let mut tenants = self.tenants_write()?;
        if !tenants.contains_key(&tenant_id) {
            let today = local_date(time.now(), utc_offset_minutes);
            let state = TenantState::new(tenant_id, utc_offset_minutes, today);
            tenants.insert(tenant_id, Arc::new(TenantHandle::new(state)));
            info!(%tenant_id, utc_offset_minutes, "tenant registered");
        }
        Ok(())
    }

    /// enroll a student and seed fee records from every configuration whose
    /// scope covers the class; returns the number of records seeded
    pub fn enroll_student(
        &self,
        tenant_id: TenantId,
        student_id: StudentId,
        class_id: ClassId,
        time: &SafeTimeProvider,
    ) -> Result<usize> {
        let handle = self.handle(tenant_id)?;
        let now = time.now();
        let mut batch = Vec::new();

        let seeded = {
            let mut state = handle.write()?;
            state.roster.insert(student_id, class_id.clone());

            let configs: Vec<FeeConfiguration> = state
                .configurations
                .applicable_to_class(&class_id)
                .into_iter()
                .cloned()
                .collect();

            let mut seeded = 0;
            for config in configs {
                if Self::seed_record(&mut state.ledger, student_id, &config, now, &mut batch) {
                    seeded += 1;
                }
            }
            Self::refresh_aggregate(&mut state, now);
            seeded
        };

        batch.insert(
            0,
            Event::StudentEnrolled {
                student_id,
                class_id,
                timestamp: now,
            },
        );
        handle.emit_all(batch);
        debug!(%tenant_id, %student_id, seeded, "student enrolled");
        Ok(seeded)
    }

    /// create a fee configuration and materialize records for every
    /// enrolled student in scope
    pub fn create_fee_configuration(
        &self,
        tenant_id: TenantId,
        config: FeeConfiguration,
        time: &SafeTimeProvider,
    ) -> Result<FeeConfiguration> {
        let handle = self.handle(tenant_id)?;
        let now = time.now();
        let mut batch = Vec::new();

        let (created, seeded) = {
            let mut state = handle.write()?;
            let created = state.configurations.create(config)?;

            let in_scope: Vec<StudentId> = state
                .roster
                .iter()
                .filter(|(_, class_id)| created.apply_to_classes.matches(class_id))
                .map(|(student_id, _)| *student_id)
                .collect();

            let mut seeded = 0;
            for student_id in in_scope {
                if Self::seed_record(&mut state.ledger, student_id, &created, now, &mut batch) {
                    seeded += 1;
                }
            }
            Self::refresh_aggregate(&mut state, now);
            (created, seeded)
        };

        batch.insert(
            0,
            Event::ConfigurationCreated {
                fee_type: created.fee_type.clone(),
                amount: created.amount,
                records_seeded: seeded,
                timestamp: now,
            },
        );
        handle.emit_all(batch);
        info!(%tenant_id, fee_type = %created.fee_type, seeded, "fee configuration created");
        Ok(created)
    }

    /// update a configuration; records already materialized are historical
    /// facts and are not altered
    pub fn update_fee_configuration(
        &self,
        tenant_id: TenantId,
        config: FeeConfiguration,
        time: &SafeTimeProvider,
    ) -> Result<FeeConfiguration> {
        let handle = self.handle(tenant_id)?;
        let updated = handle.write()?.configurations.update(config)?;
        handle.emit(Event::ConfigurationUpdated {
            fee_type: updated.fee_type.clone(),
            amount: updated.amount,
            timestamp: time.now(),
        });
        Ok(updated)
    }

    /// delete a configuration; existing records are untouched
    pub fn delete_fee_configuration(
        &self,
        tenant_id: TenantId,
        config_id: Uuid,
        time: &SafeTimeProvider,
    ) -> Result<FeeConfiguration> {
        let handle = self.handle(tenant_id)?;
        let deleted = handle.write()?.configurations.delete(config_id)?;
        handle.emit(Event::ConfigurationDeleted {
            fee_type: deleted.fee_type.clone(),
            timestamp: time.now(),
        });
        Ok(deleted)
    }

    pub fn list_configurations(
        &self,
        tenant_id: TenantId,
        fee_type: &FeeType,
    ) -> Result<Vec<FeeConfiguration>> {
        let handle = self.handle(tenant_id)?;
        let state = handle.read()?;
        Ok(state
            .configurations
            .list_by_type(fee_type)
            .into_iter()
            .cloned()
            .collect())
    }

    /// class-specific configuration beats one scoped to all classes
    pub fn resolve_configuration(
        &self,
        tenant_id: TenantId,
        student_id: StudentId,
        fee_type: &FeeType,
    ) -> Result<FeeConfiguration> {
        let handle = self.handle(tenant_id)?;
        let state = handle.read()?;
        let class_id = state
            .roster
            .get(&student_id)
            .ok_or(FeeError::UnknownStudent { student_id })?;
        state
            .configurations
            .resolve_for_class(class_id, fee_type)
            .cloned()
            .ok_or_else(|| FeeError::ConfigurationNotFound {
                fee_type: fee_type.clone(),
            })
    }

    /// amount to prefill for a payment form
    pub fn suggested_amount(
        &self,
        tenant_id: TenantId,
        student_id: StudentId,
        fee_type: &FeeType,
    ) -> Result<Money> {
        Ok(self
            .resolve_configuration(tenant_id, student_id, fee_type)?
            .suggested_amount())
    }

    /// submit one payment: allocate, issue a receipt, commit, and return
    /// the snapshot taken inside the same transaction
    pub fn create_payment(
        &self,
        tenant_id: TenantId,
        request: PaymentRequest,
        time: &SafeTimeProvider,
    ) -> Result<PaymentReceipt> {
        let handle = self.handle(tenant_id)?;
        let (payment, dashboard_stats) = self.submit_payment(&handle, request, time, false)?;
        Ok(PaymentReceipt {
            allocation: payment.allocation,
            payment,
            dashboard_stats,
        })
    }

    /// one coordinated collection across multiple students; per-student
    /// failures never abort the batch and the snapshot is taken once,
    /// after all successful writes
    pub fn create_bulk_payment(
        &self,
        tenant_id: TenantId,
        request: BulkPaymentRequest,
        time: &SafeTimeProvider,
    ) -> Result<BulkPaymentOutcome> {
        let handle = self.handle(tenant_id)?;
        let now = time.now();

        let (results, payments_count, total_amount) =
            BulkPaymentCoordinator::collect(&request.student_ids, |student_id| {
                let amount = self.bulk_amount_for(&handle, student_id, &request.fee_type)?;
                let one = PaymentRequest {
                    student_id,
                    fee_type: request.fee_type.clone(),
                    amount,
                    mode: request.mode,
                    transaction_id: request.transaction_id.clone(),
                    remarks: request.remarks.clone(),
                };
                self.submit_payment(&handle, one, time, true)
                    .map(|(payment, _)| payment)
            })?;

        let dashboard_stats = handle.read()?.aggregate;
        let failed = results.len() - payments_count;

        handle.emit(Event::BulkCollectionCompleted {
            fee_type: request.fee_type.clone(),
            requested: request.student_ids.len(),
            succeeded: payments_count,
            failed,
            total_amount,
            timestamp: now,
        });
        info!(
            %tenant_id,
            fee_type = %request.fee_type,
            requested = request.student_ids.len(),
            succeeded = payments_count,
            failed,
            %total_amount,
            "bulk collection completed"
        );

        Ok(BulkPaymentOutcome {
            payments_count,
            total_amount,
            results,
            dashboard_stats,
        })
    }

    /// current school-wide rollup, fully recomputed from the ledger
    pub fn dashboard(&self, tenant_id: TenantId, time: &SafeTimeProvider) -> Result<DashboardAggregate> {
        let handle = self.handle(tenant_id)?;
        let state = handle.read()?;
        let today = local_date(time.now(), state.utc_offset_minutes);
        Ok(AggregateStatsEngine::recompute(
            &state.ledger,
            &state.settings,
            today,
            state.utc_offset_minutes,
        ))
    }

    /// payment log, newest first
    pub fn recent_payments(&self, tenant_id: TenantId, limit: usize) -> Result<Vec<Payment>> {
        let handle = self.handle(tenant_id)?;
        let state = handle.read()?;
        Ok(state.ledger.recent_payments(limit))
    }

    /// all fee records for one student
    pub fn student_fees(&self, tenant_id: TenantId, student_id: StudentId) -> Result<Vec<FeeRecord>> {
        let handle = self.handle(tenant_id)?;
        let state = handle.read()?;
        Ok(state.ledger.student_records(student_id))
    }

    /// roll pending balances into overdue for records past due as of the
    /// tenant-local date, adding the configured flat late fee; returns the
    /// number of records rolled
    pub fn apply_late_fees(&self, tenant_id: TenantId, time: &SafeTimeProvider) -> Result<usize> {
        let handle = self.handle(tenant_id)?;
        let now = time.now();

        let (today, due_students) = {
            let state = handle.read()?;
            let today = local_date(now, state.utc_offset_minutes);
            let mut students: Vec<StudentId> = state
                .ledger
                .records()
                .iter()
                .filter(|r| r.due_date < today && r.pending_amount.is_positive())
                .map(|r| r.student_id)
                .collect();
            students.sort();
            students.dedup();
            (today, students)
        };

        let mut rolled_records = 0;
        for student_id in due_students {
            let lock = handle.student_lock(student_id)?;
            let _guard = lock.lock().map_err(|_| FeeError::TransactionAborted {
                reason: "student lock poisoned".to_string(),
            })?;

            let mut batch = Vec::new();
            {
                let mut state = handle.write()?;
                let TenantState {
                    ledger,
                    configurations,
                    roster,
                    ..
                } = &mut *state;

                for record in ledger.records_mut() {
                    if record.student_id != student_id {
                        continue;
                    }
                    let rolled = record.roll_overdue(today);
                    if rolled.is_zero() {
                        continue;
                    }
                    rolled_records += 1;
                    batch.push(Event::PendingRolledOverdue {
                        student_id,
                        fee_type: record.fee_type.clone(),
                        amount: rolled,
                        due_date: record.due_date,
                        timestamp: now,
                    });

                    let late_fee = roster
                        .get(&student_id)
                        .and_then(|class_id| {
                            configurations.resolve_for_class(class_id, &record.fee_type)
                        })
                        .map(|config| config.late_fee)
                        .unwrap_or(Money::ZERO);
                    if late_fee.is_positive() {
                        record.add_late_fee(late_fee);
                        batch.push(Event::LateFeeApplied {
                            student_id,
                            fee_type: record.fee_type.clone(),
                            fee_amount: late_fee,
                            due_date: record.due_date,
                            timestamp: now,
                        });
                    }
                }
                Self::refresh_aggregate(&mut state, now);
            }
            handle.emit_all(batch);
        }

        if rolled_records > 0 {
            info!(%tenant_id, rolled_records, "pending balances rolled overdue");
        }
        Ok(rolled_records)
    }

    /// externally configured dashboard values, passed through to snapshots
    pub fn update_dashboard_settings(
        &self,
        tenant_id: TenantId,
        settings: DashboardSettings,
    ) -> Result<()> {
        let handle = self.handle(tenant_id)?;
        let mut state = handle.write()?;
        state.settings = settings;
        AggregateStatsEngine::apply_settings(&mut state.aggregate, &settings);
        Ok(())
    }

    /// drain the audit event buffer
    pub fn take_events(&self, tenant_id: TenantId) -> Result<Vec<Event>> {
        let handle = self.handle(tenant_id)?;
        let mut events = handle
            .events
            .lock()
            .map_err(|_| FeeError::TransactionAborted {
                reason: "event buffer poisoned".to_string(),
            })?;
        Ok(events.take_events())
    }

    /// JSON snapshot of a tenant's full state, including the receipt
    /// watermark so an imported sequence continues instead of repeating
    pub fn export_state(&self, tenant_id: TenantId) -> Result<String> {
        let handle = self.handle(tenant_id)?;
        let mut state = handle.read()?.clone();
        state.receipt_watermark = handle.sequencer.watermark();
        state.to_json()
    }

    /// restore a tenant from a JSON snapshot, replacing any loaded state
    pub fn import_state(&self, json: &str) -> Result<TenantId> {
        let state = TenantState::from_json(json)?;
        let tenant_id = state.tenant_id;
        let handle = Arc::new(TenantHandle::new(state));
        self.tenants_write()?.insert(tenant_id, handle);
        info!(%tenant_id, "tenant state imported");
        Ok(tenant_id)
    }

    // ---- internal ----

    fn tenants_write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<TenantId, Arc<TenantHandle>>>> {
        self.tenants.write().map_err(|_| FeeError::TransactionAborted {
            reason: "tenant registry poisoned".to_string(),
        })
    }

    fn handle(&self, tenant_id: TenantId) -> Result<Arc<TenantHandle>> {
        let tenants = self.tenants.read().map_err(|_| FeeError::TransactionAborted {
            reason: "tenant registry poisoned".to_string(),
        })?;
        tenants
            .get(&tenant_id)
            .cloned()
            .ok_or(FeeError::UnknownTenant { tenant_id })
    }

    /// seed one record from a configuration unless the student already holds
    /// one for that fee type and due date
    fn seed_record(
        ledger: &mut FeeLedger,
        student_id: StudentId,
        config: &FeeConfiguration,
        now: chrono::DateTime<chrono::Utc>,
        batch: &mut Vec<Event>,
    ) -> bool {
        if ledger.has_record(student_id, &config.fee_type, config.due_date) {
            return false;
        }
        let total = config.suggested_amount();
        if !total.is_positive() {
            return false;
        }
        let record = FeeRecord::new(student_id, config.fee_type.clone(), total, config.due_date, now);
        batch.push(Event::FeeRecordSeeded {
            student_id,
            fee_type: record.fee_type.clone(),
            total_amount: record.total_amount,
            due_date: record.due_date,
            timestamp: now,
        });
        ledger.insert_record(record);
        true
    }

    /// full aggregate recomputation after a non-payment ledger mutation
    fn refresh_aggregate(state: &mut TenantState, now: chrono::DateTime<chrono::Utc>) {
        let today = local_date(now, state.utc_offset_minutes);
        state.aggregate =
            AggregateStatsEngine::recompute(&state.ledger, &state.settings, today, state.utc_offset_minutes);
        state.stats_date = today;
    }

    /// the transactional payment pipeline: validate, allocate against
    /// working copies, issue a receipt, then commit everything inside one
    /// write-lock critical section. nothing is persisted until the commit
    /// section runs, so any earlier failure aborts with no partial state.
    fn submit_payment(
        &self,
        handle: &TenantHandle,
        request: PaymentRequest,
        time: &SafeTimeProvider,
        require_outstanding: bool,
    ) -> Result<(Payment, DashboardAggregate)> {
        if !request.amount.is_positive() {
            return Err(FeeError::InvalidPaymentAmount {
                amount: request.amount,
            });
        }

        let lock = handle.student_lock(request.student_id)?;
        let _guard = lock.lock().map_err(|_| FeeError::TransactionAborted {
            reason: "student lock poisoned".to_string(),
        })?;

        let (mut working, utc_offset_minutes) = {
            let state = handle.read()?;
            (
                state.ledger.matching_records(request.student_id, &request.fee_type),
                state.utc_offset_minutes,
            )
        };

        let outstanding: Money = working.iter().map(FeeRecord::outstanding).sum();
        if require_outstanding && outstanding.is_zero() {
            return Err(FeeError::NoOutstandingBalance {
                student_id: request.student_id,
                fee_type: request.fee_type.clone(),
            });
        }

        let allocated = PaymentAllocator::allocate(request.amount, &mut working)?;

        let now = time.now();
        let receipt_no = handle.sequencer.next(local_date(now, utc_offset_minutes).year())?;

        let payment = Payment {
            id: Uuid::new_v4(),
            student_id: request.student_id,
            fee_type: request.fee_type,
            amount: request.amount,
            mode: request.mode,
            transaction_id: request.transaction_id,
            remarks: request.remarks,
            receipt_no,
            allocation: allocated.allocation,
            timestamp: now,
        };

        // commit: ledger write-back, payment log append, and incremental
        // aggregate maintenance inside one critical section; the snapshot
        // returned is exactly the state this write produced
        let snapshot = {
            let mut state = handle.write()?;
            state.ledger.apply_updates(&working);
            state.ledger.record_payment(payment.clone());

            let mut aggregate = state.aggregate;
            let mut stats_date = state.stats_date;
            AggregateStatsEngine::apply_payment(
                &mut aggregate,
                &mut stats_date,
                &payment,
                state.utc_offset_minutes,
            );
            state.aggregate = aggregate;
            state.stats_date = stats_date;

            debug_assert!(state.ledger.is_balanced());
            state.aggregate
        };

        handle.emit(Event::PaymentReceived {
            payment_id: payment.id,
            student_id: payment.student_id,
            fee_type: payment.fee_type.clone(),
            amount: payment.amount,
            overdue_applied: payment.allocation.overdue_applied,
            pending_applied: payment.allocation.pending_applied,
            unapplied: payment.allocation.unapplied,
            receipt_no,
            timestamp: now,
        });
        if payment.allocation.unapplied.is_positive() {
            warn!(
                student_id = %payment.student_id,
                unapplied = %payment.allocation.unapplied,
                receipt_no = %receipt_no,
                "payment partially unapplied"
            );
            handle.emit(Event::OverpaymentRetained {
                payment_id: payment.id,
                student_id: payment.student_id,
                unapplied: payment.allocation.unapplied,
                timestamp: now,
            });
        }
        debug!(
            student_id = %payment.student_id,
            fee_type = %payment.fee_type,
            amount = %payment.amount,
            receipt_no = %receipt_no,
            "payment committed"
        );

        Ok((payment, snapshot))
    }

    /// bulk amount resolution: configured suggestion when one exists,
    /// otherwise the student's outstanding balance for the fee type
    fn bulk_amount_for(
        &self,
        handle: &TenantHandle,
        student_id: StudentId,
        fee_type: &FeeType,
    ) -> Result<Money> {
        let state = handle.read()?;
        let outstanding: Money = state
            .ledger
            .matching_records(student_id, fee_type)
            .iter()
            .map(FeeRecord::outstanding)
            .sum();
        if outstanding.is_zero() {
            return Err(FeeError::NoOutstandingBalance {
                student_id,
                fee_type: fee_type.clone(),
            });
        }

        let suggested = state
            .roster
            .get(&student_id)
            .and_then(|class_id| state.configurations.resolve_for_class(class_id, fee_type))
            .map(|config| config.suggested_amount())
            .filter(|amount| amount.is_positive());

        Ok(suggested.unwrap_or(outstanding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClassScope, FeeFrequency, PaymentMode};
    use chrono::{Datelike, Duration, NaiveDate, TimeZone, Utc};
    use hourglass_rs::TimeSource;

    const IST: i32 = 330; // UTC+5:30

    fn test_time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2026, 4, 5, 9, 0, 0).unwrap(),
        ))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn school(time: &SafeTimeProvider) -> (FeeEngine, TenantId) {
        let engine = FeeEngine::new();
        let tenant = Uuid::new_v4();
        engine.register_tenant(tenant, IST, time).unwrap();
        (engine, tenant)
    }

    fn tuition(amount: i64, due: NaiveDate, scope: ClassScope, time: &SafeTimeProvider) -> FeeConfiguration {
        FeeConfiguration::new(
            FeeType::from("tuition"),
            Money::from_major(amount),
            FeeFrequency::Monthly,
            due,
            scope,
            time.now(),
        )
    }

    fn pay(student_id: StudentId, amount: i64) -> PaymentRequest {
        PaymentRequest {
            student_id,
            fee_type: FeeType::from("tuition"),
            amount: Money::from_major(amount),
            mode: PaymentMode::Cash,
            transaction_id: None,
            remarks: None,
        }
    }

    #[test]
    fn test_single_payment_pending_only() {
        let time = test_time();
        let (engine, tenant) = school(&time);
        let student = Uuid::new_v4();
        engine.enroll_student(tenant, student, "10-A".to_string(), &time).unwrap();
        engine
            .create_fee_configuration(tenant, tuition(5000, date(2026, 4, 30), ClassScope::All, &time), &time)
            .unwrap();

        let receipt = engine.create_payment(tenant, pay(student, 3000), &time).unwrap();

        assert_eq!(receipt.allocation.pending_applied, Money::from_major(3000));
        assert_eq!(receipt.allocation.overdue_applied, Money::ZERO);
        assert_eq!(receipt.allocation.unapplied, Money::ZERO);
        assert_eq!(receipt.payment.receipt_no.to_string(), "RCP2026-000001");

        // the snapshot returned is the post-write state, no second read needed
        assert_eq!(receipt.dashboard_stats.total_fees, Money::from_major(5000));
        assert_eq!(receipt.dashboard_stats.collected, Money::from_major(3000));
        assert_eq!(receipt.dashboard_stats.pending, Money::from_major(2000));
        assert_eq!(receipt.dashboard_stats.payments_today, 1);
        assert_eq!(receipt.dashboard_stats.todays_collection, Money::from_major(3000));

        let records = engine.student_fees(tenant, student).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pending_amount, Money::from_major(2000));
        assert_eq!(records[0].paid_amount, Money::from_major(3000));
        assert!(records[0].is_balanced());
    }

    #[test]
    fn test_overdue_retired_before_pending() {
        let time = test_time();
        let (engine, tenant) = school(&time);
        let student = Uuid::new_v4();
        engine.enroll_student(tenant, student, "10-A".to_string(), &time).unwrap();
        // march term is already past due, may term is still pending
        engine
            .create_fee_configuration(tenant, tuition(2000, date(2026, 3, 10), ClassScope::All, &time), &time)
            .unwrap();
        engine
            .create_fee_configuration(tenant, tuition(3000, date(2026, 5, 10), ClassScope::All, &time), &time)
            .unwrap();
        assert_eq!(engine.apply_late_fees(tenant, &time).unwrap(), 1);

        let receipt = engine.create_payment(tenant, pay(student, 4000), &time).unwrap();

        assert_eq!(receipt.allocation.overdue_applied, Money::from_major(2000));
        assert_eq!(receipt.allocation.pending_applied, Money::from_major(2000));
        assert_eq!(receipt.allocation.unapplied, Money::ZERO);
        assert_eq!(receipt.dashboard_stats.overdue, Money::ZERO);
        assert_eq!(receipt.dashboard_stats.pending, Money::from_major(1000));

        let records = engine.student_fees(tenant, student).unwrap();
        let march: Vec<_> = records.iter().filter(|r| r.due_date == date(2026, 3, 10)).collect();
        assert!(march[0].is_settled());
    }

    #[test]
    fn test_overpayment_reported_not_discarded() {
        let time = test_time();
        let (engine, tenant) = school(&time);
        let student = Uuid::new_v4();
        engine.enroll_student(tenant, student, "10-A".to_string(), &time).unwrap();
        engine
            .create_fee_configuration(tenant, tuition(1000, date(2026, 3, 10), ClassScope::All, &time), &time)
            .unwrap();
        engine
            .create_fee_configuration(tenant, tuition(1000, date(2026, 5, 10), ClassScope::All, &time), &time)
            .unwrap();
        engine.apply_late_fees(tenant, &time).unwrap();
        engine.take_events(tenant).unwrap();

        let receipt = engine.create_payment(tenant, pay(student, 5000), &time).unwrap();

        assert_eq!(receipt.allocation.overdue_applied, Money::from_major(1000));
        assert_eq!(receipt.allocation.pending_applied, Money::from_major(1000));
        assert_eq!(receipt.allocation.unapplied, Money::from_major(3000));
        assert!(receipt.payment.is_balanced());

        // the retained overpayment is surfaced through the audit trail too
        let events = engine.take_events(tenant).unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::OverpaymentRetained { unapplied, .. }
                if *unapplied == Money::from_major(3000))));

        // nothing was silently folded back into the ledger
        assert_eq!(receipt.dashboard_stats.collected, Money::from_major(2000));
        assert_eq!(receipt.dashboard_stats.total_fees, Money::from_major(2000));
        assert_eq!(receipt.dashboard_stats.todays_collection, Money::from_major(5000));
    }

    #[test]
    fn test_bulk_partial_failure_excluded_from_totals() {
        let time = test_time();
        let (engine, tenant) = school(&time);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        engine.enroll_student(tenant, a, "10-A".to_string(), &time).unwrap();
        engine.enroll_student(tenant, b, "10-A".to_string(), &time).unwrap();
        engine.enroll_student(tenant, c, "10-B".to_string(), &time).unwrap();
        // scoped to 10-A only: student c never gets a fee record
        engine
            .create_fee_configuration(
                tenant,
                tuition(1000, date(2026, 4, 30), ClassScope::Class("10-A".to_string()), &time),
                &time,
            )
            .unwrap();

        let outcome = engine
            .create_bulk_payment(
                tenant,
                BulkPaymentRequest {
                    student_ids: vec![a, c, b],
                    fee_type: FeeType::from("tuition"),
                    mode: PaymentMode::Upi,
                    transaction_id: Some("BULK-1".to_string()),
                    remarks: None,
                },
                &time,
            )
            .unwrap();

        assert_eq!(outcome.payments_count, 2);
        assert_eq!(outcome.failed_count(), 1);
        assert_eq!(outcome.total_amount, Money::from_major(2000));

        let failure = outcome.failures().next().unwrap();
        assert_eq!(failure.student_id(), c);
        match failure {
            crate::bulk::StudentCollection::Failed { error, .. } => {
                assert!(matches!(error, FeeError::NoOutstandingBalance { .. }));
            }
            _ => panic!("expected failure entry"),
        }

        // one consistent snapshot for the whole batch
        assert_eq!(outcome.dashboard_stats.collected, Money::from_major(2000));
        assert_eq!(outcome.dashboard_stats.payments_today, 2);

        // receipts are distinct and strictly increasing
        let receipts: Vec<_> = outcome
            .results
            .iter()
            .filter_map(|r| match r {
                crate::bulk::StudentCollection::Collected { payment } => Some(payment.receipt_no),
                _ => None,
            })
            .collect();
        assert_eq!(receipts.len(), 2);
        assert!(receipts[0] < receipts[1]);
    }

    #[test]
    fn test_bulk_empty_fails_fast() {
        let time = test_time();
        let (engine, tenant) = school(&time);

        let result = engine.create_bulk_payment(
            tenant,
            BulkPaymentRequest {
                student_ids: vec![],
                fee_type: FeeType::from("tuition"),
                mode: PaymentMode::Cash,
                transaction_id: None,
                remarks: None,
            },
            &time,
        );
        assert!(matches!(result, Err(FeeError::NoStudentsSelected)));
    }

    #[test]
    fn test_concurrent_payments_never_double_apply() {
        let time = test_time();
        let (engine, tenant) = school(&time);
        let student = Uuid::new_v4();
        engine.enroll_student(tenant, student, "10-A".to_string(), &time).unwrap();
        engine
            .create_fee_configuration(tenant, tuition(1500, date(2026, 4, 30), ClassScope::All, &time), &time)
            .unwrap();

        // two concurrent payments of 1000 against a single 1500 balance
        let outcomes: Vec<PaymentReceipt> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let engine = &engine;
                    scope.spawn(move || {
                        let time = test_time();
                        engine.create_payment(tenant, pay(student, 1000), &time).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let applied: Money = outcomes.iter().map(|o| o.allocation.total_applied()).sum();
        let unapplied: Money = outcomes.iter().map(|o| o.allocation.unapplied).sum();
        assert_eq!(applied, Money::from_major(1500));
        assert_eq!(unapplied, Money::from_major(500));

        // whichever commit order, one payment applied fully and one partially
        let mut portions: Vec<Money> = outcomes.iter().map(|o| o.allocation.total_applied()).collect();
        portions.sort();
        assert_eq!(portions, vec![Money::from_major(500), Money::from_major(1000)]);

        assert_ne!(outcomes[0].payment.receipt_no, outcomes[1].payment.receipt_no);

        let records = engine.student_fees(tenant, student).unwrap();
        assert!(records[0].is_settled());
        assert!(records[0].is_balanced());
        assert_eq!(engine.dashboard(tenant, &time).unwrap().collected, Money::from_major(1500));
    }

    #[test]
    fn test_invalid_amount_rejected_before_any_write() {
        let time = test_time();
        let (engine, tenant) = school(&time);
        let student = Uuid::new_v4();
        engine.enroll_student(tenant, student, "10-A".to_string(), &time).unwrap();
        engine
            .create_fee_configuration(tenant, tuition(5000, date(2026, 4, 30), ClassScope::All, &time), &time)
            .unwrap();

        let result = engine.create_payment(tenant, pay(student, 0), &time);
        assert!(matches!(result, Err(FeeError::InvalidPaymentAmount { .. })));

        assert!(engine.recent_payments(tenant, 10).unwrap().is_empty());
        // validation precedes receipt issuance, so the sequence has no gap
        let receipt = engine.create_payment(tenant, pay(student, 100), &time).unwrap();
        assert_eq!(receipt.payment.receipt_no.sequence, 1);
    }

    #[test]
    fn test_no_outstanding_payment_recorded_fully_unapplied() {
        let time = test_time();
        let (engine, tenant) = school(&time);
        let student = Uuid::new_v4();
        engine.enroll_student(tenant, student, "10-A".to_string(), &time).unwrap();

        // no configuration, no fee records: recorded, surfaced, not dropped
        let receipt = engine.create_payment(tenant, pay(student, 500), &time).unwrap();

        assert_eq!(receipt.allocation.unapplied, Money::from_major(500));
        assert_eq!(receipt.allocation.total_applied(), Money::ZERO);
        assert_eq!(engine.recent_payments(tenant, 10).unwrap().len(), 1);
        assert_eq!(receipt.dashboard_stats.collected, Money::ZERO);
        assert_eq!(receipt.dashboard_stats.todays_collection, Money::from_major(500));
    }

    #[test]
    fn test_incremental_snapshot_matches_full_recompute() {
        let time = test_time();
        let (engine, tenant) = school(&time);
        let student = Uuid::new_v4();
        engine.enroll_student(tenant, student, "10-A".to_string(), &time).unwrap();
        engine
            .create_fee_configuration(tenant, tuition(9000, date(2026, 4, 30), ClassScope::All, &time), &time)
            .unwrap();

        let mut last_snapshot = None;
        for amount in [2000i64, 3000, 1500] {
            let receipt = engine.create_payment(tenant, pay(student, amount), &time).unwrap();
            last_snapshot = Some(receipt.dashboard_stats);
        }

        // the incrementally maintained snapshot equals a full recomputation
        let full = engine.dashboard(tenant, &time).unwrap();
        assert_eq!(last_snapshot.unwrap(), full);
    }

    #[test]
    fn test_day_rollover_resets_today_counters() {
        let time = test_time();
        let controller = time.test_control().unwrap();
        let (engine, tenant) = school(&time);
        let student = Uuid::new_v4();
        engine.enroll_student(tenant, student, "10-A".to_string(), &time).unwrap();
        engine
            .create_fee_configuration(tenant, tuition(9000, date(2026, 5, 30), ClassScope::All, &time), &time)
            .unwrap();

        let first = engine.create_payment(tenant, pay(student, 2000), &time).unwrap();
        assert_eq!(first.dashboard_stats.payments_today, 1);

        controller.advance(Duration::days(1));
        let second = engine.create_payment(tenant, pay(student, 500), &time).unwrap();

        assert_eq!(second.dashboard_stats.payments_today, 1);
        assert_eq!(second.dashboard_stats.todays_collection, Money::from_major(500));
        assert_eq!(second.dashboard_stats.collected, Money::from_major(2500));
        assert_eq!(second.dashboard_stats, engine.dashboard(tenant, &time).unwrap());
    }

    #[test]
    fn test_late_fee_rolls_once_and_preserves_conservation() {
        let time = test_time();
        let (engine, tenant) = school(&time);
        let student = Uuid::new_v4();
        engine.enroll_student(tenant, student, "10-A".to_string(), &time).unwrap();
        let config = tuition(1000, date(2026, 3, 10), ClassScope::All, &time)
            .with_late_fee(Money::from_major(200));
        engine.create_fee_configuration(tenant, config, &time).unwrap();

        assert_eq!(engine.apply_late_fees(tenant, &time).unwrap(), 1);

        let records = engine.student_fees(tenant, student).unwrap();
        assert_eq!(records[0].total_amount, Money::from_major(1200));
        assert_eq!(records[0].overdue_amount, Money::from_major(1200));
        assert_eq!(records[0].pending_amount, Money::ZERO);
        assert!(records[0].is_balanced());

        let dashboard = engine.dashboard(tenant, &time).unwrap();
        assert_eq!(dashboard.total_fees, Money::from_major(1200));
        assert_eq!(dashboard.overdue, Money::from_major(1200));

        // a second run finds nothing left to roll
        assert_eq!(engine.apply_late_fees(tenant, &time).unwrap(), 0);
    }

    #[test]
    fn test_settings_passed_through_unchanged() {
        let time = test_time();
        let (engine, tenant) = school(&time);
        let student = Uuid::new_v4();
        engine.enroll_student(tenant, student, "10-A".to_string(), &time).unwrap();
        engine
            .create_fee_configuration(tenant, tuition(5000, date(2026, 4, 30), ClassScope::All, &time), &time)
            .unwrap();

        engine
            .update_dashboard_settings(
                tenant,
                DashboardSettings {
                    pending_approvals: 7,
                    monthly_target: Money::from_major(250_000),
                },
            )
            .unwrap();

        let dashboard = engine.dashboard(tenant, &time).unwrap();
        assert_eq!(dashboard.pending_approvals, 7);
        assert_eq!(dashboard.monthly_target, Money::from_major(250_000));

        let receipt = engine.create_payment(tenant, pay(student, 1000), &time).unwrap();
        assert_eq!(receipt.dashboard_stats.pending_approvals, 7);
        assert_eq!(receipt.dashboard_stats.monthly_target, Money::from_major(250_000));
    }

    #[test]
    fn test_class_specific_configuration_wins() {
        let time = test_time();
        let (engine, tenant) = school(&time);
        let in_a = Uuid::new_v4();
        let in_b = Uuid::new_v4();
        engine.enroll_student(tenant, in_a, "10-A".to_string(), &time).unwrap();
        engine.enroll_student(tenant, in_b, "10-B".to_string(), &time).unwrap();

        engine
            .create_fee_configuration(tenant, tuition(5000, date(2026, 4, 30), ClassScope::All, &time), &time)
            .unwrap();
        engine
            .create_fee_configuration(
                tenant,
                tuition(4500, date(2026, 4, 30), ClassScope::Class("10-A".to_string()), &time),
                &time,
            )
            .unwrap();

        assert_eq!(
            engine.suggested_amount(tenant, in_a, &FeeType::from("tuition")).unwrap(),
            Money::from_major(4500)
        );
        assert_eq!(
            engine.suggested_amount(tenant, in_b, &FeeType::from("tuition")).unwrap(),
            Money::from_major(5000)
        );

        let unknown = Uuid::new_v4();
        assert!(matches!(
            engine.suggested_amount(tenant, unknown, &FeeType::from("tuition")),
            Err(FeeError::UnknownStudent { .. })
        ));
    }

    #[test]
    fn test_delete_configuration_keeps_materialized_records() {
        let time = test_time();
        let (engine, tenant) = school(&time);
        let student = Uuid::new_v4();
        engine.enroll_student(tenant, student, "10-A".to_string(), &time).unwrap();
        let created = engine
            .create_fee_configuration(tenant, tuition(5000, date(2026, 4, 30), ClassScope::All, &time), &time)
            .unwrap();

        engine.delete_fee_configuration(tenant, created.config_id, &time).unwrap();

        let records = engine.student_fees(tenant, student).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_amount, Money::from_major(5000));
        assert!(engine
            .list_configurations(tenant, &FeeType::from("tuition"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_export_import_continues_receipt_sequence() {
        let time = test_time();
        let (engine, tenant) = school(&time);
        let student = Uuid::new_v4();
        engine.enroll_student(tenant, student, "10-A".to_string(), &time).unwrap();
        engine
            .create_fee_configuration(tenant, tuition(5000, date(2026, 4, 30), ClassScope::All, &time), &time)
            .unwrap();
        engine.create_payment(tenant, pay(student, 1000), &time).unwrap();

        let json = engine.export_state(tenant).unwrap();

        let restored = FeeEngine::new();
        let restored_tenant = restored.import_state(&json).unwrap();
        assert_eq!(restored_tenant, tenant);

        // the sequence continues instead of repeating
        let receipt = restored.create_payment(tenant, pay(student, 500), &time).unwrap();
        assert_eq!(receipt.payment.receipt_no.sequence, 2);

        assert_eq!(
            restored.dashboard(tenant, &time).unwrap().collected,
            Money::from_major(1500)
        );
    }

    #[test]
    fn test_unknown_tenant_rejected() {
        let time = test_time();
        let engine = FeeEngine::new();

        let result = engine.create_payment(Uuid::new_v4(), pay(Uuid::new_v4(), 100), &time);
        assert!(matches!(result, Err(FeeError::UnknownTenant { .. })));
    }

    #[test]
    fn test_recent_payments_newest_first() {
        let time = test_time();
        let (engine, tenant) = school(&time);
        let student = Uuid::new_v4();
        engine.enroll_student(tenant, student, "10-A".to_string(), &time).unwrap();
        engine
            .create_fee_configuration(tenant, tuition(9000, date(2026, 4, 30), ClassScope::All, &time), &time)
            .unwrap();

        for amount in [1000i64, 2000, 3000] {
            engine.create_payment(tenant, pay(student, amount), &time).unwrap();
        }

        let recent = engine.recent_payments(tenant, 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].amount, Money::from_major(3000));
        assert_eq!(recent[1].amount, Money::from_major(2000));

        // receipt year comes from the tenant-local calendar
        assert_eq!(recent[0].receipt_no.year, time.now().year());
    }
}
