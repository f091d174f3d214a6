/// json state - export a tenant, restore it, and keep the receipt sequence
use fee_engine_rs::{
    ClassScope, FeeConfiguration, FeeEngine, FeeFrequency, FeeType, Money, PaymentMode,
    PaymentRequest, SafeTimeProvider, TimeSource, Uuid,
};
use fee_engine_rs::chrono::NaiveDate;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::System);
    let engine = FeeEngine::new();

    let school = Uuid::new_v4();
    engine.register_tenant(school, 0, &time)?;

    let student = Uuid::new_v4();
    engine.enroll_student(school, student, "10-A".to_string(), &time)?;
    engine.create_fee_configuration(
        school,
        FeeConfiguration::new(
            FeeType::from("tuition"),
            Money::from_major(5000),
            FeeFrequency::Monthly,
            NaiveDate::from_ymd_opt(2026, 4, 30).unwrap(),
            ClassScope::All,
            time.now(),
        ),
        &time,
    )?;

    let pay = |amount: i64| PaymentRequest {
        student_id: student,
        fee_type: FeeType::from("tuition"),
        amount: Money::from_major(amount),
        mode: PaymentMode::BankTransfer,
        transaction_id: None,
        remarks: None,
    };

    let first = engine.create_payment(school, pay(2000), &time)?;
    println!("first receipt:    {}", first.payment.receipt_no);

    // snapshot the whole tenant as json
    let json = engine.export_state(school)?;
    println!("state size:       {} bytes", json.len());

    // restore into a fresh engine; the sequence continues, never repeats
    let restored = FeeEngine::new();
    restored.import_state(&json)?;

    let second = restored.create_payment(school, pay(1000), &time)?;
    println!("after restore:    {}", second.payment.receipt_no);
    println!("collected total:  {}", second.dashboard_stats.collected);

    Ok(())
}
