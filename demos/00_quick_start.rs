/// quick start - minimal example to get started
use fee_engine_rs::{
    ClassScope, FeeConfiguration, FeeEngine, FeeFrequency, FeeType, Money, PaymentMode,
    PaymentRequest, SafeTimeProvider, TimeSource, Uuid,
};
use fee_engine_rs::chrono::NaiveDate;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::System);
    let engine = FeeEngine::new();

    // one school at UTC+5:30
    let school = Uuid::new_v4();
    engine.register_tenant(school, 330, &time)?;

    // enroll a student and define the tuition fee for every class
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

    // collect a partial payment
    let receipt = engine.create_payment(
        school,
        PaymentRequest {
            student_id: student,
            fee_type: FeeType::from("tuition"),
            amount: Money::from_major(3000),
            mode: PaymentMode::Upi,
            transaction_id: Some("TXN-1001".to_string()),
            remarks: Some("april tuition".to_string()),
        },
        &time,
    )?;

    println!("receipt:  {}", receipt.payment.receipt_no);
    println!("applied:  {}", receipt.allocation.total_applied());
    println!("pending:  {}", receipt.dashboard_stats.pending);
    println!("collected today: {}", receipt.dashboard_stats.todays_collection);

    Ok(())
}
