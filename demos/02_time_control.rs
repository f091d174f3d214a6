/// time control - deterministic testing with controlled time
use fee_engine_rs::{
    ClassScope, FeeConfiguration, FeeEngine, FeeFrequency, FeeType, Money, PaymentMode,
    PaymentRequest, SafeTimeProvider, TimeSource, Uuid,
};
use fee_engine_rs::chrono::{Duration, NaiveDate, TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== time control example ===\n");

    // create controlled time for testing
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let engine = FeeEngine::new();
    let school = Uuid::new_v4();
    engine.register_tenant(school, 330, &time)?;

    let student = Uuid::new_v4();
    engine.enroll_student(school, student, "10-A".to_string(), &time)?;

    // transport fee due on april 10, with a flat late fee
    engine.create_fee_configuration(
        school,
        FeeConfiguration::new(
            FeeType::from("transport"),
            Money::from_major(1500),
            FeeFrequency::Monthly,
            NaiveDate::from_ymd_opt(2026, 4, 10).unwrap(),
            ClassScope::All,
            time.now(),
        )
        .with_late_fee(Money::from_major(100)),
        &time,
    )?;

    println!("starting date: {}", time.now().format("%Y-%m-%d"));

    // advance past the due date
    controller.advance(Duration::days(15));
    println!("advanced to:   {}", time.now().format("%Y-%m-%d"));

    let rolled = engine.apply_late_fees(school, &time)?;
    println!("records rolled overdue: {}", rolled);

    let fees = engine.student_fees(school, student)?;
    println!("overdue balance (with late fee): {}", fees[0].overdue_amount);

    // the payment retires overdue before anything else
    let receipt = engine.create_payment(
        school,
        PaymentRequest {
            student_id: student,
            fee_type: FeeType::from("transport"),
            amount: Money::from_major(1600),
            mode: PaymentMode::Cash,
            transaction_id: None,
            remarks: None,
        },
        &time,
    )?;

    println!("overdue applied: {}", receipt.allocation.overdue_applied);
    println!("receipt: {}", receipt.payment.receipt_no);
    println!("school overdue now: {}", receipt.dashboard_stats.overdue);

    Ok(())
}
