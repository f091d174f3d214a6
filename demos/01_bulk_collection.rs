/// bulk collection - one coordinated operation across a set of students
use fee_engine_rs::{
    BulkPaymentRequest, ClassScope, FeeConfiguration, FeeEngine, FeeFrequency, FeeType, Money,
    PaymentMode, SafeTimeProvider, StudentCollection, TimeSource, Uuid,
};
use fee_engine_rs::chrono::NaiveDate;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::System);
    let engine = FeeEngine::new();

    let school = Uuid::new_v4();
    engine.register_tenant(school, 330, &time)?;

    // two students in 10-A, one in 10-B
    let students: Vec<_> = (0..3).map(|_| Uuid::new_v4()).collect();
    engine.enroll_student(school, students[0], "10-A".to_string(), &time)?;
    engine.enroll_student(school, students[1], "10-A".to_string(), &time)?;
    engine.enroll_student(school, students[2], "10-B".to_string(), &time)?;

    // exam fee applies to 10-A only, so the 10-B student has no record
    engine.create_fee_configuration(
        school,
        FeeConfiguration::new(
            FeeType::from("exam"),
            Money::from_major(1000),
            FeeFrequency::OneTime,
            NaiveDate::from_ymd_opt(2026, 5, 15).unwrap(),
            ClassScope::Class("10-A".to_string()),
            time.now(),
        ),
        &time,
    )?;

    let outcome = engine.create_bulk_payment(
        school,
        BulkPaymentRequest {
            student_ids: students.clone(),
            fee_type: FeeType::from("exam"),
            mode: PaymentMode::Cash,
            transaction_id: None,
            remarks: Some("exam fee drive".to_string()),
        },
        &time,
    )?;

    println!("collected from {} of {} students", outcome.payments_count, students.len());
    println!("total applied: {}", outcome.total_amount);
    for result in &outcome.results {
        match result {
            StudentCollection::Collected { payment } => {
                println!("  {} -> {} ({})", payment.student_id, payment.amount, payment.receipt_no);
            }
            StudentCollection::Failed { student_id, error } => {
                println!("  {} -> failed: {}", student_id, error);
            }
        }
    }
    println!("school collected so far: {}", outcome.dashboard_stats.collected);

    Ok(())
}
