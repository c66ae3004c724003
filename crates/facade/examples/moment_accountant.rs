use dp_table::prelude::*;

fn main() -> Result<()> {
    let num_examples = 60_000.0;
    let batch_size = 600.0;
    let target_delta = 1e-5;

    let mut tracker = MomentPrivacyBudgetTracker::new(PrivacyBudget::new(8.0, 1e-4)?);
    for steps in [1_000u64, 10_000, 40_000] {
        let query = MomentQuery::new(
            batch_size / num_examples,
            4.0,
            steps,
            MomentTarget::Delta(target_delta),
        );
        let spent = tracker.privacy_spent(&query)?;
        println!("{steps:>6} steps -> {spent}");
    }

    let run = MomentQuery::new(batch_size / num_examples, 4.0, 10_000, MomentTarget::Delta(target_delta));
    tracker.update_privacy_loss(&run)?;
    println!(
        "consumed {} of {}",
        tracker.consumed_privacy_budget(),
        tracker.total_privacy_budget()
    );
    Ok(())
}
