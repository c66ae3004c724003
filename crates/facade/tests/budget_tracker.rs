use dp_table::prelude::*;

fn budget(epsilon: f64, delta: f64) -> PrivacyBudget {
    PrivacyBudget::new(epsilon, delta).unwrap()
}

#[test]
fn advanced_composition_exceeds_naive_doubling_for_unit_epsilon() {
    let requested = budget(1.0, 0.0);
    let mut tracker = AdvancedPrivacyBudgetTracker::new(budget(100.0, 1.0));
    let cost = tracker.update_privacy_loss(&requested, 0.5, 2).unwrap();

    let expected = (2.0 * 2.0 * 2.0f64.ln()).sqrt() + 2.0 * (1.0f64.exp() - 1.0);
    assert!((cost.epsilon() - expected).abs() < 1e-12);
    assert_eq!(cost.delta(), 0.5);
    assert!(cost.epsilon() > simple_composition(&requested, 2).epsilon());
}

#[test]
fn simple_tracker_sequence_past_total() {
    let total = budget(3.0, 0.5);
    let mut tracker = SimplePrivacyBudgetTracker::new(total);
    let requests = [budget(1.0, 0.125), budget(1.0, 0.125), budget(1.0, 0.375)];

    tracker.update_privacy_loss(&requests[0]).unwrap();
    tracker.update_privacy_loss(&requests[1]).unwrap();
    let before = tracker.consumed_privacy_budget();
    assert!(matches!(
        tracker.update_privacy_loss(&requests[2]),
        Err(DpError::BudgetExhausted { .. })
    ));
    assert_eq!(tracker.consumed_privacy_budget(), before);
    assert_eq!(before, combine_privacy_losses(&requests[..2]));
}

#[test]
fn moment_accountant_charges_a_training_run() {
    // 60k examples, batches of 600, 10k noisy steps.
    let num_examples = 60_000.0;
    let group_size = 600.0;
    let target_delta = 0.5 / num_examples;
    let query = MomentQuery::new(
        group_size / num_examples,
        4.0,
        10_000,
        MomentTarget::Delta(target_delta),
    )
    .with_moment_order(32);

    let mut tracker = MomentTrackerConfig::default()
        .create_tracker(budget(8.0, 1e-4))
        .unwrap();
    let cost = tracker
        .update_privacy_loss(&PrivacyLoss::Iterative(query.clone()))
        .unwrap();
    assert!(cost.epsilon() > 0.0 && cost.epsilon() < 8.0);
    assert_eq!(cost.delta(), target_delta);
    assert_eq!(tracker.consumed_privacy_budget(), cost);

    // Simple composition of 10k steps at the same per-step epsilon would not fit.
    let per_step = get_privacy_spent(
        &log_moments(group_size / num_examples, 4.0, 1, 32),
        MomentTarget::Delta(target_delta),
    )
    .unwrap();
    assert!(per_step.scaled(10_000).epsilon() > cost.epsilon());
}

#[test]
fn moment_target_epsilon_solves_delta() {
    let mut tracker = MomentPrivacyBudgetTracker::new(budget(2.0, 1e-3));
    let query = MomentQuery::new(0.01, 4.0, 1_000, MomentTarget::Epsilon(1.0));
    let cost = tracker.update_privacy_loss(&query).unwrap();
    assert_eq!(cost.epsilon(), 1.0);
    assert!(cost.delta() > 0.0 && cost.delta() < 1e-3);
}
