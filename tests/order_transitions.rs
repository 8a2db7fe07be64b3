use agrilink_api::error::AppError;
use agrilink_api::services::order_service::{OrderActor, validate_transition};

const STATES: [&str; 6] = [
    "pending",
    "accepted",
    "rejected",
    "delivered",
    "cancelled",
    "disputed",
];

#[test]
fn farmer_can_accept_or_reject_pending() {
    assert!(validate_transition("pending", "accepted", OrderActor::Farmer).is_ok());
    assert!(validate_transition("pending", "rejected", OrderActor::Farmer).is_ok());
}

#[test]
fn buyer_can_deliver_accepted_only() {
    assert!(validate_transition("accepted", "delivered", OrderActor::Buyer).is_ok());

    // A never-accepted order cannot be marked delivered.
    assert!(matches!(
        validate_transition("pending", "delivered", OrderActor::Buyer),
        Err(AppError::InvalidTransition(_))
    ));
}

#[test]
fn terminal_states_admit_no_transitions() {
    for terminal in ["rejected", "delivered"] {
        for target in STATES {
            for actor in [OrderActor::Farmer, OrderActor::Buyer] {
                assert!(
                    validate_transition(terminal, target, actor).is_err(),
                    "expected {terminal} -> {target} to be rejected"
                );
            }
        }
    }
}

#[test]
fn farmer_cannot_deliver_and_buyer_cannot_accept() {
    assert!(validate_transition("pending", "delivered", OrderActor::Farmer).is_err());
    assert!(validate_transition("accepted", "delivered", OrderActor::Farmer).is_err());
    assert!(validate_transition("pending", "accepted", OrderActor::Buyer).is_err());
    assert!(validate_transition("pending", "rejected", OrderActor::Buyer).is_err());
}

// Exhaustive sweep: the only allowed edges are the three above.
#[test]
fn transition_table_is_exactly_three_edges() {
    let mut allowed = Vec::new();
    for current in STATES {
        for target in STATES {
            for (actor, tag) in [(OrderActor::Farmer, "farmer"), (OrderActor::Buyer, "buyer")] {
                if validate_transition(current, target, actor).is_ok() {
                    allowed.push((current, target, tag));
                }
            }
        }
    }
    allowed.sort();
    assert_eq!(
        allowed,
        vec![
            ("accepted", "delivered", "buyer"),
            ("pending", "accepted", "farmer"),
            ("pending", "rejected", "farmer"),
        ]
    );
}

#[test]
fn unknown_status_values_are_rejected() {
    assert!(validate_transition("pending", "shipped", OrderActor::Farmer).is_err());
    assert!(validate_transition("shipped", "delivered", OrderActor::Buyer).is_err());
}
