//! # Lifecycle Validator Property Tests
//!
//! Property-based checks of the raw-string validators and normalization
//! helpers over arbitrary inputs: members, legacy spellings, empty
//! strings, absent values and garbage.

use concierge_state::{
    normalize_case_status, normalize_stage_status, validate_case_transition,
    validate_stage_transition, CaseStatus, StageStatus,
};
use proptest::prelude::*;

fn case_member() -> impl Strategy<Value = CaseStatus> {
    prop::sample::select(CaseStatus::ALL.to_vec())
}

fn stage_member() -> impl Strategy<Value = StageStatus> {
    prop::sample::select(StageStatus::ALL.to_vec())
}

fn member_name() -> impl Strategy<Value = String> {
    prop_oneof![
        case_member().prop_map(|s| s.as_str().to_string()),
        stage_member().prop_map(|s| s.as_str().to_string()),
    ]
}

/// Members, near-misses and arbitrary strings, sometimes absent.
fn raw_value() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop_oneof![
        4 => member_name(),
        1 => member_name().prop_map(|s| s.to_lowercase()),
        1 => Just(String::new()),
        2 => "[A-Za-z_ ]{0,24}",
    ])
}

proptest! {
    /// Every member may transition to itself.
    #[test]
    fn self_transition_always_allowed(c in case_member(), s in stage_member()) {
        prop_assert!(validate_case_transition(Some(c.as_str()), Some(c.as_str())).is_ok());
        prop_assert!(validate_stage_transition(Some(s.as_str()), Some(s.as_str())).is_ok());
    }

    /// Equal raw values are a no-op even when unrecognized.
    #[test]
    fn equal_raw_values_are_noop(value in "[A-Za-z_]{1,24}") {
        prop_assert!(validate_case_transition(Some(value.as_str()), Some(value.as_str())).is_ok());
        prop_assert!(validate_stage_transition(Some(value.as_str()), Some(value.as_str())).is_ok());
    }

    /// An absent or empty side skips validation.
    #[test]
    fn empty_input_is_permissive(value in raw_value()) {
        let v = value.as_deref();
        for empty in [None, Some("")] {
            prop_assert!(validate_case_transition(v, empty).is_ok());
            prop_assert!(validate_case_transition(empty, v).is_ok());
            prop_assert!(validate_stage_transition(v, empty).is_ok());
            prop_assert!(validate_stage_transition(empty, v).is_ok());
        }
    }

    /// Raw validation of two members agrees with the typed graph, and a
    /// rejection names both values.
    #[test]
    fn raw_agrees_with_graph(from in case_member(), to in case_member()) {
        let result = validate_case_transition(Some(from.as_str()), Some(to.as_str()));
        prop_assert_eq!(result.is_ok(), from.can_transition_to(to));
        if let Err(err) = result {
            prop_assert_eq!(err.current.as_str(), from.as_str());
            prop_assert_eq!(err.next.as_str(), to.as_str());
        }
    }

    /// An unrecognized value on either side fails unless the two are equal
    /// or the other side is empty.
    #[test]
    fn unknown_values_are_rejected(member in stage_member(), garbage in "[a-z]{3,12}") {
        let err = validate_stage_transition(Some(member.as_str()), Some(garbage.as_str())).unwrap_err();
        prop_assert_eq!(err.next.as_str(), garbage.as_str());
        prop_assert!(validate_stage_transition(Some(garbage.as_str()), Some(member.as_str())).is_err());
    }

    /// Normalization returns members unchanged and everything else as the
    /// initial status.
    #[test]
    fn normalization_is_total(value in raw_value()) {
        let v = value.as_deref();
        let case = normalize_case_status(v);
        let stage = normalize_stage_status(v);
        match v.and_then(CaseStatus::from_name) {
            Some(member) => prop_assert_eq!(case, member),
            None => prop_assert_eq!(case, CaseStatus::Submitted),
        }
        match v.and_then(StageStatus::from_name) {
            Some(member) => prop_assert_eq!(stage, member),
            None => prop_assert_eq!(stage, StageStatus::Pending),
        }
    }

    /// Normalizing a normalized value changes nothing.
    #[test]
    fn normalization_is_idempotent(value in raw_value()) {
        let once = normalize_case_status(value.as_deref());
        prop_assert_eq!(normalize_case_status(Some(once.as_str())), once);
        let once = normalize_stage_status(value.as_deref());
        prop_assert_eq!(normalize_stage_status(Some(once.as_str())), once);
    }

    /// Repeated validation produces the same outcome.
    #[test]
    fn validation_is_repeatable(current in raw_value(), next in raw_value()) {
        let (c, n) = (current.as_deref(), next.as_deref());
        prop_assert_eq!(validate_case_transition(c, n), validate_case_transition(c, n));
        prop_assert_eq!(validate_stage_transition(c, n), validate_stage_transition(c, n));
    }
}

// =========================================================================
// Concrete scenarios
// =========================================================================

#[test]
fn direct_edge_to_payment_pending() {
    assert!(validate_case_transition(Some("SUBMITTED"), Some("PAYMENT_PENDING")).is_ok());
}

#[test]
fn payment_pending_cannot_revert() {
    let err = validate_case_transition(Some("PAYMENT_PENDING"), Some("SUBMITTED")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Illegal case transition: PAYMENT_PENDING -> SUBMITTED"
    );
}

#[test]
fn client_rejection_back_edge() {
    assert!(
        validate_case_transition(Some("AWAITING_CLIENT_APPROVAL"), Some("UNDER_REVIEW")).is_ok()
    );
}

#[test]
fn pending_stage_may_start_directly() {
    assert!(validate_stage_transition(Some("PENDING"), Some("IN_PROGRESS")).is_ok());
}

#[test]
fn payment_must_be_submitted_before_paid() {
    let err = validate_stage_transition(Some("AWAITING_PAYMENT"), Some("PAID")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Illegal stage transition: AWAITING_PAYMENT -> PAID"
    );
}

#[test]
fn normalization_examples() {
    assert_eq!(normalize_stage_status(Some("bogus")), StageStatus::Pending);
    assert_eq!(normalize_case_status(Some("CLOSED")), CaseStatus::Closed);
}
