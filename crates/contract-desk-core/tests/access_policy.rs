// contract-desk-core/tests/access_policy.rs
// ============================================================================
// Module: Access Policy Tests
// Description: Rule-order and property tests for the access policy.
// Purpose: Pin every policy rule and its reason label.
// Dependencies: contract-desk-core, proptest
// ============================================================================

//! ## Overview
//! Exercises each access rule in evaluation order and checks the ownership
//! and admin properties across every role, action, and resource kind.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use contract_desk_core::AccessReason;
use contract_desk_core::Action;
use contract_desk_core::Actor;
use contract_desk_core::ResourceKind;
use contract_desk_core::ResourceRef;
use contract_desk_core::Role;
use contract_desk_core::UserId;
use contract_desk_core::can_perform;
use contract_desk_core::capabilities;
use proptest::prelude::*;

fn actor(id: i64, role: Role) -> Actor {
    Actor::new(UserId::new(id), role)
}

fn contract_owned_by(owner: i64) -> ResourceRef {
    ResourceRef::owned(ResourceKind::Contract, 10, Some(UserId::new(owner)))
}

fn role_strategy() -> impl Strategy<Value = Role> {
    prop::sample::select(Role::ALL.to_vec())
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop::sample::select(Action::ALL.to_vec())
}

fn kind_strategy() -> impl Strategy<Value = ResourceKind> {
    prop::sample::select(ResourceKind::ALL.to_vec())
}

#[test]
fn admin_rule_matches_first() {
    let decision = can_perform(&actor(1, Role::Admin), Action::ListAll, &contract_owned_by(2));
    assert!(decision.allowed);
    assert_eq!(decision.reason, AccessReason::AdminAllow);
}

#[test]
fn list_all_is_admin_only() {
    for role in [Role::Procurement, Role::Legal, Role::Finance] {
        let decision = can_perform(
            &actor(1, role),
            Action::ListAll,
            &ResourceRef::collection(ResourceKind::Template),
        );
        assert!(!decision.allowed);
        assert_eq!(decision.reason, AccessReason::ListAllAdminOnly);
    }
}

#[test]
fn template_writes_require_legal() {
    let template = ResourceRef::owned(ResourceKind::Template, 3, Some(UserId::new(9)));
    for action in [Action::Create, Action::Update, Action::Delete] {
        let legal = can_perform(&actor(1, Role::Legal), action, &template);
        assert!(legal.allowed);
        assert_eq!(legal.reason, AccessReason::TemplateWriteRequiresLegal);

        let procurement = can_perform(&actor(9, Role::Procurement), action, &template);
        assert!(!procurement.allowed, "template creator without legal role must be denied");
        assert_eq!(procurement.reason, AccessReason::TemplateWriteRequiresLegal);
    }
}

#[test]
fn templates_are_readable_by_everyone() {
    for role in Role::ALL {
        let decision = can_perform(
            &actor(5, role),
            Action::Read,
            &ResourceRef::collection(ResourceKind::Template),
        );
        assert!(decision.allowed);
    }
    let finance = can_perform(
        &actor(5, Role::Finance),
        Action::Read,
        &ResourceRef::collection(ResourceKind::Template),
    );
    assert_eq!(finance.reason, AccessReason::TemplateReadAllow);
}

#[test]
fn owners_may_act_on_their_contracts() {
    let owner = actor(4, Role::Finance);
    for action in [Action::Read, Action::Update, Action::Delete] {
        let decision = can_perform(&owner, action, &contract_owned_by(4));
        assert!(decision.allowed);
        assert_eq!(decision.reason, AccessReason::OwnerAllow);
    }
}

#[test]
fn non_owners_are_denied_even_as_legal() {
    let decision = can_perform(&actor(4, Role::Legal), Action::Read, &contract_owned_by(5));
    assert!(!decision.allowed);
    assert_eq!(decision.reason, AccessReason::OwnerMismatch);
}

#[test]
fn users_may_only_read_themselves() {
    let me = actor(7, Role::Procurement);
    assert!(can_perform(&me, Action::Read, &ResourceRef::user(UserId::new(7))).allowed);
    let other = can_perform(&me, Action::Update, &ResourceRef::user(UserId::new(8)));
    assert_eq!(other.reason, AccessReason::OwnerMismatch);
}

#[test]
fn anyone_may_create_contracts() {
    for role in [Role::Procurement, Role::Legal, Role::Finance] {
        let decision = can_perform(
            &actor(2, role),
            Action::Create,
            &ResourceRef::collection(ResourceKind::Contract),
        );
        assert!(decision.allowed);
        assert_eq!(decision.reason, AccessReason::ContractCreateAllow);
    }
}

#[test]
fn user_creation_falls_through_to_default_deny() {
    let decision = can_perform(
        &actor(2, Role::Legal),
        Action::Create,
        &ResourceRef::collection(ResourceKind::User),
    );
    assert!(!decision.allowed);
    assert_eq!(decision.reason, AccessReason::DefaultDeny);
}

#[test]
fn reason_labels_serialize_as_snake_case() {
    let rendered = serde_json::to_string(&AccessReason::TemplateWriteRequiresLegal).unwrap();
    assert_eq!(rendered, "\"template_write_requires_legal\"");
    assert_eq!(AccessReason::ListAllAdminOnly.to_string(), "list_all_admin_only");
}

#[test]
fn capabilities_reflect_role() {
    let legal = capabilities(&actor(3, Role::Legal));
    let template = legal.iter().find(|cap| cap.kind == ResourceKind::Template).unwrap();
    assert_eq!(
        template.actions,
        vec![Action::Create, Action::Read, Action::Update, Action::Delete]
    );
    let user = legal.iter().find(|cap| cap.kind == ResourceKind::User).unwrap();
    assert_eq!(user.actions, vec![Action::Read, Action::Update, Action::Delete]);

    let admin = capabilities(&actor(1, Role::Admin));
    assert!(admin.iter().all(|cap| cap.actions.len() == Action::ALL.len()));
}

proptest! {
    #[test]
    fn non_admins_never_list_all(
        role in role_strategy(),
        kind in kind_strategy(),
        actor_id in 1i64 .. 1_000,
        owner in prop::option::of(1i64 .. 1_000),
    ) {
        prop_assume!(role != Role::Admin);
        let resource = ResourceRef { kind, owner_id: owner.map(UserId::new), id: None };
        let decision = can_perform(&actor(actor_id, role), Action::ListAll, &resource);
        prop_assert!(!decision.allowed);
        prop_assert_eq!(decision.reason, AccessReason::ListAllAdminOnly);
    }

    #[test]
    fn admins_are_always_allowed(
        action in action_strategy(),
        kind in kind_strategy(),
        actor_id in 1i64 .. 1_000,
        owner in prop::option::of(1i64 .. 1_000),
    ) {
        let resource = ResourceRef { kind, owner_id: owner.map(UserId::new), id: Some(1) };
        let decision = can_perform(&actor(actor_id, Role::Admin), action, &resource);
        prop_assert!(decision.allowed);
    }

    #[test]
    fn only_owner_or_admin_touch_a_contract(
        role in role_strategy(),
        actor_id in 1i64 .. 50,
        owner_id in 1i64 .. 50,
        action in prop::sample::select(vec![Action::Read, Action::Update, Action::Delete]),
    ) {
        let decision = can_perform(&actor(actor_id, role), action, &contract_owned_by(owner_id));
        prop_assert_eq!(decision.allowed, role == Role::Admin || actor_id == owner_id);
    }

    #[test]
    fn decisions_are_deterministic(
        role in role_strategy(),
        action in action_strategy(),
        kind in kind_strategy(),
        actor_id in 1i64 .. 20,
        owner in prop::option::of(1i64 .. 20),
    ) {
        let resource = ResourceRef { kind, owner_id: owner.map(UserId::new), id: None };
        let first = can_perform(&actor(actor_id, role), action, &resource);
        let second = can_perform(&actor(actor_id, role), action, &resource);
        prop_assert_eq!(first, second);
    }
}
