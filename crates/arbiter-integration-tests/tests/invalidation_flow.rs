//! Grant changes propagate to cached decisions through the bus.

mod common;

use std::sync::Arc;

use arbiter_core::{GrantState, InvalidationTag};
use arbiter_engine::CacheStatus;
use arbiter_test::{MockGate, MockProvider, TestHarness, test_context, test_context_for};
use common::ReferenceStack;

#[tokio::test]
async fn test_user_grant_change_is_visible_immediately() {
    let stack = ReferenceStack::new();
    let ctx = test_context();

    let trace = stack.engine.check_traced("Orders.Create", &ctx).await.unwrap();
    assert!(!trace.result.granted);
    assert_eq!(trace.cache, CacheStatus::Miss);
    let trace = stack.engine.check_traced("Orders.Create", &ctx).await.unwrap();
    assert_eq!(trace.cache, CacheStatus::Hit);

    stack.users.table().grant("u1", "Orders.Create");
    let trace = stack.engine.check_traced("Orders.Create", &ctx).await.unwrap();
    assert!(trace.result.granted);
    assert_eq!(trace.cache, CacheStatus::Miss);

    stack.users.table().remove("u1", "Orders.Create");
    assert!(!stack.engine.is_granted("Orders.Create", &ctx).await.unwrap());
}

#[tokio::test]
async fn test_user_change_leaves_other_users_cached() {
    let stack = ReferenceStack::new();
    let u1 = test_context_for("u1");
    let u2 = test_context_for("u2");

    stack.engine.check("Orders.Create", &u1).await.unwrap();
    stack.engine.check("Orders.Create", &u2).await.unwrap();

    stack.users.table().grant("u1", "Orders.Create");

    let trace = stack.engine.check_traced("Orders.Create", &u2).await.unwrap();
    assert_eq!(trace.cache, CacheStatus::Hit);
    let trace = stack.engine.check_traced("Orders.Create", &u1).await.unwrap();
    assert_eq!(trace.cache, CacheStatus::Miss);
    assert!(trace.result.granted);
}

#[tokio::test]
async fn test_role_grant_change_invalidates_permission_for_everyone() {
    let stack = ReferenceStack::new();
    stack.roles.memberships().assign("u1", "clerk");
    stack.roles.memberships().assign("u2", "clerk");
    stack.roles.grants().grant("clerk", "Orders.Create");

    let u1 = test_context_for("u1");
    let u2 = test_context_for("u2");
    assert!(stack.engine.is_granted("Orders.Create", &u1).await.unwrap());
    assert!(stack.engine.is_granted("Orders.Create", &u2).await.unwrap());
    assert!(stack.engine.is_granted("Orders.Create", &u1).await.unwrap());

    stack.roles.grants().prohibit("clerk", "Orders.Create");
    assert!(!stack.engine.is_granted("Orders.Create", &u1).await.unwrap());
    assert!(!stack.engine.is_granted("Orders.Create", &u2).await.unwrap());
}

#[tokio::test]
async fn test_membership_change_invalidates_user() {
    let stack = ReferenceStack::new();
    stack.roles.grants().grant("clerk", "Orders.Create");
    let ctx = test_context();

    assert!(!stack.engine.is_granted("Orders.Create", &ctx).await.unwrap());
    stack.roles.memberships().assign("u1", "clerk");
    assert!(stack.engine.is_granted("Orders.Create", &ctx).await.unwrap());
    stack.roles.memberships().unassign("u1", "clerk");
    assert!(!stack.engine.is_granted("Orders.Create", &ctx).await.unwrap());
}

#[tokio::test]
async fn test_invalidation_during_evaluation_rejects_store() {
    let gate = MockGate::new();
    let user = MockProvider::new("User")
        .with_state(GrantState::Granted)
        .with_gate(Arc::clone(&gate));
    let harness = TestHarness::builder().with_provider(user.clone()).build();

    let engine = Arc::clone(&harness.engine);
    let check = tokio::spawn(async move {
        engine
            .check_traced("Orders.Create", &test_context())
            .await
    });

    gate.wait_entered().await;
    // Lands while the provider is still answering.
    harness.bus.invalidate(InvalidationTag::user("u1"), "grants reloaded");
    gate.release();

    let trace = check.await.unwrap().unwrap();
    assert!(trace.result.granted);
    assert_eq!(trace.cache, CacheStatus::StaleStoreRejected);
    assert!(harness.engine.cache().unwrap().is_empty());

    // Nothing was cached, so the next check evaluates again and stores.
    gate.release();
    let trace = harness
        .engine
        .check_traced("Orders.Create", &test_context())
        .await
        .unwrap();
    assert!(trace.result.granted);
    assert_eq!(trace.cache, CacheStatus::Miss);
    assert_eq!(user.calls(), 2);
    assert_eq!(harness.engine.cache().unwrap().len(), 1);
}

#[tokio::test]
async fn test_tenant_and_global_invalidation() {
    let user = MockProvider::new("User").with_state(GrantState::Granted);
    let harness = TestHarness::builder().with_provider(user.clone()).build();

    harness.engine.check("Orders.Create", &test_context_for("u1")).await.unwrap();
    harness.engine.check("Orders.Delete", &test_context_for("u2")).await.unwrap();
    let cache = harness.engine.cache().unwrap();
    assert_eq!(cache.len(), 2);

    harness.bus.invalidate(InvalidationTag::tenant("acme"), "tenant policy changed");
    assert!(cache.is_empty());

    harness.engine.check("Orders.Create", &test_context_for("u1")).await.unwrap();
    harness.engine.check("Orders", &test_context_for("u3")).await.unwrap();
    harness.bus.invalidate_all("reload");
    assert!(cache.is_empty());
    assert_eq!(user.calls(), 4);
}

#[tokio::test]
async fn test_async_receivers_observe_changes() {
    let stack = ReferenceStack::new();
    let mut receiver = stack.bus.subscribe();

    stack.users.table().grant("u1", "Orders.Create");
    stack.clients.table().prohibit("legacy-app", "Orders.Create");

    let first = receiver.recv().await.unwrap();
    assert_eq!(first.tag, Some(InvalidationTag::user("u1")));
    let second = receiver.recv().await.unwrap();
    assert_eq!(second.tag, Some(InvalidationTag::client("legacy-app")));
}

#[tokio::test]
async fn test_engine_invalidate_without_bus() {
    let user = MockProvider::new("User").with_state(GrantState::Granted);
    let harness = TestHarness::builder().with_provider(user.clone()).build();
    let ctx = test_context();

    harness.engine.check("Orders.Create", &ctx).await.unwrap();
    assert_eq!(harness.engine.invalidate(&InvalidationTag::user("u9")), 0);
    assert_eq!(harness.engine.invalidate(&InvalidationTag::permission("Orders.Create")), 1);
    harness.engine.check("Orders.Create", &ctx).await.unwrap();
    assert_eq!(harness.engine.invalidate_all(), 1);
    assert_eq!(user.calls(), 2);
}
