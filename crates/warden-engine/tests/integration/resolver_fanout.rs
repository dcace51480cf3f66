//! Dynamic fan-out behavior of the resolver under varying fetch completion
//! orders.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use warden_core::{membership_key, Activity, Pattern, PrincipalContext, Rule};
use warden_engine::PermResolver;

use crate::common::{record_with_groups, record_with_rules, seeded_store, FlakyStore, ShuffledStore};

fn membership_fixture(groups: Vec<&str>) -> Vec<(String, warden_core::Record)> {
    let mut records = vec![
        (
            "bob".to_string(),
            record_with_rules(vec![Rule::new(Pattern::new().with("cmd", "ping"), true)]),
        ),
        (
            "org0".to_string(),
            record_with_rules(vec![Rule::new(Pattern::new(), false)]),
        ),
        (membership_key("bob", "org0"), record_with_groups(groups.clone())),
    ];
    for group in groups {
        records.push((
            group.to_string(),
            record_with_rules(vec![Rule::new(
                Pattern::new().with("grant", group),
                true,
            )]),
        ));
    }
    records
}

async fn resolve_with_seed(groups: Vec<&str>, seed: u64) -> warden_index::PermIndex {
    let inner = seeded_store(membership_fixture(groups));
    let resolver = PermResolver::new(Arc::new(ShuffledStore::new(inner, seed)));
    resolver
        .resolve(&PrincipalContext::user("bob").with_org("org0"))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_fanout_zero_groups() {
    for seed in 0..4 {
        let index = resolve_with_seed(vec![], seed).await;
        // User rule plus org rule, nothing else.
        assert_eq!(index.len(), 2);
    }
}

#[tokio::test]
async fn test_fanout_one_group() {
    for seed in 0..4 {
        let index = resolve_with_seed(vec!["alpha"], seed).await;
        assert_eq!(index.len(), 3);

        let query = Activity::new()
            .with("usr", "bob")
            .with("org", "org0")
            .with("grant", "alpha");
        assert_eq!(index.find(&query), Some(&json!(true)));
    }
}

#[tokio::test]
async fn test_fanout_three_groups_all_merged_every_order() {
    // The group fetches are discovered only after the membership fetch
    // completes; whatever order the fetches finish in, every listed group's
    // rules must be present exactly once.
    for seed in 0..8 {
        let index = resolve_with_seed(vec!["alpha", "beta", "gamma"], seed).await;
        assert_eq!(index.len(), 5);

        for group in ["alpha", "beta", "gamma"] {
            let query = Activity::new()
                .with("usr", "bob")
                .with("org", "org0")
                .with("grant", group);
            assert_eq!(index.find(&query), Some(&json!(true)), "group {group} seed {seed}");
        }
    }
}

#[tokio::test]
async fn test_fanout_merge_order_is_stable_across_completion_orders() {
    let mut baseline: Option<Vec<serde_json::Value>> = None;
    for seed in 0..8 {
        let index = resolve_with_seed(vec!["alpha", "beta", "gamma"], seed).await;
        let order: Vec<serde_json::Value> = index
            .rules()
            .map(|rule| serde_json::to_value(rule).unwrap())
            .collect();
        match &baseline {
            None => baseline = Some(order),
            Some(expected) => assert_eq!(&order, expected, "seed {seed}"),
        }
    }
}

#[tokio::test]
async fn test_fanout_group_fetch_error_fails_resolution_once_drained() {
    // The failing fetch is the slowest in flight; the resolution must still
    // surface exactly that error, not hang and not succeed partially.
    let inner = seeded_store(membership_fixture(vec!["alpha", "beta"]));
    let store = FlakyStore::new(inner, "beta", Duration::from_millis(20));
    let resolver = PermResolver::new(Arc::new(store));

    let err = resolver
        .resolve(&PrincipalContext::user("bob").with_org("org0"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "store_error");
}

#[tokio::test]
async fn test_fanout_fixed_fetch_error_fails_resolution() {
    let inner = seeded_store(membership_fixture(vec!["alpha"]));
    let store = FlakyStore::new(inner, "org0", Duration::from_millis(5));
    let resolver = PermResolver::new(Arc::new(store));

    let err = resolver
        .resolve(&PrincipalContext::user("bob").with_org("org0"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "store_error");
}

#[tokio::test]
async fn test_concurrent_resolutions_do_not_interfere() {
    // Two principals resolving at once get independent indexes.
    let inner = seeded_store(vec![
        (
            "bob".to_string(),
            record_with_rules(vec![Rule::new(Pattern::new(), true)]),
        ),
        (
            "eve".to_string(),
            record_with_rules(vec![Rule::new(Pattern::new(), false)]),
        ),
    ]);
    let resolver = PermResolver::new(Arc::new(ShuffledStore::new(inner, 3)));

    let bob_ctx = PrincipalContext::user("bob");
    let eve_ctx = PrincipalContext::user("eve");
    let (bob, eve) = tokio::join!(resolver.resolve(&bob_ctx), resolver.resolve(&eve_ctx),);
    let bob = bob.unwrap();
    let eve = eve.unwrap();

    assert_eq!(
        bob.find(&Activity::new().with("usr", "bob")),
        Some(&json!(true))
    );
    assert_eq!(
        eve.find(&Activity::new().with("usr", "eve")),
        Some(&json!(false))
    );
}
