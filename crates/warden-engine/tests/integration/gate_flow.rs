//! End-to-end gate flows: entity operations decided by resolved rules.

use serde_json::{json, Map};

use warden_core::{membership_key, Pattern, PrincipalContext, Rule};
use warden_engine::EntityCanon;

use crate::common::{gate_over, record_with_groups, record_with_rules, row, seeded_store};

/// Principal `bob` in `org0`: the org record carries a blanket deny, and a
/// group grants entity loads only. Saves are refused before delegation;
/// loads of existing entities succeed.
#[tokio::test]
async fn test_org_deny_with_group_load_grant() {
    let store = seeded_store(vec![
        (
            "org0".to_string(),
            record_with_rules(vec![Rule::new(Pattern::new(), false)]),
        ),
        (
            membership_key("bob", "org0"),
            record_with_groups(vec!["readers"]),
        ),
        (
            "readers".to_string(),
            record_with_rules(vec![Rule::new(
                Pattern::new().with("isEntity", true).with("cmd", "load"),
                true,
            )]),
        ),
    ]);
    let gate = gate_over(store, vec![json!({"id": 1, "mark": "a"})]);
    let principal = PrincipalContext::user("bob").with_org("org0");
    let canon = EntityCanon::name("foo");

    let err = gate
        .save(&principal, &canon, row(json!({"id": 2, "mark": "b"})))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "no_write_access");

    let loaded = gate.load(&principal, &canon, &json!(1)).await.unwrap();
    assert_eq!(loaded.unwrap()["mark"], json!("a"));
}

/// Two users with per-user grants keyed on the entity's own `user` field:
/// each reads their own entities, not each other's.
#[tokio::test]
async fn test_users_cannot_read_each_others_entities() {
    let store = seeded_store(vec![
        (
            "aaa".to_string(),
            record_with_rules(vec![Rule::new(Pattern::new().with("user", "aaa"), true)]),
        ),
        (
            "bbb".to_string(),
            record_with_rules(vec![Rule::new(Pattern::new().with("user", "bbb"), true)]),
        ),
    ]);
    let gate = gate_over(store, vec![]);
    let canon = EntityCanon::name("foo");
    let aaa = PrincipalContext::user("aaa");
    let bbb = PrincipalContext::user("bbb");

    let saved = gate
        .save(&aaa, &canon, row(json!({"id": 1, "mark": "a", "user": "aaa"})))
        .await
        .unwrap();
    assert_eq!(saved["id"], json!(1));

    assert!(gate.load(&aaa, &canon, &json!(1)).await.unwrap().is_some());

    let err = gate.load(&bbb, &canon, &json!(1)).await.unwrap_err();
    assert_eq!(err.code(), "no_read_access");
}

#[tokio::test]
async fn test_list_returns_matching_subset_in_order() {
    let store = seeded_store(vec![(
        "bob".to_string(),
        record_with_rules(vec![Rule::new(Pattern::new().with("mark", "a"), true)]),
    )]);
    let gate = gate_over(
        store,
        vec![
            json!({"id": 1, "mark": "a"}),
            json!({"id": 2, "mark": "b"}),
            json!({"id": 3, "mark": "a"}),
        ],
    );

    let visible = gate
        .list(
            &PrincipalContext::user("bob"),
            &EntityCanon::name("foo"),
            &Map::new(),
        )
        .await
        .unwrap();
    let ids: Vec<_> = visible.iter().map(|r| r["id"].clone()).collect();
    assert_eq!(ids, [json!(1), json!(3)]);
}

#[tokio::test]
async fn test_remove_is_gated_like_save() {
    let store = seeded_store(vec![(
        "bob".to_string(),
        record_with_rules(vec![Rule::new(Pattern::new().with("cmd", "load"), true)]),
    )]);
    let gate = gate_over(store, vec![json!({"id": 1})]);
    let principal = PrincipalContext::user("bob");
    let canon = EntityCanon::name("foo");

    let err = gate
        .remove(&principal, &canon, row(json!({"id": 1})))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "no_write_access");

    // The entity survived the refused remove.
    assert!(gate.load(&principal, &canon, &json!(1)).await.unwrap().is_some());
}

#[tokio::test]
async fn test_missing_user_denied_before_resolution() {
    let store = seeded_store(vec![(
        "org0".to_string(),
        record_with_rules(vec![Rule::new(Pattern::new(), true)]),
    )]);
    let gate = gate_over(store, vec![json!({"id": 1})]);
    let principal = PrincipalContext::org("org0");
    let canon = EntityCanon::name("foo");

    for err in [
        gate.save(&principal, &canon, row(json!({"id": 2}))).await.unwrap_err(),
        gate.load(&principal, &canon, &json!(1)).await.map(|_| ()).unwrap_err(),
        gate.list(&principal, &canon, &Map::new()).await.map(|_| ()).unwrap_err(),
    ] {
        assert_eq!(err.code(), "no_user");
    }
}

#[tokio::test]
async fn test_canon_fields_scope_rules_to_entity_types() {
    // Grant covers only the "invoice" type in base "billing".
    let store = seeded_store(vec![(
        "bob".to_string(),
        record_with_rules(vec![Rule::new(
            Pattern::new().with("base", "billing").with("name", "invoice"),
            true,
        )]),
    )]);
    let gate = gate_over(store, vec![]);
    let principal = PrincipalContext::user("bob");

    let invoice = EntityCanon::name("invoice").with_base("billing");
    assert!(gate
        .save(&principal, &invoice, row(json!({"id": 1})))
        .await
        .is_ok());

    let ledger = EntityCanon::name("ledger").with_base("billing");
    let err = gate
        .save(&principal, &ledger, row(json!({"id": 2})))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "no_write_access");
}
