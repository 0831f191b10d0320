//! End-to-end resource lifecycles through the public test harness.

use hemmer_provider_random::testing::{
    assert_plan_changes_attribute, assert_plan_does_not_change_attribute, assert_plan_no_changes,
    assert_plan_rejected, assert_plan_replaces, assert_plan_unknown, assert_plan_updates_in_place,
    ProviderTester,
};
use hemmer_provider_random::{ProviderError, RandomProvider, ResourceKind};
use serde_json::{json, Value};

fn tester() -> ProviderTester<RandomProvider> {
    ProviderTester::new(RandomProvider::new())
}

fn str_of<'a>(state: &'a Value, key: &str) -> &'a str {
    state[key].as_str().unwrap_or_else(|| panic!("{} is not a string in {}", key, state))
}

#[tokio::test]
async fn every_resource_type_is_served() {
    let types = tester().resource_types();
    let expected: Vec<String> = ResourceKind::ALL
        .iter()
        .map(|kind| kind.type_name().to_string())
        .collect();
    assert_eq!(types, expected);
}

#[tokio::test]
async fn string_is_stable_until_keepers_change() {
    let tester = tester();
    let config = json!({"length": 20, "special": false, "keepers": {"ami": "ami-1"}});

    let created = tester.lifecycle_create("random_string", config.clone()).await.unwrap();
    let result = str_of(&created, "result").to_string();
    assert_eq!(result.chars().count(), 20);
    assert!(result.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(created["id"], created["result"]);

    // Same configuration: nothing to do
    let plan = tester
        .plan_update("random_string", created.clone(), config)
        .await
        .unwrap();
    assert_plan_no_changes(&plan);

    let changed = json!({"length": 20, "special": false, "keepers": {"ami": "ami-2"}});
    let plan = tester
        .plan_update("random_string", created.clone(), changed.clone())
        .await
        .unwrap();
    assert_plan_replaces(&plan);
    assert_plan_unknown(&plan, "result");

    let replaced = tester
        .lifecycle_update("random_string", created, changed)
        .await
        .unwrap();
    assert_ne!(str_of(&replaced, "result"), result);
}

#[tokio::test]
async fn clearing_a_keeper_value_updates_in_place() {
    let tester = tester();
    let created = tester
        .lifecycle_create("random_pet", json!({"keepers": {"ami": "ami-1"}}))
        .await
        .unwrap();

    let config = json!({"keepers": {"ami": null}});
    let plan = tester
        .plan_update("random_pet", created.clone(), config.clone())
        .await
        .unwrap();
    assert_plan_updates_in_place(&plan);
    assert_plan_changes_attribute(&plan, "keepers");
    assert_plan_does_not_change_attribute(&plan, "id");

    let updated = tester
        .lifecycle_update("random_pet", created.clone(), config)
        .await
        .unwrap();
    assert_eq!(updated["id"], created["id"]);
}

#[tokio::test]
async fn password_carries_a_matching_hash() {
    let created = tester()
        .lifecycle_create("random_password", json!({"length": 12, "min_special": 2}))
        .await
        .unwrap();

    let password = str_of(&created, "result");
    assert_eq!(password.chars().count(), 12);
    assert!(bcrypt::verify(password, str_of(&created, "bcrypt_hash")).unwrap());
    assert_eq!(created["id"], "none");
}

#[tokio::test]
async fn impossible_character_constraints_are_rejected_at_plan() {
    let result = tester()
        .plan_create("random_string", json!({"length": 3, "min_upper": 2, "min_numeric": 2}))
        .await;
    assert_plan_rejected(result, "length");
}

#[tokio::test]
async fn seeded_integer_and_shuffle_are_reproducible() {
    let tester = tester();
    let integer = json!({"min": 1, "max": 1000000, "seed": "build-42"});
    let a = tester.lifecycle_create("random_integer", integer.clone()).await.unwrap();
    let b = tester.lifecycle_create("random_integer", integer).await.unwrap();
    assert_eq!(a["result"], b["result"]);
    assert_eq!(a["id"], Value::String(a["result"].to_string()));

    let shuffle = json!({"input": ["a", "b", "c", "d", "e"], "seed": "build-42", "result_count": 3});
    let a = tester.lifecycle_create("random_shuffle", shuffle.clone()).await.unwrap();
    let b = tester.lifecycle_create("random_shuffle", shuffle).await.unwrap();
    assert_eq!(a["result"], b["result"]);
    assert_eq!(a["result"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn uuid_versions_match_their_resource() {
    let tester = tester();
    for (resource, version) in [("random_uuid", 4), ("random_uuid4", 4), ("random_uuid7", 7)] {
        let state = tester.lifecycle_create(resource, json!({})).await.unwrap();
        let parsed = uuid::Uuid::parse_str(str_of(&state, "result")).unwrap();
        assert_eq!(parsed.get_version_num(), version, "{}", resource);
        assert_eq!(state["id"], state["result"]);
    }
}

#[tokio::test]
async fn id_encodings_agree() {
    let state = tester()
        .lifecycle_create("random_id", json!({"byte_length": 4, "prefix": "srv-"}))
        .await
        .unwrap();

    let hex = str_of(&state, "hex").strip_prefix("srv-").unwrap();
    let dec = str_of(&state, "dec").strip_prefix("srv-").unwrap();
    assert_eq!(u64::from_str_radix(hex, 16).unwrap(), dec.parse::<u64>().unwrap());
    assert_eq!(hex.len(), 8);
    assert!(!str_of(&state, "id").starts_with("srv-"));
}

#[tokio::test]
async fn imported_resources_keep_their_values() {
    let tester = tester();

    let password = tester.import_state("random_password", "s3cr3t!").await.unwrap();
    assert_eq!(password["result"], "s3cr3t!");
    assert_eq!(password["length"], 7);
    assert!(bcrypt::verify("s3cr3t!", str_of(&password, "bcrypt_hash")).unwrap());

    let id = tester.import_state("random_id", "p-,AQID").await.unwrap();
    assert_eq!(id["prefix"], "p-");
    assert_eq!(id["hex"], "p-010203");
    assert_eq!(id["dec"], "p-66051");

    let uuid = tester
        .import_state("random_uuid", "6A2F41A3-C54C-FCE8-32D2-0324E1C32E22")
        .await
        .unwrap();
    assert_eq!(uuid["result"], "6a2f41a3-c54c-fce8-32d2-0324e1c32e22");

    let err = tester.import_resource("random_shuffle", "a,b").await.unwrap_err();
    assert!(matches!(err, ProviderError::ImportUnsupported(_)));
}

#[tokio::test]
async fn empty_import_ids_are_rejected() {
    let tester = tester();
    for resource in ["random_string", "random_password", "random_bytes", "random_id"] {
        let err = tester.import_resource(resource, "").await.unwrap_err();
        assert!(matches!(err, ProviderError::Import(_)), "{}: {}", resource, err);
    }
}

#[tokio::test]
async fn pet_prefix_keeps_its_case() {
    let state = tester()
        .lifecycle_create("random_pet", json!({"prefix": "MyApp", "length": 1}))
        .await
        .unwrap();
    let name = str_of(&state, "id").strip_prefix("MyApp-").unwrap();
    assert_eq!(name, name.to_lowercase());
}

#[tokio::test]
async fn old_string_state_is_upgraded() {
    let tester = tester();
    let old = json!({
        "id": "aB3dE", "result": "aB3dE", "length": 5, "keepers": null,
        "upper": true, "lower": true, "number": true, "special": true,
        "min_upper": 0, "min_lower": 0, "min_numeric": 0, "min_special": 0,
        "override_special": null
    });

    let upgraded = tester
        .upgrade_resource_state("random_string", 1, old)
        .await
        .unwrap();
    assert_eq!(upgraded["numeric"], true);
    assert_eq!(upgraded["result"], "aB3dE");

    let plan = tester
        .plan_update("random_string", upgraded, json!({"length": 5}))
        .await
        .unwrap();
    assert_plan_no_changes(&plan);
}
