//! Behaviour every `Cache` implementation must share.
//!
//! Each check starts by emptying the instance so it can run against a
//! long-lived server as well as a fresh embedded database.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::time::Duration;

use keyspace::{Cache, CacheError, CacheExt, CacheValue};
use serde::{Deserialize, Serialize};

pub async fn round_trip_per_type(cache: &dyn Cache) {
    cache.empty().await.unwrap();

    let samples = [
        ("string", CacheValue::from("hello")),
        ("int", CacheValue::from(42i64)),
        ("float", CacheValue::from(2.5)),
        ("infinity", CacheValue::from(f64::INFINITY)),
        ("negative-infinity", CacheValue::from(f64::NEG_INFINITY)),
        ("bool", CacheValue::from(true)),
        ("null", CacheValue::Null),
        ("bytes", CacheValue::Bytes(vec![0, 159, 146, 150])),
        (
            "list",
            CacheValue::from(vec![CacheValue::from("a"), CacheValue::from(1i64)]),
        ),
    ];

    for (key, value) in samples {
        cache.set(key, value.clone(), None).await.unwrap();
        assert_eq!(cache.get(key).await.unwrap(), value, "round trip of {key}");
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    age: u32,
    tags: Vec<String>,
}

pub async fn typed_helpers(cache: &dyn Cache) {
    cache.empty().await.unwrap();

    let profile = Profile {
        name: "alice".to_string(),
        age: 30,
        tags: vec!["admin".to_string()],
    };
    cache.set_serialized("profile", &profile, None).await.unwrap();
    let loaded: Profile = cache.get_deserialized("profile").await.unwrap();
    assert_eq!(loaded, profile);

    cache.set("count", CacheValue::from(7i64), None).await.unwrap();
    let count: i64 = cache.get_as("count").await.unwrap();
    assert_eq!(count, 7);
    assert!(matches!(
        cache.get_as::<String>("count").await,
        Err(CacheError::TypeMismatch { .. })
    ));
}

pub async fn exists_lifecycle(cache: &dyn Cache) {
    cache.empty().await.unwrap();

    assert!(!cache.exists("k").await.unwrap());
    cache.set("k", CacheValue::from("v"), None).await.unwrap();
    assert!(cache.exists("k").await.unwrap());
    cache.delete("k").await.unwrap();
    assert!(!cache.exists("k").await.unwrap());

    // deleting again is not an error
    cache.delete("k").await.unwrap();
    assert!(cache.get("k").await.unwrap_err().is_not_found());
}

pub async fn update_semantics(cache: &dyn Cache) {
    cache.empty().await.unwrap();

    let err = cache
        .update("never-set", CacheValue::from("x"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(!cache.exists("never-set").await.unwrap());

    cache.set("k", CacheValue::from("v1"), None).await.unwrap();
    cache.update("k", CacheValue::from("v2")).await.unwrap();
    assert_eq!(cache.get("k").await.unwrap(), CacheValue::from("v2"));
}

pub async fn ttl_and_expire(cache: &dyn Cache) {
    cache.empty().await.unwrap();

    let d = Duration::from_secs(30);
    cache.set("k", CacheValue::from("v"), Some(d)).await.unwrap();
    let ttl = cache.ttl("k").await.unwrap();
    assert!(ttl > Duration::ZERO && ttl <= d, "ttl {ttl:?} outside (0, {d:?}]");

    let d2 = Duration::from_secs(300);
    cache.expire("k", d2).await.unwrap();
    let ttl = cache.ttl("k").await.unwrap();
    assert!(ttl > d && ttl <= d2, "ttl {ttl:?} does not reflect {d2:?}");

    cache.set("forever", CacheValue::from("v"), None).await.unwrap();
    assert_eq!(cache.ttl("forever").await.unwrap(), Duration::ZERO);

    assert!(cache.ttl("missing").await.unwrap_err().is_not_found());
    assert!(
        cache
            .expire("missing", d)
            .await
            .unwrap_err()
            .is_not_found()
    );
}

pub async fn entry_expires(cache: &dyn Cache) {
    cache.empty().await.unwrap();

    cache
        .set("short", CacheValue::from("v"), Some(Duration::from_secs(1)))
        .await
        .unwrap();
    assert!(cache.exists("short").await.unwrap());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(!cache.exists("short").await.unwrap());
    assert!(cache.get("short").await.unwrap_err().is_not_found());
}

pub async fn keys_modes(cache: &dyn Cache) {
    cache.empty().await.unwrap();
    let prefix = cache.prefix().to_string();

    for key in ["zeta", "key2", "alpha", "key1"] {
        cache.set(key, CacheValue::from(key), None).await.unwrap();
    }

    let all: BTreeSet<String> = cache.keys(&[]).await.unwrap().into_iter().collect();
    let expected: BTreeSet<String> = ["zeta", "key2", "alpha", "key1"]
        .iter()
        .map(|k| format!("{prefix}:{k}"))
        .collect();
    assert_eq!(all, expected);

    let mut matched = cache.keys(&["key"]).await.unwrap();
    matched.sort();
    assert_eq!(
        matched,
        vec![format!("{prefix}:key1"), format!("{prefix}:key2")]
    );

    let named = cache.keys(&["alpha", "nope", "zeta"]).await.unwrap();
    assert_eq!(named, vec![format!("{prefix}:alpha"), format!("{prefix}:zeta")]);
}

pub async fn empty_by_match_is_selective(cache: &dyn Cache) {
    cache.empty().await.unwrap();
    let prefix = cache.prefix().to_string();

    for key in ["alpha", "alpha:1", "alphabet", "beta"] {
        cache.set(key, CacheValue::from(1i64), None).await.unwrap();
    }

    cache.empty_by_match("alpha").await.unwrap();
    assert_eq!(cache.keys(&[]).await.unwrap(), vec![format!("{prefix}:beta")]);
}

pub async fn empty_past_batch_boundary(cache: &dyn Cache) {
    cache.empty().await.unwrap();

    for i in 0..10_050i64 {
        cache
            .set(&format!("bulk:{i}"), CacheValue::from(i), None)
            .await
            .unwrap();
    }
    assert_eq!(cache.keys(&["bulk:"]).await.unwrap().len(), 10_050);

    cache.empty().await.unwrap();
    assert!(cache.keys(&[]).await.unwrap().is_empty());
}

/// `other` must share storage with `cache` under a different prefix.
pub async fn prefixes_are_isolated(cache: &dyn Cache, other: &dyn Cache) {
    cache.empty().await.unwrap();
    other.empty().await.unwrap();

    cache.set("shared", CacheValue::from("mine"), None).await.unwrap();
    other.set("shared", CacheValue::from("theirs"), None).await.unwrap();

    assert_eq!(cache.get("shared").await.unwrap(), CacheValue::from("mine"));
    cache.empty().await.unwrap();
    assert_eq!(
        other.get("shared").await.unwrap(),
        CacheValue::from("theirs")
    );
    other.empty().await.unwrap();
}
