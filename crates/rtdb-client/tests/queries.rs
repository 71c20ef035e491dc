//! Ordered and filtered reads against the in-memory tree.

use std::sync::Arc;

use rtdb_client::{Client, DbError, MemoryTransport, Query, Ref, Value};
use serde_json::json;

async fn dinos() -> Ref {
    let transport = Arc::new(MemoryTransport::new());
    let root = Client::with_transport(transport).new_ref("dinodb").unwrap();
    root.set(&json!({
        "dinosaurs": {
            "bruhathkayosaurus": {"height": 25, "order": "saurischia"},
            "lambeosaurus": {"height": 2.1, "order": "ornithischia"},
            "linhenykus": {"height": 0.6, "order": "theropoda"},
            "pterodactyl": {"height": 0.6, "order": "pterosauria"},
            "stegosaurus": {"height": 4, "order": "ornithischia"},
            "triceratops": {"height": 3, "order": "ornithischia"}
        },
        "scores": {
            "bruhathkayosaurus": 55,
            "lambeosaurus": 21,
            "linhenykus": 80,
            "pterodactyl": 93,
            "stegosaurus": 5,
            "triceratops": 22
        }
    }))
    .await
    .unwrap();
    root
}

async fn keys(query: Query) -> Vec<String> {
    query
        .get_ordered()
        .await
        .unwrap()
        .into_iter()
        .map(|node| node.key)
        .collect()
}

#[tokio::test]
async fn order_by_child() {
    let dinosaurs = dinos().await.child("dinosaurs").unwrap();
    let q = dinosaurs.order_by_child("height").build().unwrap();
    assert_eq!(
        keys(q).await,
        [
            "linhenykus",
            "pterodactyl",
            "lambeosaurus",
            "triceratops",
            "stegosaurus",
            "bruhathkayosaurus"
        ]
    );
}

#[tokio::test]
async fn order_by_child_with_limits() {
    let dinosaurs = dinos().await.child("dinosaurs").unwrap();

    let first = dinosaurs.order_by_child("height").limit_to_first(2).build().unwrap();
    assert_eq!(keys(first).await, ["linhenykus", "pterodactyl"]);

    let last = dinosaurs.order_by_child("height").limit_to_last(2).build().unwrap();
    assert_eq!(keys(last).await, ["stegosaurus", "bruhathkayosaurus"]);
}

#[tokio::test]
async fn order_by_child_with_range() {
    let dinosaurs = dinos().await.child("dinosaurs").unwrap();

    let tall = dinosaurs.order_by_child("height").start_at(3).build().unwrap();
    assert_eq!(keys(tall).await, ["triceratops", "stegosaurus", "bruhathkayosaurus"]);

    let short = dinosaurs.order_by_child("height").end_at(2.1).build().unwrap();
    assert_eq!(keys(short).await, ["linhenykus", "pterodactyl", "lambeosaurus"]);

    let exact = dinosaurs.order_by_child("height").equal_to(0.6).build().unwrap();
    assert_eq!(keys(exact).await, ["linhenykus", "pterodactyl"]);

    let ornithischia = dinosaurs
        .order_by_child("order")
        .equal_to("ornithischia")
        .build()
        .unwrap();
    assert_eq!(keys(ornithischia).await, ["lambeosaurus", "stegosaurus", "triceratops"]);
}

#[tokio::test]
async fn order_by_value() {
    let scores = dinos().await.child("scores").unwrap();

    let all = scores.order_by_value().build().unwrap();
    assert_eq!(
        keys(all).await,
        [
            "stegosaurus",
            "lambeosaurus",
            "triceratops",
            "bruhathkayosaurus",
            "linhenykus",
            "pterodactyl"
        ]
    );

    let top = scores.order_by_value().limit_to_last(3).build().unwrap();
    let nodes = top.get_ordered().await.unwrap();
    let values: Vec<Value> = nodes.into_iter().map(|n| n.value).collect();
    assert_eq!(values, [json!(55), json!(80), json!(93)]);

    let mid = scores.order_by_value().start_at(20).end_at(60).build().unwrap();
    assert_eq!(
        mid.get::<Value>().await.unwrap(),
        json!({"lambeosaurus": 21, "triceratops": 22, "bruhathkayosaurus": 55})
    );
}

#[tokio::test]
async fn order_by_key() {
    let dinosaurs = dinos().await.child("dinosaurs").unwrap();

    let first = dinosaurs.order_by_key().limit_to_first(2).build().unwrap();
    assert_eq!(keys(first).await, ["bruhathkayosaurus", "lambeosaurus"]);

    let range = dinosaurs.order_by_key().start_at("l").end_at("p").build().unwrap();
    assert_eq!(keys(range).await, ["lambeosaurus", "linhenykus"]);
}

#[tokio::test]
async fn integer_keys_sort_numerically() {
    let root = dinos().await;
    let items = root.child("items").unwrap();
    items.set(&json!({"10": "a", "9": "b", "x": "c", "-1": "d"})).await.unwrap();

    let q = items.order_by_key().build().unwrap();
    assert_eq!(keys(q).await, ["-1", "9", "10", "x"]);
}

#[tokio::test]
async fn missing_location_yields_no_nodes() {
    let root = dinos().await;
    let q = root.child("nothing").unwrap().order_by_key().build().unwrap();
    assert!(q.get_ordered().await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_query_never_reaches_the_server() {
    let transport = Arc::new(MemoryTransport::new());
    let r = Client::with_transport(transport.clone()).new_ref("dinodb").unwrap();
    let err = r
        .order_by_child("height")
        .limit_to_first(1)
        .limit_to_last(1)
        .build()
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidArgument(_)));
    assert!(transport.requests().is_empty());
}
