//! Document table tests
//!
//! CRUD, filtering and pagination against the in-memory backend.
//! Run with: cargo test --test document_tests

use jsonbdb::{
    Context, Database, DbError, Document, Filter, PkType, Table, limit, offset, order_by,
    order_by_desc,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::VecDeque;
use tokio_test::{assert_err, assert_ok};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Person {
    name: String,
    age: u32,
    location: String,
}

fn person(name: &str, age: u32, location: &str) -> Person {
    Person {
        name: name.to_string(),
        age,
        location: location.to_string(),
    }
}

async fn setup(name: &str) -> (Database, Table, Context) {
    let db = Database::memory();
    let table = db.table(name).unwrap();
    let ctx = Context::background();
    table.create(&ctx).await.unwrap();
    (db, table, ctx)
}

async fn seed(table: &Table, ctx: &Context, people: &[Person]) {
    for p in people {
        table.insert_by_id(ctx, &Database::new_id(), p).await.unwrap();
    }
}

#[tokio::test]
async fn test_insert_and_find_by_id() {
    let (_db, table, ctx) = setup("people").await;
    let id = Database::new_id();
    let alice = person("alice", 30, "UK");

    let inserted = assert_ok!(table.insert_by_id(&ctx, &id, &alice).await);
    assert_eq!(inserted.rows_affected(), 1);

    let found: Option<Person> = assert_ok!(table.find_by_id(&ctx, &id).await);
    assert_eq!(found, Some(alice));

    let missing: Option<Person> = assert_ok!(table.find_by_id(&ctx, &Database::new_id()).await);
    assert_eq!(missing, None);
}

#[tokio::test]
async fn test_duplicate_id_is_rejected() {
    let (_db, table, ctx) = setup("people").await;
    let id = Database::new_id();
    table.insert_by_id(&ctx, &id, &json!({"n": 1})).await.unwrap();

    let err = assert_err!(table.insert_by_id(&ctx, &id, &json!({"n": 2})).await);
    assert!(matches!(err, DbError::ConstraintViolation(_)));
}

#[tokio::test]
async fn test_uuid_table_rejects_plain_identifiers() {
    let (_db, table, ctx) = setup("people").await;
    let err = assert_err!(table.insert_by_id(&ctx, "not-a-uuid", &json!({})).await);
    assert!(matches!(err, DbError::TypeMismatch(_)));
}

#[tokio::test]
async fn test_uuid_ids_match_in_any_case() {
    let (_db, table, ctx) = setup("people").await;
    let upper = Database::new_id().to_uppercase();
    table.insert_by_id(&ctx, &upper, &json!({"n": 1})).await.unwrap();

    let found: Option<Value> = table.find_by_id(&ctx, &upper).await.unwrap();
    assert_eq!(found, Some(json!({"n": 1})));
    let found: Option<Value> = table.find_by_id(&ctx, &upper.to_lowercase()).await.unwrap();
    assert_eq!(found, Some(json!({"n": 1})));

    let err = assert_err!(table.insert_by_id(&ctx, &upper.to_lowercase(), &json!({})).await);
    assert!(matches!(err, DbError::ConstraintViolation(_)));

    let updated = table.update_by_id(&ctx, &upper, &json!({"n": 2})).await.unwrap();
    assert_eq!(updated.rows_affected(), 1);
    let found: Option<Value> = table.find_by_id(&ctx, &upper).await.unwrap();
    assert_eq!(found, Some(json!({"n": 2})));

    assert_eq!(table.delete_by_id(&ctx, &upper).await.unwrap().rows_affected(), 1);
    assert_eq!(table.count_documents(&ctx, &Filter::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_text_primary_key() {
    let db = Database::memory();
    let table = db.table("slugs").unwrap().with_pk_type(PkType::Text);
    let ctx = Context::background();
    table.create(&ctx).await.unwrap();

    table.insert_by_id(&ctx, "home-page", &json!({"title": "Home"})).await.unwrap();
    let found: Option<Value> = table.find_by_id(&ctx, "home-page").await.unwrap();
    assert_eq!(found, Some(json!({"title": "Home"})));
}

#[tokio::test]
async fn test_filter_requires_every_constraint() {
    let (_db, table, ctx) = setup("people").await;
    seed(
        &table,
        &ctx,
        &[
            person("tester1", 10, "UK"),
            person("tester2", 20, "US"),
            person("tester1", 40, "DE"),
        ],
    )
    .await;

    let filter = Filter::new()
        .with("name", "tester1")
        .any_of("age", [10, 20])
        .any_of("location", ["UK", "DE"]);
    let found: Vec<Person> = table.find_all(&ctx, &filter, &[]).await.unwrap();

    assert_eq!(found, vec![person("tester1", 10, "UK")]);
}

#[tokio::test]
async fn test_empty_filter_matches_everything() {
    let (_db, table, ctx) = setup("people").await;
    seed(&table, &ctx, &[person("a", 1, "UK"), person("b", 2, "US")]).await;

    let found: Vec<Person> = table.find_all(&ctx, &Filter::new(), &[]).await.unwrap();
    assert_eq!(found.len(), 2);
}

#[tokio::test]
async fn test_empty_membership_list_matches_nothing() {
    let (_db, table, ctx) = setup("people").await;
    seed(&table, &ctx, &[person("a", 1, "UK")]).await;

    let filter = Filter::new().any_of("age", Vec::<u32>::new());
    let found: Vec<Person> = table.find_all(&ctx, &filter, &[]).await.unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_nested_containment() {
    let (_db, table, ctx) = setup("orders").await;
    let id = Database::new_id();
    table
        .insert_by_id(
            &ctx,
            &id,
            &json!({"customer": {"name": "alice", "tier": "gold"}, "tags": ["rush", "gift"]}),
        )
        .await
        .unwrap();
    table
        .insert_by_id(&ctx, &Database::new_id(), &json!({"customer": {"name": "bob"}, "tags": []}))
        .await
        .unwrap();

    let filter = Filter::new().with("customer", json!({"tier": "gold"}));
    let docs = table.find_documents(&ctx, &filter, &[]).await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, id);
}

#[tokio::test]
async fn test_pagination() {
    let (_db, table, ctx) = setup("people").await;
    seed(
        &table,
        &ctx,
        &[
            person("e", 50, "UK"),
            person("b", 20, "UK"),
            person("d", 40, "UK"),
            person("a", 10, "UK"),
            person("c", 30, "UK"),
        ],
    )
    .await;
    let all = Filter::new();

    let first: Vec<Person> = table
        .find_all(&ctx, &all, &[order_by("age"), limit(2)])
        .await
        .unwrap();
    let names: Vec<_> = first.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["a", "b"]);

    let second: Vec<Person> = table
        .find_all(&ctx, &all, &[order_by("age"), limit(2), offset(2)])
        .await
        .unwrap();
    let names: Vec<_> = second.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["c", "d"]);

    let newest: Vec<Person> = table
        .find_all(&ctx, &all, &[order_by_desc("age"), limit(1)])
        .await
        .unwrap();
    assert_eq!(newest[0].name, "e");
}

#[tokio::test]
async fn test_repeated_limit_keeps_the_last_value() {
    let (_db, table, ctx) = setup("people").await;
    seed(
        &table,
        &ctx,
        &[person("a", 1, "UK"), person("b", 2, "UK"), person("c", 3, "UK")],
    )
    .await;

    let found: Vec<Person> = table
        .find_all(&ctx, &Filter::new(), &[order_by("age"), limit(1), limit(2)])
        .await
        .unwrap();
    assert_eq!(found.len(), 2);
}

#[tokio::test]
async fn test_find_into_reuses_and_truncates() {
    let (_db, table, ctx) = setup("people").await;
    seed(&table, &ctx, &[person("a", 1, "UK"), person("b", 2, "US")]).await;
    let filter = Filter::new().with("location", "UK");

    let mut people = vec![person("stale", 0, "X"), person("stale", 0, "X"), person("stale", 0, "X")];
    let n = table.find_into(&ctx, &filter, &[], &mut people).await.unwrap();
    assert_eq!(n, 1);
    assert_eq!(people, vec![person("a", 1, "UK")]);

    let mut queue: VecDeque<Value> = VecDeque::new();
    let n = table.find_into(&ctx, &Filter::new(), &[order_by("age")], &mut queue).await.unwrap();
    assert_eq!(n, 2);
    assert_eq!(queue[1]["name"], "b");

    let mut untyped = json!([]);
    table.find_into(&ctx, &Filter::new(), &[], &mut untyped).await.unwrap();
    assert_eq!(untyped.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_find_into_rejects_non_array_destination() {
    let (_db, table, ctx) = setup("people").await;
    let mut not_a_list = json!({"oops": true});
    let err = assert_err!(table.find_into(&ctx, &Filter::new(), &[], &mut not_a_list).await);
    assert!(matches!(err, DbError::InvalidDestination(_)));
}

#[tokio::test]
async fn test_decode_error_clears_destination() {
    let (_db, table, ctx) = setup("people").await;
    table.insert_by_id(&ctx, &Database::new_id(), &json!({"unexpected": true})).await.unwrap();

    let mut people = vec![person("kept?", 0, "X")];
    let err = assert_err!(table.find_into(&ctx, &Filter::new(), &[], &mut people).await);
    assert!(matches!(err, DbError::Decode(_)));
    assert!(people.is_empty());
}

#[tokio::test]
async fn test_insert_many_and_find_documents() {
    let (_db, table, ctx) = setup("people").await;
    let stamp = chrono::DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let docs = vec![
        Document::with_new_id(&person("a", 1, "UK")).unwrap().updated_at(stamp),
        Document::with_new_id(&person("b", 2, "UK")).unwrap(),
    ];

    let inserted = table.insert_many(&ctx, &docs).await.unwrap();
    assert_eq!(inserted.rows_affected(), 2);
    assert_eq!(table.insert_many(&ctx, &[]).await.unwrap().rows_affected(), 0);

    let found = table
        .find_documents(&ctx, &Filter::new(), &[order_by("age")])
        .await
        .unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].id, docs[0].id);
    assert_eq!(found[0].updated_at, Some(stamp));
    assert!(found[1].updated_at.is_some());
    assert_eq!(found[1].decode::<Person>().unwrap(), person("b", 2, "UK"));
}

#[tokio::test]
async fn test_update_delete_and_count() {
    let (_db, table, ctx) = setup("people").await;
    let id = Database::new_id();
    table.insert_by_id(&ctx, &id, &person("a", 1, "UK")).await.unwrap();
    seed(&table, &ctx, &[person("b", 2, "US"), person("c", 3, "US")]).await;

    let updated = table.update_by_id(&ctx, &id, &person("a", 11, "DE")).await.unwrap();
    assert_eq!(updated.rows_affected(), 1);
    let found: Option<Person> = table.find_by_id(&ctx, &id).await.unwrap();
    assert_eq!(found, Some(person("a", 11, "DE")));

    let us = Filter::new().with("location", "US");
    assert_eq!(table.count_documents(&ctx, &us).await.unwrap(), 2);
    assert_eq!(table.delete_many(&ctx, &us).await.unwrap().rows_affected(), 2);
    assert_eq!(table.count_documents(&ctx, &Filter::new()).await.unwrap(), 1);

    assert_eq!(table.delete_by_id(&ctx, &id).await.unwrap().rows_affected(), 1);
    assert_eq!(table.delete_by_id(&ctx, &id).await.unwrap().rows_affected(), 0);
    assert_eq!(table.count_documents(&ctx, &Filter::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_create_is_idempotent() {
    let (_db, table, ctx) = setup("people").await;
    assert_ok!(table.create(&ctx).await);
}

#[tokio::test]
async fn test_missing_table_surfaces() {
    let db = Database::memory();
    let table = db.table("nowhere").unwrap();
    let err = assert_err!(table.count_documents(&Context::background(), &Filter::new()).await);
    assert!(matches!(err, DbError::TableNotFound(_)));
}
