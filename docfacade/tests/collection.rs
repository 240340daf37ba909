mod common;

use std::collections::HashMap;

use docfacade::{config, memory, prelude::*};

use common::{Task, manager};

#[tokio::test]
async fn inserted_id_finds_the_same_document() {
    let manager = manager().await;
    let ctx = Context::background();
    let tasks = manager.require_collection("tasks").unwrap();

    let original = doc! { "name": "a", "retries": 2, "tags": ["x", "y"] };
    let inserted = tasks.insert_one(&ctx, &original).await.unwrap();
    assert_eq!(inserted.inserted_id().as_str().len(), 24);

    let mut found = tasks
        .find_one(&ctx, inserted.inserted_id().filter())
        .await
        .unwrap()
        .into_document()
        .unwrap();
    found.remove("_id");

    assert_eq!(found, original);
}

#[tokio::test]
async fn typed_values_round_trip() {
    let manager = manager().await;
    let ctx = Context::background();
    let tasks = manager.require_collection("tasks").unwrap();

    let task = Task {
        name: "compile".into(),
        status: Some("queued".into()),
    };
    let inserted = tasks.insert_one(&ctx, &task).await.unwrap();

    let found: Task = tasks
        .find_one(&ctx, inserted.inserted_id().filter())
        .await
        .unwrap()
        .decode()
        .unwrap();
    assert_eq!(found, task);
}

#[tokio::test]
async fn insert_many_preserves_input_order() {
    let manager = manager().await;
    let ctx = Context::background();
    let tasks = manager.require_collection("tasks").unwrap();

    let batch = vec![
        doc! { "_id": "t-3", "name": "c" },
        doc! { "name": "generated" },
        doc! { "_id": 7, "name": "a" },
    ];
    let inserted = tasks.insert_many(&ctx, &batch).await.unwrap();

    let ids: Vec<&str> = inserted.inserted_ids().iter().map(DocumentId::as_str).collect();
    assert_eq!(inserted.len(), 3);
    assert_eq!(ids[0], "t-3");
    assert_eq!(ids[1].len(), 24);
    assert_eq!(ids[2], "7");
}

#[tokio::test]
async fn partial_insert_many_reports_what_was_written() {
    let manager = manager().await;
    let ctx = Context::background();
    let tasks = manager.require_collection("tasks").unwrap();

    let err = tasks
        .insert_many(&ctx, &[doc! { "_id": "a" }, doc! { "_id": "a" }])
        .await
        .unwrap_err();

    match err {
        FacadeError::Write(failure) => {
            assert!(failure.is_partial());
            assert_eq!(failure.inserted_ids, vec!["a"]);
            assert!(failure.reason.contains("E11000 duplicate key"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn insert_update_delete_scenario() {
    let manager = manager().await;
    let ctx = Context::background();
    let tasks = manager.require_collection("tasks").unwrap();

    tasks
        .insert_many(&ctx, &[doc! { "name": "a" }, doc! { "name": "b" }])
        .await
        .unwrap();

    let documents = tasks.find(&ctx, doc! {}).await.unwrap().documents(&ctx).await.unwrap();
    let mut names: Vec<&str> = documents.iter().map(|d| d.get_str("name").unwrap()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["a", "b"]);

    let updated = tasks
        .update_many(&ctx, doc! {}, doc! { "$set": { "status": "done" } })
        .await
        .unwrap();
    assert_eq!(updated.matched_count(), 2);
    assert_eq!(updated.modified_count(), 2);
    assert_eq!(updated.upserted_count(), 0);

    let deleted = tasks.delete_many(&ctx, doc! {}).await.unwrap();
    assert_eq!(deleted.deleted_count(), 2);

    let remaining = tasks.find(&ctx, doc! {}).await.unwrap().documents(&ctx).await.unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn update_one_and_delete_one_touch_a_single_document() {
    let manager = manager().await;
    let ctx = Context::background();
    let tasks = manager.require_collection("tasks").unwrap();

    tasks
        .insert_many(&ctx, &[Task::named("a"), Task::named("a"), Task::named("b")])
        .await
        .unwrap();

    let updated = tasks
        .update_one(&ctx, doc! { "name": "a" }, doc! { "$set": { "status": "running" } })
        .await
        .unwrap();
    assert_eq!((updated.matched_count(), updated.modified_count()), (1, 1));
    assert_eq!(tasks.count_documents(&ctx, doc! { "status": "running" }).await.unwrap(), 1);

    let deleted = tasks.delete_one(&ctx, doc! { "name": "a" }).await.unwrap();
    assert_eq!(deleted.deleted_count(), 1);
    assert_eq!(tasks.count_documents(&ctx, doc! {}).await.unwrap(), 2);
}

#[tokio::test]
async fn upsert_reports_the_new_id() {
    let manager = manager().await;
    let ctx = Context::background();
    let batches = manager.require_collection("batches").unwrap();

    let result = batches
        .update_one_with(
            &ctx,
            doc! { "name": "nightly" },
            doc! { "$inc": { "runs": 1 } },
            UpdateOptions::upsert(),
        )
        .await
        .unwrap();

    assert_eq!(result.matched_count(), 0);
    assert_eq!(result.upserted_count(), 1);
    let id = result.upserted_id().unwrap();

    let stored = batches.find_one(&ctx, id.filter()).await.unwrap().into_document().unwrap();
    assert_eq!(stored.get_str("name").unwrap(), "nightly");
    assert_eq!(stored.get_i32("runs").unwrap(), 1);

    let again = batches
        .update_one_with(&ctx, doc! { "name": "nightly" }, doc! { "$inc": { "runs": 1 } }, UpdateOptions::upsert())
        .await
        .unwrap();
    assert_eq!((again.matched_count(), again.upserted_count()), (1, 0));
}

#[tokio::test]
async fn find_one_without_match_decodes_to_not_found() {
    let manager = manager().await;
    let tasks = manager.require_collection("tasks").unwrap();

    let result = tasks
        .find_one(&Context::background(), doc! { "name": "missing" })
        .await
        .unwrap();

    assert!(!result.is_found());
    assert_eq!(result.decode::<Task>().unwrap_err().kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn malformed_requests_map_to_query_and_write_errors() {
    let manager = manager().await;
    let ctx = Context::background();
    let tasks = manager.require_collection("tasks").unwrap();
    tasks.insert_one(&ctx, &Task::named("a")).await.unwrap();

    let err = tasks.find(&ctx, doc! { "name": { "$regex": "a" } }).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Query);

    let err = tasks.update_many(&ctx, doc! {}, doc! { "status": "done" }).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Write);

    let err = tasks.delete_many(&ctx, doc! { "$where": "true" }).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Write);
}

#[tokio::test]
async fn collections_are_fixed_at_construction() {
    let manager = manager().await;

    assert_eq!(manager.collection_names().collect::<Vec<_>>(), vec!["batches", "tasks"]);
    assert!(manager.collection("jobs").is_none());
    assert_eq!(
        manager.require_collection("jobs").unwrap_err().kind(),
        ErrorKind::CollectionNotRegistered
    );
}

#[tokio::test]
async fn handles_share_one_store() {
    let manager = manager().await;
    let ctx = Context::background();

    let writer = manager.require_collection("tasks").unwrap();
    let reader = manager.require_collection("tasks").unwrap();
    let other = manager.require_collection("batches").unwrap();

    writer.insert_one(&ctx, &Task::named("a")).await.unwrap();

    assert_eq!(reader.count_documents(&ctx, doc! {}).await.unwrap(), 1);
    assert_eq!(other.count_documents(&ctx, doc! {}).await.unwrap(), 0);
}

#[tokio::test]
async fn bad_uri_fails_with_connection_error() {
    let err = memory::connect("mongodb://localhost:27017", "drag", ["tasks"])
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Connection);
}

#[tokio::test]
async fn config_from_environment_variables() {
    let vars = HashMap::from([
        (config::ENV_URI.to_string(), "memory://local".to_string()),
        (config::ENV_DATABASE.to_string(), "drag".to_string()),
        (config::ENV_COLLECTIONS.to_string(), "batches,tasks".to_string()),
        (config::ENV_OPERATION_TIMEOUT_MS.to_string(), "5000".to_string()),
    ]);
    let config = ClientConfig::from_vars(&vars).unwrap();

    let manager = memory::connect_with_config(&config).await.unwrap();
    let ctx = config.context();
    assert!(ctx.deadline().is_some());

    manager.ping(&ctx).await.unwrap();
    assert_eq!(manager.database(), "drag");
    assert!(manager.collection("batches").is_some());

    manager.close().await.unwrap();
}
