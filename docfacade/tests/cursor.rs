mod common;

use std::time::Duration;

use docfacade::prelude::*;

use common::{Task, manager};

async fn seeded(manager: &ConnectionManager<docfacade::memory::MemoryDriver>, names: &[&str]) {
    let tasks = manager.require_collection("tasks").unwrap();
    let batch: Vec<Task> = names.iter().map(|name| Task::named(name)).collect();

    tasks.insert_many(&Context::background(), &batch).await.unwrap();
}

#[tokio::test]
async fn streaming_decode_yields_exactly_the_matching_documents() {
    let manager = manager().await;
    seeded(&manager, &["a", "b", "c", "b"]).await;
    let ctx = Context::background();
    let tasks = manager.require_collection("tasks").unwrap();

    let mut cursor = tasks.find(&ctx, doc! { "name": "b" }).await.unwrap();
    let found: Vec<Task> = cursor.stream_decode(&ctx).await.unwrap();

    assert_eq!(found, vec![Task::named("b"), Task::named("b")]);
    assert!(cursor.is_closed());
}

#[tokio::test]
async fn streaming_decode_reports_the_offending_index() {
    let manager = manager().await;
    let ctx = Context::background();
    let tasks = manager.require_collection("tasks").unwrap();
    tasks
        .insert_many(&ctx, &[doc! { "name": "a" }, doc! { "title": "no name" }])
        .await
        .unwrap();

    let mut cursor = tasks.find(&ctx, doc! {}).await.unwrap();
    match cursor.stream_decode::<Task>(&ctx).await.unwrap_err() {
        FacadeError::Decode { index, .. } => assert_eq!(index, Some(1)),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(cursor.is_closed());
}

#[tokio::test]
async fn batch_decode_keeps_every_document() {
    let manager = manager().await;
    seeded(&manager, &["a", "b", "c"]).await;
    let ctx = Context::background();
    let tasks = manager.require_collection("tasks").unwrap();

    let decoded: Vec<Task> = tasks.find(&ctx, doc! {}).await.unwrap().decode_all(&ctx).await.unwrap();
    assert_eq!(decoded.len(), 3);

    let err = tasks
        .find(&ctx, doc! {})
        .await
        .unwrap()
        .decode_single::<Task>(&ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert!(err.to_string().contains("3 documents"));
}

#[tokio::test]
async fn decode_single_takes_the_only_document() {
    let manager = manager().await;
    seeded(&manager, &["a", "b"]).await;
    let ctx = Context::background();
    let tasks = manager.require_collection("tasks").unwrap();

    let only: Task = tasks
        .find(&ctx, doc! { "name": "b" })
        .await
        .unwrap()
        .decode_single(&ctx)
        .await
        .unwrap();
    assert_eq!(only, Task::named("b"));
}

#[tokio::test]
async fn closed_and_exhausted_cursors_refuse_reads() {
    let manager = manager().await;
    seeded(&manager, &["a"]).await;
    let ctx = Context::background();
    let tasks = manager.require_collection("tasks").unwrap();

    let mut cursor = tasks.find(&ctx, doc! {}).await.unwrap();
    cursor.close();
    cursor.close();
    assert_eq!(cursor.documents(&ctx).await.unwrap_err().kind(), ErrorKind::CursorClosed);
    assert_eq!(cursor.try_close().unwrap_err().kind(), ErrorKind::CursorClosed);

    let mut cursor = tasks.find(&ctx, doc! {}).await.unwrap();
    assert_eq!(cursor.documents(&ctx).await.unwrap().len(), 1);
    assert_eq!(cursor.documents(&ctx).await.unwrap_err().kind(), ErrorKind::CursorClosed);
    assert_eq!(cursor.decode_all::<Task>(&ctx).await.unwrap_err().kind(), ErrorKind::CursorClosed);
}

#[tokio::test]
async fn manual_iteration() {
    let manager = manager().await;
    seeded(&manager, &["a", "b"]).await;
    let ctx = Context::background();
    let tasks = manager.require_collection("tasks").unwrap();

    let mut cursor = tasks.find(&ctx, doc! {}).await.unwrap();
    let mut seen = Vec::new();
    while let Some(task) = cursor.next_as::<Task>(&ctx).await.unwrap() {
        seen.push(task.name);
    }

    assert_eq!(seen, vec!["a", "b"]);
    assert_eq!(cursor.position(), 2);
    assert!(cursor.is_closed());
}

#[tokio::test]
async fn aggregate_runs_the_pipeline() {
    let manager = manager().await;
    seeded(&manager, &["c", "a", "b"]).await;
    let ctx = Context::background();
    let tasks = manager.require_collection("tasks").unwrap();

    let names: Vec<Task> = tasks
        .aggregate(&ctx, vec![doc! { "$sort": { "name": 1 } }, doc! { "$limit": 2 }])
        .await
        .unwrap()
        .decode_all(&ctx)
        .await
        .unwrap();
    assert_eq!(names, vec![Task::named("a"), Task::named("b")]);

    let total = tasks
        .aggregate(&ctx, vec![doc! { "$count": "total" }])
        .await
        .unwrap()
        .documents(&ctx)
        .await
        .unwrap();
    assert_eq!(total, vec![doc! { "total": 3 }]);
}

#[tokio::test]
async fn deferred_pipeline_errors_surface_on_first_read() {
    let manager = manager().await;
    seeded(&manager, &["a"]).await;
    let ctx = Context::background();
    let tasks = manager.require_collection("tasks").unwrap();

    let mut cursor = tasks
        .aggregate(&ctx, vec![doc! { "$bogus": { "x": 1 } }])
        .await
        .unwrap();

    let err = cursor.next(&ctx).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Query);
    assert!(err.to_string().contains("$bogus"));
    assert!(cursor.is_closed());
}

#[tokio::test]
async fn cancelled_context_fails_before_touching_the_store() {
    let manager = manager().await;
    let tasks = manager.require_collection("tasks").unwrap();

    let ctx = Context::background();
    ctx.cancel();
    let err = tasks.insert_one(&ctx, &Task::named("a")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);

    let expired = Context::with_timeout(Duration::ZERO);
    let err = tasks.find(&expired, doc! {}).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);

    assert_eq!(tasks.count_documents(&Context::background(), doc! {}).await.unwrap(), 0);
}

#[tokio::test]
async fn cancelling_a_parent_stops_cursor_reads() {
    let manager = manager().await;
    seeded(&manager, &["a", "b"]).await;
    let parent = Context::background();
    let ctx = parent.child();
    let tasks = manager.require_collection("tasks").unwrap();

    let mut cursor = tasks.find(&ctx, doc! {}).await.unwrap();
    assert!(cursor.next(&ctx).await.unwrap().is_some());

    parent.cancel();
    assert_eq!(cursor.next(&ctx).await.unwrap_err().kind(), ErrorKind::Cancelled);
    assert!(cursor.is_closed());
}
