// Integration tests for the subscriber ingest loop over a SQLite shape store.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use datapipe_core::diff::{ShapeInfo, ShapeResolution};
use datapipe_core::errors::{ExError, ExErrorKind};
use datapipe_core::logging_facility::test_capture::init_test_capture;
use datapipe_core::model::{DataPoint, DataPointAction, Shape};
use datapipe_core::ops::ShapeStore;
use datapipe_core::plugin::{
    Activity, ActivityHandle, DataTransport, OutputCollector, PluginContext, Publisher,
    PublisherHandle, Subscriber, SubscriberHandle,
};
use datapipe_core::registry::PluginRegistry;
use datapipe_core::types::schema::{
    EVENT_END, EVENT_QUARANTINED, EVENT_SHAPE_CHANGED, EVENT_START, FIELD_ERR_CODE,
    FIELD_ERR_MESSAGE, FIELD_PROPERTY_HASH, FIELD_REPOSITORY, FIELD_REQUEST_ID,
};
use datapipe_engine::commands::{run_pipeline, Ingestor, QuarantinePolicy};
use datapipe_store::SqliteShapeStore;
use rusqlite::Connection;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn setup_db() -> (TempDir, Connection) {
    let temp_dir = TempDir::new().unwrap();
    let conn = datapipe_store::db::open_and_migrate(temp_dir.path().join("shapes.db")).unwrap();
    (temp_dir, conn)
}

fn ctx() -> PluginContext {
    PluginContext::new("acme", "pub-1")
}

fn upsert(entity: &str, data: Value) -> DataPoint {
    DataPoint {
        repository: "acme".to_string(),
        entity: entity.to_string(),
        source: "pub-1".to_string(),
        action: DataPointAction::Upsert,
        key_names: vec!["id".to_string()],
        data: data.as_object().cloned().unwrap(),
        ..Default::default()
    }
}

fn control(entity: &str, action: DataPointAction) -> DataPoint {
    DataPoint {
        repository: "acme".to_string(),
        entity: entity.to_string(),
        action,
        ..Default::default()
    }
}

#[derive(Default)]
struct Recorder {
    seen: Vec<(ShapeInfo, DataPoint)>,
}

impl Subscriber for Recorder {
    fn receive(
        &mut self,
        _ctx: &PluginContext,
        info: &ShapeInfo,
        data_point: &DataPoint,
    ) -> Result<(), ExError> {
        self.seen.push((info.clone(), data_point.clone()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Shape tracking
// ---------------------------------------------------------------------------

#[test]
fn test_widening_is_persisted_and_reported_once() {
    let (_tmp, conn) = setup_db();
    let mut store = SqliteShapeStore::new(&conn, "sub-1");
    let mut recorder = Recorder::default();
    let ctx = ctx();

    let stats = Ingestor::new(&ctx, &mut store, &mut recorder)
        .ingest(vec![
            upsert("user", json!({"id": 1, "name": "a"})),
            upsert("user", json!({"id": 2, "name": "b", "age": 30})),
            upsert("user", json!({"id": 3, "name": "c", "age": 31})),
            upsert("user", json!({"id": 4})),
        ])
        .unwrap();

    assert_eq!(stats.received, 4);
    assert_eq!(stats.delivered, 4);
    assert_eq!(stats.shape_changes, 2);
    assert_eq!(stats.quarantined, 0);

    let infos: Vec<&ShapeInfo> = recorder.seen.iter().map(|(i, _)| i).collect();
    assert_eq!(infos[0].resolution, ShapeResolution::New);
    assert_eq!(infos[1].resolution, ShapeResolution::Widened);
    assert_eq!(
        infos[1].new_properties.get("age").map(String::as_str),
        Some("number")
    );
    assert!(!infos[2].has_changes());
    assert_eq!(infos[3].resolution, ShapeResolution::SubsetOfPrevious);

    let stored = store.get_shape("user").unwrap().unwrap();
    assert_eq!(
        stored.properties,
        vec!["age:number", "id:number", "name:string"]
    );
}

#[test]
fn test_shapes_survive_a_new_ingest_run() {
    let (_tmp, conn) = setup_db();
    let ctx = ctx();

    {
        let mut store = SqliteShapeStore::new(&conn, "sub-1");
        let mut recorder = Recorder::default();
        Ingestor::new(&ctx, &mut store, &mut recorder)
            .ingest(vec![upsert("user", json!({"id": 1, "name": "a"}))])
            .unwrap();
    }

    let mut store = SqliteShapeStore::new(&conn, "sub-1");
    let mut recorder = Recorder::default();
    let stats = Ingestor::new(&ctx, &mut store, &mut recorder)
        .ingest(vec![upsert("user", json!({"id": 9, "name": "z"}))])
        .unwrap();

    assert_eq!(stats.shape_changes, 0);
    assert!(!recorder.seen[0].0.is_new);
}

#[test]
fn test_producer_shape_is_used_when_present() {
    let (_tmp, conn) = setup_db();
    let mut store = SqliteShapeStore::new(&conn, "sub-1");
    let mut recorder = Recorder::default();
    let ctx = ctx();

    // The producer declares a date the shaper would see as a plain string
    let mut dp = upsert("user", json!({"id": 1, "born": "yesterday"}));
    dp.shape = Shape::from_properties(
        vec!["id:number".to_string(), "born:date".to_string()],
        vec![],
    );

    Ingestor::new(&ctx, &mut store, &mut recorder)
        .ingest(vec![dp])
        .unwrap();

    let (info, delivered) = &recorder.seen[0];
    assert_eq!(info.shape.properties, vec!["born:date", "id:number"]);
    assert_eq!(info.shape.key_names, vec!["id".to_string()]);
    assert_eq!(delivered.shape, info.shape);
}

#[test]
fn test_control_actions_bypass_shaping() {
    let (_tmp, conn) = setup_db();
    let mut store = SqliteShapeStore::new(&conn, "sub-1");
    let mut recorder = Recorder::default();
    let ctx = ctx();

    let stats = Ingestor::new(&ctx, &mut store, &mut recorder)
        .ingest(vec![
            control("user", DataPointAction::StartPublish),
            upsert("user", json!({"id": 1})),
            control("user", DataPointAction::EndPublish),
        ])
        .unwrap();

    assert_eq!(stats.delivered, 3);
    assert_eq!(stats.shape_changes, 1);

    let (start_info, _) = &recorder.seen[0];
    assert!(!start_info.has_changes());
    assert!(start_info.shape.is_empty());

    let (end_info, _) = &recorder.seen[2];
    assert!(!end_info.has_changes());
    assert_eq!(end_info.shape.properties, vec!["id:number"]);
}

// ---------------------------------------------------------------------------
// Quarantine
// ---------------------------------------------------------------------------

#[test]
fn test_bad_records_are_quarantined_and_logged() {
    let capture = init_test_capture();
    let (_tmp, conn) = setup_db();
    let mut store = SqliteShapeStore::new(&conn, "sub-1");
    let mut recorder = Recorder::default();
    let ctx = ctx();

    let entity = "quarantine_entity_unique_1";
    let mut missing_key = upsert(entity, json!({"name": "no id"}));
    missing_key.key_names = vec!["id".to_string()];

    let mut ingestor = Ingestor::new(&ctx, &mut store, &mut recorder);
    let stats = ingestor
        .ingest(vec![
            upsert(entity, json!({"id": 1, "a:b": true})),
            missing_key,
            upsert(entity, json!({"id": 2})),
        ])
        .unwrap();

    assert_eq!(stats.received, 3);
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.quarantined, 2);

    let kinds: Vec<ExErrorKind> = ingestor
        .quarantine()
        .iter()
        .map(|q| q.error.kind())
        .collect();
    assert_eq!(
        kinds,
        vec![ExErrorKind::InvalidPropertyName, ExErrorKind::DataMissingKeys]
    );
    drop(ingestor);

    let quarantined = capture.count_events(|e| {
        e.entity.as_deref() == Some(entity) && e.event.as_deref() == Some(EVENT_QUARANTINED)
    });
    assert_eq!(quarantined, 2);

    let shape_changed = capture.count_events(|e| {
        e.entity.as_deref() == Some(entity) && e.event.as_deref() == Some(EVENT_SHAPE_CHANGED)
    });
    assert_eq!(shape_changed, 1);
    capture.assert_event_exists("ingest", EVENT_END);

    let events = capture.events_for_entity(entity);
    let changed = events
        .iter()
        .find(|e| e.event.as_deref() == Some(EVENT_SHAPE_CHANGED))
        .unwrap();
    let expected_hash = store.get_shape(entity).unwrap().unwrap().property_hash;
    assert_eq!(
        changed.field(FIELD_PROPERTY_HASH),
        Some(expected_hash.to_string().as_str())
    );

    let codes: Vec<&str> = events
        .iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_QUARANTINED))
        .filter_map(|e| e.field(FIELD_ERR_CODE))
        .collect();
    assert_eq!(codes, vec!["ERR_INVALID_PROPERTY_NAME", "ERR_DATA_MISSING_KEYS"]);
    assert!(events
        .iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_QUARANTINED))
        .all(|e| e.field(FIELD_ERR_MESSAGE).is_some_and(|m| !m.is_empty())));

    let starts_with_context = capture.count_events(|e| {
        e.op.as_deref() == Some("ingest")
            && e.event.as_deref() == Some(EVENT_START)
            && e.field(FIELD_REPOSITORY) == Some("acme")
            && e.field(FIELD_REQUEST_ID) == Some(ctx.request.request_id.as_str())
    });
    assert_eq!(starts_with_context, 1);
}

#[test]
fn test_abort_policy_returns_the_rejection() {
    let (_tmp, conn) = setup_db();
    let mut store = SqliteShapeStore::new(&conn, "sub-1");
    let mut recorder = Recorder::default();
    let ctx = ctx();

    let err = Ingestor::new(&ctx, &mut store, &mut recorder)
        .with_policy(QuarantinePolicy::Abort)
        .ingest(vec![
            upsert("user", json!({"id": 1})),
            DataPoint {
                entity: "user".to_string(),
                ..Default::default()
            },
        ])
        .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::NoRepository);
    assert_eq!(recorder.seen.len(), 1);
}

struct FailingSubscriber;

impl Subscriber for FailingSubscriber {
    fn receive(&mut self, _: &PluginContext, _: &ShapeInfo, _: &DataPoint) -> Result<(), ExError> {
        Err(ExError::new(ExErrorKind::ExternalService).with_message("warehouse unavailable"))
    }
}

#[test]
fn test_subscriber_failure_aborts_even_when_skipping() {
    let (_tmp, conn) = setup_db();
    let mut store = SqliteShapeStore::new(&conn, "sub-1");
    let mut subscriber = FailingSubscriber;
    let ctx = ctx();

    let err = Ingestor::new(&ctx, &mut store, &mut subscriber)
        .ingest(vec![upsert("user", json!({"id": 1}))])
        .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::ExternalService);
    assert_eq!(err.entity(), Some("user"));
}

#[test]
fn test_shape_is_stored_before_subscriber_failure() {
    let (_tmp, conn) = setup_db();
    let ctx = ctx();

    {
        let mut store = SqliteShapeStore::new(&conn, "sub-1");
        let mut subscriber = FailingSubscriber;
        Ingestor::new(&ctx, &mut store, &mut subscriber)
            .ingest(vec![upsert("user", json!({"id": 1}))])
            .unwrap_err();
    }

    let mut store = SqliteShapeStore::new(&conn, "sub-1");
    let stored = store.get_shape("user").unwrap().expect("shape persisted");
    assert_eq!(stored.properties, vec!["id:number"]);

    let mut recorder = Recorder::default();
    let stats = Ingestor::new(&ctx, &mut store, &mut recorder)
        .ingest(vec![upsert("user", json!({"id": 1}))])
        .unwrap();
    assert_eq!(stats.shape_changes, 0);
    assert!(!recorder.seen[0].0.has_changes());
}

// ---------------------------------------------------------------------------
// Activities
// ---------------------------------------------------------------------------

/// Splits `lines` arrays into one data point per line and drops empty orders
struct SplitLines;

impl Activity for SplitLines {
    fn execute(
        &mut self,
        _ctx: &PluginContext,
        output: &mut dyn OutputCollector,
        data_point: DataPoint,
    ) -> Result<(), ExError> {
        let Some(Value::Array(lines)) = data_point.data.get("lines").cloned() else {
            return output.emit(data_point);
        };
        for line in lines {
            let mut dp = data_point.clone();
            dp.entity = "order_line".to_string();
            dp.data.remove("lines");
            if let Value::Object(fields) = line {
                dp.data.extend(fields);
            }
            output.emit(dp)?;
        }
        Ok(())
    }
}

/// Rejects anything flagged as a test record
struct RejectTestRecords;

impl Activity for RejectTestRecords {
    fn execute(
        &mut self,
        _ctx: &PluginContext,
        output: &mut dyn OutputCollector,
        data_point: DataPoint,
    ) -> Result<(), ExError> {
        if data_point.data.get("test") == Some(&Value::Bool(true)) {
            return Err(ExError::new(ExErrorKind::NoData).with_message("test record"));
        }
        output.emit(data_point)
    }
}

#[test]
fn test_activities_fan_out_and_reject() {
    let (_tmp, conn) = setup_db();
    let mut store = SqliteShapeStore::new(&conn, "sub-1");
    let mut recorder = Recorder::default();
    let ctx = ctx();

    let stats = Ingestor::new(&ctx, &mut store, &mut recorder)
        .with_activity(ActivityHandle::plain(RejectTestRecords))
        .with_activity(ActivityHandle::plain(SplitLines))
        .ingest(vec![
            upsert(
                "order",
                json!({"id": 1, "lines": [{"sku": "a", "qty": 1}, {"sku": "b", "qty": 2}]}),
            ),
            upsert("order", json!({"id": 2, "test": true})),
            upsert("order", json!({"id": 3, "lines": []})),
        ])
        .unwrap();

    assert_eq!(stats.received, 3);
    assert_eq!(stats.delivered, 2);
    assert_eq!(stats.quarantined, 1);
    assert!(recorder.seen.iter().all(|(_, dp)| dp.entity == "order_line"));
    assert_eq!(
        recorder.seen[0].0.shape.properties,
        vec!["id:number", "qty:number", "sku:string"]
    );
}

// ---------------------------------------------------------------------------
// Registry-driven pipeline
// ---------------------------------------------------------------------------

struct TwoUsers;

impl Publisher for TwoUsers {
    fn publish(
        &mut self,
        ctx: &PluginContext,
        transport: &mut dyn DataTransport,
    ) -> Result<(), ExError> {
        let keys = vec!["id".to_string()];
        let first = json!({"id": 1, "name": "a"}).as_object().cloned().unwrap_or_default();
        let second = json!({"id": 2, "name": "b", "vip": true})
            .as_object()
            .cloned()
            .unwrap_or_default();
        transport.send(vec![
            ctx.new_data_point("user", &keys, first),
            ctx.new_data_point("user", &keys, second),
        ])
    }
}

/// Shares what it receives with the test through an `Arc`
struct SharedRecorder {
    seen: Arc<Mutex<Vec<ShapeInfo>>>,
    disposed: Arc<Mutex<bool>>,
}

impl Subscriber for SharedRecorder {
    fn receive(&mut self, _: &PluginContext, info: &ShapeInfo, _: &DataPoint) -> Result<(), ExError> {
        self.seen.lock().unwrap().push(info.clone());
        Ok(())
    }

    fn dispose(&mut self) {
        *self.disposed.lock().unwrap() = true;
    }
}

#[test]
fn test_run_pipeline_from_registry() {
    let (_tmp, conn) = setup_db();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let disposed = Arc::new(Mutex::new(false));

    let mut registry = PluginRegistry::new();
    registry
        .publishers
        .register("users", Box::new(|| PublisherHandle::plain(TwoUsers)))
        .unwrap();
    let (seen_f, disposed_f) = (seen.clone(), disposed.clone());
    registry
        .subscribers
        .register(
            "recorder",
            Box::new(move || {
                SubscriberHandle::plain(SharedRecorder {
                    seen: seen_f.clone(),
                    disposed: disposed_f.clone(),
                })
            }),
        )
        .unwrap();

    let mut store = SqliteShapeStore::new(&conn, "sub-1");
    let stats = run_pipeline(
        &registry,
        "users",
        "recorder",
        &ctx(),
        &mut store,
        QuarantinePolicy::Skip,
    )
    .unwrap();

    assert_eq!(stats.delivered, 2);
    assert_eq!(stats.shape_changes, 2);
    assert!(*disposed.lock().unwrap());

    let seen = seen.lock().unwrap();
    assert!(seen[0].is_new);
    assert_eq!(seen[1].new_properties.len(), 1);
    assert!(seen[1].new_properties.contains_key("vip"));
}

#[test]
fn test_run_pipeline_unknown_subscriber() {
    let (_tmp, conn) = setup_db();
    let mut registry = PluginRegistry::new();
    registry
        .publishers
        .register("users", Box::new(|| PublisherHandle::plain(TwoUsers)))
        .unwrap();

    let mut store = SqliteShapeStore::new(&conn, "sub-1");
    let err = run_pipeline(
        &registry,
        "users",
        "missing",
        &ctx(),
        &mut store,
        QuarantinePolicy::Skip,
    )
    .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::FactoryNotFound);
}
