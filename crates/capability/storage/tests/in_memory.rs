use domain::{
    CommunicationError, DataQuality, EquipmentState, LogEvent, Parameter, RawReading, Severity,
    ValidatedReading, Violation, ViolationKind,
};
use ems_storage::{
    CycleBatch, CycleStore, EquipmentStateRecord, EquipmentStateStore, EventLogStore,
    InMemoryCycleStore, InMemoryEquipmentStateStore, InMemoryEventLogStore,
    InMemoryLatestReadingStore, InMemoryReadingStore, LatestReadingStore, MAX_QUERY_LIMIT,
    ReadingQuery, ReadingStore, TimeOrder,
};
use std::sync::Arc;

fn reading(equipment_id: &str, meter_id: &str, area_id: &str, ts_ms: i64) -> ValidatedReading {
    ValidatedReading::accept(
        RawReading::new(equipment_id, ts_ms)
            .with_meter(meter_id)
            .with_area(Some(area_id.to_string()))
            .with_value(Parameter::ActivePower, ts_ms as f64 / 1000.0),
    )
}

fn violation(severity: Severity, ts_ms: i64) -> LogEvent {
    let kind = match severity {
        Severity::Critical => ViolationKind::CriticalMaxExceeded,
        _ => ViolationKind::WarningMaxExceeded,
    };
    LogEvent::Violation(Violation {
        equipment_id: "eq-1".to_string(),
        meter_id: Some("m-1".to_string()),
        parameter: "active_power".to_string(),
        value: 120.0,
        threshold_value: 100.0,
        kind,
        severity,
        message: "active_power 120.00 above maximum 100.00".to_string(),
        ts_ms,
    })
}

#[tokio::test]
async fn readings_filter_by_range_equipment_and_area() {
    let store = InMemoryReadingStore::new();
    let written = store
        .write_readings(&[
            reading("eq-1", "m-1", "area-1", 1000),
            reading("eq-1", "m-1", "area-1", 2000),
            reading("eq-2", "m-2", "area-2", 2000),
            reading("eq-1", "m-1", "area-1", 3000),
        ])
        .await
        .expect("write");
    assert_eq!(written, 4);
    assert_eq!(store.len(), 4);

    let by_range = store
        .query_readings(ReadingQuery {
            from_ms: Some(2000),
            to_ms: Some(3000),
            equipment_id: Some("eq-1".to_string()),
            ..ReadingQuery::default()
        })
        .await
        .expect("query");
    let ts: Vec<i64> = by_range.iter().map(|r| r.ts_ms).collect();
    assert_eq!(ts, vec![2000, 3000]);

    let by_area = store
        .query_readings(ReadingQuery {
            area_id: Some("area-2".to_string()),
            ..ReadingQuery::default()
        })
        .await
        .expect("query");
    assert_eq!(by_area.len(), 1);
    assert_eq!(by_area[0].equipment_id, "eq-2");
}

#[tokio::test]
async fn readings_desc_order_and_limit() {
    let store = InMemoryReadingStore::new();
    store
        .write_readings(&[
            reading("eq-1", "m-1", "area-1", 3000),
            reading("eq-1", "m-1", "area-1", 1000),
            reading("eq-1", "m-1", "area-1", 2000),
        ])
        .await
        .expect("write");

    let items = store
        .query_readings(ReadingQuery {
            limit: 2,
            order: TimeOrder::Desc,
            ..ReadingQuery::default()
        })
        .await
        .expect("query");
    let ts: Vec<i64> = items.iter().map(|r| r.ts_ms).collect();
    assert_eq!(ts, vec![3000, 2000]);
}

#[tokio::test]
async fn inverted_range_is_rejected() {
    let store = InMemoryReadingStore::new();
    let result = store
        .query_readings(ReadingQuery {
            from_ms: Some(5000),
            to_ms: Some(1000),
            ..ReadingQuery::default()
        })
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn active_events_sorted_by_severity_then_time() {
    let store = InMemoryEventLogStore::new();
    store.create_event(violation(Severity::High, 100)).await.expect("create");
    store.create_event(violation(Severity::Critical, 50)).await.expect("create");
    store
        .create_event(LogEvent::CommunicationError(CommunicationError {
            equipment_id: "eq-2".to_string(),
            equipment_name: "Press 2".to_string(),
            address: "10.0.0.2:502".to_string(),
            message: "connection refused".to_string(),
            ts_ms: 200,
        }))
        .await
        .expect("create");

    let active = store.list_active_events(10).await.expect("list");
    let order: Vec<(&str, i64)> = active
        .iter()
        .map(|e| (e.severity.as_str(), e.ts_ms))
        .collect();
    assert_eq!(
        order,
        vec![("critical", 50), ("warning", 200), ("high", 100)]
    );
    assert_eq!(active[1].event_type, "communication_error");
    assert!(active[1].message.contains("10.0.0.2:502"));
}

#[tokio::test]
async fn acknowledged_events_leave_active_list() {
    let store = InMemoryEventLogStore::new();
    let record = store
        .create_event(violation(Severity::Critical, 10))
        .await
        .expect("create");
    assert!(!record.acknowledged);
    assert!(!record.event_id.is_empty());

    assert!(store.acknowledge_event(&record.event_id).await.expect("ack"));
    assert!(!store.acknowledge_event(&record.event_id).await.expect("ack twice"));
    assert!(!store.acknowledge_event("missing").await.expect("ack missing"));
    assert!(store.list_active_events(10).await.expect("list").is_empty());
    assert_eq!(store.all().len(), 1);
}

#[tokio::test]
async fn latest_keeps_newest_per_meter() {
    let store = InMemoryLatestReadingStore::new();
    store
        .upsert_latest(&reading("eq-1", "m-1", "area-1", 2000))
        .await
        .expect("upsert");
    store
        .upsert_latest(&reading("eq-1", "m-1", "area-1", 1000))
        .await
        .expect("upsert older");
    let mut poor = reading("eq-1", "m-2", "area-1", 1500);
    poor.quality = DataQuality::Poor;
    store.upsert_latest(&poor).await.expect("upsert");

    let latest = store
        .get_latest("eq-1", Some("m-1"))
        .await
        .expect("get")
        .expect("present");
    assert_eq!(latest.ts_ms, 2000);
    assert!(store.get_latest("eq-1", None).await.expect("get").is_none());

    let all = store.list_latest().await.expect("list");
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].quality, DataQuality::Poor);
}

#[tokio::test]
async fn latest_state_per_equipment() {
    let store = InMemoryEquipmentStateStore::new();
    store
        .write_state("plc-1", &EquipmentState::decode(100, vec![0x0001, 7], vec![true]))
        .await
        .expect("write");
    store
        .write_state("plc-1", &EquipmentState::decode(200, vec![0x0004], Vec::new()))
        .await
        .expect("write");

    let states = store.latest_states().await.expect("latest");
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].equipment_id, "plc-1");
    assert_eq!(states[0].state.ts_ms, 200);
    assert_eq!(store.history("plc-1").len(), 2);
}

#[tokio::test]
async fn offset_skips_in_query_order() {
    let store = InMemoryReadingStore::new();
    store
        .write_readings(&[
            reading("eq-1", "m-1", "area-1", 1000),
            reading("eq-1", "m-1", "area-1", 2000),
            reading("eq-1", "m-1", "area-1", 3000),
        ])
        .await
        .expect("write");

    let items = store
        .query_readings(ReadingQuery {
            limit: 1,
            offset: 1,
            order: TimeOrder::Desc,
            ..ReadingQuery::default()
        })
        .await
        .expect("query");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].ts_ms, 2000);
}

#[tokio::test]
async fn query_all_readings_pages_past_the_row_cap() {
    let store = InMemoryReadingStore::new();
    let total = MAX_QUERY_LIMIT + 2_000;
    let readings: Vec<ValidatedReading> = (0..total as i64)
        .map(|i| reading("eq-1", "m-1", "area-1", i * 5_000))
        .collect();
    store.write_readings(&readings).await.expect("write");

    let window = ReadingQuery {
        from_ms: Some(0),
        to_ms: Some(24 * 3_600_000),
        ..ReadingQuery::default()
    };
    let capped = store.query_readings(window.clone()).await.expect("query");
    assert_eq!(capped.len(), MAX_QUERY_LIMIT);

    let all = store.query_all_readings(window).await.expect("query all");
    assert_eq!(all.len(), total);
    assert!(all.windows(2).all(|pair| pair[0].ts_ms < pair[1].ts_ms));
    assert_eq!(all.last().map(|r| r.ts_ms), Some((total as i64 - 1) * 5_000));
}

#[tokio::test]
async fn reading_retention_drops_oldest() {
    let store = InMemoryReadingStore::with_retention(3);
    for ts in [1000, 2000, 3000, 4000, 5000] {
        store
            .write_readings(&[reading("eq-1", "m-1", "area-1", ts)])
            .await
            .expect("write");
    }
    assert_eq!(store.len(), 3);
    let ts: Vec<i64> = store
        .query_readings(ReadingQuery::default())
        .await
        .expect("query")
        .iter()
        .map(|r| r.ts_ms)
        .collect();
    assert_eq!(ts, vec![3000, 4000, 5000]);
}

#[tokio::test]
async fn event_retention_drops_acknowledged_first() {
    let store = InMemoryEventLogStore::with_retention(3);
    let first = store
        .create_event(violation(Severity::High, 10))
        .await
        .expect("create");
    let second = store
        .create_event(violation(Severity::High, 20))
        .await
        .expect("create");
    store
        .create_event(violation(Severity::High, 30))
        .await
        .expect("create");
    assert!(store.acknowledge_event(&second.event_id).await.expect("ack"));

    store
        .create_event(violation(Severity::High, 40))
        .await
        .expect("create");
    let kept: Vec<i64> = store.all().iter().map(|e| e.ts_ms).collect();
    assert_eq!(kept, vec![10, 30, 40]);
    assert_eq!(store.all()[0].event_id, first.event_id);

    // 没有已确认事件时丢最早的
    store
        .create_event(violation(Severity::High, 50))
        .await
        .expect("create");
    let kept: Vec<i64> = store.all().iter().map(|e| e.ts_ms).collect();
    assert_eq!(kept, vec![30, 40, 50]);
}

#[tokio::test]
async fn state_history_is_capped_per_equipment() {
    let store = InMemoryEquipmentStateStore::with_history_limit(2);
    for ts in [100, 200, 300] {
        store
            .write_state("plc-1", &EquipmentState::decode(ts, vec![0x0001], Vec::new()))
            .await
            .expect("write");
    }
    let history = store.history("plc-1");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].ts_ms, 200);
}

#[tokio::test]
async fn cycle_batch_lands_in_every_store() {
    let readings = Arc::new(InMemoryReadingStore::new());
    let states = Arc::new(InMemoryEquipmentStateStore::new());
    let events = Arc::new(InMemoryEventLogStore::new());
    let store = InMemoryCycleStore::new(readings.clone(), states.clone(), events.clone());

    let records = store
        .write_cycle(&CycleBatch {
            readings: vec![
                reading("eq-1", "m-1", "area-1", 1000),
                reading("eq-2", "m-2", "area-2", 1000),
            ],
            states: vec![EquipmentStateRecord {
                equipment_id: "plc-1".to_string(),
                state: EquipmentState::decode(1000, vec![0x0001], Vec::new()),
            }],
            events: vec![violation(Severity::Critical, 1000)],
        })
        .await
        .expect("write cycle");

    assert_eq!(records.len(), 1);
    assert!(!records[0].event_id.is_empty());
    assert_eq!(readings.len(), 2);
    assert_eq!(states.history("plc-1").len(), 1);
    assert_eq!(events.all(), records);
}
