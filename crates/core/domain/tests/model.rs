use domain::{
    CommunicationError, DeviceClass, Equipment, LogEvent, Parameter, RawReading, Severity,
    Violation, ViolationKind,
};

#[test]
fn equipment_deserializes_with_defaults() {
    let equipment: Equipment = serde_json::from_str(
        r#"{"id":"eq-1","name":"Press 1","ip_address":"10.0.0.5","class":"plc"}"#,
    )
    .expect("equipment");

    assert_eq!(equipment.class, DeviceClass::Controller);
    assert_eq!(equipment.port, 502);
    assert_eq!(equipment.unit_id, 1);
    assert!(equipment.is_active());
    assert_eq!(equipment.address(), "10.0.0.5:502");
}

#[test]
fn violation_becomes_unacknowledged_record() {
    let event = LogEvent::Violation(Violation {
        equipment_id: "eq-1".to_string(),
        meter_id: Some("m-1".to_string()),
        parameter: "active_power".to_string(),
        value: 1050.0,
        threshold_value: 1000.0,
        kind: ViolationKind::CriticalMaxExceeded,
        severity: Severity::Critical,
        message: "active_power 1050 above critical maximum 1000".to_string(),
        ts_ms: 1_000,
    });

    let record = event.into_record("evt-1");
    assert_eq!(record.event_type, "critical_max_exceeded");
    assert_eq!(record.severity, Severity::Critical);
    assert_eq!(record.threshold_value, Some(1000.0));
    assert!(!record.acknowledged);
}

#[test]
fn communication_error_record_names_device() {
    let event = LogEvent::CommunicationError(CommunicationError {
        equipment_id: "eq-2".to_string(),
        equipment_name: "Meter 2".to_string(),
        address: "10.0.0.6:502".to_string(),
        message: "connection refused".to_string(),
        ts_ms: 5,
    });

    assert_eq!(event.severity(), Severity::Warning);
    let record = event.into_record("evt-2");
    assert_eq!(record.event_type, "communication_error");
    assert!(record.message.contains("Meter 2"));
    assert!(record.message.contains("connection refused"));
}

#[test]
fn raw_reading_serializes_only_present_values() {
    let reading = RawReading::new("eq-1", 1)
        .with_meter("m-1")
        .with_value(Parameter::ActivePower, 12.5);

    let json = serde_json::to_value(&reading).expect("json");
    assert_eq!(json["values"]["active_power"], 12.5);
    assert!(json["values"].get("reactive_power").is_none());
}
