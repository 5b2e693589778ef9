use api_contract::{ApiResponse, CollectorActionDto};

#[test]
fn success_envelope_carries_data() {
    let response = ApiResponse::success(CollectorActionDto {
        state: "running".to_string(),
        changed: true,
    });
    let value = serde_json::to_value(&response).expect("serialize");
    assert_eq!(value["success"], true);
    assert_eq!(value["data"]["state"], "running");
    assert!(value["error"].is_null());
}

#[test]
fn error_envelope_has_code_and_no_data() {
    let response = ApiResponse::<()>::error("RESOURCE.NOT_FOUND", "event not found");
    assert!(!response.success);
    assert!(response.data.is_none());
    let error = response.error.expect("error body");
    assert_eq!(error.code, "RESOURCE.NOT_FOUND");
    assert_eq!(error.message, "event not found");
}
