//! Output Validation Tests
//!
//! This module validates that all Docket output conforms to the defined JSON
//! contract. It ensures:
//! - Success envelopes match the expected schema
//! - Error envelopes match the expected schema
//! - Audit records serialize with a stable field set
//! - Error codes are drawn from the stable documented set
//!
//! Uses `insta` for snapshot testing to detect unintended output changes.

use chrono::TimeZone;
use docket::{
    AuditRecord, AuditStatus, DocketError, ErrorEnvelope, ErrorInfo, Metadata, SuccessEnvelope,
};

// ============================================================================
// Success Envelope Structure Tests
// ============================================================================

#[test]
fn test_success_envelope_structure() {
    let data = serde_json::json!({"test": "value"});
    let envelope: SuccessEnvelope<serde_json::Value> =
        SuccessEnvelope::new("get", data, Metadata::new(42));

    let json_str = serde_json::to_string(&envelope).expect("Should serialize");
    let json_value: serde_json::Value =
        serde_json::from_str(&json_str).expect("Should deserialize");

    assert!(json_value.is_object(), "Should be JSON object");
    assert_eq!(json_value["success"], true, "success should be true");
    assert_eq!(json_value["command"], "get", "command should be get");
    assert!(json_value["data"].is_object(), "data should be object");
    assert!(json_value["metadata"].is_object(), "metadata should be object");

    assert_eq!(json_value["metadata"]["execution_ms"], 42, "execution_ms should be 42");

    // No extra fields beyond the contract
    let top_level_keys: Vec<&str> =
        json_value.as_object().unwrap().keys().map(|s| s.as_str()).collect();
    assert_eq!(top_level_keys.len(), 4, "Should have exactly 4 top-level fields");
    assert!(top_level_keys.contains(&"success"));
    assert!(top_level_keys.contains(&"command"));
    assert!(top_level_keys.contains(&"data"));
    assert!(top_level_keys.contains(&"metadata"));
}

#[test]
fn test_error_envelope_structure() {
    let envelope = ErrorEnvelope::new("run", ErrorInfo::new("TEST_ERROR", "Test error message"));

    let json_str = serde_json::to_string(&envelope).expect("Should serialize");
    let json_value: serde_json::Value =
        serde_json::from_str(&json_str).expect("Should deserialize");

    assert!(json_value.is_object(), "Should be JSON object");
    assert_eq!(json_value["success"], false, "success should be false");
    assert_eq!(json_value["command"], "run", "command should be run");
    assert!(json_value["error"].is_object(), "error should be object");

    assert_eq!(json_value["error"]["code"], "TEST_ERROR");
    assert_eq!(json_value["error"]["message"], "Test error message");

    let top_level_keys: Vec<&str> =
        json_value.as_object().unwrap().keys().map(|s| s.as_str()).collect();
    assert_eq!(top_level_keys.len(), 3, "Should have exactly 3 top-level fields");
    assert!(top_level_keys.contains(&"success"));
    assert!(top_level_keys.contains(&"command"));
    assert!(top_level_keys.contains(&"error"));

    let error_keys: Vec<&str> =
        json_value["error"].as_object().unwrap().keys().map(|s| s.as_str()).collect();
    assert_eq!(error_keys.len(), 2, "Should have exactly 2 error fields");
    assert!(error_keys.contains(&"code"));
    assert!(error_keys.contains(&"message"));
}

#[test]
fn test_metadata_rows_returned_only_for_run_results() {
    let without = serde_json::to_value(Metadata::new(10)).unwrap();
    assert!(without.get("rows_returned").is_none(), "rows_returned omitted when absent");

    let with = serde_json::to_value(Metadata::with_rows(10, 7)).unwrap();
    assert_eq!(with["rows_returned"], 7);
}

// ============================================================================
// Audit Record Contract Tests
// ============================================================================

#[test]
fn test_audit_record_field_set() {
    let mut parameters = serde_json::Map::new();
    parameters.insert("owner".to_string(), serde_json::json!("***MASKED***"));

    let record = AuditRecord {
        query_name: "cases_by_owner".to_string(),
        query_version: 2,
        parameters,
        status: AuditStatus::Success,
        error: None,
        row_count: 5,
        duration_ms: 17,
        caller_id: Some("agent-7".to_string()),
        executed_at: chrono::Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
    };

    let value = serde_json::to_value(&record).unwrap();
    let keys: Vec<&str> = value.as_object().unwrap().keys().map(|s| s.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "query_name",
            "query_version",
            "parameters",
            "status",
            "row_count",
            "duration_ms",
            "caller_id",
            "executed_at"
        ]
    );
    assert_eq!(value["status"], "SUCCESS");
    assert_eq!(value["executed_at"], "2024-03-01T12:00:00Z");
}

#[test]
fn test_audit_record_error_field_present_only_on_failure() {
    let failure = AuditRecord {
        query_name: "broken".to_string(),
        query_version: 1,
        parameters: serde_json::Map::new(),
        status: AuditStatus::Error,
        error: Some("no such table: ghosts".to_string()),
        row_count: 0,
        duration_ms: 2,
        caller_id: None,
        executed_at: chrono::Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
    };

    let value = serde_json::to_value(&failure).unwrap();
    assert_eq!(value["status"], "ERROR");
    assert_eq!(value["error"], "no such table: ghosts");
    assert!(value.get("caller_id").is_none(), "absent caller_id is omitted, not null");
}

// ============================================================================
// Error Code Stability
// ============================================================================

#[test]
fn test_error_codes_are_from_the_stable_set() {
    let valid_codes = [
        "NOT_FOUND",
        "MISSING_PARAMETER",
        "TYPE_MISMATCH",
        "DISALLOWED_VALUE",
        "EXECUTION_ERROR",
        "CONFIG_ERROR",
        "AUDIT_WRITE_FAILURE",
    ];

    assert!(valid_codes.contains(&DocketError::not_found("x").error_code()));
    assert!(valid_codes.contains(&DocketError::missing_parameter("x").error_code()));
    assert!(valid_codes.contains(&DocketError::type_mismatch("x", "NUMBER", "bool").error_code()));
    assert!(valid_codes.contains(&DocketError::disallowed_value("x", "[]", "1").error_code()));
    assert!(valid_codes.contains(&DocketError::execution("test").error_code()));
    assert!(valid_codes.contains(&DocketError::config("test").error_code()));
    assert!(valid_codes.contains(&DocketError::audit_write("test").error_code()));
}

#[test]
fn test_error_messages_echo_parameter_names_not_stack_traces() {
    let err = DocketError::type_mismatch("opened_after", "DATE", "number");
    let envelope = ErrorEnvelope::from_error("run", &err);

    assert_eq!(envelope.error.code, "TYPE_MISMATCH");
    assert!(envelope.error.message.contains("opened_after"));
    assert!(envelope.error.message.contains("DATE"));
}

// ============================================================================
// Snapshot Tests (using insta)
// ============================================================================

#[test]
fn test_success_envelope_snapshot() {
    let data = serde_json::json!({
        "rows": [{"id": 1, "status": "OPEN"}]
    });

    let envelope: SuccessEnvelope<serde_json::Value> =
        SuccessEnvelope::new("run", data, Metadata::with_rows(100, 1));

    let json_str = serde_json::to_string_pretty(&envelope).expect("Should serialize");
    insta::assert_snapshot!(json_str, @r#"
    {
      "success": true,
      "command": "run",
      "data": {
        "rows": [
          {
            "id": 1,
            "status": "OPEN"
          }
        ]
      },
      "metadata": {
        "execution_ms": 100,
        "rows_returned": 1
      }
    }
    "#);
}

#[test]
fn test_error_envelope_snapshot() {
    let envelope = ErrorEnvelope::new(
        "run",
        ErrorInfo::new(
            "DISALLOWED_VALUE",
            "Parameter 'status' must be one of [\"OPEN\", \"CLOSED\"], got \"PENDING\"",
        ),
    );

    let json_str = serde_json::to_string_pretty(&envelope).expect("Should serialize");
    insta::assert_snapshot!(json_str, @r#"
    {
      "success": false,
      "command": "run",
      "error": {
        "code": "DISALLOWED_VALUE",
        "message": "Parameter 'status' must be one of [\"OPEN\", \"CLOSED\"], got \"PENDING\""
      }
    }
    "#);
}

#[test]
fn test_audit_record_snapshot() {
    let mut parameters = serde_json::Map::new();
    parameters.insert("id".to_string(), serde_json::json!(42));
    parameters.insert("owner".to_string(), serde_json::json!("***MASKED***"));

    let record = AuditRecord {
        query_name: "cases_by_owner".to_string(),
        query_version: 1,
        parameters,
        status: AuditStatus::Success,
        error: None,
        row_count: 3,
        duration_ms: 8,
        caller_id: Some("agent-7".to_string()),
        executed_at: chrono::Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
    };

    let json_str = serde_json::to_string_pretty(&record).expect("Should serialize");
    insta::assert_snapshot!(json_str, @r#"
    {
      "query_name": "cases_by_owner",
      "query_version": 1,
      "parameters": {
        "id": 42,
        "owner": "***MASKED***"
      },
      "status": "SUCCESS",
      "row_count": 3,
      "duration_ms": 8,
      "caller_id": "agent-7",
      "executed_at": "2024-03-01T12:00:00Z"
    }
    "#);
}
