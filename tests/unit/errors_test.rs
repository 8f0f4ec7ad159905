use tabsync::types::errors::*;

// === TabError Tests ===

#[test]
fn tab_error_not_found_display() {
    let err = TabError::NotFound(123);
    assert_eq!(err.to_string(), "Tab not found: 123");
}

#[test]
fn tab_error_invalid_index_display() {
    let err = TabError::InvalidIndex(99);
    assert_eq!(err.to_string(), "Invalid tab index: 99");
}

#[test]
fn tab_error_implements_error_trait() {
    let err: Box<dyn std::error::Error> = Box::new(TabError::NotFound(1));
    assert!(err.source().is_none());
}

// === StoreError Tests ===

#[test]
fn store_error_display_variants() {
    assert_eq!(
        StoreError::Unavailable("offline".to_string()).to_string(),
        "Store unavailable: offline"
    );
    assert_eq!(
        StoreError::InvalidPath("devices".to_string()).to_string(),
        "Invalid store path: devices"
    );
    assert_eq!(
        StoreError::Http { status: 403, message: "denied".to_string() }.to_string(),
        "Store request failed with status 403: denied"
    );
}

#[test]
fn store_error_from_serde_json() {
    let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let err: StoreError = json_err.into();
    assert!(matches!(err, StoreError::Serialization(_)));
}

// === CommandError Tests ===

#[test]
fn command_error_display_variants() {
    assert_eq!(
        CommandError::UnknownAction("reloadTab".to_string()).to_string(),
        "Unknown command action: reloadTab"
    );
    assert_eq!(
        CommandError::Malformed("missing action".to_string()).to_string(),
        "Malformed command: missing action"
    );
}

// === ConfigError Tests ===

#[test]
fn config_error_missing_field_display() {
    assert_eq!(
        ConfigError::MissingField("apiKey").to_string(),
        "Missing config field: apiKey"
    );
}

// === LocalStateError Tests ===

#[test]
fn local_state_error_from_rusqlite() {
    let err: LocalStateError = rusqlite::Error::InvalidQuery.into();
    assert!(matches!(err, LocalStateError::Database(_)));
    assert!(err.to_string().starts_with("Local state database error"));
}

// === AppError Tests ===

#[test]
fn app_error_is_transparent_over_store_error() {
    let err: AppError = StoreError::Unavailable("quota".to_string()).into();
    assert_eq!(err.to_string(), "Store unavailable: quota");
}

#[test]
fn app_error_is_transparent_over_config_error() {
    let err: AppError = ConfigError::MissingField("projectId").into();
    assert_eq!(err.to_string(), "Missing config field: projectId");
}

#[test]
fn app_error_own_variants_display() {
    assert_eq!(AppError::NotConfigured.to_string(), "Store is not configured");
    assert_eq!(AppError::NoDevice.to_string(), "No device selected");
    assert_eq!(
        AppError::DeviceNotFound("abc".to_string()).to_string(),
        "Device not found: abc"
    );
}
