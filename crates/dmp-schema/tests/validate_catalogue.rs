//! Integration test: load the full schema catalogue from `json_schemas/`
//! and check the error map produced for realistic service documents.

use dmp_schema::{
    load_document, Enforcement, FieldError, SchemaName, SchemaRegistry, SchemaValidationError,
};
use serde_json::{json, Value};
use std::path::PathBuf;

/// Find the repository root.
fn repo_root() -> PathBuf {
    let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    dir.pop(); // crates/
    dir.pop(); // repo root
    dir
}

fn registry() -> SchemaRegistry {
    SchemaRegistry::load(repo_root().join("json_schemas")).expect("Failed to load schemas")
}

fn fixture(name: &str) -> Value {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    load_document(&path).expect("Failed to load fixture")
}

fn with(mut doc: Value, key: &str, value: Value) -> Value {
    doc.as_object_mut().unwrap().insert(key.to_string(), value);
    doc
}

fn without(mut doc: Value, key: &str) -> Value {
    doc.as_object_mut().unwrap().remove(key);
    doc
}

#[test]
fn test_load_full_catalogue() {
    let reg = registry();
    assert_eq!(reg.schema_count(), SchemaName::ALL.len());
    assert_eq!(reg.schema_names(), SchemaName::ALL.to_vec());
    assert!(reg.schema_dir().is_some());
}

#[test]
fn test_every_schema_has_a_strict_validator() {
    let reg = registry();
    for name in SchemaName::ALL {
        assert!(
            reg.validator(name, Enforcement::Strict).is_ok(),
            "no strict validator for {name}"
        );
        let relaxed = reg.validator(name, Enforcement::Relaxed { required_fields: &[] });
        assert!(relaxed.is_ok(), "no relaxed validator for {name}");
    }
}

#[test]
fn test_load_fails_when_a_schema_is_missing() {
    let dir = tempfile::tempdir().unwrap();
    for name in SchemaName::ALL.iter().skip(1) {
        std::fs::copy(
            repo_root().join("json_schemas").join(name.file_name()),
            dir.path().join(name.file_name()),
        )
        .unwrap();
    }
    let err = SchemaRegistry::load(dir.path()).unwrap_err();
    match err {
        SchemaValidationError::SchemaLoadError { schema_name, .. } => {
            assert!(schema_name.ends_with("services-g-cloud-4.json"));
        }
        other => panic!("Expected SchemaLoadError, got: {other}"),
    }
}

#[test]
fn test_load_fails_on_unparsable_schema() {
    let dir = tempfile::tempdir().unwrap();
    for name in SchemaName::ALL {
        std::fs::copy(
            repo_root().join("json_schemas").join(name.file_name()),
            dir.path().join(name.file_name()),
        )
        .unwrap();
    }
    std::fs::write(dir.path().join("users.json"), "{\"type\": ").unwrap();
    let err = SchemaRegistry::load(dir.path()).unwrap_err();
    assert!(
        matches!(err, SchemaValidationError::SchemaLoadError { ref reason, .. } if reason.starts_with("invalid JSON")),
        "got {err}"
    );
}

#[test]
fn test_load_fails_on_meta_invalid_schema() {
    let dir = tempfile::tempdir().unwrap();
    for name in SchemaName::ALL {
        std::fs::copy(
            repo_root().join("json_schemas").join(name.file_name()),
            dir.path().join(name.file_name()),
        )
        .unwrap();
    }
    std::fs::write(
        dir.path().join("users-auth.json"),
        r#"{"$schema": "http://json-schema.org/draft-04/schema#", "required": []}"#,
    )
    .unwrap();
    let err = SchemaRegistry::load(dir.path()).unwrap_err();
    assert!(
        matches!(err, SchemaValidationError::InvalidSchema { ref schema_name, .. } if schema_name == "users-auth"),
        "got {err}"
    );
}

#[test]
fn test_valid_g7_service() {
    let reg = registry();
    let doc = fixture("g7-saas-service.json");
    assert!(reg.is_valid(SchemaName::ServicesGCloud7Saas, &doc).unwrap());
    let errors = reg
        .validation_errors(SchemaName::ServicesGCloud7Saas, &doc, Enforcement::Strict)
        .unwrap();
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

#[test]
fn test_missing_required_field() {
    let reg = registry();
    let doc = without(fixture("g7-saas-service.json"), "serviceName");
    let errors = reg
        .validation_errors(SchemaName::ServicesGCloud7Saas, &doc, Enforcement::Strict)
        .unwrap();
    assert_eq!(errors.get("serviceName"), Some(&FieldError::AnswerRequired));
    assert_eq!(errors.len(), 1);
}

#[test]
fn test_word_limits() {
    let reg = registry();
    let long_summary = vec!["word"; 51].join(" ");
    let doc = with(fixture("g7-saas-service.json"), "serviceSummary", json!(long_summary));
    let errors = reg
        .validation_errors(SchemaName::ServicesGCloud7Saas, &doc, Enforcement::Strict)
        .unwrap();
    assert_eq!(errors.get("serviceSummary"), Some(&FieldError::UnderWords(50)));

    let g6 = with(
        with(fixture("g7-saas-service.json"), "frameworkSlug", json!("g-cloud-6")),
        "serviceSummary",
        json!(vec!["word"; 101].join(" ")),
    );
    let errors = reg
        .validation_errors(SchemaName::ServicesGCloud6Saas, &g6, Enforcement::Strict)
        .unwrap();
    assert_eq!(errors.get("serviceSummary"), Some(&FieldError::UnderWords(100)));
}

#[test]
fn test_bullet_lists() {
    let reg = registry();
    let features: Vec<String> = (0..11).map(|i| format!("Feature {i}")).collect();
    let doc = with(fixture("g7-saas-service.json"), "serviceFeatures", json!(features));
    let doc = with(doc, "serviceBenefits", json!([]));
    let errors = reg
        .validation_errors(SchemaName::ServicesGCloud7Saas, &doc, Enforcement::Strict)
        .unwrap();
    assert_eq!(errors.get("serviceFeatures"), Some(&FieldError::Under10Items));
    assert_eq!(errors.get("serviceBenefits"), Some(&FieldError::AnswerRequired));
}

#[test]
fn test_price_errors() {
    let reg = registry();
    let doc = with(fixture("g7-saas-service.json"), "priceMin", json!("ten pounds"));
    let doc = with(doc, "priceUnit", json!("Elephant"));
    let errors = reg
        .validation_errors(SchemaName::ServicesGCloud7Saas, &doc, Enforcement::Strict)
        .unwrap();
    assert_eq!(errors.get("priceMin"), Some(&FieldError::NotMoneyFormat));
    assert_eq!(errors.get("priceUnit"), Some(&FieldError::NoUnitSpecified));
    assert!(!errors.contains_field("priceMax"));
}

#[test]
fn test_min_price_above_max_price() {
    let reg = registry();
    let doc = with(fixture("g7-saas-service.json"), "priceMin", json!("300"));
    let errors = reg
        .validation_errors(SchemaName::ServicesGCloud7Saas, &doc, Enforcement::Strict)
        .unwrap();
    assert_eq!(errors.get("priceMax"), Some(&FieldError::MaxLessThanMin));
    assert_eq!(
        serde_json::to_value(&errors).unwrap(),
        json!({"priceMax": "max_less_than_min"})
    );
}

#[test]
fn test_yaml_document_with_missing_assurance() {
    let reg = registry();
    let doc = fixture("g7-saas-service.yaml");
    let errors = reg
        .validation_errors(SchemaName::ServicesGCloud7Saas, &doc, Enforcement::Strict)
        .unwrap();
    assert_eq!(errors.get("dataBackupRecovery"), Some(&FieldError::AssuranceRequired));
    assert_eq!(errors.get("priceMax"), Some(&FieldError::MaxLessThanMin));
    assert_eq!(errors.len(), 2);
}

#[test]
fn test_valid_specialists_service() {
    let reg = registry();
    let doc = fixture("dos-specialists-service.json");
    let errors = reg
        .validation_errors(SchemaName::ServicesDosDigitalSpecialists, &doc, Enforcement::Strict)
        .unwrap();
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

#[test]
fn test_specialist_price_range() {
    let reg = registry();
    let doc = with(fixture("dos-specialists-service.json"), "developerPriceMin", json!("700"));
    let errors = reg
        .validation_errors(SchemaName::ServicesDosDigitalSpecialists, &doc, Enforcement::Strict)
        .unwrap();
    assert_eq!(errors.get("developerPriceMax"), Some(&FieldError::MaxLessThanMin));
}

#[test]
fn test_specialist_dependencies_and_roles() {
    let reg = registry();
    let doc = json!({"dataProtocols": true, "openStandardsPrinciples": true, "developerPriceMin": "x"});
    let errors = reg
        .validation_errors(SchemaName::ServicesDosDigitalSpecialists, &doc, Enforcement::Strict)
        .unwrap();
    assert_eq!(errors.get("developerPriceMin"), Some(&FieldError::NotMoneyFormat));
    assert_eq!(errors.get("developerLocations"), Some(&FieldError::AnswerRequired));
    assert_eq!(errors.get("developerPriceMax"), Some(&FieldError::AnswerRequired));
    assert_eq!(errors.form_errors(), ["specialistRoles_required".to_string()]);
}

#[test]
fn test_relaxed_specialists_skip_role_requirement() {
    let reg = registry();
    let doc = json!({"dataProtocols": true});
    let errors = reg
        .validation_errors(
            SchemaName::ServicesDosDigitalSpecialists,
            &doc,
            Enforcement::Relaxed { required_fields: &[] },
        )
        .unwrap();
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

#[test]
fn test_relaxed_draft_page() {
    let reg = registry();
    let page = vec!["serviceName".to_string(), "serviceSummary".to_string()];
    let doc = json!({"frameworkSlug": "g-cloud-7", "lot": "saas", "serviceName": ""});
    let errors = reg
        .validation_errors(
            SchemaName::ServicesGCloud7Saas,
            &doc,
            Enforcement::Relaxed { required_fields: &page },
        )
        .unwrap();
    assert_eq!(errors.get("serviceName"), Some(&FieldError::AnswerRequired));
    assert_eq!(errors.get("serviceSummary"), Some(&FieldError::AnswerRequired));
    assert_eq!(errors.len(), 2);
}

#[test]
fn test_relaxed_required_never_exceeds_strict() {
    let reg = registry();
    for name in SchemaName::ALL {
        let strict = reg.required_fields(name).unwrap();
        let mut allow = strict.clone();
        allow.push("notARealField".to_string());
        let relaxed = reg.relaxed_schema(name, &allow).unwrap();
        let relaxed_required: Vec<String> = relaxed
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();
        assert_eq!(relaxed_required, strict, "{name}");
    }
}

#[test]
fn test_user_documents() {
    let reg = registry();
    let good = json!({
        "emailAddress": "buyer@example.gov.uk",
        "name": "A Buyer",
        "password": "correct horse battery",
        "role": "buyer"
    });
    assert!(reg.validate(SchemaName::Users, &good).is_ok());

    let bad = with(good.clone(), "emailAddress", json!("nope"));
    let err = reg.validate(SchemaName::Users, &bad).unwrap_err();
    assert!(err.first_violation_message().is_some());

    let auth = json!({"emailAddress": "buyer@example.gov.uk", "password": "x"});
    assert!(reg.is_valid(SchemaName::UsersAuth, &auth).unwrap());
    assert!(!reg.is_valid(SchemaName::UsersAuth, &with(auth, "extra", json!(1))).unwrap());
}

#[test]
fn test_update_details() {
    let reg = registry();
    assert!(reg.is_valid(SchemaName::ServicesUpdate, &json!({"updated_by": "joe"})).unwrap());
    assert!(!reg.is_valid(SchemaName::ServicesUpdate, &json!({"updated_by": ""})).unwrap());
    assert!(!reg.is_valid(SchemaName::ServicesUpdate, &json!({})).unwrap());
}

#[test]
fn test_idempotent_error_maps() {
    let reg = registry();
    let doc = with(fixture("g7-saas-service.json"), "priceMin", json!("abc"));
    let a = reg
        .validation_errors(SchemaName::ServicesGCloud7Saas, &doc, Enforcement::Strict)
        .unwrap();
    let b = reg
        .validation_errors(SchemaName::ServicesGCloud7Saas, &doc, Enforcement::Strict)
        .unwrap();
    assert_eq!(a, b);
}
