use serde_json::json;

use super::common::*;
use crate::workflows::registration::documents::RequirementStatus;
use crate::workflows::registration::domain::{fields, BusinessId, FieldValue, WizardMode};
use crate::workflows::registration::hydration::{normalize, BusinessDetails};
use crate::workflows::registration::session::WizardSession;

fn parse(value: serde_json::Value) -> BusinessDetails {
    serde_json::from_value(value).expect("business details")
}

#[test]
fn nested_details_map_onto_form_fields() {
    let details = parse(nested_details_json());
    assert!(matches!(details, BusinessDetails::Nested(_)));

    let hydrated = normalize(details);
    let record = &hydrated.record;

    assert_eq!(record.text(fields::BUSINESS_NAME), "Aling Nena Carinderia");
    assert_eq!(record.text(fields::TRADE_NAME), "Nena's");
    assert_eq!(record.text(fields::LAST_NAME), "Santos");
    assert_eq!(record.text(fields::FIRST_NAME), "Nena");
    assert_eq!(record.text(fields::PROVINCE), "Cavite");
    assert_eq!(record.text(fields::CITY), "Imus");
    assert_eq!(record.text("repFirstName"), "Maria");
    assert_eq!(record.text("repPosition"), "Manager");
    assert_eq!(record.number("capitalization"), Some(50000.0));
}

#[test]
fn nested_nulls_keep_the_field_defaults() {
    let hydrated = normalize(parse(nested_details_json()));

    assert_eq!(hydrated.record.get(fields::EMAIL), Some(&FieldValue::text("")));
    assert!(hydrated.record.is_blank(fields::STREET));
    assert_eq!(hydrated.record.number("grossSales"), Some(0.0));
}

#[test]
fn nested_requirements_become_persisted_requirements() {
    let hydrated = normalize(parse(nested_details_json()));

    assert_eq!(hydrated.requirements.len(), 1);
    let requirement = &hydrated.requirements[0];
    assert_eq!(requirement.requirement_type, "Barangay Clearance");
    assert_eq!(requirement.description, "2025 clearance");
    assert_eq!(requirement.file_name.as_deref(), Some("clearance.pdf"));
    assert_eq!(
        requirement.path.as_deref(),
        Some("uploads/biz-9/clearance.pdf")
    );
    assert_eq!(requirement.status, RequirementStatus::Uploaded);
    assert!(requirement.file.is_none());
}

#[test]
fn flat_details_fall_back_to_defaults_for_nulls() {
    let details = parse(json!({
        "businessName": "Santos Bakery",
        "email": null,
        "capitalization": null,
        "agreedToTerms": null,
        "requirements": [
            { "type": "Mayor's Permit", "description": "Previous year", "status": 0 },
            { "type": "Fire Safety Certificate", "description": "BFP", "status": 2 }
        ]
    }));
    assert!(matches!(details, BusinessDetails::Flat(_)));

    let hydrated = normalize(details);

    assert_eq!(hydrated.record.text(fields::BUSINESS_NAME), "Santos Bakery");
    assert_eq!(hydrated.record.get(fields::EMAIL), Some(&FieldValue::text("")));
    assert_eq!(hydrated.record.number("capitalization"), Some(0.0));
    assert_eq!(
        hydrated.record.get(fields::AGREED_TO_TERMS),
        Some(&FieldValue::Flag(false))
    );
    let statuses: Vec<_> = hydrated
        .requirements
        .iter()
        .map(|requirement| requirement.status)
        .collect();
    assert_eq!(
        statuses,
        vec![RequirementStatus::PendingUpload, RequirementStatus::Failed]
    );
}

#[test]
fn flat_details_skip_values_that_are_not_scalars() {
    let details = parse(json!({
        "businessName": "Santos Bakery",
        "capitalization": 125000,
        "owner": { "name": "Pedro Santos" },
        "tags": ["bakery", "retail"]
    }));
    assert!(matches!(details, BusinessDetails::Flat(_)));

    let hydrated = normalize(details);

    assert_eq!(hydrated.record.text(fields::BUSINESS_NAME), "Santos Bakery");
    assert_eq!(hydrated.record.number("capitalization"), Some(125000.0));
    assert!(hydrated.record.get("owner").is_none());
    assert!(hydrated.record.get("tags").is_none());
    assert!(hydrated.requirements.is_empty());
}

#[test]
fn malformed_details_name_the_shape_that_was_tried() {
    let nested = serde_json::from_value::<BusinessDetails>(json!({
        "businessInfo": { "capitalization_": "a lot" }
    }))
    .expect_err("capitalization must be numeric");
    assert!(nested.to_string().starts_with("nested business details: "));

    let flat = serde_json::from_value::<BusinessDetails>(json!({
        "businessName": "Santos Bakery",
        "requirements": "none"
    }))
    .expect_err("requirements must be a list");
    assert!(flat.to_string().starts_with("flat business details: "));
}

#[test]
fn hydrated_record_passes_through_the_session() {
    let mut session = WizardSession::init(
        WizardMode::Edit(BusinessId("biz-9".to_string())),
        wizard_config(),
    );
    let ticket = session.begin_hydration().expect("edit session");

    session
        .apply_hydration(ticket, parse(nested_details_json()))
        .expect("fresh ticket");

    assert_eq!(
        session.record().text(fields::BUSINESS_NAME),
        "Aling Nena Carinderia"
    );
    assert_eq!(session.stager().requirements().len(), 1);
    assert!(session.stager().documents().is_empty());
}
