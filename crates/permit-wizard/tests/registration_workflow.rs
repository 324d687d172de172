use std::sync::Arc;

use chrono::NaiveDate;
use permit_wizard::config::WizardConfig;
use permit_wizard::workflows::registration::{
    AdvanceOutcome, AttachedFile, BusinessRegistry, DocumentRef, DocumentView, FieldValue,
    HydrationState, InMemoryBusinessRegistry, RequirementStatus, SubmissionCoordinator,
    WizardMode, WizardSession, WizardStep,
};
use serde_json::Value;

fn config() -> WizardConfig {
    WizardConfig {
        user_id: Some("clerk-07".to_string()),
        max_file_bytes: 4096,
        document_base_url: Some("https://files.example.gov/".to_string()),
    }
}

fn application_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 21).expect("valid application date")
}

fn fill(session: &mut WizardSession, entries: &[(&str, &str)]) {
    for (name, value) in entries {
        session
            .update_field(name, FieldValue::text(*value))
            .expect("field accepted");
    }
}

const TAXPAYER: &[(&str, &str)] = &[
    ("firstName", "Rosa"),
    ("lastName", "Villanueva"),
    ("birthdate", "1979-08-30"),
    ("gender", "Female"),
    ("civilStatus", "Single"),
    ("tin", "222-333-444"),
    ("email", "rosa@villanueva.ph"),
    ("mobileNumber", "0918-111-2222"),
];

const BUSINESS: &[(&str, &str)] = &[
    ("businessName", "Villanueva Printing"),
    ("ownershipType", "Sole Proprietorship"),
    ("lineOfBusiness", "Printing Services"),
    ("province", "Batangas"),
    ("city", "Lipa"),
    ("barangay", "Sabang"),
    ("street", "C.M. Recto Ave."),
];

#[tokio::test]
async fn business_is_registered_then_amended() {
    let registry = Arc::new(InMemoryBusinessRegistry::default());
    let coordinator = SubmissionCoordinator::new(registry.clone());

    let mut session = WizardSession::init(WizardMode::Create, config());
    fill(&mut session, TAXPAYER);
    assert_eq!(
        coordinator.advance(&mut session).await.expect("taxpayer step"),
        AdvanceOutcome::Moved(WizardStep::Business)
    );
    fill(&mut session, BUSINESS);
    coordinator.advance(&mut session).await.expect("business step");

    let permit = session
        .add_requirement(
            "DTI Certificate",
            "Business name registration",
            Some(AttachedFile::from_bytes("dti.pdf", b"%PDF-1.7 dti".to_vec())),
        )
        .expect("requirement accepted");
    assert_eq!(
        session.stager().requirement(permit).map(|r| r.status),
        Some(RequirementStatus::PendingUpload)
    );
    coordinator.advance(&mut session).await.expect("requirements step");
    session
        .set_agreement(true, application_day())
        .expect("agreement accepted");

    let receipt = match coordinator.advance(&mut session).await.expect("submitted") {
        AdvanceOutcome::Submitted(receipt) => receipt,
        other => panic!("expected submission, got {other:?}"),
    };
    assert_eq!(session.current_step(), WizardStep::Taxpayer);

    let stored = registry.get(&receipt.business_id).expect("stored payload");
    assert_eq!(stored.fields["businessName"], "Villanueva Printing");
    assert_eq!(stored.fields["middleName"], Value::Null);
    assert!(stored.fields["content"]
        .as_str()
        .is_some_and(|text| text.contains("21st day of November, 2025")));
    assert_eq!(stored.documents.len(), 1);
    assert_eq!(stored.documents[0].filename, "dti.pdf");

    let mut amendment =
        WizardSession::init(WizardMode::Edit(receipt.business_id.clone()), config());
    assert!(amendment
        .update_field("tradeName", FieldValue::text("VP Prints"))
        .is_err());
    coordinator.hydrate(&mut amendment).await.expect("hydrated");
    assert_eq!(amendment.hydration_state(), HydrationState::Complete);
    assert_eq!(amendment.record().text("firstName"), "Rosa");
    assert_eq!(amendment.record().text("city"), "Lipa");

    let persisted = amendment.stager().requirements()[0].clone();
    assert_eq!(persisted.status, RequirementStatus::Uploaded);
    assert_eq!(
        amendment
            .view_document(DocumentRef::Requirement(persisted.id))
            .expect("viewable"),
        DocumentView::Remote {
            url: "https://files.example.gov/uploads/dti.pdf".to_string()
        }
    );

    fill(&mut amendment, &[("tradeName", "VP Prints")]);
    amendment
        .set_agreement(true, application_day())
        .expect("agreement accepted");
    let amended = coordinator.submit(&mut amendment).await.expect("updated");

    assert_eq!(amended.business_id, receipt.business_id);
    assert_eq!(registry.len(), 1);
    let stored = registry.get(&receipt.business_id).expect("stored payload");
    assert_eq!(stored.fields["tradeName"], "VP Prints");
    assert_eq!(stored.documents[0].status, 1);
    assert_eq!(stored.documents[0].path.as_deref(), Some("uploads/dti.pdf"));

    let details = registry
        .fetch_details(&receipt.business_id)
        .await
        .expect("details served");
    assert!(matches!(
        details,
        permit_wizard::workflows::registration::BusinessDetails::Nested(_)
    ));
}
