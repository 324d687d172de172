use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::config::WizardConfig;
use crate::workflows::registration::documents::AttachedFile;
use crate::workflows::registration::domain::{fields, BusinessId, FieldValue, WizardMode};
use crate::workflows::registration::hydration::BusinessDetails;
use crate::workflows::registration::registry::{BusinessRegistry, RegistryError};
use crate::workflows::registration::session::WizardSession;
use crate::workflows::registration::submission::RegistrationPayload;

pub(super) fn wizard_config() -> WizardConfig {
    WizardConfig {
        user_id: Some("clerk-01".to_string()),
        max_file_bytes: 1024,
        document_base_url: Some("https://files.example.gov".to_string()),
    }
}

pub(super) fn create_session() -> WizardSession {
    WizardSession::init(WizardMode::Create, wizard_config())
}

pub(super) fn signing_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 2).expect("valid date")
}

pub(super) fn taxpayer_fields() -> Vec<(&'static str, FieldValue)> {
    vec![
        (fields::FIRST_NAME, FieldValue::text("Juan")),
        (fields::MIDDLE_NAME, FieldValue::text("")),
        (fields::LAST_NAME, FieldValue::text("Dela Cruz")),
        (fields::BIRTHDATE, FieldValue::text("1985-04-12")),
        (fields::GENDER, FieldValue::text("Male")),
        (fields::CIVIL_STATUS, FieldValue::text("Married")),
        (fields::TIN, FieldValue::text("123-456-789-000")),
        (fields::EMAIL, FieldValue::text("juan.delacruz@example.ph")),
        (fields::MOBILE_NUMBER, FieldValue::text("09171234567")),
    ]
}

pub(super) fn business_fields() -> Vec<(&'static str, FieldValue)> {
    vec![
        (fields::BUSINESS_NAME, FieldValue::text("Dela Cruz Sari-Sari Store")),
        (fields::OWNERSHIP_TYPE, FieldValue::text("Sole Proprietorship")),
        (fields::LINE_OF_BUSINESS, FieldValue::text("Retail")),
        (fields::PROVINCE, FieldValue::text("Laguna")),
        (fields::CITY, FieldValue::text("Calamba")),
        (fields::BARANGAY, FieldValue::text("Real")),
        (fields::STREET, FieldValue::text("Rizal St.")),
    ]
}

pub(super) fn fill(session: &mut WizardSession, entries: Vec<(&'static str, FieldValue)>) {
    for (name, value) in entries {
        session.update_field(name, value).expect("field accepted");
    }
}

/// Session sitting on the summary step with every rule satisfied except the agreement.
pub(super) fn session_at_summary() -> WizardSession {
    let mut session = create_session();
    fill(&mut session, taxpayer_fields());
    session.next();
    fill(&mut session, business_fields());
    session.next();
    session.next();
    session
}

pub(super) fn pdf(name: &str) -> AttachedFile {
    AttachedFile::from_bytes(name, b"%PDF-1.4 permit scan".to_vec())
}

pub(super) fn nested_details_json() -> Value {
    json!({
        "businessInfo": {
            "businessname_": "Aling Nena Carinderia",
            "tradename_": "Nena's",
            "ownershiptype_": "Sole Proprietorship",
            "lineofbusiness_": "Food Service",
            "capitalization_": 50000,
            "lastname_": "Santos",
            "firstname_": "Nena",
            "tin_": "987654321",
            "email_": null
        },
        "address": {
            "province_": "Cavite",
            "city_": "Imus",
            "barangay_": "Poblacion"
        },
        "representative": {
            "lastname_": "Santos",
            "firstname_": "Maria",
            "position_": "Manager"
        },
        "requirements": [
            {
                "type_": "Barangay Clearance",
                "description_": "2025 clearance",
                "filename_": "clearance.pdf",
                "path_": "uploads/biz-9/clearance.pdf",
                "status_": 1
            }
        ]
    })
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum RegistryCall {
    Create(RegistrationPayload),
    Update(BusinessId, RegistrationPayload),
    Fetch(BusinessId),
}

/// Registry double that records every call and answers from a script.
#[derive(Default)]
pub(super) struct ScriptedRegistry {
    calls: Mutex<Vec<RegistryCall>>,
    rejection: Option<Option<String>>,
    details: Option<Value>,
}

impl ScriptedRegistry {
    pub(super) fn accepting() -> Self {
        Self::default()
    }

    pub(super) fn rejecting(message: Option<&str>) -> Self {
        Self {
            rejection: Some(message.map(str::to_string)),
            ..Self::default()
        }
    }

    pub(super) fn serving(details: Value) -> Self {
        Self {
            details: Some(details),
            ..Self::default()
        }
    }

    pub(super) fn calls(&self) -> Vec<RegistryCall> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    fn record(&self, call: RegistryCall) {
        self.calls.lock().expect("calls mutex poisoned").push(call);
    }

    fn outcome(&self) -> Result<(), RegistryError> {
        match &self.rejection {
            Some(message) => Err(RegistryError::Rejected {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BusinessRegistry for ScriptedRegistry {
    async fn create(&self, payload: &RegistrationPayload) -> Result<BusinessId, RegistryError> {
        self.record(RegistryCall::Create(payload.clone()));
        self.outcome()?;
        Ok(BusinessId("biz-100".to_string()))
    }

    async fn update(
        &self,
        business_id: &BusinessId,
        payload: &RegistrationPayload,
    ) -> Result<(), RegistryError> {
        self.record(RegistryCall::Update(business_id.clone(), payload.clone()));
        self.outcome()
    }

    async fn fetch_details(
        &self,
        business_id: &BusinessId,
    ) -> Result<BusinessDetails, RegistryError> {
        self.record(RegistryCall::Fetch(business_id.clone()));
        let details = self
            .details
            .clone()
            .ok_or_else(|| RegistryError::NotFound(business_id.clone()))?;
        serde_json::from_value(details).map_err(|err| RegistryError::Malformed(err.to_string()))
    }
}

/// Registry whose `create` parks until the test opens the gate.
#[derive(Default)]
pub(super) struct GatedRegistry {
    pub(super) entered: Notify,
    pub(super) gate: Notify,
    pub(super) creates: AtomicUsize,
}

#[async_trait]
impl BusinessRegistry for GatedRegistry {
    async fn create(&self, _payload: &RegistrationPayload) -> Result<BusinessId, RegistryError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.gate.notified().await;
        Ok(BusinessId("biz-gated".to_string()))
    }

    async fn update(
        &self,
        _business_id: &BusinessId,
        _payload: &RegistrationPayload,
    ) -> Result<(), RegistryError> {
        Ok(())
    }

    async fn fetch_details(
        &self,
        business_id: &BusinessId,
    ) -> Result<BusinessDetails, RegistryError> {
        Err(RegistryError::NotFound(business_id.clone()))
    }
}

pub(super) fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
