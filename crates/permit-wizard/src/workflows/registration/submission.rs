use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use super::documents::{DocumentStager, DocumentStatus, RequirementStatus};
use super::domain::{fields, BusinessId, FieldValue, FormRecord, WizardMode};
use super::registry::{BusinessRegistry, RegistryError};
use super::session::{SessionError, WizardSession};
use super::steps::{Transition, WizardStep};
use super::validation::ValidationErrors;

pub const GENERIC_FAILURE_MESSAGE: &str =
    "Unable to submit the business registration. Please try again.";

/// Body sent to the registry for both create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationPayload {
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
    pub documents: Vec<DocumentPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPayload {
    pub id: String,
    #[serde(rename = "type")]
    pub document_type: String,
    pub description: String,
    pub business_id: Option<BusinessId>,
    pub user_id: Option<String>,
    pub path: Option<String>,
    pub filename: String,
    pub status: u8,
    pub timestamp: DateTime<Utc>,
    pub file_data: Option<String>,
    pub file_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub business_id: BusinessId,
    pub mode: WizardMode,
}

/// What a forward navigation request ended in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Moved(WizardStep),
    Refused(ValidationErrors),
    Submitted(SubmissionReceipt),
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("you must agree to the terms and conditions before submitting")]
    AgreementRequired,
    #[error("a submission is already in progress")]
    InFlight,
    #[error("some documents could not be prepared: {}", .0.join("; "))]
    DocumentsUnresolved(Vec<String>),
    #[error("{message}")]
    Rejected {
        message: String,
        #[source]
        source: RegistryError,
    },
}

impl SubmissionError {
    fn from_registry(source: RegistryError) -> Self {
        let message = source
            .server_message()
            .filter(|message| !message.trim().is_empty())
            .unwrap_or(GENERIC_FAILURE_MESSAGE)
            .to_string();
        Self::Rejected { message, source }
    }
}

/// Clears the in-flight flag when the submission attempt ends, however it ends.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Sends the finished registration to the registry exactly once per attempt.
pub struct SubmissionCoordinator<R> {
    registry: Arc<R>,
    in_flight: AtomicBool,
}

impl<R> SubmissionCoordinator<R>
where
    R: BusinessRegistry + 'static,
{
    pub fn new(registry: Arc<R>) -> Self {
        Self {
            registry,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Load the business being edited into the session.
    pub async fn hydrate(&self, session: &mut WizardSession) -> Result<(), SessionError> {
        let business_id = session
            .mode()
            .business_id()
            .cloned()
            .ok_or(SessionError::NotEditMode)?;
        let ticket = session.begin_hydration()?;
        let details = self.registry.fetch_details(&business_id).await?;
        session.apply_hydration(ticket, details)
    }

    /// Forward navigation; on the last step this submits.
    pub async fn advance(
        &self,
        session: &mut WizardSession,
    ) -> Result<AdvanceOutcome, SubmissionError> {
        match session.next() {
            Transition::Advanced(step) => Ok(AdvanceOutcome::Moved(step)),
            Transition::Refused(errors) => Ok(AdvanceOutcome::Refused(errors)),
            Transition::ReadyToSubmit => self.submit(session).await.map(AdvanceOutcome::Submitted),
        }
    }

    pub async fn submit(
        &self,
        session: &mut WizardSession,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        if !session.record().flag(fields::AGREED_TO_TERMS) {
            return Err(SubmissionError::AgreementRequired);
        }
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(SubmissionError::InFlight)?;

        // Failures drained before this call stay marked on their requirement.
        let settled = session.stager_mut().settle().await;
        let details = session.stager().unresolved();
        if !details.is_empty() {
            warn!(
                failed = details.len(),
                newly_failed = settled.len(),
                "submission halted on unresolved documents"
            );
            return Err(SubmissionError::DocumentsUnresolved(details));
        }

        let payload = build_payload(
            session.record(),
            session.stager(),
            session.config().user_id.as_deref(),
        );
        let mode = session.mode().clone();

        let result = match &mode {
            WizardMode::Create => self.registry.create(&payload).await,
            WizardMode::Edit(business_id) => self
                .registry
                .update(business_id, &payload)
                .await
                .map(|()| business_id.clone()),
        };

        match result {
            Ok(business_id) => {
                info!(
                    mode = mode.label(),
                    %business_id,
                    documents = payload.documents.len(),
                    "business registration submitted"
                );
                session.reset();
                Ok(SubmissionReceipt { business_id, mode })
            }
            Err(source) => {
                error!(mode = mode.label(), error = %source, "business registration failed");
                Err(SubmissionError::from_registry(source))
            }
        }
    }
}

/// Merge the record and every resolved document into one registry body.
pub fn build_payload(
    record: &FormRecord,
    stager: &DocumentStager,
    user_id: Option<&str>,
) -> RegistrationPayload {
    let fields = record
        .iter()
        .map(|(name, value)| (name.to_string(), wire_value(value)))
        .collect();

    let documents = stager
        .requirements()
        .iter()
        .filter_map(|requirement| {
            if let Some(document) = stager.document_for(requirement.id) {
                return Some(DocumentPayload {
                    id: document.id.to_string(),
                    document_type: document.document_type.clone(),
                    description: document.description.clone(),
                    business_id: document.business_ref.clone(),
                    user_id: user_id.map(str::to_string),
                    path: None,
                    filename: document.file_name.clone(),
                    status: document.status.code(),
                    timestamp: document.timestamp,
                    file_data: Some(document.encoded_payload.clone()),
                    file_type: Some(document.mime_type.clone()),
                });
            }
            let path = requirement.path.clone()?;
            if requirement.status != RequirementStatus::Uploaded {
                return None;
            }
            Some(DocumentPayload {
                id: requirement.id.to_string(),
                document_type: requirement.requirement_type.clone(),
                description: requirement.description.clone(),
                business_id: stager.business_ref().cloned(),
                user_id: user_id.map(str::to_string),
                filename: requirement.file_name.clone().unwrap_or_default(),
                path: Some(path),
                status: DocumentStatus::Committed.code(),
                timestamp: Utc::now(),
                file_data: None,
                file_type: None,
            })
        })
        .collect();

    RegistrationPayload { fields, documents }
}

fn wire_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Text(text) if text.trim().is_empty() => Value::Null,
        FieldValue::Text(text) => Value::String(text.clone()),
        FieldValue::Flag(flag) => Value::Bool(*flag),
        FieldValue::Number(number) => serde_json::Number::from_f64(*number)
            .map(Value::Number)
            .unwrap_or(Value::Null),
    }
}
