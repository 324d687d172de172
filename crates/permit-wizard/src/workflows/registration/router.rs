use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::config::WizardConfig;

use super::documents::{AttachedFile, DocumentRef, RequirementId, StagingError};
use super::domain::{BusinessId, FieldValue, WizardMode};
use super::registry::BusinessRegistry;
use super::session::{SessionError, WizardSession};
use super::submission::{AdvanceOutcome, SubmissionCoordinator, SubmissionError};

/// A live session with the coordinator that owns its submission guard.
pub struct SessionSlot<R> {
    session: AsyncMutex<WizardSession>,
    coordinator: SubmissionCoordinator<R>,
}

/// In-process table of open wizard sessions.
pub struct WizardSessions<R> {
    registry: Arc<R>,
    config: WizardConfig,
    slots: Mutex<HashMap<Uuid, Arc<SessionSlot<R>>>>,
}

impl<R> WizardSessions<R>
where
    R: BusinessRegistry + 'static,
{
    pub fn new(registry: Arc<R>, config: WizardConfig) -> Self {
        Self {
            registry,
            config,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Open a session; edit sessions are hydrated before they are handed out.
    pub async fn open(&self, mode: WizardMode) -> Result<Uuid, SessionError> {
        let mut session = WizardSession::init(mode, self.config.clone());
        let coordinator = SubmissionCoordinator::new(self.registry.clone());
        if session.mode().business_id().is_some() {
            coordinator.hydrate(&mut session).await?;
        }

        let id = Uuid::new_v4();
        let slot = Arc::new(SessionSlot {
            session: AsyncMutex::new(session),
            coordinator,
        });
        self.slots
            .lock()
            .expect("session table mutex poisoned")
            .insert(id, slot);
        Ok(id)
    }

    pub fn slot(&self, id: &Uuid) -> Option<Arc<SessionSlot<R>>> {
        self.slots
            .lock()
            .expect("session table mutex poisoned")
            .get(id)
            .cloned()
    }

    pub fn close(&self, id: &Uuid) -> bool {
        self.slots
            .lock()
            .expect("session table mutex poisoned")
            .remove(id)
            .is_some()
    }
}

/// Router builder exposing the wizard over HTTP.
pub fn wizard_router<R>(sessions: Arc<WizardSessions<R>>) -> Router
where
    R: BusinessRegistry + 'static,
{
    Router::new()
        .route("/api/v1/wizard/sessions", post(open_handler::<R>))
        .route(
            "/api/v1/wizard/sessions/:session_id",
            get(view_handler::<R>).delete(close_handler::<R>),
        )
        .route(
            "/api/v1/wizard/sessions/:session_id/fields",
            patch(fields_handler::<R>),
        )
        .route(
            "/api/v1/wizard/sessions/:session_id/agreement",
            post(agreement_handler::<R>),
        )
        .route(
            "/api/v1/wizard/sessions/:session_id/next",
            post(next_handler::<R>),
        )
        .route(
            "/api/v1/wizard/sessions/:session_id/prev",
            post(prev_handler::<R>),
        )
        .route(
            "/api/v1/wizard/sessions/:session_id/requirements",
            post(add_requirement_handler::<R>),
        )
        .route(
            "/api/v1/wizard/sessions/:session_id/requirements/:requirement_id",
            delete(delete_requirement_handler::<R>),
        )
        .route(
            "/api/v1/wizard/sessions/:session_id/requirements/:requirement_id/view",
            get(view_requirement_handler::<R>),
        )
        .with_state(sessions)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OpenSessionRequest {
    #[serde(default, alias = "businessId")]
    business_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AgreementRequest {
    agreed: bool,
    #[serde(default)]
    as_of: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RequirementQuery {
    #[serde(rename = "type", default)]
    requirement_type: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    file_name: String,
    #[serde(default)]
    mime_type: Option<String>,
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, axum::Json(json!({ "error": message.into() }))).into_response()
}

fn missing_session(session_id: Uuid) -> Response {
    error_body(
        StatusCode::NOT_FOUND,
        format!("wizard session {session_id} not found"),
    )
}

fn session_error_response(error: SessionError) -> Response {
    let status = match &error {
        SessionError::AwaitingHydration => StatusCode::CONFLICT,
        SessionError::StaleHydration => StatusCode::CONFLICT,
        SessionError::NotEditMode => StatusCode::BAD_REQUEST,
        SessionError::ManagedField(_) | SessionError::ExpectedFlag(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SessionError::Staging(StagingError::RequirementNotFound(_))
        | SessionError::Staging(StagingError::NotViewable) => StatusCode::NOT_FOUND,
        SessionError::Staging(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SessionError::Registry(_) => StatusCode::BAD_GATEWAY,
    };
    error_body(status, error.to_string())
}

pub(crate) async fn open_handler<R>(
    State(sessions): State<Arc<WizardSessions<R>>>,
    body: Option<axum::Json<OpenSessionRequest>>,
) -> Response
where
    R: BusinessRegistry + 'static,
{
    let request = body.map(|axum::Json(request)| request).unwrap_or_default();
    let mode = match request.business_id.filter(|id| !id.trim().is_empty()) {
        Some(id) => WizardMode::Edit(BusinessId(id)),
        None => WizardMode::Create,
    };

    let session_id = match sessions.open(mode).await {
        Ok(id) => id,
        Err(error) => return session_error_response(error),
    };
    let Some(slot) = sessions.slot(&session_id) else {
        return missing_session(session_id);
    };
    let session = slot.session.lock().await;
    (
        StatusCode::CREATED,
        axum::Json(json!({
            "session_id": session_id,
            "session": session.snapshot(),
        })),
    )
        .into_response()
}

pub(crate) async fn view_handler<R>(
    State(sessions): State<Arc<WizardSessions<R>>>,
    Path(session_id): Path<Uuid>,
) -> Response
where
    R: BusinessRegistry + 'static,
{
    let Some(slot) = sessions.slot(&session_id) else {
        return missing_session(session_id);
    };
    let mut session = slot.session.lock().await;
    session.drain_staging().await;
    (StatusCode::OK, axum::Json(session.snapshot())).into_response()
}

pub(crate) async fn close_handler<R>(
    State(sessions): State<Arc<WizardSessions<R>>>,
    Path(session_id): Path<Uuid>,
) -> Response
where
    R: BusinessRegistry + 'static,
{
    if sessions.close(&session_id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        missing_session(session_id)
    }
}

pub(crate) async fn fields_handler<R>(
    State(sessions): State<Arc<WizardSessions<R>>>,
    Path(session_id): Path<Uuid>,
    axum::Json(patch): axum::Json<BTreeMap<String, FieldValue>>,
) -> Response
where
    R: BusinessRegistry + 'static,
{
    let Some(slot) = sessions.slot(&session_id) else {
        return missing_session(session_id);
    };
    let mut session = slot.session.lock().await;
    match session.update_fields(patch) {
        Ok(()) => (StatusCode::OK, axum::Json(session.snapshot())).into_response(),
        Err(error) => session_error_response(error),
    }
}

pub(crate) async fn agreement_handler<R>(
    State(sessions): State<Arc<WizardSessions<R>>>,
    Path(session_id): Path<Uuid>,
    axum::Json(request): axum::Json<AgreementRequest>,
) -> Response
where
    R: BusinessRegistry + 'static,
{
    let Some(slot) = sessions.slot(&session_id) else {
        return missing_session(session_id);
    };
    let mut session = slot.session.lock().await;
    let as_of = request.as_of.unwrap_or_else(|| Local::now().date_naive());
    match session.set_agreement(request.agreed, as_of) {
        Ok(()) => (StatusCode::OK, axum::Json(session.snapshot())).into_response(),
        Err(error) => session_error_response(error),
    }
}

pub(crate) async fn next_handler<R>(
    State(sessions): State<Arc<WizardSessions<R>>>,
    Path(session_id): Path<Uuid>,
) -> Response
where
    R: BusinessRegistry + 'static,
{
    let Some(slot) = sessions.slot(&session_id) else {
        return missing_session(session_id);
    };
    if slot.coordinator.is_in_flight() {
        return error_body(StatusCode::CONFLICT, SubmissionError::InFlight.to_string());
    }
    let Ok(mut session) = slot.session.try_lock() else {
        return error_body(StatusCode::CONFLICT, SubmissionError::InFlight.to_string());
    };

    match slot.coordinator.advance(&mut session).await {
        Ok(AdvanceOutcome::Moved(_)) => {
            (StatusCode::OK, axum::Json(session.snapshot())).into_response()
        }
        Ok(AdvanceOutcome::Refused(errors)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            axum::Json(json!({
                "error": errors.first_message().unwrap_or("validation failed"),
                "errors": errors,
            })),
        )
            .into_response(),
        Ok(AdvanceOutcome::Submitted(receipt)) => {
            (StatusCode::OK, axum::Json(json!({ "submitted": receipt }))).into_response()
        }
        Err(error @ SubmissionError::AgreementRequired)
        | Err(error @ SubmissionError::DocumentsUnresolved(_)) => {
            error_body(StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
        }
        Err(error @ SubmissionError::InFlight) => {
            error_body(StatusCode::CONFLICT, error.to_string())
        }
        Err(error @ SubmissionError::Rejected { .. }) => {
            error_body(StatusCode::BAD_GATEWAY, error.to_string())
        }
    }
}

pub(crate) async fn prev_handler<R>(
    State(sessions): State<Arc<WizardSessions<R>>>,
    Path(session_id): Path<Uuid>,
) -> Response
where
    R: BusinessRegistry + 'static,
{
    let Some(slot) = sessions.slot(&session_id) else {
        return missing_session(session_id);
    };
    let mut session = slot.session.lock().await;
    session.prev();
    (StatusCode::OK, axum::Json(session.snapshot())).into_response()
}

pub(crate) async fn add_requirement_handler<R>(
    State(sessions): State<Arc<WizardSessions<R>>>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<RequirementQuery>,
    body: Bytes,
) -> Response
where
    R: BusinessRegistry + 'static,
{
    let Some(slot) = sessions.slot(&session_id) else {
        return missing_session(session_id);
    };
    let file = (!query.file_name.trim().is_empty()).then(|| {
        let file = AttachedFile::from_bytes(query.file_name.clone(), body.to_vec());
        match query.mime_type.clone() {
            Some(mime_type) => file.with_mime_type(mime_type),
            None => file,
        }
    });

    let mut session = slot.session.lock().await;
    match session.add_requirement(&query.requirement_type, &query.description, file) {
        Ok(requirement_id) => (
            StatusCode::CREATED,
            axum::Json(json!({ "requirement_id": requirement_id })),
        )
            .into_response(),
        Err(error) => session_error_response(error),
    }
}

pub(crate) async fn delete_requirement_handler<R>(
    State(sessions): State<Arc<WizardSessions<R>>>,
    Path((session_id, requirement_id)): Path<(Uuid, Uuid)>,
) -> Response
where
    R: BusinessRegistry + 'static,
{
    let Some(slot) = sessions.slot(&session_id) else {
        return missing_session(session_id);
    };
    let mut session = slot.session.lock().await;
    match session.delete_requirement(RequirementId(requirement_id)) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => session_error_response(error),
    }
}

pub(crate) async fn view_requirement_handler<R>(
    State(sessions): State<Arc<WizardSessions<R>>>,
    Path((session_id, requirement_id)): Path<(Uuid, Uuid)>,
) -> Response
where
    R: BusinessRegistry + 'static,
{
    let Some(slot) = sessions.slot(&session_id) else {
        return missing_session(session_id);
    };
    let mut session = slot.session.lock().await;
    session.drain_staging().await;
    match session.view_document(DocumentRef::Requirement(RequirementId(requirement_id))) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => session_error_response(error),
    }
}
