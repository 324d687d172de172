use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::WizardConfig;

use super::documents::{
    AttachedFile, DocumentRef, DocumentStager, DocumentView, Requirement, RequirementId,
    RequirementPatch, StagedDocument, StagingError, StagingFailure,
};
use super::domain::{fields, FieldValue, FormRecord, WizardMode};
use super::field_store::FieldStore;
use super::hydration::{self, BusinessDetails};
use super::registry::RegistryError;
use super::steps::{StepController, StepProgress, Transition, WizardStep};
use super::validation::ValidationErrors;
use super::waiver;

const MANAGED_WAIVER_FIELDS: [&str; 5] = [
    fields::WAIVER_STATUS,
    fields::WAIVER_NAME,
    fields::WAIVER_TYPE,
    fields::WAIVER_CONTENT,
    fields::WAIVER_AGREEMENT,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HydrationState {
    NotRequired,
    Pending,
    Complete,
}

/// Proof that a hydration fetch was started for the session's current generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HydrationTicket {
    generation: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("the business record is still loading; edits are not accepted yet")]
    AwaitingHydration,
    #[error("a newer load superseded this business record response")]
    StaleHydration,
    #[error("only edit sessions load an existing business record")]
    NotEditMode,
    #[error("field '{0}' is written by the declaration agreement and cannot be edited directly")]
    ManagedField(String),
    #[error("field '{0}' expects true or false")]
    ExpectedFlag(String),
    #[error(transparent)]
    Staging(#[from] StagingError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// One applicant's pass through the wizard.
#[derive(Debug)]
pub struct WizardSession {
    mode: WizardMode,
    store: FieldStore,
    stager: DocumentStager,
    steps: StepController,
    config: WizardConfig,
    hydration: HydrationState,
    generation: u64,
}

impl WizardSession {
    pub fn init(mode: WizardMode, config: WizardConfig) -> Self {
        let mut stager =
            DocumentStager::new(config.max_file_bytes, config.document_base_url.clone());
        stager.set_business_ref(mode.business_id().cloned());
        let hydration = match mode {
            WizardMode::Create => HydrationState::NotRequired,
            WizardMode::Edit(_) => HydrationState::Pending,
        };
        info!(mode = mode.label(), "wizard session started");

        Self {
            mode,
            store: FieldStore::new(),
            stager,
            steps: StepController::default(),
            config,
            hydration,
            generation: 0,
        }
    }

    pub fn mode(&self) -> &WizardMode {
        &self.mode
    }

    pub fn config(&self) -> &WizardConfig {
        &self.config
    }

    pub fn record(&self) -> &FormRecord {
        self.store.record()
    }

    pub fn errors(&self) -> &ValidationErrors {
        self.store.errors()
    }

    pub fn stager(&self) -> &DocumentStager {
        &self.stager
    }

    pub(crate) fn stager_mut(&mut self) -> &mut DocumentStager {
        &mut self.stager
    }

    pub fn current_step(&self) -> WizardStep {
        self.steps.current()
    }

    pub fn hydration_state(&self) -> HydrationState {
        self.hydration
    }

    pub fn step_statuses(&self) -> Vec<StepProgress> {
        self.steps.progress()
    }

    fn ensure_editable(&self) -> Result<(), SessionError> {
        match self.hydration {
            HydrationState::Pending => Err(SessionError::AwaitingHydration),
            HydrationState::NotRequired | HydrationState::Complete => Ok(()),
        }
    }

    /// Waiver fields only change together with the agreement flag.
    fn check_writable(name: &str, value: &FieldValue) -> Result<(), SessionError> {
        if MANAGED_WAIVER_FIELDS.contains(&name) {
            return Err(SessionError::ManagedField(name.to_string()));
        }
        if name == fields::AGREED_TO_TERMS && value.as_flag().is_none() {
            return Err(SessionError::ExpectedFlag(name.to_string()));
        }
        Ok(())
    }

    /// Apply a user edit, running the dependent-field transition it implies.
    pub fn update_field(&mut self, name: &str, value: FieldValue) -> Result<(), SessionError> {
        self.ensure_editable()?;
        Self::check_writable(name, &value)?;
        if let (fields::AGREED_TO_TERMS, FieldValue::Flag(agreed)) = (name, &value) {
            return self.set_agreement(*agreed, Local::now().date_naive());
        }
        if let FieldValue::Text(text) = &value {
            let changed = self.record().text(name) != text.as_str();
            if name == fields::PROVINCE && changed {
                self.store.on_province_changed(text);
                return Ok(());
            }
            if name == fields::CITY && changed {
                self.store.on_city_changed(text);
                return Ok(());
            }
        }
        self.store.set_field(name, value);
        Ok(())
    }

    /// Apply a batch of edits; nothing is written if any entry is refused.
    pub fn update_fields<I>(&mut self, patch: I) -> Result<(), SessionError>
    where
        I: IntoIterator<Item = (String, FieldValue)>,
    {
        self.ensure_editable()?;
        let patch: Vec<(String, FieldValue)> = patch.into_iter().collect();
        for (name, value) in &patch {
            Self::check_writable(name, value)?;
        }
        for (name, value) in patch {
            self.update_field(&name, value)?;
        }
        Ok(())
    }

    /// Toggle the declaration agreement and its generated waiver together.
    pub fn set_agreement(&mut self, agreed: bool, as_of: NaiveDate) -> Result<(), SessionError> {
        self.ensure_editable()?;
        let patch = if agreed {
            waiver::agreement_patch(&self.record().applicant_name(), as_of)
        } else {
            waiver::revocation_patch()
        };
        self.store.merge_fields(patch);
        debug!(agreed, "waiver agreement updated");
        Ok(())
    }

    pub fn next(&mut self) -> Transition {
        let transition = self.steps.next(self.store.record());
        match &transition {
            Transition::Refused(errors) => {
                debug!(
                    step = self.steps.current().label(),
                    errors = errors.len(),
                    "step transition refused"
                );
                self.store.replace_errors(errors.clone());
            }
            Transition::Advanced(step) => {
                debug!(step = step.label(), "advanced to step");
                self.store.clear_errors();
            }
            Transition::ReadyToSubmit => self.store.clear_errors(),
        }
        transition
    }

    pub fn prev(&mut self) -> WizardStep {
        self.store.clear_errors();
        self.steps.prev()
    }

    pub fn jump_back(&mut self, step: WizardStep) -> bool {
        let moved = self.steps.jump_back(step);
        if moved {
            self.store.clear_errors();
        }
        moved
    }

    pub fn add_requirement(
        &mut self,
        requirement_type: &str,
        description: &str,
        file: Option<AttachedFile>,
    ) -> Result<RequirementId, SessionError> {
        self.ensure_editable()?;
        Ok(self
            .stager
            .add_requirement(requirement_type, description, file)?)
    }

    pub fn update_requirement(
        &mut self,
        id: RequirementId,
        patch: RequirementPatch,
    ) -> Result<(), SessionError> {
        self.ensure_editable()?;
        Ok(self.stager.update_requirement(id, patch)?)
    }

    pub fn delete_requirement(&mut self, id: RequirementId) -> Result<Requirement, SessionError> {
        self.ensure_editable()?;
        Ok(self.stager.delete_requirement(id)?)
    }

    pub fn view_document(&self, target: DocumentRef) -> Result<DocumentView, SessionError> {
        Ok(self.stager.view_document(target)?)
    }

    /// Apply encodings that finished since the last call.
    pub async fn drain_staging(&mut self) -> Vec<StagingFailure> {
        self.stager.drain_completed().await
    }

    /// Start an edit-mode load; responses for older tickets are discarded.
    pub fn begin_hydration(&mut self) -> Result<HydrationTicket, SessionError> {
        if self.mode.business_id().is_none() {
            return Err(SessionError::NotEditMode);
        }
        self.generation += 1;
        self.hydration = HydrationState::Pending;
        Ok(HydrationTicket {
            generation: self.generation,
        })
    }

    pub fn apply_hydration(
        &mut self,
        ticket: HydrationTicket,
        details: BusinessDetails,
    ) -> Result<(), SessionError> {
        if ticket.generation != self.generation {
            return Err(SessionError::StaleHydration);
        }
        let hydrated = hydration::normalize(details);
        let requirements = hydrated.requirements.len();
        self.store.replace_record(hydrated.record);
        self.stager.load_persisted(hydrated.requirements);
        self.hydration = HydrationState::Complete;
        info!(requirements, "business record loaded into session");
        Ok(())
    }

    /// Return to the initial state for the session's mode.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.store.reset();
        self.stager.reset();
        self.stager.set_business_ref(self.mode.business_id().cloned());
        self.steps.reset();
        self.hydration = match self.mode {
            WizardMode::Create => HydrationState::NotRequired,
            WizardMode::Edit(_) => HydrationState::Pending,
        };
        info!(mode = self.mode.label(), "wizard session reset");
    }

    pub fn snapshot(&self) -> SessionView {
        SessionView {
            mode: self.mode.clone(),
            hydration: self.hydration,
            current_step: self.steps.current(),
            steps: self.steps.progress(),
            record: self.store.record().clone(),
            errors: self.store.errors().clone(),
            requirements: self.stager.requirements().to_vec(),
            documents: self.stager.documents().to_vec(),
            encodings_in_flight: self.stager.in_flight(),
        }
    }
}

/// Serializable picture of a session for callers rendering the wizard.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub mode: WizardMode,
    pub hydration: HydrationState,
    pub current_step: WizardStep,
    pub steps: Vec<StepProgress>,
    pub record: FormRecord,
    pub errors: ValidationErrors,
    pub requirements: Vec<Requirement>,
    pub documents: Vec<StagedDocument>,
    pub encodings_in_flight: usize,
}
