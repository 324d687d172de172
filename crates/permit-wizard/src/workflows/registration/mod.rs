//! Step-gated business permit registration.
//!
//! A [`WizardSession`] owns the form record, the requirement/document
//! staging area and the step position for one applicant. The
//! [`SubmissionCoordinator`] turns a finished session into a single create or
//! update call against a [`BusinessRegistry`].

pub mod documents;
pub mod domain;
pub mod field_store;
pub mod hydration;
pub mod registry;
pub mod router;
pub mod session;
pub mod steps;
pub mod submission;
pub mod validation;
pub mod waiver;

#[cfg(test)]
mod tests;

pub use documents::{
    AttachedFile, DocumentRef, DocumentStager, DocumentStatus, DocumentView, FileSource,
    Requirement, RequirementId, RequirementPatch, RequirementStatus, StagedDocument, StagingError,
    StagingFailure,
};
pub use domain::{
    ApplicantName, BusinessId, FieldKind, FieldSection, FieldSpec, FieldValue, FormRecord,
    WizardMode, FIELD_CATALOG,
};
pub use field_store::FieldStore;
pub use hydration::{normalize, BusinessDetails, HydratedBusiness};
pub use registry::{BusinessRegistry, InMemoryBusinessRegistry, RegistryError};
pub use router::{wizard_router, WizardSessions};
pub use session::{HydrationState, HydrationTicket, SessionError, SessionView, WizardSession};
pub use steps::{StepController, StepProgress, StepStatus, Transition, WizardStep};
pub use submission::{
    AdvanceOutcome, DocumentPayload, RegistrationPayload, SubmissionCoordinator,
    SubmissionError, SubmissionReceipt,
};
pub use validation::{validate, FieldError, ValidationErrors};
