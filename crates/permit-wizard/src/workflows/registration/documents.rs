use std::fmt;
use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::domain::BusinessId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequirementId(pub Uuid);

impl RequirementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequirementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequirementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    PendingUpload,
    Uploaded,
    Failed,
}

impl RequirementStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::PendingUpload => "Pending Upload",
            Self::Uploaded => "Uploaded",
            Self::Failed => "Failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Committed,
    Failed,
}

impl DocumentStatus {
    /// Numeric code used by the registry's document entries.
    pub const fn code(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Committed => 1,
            Self::Failed => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

/// File picked by the user, not yet read or encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedFile {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub source: FileSource,
}

impl AttachedFile {
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: None,
            source: FileSource::Bytes(bytes),
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            file_name,
            mime_type: None,
            source: FileSource::Path(path),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Declared type, falling back to a guess from the file name.
    pub fn resolved_mime_type(&self) -> String {
        self.mime_type
            .clone()
            .filter(|mime| !mime.trim().is_empty())
            .unwrap_or_else(|| {
                mime_guess::from_path(&self.file_name)
                    .first_or(mime::APPLICATION_OCTET_STREAM)
                    .to_string()
            })
    }
}

/// Regulatory document obligation declared by the applicant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Requirement {
    pub id: RequirementId,
    #[serde(rename = "type")]
    pub requirement_type: String,
    pub description: String,
    pub status: RequirementStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Location of a copy already persisted by the registry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub file: Option<AttachedFile>,
}

impl Requirement {
    fn declared(requirement_type: &str, description: &str) -> Self {
        Self {
            id: RequirementId::new(),
            requirement_type: requirement_type.to_string(),
            description: description.to_string(),
            status: RequirementStatus::PendingUpload,
            file_name: None,
            path: None,
            error: None,
            file: None,
        }
    }

    /// Requirement whose file the registry already holds.
    pub fn persisted(
        requirement_type: impl Into<String>,
        description: impl Into<String>,
        file_name: Option<String>,
        path: Option<String>,
    ) -> Self {
        Self {
            id: RequirementId::new(),
            requirement_type: requirement_type.into(),
            description: description.into(),
            status: RequirementStatus::Uploaded,
            file_name,
            path,
            error: None,
            file: None,
        }
    }
}

/// Encoded, not-yet-uploaded copy of a requirement's file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedDocument {
    pub id: Uuid,
    pub requirement_id: RequirementId,
    #[serde(rename = "type")]
    pub document_type: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_ref: Option<BusinessId>,
    pub file_name: String,
    pub mime_type: String,
    #[serde(skip)]
    pub encoded_payload: String,
    pub status: DocumentStatus,
    pub timestamp: DateTime<Utc>,
}

/// Partial edit of a requirement; `None` leaves the attribute untouched.
#[derive(Debug, Clone, Default)]
pub struct RequirementPatch {
    pub requirement_type: Option<String>,
    pub description: Option<String>,
    pub file: Option<AttachedFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentView {
    Inline {
        file_name: String,
        mime_type: String,
        data_url: String,
    },
    LocalFile {
        file_name: String,
        mime_type: String,
        path: PathBuf,
    },
    Remote {
        url: String,
    },
}

/// What the applicant asked to view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentRef {
    Requirement(RequirementId),
    Staged(Uuid),
}

#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("requirement {0} is required")]
    MissingInput(&'static str),
    #[error("requirement {0} not found")]
    RequirementNotFound(RequirementId),
    #[error("file '{0}' is empty")]
    EmptyFile(String),
    #[error("file '{file_name}' is {size} bytes, above the {limit} byte limit")]
    FileTooLarge {
        file_name: String,
        size: usize,
        limit: usize,
    },
    #[error("unable to read '{file_name}': {source}")]
    Io {
        file_name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("encoding of '{file_name}' did not finish: {reason}")]
    EncodingAborted { file_name: String, reason: String },
    #[error("file encoding needs an async runtime")]
    RuntimeUnavailable,
    #[error("no viewable copy of the document is available")]
    NotViewable,
}

/// Encoding that failed after its requirement was accepted.
#[derive(Debug)]
pub struct StagingFailure {
    pub requirement_id: RequirementId,
    pub error: StagingError,
}

struct EncodedFile {
    file_name: String,
    mime_type: String,
    payload: String,
    encoded_at: DateTime<Utc>,
}

struct PendingEncoding {
    requirement_id: RequirementId,
    handle: JoinHandle<Result<EncodedFile, StagingError>>,
}

const DEFAULT_REQUIREMENTS: [(&str, &str); 3] = [
    (
        "Barangay Clearance",
        "Clearance issued by the barangay where the business operates",
    ),
    (
        "DTI/SEC/CDA Registration",
        "Certificate of business name or articles of incorporation",
    ),
    (
        "Contract of Lease or Land Title",
        "Proof of the right to use the business premises",
    ),
];

/// Keeps requirements and their staged documents consistent.
pub struct DocumentStager {
    requirements: Vec<Requirement>,
    documents: Vec<StagedDocument>,
    in_flight: Vec<PendingEncoding>,
    business_ref: Option<BusinessId>,
    max_file_bytes: usize,
    document_base_url: Option<String>,
}

impl fmt::Debug for DocumentStager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentStager")
            .field("requirements", &self.requirements.len())
            .field("documents", &self.documents.len())
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl DocumentStager {
    pub fn new(max_file_bytes: usize, document_base_url: Option<String>) -> Self {
        let mut stager = Self {
            requirements: Vec::new(),
            documents: Vec::new(),
            in_flight: Vec::new(),
            business_ref: None,
            max_file_bytes,
            document_base_url,
        };
        stager.seed_defaults();
        stager
    }

    fn seed_defaults(&mut self) {
        self.requirements = DEFAULT_REQUIREMENTS
            .iter()
            .map(|(requirement_type, description)| {
                Requirement::declared(requirement_type, description)
            })
            .collect();
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn documents(&self) -> &[StagedDocument] {
        &self.documents
    }

    pub fn requirement(&self, id: RequirementId) -> Option<&Requirement> {
        self.requirements.iter().find(|requirement| requirement.id == id)
    }

    pub fn document_for(&self, id: RequirementId) -> Option<&StagedDocument> {
        self.documents
            .iter()
            .find(|document| document.requirement_id == id)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Problems that keep the requirement list from being submitted: failed
    /// requirements and attached files that have no staged document yet.
    pub fn unresolved(&self) -> Vec<String> {
        self.requirements
            .iter()
            .filter_map(|requirement| {
                if requirement.status == RequirementStatus::Failed {
                    return Some(requirement.error.clone().unwrap_or_else(|| {
                        format!(
                            "requirement '{}' has no usable file",
                            requirement.requirement_type
                        )
                    }));
                }
                let file = requirement.file.as_ref()?;
                if self.document_for(requirement.id).is_some() {
                    return None;
                }
                Some(format!("file '{}' is not staged yet", file.file_name))
            })
            .collect()
    }

    pub fn business_ref(&self) -> Option<&BusinessId> {
        self.business_ref.as_ref()
    }

    pub fn set_business_ref(&mut self, business_ref: Option<BusinessId>) {
        self.business_ref = business_ref;
    }

    /// Replace the requirement list with records loaded from the registry.
    pub fn load_persisted(&mut self, requirements: Vec<Requirement>) {
        self.in_flight.clear();
        self.documents.clear();
        self.requirements = requirements;
    }

    /// Declare a requirement and start encoding its file in the background.
    pub fn add_requirement(
        &mut self,
        requirement_type: &str,
        description: &str,
        file: Option<AttachedFile>,
    ) -> Result<RequirementId, StagingError> {
        if requirement_type.trim().is_empty() {
            return Err(StagingError::MissingInput("type"));
        }
        if description.trim().is_empty() {
            return Err(StagingError::MissingInput("description"));
        }
        let file = file
            .filter(|file| !file.file_name.trim().is_empty())
            .ok_or(StagingError::MissingInput("file"))?;

        let mut requirement = Requirement::declared(requirement_type.trim(), description.trim());
        let id = requirement.id;
        let handle = self.spawn_encoding(&file)?;
        requirement.file_name = Some(file.file_name.clone());
        requirement.file = Some(file);
        self.requirements.push(requirement);
        self.in_flight.push(PendingEncoding {
            requirement_id: id,
            handle,
        });

        info!(requirement = %id, requirement_type, "requirement added; encoding started");
        Ok(id)
    }

    pub fn update_requirement(
        &mut self,
        id: RequirementId,
        patch: RequirementPatch,
    ) -> Result<(), StagingError> {
        let index = self
            .requirements
            .iter()
            .position(|requirement| requirement.id == id)
            .ok_or(StagingError::RequirementNotFound(id))?;

        let handle = match &patch.file {
            Some(file) if file.file_name.trim().is_empty() => {
                return Err(StagingError::MissingInput("file"))
            }
            Some(file) => Some(self.spawn_encoding(file)?),
            None => None,
        };

        let requirement = &mut self.requirements[index];
        if let Some(requirement_type) = patch.requirement_type {
            requirement.requirement_type = requirement_type;
        }
        if let Some(description) = patch.description {
            requirement.description = description;
        }
        let requirement_type = requirement.requirement_type.clone();
        let description = requirement.description.clone();

        if let (Some(file), Some(handle)) = (patch.file, handle) {
            requirement.file_name = Some(file.file_name.clone());
            requirement.file = Some(file);
            requirement.status = RequirementStatus::PendingUpload;
            requirement.error = None;
            self.in_flight.retain(|pending| pending.requirement_id != id);
            self.documents.retain(|document| document.requirement_id != id);
            self.in_flight.push(PendingEncoding {
                requirement_id: id,
                handle,
            });
            debug!(requirement = %id, "replacement file attached; encoding started");
            return Ok(());
        }

        // Staged documents are immutable, so a renamed requirement gets a fresh copy.
        if let Some(position) = self
            .documents
            .iter()
            .position(|document| document.requirement_id == id)
        {
            let stale = self.documents.remove(position);
            if stale.document_type != requirement_type || stale.description != description {
                self.documents.push(StagedDocument {
                    id: Uuid::new_v4(),
                    document_type: requirement_type,
                    description,
                    ..stale
                });
            } else {
                self.documents.insert(position, stale);
            }
        }
        Ok(())
    }

    /// Remove a requirement together with its staged document and any pending encoding.
    pub fn delete_requirement(&mut self, id: RequirementId) -> Result<Requirement, StagingError> {
        let index = self
            .requirements
            .iter()
            .position(|requirement| requirement.id == id)
            .ok_or(StagingError::RequirementNotFound(id))?;

        let removed = self.requirements.remove(index);
        self.documents.retain(|document| document.requirement_id != id);
        self.in_flight.retain(|pending| pending.requirement_id != id);
        info!(requirement = %id, "requirement deleted with its staged document");
        Ok(removed)
    }

    pub fn view_document(&self, target: DocumentRef) -> Result<DocumentView, StagingError> {
        let (requirement, document) = match target {
            DocumentRef::Requirement(id) => {
                let requirement = self
                    .requirement(id)
                    .ok_or(StagingError::RequirementNotFound(id))?;
                (Some(requirement), self.document_for(id))
            }
            DocumentRef::Staged(document_id) => {
                let document = self
                    .documents
                    .iter()
                    .find(|document| document.id == document_id)
                    .ok_or(StagingError::NotViewable)?;
                (self.requirement(document.requirement_id), Some(document))
            }
        };

        if let Some(document) = document {
            return Ok(DocumentView::Inline {
                file_name: document.file_name.clone(),
                mime_type: document.mime_type.clone(),
                data_url: data_url(&document.mime_type, &document.encoded_payload),
            });
        }

        let requirement = requirement.ok_or(StagingError::NotViewable)?;
        if let Some(file) = &requirement.file {
            let mime_type = file.resolved_mime_type();
            return Ok(match &file.source {
                FileSource::Bytes(bytes) => DocumentView::Inline {
                    file_name: file.file_name.clone(),
                    data_url: data_url(&mime_type, &STANDARD.encode(bytes)),
                    mime_type,
                },
                FileSource::Path(path) => DocumentView::LocalFile {
                    file_name: file.file_name.clone(),
                    mime_type,
                    path: path.clone(),
                },
            });
        }

        match requirement.path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => Ok(DocumentView::Remote {
                url: self.remote_url(path),
            }),
            _ => Err(StagingError::NotViewable),
        }
    }

    fn remote_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        match &self.document_base_url {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
            None => path.to_string(),
        }
    }

    /// Apply encodings that already finished without waiting on the rest.
    pub async fn drain_completed(&mut self) -> Vec<StagingFailure> {
        let (finished, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.in_flight)
            .into_iter()
            .partition(|pending| pending.handle.is_finished());
        self.in_flight = pending;
        self.apply_all(finished).await
    }

    /// Wait for every in-flight encoding and apply the results.
    pub async fn settle(&mut self) -> Vec<StagingFailure> {
        let pending = std::mem::take(&mut self.in_flight);
        if !pending.is_empty() {
            debug!(count = pending.len(), "waiting for in-flight encodings");
        }
        self.apply_all(pending).await
    }

    async fn apply_all(&mut self, pending: Vec<PendingEncoding>) -> Vec<StagingFailure> {
        let mut failures = Vec::new();
        for PendingEncoding {
            requirement_id,
            handle,
        } in pending
        {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_error) => Err(StagingError::EncodingAborted {
                    file_name: self
                        .requirement(requirement_id)
                        .and_then(|requirement| requirement.file_name.clone())
                        .unwrap_or_default(),
                    reason: join_error.to_string(),
                }),
            };
            if let Err(error) = self.apply(requirement_id, outcome) {
                failures.push(StagingFailure {
                    requirement_id,
                    error,
                });
            }
        }
        failures
    }

    fn apply(
        &mut self,
        requirement_id: RequirementId,
        outcome: Result<EncodedFile, StagingError>,
    ) -> Result<(), StagingError> {
        let business_ref = self.business_ref.clone();
        let Some(requirement) = self
            .requirements
            .iter_mut()
            .find(|requirement| requirement.id == requirement_id)
        else {
            debug!(requirement = %requirement_id, "discarding encoding for removed requirement");
            return Ok(());
        };

        match outcome {
            Ok(encoded) => {
                self.documents.push(StagedDocument {
                    id: Uuid::new_v4(),
                    requirement_id,
                    document_type: requirement.requirement_type.clone(),
                    description: requirement.description.clone(),
                    business_ref,
                    file_name: encoded.file_name,
                    mime_type: encoded.mime_type,
                    encoded_payload: encoded.payload,
                    status: DocumentStatus::Pending,
                    timestamp: encoded.encoded_at,
                });
                Ok(())
            }
            Err(error) => {
                warn!(requirement = %requirement_id, %error, "file encoding failed");
                requirement.status = RequirementStatus::Failed;
                requirement.error = Some(error.to_string());
                requirement.file_name = None;
                requirement.file = None;
                Err(error)
            }
        }
    }

    fn spawn_encoding(
        &self,
        file: &AttachedFile,
    ) -> Result<JoinHandle<Result<EncodedFile, StagingError>>, StagingError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| StagingError::RuntimeUnavailable)?;
        let file = file.clone();
        let limit = self.max_file_bytes;
        Ok(runtime.spawn(encode_file(file, limit)))
    }

    /// Drop every requirement and document and restore the seeded defaults.
    pub fn reset(&mut self) {
        self.in_flight.clear();
        self.documents.clear();
        self.business_ref = None;
        self.seed_defaults();
    }
}

async fn encode_file(file: AttachedFile, limit: usize) -> Result<EncodedFile, StagingError> {
    let mime_type = file.resolved_mime_type();
    let AttachedFile {
        file_name, source, ..
    } = file;

    let bytes = match source {
        FileSource::Bytes(bytes) => bytes,
        FileSource::Path(path) => {
            tokio::fs::read(&path)
                .await
                .map_err(|source| StagingError::Io {
                    file_name: file_name.clone(),
                    source,
                })?
        }
    };

    if bytes.is_empty() {
        return Err(StagingError::EmptyFile(file_name));
    }
    if bytes.len() > limit {
        return Err(StagingError::FileTooLarge {
            file_name,
            size: bytes.len(),
            limit,
        });
    }

    let payload = tokio::task::spawn_blocking(move || STANDARD.encode(bytes))
        .await
        .map_err(|err| StagingError::EncodingAborted {
            file_name: file_name.clone(),
            reason: err.to_string(),
        })?;

    Ok(EncodedFile {
        file_name,
        mime_type,
        payload,
        encoded_at: Utc::now(),
    })
}

fn data_url(mime_type: &str, payload: &str) -> String {
    format!("data:{mime_type};base64,{payload}")
}
