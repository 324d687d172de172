use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::domain::BusinessId;
use super::hydration::BusinessDetails;
use super::submission::RegistrationPayload;

/// Outbound business registry (`POST /Business`, `PUT /Business/{id}`,
/// `GET /Business/{id}/details`). Transport concerns live in implementations.
#[async_trait]
pub trait BusinessRegistry: Send + Sync {
    async fn create(&self, payload: &RegistrationPayload) -> Result<BusinessId, RegistryError>;
    async fn update(
        &self,
        business_id: &BusinessId,
        payload: &RegistrationPayload,
    ) -> Result<(), RegistryError>;
    async fn fetch_details(&self, business_id: &BusinessId)
        -> Result<BusinessDetails, RegistryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The registry answered but refused the request; `message` is its own wording.
    #[error("registry rejected the request{}", rejection_detail(.message))]
    Rejected { message: Option<String> },
    #[error("business {0} not found")]
    NotFound(BusinessId),
    #[error("registry unavailable: {0}")]
    Unavailable(String),
    #[error("malformed registry response: {0}")]
    Malformed(String),
}

impl RegistryError {
    /// Message supplied by the registry itself, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            RegistryError::Rejected { message } => message.as_deref(),
            _ => None,
        }
    }
}

fn rejection_detail(message: &Option<String>) -> String {
    match message {
        Some(message) => format!(": {message}"),
        None => String::new(),
    }
}

static BUSINESS_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_business_id() -> BusinessId {
    let id = BUSINESS_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    BusinessId(format!("biz-{id:06}"))
}

/// Process-local registry keeping the last payload per business.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBusinessRegistry {
    records: Arc<Mutex<HashMap<BusinessId, RegistrationPayload>>>,
}

impl InMemoryBusinessRegistry {
    pub fn get(&self, business_id: &BusinessId) -> Option<RegistrationPayload> {
        self.records
            .lock()
            .expect("registry mutex poisoned")
            .get(business_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("registry mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BusinessRegistry for InMemoryBusinessRegistry {
    async fn create(&self, payload: &RegistrationPayload) -> Result<BusinessId, RegistryError> {
        let business_id = next_business_id();
        self.records
            .lock()
            .map_err(|_| RegistryError::Unavailable("registry lock poisoned".to_string()))?
            .insert(business_id.clone(), payload.clone());
        Ok(business_id)
    }

    async fn update(
        &self,
        business_id: &BusinessId,
        payload: &RegistrationPayload,
    ) -> Result<(), RegistryError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| RegistryError::Unavailable("registry lock poisoned".to_string()))?;
        match guard.get_mut(business_id) {
            Some(stored) => {
                *stored = payload.clone();
                Ok(())
            }
            None => Err(RegistryError::NotFound(business_id.clone())),
        }
    }

    async fn fetch_details(
        &self,
        business_id: &BusinessId,
    ) -> Result<BusinessDetails, RegistryError> {
        let payload = self
            .records
            .lock()
            .map_err(|_| RegistryError::Unavailable("registry lock poisoned".to_string()))?
            .get(business_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(business_id.clone()))?;

        serde_json::from_value(nested_details(&payload))
            .map_err(|err| RegistryError::Malformed(err.to_string()))
    }
}

/// Regroup a stored payload into the sectioned shape the registry serves.
fn nested_details(payload: &RegistrationPayload) -> Value {
    let field = |name: &str| payload.fields.get(name).cloned().unwrap_or(Value::Null);
    let requirements: Vec<Value> = payload
        .documents
        .iter()
        .map(|document| {
            json!({
                "type_": document.document_type,
                "description_": document.description,
                "filename_": document.filename,
                "path_": document.path.clone().unwrap_or_else(|| format!("uploads/{}", document.filename)),
                "status_": 1,
            })
        })
        .collect();

    json!({
        "businessInfo": {
            "businessname_": field("businessName"),
            "tradename_": field("tradeName"),
            "ownershiptype_": field("ownershipType"),
            "registrationno_": field("registrationNo"),
            "registrationdate_": field("registrationDate"),
            "lineofbusiness_": field("lineOfBusiness"),
            "businessactivity_": field("businessActivity"),
            "capitalization_": field("capitalization"),
            "grosssales_": field("grossSales"),
            "employeesmale_": field("employeesMale"),
            "employeesfemale_": field("employeesFemale"),
            "businessarea_": field("businessAreaSqm"),
            "lastname_": field("lastName"),
            "firstname_": field("firstName"),
            "middlename_": field("middleName"),
            "suffix_": field("suffix"),
            "birthdate_": field("birthdate"),
            "gender_": field("gender"),
            "civilstatus_": field("civilStatus"),
            "tin_": field("tin"),
            "email_": field("email"),
            "mobileno_": field("mobileNumber"),
        },
        "address": {
            "province_": field("province"),
            "city_": field("city"),
            "barangay_": field("barangay"),
            "street_": field("street"),
            "houseno_": field("houseNo"),
            "building_": field("building"),
            "zipcode_": field("zipCode"),
            "latitude_": field("latitude"),
            "longitude_": field("longitude"),
        },
        "representative": {
            "lastname_": field("repLastName"),
            "firstname_": field("repFirstName"),
            "middlename_": field("repMiddleName"),
            "position_": field("repPosition"),
            "mobileno_": field("repMobile"),
            "email_": field("repEmail"),
        },
        "requirements": requirements,
    })
}
