use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use super::documents::{Requirement, RequirementStatus};
use super::domain::{fields, FieldValue, FormRecord};

/// Business detail payload as returned by the registry.
///
/// Older registry builds answer with the flat form record; newer ones group
/// the data into sections keyed with the registry's column names.
#[derive(Debug, Clone, PartialEq)]
pub enum BusinessDetails {
    Nested(NestedBusinessDetails),
    Flat(FlatBusinessDetails),
}

impl<'de> Deserialize<'de> for BusinessDetails {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if value.get("businessInfo").is_some() {
            NestedBusinessDetails::deserialize(value)
                .map(Self::Nested)
                .map_err(|error| D::Error::custom(format!("nested business details: {error}")))
        } else {
            FlatBusinessDetails::deserialize(value)
                .map(Self::Flat)
                .map_err(|error| D::Error::custom(format!("flat business details: {error}")))
        }
    }
}

/// Flat form record; values that are not scalars are skipped on normalize.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlatBusinessDetails {
    #[serde(default)]
    pub requirements: Vec<RequirementRecord>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NestedBusinessDetails {
    #[serde(rename = "businessInfo")]
    pub business_info: BusinessInfo,
    #[serde(default)]
    pub address: AddressInfo,
    #[serde(default)]
    pub representative: RepresentativeInfo,
    #[serde(default)]
    pub requirements: Vec<RequirementRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BusinessInfo {
    pub businessname_: Option<String>,
    pub tradename_: Option<String>,
    pub ownershiptype_: Option<String>,
    pub registrationno_: Option<String>,
    pub registrationdate_: Option<String>,
    pub lineofbusiness_: Option<String>,
    pub businessactivity_: Option<String>,
    pub capitalization_: Option<f64>,
    pub grosssales_: Option<f64>,
    pub employeesmale_: Option<f64>,
    pub employeesfemale_: Option<f64>,
    pub businessarea_: Option<f64>,
    pub lastname_: Option<String>,
    pub firstname_: Option<String>,
    pub middlename_: Option<String>,
    pub suffix_: Option<String>,
    pub birthdate_: Option<String>,
    pub gender_: Option<String>,
    pub civilstatus_: Option<String>,
    pub tin_: Option<String>,
    pub email_: Option<String>,
    pub mobileno_: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AddressInfo {
    pub province_: Option<String>,
    pub city_: Option<String>,
    pub barangay_: Option<String>,
    pub street_: Option<String>,
    pub houseno_: Option<String>,
    pub building_: Option<String>,
    pub zipcode_: Option<String>,
    pub latitude_: Option<f64>,
    pub longitude_: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RepresentativeInfo {
    pub lastname_: Option<String>,
    pub firstname_: Option<String>,
    pub middlename_: Option<String>,
    pub position_: Option<String>,
    pub mobileno_: Option<String>,
    pub email_: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RequirementRecord {
    #[serde(alias = "type")]
    pub type_: Option<String>,
    #[serde(alias = "description")]
    pub description_: Option<String>,
    #[serde(alias = "filename")]
    pub filename_: Option<String>,
    #[serde(alias = "path")]
    pub path_: Option<String>,
    #[serde(alias = "status")]
    pub status_: Option<u8>,
}

/// Record and requirement list ready to load into a session.
#[derive(Debug, Clone, PartialEq)]
pub struct HydratedBusiness {
    pub record: FormRecord,
    pub requirements: Vec<Requirement>,
}

pub fn normalize(details: BusinessDetails) -> HydratedBusiness {
    match details {
        BusinessDetails::Flat(flat) => HydratedBusiness {
            record: flat_record(flat.fields),
            requirements: convert_requirements(flat.requirements),
        },
        BusinessDetails::Nested(nested) => {
            let mut record = FormRecord::new();
            let sections = [
                business_entries(nested.business_info),
                address_entries(nested.address),
                representative_entries(nested.representative),
            ];
            for (name, value) in sections.into_iter().flatten() {
                if let Some(value) = value {
                    record.insert(name, value);
                }
            }
            HydratedBusiness {
                record,
                requirements: convert_requirements(nested.requirements),
            }
        }
    }
}

fn flat_record(values: BTreeMap<String, Value>) -> FormRecord {
    let wire: BTreeMap<String, Option<FieldValue>> = values
        .into_iter()
        .filter_map(|(name, value)| {
            let value = match value {
                Value::Null => None,
                Value::Bool(flag) => Some(FieldValue::Flag(flag)),
                Value::String(text) => Some(FieldValue::Text(text)),
                Value::Number(number) => Some(FieldValue::Number(number.as_f64()?)),
                Value::Array(_) | Value::Object(_) => {
                    debug!(field = %name, "skipping non-scalar business detail");
                    return None;
                }
            };
            Some((name, value))
        })
        .collect();
    FormRecord::from(wire)
}

fn text(value: Option<String>) -> Option<FieldValue> {
    value.map(FieldValue::Text)
}

fn number(value: Option<f64>) -> Option<FieldValue> {
    value.map(FieldValue::Number)
}

fn business_entries(info: BusinessInfo) -> Vec<(&'static str, Option<FieldValue>)> {
    vec![
        (fields::BUSINESS_NAME, text(info.businessname_)),
        (fields::TRADE_NAME, text(info.tradename_)),
        (fields::OWNERSHIP_TYPE, text(info.ownershiptype_)),
        ("registrationNo", text(info.registrationno_)),
        ("registrationDate", text(info.registrationdate_)),
        (fields::LINE_OF_BUSINESS, text(info.lineofbusiness_)),
        ("businessActivity", text(info.businessactivity_)),
        ("capitalization", number(info.capitalization_)),
        ("grossSales", number(info.grosssales_)),
        ("employeesMale", number(info.employeesmale_)),
        ("employeesFemale", number(info.employeesfemale_)),
        ("businessAreaSqm", number(info.businessarea_)),
        (fields::LAST_NAME, text(info.lastname_)),
        (fields::FIRST_NAME, text(info.firstname_)),
        (fields::MIDDLE_NAME, text(info.middlename_)),
        (fields::SUFFIX, text(info.suffix_)),
        (fields::BIRTHDATE, text(info.birthdate_)),
        (fields::GENDER, text(info.gender_)),
        (fields::CIVIL_STATUS, text(info.civilstatus_)),
        (fields::TIN, text(info.tin_)),
        (fields::EMAIL, text(info.email_)),
        (fields::MOBILE_NUMBER, text(info.mobileno_)),
    ]
}

fn address_entries(address: AddressInfo) -> Vec<(&'static str, Option<FieldValue>)> {
    vec![
        (fields::PROVINCE, text(address.province_)),
        (fields::CITY, text(address.city_)),
        (fields::BARANGAY, text(address.barangay_)),
        (fields::STREET, text(address.street_)),
        ("houseNo", text(address.houseno_)),
        ("building", text(address.building_)),
        ("zipCode", text(address.zipcode_)),
        ("latitude", number(address.latitude_)),
        ("longitude", number(address.longitude_)),
    ]
}

fn representative_entries(rep: RepresentativeInfo) -> Vec<(&'static str, Option<FieldValue>)> {
    vec![
        ("repLastName", text(rep.lastname_)),
        ("repFirstName", text(rep.firstname_)),
        ("repMiddleName", text(rep.middlename_)),
        ("repPosition", text(rep.position_)),
        ("repMobile", text(rep.mobileno_)),
        ("repEmail", text(rep.email_)),
    ]
}

fn convert_requirements(records: Vec<RequirementRecord>) -> Vec<Requirement> {
    records
        .into_iter()
        .map(|record| {
            let mut requirement = Requirement::persisted(
                record.type_.unwrap_or_default(),
                record.description_.unwrap_or_default(),
                record.filename_.filter(|name| !name.is_empty()),
                record.path_.filter(|path| !path.is_empty()),
            );
            requirement.status = match record.status_ {
                Some(0) => RequirementStatus::PendingUpload,
                Some(2) => RequirementStatus::Failed,
                _ => RequirementStatus::Uploaded,
            };
            requirement
        })
        .collect()
}
