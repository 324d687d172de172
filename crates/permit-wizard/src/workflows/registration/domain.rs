use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier assigned by the business registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusinessId(pub String);

impl fmt::Display for BusinessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether the session registers a new business or edits an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "business_id")]
pub enum WizardMode {
    Create,
    Edit(BusinessId),
}

impl WizardMode {
    pub fn business_id(&self) -> Option<&BusinessId> {
        match self {
            WizardMode::Create => None,
            WizardMode::Edit(id) => Some(id),
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            WizardMode::Create => "create",
            WizardMode::Edit(_) => "edit",
        }
    }
}

/// Scalar held by a single form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Blank means an empty or whitespace-only string; flags and numbers are never blank.
    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(value) if value.trim().is_empty())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Flag,
    Number,
}

impl FieldKind {
    pub fn default_value(self) -> FieldValue {
        match self {
            FieldKind::Text => FieldValue::Text(String::new()),
            FieldKind::Flag => FieldValue::Flag(false),
            FieldKind::Number => FieldValue::Number(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSection {
    Taxpayer,
    Business,
    Address,
    Contact,
    Representative,
    Regulatory,
    Waiver,
    Application,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub section: FieldSection,
}

const fn text(name: &'static str, section: FieldSection) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Text,
        section,
    }
}

const fn flag(name: &'static str, section: FieldSection) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Flag,
        section,
    }
}

const fn number(name: &'static str, section: FieldSection) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Number,
        section,
    }
}

pub mod fields {
    pub const LAST_NAME: &str = "lastName";
    pub const FIRST_NAME: &str = "firstName";
    pub const MIDDLE_NAME: &str = "middleName";
    pub const SUFFIX: &str = "suffix";
    pub const BIRTHDATE: &str = "birthdate";
    pub const GENDER: &str = "gender";
    pub const CIVIL_STATUS: &str = "civilStatus";
    pub const TIN: &str = "tin";
    pub const EMAIL: &str = "email";
    pub const MOBILE_NUMBER: &str = "mobileNumber";
    pub const BUSINESS_NAME: &str = "businessName";
    pub const TRADE_NAME: &str = "tradeName";
    pub const OWNERSHIP_TYPE: &str = "ownershipType";
    pub const LINE_OF_BUSINESS: &str = "lineOfBusiness";
    pub const PROVINCE: &str = "province";
    pub const CITY: &str = "city";
    pub const BARANGAY: &str = "barangay";
    pub const STREET: &str = "street";
    pub const AGREED_TO_TERMS: &str = "agreedToTerms";
    pub const WAIVER_STATUS: &str = "waiverStatus";
    pub const WAIVER_NAME: &str = "waiverName";
    pub const WAIVER_TYPE: &str = "waiverType";
    pub const WAIVER_CONTENT: &str = "content";
    pub const WAIVER_AGREEMENT: &str = "waiverAgreement";
}

use FieldSection::*;

/// Every field the wizard collects, with the kind that fixes its default.
pub const FIELD_CATALOG: &[FieldSpec] = &[
    text(fields::LAST_NAME, Taxpayer),
    text(fields::FIRST_NAME, Taxpayer),
    text(fields::MIDDLE_NAME, Taxpayer),
    text(fields::SUFFIX, Taxpayer),
    text(fields::BIRTHDATE, Taxpayer),
    text(fields::GENDER, Taxpayer),
    text(fields::CIVIL_STATUS, Taxpayer),
    text("citizenship", Taxpayer),
    text(fields::TIN, Taxpayer),
    text(fields::EMAIL, Taxpayer),
    text(fields::MOBILE_NUMBER, Taxpayer),
    text("telephoneNumber", Taxpayer),
    text("ctcNo", Taxpayer),
    text("ctcDateIssued", Taxpayer),
    text("ctcPlaceIssued", Taxpayer),
    text("ownerProvince", Taxpayer),
    text("ownerCity", Taxpayer),
    text("ownerBarangay", Taxpayer),
    text("ownerStreet", Taxpayer),
    text("ownerHouseNo", Taxpayer),
    text("ownerZipCode", Taxpayer),
    text(fields::BUSINESS_NAME, Business),
    text(fields::TRADE_NAME, Business),
    text(fields::OWNERSHIP_TYPE, Business),
    text("registrationNo", Business),
    text("registrationDate", Business),
    text(fields::LINE_OF_BUSINESS, Business),
    text("businessActivity", Business),
    text("psicCode", Business),
    number("capitalization", Business),
    number("grossSales", Business),
    number("employeesMale", Business),
    number("employeesFemale", Business),
    number("employeesLgu", Business),
    number("businessAreaSqm", Business),
    number("deliveryVehicles", Business),
    flag("taxIncentive", Business),
    text("taxIncentiveEntity", Business),
    flag("isMainOffice", Business),
    text(fields::PROVINCE, Address),
    text(fields::CITY, Address),
    text(fields::BARANGAY, Address),
    text(fields::STREET, Address),
    text("houseNo", Address),
    text("building", Address),
    text("unitNo", Address),
    text("subdivision", Address),
    text("zipCode", Address),
    number("latitude", Address),
    number("longitude", Address),
    flag("ownsPlace", Address),
    text("lessorName", Address),
    text("lessorAddress", Address),
    number("monthlyRental", Address),
    text("businessEmail", Contact),
    text("businessMobile", Contact),
    text("businessTelephone", Contact),
    text("website", Contact),
    text("emergencyContactName", Contact),
    text("emergencyContactNumber", Contact),
    text("repLastName", Representative),
    text("repFirstName", Representative),
    text("repMiddleName", Representative),
    text("repPosition", Representative),
    text("repMobile", Representative),
    text("repEmail", Representative),
    text("repTin", Representative),
    flag("repAuthorized", Representative),
    text("barangayClearanceNo", Regulatory),
    text("fireSafetyInspectionNo", Regulatory),
    text("sanitaryPermitNo", Regulatory),
    text("zoningClearanceNo", Regulatory),
    text("occupancyPermitNo", Regulatory),
    text("environmentalCertNo", Regulatory),
    text("buildingPermitNo", Regulatory),
    text("mayorsPermitNo", Regulatory),
    text("sssNo", Regulatory),
    text("philhealthNo", Regulatory),
    text("pagibigNo", Regulatory),
    text("birRegistrationNo", Regulatory),
    flag(fields::AGREED_TO_TERMS, Waiver),
    flag(fields::WAIVER_STATUS, Waiver),
    text(fields::WAIVER_NAME, Waiver),
    text(fields::WAIVER_TYPE, Waiver),
    text(fields::WAIVER_CONTENT, Waiver),
    flag(fields::WAIVER_AGREEMENT, Waiver),
    text("applicationType", Application),
    number("permitYear", Application),
    text("remarks", Application),
];

pub fn field_spec(name: &str) -> Option<&'static FieldSpec> {
    FIELD_CATALOG.iter().find(|spec| spec.name == name)
}

/// The single registration record of a session, keyed by wire field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Option<FieldValue>>",
    into = "BTreeMap<String, FieldValue>"
)]
pub struct FormRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl FormRecord {
    /// A record with every catalogued field at its default.
    pub fn new() -> Self {
        let fields = FIELD_CATALOG
            .iter()
            .map(|spec| (spec.name.to_string(), spec.kind.default_value()))
            .collect();
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn text(&self, name: &str) -> &str {
        self.get(name).and_then(FieldValue::as_text).unwrap_or("")
    }

    pub fn flag(&self, name: &str) -> bool {
        self.get(name)
            .and_then(FieldValue::as_flag)
            .unwrap_or(false)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::as_number)
    }

    /// Absent fields count as blank.
    pub fn is_blank(&self, name: &str) -> bool {
        self.get(name).map_or(true, FieldValue::is_blank)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn applicant_name(&self) -> ApplicantName {
        ApplicantName {
            first: self.text(fields::FIRST_NAME).to_string(),
            middle: self.text(fields::MIDDLE_NAME).to_string(),
            last: self.text(fields::LAST_NAME).to_string(),
            suffix: self.text(fields::SUFFIX).to_string(),
        }
    }
}

impl Default for FormRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl From<BTreeMap<String, Option<FieldValue>>> for FormRecord {
    fn from(wire: BTreeMap<String, Option<FieldValue>>) -> Self {
        let mut record = FormRecord::new();
        for (name, value) in wire {
            match value {
                Some(value) => record.insert(name, value),
                None => {
                    let default = field_spec(&name)
                        .map(|spec| spec.kind.default_value())
                        .unwrap_or_else(|| FieldKind::Text.default_value());
                    record.insert(name, default);
                }
            }
        }
        record
    }
}

impl From<FormRecord> for BTreeMap<String, FieldValue> {
    fn from(record: FormRecord) -> Self {
        record.fields
    }
}

/// Legal-name parts of the applicant; any part may be blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantName {
    pub first: String,
    pub middle: String,
    pub last: String,
    pub suffix: String,
}

impl ApplicantName {
    pub fn full_name(&self) -> String {
        [&self.first, &self.middle, &self.last, &self.suffix]
            .iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for ApplicantName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}
