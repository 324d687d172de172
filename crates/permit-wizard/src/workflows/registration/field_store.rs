use tracing::debug;

use super::domain::{fields, FieldValue, FormRecord};
use super::validation::ValidationErrors;

/// Holds the session's registration record and the errors shown against it.
#[derive(Debug, Clone, Default)]
pub struct FieldStore {
    record: FormRecord,
    errors: ValidationErrors,
}

impl FieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: FormRecord) -> Self {
        Self {
            record,
            errors: ValidationErrors::default(),
        }
    }

    pub fn record(&self) -> &FormRecord {
        &self.record
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.record.get(name)
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Replace one field and clear any error shown for it.
    pub fn set_field(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.record.insert(name, value.into());
        if self.errors.remove(name) {
            debug!(field = name, "cleared field error after edit");
        }
    }

    /// Replace several fields in one step.
    pub fn merge_fields<I, K>(&mut self, patch: I)
    where
        I: IntoIterator<Item = (K, FieldValue)>,
        K: Into<String>,
    {
        let mut next = self.record.clone();
        let mut touched = Vec::new();
        for (name, value) in patch {
            let name = name.into();
            next.insert(name.clone(), value);
            touched.push(name);
        }
        self.record = next;
        for name in &touched {
            self.errors.remove(name);
        }
        debug!(fields = touched.len(), "merged field patch");
    }

    /// Selecting a province invalidates the city and barangay picked under the old one.
    pub fn on_province_changed(&mut self, province: &str) {
        self.merge_fields([
            (fields::PROVINCE, FieldValue::text(province)),
            (fields::CITY, FieldValue::text("")),
            (fields::BARANGAY, FieldValue::text("")),
        ]);
    }

    pub fn on_city_changed(&mut self, city: &str) {
        self.merge_fields([
            (fields::CITY, FieldValue::text(city)),
            (fields::BARANGAY, FieldValue::text("")),
        ]);
    }

    pub(crate) fn replace_errors(&mut self, errors: ValidationErrors) {
        self.errors = errors;
    }

    pub(crate) fn clear_errors(&mut self) {
        self.errors = ValidationErrors::default();
    }

    pub(crate) fn replace_record(&mut self, record: FormRecord) {
        self.record = record;
        self.errors = ValidationErrors::default();
    }

    pub fn reset(&mut self) {
        self.replace_record(FormRecord::new());
    }
}
