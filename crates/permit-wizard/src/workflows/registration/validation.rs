use serde::{Deserialize, Serialize};

use super::domain::{fields, FormRecord};
use super::steps::WizardStep;

/// Check applied to a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Text must be non-empty after trimming.
    Required,
    /// Flag must be `true`.
    Accepted,
    /// Blank passes; anything else needs a plausible mailbox shape.
    Email,
    /// Blank passes; separators are ignored before counting digits.
    Digits { min: usize, max: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub rule: Rule,
    pub message: &'static str,
}

const fn rule(field: &'static str, rule: Rule, message: &'static str) -> FieldRule {
    FieldRule {
        field,
        rule,
        message,
    }
}

const TAXPAYER_RULES: &[FieldRule] = &[
    rule(fields::LAST_NAME, Rule::Required, "Last name is required"),
    rule(fields::FIRST_NAME, Rule::Required, "First name is required"),
    rule(fields::BIRTHDATE, Rule::Required, "Birthdate is required"),
    rule(fields::GENDER, Rule::Required, "Gender is required"),
    rule(fields::CIVIL_STATUS, Rule::Required, "Civil status is required"),
    rule(fields::TIN, Rule::Required, "TIN is required"),
    rule(
        fields::TIN,
        Rule::Digits { min: 9, max: 12 },
        "TIN must contain 9 to 12 digits",
    ),
    rule(fields::EMAIL, Rule::Required, "Email address is required"),
    rule(fields::EMAIL, Rule::Email, "Email address is invalid"),
    rule(fields::MOBILE_NUMBER, Rule::Required, "Mobile number is required"),
    rule(
        fields::MOBILE_NUMBER,
        Rule::Digits { min: 10, max: 11 },
        "Mobile number must contain 10 to 11 digits",
    ),
];

const BUSINESS_RULES: &[FieldRule] = &[
    rule(fields::BUSINESS_NAME, Rule::Required, "Business name is required"),
    rule(fields::OWNERSHIP_TYPE, Rule::Required, "Type of ownership is required"),
    rule(fields::LINE_OF_BUSINESS, Rule::Required, "Line of business is required"),
    rule(fields::PROVINCE, Rule::Required, "Province is required"),
    rule(fields::CITY, Rule::Required, "City/Municipality is required"),
    rule(fields::BARANGAY, Rule::Required, "Barangay is required"),
    rule(fields::STREET, Rule::Required, "Street is required"),
];

const SUMMARY_RULES: &[FieldRule] = &[rule(
    fields::AGREED_TO_TERMS,
    Rule::Accepted,
    "You must agree to the terms and conditions",
)];

/// Rules owned by a step, in reporting order.
pub fn rules_for(step: WizardStep) -> &'static [FieldRule] {
    match step {
        WizardStep::Taxpayer => TAXPAYER_RULES,
        WizardStep::Business => BUSINESS_RULES,
        WizardStep::Requirements => &[],
        WizardStep::Summary => SUMMARY_RULES,
    }
}

/// Evaluate every rule of `step` against `record`.
///
/// All rules run; a field keeps only the message of its first failing rule.
pub fn validate(step: WizardStep, record: &FormRecord) -> ValidationErrors {
    let mut errors = ValidationErrors::default();
    for field_rule in rules_for(step) {
        if errors.contains(field_rule.field) {
            continue;
        }
        if !passes(field_rule.rule, record, field_rule.field) {
            errors.push(field_rule.field, field_rule.message);
        }
    }
    errors
}

fn passes(rule: Rule, record: &FormRecord, field: &str) -> bool {
    match rule {
        Rule::Required => !record.is_blank(field),
        Rule::Accepted => record.flag(field),
        Rule::Email => {
            let value = record.text(field).trim();
            value.is_empty() || looks_like_email(value)
        }
        Rule::Digits { min, max } => {
            let value = record.text(field).trim();
            if value.is_empty() {
                return true;
            }
            let stripped: String = value
                .chars()
                .filter(|ch| !matches!(ch, '-' | ' ' | '+'))
                .collect();
            stripped.chars().all(|ch| ch.is_ascii_digit())
                && (min..=max).contains(&stripped.len())
        }
    }
}

fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

/// Single failed field with its user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Field errors in the order the step declares its rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    entries: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        if self.contains(&field) {
            return;
        }
        self.entries.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn contains(&self, field: &str) -> bool {
        self.entries.iter().any(|entry| entry.field == field)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.field == field)
            .map(|entry| entry.message.as_str())
    }

    /// Drop the entry for `field`, reporting whether one existed.
    pub fn remove(&mut self, field: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.field != field);
        before != self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn first_message(&self) -> Option<&str> {
        self.entries.first().map(|entry| entry.message.as_str())
    }

    pub fn messages(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.message.as_str())
            .collect()
    }

    pub fn fields(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.field.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.entries.iter()
    }
}
