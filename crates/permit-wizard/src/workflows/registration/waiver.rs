use chrono::{Datelike, NaiveDate};

use super::domain::{fields, ApplicantName, FieldValue};

pub const WAIVER_TYPE: &str = "BUSINESS_PERMIT_DECLARATION";

const UNNAMED_APPLICANT: &str = "the undersigned applicant";

pub fn ordinal_suffix(day: u32) -> &'static str {
    if (11..=13).contains(&(day % 100)) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// "2nd day of November, 2025"
pub fn signing_date(as_of: NaiveDate) -> String {
    let day = as_of.day();
    format!(
        "{day}{} day of {}",
        ordinal_suffix(day),
        as_of.format("%B, %Y")
    )
}

/// Build the declaration text the applicant agrees to.
pub fn generate(applicant: &ApplicantName, as_of: NaiveDate) -> String {
    let full_name = applicant.full_name();
    let name = if full_name.is_empty() {
        UNNAMED_APPLICANT
    } else {
        full_name.as_str()
    };

    format!(
        "I, {name}, of legal age, hereby declare under oath that all information stated in \
         this application for a business permit, including the documents attached to it, is \
         true and correct to the best of my knowledge. I understand that any false statement or \
         misrepresentation is a ground for the denial or revocation of the permit and for the \
         filing of the appropriate charges. I agree to comply with all national laws and local \
         ordinances governing the operation of my business, and I authorize the licensing \
         office to verify the submitted records with the issuing agencies. Signed this {}.",
        signing_date(as_of)
    )
}

/// Fields written together when the applicant agrees to the declaration.
pub fn agreement_patch(applicant: &ApplicantName, as_of: NaiveDate) -> Vec<(&'static str, FieldValue)> {
    vec![
        (fields::AGREED_TO_TERMS, FieldValue::Flag(true)),
        (fields::WAIVER_STATUS, FieldValue::Flag(true)),
        (fields::WAIVER_NAME, FieldValue::Text(applicant.full_name())),
        (fields::WAIVER_TYPE, FieldValue::text(WAIVER_TYPE)),
        (
            fields::WAIVER_CONTENT,
            FieldValue::Text(generate(applicant, as_of)),
        ),
        (fields::WAIVER_AGREEMENT, FieldValue::Flag(true)),
    ]
}

/// Fields written together when the agreement is withdrawn.
pub fn revocation_patch() -> Vec<(&'static str, FieldValue)> {
    vec![
        (fields::AGREED_TO_TERMS, FieldValue::Flag(false)),
        (fields::WAIVER_STATUS, FieldValue::Flag(false)),
        (fields::WAIVER_NAME, FieldValue::text("")),
        (fields::WAIVER_TYPE, FieldValue::text("")),
        (fields::WAIVER_CONTENT, FieldValue::text("")),
        (fields::WAIVER_AGREEMENT, FieldValue::Flag(false)),
    ]
}
