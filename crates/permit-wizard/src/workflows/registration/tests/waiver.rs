use super::common::*;
use crate::workflows::registration::domain::{fields, ApplicantName};
use crate::workflows::registration::waiver::{generate, ordinal_suffix, signing_date, WAIVER_TYPE};

#[test]
fn ordinal_suffixes_follow_english_rules() {
    let cases = [
        (1, "st"),
        (2, "nd"),
        (3, "rd"),
        (4, "th"),
        (11, "th"),
        (12, "th"),
        (13, "th"),
        (21, "st"),
        (22, "nd"),
        (23, "rd"),
        (30, "th"),
        (31, "st"),
    ];
    for (day, suffix) in cases {
        assert_eq!(ordinal_suffix(day), suffix, "day {day}");
    }
}

#[test]
fn waiver_embeds_name_and_signing_date() {
    let applicant = ApplicantName {
        first: " Juan ".to_string(),
        middle: String::new(),
        last: "Dela Cruz".to_string(),
        suffix: "Jr.".to_string(),
    };

    let text = generate(&applicant, signing_day());

    assert_eq!(signing_date(signing_day()), "2nd day of November, 2025");
    assert!(text.starts_with("I, Juan Dela Cruz Jr., of legal age"));
    assert!(text.ends_with("Signed this 2nd day of November, 2025."));
}

#[test]
fn agreeing_writes_every_waiver_field_at_once() {
    let mut session = session_at_summary();
    session
        .set_agreement(true, signing_day())
        .expect("agreement accepted");

    let record = session.record();
    assert!(record.flag(fields::AGREED_TO_TERMS));
    assert!(record.flag(fields::WAIVER_STATUS));
    assert!(record.flag(fields::WAIVER_AGREEMENT));
    assert_eq!(record.text(fields::WAIVER_NAME), "Juan Dela Cruz");
    assert_eq!(record.text(fields::WAIVER_TYPE), WAIVER_TYPE);
    assert!(record
        .text(fields::WAIVER_CONTENT)
        .contains("Juan Dela Cruz"));
}

#[test]
fn withdrawing_agreement_clears_the_waiver() {
    let mut session = session_at_summary();
    session
        .set_agreement(true, signing_day())
        .expect("agreement accepted");
    session
        .set_agreement(false, signing_day())
        .expect("withdrawal accepted");

    let record = session.record();
    assert!(!record.flag(fields::AGREED_TO_TERMS));
    assert!(!record.flag(fields::WAIVER_STATUS));
    assert!(!record.flag(fields::WAIVER_AGREEMENT));
    assert!(record.is_blank(fields::WAIVER_NAME));
    assert!(record.is_blank(fields::WAIVER_TYPE));
    assert!(record.is_blank(fields::WAIVER_CONTENT));
}

#[test]
fn toggling_agreement_regenerates_identical_text() {
    let mut session = session_at_summary();
    session
        .set_agreement(true, signing_day())
        .expect("agreement accepted");
    let first = session.record().text(fields::WAIVER_CONTENT).to_string();

    session
        .set_agreement(false, signing_day())
        .expect("withdrawal accepted");
    session
        .set_agreement(true, signing_day())
        .expect("agreement accepted again");

    assert_eq!(session.record().text(fields::WAIVER_CONTENT), first);
}

#[test]
fn blank_name_falls_back_to_generic_wording() {
    let text = generate(&ApplicantName::default(), signing_day());
    assert!(text.starts_with("I, the undersigned applicant, of legal age"));
}
