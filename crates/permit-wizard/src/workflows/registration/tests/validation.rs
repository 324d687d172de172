use super::common::*;
use crate::workflows::registration::domain::{fields, FieldValue, FormRecord};
use crate::workflows::registration::steps::{Transition, WizardStep};
use crate::workflows::registration::validation::{rules_for, validate};

fn record_with(entries: Vec<(&'static str, FieldValue)>) -> FormRecord {
    let mut record = FormRecord::new();
    for (name, value) in entries {
        record.insert(name, value);
    }
    record
}

#[test]
fn missing_birthdate_blocks_the_taxpayer_step() {
    let mut session = create_session();
    let entries = taxpayer_fields()
        .into_iter()
        .filter(|(name, _)| *name != fields::BIRTHDATE)
        .collect();
    fill(&mut session, entries);

    match session.next() {
        Transition::Refused(errors) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors.fields(), vec![fields::BIRTHDATE]);
        }
        other => panic!("expected refusal, got {other:?}"),
    }
    assert_eq!(session.current_step(), WizardStep::Taxpayer);
    assert!(session.errors().contains(fields::BIRTHDATE));
}

#[test]
fn empty_taxpayer_step_reports_every_field_in_declaration_order() {
    let errors = validate(WizardStep::Taxpayer, &FormRecord::new());

    assert_eq!(
        errors.fields(),
        vec![
            fields::LAST_NAME,
            fields::FIRST_NAME,
            fields::BIRTHDATE,
            fields::GENDER,
            fields::CIVIL_STATUS,
            fields::TIN,
            fields::EMAIL,
            fields::MOBILE_NUMBER,
        ]
    );
    assert_eq!(errors.first_message(), Some("Last name is required"));
}

#[test]
fn format_rules_only_fire_on_filled_fields() {
    let mut entries = taxpayer_fields();
    entries.retain(|(name, _)| *name != fields::EMAIL && *name != fields::TIN);
    entries.push((fields::EMAIL, FieldValue::text("juan@localhost")));
    entries.push((fields::TIN, FieldValue::text("12-34")));
    let errors = validate(WizardStep::Taxpayer, &record_with(entries));

    assert_eq!(errors.get(fields::EMAIL), Some("Email address is invalid"));
    assert_eq!(errors.get(fields::TIN), Some("TIN must contain 9 to 12 digits"));
    assert_eq!(errors.len(), 2);
}

#[test]
fn whitespace_only_text_counts_as_missing() {
    let mut entries = business_fields();
    entries.push((fields::STREET, FieldValue::text("   ")));
    let errors = validate(WizardStep::Business, &record_with(entries));

    assert_eq!(errors.fields(), vec![fields::STREET]);
}

#[test]
fn requirements_step_has_no_field_rules() {
    assert!(rules_for(WizardStep::Requirements).is_empty());
    assert!(validate(WizardStep::Requirements, &FormRecord::new()).is_empty());
}

#[test]
fn summary_step_requires_the_agreement_flag() {
    let errors = validate(WizardStep::Summary, &FormRecord::new());
    assert_eq!(errors.fields(), vec![fields::AGREED_TO_TERMS]);

    let accepted = record_with(vec![(fields::AGREED_TO_TERMS, FieldValue::Flag(true))]);
    assert!(validate(WizardStep::Summary, &accepted).is_empty());
}

#[test]
fn refused_transition_leaves_the_record_untouched() {
    let mut session = create_session();
    fill(&mut session, vec![(fields::FIRST_NAME, FieldValue::text("Juan"))]);
    let before = session.record().clone();

    assert!(matches!(session.next(), Transition::Refused(_)));
    assert_eq!(session.record(), &before);
}
