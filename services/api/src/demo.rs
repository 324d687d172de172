use crate::infra::parse_date;
use chrono::{Local, NaiveDate};
use clap::Args;
use permit_wizard::config::WizardConfig;
use permit_wizard::error::AppError;
use permit_wizard::workflows::registration::{
    AdvanceOutcome, AttachedFile, FieldValue, InMemoryBusinessRegistry, SubmissionCoordinator,
    SubmissionReceipt, WizardMode, WizardSession,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Date the applicant signs the declaration (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Business name used for the sample filing.
    #[arg(long)]
    pub(crate) business_name: Option<String>,
    /// Stop after the initial registration instead of amending it.
    #[arg(long)]
    pub(crate) skip_amendment: bool,
}

const APPLICANT: [(&str, &str); 8] = [
    ("firstName", "Juan"),
    ("lastName", "Dela Cruz"),
    ("birthdate", "1985-04-12"),
    ("gender", "Male"),
    ("civilStatus", "Married"),
    ("tin", "123-456-789-000"),
    ("email", "juan.delacruz@example.ph"),
    ("mobileNumber", "09171234567"),
];

const ESTABLISHMENT: [(&str, &str); 6] = [
    ("ownershipType", "Sole Proprietorship"),
    ("lineOfBusiness", "Retail"),
    ("province", "Laguna"),
    ("city", "Calamba"),
    ("barangay", "Real"),
    ("street", "Rizal St."),
];

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        as_of,
        business_name,
        skip_amendment,
    } = args;
    let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());
    let business_name = business_name.unwrap_or_else(|| "Dela Cruz Sari-Sari Store".to_string());

    let config = WizardConfig {
        user_id: Some("demo-clerk".to_string()),
        ..WizardConfig::default()
    };
    let registry = Arc::new(InMemoryBusinessRegistry::default());
    let coordinator = SubmissionCoordinator::new(registry.clone());

    println!("Business permit registration demo");
    let mut session = WizardSession::init(WizardMode::Create, config.clone());

    println!("\nStep 1: {}", session.current_step().label());
    let refused = coordinator.advance(&mut session).await?;
    if let AdvanceOutcome::Refused(errors) = &refused {
        println!("- Empty form refused with {} errors", errors.len());
        for message in errors.messages().into_iter().take(3) {
            println!("  - {message}");
        }
    }
    for (name, value) in APPLICANT {
        session.update_field(name, FieldValue::text(value))?;
    }
    report(&coordinator.advance(&mut session).await?);

    session.update_field("businessName", FieldValue::text(business_name.as_str()))?;
    for (name, value) in ESTABLISHMENT {
        session.update_field(name, FieldValue::text(value))?;
    }
    report(&coordinator.advance(&mut session).await?);

    let requirement = session.add_requirement(
        "DTI Certificate",
        "Certificate of business name registration",
        Some(AttachedFile::from_bytes(
            "dti-certificate.pdf",
            b"%PDF-1.4 demo certificate".to_vec(),
        )),
    )?;
    println!(
        "- Attached dti-certificate.pdf to requirement {} ({} requirements listed)",
        requirement,
        session.stager().requirements().len()
    );
    report(&coordinator.advance(&mut session).await?);

    session.set_agreement(true, as_of)?;
    println!("- Declaration accepted:");
    println!("  \"{}\"", session.record().text("content"));

    let receipt = match coordinator.advance(&mut session).await? {
        AdvanceOutcome::Submitted(receipt) => receipt,
        other => {
            report(&other);
            return Ok(());
        }
    };
    print_receipt(&receipt, &registry);

    if skip_amendment {
        return Ok(());
    }

    println!("\nAmending {}", receipt.business_id);
    let mut amendment = WizardSession::init(WizardMode::Edit(receipt.business_id.clone()), config);
    coordinator.hydrate(&mut amendment).await?;
    println!(
        "- Loaded '{}' with {} requirement(s) on file",
        amendment.record().text("businessName"),
        amendment.stager().requirements().len()
    );
    amendment.update_field("tradeName", FieldValue::text("Juan's Store"))?;
    amendment.set_agreement(true, as_of)?;
    let amended = coordinator.submit(&mut amendment).await?;
    print_receipt(&amended, &registry);

    Ok(())
}

fn report(outcome: &AdvanceOutcome) {
    match outcome {
        AdvanceOutcome::Moved(step) => {
            println!("\nStep {}: {}", step.index(), step.label())
        }
        AdvanceOutcome::Refused(errors) => println!(
            "- Refused: {}",
            errors.first_message().unwrap_or("validation failed")
        ),
        AdvanceOutcome::Submitted(receipt) => {
            println!("- Submitted as {}", receipt.business_id)
        }
    }
}

fn print_receipt(receipt: &SubmissionReceipt, registry: &InMemoryBusinessRegistry) {
    println!(
        "- Registry accepted {} ({})",
        receipt.business_id,
        receipt.mode.label()
    );
    let Some(stored) = registry.get(&receipt.business_id) else {
        println!("  Registry lookup returned no record");
        return;
    };
    for document in &stored.documents {
        println!(
            "  - document {} status={} path={}",
            document.filename,
            document.status,
            document.path.as_deref().unwrap_or("(inline upload)")
        );
    }
    match serde_json::to_string(&stored.fields) {
        Ok(json) => println!("  Stored {} fields ({} bytes)", stored.fields.len(), json.len()),
        Err(err) => println!("  Stored fields unavailable: {}", err),
    }
}
