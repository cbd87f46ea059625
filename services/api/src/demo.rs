use crate::infra::{next_application_id, InMemoryApplicationStore};
use chrono::{Local, NaiveDate};
use clap::Args;
use loan_approval::error::AppError;
use loan_approval::workflows::approval::views::{format_brl, format_due_date};
use loan_approval::workflows::approval::{
    AnalysisProgress, ApprovalError, ApprovalService, ConfirmedApproval, DecisionReady,
    LoanApplication, Money, RateTable, Selection, Tenor, ANALYSIS_DELAY,
};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Amount the applicant asked for in the simulation step
    #[arg(long)]
    pub(crate) requested_amount: Money,
    /// Applicant's full name
    #[arg(long)]
    pub(crate) applicant_name: String,
    /// Installment plan to choose (3, 6, 9 or 12 months)
    #[arg(long, default_value_t = 3)]
    pub(crate) tenor: u32,
    /// Date the payment schedule starts from (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) start_date: Option<NaiveDate>,
    /// Make the first submission fail to show the retry path.
    #[arg(long)]
    pub(crate) fail_submission: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        requested_amount,
        applicant_name,
        tenor,
        start_date,
        fail_submission,
    } = args;

    let tenor = Tenor::try_from(tenor).map_err(ApprovalError::from)?;
    let start_date = start_date.unwrap_or_else(|| Local::now().date_naive());

    let store = Arc::new(InMemoryApplicationStore::default());
    store.open(LoanApplication {
        id: next_application_id(),
        requested_amount,
        applicant_name,
    });
    let service = ApprovalService::new(store.clone(), RateTable::standard())?;

    println!(
        "Analisando sua solicitação ({}s)...",
        ANALYSIS_DELAY.as_secs()
    );
    let ready = match service.analyze().await? {
        AnalysisProgress::Decisioned(ready) => ready,
        AnalysisProgress::WaitingForApplication | AnalysisProgress::Cancelled => {
            println!("Analysis did not finish; nothing to approve.");
            return Ok(());
        }
    };
    render_decision(&ready);

    let selection = service.select_tenor(tenor, start_date)?;
    render_selection(&selection);

    if fail_submission {
        store.reject_updates(true);
        match service.confirm().await {
            Err(err) if err.is_retryable() => {
                println!("\nSubmission failed: {err}. Retrying...");
            }
            Err(err) => return Err(err.into()),
            Ok(confirmed) => {
                render_confirmation(&confirmed);
                return Ok(());
            }
        }
        store.reject_updates(false);
    }

    let confirmed = service.confirm().await?;
    render_confirmation(&confirmed);
    Ok(())
}

fn render_decision(ready: &DecisionReady) {
    println!(
        "\n{}, você tem {} aprovados!",
        ready.application.first_name(),
        format_brl(ready.decision.approved_amount())
    );
    println!("Installment plans:");
    for option in &ready.options {
        println!(
            "  - {}x de {} (rate {}%, total {})",
            option.tenor.months(),
            format_brl(option.monthly_payment),
            (option.rate * Money::ONE_HUNDRED).normalize(),
            format_brl(option.total_with_interest)
        );
    }
}

fn render_selection(selection: &Selection) {
    println!("\nPayment schedule for {}:", selection.option.tenor);
    for entry in &selection.schedule.entries {
        println!(
            "  {:>2}. {}  {}",
            entry.installment_number,
            format_due_date(entry.due_date),
            format_brl(entry.amount)
        );
    }
}

fn render_confirmation(confirmed: &ConfirmedApproval) {
    let submission = &confirmed.submission;
    println!(
        "\nApplication {} approved: {} in {} of {}. Next stage: {:?}.",
        confirmed.application_id,
        format_brl(submission.approved_amount),
        submission.selected_tenor,
        format_brl(submission.monthly_payment),
        confirmed.next_stage
    );
}
