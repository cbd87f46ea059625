//! Render-ready projections of the workflow. Monetary rounding happens here and nowhere else.

use chrono::NaiveDate;
use rust_decimal::RoundingStrategy;
use serde::Serialize;

use super::analysis::AnalysisState;
use super::domain::{ApplicationId, DecisionReady, InstallmentOption, Money, PaymentSchedule, Rate};
use super::machine::{ApprovalState, ApprovalStateMachine};

/// Two decimal places, halves rounded away from zero. Always carries scale 2.
pub fn round_money(amount: Money) -> Money {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Brazilian real formatting: `R$ 1.234,56`.
pub fn format_brl(amount: Money) -> String {
    let rounded = round_money(amount);
    let digits = rounded.abs().to_string();
    let (whole, cents) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}R$ {grouped},{cents}")
}

pub fn format_due_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallmentOptionView {
    pub tenor_months: u32,
    pub interest_rate: Rate,
    pub monthly_payment: Money,
    pub total_with_interest: Money,
    pub label: String,
}

impl From<&InstallmentOption> for InstallmentOptionView {
    fn from(option: &InstallmentOption) -> Self {
        Self {
            tenor_months: option.tenor.months(),
            interest_rate: option.rate,
            monthly_payment: round_money(option.monthly_payment),
            total_with_interest: round_money(option.total_with_interest),
            label: option_label(option),
        }
    }
}

fn option_label(option: &InstallmentOption) -> String {
    format!(
        "{}x de {}",
        option.tenor.months(),
        format_brl(option.monthly_payment)
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionView {
    pub application_id: ApplicationId,
    pub applicant_first_name: String,
    pub approved_amount: Money,
    pub approved_amount_label: String,
    pub options: Vec<InstallmentOptionView>,
}

impl From<&DecisionReady> for DecisionView {
    fn from(ready: &DecisionReady) -> Self {
        let approved = ready.decision.approved_amount();
        Self {
            application_id: ready.application.id.clone(),
            applicant_first_name: ready.application.first_name().to_string(),
            approved_amount: round_money(approved),
            approved_amount_label: format_brl(approved),
            options: ready.options.iter().map(InstallmentOptionView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleEntryView {
    pub installment_number: u32,
    pub due_date: String,
    pub amount: Money,
    pub amount_label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleView {
    pub tenor_months: u32,
    pub entries: Vec<ScheduleEntryView>,
}

impl From<&PaymentSchedule> for ScheduleView {
    fn from(schedule: &PaymentSchedule) -> Self {
        Self {
            tenor_months: schedule.tenor.months(),
            entries: schedule
                .entries
                .iter()
                .map(|entry| ScheduleEntryView {
                    installment_number: entry.installment_number,
                    due_date: format_due_date(entry.due_date),
                    amount: round_money(entry.amount),
                    amount_label: format_brl(entry.amount),
                })
                .collect(),
        }
    }
}

/// Everything the approval screen needs in one payload.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub analysis_state: AnalysisState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_state: Option<ApprovalState>,
    pub submitting: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<DecisionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_tenor: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleView>,
    pub can_select: bool,
    pub can_confirm: bool,
    pub confirm_label: String,
}

impl SessionView {
    pub fn new(
        analysis_state: AnalysisState,
        machine: Option<&ApprovalStateMachine>,
        store_loading: bool,
    ) -> Self {
        let approval_state = machine.map(ApprovalStateMachine::state);
        let selection = machine.and_then(ApprovalStateMachine::selection);
        let submitting = store_loading || approval_state == Some(ApprovalState::Submitting);
        let open = matches!(
            approval_state,
            Some(ApprovalState::NoSelection | ApprovalState::Selected)
        );

        let confirm_label = match selection {
            _ if submitting => "Atualizando...".to_string(),
            Some(selection) => format!("Continuar com {}", option_label(&selection.option)),
            None => "Selecione o número de parcelas".to_string(),
        };

        Self {
            analysis_state,
            approval_state,
            submitting,
            decision: machine.map(|machine| DecisionView::from(machine.decision())),
            selected_tenor: selection.map(|selection| selection.option.tenor.months()),
            schedule: selection.map(|selection| ScheduleView::from(&selection.schedule)),
            can_select: open && !submitting,
            can_confirm: open && !submitting && selection.is_some(),
            confirm_label,
        }
    }
}
