use chrono::{Months, NaiveDate};

use super::domain::{InstallmentOption, PaymentSchedule, PaymentScheduleEntry};

/// Flat payment calendar: installment `k` falls `k` calendar months after `start`.
///
/// Each due date is offset from `start` itself, so a 31st start date lands on the last day
/// of short months without drifting in later ones.
pub fn generate(
    option: &InstallmentOption,
    start: NaiveDate,
) -> Result<PaymentSchedule, ScheduleError> {
    let entries = (1..=option.tenor.months())
        .map(|installment_number| {
            let due_date = start
                .checked_add_months(Months::new(installment_number))
                .ok_or(ScheduleError::DateOutOfRange {
                    start,
                    installment_number,
                })?;

            Ok(PaymentScheduleEntry {
                installment_number,
                due_date,
                amount: option.monthly_payment,
            })
        })
        .collect::<Result<Vec<_>, ScheduleError>>()?;

    Ok(PaymentSchedule {
        tenor: option.tenor,
        start_date: start,
        entries,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("installment {installment_number} after {start} falls outside the supported calendar")]
    DateOutOfRange {
        start: NaiveDate,
        installment_number: u32,
    },
}
