use rust_decimal::Decimal;

use super::domain::{InstallmentOption, Money, Tenor};
use super::rates::RateTable;

/// Derives the selectable installment plans from an approved amount.
///
/// Every option is computed straight from the approved amount; options are rebuilt, never
/// adjusted, when that amount changes.
#[derive(Debug, Clone, Default)]
pub struct InstallmentPlanGenerator {
    rates: RateTable,
}

impl InstallmentPlanGenerator {
    pub fn new(rates: RateTable) -> Self {
        Self { rates }
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    /// One option per offered tenor, ascending.
    pub fn generate(&self, approved_amount: Money) -> Vec<InstallmentOption> {
        Tenor::ALL
            .into_iter()
            .map(|tenor| self.option(approved_amount, tenor))
            .collect()
    }

    pub fn option(&self, approved_amount: Money, tenor: Tenor) -> InstallmentOption {
        let rate = self.rates.rate(tenor);
        let total_with_interest = total_with_interest(approved_amount, rate);
        let monthly_payment = total_with_interest / Decimal::from(tenor.months());

        InstallmentOption {
            tenor,
            rate,
            total_with_interest,
            monthly_payment,
        }
    }
}

/// Simple add-on interest over the whole term.
pub fn total_with_interest(approved_amount: Money, rate: Decimal) -> Money {
    approved_amount * (Decimal::ONE + rate)
}
