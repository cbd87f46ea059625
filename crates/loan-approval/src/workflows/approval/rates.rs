use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use super::domain::{Rate, Tenor};

/// Add-on interest charged for a tenor, over the whole term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateEntry {
    pub tenor: Tenor,
    pub rate: Rate,
}

/// Fixed tenor → rate lookup covering every offered tenor exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateTable {
    rates: [Rate; 4],
}

impl RateTable {
    /// The process-wide table: 3x 7%, 6x 13%, 9x 20%, 12x 30%.
    pub const fn standard() -> Self {
        Self {
            rates: [dec!(0.07), dec!(0.13), dec!(0.20), dec!(0.30)],
        }
    }

    /// Build a table from loose entries, requiring full tenor coverage and rates in (0, 1).
    pub fn new(entries: &[RateEntry]) -> Result<Self, RateTableError> {
        let mut rates: [Option<Rate>; 4] = [None; 4];

        for entry in entries {
            let slot = &mut rates[entry.tenor.index()];
            if slot.is_some() {
                return Err(RateTableError::DuplicateTenor(entry.tenor));
            }
            *slot = Some(entry.rate);
        }

        let mut resolved = [Decimal::ZERO; 4];
        for tenor in Tenor::ALL {
            resolved[tenor.index()] =
                rates[tenor.index()].ok_or(RateTableError::MissingTenor(tenor))?;
        }

        let table = Self { rates: resolved };
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<(), RateTableError> {
        for entry in self.entries() {
            if entry.rate <= Decimal::ZERO || entry.rate >= Decimal::ONE {
                return Err(RateTableError::RateOutOfRange {
                    tenor: entry.tenor,
                    rate: entry.rate,
                });
            }
        }
        Ok(())
    }

    pub fn rate(&self, tenor: Tenor) -> Rate {
        self.rates[tenor.index()]
    }

    /// Entries in ascending tenor order.
    pub fn entries(&self) -> impl Iterator<Item = RateEntry> + '_ {
        Tenor::ALL.into_iter().map(|tenor| RateEntry {
            tenor,
            rate: self.rate(tenor),
        })
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateTableError {
    #[error("rate table has no entry for the {0} plan")]
    MissingTenor(Tenor),
    #[error("rate table lists the {0} plan more than once")]
    DuplicateTenor(Tenor),
    #[error("rate {rate} for the {tenor} plan must lie strictly between 0 and 1")]
    RateOutOfRange { tenor: Tenor, rate: Rate },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(months: u32, rate: Rate) -> RateEntry {
        RateEntry {
            tenor: Tenor::from_months(months).expect("offered tenor"),
            rate,
        }
    }

    #[test]
    fn standard_table_matches_published_rates() {
        let table = RateTable::standard();
        assert!(table.validate().is_ok());
        assert_eq!(table.rate(Tenor::Three), dec!(0.07));
        assert_eq!(table.rate(Tenor::Six), dec!(0.13));
        assert_eq!(table.rate(Tenor::Nine), dec!(0.20));
        assert_eq!(table.rate(Tenor::Twelve), dec!(0.30));

        let tenors: Vec<u32> = table.entries().map(|entry| entry.tenor.months()).collect();
        assert_eq!(tenors, vec![3, 6, 9, 12]);
    }

    #[test]
    fn new_accepts_entries_in_any_order() {
        let table = RateTable::new(&[
            entry(12, dec!(0.30)),
            entry(3, dec!(0.07)),
            entry(9, dec!(0.20)),
            entry(6, dec!(0.13)),
        ])
        .expect("complete table");
        assert_eq!(table, RateTable::standard());
    }

    #[test]
    fn new_rejects_missing_tenor() {
        let result = RateTable::new(&[
            entry(3, dec!(0.07)),
            entry(6, dec!(0.13)),
            entry(12, dec!(0.30)),
        ]);
        assert_eq!(result, Err(RateTableError::MissingTenor(Tenor::Nine)));
    }

    #[test]
    fn new_rejects_duplicates_and_out_of_range_rates() {
        let duplicate = RateTable::new(&[entry(3, dec!(0.07)), entry(3, dec!(0.08))]);
        assert_eq!(duplicate, Err(RateTableError::DuplicateTenor(Tenor::Three)));

        let out_of_range = RateTable::new(&[
            entry(3, dec!(0.07)),
            entry(6, dec!(0.13)),
            entry(9, dec!(1.20)),
            entry(12, dec!(0.30)),
        ]);
        assert!(matches!(
            out_of_range,
            Err(RateTableError::RateOutOfRange {
                tenor: Tenor::Nine,
                ..
            })
        ));
    }
}
