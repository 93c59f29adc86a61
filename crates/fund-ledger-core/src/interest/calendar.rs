use chrono::{Datelike, NaiveDate};

use crate::config::CompoundingConvention;
use crate::error::FundLedgerError;
use crate::FundResult;

/// First compounding boundary strictly after `date`.
///
/// Annual boundaries fall on 1 January; quarterly boundaries on the first day
/// of January, April, July and October.
pub fn next_boundary(date: NaiveDate, convention: CompoundingConvention) -> FundResult<NaiveDate> {
    let (year, month) = match convention {
        CompoundingConvention::Annual => (date.year() + 1, 1),
        CompoundingConvention::Quarterly => {
            let next_quarter_month = (date.month0() / 3) * 3 + 4;
            if next_quarter_month > 12 {
                (date.year() + 1, 1)
            } else {
                (date.year(), next_quarter_month)
            }
        }
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| FundLedgerError::DateError(format!("No compounding boundary after {date}")))
}

/// Whole days from `from` to `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_annual_boundary() {
        let conv = CompoundingConvention::Annual;
        assert_eq!(next_boundary(d(2025, 1, 1), conv).unwrap(), d(2026, 1, 1));
        assert_eq!(next_boundary(d(2025, 12, 31), conv).unwrap(), d(2026, 1, 1));
    }

    #[test]
    fn test_quarterly_boundary() {
        let conv = CompoundingConvention::Quarterly;
        assert_eq!(next_boundary(d(2025, 1, 1), conv).unwrap(), d(2025, 4, 1));
        assert_eq!(next_boundary(d(2025, 3, 31), conv).unwrap(), d(2025, 4, 1));
        assert_eq!(next_boundary(d(2025, 4, 1), conv).unwrap(), d(2025, 7, 1));
        assert_eq!(next_boundary(d(2025, 8, 15), conv).unwrap(), d(2025, 10, 1));
        assert_eq!(next_boundary(d(2025, 11, 30), conv).unwrap(), d(2026, 1, 1));
    }

    #[test]
    fn test_days_between_leap_year() {
        assert_eq!(days_between(d(2024, 1, 1), d(2025, 1, 1)), 366);
        assert_eq!(days_between(d(2025, 1, 1), d(2026, 1, 1)), 365);
        assert_eq!(days_between(d(2025, 1, 1), d(2025, 1, 1)), 0);
    }
}
