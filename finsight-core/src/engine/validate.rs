//! Input validation. Runs before any computation so a bad series never
//! produces partial output.

use super::error::{EngineError, InputDefect};
use crate::domain::{PriceBar, Ticker};

/// Check that every bar belongs to `ticker`, has a positive finite close, and
/// that dates are strictly increasing.
pub fn validate_series(ticker: &Ticker, bars: &[PriceBar]) -> Result<(), EngineError> {
    let fail = |defect| EngineError::InvalidInput {
        ticker: ticker.clone(),
        defect,
    };

    for (index, bar) in bars.iter().enumerate() {
        if &bar.ticker != ticker {
            return Err(fail(InputDefect::ForeignTicker {
                date: bar.date,
                found: bar.ticker.clone(),
            }));
        }
        if !bar.close.is_finite() {
            return Err(fail(InputDefect::NonFiniteClose {
                date: bar.date,
                close: bar.close,
            }));
        }
        if bar.close <= 0.0 {
            return Err(fail(InputDefect::NonPositiveClose {
                date: bar.date,
                close: bar.close,
            }));
        }
        if index > 0 {
            let previous = bars[index - 1].date;
            if bar.date == previous {
                return Err(fail(InputDefect::DuplicateDate {
                    index,
                    date: bar.date,
                }));
            }
            if bar.date < previous {
                return Err(fail(InputDefect::OutOfOrder {
                    index,
                    previous,
                    date: bar.date,
                }));
            }
        }
    }
    Ok(())
}
