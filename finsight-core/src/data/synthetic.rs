//! Deterministic synthetic prices for development and demos.

use super::provider::{PriceSource, SourceError};
use crate::domain::{PriceBar, Ticker};
use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random-walk closes on weekdays between `start` and `end` inclusive.
///
/// The walk is seeded from the ticker, so the same ticker always produces the
/// same series and different tickers produce different ones.
#[derive(Debug, Clone)]
pub struct SyntheticPriceSource {
    start: NaiveDate,
    end: NaiveDate,
}

impl SyntheticPriceSource {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn generate(&self, ticker: &Ticker) -> Vec<PriceBar> {
        // Deterministic seed from ticker name
        let seed: [u8; 32] = *blake3::hash(ticker.as_str().as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);

        let mut bars = Vec::new();
        let mut price = 100.0_f64;
        let mut current = self.start;

        while current <= self.end {
            let weekday = current.weekday();
            if weekday != chrono::Weekday::Sat && weekday != chrono::Weekday::Sun {
                let daily_return: f64 = rng.gen_range(-0.03..0.03);
                price *= 1.0 + daily_return;
                bars.push(PriceBar::new(ticker.clone(), current, price));
            }
            let Some(next) = current.succ_opt() else {
                break;
            };
            current = next;
        }

        bars
    }
}

impl PriceSource for SyntheticPriceSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, ticker: &Ticker) -> Result<Vec<PriceBar>, SourceError> {
        Ok(self.generate(ticker))
    }
}
