//! Paper market data.
//!
//! Derives lended totals from the paper exchange's loan book. There are
//! no conversion rates to fetch, so totals stay in their own currency.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::{debug, warn};

use super::MarketDataService;
use crate::config::END_DATE_FORMAT;
use crate::exchange::paper::PaperExchange;
use crate::types::LendingError;

pub struct PaperMarket {
    exchange: PaperExchange,
    totals: Mutex<BTreeMap<String, Decimal>>,
}

impl PaperMarket {
    pub fn new(exchange: PaperExchange) -> Self {
        Self {
            exchange,
            totals: Mutex::new(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl MarketDataService for PaperMarket {
    async fn refresh(&self, output_currency: &str, report_extended: bool) -> Result<(), LendingError> {
        let mut totals = BTreeMap::new();
        for loan in self.exchange.loans() {
            *totals.entry(loan.currency).or_insert(Decimal::ZERO) += loan.amount;
        }
        debug!(
            output_currency,
            report_extended,
            currencies = totals.len(),
            "Paper market refreshed"
        );
        *self.totals.lock().unwrap_or_else(|e| e.into_inner()) = totals;
        Ok(())
    }

    fn current_lended_summary(&self) -> String {
        let totals = self.totals.lock().unwrap_or_else(|e| e.into_inner());
        let parts: Vec<String> = totals
            .iter()
            .map(|(currency, amount)| format!("{currency}:{:.8}", amount))
            .collect();
        format!("Lended: {}", parts.join(" "))
    }

    fn max_duration_until(&self, end_date: Option<&str>, mode: &str) -> String {
        let Some(end) = end_date else {
            return String::new();
        };
        let end = match NaiveDate::parse_from_str(end, END_DATE_FORMAT) {
            Ok(d) => d,
            Err(e) => {
                warn!(end_date = end, error = %e, "Unparseable end date");
                return String::new();
            }
        };
        let days = days_until(end, Utc::now().date_naive());
        if mode == "status" {
            format!(" - Days Remaining: {days}")
        } else {
            days.to_string()
        }
    }
}

/// Whole days from `today` until `end`, never negative.
fn days_until(end: NaiveDate, today: NaiveDate) -> i64 {
    (end - today).num_days().max(0)
}
