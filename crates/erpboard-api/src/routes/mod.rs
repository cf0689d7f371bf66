//! Route modules for the API server
//!
//! Every handler answers JSON except the export downloads.

pub mod export;
pub mod preferences;
pub mod purchases;
pub mod sales;
pub mod settings;
pub mod status;
pub mod tyc;

use chrono::NaiveDate;
use serde::Deserialize;

/// `?as_of=YYYY-MM-DD`, defaulting to the local date
#[derive(Debug, Default, Deserialize)]
pub struct AsOfQuery {
    pub as_of: Option<NaiveDate>,
}

impl AsOfQuery {
    pub fn today(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}
