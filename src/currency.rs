//! The currencies a user can display their amounts in, and how amounts are formatted.

use std::{fmt::Display, str::FromStr, sync::OnceLock};

use numfmt::{Formatter, Precision};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::Error;

/// A supported display currency.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// US dollar.
    #[default]
    #[serde(rename = "USD")]
    Usd,
    /// Euro.
    #[serde(rename = "EUR")]
    Eur,
    /// Romanian leu.
    #[serde(rename = "RON")]
    Ron,
    /// Pound sterling.
    #[serde(rename = "GBP")]
    Gbp,
}

impl Currency {
    /// All supported currencies in the order they are offered to the user.
    pub const ALL: [Currency; 4] = [Currency::Usd, Currency::Eur, Currency::Ron, Currency::Gbp];

    /// The ISO 4217 code, e.g. "USD".
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Ron => "RON",
            Currency::Gbp => "GBP",
        }
    }

    /// The symbol shown next to amounts.
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Ron => "Lei",
            Currency::Gbp => "£",
        }
    }

    /// A label for select inputs, e.g. "USD ($)".
    pub fn label(&self) -> String {
        format!("{} ({})", self.code(), self.symbol())
    }

    /// Format `amount` with two decimal places, thousands separators and the
    /// currency symbol.
    ///
    /// The symbol is placed before the amount, except for RON where it
    /// follows the amount, e.g. "$1,234.50" and "1,234.50 Lei".
    pub fn format(&self, amount: f64) -> String {
        let sign = if amount < 0.0 { "-" } else { "" };
        let cents = (amount.abs() * 100.0).round() as u64;
        let whole = get_thousands_separator_formatter().fmt_string(cents / 100);
        let number = format!("{whole}.{:02}", cents % 100);

        match self {
            Currency::Ron => format!("{sign}{number} {}", self.symbol()),
            _ => format!("{sign}{}{number}", self.symbol()),
        }
    }
}

fn get_thousands_separator_formatter() -> &'static Formatter {
    static FORMATTER: OnceLock<Formatter> = OnceLock::new();

    FORMATTER.get_or_init(|| {
        Formatter::new()
            .separator(',')
            .expect("',' is a valid separator")
            .precision(Precision::Decimals(0))
    })
}

impl FromStr for Currency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "RON" => Ok(Currency::Ron),
            "GBP" => Ok(Currency::Gbp),
            _ => Err(Error::InvalidCurrency(s.to_owned())),
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl ToSql for Currency {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for Currency {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = value.as_str()?;

        code.parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}
