//! Human-readable number formatting

use erpboard_config::{CurrencyConfig, SymbolPosition};
use rust_decimal::Decimal;

/// Group the digits of an integer string in threes
pub fn group_thousands(digits: &str, separator: &str) -> String {
    let mut result = String::new();
    let mut count = 0;
    for c in digits.chars().rev() {
        if count == 3 {
            result.push_str(&separator.chars().rev().collect::<String>());
            count = 0;
        }
        result.push(c);
        count += 1;
    }
    result.chars().rev().collect()
}

/// Format an amount with the configured separators, decimals and symbol,
/// e.g. `1.234,50 EUR`
pub fn format_money(amount: Decimal, currency: &CurrencyConfig) -> String {
    let number = format_decimal(amount, currency);
    match currency.symbol_position {
        SymbolPosition::Before => format!("{} {}", currency.default_currency, number),
        SymbolPosition::After => format!("{} {}", number, currency.default_currency),
    }
}

/// Format an amount with separators but no currency symbol
pub fn format_decimal(amount: Decimal, currency: &CurrencyConfig) -> String {
    let rounded = amount.round_dp(currency.decimal_places);
    let text = format!("{:.*}", currency.decimal_places as usize, rounded.abs());
    let (integer, fraction) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut out = String::new();
    if rounded.is_sign_negative() && !rounded.is_zero() {
        out.push('-');
    }
    out.push_str(&group_thousands(integer, &currency.thousands_separator));
    if let Some(fraction) = fraction {
        out.push_str(&currency.decimal_separator);
        out.push_str(fraction);
    }
    out
}

/// Percentage with one decimal, or `-`
pub fn format_pct(value: Option<f64>) -> String {
    match value {
        Some(pct) => format!("{:.1}%", pct),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("1234567", ","), "1,234,567");
        assert_eq!(group_thousands("123", "."), "123");
        assert_eq!(group_thousands("", "."), "");
    }

    #[test]
    fn test_format_money_default_currency() {
        let currency = CurrencyConfig::default();
        assert_eq!(format_money(Decimal::new(123450, 2), &currency), "1.234,50 EUR");
        assert_eq!(format_money(Decimal::new(-5, 1), &currency), "-0,50 EUR");
        assert_eq!(format_money(Decimal::ZERO, &currency), "0,00 EUR");
    }

    #[test]
    fn test_format_money_symbol_before() {
        let currency = CurrencyConfig {
            default_currency: "USD".to_string(),
            decimal_places: 0,
            thousands_separator: ",".to_string(),
            decimal_separator: ".".to_string(),
            symbol_position: SymbolPosition::Before,
        };
        assert_eq!(format_money(Decimal::new(1234567, 0), &currency), "USD 1,234,567");
    }

    #[test]
    fn test_format_pct() {
        assert_eq!(format_pct(Some(33.333)), "33.3%");
        assert_eq!(format_pct(None), "-");
    }
}
