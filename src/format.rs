//! Display formatting for amounts, card numbers and dates

use chrono::{DateTime, NaiveDate, Utc};

/// Symbols the backend may send instead of an ISO code
const SYMBOL_CODES: &[(&str, &str)] = &[
    ("$", "USD"),
    ("€", "EUR"),
    ("£", "GBP"),
    ("¥", "JPY"),
    ("₺", "TRY"),
    ("₹", "INR"),
    ("R$", "BRL"),
    ("₽", "RUB"),
    ("₩", "KRW"),
    ("Fr", "CHF"),
    ("C$", "CAD"),
    ("A$", "AUD"),
    ("¥CN", "CNY"),
    ("kr", "SEK"),
    ("zł", "PLN"),
    ("₪", "ILS"),
    ("$MX", "MXN"),
    ("R", "ZAR"),
    ("฿", "THB"),
    ("₫", "VND"),
];

/// Display symbol per ISO code
const CODE_SYMBOLS: &[(&str, &str)] = &[
    ("USD", "$"),
    ("EUR", "€"),
    ("GBP", "£"),
    ("JPY", "¥"),
    ("TRY", "₺"),
    ("INR", "₹"),
    ("BRL", "R$"),
    ("RUB", "₽"),
    ("KRW", "₩"),
    ("CAD", "CA$"),
    ("AUD", "A$"),
    ("CNY", "CN¥"),
    ("ILS", "₪"),
    ("MXN", "MX$"),
    ("VND", "₫"),
];

/// Normalize a symbol or code to an ISO code
pub fn currency_code(currency: &str) -> &str {
    let currency = currency.trim();
    SYMBOL_CODES
        .iter()
        .find(|(symbol, _)| *symbol == currency)
        .map(|(_, code)| *code)
        .unwrap_or(currency)
}

/// `$1,234.56`; codes without a known symbol render as `SAR 1,234.56`
pub fn format_currency(amount: f64, currency: &str) -> String {
    let code = currency_code(currency);
    let sign = if amount < 0.0 { "-" } else { "" };
    let number = group_thousands(amount.abs());

    match CODE_SYMBOLS.iter().find(|(c, _)| *c == code) {
        Some((_, symbol)) => format!("{}{}{}", sign, symbol, number),
        None => format!("{}{} {}", sign, code, number),
    }
}

fn group_thousands(value: f64) -> String {
    let fixed = format!("{:.2}", value);
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let digits = int_part.as_bytes();
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*digit as char);
    }
    format!("{}.{}", grouped, frac_part)
}

fn digits_only(card_number: &str) -> String {
    card_number.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn group_by_four(digits: &str) -> String {
    digits
        .as_bytes()
        .chunks(4)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `4111111111111111` -> `4111 1111 1111 1111`
pub fn format_card_number(card_number: &str) -> String {
    group_by_four(&digits_only(card_number))
}

/// Full numbers (16+ digits) are grouped as-is since the backend already
/// masks them; shorter ones keep the first 8 digits and pad with at least
/// four `*`.
pub fn mask_card_number(card_number: &str) -> String {
    let digits = digits_only(card_number);
    if digits.is_empty() {
        return String::new();
    }
    if digits.len() >= 16 {
        return group_by_four(&digits);
    }
    let visible: String = digits.chars().take(8).collect();
    let hidden = digits.len().saturating_sub(8).max(4);
    format!("{}{}", visible, "*".repeat(hidden))
}

const INTERVALS: &[(&str, i64)] = &[
    ("year", 31_536_000),
    ("month", 2_592_000),
    ("week", 604_800),
    ("day", 86_400),
    ("hour", 3_600),
    ("minute", 60),
    ("second", 1),
];

/// "just now", "3 minutes ago", "in 2 days"
pub fn format_relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(then).num_seconds();

    for (unit, seconds) in INTERVALS {
        let count = diff.abs() / seconds;
        if count > 0 {
            let plural = if count == 1 { "" } else { "s" };
            return if diff < 0 {
                format!("in {} {}{}", count, unit, plural)
            } else {
                format!("{} {}{} ago", count, unit, plural)
            };
        }
    }
    "just now".to_string()
}

/// Parse the date shapes the API sends: RFC 3339 or `YYYY-MM-DD`
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// `Jan 15, 2024`; unparseable input is returned unchanged
pub fn format_date(value: &str) -> String {
    match parse_date(value) {
        Some(dt) => dt.format("%b %d, %Y").to_string(),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(1234.5, "USD"), "$1,234.50");
        assert_eq!(format_currency(1234567.891, "$"), "$1,234,567.89");
        assert_eq!(format_currency(-42.0, "€"), "-€42.00");
        assert_eq!(format_currency(0.0, "₺"), "₺0.00");
        assert_eq!(format_currency(999.999, "GBP"), "£1,000.00");
        assert_eq!(format_currency(1500.0, "SAR"), "SAR 1,500.00");
    }

    #[test]
    fn test_currency_code() {
        assert_eq!(currency_code("₺"), "TRY");
        assert_eq!(currency_code("R$"), "BRL");
        assert_eq!(currency_code("EUR"), "EUR");
    }

    #[test]
    fn test_card_numbers() {
        assert_eq!(format_card_number("4111-1111-1111-1111"), "4111 1111 1111 1111");
        assert_eq!(format_card_number("41111"), "4111 1");
        assert_eq!(mask_card_number("5495 7381 3759 3590"), "5495 7381 3759 3590");
        assert_eq!(mask_card_number("5495738137"), "54957381****");
        assert_eq!(mask_card_number("549573813759"), "54957381****");
        assert_eq!(mask_card_number("54957381375912"), "54957381******");
        assert_eq!(mask_card_number(""), "");
    }

    #[test]
    fn test_relative_time() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(format_relative_time(now, now), "just now");
        assert_eq!(format_relative_time(now - Duration::seconds(1), now), "1 second ago");
        assert_eq!(format_relative_time(now - Duration::minutes(5), now), "5 minutes ago");
        assert_eq!(format_relative_time(now - Duration::days(8), now), "1 week ago");
        assert_eq!(format_relative_time(now + Duration::hours(2), now), "in 2 hours");
        assert_eq!(format_relative_time(now - Duration::days(800), now), "2 years ago");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2024-01-15"), "Jan 15, 2024");
        assert_eq!(format_date("2024-03-02T10:30:00Z"), "Mar 02, 2024");
        assert_eq!(format_date("yesterday"), "yesterday");
    }
}
