//! Localized price strings
//!
//! Conversion between the price strings scraped from retailer pages
//! (`"₹1,234"`, `"Rs. 999"`, `"INR 1,499.00"`) and comparable numbers.

/// Currency-name prefixes, longest first so `"Rs."` wins over `"Rs"`.
const CURRENCY_PREFIXES: &[&str] = &["INR", "Rs.", "Rs", "MRP"];

/// Currency symbols stripped anywhere in the string
const CURRENCY_SYMBOLS: &[char] = &['₹', '$', '€', '£'];

/// Parse a localized currency string into a number.
///
/// Returns `None` when anything but digits and a single decimal point is
/// left after stripping symbols, prefixes, grouping separators and spaces.
pub fn parse_price(raw: &str) -> Option<f64> {
    let mut text = raw.trim();

    // Prefixes may be glued to the number ("Rs.999") or separated by spaces
    loop {
        let before = text;
        text = text.trim_start_matches(CURRENCY_SYMBOLS).trim_start();
        for prefix in CURRENCY_PREFIXES {
            let matches = text
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
            if matches {
                text = text[prefix.len()..].trim_start();
                break;
            }
        }
        if text == before {
            break;
        }
    }

    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && !CURRENCY_SYMBOLS.contains(c))
        .collect();

    // Amazon's `.a-price-whole` renders "1,234." with a dangling separator
    let cleaned = cleaned.strip_suffix('.').unwrap_or(&cleaned);

    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    if cleaned.chars().filter(|c| *c == '.').count() > 1 {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Render an amount as a localized price string.
///
/// INR uses the rupee sign with Indian digit grouping (`₹1,23,456`); other
/// currencies use their symbol (or ISO code) with groups of three.
pub fn format_price(amount: f64, currency: &str) -> String {
    let rounded = (amount * 100.0).round() / 100.0;
    let whole = rounded.trunc();
    let fraction = ((rounded - whole) * 100.0).round();

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let digits = (whole.abs() as u64).to_string();

    let currency = currency.trim().to_ascii_uppercase();
    let (symbol, grouped) = match currency.as_str() {
        "" | "INR" => ("₹".to_string(), group_indian(&digits)),
        "USD" => ("$".to_string(), group_thousands(&digits)),
        "EUR" => ("€".to_string(), group_thousands(&digits)),
        "GBP" => ("£".to_string(), group_thousands(&digits)),
        other => (format!("{other} "), group_thousands(&digits)),
    };

    if fraction > 0.0 {
        format!("{symbol}{grouped}.{fraction:02}")
    } else {
        format!("{symbol}{grouped}")
    }
}

/// Normalize a scraped price candidate.
///
/// Strings that already show a currency are kept (whitespace collapsed);
/// bare numbers are rendered with `format_price`. Non-positive or
/// unparsable candidates yield `None`.
pub fn localize_price(raw: &str, currency: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let value = parse_price(&collapsed).filter(|v| *v > 0.0)?;
    let bare = collapsed
        .chars()
        .all(|c| c.is_ascii_digit() || c == ',' || c == '.' || c == ' ');
    if bare {
        Some(format_price(value, currency))
    } else {
        Some(collapsed)
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, last_three) = digits.split_at(digits.len() - 3);
    let mut out = String::new();
    for (i, ch) in head.chars().enumerate() {
        if i > 0 && (head.len() - i) % 2 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.push(',');
    out.push_str(last_three);
    out
}
