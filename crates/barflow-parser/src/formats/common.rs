use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::CleanError;

/// Static corrections for glass names that arrive misspelled in the raw
/// inventory exports. No correction target may itself appear as a source.
pub const GLASS_NAME_CORRECTIONS: &[(&str, &str)] = &[("COPER_MUG", "COPPER_MUG")];

static LEADING_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+)").expect("valid stock regex"));

static DAY_FIRST_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{2})-([0-9]{2})-([0-9]{4}) ([0-9]{2}:[0-9]{2})$")
        .expect("valid timestamp regex")
});

/// Stock counts sometimes carry junk after the number ("34abc"). The leading
/// digit run wins; otherwise the whole cell must parse as an integer.
pub fn clean_stock(cell: Option<&str>) -> Result<i64, CleanError> {
    let Some(raw) = cell else {
        return Err(CleanError::Stock(None));
    };

    if let Some(digits) = LEADING_DIGITS.captures(raw).and_then(|c| c.get(1)) {
        return digits
            .as_str()
            .parse::<i64>()
            .map_err(|_| CleanError::Stock(Some(raw.to_string())));
    }

    raw.trim()
        .parse::<i64>()
        .map_err(|_| CleanError::Stock(Some(raw.to_string())))
}

pub fn clean_glass_name(name: &str) -> String {
    GLASS_NAME_CORRECTIONS
        .iter()
        .find(|(wrong, _)| *wrong == name)
        .map(|(_, right)| (*right).to_string())
        .unwrap_or_else(|| name.to_string())
}

pub fn clean_name(value: &str) -> String {
    value.to_uppercase().replace(' ', "_")
}

/// Rewrites `DD-MM-YYYY HH:MM` to `YYYY-MM-DD HH:MM:00`; anything else is kept
/// verbatim. The offset is appended in both cases.
pub fn clean_timestamp(value: &str, utc_offset: &str) -> String {
    match DAY_FIRST_TIMESTAMP.captures(value) {
        Some(caps) => format!(
            "{}-{}-{} {}:00{}",
            &caps[3], &caps[2], &caps[1], &caps[4], utc_offset
        ),
        None => format!("{value}{utc_offset}"),
    }
}

pub fn clean_value(cell: Option<&str>) -> Result<f64, CleanError> {
    let Some(raw) = cell else {
        return Err(CleanError::Value(None));
    };
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(CleanError::Value(Some(raw.to_string()))),
    }
}
