use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

use chrono::{DateTime, NaiveDate, TimeZone};
use num_format::{Locale, ToFormattedString};
use sha2::{Digest, Sha256};

static WARNED_MESSAGES: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();

/// Print a warning to stderr, at most once per distinct message.
pub fn warn_once(message: impl Into<String>) {
    let message = message.into();
    let cache = WARNED_MESSAGES.get_or_init(|| Mutex::new(HashSet::new()));

    if let Ok(mut warned) = cache.lock()
        && warned.insert(message.clone())
    {
        eprintln!("{message}");
    }
}

#[derive(Clone)]
pub struct NumberFormatOptions {
    pub use_comma: bool,
    pub use_human: bool,
    pub locale: String,
    pub decimal_places: usize,
}

impl Default for NumberFormatOptions {
    fn default() -> Self {
        Self {
            use_comma: true,
            use_human: false,
            locale: "en".to_string(),
            decimal_places: 1,
        }
    }
}

const HUMAN_SUFFIXES: [(u64, &str); 4] = [
    (1_000_000_000_000, "t"),
    (1_000_000_000, "b"),
    (1_000_000, "m"),
    (1_000, "k"),
];

fn locale_for(code: &str) -> Locale {
    match code {
        "de" => Locale::de,
        "fr" => Locale::fr,
        "es" => Locale::es,
        "it" => Locale::it,
        "ja" => Locale::ja,
        "ko" => Locale::ko,
        "zh" => Locale::zh,
        _ => Locale::en,
    }
}

/// Format a count for display. Accepts any unsigned integer up to u64.
pub fn format_number(n: impl Into<u64>, options: &NumberFormatOptions) -> String {
    let n: u64 = n.into();

    if options.use_human {
        for (threshold, suffix) in HUMAN_SUFFIXES {
            if n >= threshold {
                return format!(
                    "{:.prec$}{suffix}",
                    n as f64 / threshold as f64,
                    prec = options.decimal_places
                );
            }
        }
        n.to_string()
    } else if options.use_comma {
        n.to_formatted_string(&locale_for(&options.locale))
    } else {
        n.to_string()
    }
}

/// Format a per-day average with a single decimal.
pub fn format_average(value: f64) -> String {
    format!("{value:.1}")
}

/// Short label for a week-start date, e.g. `Jan 7, 2024`.
pub fn format_week_label(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Calendar date of an instant in `tz`, formatted like [`format_week_label`].
pub fn format_day<Tz: TimeZone>(instant: DateTime<chrono::Utc>, tz: &Tz) -> String {
    format_week_label(instant.with_timezone(tz).date_naive())
}

pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text);
    format!("{:x}", hasher.finalize())
}

/// Get the system's local timezone as an IANA timezone string (e.g., "America/Chicago")
pub fn get_local_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

#[cfg(test)]
mod tests;
