use super::*;
use chrono::Utc;

#[test]
fn test_format_number_comma() {
    let options = NumberFormatOptions {
        use_comma: true,
        use_human: false,
        locale: "en".to_string(),
        decimal_places: 2,
    };

    assert_eq!(format_number(1000u64, &options), "1,000");
    assert_eq!(format_number(1000000u64, &options), "1,000,000");
    assert_eq!(format_number(123u64, &options), "123");
}

#[test]
fn test_format_number_locale() {
    let options = NumberFormatOptions {
        use_comma: true,
        use_human: false,
        locale: "de".to_string(),
        decimal_places: 2,
    };

    assert_eq!(format_number(1234567u64, &options), "1.234.567");
}

#[test]
fn test_format_number_human() {
    let options = NumberFormatOptions {
        use_comma: false,
        use_human: true,
        locale: "en".to_string(),
        decimal_places: 1,
    };

    assert_eq!(format_number(100u64, &options), "100");
    assert_eq!(format_number(1500u64, &options), "1.5k");
    assert_eq!(format_number(1_500_000u64, &options), "1.5m");
    assert_eq!(format_number(1_500_000_000u64, &options), "1.5b");
    assert_eq!(format_number(1_500_000_000_000u64, &options), "1.5t");
}

#[test]
fn test_format_number_plain() {
    let options = NumberFormatOptions {
        use_comma: false,
        use_human: false,
        locale: "en".to_string(),
        decimal_places: 2,
    };

    assert_eq!(format_number(1000u64, &options), "1000");
}

#[test]
fn test_format_average() {
    assert_eq!(format_average(0.0), "0.0");
    assert_eq!(format_average(2.0 / 3.0), "0.7");
    assert_eq!(format_average(12.26), "12.3");
}

#[test]
fn test_format_week_label() {
    let date = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
    assert_eq!(format_week_label(date), "Jan 7, 2024");

    let date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
    assert_eq!(format_week_label(date), "Dec 31, 2023");
}

#[test]
fn test_format_day_uses_timezone() {
    let instant = Utc.with_ymd_and_hms(2024, 1, 7, 2, 0, 0).unwrap();
    assert_eq!(format_day(instant, &Utc), "Jan 7, 2024");
    assert_eq!(
        format_day(instant, &chrono_tz::America::New_York),
        "Jan 6, 2024"
    );
}

#[test]
fn test_hash_text() {
    let text = "hello world";
    let hash = hash_text(text);
    assert_eq!(hash.len(), 64); // SHA256 hex string length
    assert_eq!(
        hash,
        "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
    );
}

#[test]
fn test_warn_once_does_not_panic_on_repeats() {
    warn_once("repeated warning");
    warn_once("repeated warning");
    warn_once(String::from("another warning"));
}
