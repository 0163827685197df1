use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::config::ShareConfig;
use crate::debug_log;
use crate::reqwest_simd_json::ReqwestSimdJsonExt;
use crate::types::{ErrorResponse, Stats, Submission};
use crate::utils::hash_text;

pub const DATA_HASH_HEADER: &str = "X-Data-Hash";

fn iso_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Reduce `stats` to the anonymized aggregate payload. Message bodies
/// never reach `Stats`, so nothing textual leaves the machine.
pub fn build_submission(stats: &Stats, submission_id: &str, now: DateTime<Utc>) -> Submission {
    Submission {
        submission_id: submission_id.to_string(),
        timestamp: iso_timestamp(now),
        total_messages: stats.total_messages(),
        conversation_count: stats.conversation_count,
        average_messages_per_day: stats.average_messages_per_day,
        models_used: stats.models_used() as u64,
        first_message_date: iso_timestamp(stats.first_message_date),
        longest_chat: stats.longest_chat,
        model_counts: stats.model_counts.clone(),
        weekly_message_counts: stats.weekly_messages.clone(),
        chat_length_distribution: stats.chat_lengths.clone(),
    }
}

/// Value of the `X-Data-Hash` header: SHA-256 of the id followed by the
/// submission timestamp.
pub fn data_hash(submission: &Submission) -> String {
    hash_text(&format!("{}{}", submission.submission_id, submission.timestamp))
}

pub fn get_http_client(timeout_seconds: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .context("Failed to create HTTP client")
}

fn parse_json_error(error_body: &str) -> Option<String> {
    if !error_body.trim_start().starts_with('{') {
        return None;
    }
    let mut bytes = error_body.as_bytes().to_vec();
    simd_json::serde::from_slice::<ErrorResponse>(&mut bytes)
        .ok()
        .map(|r| r.error)
}

fn describe_failure(status: u16, error_text: &str) -> String {
    let detail = parse_json_error(error_text).or_else(|| {
        let trimmed = error_text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    match (status, detail) {
        (400, Some(msg)) => format!("Bad request: {msg}"),
        (400, None) => "Bad request".to_string(),
        (422, Some(msg)) => format!("Validation: {msg}"),
        (422, None) => "Validation error".to_string(),
        (_, detail) => {
            let summary = match status {
                413 => "Payload too large".to_string(),
                429 => "Rate limited".to_string(),
                500 => "Server error".to_string(),
                502 => "Bad gateway".to_string(),
                503 => "Service unavailable".to_string(),
                504 => "Gateway timeout".to_string(),
                _ => format!("Error {status}"),
            };
            match detail {
                Some(msg) => format!("{summary}: {msg}"),
                None => summary,
            }
        }
    }
}

/// POST the submission to `{server_url}/submit`.
pub async fn submit(submission: &Submission, config: &ShareConfig) -> Result<()> {
    let url = format!("{}/submit", config.server_url.trim_end_matches('/'));
    debug_log::log("SHARE", "POST", &url);

    let client = get_http_client(config.timeout_seconds)?;
    let response = client
        .post(&url)
        .header(DATA_HASH_HEADER, data_hash(submission))
        .simd_json(submission)?
        .send()
        .await
        .with_context(|| format!("Failed to reach {url}"))?;

    let status = response.status();
    debug_log::log("SHARE", "RESPONSE", status.as_str());
    if status.is_success() {
        return Ok(());
    }

    let error_text = response.text().await.unwrap_or_default();
    anyhow::bail!(
        "Failed to submit data: {}",
        describe_failure(status.as_u16(), &error_text)
    );
}
