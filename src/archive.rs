use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::Deserialize;

use crate::debug_log;
use crate::types::{Archive, Conversation};
use crate::utils::warn_once;

impl<'de> Deserialize<'de> for Archive {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(ArchiveVisitor)
    }
}

struct ArchiveVisitor;

impl<'de> Visitor<'de> for ArchiveVisitor {
    type Value = Archive;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON array of conversations")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Archive, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut conversations = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        loop {
            let index = conversations.len();
            match seq.next_element::<Conversation>() {
                Ok(Some(conversation)) => conversations.push(conversation),
                Ok(None) => break,
                Err(e) => return Err(de::Error::custom(format!("conversation #{index}: {e}"))),
            }
        }
        Ok(Archive::new(conversations))
    }
}

/// Decode an export held in memory. simd-json parses in place, so the
/// buffer is clobbered.
pub fn parse_archive(bytes: &mut [u8]) -> Result<Archive> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        anyhow::bail!("Archive is empty");
    }

    let archive: Archive =
        simd_json::serde::from_slice(bytes).context("Not a valid conversations export")?;
    Ok(archive)
}

/// Read and decode `conversations.json`, warning about messages whose
/// dates will fall back to the current time.
pub fn load_archive(path: &Path) -> Result<Archive> {
    let _timer = debug_log::Timed::new("ARCHIVE", path.display().to_string());

    let mut bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    debug_log::log("ARCHIVE", "READ", &format!("{} bytes", bytes.len()));

    let archive = parse_archive(&mut bytes)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let undated = archive.messages_without_timestamp();
    debug_log::log(
        "ARCHIVE",
        "PARSED",
        &format!(
            "{} conversations, {undated} messages without create_time",
            archive.conversations.len()
        ),
    );
    if undated > 0 {
        warn_once(format!(
            "⚠️  {undated} message(s) have no create_time and are dated to the time of analysis"
        ));
    }

    Ok(archive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(json: &str) -> Result<Archive> {
        let mut bytes = json.as_bytes().to_vec();
        parse_archive(&mut bytes)
    }

    const EXPORT: &str = r#"[
        {
            "title": "Rust lifetimes",
            "create_time": 1704888000.5,
            "default_model_slug": "gpt-4o",
            "mapping": {
                "root": {"id": "root", "message": null, "parent": null, "children": ["a"]},
                "a": {
                    "id": "a",
                    "message": {
                        "id": "a",
                        "author": {"role": "user", "name": null, "metadata": {}},
                        "create_time": 1704888000.5,
                        "content": {"content_type": "text", "parts": ["hi"]},
                        "status": "finished_successfully"
                    },
                    "parent": "root",
                    "children": ["b"]
                },
                "b": {
                    "id": "b",
                    "message": {
                        "author": {"role": "assistant"},
                        "create_time": null,
                        "content": {
                            "content_type": "multimodal_text",
                            "parts": [{"content_type": "image_asset_pointer", "asset_pointer": "file-service://x"}, "hello"]
                        }
                    },
                    "parent": "a",
                    "children": []
                }
            }
        },
        {"mapping": {}}
    ]"#;

    #[test]
    fn parses_real_export_shape() {
        let archive = parse(EXPORT).unwrap();

        assert_eq!(archive.conversations.len(), 2);
        let first = &archive.conversations[0];
        assert_eq!(first.model_label(), "gpt-4o");
        assert_eq!(first.mapping.len(), 3);
        assert_eq!(first.messages().count(), 2);

        let assistant = first
            .messages()
            .find(|m| m.role() == Some("assistant"))
            .unwrap();
        assert_eq!(assistant.body_len(), 5);
        assert!(assistant.created_at().is_none());

        assert_eq!(archive.conversations[1].model_label(), "Unknown");
        assert_eq!(archive.messages_without_timestamp(), 1);
    }

    #[test]
    fn accepts_empty_array() {
        let archive = parse("[]").unwrap();
        assert!(archive.conversations.is_empty());
    }

    #[test]
    fn rejects_non_array_top_level() {
        let err = parse(r#"{"mapping": {}}"#).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("Not a valid conversations export"), "{msg}");
    }

    #[test]
    fn rejects_conversation_without_mapping() {
        let err = parse(r#"[{"mapping": {}}, {"title": "broken"}]"#).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("conversation #1"), "{msg}");
        assert!(msg.contains("mapping"), "{msg}");
    }

    #[test]
    fn rejects_invalid_json_and_empty_input() {
        assert!(parse("[{").is_err());

        let err = parse("  \n").unwrap_err();
        assert!(format!("{err}").contains("empty"));
    }

    #[test]
    fn load_archive_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("conversations.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(EXPORT.as_bytes()).unwrap();

        let archive = load_archive(&path).unwrap();
        assert_eq!(archive.conversations.len(), 2);

        let missing = load_archive(&dir.path().join("missing.json")).unwrap_err();
        assert!(format!("{missing:#}").contains("Failed to read"));
    }
}
