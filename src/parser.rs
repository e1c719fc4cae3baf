//! Turns a raw model completion into a [`GeneratedCode`].
//!
//! The completion service is an untrusted text source: anything that is not a
//! JSON object with a non-empty `type`, `framework` and `files` degrades into a
//! single-file `index.html` project holding the raw text, so callers always get
//! something renderable back.

use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

use crate::{completion::preview, models::GeneratedCode};

pub const FALLBACK_INSTRUCTIONS: &str = "Manual setup required";

#[derive(Debug, Error)]
enum ParseFailure {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid generated code structure: missing or empty `{0}`")]
    Missing(&'static str),
}

/// Parses a completion, falling back to a raw single-file project on any failure.
pub fn parse_generated_code(raw: &str) -> GeneratedCode {
    match try_parse(raw) {
        Ok(code) => code,
        Err(reason) => {
            warn!("⚠️ Falling back to raw index.html: {}", reason);
            warn!("Raw response: {}", preview(raw, 1000));
            fallback(raw)
        }
    }
}

fn try_parse(raw: &str) -> Result<GeneratedCode, ParseFailure> {
    let body = strip_code_fence(raw.trim());
    let value: serde_json::Value = serde_json::from_str(body)?;

    for field in ["type", "framework", "files"] {
        if !is_present(value.get(field)) {
            return Err(ParseFailure::Missing(field));
        }
    }

    Ok(serde_json::from_value(value)?)
}

/// A field counts as present when it exists and is not null, false or empty.
fn is_present(v: Option<&serde_json::Value>) -> bool {
    match v {
        None | Some(serde_json::Value::Null) | Some(serde_json::Value::Bool(false)) => false,
        Some(serde_json::Value::String(s)) => !s.is_empty(),
        Some(serde_json::Value::Object(m)) => !m.is_empty(),
        Some(_) => true,
    }
}

/// Removes a surrounding triple-backtick fence (optionally tagged, e.g. `json`).
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = match rest.find('\n') {
        Some(newline) if is_fence_tag(&rest[..newline]) => &rest[newline + 1..],
        _ => rest.strip_prefix("json").unwrap_or(rest),
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn is_fence_tag(line: &str) -> bool {
    line.trim().chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn fallback(raw: &str) -> GeneratedCode {
    let mut files = BTreeMap::new();
    files.insert("index.html".to_string(), raw.to_string());
    GeneratedCode {
        kind: "website".into(),
        framework: "html".into(),
        files,
        dependencies: None,
        structure: Some(vec!["index.html".into()]),
        instructions: Some(FALLBACK_INSTRUCTIONS.into()),
    }
}
