//! ASCII armor for copy/paste transport.
//!
//! ```text
//! -----BEGIN SIGNED MESSAGE BLOCK-----
//! <base64, wrapped at a fixed width>
//! -----END SIGNED MESSAGE BLOCK-----
//! ```

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{VaultError, VaultResult};

pub const SIGNED_MESSAGE_LABEL: &str = "SIGNED MESSAGE BLOCK";
pub const PENDING_ACCOUNT_LABEL: &str = "PENDING ACCOUNT";
pub const PROFILE_LABEL: &str = "PROFILE";

const DASHES: &str = "-----";

/// Wrap bytes in BEGIN/END markers with base64 lines of `width` columns.
pub fn armor(label: &str, bytes: &[u8], width: usize) -> String {
    let encoded = STANDARD.encode(bytes);
    let width = width.max(4);

    let mut out = format!("{DASHES}BEGIN {label}{DASHES}\n");
    for line in encoded.as_bytes().chunks(width) {
        // base64 output is ASCII, so chunking on bytes never splits a char
        out.push_str(&String::from_utf8_lossy(line));
        out.push('\n');
    }
    out.push_str(&format!("{DASHES}END {label}{DASHES}\n"));
    out
}

/// Extract the label and decoded bytes of the first armored block in `text`.
///
/// Surrounding text, CRLF line endings and indentation are tolerated.
pub fn dearmor(text: &str) -> VaultResult<(String, Vec<u8>)> {
    let (label, after_begin) = find_marker(text, "BEGIN ")
        .ok_or_else(|| VaultError::Format("missing BEGIN marker".into()))?;
    let (end_label, body) = split_at_end(after_begin)
        .ok_or_else(|| VaultError::Format("missing END marker".into()))?;
    if end_label != label {
        return Err(VaultError::Format(format!(
            "BEGIN {} does not match END {}",
            label, end_label
        )));
    }

    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(VaultError::Format("empty armored block".into()));
    }
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| VaultError::Format(format!("invalid base64: {}", e)))?;
    Ok((label, bytes))
}

/// Dearmor and check the label.
pub fn dearmor_expecting(text: &str, expected: &str) -> VaultResult<Vec<u8>> {
    let (label, bytes) = dearmor(text)?;
    if label != expected {
        return Err(VaultError::Format(format!(
            "expected a {} block, found {}",
            expected, label
        )));
    }
    Ok(bytes)
}

/// Locate `-----{kind}LABEL-----`, returning the label and the text after it.
fn find_marker<'a>(text: &'a str, kind: &str) -> Option<(String, &'a str)> {
    let prefix = format!("{DASHES}{kind}");
    let start = text.find(&prefix)? + prefix.len();
    let rest = &text[start..];
    let label_end = rest.find(DASHES)?;
    let label = rest[..label_end].trim().to_string();
    if label.is_empty() || !label.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ') {
        return None;
    }
    Some((label, &rest[label_end + DASHES.len()..]))
}

fn split_at_end(text: &str) -> Option<(String, &str)> {
    let end = text.find(&format!("{DASHES}END "))?;
    let (label, _) = find_marker(&text[end..], "END ")?;
    Some((label, &text[..end]))
}
