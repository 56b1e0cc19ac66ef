//! MIME decoding for mail messages.
//!
//! Covers what a cue matcher needs to see readable text: RFC 2047 encoded
//! header words, `base64` / `quoted-printable` transfer encodings, declared
//! charsets and multipart splitting. Files that are not valid UTF-8 are read
//! as Windows-1252, the superset of Latin-1 that legacy corpora use.

use std::sync::LazyLock;

use base64::{
    Engine, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use encoding_rs::{Encoding, WINDOWS_1252};
use quoted_printable::ParseMode;
use regex::Regex;

static ENCODED_WORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=\?([^?\s]+)\?([bBqQ])\?([^?\s]*)\?=").unwrap());

/// Mail software is loose about base64 padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Text plus the number of bytes the declared charset could not decode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub replaced_bytes: usize,
}

// ============================================================
// Charsets
// ============================================================

/// UTF-8, or Windows-1252 when the bytes are not valid UTF-8.
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned(),
    }
}

/// Decode with a declared charset label. Unknown or missing labels fall back
/// to `decode_text`.
pub fn decode_charset(bytes: &[u8], charset: Option<&str>) -> Decoded {
    // RFC 2231 language suffix: `utf-8*en`.
    let label = charset.map(|c| c.split('*').next().unwrap_or(c).trim());
    match label.and_then(|l| Encoding::for_label(l.as_bytes())) {
        Some(encoding) => {
            let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
            let replaced_bytes = if had_errors {
                text.matches(char::REPLACEMENT_CHARACTER).count()
            } else {
                0
            };
            Decoded {
                text: text.into_owned(),
                replaced_bytes,
            }
        }
        None => Decoded {
            text: decode_text(bytes),
            replaced_bytes: 0,
        },
    }
}

// ============================================================
// Encodings
// ============================================================

/// Decode RFC 2047 encoded words (`=?utf-8?B?...?=`). Whitespace between two
/// adjacent encoded words is dropped; words that fail to decode stay as
/// written.
pub fn decode_header_words(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last_end = 0;
    let mut after_word = false;
    for caps in ENCODED_WORD_REGEX.captures_iter(value) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let gap = &value[last_end..whole.start()];
        if !(after_word && gap.trim().is_empty()) {
            out.push_str(gap);
        }
        match decode_word(&caps[1], &caps[2], &caps[3]) {
            Some(text) => {
                out.push_str(&text);
                after_word = true;
            }
            None => {
                out.push_str(whole.as_str());
                after_word = false;
            }
        }
        last_end = whole.end();
    }
    out.push_str(&value[last_end..]);
    out
}

fn decode_word(charset: &str, encoding: &str, payload: &str) -> Option<String> {
    let bytes = if encoding.eq_ignore_ascii_case("b") {
        LENIENT_BASE64.decode(payload).ok()?
    } else {
        quoted_printable::decode(payload.replace('_', " "), ParseMode::Robust).ok()?
    };
    Some(decode_charset(&bytes, Some(charset)).text)
}

/// Undo a `Content-Transfer-Encoding`. `None` means the body is used as is
/// (7bit, 8bit, binary, unknown or undecodable).
pub fn decode_transfer(body: &[u8], transfer_encoding: &str) -> Option<Vec<u8>> {
    match transfer_encoding.trim().to_ascii_lowercase().as_str() {
        "base64" => {
            let compact: Vec<u8> = body
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            LENIENT_BASE64.decode(compact).ok()
        }
        "quoted-printable" => quoted_printable::decode(body, ParseMode::Robust).ok(),
        _ => None,
    }
}

// ============================================================
// Headers and Parts
// ============================================================

/// Split on `\n`, dropping a trailing `\r` from every line.
pub fn split_lines(bytes: &[u8]) -> Vec<&[u8]> {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    if bytes.is_empty() {
        return Vec::new();
    }
    bytes
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .collect()
}

/// Header fields in order, names lowercased, continuation lines folded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    /// Parse the header block of `lines`. Returns the headers and the index
    /// of the first body line.
    pub fn parse(lines: &[&[u8]]) -> (Self, usize) {
        let mut fields: Vec<(String, String)> = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            if line.trim_ascii().is_empty() {
                return (Self(fields), i + 1);
            }
            let line = decode_text(line);
            if line.starts_with([' ', '\t']) {
                if let Some((_, value)) = fields.last_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }
            if let Some((name, value)) = line.split_once(':') {
                fields.push((name.trim().to_lowercase(), value.trim().to_string()));
            }
        }
        (Self(fields), lines.len())
    }

    /// First value of `name` (lowercase).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Lowercased `type/subtype` of `Content-Type`, empty when absent.
    pub fn mime_type(&self) -> String {
        self.get("content-type")
            .and_then(|v| v.split(';').next())
            .map(|t| t.trim().to_ascii_lowercase())
            .unwrap_or_default()
    }

    /// A `Content-Type` parameter such as `charset` or `boundary`.
    pub fn content_param(&self, name: &str) -> Option<String> {
        let value = self.get("content-type")?;
        value.split(';').skip(1).find_map(|param| {
            let (key, val) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| val.trim().trim_matches('"').to_string())
        })
    }
}

/// Lines of the parts between `--boundary` delimiters. A missing closing
/// delimiter ends the last part at the end of input.
pub fn split_parts<'l, 'a>(lines: &'l [&'a [u8]], boundary: &str) -> Vec<&'l [&'a [u8]]> {
    let open = format!("--{}", boundary);
    let close = format!("--{}--", boundary);
    let mut parts = Vec::new();
    let mut start: Option<usize> = None;
    for (i, line) in lines.iter().enumerate() {
        let line = line.trim_ascii_end();
        if line != open.as_bytes() && line != close.as_bytes() {
            continue;
        }
        if let Some(s) = start.take() {
            parts.push(&lines[s..i]);
        }
        if line == close.as_bytes() {
            return parts;
        }
        start = Some(i + 1);
    }
    if let Some(s) = start {
        parts.push(&lines[s..]);
    }
    parts
}
