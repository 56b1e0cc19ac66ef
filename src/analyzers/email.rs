//! Email analyzer and its default collaborator.
//!
//! `EmailDirectory` walks a directory of CSV exports and mbox archives.
//! CSV columns are classified by name, since public phishing corpora do not
//! agree on a schema. mbox messages are MIME decoded: encoded subjects,
//! base64 / quoted-printable bodies, declared charsets and multipart
//! alternatives. Defanged indicators (`hxxp://`, `[.]`) are restored in
//! memory before matching so link cues are still seen.
//!
//! Sender and recipient addresses never leave a record unredacted.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use csv::ReaderBuilder;
use rayon::prelude::*;
use regex::Regex;
use tracing::debug;

use super::{
    FailedRecord, SourceAnalyzer,
    mime::{
        Decoded, Headers, decode_charset, decode_header_words, decode_text, decode_transfer,
        split_lines, split_parts,
    },
    scanner::scan_files,
};
use crate::core::{
    data::{DocumentResult, SourceType},
    error::{CollaboratorError, RecordError},
    matcher::Matcher,
    normalizer::normalize,
};

pub const EMAIL_EXTENSIONS: &[&str] = &["csv", "mbox", "mbx"];

pub const REDACTED_EMAIL: &str = "[redacted-email]";

const SUBJECT_COLUMNS: &[&str] = &["subject", "subj", "title", "headline"];
const BODY_COLUMNS: &[&str] = &[
    "body",
    "text",
    "message",
    "content",
    "payload",
    "snippet",
    "description",
    "body_text",
    "email",
    "data",
    "body_snippet",
];
const HTML_COLUMNS: &[&str] = &[
    "html",
    "body_html",
    "message_html",
    "content_html",
    "sanitized_body",
];
const FROM_COLUMNS: &[&str] = &["from", "sender"];
const TO_COLUMNS: &[&str] = &["to", "recipient"];
const DATE_COLUMNS: &[&str] = &["date", "timestamp"];
const FROM_DOMAIN_COLUMN: &str = "from_domain";
const METADATA_COLUMNS: &[&str] = &[
    "id",
    "date",
    "from",
    "from_domain",
    "to",
    "timestamp",
    "sender",
    "recipient",
];

/// Nested multiparts deeper than this are not read.
const MAX_PART_DEPTH: usize = 8;

static SCRIPT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<\s*script[^>]*>.*?<\s*/\s*script\s*>").unwrap());

static STYLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<\s*style[^>]*>.*?<\s*/\s*style\s*>").unwrap());

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

static DEFANGED_SCHEME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bhxxp(s?)://").unwrap());

static EMAIL_ADDRESS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@([A-Za-z0-9.-]+\.[A-Za-z]{2,})").unwrap()
});

// ============================================================
// Records
// ============================================================

/// One email as handed over by a collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailRecord {
    pub id: String,
    /// Decoded, unredacted. Use `report_metadata` for anything written out.
    pub subject: String,
    pub body: String,
    pub metadata: EmailMetadata,
    /// Bytes a declared charset could not decode.
    pub replaced_bytes: usize,
}

/// Header fields carried alongside the text. Addresses are redacted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailMetadata {
    pub from: String,
    pub to: String,
    pub date: String,
    /// Lowercased domain of the sender, kept for grouping.
    pub from_domain: String,
}

impl EmailMetadata {
    /// Build from raw header values. `from_domain` falls back to the domain
    /// of the first address in `from`.
    pub fn new(from: &str, to: &str, date: &str, from_domain: Option<&str>) -> Self {
        let from_domain = from_domain
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .or_else(|| {
                EMAIL_ADDRESS_REGEX
                    .captures(from)
                    .map(|caps| caps[1].to_string())
            })
            .unwrap_or_default()
            .to_lowercase();
        Self {
            from: redact_addresses(from.trim()),
            to: redact_addresses(to.trim()),
            date: date.trim().to_string(),
            from_domain,
        }
    }
}

impl EmailRecord {
    pub fn new(id: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    /// Subject and body as one text.
    pub fn text(&self) -> String {
        match (self.subject.is_empty(), self.body.is_empty()) {
            (true, _) => self.body.clone(),
            (false, true) => self.subject.clone(),
            (false, false) => format!("{}\n{}", self.subject, self.body),
        }
    }

    /// Fields written to the per-record report, addresses redacted.
    pub fn report_metadata(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("subject", redact_addresses(&self.subject)),
            ("from", self.metadata.from.clone()),
            ("to", self.metadata.to.clone()),
            ("date", self.metadata.date.clone()),
        ])
    }
}

/// Replace every email address in `text` with `[redacted-email]`.
pub fn redact_addresses(text: &str) -> String {
    EMAIL_ADDRESS_REGEX
        .replace_all(text, REDACTED_EMAIL)
        .into_owned()
}

/// Supplies the ordered email records of a corpus.
pub trait EmailSource: Send + Sync {
    fn records(&self) -> Result<Vec<Result<EmailRecord, FailedRecord>>, CollaboratorError>;
}

// ============================================================
// Analyzer
// ============================================================

pub struct EmailAnalyzer {
    source: Box<dyn EmailSource>,
}

impl EmailAnalyzer {
    pub fn new(source: impl EmailSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }
}

impl SourceAnalyzer for EmailAnalyzer {
    fn source_type(&self) -> SourceType {
        SourceType::Email
    }

    fn analyze(&self, matcher: &Matcher) -> Result<Vec<DocumentResult>, CollaboratorError> {
        let records = self.source.records()?;
        Ok(records
            .into_par_iter()
            .map(|record| match record {
                Ok(email) => {
                    let text = email.text();
                    let mut result =
                        matcher.evaluate(&normalize(&text, SourceType::Email, email.id.clone()));
                    result.signals.replaced_bytes = email.replaced_bytes;
                    result.metadata = email.report_metadata();
                    result
                }
                Err(failed) => failed.into_result(SourceType::Email),
            })
            .collect())
    }
}

// ============================================================
// Directory Source
// ============================================================

/// Reads every `.csv`, `.mbox` and `.mbx` file below a directory.
#[derive(Debug, Clone)]
pub struct EmailDirectory {
    root: PathBuf,
    ignores: Vec<String>,
}

impl EmailDirectory {
    pub fn new(root: impl Into<PathBuf>, ignores: Vec<String>) -> Self {
        Self {
            root: root.into(),
            ignores,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl EmailSource for EmailDirectory {
    fn records(&self) -> Result<Vec<Result<EmailRecord, FailedRecord>>, CollaboratorError> {
        if !self.root.is_dir() {
            return Err(CollaboratorError::InputMissing {
                what: "email directory",
                path: self.root.clone(),
            });
        }
        let extensions: Vec<String> = EMAIL_EXTENSIONS.iter().map(|e| e.to_string()).collect();
        let scan = scan_files(&self.root, &extensions, &self.ignores);
        debug!(
            "Found {} email files under {}",
            scan.files.len(),
            self.root.display()
        );

        let per_file: Vec<Vec<_>> = scan.files.par_iter().map(|path| read_file(path)).collect();
        Ok(per_file.into_iter().flatten().collect())
    }
}

fn read_file(path: &Path) -> Vec<Result<EmailRecord, FailedRecord>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            let id = path.display().to_string();
            return vec![Err(FailedRecord::new(
                id.clone(),
                RecordError::Unreadable {
                    path: id,
                    message: e.to_string(),
                },
            ))];
        }
    };
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        parse_csv(path, &bytes)
    } else {
        parse_mbox(path, &bytes)
    }
}

// ============================================================
// CSV
// ============================================================

#[derive(Debug, Default, PartialEq, Eq)]
struct Columns {
    subject: Vec<usize>,
    body: Vec<usize>,
    html: Vec<usize>,
    from: Option<usize>,
    to: Option<usize>,
    date: Option<usize>,
    from_domain: Option<usize>,
}

fn pick_columns(header: &[String]) -> Columns {
    let lower: Vec<String> = header
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
        .collect();
    let find = |names: &[&str]| lower.iter().position(|n| names.contains(&n.as_str()));
    let mut columns = Columns {
        from: find(FROM_COLUMNS),
        to: find(TO_COLUMNS),
        date: find(DATE_COLUMNS),
        from_domain: find(&[FROM_DOMAIN_COLUMN]),
        ..Columns::default()
    };
    for (i, name) in lower.iter().enumerate() {
        if SUBJECT_COLUMNS.contains(&name.as_str()) {
            columns.subject.push(i);
        }
        if BODY_COLUMNS.contains(&name.as_str()) {
            columns.body.push(i);
        }
        if HTML_COLUMNS.contains(&name.as_str()) {
            columns.html.push(i);
        }
    }
    // No recognizable body: read every non-metadata column that is not
    // already the subject.
    if columns.body.is_empty() && columns.html.is_empty() {
        columns.body = lower
            .iter()
            .enumerate()
            .filter(|(i, name)| {
                !METADATA_COLUMNS.contains(&name.as_str()) && !columns.subject.contains(i)
            })
            .map(|(i, _)| i)
            .collect();
    }
    columns
}

fn parse_csv(path: &Path, bytes: &[u8]) -> Vec<Result<EmailRecord, FailedRecord>> {
    let mut reader = ReaderBuilder::new().from_reader(bytes);
    let header: Vec<String> = match reader.byte_headers() {
        Ok(h) => h.iter().map(decode_text).collect(),
        Err(e) => {
            let id = path.display().to_string();
            return vec![Err(FailedRecord::new(
                id,
                RecordError::Malformed(e.to_string()),
            ))];
        }
    };
    let columns = pick_columns(&header);

    let mut records = Vec::new();
    for (index, row) in reader.byte_records().enumerate() {
        let id = format!("{}#row={}", path.display(), index + 1);
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                let is_io = e.is_io_error();
                records.push(Err(FailedRecord::new(id, RecordError::Malformed(e.to_string()))));
                if is_io {
                    break;
                }
                continue;
            }
        };
        let field = |i: usize| row.get(i).map(decode_text).unwrap_or_default();
        let optional = |i: Option<usize>| i.map(field).unwrap_or_default();

        let subject = columns
            .subject
            .iter()
            .map(|&i| field(i))
            .find(|s| !s.trim().is_empty())
            .unwrap_or_default();
        let mut parts: Vec<String> = columns
            .body
            .iter()
            .map(|&i| field(i))
            .filter(|s| !s.is_empty())
            .collect();
        parts.extend(
            columns
                .html
                .iter()
                .map(|&i| field(i))
                .filter(|s| !s.is_empty())
                .map(|s| html_to_text(&s)),
        );
        let from_domain = columns.from_domain.map(field);

        records.push(Ok(EmailRecord {
            id,
            subject: deobfuscate(&decode_header_words(&subject)),
            body: deobfuscate(&parts.join("\n")),
            metadata: EmailMetadata::new(
                &decode_header_words(&optional(columns.from)),
                &decode_header_words(&optional(columns.to)),
                &optional(columns.date),
                from_domain.as_deref(),
            ),
            replaced_bytes: 0,
        }));
    }
    records
}

// ============================================================
// mbox
// ============================================================

fn parse_mbox(path: &Path, bytes: &[u8]) -> Vec<Result<EmailRecord, FailedRecord>> {
    let mut messages: Vec<Vec<&[u8]>> = Vec::new();
    let mut current: Option<Vec<&[u8]>> = None;
    for line in split_lines(bytes) {
        if line.starts_with(b"From ") {
            if let Some(message) = current.take() {
                messages.push(message);
            }
            current = Some(Vec::new());
        } else if let Some(message) = current.as_mut() {
            message.push(unescape_from_line(line));
        }
    }
    if let Some(message) = current {
        messages.push(message);
    }

    messages
        .iter()
        .enumerate()
        .map(|(index, lines)| {
            let id = format!("{}#msg={}", path.display(), index + 1);
            let record = parse_message(id, lines);
            if record.replaced_bytes > 0 {
                debug!("{}: replaced {} undecodable bytes", record.id, record.replaced_bytes);
            }
            Ok(record)
        })
        .collect()
}

fn parse_message(id: String, lines: &[&[u8]]) -> EmailRecord {
    let (headers, body_start) = Headers::parse(lines);
    let header = |name: &str| decode_header_words(headers.get(name).unwrap_or_default());
    let body = message_body(&headers, lines.get(body_start..).unwrap_or_default(), 0);

    EmailRecord {
        id,
        subject: deobfuscate(&header("subject")),
        body: deobfuscate(&body.text),
        metadata: EmailMetadata::new(&header("from"), &header("to"), &header("date"), None),
        replaced_bytes: body.replaced_bytes,
    }
}

/// Readable text of a message or part. Multiparts are walked; of an
/// `alternative` only the first non-empty part is kept. Non-text parts
/// (attachments, images) contribute nothing.
fn message_body(headers: &Headers, lines: &[&[u8]], depth: usize) -> Decoded {
    let mime_type = headers.mime_type();

    if mime_type.starts_with("multipart/") && depth < MAX_PART_DEPTH {
        if let Some(boundary) = headers.content_param("boundary") {
            let parts: Vec<Decoded> = split_parts(lines, &boundary)
                .into_iter()
                .map(|part| {
                    let (part_headers, start) = Headers::parse(part);
                    message_body(&part_headers, part.get(start..).unwrap_or_default(), depth + 1)
                })
                .filter(|part| !part.text.trim().is_empty())
                .collect();
            if mime_type == "multipart/alternative" {
                return parts.into_iter().next().unwrap_or_default();
            }
            return Decoded {
                text: parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
                replaced_bytes: parts.iter().map(|p| p.replaced_bytes).sum(),
            };
        }
    }
    if !(mime_type.is_empty() || mime_type.starts_with("text/")) {
        return Decoded::default();
    }

    let raw = lines.join(&b'\n');
    let transfer = headers.get("content-transfer-encoding").unwrap_or_default();
    let bytes = decode_transfer(&raw, transfer).unwrap_or(raw);
    let decoded = decode_charset(&bytes, headers.content_param("charset").as_deref());
    if mime_type == "text/html" || decoded.text.to_lowercase().contains("<html") {
        Decoded {
            text: html_to_text(&decoded.text),
            ..decoded
        }
    } else {
        decoded
    }
}

/// Undo mboxrd quoting: `>From ` and `>>From ` lose one `>`.
fn unescape_from_line(line: &[u8]) -> &[u8] {
    match line.strip_prefix(b">") {
        Some(rest) => {
            let quotes = rest.iter().take_while(|&&b| b == b'>').count();
            if rest[quotes..].starts_with(b"From ") {
                rest
            } else {
                line
            }
        }
        None => line,
    }
}

// ============================================================
// Text Preparation
// ============================================================

/// Drop scripts, styles and tags, keeping the visible text.
pub fn html_to_text(html: &str) -> String {
    let text = SCRIPT_REGEX.replace_all(html, " ");
    let text = STYLE_REGEX.replace_all(&text, " ");
    let text = TAG_REGEX.replace_all(&text, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Restore defanged indicators: `hxxp(s)://` and `[.]`.
pub fn deobfuscate(text: &str) -> String {
    DEFANGED_SCHEME_REGEX
        .replace_all(text, "http${1}://")
        .replace("[.]", ".")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;
    use crate::core::{
        data::Category,
        lexicon::Lexicon,
        matcher::SignalPolicy,
    };

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pick_columns_by_name() {
        let columns = pick_columns(&header(&["ID", "Subject", "Body", "body_html", "from"]));
        assert_eq!(
            columns,
            Columns {
                subject: vec![1],
                body: vec![2],
                html: vec![3],
                from: Some(4),
                ..Columns::default()
            }
        );
    }

    #[test]
    fn test_pick_columns_fallback_skips_metadata() {
        let columns = pick_columns(&header(&["id", "subject", "notes", "from", "raw"]));
        assert_eq!(columns.subject, vec![1]);
        assert_eq!(columns.body, vec![2, 4]);
    }

    #[test]
    fn test_html_to_text() {
        let html = "<html><style>p{color:red}</style><script>alert('x')</script>\
                    <p>Verify&nbsp;your <b>account</b></p></html>";
        assert_eq!(html_to_text(html), "Verify your account");
    }

    #[test]
    fn test_deobfuscate() {
        assert_eq!(
            deobfuscate("go to hxxps://evil[.]example and HXXP://a[.]b"),
            "go to https://evil.example and http://a.b"
        );
    }

    #[test]
    fn test_csv_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mail.csv");
        fs::write(
            &path,
            "id,subject,body,html\n\
             1,Account locked,Verify now at hxxp://x[.]example,\n\
             2,,,<p>Claim your <b>reward</b></p>\n",
        )
        .unwrap();

        let records = read_file(&path);
        assert_eq!(records.len(), 2);
        let first = records[0].as_ref().unwrap();
        assert!(first.id.ends_with("mail.csv#row=1"));
        assert_eq!(first.subject, "Account locked");
        assert_eq!(first.body, "Verify now at http://x.example");
        let second = records[1].as_ref().unwrap();
        assert_eq!(second.text(), "Claim your reward");
    }

    #[test]
    fn test_bad_csv_row_is_an_errored_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mail.csv");
        fs::write(&path, "subject,body\nhello,world\nonly-one-field\nbye,now\n").unwrap();

        let records = read_file(&path);
        assert_eq!(records.len(), 3);
        assert!(records[0].is_ok());
        let failed = records[1].as_ref().unwrap_err();
        assert!(failed.id.ends_with("#row=2"));
        assert!(matches!(failed.error, RecordError::Malformed(_)));
        assert!(records[2].is_ok());
    }

    #[test]
    fn test_invalid_utf8_does_not_fail_the_row() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mail.csv");
        fs::write(&path, b"subject,body\nhi,caf\xe9 urgent\n").unwrap();

        let records = read_file(&path);
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.body, "café urgent");
    }

    #[test]
    fn test_latin1_csv_fields_are_decoded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("legacy.csv");
        fs::write(&path, b"\xef\xbb\xbfsubject,body\nPrize,Claim your \xa3500 reward\n").unwrap();

        let records = read_file(&path);
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.subject, "Prize");
        assert_eq!(record.body, "Claim your £500 reward");
        assert_eq!(record.replaced_bytes, 0);
    }

    #[test]
    fn test_csv_metadata_is_redacted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mail.csv");
        fs::write(
            &path,
            "subject,body,from,to,date\n\
             Reply to billing@bank.example,Pay now,\"Billing <Billing@Bank.Example>\",victim@mail.org,2019-04-02\n",
        )
        .unwrap();

        let records = read_file(&path);
        let record = records[0].as_ref().unwrap();
        assert_eq!(
            record.metadata,
            EmailMetadata {
                from: "Billing <[redacted-email]>".to_string(),
                to: "[redacted-email]".to_string(),
                date: "2019-04-02".to_string(),
                from_domain: "bank.example".to_string(),
            }
        );
        let report = record.report_metadata();
        assert_eq!(report["subject"], "Reply to [redacted-email]");
        assert_eq!(report["date"], "2019-04-02");
        assert!(report.values().all(|v| !v.contains('@')));
    }

    #[test]
    fn test_redact_addresses() {
        assert_eq!(
            redact_addresses("mail a.b+c@x-y.co.uk or ceo@corp.com, not user@localhost"),
            "mail [redacted-email] or [redacted-email], not user@localhost"
        );
    }

    #[test]
    fn test_mbox_messages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("box.mbox");
        fs::write(
            &path,
            "From alice@example.com Mon Jan  1 00:00:00 2024\n\
             Subject: Final notice\n\
             \x20for your account\n\
             From: alice@example.com\n\
             \n\
             Act now.\n\
             >From the team\n\
             From bob@example.com Tue Jan  2 00:00:00 2024\n\
             Subject: Hello\n\
             Content-Type: text/html\n\
             \n\
             <p>Your <i>prize</i> awaits</p>\n",
        )
        .unwrap();

        let records = read_file(&path);
        assert_eq!(records.len(), 2);
        let first = records[0].as_ref().unwrap();
        assert!(first.id.ends_with("box.mbox#msg=1"));
        assert_eq!(first.subject, "Final notice for your account");
        assert_eq!(first.body, "Act now.\nFrom the team");
        assert_eq!(first.metadata.from, "[redacted-email]");
        assert_eq!(first.metadata.from_domain, "example.com");
        let second = records[1].as_ref().unwrap();
        assert_eq!(second.body, "Your prize awaits");
    }

    #[test]
    fn test_mbox_encoded_subject_and_base64_body() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("box.mbox");
        fs::write(
            &path,
            "From scam@example.net Mon Jan  1 00:00:00 2024\r\n\
             Subject: =?utf-8?B?VXJnZW50IGFjdGlvbiByZXF1aXJlZA==?=\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             Content-Transfer-Encoding: base64\r\n\
             \r\n\
             QWN0IG5vdyBvciB5b3VyIGFjY291bnQgaXMgc3VzcGVuZGVk\r\n",
        )
        .unwrap();

        let records = read_file(&path);
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.subject, "Urgent action required");
        assert_eq!(record.body, "Act now or your account is suspended");
    }

    #[test]
    fn test_mbox_multipart_message() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("box.mbox");
        fs::write(
            &path,
            "From a@b Mon Jan  1 00:00:00 2024\n\
             Subject: =?ISO-8859-1?Q?Dernier_avis?=\n\
             Content-Type: multipart/mixed; boundary=\"outer\"\n\
             \n\
             --outer\n\
             Content-Type: multipart/alternative; boundary=inner\n\
             \n\
             --inner\n\
             Content-Type: text/plain; charset=utf-8\n\
             Content-Transfer-Encoding: quoted-printable\n\
             \n\
             Votre compte est bloqu=C3=A9, act=\n\
             \x20now\n\
             --inner\n\
             Content-Type: text/html\n\
             \n\
             <p>Votre compte est bloqu&eacute;</p>\n\
             --inner--\n\
             --outer\n\
             Content-Type: text/plain; charset=iso-8859-1\n\
             Content-Transfer-Encoding: base64\n\
             \n\
             RGVybmllciBhdmlzOiBjb21wdGUgYmxvcXXp\n\
             --outer\n\
             Content-Type: application/pdf\n\
             Content-Transfer-Encoding: base64\n\
             \n\
             JVBERi0xLjQK\n\
             --outer--\n",
        )
        .unwrap();

        let records = read_file(&path);
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.subject, "Dernier avis");
        assert_eq!(
            record.body,
            "Votre compte est bloqué, act now\nDernier avis: compte bloqué"
        );
        assert_eq!(record.replaced_bytes, 0);
    }

    #[test]
    fn test_mbox_declared_charset_mismatch_counts_replaced_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("box.mbox");
        let mut content = b"From a@b Mon Jan  1 00:00:00 2024\n\
                            Content-Type: text/plain; charset=utf-8\n\
                            \n\
                            ok "
            .to_vec();
        content.extend_from_slice(b"\xff\xfe\n");
        fs::write(&path, content).unwrap();

        let records = read_file(&path);
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.body, "ok \u{FFFD}\u{FFFD}");
        assert_eq!(record.replaced_bytes, 2);
    }

    #[test]
    fn test_missing_directory_is_unavailable() {
        let dir = tempdir().unwrap();
        let source = EmailDirectory::new(dir.path().join("nope"), vec![]);
        assert!(matches!(
            source.records(),
            Err(CollaboratorError::InputMissing { .. })
        ));
    }

    #[test]
    fn test_analyzer_scores_every_record() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("a.csv"),
            "subject,body\nUrgent,act now\n\"broken,row\n",
        )
        .unwrap();
        fs::write(dir.path().join("ignored.txt"), "act now").unwrap();

        let lexicon = Lexicon::from_json(r#"{"categories": {"urgency": ["act now", "urgent"]}}"#)
            .unwrap();
        let policy = SignalPolicy::default();
        let analyzer = EmailAnalyzer::new(EmailDirectory::new(dir.path(), vec![]));

        let results = analyzer.analyze(&Matcher::new(&lexicon, &policy)).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].count(&Category::new("urgency")), 2);
        assert_eq!(results[0].metadata["subject"], "Urgent");
        assert!(results[1].is_error());
        assert!(results[1].metadata.is_empty());
    }
}
