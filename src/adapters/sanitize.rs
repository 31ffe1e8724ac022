//! Log sanitization for patient data and secrets.
//!
//! Formatted log lines pass through [`SanitizingMakeWriter`] before reaching
//! the sink. The patterns cover:
//! - Assessment ids (UUIDs)
//! - Record numbers and emails that may leak from input files
//! - Clinical attribute assignments such as `bmi=32.0` or `SleepTime: 6`
//! - Key material printed by the signing tool
//!
//! Assessment code never logs raw attribute values; this is a second line of
//! defence for values that arrive through error messages or third-party crates.
//!
//! Input is capped at [`SANITIZE_MAX_BYTES`] per line.

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

/// Maximum number of bytes sanitized per call; the rest is dropped.
pub const SANITIZE_MAX_BYTES: usize = 16 * 1024;

struct Rule {
    regex: Regex,
    replacement: &'static str,
}

struct Patterns {
    set: RegexSet,
    rules: Vec<Rule>,
}

// Patient attributes, under both their input and training column names.
const CLINICAL_FIELDS: &str = "bmi|physical_?health|mental_?health|sleep_?time|age_?category|\
sex|smoking|alcohol_?drinking|stroke|diff_?walking|asthma|kidney_?disease|skin_?cancer|\
physical_?activity|diabetic|gen_?health";

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }
    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| {
        let clinical = format!(
            r#"(?i)\b(?:{CLINICAL_FIELDS})\b["']?\s*[:=]\s*(?:"[^"]{{0,40}}"|[^\s,;}})]{{1,40}})"#
        );
        let rules: Vec<(String, &'static str)> = vec![
            (
                r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}"
                    .into(),
                "[REDACTED-ID]",
            ),
            (r"\b\d{3}-\d{2}-\d{4}\b".into(), "[REDACTED-SSN]"),
            (r"\bMRN[:\s]?\d{6,10}\b".into(), "[REDACTED-MRN]"),
            (
                r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b"
                    .into(),
                "[REDACTED-EMAIL]",
            ),
            (clinical, "[REDACTED-CLINICAL]"),
            (
                r"(?i)\b(?:secret|private[_-]?key|seed|signing[_-]?key)\b\s*[:=]\s*[A-Za-z0-9+/]{32,}={0,2}"
                    .into(),
                "[REDACTED-SECRET]",
            ),
        ];

        let set = RegexSet::new(rules.iter().map(|(p, _)| p.as_str())).expect("Valid regex set");
        let rules = rules
            .into_iter()
            .map(|(pattern, replacement)| Rule {
                regex: Regex::new(&pattern).expect("Valid regex"),
                replacement,
            })
            .collect();
        Patterns { set, rules }
    })
}

/// Replace every sensitive match in `input`.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, SANITIZE_MAX_BYTES)
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let patterns = patterns();
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    let mut result = prefix.to_string();
    for idx in patterns.set.matches(prefix).into_iter() {
        let rule = &patterns.rules[idx];
        result = rule.regex.replace_all(&result, rule.replacement).into_owned();
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// Whether `input` contains anything [`sanitize`] would redact.
#[must_use]
pub fn contains_sensitive(input: &str) -> bool {
    let (prefix, _) = truncate_to_char_boundary(input, SANITIZE_MAX_BYTES);
    patterns().set.is_match(prefix)
}

/// A `tracing_subscriber` writer that sanitizes each formatted line before
/// handing it to the inner writer.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

pub struct SanitizingWriter<W> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W: std::io::Write> SanitizingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
        }
    }

    fn write_sanitized(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let text = String::from_utf8_lossy(bytes);
        self.inner.write_all(sanitize(&text).as_bytes())
    }

    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.write_sanitized(&line)?;
        }
        Ok(())
    }
}

impl<W: std::io::Write> std::io::Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // A single line larger than the cap is emitted truncated.
        if self.buffer.len() > SANITIZE_MAX_BYTES * 2 {
            let pending = std::mem::take(&mut self.buffer);
            self.write_sanitized(&pending)?;
            self.inner.write_all(b"\n")?;
            return Ok(buf.len());
        }

        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;
        if !self.buffer.is_empty() {
            let pending = std::mem::take(&mut self.buffer);
            self.write_sanitized(&pending)?;
        }
        self.inner.flush()
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter::new(self.inner.make_writer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_sanitize_assessment_id() {
        let sanitized = sanitize("Assessment 550e8400-e29b-41d4-a716-446655440000 completed");
        assert!(sanitized.contains("[REDACTED-ID]"));
        assert!(!sanitized.contains("550e8400"));
    }

    #[test]
    fn test_sanitize_clinical_assignments() {
        for input in [
            "bmi=32.0 rejected",
            "BMI: 32.0",
            "\"sleep_time\": 6,",
            "PhysicalHealth=20",
            "gen_health=\"Very good\"",
            "age_category: 80 or older",
        ] {
            let sanitized = sanitize(input);
            assert!(sanitized.contains("[REDACTED-CLINICAL]"), "{input:?} -> {sanitized:?}");
        }
        let sanitized = sanitize("{\"bmi\": 32.0, \"sex\": \"Male\"}");
        assert!(!sanitized.contains("32.0"));
        assert!(!sanitized.contains("Male"));
    }

    #[test]
    fn test_field_names_alone_are_kept() {
        let input = "Validation failed for field bmi";
        assert_eq!(sanitize(input), input);
        assert!(!contains_sensitive("Loaded artifacts: model=logistic_regression"));
    }

    #[test]
    fn test_sanitize_mrn_and_email() {
        assert!(sanitize("MRN:12345678 found").contains("[REDACTED-MRN]"));
        assert!(sanitize("Contact: patient@hospital.com").contains("[REDACTED-EMAIL]"));
        assert!(sanitize("SSN 123-45-6789").contains("[REDACTED-SSN]"));
    }

    #[test]
    fn test_sanitize_secret() {
        let sanitized = sanitize("seed=QWxhZGRpbjpvcGVuIHNlc2FtZSB3aXRoIGxvbmcgc2VjcmV0IHZhbHVl");
        assert!(sanitized.contains("[REDACTED-SECRET]"));
    }

    #[test]
    fn test_truncates_on_char_boundary() {
        let input = "é".repeat(20);
        let sanitized = sanitize_with_limit(&input, 7);
        assert!(sanitized.ends_with(" [TRUNCATED]"));
        assert!(sanitized.starts_with("ééé"));
    }

    #[test]
    fn test_writer_sanitizes_lines() {
        let mut sink = Vec::new();
        {
            let mut writer = SanitizingWriter::new(&mut sink);
            writer.write_all(b"first bmi=41.0\nsecond ").expect("write");
            writer.write_all(b"line\n").expect("write");
            writer.flush().expect("flush");
        }
        let out = String::from_utf8(sink).expect("utf8");
        assert_eq!(out, "first [REDACTED-CLINICAL]\nsecond line\n");
    }
}
