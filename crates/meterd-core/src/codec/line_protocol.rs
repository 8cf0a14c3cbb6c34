//! Line protocol codec.
//!
//! One record per line:
//!
//! ```text
//! measurement[,tag=value...] field=value[,field=value...] [timestamp_ns]\n
//! ```
//!
//! Field values: `1.5` float, `3i` integer, `3u` unsigned, `t`/`true`/`f`/
//! `false` boolean, `"text"` string. Commas, spaces, `=` and backslashes
//! inside names, keys and tag values are escaped with a backslash; string
//! fields escape `"` and `\`. Newlines, carriage returns and tabs are
//! written as `\n`, `\r` and `\t` everywhere, so a record never spans
//! lines. A measurement name starting with `#` is written as `\#`. A missing
//! timestamp means "now". Blank lines and `#` comments are skipped.
//!
//! Lines longer than the configured maximum are discarded up to the next
//! newline and reported once as malformed.

use std::fmt::Write as _;

use bytes::{Buf, BytesMut};
use chrono::{DateTime, Utc};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use super::{CodecError, Decoded, ParseError};
use crate::sample::{FieldValue, Sample};

/// Default upper bound on one encoded record, newline excluded.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024 * 1024;

/// How much of an oversized line is kept for the malformed report.
const PREVIEW_LEN: usize = 64;

const MEASUREMENT_SPECIALS: &[char] = &[',', ' ', '\\'];
const NAME_UNESCAPES: &[char] = &[',', ' ', '\\', '#'];
const KEY_SPECIALS: &[char] = &[',', '=', ' ', '\\'];
const STRING_SPECIALS: &[char] = &['"', '\\'];

/// Newline-delimited line protocol codec.
///
/// The decoder keeps the scan offset of a partially received line, so a
/// fresh instance should be used per stream (cloning an unused codec is
/// fine).
#[derive(Debug, Clone)]
pub struct LineProtocol {
    next_index: usize,
    max_line_length: usize,
    discarding: bool,
}

impl Default for LineProtocol {
    fn default() -> Self {
        Self::with_max_line_length(DEFAULT_MAX_LINE_LENGTH)
    }
}

impl LineProtocol {
    pub fn new() -> Self {
        Self::default()
    }

    /// A codec that rejects records longer than `max_line_length` bytes in
    /// either direction.
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            next_index: 0,
            max_line_length,
            discarding: false,
        }
    }

    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    /// Serialize one sample, including the trailing newline.
    pub fn to_line(sample: &Sample) -> Result<String, CodecError> {
        let mut line = String::new();
        write_sample(&mut line, sample)?;
        Ok(line)
    }

    /// Parse a single line (without its newline).
    pub fn parse_line(line: &str) -> Result<Sample, ParseError> {
        parse_line(line.trim(), Utc::now()).map_err(|reason| ParseError::new(line, reason))
    }

    fn oversized(&self, line: &[u8]) -> Decoded {
        let preview = &line[..line.len().min(PREVIEW_LEN)];
        Decoded::Malformed(ParseError::new(
            format!("{}...", String::from_utf8_lossy(preview)),
            format!("line exceeds {} bytes", self.max_line_length),
        ))
    }
}

impl Decoder for LineProtocol {
    type Item = Decoded;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Decoded>, CodecError> {
        loop {
            let newline = src[self.next_index..].iter().position(|b| *b == b'\n');

            if self.discarding {
                match newline {
                    Some(offset) => {
                        src.advance(self.next_index + offset + 1);
                        self.next_index = 0;
                        self.discarding = false;
                        continue;
                    }
                    None => {
                        src.clear();
                        self.next_index = 0;
                        return Ok(None);
                    }
                }
            }

            let Some(offset) = newline else {
                if src.len() > self.max_line_length {
                    let report = self.oversized(src);
                    src.clear();
                    self.next_index = 0;
                    self.discarding = true;
                    return Ok(Some(report));
                }
                self.next_index = src.len();
                return Ok(None);
            };
            let end = self.next_index + offset;
            self.next_index = 0;
            let line = src.split_to(end + 1);
            if end > self.max_line_length {
                return Ok(Some(self.oversized(&line)));
            }
            if let Some(decoded) = decode_line(&line[..end]) {
                return Ok(Some(decoded));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Decoded>, CodecError> {
        if let Some(decoded) = self.decode(src)? {
            return Ok(Some(decoded));
        }
        self.next_index = 0;
        if self.discarding {
            self.discarding = false;
            src.clear();
            return Ok(None);
        }
        if src.is_empty() {
            return Ok(None);
        }
        // Final record without a trailing newline.
        let line = src.split_to(src.len());
        Ok(decode_line(&line))
    }
}

impl Encoder<Sample> for LineProtocol {
    type Error = CodecError;

    fn encode(&mut self, item: Sample, dst: &mut BytesMut) -> Result<(), CodecError> {
        let mut line = String::new();
        write_sample(&mut line, &item)?;
        // The newline does not count toward the limit.
        if line.len() - 1 > self.max_line_length {
            return Err(CodecError::Encode(format!(
                "sample {:?} encodes to {} bytes, limit is {}",
                item.name(),
                line.len() - 1,
                self.max_line_length
            )));
        }
        dst.extend_from_slice(line.as_bytes());
        Ok(())
    }
}

/// Decode one raw line. Returns `None` for lines that carry no record.
fn decode_line(raw: &[u8]) -> Option<Decoded> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text,
        Err(_) => {
            return Some(Decoded::Malformed(ParseError::new(
                String::from_utf8_lossy(raw),
                "invalid UTF-8",
            )));
        }
    };

    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    Some(match parse_line(trimmed, Utc::now()) {
        Ok(sample) => Decoded::Sample(sample),
        Err(reason) => Decoded::Malformed(ParseError::new(trimmed, reason)),
    })
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn parse_line(line: &str, now: DateTime<Utc>) -> Result<Sample, String> {
    let (series, rest) = take_section(line, false)?;
    let rest = rest.ok_or("missing field set")?;
    let (field_set, rest) = take_section(rest, true)?;

    let timestamp = match rest.map(str::trim) {
        None | Some("") => now,
        Some(raw) => {
            let nanos: i64 = raw
                .parse()
                .map_err(|_| format!("invalid timestamp {raw:?}"))?;
            DateTime::from_timestamp_nanos(nanos)
        }
    };

    let mut parts = split_unescaped(series, b',', false)?.into_iter();
    let name = parts.next().map(|n| unescape(n, NAME_UNESCAPES)).unwrap_or_default();
    if name.is_empty() {
        return Err("missing measurement name".to_string());
    }

    let mut sample = Sample::new(name, timestamp);
    for part in parts {
        let (key, value) = split_pair(part).ok_or_else(|| format!("tag {part:?} has no '='"))?;
        if key.is_empty() || value.is_empty() {
            return Err(format!("empty tag key or value in {part:?}"));
        }
        sample.add_tag(unescape(key, KEY_SPECIALS), unescape(value, KEY_SPECIALS));
    }

    if field_set.is_empty() {
        return Err("missing field set".to_string());
    }
    for part in split_unescaped(field_set, b',', true)? {
        let (key, raw) = split_pair(part).ok_or_else(|| format!("field {part:?} has no '='"))?;
        if key.is_empty() {
            return Err(format!("empty field key in {part:?}"));
        }
        sample.add_field(unescape(key, KEY_SPECIALS), parse_value(raw)?);
    }

    Ok(sample)
}

/// Split off the next space-delimited section. `quoted` makes spaces inside
/// double quotes part of the section (only the field set uses quotes).
fn take_section(s: &str, quoted: bool) -> Result<(&str, Option<&str>), String> {
    let bytes = s.as_bytes();
    let mut in_quotes = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'"' if quoted => in_quotes = !in_quotes,
            b' ' if !in_quotes => return Ok((&s[..i], Some(&s[i + 1..]))),
            _ => {}
        }
        i += 1;
    }
    if in_quotes {
        return Err("unterminated string field".to_string());
    }
    Ok((s, None))
}

fn split_unescaped(s: &str, sep: u8, quoted: bool) -> Result<Vec<&str>, String> {
    let bytes = s.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'"' if quoted => in_quotes = !in_quotes,
            b if b == sep && !in_quotes => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if in_quotes {
        return Err("unterminated string field".to_string());
    }
    parts.push(&s[start..]);
    Ok(parts)
}

/// Split `key=value` at the first unescaped `=`.
fn split_pair(s: &str) -> Option<(&str, &str)> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'=' => return Some((&s[..i], &s[i + 1..])),
            _ => i += 1,
        }
    }
    None
}

fn parse_value(raw: &str) -> Result<FieldValue, String> {
    if let Some(inner) = raw.strip_prefix('"') {
        let inner = inner
            .strip_suffix('"')
            .ok_or_else(|| format!("unterminated string value {raw:?}"))?;
        return Ok(FieldValue::String(unescape(inner, STRING_SPECIALS)));
    }
    if let Some(digits) = raw.strip_suffix('i') {
        return digits
            .parse()
            .map(FieldValue::Integer)
            .map_err(|_| format!("invalid integer value {raw:?}"));
    }
    if let Some(digits) = raw.strip_suffix('u') {
        return digits
            .parse()
            .map(FieldValue::Unsigned)
            .map_err(|_| format!("invalid unsigned value {raw:?}"));
    }
    match raw {
        "t" | "T" | "true" | "True" | "TRUE" => return Ok(FieldValue::Boolean(true)),
        "f" | "F" | "false" | "False" | "FALSE" => return Ok(FieldValue::Boolean(false)),
        _ => {}
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(FieldValue::Float(v)),
        _ => Err(format!("invalid field value {raw:?}")),
    }
}

fn unescape(s: &str, specials: &[char]) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            let unescaped = match chars.peek() {
                Some('n') => Some('\n'),
                Some('r') => Some('\r'),
                Some('t') => Some('\t'),
                Some(&next) if specials.contains(&next) => Some(next),
                _ => None,
            };
            if let Some(u) = unescaped {
                out.push(u);
                chars.next();
                continue;
            }
        }
        out.push(c);
    }
    out
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

fn write_sample(out: &mut String, sample: &Sample) -> Result<(), CodecError> {
    if sample.name().is_empty() {
        return Err(CodecError::Encode("sample has no name".to_string()));
    }
    if sample.fields().is_empty() {
        return Err(CodecError::Encode(format!(
            "sample {:?} has no fields",
            sample.name()
        )));
    }
    let nanos = sample.timestamp().timestamp_nanos_opt().ok_or_else(|| {
        CodecError::Encode(format!(
            "timestamp of sample {:?} is out of range",
            sample.name()
        ))
    })?;

    // A leading '#' would read back as a comment line.
    if sample.name().starts_with('#') {
        out.push('\\');
    }
    escape_into(out, sample.name(), MEASUREMENT_SPECIALS);
    for (key, value) in sample.tags() {
        if key.is_empty() || value.is_empty() {
            debug!(
                sample = sample.name(),
                tag = key.as_str(),
                "dropping tag with empty key or value"
            );
            continue;
        }
        out.push(',');
        escape_into(out, key, KEY_SPECIALS);
        out.push('=');
        escape_into(out, value, KEY_SPECIALS);
    }

    out.push(' ');
    for (i, (key, value)) in sample.fields().iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        escape_into(out, key, KEY_SPECIALS);
        out.push('=');
        match value {
            FieldValue::Float(v) if !v.is_finite() => {
                return Err(CodecError::Encode(format!(
                    "field {key:?} of sample {:?} is not finite",
                    sample.name()
                )));
            }
            FieldValue::String(v) => {
                out.push('"');
                escape_into(out, v, STRING_SPECIALS);
                out.push('"');
            }
            other => {
                let _ = write!(out, "{other}");
            }
        }
    }

    let _ = writeln!(out, " {nanos}");
    Ok(())
}

fn escape_into(out: &mut String, s: &str, specials: &[char]) {
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if specials.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(nanos: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(nanos)
    }

    fn decode_all(input: &[u8]) -> Vec<Decoded> {
        let mut codec = LineProtocol::new();
        let mut buf = BytesMut::from(input);
        let mut out = Vec::new();
        while let Some(item) = codec.decode(&mut buf).unwrap() {
            out.push(item);
        }
        while let Some(item) = codec.decode_eof(&mut buf).unwrap() {
            out.push(item);
        }
        out
    }

    #[test]
    fn serialize_sorted_tags_and_typed_fields() {
        let sample = Sample::new("weather", ts(1_000))
            .with_tag("city", "Toronto")
            .with_tag("country", "CA")
            .with_field("count", 1i64)
            .with_field("temp", 21.5)
            .with_field("ok", true)
            .with_field("hits", 7u64)
            .with_field("note", "say \"hi\"");

        let line = LineProtocol::to_line(&sample).unwrap();
        assert_eq!(
            line,
            "weather,city=Toronto,country=CA count=1i,hits=7u,note=\"say \\\"hi\\\"\",ok=true,temp=21.5 1000\n"
        );
    }

    #[test]
    fn serialize_escapes_names_and_keys() {
        let sample = Sample::new("disk usage", ts(5))
            .with_tag("path", "/var,log")
            .with_field("used=pct", 0.25);
        let line = LineProtocol::to_line(&sample).unwrap();
        assert_eq!(line, "disk\\ usage,path=/var\\,log used\\=pct=0.25 5\n");

        let parsed = LineProtocol::parse_line(line.trim_end()).unwrap();
        assert_eq!(parsed, sample);
    }

    #[test]
    fn serialize_rejects_sample_without_fields() {
        let sample = Sample::new("empty", ts(1));
        assert!(matches!(
            LineProtocol::to_line(&sample),
            Err(CodecError::Encode(_))
        ));
    }

    #[test]
    fn serialize_rejects_non_finite_float() {
        let sample = Sample::new("m", ts(1)).with_field("v", f64::NAN);
        assert!(LineProtocol::to_line(&sample).is_err());
    }

    #[test]
    fn parse_full_line() {
        let sample =
            LineProtocol::parse_line("test,city=Toronto count=2i,ratio=0.5,name=\"a b\" 42")
                .unwrap();
        assert_eq!(sample.name(), "test");
        assert_eq!(sample.tag("city"), Some("Toronto"));
        assert_eq!(sample.field("count"), Some(&FieldValue::Integer(2)));
        assert_eq!(sample.field("ratio"), Some(&FieldValue::Float(0.5)));
        assert_eq!(sample.field("name"), Some(&FieldValue::String("a b".into())));
        assert_eq!(sample.timestamp(), ts(42));
    }

    #[test]
    fn parse_without_timestamp_uses_now() {
        let before = Utc::now();
        let sample = LineProtocol::parse_line("m v=1").unwrap();
        assert!(sample.timestamp() >= before);
        assert_eq!(sample.field("v"), Some(&FieldValue::Float(1.0)));
    }

    #[test]
    fn parse_booleans() {
        let sample = LineProtocol::parse_line("m a=t,b=FALSE,c=True 1").unwrap();
        assert_eq!(sample.field("a"), Some(&FieldValue::Boolean(true)));
        assert_eq!(sample.field("b"), Some(&FieldValue::Boolean(false)));
        assert_eq!(sample.field("c"), Some(&FieldValue::Boolean(true)));
    }

    #[test]
    fn parse_rejects_malformed_lines() {
        for line in [
            "no_fields",
            "m ",
            "m v=",
            "m v=abc",
            "m v=1i 12x",
            "m,tag v=1",
            "m s=\"open",
            ",t=1 v=1",
            "m v=1 1 2",
            "m v=inf",
        ] {
            assert!(
                LineProtocol::parse_line(line).is_err(),
                "expected {line:?} to be rejected"
            );
        }
    }

    #[test]
    fn decode_waits_for_newline() {
        let mut codec = LineProtocol::new();
        let mut buf = BytesMut::from(&b"cpu usage=0."[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"5 10\nmem");
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        let Decoded::Sample(sample) = decoded else {
            panic!("expected a sample, got {decoded:?}");
        };
        assert_eq!(sample.field("usage"), Some(&FieldValue::Float(0.5)));
        assert_eq!(&buf[..], b"mem");
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn decode_reports_malformed_and_continues() {
        let items = decode_all(b"garbage\nm v=1i 1\n");
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], Decoded::Malformed(e) if e.line == "garbage"));
        assert!(matches!(&items[1], Decoded::Sample(s) if s.name() == "m"));
    }

    #[test]
    fn decode_skips_blank_lines_and_comments() {
        let items = decode_all(b"\n# comment\r\n  \nm v=1i 1\r\n");
        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], Decoded::Sample(s) if s.field("v") == Some(&FieldValue::Integer(1))));
    }

    #[test]
    fn decode_eof_handles_unterminated_final_line() {
        let items = decode_all(b"a v=1i 1\nb v=2i 2");
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[1], Decoded::Sample(s) if s.name() == "b"));
    }

    #[test]
    fn decode_flags_invalid_utf8() {
        let items = decode_all(b"m v=\xff\n");
        assert!(matches!(&items[0], Decoded::Malformed(e) if e.reason == "invalid UTF-8"));
    }

    #[test]
    fn encoder_appends_to_buffer() {
        let mut codec = LineProtocol::new();
        let mut buf = BytesMut::new();
        codec
            .encode(Sample::new("a", ts(1)).with_field("v", 1i64), &mut buf)
            .unwrap();
        codec
            .encode(Sample::new("b", ts(2)).with_field("v", 2i64), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"a v=1i 1\nb v=2i 2\n");
    }

    fn round_trip(sample: &Sample) -> Vec<Decoded> {
        let mut codec = LineProtocol::new();
        let mut buf = BytesMut::new();
        codec.encode(sample.clone(), &mut buf).unwrap();
        assert_eq!(buf.iter().filter(|b| **b == b'\n').count(), 1);
        assert_eq!(buf.last(), Some(&b'\n'));
        decode_all(&buf)
    }

    #[test]
    fn control_characters_stay_on_one_line() {
        let samples = [
            Sample::new("multi\nline", ts(1)).with_field("v", 1i64),
            Sample::new("m", ts(2)).with_tag("k\r\ney", "v").with_field("v", 1i64),
            Sample::new("m", ts(3)).with_tag("t", "x\ny").with_field("v", 1i64),
            Sample::new("m", ts(4)).with_field("fi\neld", 1i64),
            Sample::new("m", ts(5)).with_field("msg", "a\nb\r\n\tc"),
        ];
        for sample in &samples {
            assert_eq!(round_trip(sample), vec![Decoded::Sample(sample.clone())]);
        }
    }

    #[test]
    fn backslashes_round_trip() {
        let sample = Sample::new("C:\\new", ts(1))
            .with_tag("path", "a\\nb\\")
            .with_field("s", "\\n is not a newline");
        let line = LineProtocol::to_line(&sample).unwrap();
        assert_eq!(line.matches('\n').count(), 1);
        assert_eq!(round_trip(&sample), vec![Decoded::Sample(sample)]);
    }

    #[test]
    fn leading_hash_is_not_a_comment() {
        let sample = Sample::new("#hashtag", ts(1)).with_field("v", 1i64);
        let line = LineProtocol::to_line(&sample).unwrap();
        assert_eq!(line, "\\#hashtag v=1i 1\n");
        assert_eq!(round_trip(&sample), vec![Decoded::Sample(sample)]);

        let inner = Sample::new("a#b", ts(1)).with_field("v", 1i64);
        assert_eq!(LineProtocol::to_line(&inner).unwrap(), "a#b v=1i 1\n");
    }

    #[test]
    fn empty_tags_are_left_out() {
        let sample = Sample::new("m", ts(1))
            .with_tag("", "x")
            .with_tag("empty", "")
            .with_tag("host", "a")
            .with_field("v", 1i64);
        assert_eq!(LineProtocol::to_line(&sample).unwrap(), "m,host=a v=1i 1\n");
    }

    #[test]
    fn oversized_line_without_newline_is_reported_once_and_discarded() {
        let mut codec = LineProtocol::with_max_line_length(16);
        let mut buf = BytesMut::from(&[b'x'; 40][..]);

        let item = codec.decode(&mut buf).unwrap();
        assert!(
            matches!(&item, Some(Decoded::Malformed(e)) if e.reason.contains("16 bytes")),
            "got: {item:?}"
        );
        assert!(buf.is_empty());

        // Still inside the oversized line: dropped without another report.
        buf.extend_from_slice(&[b'y'; 100]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());

        buf.extend_from_slice(b"tail\nm v=1i 1\n");
        let item = codec.decode(&mut buf).unwrap();
        assert!(matches!(&item, Some(Decoded::Sample(s)) if s.name() == "m"), "got: {item:?}");
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn oversized_complete_line_is_malformed() {
        let mut codec = LineProtocol::with_max_line_length(16);
        let mut buf = BytesMut::from(&b"long_measurement_name v=1i 1\nm v=2i 2\n"[..]);
        assert!(matches!(codec.decode(&mut buf).unwrap(), Some(Decoded::Malformed(_))));
        assert!(matches!(codec.decode(&mut buf).unwrap(), Some(Decoded::Sample(_))));
    }

    #[test]
    fn buffered_bytes_stay_bounded() {
        let mut codec = LineProtocol::with_max_line_length(1024);
        let mut buf = BytesMut::new();
        let mut reports = 0;
        for _ in 0..64 {
            buf.extend_from_slice(&[b'z'; 512]);
            while let Some(item) = codec.decode(&mut buf).unwrap() {
                assert!(matches!(item, Decoded::Malformed(_)));
                reports += 1;
            }
            assert!(buf.len() <= 1024 + 512);
        }
        assert_eq!(reports, 1);
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn encoder_rejects_records_over_the_limit() {
        let mut codec = LineProtocol::with_max_line_length(16);
        let mut buf = BytesMut::new();
        let err = codec
            .encode(Sample::new("m", ts(1)).with_field("s", "x".repeat(32)), &mut buf)
            .unwrap_err();
        assert!(matches!(err, CodecError::Encode(_)));
        assert!(buf.is_empty());
        assert_eq!(LineProtocol::new().max_line_length(), DEFAULT_MAX_LINE_LENGTH);
    }
}
