//! Tree descriptor parsing
//!
//! A descriptor lists one entry per line:
//!
//! ```text
//! <RFC3339 timestamp> <octal mode> <path> [content]
//! ```
//!
//! Fields are separated by runs of spaces or tabs. A path ending in `/` is a
//! directory. The path and the content may be double-quoted, in which case
//! `\t`, `\n`, `\"`, `\\`, `\xNN`, `\uNNNN` and `\UNNNNNNNN` escapes are
//! decoded. Unquoted content runs verbatim to the end of the line.
//!
//! Parsing happens in two phases: a cursor splits a line into raw fields
//! honoring quote boundaries, then [`unescape`] decodes quoted fields.

use crate::error::{EscapeSeq, ParseError, ParseErrorKind};
use crate::node::{is_separator, Node};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::BufRead;
use std::path::Path;
use tracing::debug;

/// Largest mode accepted in a descriptor
pub const MAX_MODE: u32 = 0o7777;

/// Parses a descriptor held in memory
pub fn parse_str(text: &str) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if let Some(node) = parse_numbered_line(idx + 1, line)? {
            nodes.push(node);
        }
    }
    debug!("Parsed {} nodes from descriptor", nodes.len());
    Ok(nodes)
}

/// Parses a descriptor read line by line from `reader`
pub fn parse_reader<R: BufRead>(reader: R) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if let Some(node) = parse_numbered_line(idx + 1, &line)? {
            nodes.push(node);
        }
    }
    debug!("Parsed {} nodes from descriptor stream", nodes.len());
    Ok(nodes)
}

/// Parses a descriptor file
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<Node>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| Error::fs(path, e))?;
    parse_str(&text)
}

fn parse_numbered_line(line: usize, text: &str) -> std::result::Result<Option<Node>, ParseError> {
    parse_line(text).map_err(|kind| ParseError {
        line,
        text: text.to_string(),
        kind,
    })
}

/// Parses a single line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> std::result::Result<Option<Node>, ParseErrorKind> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let mut cursor = Cursor::new(line);
    let timestamp = cursor
        .bare()
        .ok_or(ParseErrorKind::MissingField("timestamp"))?;
    let mode = cursor.bare().ok_or(ParseErrorKind::MissingField("mode"))?;
    let path = cursor.path()?.ok_or(ParseErrorKind::MissingField("path"))?;
    let content = cursor.content()?;

    let time = DateTime::parse_from_rfc3339(timestamp)
        .map_err(ParseErrorKind::Timestamp)?
        .with_timezone(&Utc);
    let mode = parse_mode(mode)?;

    let path = String::from_utf8(path.decode()?).map_err(|_| ParseErrorKind::NonUtf8Path)?;
    if path.trim_end_matches(is_separator).is_empty() {
        return Err(ParseErrorKind::EmptyPath);
    }

    let content = match content {
        Some(field) => field.decode()?,
        None => Vec::new(),
    };

    let mut node = Node::file(path, mode, time, content);
    if node.is_dir() {
        node.content.clear();
    }
    Ok(Some(node))
}

/// Parses an octal permission string such as `0750`
pub fn parse_mode(text: &str) -> std::result::Result<u32, ParseErrorKind> {
    if text.is_empty() || !text.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
        return Err(ParseErrorKind::NotOctal(text.to_string()));
    }
    let mode = u32::from_str_radix(text, 8).map_err(ParseErrorKind::Mode)?;
    if mode > MAX_MODE {
        return Err(ParseErrorKind::ModeRange(mode));
    }
    Ok(mode)
}

/// A raw field as split from the line, before escape decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field<'a> {
    Bare(&'a str),
    Quoted(&'a str),
}

impl Field<'_> {
    fn decode(self) -> std::result::Result<Vec<u8>, ParseErrorKind> {
        match self {
            Field::Bare(text) => Ok(text.as_bytes().to_vec()),
            Field::Quoted(text) => unescape(text),
        }
    }
}

fn is_field_separator(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Splits a trimmed line into fields
struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    fn skip_separators(&mut self) {
        self.rest = self.rest.trim_start_matches(is_field_separator);
    }

    /// Next whitespace-delimited token
    fn bare(&mut self) -> Option<&'a str> {
        self.skip_separators();
        if self.rest.is_empty() {
            return None;
        }
        let end = self.rest.find(is_field_separator).unwrap_or(self.rest.len());
        let (token, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(token)
    }

    /// Body of a quoted string, without the quotes. `rest` must start at `"`.
    fn quoted(&mut self) -> std::result::Result<&'a str, ParseErrorKind> {
        let body = &self.rest[1..];
        let mut escaped = false;
        for (i, c) in body.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            match c {
                '\\' => escaped = true,
                '"' => {
                    self.rest = &body[i + 1..];
                    return Ok(&body[..i]);
                }
                _ => {}
            }
        }
        Err(ParseErrorKind::UnterminatedQuote)
    }

    fn path(&mut self) -> std::result::Result<Option<Field<'a>>, ParseErrorKind> {
        self.skip_separators();
        if self.rest.starts_with('"') {
            let body = self.quoted()?;
            if !self.rest.is_empty() && !self.rest.starts_with(is_field_separator) {
                return Err(ParseErrorKind::Trailing("path"));
            }
            return Ok(Some(Field::Quoted(body)));
        }
        Ok(self.bare().map(Field::Bare))
    }

    /// Everything left on the line, quoted or verbatim
    fn content(&mut self) -> std::result::Result<Option<Field<'a>>, ParseErrorKind> {
        self.skip_separators();
        if self.rest.is_empty() {
            return Ok(None);
        }
        if self.rest.starts_with('"') {
            let body = self.quoted()?;
            if !self.rest.is_empty() {
                return Err(ParseErrorKind::Trailing("content"));
            }
            return Ok(Some(Field::Quoted(body)));
        }
        let rest = self.rest;
        self.rest = "";
        Ok(Some(Field::Bare(rest)))
    }
}

/// Decodes the escape sequences of a quoted field body
pub fn unescape(text: &str) -> std::result::Result<Vec<u8>, ParseErrorKind> {
    let mut out = Vec::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            push_char(&mut out, c);
            continue;
        }
        let Some(esc) = chars.next() else {
            return Err(ParseErrorKind::Escape(EscapeSeq(String::new())));
        };
        match esc {
            'n' => out.push(b'\n'),
            't' => out.push(b'\t'),
            'r' => out.push(b'\r'),
            'a' => out.push(0x07),
            'b' => out.push(0x08),
            'f' => out.push(0x0c),
            'v' => out.push(0x0b),
            '\\' => out.push(b'\\'),
            '"' => out.push(b'"'),
            '\'' => out.push(b'\''),
            'x' => {
                let digits = take_hex(&mut chars, 2, esc)?;
                out.push(digits as u8);
            }
            'u' | 'U' => {
                let width = if esc == 'u' { 4 } else { 8 };
                let code = take_hex(&mut chars, width, esc)?;
                let decoded = char::from_u32(code)
                    .ok_or_else(|| ParseErrorKind::Escape(EscapeSeq(format!("{esc}{code:x}"))))?;
                push_char(&mut out, decoded);
            }
            other => return Err(ParseErrorKind::Escape(EscapeSeq(other.to_string()))),
        }
    }

    Ok(out)
}

fn take_hex(
    chars: &mut std::str::Chars<'_>,
    width: usize,
    esc: char,
) -> std::result::Result<u32, ParseErrorKind> {
    let digits: String = chars.by_ref().take(width).collect();
    if digits.len() != width || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ParseErrorKind::Escape(EscapeSeq(format!("{esc}{digits}"))));
    }
    u32::from_str_radix(&digits, 16)
        .map_err(|_| ParseErrorKind::Escape(EscapeSeq(format!("{esc}{digits}"))))
}

fn push_char(out: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

/// Renders a path field, quoting it only when it would not survive as a bare token
pub fn render_path(path: &str) -> String {
    let needs_quotes = path.is_empty()
        || path.starts_with('"')
        || path.chars().any(|c| c.is_whitespace() || c.is_control());
    if needs_quotes {
        quote(path.as_bytes())
    } else {
        path.to_string()
    }
}

/// Renders a content field, quoting it unless it reads back verbatim
pub fn render_content(content: &[u8]) -> String {
    match std::str::from_utf8(content) {
        Ok(text)
            if !text.starts_with('"')
                && text.trim() == text
                && !text.chars().any(|c| c.is_control()) =>
        {
            text.to_string()
        }
        _ => quote(content),
    }
}

/// Wraps bytes in double quotes, escaping anything `unescape` would decode
pub fn quote(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');

    let mut rest = bytes;
    while !rest.is_empty() {
        match std::str::from_utf8(rest) {
            Ok(text) => {
                push_escaped(&mut out, text);
                break;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                if let Ok(text) = std::str::from_utf8(valid) {
                    push_escaped(&mut out, text);
                }
                let bad = e.error_len().unwrap_or(after.len());
                for byte in &after[..bad] {
                    out.push_str(&format!("\\x{byte:02x}"));
                }
                rest = &after[bad..];
            }
        }
    }

    out.push('"');
    out
}

fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 1, 1, 1).unwrap()
    }

    #[test]
    fn test_unquoted_content_runs_to_end_of_line() {
        let node = parse_line(
            "2001-01-01T01:01:01Z 0700 d.txt No need to quote a single line without tabs",
        )
        .unwrap()
        .unwrap();

        assert_eq!(node.path, "d.txt");
        assert_eq!(node.mode, 0o700);
        assert_eq!(node.time, utc(2001, 1, 1));
        assert_eq!(node.content, b"No need to quote a single line without tabs");
    }

    #[test]
    fn test_quoted_directory_path() {
        let node = parse_line("2002-01-01T01:01:01Z\t0700\t\"has\\ttab/\"")
            .unwrap()
            .unwrap();

        assert!(node.is_dir());
        assert_eq!(node.rel_path(), Path::new("has\ttab"));
        assert!(node.content.is_empty());
    }

    #[test]
    fn test_quoted_content_escapes() {
        let node = parse_line(
            "2001-01-01T01:01:01Z\t0700\tc.txt\t\"This is a two line\\nfile with\\ta tab\\n\"",
        )
        .unwrap()
        .unwrap();

        assert_eq!(node.content, b"This is a two line\nfile with\ta tab\n");
    }

    #[test]
    fn test_unicode_escape_takes_four_digits() {
        let node = parse_line("2002-01-01T01:01:01Z 0700 \"\\u10077heavy quoted\\u10078/\"")
            .unwrap()
            .unwrap();

        assert_eq!(node.path, "\u{1007}7heavy quoted\u{1007}8/");
    }

    #[test]
    fn test_missing_content_is_empty_file() {
        let node = parse_line("2001-01-01T01:01:01Z 0644 empty.txt")
            .unwrap()
            .unwrap();

        assert!(!node.is_dir());
        assert!(node.content.is_empty());
    }

    #[test]
    fn test_blank_lines_skipped() {
        assert!(parse_line("").unwrap().is_none());
        assert!(parse_line(" \t  ").unwrap().is_none());
    }

    #[test]
    fn test_nanosecond_timestamp() {
        let node = parse_line("2001-01-01T01:01:01.123456789Z 0700 a")
            .unwrap()
            .unwrap();
        assert_eq!(node.time.timestamp_subsec_nanos(), 123_456_789);
    }

    #[test]
    fn test_offset_timestamp_normalized_to_utc() {
        let node = parse_line("2001-01-01T03:01:01+02:00 0700 a")
            .unwrap()
            .unwrap();
        assert_eq!(node.time, utc(2001, 1, 1));
    }

    #[test]
    fn test_bad_fields() {
        assert!(matches!(
            parse_line("yesterday 0700 a"),
            Err(ParseErrorKind::Timestamp(_))
        ));
        assert!(matches!(
            parse_line("2001-01-01T01:01:01Z 0789 a"),
            Err(ParseErrorKind::NotOctal(_))
        ));
        assert!(matches!(
            parse_line("2001-01-01T01:01:01Z +700 a"),
            Err(ParseErrorKind::NotOctal(text)) if text == "+700"
        ));
        assert!(matches!(
            parse_line("2001-01-01T01:01:01Z 00000000000000000000000700 a"),
            Ok(Some(_))
        ));
        assert!(matches!(
            parse_line("2001-01-01T01:01:01Z 777777777777 a"),
            Err(ParseErrorKind::Mode(_))
        ));
        assert!(matches!(
            parse_line("2001-01-01T01:01:01Z 17777 a"),
            Err(ParseErrorKind::ModeRange(0o17777))
        ));
        assert!(matches!(
            parse_line("2001-01-01T01:01:01Z 0700"),
            Err(ParseErrorKind::MissingField("path"))
        ));
        assert!(matches!(
            parse_line("2001-01-01T01:01:01Z 0700 \"open"),
            Err(ParseErrorKind::UnterminatedQuote)
        ));
        assert!(matches!(
            parse_line("2001-01-01T01:01:01Z 0700 a \"body\" tail"),
            Err(ParseErrorKind::Trailing("content"))
        ));
        assert!(matches!(
            parse_line("2001-01-01T01:01:01Z 0700 a \"\\q\""),
            Err(ParseErrorKind::Escape(_))
        ));
        assert!(matches!(
            parse_line("2001-01-01T01:01:01Z 0700 \"\""),
            Err(ParseErrorKind::EmptyPath)
        ));
    }

    #[test]
    fn test_parse_error_carries_line() {
        let text = "\n  2001-01-01T01:01:01Z 0700 ok\n  not-a-time 0700 bad\n";
        let err = parse_str(text).unwrap_err();
        match err {
            Error::Parse(e) => {
                assert_eq!(e.line, 3);
                assert_eq!(e.text, "  not-a-time 0700 bad");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_order_preserved() {
        let text = "
            2001-01-01T01:01:01Z 0700 b/c.txt
            2001-01-01T01:01:01Z 0700 a/
            2001-01-01T01:01:01Z 0700 b/
        ";
        let paths: Vec<_> = parse_str(text)
            .unwrap()
            .into_iter()
            .map(|n| n.path)
            .collect();
        assert_eq!(paths, ["b/c.txt", "a/", "b/"]);
    }

    #[test]
    fn test_rendered_node_parses_back() {
        let nodes = [
            Node::file("plain.txt", 0o644, utc(2001, 1, 1), "one line"),
            Node::file("sp ace.txt", 0o600, utc(2002, 1, 1), " padded \"text\" "),
            Node::file("bin", 0o755, utc(2003, 1, 1), vec![0u8, 0xff, b'\n']),
            Node::dir("has\ttab", 0o700, utc(2004, 1, 1)),
        ];
        for node in nodes {
            let parsed = parse_line(&node.to_string()).unwrap().unwrap();
            assert_eq!(parsed, node);
        }
    }
}
