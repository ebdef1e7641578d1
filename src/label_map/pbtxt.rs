//! `label_map.pbtxt` reader and writer.
//!
//! The sidecar uses the protobuf text format of the TF Object Detection
//! API's `StringIntLabelMap`:
//!
//! ```text
//! item {
//!   name: "cat"
//!   id: 1
//! }
//! ```
//!
//! Only `item` blocks with `name` and `id` fields are understood;
//! `display_name` is accepted and ignored.

use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::iter::Peekable;
use std::path::Path;
use std::str::Chars;

use tempfile::NamedTempFile;

use super::{LabelId, LabelMap};
use crate::error::RecordError;

/// Renders the map in insertion order.
pub fn to_pbtxt_string(label_map: &LabelMap) -> String {
    let mut out = String::new();
    for (name, id) in label_map.iter() {
        writeln!(out, "item {{").expect("write to string");
        writeln!(out, "  name: \"{}\"", escape(name)).expect("write to string");
        writeln!(out, "  id: {id}").expect("write to string");
        writeln!(out, "}}").expect("write to string");
    }
    out
}

/// Writes the label map to `path`, replacing it atomically.
pub fn write_label_map(path: &Path, label_map: &LabelMap) -> Result<(), RecordError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let write_err = |source: std::io::Error| RecordError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(write_err)?;
    temp.write_all(to_pbtxt_string(label_map).as_bytes())
        .map_err(write_err)?;
    temp.as_file().sync_all().map_err(write_err)?;
    temp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Reads a label map written by [`write_label_map`] (or by the TF tooling).
///
/// Items must carry ids `1..=n` in file order.
pub fn read_label_map(path: &Path) -> Result<LabelMap, RecordError> {
    let text = fs::read_to_string(path).map_err(|source| RecordError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text, path)
}

/// Parses label map text.
pub fn from_pbtxt_str(text: &str) -> Result<LabelMap, RecordError> {
    parse(text, Path::new("<memory>"))
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_ascii_control() => {
                write!(out, "\\x{:02x}", c as u32).expect("write to string")
            }
            c => out.push(c),
        }
    }
    out
}

/// Resolves the escape sequence after a backslash.
fn unescape(chars: &mut Peekable<Chars<'_>>, path: &Path) -> Result<char, RecordError> {
    let escaped = chars
        .next()
        .ok_or_else(|| parse_err(path, "unterminated string"))?;
    Ok(match escaped {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'x' => {
            let mut code = 0u32;
            let mut digits = 0;
            while digits < 2 {
                match chars.peek().and_then(|d| d.to_digit(16)) {
                    Some(d) => {
                        code = code * 16 + d;
                        digits += 1;
                        chars.next();
                    }
                    None => break,
                }
            }
            if digits == 0 {
                return Err(parse_err(path, "\\x escape without hex digits"));
            }
            char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
        }
        other => other,
    })
}

#[derive(Debug, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Colon,
    Open,
    Close,
}

fn tokenize(text: &str, path: &Path) -> Result<Vec<Token>, RecordError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                // Comment until end of line.
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '{' => {
                chars.next();
                tokens.push(Token::Open);
            }
            '}' => {
                chars.next();
                tokens.push(Token::Close);
            }
            ':' => {
                chars.next();
                tokens.push(Token::Colon);
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => value.push(unescape(&mut chars, path)?),
                        Some(c) if c == quote => break,
                        Some(c) => value.push(c),
                        None => return Err(parse_err(path, "unterminated string")),
                    }
                }
                tokens.push(Token::Str(value));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut raw = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '-' {
                        raw.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = raw
                    .parse::<i64>()
                    .map_err(|_| parse_err(path, format!("invalid integer '{raw}'")))?;
                tokens.push(Token::Int(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(parse_err(path, format!("unexpected character '{other}'"))),
        }
    }

    Ok(tokens)
}

fn parse(text: &str, path: &Path) -> Result<LabelMap, RecordError> {
    let tokens = tokenize(text, path)?;
    let mut iter = tokens.into_iter();
    let mut label_map = LabelMap::new();

    while let Some(token) = iter.next() {
        match token {
            Token::Ident(ident) if ident == "item" => {}
            other => return Err(parse_err(path, format!("expected 'item', found {other:?}"))),
        }
        if iter.next() != Some(Token::Open) {
            return Err(parse_err(path, "expected '{' after 'item'"));
        }

        let mut name = None;
        let mut id = None;
        loop {
            let field = match iter.next() {
                Some(Token::Close) => break,
                Some(Token::Ident(field)) => field,
                other => {
                    return Err(parse_err(
                        path,
                        format!("expected field name, found {other:?}"),
                    ))
                }
            };
            if iter.next() != Some(Token::Colon) {
                return Err(parse_err(path, format!("expected ':' after '{field}'")));
            }
            match (field.as_str(), iter.next()) {
                ("name", Some(Token::Str(value))) => name = Some(value),
                ("id", Some(Token::Int(value))) => id = Some(value),
                ("display_name", Some(Token::Str(_))) => {}
                (field, value) => {
                    return Err(parse_err(
                        path,
                        format!("unexpected value {value:?} for field '{field}'"),
                    ))
                }
            }
        }

        let name = name.ok_or_else(|| parse_err(path, "item without name"))?;
        let id = id.ok_or_else(|| parse_err(path, format!("item '{name}' without id")))?;
        if name.is_empty() {
            return Err(parse_err(path, "item with empty name"));
        }

        let expected = label_map.len() as i64 + 1;
        if id != expected || label_map.get(&name).is_some() {
            return Err(parse_err(
                path,
                format!("item '{name}' has id {id}; expected unique name with id {expected}"),
            ));
        }
        let assigned = label_map.get_or_insert(&name);
        debug_assert_eq!(assigned, LabelId::new(id as u32));
    }

    Ok(label_map)
}

fn parse_err(path: &Path, message: impl Into<String>) -> RecordError {
    RecordError::LabelMapParse {
        path: path.to_path_buf(),
        message: message.into(),
    }
}
