/// Rewrites conventional `INSERT INTO t (cols) VALUES (vals)` into the
/// store's `INSERT INTO "t" VALUE {...}` form.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

struct Tokens {
    insert: Regex,
    field_split: Regex,
    placeholder: Regex,
    null: Regex,
    number: Regex,
    boolean: Regex,
    double_quoted: Regex,
    single_quoted: Regex,
    raw: Regex,
}

fn tokens() -> &'static Tokens {
    static TOKENS: OnceLock<Tokens> = OnceLock::new();
    TOKENS.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("insert token pattern is valid");
        Tokens {
            insert: re(
                r#"(?is)^INSERT\s+INTO\s+["']?([\w\-]+)["']?\s*\(([^)]*?)\)\s*VALUES\s*\(([^)]*?)\)$"#,
            ),
            field_split: re(r"[,\s]+"),
            placeholder: re(r"^\?\s*(?:,|$)"),
            null: re(r"(?i)^null\s*(?:,|$)"),
            number: re(r"^[\d\.xe+\-]*\d[\d\.xe+\-]*\s*(?:,|$)"),
            boolean: re(r"(?i)^(?:true|false)\s*(?:,|$)"),
            double_quoted: re(r#"^"(?:\\.|[^"\\])*"\s*(?:,|$)"#),
            single_quoted: re(r"^'(?:[^']|'')*'\s*(?:,|$)"),
            raw: re(r"^[^,]+(?:,|$)"),
        }
    })
}

/// Matched token text without the trailing separator.
fn token_text(matched: &str) -> &str {
    let t = matched.trim_end();
    t.strip_suffix(',').unwrap_or(t).trim()
}

fn invalid_token(token: &str) -> Error {
    Error::Syntax(format!("cannot parse INSERT values, invalid token at: {}", token))
}

/// Reads one value from the front of `input`, returning its rendered form
/// and how many bytes were consumed.
fn next_value(input: &str) -> Result<(String, usize)> {
    let t = tokens();

    if let Some(m) = t.placeholder.find(input) {
        return Ok(("?".to_string(), m.end()));
    }
    if let Some(m) = t.null.find(input) {
        return Ok(("NULL".to_string(), m.end()));
    }
    if let Some(m) = t.number.find(input) {
        let token = token_text(m.as_str());
        let number: serde_json::Number =
            serde_json::from_str(token).map_err(|_| invalid_token(token))?;
        let is_integer = token.trim_start_matches('-').bytes().all(|b| b.is_ascii_digit());
        let rendered = match (number.as_i64(), number.as_u64(), number.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (None, Some(u), _) => u.to_string(),
            // integers past 64 bits keep every digit
            _ if is_integer => token.to_string(),
            (None, None, Some(f)) => f.to_string(),
            _ => token.to_string(),
        };
        return Ok((rendered, m.end()));
    }
    if let Some(m) = t.boolean.find(input) {
        return Ok((token_text(m.as_str()).to_lowercase(), m.end()));
    }
    if let Some(m) = t.double_quoted.find(input) {
        let token = token_text(m.as_str());
        let value: String = serde_json::from_str(token).map_err(|_| invalid_token(token))?;
        return Ok((single_quote(&value), m.end()));
    }
    if let Some(m) = t.single_quoted.find(input) {
        return Ok((token_text(m.as_str()).to_string(), m.end()));
    }
    if let Some(m) = t.raw.find(input) {
        return Ok((token_text(m.as_str()).to_string(), m.end()));
    }
    Err(invalid_token(input))
}

/// Renders a string as a single-quoted literal, escaping control characters
/// and doubling embedded single quotes.
fn single_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0b}' => out.push_str("\\v"),
            '\u{0c}' => out.push_str("\\f"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Converts `INSERT INTO t (f1, f2) VALUES (v1, v2)` to
/// `INSERT INTO "t" VALUE {'f1': v1, 'f2': v2}`.
///
/// Field order is preserved. String values come out single-quoted; numbers,
/// booleans, NULL and `?` placeholders are kept; any other token is copied
/// verbatim.
pub fn transform_insert_to_partiql(statement: &str) -> Result<String> {
    let t = tokens();
    let trimmed = statement.trim();
    let caps = t.insert.captures(trimmed).ok_or(Error::NotInsertStatement)?;

    let table = &caps[1];
    let fields: Vec<&str> = t
        .field_split
        .split(caps[2].trim())
        .map(|f| f.trim_matches(|c| c == '\'' || c == '"'))
        .filter(|f| !f.is_empty())
        .collect();

    let mut values = Vec::new();
    let mut rest = caps[3].trim();
    while !rest.is_empty() {
        let (value, consumed) = next_value(rest)?;
        values.push(value);
        rest = rest[consumed..].trim_start();
    }

    if fields.len() != values.len() {
        return Err(Error::FieldsAndValuesMismatch);
    }

    let pairs: Vec<String> = fields
        .iter()
        .zip(values.iter())
        .map(|(field, value)| format!("'{}': {}", field, value))
        .collect();

    Ok(format!(r#"INSERT INTO "{}" VALUE {{{}}}"#, table, pairs.join(", ")))
}
