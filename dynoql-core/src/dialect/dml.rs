/// Text preprocessing for item statements (INSERT/SELECT/UPDATE/DELETE)

use super::options::{OPT_SEPARATOR, OPT_VALUE};
use crate::error::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Change projection appended to UPDATE/DELETE so affected rows can be counted.
pub const IMPLICIT_RETURNING: &str = " RETURNING ALL OLD *";

fn trailing_options() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let one = format!(r"{}WITH\s+[\w\-]+\s*=\s*{}", OPT_SEPARATOR, OPT_VALUE);
        let pattern = format!(r"(?is)^(.*?)((?:{})+)$", one);
        Regex::new(&pattern).expect("trailing option pattern is valid")
    })
}

fn trailing_limit() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)^(.*?)\s+LIMIT\s+(\S+)$").expect("limit pattern is valid")
    })
}

fn returning_clause() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)\s+RETURNING\s+(ALL|MODIFIED)\s+(OLD|NEW)\s+\*\s*$")
            .expect("returning pattern is valid")
    })
}

/// Copy of `text` with the inside of every quoted literal blanked out.
///
/// Quote characters stay in place and every byte keeps its offset, so match
/// positions found in the mask are valid in `text`. A doubled quote inside a
/// literal is an escaped quote, not its end.
fn mask_literals(text: &str) -> String {
    let mut masked = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => {
                if chars.peek() == Some(&q) {
                    chars.next();
                    masked.push_str("__");
                } else {
                    quote = None;
                    masked.push(c);
                }
            }
            Some(_) => masked.extend(std::iter::repeat('_').take(c.len_utf8())),
            None => {
                if c == '\'' || c == '"' {
                    quote = Some(c);
                }
                masked.push(c);
            }
        }
    }

    masked
}

/// Counts `?` placeholders outside quoted literals.
pub fn count_placeholders(text: &str) -> usize {
    mask_literals(text).matches('?').count()
}

/// Splits a trailing run of `WITH key=value` fragments off a statement.
///
/// Returns the statement without the fragments and the fragment text (empty
/// when there is none).
pub fn split_trailing_options(text: &str) -> (&str, &str) {
    let masked = mask_literals(text);
    match trailing_options().captures(&masked).and_then(|caps| caps.get(2)) {
        Some(opts) => (text[..opts.start()].trim_end(), &text[opts.start()..]),
        None => (text, ""),
    }
}

/// Removes a trailing `LIMIT n` clause.
///
/// `n` must be a positive integer that fits in 32 bits.
pub fn extract_limit(text: &str) -> Result<(&str, Option<i32>)> {
    let masked = mask_literals(text);
    let Some((body, value)) = trailing_limit()
        .captures(&masked)
        .and_then(|caps| Some((caps.get(1)?.end(), caps.get(2)?.range())))
    else {
        return Ok((text, None));
    };

    let raw = &text[value];
    let limit = raw
        .parse::<i32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| Error::Syntax(format!("invalid LIMIT value <{}>, must be a positive integer", raw)))?;

    Ok((text[..body].trim_end(), Some(limit)))
}

/// True when the statement already ends with a `RETURNING ... *` clause.
pub fn has_returning(text: &str) -> bool {
    returning_clause().is_match(&mask_literals(text))
}
