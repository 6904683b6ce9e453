use super::{Operand, Value};
use crate::{Error, Result};

/// Escapes applied to `LIKE` values when no mapping is given.
pub const DEFAULT_LIKE_ESCAPE: [(&str, &str); 3] = [("%", "\\%"), ("_", "\\_"), ("\\", "\\\\")];

/// The escape mapping carried by the optional third `LIKE` operand.
pub fn like_escape_pairs(op: &str, escape: Option<&Operand>) -> Result<Vec<(String, String)>> {
    match escape {
        None => Ok(DEFAULT_LIKE_ESCAPE
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect()),
        Some(Operand::Value(Value::Record(map))) => Ok(map
            .iter()
            .map(|(from, to)| (from.clone(), to.as_str().unwrap_or_default().to_string()))
            .collect()),
        Some(_) => Err(Error::invalid_condition(format!(
            "the escape operand of '{op}' must be a mapping"
        ))),
    }
}

/// The pattern bound for `text`.
///
/// With an empty mapping the text is used as is, so `%` and `_` stay
/// wildcards. Otherwise the mapping is applied and the result is wrapped in
/// `%...%`.
pub fn like_pattern(text: &str, escape: &[(String, String)]) -> String {
    if escape.is_empty() {
        text.to_string()
    } else {
        format!("%{}%", replace_pairs(text, escape))
    }
}

/// Single-pass replacement, longest key first.
fn replace_pairs(text: &str, pairs: &[(String, String)]) -> String {
    let mut pairs: Vec<_> = pairs.iter().filter(|(from, _)| !from.is_empty()).collect();
    pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    'outer: while !rest.is_empty() {
        for (from, to) in &pairs {
            if let Some(tail) = rest.strip_prefix(from.as_str()) {
                out.push_str(to);
                rest = tail;
                continue 'outer;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    out
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Any,
    One,
    Literal(char),
}

/// Case-insensitive SQL `LIKE` with `\` as the escape character.
pub(crate) fn like_matches(pattern: &str, text: &str) -> bool {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars().flat_map(char::to_lowercase);
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => Token::Any,
            '_' => Token::One,
            '\\' => Token::Literal(chars.next().unwrap_or('\\')),
            c => Token::Literal(c),
        });
    }

    let text = text.chars().flat_map(char::to_lowercase).collect::<Vec<_>>();

    let (mut t, mut p) = (0, 0);
    // Last `%` seen and the text position it is currently absorbing up to
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match tokens.get(p) {
            Some(Token::Any) => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(Token::One) => {
                p += 1;
                t += 1;
            }
            Some(Token::Literal(c)) if *c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, absorbed)) => {
                    p = star + 1;
                    t = absorbed + 1;
                    backtrack = Some((star, absorbed + 1));
                }
                None => return false,
            },
        }
    }

    tokens[p..].iter().all(|token| *token == Token::Any)
}
