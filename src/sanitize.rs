//! Cleanup of free-text values coming from TVDB.

use regex::Regex;
use std::sync::LazyLock;

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|amp|quot|apos|lt|gt|nbsp);").unwrap());

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Decode HTML entities, collapse runs of whitespace and trim.
pub fn clean(value: &str) -> String {
    let decoded = ENTITY.replace_all(value, |caps: &regex::Captures| {
        let entity = &caps[1];
        let decoded = match entity {
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "nbsp" => Some(' '),
            _ => numeric_entity(entity),
        };
        decoded.map_or_else(|| caps[0].to_string(), String::from)
    });

    WHITESPACE.replace_all(decoded.trim(), " ").into_owned()
}

fn numeric_entity(entity: &str) -> Option<char> {
    let code = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        entity.strip_prefix('#')?.parse().ok()?
    };
    char::from_u32(code)
}
