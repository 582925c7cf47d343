use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use super::route::AuthRoute;

lazy_static! {
    static ref HTML_TAG: Regex = Regex::new(r"<[^>]*>").unwrap();
    static ref HTML_UNSAFE: Regex = Regex::new(r#"[<>"'`]"#).unwrap();
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
    static ref PHONE_DISALLOWED: Regex = Regex::new(r"[^0-9+()\- ]").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sanitizer {
    /// Free text: tags and HTML-unsafe characters removed, trimmed.
    Text,
    /// Text with inner whitespace collapsed.
    Name,
    /// Trimmed, lowercased, no whitespace or HTML-unsafe characters.
    Email,
    /// Digits and `+()- ` only.
    Phone,
}

impl Sanitizer {
    pub fn apply(self, input: &str) -> String {
        match self {
            Self::Text => strip_html(input).trim().to_string(),
            Self::Name => WHITESPACE_RUN
                .replace_all(strip_html(input).trim(), " ")
                .into_owned(),
            Self::Email => HTML_UNSAFE
                .replace_all(input, "")
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_lowercase(),
            Self::Phone => PHONE_DISALLOWED
                .replace_all(input, "")
                .trim()
                .to_string(),
        }
    }
}

fn strip_html(input: &str) -> String {
    let without_tags = HTML_TAG.replace_all(input, "");
    HTML_UNSAFE.replace_all(&without_tags, "").into_owned()
}

/// Rewrites the route's listed string fields in place. Returns whether
/// anything changed.
pub fn sanitize_body(route: AuthRoute, body: &mut Value) -> bool {
    let Some(object) = body.as_object_mut() else {
        return false;
    };

    let mut changed = false;
    for (field, sanitizer) in route.sanitized_fields() {
        if let Some(Value::String(value)) = object.get_mut(*field) {
            let clean = sanitizer.apply(value);
            if clean != *value {
                *value = clean;
                changed = true;
            }
        }
    }
    changed
}
