//! Cookie value object written through `Context::set_cookie`

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cookie SameSite attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "Strict"),
            Self::Lax => write!(f, "Lax"),
            Self::None => write!(f, "None"),
        }
    }
}

/// An immutable cookie, rendered as a `Set-Cookie` header value
///
/// `max_age` follows the usual server convention: `0` leaves the attribute
/// out, a negative value expires the cookie immediately (`Max-Age=0`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    max_age: i64,
    path: String,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSite>,
}

impl Cookie {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        max_age: i64,
        path: impl Into<String>,
        secure: bool,
        http_only: bool,
        same_site: Option<SameSite>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age,
            path: path.into(),
            secure,
            http_only,
            same_site,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn max_age(&self) -> i64 {
        self.max_age
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn http_only(&self) -> bool {
        self.http_only
    }

    pub fn same_site(&self) -> Option<SameSite> {
        self.same_site
    }

    /// Serialize for a `Set-Cookie` header
    ///
    /// Returns `None` when the name is not a valid token; such a cookie is
    /// never sent. Bytes not allowed in a cookie value are dropped.
    pub fn to_header_value(&self) -> Option<String> {
        if !is_valid_name(&self.name) {
            return None;
        }

        let mut cookie = format!("{}={}", self.name, sanitize_value(&self.value));

        if !self.path.is_empty() {
            let path: String = self.path.chars().filter(|c| is_path_char(*c)).collect();
            cookie.push_str(&format!("; Path={}", path));
        }

        if self.max_age > 0 {
            cookie.push_str(&format!("; Max-Age={}", self.max_age));
        } else if self.max_age < 0 {
            cookie.push_str("; Max-Age=0");
        }

        if self.http_only {
            cookie.push_str("; HttpOnly");
        }

        if self.secure {
            cookie.push_str("; Secure");
        }

        if let Some(same_site) = self.same_site {
            cookie.push_str(&format!("; SameSite={}", same_site));
        }

        Some(cookie)
    }
}

/// Parse a request `Cookie` header and find the value for `name`
pub(crate) fn find_in_header(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_graphic()
                && !matches!(
                    b,
                    b'(' | b')'
                        | b'<'
                        | b'>'
                        | b'@'
                        | b','
                        | b';'
                        | b':'
                        | b'\\'
                        | b'"'
                        | b'/'
                        | b'['
                        | b']'
                        | b'?'
                        | b'='
                        | b'{'
                        | b'}'
                )
        })
}

fn is_value_char(c: char) -> bool {
    (' '..='~').contains(&c) && !matches!(c, '"' | ';' | '\\')
}

fn is_path_char(c: char) -> bool {
    (' '..='~').contains(&c) && c != ';'
}

fn sanitize_value(value: &str) -> String {
    let clean: String = value.chars().filter(|c| is_value_char(*c)).collect();
    if clean.contains(' ') || clean.contains(',') {
        format!("\"{}\"", clean)
    } else {
        clean
    }
}
