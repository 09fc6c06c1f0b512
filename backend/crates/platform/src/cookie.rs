//! Cookie Management Infrastructure
//!
//! Cookie attributes, request-side extraction, and ordered response-side
//! updates.

use axum::http::{HeaderMap, HeaderValue, header};

/// SameSite policy for cookies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Attributes applied to every cookie a service writes
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    pub path: String,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            secure: true,
            http_only: true,
            same_site: SameSite::Lax,
            path: "/".to_string(),
        }
    }
}

/// A single Set-Cookie instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieUpdate {
    Set {
        name: String,
        value: String,
        max_age_secs: Option<i64>,
    },
    Clear {
        name: String,
    },
}

impl CookieUpdate {
    pub fn set(name: impl Into<String>, value: impl Into<String>, max_age_secs: Option<i64>) -> Self {
        CookieUpdate::Set {
            name: name.into(),
            value: value.into(),
            max_age_secs,
        }
    }

    pub fn clear(name: impl Into<String>) -> Self {
        CookieUpdate::Clear { name: name.into() }
    }

    pub fn name(&self) -> &str {
        match self {
            CookieUpdate::Set { name, .. } | CookieUpdate::Clear { name } => name,
        }
    }

    pub fn is_clear(&self) -> bool {
        matches!(self, CookieUpdate::Clear { .. })
    }

    /// Build the Set-Cookie header value
    pub fn to_header_string(&self, config: &CookieConfig) -> String {
        let (mut cookie, max_age) = match self {
            CookieUpdate::Set {
                name,
                value,
                max_age_secs,
            } => (format!("{}={}", name, value), *max_age_secs),
            CookieUpdate::Clear { name } => (format!("{}=", name), Some(0)),
        };

        if config.http_only {
            cookie.push_str("; HttpOnly");
        }
        if config.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str(&format!("; SameSite={}", config.same_site.as_str()));
        cookie.push_str(&format!("; Path={}", config.path));

        if let Some(max_age) = max_age {
            cookie.push_str(&format!("; Max-Age={}", max_age));
        }

        cookie
    }
}

/// Collapse an ordered update list to one update per cookie name.
///
/// The last update for a name wins; names keep the position of their first
/// appearance.
pub fn coalesce(updates: Vec<CookieUpdate>) -> Vec<CookieUpdate> {
    let mut out: Vec<CookieUpdate> = Vec::with_capacity(updates.len());
    for update in updates {
        match out.iter_mut().find(|u| u.name() == update.name()) {
            Some(slot) => *slot = update,
            None => out.push(update),
        }
    }
    out
}

/// Extract a cookie value from headers.
///
/// Surrounding double quotes are stripped; an empty value counts as absent.
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            if key != name {
                return None;
            }
            let value = value.trim().trim_matches('"');
            if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            }
        })
}

/// Create a Set-Cookie header value
pub fn set_cookie_header(config: &CookieConfig, update: &CookieUpdate) -> Option<HeaderValue> {
    HeaderValue::from_str(&update.to_header_string(config)).ok()
}
