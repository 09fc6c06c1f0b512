//! Session Cookies
//!
//! Reads the session gate's cookies off a request and writes its ordered
//! cookie updates onto a response.

use axum::http::{HeaderMap, header};
use platform::cookie::{CookieConfig, CookieUpdate, coalesce, extract_cookie, set_cookie_header};

use crate::application::config::SessionConfig;
use crate::application::coordinator::RequestInput;
use crate::domain::entity::affinity::AFFINITY_COOKIE;
use crate::domain::entity::live_session::{
    DescriptorFields, IPYNB_COOKIE, LOADING_COOKIE, SESSION_NAME_COOKIE, SHELL_COOKIE,
    SIGNATURE_COOKIE, UPLOAD_COOKIE,
};

pub fn descriptor_fields(headers: &HeaderMap) -> DescriptorFields {
    DescriptorFields {
        sessname: extract_cookie(headers, SESSION_NAME_COOKIE),
        hostshell: extract_cookie(headers, SHELL_COOKIE),
        hostupload: extract_cookie(headers, UPLOAD_COOKIE),
        hostipnb: extract_cookie(headers, IPYNB_COOKIE),
        sign: extract_cookie(headers, SIGNATURE_COOKIE),
        loading: extract_cookie(headers, LOADING_COOKIE),
    }
}

pub fn identity_cookie(headers: &HeaderMap, config: &SessionConfig) -> Option<String> {
    extract_cookie(headers, &config.identity_cookie_name)
}

pub fn read_request(headers: &HeaderMap, config: &SessionConfig, max_hop: bool) -> RequestInput {
    RequestInput {
        identity: identity_cookie(headers, config),
        descriptor: descriptor_fields(headers),
        affinity: extract_cookie(headers, AFFINITY_COOKIE),
        max_hop,
    }
}

/// Append one Set-Cookie header per cookie name, last update winning
pub fn apply_updates(headers: &mut HeaderMap, config: &CookieConfig, updates: Vec<CookieUpdate>) {
    for update in coalesce(updates) {
        match set_cookie_header(config, &update) {
            Some(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            None => tracing::warn!(cookie = update.name(), "Dropping unencodable cookie"),
        }
    }
}
