use std::time::Duration;

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

#[derive(Debug, Clone, Copy)]
pub struct CookieOptions {
    pub secure: bool,
    pub same_site: SameSite,
}

pub const SESSION_COOKIE_NAME: &str = "session_id";
pub const SESSION_COOKIE_PATH: &str = "/";
/// Fallback transport for clients that cannot keep cookies.
pub const SESSION_HEADER_NAME: &str = "x-session-id";
/// Carries the refreshed expiry to header-transport clients.
pub const SESSION_EXPIRES_HEADER_NAME: &str = "x-session-expires-at";

/// Where a presented session token came from.
///
/// Header tokens are readable by scripts on the client, so they never earn a
/// cookie in return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenSource {
    Cookie,
    Header,
}

pub fn build_session_cookie(token: &str, max_age: Duration, options: CookieOptions) -> String {
    build_cookie(token, max_age.as_secs(), options)
}

/// Must carry the same attributes as [`build_session_cookie`], otherwise some
/// clients keep the old credential.
pub fn build_clear_session_cookie(options: CookieOptions) -> String {
    build_cookie("", 0, options)
}

fn build_cookie(value: &str, max_age_secs: u64, options: CookieOptions) -> String {
    let mut cookie = format!(
        "{}={}; Path={}; Max-Age={}; HttpOnly; SameSite={}",
        SESSION_COOKIE_NAME,
        value,
        SESSION_COOKIE_PATH,
        max_age_secs,
        same_site_value(options.same_site)
    );
    if options.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn extract_cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|pair| {
        let mut parts = pair.splitn(2, '=');
        let key = parts.next()?.trim();
        let value = parts.next()?.trim();
        if key == name {
            Some(value.to_string())
        } else {
            None
        }
    })
}

/// Finds the session token on a request: the cookie wins over the header.
pub fn extract_session_token(headers: &HeaderMap) -> Option<(String, TokenSource)> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|raw| extract_cookie_value(raw, SESSION_COOKIE_NAME))
        .filter(|token| !token.is_empty())
        .map(|token| (token, TokenSource::Cookie));
    if from_cookie.is_some() {
        return from_cookie;
    }

    headers
        .get(SESSION_HEADER_NAME)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| (token.to_string(), TokenSource::Header))
}

/// True when a response already sets the session cookie (login, logout).
pub fn sets_session_cookie(headers: &HeaderMap) -> bool {
    let prefix = format!("{}=", SESSION_COOKIE_NAME);
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with(&prefix))
}

fn same_site_value(same_site: SameSite) -> &'static str {
    match same_site {
        SameSite::Lax => "Lax",
        SameSite::Strict => "Strict",
        SameSite::None => "None",
    }
}
