// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server configuration and the origin policy.
//!
//! Cross-origin POSTs are the CSRF vector here: browsers attach an Origin
//! (or at least a Referer), so a Mozilla-like user agent that provides
//! neither is refused outright, and provided origins are checked against
//! the allow-list.

use url::Url;

use crate::proto::Headers;
use crate::{ORIGIN_HEADER, REFERER_HEADER, USER_AGENT_HEADER};

/// Configuration for [`crate::Server`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Origins allowed to call the API cross-origin; `*` allows any.
    pub allowed_origins: Vec<String>,
    /// Permit GET requests (off by default; commands have side effects).
    pub allow_get: bool,
    /// Methods advertised in CORS preflight responses.
    pub allowed_methods: Vec<String>,
    /// Request headers advertised in CORS preflight responses.
    pub allowed_request_headers: Vec<String>,
    /// Path prefix commands are served under.
    pub api_prefix: String,
    /// Extra response headers, merged without overriding CORS-managed ones.
    pub headers: Vec<(String, String)>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allow_get: false,
            allowed_methods: vec!["POST".to_string(), "OPTIONS".to_string()],
            allowed_request_headers: vec![
                "Content-Type".to_string(),
                "User-Agent".to_string(),
                "X-Requested-With".to_string(),
            ],
            api_prefix: "/api/v0".to_string(),
            headers: Vec::new(),
        }
    }
}

impl ServerConfig {
    fn origin_allowed(&self, origin: &str) -> bool {
        let origin = origin.trim_end_matches('/');
        self.allowed_origins
            .iter()
            .any(|allowed| allowed == "*" || allowed.trim_end_matches('/') == origin)
    }

    /// Validate the Origin header; absence is fine (same-origin or non-browser).
    pub fn allow_origin(&self, headers: &Headers) -> bool {
        match headers.get(ORIGIN_HEADER) {
            None => true,
            Some(origin) => self.origin_allowed(origin),
        }
    }

    /// Validate the Referer header against the origin allow-list.
    pub fn allow_referer(&self, headers: &Headers) -> bool {
        let Some(referer) = headers.get(REFERER_HEADER) else {
            return true;
        };
        let Ok(url) = Url::parse(referer) else {
            return false;
        };
        let origin = url.origin().ascii_serialization();
        self.origin_allowed(&origin)
    }

    /// Browsers always send Origin or Referer with cross-origin POSTs; a
    /// Mozilla-like agent providing neither is a CSRF attempt.
    pub fn allow_user_agent(&self, headers: &Headers) -> bool {
        let browser = headers
            .get(USER_AGENT_HEADER)
            .is_some_and(|ua| ua.starts_with("Mozilla"));
        !browser || headers.contains(ORIGIN_HEADER) || headers.contains(REFERER_HEADER)
    }
}

/// Response headers the CORS layer owns; user-supplied extras never override
/// them.
pub fn skip_api_header(name: &str) -> bool {
    name.eq_ignore_ascii_case("Access-Control-Allow-Origin")
        || name.eq_ignore_ascii_case("Access-Control-Allow-Methods")
        || name.eq_ignore_ascii_case("Access-Control-Allow-Credentials")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
