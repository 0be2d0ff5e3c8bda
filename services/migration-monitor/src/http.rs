// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Shared HTTP plumbing for talking to the pipeline endpoint

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use url::Url;

/// Basic-auth credential for the pipeline endpoint.
#[derive(Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: Option<String>,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}

/// Build an HTTP client with the given request timeout.
///
/// reqwest is built without a bundled rustls provider, so the workspace's
/// `ring` provider is installed first. Installing twice is harmless.
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    let _ = rustls::crypto::ring::default_provider().install_default();

    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("migration-monitor/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Resolve `path` under the pipeline endpoint.
///
/// The endpoint's own path is kept as a prefix, with or without a trailing
/// slash.
pub fn endpoint_url(endpoint: &str, path: &str) -> Result<Url, url::ParseError> {
    let mut base = Url::parse(endpoint)?;
    if !base.path().ends_with('/') {
        let prefix = format!("{}/", base.path());
        base.set_path(&prefix);
    }
    base.join(path.trim_start_matches('/'))
}

/// Attach credentials to a request, if any are configured.
pub fn with_auth(request: RequestBuilder, auth: Option<&BasicAuth>) -> RequestBuilder {
    match auth {
        Some(auth) => request.basic_auth(&auth.username, auth.password.as_ref()),
        None => request,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_handles_slashes() {
        let cases = [
            ("http://localhost:4900", "/metrics/prometheus", "http://localhost:4900/metrics/prometheus"),
            ("http://localhost:4900/", "shutdown", "http://localhost:4900/shutdown"),
            ("https://pipeline.example.com/dp/", "/shutdown", "https://pipeline.example.com/dp/shutdown"),
            ("https://pipeline.example.com/dp", "shutdown", "https://pipeline.example.com/dp/shutdown"),
        ];
        for (endpoint, path, expected) in cases {
            assert_eq!(endpoint_url(endpoint, path).unwrap().as_str(), expected);
        }
    }

    #[test]
    fn endpoint_url_rejects_invalid_endpoint() {
        assert!(endpoint_url("not a url", "/shutdown").is_err());
    }

    #[test]
    fn basic_auth_debug_masks_password() {
        let auth = BasicAuth {
            username: "admin".to_string(),
            password: Some("hunter2".to_string()),
        };
        let debug = format!("{:?}", auth);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("****"));
    }
}
