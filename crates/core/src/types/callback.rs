//! Callback endpoints and subscription flags.
//!
//! Templates (thread replies) and actions blocks (button clicks) can both
//! subscribe to inbound Slack traffic. A subscription is only meaningful with
//! somewhere to forward to, so writes go through [`Subscription::normalize`]:
//! a missing or blank callback URL silently turns the subscription off, while
//! a present but malformed URL is rejected.

use core::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Errors that can occur when parsing a [`CallbackUrl`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CallbackUrlError {
    /// The input is not a URL at all.
    #[error("callback url is not a valid url: {0}")]
    Invalid(String),
    /// The URL uses a scheme other than http or https.
    #[error("callback url must use http or https (got {0})")]
    UnsupportedScheme(String),
    /// The URL has no host to deliver to.
    #[error("callback url must have a host")]
    MissingHost,
}

/// An absolute `http`/`https` URL that forwarded payloads are POSTed to.
///
/// ```
/// use slack_relay_core::CallbackUrl;
///
/// assert!(CallbackUrl::parse("https://hooks.internal/slack").is_ok());
/// assert!(CallbackUrl::parse("ftp://hooks.internal/slack").is_err());
/// assert!(CallbackUrl::parse("/relative/path").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct CallbackUrl(String);

impl CallbackUrl {
    /// Parse and validate a callback URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not an absolute URL, does not use
    /// `http`/`https`, or has no host.
    pub fn parse(s: &str) -> Result<Self, CallbackUrlError> {
        let url = Url::parse(s.trim()).map_err(|e| CallbackUrlError::Invalid(e.to_string()))?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(CallbackUrlError::UnsupportedScheme(other.to_owned())),
        }

        if url.host_str().is_none_or(str::is_empty) {
            return Err(CallbackUrlError::MissingHost);
        }

        Ok(Self(url.into()))
    }

    /// Returns the URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallbackUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CallbackUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A subscription flag paired with the endpoint it forwards to.
///
/// Constructed only through [`Subscription::normalize`], so `enabled` implies
/// `callback_url.is_some()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    enabled: bool,
    callback_url: Option<CallbackUrl>,
}

impl Subscription {
    /// Apply the write-time rules for a subscription flag and callback URL.
    ///
    /// - blank or absent URL: stored as `None`, subscription forced off
    /// - present URL: must parse as a [`CallbackUrl`]
    ///
    /// # Errors
    ///
    /// Returns an error if a non-blank URL fails validation.
    pub fn normalize(requested: bool, callback_url: Option<&str>) -> Result<Self, CallbackUrlError> {
        let callback_url = callback_url
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(CallbackUrl::parse)
            .transpose()?;

        Ok(Self {
            enabled: requested && callback_url.is_some(),
            callback_url,
        })
    }

    /// A disabled subscription with no endpoint.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            callback_url: None,
        }
    }

    /// Whether inbound traffic should be forwarded.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The endpoint, if one was supplied.
    #[must_use]
    pub const fn callback_url(&self) -> Option<&CallbackUrl> {
        self.callback_url.as_ref()
    }
}
