//! Webhook identity parsing and validation.
//!
//! A webhook is addressed by an (id, token) pair. Both the full URL form and the bare pair
//! resolve to the same [`WebhookIdentity`]; no network access happens here.

use crate::{Error, Result};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use url::Url;

/// API base the service publishes webhooks under.
pub const DEFAULT_API_BASE: &str = "https://discord.com/api";

static HOST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:canary\.|ptb\.)?discord(?:app)?\.com$").expect("static host pattern")
});

// Id and token are captured loosely and validated by the constructor.
static PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/api/(?:v[0-9]+/)?webhooks/([^/]*)/([^/]*)/?$").expect("static path pattern")
});

static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{1,20}$").expect("static id pattern"));

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("static token pattern"));

/// How strictly an (id, token) pair is checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentityPolicy {
    /// Id must be 1-20 digits AND token must be `[A-Za-z0-9._-]+`.
    #[default]
    Strict,
    /// Accept when either the id or the token pattern holds (legacy behavior).
    ///
    /// Both fields must still be non-empty and free of URL delimiters.
    Lenient,
}

/// Validated (id, token) pair. Immutable once constructed.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct WebhookIdentity {
    id: String,
    token: String,
}

impl WebhookIdentity {
    /// Parse a full webhook URL such as `https://discord.com/api/webhooks/<id>/<token>`.
    pub fn parse_url(raw: &str) -> Result<Self> {
        Self::parse_url_with(raw, IdentityPolicy::Strict)
    }

    pub fn parse_url_with(raw: &str, policy: IdentityPolicy) -> Result<Self> {
        let url = Url::parse(raw.trim())
            .map_err(|e| Error::MalformedIdentity(format!("not a webhook URL: {e}")))?;
        if !matches!(url.scheme(), "https" | "http") {
            return Err(Error::MalformedIdentity(format!(
                "unsupported URL scheme: {}",
                url.scheme()
            )));
        }
        let host = url.host_str().unwrap_or_default();
        if !HOST_RE.is_match(host) {
            return Err(Error::MalformedIdentity(format!(
                "host is not a Discord webhook host: {host:?}"
            )));
        }
        // The parser lowercases and percent-decodes hosts; the input must already match.
        if raw_host(raw.trim()) != Some(host) {
            return Err(Error::MalformedIdentity(
                "host must be written exactly as a lowercase Discord webhook host".to_string(),
            ));
        }
        let caps = PATH_RE.captures(url.path()).ok_or_else(|| {
            Error::MalformedIdentity("path is not /api/webhooks/<id>/<token>".to_string())
        })?;
        Self::from_id_and_token_with(&caps[1], &caps[2], policy)
    }

    /// Build an identity from a separately supplied id and token. Purely syntactic.
    pub fn from_id_and_token(id: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Self::from_id_and_token_with(id, token, IdentityPolicy::Strict)
    }

    pub fn from_id_and_token_with(
        id: impl Into<String>,
        token: impl Into<String>,
        policy: IdentityPolicy,
    ) -> Result<Self> {
        let id = id.into();
        let token = token.into();
        if id.is_empty() || token.is_empty() {
            return Err(Error::MalformedIdentity(
                "webhook id and token must both be non-empty".to_string(),
            ));
        }
        if !is_path_safe(&id) || !is_path_safe(&token) {
            return Err(Error::MalformedIdentity(
                "webhook id and token must not contain URL delimiters or whitespace".to_string(),
            ));
        }
        let id_ok = ID_RE.is_match(&id);
        let token_ok = TOKEN_RE.is_match(&token);
        let accepted = match policy {
            IdentityPolicy::Strict => id_ok && token_ok,
            IdentityPolicy::Lenient => id_ok || token_ok,
        };
        if !accepted {
            let what = match (id_ok, token_ok) {
                (false, false) => "id and token",
                (false, true) => "id",
                _ => "token",
            };
            return Err(Error::MalformedIdentity(format!(
                "webhook {what} has an invalid format"
            )));
        }
        Ok(Self { id, token })
    }

    /// Resolve CLI input: a full URL, or anything ending in `<id>/<token>`.
    ///
    /// Input that parses as an absolute URL must pass URL validation; it never falls
    /// back to the bare-pair form.
    pub fn resolve(input: &str, policy: IdentityPolicy) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::MalformedIdentity("empty webhook input".to_string()));
        }
        if Url::parse(input).is_ok() {
            return Self::parse_url_with(input, policy);
        }
        let mut segments = input.trim_end_matches('/').rsplit('/');
        match (segments.next(), segments.next()) {
            (Some(token), Some(id)) => Self::from_id_and_token_with(id, token, policy),
            _ => Err(Error::MalformedIdentity(
                "expected a webhook URL or <id>/<token>".to_string(),
            )),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// `https://discord.com/api/webhooks/<id>/<token>`.
    pub fn endpoint_url(&self) -> String {
        self.endpoint_url_on(DEFAULT_API_BASE)
    }

    /// Endpoint under an alternative API base (e.g. a proxy or a local fixture server).
    pub fn endpoint_url_on(&self, api_base: &str) -> String {
        format!(
            "{}/webhooks/{}/{}",
            api_base.trim_end_matches('/'),
            self.id,
            self.token
        )
    }
}

impl fmt::Debug for WebhookIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookIdentity")
            .field("id", &self.id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Host text as written in `raw`, without userinfo or port.
fn raw_host(raw: &str) -> Option<&str> {
    let (_, rest) = raw.split_once("://")?;
    let authority = rest.split(['/', '?', '#', '\\']).next()?;
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    host_port.split(':').next()
}

// Dot segments would be collapsed by URL normalization. Special schemes treat `\` as `/`.
fn is_path_safe(s: &str) -> bool {
    s != "."
        && s != ".."
        && !s.chars().any(|c| {
            matches!(c, '/' | '\\' | '?' | '#' | ':' | '%')
                || c.is_whitespace()
                || c.is_control()
        })
}
