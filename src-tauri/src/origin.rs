use serde::Serialize;
use std::fmt;
use url::Url;

/// Path of the live KVM session page on a PiKVM host
pub const SESSION_PATH: &str = "/kvm";

#[derive(Debug, thiserror::Error)]
pub enum OriginError {
    #[error("origin must be an http(s) URL: {0}")]
    NotHttp(String),
    #[error("invalid origin URL {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: url::ParseError,
    },
    #[error("origin has no host: {0}")]
    NoHost(String),
    #[error("credentials in origin are not valid UTF-8")]
    Credentials(#[from] std::string::FromUtf8Error),
}

/// Login taken from the user-info part of the origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Base URL of the remote PiKVM, possibly carrying `user:password@`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin(String);

impl Origin {
    /// Wrap a stored origin without validating it. Parsing happens lazily in
    /// the operations that need a URL so a bad value surfaces as an error
    /// there.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Validate user input and strip one trailing slash
    pub fn normalize(input: &str) -> Result<Self, OriginError> {
        let input = input.trim();
        let trimmed = input.strip_suffix('/').unwrap_or(input);
        let origin = Self(trimmed.to_string());
        if !matches!(origin.url()?.scheme(), "http" | "https") {
            return Err(OriginError::NotHttp(input.to_string()));
        }
        Ok(origin)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn url(&self) -> Result<Url, OriginError> {
        let url = Url::parse(&self.0).map_err(|source| OriginError::Parse {
            origin: self.0.clone(),
            source,
        })?;
        if url.host_str().is_none() {
            return Err(OriginError::NoHost(self.0.clone()));
        }
        Ok(url)
    }

    /// Username and password from the user-info, percent-decoded.
    /// Both parts must be present.
    pub fn credentials(&self) -> Result<Option<Credentials>, OriginError> {
        let url = self.url()?;
        let (username, password) = match (url.username(), url.password()) {
            ("", _) | (_, None) | (_, Some("")) => return Ok(None),
            (username, Some(password)) => (username, password),
        };
        Ok(Some(Credentials {
            username: urlencoding::decode(username)?.into_owned(),
            password: urlencoding::decode(password)?.into_owned(),
        }))
    }

    /// Origin URL with the user-info removed
    pub fn base_url(&self) -> Result<Url, OriginError> {
        let mut url = self.url()?;
        url.set_username("")
            .and_then(|_| url.set_password(None))
            .map_err(|_| OriginError::NoHost(self.0.clone()))?;
        Ok(url)
    }

    /// Session page URL, without user-info
    pub fn session_url(&self) -> Result<Url, OriginError> {
        let mut url = self.base_url()?;
        url.set_path(SESSION_PATH);
        Ok(url)
    }

    /// URL pattern granting the remote pages of this origin IPC access
    pub fn remote_pattern(&self) -> Result<String, OriginError> {
        let url = self.url()?;
        let host = url
            .host_str()
            .ok_or_else(|| OriginError::NoHost(self.0.clone()))?;
        Ok(match url.port() {
            Some(port) => format!("{}://{}:{}/*", url.scheme(), host, port),
            None => format!("{}://{}/*", url.scheme(), host),
        })
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
