//! Client configuration.
//!
//! # Design
//! A `Config` is assembled once through `ConfigBuilder` (or `from_env`) and
//! is read-only afterwards. Every field is optional at build time; the
//! operations that need a value (import needs `project_id`) check for it
//! when they run.

use std::fmt;

/// Default ingestion endpoint.
pub const DEFAULT_API_URL: &str = "https://api.mixpanel.com";

/// How requests authenticate at the HTTP level.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Auth {
    #[default]
    None,
    /// HTTP Basic auth with a service account.
    ServiceAccount { username: String, secret: String },
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::None => write!(f, "None"),
            Auth::ServiceAccount { username, .. } => f
                .debug_struct("ServiceAccount")
                .field("username", username)
                .field("secret", &"<redacted>")
                .finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    api_url: String,
    token: Option<String>,
    project_id: Option<String>,
    auth: Auth,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Build from `MIXPANEL_*` env vars, falling back to defaults.
    ///
    /// The service account is only set when both `MIXPANEL_SERVICE_ACCOUNT`
    /// and `MIXPANEL_SERVICE_SECRET` are present.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut builder = Config::builder();
        if let Some(v) = lookup("MIXPANEL_API_URL") {
            builder = builder.api_url(v);
        }
        if let Some(v) = lookup("MIXPANEL_TOKEN") {
            builder = builder.token(v);
        }
        if let Some(v) = lookup("MIXPANEL_PROJECT_ID") {
            builder = builder.project_id(v);
        }
        if let (Some(user), Some(secret)) = (
            lookup("MIXPANEL_SERVICE_ACCOUNT"),
            lookup("MIXPANEL_SERVICE_SECRET"),
        ) {
            builder = builder.service_account(user, secret);
        }
        builder.build()
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Project token, or `""` when unset.
    pub fn token(&self) -> &str {
        self.token.as_deref().unwrap_or("")
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }
}

impl Default for Config {
    fn default() -> Self {
        ConfigBuilder::default().build()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    api_url: Option<String>,
    token: Option<String>,
    project_id: Option<String>,
    auth: Auth,
}

impl ConfigBuilder {
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn service_account(mut self, username: impl Into<String>, secret: impl Into<String>) -> Self {
        self.auth = Auth::ServiceAccount {
            username: username.into(),
            secret: secret.into(),
        };
        self
    }

    pub fn build(self) -> Config {
        let api_url = self.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Config {
            api_url: api_url.trim_end_matches('/').to_string(),
            token: self.token,
            project_id: self.project_id,
            auth: self.auth,
        }
    }
}
