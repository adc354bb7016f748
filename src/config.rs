use std::time::Duration;

/// Model served to free-plan accounts when nothing is configured.
pub const FREE_DEFAULT_MODEL: &str = "text-davinci-002-render-sha";

/// Model served to paid-plan accounts when nothing is configured.
pub const PAID_DEFAULT_MODEL: &str = "text-davinci-002-render-paid";

/// Default end-to-end deadline per request, including streamed bodies.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(360);

/// Client configuration for the ChatGPT web backend.
///
/// Only `access_token` is consumed for authentication here; `session_token`,
/// `email`, and `password` are carried solely so callers can hand them to a
/// credential provider. This client never performs login itself.
#[derive(Debug, Clone)]
pub struct ChatGptConfig {
    /// Bearer token attached to every request.
    pub access_token: String,
    /// Session cookie usable by an external credential provider.
    pub session_token: Option<String>,
    /// Account email, used as the token-cache key by credential providers.
    pub email: Option<String>,
    /// Account password, for external credential providers only.
    pub password: Option<String>,
    /// Proxy URL applied to all requests.
    pub proxy_url: Option<String>,
    /// Paid-plan accounts default to the `-paid` model variant.
    pub paid_account: bool,
    /// Preferred model, overriding the plan-dependent default.
    pub model: Option<String>,
    /// `_puid` cookie; when set, requests target the first-party backend.
    pub puid: Option<String>,
    /// Base URL override; falls back to `CHATGPT_BASE_URL`, then the default.
    pub base_url: Option<String>,
    /// End-to-end deadline per request.
    pub timeout: Duration,
    /// Resolve unknown conversations with a single history fetch instead of
    /// rebuilding the whole conversation mapping.
    pub lazy_loading: bool,
}

impl Default for ChatGptConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            session_token: None,
            email: None,
            password: None,
            proxy_url: None,
            paid_account: false,
            model: None,
            puid: None,
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            lazy_loading: true,
        }
    }
}

impl ChatGptConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_session_token(mut self, session_token: impl Into<String>) -> Self {
        self.session_token = Some(session_token.into());
        self
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_proxy_url(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = Some(proxy_url.into());
        self
    }

    #[must_use]
    pub fn with_paid_account(mut self, paid_account: bool) -> Self {
        self.paid_account = paid_account;
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_puid(mut self, puid: impl Into<String>) -> Self {
        self.puid = Some(puid.into());
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_lazy_loading(mut self, lazy_loading: bool) -> Self {
        self.lazy_loading = lazy_loading;
        self
    }

    /// Plan-dependent fallback model.
    #[must_use]
    pub fn default_model(&self) -> &'static str {
        if self.paid_account {
            PAID_DEFAULT_MODEL
        } else {
            FREE_DEFAULT_MODEL
        }
    }

    /// Model precedence: explicit argument > configured model > plan default.
    #[must_use]
    pub fn resolved_model(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
            .or_else(|| self.model.clone())
            .unwrap_or_else(|| self.default_model().to_owned())
    }
}
