use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use chatgpt_api::ChatGptConfig;

/// On-disk configuration, matching the historical `config.json` keys.
#[derive(Debug, Default, Deserialize)]
pub struct FileSettings {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, rename = "_puid")]
    pub puid: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

impl FileSettings {
    pub fn into_chatgpt_config(self) -> ChatGptConfig {
        let mut config = ChatGptConfig::new(self.access_token.unwrap_or_default())
            .with_paid_account(self.paid);
        if let Some(session_token) = self.session_token {
            config = config.with_session_token(session_token);
        }
        if let Some(email) = self.email {
            config = config.with_email(email);
        }
        if let Some(password) = self.password {
            config = config.with_password(password);
        }
        if let Some(proxy) = self.proxy {
            config = config.with_proxy_url(proxy);
        }
        if let Some(model) = self.model {
            config = config.with_model(model);
        }
        if let Some(puid) = self.puid {
            config = config.with_puid(puid);
        }
        if let Some(base_url) = self.base_url {
            config = config.with_base_url(base_url);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config
    }
}

/// Candidate config file locations, in lookup order.
pub fn config_file_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from("config.json")];
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        candidates.push(PathBuf::from(xdg).join("chatgpt_api/config.json"));
    }
    if let Ok(home) = std::env::var("HOME") {
        candidates.push(PathBuf::from(home).join(".config/chatgpt_api/config.json"));
    }
    candidates
}

/// Default location of the on-disk token cache.
pub fn token_cache_path() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".config/chatgpt_api/cache.json"),
        Err(_) => PathBuf::from(".chatgpt_cache.json"),
    }
}

/// Load settings from the first config file that exists.
pub fn load_settings() -> Result<FileSettings, String> {
    let Some(path) = config_file_candidates().into_iter().find(|path| path.exists()) else {
        return Err("no config file found; create config.json with an access_token".to_owned());
    };

    let text =
        fs::read_to_string(&path).map_err(|error| format!("cannot read {path:?}: {error}"))?;
    serde_json::from_str(&text).map_err(|error| format!("cannot parse {path:?}: {error}"))
}
