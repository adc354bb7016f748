use std::collections::BTreeMap;

use crate::config::ChatGptConfig;
use crate::error::ChatGptError;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_ACCEPT_LANGUAGE: &str = "accept-language";
pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_COOKIE: &str = "cookie";
pub const HEADER_REFERER: &str = "referer";
pub const HEADER_ASSISTANT_APP_ID: &str = "x-openai-assistant-app-id";

/// Build the fixed header set the backend expects on every request.
///
/// The backend fingerprints browser traffic, so the accept-language and
/// referer values must match what the web client sends.
pub fn build_headers(config: &ChatGptConfig) -> Result<BTreeMap<String, String>, ChatGptError> {
    if config.access_token.trim().is_empty() {
        return Err(ChatGptError::MissingAccessToken);
    }

    let mut headers = BTreeMap::new();
    headers.insert(
        HEADER_AUTHORIZATION.to_owned(),
        format!("Bearer {}", config.access_token.trim()),
    );
    headers.insert(HEADER_ACCEPT.to_owned(), "text/event-stream".to_owned());
    headers.insert(
        HEADER_CONTENT_TYPE.to_owned(),
        "application/json".to_owned(),
    );
    headers.insert(HEADER_ASSISTANT_APP_ID.to_owned(), String::new());
    headers.insert(
        HEADER_ACCEPT_LANGUAGE.to_owned(),
        "en-US,en;q=0.9".to_owned(),
    );
    headers.insert(
        HEADER_REFERER.to_owned(),
        "https://chat.openai.com/chat".to_owned(),
    );

    if let Some(puid) = config.puid.as_deref().map(str::trim) {
        if !puid.is_empty() {
            headers.insert(HEADER_COOKIE.to_owned(), format!("_puid={puid}"));
        }
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use crate::config::ChatGptConfig;
    use crate::error::ChatGptError;

    use super::{build_headers, HEADER_ACCEPT, HEADER_AUTHORIZATION, HEADER_COOKIE};

    #[test]
    fn headers_carry_bearer_token_and_event_stream_accept() {
        let headers = build_headers(&ChatGptConfig::new("tok")).expect("headers should build");

        assert_eq!(headers[HEADER_AUTHORIZATION], "Bearer tok");
        assert_eq!(headers[HEADER_ACCEPT], "text/event-stream");
        assert!(!headers.contains_key(HEADER_COOKIE));
    }

    #[test]
    fn missing_access_token_is_rejected() {
        let error = build_headers(&ChatGptConfig::default())
            .expect_err("empty token should not produce headers");
        assert!(matches!(error, ChatGptError::MissingAccessToken));
    }

    #[test]
    fn puid_is_sent_as_a_cookie() {
        let config = ChatGptConfig::new("tok").with_puid("user-123");
        let headers = build_headers(&config).expect("headers should build");
        assert_eq!(headers[HEADER_COOKIE], "_puid=user-123");
    }
}
