use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;

use crate::error::CredentialError;

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    exp: Option<u64>,
}

/// Read the `exp` claim from a JWT access token without verifying it.
///
/// Returns `None` when the token carries no expiry claim. Anything that is
/// not a three-segment JWT with a decodable JSON payload is an
/// [`CredentialError::InvalidToken`].
pub fn expires_at(token: &str) -> Result<Option<u64>, CredentialError> {
    let mut parts = token.split('.');
    let _header = parts
        .next()
        .ok_or_else(|| CredentialError::invalid_token("empty token"))?;
    let payload_segment = parts
        .next()
        .ok_or_else(|| CredentialError::invalid_token("missing payload segment"))?;
    let _signature = parts
        .next()
        .ok_or_else(|| CredentialError::invalid_token("missing signature segment"))?;
    if parts.next().is_some() {
        return Err(CredentialError::invalid_token("more than three segments"));
    }

    let decoded = decode_segment(payload_segment)
        .ok_or_else(|| CredentialError::invalid_token("payload is not base64"))?;
    let claims = serde_json::from_slice::<Claims>(&decoded)
        .map_err(|error| CredentialError::invalid_token(format!("payload is not JSON: {error}")))?;

    Ok(claims.exp)
}

/// True when the token's `exp` claim lies in the past. Tokens without an
/// expiry claim never count as expired.
pub fn is_expired(token: &str) -> Result<bool, CredentialError> {
    Ok(expires_at(token)?.is_some_and(|exp| exp <= current_epoch_seconds()))
}

fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    general_purpose::URL_SAFE_NO_PAD
        .decode(segment)
        .or_else(|_| general_purpose::URL_SAFE.decode(segment))
        .ok()
}

pub(crate) fn current_epoch_seconds() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
pub(crate) fn token_with_exp(exp: Option<u64>) -> String {
    let payload = match exp {
        Some(exp) => format!(r#"{{"exp": {exp}}}"#),
        None => "{}".to_owned(),
    };
    format!(
        "{}.{}.{}",
        general_purpose::URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256"}"#),
        general_purpose::URL_SAFE_NO_PAD.encode(payload),
        general_purpose::URL_SAFE_NO_PAD.encode("sig"),
    )
}

#[cfg(test)]
mod tests {
    use crate::error::CredentialError;

    use super::{current_epoch_seconds, expires_at, is_expired, token_with_exp};

    #[test]
    fn exp_claim_round_trips() {
        let token = token_with_exp(Some(1_700_000_000));
        assert_eq!(
            expires_at(&token).expect("token should decode"),
            Some(1_700_000_000)
        );
    }

    #[test]
    fn tokens_without_exp_never_expire() {
        let token = token_with_exp(None);
        assert!(!is_expired(&token).expect("token should decode"));
    }

    #[test]
    fn past_exp_is_expired_and_future_exp_is_not() {
        let past = token_with_exp(Some(1));
        let future = token_with_exp(Some(current_epoch_seconds() + 3600));

        assert!(is_expired(&past).expect("token should decode"));
        assert!(!is_expired(&future).expect("token should decode"));
    }

    #[test]
    fn opaque_strings_are_invalid_tokens() {
        let error = expires_at("not-a-jwt").expect_err("non-JWT must be rejected");
        assert!(matches!(error, CredentialError::InvalidToken { .. }));

        let error = expires_at("a.b.c.d").expect_err("four segments must be rejected");
        assert!(matches!(error, CredentialError::InvalidToken { .. }));
    }
}
