// Access token expiry check
//
// The claims are decoded WITHOUT verifying the signature. The result only
// tells the client when to refresh; it must never be used to decide whether a
// caller is authorized. The server re-validates every token it receives.

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// Refresh this long before the token actually expires
pub const DEFAULT_EXPIRY_MARGIN_SECS: i64 = 300;

/// Claims read from the access token payload
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Claims {
    /// Expiry, epoch seconds
    pub exp: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// Decode the claims segment of a JWT without verifying it
pub fn decode_claims(token: &str) -> Result<Claims> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => anyhow::bail!("Token is not a three-segment JWT"),
    };

    // Some issuers pad their segments
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .context("Token payload is not valid base64url")?;

    serde_json::from_slice(&bytes).context("Token payload is not a valid claims object")
}

/// True when the token expires within the default 5 minute margin, or cannot be decoded
pub fn is_token_expired(token: &str) -> bool {
    is_token_expired_at(token, Utc::now(), Duration::seconds(DEFAULT_EXPIRY_MARGIN_SECS))
}

/// Expiry check against an explicit clock and margin
pub fn is_token_expired_at(token: &str, now: DateTime<Utc>, margin: Duration) -> bool {
    match decode_claims(token) {
        Ok(claims) => {
            // Compare in milliseconds to avoid overflow on absurd `exp` values
            let exp_ms = claims.exp.saturating_mul(1000);
            match now.checked_add_signed(margin) {
                Some(deadline) => exp_ms < deadline.timestamp_millis(),
                // A margin that runs off the calendar covers every token
                None => true,
            }
        }
        Err(e) => {
            tracing::debug!(error = %e, "Undecodable access token, treating as expired");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn make_token(payload: &str) -> String {
        format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    fn token_expiring_in(now: DateTime<Utc>, secs: i64) -> String {
        make_token(&format!(
            r#"{{"exp":{},"user_id":42}}"#,
            now.timestamp() + secs
        ))
    }

    fn margin() -> Duration {
        Duration::seconds(DEFAULT_EXPIRY_MARGIN_SECS)
    }

    #[test]
    fn test_decode_claims() {
        let token = make_token(r#"{"exp":1700000000,"user_id":7}"#);
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.exp, 1_700_000_000);
        assert_eq!(claims.user_id, Some(7));
    }

    #[test]
    fn test_decode_claims_without_user_id() {
        let token = make_token(r#"{"exp":1700000000}"#);
        assert_eq!(decode_claims(&token).unwrap().user_id, None);
    }

    #[test]
    fn test_expiring_within_margin() {
        let now = Utc::now();
        assert!(is_token_expired_at(&token_expiring_in(now, 60), now, margin()));
        assert!(!is_token_expired_at(&token_expiring_in(now, 600), now, margin()));
    }

    #[test]
    fn test_already_expired() {
        let now = Utc::now();
        assert!(is_token_expired_at(&token_expiring_in(now, -10), now, margin()));
    }

    #[test]
    fn test_malformed_tokens_are_expired() {
        let now = Utc::now();
        let tokens = vec![
            String::new(),
            "not-a-jwt".to_string(),
            "a.b".to_string(),
            "a.b.c.d".to_string(),
            "header.!!!.sig".to_string(),
            make_token("not json"),
            make_token(r#"{"user_id":1}"#),
            make_token(r#"{"exp":"soon"}"#),
        ];
        for token in &tokens {
            assert!(is_token_expired_at(token, now, margin()), "{:?}", token);
        }
    }

    #[test]
    fn test_padded_payload_is_accepted() {
        let now = Utc::now();
        let payload = base64::engine::general_purpose::URL_SAFE
            .encode(format!(r#"{{"exp":{}}}"#, now.timestamp() + 3600));
        let token = format!("h.{}.s", payload);
        assert!(!is_token_expired_at(&token, now, margin()));
    }

    #[test]
    fn test_default_clock() {
        let token = token_expiring_in(Utc::now(), 3600);
        assert!(!is_token_expired(&token));
        assert!(is_token_expired("garbage"));
    }

    #[test]
    fn test_margin_past_calendar_counts_as_expired() {
        let now = Utc::now();
        let token = token_expiring_in(now, 3600);
        assert!(is_token_expired_at(&token, now, Duration::MAX));
        assert!(is_token_expired_at(&token, now, Duration::seconds(10_000_000_000_000)));
    }

    proptest! {
        #[test]
        fn prop_tokens_beyond_margin_are_valid(secs in 301i64..10_000_000) {
            let now = Utc::now();
            prop_assert!(!is_token_expired_at(&token_expiring_in(now, secs), now, margin()));
        }

        #[test]
        fn prop_tokens_within_margin_are_expired(secs in -10_000_000i64..300) {
            let now = Utc::now();
            prop_assert!(is_token_expired_at(&token_expiring_in(now, secs), now, margin()));
        }

        #[test]
        fn prop_arbitrary_strings_never_panic(s in "\\PC*") {
            let _ = is_token_expired_at(&s, Utc::now(), margin());
        }
    }
}
