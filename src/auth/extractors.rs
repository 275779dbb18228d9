use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use tracing::warn;

use super::claims::Claims;
use crate::state::AppState;

/// Validates the provider-issued bearer token and yields its subject.
pub struct AuthUser(pub String);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "missing Authorization header".into(),
            ))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or((StatusCode::UNAUTHORIZED, "invalid auth scheme".into()))?;

        let cfg = &state.config.auth;
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&cfg.audience));
        validation.set_issuer(std::slice::from_ref(&cfg.issuer));
        let decoding = DecodingKey::from_secret(cfg.secret.as_bytes());

        let data = decode::<Claims>(token, &decoding, &validation).map_err(|e| {
            warn!(error = %e, "token rejected");
            (
                StatusCode::UNAUTHORIZED,
                "invalid or expired token".to_string(),
            )
        })?;

        Ok(AuthUser(data.claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;
    use time::{Duration, OffsetDateTime};

    #[derive(Serialize)]
    struct TestClaims {
        sub: String,
        exp: usize,
        iat: usize,
        iss: String,
        aud: String,
    }

    fn sign(secret: &str, iss: &str, aud: &str, exp_in: Duration) -> String {
        let now = OffsetDateTime::now_utc();
        let claims = TestClaims {
            sub: "user_2abc".into(),
            exp: (now + exp_in).unix_timestamp() as usize,
            iat: now.unix_timestamp() as usize,
            iss: iss.into(),
            aud: aud.into(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("sign test token")
    }

    fn verify(state: &AppState, token: &str) -> Result<Claims, ()> {
        let cfg = &state.config.auth;
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&cfg.audience));
        validation.set_issuer(std::slice::from_ref(&cfg.issuer));
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(cfg.secret.as_bytes()),
            &validation,
        )
        .map(|d| d.claims)
        .map_err(|_| ())
    }

    #[test]
    fn accepts_a_well_formed_token() {
        let state = AppState::fake();
        let token = sign("test", "test-issuer", "test-aud", Duration::minutes(5));
        let claims = verify(&state, &token).expect("token should validate");
        assert_eq!(claims.sub, "user_2abc");
    }

    #[test]
    fn rejects_wrong_issuer_or_audience() {
        let state = AppState::fake();
        let bad_iss = sign("test", "other-issuer", "test-aud", Duration::minutes(5));
        let bad_aud = sign("test", "test-issuer", "other-aud", Duration::minutes(5));
        assert!(verify(&state, &bad_iss).is_err());
        assert!(verify(&state, &bad_aud).is_err());
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let state = AppState::fake();
        let bad_secret = sign("not-the-secret", "test-issuer", "test-aud", Duration::minutes(5));
        let expired = sign("test", "test-issuer", "test-aud", Duration::minutes(-5));
        assert!(verify(&state, &bad_secret).is_err());
        assert!(verify(&state, &expired).is_err());
    }
}
