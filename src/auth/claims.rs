use serde::Deserialize;

/// Claims we care about from the identity provider's access token. `sub` is
/// the provider's opaque user id; we never mint these tokens ourselves.
#[derive(Debug, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}
