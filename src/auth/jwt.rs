use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::jwks::JwksCache;

/// Supabase JWT claims.
///
/// `sub` is the user's UUID in `auth.users`; `user_metadata` carries profile
/// info from the OAuth provider. Token issuance happens entirely on the
/// Supabase side — this service only consumes the caller identity.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The Supabase auth user UUID.
    pub sub: String,
    /// Token expiration (Unix timestamp).
    pub exp: usize,
    /// Token issued-at (Unix timestamp).
    pub iat: Option<usize>,
    /// Issuer — the Supabase URL + `/auth/v1`.
    pub iss: Option<String>,
    /// User's email from Supabase auth.
    pub email: Option<String>,
    /// Supabase role (e.g. "authenticated").
    pub role: Option<String>,
    /// Metadata from the OAuth provider.
    pub user_metadata: Option<UserMetadata>,
}

/// Metadata populated by the OAuth provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserMetadata {
    pub full_name: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub picture: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
}

impl Claims {
    /// Extract the user UUID from the `sub` claim.
    pub fn user_id(&self) -> Result<Uuid, String> {
        Uuid::parse_str(&self.sub).map_err(|e| format!("Invalid UUID in sub claim: {e}"))
    }

    /// Best-effort display name from metadata.
    pub fn display_name(&self) -> Option<String> {
        self.user_metadata
            .as_ref()
            .and_then(|m| m.full_name.clone().or_else(|| m.name.clone()))
    }

    /// Best-effort avatar URL from metadata.
    pub fn avatar_url(&self) -> Option<String> {
        self.user_metadata
            .as_ref()
            .and_then(|m| m.avatar_url.clone().or_else(|| m.picture.clone()))
    }

    /// Best-effort email: prefer top-level, fall back to metadata.
    pub fn user_email(&self) -> Option<String> {
        self.email
            .clone()
            .or_else(|| self.user_metadata.as_ref().and_then(|m| m.email.clone()))
    }
}

/// Validate a Supabase JWT against the project's JWKS and return the claims.
pub async fn validate_token(token: &str, jwks_cache: &JwksCache) -> Result<Claims, String> {
    jwks_cache.validate_token(token).await.map(|td| td.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_claims() -> Claims {
        Claims {
            sub: Uuid::new_v4().to_string(),
            exp: 2_000_000_000,
            iat: None,
            iss: None,
            email: Some("bare@example.com".to_string()),
            role: None,
            user_metadata: None,
        }
    }

    #[test]
    fn user_id_parses_sub() {
        let id = Uuid::new_v4();
        let mut claims = bare_claims();
        claims.sub = id.to_string();
        assert_eq!(claims.user_id().unwrap(), id);
    }

    #[test]
    fn user_id_rejects_garbage_sub() {
        let mut claims = bare_claims();
        claims.sub = "not-a-uuid".to_string();
        assert!(claims.user_id().is_err());
    }

    #[test]
    fn email_falls_back_to_metadata() {
        let mut claims = bare_claims();
        claims.email = None;
        claims.user_metadata = Some(UserMetadata {
            full_name: None,
            name: None,
            avatar_url: None,
            picture: None,
            email: Some("meta@example.com".to_string()),
            email_verified: Some(true),
        });
        assert_eq!(claims.user_email().unwrap(), "meta@example.com");
    }

    #[test]
    fn helpers_with_missing_metadata() {
        let claims = bare_claims();
        assert_eq!(claims.user_email().unwrap(), "bare@example.com");
        assert!(claims.display_name().is_none());
        assert!(claims.avatar_url().is_none());
    }

    #[test]
    fn display_name_prefers_full_name() {
        let mut claims = bare_claims();
        claims.user_metadata = Some(UserMetadata {
            full_name: Some("Alice Smith".to_string()),
            name: Some("alice".to_string()),
            avatar_url: None,
            picture: None,
            email: None,
            email_verified: None,
        });
        assert_eq!(claims.display_name().unwrap(), "Alice Smith");
    }
}
