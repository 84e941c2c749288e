use actix_web::error::{ErrorInternalServerError, ErrorUnauthorized};
use actix_web::{Error, FromRequest, HttpRequest, dev::Payload, web};
use sea_orm::DatabaseConnection;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::auth::jwks::JwksCache;
use crate::auth::jwt;
use crate::db::users::find_or_create_from_auth;
use crate::models::users::{self, CreateUserFromAuth, Roles};

/// The authenticated caller, resolved to a `users` row.
///
/// Extracting this from a request validates the bearer token and lazily
/// creates the user record on first sight; the marketplace has no
/// registration flow of its own.
pub struct AuthenticatedUser(pub users::Model);

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move { resolve_user(&req).await.map(AuthenticatedUser) })
    }
}

/// Validate the bearer token on a request and map it to a user row.
async fn resolve_user(req: &HttpRequest) -> Result<users::Model, Error> {
    let token = bearer_token(req)?;

    let jwks_cache = req
        .app_data::<web::Data<Arc<JwksCache>>>()
        .ok_or_else(|| ErrorInternalServerError("JWKS cache not configured"))?;

    let claims = jwt::validate_token(token, jwks_cache.get_ref())
        .await
        .map_err(|e| ErrorUnauthorized(format!("Invalid token: {e}")))?;

    let user_id = claims.user_id().map_err(ErrorUnauthorized)?;
    let email = claims
        .user_email()
        .ok_or_else(|| ErrorUnauthorized("No email in token claims"))?;

    let db = req
        .app_data::<web::Data<DatabaseConnection>>()
        .ok_or_else(|| ErrorInternalServerError("Database not configured"))?;

    find_or_create_from_auth(
        db.get_ref(),
        CreateUserFromAuth {
            id: user_id,
            email,
            display_name: claims.display_name(),
            avatar_url: claims.avatar_url(),
            auth_provider: "supabase".to_string(),
            role: Roles::Client, // default role for new users
        },
    )
    .await
    .map_err(|e| ErrorInternalServerError(format!("Database error: {e}")))
}

fn bearer_token(req: &HttpRequest) -> Result<&str, Error> {
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ErrorUnauthorized("Missing Authorization header"))?;

    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ErrorUnauthorized("Authorization header must be: Bearer <token>"))
}
