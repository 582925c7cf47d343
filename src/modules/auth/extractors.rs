use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use super::interface::AuthError;
use super::schema::first_validation_message;
use crate::services::jwt::TokenClaims;

/// Verified access-token claims, placed on the request by the gatekeeper.
/// Handlers on unprotected routes never see one, so extraction fails with
/// 401 there.
#[derive(Debug, Clone)]
pub struct AuthUser(pub TokenClaims);

impl AuthUser {
    pub fn user_id(&self) -> &str {
        &self.0.user_id
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TokenClaims>()
            .cloned()
            .map(AuthUser)
            .ok_or(AuthError::Unauthorized)
    }
}

/// JSON body that has also passed its `validator` rules. Both malformed
/// JSON and rule violations answer 400 in the standard error envelope.
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AuthError::Validation(rejection.body_text()))?;
        value
            .validate()
            .map_err(|errors| AuthError::Validation(first_validation_message(&errors)))?;
        Ok(Self(value))
    }
}
