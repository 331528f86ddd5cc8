pub mod thumbnail;
pub mod viral;

use crate::error::ApiError;
use crate::models::auth::Claims;
use uuid::Uuid;

/// Authenticated user's id from the token subject
pub fn user_id(claims: &Claims) -> Result<Uuid, ApiError> {
    claims
        .user_id()
        .ok_or_else(|| ApiError::Unauthorized("Invalid token subject".into()))
}
