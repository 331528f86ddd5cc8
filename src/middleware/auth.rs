use crate::models::auth::{Claims, ErrorResponse};
use crate::AppState;
use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;

pub const TOKEN_AUDIENCE: &str = "authenticated";

pub fn verify_jwt_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[TOKEN_AUDIENCE]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;

    Ok(token_data.claims)
}

fn unauthorized(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            success: false,
            message: message.to_string(),
        }),
    )
}

pub async fn auth_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, impl IntoResponse> {
    let secret = request
        .extensions()
        .get::<Arc<AppState>>()
        .and_then(|state| state.settings.jwt_secret.clone());
    let Some(secret) = secret else {
        tracing::error!("SUPABASE_JWT_SECRET is not set, rejecting authenticated request");
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                success: false,
                message: "Authentication is not configured".to_string(),
            }),
        ));
    };

    let Some(auth_header) = headers.get("Authorization") else {
        return Err(unauthorized("Missing Authorization header"));
    };

    let Ok(auth_str) = auth_header.to_str() else {
        return Err(unauthorized("Invalid Authorization header format"));
    };

    // Extract token from "Bearer <token>" format
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(unauthorized(
            "Invalid Authorization header format. Expected 'Bearer <token>'",
        ));
    };

    let claims = match verify_jwt_token(token, &secret) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!("JWT verification failed: {}", e);
            return Err(unauthorized("Invalid or expired token"));
        }
    };

    if claims.user_id().is_none() {
        tracing::warn!("Token subject '{}' is not a user id", claims.sub);
        return Err(unauthorized("Invalid token subject"));
    }

    // Handlers read the claims from the request extensions
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use uuid::Uuid;

    const SECRET: &str = "test-secret";

    fn token(aud: &str, secret: &str) -> String {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: Some("creator@example.com".into()),
            role: Some("authenticated".into()),
            aud: Some(aud.into()),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn test_verify_valid_token() {
        let claims = verify_jwt_token(&token(TOKEN_AUDIENCE, SECRET), SECRET).unwrap();
        assert!(claims.user_id().is_some());
        assert_eq!(claims.email.as_deref(), Some("creator@example.com"));
    }

    #[test]
    fn test_verify_rejects_wrong_secret_or_audience() {
        assert!(verify_jwt_token(&token(TOKEN_AUDIENCE, "other"), SECRET).is_err());
        assert!(verify_jwt_token(&token("anon", SECRET), SECRET).is_err());
        assert!(verify_jwt_token("not-a-token", SECRET).is_err());
    }
}
