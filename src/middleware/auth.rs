use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;

use crate::api::models::ErrorResponse;

/// JWT claims issued by the account service.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    /// User id as string, standard subject field.
    pub sub: String,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

/// Authenticated merchant extracted from the bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: i64,
    pub email: String,
}

pub const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

fn get_jwt_secret() -> String {
    env::var("JWT_SECRET").unwrap_or_else(|_| "setem_dev_jwt_secret".to_string())
}

fn unauthorized(error: &str, message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
            details: None,
        }),
    )
}

/// Middleware: validate the Authorization header and stash a [`CurrentUser`]
/// in request extensions for handlers.
pub async fn extract_current_user(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| {
            warn!("Missing Authorization header");
            unauthorized(
                "Missing Authorization header",
                "Authentication required. Please provide a valid Bearer token.",
            )
        })?;

    if !auth_header.starts_with("Bearer ") {
        warn!("Invalid Authorization header format");
        return Err(unauthorized(
            "Invalid Authorization header format",
            "Authorization header must start with 'Bearer '.",
        ));
    }

    let token = auth_header.trim_start_matches("Bearer ").trim();
    if token.is_empty() {
        return Err(unauthorized(
            "Empty JWT token",
            "Please provide a valid JWT token.",
        ));
    }

    let claims = verify_jwt_token(token).map_err(|e| {
        warn!("JWT validation failed: {}", e);
        unauthorized(
            "Invalid or expired token",
            "Could not validate credentials. Please log in again.",
        )
    })?;

    let user_id = claims.sub.parse::<i64>().map_err(|_| {
        warn!("Invalid user_id in JWT sub field: {}", claims.sub);
        unauthorized("Invalid token", "Invalid user ID format in token.")
    })?;

    request.extensions_mut().insert(CurrentUser {
        user_id,
        email: claims.email,
    });

    Ok(next.run(request).await)
}

pub fn verify_jwt_token(token: &str) -> Result<JwtClaims, String> {
    let jwt_secret = get_jwt_secret();
    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let validation = Validation::new(JWT_ALGORITHM);

    decode::<JwtClaims>(token, &decoding_key, &validation)
        .map(|token_data| token_data.claims)
        .map_err(|e| format!("JWT validation failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    #[test]
    fn test_jwt_roundtrip() {
        let claims = JwtClaims {
            sub: "42".to_string(),
            email: "shop@example.com".to_string(),
            exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp(),
            iat: chrono::Utc::now().timestamp(),
        };

        let header = Header::new(JWT_ALGORITHM);
        let encoding_key = EncodingKey::from_secret(get_jwt_secret().as_bytes());

        let token = encode(&header, &claims, &encoding_key).unwrap();
        let validated = verify_jwt_token(&token).unwrap();

        assert_eq!(validated.sub, "42");
        assert_eq!(validated.email, "shop@example.com");
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(verify_jwt_token("not-a-jwt").is_err());
    }
}
