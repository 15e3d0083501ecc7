//! Actix-web extractor for the caller identity.

use actix_web::dev::Payload;
use actix_web::http::StatusCode;
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, web};
use secrecy::{ExposeSecret, SecretString};
use std::future::{Ready, ready};
use uuid::Uuid;

use super::{AdminKey, Role};
use crate::config::{ADMIN_KEY_HEADER, USER_ID_HEADER};
use crate::error::ErrorResponse;

/// Extract a secret header value, wrapping it in SecretString.
/// Returns None if the header is missing or invalid UTF-8.
fn extract_secret_header(req: &HttpRequest, header_name: &str) -> Option<SecretString> {
    req.headers()
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .map(|s| SecretString::from(s.to_string()))
}

/// Authentication error for extractors.
#[derive(Debug)]
pub struct AuthError {
    message: String,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResponseError for AuthError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::UNAUTHORIZED).json(ErrorResponse {
            error: "UNAUTHORIZED".to_string(),
            message: self.message.clone(),
        })
    }
}

/// Extractor for the authenticated caller.
///
/// Use this in handlers that require a caller:
/// ```ignore
/// async fn protected_handler(identity: Identity) -> impl Responder {
///     // identity.user_id / identity.role
/// }
/// ```
///
/// A valid `X-Admin-Key` header grants the admin role (constant-time
/// comparison). Otherwise the caller is a regular user identified by the
/// `X-User-Id` header, which must be a UUID.
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl FromRequest for Identity {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        // Get stored admin key from app data (optional)
        let stored_admin_key = req.app_data::<web::Data<AdminKey>>();

        // The admin dashboard also sends a user id so admin-initiated
        // collection/deletion is attributed; fall back to the nil UUID.
        let user_id = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok());

        // Check admin key first - wrapped in SecretString immediately
        let provided_admin_key = extract_secret_header(req, ADMIN_KEY_HEADER);
        if let Some(ref provided) = provided_admin_key
            && let Some(key) = stored_admin_key
            && key.verify(provided.expose_secret())
        {
            return ready(Ok(Identity {
                user_id: user_id.unwrap_or_else(Uuid::nil),
                role: Role::Admin,
            }));
        }

        match user_id {
            Some(user_id) => ready(Ok(Identity {
                user_id,
                role: Role::User,
            })),
            None => ready(Err(AuthError {
                message: format!("Missing caller identity. Provide {} header.", USER_ID_HEADER),
            })),
        }
    }
}
