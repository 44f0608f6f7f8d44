use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::errors::AppError;

pub const SESSION_HEADER: &str = "x-session-id";

/// Session id taken from the `x-session-id` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(SESSION_HEADER)
            .ok_or_else(|| AppError::Validation(format!("{SESSION_HEADER} header is required")))?
            .to_str()
            .map_err(|_| AppError::Validation(format!("{SESSION_HEADER} must be a UUID")))?;

        Uuid::parse_str(raw.trim())
            .map(SessionId)
            .map_err(|_| AppError::Validation(format!("{SESSION_HEADER} must be a UUID")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<SessionId, AppError> {
        let mut builder = Request::builder().uri("/api/v1/account");
        if let Some(value) = header {
            builder = builder.header(SESSION_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        SessionId::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_valid_uuid_is_accepted() {
        let id = Uuid::new_v4();
        let extracted = extract(Some(&id.to_string())).await.unwrap();
        assert_eq!(extracted, SessionId(id));
    }

    #[tokio::test]
    async fn test_missing_or_malformed_header_is_validation_error() {
        assert!(matches!(extract(None).await, Err(AppError::Validation(_))));
        assert!(matches!(
            extract(Some("not-a-uuid")).await,
            Err(AppError::Validation(_))
        ));
    }
}
