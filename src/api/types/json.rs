//! JSON extractor whose rejections use the API error body

use axum::{
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
};
use serde::{de::DeserializeOwned, Serialize};

use super::error::{ApiError, ApiErrorType};

#[derive(Debug, Clone, Default)]
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        axum::Json::<T>::from_request(req, state)
            .await
            .map(|axum::Json(value)| Json(value))
            .map_err(|rejection| {
                ApiError::new(
                    rejection.status(),
                    ApiErrorType::InvalidRequestError,
                    rejection.body_text(),
                )
                .with_code("invalid_json")
            })
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::work_item::WorkItemDraft;
    use axum::body::Body;
    use axum::http::header::CONTENT_TYPE;
    use axum::http::StatusCode;

    fn request(body: &str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/v1/work-items")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_extracts_valid_body() {
        let Json(draft) =
            Json::<WorkItemDraft>::from_request(request(r#"{"scope":"b","title":"t"}"#), &())
                .await
                .unwrap();

        assert_eq!(draft.title, "t");
        assert!(draft.description.is_empty());
    }

    #[tokio::test]
    async fn test_missing_field_is_rejected_as_api_error() {
        let err = Json::<WorkItemDraft>::from_request(request(r#"{"scope":"b"}"#), &())
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.response.error.error_type, ApiErrorType::InvalidRequestError);
        assert_eq!(err.response.error.code.as_deref(), Some("invalid_json"));
        assert!(err.response.error.message.contains("title"));
    }

    #[tokio::test]
    async fn test_syntax_error() {
        let err = Json::<WorkItemDraft>::from_request(request("{not json"), &())
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
