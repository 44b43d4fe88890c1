//! The JSON envelope every handler answers with, and the JSON body extractor
//! that reports malformed input in the same envelope.

use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use folio_shared::pagination::Pagination;

use crate::error::ApiError;

/// `{success: true, message?, token?, data?, pagination?}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pagination: Option<Pagination>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            token: None,
            data: Some(data),
            pagination: None,
            status: StatusCode::OK,
        }
    }

    /// 201 with the created entity.
    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(data)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }
}

impl ApiResponse<()> {
    /// Success without a payload.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            token: None,
            data: None,
            pagination: None,
            status: StatusCode::OK,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// `axum::Json` whose rejections render as [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;

    async fn render<T: Serialize>(response: ApiResponse<T>) -> (StatusCode, serde_json::Value) {
        let response = response.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_optional_fields_omitted() {
        let (status, body) = render(ApiResponse::ok(vec![1, 2])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"success": true, "data": [1, 2]}));
    }

    #[tokio::test]
    async fn test_created_with_everything() {
        let pagination = Pagination {
            total: 13,
            page: 3,
            pages: 3,
            limit: 6,
        };
        let response = ApiResponse::created("x")
            .with_message("done")
            .with_token("t0k".into())
            .with_pagination(pagination);
        let (status, body) = render(response).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "done");
        assert_eq!(body["token"], "t0k");
        assert_eq!(body["pagination"]["pages"], 3);
    }

    #[tokio::test]
    async fn test_message_only() {
        let (_, body) = render(ApiResponse::message("Blog deleted")).await;
        assert_eq!(body, serde_json::json!({"success": true, "message": "Blog deleted"}));
    }
}
