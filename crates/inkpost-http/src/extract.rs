//! Extractors whose rejections use the API error body

use crate::HttpError;
use async_trait::async_trait;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::{request::Parts, StatusCode};
use axum::Json;
use serde::de::DeserializeOwned;

/// JSON request body
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> HttpError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return HttpError::RequestTooLarge;
    }
    HttpError::bad_request(rejection.body_text())
}

/// Query string parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| Self(value))
            .map_err(|rejection: QueryRejection| HttpError::bad_request(rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::{get, post};
    use axum::Router;
    use axum_test::TestServer;
    use serde::Deserialize;
    use serde_json::{json, Value};

    #[derive(Deserialize)]
    struct Input {
        name: String,
    }

    #[derive(Deserialize)]
    struct Paging {
        page: u32,
    }

    fn app() -> Router {
        Router::new()
            .route(
                "/echo",
                post(|JsonBody(input): JsonBody<Input>| async move { input.name }),
            )
            .route(
                "/page",
                get(|QueryParams(paging): QueryParams<Paging>| async move {
                    paging.page.to_string()
                }),
            )
    }

    #[tokio::test]
    async fn test_json_body() {
        let server = TestServer::new(app()).unwrap();
        let response = server.post("/echo").json(&json!({ "name": "ink" })).await;
        response.assert_status_ok();
        response.assert_text("ink");

        let response = server.post("/echo").json(&json!({ "title": 1 })).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_query_params() {
        let server = TestServer::new(app()).unwrap();
        server.get("/page").add_query_param("page", 2).await.assert_text("2");

        let response = server.get("/page").add_query_param("page", "two").await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
