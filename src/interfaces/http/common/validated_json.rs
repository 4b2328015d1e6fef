//! JSON body extractor with `validator` rules
//!
//! Unparseable bodies are rejected with 400, rule violations with 422 and
//! a `path: message` list that reaches into nested and list fields.

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use super::ApiResponse;

/// `Json<T>` that also runs `T::validate()`
pub struct ValidatedJson<T>(pub T);

pub enum ValidatedJsonRejection {
    Json(JsonRejection),
    Rules(ValidationErrors),
}

/// Flatten nested and list errors into `path: message` lines, e.g.
/// `damages[1].cost: range`
fn describe(prefix: &str, errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                for e in errs {
                    out.push(format!("{}: {}", path, e.message.as_ref().unwrap_or(&e.code)));
                }
            }
            ValidationErrorsKind::Struct(inner) => describe(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    describe(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

impl IntoResponse for ValidatedJsonRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Json(rejection) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid JSON body: {}", rejection.body_text()),
            ),
            Self::Rules(errors) => {
                let mut problems = Vec::new();
                describe("", &errors, &mut problems);
                problems.sort();
                let message = if problems.is_empty() {
                    "Validation failed".to_string()
                } else {
                    problems.join("; ")
                };
                (StatusCode::UNPROCESSABLE_ENTITY, message)
            }
        };
        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidatedJsonRejection;

    async fn from_request(
        req: axum::extract::Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(ValidatedJsonRejection::Json)?;

        value
            .validate()
            .map_err(ValidatedJsonRejection::Rules)?;

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize, Validate)]
    struct Item {
        #[validate(range(min = 0))]
        cost: i64,
    }

    #[derive(Debug, Deserialize, Validate)]
    struct Report {
        #[validate(nested)]
        items: Vec<Item>,
    }

    #[derive(Debug, Deserialize, Validate)]
    struct TopUp {
        #[validate(range(min = 1))]
        amount: i64,
        #[validate(length(min = 1, max = 32))]
        method: String,
    }

    async fn handler(ValidatedJson(_body): ValidatedJson<TopUp>) -> &'static str {
        "ok"
    }

    async fn post_body(body: &'static str) -> StatusCode {
        let app = Router::new().route("/top-up", post(handler));
        let request = Request::builder()
            .method("POST")
            .uri("/top-up")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn valid_body_passes() {
        assert_eq!(post_body(r#"{"amount": 500, "method": "card"}"#).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn unparseable_body_is_400() {
        assert_eq!(post_body("amount=500").await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rule_violation_is_422() {
        assert_eq!(
            post_body(r#"{"amount": 0, "method": ""}"#).await,
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn nested_violation_names_the_item() {
        async fn report(ValidatedJson(_body): ValidatedJson<Report>) -> &'static str {
            "ok"
        }
        let app = Router::new().route("/report", post(report));
        let request = Request::builder()
            .method("POST")
            .uri("/report")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"items": [{"cost": 5}, {"cost": -1}]}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "items[1].cost: range");
    }
}
