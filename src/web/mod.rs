//! axum integration
//!
//! `BindCreate<T>` and `BindUpdate<T>` are request extractors that run the
//! [`Binder`] found in router state (via `FromRef`) against the request body.
//! Failures are rendered through [`WebError`].

use async_trait::async_trait;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{FromRef, FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use http_body_util::LengthLimitError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::bind::{Binder, UpdateBinding};
use crate::core::BindError;
use crate::mapping::Record;

#[derive(Debug, Serialize)]
pub struct FieldErrorBody {
    pub field: String,
    pub rule: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldErrorBody>,
}

#[derive(Debug)]
pub enum WebError {
    Bind(BindError),
    Input(String),
    NotFound(String),
    Internal(String),
}

impl From<BindError> for WebError {
    fn from(err: BindError) -> Self {
        WebError::Bind(err)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message, code, fields) = match self {
            WebError::Bind(BindError::Decode(msg)) => {
                (StatusCode::BAD_REQUEST, msg, "decode_error", Vec::new())
            }
            WebError::Bind(err @ BindError::BodyTooLarge { .. }) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                err.to_string(),
                "payload_too_large",
                Vec::new(),
            ),
            WebError::Bind(BindError::Validation(err)) => {
                let message = err.to_string();
                let fields = err
                    .into_violations()
                    .into_iter()
                    .map(|violation| FieldErrorBody {
                        field: violation.external,
                        rule: violation.rule,
                        message: violation.message,
                    })
                    .collect();
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    message,
                    "validation_error",
                    fields,
                )
            }
            WebError::Input(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                msg,
                "input_error",
                Vec::new(),
            ),
            WebError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "not_found", Vec::new()),
            WebError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                msg,
                "internal_error",
                Vec::new(),
            ),
        };

        let body = Json(ErrorResponse {
            error: message,
            code: code.to_string(),
            fields,
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, WebError>;

/// Record bound through the create path.
#[derive(Debug)]
pub struct BindCreate<T>(pub T);

/// Record bound through the update path, with its presence sets.
#[derive(Debug)]
pub struct BindUpdate<T>(pub UpdateBinding<T>);

#[async_trait]
impl<S, T> FromRequest<S> for BindCreate<T>
where
    Binder: FromRef<S>,
    S: Send + Sync,
    T: Record + DeserializeOwned + Send,
{
    type Rejection = WebError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let binder = Binder::from_ref(state);
        let body = collect_body(req, &binder).await?;
        let record = binder.bind_slice::<T>(&body).inspect_err(|err| {
            debug!(record = T::descriptor().name(), error = %err, "create binding rejected");
        })?;
        Ok(Self(record))
    }
}

#[async_trait]
impl<S, T> FromRequest<S> for BindUpdate<T>
where
    Binder: FromRef<S>,
    S: Send + Sync,
    T: Record + DeserializeOwned + Send,
{
    type Rejection = WebError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let binder = Binder::from_ref(state);
        let body = collect_body(req, &binder).await?;
        let binding = binder.bind_slice_for_update::<T>(&body).inspect_err(|err| {
            debug!(record = T::descriptor().name(), error = %err, "update binding rejected");
        })?;
        debug!(
            record = T::descriptor().name(),
            columns = ?binding.columns(),
            "update binding accepted"
        );
        Ok(Self(binding))
    }
}

async fn collect_body(req: Request, binder: &Binder) -> Result<Bytes> {
    let max = binder.config().max_body_bytes;
    match axum::body::to_bytes(req.into_body(), binder.config().effective_limit()).await {
        Ok(bytes) => Ok(bytes),
        Err(err) => {
            let inner = err.into_inner();
            match max {
                Some(limit) if inner.downcast_ref::<LengthLimitError>().is_some() => {
                    Err(WebError::Bind(BindError::BodyTooLarge { limit }))
                }
                _ => Err(WebError::Bind(BindError::Decode(format!(
                    "failed to read request body: {}",
                    inner
                )))),
            }
        }
    }
}
