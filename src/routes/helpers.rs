use std::{error, fmt};

use actix_web::dev::ServiceResponse;
use actix_web::http::{header, StatusCode};
use actix_web::middleware::ErrorHandlerResponse;
use actix_web::{HttpResponse, ResponseError};

use crate::subscriptions::SubscriptionError;

/// Provide a representation for any type that implements `Error`
pub fn error_chain_fmt(e: &impl error::Error, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{e}\n")?;

    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{cause}")?;
        current = cause.source();
    }

    Ok(())
}

/// JSON body shared by every response
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Envelope {
    pub message: String,
}

/// Build a response with the uniform `{"message": ...}` body
pub fn envelope(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(Envelope {
        message: message.to_owned(),
    })
}

/// Wrap error responses produced by the framework itself (payload limits,
/// broken request bodies) in the envelope
///
/// Responses built by [`ApiError`] are JSON already and go through untouched.
pub fn envelope_framework_error<B>(
    res: ServiceResponse<B>,
) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let is_envelope = res
        .response()
        .headers()
        .get(header::CONTENT_TYPE)
        .is_some_and(|content_type| content_type == "application/json");
    if is_envelope {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    }

    tracing::error!(
        http.status_code = res.status().as_u16(),
        error.message = ?res.response().error(),
        "The framework rejected the request before it reached a handler"
    );
    let (request, _) = res.into_parts();
    let response = envelope(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
    Ok(ErrorHandlerResponse::Response(
        ServiceResponse::new(request, response).map_into_right_body(),
    ))
}

/// Error type shared by all handlers
#[derive(thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    ValidationError(&'static str),
    #[error("{0}")]
    AuthorizationError(&'static str),
    #[error("{0}")]
    ConflictError(&'static str),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error(transparent)]
    UnexpectedError(anyhow::Error),
}

impl ApiError {
    /// Log an unexpected failure with its cause chain and hide it from the caller
    pub fn unexpected(e: impl Into<anyhow::Error>) -> Self {
        let e = e.into();
        tracing::error!(
            error.cause_chain = ?e,
            error.message = %e,
            "Unexpected failure while handling a request"
        );
        Self::UnexpectedError(e)
    }

    /// Map a subscription failure, using `auth_failure` as the generic message for
    /// unknown emails and mismatching tokens
    pub fn from_subscription(e: SubscriptionError, auth_failure: &'static str) -> Self {
        match e {
            SubscriptionError::AlreadySubscribed => Self::ConflictError("User already subscribed"),
            SubscriptionError::Unauthorized => Self::AuthorizationError(auth_failure),
            SubscriptionError::UnexpectedError(e) => Self::unexpected(e),
        }
    }

    /// Message returned to the caller
    fn public_message(&self) -> String {
        match self {
            Self::UnexpectedError(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Debug for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) | Self::AuthorizationError(_) | Self::ConflictError(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        envelope(self.status_code(), &self.public_message())
    }
}

/// Query parameters carried by verification and unsubscription links
#[derive(serde::Deserialize)]
pub struct LinkParameters {
    email: Option<String>,
    token: Option<String>,
}

impl LinkParameters {
    /// Return email and token, treating empty values as missing
    pub fn required(self) -> Result<(String, String), ApiError> {
        let email = self.email.filter(|e| !e.is_empty());
        let token = self.token.filter(|t| !t.is_empty());
        email
            .zip(token)
            .ok_or(ApiError::ValidationError("Email and token are required"))
    }
}
