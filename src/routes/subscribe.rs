use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use tracing::field::display;
use tracing::Span;

use crate::domain::SubscriberEmail;
use crate::routes::helpers::{envelope, ApiError};
use crate::subscriptions::SubscriptionService;

/// Subscription request body
#[derive(serde::Deserialize)]
pub struct SubscribeBody {
    email: Option<String>,
}

/// Subscribe handler
///
/// The raw body is parsed here so that malformed JSON ends up in the uniform
/// error envelope instead of the framework's default payload error.
#[tracing::instrument(
    name = "Adding a new subscriber",
    skip(body, subscriptions),
    fields(subscriber_email = tracing::field::Empty)
)]
pub async fn subscribe(
    body: web::Bytes,
    subscriptions: web::Data<SubscriptionService>,
) -> Result<HttpResponse, ApiError> {
    // Parse request body
    let body: SubscribeBody = serde_json::from_slice(&body).map_err(ApiError::unexpected)?;
    let email = body
        .email
        .filter(|e| !e.is_empty())
        .ok_or(ApiError::ValidationError("Email is required"))?;
    let email = SubscriberEmail::parse(email)
        .map_err(|_| ApiError::ValidationError("Email is not valid"))?;
    Span::current().record("subscriber_email", display(&email));

    // Create or refresh the pending subscription
    subscriptions
        .subscribe(email)
        .await
        .map_err(|e| ApiError::from_subscription(e, "Failed to subscribe"))?;

    Ok(envelope(StatusCode::OK, "User subscribed successfully"))
}
