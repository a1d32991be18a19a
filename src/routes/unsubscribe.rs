use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};

use crate::domain::SubscriberEmail;
use crate::routes::helpers::{envelope, ApiError, LinkParameters};
use crate::subscriptions::SubscriptionService;

/// Same wording whether the email is unknown or the token is wrong
const UNSUBSCRIBE_FAILED: &str = "Failed to unsubscribe";

/// Unsubscription handler
#[tracing::instrument(name = "Unsubscribe a subscriber", skip(parameters, subscriptions))]
pub async fn unsubscribe(
    parameters: web::Query<LinkParameters>,
    subscriptions: web::Data<SubscriptionService>,
) -> Result<HttpResponse, ApiError> {
    let (email, token) = parameters.into_inner().required()?;
    let email =
        SubscriberEmail::parse(email).map_err(|_| ApiError::AuthorizationError(UNSUBSCRIBE_FAILED))?;

    subscriptions
        .unsubscribe(&email, &token)
        .await
        .map_err(|e| ApiError::from_subscription(e, UNSUBSCRIBE_FAILED))?;

    Ok(envelope(StatusCode::OK, "You are successfully unsubscribed"))
}
