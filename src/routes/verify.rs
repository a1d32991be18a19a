use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};

use crate::domain::SubscriberEmail;
use crate::routes::helpers::{envelope, ApiError, LinkParameters};
use crate::subscriptions::SubscriptionService;

/// Same wording whether the email is unknown or the token is wrong
const VERIFY_FAILED: &str = "User verification failed";

/// Verification handler
#[tracing::instrument(name = "Verify a subscriber", skip(parameters, subscriptions))]
pub async fn verify(
    parameters: web::Query<LinkParameters>,
    subscriptions: web::Data<SubscriptionService>,
) -> Result<HttpResponse, ApiError> {
    let (email, token) = parameters.into_inner().required()?;

    // An invalid address cannot have a record
    let email =
        SubscriberEmail::parse(email).map_err(|_| ApiError::AuthorizationError(VERIFY_FAILED))?;

    subscriptions
        .verify(&email, &token)
        .await
        .map_err(|e| ApiError::from_subscription(e, VERIFY_FAILED))?;

    Ok(envelope(StatusCode::OK, "User verified successfully"))
}
