use actix_web::HttpResponse;

use crate::routes::helpers::ApiError;

/// Fallback for every method and path combination that is not routed
///
/// Method and path are already recorded on the request's root span.
#[tracing::instrument(name = "Rejecting an unsupported request")]
pub async fn method_not_allowed() -> Result<HttpResponse, ApiError> {
    Err(ApiError::MethodNotAllowed)
}
