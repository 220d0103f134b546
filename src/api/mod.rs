/// API routes and handlers
pub mod users;

use crate::{
    context::AppContext,
    error::{StoreError, StoreResult},
};
use axum::Router;
use std::future::Future;
use std::time::Duration;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new().merge(users::routes())
}

/// Run an identity call under the request deadline.
///
/// On expiry the call's future is dropped, which releases any directory
/// session it still holds.
pub async fn with_deadline<F: Future>(deadline: Duration, call: F) -> StoreResult<F::Output> {
    tokio::time::timeout(deadline, call).await.map_err(|_| {
        tracing::warn!("Request deadline of {:?} exceeded", deadline);
        StoreError::DeadlineExceeded(deadline)
    })
}
