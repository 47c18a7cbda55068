//! The producer seam: caller-supplied async functions that yield a value.

use futures_util::future::BoxFuture;
use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::fetch::error::BoxError;

/// Source of a resource value.
///
/// Each call is one attempt. The token is cancelled when the attempt times
/// out, is superseded, or its handle is dropped; producers that spawn work of
/// their own should stop when it fires. Producers must be safe to call repeatedly.
pub trait Producer<T>: Send + Sync + 'static {
    fn produce(&self, token: CancellationToken) -> BoxFuture<'static, Result<T, BoxError>>;
}

impl<T, E, F, Fut> Producer<T> for F
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Into<BoxError> + 'static,
    T: Send + 'static,
{
    fn produce(&self, token: CancellationToken) -> BoxFuture<'static, Result<T, BoxError>> {
        let attempt = (self)(token);
        Box::pin(async move { attempt.await.map_err(Into::into) })
    }
}
