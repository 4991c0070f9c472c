//! The `FleetManager` seam.

use std::sync::Arc;

use warmpool_core::CompletionRequest;

use crate::error::FleetResult;

pub type BoxFuture<'a, T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Anything that can complete a pending lifecycle action.
///
/// Implementations must issue at most one call per invocation; retrying is
/// the reactor's decision.
pub trait FleetManager: Send + Sync {
    fn complete_lifecycle_action<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> BoxFuture<'a, FleetResult<()>>;
}

impl<T: FleetManager + ?Sized> FleetManager for Arc<T> {
    fn complete_lifecycle_action<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> BoxFuture<'a, FleetResult<()>> {
        (**self).complete_lifecycle_action(request)
    }
}
