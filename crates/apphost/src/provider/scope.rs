use std::future::Future;

use thiserror::Error;

use super::DynamicsContext;

tokio::task_local! {
    static DYNAMICS: DynamicsContext;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("use_dynamics_context must be used within a DynamicsProvider scope")]
    OutsideProvider,
}

pub(super) async fn enter<F: Future>(context: DynamicsContext, future: F) -> F::Output {
    DYNAMICS.scope(context, future).await
}

/// The provider's state for code running under [`super::ProviderHandle::scope`].
///
/// Errors outside a provider rather than handing back an empty default, so a
/// page mounted without its provider fails visibly.
pub fn use_dynamics_context() -> Result<DynamicsContext, ProviderError> {
    DYNAMICS
        .try_with(DynamicsContext::clone)
        .map_err(|_| ProviderError::OutsideProvider)
}
