//! Embedded-side context provider.
//!
//! On mount the provider acquires one launch context, completes the
//! large-selection relay if the context only carries a key, and publishes the
//! result to the page through [`DynamicsContext`].

use std::future::Future;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ProviderSettings;
use crate::context::LauncherContext;
use crate::window::Window;

mod acquire;
pub mod relay;
mod scope;

#[cfg(test)]
mod tests;

pub use scope::{use_dynamics_context, ProviderError};

pub const CONNECTING_USER_NAME: &str = "Connecting...";
pub const LOADING_USER_GUID: &str = "Loading...";

/// What the page sees.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicsState {
    pub user_name: String,
    pub user_guid: String,
    pub launcher_context: Option<LauncherContext>,
}

impl Default for DynamicsState {
    fn default() -> Self {
        Self {
            user_name: CONNECTING_USER_NAME.to_string(),
            user_guid: LOADING_USER_GUID.to_string(),
            launcher_context: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionChannel {
    /// `?data=` on the page URL.
    Url,
    /// A `D365_CONTEXT` message from the parent window.
    Message,
    /// The local development context.
    LocalFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    /// A payload arrived and was published (its context may still be absent
    /// if it did not deserialize).
    Resolved(AcquisitionChannel),
    /// The URL payload could not be decoded; nothing was published.
    Failed(AcquisitionChannel),
    Cancelled,
}

/// Read-only view of the provider's state.
#[derive(Debug, Clone)]
pub struct DynamicsContext {
    state: watch::Receiver<DynamicsState>,
}

impl DynamicsContext {
    pub fn snapshot(&self) -> DynamicsState {
        self.state.borrow().clone()
    }

    pub fn user_name(&self) -> String {
        self.state.borrow().user_name.clone()
    }

    pub fn user_guid(&self) -> String {
        self.state.borrow().user_guid.clone()
    }

    pub fn launcher_context(&self) -> Option<LauncherContext> {
        self.state.borrow().launcher_context.clone()
    }

    /// Waits until a context is published. Returns `None` if the provider
    /// finished without publishing one.
    pub async fn wait_for_context(&mut self) -> Option<LauncherContext> {
        self.state
            .wait_for(|state| state.launcher_context.is_some())
            .await
            .ok()
            .and_then(|state| state.launcher_context.clone())
    }

    /// Resolves on the next published change; `false` once the provider is gone.
    pub async fn changed(&mut self) -> bool {
        self.state.changed().await.is_ok()
    }
}

pub struct ContextProvider {
    window: Window,
    settings: ProviderSettings,
}

impl ContextProvider {
    pub fn new(window: Window, settings: ProviderSettings) -> Self {
        Self { window, settings }
    }

    /// Starts acquisition. Must be called inside a tokio runtime.
    ///
    /// The message listener is attached before this returns.
    pub fn mount(self) -> ProviderHandle {
        let (sender, receiver) = watch::channel(DynamicsState::default());
        let cancel = CancellationToken::new();
        let inbox = self.window.subscribe();
        let task = tokio::spawn(acquire::run(
            self.window,
            self.settings,
            inbox,
            sender,
            cancel.clone(),
        ));
        ProviderHandle {
            context: DynamicsContext { state: receiver },
            cancel,
            task: Some(task),
        }
    }
}

pub struct ProviderHandle {
    context: DynamicsContext,
    cancel: CancellationToken,
    task: Option<JoinHandle<Acquisition>>,
}

impl ProviderHandle {
    pub fn context(&self) -> DynamicsContext {
        self.context.clone()
    }

    /// Runs `future` as a descendant of this provider, where
    /// [`use_dynamics_context`] resolves.
    pub async fn scope<F: Future>(&self, future: F) -> F::Output {
        scope::enter(self.context(), future).await
    }

    /// Unmount: stops the fallback timer and any pending listener.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Waits for acquisition to finish.
    pub async fn settled(mut self) -> Acquisition {
        let Some(task) = self.task.take() else {
            return Acquisition::Cancelled;
        };
        match task.await {
            Ok(acquisition) => acquisition,
            Err(error) => {
                tracing::error!(%error, "context acquisition task failed");
                Acquisition::Cancelled
            }
        }
    }
}

impl Drop for ProviderHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
