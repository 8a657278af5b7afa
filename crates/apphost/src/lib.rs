pub mod cli;
pub mod config;
pub mod context;
pub mod controls;
pub mod error;
pub mod host;
pub mod ids;
pub mod launcher;
pub mod protocol;
pub mod provider;
pub mod registry;
pub mod storage;
pub mod utils;
pub mod window;

#[cfg(test)]
mod e2e;

pub use crate::config::{AppHostConfig, LauncherSettings, ProviderSettings};
pub use crate::context::{ContextType, LauncherContext, UserSettings};
pub use crate::error::{AppHostError, AppHostResult};
pub use crate::launcher::{LaunchOutcome, Launcher};
pub use crate::provider::{use_dynamics_context, ContextProvider, DynamicsContext, DynamicsState};
pub use crate::registry::{AppManifestEntry, AppRegistration, AppRegistry};
pub use crate::window::Window;
