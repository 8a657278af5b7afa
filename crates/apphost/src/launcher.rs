//! Host-side launcher: turns a command-button invocation into a navigation
//! request carrying the selection context.

use std::sync::Arc;

use crate::config::LauncherSettings;
use crate::context::{encode_data, ContextType, LauncherContext, UserSettings};
use crate::controls::{PrimaryControl, SelectedControl};
use crate::host::{AlertDialog, DialogPosition, HostApi, NavigationOptions, NavigationTarget, PageInput};
use crate::ids::{normalize_ids, strip_braces};
use crate::registry::{AppRegistration, AppRegistry};
use crate::storage::SessionStorage;
use crate::window::Window;

pub mod relay;


pub const LAUNCH_ERROR_TITLE: &str = "Launch Error";

/// What a launch did. Failures have already been shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum LaunchOutcome {
    Navigated {
        app_id: String,
        context: LauncherContext,
    },
    UnknownApp {
        app_id: String,
    },
    NavigationFailed {
        app_id: String,
        message: String,
    },
}

pub struct Launcher {
    registry: Arc<AppRegistry>,
    settings: LauncherSettings,
    host: Arc<dyn HostApi>,
    storage: Arc<dyn SessionStorage>,
    window: Window,
}

impl Launcher {
    /// `window` is the host window; relay responders listen on it.
    pub fn new(
        registry: Arc<AppRegistry>,
        settings: LauncherSettings,
        host: Arc<dyn HostApi>,
        storage: Arc<dyn SessionStorage>,
        window: Window,
    ) -> Self {
        Self {
            registry,
            settings,
            host,
            storage,
            window,
        }
    }

    pub fn available_apps(&self) -> Vec<String> {
        self.registry.ids()
    }

    pub async fn launch(
        &self,
        app_id: &str,
        primary: Option<&dyn PrimaryControl>,
        selected: Option<&dyn SelectedControl>,
        selected_ids: Option<&[String]>,
    ) -> LaunchOutcome {
        let Some(registration) = self.registry.get(app_id) else {
            tracing::error!(app_id, "unknown app id");
            self.alert(format!("App configuration not found for: {app_id}"))
                .await;
            return LaunchOutcome::UnknownApp {
                app_id: app_id.to_string(),
            };
        };

        let context = self.build_context(registration, primary, selected, selected_ids);
        let data = match encode_data(&context) {
            Ok(data) => data,
            Err(error) => return self.navigation_failed(registration, error.to_string()).await,
        };

        let page = PageInput::web_resource(self.resource_path(registration), Some(data));
        let options = NavigationOptions {
            target: NavigationTarget::Dialog,
            width: registration.width,
            height: registration.height,
            position: DialogPosition::Center,
            title: registration.title.clone(),
        };

        match self.host.navigate_to(page, options).await {
            Ok(()) => LaunchOutcome::Navigated {
                app_id: registration.id.clone(),
                context,
            },
            Err(error) => self.navigation_failed(registration, error.message).await,
        }
    }

    pub async fn launch_from_form(&self, app_id: &str, form: &dyn PrimaryControl) -> LaunchOutcome {
        self.launch(app_id, Some(form), None, None).await
    }

    pub async fn launch_from_grid(
        &self,
        app_id: &str,
        grid: &dyn SelectedControl,
        selected_ids: &[String],
    ) -> LaunchOutcome {
        self.launch(app_id, None, Some(grid), Some(selected_ids))
            .await
    }

    /// Generated `open<AppName>` button entry point.
    pub async fn open(
        &self,
        app_name: &str,
        primary: Option<&dyn PrimaryControl>,
        selected: Option<&dyn SelectedControl>,
        selected_ids: Option<&[String]>,
    ) -> LaunchOutcome {
        self.launch(&app_name.to_lowercase(), primary, selected, selected_ids)
            .await
    }

    fn resource_path(&self, registration: &AppRegistration) -> String {
        let resource = if self.settings.use_debugger {
            registration.resource_name.replacen(".html", "_debugger.html", 1)
        } else {
            registration.resource_name.clone()
        };
        format!("{}/{}", self.settings.base_path, resource)
    }

    fn build_context(
        &self,
        registration: &AppRegistration,
        primary: Option<&dyn PrimaryControl>,
        selected: Option<&dyn SelectedControl>,
        selected_ids: Option<&[String]>,
    ) -> LauncherContext {
        let user = self.host.user_settings();
        let mut context = LauncherContext::new(
            registration.id.clone(),
            UserSettings {
                user_id: strip_braces(&user.user_id),
                ..user
            },
        );

        context.entity_name = selected
            .and_then(|control| control.entity_name().ok())
            .or_else(|| primary.and_then(|control| control.entity_name().ok()))
            .unwrap_or_default();

        if let Some(ids) = selected_ids.filter(|ids| !ids.is_empty()) {
            context.context_type = if ids.len() == 1 {
                ContextType::Form
            } else {
                ContextType::Grid
            };
            self.apply_selection(&mut context, normalize_ids(ids));
        } else if let Some(selector) = selected.and_then(|control| control.view_selector()) {
            context.context_type = ContextType::Grid;
            match selector.current_view() {
                Ok(view) => context.view_id = Some(strip_braces(&view.id)),
                Err(error) => tracing::debug!(%error, "current view unavailable"),
            }
        } else if let Some(entity) = primary.and_then(|control| control.entity()) {
            context.context_type = ContextType::Form;
            let record = entity.entity_name().and_then(|name| {
                context.entity_name = name;
                entity.id()
            });
            match record {
                Ok(id) => context.record_ids = vec![strip_braces(&id)],
                Err(error) => tracing::debug!(%error, "form record unavailable"),
            }
        }

        context
    }

    /// Embeds small selections; parks large ones behind a relay key.
    fn apply_selection(&self, context: &mut LauncherContext, ids: Vec<String>) {
        let threshold = self.settings.summary_threshold;
        if ids.len() <= threshold {
            context.record_ids = ids;
            return;
        }

        let total = ids.len();
        context.total_record_count = Some(total);
        let key = relay::generate_selection_key();
        match relay::persist_selection(self.storage.as_ref(), &key, &ids) {
            Ok(()) => {
                context.use_summary_mode = Some(true);
                context.selection_key = Some(key.clone());
                relay::spawn_responder(
                    &self.window,
                    self.storage.clone(),
                    key,
                    ids,
                    self.settings.responder_ttl(),
                );
            }
            Err(error) => {
                tracing::warn!(%error, total, threshold, "selection not persisted, truncating");
                context.record_ids = ids.into_iter().take(threshold).collect();
            }
        }
    }

    async fn alert(&self, text: String) {
        self.host
            .open_alert_dialog(AlertDialog {
                text,
                title: LAUNCH_ERROR_TITLE.to_string(),
            })
            .await;
    }

    async fn navigation_failed(&self, registration: &AppRegistration, message: String) -> LaunchOutcome {
        tracing::error!(app_id = %registration.id, %message, "navigation error");
        self.alert(format!("Failed to open {}: {message}", registration.title))
            .await;
        LaunchOutcome::NavigationFailed {
            app_id: registration.id.clone(),
            message,
        }
    }
}
