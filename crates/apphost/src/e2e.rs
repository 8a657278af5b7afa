//! Launcher and provider wired together through an in-process host.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::{LauncherSettings, ProviderSettings};
use crate::context::{ContextType, UserSettings, DATA_PARAM};
use crate::controls::GridSnapshot;
use crate::host::{AlertDialog, HostApi, NavigationError, NavigationOptions, PageInput};
use crate::launcher::{LaunchOutcome, Launcher};
use crate::provider::{ContextProvider, DynamicsContext, ProviderHandle};
use crate::registry::{AppManifestEntry, AppRegistry};
use crate::storage::MemorySessionStorage;
use crate::window::Window;

const PAGE_ORIGIN: &str = "https://org.crm.dynamics.com";

/// Opens each navigation as an embedded dialog window running a provider.
struct EmbeddingHost {
    window: Window,
    pages: Mutex<Vec<ProviderHandle>>,
}

impl EmbeddingHost {
    fn new(window: Window) -> Self {
        Self {
            window,
            pages: Mutex::new(Vec::new()),
        }
    }

    fn last_page(&self) -> DynamicsContext {
        self.pages
            .lock()
            .expect("pages lock")
            .last()
            .expect("opened page")
            .context()
    }
}

#[async_trait]
impl HostApi for EmbeddingHost {
    fn user_settings(&self) -> UserSettings {
        UserSettings {
            user_id: "{C0FFEE00-0000-0000-0000-000000000001}".to_string(),
            user_name: "Margaret Hamilton".to_string(),
            language_id: Some(1033),
        }
    }

    async fn navigate_to(
        &self,
        page: PageInput,
        _options: NavigationOptions,
    ) -> Result<(), NavigationError> {
        let data = page
            .data
            .ok_or_else(|| NavigationError::new("navigation carried no data"))?;
        let dialog = self
            .window
            .embed(PAGE_ORIGIN, HashMap::from([(DATA_PARAM.to_string(), data)]));
        let handle = ContextProvider::new(dialog, ProviderSettings::default()).mount();
        self.pages.lock().expect("pages lock").push(handle);
        Ok(())
    }

    async fn open_alert_dialog(&self, _dialog: AlertDialog) {}
}

fn wire() -> (Launcher, Arc<EmbeddingHost>) {
    let window = Window::top_level(PAGE_ORIGIN);
    let host = Arc::new(EmbeddingHost::new(window.clone()));
    let registry = Arc::new(AppRegistry::from_manifest(&[AppManifestEntry::conventional(
        "BulkMailer",
    )]));
    let launcher = Launcher::new(
        registry,
        LauncherSettings::default(),
        host.clone(),
        Arc::new(MemorySessionStorage::new()),
        window,
    );
    (launcher, host)
}

fn grid() -> GridSnapshot {
    GridSnapshot {
        entity_name: Some("contact".to_string()),
        view: None,
    }
}

fn selection(count: usize) -> Vec<String> {
    (0..count)
        .map(|n| format!("{{5E1EC7ED-0000-0000-0000-{n:012}}}"))
        .collect()
}

#[tokio::test]
async fn small_selection_arrives_through_the_url() {
    let (launcher, host) = wire();

    let outcome = launcher
        .launch_from_grid("bulkmailer", &grid(), &selection(3))
        .await;
    assert!(matches!(outcome, LaunchOutcome::Navigated { .. }));

    let mut page = host.last_page();
    let context = page.wait_for_context().await.expect("context");
    assert_eq!(context.context_type, ContextType::Grid);
    assert_eq!(context.entity_name, "contact");
    assert_eq!(
        context.record_ids,
        vec![
            "5E1EC7ED-0000-0000-0000-000000000000",
            "5E1EC7ED-0000-0000-0000-000000000001",
            "5E1EC7ED-0000-0000-0000-000000000002",
        ]
    );
    assert_eq!(page.user_name(), "Margaret Hamilton");
    assert_eq!(page.user_guid(), "C0FFEE00-0000-0000-0000-000000000001");
}

#[tokio::test]
async fn large_selection_arrives_through_the_relay() {
    let (launcher, host) = wire();

    let outcome = launcher
        .launch_from_grid("bulkmailer", &grid(), &selection(150))
        .await;
    let LaunchOutcome::Navigated { context: sent, .. } = outcome else {
        panic!("expected navigation, got {outcome:?}");
    };
    assert!(sent.record_ids.is_empty());
    assert_eq!(sent.use_summary_mode, Some(true));

    let mut page = host.last_page();
    let context = page.wait_for_context().await.expect("context");
    assert_eq!(context.record_ids.len(), 150);
    assert_eq!(
        context.record_ids[149],
        "5E1EC7ED-0000-0000-0000-000000000149"
    );
    assert_eq!(context.total_record_count, Some(150));
    assert_eq!(context.selected_record_count, Some(150));
    assert_eq!(context.selection_key, sent.selection_key);
    assert_eq!(page.user_name(), "Margaret Hamilton");
}
