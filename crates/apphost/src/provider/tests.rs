use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::task::JoinHandle;

use crate::config::ProviderSettings;
use crate::context::{
    encode_data, ContextType, LauncherContext, UserSettings, DATA_PARAM, LOCAL_DEV_RECORD_ID,
};
use crate::launcher::relay::{persist_selection, spawn_responder};
use crate::protocol::WireMessage;
use crate::storage::{MemorySessionStorage, SessionStorage};
use crate::window::Window;

use super::{
    use_dynamics_context, Acquisition, AcquisitionChannel, ContextProvider, ProviderError,
    CONNECTING_USER_NAME,
};

fn host() -> Window {
    Window::top_level("https://org.crm.dynamics.com")
}

fn user() -> UserSettings {
    UserSettings {
        user_id: "u-42".to_string(),
        user_name: "Grace Hopper".to_string(),
        language_id: None,
    }
}

fn page_with_data(host: &Window, context: &LauncherContext) -> Window {
    let data = encode_data(context).expect("encode");
    host.embed(
        "https://org.crm.dynamics.com",
        HashMap::from([(DATA_PARAM.to_string(), data)]),
    )
}

/// Host side of the message channel: answers the page's ready signal.
fn answer_ready_with(host: &Window, payload: Value) -> JoinHandle<()> {
    let inbox = host.subscribe();
    tokio::spawn(async move {
        let page = inbox
            .first_match(|event| match WireMessage::parse(&event.data) {
                Some(WireMessage::Ready) => event.source.clone(),
                _ => None,
            })
            .await
            .expect("ready signal");
        page.post_message(
            &WireMessage::Context { context: payload }.to_value(),
            "*",
            None,
        )
        .expect("post context");
    })
}

#[tokio::test]
async fn url_channel_publishes_context_and_identity() {
    let host = host();
    let mut expected = LauncherContext::new("invoiceviewer", user());
    expected.context_type = ContextType::Grid;
    expected.entity_name = "account".to_string();
    expected.record_ids = vec!["a".to_string(), "b".to_string()];
    let page = page_with_data(&host, &expected);
    let mut host_inbox = host.subscribe();

    let handle = ContextProvider::new(page, ProviderSettings::default()).mount();
    let mut context = handle.context();

    assert_eq!(context.wait_for_context().await, Some(expected));
    assert_eq!(context.user_name(), "Grace Hopper");
    assert_eq!(context.user_guid(), "u-42");
    assert_eq!(
        handle.settled().await,
        Acquisition::Resolved(AcquisitionChannel::Url)
    );

    host.handle()
        .post_message(&json!("marker"), "*", None)
        .expect("post");
    let first = host_inbox.recv().await.expect("recv");
    assert_eq!(first.data, json!("marker"), "no ready signal on the URL channel");
}

#[tokio::test]
async fn invalid_url_payload_leaves_context_empty() {
    let host = host();
    let page = host.embed(
        "https://org.crm.dynamics.com",
        HashMap::from([(
            DATA_PARAM.to_string(),
            urlencoding::encode("{\"type\": \"Form\",").into_owned(),
        )]),
    );

    let handle = ContextProvider::new(page, ProviderSettings::default()).mount();
    let context = handle.context();

    assert_eq!(
        handle.settled().await,
        Acquisition::Failed(AcquisitionChannel::Url)
    );
    assert!(context.launcher_context().is_none());
    assert_eq!(context.user_name(), CONNECTING_USER_NAME);
}

#[tokio::test]
async fn non_object_url_payload_is_a_failure() {
    let host = host();
    let page = host.embed(
        "https://org.crm.dynamics.com",
        HashMap::from([(DATA_PARAM.to_string(), "null".to_string())]),
    );

    let handle = ContextProvider::new(page, ProviderSettings::default()).mount();
    let context = handle.context();

    assert_eq!(
        handle.settled().await,
        Acquisition::Failed(AcquisitionChannel::Url)
    );
    assert!(context.launcher_context().is_none());
    assert_eq!(context.user_name(), CONNECTING_USER_NAME);
}

#[tokio::test]
async fn message_channel_accepts_context_after_ready() {
    let host = host();
    let page = host.embed("https://org.crm.dynamics.com", HashMap::new());
    let replier = answer_ready_with(
        &host,
        json!({
            "type": "Form",
            "entityName": "incident",
            "recordIds": ["{CASE-1}"],
            "userSettings": { "userId": "u-7", "userName": "Debugger" }
        }),
    );

    let handle = ContextProvider::new(page.clone(), ProviderSettings::default()).mount();
    let mut context = handle.context();

    let published = context.wait_for_context().await.expect("context");
    assert_eq!(published.entity_name, "incident");
    assert_eq!(published.record_ids, vec!["CASE-1"]);
    assert_eq!(context.user_name(), "Debugger");
    assert_eq!(
        handle.settled().await,
        Acquisition::Resolved(AcquisitionChannel::Message)
    );
    replier.await.expect("replier");
    assert_eq!(page.listener_count(), 0);
}

#[tokio::test]
async fn nested_wrapper_is_unwrapped() {
    let host = host();
    let page = host.embed("https://org.crm.dynamics.com", HashMap::new());
    let _replier = answer_ready_with(
        &host,
        json!({
            "userSettings": { "userId": "u-8", "userName": "Wrapped" },
            "launcherContext": { "type": "Grid", "entityName": "lead", "recordIds": ["x", "y"] }
        }),
    );

    let handle = ContextProvider::new(page, ProviderSettings::default()).mount();
    let mut context = handle.context();

    let published = context.wait_for_context().await.expect("context");
    assert_eq!(published.context_type, ContextType::Grid);
    assert_eq!(published.record_ids, vec!["x", "y"]);
    assert_eq!(context.user_guid(), "u-8");
}

#[tokio::test]
async fn identity_is_published_even_without_a_valid_context() {
    let host = host();
    let page = host.embed("https://org.crm.dynamics.com", HashMap::new());
    let _replier = answer_ready_with(
        &host,
        json!({
            "type": "Form",
            "recordIds": { "not": "a list" },
            "userSettings": { "userId": "u-9", "userName": "Still Me" }
        }),
    );

    let handle = ContextProvider::new(page, ProviderSettings::default()).mount();
    let context = handle.context();

    assert_eq!(
        handle.settled().await,
        Acquisition::Resolved(AcquisitionChannel::Message)
    );
    assert_eq!(context.user_name(), "Still Me");
    assert!(context.launcher_context().is_none());
}

#[tokio::test(start_paused = true)]
async fn top_level_window_falls_back_to_local_dev_context() {
    let window = host();
    let started = tokio::time::Instant::now();

    let handle = ContextProvider::new(window, ProviderSettings::default()).mount();
    let mut context = handle.context();

    let published = context.wait_for_context().await.expect("context");
    assert!(started.elapsed() >= Duration::from_millis(500));
    assert_eq!(published.entity_name, "contact");
    assert_eq!(published.record_ids, vec![LOCAL_DEV_RECORD_ID]);
    assert_eq!(context.user_name(), "Local Dev User");
    assert_eq!(
        handle.settled().await,
        Acquisition::Resolved(AcquisitionChannel::LocalFallback)
    );
}

#[tokio::test(start_paused = true)]
async fn early_message_beats_the_fallback_timer() {
    let window = host();
    let handle = ContextProvider::new(window.clone(), ProviderSettings::default()).mount();
    let mut context = handle.context();

    window
        .handle()
        .post_message(
            &WireMessage::Context {
                context: json!({ "type": "Grid", "entityName": "account", "recordIds": ["r1"] }),
            }
            .to_value(),
            "*",
            None,
        )
        .expect("post");

    let published = context.wait_for_context().await.expect("context");
    assert_eq!(published.entity_name, "account");
    assert_eq!(
        handle.settled().await,
        Acquisition::Resolved(AcquisitionChannel::Message)
    );

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(
        context.launcher_context().expect("context").entity_name,
        "account"
    );
}

#[tokio::test(start_paused = true)]
async fn context_message_without_payload_keeps_listening() {
    let window = host();
    let handle = ContextProvider::new(window.clone(), ProviderSettings::default()).mount();
    let mut context = handle.context();

    let sender = window.handle();
    sender
        .post_message(&json!({ "type": "D365_CONTEXT" }), "*", None)
        .expect("post empty");
    sender
        .post_message(&json!({ "type": "D365_CONTEXT", "context": [1, 2] }), "*", None)
        .expect("post array");
    tokio::time::sleep(Duration::from_millis(100)).await;
    sender
        .post_message(
            &WireMessage::Context {
                context: json!({ "type": "Grid", "entityName": "account", "recordIds": ["r1"] }),
            }
            .to_value(),
            "*",
            None,
        )
        .expect("post context");

    let published = context.wait_for_context().await.expect("context");
    assert_eq!(published.entity_name, "account");
    assert_eq!(published.record_ids, vec!["r1"]);
    assert_eq!(
        handle.settled().await,
        Acquisition::Resolved(AcquisitionChannel::Message)
    );
}

#[tokio::test(start_paused = true)]
async fn context_message_without_payload_does_not_block_fallback() {
    let window = host();
    let handle = ContextProvider::new(window.clone(), ProviderSettings::default()).mount();
    let mut context = handle.context();

    window
        .handle()
        .post_message(&json!({ "type": "D365_CONTEXT", "context": null }), "*", None)
        .expect("post");

    let published = context.wait_for_context().await.expect("context");
    assert_eq!(published.entity_name, "contact");
    assert_eq!(
        handle.settled().await,
        Acquisition::Resolved(AcquisitionChannel::LocalFallback)
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_pending_acquisition() {
    let handle = ContextProvider::new(host(), ProviderSettings::default()).mount();
    let context = handle.context();

    handle.shutdown();
    assert_eq!(handle.settled().await, Acquisition::Cancelled);
    assert!(context.launcher_context().is_none());
}

#[tokio::test]
async fn relay_backfills_large_selection_before_publishing() {
    let host = host();
    let storage: Arc<dyn SessionStorage> = Arc::new(MemorySessionStorage::new());
    let selection: Vec<String> = (0..150).map(|n| format!("{{ID-{n}}}")).collect();
    persist_selection(storage.as_ref(), "app_selection_1_abcdef", &selection).expect("persist");
    let responder = spawn_responder(
        &host,
        storage,
        "app_selection_1_abcdef".to_string(),
        selection,
        None,
    );

    let mut summary = LauncherContext::new("bulkmailer", user());
    summary.context_type = ContextType::Grid;
    summary.use_summary_mode = Some(true);
    summary.total_record_count = Some(150);
    summary.selection_key = Some("app_selection_1_abcdef".to_string());
    let page = page_with_data(&host, &summary);

    let handle = ContextProvider::new(page, ProviderSettings::default()).mount();
    let mut context = handle.context();

    let published = context.wait_for_context().await.expect("context");
    assert_eq!(published.record_ids.len(), 150);
    assert_eq!(published.record_ids[0], "ID-0");
    assert_eq!(published.total_record_count, Some(150));
    assert_eq!(published.selected_record_count, Some(150));
    responder.await.expect("responder");
}

#[tokio::test(start_paused = true)]
async fn unanswered_relay_times_out_to_empty_selection() {
    let host = host();
    let mut summary = LauncherContext::new("bulkmailer", user());
    summary.use_summary_mode = Some(true);
    summary.selection_key = Some("app_selection_2_nobody".to_string());
    let page = page_with_data(&host, &summary);
    let started = tokio::time::Instant::now();

    let handle = ContextProvider::new(page.clone(), ProviderSettings::default()).mount();
    let mut context = handle.context();

    assert!(context.changed().await);
    assert_eq!(context.user_name(), "Grace Hopper");
    assert!(
        context.launcher_context().is_none(),
        "context is held back until the relay resolves"
    );

    let published = context.wait_for_context().await.expect("context");
    assert!(started.elapsed() >= Duration::from_millis(2_500));
    assert!(published.record_ids.is_empty());
    assert!(published.selected_record_count.is_none());
    assert_eq!(page.listener_count(), 0);
}

#[tokio::test]
async fn relay_without_parent_resolves_immediately() {
    let mut summary = LauncherContext::new("bulkmailer", user());
    summary.selection_key = Some("app_selection_3_orphan".to_string());
    let window = Window::top_level("https://localhost:3000")
        .with_query(DATA_PARAM, encode_data(&summary).expect("encode"));

    let handle = ContextProvider::new(window, ProviderSettings::default()).mount();
    let mut context = handle.context();

    let published = context.wait_for_context().await.expect("context");
    assert!(published.record_ids.is_empty());
    assert_eq!(
        published.selection_key.as_deref(),
        Some("app_selection_3_orphan")
    );
}

#[tokio::test]
async fn subscription_point_requires_a_provider() {
    assert_eq!(
        use_dynamics_context().expect_err("outside provider"),
        ProviderError::OutsideProvider
    );

    let host = host();
    let page = host.embed("https://org.crm.dynamics.com", HashMap::new());
    let handle = ContextProvider::new(page, ProviderSettings::default()).mount();

    let user_name = handle
        .scope(async { use_dynamics_context().map(|context| context.user_name()) })
        .await;
    assert_eq!(user_name, Ok(CONNECTING_USER_NAME.to_string()));
    assert!(use_dynamics_context().is_err());
}
