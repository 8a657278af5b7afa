use std::future::pending;

use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::ProviderSettings;
use crate::context::{decode_data, local_dev_payload, normalize_payload, DATA_PARAM};
use crate::protocol::WireMessage;
use crate::window::{Subscription, Window};

use super::relay::request_ids_from_parent;
use super::{Acquisition, AcquisitionChannel, DynamicsState};

pub(super) async fn run(
    window: Window,
    settings: ProviderSettings,
    inbox: Subscription,
    state: watch::Sender<DynamicsState>,
    cancel: CancellationToken,
) -> Acquisition {
    if let Some(data) = window.query_param(DATA_PARAM) {
        drop(inbox);
        return match decode_data(data) {
            Ok(payload) if !payload.is_object() => {
                tracing::error!(%payload, "failed to parse context from URL: not an object");
                Acquisition::Failed(AcquisitionChannel::Url)
            }
            Ok(payload) => {
                publish(&window, &settings, &state, &cancel, payload).await;
                Acquisition::Resolved(AcquisitionChannel::Url)
            }
            Err(error) => {
                tracing::error!(%error, "failed to parse context from URL");
                Acquisition::Failed(AcquisitionChannel::Url)
            }
        };
    }

    // A context message without an object payload leaves the listener attached.
    let message = inbox.first_match(|event| match WireMessage::parse(&event.data) {
        Some(WireMessage::Context { context }) if context.is_object() => Some(context),
        Some(WireMessage::Context { context }) => {
            tracing::warn!(%context, "ignoring context message without an object payload");
            None
        }
        _ => None,
    });
    notify_ready(&window);

    let fallback_delay = settings.fallback_delay();
    let top_level = window.is_top_level();
    let fallback = async move {
        if top_level {
            tokio::time::sleep(fallback_delay).await;
        } else {
            pending::<()>().await;
        }
    };

    // First writer wins; on a tie the host's message beats the fallback.
    let (channel, payload) = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Acquisition::Cancelled,
        Some(context) = message => (AcquisitionChannel::Message, context),
        _ = fallback => {
            tracing::warn!("running in local dev mode, using fallback context");
            (AcquisitionChannel::LocalFallback, local_dev_payload())
        }
    };

    publish(&window, &settings, &state, &cancel, payload).await;
    Acquisition::Resolved(channel)
}

fn notify_ready(window: &Window) {
    let Some(parent) = window.parent() else {
        return;
    };
    if let Err(error) = parent.post_message(&WireMessage::Ready.to_value(), "*", Some(window)) {
        tracing::debug!(%error, "ready notification not delivered");
    }
}

/// Publishes identity immediately and the context once its selection is complete.
async fn publish(
    window: &Window,
    settings: &ProviderSettings,
    state: &watch::Sender<DynamicsState>,
    cancel: &CancellationToken,
    payload: Value,
) {
    let normalized = normalize_payload(&payload);

    if let Some(identity) = normalized.identity {
        state.send_modify(|current| {
            current.user_name = identity.user_name;
            current.user_guid = identity.user_guid;
        });
    }

    let Some(mut context) = normalized.context else {
        return;
    };

    if context.needs_relay() {
        let key = context.selection_key.clone().unwrap_or_default();
        let ids = tokio::select! {
            _ = cancel.cancelled() => return,
            ids = request_ids_from_parent(
                window,
                &key,
                settings.relay_namespace,
                settings.relay_timeout(),
            ) => ids,
        };
        if !ids.is_empty() {
            context.backfill_selection(ids);
        }
    }

    state.send_modify(|current| current.launcher_context = Some(context));
}
