//! Producer side of the large-selection relay.
//!
//! The full id list is parked in session storage under a generated key and a
//! one-shot responder on the host window answers the first request for that
//! key, then detaches.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::protocol::{RelayNamespace, WireMessage};
use crate::storage::{SessionStorage, StorageError};
use crate::utils::time::now_millis;
use crate::window::{Window, WindowHandle};

pub const SELECTION_KEY_PREFIX: &str = "app_selection_";

const KEY_SUFFIX_LEN: usize = 6;

/// Stored shape of a parked selection.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSelection {
    ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponderOutcome {
    Answered {
        namespace: RelayNamespace,
        count: usize,
    },
    Expired,
    Closed,
}

/// `app_selection_<epoch millis>_<random>`.
pub fn generate_selection_key() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{SELECTION_KEY_PREFIX}{}_{}",
        now_millis(),
        &suffix[..KEY_SUFFIX_LEN]
    )
}

pub fn persist_selection(
    storage: &dyn SessionStorage,
    key: &str,
    ids: &[String],
) -> Result<(), StorageError> {
    let stored = serde_json::to_string(&StoredSelection { ids: ids.to_vec() })
        .map_err(|_| StorageError::Unavailable)?;
    storage.set_item(key, &stored)
}

pub fn load_selection(storage: &dyn SessionStorage, key: &str) -> Option<Vec<String>> {
    let stored = storage.get_item(key)?;
    serde_json::from_str::<StoredSelection>(&stored)
        .ok()
        .map(|stored| stored.ids)
}

/// Attaches the responder before returning, so a request posted right after
/// navigation is not missed.
pub fn spawn_responder(
    window: &Window,
    storage: Arc<dyn SessionStorage>,
    key: String,
    ids: Vec<String>,
    ttl: Option<Duration>,
) -> JoinHandle<ResponderOutcome> {
    let subscription = window.subscribe();
    let host = window.clone();

    tokio::spawn(async move {
        let request = subscription.first_match(|event| match WireMessage::parse(&event.data) {
            Some(WireMessage::SelectionRequest {
                namespace,
                key: requested,
            }) if requested == key => event
                .source
                .clone()
                .map(|source| (namespace, source, event.origin.clone())),
            _ => None,
        });

        let answered = match ttl {
            Some(ttl) => match tokio::time::timeout(ttl, request).await {
                Ok(answered) => answered,
                Err(_) => {
                    storage.remove_item(&key);
                    tracing::debug!(%key, "selection relay responder expired");
                    return ResponderOutcome::Expired;
                }
            },
            None => request.await,
        };

        let Some((namespace, source, origin)) = answered else {
            return ResponderOutcome::Closed;
        };

        let ids = load_selection(storage.as_ref(), &key).unwrap_or(ids);
        let count = ids.len();
        respond(&host, &source, &origin, namespace, key, ids);
        ResponderOutcome::Answered { namespace, count }
    })
}

fn respond(
    host: &Window,
    source: &WindowHandle,
    origin: &str,
    namespace: RelayNamespace,
    key: String,
    ids: Vec<String>,
) {
    let target_origin = if origin.is_empty() { "*" } else { origin };
    let response = WireMessage::SelectionResponse {
        namespace,
        key,
        ids,
    };
    if let Err(error) = source.post_message(&response.to_value(), target_origin, Some(host)) {
        tracing::debug!(%error, "selection relay response not delivered");
    }
}
