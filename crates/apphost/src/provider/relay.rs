//! Consumer side of the large-selection relay.

use std::time::Duration;

use crate::protocol::{RelayNamespace, WireMessage};
use crate::window::Window;

/// Asks the parent window for the selection parked under `key`.
///
/// Resolves to an empty list when there is no parent or nothing answers
/// within `timeout`. The response listener is detached on either path.
pub async fn request_ids_from_parent(
    window: &Window,
    key: &str,
    namespace: RelayNamespace,
    timeout: Duration,
) -> Vec<String> {
    let Some(parent) = window.parent() else {
        return Vec::new();
    };
    if key.is_empty() {
        return Vec::new();
    }

    let response = window.subscribe().first_match(|event| {
        match WireMessage::parse(&event.data) {
            Some(WireMessage::SelectionResponse {
                namespace: answered,
                key: answered_key,
                ids,
            }) if answered == namespace && answered_key == key => Some(ids),
            _ => None,
        }
    });

    let request = WireMessage::SelectionRequest {
        namespace,
        key: key.to_string(),
    };
    if let Err(error) = parent.post_message(&request.to_value(), "*", Some(window)) {
        tracing::debug!(%error, "selection request not delivered");
    }

    match tokio::time::timeout(timeout, response).await {
        Ok(Some(ids)) => ids,
        Ok(None) => Vec::new(),
        Err(_) => {
            tracing::warn!(key, "selection relay timed out");
            Vec::new()
        }
    }
}
