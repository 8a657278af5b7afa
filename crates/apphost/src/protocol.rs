//! Cross-window wire messages.
//!
//! Every message is a JSON value posted to another window with target origin
//! `*`. Messages that do not parse as one of these are ignored by listeners.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::ids::strip_braces;

/// Bare string posted to the parent once the embedded page is listening.
pub const READY_MESSAGE: &str = "react-app-ready";
/// Message type carrying a context from a host or debugger parent.
pub const CONTEXT_MESSAGE_TYPE: &str = "D365_CONTEXT";

/// Name pair used by the selection relay.
///
/// The embedded page asks with `docgen_*` names while the generated launcher
/// historically listened for `app_*`; responders accept both and answer in the
/// namespace of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayNamespace {
    #[default]
    Docgen,
    App,
}

impl RelayNamespace {
    pub fn request_type(self) -> &'static str {
        match self {
            RelayNamespace::Docgen => "docgen_request_selection",
            RelayNamespace::App => "app_request_selection",
        }
    }

    pub fn response_type(self) -> &'static str {
        match self {
            RelayNamespace::Docgen => "docgen_response_selection",
            RelayNamespace::App => "app_response_selection",
        }
    }

    fn from_request_type(value: &str) -> Option<Self> {
        [RelayNamespace::Docgen, RelayNamespace::App]
            .into_iter()
            .find(|namespace| namespace.request_type() == value)
    }

    fn from_response_type(value: &str) -> Option<Self> {
        [RelayNamespace::Docgen, RelayNamespace::App]
            .into_iter()
            .find(|namespace| namespace.response_type() == value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    /// `"react-app-ready"`, embedded page to host.
    Ready,
    /// `{ type: "D365_CONTEXT", context }`, host or debugger to embedded page.
    Context { context: Value },
    /// `{ type: "<ns>_request_selection", key }`, embedded page to host.
    SelectionRequest {
        namespace: RelayNamespace,
        key: String,
    },
    /// `{ type: "<ns>_response_selection", key, ids }`, host to embedded page.
    SelectionResponse {
        namespace: RelayNamespace,
        key: String,
        ids: Vec<String>,
    },
}

impl WireMessage {
    pub fn to_value(&self) -> Value {
        match self {
            WireMessage::Ready => Value::String(READY_MESSAGE.to_string()),
            WireMessage::Context { context } => json!({
                "type": CONTEXT_MESSAGE_TYPE,
                "context": context,
            }),
            WireMessage::SelectionRequest { namespace, key } => json!({
                "type": namespace.request_type(),
                "key": key,
            }),
            WireMessage::SelectionResponse {
                namespace,
                key,
                ids,
            } => json!({
                "type": namespace.response_type(),
                "key": key,
                "ids": ids,
            }),
        }
    }

    /// Parses a received message. Response ids are brace-stripped.
    pub fn parse(data: &Value) -> Option<Self> {
        if data.as_str() == Some(READY_MESSAGE) {
            return Some(WireMessage::Ready);
        }

        let message_type = data.get("type")?.as_str()?;
        if message_type == CONTEXT_MESSAGE_TYPE {
            let context = data.get("context").cloned().unwrap_or(Value::Null);
            return Some(WireMessage::Context { context });
        }

        let key = data.get("key")?.as_str()?.to_string();
        if let Some(namespace) = RelayNamespace::from_request_type(message_type) {
            return Some(WireMessage::SelectionRequest { namespace, key });
        }

        let namespace = RelayNamespace::from_response_type(message_type)?;
        let ids = data
            .get("ids")?
            .as_array()?
            .iter()
            .map(|id| match id {
                Value::String(text) => strip_braces(text),
                other => strip_braces(&other.to_string()),
            })
            .collect();
        Some(WireMessage::SelectionResponse { namespace, key, ids })
    }
}
