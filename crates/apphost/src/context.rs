//! The launch context: the single structure that crosses the window boundary.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{AppHostError, AppHostResult};
use crate::ids::{normalize_ids, strip_braces};

/// Query parameter carrying the URL-encoded context.
pub const DATA_PARAM: &str = "data";

pub const UNKNOWN_USER_NAME: &str = "Unknown User";
pub const UNKNOWN_USER_GUID: &str = "Unknown GUID";

/// Record id used by the local development context.
pub const LOCAL_DEV_RECORD_ID: &str = "12345678-ABCD-1234-ABCD-1234567890AB";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContextType {
    Grid,
    Form,
    #[default]
    Unknown,
    Error,
    Global,
    /// Any other host-defined kind, kept verbatim.
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LauncherContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_identifier: Option<String>,
    #[serde(rename = "type", default)]
    pub context_type: ContextType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub entity_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub record_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_xml: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_record_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_record_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_summary_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_settings: Option<UserSettings>,
    /// Fields this crate does not model, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LauncherContext {
    pub fn new(app_identifier: impl Into<String>, user_settings: UserSettings) -> Self {
        Self {
            app_identifier: Some(app_identifier.into()),
            user_settings: Some(user_settings),
            ..Self::default()
        }
    }

    /// True when the selection lives on the host and must be fetched over the relay.
    pub fn needs_relay(&self) -> bool {
        self.record_ids.is_empty()
            && self
                .selection_key
                .as_deref()
                .is_some_and(|key| !key.is_empty())
    }

    /// Fills in a selection fetched over the relay.
    pub fn backfill_selection(&mut self, ids: Vec<String>) {
        self.total_record_count = Some(ids.len());
        self.selected_record_count = Some(ids.len());
        self.record_ids = ids;
    }

    pub fn strip_identifier_braces(&mut self) {
        self.record_ids = normalize_ids(&self.record_ids);
        if let Some(view_id) = self.view_id.as_mut() {
            *view_id = strip_braces(view_id);
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Context synthesized when the page runs outside any host.
pub fn local_dev_payload() -> Value {
    json!({
        "type": "Form",
        "entityName": "contact",
        "recordIds": [LOCAL_DEV_RECORD_ID],
        "appIdentifier": "demo",
        "userSettings": {
            "userId": "local-dev-user-guid",
            "userName": "Local Dev User"
        }
    })
}

/// Serializes a context into the value of the `data` query parameter.
pub fn encode_data(context: &LauncherContext) -> AppHostResult<String> {
    let json = serde_json::to_string(context)?;
    Ok(urlencoding::encode(&json).into_owned())
}

/// Inverse of [`encode_data`], stopping at the raw JSON payload.
pub fn decode_data(data: &str) -> AppHostResult<Value> {
    let decoded =
        urlencoding::decode(data).map_err(|error| AppHostError::UrlEncoding(error.to_string()))?;
    Ok(serde_json::from_str(&decoded)?)
}

/// The user identity shown by the embedded page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_name: String,
    pub user_guid: String,
}

/// A received payload split into its context and user identity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedPayload {
    pub context: Option<LauncherContext>,
    pub identity: Option<UserIdentity>,
}

/// Normalizes any received payload, whichever channel delivered it.
///
/// A nested `launcherContext` object is shallow-merged over the top level.
/// The identity is extracted on its own so it survives a context that fails
/// to deserialize.
pub fn normalize_payload(payload: &Value) -> NormalizedPayload {
    let Some(top) = payload.as_object() else {
        return NormalizedPayload::default();
    };

    let mut merged = top.clone();
    if let Some(Value::Object(nested)) = merged.remove("launcherContext") {
        merged.extend(nested);
    }

    let identity = top
        .get("userSettings")
        .filter(|value| is_truthy(value))
        .or_else(|| merged.get("userSettings").filter(|value| is_truthy(value)))
        .map(|settings| UserIdentity {
            user_name: display_or(settings.get("userName"), UNKNOWN_USER_NAME),
            user_guid: display_or(settings.get("userId"), UNKNOWN_USER_GUID),
        });

    let context = match serde_json::from_value::<LauncherContext>(Value::Object(merged)) {
        Ok(mut context) => {
            context.strip_identifier_braces();
            Some(context)
        }
        Err(error) => {
            tracing::warn!(%error, "payload did not describe a launch context");
            None
        }
    };

    NormalizedPayload { context, identity }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn display_or(value: Option<&Value>, fallback: &str) -> String {
    match value.filter(|value| is_truthy(value)) {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => fallback.to_string(),
    }
}
