//! The host page's navigation and user-context API (`Xrm.Navigation`,
//! `Xrm.Utility.getGlobalContext`).

use async_trait::async_trait;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::context::UserSettings;
use crate::registry::Measurement;

pub const WEB_RESOURCE_PAGE_TYPE: &str = "webresource";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInput {
    pub page_type: String,
    pub webresource_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl PageInput {
    pub fn web_resource(webresource_name: impl Into<String>, data: Option<String>) -> Self {
        Self {
            page_type: WEB_RESOURCE_PAGE_TYPE.to_string(),
            webresource_name: webresource_name.into(),
            data,
        }
    }
}

/// Where the host opens the page. Serialized as the host's numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationTarget {
    Inline = 1,
    Dialog = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogPosition {
    Center = 1,
    Side = 2,
}

impl Serialize for NavigationTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl Serialize for DialogPosition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationOptions {
    pub target: NavigationTarget,
    pub width: Measurement,
    pub height: Measurement,
    pub position: DialogPosition,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertDialog {
    pub text: String,
    pub title: String,
}

/// Rejection from the host's `navigateTo`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct NavigationError {
    pub message: String,
}

impl NavigationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait HostApi: Send + Sync {
    /// The signed-in user, as the host's global context reports it.
    fn user_settings(&self) -> UserSettings;

    async fn navigate_to(
        &self,
        page: PageInput,
        options: NavigationOptions,
    ) -> Result<(), NavigationError>;

    /// Blocking modal shown to the user; resolves when dismissed.
    async fn open_alert_dialog(&self, dialog: AlertDialog);
}
