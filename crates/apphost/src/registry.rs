//! Registered embedded applications, keyed by lower-cased identifier.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Default dialog size used for every generated registration.
pub const DEFAULT_WIDTH_PERCENT: f64 = 80.0;
pub const DEFAULT_HEIGHT_PERCENT: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasurementUnit {
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "px")]
    Pixels,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub value: f64,
    pub unit: MeasurementUnit,
}

impl Measurement {
    pub fn percent(value: f64) -> Self {
        Self {
            value,
            unit: MeasurementUnit::Percent,
        }
    }

    pub fn pixels(value: f64) -> Self {
        Self {
            value,
            unit: MeasurementUnit::Pixels,
        }
    }
}

/// One `app.config` entry: an application the build produces a page for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppManifestEntry {
    pub name: String,
    pub entry: String,
    pub html_file: String,
}

impl AppManifestEntry {
    /// Entry using the conventional `src/<Name>.tsx` / `<Name>.html` layout.
    pub fn conventional(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            entry: format!("src/{name}.tsx"),
            html_file: format!("{name}.html"),
            name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRegistration {
    pub id: String,
    pub resource_name: String,
    pub title: String,
    pub width: Measurement,
    pub height: Measurement,
}

impl AppRegistration {
    pub fn from_manifest(entry: &AppManifestEntry) -> Self {
        Self {
            id: entry.name.to_lowercase(),
            resource_name: entry.html_file.clone(),
            title: entry.name.clone(),
            width: Measurement::percent(DEFAULT_WIDTH_PERCENT),
            height: Measurement::percent(DEFAULT_HEIGHT_PERCENT),
        }
    }
}

/// Immutable after construction.
#[derive(Debug, Clone, Default)]
pub struct AppRegistry {
    applications: HashMap<String, AppRegistration>,
    order: Vec<String>,
}

impl AppRegistry {
    /// Builds the registry. On a key collision the later registration
    /// replaces the earlier one but keeps its enumeration position.
    pub fn from_registrations<I>(registrations: I) -> Self
    where
        I: IntoIterator<Item = AppRegistration>,
    {
        let mut applications = HashMap::new();
        let mut order = Vec::new();
        for registration in registrations {
            let key = registration.id.to_lowercase();
            match applications.insert(key.clone(), registration) {
                Some(previous) => {
                    tracing::warn!(
                        app_id = %key,
                        replaced = %previous.resource_name,
                        "duplicate app registration, last one wins"
                    );
                }
                None => order.push(key),
            }
        }
        Self {
            applications,
            order,
        }
    }

    pub fn from_manifest(entries: &[AppManifestEntry]) -> Self {
        Self::from_registrations(entries.iter().map(AppRegistration::from_manifest))
    }

    /// Case-insensitive lookup.
    pub fn get(&self, app_id: &str) -> Option<&AppRegistration> {
        self.applications.get(&app_id.to_lowercase())
    }

    /// Registered identifiers in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
