//! Form and grid controls handed to a command button.
//!
//! Every accessor returns a `Result`: a control that lacks an accessor, or
//! whose accessor fails, simply contributes no context.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("control does not expose `{0}`")]
    Unsupported(&'static str),
    #[error("`{accessor}` failed: {message}")]
    Failed {
        accessor: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewReference {
    pub id: String,
    pub name: Option<String>,
}

pub trait ViewSelector: Send + Sync {
    fn current_view(&self) -> Result<ViewReference, ControlError>;
}

/// The record currently open on a form.
pub trait FormEntity: Send + Sync {
    fn entity_name(&self) -> Result<String, ControlError>;
    fn id(&self) -> Result<String, ControlError>;
}

/// The grid or subgrid a command was invoked from (`SelectedControl`).
pub trait SelectedControl: Send + Sync {
    fn entity_name(&self) -> Result<String, ControlError> {
        Err(ControlError::Unsupported("getEntityName"))
    }

    fn view_selector(&self) -> Option<&dyn ViewSelector> {
        None
    }
}

/// The form or page a command was invoked from (`PrimaryControl`).
pub trait PrimaryControl: Send + Sync {
    fn entity_name(&self) -> Result<String, ControlError> {
        Err(ControlError::Unsupported("getEntityName"))
    }

    fn entity(&self) -> Option<&dyn FormEntity> {
        None
    }
}

/// A grid described by plain data.
#[derive(Debug, Clone, Default)]
pub struct GridSnapshot {
    pub entity_name: Option<String>,
    pub view: Option<ViewReference>,
}

impl ViewSelector for ViewReference {
    fn current_view(&self) -> Result<ViewReference, ControlError> {
        Ok(self.clone())
    }
}

impl SelectedControl for GridSnapshot {
    fn entity_name(&self) -> Result<String, ControlError> {
        self.entity_name
            .clone()
            .ok_or(ControlError::Unsupported("getEntityName"))
    }

    fn view_selector(&self) -> Option<&dyn ViewSelector> {
        self.view.as_ref().map(|view| view as &dyn ViewSelector)
    }
}

/// A form described by plain data.
#[derive(Debug, Clone, Default)]
pub struct FormSnapshot {
    pub record: Option<FormRecord>,
}

#[derive(Debug, Clone)]
pub struct FormRecord {
    pub entity_name: String,
    pub id: String,
}

impl FormEntity for FormRecord {
    fn entity_name(&self) -> Result<String, ControlError> {
        Ok(self.entity_name.clone())
    }

    fn id(&self) -> Result<String, ControlError> {
        Ok(self.id.clone())
    }
}

impl PrimaryControl for FormSnapshot {
    fn entity_name(&self) -> Result<String, ControlError> {
        self.record
            .as_ref()
            .map(|record| record.entity_name.clone())
            .ok_or(ControlError::Unsupported("getEntityName"))
    }

    fn entity(&self) -> Option<&dyn FormEntity> {
        self.record.as_ref().map(|record| record as &dyn FormEntity)
    }
}
