use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::engine::EngineError;
use crate::limits::MAX_NAME_LEN;
use crate::model::ResourceKind;

pub type RoomBinding = ResourceBinding<ClientRoom>;
pub type EditorBinding = ResourceBinding<ClientEditor>;

/// How a booking's room or editor slot is satisfied. Exactly one variant at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceBinding<D> {
    Unassigned,
    /// Managed room/editor, subject to conflict checks.
    System(SystemRef),
    /// Provided by the customer. The studio has no view of its calendar, so it is never checked.
    Client(D),
}

impl<D> Default for ResourceBinding<D> {
    fn default() -> Self {
        ResourceBinding::Unassigned
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRef {
    pub resource_id: Ulid,
    /// Registry flag as of the last resolution. Refreshed from the registry before every check.
    pub ignore_conflict: bool,
}

impl SystemRef {
    pub fn new(resource_id: Ulid) -> Self {
        Self {
            resource_id,
            ignore_conflict: false,
        }
    }
}

impl<D> ResourceBinding<D> {
    pub fn system(&self) -> Option<&SystemRef> {
        match self {
            ResourceBinding::System(r) => Some(r),
            ResourceBinding::Unassigned | ResourceBinding::Client(_) => None,
        }
    }

    pub fn system_id(&self) -> Option<Ulid> {
        self.system().map(|r| r.resource_id)
    }

    pub fn is_system(&self) -> bool {
        self.system().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRoom {
    pub name: String,
    pub room_type: Option<String>,
    pub capacity: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientEditor {
    pub name: String,
    pub editor_type: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingSource {
    System,
    Client,
}

/// Binding as submitted by a caller: a discriminator plus loose fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBinding {
    #[serde(default, rename = "type")]
    pub source: Option<BindingSource>,
    #[serde(default)]
    pub resource_id: Option<Ulid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

struct ClientFields {
    name: String,
    resource_type: Option<String>,
    capacity: Option<u32>,
    phone: Option<String>,
    email: Option<String>,
}

enum Split {
    Unassigned,
    System(Ulid),
    Client(ClientFields),
}

impl RawBinding {
    pub fn system(resource_id: Ulid) -> Self {
        Self {
            source: Some(BindingSource::System),
            resource_id: Some(resource_id),
            ..Self::default()
        }
    }

    pub fn client(name: impl Into<String>) -> Self {
        Self {
            source: Some(BindingSource::Client),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn into_room(self) -> Result<RoomBinding, EngineError> {
        Ok(match self.split(ResourceKind::Room)? {
            Split::Unassigned => ResourceBinding::Unassigned,
            Split::System(id) => ResourceBinding::System(SystemRef::new(id)),
            Split::Client(fields) => {
                if fields.phone.is_some() || fields.email.is_some() {
                    return Err(EngineError::InvalidBinding(
                        "client room takes no phone or email".into(),
                    ));
                }
                ResourceBinding::Client(ClientRoom {
                    name: fields.name,
                    room_type: fields.resource_type,
                    capacity: fields.capacity,
                })
            }
        })
    }

    pub fn into_editor(self) -> Result<EditorBinding, EngineError> {
        Ok(match self.split(ResourceKind::Editor)? {
            Split::Unassigned => ResourceBinding::Unassigned,
            Split::System(id) => ResourceBinding::System(SystemRef::new(id)),
            Split::Client(fields) => {
                if fields.capacity.is_some() {
                    return Err(EngineError::InvalidBinding(
                        "client editor takes no capacity".into(),
                    ));
                }
                ResourceBinding::Client(ClientEditor {
                    name: fields.name,
                    editor_type: fields.resource_type,
                    phone: fields.phone,
                    email: fields.email,
                })
            }
        })
    }

    fn has_client_fields(&self) -> bool {
        self.name.is_some()
            || self.resource_type.is_some()
            || self.capacity.is_some()
            || self.phone.is_some()
            || self.email.is_some()
    }

    fn split(self, kind: ResourceKind) -> Result<Split, EngineError> {
        match self.source {
            None => {
                if self.resource_id.is_some() || self.has_client_fields() {
                    return Err(EngineError::InvalidBinding(format!(
                        "{kind} fields given without a binding type"
                    )));
                }
                Ok(Split::Unassigned)
            }
            Some(BindingSource::System) => {
                if self.has_client_fields() {
                    return Err(EngineError::InvalidBinding(format!(
                        "system {kind} binding carries client fields"
                    )));
                }
                let id = self.resource_id.ok_or_else(|| {
                    EngineError::InvalidBinding(format!(
                        "system {kind} binding needs a resource_id"
                    ))
                })?;
                Ok(Split::System(id))
            }
            Some(BindingSource::Client) => {
                if self.resource_id.is_some() {
                    return Err(EngineError::InvalidBinding(format!(
                        "client {kind} binding cannot reference a system resource"
                    )));
                }
                let name = self
                    .name
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| {
                        EngineError::InvalidBinding(format!("client {kind} binding needs a name"))
                    })?;
                let texts = [
                    Some(name.as_str()),
                    self.resource_type.as_deref(),
                    self.phone.as_deref(),
                    self.email.as_deref(),
                ];
                if texts.iter().flatten().any(|s| s.len() > MAX_NAME_LEN) {
                    return Err(EngineError::LimitExceeded("client descriptor field too long"));
                }
                Ok(Split::Client(ClientFields {
                    name,
                    resource_type: self.resource_type,
                    capacity: self.capacity,
                    phone: self.phone,
                    email: self.email,
                }))
            }
        }
    }
}
