//! Inbound event shapes.
//!
//! # Purpose
//! Defines the CloudEvent envelope handed over by the HTTP layer, the vSphere
//! `VmMigratedEvent` wire payload carried in its `data`, and the validated
//! [`MigrationEvent`] the detector works on.
//!
//! # Notes
//! The wire payload uses govmomi's JSON encoding (PascalCase keys). Unknown
//! fields are ignored so `DrsVmMigratedEvent` and future event revisions decode
//! through the same struct.
use serde::{Deserialize, Serialize};
use std::fmt;

/// One CloudEvent as received on the wire, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: String,
    #[serde(default)]
    pub source: String,
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl EventEnvelope {
    pub fn new(id: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            source: String::new(),
            event_type: String::new(),
            subject: None,
            data,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

/// vSphere managed object reference, e.g. `HostSystem:host-20`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl ObjectRef {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    pub fn host(value: impl Into<String>) -> Self {
        Self::new("HostSystem", value)
    }

    pub fn vm(value: impl Into<String>) -> Self {
        Self::new("VirtualMachine", value)
    }

    pub(crate) fn is_resolvable(&self) -> bool {
        !self.kind.is_empty() && !self.value.is_empty()
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// An inventory object with its display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedObject {
    pub name: String,
    pub reference: ObjectRef,
}

/// A migration notification that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationEvent {
    pub id: String,
    pub subject: String,
    pub source_host_name: String,
    pub current_host: NamedObject,
    pub vm: NamedObject,
}

// govmomi encodes `SourceHost` as a value and `Host`/`Vm` as pointers, but
// senders re-encoding the event may still emit `null` for any of them.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct VmMigratedPayload {
    #[serde(default)]
    pub source_host: Option<HostEventArgument>,
    #[serde(default)]
    pub host: Option<HostEventArgument>,
    #[serde(default)]
    pub vm: Option<VmEventArgument>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct HostEventArgument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub host: Option<ObjectRef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct VmEventArgument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub vm: Option<ObjectRef>,
}
