//! Migration event validation.
//!
//! # Purpose
//! Extracts the fields drift analysis needs from a CloudEvent envelope and
//! rejects events that cannot be analyzed.
//!
//! # Key invariants
//! - Checks run in a fixed order: payload shape, source host name, current host
//!   name, VM name, then object references. The first failure wins.
//! - Every error carries the event id so the HTTP layer can echo it back.
//! - Validation never touches the tag catalog.
use crate::event::{EventEnvelope, MigrationEvent, NamedObject, VmMigratedPayload};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("could not decode event data as vSphere migration event (eventID: {event_id}): {reason}")]
    Malformed { event_id: String, reason: String },
    #[error("vsphere event did not contain source host name (eventID: {event_id})")]
    MissingSourceHostName { event_id: String },
    #[error("vsphere event did not contain current host name (eventID: {event_id})")]
    MissingCurrentHostName { event_id: String },
    #[error("vsphere event did not contain vm name (eventID: {event_id})")]
    MissingVmName { event_id: String },
    #[error("vsphere event did not contain object reference {field} (eventID: {event_id})")]
    MissingReference {
        event_id: String,
        field: &'static str,
    },
}

impl ValidationError {
    /// Wire field that failed validation.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Malformed { .. } => "data",
            ValidationError::MissingSourceHostName { .. } => "SourceHost.Name",
            ValidationError::MissingCurrentHostName { .. } => "Host.Name",
            ValidationError::MissingVmName { .. } => "Vm.Name",
            ValidationError::MissingReference { field, .. } => *field,
        }
    }

    pub fn event_id(&self) -> &str {
        match self {
            ValidationError::Malformed { event_id, .. }
            | ValidationError::MissingSourceHostName { event_id }
            | ValidationError::MissingCurrentHostName { event_id }
            | ValidationError::MissingVmName { event_id }
            | ValidationError::MissingReference { event_id, .. } => event_id,
        }
    }
}

/// Validate an envelope into a [`MigrationEvent`].
pub fn validate(envelope: &EventEnvelope) -> Result<MigrationEvent, ValidationError> {
    let event_id = envelope.id.clone();
    let payload: VmMigratedPayload =
        serde_json::from_value(envelope.data.clone()).map_err(|err| {
            ValidationError::Malformed {
                event_id: event_id.clone(),
                reason: err.to_string(),
            }
        })?;

    let source_host = match payload.source_host {
        Some(source_host) if !source_host.name.is_empty() => source_host,
        _ => return Err(ValidationError::MissingSourceHostName { event_id }),
    };

    let host = match payload.host {
        Some(host) if !host.name.is_empty() => host,
        _ => return Err(ValidationError::MissingCurrentHostName { event_id }),
    };

    let vm = match payload.vm {
        Some(vm) if !vm.name.is_empty() => vm,
        _ => return Err(ValidationError::MissingVmName { event_id }),
    };

    let host_ref = match host.host {
        Some(reference) if reference.is_resolvable() => reference,
        _ => {
            return Err(ValidationError::MissingReference {
                event_id,
                field: "Host.Host",
            });
        }
    };
    let vm_ref = match vm.vm {
        Some(reference) if reference.is_resolvable() => reference,
        _ => {
            return Err(ValidationError::MissingReference {
                event_id,
                field: "Vm.Vm",
            });
        }
    };

    Ok(MigrationEvent {
        id: event_id,
        subject: envelope.subject.clone().unwrap_or_default(),
        source_host_name: source_host.name,
        current_host: NamedObject {
            name: host.name,
            reference: host_ref,
        },
        vm: NamedObject {
            name: vm.name,
            reference: vm_ref,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ObjectRef;
    use serde_json::{Value, json};

    fn migrated_data() -> Value {
        json!({
            "Key": 1001,
            "SourceHost": {
                "Name": "esx-01",
                "Host": { "Type": "HostSystem", "Value": "host-10" }
            },
            "Host": {
                "Name": "esx-02",
                "Host": { "Type": "HostSystem", "Value": "host-20" }
            },
            "Vm": {
                "Name": "vm-42",
                "Vm": { "Type": "VirtualMachine", "Value": "vm-42" }
            }
        })
    }

    fn envelope(data: Value) -> EventEnvelope {
        EventEnvelope::new("evt-1", data).with_subject("DRS automatic migration")
    }

    #[test]
    fn valid_event_extracts_all_fields() {
        let event = validate(&envelope(migrated_data())).expect("valid");
        assert_eq!(event.id, "evt-1");
        assert_eq!(event.subject, "DRS automatic migration");
        assert_eq!(event.source_host_name, "esx-01");
        assert_eq!(event.current_host.name, "esx-02");
        assert_eq!(event.current_host.reference, ObjectRef::host("host-20"));
        assert_eq!(event.vm.name, "vm-42");
        assert_eq!(event.vm.reference, ObjectRef::vm("vm-42"));
    }

    #[test]
    fn missing_subject_becomes_empty_reason() {
        let event = validate(&EventEnvelope::new("evt-1", migrated_data())).expect("valid");
        assert_eq!(event.subject, "");
    }

    #[test]
    fn non_object_data_is_malformed() {
        let err = validate(&envelope(json!("not an event"))).expect_err("malformed");
        assert!(matches!(err, ValidationError::Malformed { .. }));
        assert_eq!(err.field(), "data");
        assert_eq!(err.event_id(), "evt-1");
    }

    #[test]
    fn empty_source_host_name_rejected() {
        let mut data = migrated_data();
        data["SourceHost"]["Name"] = json!("");
        let err = validate(&envelope(data)).expect_err("invalid");
        assert!(matches!(err, ValidationError::MissingSourceHostName { .. }));
        assert_eq!(err.field(), "SourceHost.Name");
    }

    #[test]
    fn absent_source_host_rejected() {
        let mut data = migrated_data();
        data.as_object_mut().expect("object").remove("SourceHost");
        let err = validate(&envelope(data)).expect_err("invalid");
        assert_eq!(err.field(), "SourceHost.Name");
    }

    #[test]
    fn null_source_host_rejected() {
        let mut data = migrated_data();
        data["SourceHost"] = Value::Null;
        let err = validate(&envelope(data)).expect_err("invalid");
        assert!(matches!(err, ValidationError::MissingSourceHostName { .. }));
        assert_eq!(err.field(), "SourceHost.Name");
    }

    #[test]
    fn missing_or_unnamed_current_host_rejected() {
        let mut data = migrated_data();
        data["Host"] = Value::Null;
        let err = validate(&envelope(data)).expect_err("invalid");
        assert!(matches!(err, ValidationError::MissingCurrentHostName { .. }));

        let mut data = migrated_data();
        data["Host"]["Name"] = json!("");
        let err = validate(&envelope(data)).expect_err("invalid");
        assert_eq!(err.field(), "Host.Name");
    }

    #[test]
    fn missing_or_unnamed_vm_rejected() {
        let mut data = migrated_data();
        data.as_object_mut().expect("object").remove("Vm");
        let err = validate(&envelope(data)).expect_err("invalid");
        assert!(matches!(err, ValidationError::MissingVmName { .. }));

        let mut data = migrated_data();
        data["Vm"]["Name"] = json!("");
        let err = validate(&envelope(data)).expect_err("invalid");
        assert_eq!(err.field(), "Vm.Name");
    }

    #[test]
    fn source_host_checked_before_vm() {
        let mut data = migrated_data();
        data["SourceHost"]["Name"] = json!("");
        data["Vm"]["Name"] = json!("");
        let err = validate(&envelope(data)).expect_err("invalid");
        assert_eq!(err.field(), "SourceHost.Name");
    }

    #[test]
    fn unresolvable_references_rejected() {
        let mut data = migrated_data();
        data["Host"].as_object_mut().expect("host").remove("Host");
        let err = validate(&envelope(data)).expect_err("invalid");
        assert_eq!(err.field(), "Host.Host");

        let mut data = migrated_data();
        data["Vm"]["Vm"]["Value"] = json!("");
        let err = validate(&envelope(data)).expect_err("invalid");
        assert_eq!(err.field(), "Vm.Vm");
    }

    #[test]
    fn error_messages_embed_event_id() {
        let mut data = migrated_data();
        data["Vm"]["Name"] = json!("");
        let err = validate(&envelope(data)).expect_err("invalid");
        assert!(err.to_string().contains("evt-1"));
    }
}
