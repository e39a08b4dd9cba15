use serde_json::{Value, json};

pub async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub async fn read_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body")
        .to_vec()
}

/// `VmMigratedEvent` data in govmomi's JSON encoding.
pub fn migration_data(vm: &str, source_host: &str, dest_host: &str) -> Value {
    json!({
        "Key": 9001,
        "FullFormattedMessage": format!("Migration of virtual machine {vm} from {source_host} to {dest_host} completed"),
        "SourceHost": {
            "Name": source_host,
            "Host": { "Type": "HostSystem", "Value": "host-10" }
        },
        "Host": {
            "Name": dest_host,
            "Host": { "Type": "HostSystem", "Value": "host-20" }
        },
        "Vm": {
            "Name": vm,
            "Vm": { "Type": "VirtualMachine", "Value": "vm-42" }
        }
    })
}
