//! Per-table row encoding and decoding.
//!
//! Decoding is lenient by contract: a field that is absent, has the wrong
//! type, or carries the database's empty-set sentinel `["set", []]` falls
//! back to the record's zero value instead of failing the row.

use serde_json::{Map, Value, json};

use ovsgate_types::{
    Feedback, GatewayConfig, InterfaceCommand, InterfaceType, OvsStatus, OvsTable, TableRecord,
};

use crate::errors::CodecError;

/// Encodes a record into the `row` object of an insert request.
pub(crate) fn encode_row(record: &TableRecord) -> Map<String, Value> {
    match record {
        TableRecord::GatewayConfig(config) => encode_gateway_config(config),
        TableRecord::Feedback(feedback) => encode_feedback(feedback),
    }
}

/// Decodes one row change from an update notification.
///
/// Returns `Ok(None)` for a change carrying only `"old"` — a delete
/// notification is acknowledged but there is nothing to apply.
pub(crate) fn decode_row_change(
    table: OvsTable,
    change: &Value,
) -> Result<Option<TableRecord>, CodecError> {
    let change = change
        .as_object()
        .ok_or(CodecError::malformed("row change"))?;
    let Some(row) = change.get("new") else {
        if change.contains_key("old") {
            return Ok(None);
        }
        return Err(CodecError::malformed("row change"));
    };
    let row = row.as_object().ok_or(CodecError::malformed("row"))?;

    let record = match table {
        OvsTable::GatewayConfig => TableRecord::GatewayConfig(decode_gateway_config(row)),
        OvsTable::Feedback => TableRecord::Feedback(decode_feedback(row)),
    };
    Ok(Some(record))
}

fn encode_gateway_config(config: &GatewayConfig) -> Map<String, Value> {
    let row = json!({
        "if_name": config.if_name,
        "inet_addr": config.inet_addr,
        "netmask": config.netmask,
        "gre_remote_inet_addr": config.gre_remote_inet_addr,
        "gre_local_inet_addr": config.gre_local_inet_addr,
        "parent_ifname": config.parent_ifname,
        "parent_bridge": config.parent_bridge,
        "mtu": config.mtu,
        "vlan_id": config.vlan_id,
        "if_type": config.if_type.code(),
        "if_cmd": config.if_cmd.code(),
    });
    expect_object(row)
}

fn encode_feedback(feedback: &Feedback) -> Map<String, Value> {
    let row = json!({
        "req_uuid": feedback.req_uuid,
        "status": feedback.status.code(),
    });
    expect_object(row)
}

fn decode_gateway_config(row: &Map<String, Value>) -> GatewayConfig {
    GatewayConfig {
        if_name: string_field(row, "if_name"),
        inet_addr: string_field(row, "inet_addr"),
        netmask: string_field(row, "netmask"),
        gre_remote_inet_addr: string_field(row, "gre_remote_inet_addr"),
        gre_local_inet_addr: string_field(row, "gre_local_inet_addr"),
        parent_ifname: string_field(row, "parent_ifname"),
        parent_bridge: string_field(row, "parent_bridge"),
        mtu: int_field(row, "mtu"),
        vlan_id: int_field(row, "vlan_id"),
        if_type: InterfaceType::from_code(int_field(row, "if_type")),
        if_cmd: InterfaceCommand::from_code(int_field(row, "if_cmd")),
    }
}

fn decode_feedback(row: &Map<String, Value>) -> Feedback {
    Feedback {
        req_uuid: string_field(row, "req_uuid"),
        status: OvsStatus::from_code(int_field(row, "status")),
    }
}

fn string_field(row: &Map<String, Value>, key: &str) -> String {
    match row.get(key) {
        Some(Value::String(value)) => value.clone(),
        _ => String::new(),
    }
}

fn int_field(row: &Map<String, Value>, key: &str) -> i64 {
    match row.get(key) {
        Some(value) => value.as_i64().unwrap_or(0),
        None => 0,
    }
}

// json! with an object literal always yields Value::Object.
fn expect_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
