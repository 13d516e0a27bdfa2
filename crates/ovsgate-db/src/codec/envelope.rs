//! JSON-RPC envelope construction and classification.

use serde_json::{Map, Value, json};

use ovsgate_types::{OvsTable, TableRecord};

use crate::errors::CodecError;

use super::rows;

/// Key selecting the rows a delete request removes.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteKey {
    /// Match the row's server-assigned `_uuid`.
    Uuid(String),
    /// Match a named column against a value.
    Column { column: String, value: Value },
}

impl DeleteKey {
    /// Builds a match on a named column.
    #[must_use]
    pub fn column(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Column {
            column: column.into(),
            value: value.into(),
        }
    }

    fn where_clause(&self) -> Value {
        match self {
            Self::Uuid(uuid) => json!([["_uuid", "==", ["uuid", uuid]]]),
            Self::Column { column, value } => json!([[column, "==", value]]),
        }
    }
}

/// Builds a transact/insert request for the record.
pub(crate) fn insert_request(database: &str, rid: &str, record: &TableRecord) -> String {
    json!({
        "method": "transact",
        "id": rid,
        "params": [database, {
            "op": "insert",
            "table": record.table().name(),
            "row": rows::encode_row(record),
        }],
    })
    .to_string()
}

/// Builds a transact/delete request removing the rows matching `key`.
pub(crate) fn delete_request(database: &str, rid: &str, table: OvsTable, key: &DeleteKey) -> String {
    json!({
        "method": "transact",
        "id": rid,
        "params": [database, {
            "op": "delete",
            "table": table.name(),
            "where": key.where_clause(),
        }],
    })
    .to_string()
}

/// Builds a monitor request subscribing `monitor_id` to the table.
pub(crate) fn monitor_request(
    database: &str,
    rid: &str,
    monitor_id: &str,
    table: OvsTable,
) -> String {
    let mut tables = Map::new();
    tables.insert(table.name().to_string(), Value::Object(Map::new()));
    json!({
        "method": "monitor",
        "params": [database, monitor_id, tables],
        "id": rid,
    })
    .to_string()
}

/// Builds a monitor_cancel request for the subscription.
pub(crate) fn monitor_cancel_request(rid: &str, monitor_id: &str) -> String {
    json!({
        "method": "monitor_cancel",
        "params": [monitor_id],
        "id": rid,
    })
    .to_string()
}

/// An inbound message, classified by its `id` field.
#[derive(Debug)]
pub(crate) enum Envelope {
    /// Reply to a request this client issued.
    Response {
        id: String,
        result: Value,
        error: Option<Value>,
    },
    /// Unsolicited table-change notification.
    Update {
        monitor_id: String,
        tables: Map<String, Value>,
    },
}

impl Envelope {
    /// Classifies a decoded JSON document.
    ///
    /// A present, non-null `id` marks a response; a null `id` marks an
    /// `update` notification whose params are `[monitor_id, {table: rows}]`.
    pub(crate) fn decode(message: Value) -> Result<Self, CodecError> {
        let Value::Object(mut fields) = message else {
            return Err(CodecError::NotAnObject);
        };
        let id = fields.remove("id").ok_or(CodecError::MissingId)?;

        if let Value::String(id) = id {
            let error = fields.remove("error").filter(|value| !value.is_null());
            let result = fields.remove("result").unwrap_or(Value::Null);
            return Ok(Self::Response { id, result, error });
        }
        if !id.is_null() {
            return Err(CodecError::malformed("response id"));
        }

        match fields.get("method").and_then(Value::as_str) {
            Some("update") => {}
            Some(other) => return Err(CodecError::UnsupportedMethod(other.to_string())),
            None => return Err(CodecError::malformed("notification method")),
        }

        let Some(Value::Array(mut params)) = fields.remove("params") else {
            return Err(CodecError::malformed("notification params"));
        };
        if params.len() != 2 {
            return Err(CodecError::malformed("notification params"));
        }
        let Value::Object(tables) = params.remove(1) else {
            return Err(CodecError::malformed("notification tables"));
        };
        let Value::String(monitor_id) = params.remove(0) else {
            return Err(CodecError::malformed("notification monitor id"));
        };

        Ok(Self::Update { monitor_id, tables })
    }
}

#[cfg(test)]
mod tests {
    use ovsgate_types::{Feedback, GatewayConfig, InterfaceCommand, InterfaceType, OvsStatus};

    use super::*;

    fn sample_config() -> TableRecord {
        TableRecord::GatewayConfig(GatewayConfig {
            if_name: "brlan0".to_string(),
            if_type: InterfaceType::Bridge,
            if_cmd: InterfaceCommand::Up,
            ..GatewayConfig::default()
        })
    }

    #[test]
    fn insert_request_has_the_expected_shape() {
        let payload: Value =
            serde_json::from_str(&insert_request("Open_vSwitch", "2001", &sample_config()))
                .expect("valid json");
        assert_eq!(payload["method"], "transact");
        assert_eq!(payload["id"], "2001");
        assert_eq!(payload["params"][0], "Open_vSwitch");
        assert_eq!(payload["params"][1]["op"], "insert");
        assert_eq!(payload["params"][1]["table"], "Gateway_Config");
        assert_eq!(payload["params"][1]["row"]["if_name"], "brlan0");
        assert_eq!(payload["params"][1]["row"]["if_type"], 1);
        assert_eq!(payload["params"][1]["row"]["mtu"], 1500);
    }

    #[test]
    fn delete_by_uuid_matches_the_opaque_identifier() {
        let payload: Value = serde_json::from_str(&delete_request(
            "Open_vSwitch",
            "7",
            OvsTable::GatewayConfig,
            &DeleteKey::Uuid("abc-123".to_string()),
        ))
        .expect("valid json");
        assert_eq!(payload["params"][1]["op"], "delete");
        assert_eq!(
            payload["params"][1]["where"],
            json!([["_uuid", "==", ["uuid", "abc-123"]]])
        );
    }

    #[test]
    fn delete_by_column_matches_the_named_column() {
        let payload: Value = serde_json::from_str(&delete_request(
            "Open_vSwitch",
            "8",
            OvsTable::Feedback,
            &DeleteKey::column("req_uuid", "abc-123"),
        ))
        .expect("valid json");
        assert_eq!(
            payload["params"][1]["where"],
            json!([["req_uuid", "==", "abc-123"]])
        );
    }

    #[test]
    fn monitor_request_registers_the_table() {
        let payload: Value =
            serde_json::from_str(&monitor_request("Open_vSwitch", "11", "10", OvsTable::Feedback))
                .expect("valid json");
        assert_eq!(payload["method"], "monitor");
        assert_eq!(payload["params"][0], "Open_vSwitch");
        assert_eq!(payload["params"][1], "10");
        assert_eq!(payload["params"][2], json!({"Feedback": {}}));
        assert_eq!(payload["id"], "11");
    }

    #[test]
    fn monitor_cancel_request_names_the_subscription() {
        let payload: Value = serde_json::from_str(&monitor_cancel_request("12", "10"))
            .expect("valid json");
        assert_eq!(payload["method"], "monitor_cancel");
        assert_eq!(payload["params"], json!(["10"]));
    }

    #[test]
    fn response_envelopes_carry_id_and_result() {
        let message = json!({"id": "2001", "result": [{"count": 1}], "error": null});
        let envelope = Envelope::decode(message).expect("decode response");
        let Envelope::Response { id, result, error } = envelope else {
            panic!("expected a response envelope");
        };
        assert_eq!(id, "2001");
        assert_eq!(result, json!([{"count": 1}]));
        assert!(error.is_none());
    }

    #[test]
    fn update_envelopes_split_monitor_id_and_tables() {
        let message = json!({
            "id": null,
            "method": "update",
            "params": ["10", {"Feedback": {"row-1": {"new": {"req_uuid": "abc", "status": 0}}}}],
        });
        let envelope = Envelope::decode(message).expect("decode update");
        let Envelope::Update { monitor_id, tables } = envelope else {
            panic!("expected an update envelope");
        };
        assert_eq!(monitor_id, "10");
        assert!(tables.contains_key("Feedback"));
    }

    #[test]
    fn messages_without_an_id_are_rejected() {
        let error = Envelope::decode(json!({"method": "update"})).expect_err("missing id");
        assert!(matches!(error, CodecError::MissingId));
    }

    #[test]
    fn null_id_with_unknown_method_is_rejected() {
        let message = json!({"id": null, "method": "echo", "params": []});
        let error = Envelope::decode(message).expect_err("unsupported method");
        assert!(matches!(error, CodecError::UnsupportedMethod(method) if method == "echo"));
    }

    #[test]
    fn feedback_round_trips_through_insert_and_update_rows() {
        let feedback = TableRecord::Feedback(Feedback::new("abc-123", OvsStatus::Success));
        let payload: Value =
            serde_json::from_str(&insert_request("Open_vSwitch", "1", &feedback))
                .expect("valid json");
        let row = &payload["params"][1]["row"];
        let change = json!({"new": row});
        let decoded = rows::decode_row_change(OvsTable::Feedback, &change)
            .expect("decode row")
            .expect("row carries a record");
        assert_eq!(decoded, feedback);
    }
}
