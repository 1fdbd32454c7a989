//! Upgrades persisted wizard state from any earlier shape to the current one.
//!
//! Shapes:
//! - v1 (no `schema_version`): `{ step, draft: { selected, lines, markup } }`
//! - v2: v1 plus `name`, `draft_id`, `created_at`, `updated_at`,
//!   `include_materials`, and a `quantity` on every line
//! - v3: `{ schema_version, user_id, wizard: <v2 object> }`

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};

use super::PersistedState;

pub const CURRENT_STATE_VERSION: u32 = 3;

pub fn detect_version(value: &Value) -> u32 {
    match value.get("schema_version").and_then(Value::as_u64) {
        Some(v) => u32::try_from(v).unwrap_or(u32::MAX),
        None if value.get("wizard").is_some() => 3,
        None if value.get("include_materials").is_some() || value.get("name").is_some() => 2,
        None => 1,
    }
}

pub fn migrate(mut value: Value) -> Result<PersistedState> {
    if !value.is_object() {
        anyhow::bail!("State file is not a JSON object");
    }
    let mut version = detect_version(&value);
    if version > CURRENT_STATE_VERSION {
        anyhow::bail!(
            "State file version {version} is newer than supported version {CURRENT_STATE_VERSION}"
        );
    }
    while version < CURRENT_STATE_VERSION {
        value = match version {
            1 => v1_to_v2(value),
            _ => v2_to_v3(value),
        };
        version += 1;
        tracing::debug!(version, "state upgraded");
    }
    serde_json::from_value(value).context("Failed to decode wizard state")
}

fn v1_to_v2(value: Value) -> Value {
    let mut obj = into_object(value);
    obj.entry("name").or_insert_with(|| json!(""));
    obj.entry("draft_id").or_insert(Value::Null);
    obj.entry("created_at").or_insert(Value::Null);
    obj.entry("updated_at").or_insert(Value::Null);
    obj.entry("include_materials").or_insert(json!(true));

    if let Some(lines) = obj
        .get_mut("draft")
        .and_then(|d| d.get_mut("lines"))
        .and_then(Value::as_object_mut)
    {
        for line in lines.values_mut().filter_map(Value::as_object_mut) {
            line.entry("quantity").or_insert_with(|| json!(""));
        }
    }
    Value::Object(obj)
}

fn v2_to_v3(value: Value) -> Value {
    let mut wizard = into_object(value);
    wizard.remove("schema_version");
    json!({
        "schema_version": 3,
        "user_id": Value::Null,
        "wizard": Value::Object(wizard),
    })
}

fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
