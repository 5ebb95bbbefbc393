use blocksim_common::crypto::{hash, Hash};
use indexmap::IndexMap;
use serde_json::Value;

// Type tags of the canonical encoding
const TAG_NULL: u8 = 0;
const TAG_FALSE: u8 = 1;
const TAG_TRUE: u8 = 2;
const TAG_NUMBER: u8 = 3;
const TAG_STRING: u8 = 4;
const TAG_ARRAY: u8 = 5;
const TAG_OBJECT: u8 = 6;

/// Compute the canonical state hash of a genesis document.
///
/// The hash is blake3 over a canonical big-endian serialization:
/// - module count (u32, BE)
/// - for each module, sorted by id: id (length-prefixed), state value
///
/// Values are encoded with a type tag, object keys are sorted and every
/// string or collection is length-prefixed, so the hash depends neither on
/// module order nor on JSON formatting.
pub fn compute_state_hash(modules: &IndexMap<String, Value>) -> Hash {
    let mut bytes = Vec::new();

    let mut sorted: Vec<(&String, &Value)> = modules.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    write_u32(&mut bytes, sorted.len() as u32);
    for (module, state) in sorted {
        write_string(&mut bytes, module);
        write_value(&mut bytes, state);
    }

    hash(&bytes)
}

fn write_u32(bytes: &mut Vec<u8>, value: u32) {
    bytes.extend_from_slice(&value.to_be_bytes());
}

fn write_string(bytes: &mut Vec<u8>, value: &str) {
    write_u32(bytes, value.len() as u32);
    bytes.extend_from_slice(value.as_bytes());
}

fn write_value(bytes: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => bytes.push(TAG_NULL),
        Value::Bool(false) => bytes.push(TAG_FALSE),
        Value::Bool(true) => bytes.push(TAG_TRUE),
        Value::Number(n) => {
            bytes.push(TAG_NUMBER);
            write_string(bytes, &n.to_string());
        }
        Value::String(s) => {
            bytes.push(TAG_STRING);
            write_string(bytes, s);
        }
        Value::Array(items) => {
            bytes.push(TAG_ARRAY);
            write_u32(bytes, items.len() as u32);
            for item in items {
                write_value(bytes, item);
            }
        }
        Value::Object(map) => {
            bytes.push(TAG_OBJECT);
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            write_u32(bytes, entries.len() as u32);
            for (key, item) in entries {
                write_string(bytes, key);
                write_value(bytes, item);
            }
        }
    }
}
