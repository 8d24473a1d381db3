//! Upgrading ABI descriptions emitted by old compilers to the current conventions.

use crate::error::Error;
use crate::version_info::VersionInfo;
use serde_json::{json, Value};

/// Fill in the implicit parts of an ABI produced by `compiler_version`.
///
/// Older compilers left out what was implied at the time: constructors were payable before 0.4.5,
/// everything but constant functions was payable before 0.4.0, `stateMutability` did not exist
/// before 0.4.16, and the default constructor (before 0.1.2) and fallback (before 0.4.0) were not
/// listed at all.
pub fn update(compiler_version: &str, mut abi: Vec<Value>) -> Result<Vec<Value>, Error> {
    let version = VersionInfo::new(compiler_version);
    version.parse()?;

    let mut has_constructor = false;
    let mut has_fallback = false;

    for item in abi.iter_mut() {
        let item = match item.as_object_mut() {
            Some(item) => item,
            None => continue,
        };
        let ty = item.get("type").and_then(Value::as_str).unwrap_or("function").to_owned();

        if ty == "constructor" {
            has_constructor = true;
            if version.older_than(0, 4, 5) {
                item.insert("payable".to_owned(), Value::Bool(true));
            }
        } else if ty == "fallback" {
            has_fallback = true;
        }

        if ty != "event" {
            let flag = |item: &serde_json::Map<String, Value>, key: &str| {
                item.get(key).and_then(Value::as_bool).unwrap_or(false)
            };
            if !flag(item, "constant") && version.older_than(0, 4, 0) {
                item.insert("payable".to_owned(), Value::Bool(true));
            }
            if version.older_than(0, 4, 16) {
                let mutability = if flag(item, "payable") {
                    "payable"
                } else if flag(item, "constant") {
                    "view"
                } else {
                    "nonpayable"
                };
                item.insert("stateMutability".to_owned(), Value::from(mutability));
            }
        }
    }

    if !has_constructor && version.older_than(0, 1, 2) {
        abi.push(json!({
            "type": "constructor",
            "payable": true,
            "stateMutability": "payable",
            "inputs": []
        }));
    }

    if !has_fallback && version.older_than(0, 4, 0) {
        abi.push(json!({
            "type": "fallback",
            "payable": true,
            "stateMutability": "payable"
        }));
    }

    Ok(abi)
}
