//! Normalization of output from compilers that predate the standard-JSON interface.
//!
//! Legacy compilers report a flat `{errors, contracts, sources, sourceList}` document where
//! contracts are keyed by `file:name`, bytecode is unlinked, errors are bare strings and gas
//! estimates are numbers or `null`. [`translate_json_compiler_output`] reshapes such a document
//! into a [`CompilationOutput`].

use crate::error::Error;
use crate::libraries::LibraryMap;
use crate::linker::{find_link_references, link_bytecode};
use crate::output::{
    BytecodeOutput, CompilationOutput, ContractOutput, CreationGasEstimates, EvmOutput,
    GasEstimates, OutputError, Severity, SourceOutput, GENERAL_COMPONENT,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

lazy_static! {
    /// `file:line:col:type: message`
    static ref ERROR_TYPE: Regex = Regex::new(r"^(.*):(\d+):(\d+):(.*):").unwrap();
    /// `name`, `:name` or `file:name`
    static ref CONTRACT_KEY: Regex = Regex::new(r"^(?:([^:]*):)?([^:]+)$").unwrap();
}

/// Classify a legacy error string into a diagnostic.
pub fn translate_error(message: &str) -> OutputError {
    let ty = match ERROR_TYPE.captures(message) {
        Some(caps) => caps[4].trim().to_owned(),
        None if message.contains("Warning") => "Warning".to_owned(),
        None => "Error".to_owned(),
    };
    let severity = if ty == "Warning" {
        Severity::Warning
    } else {
        Severity::Error
    };
    OutputError {
        ty,
        component: GENERAL_COMPONENT.to_owned(),
        severity,
        message: message.to_owned(),
        formatted_message: message.to_owned(),
        source_location: None,
    }
}

pub fn translate_errors<'a, I: IntoIterator<Item = &'a str>>(errors: I) -> Vec<OutputError> {
    errors.into_iter().map(translate_error).collect()
}

/// Convert a gas estimate tree: `null` becomes `"infinite"` and numbers their decimal form.
///
/// Arrays are converted to objects keyed by index, as the legacy format used positional lists
/// where the standard one uses named fields.
pub fn translate_gas_estimates(estimates: &Value) -> Value {
    match estimates {
        Value::Null => Value::String("infinite".to_owned()),
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        Value::String(_) => estimates.clone(),
        Value::Array(items) => Value::Object(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), translate_gas_estimates(v)))
                .collect(),
        ),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), translate_gas_estimates(v)))
                .collect(),
        ),
    }
}

fn translate_contract_gas_estimates(estimates: Option<&Value>) -> GasEstimates {
    let mut translated = GasEstimates::default();
    let estimates = match estimates.and_then(Value::as_object) {
        Some(estimates) => estimates,
        None => return translated,
    };
    if let Some(creation) = estimates.get("creation").filter(|c| is_truthy(c)) {
        // [executionCost, codeDepositCost]
        translated.creation = Some(CreationGasEstimates {
            code_deposit_cost: translate_gas_estimates(creation.get(1).unwrap_or(&Value::Null)),
            execution_cost: translate_gas_estimates(creation.get(0).unwrap_or(&Value::Null)),
        });
    }
    if let Some(internal) = estimates.get("internal").filter(|c| is_truthy(c)) {
        translated.internal = Some(translate_gas_estimates(internal));
    }
    if let Some(external) = estimates.get("external").filter(|c| is_truthy(c)) {
        translated.external = Some(translate_gas_estimates(external));
    }
    translated
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        _ => true,
    }
}

/// Split a legacy contract key into `(file, name)`. A bare name belongs to the file `""`.
pub fn split_contract_key(key: &str) -> Option<(String, String)> {
    CONTRACT_KEY.captures(key).map(|caps| {
        let file = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        (file.to_owned(), caps[2].to_owned())
    })
}

fn translate_bytecode(
    bytecode: Option<&Value>,
    libraries: &LibraryMap,
) -> Result<BytecodeOutput, Error> {
    let mut translated = BytecodeOutput::default();
    if let Some(code) = bytecode.and_then(Value::as_str) {
        let linked = link_bytecode(code, libraries)?;
        translated.link_references = Some(find_link_references(&linked));
        translated.object = Some(linked);
    }
    Ok(translated)
}

fn translate_contract(
    contract: &Map<String, Value>,
    libraries: &LibraryMap,
) -> Result<ContractOutput, Error> {
    let field = |name: &str| contract.get(name).filter(|v| !v.is_null()).cloned();

    let abi = match contract.get("interface") {
        Some(Value::String(interface)) => serde_json::from_str(interface)?,
        Some(other) => other.clone(),
        None => Value::Null,
    };

    let mut bytecode = translate_bytecode(contract.get("bytecode"), libraries)?;
    bytecode.opcodes = field("opcodes");
    bytecode.source_map = field("srcmap");

    let mut deployed_bytecode = translate_bytecode(contract.get("runtimeBytecode"), libraries)?;
    deployed_bytecode.source_map = field("srcmapRuntime");

    Ok(ContractOutput {
        abi,
        metadata: field("metadata"),
        evm: EvmOutput {
            legacy_assembly: field("assembly"),
            bytecode,
            deployed_bytecode,
            method_identifiers: field("functionHashes"),
            gas_estimates: translate_contract_gas_estimates(contract.get("gasEstimates")),
            ..EvmOutput::default()
        },
        ..ContractOutput::default()
    })
}

/// Translate a legacy compiler output document.
///
/// Returns `Ok(None)` when a contract key cannot be split into file and contract name; in that
/// case no part of the output is kept. A malformed library address or ABI string is an `Err`.
pub fn translate_json_compiler_output(
    output: &Value,
    libraries: Option<&LibraryMap>,
) -> Result<Option<CompilationOutput>, Error> {
    let output = output.as_object().ok_or(Error::ParseJsonObjError)?;
    let empty = LibraryMap::new();
    let libraries = libraries.unwrap_or(&empty);

    let mut ret = CompilationOutput::default();

    ret.errors = match output.get("error") {
        Some(Value::String(error)) if !error.is_empty() => translate_errors(Some(error.as_str())),
        _ => translate_errors(
            output
                .get("errors")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(Value::as_str),
        ),
    };

    if let Some(contracts) = output.get("contracts").and_then(Value::as_object) {
        for (key, contract) in contracts {
            let (file, name) = match split_contract_key(key) {
                Some(split) => split,
                None => {
                    tracing::debug!("aborting translation on malformed contract key `{}`", key);
                    return Ok(None);
                }
            };
            let empty_contract = Map::new();
            let contract = contract.as_object().unwrap_or(&empty_contract);
            let translated = translate_contract(contract, libraries)?;
            ret.contracts
                .entry(file)
                .or_insert_with(BTreeMap::new)
                .insert(name, translated);
        }
    }

    let source_ids: BTreeMap<&str, u64> = output
        .get("sourceList")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .enumerate()
        .filter_map(|(i, name)| name.as_str().map(|name| (name, i as u64)))
        .collect();

    if let Some(sources) = output.get("sources").and_then(Value::as_object) {
        for (name, source) in sources {
            ret.sources.insert(
                name.clone(),
                SourceOutput {
                    id: source_ids.get(name.as_str()).cloned(),
                    legacy_ast: source.get("AST").cloned(),
                    ..SourceOutput::default()
                },
            );
        }
    }

    Ok(Some(ret))
}
