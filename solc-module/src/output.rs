//! The stable standard-JSON output schema that all compiler generations are normalized into.
//!
//! Fields whose structure differs between compiler generations and that this layer passes through
//! untouched (ABI, metadata, assembly, ASTs) are kept as raw [`serde_json::Value`]s.

use crate::linker::LinkReferences;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Component attributed to every diagnostic this layer produces.
pub const GENERAL_COMPONENT: &str = "general";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub file: String,
    pub start: i64,
    pub end: i64,
}

/// A classified diagnostic.
///
/// `type` is one of `JSONError`, `IOError`, `ParserError`, `DocstringParsingError`,
/// `SyntaxError`, `DeclarationError`, `TypeError`, `UnimplementedFeatureError`,
/// `InternalCompilerError`, `Exception`, `CompilerError`, `FatalError` or `Warning`; legacy
/// compilers may report others, which are kept verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputError {
    #[serde(rename = "type")]
    pub ty: String,
    pub component: String,
    pub severity: Severity,
    pub message: String,
    pub formatted_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_location: Option<SourceLocation>,
}

impl OutputError {
    /// A fatal `JSONError` raised by this layer rather than by the compiler.
    pub fn json_error<S: Into<String>>(message: S) -> Self {
        let message = message.into();
        OutputError {
            ty: "JSONError".to_owned(),
            component: GENERAL_COMPONENT.to_owned(),
            severity: Severity::Error,
            formatted_message: format!("Error: {}", message),
            message,
            source_location: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ast: Option<Value>,
    #[serde(default, rename = "legacyAST", skip_serializing_if = "Option::is_none")]
    pub legacy_ast: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BytecodeOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opcodes: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_map: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_references: Option<LinkReferences>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_sources: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationGasEstimates {
    pub code_deposit_cost: Value,
    pub execution_cost: Value,
}

/// Gas estimates. Every leaf is a decimal string or `"infinite"`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasEstimates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation: Option<CreationGasEstimates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_assembly: Option<Value>,
    #[serde(default)]
    pub bytecode: BytecodeOutput,
    #[serde(default)]
    pub deployed_bytecode: BytecodeOutput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_identifiers: Option<Value>,
    #[serde(default)]
    pub gas_estimates: GasEstimates,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractOutput {
    #[serde(default)]
    pub abi: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userdoc: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devdoc: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ir: Option<Value>,
    #[serde(default)]
    pub evm: EvmOutput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ewasm: Option<Value>,
}

/// Contracts keyed by file name, then by contract name.
pub type Contracts = BTreeMap<String, BTreeMap<String, ContractOutput>>;

/// One compilation's output in the standard-JSON schema.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilationOutput {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<OutputError>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<String, SourceOutput>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub contracts: Contracts,
}

impl CompilationOutput {
    /// An output consisting of a single fatal `JSONError`.
    pub fn fatal<S: Into<String>>(message: S) -> Self {
        CompilationOutput {
            errors: vec![OutputError::json_error(message)],
            ..CompilationOutput::default()
        }
    }
}
