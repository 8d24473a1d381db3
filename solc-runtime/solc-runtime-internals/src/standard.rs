//! Standard JSON compilation on top of whichever entry point a module exports.
//!
//! Modules with a native standard JSON entry point get the input and return the output verbatim.
//! For older modules the input is rewritten for a legacy entry point and the legacy output is
//! translated back. Problems with the input or with what the compiler returned are reported in
//! the output as a single fatal `JSONError`, as a standard JSON compiler would report them.

use crate::bindings::CoreBindings;
use crate::callback::Callbacks;
use crate::compile::{CompileBindings, CompileEntry, RawInput};
use crate::error::Error;
use crate::module::ModuleInternal;
use serde_json::{json, Map, Value};
use solc_module::{translate_json_compiler_output, CompilationOutput, LibraryMap};
use tracing::debug;

/// Why a standard JSON compilation could not produce output of its own.
struct Fatal(String);

impl From<String> for Fatal {
    fn from(message: String) -> Fatal {
        Fatal(message)
    }
}

impl From<&str> for Fatal {
    fn from(message: &str) -> Fatal {
        Fatal(message.to_owned())
    }
}

/// A standard JSON input, reduced to what legacy entry points understand.
struct LegacyInput {
    sources: Map<String, Value>,
    optimize: bool,
    libraries: Option<LibraryMap>,
}

impl LegacyInput {
    fn parse(input: &str) -> Result<LegacyInput, Fatal> {
        let input: Value = serde_json::from_str(input)
            .map_err(|e| Fatal::from(format!("Invalid JSON supplied: {}", e)))?;

        if input.get("language").and_then(Value::as_str) != Some("Solidity") {
            return Err(r#"Only "Solidity" is supported as a language."#.into());
        }

        let sources = match input.get("sources").and_then(Value::as_object) {
            Some(sources) if !sources.is_empty() => sources,
            _ => return Err("No input sources specified.".into()),
        };
        let mut translated = Map::new();
        for (name, source) in sources {
            match source.get("content") {
                Some(Value::String(content)) => {
                    translated.insert(name.clone(), Value::String(content.clone()));
                }
                _ => return Err("Failed to process sources.".into()),
            }
        }

        let settings = input.get("settings");
        let optimize = settings
            .and_then(|s| s.pointer("/optimizer/enabled"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let libraries = match settings.and_then(|s| s.get("libraries")) {
            Some(libraries) => {
                Some(LibraryMap::from_json(libraries).map_err(|e| Fatal::from(e.to_string()))?)
            }
            None => None,
        };

        Ok(LegacyInput {
            sources: translated,
            optimize,
            libraries,
        })
    }

    fn sources_json(&self) -> String {
        json!({ "sources": self.sources }).to_string()
    }
}

/// Compile the standard JSON document `input`, returning a standard JSON output document.
pub fn compile<M: ModuleInternal + ?Sized>(
    bindings: &CompileBindings,
    module: &mut M,
    core: &CoreBindings,
    input: &str,
    callbacks: Callbacks,
) -> Result<String, Error> {
    if bindings.standard_entry().is_some() {
        return bindings.compile_standard(module, core, input, callbacks);
    }
    match compile_legacy(bindings, module, core, input, callbacks)? {
        Ok(output) => serialize(&output),
        Err(Fatal(message)) => {
            debug!(message = %message, "standard JSON compilation failed");
            serialize(&CompilationOutput::fatal(message))
        }
    }
}

/// The outer `Result` carries failures of the module itself; the inner one, failures to make
/// sense of the input or output.
fn compile_legacy<M: ModuleInternal + ?Sized>(
    bindings: &CompileBindings,
    module: &mut M,
    core: &CoreBindings,
    input: &str,
    callbacks: Callbacks,
) -> Result<Result<CompilationOutput, Fatal>, Error> {
    let legacy = match LegacyInput::parse(input) {
        Ok(legacy) => legacy,
        Err(fatal) => return Ok(Err(fatal)),
    };

    let entry = bindings.preferred();
    debug!(entry = ?entry, sources = legacy.sources.len(), "compiling through a legacy entry point");
    let raw_output = match entry {
        Some(CompileEntry::LegacyCallback) => {
            let text = legacy.sources_json();
            let input = RawInput {
                text: &text,
                optimize: legacy.optimize,
            };
            bindings.compile_callback(module, core, input, callbacks)?
        }
        Some(CompileEntry::Multi) => {
            let text = legacy.sources_json();
            let input = RawInput {
                text: &text,
                optimize: legacy.optimize,
            };
            bindings.compile_multi(module, core, input)?
        }
        Some(CompileEntry::Single) => {
            if legacy.sources.len() != 1 {
                return Ok(Err(
                    "Multiple sources provided, but compiler only supports single input.".into(),
                ));
            }
            let text = legacy.sources.values().next().and_then(Value::as_str).unwrap_or("");
            let input = RawInput {
                text,
                optimize: legacy.optimize,
            };
            bindings.compile_single(module, core, input)?
        }
        _ => return Ok(Err("Compiler does not support any known interface.".into())),
    };

    Ok(translate_output(&raw_output, legacy.libraries.as_ref()))
}

fn translate_output(raw: &str, libraries: Option<&LibraryMap>) -> Result<CompilationOutput, Fatal> {
    let output: Value = serde_json::from_str(raw)
        .map_err(|e| Fatal::from(format!("Compiler returned invalid JSON: {}", e)))?;
    match translate_json_compiler_output(&output, libraries) {
        Ok(Some(output)) => Ok(output),
        Ok(None) => Err("Failed to process output.".into()),
        Err(e) => Err(e.to_string().into()),
    }
}

fn serialize(output: &CompilationOutput) -> Result<String, Error> {
    serde_json::to_string(output).map_err(|e| Error::InternalError(e.into()))
}
