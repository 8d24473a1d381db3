//! Scripted stand-ins for each generation of the compiler interface.

#![allow(dead_code)]

use lazy_static::lazy_static;
use serde_json::{json, Value};
use solc_runtime::module::ModuleInternal;
use solc_runtime::{Error, MockModuleBuilder, Val, Vmctx};
use std::mem;
use std::sync::{Arc, Mutex};

pub const WORD: usize = mem::size_of::<usize>();

/// The 40-character placeholder a legacy compiler leaves for library `L` declared in `lib.sol`.
pub const LIB_PLACEHOLDER: &str = "__lib.sol:L_____________________________";

lazy_static! {
    /// What a 0.4-era compiler returns for a contract `A` in `a.sol` that calls library `L`.
    pub static ref LEGACY_OUTPUT: Value = json!({
        "contracts": {
            "a.sol:A": {
                "interface": r#"[{"type":"function","name":"f","inputs":[],"outputs":[],"constant":false,"payable":false}]"#,
                "bytecode": format!("6060{}6000", LIB_PLACEHOLDER),
                "runtimeBytecode": "6060",
                "opcodes": "PUSH1 0x60",
                "srcmap": "0:13:0:-",
                "srcmapRuntime": "",
                "functionHashes": {"f()": "26121ff0"},
                "gasEstimates": {
                    "creation": [null, 1000],
                    "external": {"f()": 120},
                    "internal": {}
                },
                "metadata": "{}"
            }
        },
        "errors": ["a.sol:1:1: Warning: This is a pre-release compiler version."],
        "sourceList": ["a.sol"],
        "sources": {"a.sol": {"AST": {"name": "SourceUnit"}}}
    });
}

/// The inputs a fake compiler was called with: `(input, optimize)`.
pub type Calls = Arc<Mutex<Vec<(String, bool)>>>;

fn record(calls: &Calls, vmctx: &mut Vmctx<'_>, args: &[Val]) -> Result<(), Error> {
    let input = vmctx.read_cstr(args[0].as_ptr()?)?;
    let optimize = args.get(1) == Some(&Val::Bool(true));
    calls.lock().unwrap().push((input, optimize));
    Ok(())
}

fn legacy_output(vmctx: &mut Vmctx<'_>) -> Result<Val, Error> {
    vmctx.alloc_cstr(&LEGACY_OUTPUT.to_string()).map(Val::Ptr)
}

/// Call the import callback in slot `callback` with `path`, returning `(contents, error)`.
pub fn call_import(
    vmctx: &mut Vmctx<'_>,
    callback: Val,
    path: &str,
) -> Result<(Option<String>, Option<String>), Error> {
    let path = vmctx.alloc_cstr(path)?;
    let outs = vmctx.malloc(2 * WORD)?;
    vmctx.write_ptr(outs, 0)?;
    vmctx.write_ptr(outs + WORD, 0)?;
    vmctx.call_indirect(
        callback.as_func_ref()?,
        &[Val::Ptr(path), Val::Ptr(outs), Val::Ptr(outs + WORD)],
    )?;
    Ok((read_out(vmctx, outs)?, read_out(vmctx, outs + WORD)?))
}

/// Call the kinded callback in slot `callback`, returning `(contents, error)`.
pub fn call_kinded(
    vmctx: &mut Vmctx<'_>,
    callback: Val,
    context: usize,
    kind: &str,
    data: &str,
) -> Result<(Option<String>, Option<String>), Error> {
    let kind = vmctx.alloc_cstr(kind)?;
    let data = vmctx.alloc_cstr(data)?;
    let outs = vmctx.malloc(2 * WORD)?;
    vmctx.write_ptr(outs, 0)?;
    vmctx.write_ptr(outs + WORD, 0)?;
    vmctx.call_indirect(
        callback.as_func_ref()?,
        &[
            Val::Ptr(context),
            Val::Ptr(kind),
            Val::Ptr(data),
            Val::Ptr(outs),
            Val::Ptr(outs + WORD),
        ],
    )?;
    Ok((read_out(vmctx, outs)?, read_out(vmctx, outs + WORD)?))
}

fn read_out(vmctx: &Vmctx<'_>, out: usize) -> Result<Option<String>, Error> {
    match vmctx.read_ptr(out)? {
        0 => Ok(None),
        p => vmctx.read_cstr(p).map(Some),
    }
}

/// A compiler exporting only `compileJSON`, which echoes legacy output.
pub fn single_input_compiler(calls: Calls) -> MockModuleBuilder {
    MockModuleBuilder::new()
        .with_string_export("version", "0.1.3-0/.-/clang/int linked to libethereum")
        .with_export("compileJSON", move |vmctx, args| {
            record(&calls, vmctx, args)?;
            legacy_output(vmctx)
        })
}

/// A compiler exporting `compileJSON` and `compileJSONMulti`.
pub fn multi_input_compiler(calls: Calls) -> MockModuleBuilder {
    let single = calls.clone();
    MockModuleBuilder::new()
        .with_string_export("version", "0.3.6-3fc68da5/Release-Emscripten/clang")
        .with_export("compileJSON", move |vmctx, args| {
            record(&single, vmctx, args)?;
            legacy_output(vmctx)
        })
        .with_export("compileJSONMulti", move |vmctx, args| {
            record(&calls, vmctx, args)?;
            legacy_output(vmctx)
        })
}

/// A compiler exporting `compileJSONCallback`, which asks for `lib.sol` and reports what it got
/// back as a warning.
pub fn legacy_callback_compiler(calls: Calls) -> MockModuleBuilder {
    MockModuleBuilder::new()
        .with_string_export("version", "0.4.11+commit.68ef5810.Emscripten.clang")
        .with_string_export("license", "GPL-3.0")
        .with_export("compileJSON", |_, _| Ok(Val::NULL))
        .with_export("compileJSONMulti", |_, _| Ok(Val::NULL))
        .with_export("compileJSONCallback", move |vmctx, args| {
            record(&calls, vmctx, args)?;
            let (contents, error) = call_import(vmctx, args[2], "lib.sol")?;
            let report = match (contents, error) {
                (Some(contents), _) => format!("lib.sol:1:1: Warning: imported {}", contents),
                (None, Some(error)) => format!("lib.sol:1:1: Error: {}", error),
                (None, None) => "lib.sol:1:1: Error: no result".to_owned(),
            };
            let output = json!({ "errors": [report] }).to_string();
            vmctx.alloc_cstr(&output).map(Val::Ptr)
        })
}

/// A 0.6+ compiler exporting `solidity_compile`. Every source whose content starts with
/// `request:` makes one callback with the kind and data that follow, e.g.
/// `request:smt-query:(check-sat)`; the results are returned as
/// `{"results": [{"contents": .., "error": ..}]}`.
pub fn modern_compiler() -> MockModuleBuilder {
    MockModuleBuilder::new()
        .with_string_export("solidity_version", "0.6.12+commit.27d51765.Emscripten.clang")
        .with_string_export("solidity_license", "GPL-3.0")
        .with_alloc_export("solidity_alloc")
        .with_reset_export("solidity_reset")
        .with_export("solidity_compile", |vmctx, args| {
            if args.len() != 3 || !args[2].is_null() {
                return Err(Error::InvalidArgument("solidity_compile takes (input, callback, null)"));
            }
            let input: Value = serde_json::from_str(&vmctx.read_cstr(args[0].as_ptr()?)?)
                .map_err(|e| Error::InternalError(e.into()))?;
            let mut results = vec![];
            if let Some(sources) = input["sources"].as_object() {
                for source in sources.values() {
                    let content = source["content"].as_str().unwrap_or("");
                    if let Some(request) = content.strip_prefix("request:") {
                        let mut parts = request.splitn(2, ':');
                        let kind = parts.next().unwrap_or("");
                        let data = parts.next().unwrap_or("");
                        let (contents, error) = call_kinded(vmctx, args[1], 0, kind, data)?;
                        results.push(json!({"contents": contents, "error": error}));
                    }
                }
            }
            let output = json!({ "results": results }).to_string();
            vmctx.alloc_cstr(&output).map(Val::Ptr)
        })
}

/// A standard JSON input for `sources`, given as `(name, content)` pairs.
pub fn standard_input(sources: &[(&str, &str)], settings: Value) -> String {
    let sources: serde_json::Map<String, Value> = sources
        .iter()
        .map(|(name, content)| (name.to_string(), json!({ "content": content })))
        .collect();
    json!({
        "language": "Solidity",
        "sources": sources,
        "settings": settings,
    })
    .to_string()
}
