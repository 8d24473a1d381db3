mod test_helpers;

use crate::test_helpers::{
    legacy_callback_compiler, multi_input_compiler, single_input_compiler, standard_input, Calls,
    LIB_PLACEHOLDER,
};
use serde_json::{json, Value};
use solc_runtime::module::ModuleInternal;
use solc_runtime::{CallbackResult, Callbacks, Error, Features, MockModuleBuilder, Solc, Val};

fn compile(solc: &mut Solc, input: &str) -> Value {
    let output = solc.compile(input, Callbacks::new()).unwrap();
    serde_json::from_str(&output).unwrap()
}

fn assert_fatal(output: &Value, message: &str) {
    assert_eq!(
        output,
        &json!({
            "errors": [{
                "type": "JSONError",
                "component": "general",
                "severity": "error",
                "message": message,
                "formattedMessage": format!("Error: {}", message),
            }]
        })
    );
}

#[test]
fn single_input_features() -> Result<(), Error> {
    let solc = Solc::new(Box::new(single_input_compiler(Calls::default()).build()))?;
    assert_eq!(
        solc.features(),
        Features {
            legacy_single_input: true,
            multiple_inputs: false,
            import_callback: false,
            native_standard_json: false,
        }
    );
    assert_eq!(solc.version(), "0.1.3-0/.-/clang/int linked to libethereum");
    assert_eq!(solc.semver(), "0.1.3");
    Ok(())
}

#[test]
fn single_input_compiles_the_only_source() {
    let calls = Calls::default();
    let mut solc = Solc::new(Box::new(single_input_compiler(calls.clone()).build())).unwrap();

    let input = standard_input(
        &[("a.sol", "contract A {}")],
        json!({"optimizer": {"enabled": true}}),
    );
    let output = compile(&mut solc, &input);
    assert!(output["contracts"]["a.sol"]["A"].is_object());
    assert_eq!(
        calls.lock().unwrap().as_slice(),
        &[("contract A {}".to_owned(), true)]
    );
}

#[test]
fn single_input_rejects_multiple_sources() {
    let calls = Calls::default();
    let mut solc = Solc::new(Box::new(single_input_compiler(calls.clone()).build())).unwrap();
    let input = standard_input(&[("a.sol", ""), ("b.sol", "")], json!({}));
    assert_fatal(
        &compile(&mut solc, &input),
        "Multiple sources provided, but compiler only supports single input.",
    );
    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn multi_input_translation() {
    let calls = Calls::default();
    let mut solc = Solc::new(Box::new(multi_input_compiler(calls.clone()).build())).unwrap();
    assert_eq!(solc.semver(), "0.3.6+commit.3fc68da5");

    let input = standard_input(&[("a.sol", "contract A {}"), ("lib.sol", "library L {}")], json!({}));
    let output = compile(&mut solc, &input);

    let (sent, optimize) = calls.lock().unwrap()[0].clone();
    assert!(!optimize);
    assert_eq!(
        serde_json::from_str::<Value>(&sent).unwrap(),
        json!({"sources": {"a.sol": "contract A {}", "lib.sol": "library L {}"}})
    );

    let a = &output["contracts"]["a.sol"]["A"];
    assert_eq!(a["abi"][0]["name"], "f");
    assert_eq!(a["metadata"], "{}");
    assert_eq!(a["evm"]["methodIdentifiers"]["f()"], "26121ff0");
    assert_eq!(
        a["evm"]["gasEstimates"]["creation"],
        json!({"codeDepositCost": "1000", "executionCost": "infinite"})
    );
    assert_eq!(a["evm"]["gasEstimates"]["external"]["f()"], "120");
    assert_eq!(
        a["evm"]["bytecode"]["object"],
        format!("6060{}6000", LIB_PLACEHOLDER)
    );
    assert_eq!(
        a["evm"]["bytecode"]["linkReferences"],
        json!({"lib.sol:L": [{"start": 2, "length": 20}]})
    );

    assert_eq!(output["sources"]["a.sol"]["id"], 0);
    assert_eq!(output["sources"]["a.sol"]["legacyAST"]["name"], "SourceUnit");
    assert_eq!(output["errors"][0]["type"], "Warning");
    assert_eq!(output["errors"][0]["severity"], "warning");
    assert_eq!(output["errors"][0]["component"], "general");
}

#[test]
fn libraries_are_linked() {
    let mut solc = Solc::new(Box::new(multi_input_compiler(Calls::default()).build())).unwrap();
    let input = standard_input(
        &[("a.sol", "contract A {}")],
        json!({"libraries": {"lib.sol": {"L": "0x1234"}}}),
    );
    let output = compile(&mut solc, &input);
    let bytecode = &output["contracts"]["a.sol"]["A"]["evm"]["bytecode"];
    assert_eq!(
        bytecode["object"],
        format!("6060{:0>40}6000", "1234")
    );
    assert_eq!(bytecode["linkReferences"], json!({}));
}

#[test]
fn bad_library_address_is_fatal() {
    let mut solc = Solc::new(Box::new(multi_input_compiler(Calls::default()).build())).unwrap();
    let input = standard_input(
        &[("a.sol", "contract A {}")],
        json!({"libraries": {"lib.sol": {"L": "1234"}}}),
    );
    assert_fatal(
        &compile(&mut solc, &input),
        "Invalid address specified for L",
    );
}

#[test]
fn invalid_inputs() {
    let mut solc = Solc::new(Box::new(multi_input_compiler(Calls::default()).build())).unwrap();

    let output = compile(&mut solc, "{ not json");
    let message = output["errors"][0]["message"].as_str().unwrap();
    assert!(message.starts_with("Invalid JSON supplied: "));

    assert_fatal(
        &compile(
            &mut solc,
            r#"{"language": "Yul", "sources": {"a.yul": {"content": "{}"}}}"#,
        ),
        r#"Only "Solidity" is supported as a language."#,
    );
    assert_fatal(
        &compile(&mut solc, r#"{"language": "Solidity", "sources": {}}"#),
        "No input sources specified.",
    );
    assert_fatal(
        &compile(
            &mut solc,
            r#"{"language": "Solidity", "sources": {"a.sol": {"keccak256": "0x00"}}}"#,
        ),
        "Failed to process sources.",
    );
}

#[test]
fn invalid_compiler_output() {
    let mut solc = Solc::new(Box::new(
        MockModuleBuilder::new()
            .with_string_export("version", "0.2.0")
            .with_export("compileJSONMulti", |vmctx, _| {
                vmctx.alloc_cstr("<html>").map(Val::Ptr)
            })
            .build(),
    ))
    .unwrap();
    let output = compile(&mut solc, &standard_input(&[("a.sol", "")], json!({})));
    let message = output["errors"][0]["message"].as_str().unwrap();
    assert!(message.starts_with("Compiler returned invalid JSON: "));
}

#[test]
fn malformed_contract_key() {
    let mut solc = Solc::new(Box::new(
        MockModuleBuilder::new()
            .with_string_export("version", "0.2.0")
            .with_export("compileJSONMulti", |vmctx, _| {
                vmctx
                    .alloc_cstr(r#"{"contracts": {"a:b:c": {}}}"#)
                    .map(Val::Ptr)
            })
            .build(),
    ))
    .unwrap();
    assert_fatal(
        &compile(&mut solc, &standard_input(&[("a.sol", "")], json!({}))),
        "Failed to process output.",
    );
}

#[test]
fn no_known_interface() {
    let mut solc = Solc::new(Box::new(
        MockModuleBuilder::new()
            .with_string_export("version", "0.1.0")
            .build(),
    ))
    .unwrap();
    assert_eq!(solc.features(), Features::default());
    assert_fatal(
        &compile(&mut solc, &standard_input(&[("a.sol", "")], json!({}))),
        "Compiler does not support any known interface.",
    );
}

#[test]
fn legacy_callback_resolves_imports() {
    let calls = Calls::default();
    let mut solc = Solc::new(Box::new(legacy_callback_compiler(calls.clone()).build())).unwrap();
    assert!(!solc.descriptor().is_modern_callback_abi());
    assert_eq!(solc.license().unwrap().as_deref(), Some("GPL-3.0"));

    let input = standard_input(
        &[("a.sol", "import \"lib.sol\";")],
        json!({"optimizer": {"enabled": true}}),
    );
    let callbacks = Callbacks::new().with_import(|path| {
        assert_eq!(path, "lib.sol");
        CallbackResult::Contents("library L {}".to_owned())
    });
    let output: Value = serde_json::from_str(&solc.compile(&input, callbacks).unwrap()).unwrap();
    assert_eq!(
        output["errors"][0]["formattedMessage"],
        "lib.sol:1:1: Warning: imported library L {}"
    );
    assert!(calls.lock().unwrap()[0].1);
}

#[test]
fn legacy_callback_without_handler() {
    let mut solc = Solc::new(Box::new(legacy_callback_compiler(Calls::default()).build())).unwrap();
    let input = standard_input(&[("a.sol", "import \"lib.sol\";")], json!({}));
    let output = compile(&mut solc, &input);
    assert_eq!(output["errors"][0]["type"], "Error");
    assert_eq!(
        output["errors"][0]["formattedMessage"],
        "lib.sol:1:1: Error: File import callback not supported"
    );
}

#[test]
fn lowlevel_entry_points() {
    let calls = Calls::default();
    let mut solc = Solc::new(Box::new(multi_input_compiler(calls.clone()).build())).unwrap();

    let raw = solc.lowlevel().compile_single("contract A {}", true).unwrap();
    assert_eq!(serde_json::from_str::<Value>(&raw).unwrap(), *test_helpers::LEGACY_OUTPUT);
    solc.lowlevel()
        .compile_multi(r#"{"sources": {"a.sol": "contract A {}"}}"#, false)
        .unwrap();
    assert_eq!(calls.lock().unwrap().len(), 2);

    assert!(matches!(
        solc.lowlevel()
            .compile_callback("{}", false, Callbacks::new()),
        Err(Error::Unsupported(_))
    ));
    assert!(matches!(
        solc.lowlevel().compile_standard("{}", Callbacks::new()),
        Err(Error::Unsupported(_))
    ));
}
