//! `solc-runtime` loads Solidity compiler modules of any historical generation and drives them
//! through a single standard JSON interface.
//!
//! ```no_run
//! use solc_runtime::{Callbacks, CallbackResult, Solc};
//!
//! let mut solc = Solc::load("libsolc.so")?;
//! let callbacks = Callbacks::new().with_import(|path| match std::fs::read_to_string(path) {
//!     Ok(contents) => CallbackResult::Contents(contents),
//!     Err(e) => CallbackResult::Error(e.to_string()),
//! });
//! let output = solc.compile(
//!     r#"{"language": "Solidity", "sources": {"a.sol": {"content": "contract A {}"}}}"#,
//!     callbacks,
//! )?;
//! # Ok::<(), solc_runtime::Error>(())
//! ```

pub use solc_module::{
    abi, assembly, find_link_references, link_bytecode, linker, output, translate,
    translate_json_compiler_output, version_to_semver, CompilationOutput, LibraryMap,
    LinkReference, LinkReferences, OutputError, Severity, VersionInfo,
};
pub use solc_runtime_internals::callback::{CallbackKind, CallbackResult, Callbacks};
pub use solc_runtime_internals::error::Error;
pub use solc_runtime_internals::module::{
    self, DlModule, MockModule, MockModuleBuilder, MockStats, Module, TableIndex,
};
pub use solc_runtime_internals::probe::{CallbackAbi, Exports, Features, GenerationDescriptor};
pub use solc_runtime_internals::solc::{LowLevel, Solc};
pub use solc_runtime_internals::val::{HeapPtr, Val};
pub use solc_runtime_internals::vmctx::Vmctx;
