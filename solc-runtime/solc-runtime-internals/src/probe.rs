//! Detecting which generation of the compiler interface a module implements.
//!
//! Nothing here calls into the module beyond asking for its version: the generation is decided by
//! which exports are present, and by whether the version is new enough for the callback protocol
//! that takes a kind and a context.

use crate::bindings::CoreBindings;
use crate::error::Error;
use crate::module::ModuleInternal;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use solc_module::VersionInfo;
use tracing::{debug, warn};

bitflags! {
    /// The exports a compiler module was found to have.
    pub struct Exports: u32 {
        const SOLIDITY_VERSION = 1 << 0;
        const VERSION = 1 << 1;
        const SOLIDITY_LICENSE = 1 << 2;
        const LICENSE = 1 << 3;
        const SOLIDITY_ALLOC = 1 << 4;
        const MALLOC = 1 << 5;
        const SOLIDITY_RESET = 1 << 6;
        const COMPILE_JSON = 1 << 7;
        const COMPILE_JSON_MULTI = 1 << 8;
        const COMPILE_JSON_CALLBACK = 1 << 9;
        const COMPILE_STANDARD = 1 << 10;
        const SOLIDITY_COMPILE = 1 << 11;

        const STANDARD_JSON = Self::COMPILE_STANDARD.bits | Self::SOLIDITY_COMPILE.bits;
    }
}

/// Every export the probe knows about, with its symbol name.
pub const KNOWN_EXPORTS: &[(Exports, &str)] = &[
    (Exports::SOLIDITY_VERSION, "solidity_version"),
    (Exports::VERSION, "version"),
    (Exports::SOLIDITY_LICENSE, "solidity_license"),
    (Exports::LICENSE, "license"),
    (Exports::SOLIDITY_ALLOC, "solidity_alloc"),
    (Exports::MALLOC, "malloc"),
    (Exports::SOLIDITY_RESET, "solidity_reset"),
    (Exports::COMPILE_JSON, "compileJSON"),
    (Exports::COMPILE_JSON_MULTI, "compileJSONMulti"),
    (Exports::COMPILE_JSON_CALLBACK, "compileJSONCallback"),
    (Exports::COMPILE_STANDARD, "compileStandard"),
    (Exports::SOLIDITY_COMPILE, "solidity_compile"),
];

impl Exports {
    pub fn probe<M: ModuleInternal + ?Sized>(module: &M) -> Exports {
        KNOWN_EXPORTS
            .iter()
            .filter(|(_, sym)| module.has_export(sym))
            .fold(Exports::empty(), |acc, (flag, _)| acc | *flag)
    }
}

/// The protocol a module uses when it calls back into the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallbackAbi {
    /// Import-only callbacks: `(path, contents_out, error_out)`.
    Import,
    /// Kinded callbacks with a context word: `(context, kind, data, contents_out, error_out)`.
    ImportWithKind,
}

impl CallbackAbi {
    pub fn for_version(version: &VersionInfo) -> CallbackAbi {
        match version.parse() {
            Ok(_) if version.newer_than(0, 5, 99) => CallbackAbi::ImportWithKind,
            Ok(_) => CallbackAbi::Import,
            Err(e) => {
                warn!(version = version.raw(), error = %e, "unparsable compiler version");
                CallbackAbi::Import
            }
        }
    }
}

/// What a compiler module can do, as seen by a caller choosing how to drive it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    pub legacy_single_input: bool,
    pub multiple_inputs: bool,
    pub import_callback: bool,
    pub native_standard_json: bool,
}

impl Features {
    pub fn from_exports(exports: Exports) -> Features {
        Features {
            legacy_single_input: exports.contains(Exports::COMPILE_JSON),
            multiple_inputs: exports.intersects(Exports::COMPILE_JSON_MULTI | Exports::STANDARD_JSON),
            import_callback: exports
                .intersects(Exports::COMPILE_JSON_CALLBACK | Exports::STANDARD_JSON),
            native_standard_json: exports.intersects(Exports::STANDARD_JSON),
        }
    }
}

/// The generation of the compiler interface a module implements.
#[derive(Clone, Debug)]
pub struct GenerationDescriptor {
    exports: Exports,
    version: VersionInfo,
    callback_abi: CallbackAbi,
}

impl GenerationDescriptor {
    pub fn new(exports: Exports, version: VersionInfo) -> GenerationDescriptor {
        let callback_abi = CallbackAbi::for_version(&version);
        GenerationDescriptor {
            exports,
            version,
            callback_abi,
        }
    }

    /// Probe `module`'s exports and read its version.
    pub fn probe<M: ModuleInternal + ?Sized>(
        module: &mut M,
    ) -> Result<(GenerationDescriptor, CoreBindings), Error> {
        let exports = Exports::probe(&*module);
        let core = CoreBindings::resolve(exports)?;
        let version = core.version(module)?;
        let descriptor = GenerationDescriptor::new(exports, version);
        debug!(
            version = descriptor.version.raw(),
            exports = ?descriptor.exports,
            callback_abi = ?descriptor.callback_abi,
            "probed compiler module"
        );
        Ok((descriptor, core))
    }

    pub fn exports(&self) -> Exports {
        self.exports
    }

    pub fn has(&self, export: Exports) -> bool {
        self.exports.contains(export)
    }

    pub fn version(&self) -> &VersionInfo {
        &self.version
    }

    pub fn callback_abi(&self) -> CallbackAbi {
        self.callback_abi
    }

    pub fn is_modern_callback_abi(&self) -> bool {
        self.callback_abi == CallbackAbi::ImportWithKind
    }

    pub fn features(&self) -> Features {
        Features::from_exports(self.exports)
    }
}
