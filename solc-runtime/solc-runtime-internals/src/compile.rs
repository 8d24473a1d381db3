use crate::bindings::CoreBindings;
use crate::callback::{self, Callbacks};
use crate::error::Error;
use crate::module::ModuleInternal;
use crate::probe::{CallbackAbi, Exports, GenerationDescriptor};
use crate::val::Val;
use tracing::debug;

/// A compile entry point, as exported by some generation of the compiler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompileEntry {
    /// `solidity_compile(input, callback)`, or `solidity_compile(input, callback, context)` once
    /// callbacks carry a kind.
    Unified,
    /// `compileStandard(input, callback)`
    Standard,
    /// `compileJSONCallback(input, optimize, callback)`
    LegacyCallback,
    /// `compileJSONMulti(input, optimize)`
    Multi,
    /// `compileJSON(input, optimize)`
    Single,
}

impl CompileEntry {
    /// Every entry point, most capable first.
    pub const PREFERENCE: [CompileEntry; 5] = [
        CompileEntry::Unified,
        CompileEntry::Standard,
        CompileEntry::LegacyCallback,
        CompileEntry::Multi,
        CompileEntry::Single,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            CompileEntry::Unified => "solidity_compile",
            CompileEntry::Standard => "compileStandard",
            CompileEntry::LegacyCallback => "compileJSONCallback",
            CompileEntry::Multi => "compileJSONMulti",
            CompileEntry::Single => "compileJSON",
        }
    }

    pub fn export(self) -> Exports {
        match self {
            CompileEntry::Unified => Exports::SOLIDITY_COMPILE,
            CompileEntry::Standard => Exports::COMPILE_STANDARD,
            CompileEntry::LegacyCallback => Exports::COMPILE_JSON_CALLBACK,
            CompileEntry::Multi => Exports::COMPILE_JSON_MULTI,
            CompileEntry::Single => Exports::COMPILE_JSON,
        }
    }

    /// Whether the entry point takes and returns standard JSON.
    pub fn is_standard_json(self) -> bool {
        match self {
            CompileEntry::Unified | CompileEntry::Standard => true,
            _ => false,
        }
    }
}

/// Input to a legacy entry point: the source text or sources JSON, and the optimizer switch.
#[derive(Clone, Copy, Debug)]
pub struct RawInput<'a> {
    pub text: &'a str,
    pub optimize: bool,
}

/// The compile entry points a module exports, and how to call each of them.
#[derive(Clone, Debug)]
pub struct CompileBindings {
    available: Vec<CompileEntry>,
    abi: CallbackAbi,
}

impl CompileBindings {
    pub fn resolve(descriptor: &GenerationDescriptor) -> CompileBindings {
        let available: Vec<CompileEntry> = CompileEntry::PREFERENCE
            .iter()
            .copied()
            .filter(|entry| descriptor.has(entry.export()))
            .collect();
        debug!(entries = ?available, "resolved compile entry points");
        CompileBindings {
            available,
            abi: descriptor.callback_abi(),
        }
    }

    pub fn has(&self, entry: CompileEntry) -> bool {
        self.available.contains(&entry)
    }

    /// The most capable entry point the module exports.
    pub fn preferred(&self) -> Option<CompileEntry> {
        self.available.first().copied()
    }

    /// The preferred entry point that takes standard JSON.
    pub fn standard_entry(&self) -> Option<CompileEntry> {
        self.preferred().filter(|entry| entry.is_standard_json())
    }

    fn require(&self, entry: CompileEntry) -> Result<(), Error> {
        if self.has(entry) {
            Ok(())
        } else {
            Err(Error::Unsupported(format!(
                "compiler module does not export `{}`",
                entry.symbol()
            )))
        }
    }

    /// Compile a single source with `compileJSON`.
    pub fn compile_single<M: ModuleInternal + ?Sized>(
        &self,
        module: &mut M,
        core: &CoreBindings,
        input: RawInput<'_>,
    ) -> Result<String, Error> {
        self.require(CompileEntry::Single)?;
        callback::run_entry_point(
            module,
            core,
            CompileEntry::Single.symbol(),
            input.text,
            &[Val::Bool(input.optimize)],
            None,
        )
    }

    /// Compile a `{"sources": {..}}` document with `compileJSONMulti`.
    pub fn compile_multi<M: ModuleInternal + ?Sized>(
        &self,
        module: &mut M,
        core: &CoreBindings,
        input: RawInput<'_>,
    ) -> Result<String, Error> {
        self.require(CompileEntry::Multi)?;
        callback::run_entry_point(
            module,
            core,
            CompileEntry::Multi.symbol(),
            input.text,
            &[Val::Bool(input.optimize)],
            None,
        )
    }

    /// Compile a `{"sources": {..}}` document with `compileJSONCallback`, resolving missing
    /// imports through `callbacks`.
    pub fn compile_callback<M: ModuleInternal + ?Sized>(
        &self,
        module: &mut M,
        core: &CoreBindings,
        input: RawInput<'_>,
        callbacks: Callbacks,
    ) -> Result<String, Error> {
        self.require(CompileEntry::LegacyCallback)?;
        callback::run_entry_point(
            module,
            core,
            CompileEntry::LegacyCallback.symbol(),
            input.text,
            &[Val::Bool(input.optimize)],
            Some((CallbackAbi::Import, callbacks)),
        )
    }

    /// Compile a standard JSON document with the module's own standard JSON entry point.
    pub fn compile_standard<M: ModuleInternal + ?Sized>(
        &self,
        module: &mut M,
        core: &CoreBindings,
        input: &str,
        callbacks: Callbacks,
    ) -> Result<String, Error> {
        let (entry, abi) = match self.standard_entry() {
            Some(CompileEntry::Unified) => (CompileEntry::Unified, self.abi),
            Some(entry) => (entry, CallbackAbi::Import),
            None => {
                return Err(Error::Unsupported(
                    "compiler module has no standard JSON entry point".to_owned(),
                ))
            }
        };
        callback::run_entry_point(module, core, entry.symbol(), input, &[], Some((abi, callbacks)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::MockModuleBuilder;
    use solc_module::VersionInfo;

    fn bindings(exports: Exports, version: &str) -> CompileBindings {
        CompileBindings::resolve(&GenerationDescriptor::new(exports, VersionInfo::new(version)))
    }

    #[test]
    fn preference_order() {
        let all = Exports::COMPILE_JSON
            | Exports::COMPILE_JSON_MULTI
            | Exports::COMPILE_JSON_CALLBACK
            | Exports::COMPILE_STANDARD
            | Exports::SOLIDITY_COMPILE;
        assert_eq!(bindings(all, "0.5.0").preferred(), Some(CompileEntry::Unified));
        assert_eq!(
            bindings(all - Exports::SOLIDITY_COMPILE, "0.4.20").preferred(),
            Some(CompileEntry::Standard)
        );
        assert_eq!(
            bindings(Exports::COMPILE_JSON | Exports::COMPILE_JSON_MULTI | Exports::COMPILE_JSON_CALLBACK, "0.2.1")
                .preferred(),
            Some(CompileEntry::LegacyCallback)
        );
        assert_eq!(
            bindings(Exports::COMPILE_JSON | Exports::COMPILE_JSON_MULTI, "0.1.6").preferred(),
            Some(CompileEntry::Multi)
        );
        assert_eq!(bindings(Exports::COMPILE_JSON, "0.1.1").preferred(), Some(CompileEntry::Single));
        assert_eq!(bindings(Exports::VERSION, "0.1.1").preferred(), None);
    }

    #[test]
    fn standard_entry_only_for_standard_json() {
        assert_eq!(
            bindings(Exports::COMPILE_JSON_MULTI, "0.1.6").standard_entry(),
            None
        );
        assert_eq!(
            bindings(Exports::COMPILE_STANDARD | Exports::COMPILE_JSON, "0.4.11").standard_entry(),
            Some(CompileEntry::Standard)
        );
    }

    #[test]
    fn missing_entry_point_is_unsupported() {
        let mut module = MockModuleBuilder::new()
            .with_string_export("version", "0.1.1")
            .with_export("compileJSON", |vmctx, args| {
                let source = vmctx.read_cstr(args[0].as_ptr()?)?;
                let optimize = args[1] == Val::Bool(true);
                let out = format!(r#"{{"source":"{}","optimize":{}}}"#, source, optimize);
                vmctx.alloc_cstr(&out).map(Val::Ptr)
            })
            .build();
        let (descriptor, core) = GenerationDescriptor::probe(&mut module).unwrap();
        let compile = CompileBindings::resolve(&descriptor);

        let input = RawInput {
            text: "contract A {}",
            optimize: true,
        };
        assert_eq!(
            compile.compile_single(&mut module, &core, input).unwrap(),
            r#"{"source":"contract A {}","optimize":true}"#
        );
        assert!(matches!(
            compile.compile_multi(&mut module, &core, input),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(
            compile.compile_standard(&mut module, &core, "{}", Callbacks::new()),
            Err(Error::Unsupported(_))
        ));
    }
}
