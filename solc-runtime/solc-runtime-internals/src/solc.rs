use crate::bindings::CoreBindings;
use crate::callback::Callbacks;
use crate::compile::{CompileBindings, RawInput};
use crate::error::Error;
use crate::module::{DlModule, Module};
use crate::probe::{Features, GenerationDescriptor};
use crate::standard;
use std::path::Path;
use tracing::debug;

/// A loaded compiler module, probed and bound to the entry points of its generation.
///
/// Every compilation takes `&mut self`: a module runs one compilation at a time, and callbacks
/// are only registered while their compilation runs.
pub struct Solc {
    module: Box<dyn Module>,
    descriptor: GenerationDescriptor,
    core: CoreBindings,
    compile: CompileBindings,
}

impl Solc {
    /// Probe `module` and bind to whichever generation of the interface it implements.
    pub fn new(mut module: Box<dyn Module>) -> Result<Solc, Error> {
        let (descriptor, core) = GenerationDescriptor::probe(module.as_mut())?;
        let compile = CompileBindings::resolve(&descriptor);
        debug!(
            version = descriptor.version().raw(),
            features = ?descriptor.features(),
            entry = ?compile.preferred(),
            "loaded compiler module"
        );
        Ok(Solc {
            module,
            descriptor,
            core,
            compile,
        })
    }

    /// Load a compiler from a shared object on the filesystem.
    pub fn load<P: AsRef<Path>>(so_path: P) -> Result<Solc, Error> {
        Solc::new(Box::new(DlModule::load(so_path)?))
    }

    /// The version exactly as the compiler reports it.
    pub fn version(&self) -> &str {
        self.descriptor.version().raw()
    }

    /// The version normalized to semver.
    pub fn semver(&self) -> &str {
        self.descriptor.version().semver()
    }

    /// The compiler's license text, if it reports one.
    pub fn license(&mut self) -> Result<Option<String>, Error> {
        self.core.license(self.module.as_mut())
    }

    pub fn features(&self) -> Features {
        self.descriptor.features()
    }

    pub fn descriptor(&self) -> &GenerationDescriptor {
        &self.descriptor
    }

    /// Compile a standard JSON input document, returning a standard JSON output document.
    ///
    /// Problems with the input, or with the output a legacy compiler produced, are reported
    /// inside the returned document. An `Err` means the module itself, or one of the
    /// `callbacks`, failed.
    pub fn compile(&mut self, input: &str, callbacks: Callbacks) -> Result<String, Error> {
        standard::compile(
            &self.compile,
            self.module.as_mut(),
            &self.core,
            input,
            callbacks,
        )
    }

    /// Direct access to the module's own compile entry points.
    pub fn lowlevel(&mut self) -> LowLevel<'_> {
        LowLevel { solc: self }
    }
}

/// The raw compile entry points of a [`Solc`], with their inputs and outputs passed through
/// untranslated. Calling an entry point the module does not export is an
/// [`Error::Unsupported`].
pub struct LowLevel<'a> {
    solc: &'a mut Solc,
}

impl<'a> LowLevel<'a> {
    /// Compile a single source file.
    pub fn compile_single(&mut self, source: &str, optimize: bool) -> Result<String, Error> {
        let solc = &mut *self.solc;
        solc.compile.compile_single(
            solc.module.as_mut(),
            &solc.core,
            RawInput {
                text: source,
                optimize,
            },
        )
    }

    /// Compile a `{"sources": {file: content}}` document.
    pub fn compile_multi(&mut self, input: &str, optimize: bool) -> Result<String, Error> {
        let solc = &mut *self.solc;
        solc.compile.compile_multi(
            solc.module.as_mut(),
            &solc.core,
            RawInput {
                text: input,
                optimize,
            },
        )
    }

    /// Compile a `{"sources": {file: content}}` document, resolving missing imports through
    /// `callbacks`.
    pub fn compile_callback(
        &mut self,
        input: &str,
        optimize: bool,
        callbacks: Callbacks,
    ) -> Result<String, Error> {
        let solc = &mut *self.solc;
        solc.compile.compile_callback(
            solc.module.as_mut(),
            &solc.core,
            RawInput {
                text: input,
                optimize,
            },
            callbacks,
        )
    }

    /// Compile a standard JSON document with the module's native standard JSON entry point.
    pub fn compile_standard(&mut self, input: &str, callbacks: Callbacks) -> Result<String, Error> {
        let solc = &mut *self.solc;
        solc.compile
            .compile_standard(solc.module.as_mut(), &solc.core, input, callbacks)
    }
}
