//! Host callbacks for compiler modules: reading imported sources and answering SMT queries.
//!
//! A compilation that accepts callbacks registers a trampoline in the module's function table for
//! exactly as long as the compile call runs. The trampoline decodes the module's arguments, runs
//! the host closure, and writes the result back into compiler-allocated memory.

use crate::bindings::CoreBindings;
use crate::error::Error;
use crate::module::{ModuleInternal, Signature, TableFunction, TableIndex};
use crate::probe::CallbackAbi;
use crate::val::Val;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use tracing::{error, trace};

/// The outcome of a host callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackResult {
    Contents(String),
    Error(String),
}

pub type Callback = Box<dyn FnMut(&str) -> CallbackResult + Send>;

/// The host closures available to one compilation.
#[derive(Default)]
pub struct Callbacks {
    import: Option<Callback>,
    smt_solver: Option<Callback>,
}

impl Callbacks {
    pub fn new() -> Callbacks {
        Callbacks::default()
    }

    /// Resolve imports: given a source path, return its contents.
    pub fn with_import<F>(mut self, f: F) -> Callbacks
    where
        F: FnMut(&str) -> CallbackResult + Send + 'static,
    {
        self.import = Some(Box::new(f));
        self
    }

    /// Answer SMT queries: given a query, return the solver's response.
    pub fn with_smt_solver<F>(mut self, f: F) -> Callbacks
    where
        F: FnMut(&str) -> CallbackResult + Send + 'static,
    {
        self.smt_solver = Some(Box::new(f));
        self
    }

    /// Run the handler for `kind`, or report that there is none.
    pub fn call(&mut self, kind: CallbackKind, data: &str) -> CallbackResult {
        let handler = match kind {
            CallbackKind::Source => self.import.as_mut(),
            CallbackKind::SmtQuery => self.smt_solver.as_mut(),
        };
        match handler {
            Some(f) => f(data),
            None => CallbackResult::Error(kind.unsupported_message().to_owned()),
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("import", &self.import.is_some())
            .field("smt_solver", &self.smt_solver.is_some())
            .finish()
    }
}

/// What a module is asking the host for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackKind {
    Source,
    SmtQuery,
}

impl CallbackKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CallbackKind::Source => "source",
            CallbackKind::SmtQuery => "smt-query",
        }
    }

    fn unsupported_message(self) -> &'static str {
        match self {
            CallbackKind::Source => "File import callback not supported",
            CallbackKind::SmtQuery => "SMT solver callback not supported",
        }
    }
}

impl FromStr for CallbackKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "source" => Ok(CallbackKind::Source),
            "smt-query" => Ok(CallbackKind::SmtQuery),
            other => Err(Error::InvalidCallbackKind(other.to_owned())),
        }
    }
}

/// Build the function table entry that serves `callbacks` under the module's callback protocol.
pub fn trampoline(core: CoreBindings, abi: CallbackAbi, mut callbacks: Callbacks) -> TableFunction {
    match abi {
        CallbackAbi::Import => TableFunction::new(Signature::Import, move |vmctx, args| {
            let path = core.copy_from_cstring(vmctx, args[0].as_ptr()?)?;
            trace!(path = %path, "import callback");
            let result = callbacks.call(CallbackKind::Source, &path);
            write_result(&core, vmctx, result, args[1].as_ptr()?, args[2].as_ptr()?)?;
            Ok(Val::Void)
        }),
        CallbackAbi::ImportWithKind => {
            TableFunction::new(Signature::ImportWithKind, move |vmctx, args| {
                if !args[0].is_null() {
                    return Err(Error::InvalidCallbackContext);
                }
                let kind: CallbackKind = core.copy_from_cstring(vmctx, args[1].as_ptr()?)?.parse()?;
                let data = core.copy_from_cstring(vmctx, args[2].as_ptr()?)?;
                trace!(kind = kind.as_str(), "compiler callback");
                let result = callbacks.call(kind, &data);
                write_result(&core, vmctx, result, args[3].as_ptr()?, args[4].as_ptr()?)?;
                Ok(Val::Void)
            })
        }
    }
}

fn write_result<M: ModuleInternal + ?Sized>(
    core: &CoreBindings,
    module: &mut M,
    result: CallbackResult,
    contents_out: usize,
    error_out: usize,
) -> Result<(), Error> {
    match result {
        CallbackResult::Contents(contents) => core.copy_to_cstring(module, &contents, contents_out),
        CallbackResult::Error(message) => core.copy_to_cstring(module, &message, error_out),
    }
}

/// A function table slot, registered for as long as the value lives.
///
/// Dropping the slot releases it, so it is released exactly once however the compile call that
/// needed it ends.
pub struct CallbackSlot<'m, M: ModuleInternal + ?Sized> {
    module: &'m mut M,
    index: Option<TableIndex>,
}

impl<'m, M: ModuleInternal + ?Sized> CallbackSlot<'m, M> {
    pub fn register(module: &'m mut M, func: TableFunction) -> Result<Self, Error> {
        let index = module.add_function(func)?;
        trace!(slot = index.as_u32(), "registered callback");
        Ok(CallbackSlot {
            module,
            index: Some(index),
        })
    }

    pub fn index(&self) -> TableIndex {
        // only `release` clears the index, and it consumes the slot
        self.index.expect("callback slot is registered")
    }

    /// The module the slot belongs to.
    pub fn module(&mut self) -> &mut M {
        &mut *self.module
    }

    /// Release the slot, reporting any failure to do so.
    pub fn release(mut self) -> Result<(), Error> {
        match self.index.take() {
            Some(index) => self.remove(index),
            None => Ok(()),
        }
    }

    fn remove(&mut self, index: TableIndex) -> Result<(), Error> {
        self.module.remove_function(index)?;
        trace!(slot = index.as_u32(), "released callback");
        Ok(())
    }
}

impl<'m, M: ModuleInternal + ?Sized> Drop for CallbackSlot<'m, M> {
    fn drop(&mut self) {
        if let Some(index) = self.index.take() {
            if let Err(e) = self.remove(index) {
                error!(slot = index.as_u32(), error = %e, "failed to release callback");
            }
        }
    }
}

/// Call the compile entry point `sym` with `input` followed by `extra_args`, serving `callbacks`
/// while it runs if given, and copy its output out of the module.
///
/// The input buffer is freed and, if the module can reset, every compiler allocation is released
/// before returning, whether the call succeeded, failed or panicked.
pub fn run_entry_point<M: ModuleInternal + ?Sized>(
    module: &mut M,
    core: &CoreBindings,
    sym: &str,
    input: &str,
    extra_args: &[Val],
    callbacks: Option<(CallbackAbi, Callbacks)>,
) -> Result<String, Error> {
    let input_ptr = module.alloc_cstr(input)?;
    let mut args = Vec::with_capacity(extra_args.len() + 3);
    args.push(Val::Ptr(input_ptr));
    args.extend_from_slice(extra_args);

    // a panicking callback has already released its slot by the time it unwinds to here
    let output = panic::catch_unwind(AssertUnwindSafe(|| match callbacks {
        Some((abi, callbacks)) => {
            call_with_callbacks(&mut *module, core, sym, args, abi, callbacks)
        }
        None => module
            .call_export(sym, &args)
            .and_then(|ret| module.read_cstr(ret.as_ptr()?)),
    }));

    let freed = module.free(input_ptr);
    let reset = core.reset(module);
    let output = match output {
        Ok(output) => output?,
        Err(payload) => {
            if let Err(e) = freed.and(reset) {
                error!(error = %e, "failed to clean up after a panicking compilation");
            }
            panic::resume_unwind(payload)
        }
    };
    freed?;
    reset?;
    Ok(output)
}

fn call_with_callbacks<M: ModuleInternal + ?Sized>(
    module: &mut M,
    core: &CoreBindings,
    sym: &str,
    mut args: Vec<Val>,
    abi: CallbackAbi,
    callbacks: Callbacks,
) -> Result<String, Error> {
    let mut slot = CallbackSlot::register(module, trampoline(core.clone(), abi, callbacks))?;
    args.push(Val::FuncRef(slot.index()));
    if abi == CallbackAbi::ImportWithKind {
        args.push(Val::NULL);
    }
    let ret = slot.module().call_export(sym, &args)?;
    let output = slot.module().read_cstr(ret.as_ptr()?)?;
    slot.release()?;
    Ok(output)
}
