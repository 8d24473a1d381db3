mod dl;
mod mock;

pub use crate::module::dl::DlModule;
pub use crate::module::mock::{MockModule, MockModuleBuilder, MockStats};

use crate::error::Error;
use crate::val::{HeapPtr, Val};
use crate::vmctx::Vmctx;
use std::fmt;

/// A handle to a slot in a module's function table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TableIndex(u32);

impl TableIndex {
    pub fn from_u32(idx: u32) -> TableIndex {
        TableIndex(idx)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TableIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The shapes of host function a compiler module knows how to call back into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signature {
    /// `(path, contents_out, error_out)`
    Import,
    /// `(context, kind, data, contents_out, error_out)`
    ImportWithKind,
}

impl Signature {
    pub fn arity(self) -> usize {
        match self {
            Signature::Import => 3,
            Signature::ImportWithKind => 5,
        }
    }
}

/// A host closure callable by a module, either as an export of a [`MockModule`] or from a
/// function table slot.
pub type HostFunc = Box<dyn FnMut(&mut Vmctx<'_>, &[Val]) -> Result<Val, Error> + Send>;

/// A host function, together with its signature, to be placed in a module's function table.
pub struct TableFunction {
    sig: Signature,
    func: HostFunc,
}

impl TableFunction {
    pub fn new<F>(sig: Signature, func: F) -> TableFunction
    where
        F: FnMut(&mut Vmctx<'_>, &[Val]) -> Result<Val, Error> + Send + 'static,
    {
        TableFunction {
            sig,
            func: Box::new(func),
        }
    }

    pub fn signature(&self) -> Signature {
        self.sig
    }

    pub fn call(&mut self, vmctx: &mut Vmctx<'_>, args: &[Val]) -> Result<Val, Error> {
        if args.len() != self.sig.arity() {
            return Err(Error::InvalidArgument(
                "argument count does not match the function table signature",
            ));
        }
        (self.func)(vmctx, args)
    }
}

/// Put `func` back in slot `idx` after a call that took it out, whether or not the call
/// returned normally. A table that shrank while the call ran is grown back to fit.
pub(crate) fn restore_function(
    table: &mut Vec<Option<TableFunction>>,
    idx: TableIndex,
    func: TableFunction,
) {
    let i = idx.as_u32() as usize;
    if table.len() <= i {
        table.resize_with(i + 1, || None);
    }
    table[i] = Some(func);
}

impl fmt::Debug for TableFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TableFunction")
            .field("sig", &self.sig)
            .finish()
    }
}

/// A loaded compiler module: its exported entry points, its heap, and its function table.
///
/// A module is exclusively owned and is not reentrant across calls: each call takes `&mut self`,
/// and only callbacks the module itself makes while a call is in progress may use it again
/// (through the [`Vmctx`] they are handed). Sharing a module between threads requires external
/// synchronization, such as one module per worker or a `Mutex` around it.
pub trait Module: ModuleInternal {}

pub trait ModuleInternal: Send {
    /// Whether the module exports an entry point named `sym`.
    fn has_export(&self, sym: &str) -> bool;

    /// Call the exported entry point `sym`.
    fn call_export(&mut self, sym: &str, args: &[Val]) -> Result<Val, Error>;

    /// Call the function registered in table slot `idx`.
    fn call_indirect(&mut self, idx: TableIndex, args: &[Val]) -> Result<Val, Error>;

    /// Register a host function in the function table.
    fn add_function(&mut self, func: TableFunction) -> Result<TableIndex, Error>;

    /// Release a function table slot. Releasing a slot that is not registered is an error.
    fn remove_function(&mut self, idx: TableIndex) -> Result<(), Error>;

    /// Allocate `len` bytes with the module's raw allocator.
    fn malloc(&mut self, len: usize) -> Result<HeapPtr, Error>;

    /// Free memory obtained from [`malloc`](#tymethod.malloc).
    fn free(&mut self, ptr: HeapPtr) -> Result<(), Error>;

    /// Decode the NUL-terminated UTF-8 string at `ptr`.
    fn read_cstr(&self, ptr: HeapPtr) -> Result<String, Error>;

    fn write_bytes(&mut self, ptr: HeapPtr, bytes: &[u8]) -> Result<(), Error>;

    /// Read the pointer stored at `ptr`.
    fn read_ptr(&self, ptr: HeapPtr) -> Result<HeapPtr, Error>;

    /// Store the pointer `value` at `ptr`.
    fn write_ptr(&mut self, ptr: HeapPtr, value: HeapPtr) -> Result<(), Error>;

    /// Copy `s` into freshly `malloc`ed memory as a NUL-terminated string.
    fn alloc_cstr(&mut self, s: &str) -> Result<HeapPtr, Error> {
        let ptr = self.malloc(s.len() + 1)?;
        self.write_bytes(ptr, s.as_bytes())?;
        self.write_bytes(ptr + s.len(), &[0])?;
        Ok(ptr)
    }
}
