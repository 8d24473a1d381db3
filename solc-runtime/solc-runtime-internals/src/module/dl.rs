use crate::error::Error;
use crate::module::{
    restore_function, Module, ModuleInternal, Signature, TableFunction, TableIndex,
};
use crate::val::{HeapPtr, Val};
use crate::vmctx::Vmctx;
use libc::{c_char, c_void};
use libloading::Library;
use std::any::Any;
use std::cell::Cell;
use std::convert::TryFrom;
use std::ffi::CStr;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::ptr;
use tracing::error;

thread_local! {
    /// The module whose entry point is running on this thread, if any.
    ///
    /// Native compilers call back through a plain function pointer with no way to carry host
    /// state, so the shims find their module here.
    static CURRENT_MODULE: Cell<*mut DlModule> = Cell::new(ptr::null_mut());
}

/// Something that went wrong inside a callback, to be raised once control is back in the host.
enum Pending {
    Error(Error),
    Panic(Box<dyn Any + Send + 'static>),
}

/// A compiler module backed by a dynamically-loaded shared object, such as `libsolc`.
///
/// Every entry point is called with pointer-sized arguments and returns a pointer-sized value.
/// Function table slots are materialized as one of two native shims, chosen by signature; a shim
/// dispatches to the most recently registered slot of its signature.
pub struct DlModule {
    lib: Library,
    symbol_prefix: String,
    table: Vec<Option<TableFunction>>,
    /// Entry point calls in progress on this module, counting nested calls made by callbacks.
    depth: usize,
    pending: Option<Pending>,
}

impl DlModule {
    /// Load a compiler module from a shared object on the filesystem.
    pub fn load<P: AsRef<Path>>(so_path: P) -> Result<Self, Error> {
        Self::load_with_symbol_prefix(so_path, "")
    }

    /// Load a compiler module whose exports carry a common prefix, such as the leading `_` of
    /// emscripten-style builds.
    pub fn load_with_symbol_prefix<P: AsRef<Path>>(
        so_path: P,
        symbol_prefix: &str,
    ) -> Result<Self, Error> {
        let abs_so_path = so_path.as_ref().canonicalize().map_err(Error::DlError)?;
        let lib = Library::new(abs_so_path.as_os_str()).map_err(Error::DlError)?;
        Ok(DlModule {
            lib,
            symbol_prefix: symbol_prefix.to_owned(),
            table: vec![],
            depth: 0,
            pending: None,
        })
    }

    fn symbol_name(&self, sym: &str) -> Vec<u8> {
        let mut name = Vec::with_capacity(self.symbol_prefix.len() + sym.len() + 1);
        name.extend_from_slice(self.symbol_prefix.as_bytes());
        name.extend_from_slice(sym.as_bytes());
        name.push(0);
        name
    }

    fn symbol_addr(&self, sym: &str) -> Option<usize> {
        let name = self.symbol_name(sym);
        unsafe {
            self.lib
                .get::<*const c_void>(&name)
                .ok()
                .map(|s| *s as usize)
                .filter(|addr| *addr != 0)
        }
    }

    /// The word passed for `val`; function references become the shim for their signature.
    fn materialize(&self, val: &Val) -> Result<usize, Error> {
        match val {
            Val::FuncRef(idx) => {
                let func = self
                    .table
                    .get(idx.as_u32() as usize)
                    .and_then(Option::as_ref)
                    .ok_or(Error::FuncNotFound(idx.as_u32()))?;
                Ok(match func.signature() {
                    Signature::Import => import_shim as usize,
                    Signature::ImportWithKind => import_with_kind_shim as usize,
                })
            }
            other => other.to_word(),
        }
    }

    /// The most recently registered slot with signature `sig`.
    fn latest_slot(&self, sig: Signature) -> Option<TableIndex> {
        self.table
            .iter()
            .rposition(|f| f.as_ref().map_or(false, |f| f.signature() == sig))
            .map(|i| TableIndex::from_u32(i as u32))
    }
}

impl Module for DlModule {}

impl ModuleInternal for DlModule {
    fn has_export(&self, sym: &str) -> bool {
        self.symbol_addr(sym).is_some()
    }

    fn call_export(&mut self, sym: &str, args: &[Val]) -> Result<Val, Error> {
        let func = self
            .symbol_addr(sym)
            .ok_or_else(|| Error::SymbolNotFound(sym.to_owned()))?;
        let words = args
            .iter()
            .map(|a| self.materialize(a))
            .collect::<Result<Vec<_>, _>>()?;

        let this: *mut DlModule = self;
        let prev = CURRENT_MODULE.with(|current| current.replace(this));
        self.depth += 1;
        let ret = unsafe { invoke(func, &words) };
        self.depth -= 1;
        CURRENT_MODULE.with(|current| current.set(prev));

        if self.depth == 0 {
            match self.pending.take() {
                Some(Pending::Error(e)) => return Err(e),
                Some(Pending::Panic(payload)) => panic::resume_unwind(payload),
                None => (),
            }
        }
        Ok(Val::Ptr(ret?))
    }

    fn call_indirect(&mut self, idx: TableIndex, args: &[Val]) -> Result<Val, Error> {
        let mut func = self
            .table
            .get_mut(idx.as_u32() as usize)
            .and_then(Option::take)
            .ok_or(Error::FuncNotFound(idx.as_u32()))?;
        let res = panic::catch_unwind(AssertUnwindSafe(|| func.call(&mut Vmctx::new(self), args)));
        restore_function(&mut self.table, idx, func);
        res.unwrap_or_else(|payload| panic::resume_unwind(payload))
    }

    fn add_function(&mut self, func: TableFunction) -> Result<TableIndex, Error> {
        let idx = u32::try_from(self.table.len())
            .map_err(|_| Error::InvalidArgument("function table is full"))?;
        self.table.push(Some(func));
        Ok(TableIndex::from_u32(idx))
    }

    fn remove_function(&mut self, idx: TableIndex) -> Result<(), Error> {
        match self.table.get_mut(idx.as_u32() as usize) {
            Some(slot @ Some(_)) => {
                *slot = None;
                while let Some(None) = self.table.last() {
                    self.table.pop();
                }
                Ok(())
            }
            _ => Err(Error::FuncNotFound(idx.as_u32())),
        }
    }

    fn malloc(&mut self, len: usize) -> Result<HeapPtr, Error> {
        let ptr = unsafe { libc::malloc(len.max(1)) };
        if ptr.is_null() {
            Err(solc_format_err!("allocation of {} bytes failed", len))
        } else {
            Ok(ptr as HeapPtr)
        }
    }

    fn free(&mut self, ptr: HeapPtr) -> Result<(), Error> {
        unsafe { libc::free(ptr as *mut c_void) };
        Ok(())
    }

    fn read_cstr(&self, ptr: HeapPtr) -> Result<String, Error> {
        solc_ensure!(ptr != 0, "null string pointer");
        let s = unsafe { CStr::from_ptr(ptr as *const c_char) };
        Ok(s.to_str()?.to_owned())
    }

    fn write_bytes(&mut self, ptr: HeapPtr, bytes: &[u8]) -> Result<(), Error> {
        solc_ensure!(ptr != 0, "write through null pointer");
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), ptr as *mut u8, bytes.len()) };
        Ok(())
    }

    fn read_ptr(&self, ptr: HeapPtr) -> Result<HeapPtr, Error> {
        solc_ensure!(ptr != 0, "read through null pointer");
        Ok(unsafe { ptr::read_unaligned(ptr as *const usize) })
    }

    fn write_ptr(&mut self, ptr: HeapPtr, value: HeapPtr) -> Result<(), Error> {
        solc_ensure!(ptr != 0, "write through null pointer");
        unsafe { ptr::write_unaligned(ptr as *mut usize, value) };
        Ok(())
    }
}

/// Call the native function at `func` with `args` as its parameters.
unsafe fn invoke(func: usize, args: &[usize]) -> Result<usize, Error> {
    type F0 = unsafe extern "C" fn() -> usize;
    type F1 = unsafe extern "C" fn(usize) -> usize;
    type F2 = unsafe extern "C" fn(usize, usize) -> usize;
    type F3 = unsafe extern "C" fn(usize, usize, usize) -> usize;
    type F4 = unsafe extern "C" fn(usize, usize, usize, usize) -> usize;
    type F5 = unsafe extern "C" fn(usize, usize, usize, usize, usize) -> usize;

    Ok(match *args {
        [] => mem::transmute::<usize, F0>(func)(),
        [a] => mem::transmute::<usize, F1>(func)(a),
        [a, b] => mem::transmute::<usize, F2>(func)(a, b),
        [a, b, c] => mem::transmute::<usize, F3>(func)(a, b, c),
        [a, b, c, d] => mem::transmute::<usize, F4>(func)(a, b, c, d),
        [a, b, c, d, e] => mem::transmute::<usize, F5>(func)(a, b, c, d, e),
        _ => return Err(Error::InvalidArgument("too many arguments to a native entry point")),
    })
}

extern "C" fn import_shim(path: *const c_char, contents: *mut *mut c_char, error: *mut *mut c_char) {
    dispatch(
        Signature::Import,
        &[
            Val::Ptr(path as usize),
            Val::Ptr(contents as usize),
            Val::Ptr(error as usize),
        ],
    );
}

extern "C" fn import_with_kind_shim(
    context: *mut c_void,
    kind: *const c_char,
    data: *const c_char,
    contents: *mut *mut c_char,
    error: *mut *mut c_char,
) {
    dispatch(
        Signature::ImportWithKind,
        &[
            Val::Ptr(context as usize),
            Val::Ptr(kind as usize),
            Val::Ptr(data as usize),
            Val::Ptr(contents as usize),
            Val::Ptr(error as usize),
        ],
    );
}

/// Run the host function behind a shim. Nothing may unwind into the native caller, so failures
/// are parked on the module and raised when its entry point returns.
fn dispatch(sig: Signature, args: &[Val]) {
    let module = CURRENT_MODULE.with(|current| current.get());
    if module.is_null() {
        error!("compiler module called back outside of an entry point call");
        return;
    }
    // The entry point call that set `CURRENT_MODULE` is suspended until we return.
    let module = unsafe { &mut *module };
    if module.pending.is_some() {
        return;
    }

    let res = panic::catch_unwind(AssertUnwindSafe(|| match module.latest_slot(sig) {
        Some(idx) => module.call_indirect(idx, args).map(|_| ()),
        None => Err(Error::InvalidArgument(
            "no function registered for the callback signature",
        )),
    }));
    match res {
        Ok(Ok(())) => (),
        Ok(Err(e)) => module.pending = Some(Pending::Error(e)),
        Err(payload) => module.pending = Some(Pending::Panic(payload)),
    }
}
