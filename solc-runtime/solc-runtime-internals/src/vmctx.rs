//! Access to a module from the host functions it calls while one of its entry points is running.

use crate::error::Error;
use crate::module::{ModuleInternal, TableFunction, TableIndex};
use crate::val::{HeapPtr, Val};

/// A handle to the module that is currently executing, passed to host functions it calls.
///
/// The module is suspended inside an entry point for as long as the handle exists. Heap
/// operations and nested calls (for example, to the module's allocator) are permitted; whatever
/// state the suspended entry point relies on must not be disturbed.
pub struct Vmctx<'a> {
    module: &'a mut dyn ModuleInternal,
}

impl<'a> Vmctx<'a> {
    pub fn new(module: &'a mut dyn ModuleInternal) -> Vmctx<'a> {
        Vmctx { module }
    }
}

impl<'a> ModuleInternal for Vmctx<'a> {
    fn has_export(&self, sym: &str) -> bool {
        self.module.has_export(sym)
    }

    fn call_export(&mut self, sym: &str, args: &[Val]) -> Result<Val, Error> {
        self.module.call_export(sym, args)
    }

    fn call_indirect(&mut self, idx: TableIndex, args: &[Val]) -> Result<Val, Error> {
        self.module.call_indirect(idx, args)
    }

    fn add_function(&mut self, func: TableFunction) -> Result<TableIndex, Error> {
        self.module.add_function(func)
    }

    fn remove_function(&mut self, idx: TableIndex) -> Result<(), Error> {
        self.module.remove_function(idx)
    }

    fn malloc(&mut self, len: usize) -> Result<HeapPtr, Error> {
        self.module.malloc(len)
    }

    fn free(&mut self, ptr: HeapPtr) -> Result<(), Error> {
        self.module.free(ptr)
    }

    fn read_cstr(&self, ptr: HeapPtr) -> Result<String, Error> {
        self.module.read_cstr(ptr)
    }

    fn write_bytes(&mut self, ptr: HeapPtr, bytes: &[u8]) -> Result<(), Error> {
        self.module.write_bytes(ptr, bytes)
    }

    fn read_ptr(&self, ptr: HeapPtr) -> Result<HeapPtr, Error> {
        self.module.read_ptr(ptr)
    }

    fn write_ptr(&mut self, ptr: HeapPtr, value: HeapPtr) -> Result<(), Error> {
        self.module.write_ptr(ptr, value)
    }
}
