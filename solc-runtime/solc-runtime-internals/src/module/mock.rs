use crate::error::Error;
use crate::module::{
    restore_function, HostFunc, Module, ModuleInternal, TableFunction, TableIndex,
};
use crate::val::{HeapPtr, Val};
use crate::vmctx::Vmctx;
use std::collections::HashMap;
use std::convert::TryFrom;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Addresses below this are never handed out, so that `0` stays the null pointer.
const HEAP_BASE: usize = 8;
const WORD: usize = std::mem::size_of::<usize>();

/// Counters shared between a [`MockModule`] and the test that built it.
#[derive(Clone, Debug, Default)]
pub struct MockStats(Arc<Counters>);

#[derive(Debug, Default)]
struct Counters {
    registered: AtomicUsize,
    released: AtomicUsize,
    resets: AtomicUsize,
}

impl MockStats {
    /// Function table slots registered so far.
    pub fn registered(&self) -> usize {
        self.0.registered.load(Ordering::SeqCst)
    }

    /// Function table slots released so far.
    pub fn released(&self) -> usize {
        self.0.released.load(Ordering::SeqCst)
    }

    /// Calls made to a reset export so far.
    pub fn resets(&self) -> usize {
        self.0.resets.load(Ordering::SeqCst)
    }
}

enum MockExport {
    Func(HostFunc),
    /// Returns a fresh copy of the string on every call, like a compiler's `version`.
    Str(String),
    Alloc,
    Reset,
}

/// A module whose exports are host closures and whose heap is a plain byte vector.
///
/// Allocation is a bump allocator; a reset export truncates the heap back to its size at build
/// time, invalidating everything allocated since.
pub struct MockModule {
    heap: Vec<u8>,
    exports: HashMap<String, Option<MockExport>>,
    table: Vec<Option<TableFunction>>,
    stats: MockStats,
}

impl MockModule {
    pub fn stats(&self) -> MockStats {
        self.stats.clone()
    }

    /// Bytes of heap currently in use.
    pub fn heap_len(&self) -> usize {
        self.heap.len()
    }

    fn check_range(&self, ptr: HeapPtr, len: usize) -> Result<(), Error> {
        if ptr < HEAP_BASE || ptr.checked_add(len).map_or(true, |end| end > self.heap.len()) {
            Err(Error::InvalidArgument("heap access out of bounds"))
        } else {
            Ok(())
        }
    }
}

impl Module for MockModule {}

impl ModuleInternal for MockModule {
    fn has_export(&self, sym: &str) -> bool {
        self.exports.contains_key(sym)
    }

    fn call_export(&mut self, sym: &str, args: &[Val]) -> Result<Val, Error> {
        let mut export = self
            .exports
            .get_mut(sym)
            .ok_or_else(|| Error::SymbolNotFound(sym.to_owned()))?
            .take()
            .ok_or_else(|| solc_format_err!("mock export `{}` called recursively", sym))?;

        let res = panic::catch_unwind(AssertUnwindSafe(|| match &mut export {
            MockExport::Func(f) => f(&mut Vmctx::new(self), args),
            MockExport::Str(s) => self.alloc_cstr(s).map(Val::Ptr),
            MockExport::Alloc => match args {
                [len] => len.to_word().and_then(|len| self.malloc(len)).map(Val::Ptr),
                _ => Err(Error::InvalidArgument("allocate takes one argument")),
            },
            MockExport::Reset => {
                self.heap.truncate(HEAP_BASE);
                self.stats.0.resets.fetch_add(1, Ordering::SeqCst);
                Ok(Val::Void)
            }
        }));

        // the export goes back even when it panicked, so the module stays usable
        self.exports.insert(sym.to_owned(), Some(export));
        res.unwrap_or_else(|payload| panic::resume_unwind(payload))
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
        self.stats.0.registered.fetch_add(1, Ordering::SeqCst);
        Ok(TableIndex::from_u32(idx))
    }

    fn remove_function(&mut self, idx: TableIndex) -> Result<(), Error> {
        match self.table.get_mut(idx.as_u32() as usize) {
            Some(slot @ Some(_)) => {
                *slot = None;
                self.stats.0.released.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            _ => Err(Error::FuncNotFound(idx.as_u32())),
        }
    }

    fn malloc(&mut self, len: usize) -> Result<HeapPtr, Error> {
        let ptr = (self.heap.len() + WORD - 1) / WORD * WORD;
        self.heap.resize(ptr + len.max(1), 0);
        Ok(ptr)
    }

    fn free(&mut self, _ptr: HeapPtr) -> Result<(), Error> {
        Ok(())
    }

    fn read_cstr(&self, ptr: HeapPtr) -> Result<String, Error> {
        self.check_range(ptr, 0)?;
        let bytes = &self.heap[ptr..];
        let len = bytes
            .iter()
            .position(|b| *b == 0)
            .ok_or(Error::InvalidArgument("unterminated string"))?;
        Ok(std::str::from_utf8(&bytes[..len])?.to_owned())
    }

    fn write_bytes(&mut self, ptr: HeapPtr, bytes: &[u8]) -> Result<(), Error> {
        self.check_range(ptr, bytes.len())?;
        self.heap[ptr..ptr + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn read_ptr(&self, ptr: HeapPtr) -> Result<HeapPtr, Error> {
        self.check_range(ptr, WORD)?;
        let mut word = [0u8; WORD];
        word.copy_from_slice(&self.heap[ptr..ptr + WORD]);
        Ok(usize::from_le_bytes(word))
    }

    fn write_ptr(&mut self, ptr: HeapPtr, value: HeapPtr) -> Result<(), Error> {
        self.write_bytes(ptr, &value.to_le_bytes())
    }
}

/// Builds a [`MockModule`] export by export.
pub struct MockModuleBuilder {
    exports: HashMap<String, MockExport>,
}

impl MockModuleBuilder {
    pub fn new() -> Self {
        MockModuleBuilder {
            exports: HashMap::new(),
        }
    }

    /// Export a host closure as `sym`.
    pub fn with_export<F>(mut self, sym: &str, func: F) -> Self
    where
        F: FnMut(&mut Vmctx<'_>, &[Val]) -> Result<Val, Error> + Send + 'static,
    {
        self.exports
            .insert(sym.to_owned(), MockExport::Func(Box::new(func)));
        self
    }

    /// Export `sym` as a function returning a pointer to `value`.
    pub fn with_string_export(mut self, sym: &str, value: &str) -> Self {
        self.exports
            .insert(sym.to_owned(), MockExport::Str(value.to_owned()));
        self
    }

    /// Export `sym` as an allocator taking a byte count.
    pub fn with_alloc_export(mut self, sym: &str) -> Self {
        self.exports.insert(sym.to_owned(), MockExport::Alloc);
        self
    }

    /// Export `sym` as a function that frees everything allocated since the module was built.
    pub fn with_reset_export(mut self, sym: &str) -> Self {
        self.exports.insert(sym.to_owned(), MockExport::Reset);
        self
    }

    pub fn build(self) -> MockModule {
        MockModule {
            heap: vec![0; HEAP_BASE],
            exports: self
                .exports
                .into_iter()
                .map(|(sym, export)| (sym, Some(export)))
                .collect(),
            table: vec![],
            stats: MockStats::default(),
        }
    }
}

impl Default for MockModuleBuilder {
    fn default() -> Self {
        MockModuleBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_round_trip() {
        let mut module = MockModuleBuilder::new().build();
        let p = module.alloc_cstr("hello").unwrap();
        assert_ne!(p, 0);
        assert_eq!(module.read_cstr(p).unwrap(), "hello");

        let slot = module.malloc(WORD).unwrap();
        module.write_ptr(slot, p).unwrap();
        assert_eq!(module.read_ptr(slot).unwrap(), p);
    }

    #[test]
    fn null_and_out_of_bounds() {
        let mut module = MockModuleBuilder::new().build();
        assert!(module.read_cstr(0).is_err());
        assert!(module.write_bytes(1 << 20, b"x").is_err());
    }

    #[test]
    fn string_and_reset_exports() {
        let mut module = MockModuleBuilder::new()
            .with_string_export("version", "0.4.26")
            .with_reset_export("reset")
            .build();
        let p = module.call_export("version", &[]).unwrap().as_ptr().unwrap();
        assert_eq!(module.read_cstr(p).unwrap(), "0.4.26");
        assert!(module.heap_len() > HEAP_BASE);

        module.call_export("reset", &[]).unwrap();
        assert_eq!(module.heap_len(), HEAP_BASE);
        assert_eq!(module.stats().resets(), 1);
        assert!(matches!(
            module.call_export("missing", &[]),
            Err(Error::SymbolNotFound(_))
        ));
    }

    #[test]
    fn table_slots() {
        let mut module = MockModuleBuilder::new().build();
        let idx = module
            .add_function(TableFunction::new(
                crate::module::Signature::Import,
                |_vmctx, args| Ok(args[0]),
            ))
            .unwrap();
        let args = [Val::Ptr(1), Val::NULL, Val::NULL];
        assert_eq!(module.call_indirect(idx, &args).unwrap(), Val::Ptr(1));
        assert!(module.call_indirect(idx, &args[..1]).is_err());

        module.remove_function(idx).unwrap();
        assert!(matches!(
            module.remove_function(idx),
            Err(Error::FuncNotFound(_))
        ));
        assert!(module.call_indirect(idx, &args).is_err());

        let stats = module.stats();
        assert_eq!((stats.registered(), stats.released()), (1, 1));
    }

    #[test]
    fn panicking_function_stays_registered() {
        let mut module = MockModuleBuilder::new().build();
        let idx = module
            .add_function(TableFunction::new(
                crate::module::Signature::Import,
                |_vmctx, args| match args[0] {
                    Val::Ptr(0) => panic!("host function panicked"),
                    other => Ok(other),
                },
            ))
            .unwrap();

        let res = panic::catch_unwind(AssertUnwindSafe(|| {
            module.call_indirect(idx, &[Val::NULL, Val::NULL, Val::NULL])
        }));
        assert!(res.is_err());
        let args = [Val::Ptr(1), Val::NULL, Val::NULL];
        assert_eq!(module.call_indirect(idx, &args).unwrap(), Val::Ptr(1));
        module.remove_function(idx).unwrap();
        assert_eq!(module.stats().released(), 1);
    }

    #[test]
    fn panicking_export_can_be_called_again() {
        let mut calls = 0;
        let mut module = MockModuleBuilder::new()
            .with_export("compile", move |_, _| {
                calls += 1;
                if calls == 1 {
                    panic!("first call panicked");
                }
                Ok(Val::Ptr(calls))
            })
            .build();

        let res = panic::catch_unwind(AssertUnwindSafe(|| module.call_export("compile", &[])));
        assert!(res.is_err());
        assert_eq!(module.call_export("compile", &[]).unwrap(), Val::Ptr(2));
    }
}
