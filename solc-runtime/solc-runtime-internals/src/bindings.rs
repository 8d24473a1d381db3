use crate::error::Error;
use crate::module::ModuleInternal;
use crate::probe::Exports;
use crate::val::{HeapPtr, Val};
use solc_module::VersionInfo;
use tracing::warn;

/// How buffers handed to the compiler are allocated.
///
/// Memory the compiler takes ownership of, such as callback results, must come from the
/// compiler's own allocator when it exports one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Allocator {
    /// An exported allocator taking a byte count.
    Export(&'static str),
    /// The module's raw heap allocator.
    Malloc,
}

/// The primitives every compiler generation provides in one form or another, resolved to the
/// names this module exports them under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreBindings {
    version: &'static str,
    license: Option<&'static str>,
    alloc: Allocator,
    reset: Option<&'static str>,
}

impl CoreBindings {
    /// Resolve each primitive, preferring the `solidity_`-prefixed export over its legacy name.
    pub fn resolve(exports: Exports) -> Result<CoreBindings, Error> {
        let version = if exports.contains(Exports::SOLIDITY_VERSION) {
            "solidity_version"
        } else if exports.contains(Exports::VERSION) {
            "version"
        } else {
            return Err(solc_incorrect_module!(
                "module exports neither `solidity_version` nor `version`"
            ));
        };

        let license = if exports.contains(Exports::SOLIDITY_LICENSE) {
            Some("solidity_license")
        } else if exports.contains(Exports::LICENSE) {
            Some("license")
        } else {
            None
        };

        let alloc = if exports.contains(Exports::SOLIDITY_ALLOC) {
            Allocator::Export("solidity_alloc")
        } else if exports.contains(Exports::MALLOC) {
            Allocator::Export("malloc")
        } else {
            Allocator::Malloc
        };

        let reset = if exports.contains(Exports::SOLIDITY_RESET) {
            Some("solidity_reset")
        } else {
            warn!("compiler module has no `solidity_reset`; its allocations are not reclaimed between compilations");
            None
        };

        Ok(CoreBindings {
            version,
            license,
            alloc,
            reset,
        })
    }

    pub fn allocator(&self) -> Allocator {
        self.alloc
    }

    pub fn has_license(&self) -> bool {
        self.license.is_some()
    }

    pub fn has_reset(&self) -> bool {
        self.reset.is_some()
    }

    pub fn version<M: ModuleInternal + ?Sized>(&self, module: &mut M) -> Result<VersionInfo, Error> {
        let ptr = module.call_export(self.version, &[])?.as_ptr()?;
        Ok(VersionInfo::new(module.read_cstr(ptr)?))
    }

    /// The compiler's license text, or `None` if this generation does not report one.
    pub fn license<M: ModuleInternal + ?Sized>(
        &self,
        module: &mut M,
    ) -> Result<Option<String>, Error> {
        match self.license {
            Some(sym) => {
                let ptr = module.call_export(sym, &[])?.as_ptr()?;
                Ok(Some(module.read_cstr(ptr)?))
            }
            None => Ok(None),
        }
    }

    pub fn alloc<M: ModuleInternal + ?Sized>(
        &self,
        module: &mut M,
        len: usize,
    ) -> Result<HeapPtr, Error> {
        let ptr = match self.alloc {
            Allocator::Export(sym) => module.call_export(sym, &[Val::Ptr(len)])?.as_ptr()?,
            Allocator::Malloc => module.malloc(len)?,
        };
        solc_ensure!(ptr != 0, "compiler module failed to allocate {} bytes", len);
        Ok(ptr)
    }

    /// Release every allocation made through [`alloc`](#method.alloc), if the module supports it.
    pub fn reset<M: ModuleInternal + ?Sized>(&self, module: &mut M) -> Result<(), Error> {
        if let Some(sym) = self.reset {
            module.call_export(sym, &[])?;
        }
        Ok(())
    }

    /// Copy `s` into compiler-allocated memory as a NUL-terminated string, and store a pointer to
    /// it in the slot at `out`.
    pub fn copy_to_cstring<M: ModuleInternal + ?Sized>(
        &self,
        module: &mut M,
        s: &str,
        out: HeapPtr,
    ) -> Result<(), Error> {
        let buf = self.alloc(module, s.len() + 1)?;
        module.write_bytes(buf, s.as_bytes())?;
        module.write_bytes(buf + s.len(), &[0])?;
        module.write_ptr(out, buf)
    }

    pub fn copy_from_cstring<M: ModuleInternal + ?Sized>(
        &self,
        module: &M,
        ptr: HeapPtr,
    ) -> Result<String, Error> {
        module.read_cstr(ptr)
    }
}
