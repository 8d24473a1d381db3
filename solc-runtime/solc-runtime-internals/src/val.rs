//! Untyped values for passing into and returning from compiler module entry points.

use crate::error::Error;
use crate::module::TableIndex;

/// An address in a compiler module's heap. `0` is the null pointer.
pub type HeapPtr = usize;

/// Values used for passing arguments to module entry points and function table slots, and for
/// reading their return values.
///
/// Every entry point of every compiler generation takes and returns only pointer-sized words, so
/// each variant maps to a single machine word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Val {
    /// A pointer into the module heap.
    Ptr(HeapPtr),
    Bool(bool),
    /// A registered function table slot, passed where the module expects a function pointer.
    FuncRef(TableIndex),
    /// The return value of an entry point that returns nothing.
    Void,
}

impl Val {
    pub const NULL: Val = Val::Ptr(0);

    /// The word this value is passed as. Function references have no word representation of
    /// their own; each module type decides how to materialize them.
    pub fn to_word(&self) -> Result<usize, Error> {
        match *self {
            Val::Ptr(p) => Ok(p),
            Val::Bool(false) => Ok(0),
            Val::Bool(true) => Ok(1),
            Val::Void => Ok(0),
            Val::FuncRef(_) => Err(Error::InvalidArgument(
                "function references must be materialized by the module",
            )),
        }
    }

    pub fn as_ptr(&self) -> Result<HeapPtr, Error> {
        match *self {
            Val::Ptr(p) => Ok(p),
            _ => Err(Error::InvalidArgument("expected a pointer value")),
        }
    }

    pub fn as_func_ref(&self) -> Result<TableIndex, Error> {
        match *self {
            Val::FuncRef(idx) => Ok(idx),
            _ => Err(Error::InvalidArgument("expected a function reference")),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Val::Ptr(0))
    }
}

macro_rules! impl_from_scalars {
    ( { $( $ctor:ident : $ty:ty ),* } ) => {
        $(
            impl From<$ty> for Val {
                fn from(x: $ty) -> Val {
                    Val::$ctor(x)
                }
            }
        )*
    };
}

impl_from_scalars!({
    Ptr: usize,
    Bool: bool,
    FuncRef: TableIndex
});
