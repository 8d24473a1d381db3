use anyhow::Error as AnyError;
use thiserror::Error;

/// Errors at the boundary with a compiler module.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid argument: {}", _0)]
    InvalidArgument(&'static str),

    /// A module error occurred.
    #[error("Module error: {}", _0)]
    ModuleError(ModuleError),

    /// An attempt to look up an exported function by its symbol name failed.
    #[error("Symbol not found: {}", _0)]
    SymbolNotFound(String),

    /// An attempt to use a function table slot that is not registered.
    #[error("Function not found: (slot {})", _0)]
    FuncNotFound(u32),

    /// IO errors arising during dynamic loading with [`DlModule`](struct.DlModule.html).
    #[error("Dynamic loading error: {}", _0)]
    DlError(#[from] std::io::Error),

    /// The module called back with a non-null context pointer.
    #[error("Callback context must be null")]
    InvalidCallbackContext,

    /// The module called back with a kind other than `source` or `smt-query`.
    #[error("Invalid callback kind specified: {}", _0)]
    InvalidCallbackKind(String),

    /// Linking or output normalization failed.
    #[error("Output error: {}", _0)]
    Output(#[from] solc_module::Error),

    /// A catch-all for internal errors that are likely unrecoverable by the caller.
    #[error("Internal error: {}", _0)]
    InternalError(#[source] AnyError),

    /// The loaded module does not provide the requested interface.
    #[error("Unsupported feature: {}", _0)]
    Unsupported(String),
}

impl From<std::str::Utf8Error> for Error {
    fn from(e: std::str::Utf8Error) -> Error {
        Error::InternalError(e.into())
    }
}

impl From<std::ffi::NulError> for Error {
    fn from(e: std::ffi::NulError) -> Error {
        Error::InternalError(e.into())
    }
}

/// Compiler module errors.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// The module does not export what every generation of the compiler exports.
    #[error("Incorrect module definition: {}", _0)]
    IncorrectModule(String),
}

#[macro_export]
macro_rules! solc_bail {
    ($e:expr) => {
        return Err(solc_format_err!($e));
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err(solc_format_err!($fmt, $($arg)*));
    };
}

#[macro_export(local_inner_macros)]
macro_rules! solc_ensure {
    ($cond:expr, $e:expr) => {
        if !($cond) {
            solc_bail!($e);
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)*) => {
        if !($cond) {
            solc_bail!($fmt, $($arg)*);
        }
    };
}

#[macro_export]
macro_rules! solc_format_err {
    ($($arg:tt)*) => { $crate::error::Error::InternalError(anyhow::format_err!($($arg)*)) }
}

#[macro_export]
macro_rules! solc_incorrect_module {
    ($($arg:tt)*) => {
        $crate::error::Error::ModuleError(
            $crate::error::ModuleError::IncorrectModule(format!($($arg)*))
        )
    }
}
