//! Data transformations for Solidity compiler modules.
//!
//! These types and functions have no dependency on a loaded compiler: they link library addresses
//! into bytecode, normalize the output of pre-standard-JSON compilers into the standard schema,
//! and interpret the version strings compilers have reported over the years. They are used by
//! `solc-runtime` after a compile call returns, and are usable on their own for post-processing
//! saved compiler output.

#![deny(bare_trait_objects)]

pub mod abi;
pub mod assembly;
pub mod error;
mod libraries;
pub mod linker;
pub mod output;
pub mod translate;
mod version_info;

pub use crate::error::Error;
pub use crate::libraries::LibraryMap;
pub use crate::linker::{find_link_references, link_bytecode, LinkReference, LinkReferences};
pub use crate::output::{CompilationOutput, OutputError, Severity};
pub use crate::translate::translate_json_compiler_output;
pub use crate::version_info::{version_to_semver, VersionInfo};
