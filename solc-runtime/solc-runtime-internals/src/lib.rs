//! `solc-runtime-internals` drives Solidity compiler modules of every historical generation
//! through one interface: it probes which entry points a module exports, marshals strings and
//! host callbacks across the module boundary, and adapts legacy outputs to standard JSON.

#![deny(bare_trait_objects)]

#[macro_use]
pub mod error;

pub mod bindings;
pub mod callback;
pub mod compile;
pub mod module;
pub mod probe;
pub mod solc;
pub mod standard;
pub mod val;
pub mod vmctx;
