//! # flowc
//!
//! This is both an application and a library: the library exposes the command line options and
//! the entry points of the `flowc` tools, so that they can be driven from the tests (or from other
//! applications) without spawning a process.
//!
//! The compiler itself lives in the `flowc-transpiler` crate.

#[macro_use]
extern crate log;

pub mod error;
pub mod opt;
pub mod tools;

pub use opt::*;
