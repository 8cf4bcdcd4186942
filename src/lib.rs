//! Infrastructure for a stack-oriented, prototype-based language where
//! everything is a message sent to a chain of receivers.
//!
//! Source code is parsed into a tree of blocks, loaded into a [`Heap`] of
//! values and walked by a [`VM`] that keeps its own frames instead of
//! recursing on the host stack.

#![warn(missing_debug_implementations)]
#![deny(missing_docs)]

pub mod bind;
mod error;
mod frame;
mod heap;
/// Interning of message names
pub mod intern;
mod library;
mod opcode;
mod parse;
mod primitive;
mod scan;
mod token;
mod value;
mod vm;

pub use bind::{declaration, BindingTime};
pub use error::*;
pub use frame::*;
pub use heap::*;
pub use intern::Name;
pub use library::*;
pub use opcode::*;
pub use parse::*;
pub use scan::*;
pub use token::*;
pub use value::*;
pub use vm::*;
