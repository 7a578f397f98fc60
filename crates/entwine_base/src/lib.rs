//! # entwine-base
//!
//! Structural atoms shared by every entwine crate:
//!
//! - [`Arena`] — bump allocation for stable AST references
//! - [`Interner`]/[`IStr`] — string interning with `Copy` integer handles
//! - [`Bitset`] — dense `u32` set with ascending iteration
//! - [`CancelToken`] — cooperative cancellation checked at phase boundaries
//!
//! This crate knows nothing about worlds, rules, or bytecode. It provides
//! only generic, reusable infrastructure that the pipeline crates build on.

pub mod arena;
pub mod bitset;
pub mod cancel;
pub mod intern;

pub use arena::Arena;
pub use bitset::Bitset;
pub use cancel::CancelToken;
pub use intern::{IStr, Interner};
