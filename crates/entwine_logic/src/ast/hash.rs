//! Deterministic structural hashing.
//!
//! Connection generation names synthesised tokens after the hash of the rule
//! that guards them, so two structurally equal rules must hash identically —
//! and the hash must not depend on process-level randomness. `FxHasher`
//! seeds nothing, which makes it the right tool here.

use super::{CompareOp, Node};
use rustc_hash::FxHasher;
use std::hash::Hasher;

/// Hashes a rule tree by structure.
///
/// Structurally equal trees hash equal regardless of where their nodes were
/// allocated. Identifier and string payloads hash by handle, which is stable
/// for any one symbol table and interner.
pub fn structural_hash(node: &Node) -> u64 {
    let mut hasher = FxHasher::default();
    write_node(&mut hasher, node);
    hasher.finish()
}

fn write_node(hasher: &mut FxHasher, node: &Node) {
    match node {
        Node::Boolean(value) => {
            hasher.write_u8(0x01);
            hasher.write_u8(*value as u8);
        }
        Node::Number(value) => {
            hasher.write_u8(0x02);
            hasher.write_u64(value.to_bits());
        }
        Node::String(handle) => {
            hasher.write_u8(0x03);
            hasher.write_usize(handle.index());
        }
        Node::Identifier(symbol) => {
            hasher.write_u8(0x04);
            hasher.write_usize(symbol.index());
        }
        Node::Invoke { target, args } => {
            hasher.write_u8(0x05);
            write_node(hasher, target);
            hasher.write_usize(args.len());
            for arg in *args {
                write_node(hasher, arg);
            }
        }
        Node::Invert(inner) => {
            hasher.write_u8(0x06);
            write_node(hasher, inner);
        }
        Node::Every(children) => {
            hasher.write_u8(0x07);
            hasher.write_usize(children.len());
            for child in *children {
                write_node(hasher, child);
            }
        }
        Node::AnyOf(children) => {
            hasher.write_u8(0x08);
            hasher.write_usize(children.len());
            for child in *children {
                write_node(hasher, child);
            }
        }
        Node::Compare { op, lhs, rhs } => {
            hasher.write_u8(0x09);
            hasher.write_u8(match op {
                CompareOp::Eq => 0,
                CompareOp::Nq => 1,
                CompareOp::Lt => 2,
            });
            write_node(hasher, lhs);
            write_node(hasher, rhs);
        }
    }
}
