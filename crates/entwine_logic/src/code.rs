//! The instruction set and compiled modules.
//!
//! A compiled rule is a [`Bytecode`] module: a flat little-endian tape, the
//! set of object-pool indices its operands reference, and a name table for
//! pointer operands so a module can be disassembled without the world it
//! was compiled against.
//!
//! The opcode byte values and operand widths are the binary interface
//! between compiler and VM and do not change.

use crate::error::DataError;
use crate::objects::{Index, Table};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use rustc_hash::FxHashMap;
use std::fmt::Write as _;

/// The opcode set.
#[derive(Clone, Copy, PartialEq, Eq, Debug, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Op {
    Nop = 0x00,
    PushT = 0x21,
    PushF = 0x22,
    PushConst = 0x23,
    PushPtr = 0x24,
    PushStr = 0x25,
    PushFunc = 0x26,
    Invert = 0x31,
    NeedAll = 0x32,
    NeedAny = 0x33,
    ChkQty = 0x41,
    Invoke = 0x51,
    Invoke0 = 0x52,
    CmpEq = 0x61,
    CmpNq = 0x62,
    CmpLt = 0x63,
    Err = 0xFF,
}

impl Op {
    /// Widths in bytes of the operands following the opcode byte.
    pub fn operand_widths(self) -> &'static [usize] {
        match self {
            Op::Nop | Op::Err | Op::PushT | Op::PushF | Op::Invert => &[],
            Op::CmpEq | Op::CmpNq | Op::CmpLt => &[],
            Op::PushConst | Op::PushPtr | Op::PushStr | Op::PushFunc => &[2],
            Op::NeedAll | Op::NeedAny | Op::Invoke | Op::Invoke0 => &[2],
            Op::ChkQty => &[2, 1],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Op::Nop => "NOP",
            Op::Err => "ERR",
            Op::PushT => "PUSH_T",
            Op::PushF => "PUSH_F",
            Op::PushConst => "PUSH_CONST",
            Op::PushPtr => "PUSH_PTR",
            Op::PushStr => "PUSH_STR",
            Op::PushFunc => "PUSH_FUNC",
            Op::Invert => "INVERT",
            Op::NeedAll => "NEED_ALL",
            Op::NeedAny => "NEED_ANY",
            Op::ChkQty => "CHK_QTY",
            Op::Invoke => "INVOKE",
            Op::Invoke0 => "INVOKE_0",
            Op::CmpEq => "CMP_EQ",
            Op::CmpNq => "CMP_NQ",
            Op::CmpLt => "CMP_LT",
        }
    }
}

/// Appends one encoded instruction to `tape`.
///
/// # Panics
///
/// Panics when `operands` does not match the opcode's operand list; the
/// code generator is the only caller and always supplies the right shape.
pub fn emit(tape: &mut Vec<u8>, op: Op, operands: &[u32]) {
    let widths = op.operand_widths();
    assert_eq!(
        widths.len(),
        operands.len(),
        "{} expects {} operands, received {}",
        op.name(),
        widths.len(),
        operands.len()
    );
    tape.push(op.into());
    for (operand, width) in operands.iter().zip(widths) {
        match width {
            1 => tape.push(*operand as u8),
            2 => tape.extend_from_slice(&(*operand as u16).to_le_bytes()),
            _ => unreachable!("unsupported operand width {width}"),
        }
    }
}

/// Reads a little-endian u16 from the front of `bytes`.
pub fn read_u16(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

/// One compiled rule.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bytecode {
    pub tape: Vec<u8>,
    /// Every object-pool index appearing as an operand, ascending.
    pub consts: Vec<Index>,
    /// Source names for pointer operands, for disassembly.
    pub names: FxHashMap<Index, String>,
}

impl Bytecode {
    /// Serialises the module: u16 tape length, tape bytes, u16 constant
    /// count and the u16 indices, then a length-prefixed name table keyed by
    /// index. Everything little-endian.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.tape.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.tape);
        out.extend_from_slice(&(self.consts.len() as u16).to_le_bytes());
        for index in &self.consts {
            out.extend_from_slice(&index.as_u16().to_le_bytes());
        }
        let mut named: Vec<(&Index, &String)> = self.names.iter().collect();
        named.sort_by_key(|(index, _)| **index);
        out.extend_from_slice(&(named.len() as u16).to_le_bytes());
        for (index, name) in named {
            out.extend_from_slice(&index.as_u16().to_le_bytes());
            out.extend_from_slice(&(name.len() as u16).to_le_bytes());
            out.extend_from_slice(name.as_bytes());
        }
        out
    }

    /// Parses a module serialised by [`Bytecode::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Bytecode, DataError> {
        let mut reader = Reader { bytes, at: 0 };
        let tape_len = reader.u16()? as usize;
        let tape = reader.take(tape_len)?.to_vec();
        validate_tape(&tape)?;

        let const_count = reader.u16()? as usize;
        let mut consts = Vec::with_capacity(const_count);
        for _ in 0..const_count {
            consts.push(Index::new(reader.u16()?));
        }

        let name_count = reader.u16()? as usize;
        let mut names = FxHashMap::default();
        for _ in 0..name_count {
            let index = Index::new(reader.u16()?);
            let len = reader.u16()? as usize;
            let raw = reader.take(len)?;
            let name = std::str::from_utf8(raw)
                .map_err(|_| DataError::Malformed("name table is not utf-8".into()))?;
            names.insert(index, name.to_string());
        }

        Ok(Bytecode { tape, consts, names })
    }

    /// Renders the tape and constants for humans.
    pub fn disassemble(&self, table: &Table) -> String {
        let mut out = String::new();
        let mut ip = 0;
        while ip < self.tape.len() {
            let byte = self.tape[ip];
            match Op::try_from(byte) {
                Ok(op) => {
                    let _ = write!(out, "0x{ip:04X}\t{}", op.name());
                    ip += 1;
                    for width in op.operand_widths() {
                        match width {
                            1 => {
                                let _ = write!(out, "\t0x{:02X}", self.tape[ip]);
                            }
                            _ => {
                                let _ = write!(out, "\t0x{:04X}", read_u16(&self.tape[ip..]));
                            }
                        }
                        ip += width;
                    }
                    out.push('\n');
                }
                Err(_) => {
                    let _ = writeln!(out, "0x{ip:04X}\t??\t0x{byte:02X}");
                    ip += 1;
                }
            }
        }

        if !self.consts.is_empty() {
            out.push_str("\nCONSTANTS\n");
            for index in &self.consts {
                let Some(handle) = table.at_index(*index) else {
                    let _ = writeln!(out, "0x{:04X}:\t<unresolved>", index.as_u16());
                    continue;
                };
                let _ = writeln!(out, "0x{:04X}:\t0x{:08X}", index.as_u16(), handle.raw());
                let _ = writeln!(out, "\ttype:\t{}", handle.type_name());
                if let Some(name) = self.names.get(index) {
                    let _ = writeln!(out, "\tname:\t{name:?}");
                }
                if let Some(value) = table.number(handle) {
                    let _ = writeln!(out, "\tvalue:\t{value}");
                }
                if let Some(value) = table.deref_string(handle) {
                    let _ = writeln!(out, "\tvalue:\t{value:?}");
                }
            }
        }
        out
    }
}

/// Checks that a tape is a well-formed instruction stream.
fn validate_tape(tape: &[u8]) -> Result<(), DataError> {
    let mut ip = 0;
    while ip < tape.len() {
        let op = Op::try_from(tape[ip])
            .map_err(|_| DataError::Malformed(format!("unknown op 0x{:02X}", tape[ip])))?;
        ip += 1;
        let width: usize = op.operand_widths().iter().sum();
        if ip + width > tape.len() {
            return Err(DataError::Malformed(format!(
                "{} truncated at offset 0x{:04X}",
                op.name(),
                ip - 1
            )));
        }
        ip += width;
    }
    Ok(())
}

struct Reader<'b> {
    bytes: &'b [u8],
    at: usize,
}

impl<'b> Reader<'b> {
    fn u16(&mut self) -> Result<u16, DataError> {
        let raw = self.take(2)?;
        Ok(u16::from_le_bytes([raw[0], raw[1]]))
    }

    fn take(&mut self, len: usize) -> Result<&'b [u8], DataError> {
        if self.at + len > self.bytes.len() {
            return Err(DataError::Malformed("module ends early".into()));
        }
        let slice = &self.bytes[self.at..self.at + len];
        self.at += len;
        Ok(slice)
    }
}
