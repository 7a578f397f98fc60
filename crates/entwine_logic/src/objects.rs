//! Packed runtime values and the immutable object table.
//!
//! A runtime value is a 32-bit [`Object`]: a tag in the high byte and a
//! 24-bit payload. Booleans and null are immediates; numbers and strings
//! carry an index into a side pool on the table; pointers carry an entity
//! address; function pointers carry an index into the built-in table.
//!
//! The [`Builder`] interns values during compilation and hands out stable
//! [`Index`] positions that become tape operands. [`Builder::freeze`]
//! produces the read-only [`Table`] the VM executes against.

use crate::error::{DataError, LinkError};
use crate::symbols::{Symbol, SymbolId};
use rustc_hash::FxHashMap;

const TAG_SHIFT: u32 = 24;
const PAYLOAD_MASK: u32 = (1 << TAG_SHIFT) - 1;

const TAG_NULL: u8 = 0x00;
const TAG_BOOL: u8 = 0x01;
const TAG_F64: u8 = 0x02;
const TAG_STR: u8 = 0x03;
const TAG_TOKEN: u8 = 0x04;
const TAG_SETTING: u8 = 0x05;
const TAG_REGION: u8 = 0x06;
const TAG_TRANSIT: u8 = 0x07;
const TAG_FUNC: u8 = 0x08;

/// A packed 32-bit runtime value.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Object(u32);

impl Object {
    pub const NULL: Object = Object(0);
    pub const TRUE: Object = Object(((TAG_BOOL as u32) << TAG_SHIFT) | 1);
    pub const FALSE: Object = Object((TAG_BOOL as u32) << TAG_SHIFT);

    pub fn pack_bool(value: bool) -> Object {
        if value {
            Object::TRUE
        } else {
            Object::FALSE
        }
    }

    pub fn pack_ptr(ptr: Ptr32) -> Object {
        debug_assert!(ptr.addr <= PAYLOAD_MASK);
        Object(((ptr.tag.raw() as u32) << TAG_SHIFT) | (ptr.addr & PAYLOAD_MASK))
    }

    pub(crate) fn pack_number_index(index: u32) -> Object {
        Object(((TAG_F64 as u32) << TAG_SHIFT) | index)
    }

    pub(crate) fn pack_string_index(index: u32) -> Object {
        Object(((TAG_STR as u32) << TAG_SHIFT) | index)
    }

    pub(crate) fn pack_function(index: u32) -> Object {
        Object(((TAG_FUNC as u32) << TAG_SHIFT) | index)
    }

    fn tag(self) -> u8 {
        (self.0 >> TAG_SHIFT) as u8
    }

    fn payload(self) -> u32 {
        self.0 & PAYLOAD_MASK
    }

    pub fn is_null(self) -> bool {
        self == Object::NULL
    }

    pub fn unpack_ptr(self) -> Option<Ptr32> {
        let tag = match self.tag() {
            TAG_TOKEN => PtrTag::Token,
            TAG_SETTING => PtrTag::Setting,
            TAG_REGION => PtrTag::Region,
            TAG_TRANSIT => PtrTag::Transit,
            _ => return None,
        };
        Some(Ptr32 {
            tag,
            addr: self.payload(),
        })
    }

    pub fn unpack_function(self) -> Option<u32> {
        (self.tag() == TAG_FUNC).then(|| self.payload())
    }

    /// The tag's display name, used by disassembly and type diagnostics.
    pub fn type_name(self) -> &'static str {
        match self.tag() {
            TAG_NULL => "null",
            TAG_BOOL => "bool",
            TAG_F64 => "f64",
            TAG_STR => "str",
            TAG_TOKEN => "token ptr",
            TAG_SETTING => "setting ptr",
            TAG_REGION => "region ptr",
            TAG_TRANSIT => "transit ptr",
            TAG_FUNC => "fn ptr",
            _ => "invalid",
        }
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(0x{:08X})", self.type_name(), self.0)
    }
}

/// Which entity family a pointer addresses.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PtrTag {
    Token,
    Setting,
    Region,
    Transit,
}

impl PtrTag {
    fn raw(self) -> u8 {
        match self {
            PtrTag::Token => TAG_TOKEN,
            PtrTag::Setting => TAG_SETTING,
            PtrTag::Region => TAG_REGION,
            PtrTag::Transit => TAG_TRANSIT,
        }
    }
}

/// An unpacked pointer: entity family plus a 24-bit address.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Ptr32 {
    pub tag: PtrTag,
    pub addr: u32,
}

/// Position of a constructed handle in the object pool. Tape operands are
/// these, encoded as little-endian u16.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Index(u16);

impl Index {
    pub fn new(raw: u16) -> Index {
        Index(raw)
    }

    pub fn as_u16(self) -> u16 {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Signature of a built-in function: name and parameter count (−1 variadic).
#[derive(Clone, Debug)]
pub struct FunctionDef {
    pub name: String,
    pub params: i8,
}

/// Interns values and builds the object pool during compilation.
#[derive(Default)]
pub struct Builder {
    objects: Vec<Object>,
    positions: FxHashMap<Object, Index>,
    numbers: Vec<f64>,
    number_ids: FxHashMap<u64, u32>,
    strings: Vec<String>,
    string_ids: FxHashMap<String, u32>,
    by_symbol: FxHashMap<SymbolId, Index>,
    functions: Vec<FunctionDef>,
}

impl Builder {
    pub fn new() -> Self {
        Builder::default()
    }

    fn place(&mut self, handle: Object) -> Index {
        if let Some(&index) = self.positions.get(&handle) {
            return index;
        }
        // Tape operands are u16; a world that overflows this pool is broken
        // long before it gets here.
        assert!(self.objects.len() <= u16::MAX as usize);
        let index = Index(self.objects.len() as u16);
        self.objects.push(handle);
        self.positions.insert(handle, index);
        index
    }

    /// Interns a number, returning the pool position of its handle.
    pub fn intern_number(&mut self, value: f64) -> Index {
        let bits = value.to_bits();
        let id = match self.number_ids.get(&bits) {
            Some(&id) => id,
            None => {
                let id = self.numbers.len() as u32;
                self.numbers.push(value);
                self.number_ids.insert(bits, id);
                id
            }
        };
        self.place(Object::pack_number_index(id))
    }

    /// Interns a string, returning the pool position of its handle.
    pub fn intern_string(&mut self, value: &str) -> Index {
        let id = match self.string_ids.get(value) {
            Some(&id) => id,
            None => {
                let id = self.strings.len() as u32;
                self.strings.push(value.to_string());
                self.string_ids.insert(value.to_string(), id);
                id
            }
        };
        self.place(Object::pack_string_index(id))
    }

    /// Binds a symbol to a pre-built packed pointer.
    ///
    /// Rebinding with the same handle is idempotent; a different handle is a
    /// [`DataError`].
    pub fn associate_symbol(
        &mut self,
        symbol: &Symbol,
        handle: Object,
    ) -> Result<Index, DataError> {
        if let Some(&existing) = self.by_symbol.get(&symbol.id) {
            if self.objects[existing.as_usize()] != handle {
                return Err(DataError::AlreadyBound {
                    name: symbol.name.clone(),
                });
            }
            return Ok(existing);
        }
        let index = self.place(handle);
        self.by_symbol.insert(symbol.id, index);
        Ok(index)
    }

    /// The pool position of the handle bound to `symbol`.
    pub fn ptr_for(&self, symbol: &Symbol) -> Result<Index, LinkError> {
        self.by_symbol
            .get(&symbol.id)
            .copied()
            .ok_or_else(|| LinkError::UnboundSymbol {
                name: symbol.name.clone(),
            })
    }

    /// Registers a built-in function definition and binds `symbol` to a
    /// function-pointer handle. Definition order is the dispatch order.
    pub fn define_function(&mut self, symbol: &Symbol, params: i8) -> Result<Index, DataError> {
        if let Some(&existing) = self.by_symbol.get(&symbol.id) {
            return Ok(existing);
        }
        let fn_index = self.functions.len() as u32;
        self.functions.push(FunctionDef {
            name: symbol.name.clone(),
            params,
        });
        self.associate_symbol(symbol, Object::pack_function(fn_index))
    }

    /// The definition of the built-in bound to `symbol`.
    pub fn function_definition(&self, symbol: &Symbol) -> Result<&FunctionDef, LinkError> {
        self.by_symbol
            .get(&symbol.id)
            .and_then(|index| self.objects[index.as_usize()].unpack_function())
            .and_then(|fn_index| self.functions.get(fn_index as usize))
            .ok_or_else(|| LinkError::MissingBuiltIn {
                name: symbol.name.clone(),
            })
    }

    pub fn at_index(&self, index: Index) -> Option<Object> {
        self.objects.get(index.as_usize()).copied()
    }

    /// Yields the immutable table the VM runs against.
    pub fn freeze(self) -> Table {
        Table {
            objects: self.objects,
            numbers: self.numbers,
            strings: self.strings,
            functions: self.functions,
        }
    }
}

/// The frozen object pool, read-only at VM runtime.
pub struct Table {
    objects: Vec<Object>,
    numbers: Vec<f64>,
    strings: Vec<String>,
    functions: Vec<FunctionDef>,
}

impl Table {
    pub fn at_index(&self, index: Index) -> Option<Object> {
        self.objects.get(index.as_usize()).copied()
    }

    /// Resolves a number handle to its interned value.
    pub fn number(&self, handle: Object) -> Option<f64> {
        if handle.tag() == TAG_F64 {
            self.numbers.get(handle.payload() as usize).copied()
        } else {
            None
        }
    }

    /// Resolves a string handle to its interned value.
    pub fn deref_string(&self, handle: Object) -> Option<&str> {
        if handle.tag() == TAG_STR {
            self.strings.get(handle.payload() as usize).map(|s| s.as_str())
        } else {
            None
        }
    }

    pub fn function(&self, index: u32) -> Option<&FunctionDef> {
        self.functions.get(index as usize)
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }
}
