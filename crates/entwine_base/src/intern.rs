//! String interning with `Copy` integer handles.
//!
//! Rule sources mention the same handful of strings thousands of times
//! ("day", "night", trick names, region names). Interning stores each unique
//! string once and hands out an [`IStr`] handle; equality is an integer
//! compare and the handle is free to copy into arena-allocated AST nodes.
//!
//! ```
//! use entwine_base::Interner;
//!
//! let mut interner = Interner::new();
//! let a = interner.intern("day");
//! let b = interner.intern("day");
//! assert_eq!(a, b);
//! assert_eq!(interner.resolve(a), "day");
//! ```

use rustc_hash::FxHashMap;

/// Handle to an interned string. `Copy`, `Eq`, and `Hash` are all O(1).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct IStr(u32);

impl IStr {
    /// The empty string, always at index 0.
    pub const EMPTY: IStr = IStr(0);

    /// The handle's dense index, usable for side tables.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Stores each unique string exactly once.
pub struct Interner {
    map: FxHashMap<String, IStr>,
    strings: Vec<String>,
}

impl Interner {
    /// Creates an interner with the empty string pre-interned.
    pub fn new() -> Self {
        let mut interner = Interner {
            map: FxHashMap::default(),
            strings: Vec::new(),
        };
        interner.strings.push(String::new());
        interner
    }

    /// Interns a string, returning the existing handle if already present.
    pub fn intern(&mut self, s: &str) -> IStr {
        if let Some(&handle) = self.map.get(s) {
            return handle;
        }
        let handle = IStr(self.strings.len() as u32);
        self.strings.push(s.to_string());
        self.map.insert(s.to_string(), handle);
        handle
    }

    /// Returns the string for a handle created by this interner.
    ///
    /// # Panics
    ///
    /// Panics if `handle` came from a different interner.
    pub fn resolve(&self, handle: IStr) -> &str {
        &self.strings[handle.0 as usize]
    }

    /// Looks up a string without interning it.
    pub fn lookup(&self, s: &str) -> Option<IStr> {
        self.map.get(s).copied()
    }

    /// Number of interned strings, the empty string included.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// True when nothing beyond the empty string has been interned.
    pub fn is_empty(&self) -> bool {
        self.strings.len() <= 1
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}
