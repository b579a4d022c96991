//! Tagged machine values and the two heap arenas (arrays and strings).
//!
//! Handles are opaque integers drawn from one counter shared by both arenas, so a
//! handle projected to an integer on the wire never names two objects. Freed
//! objects keep their slot with a tombstone; touching one is an error, never
//! undefined behaviour.

use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub u64);

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Number(i64),
    ArrayHandle(Handle),
    StringHandle(Handle),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::ArrayHandle(_) => "array",
            Value::StringHandle(_) => "string",
        }
    }

    /// Integer projection used by snapshots: numbers as-is, handles by id.
    pub fn to_wire(&self) -> i64 {
        match self {
            Value::Number(n) => *n,
            Value::ArrayHandle(h) | Value::StringHandle(h) => h.0 as i64,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::ArrayHandle(h) => write!(f, "array{h}"),
            Value::StringHandle(h) => write!(f, "string{h}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapKind {
    Array,
    String,
}

impl fmt::Display for HeapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapKind::Array => write!(f, "array"),
            HeapKind::String => write!(f, "string"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeapError {
    #[error("{kind} {handle} has been freed")]
    UseAfterFree { kind: HeapKind, handle: Handle },
    #[error("{kind} {handle} was already freed")]
    DoubleFree { kind: HeapKind, handle: Handle },
    #[error("{handle} is not a live {kind} handle")]
    InvalidHandle { kind: HeapKind, handle: Handle },
    #[error("cannot allocate an array of {0} elements")]
    AllocationFailed(usize),
}

#[derive(Debug, Clone)]
struct Slot<T> {
    object: T,
    live: bool,
}

#[derive(Debug, Clone)]
struct Arena<T> {
    kind: HeapKind,
    slots: HashMap<Handle, Slot<T>>,
}

impl<T> Arena<T> {
    fn new(kind: HeapKind) -> Self {
        Arena { kind, slots: HashMap::new() }
    }

    fn insert(&mut self, handle: Handle, object: T) {
        self.slots.insert(handle, Slot { object, live: true });
    }

    fn get(&self, handle: Handle) -> Result<&T, HeapError> {
        match self.slots.get(&handle) {
            Some(Slot { object, live: true }) => Ok(object),
            Some(_) => Err(HeapError::UseAfterFree { kind: self.kind, handle }),
            None => Err(HeapError::InvalidHandle { kind: self.kind, handle }),
        }
    }

    fn get_mut(&mut self, handle: Handle) -> Result<&mut T, HeapError> {
        let kind = self.kind;
        match self.slots.get_mut(&handle) {
            Some(Slot { object, live: true }) => Ok(object),
            Some(_) => Err(HeapError::UseAfterFree { kind, handle }),
            None => Err(HeapError::InvalidHandle { kind, handle }),
        }
    }

    fn free(&mut self, handle: Handle, tombstone: T) -> Result<(), HeapError> {
        let kind = self.kind;
        match self.slots.get_mut(&handle) {
            Some(slot) if slot.live => {
                slot.live = false;
                // Drop the payload now; only the tombstone has to survive.
                slot.object = tombstone;
                Ok(())
            }
            Some(_) => Err(HeapError::DoubleFree { kind, handle }),
            None => Err(HeapError::InvalidHandle { kind, handle }),
        }
    }

    fn live(&self) -> usize {
        self.slots.values().filter(|s| s.live).count()
    }
}

/// Owner of every array and string a running program creates.
#[derive(Debug, Clone)]
pub struct Heap {
    arrays: Arena<Vec<Value>>,
    strings: Arena<String>,
    next: u64,
}

impl Default for Heap {
    fn default() -> Self {
        Heap::new()
    }
}

impl Heap {
    pub fn new() -> Self {
        Heap {
            arrays: Arena::new(HeapKind::Array),
            strings: Arena::new(HeapKind::String),
            next: 1,
        }
    }

    fn issue(&mut self) -> Handle {
        let handle = Handle(self.next);
        self.next += 1;
        handle
    }

    /// New live array of `size` zeros.
    pub fn allocate_array(&mut self, size: usize) -> Result<Handle, HeapError> {
        let mut elements = Vec::new();
        elements
            .try_reserve_exact(size)
            .map_err(|_| HeapError::AllocationFailed(size))?;
        elements.resize(size, Value::Number(0));
        let handle = self.issue();
        self.arrays.insert(handle, elements);
        Ok(handle)
    }

    pub fn allocate_string(&mut self, text: impl Into<String>) -> Handle {
        let handle = self.issue();
        self.strings.insert(handle, text.into());
        handle
    }

    pub fn array(&self, handle: Handle) -> Result<&[Value], HeapError> {
        self.arrays.get(handle).map(Vec::as_slice)
    }

    pub fn array_mut(&mut self, handle: Handle) -> Result<&mut [Value], HeapError> {
        self.arrays.get_mut(handle).map(Vec::as_mut_slice)
    }

    pub fn string(&self, handle: Handle) -> Result<&str, HeapError> {
        self.strings.get(handle).map(String::as_str)
    }

    pub fn free_array(&mut self, handle: Handle) -> Result<(), HeapError> {
        self.arrays.free(handle, Vec::new())
    }

    pub fn free_string(&mut self, handle: Handle) -> Result<(), HeapError> {
        self.strings.free(handle, String::new())
    }

    /// Allocates a new string `a ++ b`; neither input is touched.
    pub fn concat_strings(&mut self, a: Handle, b: Handle) -> Result<Handle, HeapError> {
        let joined = {
            let left = self.string(a)?;
            let right = self.string(b)?;
            let mut joined = String::with_capacity(left.len() + right.len());
            joined.push_str(left);
            joined.push_str(right);
            joined
        };
        Ok(self.allocate_string(joined))
    }

    pub fn live_arrays(&self) -> usize {
        self.arrays.live()
    }

    pub fn live_strings(&self) -> usize {
        self.strings.live()
    }
}
