// Value representation and the heap objects a `Value::Obj` can point to.
//
// Values are a small tagged union, cheap to copy on the VM's stack. Heap
// objects (strings, functions, natives) are reference-counted with `Rc` so
// the VM, the constant pool, and the globals table can all hold a handle to
// the same string without a manual "object list" to walk at teardown —
// `Rc::drop` already frees each object exactly once when its last handle
// goes away.

use crate::bytecode::Chunk;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub type NativeFn = fn(&mut crate::vm::VM, &[Value]) -> Result<Value, crate::errors::RuntimeError>;

#[derive(Clone)]
pub struct ObjString {
    pub bytes: String,
    pub hash: u32,
}

impl ObjString {
    pub fn new(bytes: String) -> Self {
        let hash = fnv1a_hash(bytes.as_bytes());
        Self { bytes, hash }
    }
}

impl PartialEq for ObjString {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}
impl Eq for ObjString {}

impl fmt::Debug for ObjString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.bytes)
    }
}

/// FNV-1a over raw bytes — matches the hashing scheme used by the table's
/// string keys so two equal strings always hash identically.
pub fn fnv1a_hash(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2166136261;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

#[derive(Debug, Clone)]
pub struct ObjFunction {
    pub name: Option<Rc<ObjString>>,
    pub arity: usize,
    pub chunk: Chunk,
}

impl ObjFunction {
    pub fn new(name: Option<Rc<ObjString>>, arity: usize) -> Self {
        Self { name, arity, chunk: Chunk::new() }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_ref().map(|n| n.bytes.as_str()).unwrap_or("script")
    }
}

#[derive(Clone)]
pub struct ObjNative {
    pub name: String,
    pub func: NativeFn,
}

impl fmt::Debug for ObjNative {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<native {}>", self.name)
    }
}

#[derive(Debug, Clone)]
pub enum Obj {
    String(Rc<ObjString>),
    Function(Rc<ObjFunction>),
    Native(Rc<ObjNative>),
}

#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Null,
    Obj(Obj),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Value {
        Value::Obj(Obj::String(Rc::new(ObjString::new(s.into()))))
    }

    pub fn is_falsey(&self) -> bool {
        matches!(self, Value::Null | Value::Bool(false))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&Rc<ObjString>> {
        match self {
            Value::Obj(Obj::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::Null => "null",
            Value::Obj(Obj::String(_)) => "string",
            Value::Obj(Obj::Function(_)) => "function",
            Value::Obj(Obj::Native(_)) => "native function",
        }
    }

    /// Value equality; mismatched types are unequal rather than an error.
    pub fn values_equal(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => x == y,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Null, Value::Null) => true,
            (Value::Obj(Obj::String(x)), Value::Obj(Obj::String(y))) => x.bytes == y.bytes,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::Obj(Obj::String(s)) => write!(f, "{}", s.bytes),
            Value::Obj(Obj::Function(func)) => write!(f, "function<{}>", func.display_name()),
            Value::Obj(Obj::Native(n)) => write!(f, "function<{}>", n.name),
        }
    }
}

thread_local! {
    static INTERNED: RefCell<ahash::AHashMap<String, Rc<ObjString>>> = RefCell::new(ahash::AHashMap::new());
}

/// Interns a string used during compilation so repeated identifiers and
/// literals in one program share a single allocation.
pub fn intern(bytes: &str) -> Rc<ObjString> {
    INTERNED.with(|cache| {
        let mut cache = cache.borrow_mut();
        if let Some(existing) = cache.get(bytes) {
            return existing.clone();
        }
        let interned = Rc::new(ObjString::new(bytes.to_string()));
        cache.insert(bytes.to_string(), interned.clone());
        interned
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falsey_values_are_null_and_false() {
        assert!(Value::Null.is_falsey());
        assert!(Value::Bool(false).is_falsey());
        assert!(!Value::Bool(true).is_falsey());
        assert!(!Value::Number(0.0).is_falsey());
    }

    #[test]
    fn equal_strings_hash_identically() {
        let a = ObjString::new("hello".to_string());
        let b = ObjString::new("hello".to_string());
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn integral_numbers_print_without_decimal() {
        assert_eq!(Value::Number(7.0).to_string(), "7");
        assert_eq!(Value::Number(7.5).to_string(), "7.5");
    }

    #[test]
    fn interning_returns_the_same_allocation() {
        let a = intern("shared");
        let b = intern("shared");
        assert!(Rc::ptr_eq(&a, &b));
    }
}
