//! Quill value representation.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::function::{Builtin, Closure, CompiledFunction};
use super::hash::{HashKey, HashPair};

/// A hash table value, keyed by the hashable form of its keys.
pub type HashTable = FxHashMap<HashKey, HashPair>;

/// A Quill value.
///
/// Values are thread-safe and can be shared between VM instances running
/// the same compiled program.
#[derive(Debug, Clone)]
pub enum Value {
    /// 64-bit signed integer
    Integer(i64),
    /// Boolean value
    Boolean(bool),
    /// null
    Null,
    /// String
    String(String),
    /// Immutable array
    Array(Arc<Vec<Value>>),
    /// Immutable hash
    Hash(Arc<HashTable>),
    /// A function together with its captured variables
    Closure(Arc<Closure>),
    /// A native function
    Builtin(Builtin),
    /// A compiled function body, only found in the constant pool
    CompiledFunction(Arc<CompiledFunction>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Hash(a), Value::Hash(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => Arc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a.name == b.name,
            (Value::CompiledFunction(a), Value::CompiledFunction(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Value {
    /// Creates an array value.
    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Arc::new(elements))
    }

    /// Creates a string value.
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Only `false` and `null` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Boolean(false) | Value::Null)
    }

    /// Returns the hashable form of this value, if it has one.
    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Value::Integer(n) => Some(HashKey::Integer(*n)),
            Value::Boolean(b) => Some(HashKey::Boolean(*b)),
            Value::String(s) => Some(HashKey::String(s.clone())),
            _ => None,
        }
    }

    /// Returns the type of this value as shown in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "INTEGER",
            Value::Boolean(_) => "BOOLEAN",
            Value::Null => "NULL",
            Value::String(_) => "STRING",
            Value::Array(_) => "ARRAY",
            Value::Hash(_) => "HASH",
            Value::Closure(_) => "CLOSURE",
            Value::Builtin(_) => "BUILTIN",
            Value::CompiledFunction(_) => "COMPILED_FUNCTION",
        }
    }

    /// Formats the value as it appears nested inside a collection.
    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    element.fmt_nested(f)?;
                }
                write!(f, "]")
            }
            Value::Hash(table) => {
                // Sorted so output does not depend on hash order.
                let mut pairs: Vec<&HashPair> = table.values().collect();
                pairs.sort_by_key(|pair| pair.key.to_string());

                write!(f, "{{")?;
                for (i, pair) in pairs.into_iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    pair.key.fmt_nested(f)?;
                    write!(f, ": ")?;
                    pair.value.fmt_nested(f)?;
                }
                write!(f, "}}")
            }
            Value::Closure(closure) => write!(f, "Closure[{}]", closure.func),
            Value::Builtin(builtin) => write!(f, "builtin {}", builtin.name),
            Value::CompiledFunction(func) => write!(f, "CompiledFunction[{}]", func),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(Value::Boolean(true).is_truthy());
        assert!(Value::Integer(0).is_truthy());
        assert!(Value::string("").is_truthy());
        assert!(Value::array(vec![]).is_truthy());
    }

    #[test]
    fn test_hash_keys() {
        assert_eq!(Value::Integer(1).hash_key(), Some(HashKey::Integer(1)));
        assert_eq!(
            Value::string("a").hash_key(),
            Value::string("a").hash_key()
        );
        assert_ne!(
            Value::string("1").hash_key(),
            Value::Integer(1).hash_key()
        );
        assert_eq!(Value::array(vec![]).hash_key(), None);
        assert_eq!(Value::Null.hash_key(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Integer(-5).to_string(), "-5");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::string("hi").to_string(), "hi");
        assert_eq!(
            Value::array(vec![Value::Integer(1), Value::string("two")]).to_string(),
            "[1, \"two\"]"
        );
    }

    #[test]
    fn test_hash_display_is_sorted() {
        let mut table = HashTable::default();
        for (k, v) in [(3, 30), (1, 10), (2, 20)] {
            let key = Value::Integer(k);
            table.insert(
                key.hash_key().unwrap(),
                HashPair {
                    key,
                    value: Value::Integer(v),
                },
            );
        }
        assert_eq!(
            Value::Hash(Arc::new(table)).to_string(),
            "{1: 10, 2: 20, 3: 30}"
        );
    }

    #[test]
    fn test_values_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Value>();
    }
}
