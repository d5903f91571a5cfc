//! Hash table keys and entries.

use super::value::Value;

/// The hashable form of a value.
///
/// Only integers, booleans and strings can be used as hash keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    /// Integer key
    Integer(i64),
    /// Boolean key
    Boolean(bool),
    /// String key
    String(String),
}

/// An entry of a hash value, keeping the original key for display.
#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    /// The key as written
    pub key: Value,
    /// The associated value
    pub value: Value,
}
