//! Quill runtime types.

pub mod function;
pub mod hash;
pub mod value;

pub use function::{Builtin, BuiltinFunction, Closure, CompiledFunction};
pub use hash::{HashKey, HashPair};
pub use value::{HashTable, Value};
