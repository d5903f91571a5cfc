//! Built-in functions.
//!
//! The order of [`BUILTINS`] is part of the bytecode format: `GetBuiltin`
//! operands are indices into it.
//!
//! | Index | Name | Module |
//! |-------|------|--------|
//! | 0 | `len` | `array` |
//! | 1 | `print` | `console` |
//! | 2 | `first` | `array` |
//! | 3 | `last` | `array` |
//! | 4 | `rest` | `array` |
//! | 5 | `push` | `array` |

pub mod array;
pub mod console;

use crate::runtime::function::Builtin;

/// Every builtin, in registry order.
pub const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "len",
        func: array::len,
    },
    Builtin {
        name: "print",
        func: console::print,
    },
    Builtin {
        name: "first",
        func: array::first,
    },
    Builtin {
        name: "last",
        func: array::last,
    },
    Builtin {
        name: "rest",
        func: array::rest,
    },
    Builtin {
        name: "push",
        func: array::push,
    },
];

/// Returns the builtin registered at `index`.
pub fn get(index: usize) -> Option<Builtin> {
    BUILTINS.get(index).copied()
}

/// Finds a builtin by name, returning its registry index.
pub fn lookup(name: &str) -> Option<(usize, Builtin)> {
    BUILTINS
        .iter()
        .enumerate()
        .find(|(_, builtin)| builtin.name == name)
        .map(|(index, builtin)| (index, *builtin))
}

/// Fails unless exactly `want` arguments were passed.
fn check_arity(args: &[crate::runtime::value::Value], want: usize) -> Result<(), String> {
    if args.len() == want {
        Ok(())
    } else {
        Err(format!(
            "wrong number of arguments. got={}, want={}",
            args.len(),
            want
        ))
    }
}
