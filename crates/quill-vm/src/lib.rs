// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # quill-vm
//!
//! A bytecode compiler and stack virtual machine for Quill, a small dynamic
//! language with integers, strings, booleans, arrays, hashes and first-class
//! closures.
//!
//! ## Overview
//!
//! - Lexer and recursive-descent parser
//! - Compiler from AST to a compact bytecode with a constant pool
//! - Stack VM with call frames and captured free variables
//! - Built-in functions (`len`, `print`, `first`, `last`, `rest`, `push`)
//! - Optional async file evaluation and parallel execution
//!
//! ## Quick Start
//!
//! ```rust
//! use quill_vm::{Engine, Value};
//!
//! let mut engine = Engine::new();
//! engine.eval("let add = fn(a, b) { a + b };").unwrap();
//! let result = engine.eval("add(1, 2)").unwrap();
//! assert_eq!(result, Value::Integer(3));
//! ```

#![warn(clippy::all)]

pub mod ast;
pub mod builtins;
pub mod compiler;
pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod vm;

#[cfg(any(feature = "async", feature = "parallel"))]
pub mod async_engine;

pub use compiler::{Bytecode, Compiler, SymbolTable};
pub use config::VmConfig;
pub use error::{CompileError, Error, Result, RuntimeError, SyntaxError};
pub use runtime::value::Value;
pub use vm::VM;

#[cfg(feature = "async")]
pub use async_engine::AsyncEngine;
#[cfg(feature = "parallel")]
pub use async_engine::ParallelExecutor;

use std::mem;
use std::path::Path;

use parser::Parser;

/// The main Quill engine instance.
///
/// Carries compiler and VM state between evaluations, so that globals
/// defined by one call to [`eval`](Engine::eval) are visible to the next.
pub struct Engine {
    /// Limits for each VM run
    config: VmConfig,
    /// Global and builtin bindings known to the compiler
    symbol_table: SymbolTable,
    /// Constant pool shared by every evaluation
    constants: Vec<Value>,
    /// Global slots carried from the previous run
    globals: Vec<Value>,
}

impl Engine {
    /// Creates a new engine with the default limits.
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    /// Creates a new engine with the given VM limits.
    pub fn with_config(config: VmConfig) -> Self {
        let (symbol_table, constants) = Compiler::new().into_state();
        Self {
            config,
            symbol_table,
            constants,
            globals: Vec::new(),
        }
    }

    /// The VM limits used by this engine.
    pub fn config(&self) -> VmConfig {
        self.config
    }

    /// Evaluates Quill source code and returns the value of the last
    /// expression statement, or null if there was none.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use quill_vm::{Engine, Value};
    /// let mut engine = Engine::new();
    /// assert_eq!(engine.eval("2 + 2").unwrap(), Value::Integer(4));
    /// ```
    pub fn eval(&mut self, source: &str) -> Result<Value> {
        let program = Parser::new(source).parse_program()?;

        let mut compiler = Compiler::with_state(self.symbol_table.clone(), self.constants.clone());
        let bytecode = compiler.compile(&program)?;
        (self.symbol_table, self.constants) = compiler.into_state();

        let globals = mem::take(&mut self.globals);
        let mut vm = VM::with_globals(bytecode, self.config, globals);
        let outcome = vm.run();
        let value = vm.last_popped();
        self.globals = vm.into_globals();

        outcome?;
        Ok(value)
    }

    /// Compiles source code against the current bindings without running it
    /// or changing the engine's state.
    pub fn compile(&self, source: &str) -> Result<Bytecode> {
        let program = Parser::new(source).parse_program()?;
        let mut compiler = Compiler::with_state(self.symbol_table.clone(), self.constants.clone());
        Ok(compiler.compile(&program)?)
    }

    /// Evaluates Quill source code from a file.
    pub fn eval_file(&mut self, path: impl AsRef<Path>) -> Result<Value> {
        let source = std::fs::read_to_string(path)?;
        self.eval(&source)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
