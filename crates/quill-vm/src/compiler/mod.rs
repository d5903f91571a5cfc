//! Bytecode compiler for Quill.
//!
//! Transforms AST into bytecode that can be executed by the VM.
//!
//! # Module Structure
//!
//! - `bytecode`: Instruction set, encoder/decoder and disassembly
//! - `codegen`: Code generation from AST
//!   - `codegen::scope`: Per-function instruction buffers
//!   - `codegen::symbol_table`: Name resolution and closure capture

pub mod bytecode;
pub mod codegen;

pub use bytecode::{Bytecode, Definition, Instructions, Opcode};
pub use codegen::{Compiler, Resolution, Symbol, SymbolScope, SymbolTable};
