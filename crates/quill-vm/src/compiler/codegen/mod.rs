//! Code generation from AST to bytecode.
//!
//! This module contains the `Compiler` which transforms a parsed Quill
//! program into a [`Bytecode`] bundle for the VM.
//!
//! ## Structure
//!
//! - `statements` - let, assignment, return and expression statements
//! - `expressions` - literals, operators, conditionals, functions, calls
//! - `scope` - per-function instruction buffers
//! - `symbol_table` - name resolution and free-variable capture

mod expressions;
mod scope;
mod statements;
mod symbol_table;


pub use scope::{CompilationScope, EmittedInstruction};
pub use symbol_table::{Resolution, Symbol, SymbolScope, SymbolTable};

use std::mem;

use tracing::debug;

use crate::ast::Program;
use crate::builtins::BUILTINS;
use crate::compiler::bytecode::{make, Bytecode, Instructions, Opcode};
use crate::error::{CodeError, CompileError};
use crate::runtime::value::Value;

/// Compiles AST to bytecode.
///
/// The symbol table and constant pool persist across calls to
/// [`compile`](Compiler::compile), so successive programs can refer to each
/// other's globals. A compiler that returned an error should be discarded.
pub struct Compiler {
    /// The constant pool shared by every function
    constants: Vec<Value>,
    /// Bindings of the scope being compiled
    symbol_table: SymbolTable,
    /// Instruction buffer of the function being compiled
    scope: CompilationScope,
    /// Buffers of the enclosing functions, innermost last
    enclosing: Vec<CompilationScope>,
}

impl Compiler {
    /// Creates a new compiler with the builtins registered.
    pub fn new() -> Self {
        let mut symbol_table = SymbolTable::new();
        for (index, builtin) in BUILTINS.iter().enumerate() {
            symbol_table.define_builtin(index, builtin.name);
        }
        Self::with_state(symbol_table, Vec::new())
    }

    /// Creates a compiler that continues from a previous compilation.
    pub fn with_state(symbol_table: SymbolTable, constants: Vec<Value>) -> Self {
        Self {
            constants,
            symbol_table,
            scope: CompilationScope::new(),
            enclosing: Vec::new(),
        }
    }

    /// Consumes the compiler, returning the state needed to continue later.
    pub fn into_state(self) -> (SymbolTable, Vec<Value>) {
        (self.symbol_table, self.constants)
    }

    // ========================================================================
    // Main Compilation Entry Point
    // ========================================================================

    /// Compiles a program AST to bytecode.
    pub fn compile(&mut self, program: &Program) -> Result<Bytecode, CompileError> {
        for stmt in &program.body {
            self.compile_statement(stmt)?;
        }

        let scope = mem::take(&mut self.scope);
        let bytecode = Bytecode {
            instructions: scope.instructions,
            constants: self.constants.clone(),
        };

        debug!(
            instructions = bytecode.instructions.len(),
            constants = bytecode.constants.len(),
            globals = self.symbol_table.num_definitions(),
            "compiled program"
        );

        Ok(bytecode)
    }

    // ========================================================================
    // Emission helpers
    // ========================================================================

    /// Encodes and appends an instruction, returning its position.
    fn emit(&mut self, opcode: Opcode, operands: &[usize]) -> Result<usize, CompileError> {
        let instruction = make(opcode, operands)?;
        Ok(self.scope.push(opcode, &instruction))
    }

    /// Appends a value to the constant pool and returns its index.
    fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Re-encodes the instruction at `position` with a new operand.
    fn change_operand(&mut self, position: usize, operand: usize) -> Result<(), CompileError> {
        let byte = self
            .scope
            .instructions
            .get(position)
            .copied()
            .ok_or(CodeError::Truncated { offset: position })?;
        let instruction = make(Opcode::try_from(byte)?, &[operand])?;
        self.scope.replace_instruction(position, &instruction)?;
        Ok(())
    }

    /// Offset of the next instruction to be emitted.
    fn current_position(&self) -> usize {
        self.scope.instructions.len()
    }

    /// Emits the load matching where the symbol lives.
    fn load_symbol(&mut self, symbol: &Symbol) -> Result<(), CompileError> {
        match symbol.scope {
            SymbolScope::Global => self.emit(Opcode::GetGlobal, &[symbol.index])?,
            SymbolScope::Local => self.emit(Opcode::GetLocal, &[symbol.index])?,
            SymbolScope::Builtin => self.emit(Opcode::GetBuiltin, &[symbol.index])?,
            SymbolScope::Free => self.emit(Opcode::GetFree, &[symbol.index])?,
            SymbolScope::Function => self.emit(Opcode::CurrentClosure, &[])?,
        };
        Ok(())
    }

    // ========================================================================
    // Scopes
    // ========================================================================

    fn enter_scope(&mut self) {
        self.enclosing.push(mem::take(&mut self.scope));
        let outer = mem::take(&mut self.symbol_table);
        self.symbol_table = SymbolTable::new_enclosed(outer);
    }

    /// Leaves the current function scope, returning its instructions and
    /// its symbol table.
    fn leave_scope(&mut self) -> (Instructions, SymbolTable) {
        let outer_scope = self.enclosing.pop().unwrap_or_default();
        let scope = mem::replace(&mut self.scope, outer_scope);

        let table = self
            .symbol_table
            .take_outer()
            .map(|outer| mem::replace(&mut self.symbol_table, outer))
            .unwrap_or_default();

        (scope.instructions, table)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
