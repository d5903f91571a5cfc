//! Statement compilation.
//!
//! | Statement | Emitted code |
//! |-----------|--------------|
//! | `expr;` | expr, `Pop` |
//! | `let x = v;` | v, `SetGlobal`/`SetLocal` |
//! | `x = v;` | v, `SetGlobal`/`SetLocal` |
//! | `return v;` | v, `ReturnValue` |
//! | `return;` | `Return` |
//!
//! An expression statement leaves nothing behind: its value is discarded by
//! the trailing `Pop`, which the VM remembers as the last popped value.

use super::{Compiler, SymbolScope};
use crate::ast::{AssignStatement, BlockStatement, LetStatement, Statement};
use crate::compiler::bytecode::Opcode;
use crate::error::CompileError;

impl Compiler {
    pub(super) fn compile_statement(&mut self, stmt: &Statement) -> Result<(), CompileError> {
        match stmt {
            Statement::Expression(expr) => {
                self.compile_expression(expr)?;
                self.emit(Opcode::Pop, &[])?;
            }
            Statement::Let(let_stmt) => self.compile_let(let_stmt)?,
            Statement::Assign(assign) => self.compile_assign(assign)?,
            Statement::Return(Some(value)) => {
                self.compile_expression(value)?;
                self.emit(Opcode::ReturnValue, &[])?;
            }
            Statement::Return(None) => {
                self.emit(Opcode::Return, &[])?;
            }
        }
        Ok(())
    }

    pub(super) fn compile_block(&mut self, block: &BlockStatement) -> Result<(), CompileError> {
        for stmt in &block.body {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    fn compile_let(&mut self, let_stmt: &LetStatement) -> Result<(), CompileError> {
        // The value is compiled first so `let a = a + 1;` reads the old binding.
        self.compile_expression(&let_stmt.value)?;

        let symbol = self.symbol_table.define(&let_stmt.name.name);
        let opcode = match symbol.scope {
            SymbolScope::Global => Opcode::SetGlobal,
            _ => Opcode::SetLocal,
        };
        self.emit(opcode, &[symbol.index])?;
        Ok(())
    }

    fn compile_assign(&mut self, assign: &AssignStatement) -> Result<(), CompileError> {
        self.compile_expression(&assign.value)?;

        let name = &assign.name.name;
        let symbol = self
            .symbol_table
            .lookup(name)
            .ok_or_else(|| CompileError::UndefinedVariable(name.clone()))?;

        let opcode = match symbol.scope {
            SymbolScope::Global => Opcode::SetGlobal,
            SymbolScope::Local => Opcode::SetLocal,
            SymbolScope::Builtin | SymbolScope::Free | SymbolScope::Function => {
                return Err(CompileError::InvalidAssignment(name.clone()));
            }
        };
        self.emit(opcode, &[symbol.index])?;
        Ok(())
    }
}
