//! Expression compilation.
//!
//! Every expression leaves exactly one value on the stack.
//!
//! ```text
//! Expression: 1 + 2 * 3
//!
//! Bytecode:
//!   Constant 0      ; stack: [1]
//!   Constant 1      ; stack: [1, 2]
//!   Constant 2      ; stack: [1, 2, 3]
//!   Mul             ; stack: [1, 6]
//!   Add             ; stack: [7]
//! ```
//!
//! ## Conditionals
//!
//! ```text
//! if (c) { a } else { b }
//!
//!   [compile c]
//!   JumpNotTruthy else
//!   [compile a]      ; trailing Pop removed
//!   Jump end
//! else:
//!   [compile b]      ; or Null when there is no else branch
//! end:
//! ```
//!
//! Both jumps are emitted with a placeholder operand and patched in place
//! once the target offset is known.

use std::sync::Arc;

use super::Compiler;
use crate::ast::*;
use crate::compiler::bytecode::Opcode;
use crate::error::CompileError;
use crate::runtime::function::CompiledFunction;
use crate::runtime::value::Value;

/// Operand written before a jump target is known.
const PLACEHOLDER: usize = 9999;

impl Compiler {
    pub(super) fn compile_expression(&mut self, expr: &Expression) -> Result<(), CompileError> {
        match expr {
            Expression::Integer(n) => {
                let index = self.add_constant(Value::Integer(*n));
                self.emit(Opcode::Constant, &[index])?;
            }
            Expression::String(s) => {
                let index = self.add_constant(Value::String(s.clone()));
                self.emit(Opcode::Constant, &[index])?;
            }
            Expression::Boolean(true) => {
                self.emit(Opcode::True, &[])?;
            }
            Expression::Boolean(false) => {
                self.emit(Opcode::False, &[])?;
            }
            Expression::Identifier(id) => {
                let symbol = self
                    .symbol_table
                    .lookup(&id.name)
                    .ok_or_else(|| CompileError::UndefinedVariable(id.name.clone()))?;
                self.load_symbol(&symbol)?;
            }
            Expression::Unary(unary) => self.compile_unary(unary)?,
            Expression::Binary(binary) => self.compile_binary(binary)?,
            Expression::If(if_expr) => self.compile_if(if_expr)?,
            Expression::Function(func) => self.compile_function(func)?,
            Expression::Call(call) => {
                self.compile_expression(&call.callee)?;
                for arg in &call.arguments {
                    self.compile_expression(arg)?;
                }
                self.emit(Opcode::Call, &[call.arguments.len()])?;
            }
            Expression::Array(elements) => {
                for element in elements {
                    self.compile_expression(element)?;
                }
                self.emit(Opcode::Array, &[elements.len()])?;
            }
            Expression::Hash(pairs) => self.compile_hash(pairs)?,
            Expression::Index(index) => {
                self.compile_expression(&index.object)?;
                self.compile_expression(&index.index)?;
                self.emit(Opcode::Index, &[])?;
            }
        }
        Ok(())
    }

    fn compile_unary(&mut self, unary: &UnaryExpression) -> Result<(), CompileError> {
        let opcode = match unary.operator {
            UnaryOperator::Minus => Opcode::Minus,
            UnaryOperator::Not => Opcode::Bang,
            UnaryOperator::Plus => {
                return Err(CompileError::UnknownOperator(
                    unary.operator.as_str().to_string(),
                ));
            }
        };
        self.compile_expression(&unary.argument)?;
        self.emit(opcode, &[])?;
        Ok(())
    }

    fn compile_binary(&mut self, binary: &BinaryExpression) -> Result<(), CompileError> {
        // `a < b` is compiled as `b > a`.
        let (opcode, swapped) = match binary.operator {
            BinaryOperator::Add => (Opcode::Add, false),
            BinaryOperator::Subtract => (Opcode::Sub, false),
            BinaryOperator::Multiply => (Opcode::Mul, false),
            BinaryOperator::Divide => (Opcode::Div, false),
            BinaryOperator::GreaterThan => (Opcode::GreaterThan, false),
            BinaryOperator::LessThan => (Opcode::GreaterThan, true),
            BinaryOperator::Equal => (Opcode::Equal, false),
            BinaryOperator::NotEqual => (Opcode::NotEqual, false),
        };

        if swapped {
            self.compile_expression(&binary.right)?;
            self.compile_expression(&binary.left)?;
        } else {
            self.compile_expression(&binary.left)?;
            self.compile_expression(&binary.right)?;
        }
        self.emit(opcode, &[])?;
        Ok(())
    }

    fn compile_if(&mut self, if_expr: &IfExpression) -> Result<(), CompileError> {
        self.compile_expression(&if_expr.condition)?;
        let jump_not_truthy = self.emit(Opcode::JumpNotTruthy, &[PLACEHOLDER])?;

        self.compile_branch(Some(&if_expr.consequent))?;
        let jump = self.emit(Opcode::Jump, &[PLACEHOLDER])?;

        let after_consequent = self.current_position();
        self.change_operand(jump_not_truthy, after_consequent)?;

        self.compile_branch(if_expr.alternate.as_ref())?;

        let after_alternate = self.current_position();
        self.change_operand(jump, after_alternate)?;
        Ok(())
    }

    /// Compiles a branch so that it leaves exactly one value on the stack.
    fn compile_branch(&mut self, block: Option<&BlockStatement>) -> Result<(), CompileError> {
        if let Some(block) = block {
            let start = self.current_position();
            self.compile_block(block)?;

            if self.current_position() > start && self.scope.last_is(Opcode::Pop) {
                self.scope.remove_last_pop();
                return Ok(());
            }
        }
        self.emit(Opcode::Null, &[])?;
        Ok(())
    }

    fn compile_function(&mut self, func: &FunctionLiteral) -> Result<(), CompileError> {
        self.enter_scope();

        if let Some(name) = &func.name {
            self.symbol_table.define_function_name(name);
        }
        for param in &func.params {
            self.symbol_table.define(&param.name);
        }

        self.compile_block(&func.body)?;

        if self.scope.last_is(Opcode::Pop) {
            self.scope.replace_last_pop_with_return()?;
        }
        if !self.scope.last_is(Opcode::ReturnValue) && !self.scope.last_is(Opcode::Return) {
            self.emit(Opcode::Return, &[])?;
        }

        let (instructions, table) = self.leave_scope();

        // Load each captured value in the enclosing scope, in capture order.
        for original in &table.free_symbols {
            self.load_symbol(original)?;
        }

        let compiled = CompiledFunction::new(
            func.name.clone(),
            instructions,
            table.num_definitions(),
            func.params.len(),
        );
        let index = self.add_constant(Value::CompiledFunction(Arc::new(compiled)));
        self.emit(Opcode::Closure, &[index, table.free_symbols.len()])?;
        Ok(())
    }

    fn compile_hash(&mut self, pairs: &[(Expression, Expression)]) -> Result<(), CompileError> {
        if let Some((key, _)) = pairs.iter().find(|(key, _)| {
            matches!(
                key,
                Expression::Function(_) | Expression::Array(_) | Expression::Hash(_)
            )
        }) {
            return Err(CompileError::UnhashableLiteral(key.to_string()));
        }

        // Ordered by rendered key so the output does not depend on source order.
        let mut sorted: Vec<&(Expression, Expression)> = pairs.iter().collect();
        sorted.sort_by_cached_key(|(key, _)| key.to_string());

        for (key, value) in sorted {
            self.compile_expression(key)?;
            self.compile_expression(value)?;
        }
        self.emit(Opcode::Hash, &[pairs.len() * 2])?;
        Ok(())
    }
}
