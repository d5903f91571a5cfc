//! The bytecode interpreter.

use std::sync::Arc;

use tracing::{debug, trace};

use super::frame::Frame;
use crate::builtins;
use crate::compiler::bytecode::{read_u16, read_u8, Bytecode, Opcode};
use crate::config::VmConfig;
use crate::error::RuntimeError;
use crate::runtime::function::{Builtin, Closure, CompiledFunction};
use crate::runtime::value::{HashTable, Value};
use crate::runtime::HashPair;

/// A stack-based virtual machine executing one compiled program.
///
/// The value stack, frame stack and global slots all have fixed capacities
/// taken from [`VmConfig`].
pub struct VM {
    /// Resource limits
    config: VmConfig,
    /// The program's constant pool
    constants: Vec<Value>,
    /// The value stack, pre-filled to capacity
    stack: Vec<Value>,
    /// Index of the first free stack slot
    sp: usize,
    /// Global slots, indexed by compile-time global index
    globals: Vec<Value>,
    /// Active call frames, the program's own frame first
    frames: Vec<Frame>,
    /// Value removed by the most recent top-level `Pop`
    last_popped: Value,
}

impl VM {
    /// Creates a VM for `bytecode` with the default limits.
    pub fn new(bytecode: Bytecode) -> Self {
        Self::with_config(bytecode, VmConfig::default())
    }

    /// Creates a VM for `bytecode` with the given limits.
    pub fn with_config(bytecode: Bytecode, config: VmConfig) -> Self {
        Self::with_globals(bytecode, config, Vec::new())
    }

    /// Creates a VM that continues with the globals of a previous run.
    pub fn with_globals(bytecode: Bytecode, config: VmConfig, mut globals: Vec<Value>) -> Self {
        globals.resize(config.globals_size.max(globals.len()), Value::Null);

        let main_fn = CompiledFunction::new(None, bytecode.instructions, 0, 0);
        let main_closure = Arc::new(Closure::new(Arc::new(main_fn), Vec::new()));

        let mut frames = Vec::with_capacity(config.max_frames.min(64));
        frames.push(Frame::new(main_closure, 0));

        Self {
            config,
            constants: bytecode.constants,
            stack: vec![Value::Null; config.stack_size],
            sp: 0,
            globals,
            frames,
            last_popped: Value::Null,
        }
    }

    /// The value at the top of the stack, if any.
    pub fn stack_top(&self) -> Option<&Value> {
        self.sp.checked_sub(1).and_then(|top| self.stack.get(top))
    }

    /// The value discarded by the most recent expression statement.
    ///
    /// Null until a top-level expression statement has run. Stores into
    /// globals or locals, and statements inside called functions, do not
    /// change it.
    pub fn last_popped(&self) -> Value {
        self.last_popped.clone()
    }

    /// The global slots.
    pub fn globals(&self) -> &[Value] {
        &self.globals
    }

    /// Consumes the VM, returning its global slots.
    pub fn into_globals(self) -> Vec<Value> {
        self.globals
    }

    /// Runs the program to completion.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        let result = self.execute();
        if let Err(err) = &result {
            debug!(error = %err, depth = self.frames.len(), "runtime error");
        }
        result
    }

    fn execute(&mut self) -> Result<(), RuntimeError> {
        loop {
            let frame = self.current_frame_mut()?;
            let next = (frame.ip + 1) as usize;
            let instructions = frame.instructions();

            let Some(&byte) = instructions.get(next) else {
                // Falling off the end of a function returns null.
                if self.frames.len() == 1 {
                    return Ok(());
                }
                self.return_from_frame(Value::Null)?;
                continue;
            };

            let opcode = Opcode::try_from(byte).map_err(|_| RuntimeError::UnknownOpcode(byte))?;
            frame.ip = next as isize;

            match opcode {
                Opcode::Constant => {
                    let index = self.read_u16_operand()?;
                    let value = self
                        .constants
                        .get(index)
                        .cloned()
                        .ok_or(RuntimeError::InvalidOperand {
                            op: "Constant",
                            operand: index,
                        })?;
                    self.push(value)?;
                }

                Opcode::Pop => {
                    let value = self.pop()?;
                    // Only top-level expression statements produce the result.
                    if self.frames.len() == 1 {
                        self.last_popped = value;
                    }
                }

                Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div => {
                    self.execute_binary_operation(opcode)?;
                }

                Opcode::Equal | Opcode::NotEqual | Opcode::GreaterThan => {
                    self.execute_comparison(opcode)?;
                }

                Opcode::True => self.push(Value::Boolean(true))?,
                Opcode::False => self.push(Value::Boolean(false))?,
                Opcode::Null => self.push(Value::Null)?,

                Opcode::Bang => {
                    let operand = self.pop()?;
                    self.push(Value::Boolean(!operand.is_truthy()))?;
                }

                Opcode::Minus => {
                    let operand = self.pop()?;
                    match operand {
                        Value::Integer(n) => self.push(Value::Integer(n.wrapping_neg()))?,
                        other => {
                            return Err(RuntimeError::UnknownOperator(format!(
                                "-{}",
                                other.type_name()
                            )));
                        }
                    }
                }

                Opcode::Jump => {
                    let target = self.read_u16_operand()?;
                    self.jump_to(target)?;
                }

                Opcode::JumpNotTruthy => {
                    let target = self.read_u16_operand()?;
                    let condition = self.pop()?;
                    if !condition.is_truthy() {
                        self.jump_to(target)?;
                    }
                }

                Opcode::SetGlobal => {
                    let index = self.read_u16_operand()?;
                    let value = self.pop()?;
                    let slot = self.globals.get_mut(index).ok_or(RuntimeError::InvalidOperand {
                        op: "SetGlobal",
                        operand: index,
                    })?;
                    *slot = value;
                }

                Opcode::GetGlobal => {
                    let index = self.read_u16_operand()?;
                    let value = self
                        .globals
                        .get(index)
                        .cloned()
                        .ok_or(RuntimeError::InvalidOperand {
                            op: "GetGlobal",
                            operand: index,
                        })?;
                    self.push(value)?;
                }

                Opcode::SetLocal => {
                    let index = self.read_u8_operand()?;
                    let value = self.pop()?;
                    let slot = self.current_frame()?.base_pointer + index;
                    *self.local_slot(slot)? = value;
                }

                Opcode::GetLocal => {
                    let index = self.read_u8_operand()?;
                    let slot = self.current_frame()?.base_pointer + index;
                    let value = self.local_slot(slot)?.clone();
                    self.push(value)?;
                }

                Opcode::GetBuiltin => {
                    let index = self.read_u8_operand()?;
                    let builtin = builtins::get(index).ok_or(RuntimeError::InvalidOperand {
                        op: "GetBuiltin",
                        operand: index,
                    })?;
                    self.push(Value::Builtin(builtin))?;
                }

                Opcode::GetFree => {
                    let index = self.read_u8_operand()?;
                    let value = self
                        .current_frame()?
                        .closure
                        .free
                        .get(index)
                        .cloned()
                        .ok_or(RuntimeError::InvalidOperand {
                            op: "GetFree",
                            operand: index,
                        })?;
                    self.push(value)?;
                }

                Opcode::CurrentClosure => {
                    let closure = self.current_frame()?.closure.clone();
                    self.push(Value::Closure(closure))?;
                }

                Opcode::Array => {
                    let count = self.read_u16_operand()?;
                    let elements = self.take_top(count)?;
                    self.push(Value::array(elements))?;
                }

                Opcode::Hash => {
                    let count = self.read_u16_operand()?;
                    let entries = self.take_top(count)?;
                    let hash = build_hash(entries)?;
                    self.push(hash)?;
                }

                Opcode::Index => {
                    let index = self.pop()?;
                    let collection = self.pop()?;
                    let element = execute_index(&collection, &index)?;
                    self.push(element)?;
                }

                Opcode::Call => {
                    let argc = self.read_u8_operand()?;
                    self.execute_call(argc)?;
                }

                Opcode::ReturnValue => {
                    let value = self.pop()?;
                    self.return_from_frame(value)?;
                }

                Opcode::Return => {
                    self.return_from_frame(Value::Null)?;
                }

                Opcode::Closure => {
                    let const_index = self.read_u16_operand()?;
                    let num_free = self.read_u8_operand()?;
                    self.push_closure(const_index, num_free)?;
                }
            }
        }
    }

    // ========================================================================
    // Frames
    // ========================================================================

    fn current_frame(&self) -> Result<&Frame, RuntimeError> {
        self.frames
            .last()
            .ok_or(RuntimeError::FrameUnderflow)
    }

    fn current_frame_mut(&mut self) -> Result<&mut Frame, RuntimeError> {
        self.frames
            .last_mut()
            .ok_or(RuntimeError::FrameUnderflow)
    }

    fn read_u16_operand(&mut self) -> Result<usize, RuntimeError> {
        let frame = self.current_frame_mut()?;
        let offset = (frame.ip + 1) as usize;
        let operand = read_u16(frame.instructions(), offset)
            .map_err(|_| RuntimeError::TruncatedInstruction(offset))?;
        frame.ip += 2;
        Ok(operand as usize)
    }

    fn read_u8_operand(&mut self) -> Result<usize, RuntimeError> {
        let frame = self.current_frame_mut()?;
        let offset = (frame.ip + 1) as usize;
        let operand = read_u8(frame.instructions(), offset)
            .map_err(|_| RuntimeError::TruncatedInstruction(offset))?;
        frame.ip += 1;
        Ok(operand as usize)
    }

    /// Positions the current frame so the next fetch reads `target`.
    fn jump_to(&mut self, target: usize) -> Result<(), RuntimeError> {
        self.current_frame_mut()?.ip = target as isize - 1;
        Ok(())
    }

    fn execute_call(&mut self, argc: usize) -> Result<(), RuntimeError> {
        let callee_slot = self
            .sp
            .checked_sub(argc + 1)
            .ok_or(RuntimeError::StackUnderflow)?;

        match self.stack[callee_slot].clone() {
            Value::Closure(closure) => self.call_closure(closure, argc),
            Value::Builtin(builtin) => self.call_builtin(builtin, argc),
            other => Err(RuntimeError::NotCallable(other.type_name())),
        }
    }

    fn call_closure(&mut self, closure: Arc<Closure>, argc: usize) -> Result<(), RuntimeError> {
        let func = &closure.func;
        if argc != func.num_parameters {
            return Err(RuntimeError::WrongArgumentCount {
                want: func.num_parameters,
                got: argc,
            });
        }
        if self.frames.len() >= self.config.max_frames {
            return Err(RuntimeError::FrameOverflow(self.config.max_frames));
        }

        let base_pointer = self.sp - argc;
        let new_sp = base_pointer + func.num_locals.max(argc);
        if new_sp > self.stack.len() {
            return Err(RuntimeError::StackOverflow);
        }

        // Locals other than the parameters start out null.
        for slot in &mut self.stack[self.sp..new_sp] {
            *slot = Value::Null;
        }

        trace!(function = %func, depth = self.frames.len() + 1, "call");
        self.frames.push(Frame::new(closure, base_pointer));
        self.sp = new_sp;
        Ok(())
    }

    fn call_builtin(&mut self, builtin: Builtin, argc: usize) -> Result<(), RuntimeError> {
        let args = &self.stack[self.sp - argc..self.sp];
        let result = (builtin.func)(args).map_err(|message| RuntimeError::Builtin {
            name: builtin.name,
            message,
        })?;

        self.sp -= argc + 1;
        self.push(result)
    }

    fn return_from_frame(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.frames.len() <= 1 {
            return Err(RuntimeError::ReturnOutsideFunction);
        }
        let frame = self.frames.pop().ok_or(RuntimeError::FrameUnderflow)?;
        trace!(function = %frame.closure.func, depth = self.frames.len(), "return");

        // Also drops the callee itself, which sits just below the base pointer.
        self.sp = frame.base_pointer - 1;
        self.push(value)
    }

    fn push_closure(&mut self, const_index: usize, num_free: usize) -> Result<(), RuntimeError> {
        let func = match self.constants.get(const_index) {
            Some(Value::CompiledFunction(func)) => func.clone(),
            Some(other) => return Err(RuntimeError::NotAFunction(other.to_string())),
            None => {
                return Err(RuntimeError::InvalidOperand {
                    op: "Closure",
                    operand: const_index,
                });
            }
        };

        let free = self.take_top(num_free)?;
        self.push(Value::Closure(Arc::new(Closure::new(func, free))))
    }

    // ========================================================================
    // Stack
    // ========================================================================

    fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        let slot = self.stack.get_mut(self.sp).ok_or(RuntimeError::StackOverflow)?;
        *slot = value;
        self.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        if self.sp == 0 {
            return Err(RuntimeError::StackUnderflow);
        }
        self.sp -= 1;
        Ok(self.stack[self.sp].clone())
    }

    fn local_slot(&mut self, slot: usize) -> Result<&mut Value, RuntimeError> {
        if slot >= self.sp {
            return Err(RuntimeError::InvalidOperand {
                op: "local",
                operand: slot,
            });
        }
        Ok(&mut self.stack[slot])
    }

    /// Removes the top `count` values, returning them bottom first.
    fn take_top(&mut self, count: usize) -> Result<Vec<Value>, RuntimeError> {
        let start = self
            .sp
            .checked_sub(count)
            .ok_or(RuntimeError::StackUnderflow)?;
        let values = self.stack[start..self.sp].to_vec();
        self.sp = start;
        Ok(values)
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn execute_binary_operation(&mut self, opcode: Opcode) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;

        let result = match (&left, &right) {
            (Value::Integer(l), Value::Integer(r)) => Value::Integer(integer_operation(opcode, *l, *r)?),
            (Value::String(l), Value::String(r)) if opcode == Opcode::Add => {
                let mut joined = String::with_capacity(l.len() + r.len());
                joined.push_str(l);
                joined.push_str(r);
                Value::String(joined)
            }
            _ => return Err(operator_error(opcode, &left, &right)),
        };

        self.push(result)
    }

    fn execute_comparison(&mut self, opcode: Opcode) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;

        let result = match (&left, &right, opcode) {
            (Value::Integer(l), Value::Integer(r), Opcode::GreaterThan) => l > r,
            (Value::Integer(l), Value::Integer(r), _) => compare_equal(opcode, l == r),
            (Value::String(l), Value::String(r), Opcode::Equal | Opcode::NotEqual) => {
                compare_equal(opcode, l == r)
            }
            (Value::Boolean(l), Value::Boolean(r), Opcode::Equal | Opcode::NotEqual) => {
                compare_equal(opcode, l == r)
            }
            (Value::Null, Value::Null, Opcode::Equal | Opcode::NotEqual) => {
                compare_equal(opcode, true)
            }
            _ => return Err(operator_error(opcode, &left, &right)),
        };

        self.push(Value::Boolean(result))
    }
}

fn compare_equal(opcode: Opcode, equal: bool) -> bool {
    if opcode == Opcode::NotEqual { !equal } else { equal }
}

fn integer_operation(opcode: Opcode, left: i64, right: i64) -> Result<i64, RuntimeError> {
    match opcode {
        Opcode::Add => Ok(left.wrapping_add(right)),
        Opcode::Sub => Ok(left.wrapping_sub(right)),
        Opcode::Mul => Ok(left.wrapping_mul(right)),
        Opcode::Div if right == 0 => Err(RuntimeError::DivisionByZero),
        Opcode::Div => Ok(left.wrapping_div(right)),
        other => Err(RuntimeError::UnknownOperator(format!(
            "INTEGER {} INTEGER",
            operator_symbol(other)
        ))),
    }
}

fn operator_symbol(opcode: Opcode) -> &'static str {
    match opcode {
        Opcode::Add => "+",
        Opcode::Sub => "-",
        Opcode::Mul => "*",
        Opcode::Div => "/",
        Opcode::Equal => "==",
        Opcode::NotEqual => "!=",
        Opcode::GreaterThan => ">",
        other => other.name(),
    }
}

/// Type mismatch for operands of different types, unknown operator otherwise.
fn operator_error(opcode: Opcode, left: &Value, right: &Value) -> RuntimeError {
    let op = operator_symbol(opcode);
    if std::mem::discriminant(left) != std::mem::discriminant(right) {
        RuntimeError::TypeMismatch {
            left: left.type_name(),
            op,
            right: right.type_name(),
        }
    } else {
        RuntimeError::UnknownOperator(format!("{} {} {}", left.type_name(), op, right.type_name()))
    }
}

fn build_hash(entries: Vec<Value>) -> Result<Value, RuntimeError> {
    let mut table = HashTable::default();
    let mut entries = entries.into_iter();

    while let (Some(key), Some(value)) = (entries.next(), entries.next()) {
        let hash_key = key
            .hash_key()
            .ok_or(RuntimeError::UnhashableKey(key.type_name()))?;
        table.insert(hash_key, HashPair { key, value });
    }

    Ok(Value::Hash(Arc::new(table)))
}

fn execute_index(collection: &Value, index: &Value) -> Result<Value, RuntimeError> {
    match (collection, index) {
        (Value::Array(elements), Value::Integer(i)) => Ok(usize::try_from(*i)
            .ok()
            .and_then(|i| elements.get(i))
            .cloned()
            .unwrap_or(Value::Null)),
        (Value::Hash(table), key) => {
            let hash_key = key
                .hash_key()
                .ok_or(RuntimeError::UnhashableKey(key.type_name()))?;
            Ok(table
                .get(&hash_key)
                .map(|pair| pair.value.clone())
                .unwrap_or(Value::Null))
        }
        (collection, index) => Err(RuntimeError::IndexNotSupported(format!(
            "{}[{}]",
            collection.type_name(),
            index.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_frame_stack_is_frame_underflow() {
        let mut vm = VM::new(Bytecode::default());
        vm.frames.clear();

        assert_eq!(vm.run(), Err(RuntimeError::FrameUnderflow));
        assert!(matches!(vm.current_frame(), Err(RuntimeError::FrameUnderflow)));
    }
}
