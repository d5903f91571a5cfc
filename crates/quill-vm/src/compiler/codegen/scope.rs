//! Per-function instruction buffers.

use crate::compiler::bytecode::{Instructions, Opcode};
use crate::error::CodeError;

/// An instruction that has been written to a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmittedInstruction {
    /// The opcode
    pub opcode: Opcode,
    /// Offset of the opcode byte
    pub position: usize,
}

/// The instruction buffer of one function body being compiled.
///
/// Remembers the last two emitted instructions so a trailing `Pop` can be
/// removed or turned into a return.
#[derive(Debug, Default)]
pub struct CompilationScope {
    /// The instructions emitted so far
    pub instructions: Instructions,
    /// The most recently emitted instruction
    pub last: Option<EmittedInstruction>,
    /// The instruction before `last`
    pub previous: Option<EmittedInstruction>,
}

impl CompilationScope {
    /// Creates an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an encoded instruction and returns its position.
    pub fn push(&mut self, opcode: Opcode, instruction: &[u8]) -> usize {
        let position = self.instructions.push(instruction);
        self.previous = self.last;
        self.last = Some(EmittedInstruction { opcode, position });
        position
    }

    /// Returns true if the last emitted instruction is `opcode`.
    pub fn last_is(&self, opcode: Opcode) -> bool {
        self.last.is_some_and(|last| last.opcode == opcode)
    }

    /// Removes the last instruction, which must be a `Pop`.
    pub fn remove_last_pop(&mut self) {
        if let Some(last) = self.last.filter(|last| last.opcode == Opcode::Pop) {
            self.instructions.truncate(last.position);
            self.last = self.previous.take();
        }
    }

    /// Turns a trailing `Pop` into a `ReturnValue`.
    ///
    /// Both are a single byte, so the stream length is unchanged.
    pub fn replace_last_pop_with_return(&mut self) -> Result<(), CodeError> {
        if let Some(last) = self.last.as_mut().filter(|last| last.opcode == Opcode::Pop) {
            self.instructions
                .replace(last.position, &[Opcode::ReturnValue as u8])?;
            last.opcode = Opcode::ReturnValue;
        }
        Ok(())
    }

    /// Overwrites the instruction at `position` with a re-encoded one.
    pub fn replace_instruction(
        &mut self,
        position: usize,
        instruction: &[u8],
    ) -> Result<(), CodeError> {
        self.instructions.replace(position, instruction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::bytecode::make;

    #[test]
    fn test_scope_tracks_last_two() {
        let mut scope = CompilationScope::new();
        scope.push(Opcode::True, &make(Opcode::True, &[]).unwrap());
        scope.push(Opcode::Pop, &make(Opcode::Pop, &[]).unwrap());

        assert_eq!(
            scope.previous,
            Some(EmittedInstruction {
                opcode: Opcode::True,
                position: 0
            })
        );
        assert!(scope.last_is(Opcode::Pop));
    }

    #[test]
    fn test_remove_last_pop() {
        let mut scope = CompilationScope::new();
        scope.push(Opcode::Constant, &make(Opcode::Constant, &[0]).unwrap());
        scope.push(Opcode::Pop, &make(Opcode::Pop, &[]).unwrap());

        scope.remove_last_pop();
        assert_eq!(scope.instructions.len(), 3);
        assert!(scope.last_is(Opcode::Constant));
    }

    #[test]
    fn test_remove_last_pop_ignores_other_opcodes() {
        let mut scope = CompilationScope::new();
        scope.push(Opcode::Null, &make(Opcode::Null, &[]).unwrap());

        scope.remove_last_pop();
        assert_eq!(scope.instructions.len(), 1);
    }

    #[test]
    fn test_replace_last_pop_with_return() {
        let mut scope = CompilationScope::new();
        scope.push(Opcode::Constant, &make(Opcode::Constant, &[0]).unwrap());
        scope.push(Opcode::Pop, &make(Opcode::Pop, &[]).unwrap());

        scope.replace_last_pop_with_return().unwrap();
        assert!(scope.last_is(Opcode::ReturnValue));
        assert_eq!(scope.instructions[3], Opcode::ReturnValue as u8);
    }
}
