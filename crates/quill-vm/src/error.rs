// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the Quill toolchain.
//!
//! Each stage of the pipeline has its own error domain. They are unified by
//! [`Error`], which is what the [`Engine`](crate::Engine) hands back to hosts.

use thiserror::Error;

/// Result type for Quill operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error returned by the engine.
#[derive(Error, Debug)]
pub enum Error {
    /// The source text could not be parsed
    #[error("SyntaxError: {0}")]
    Syntax(#[from] SyntaxError),

    /// The program could not be compiled
    #[error("CompileError: {0}")]
    Compile(#[from] CompileError),

    /// Execution aborted
    #[error("RuntimeError: {0}")]
    Runtime(#[from] RuntimeError),

    /// A source file could not be read
    #[error("IOError: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors produced by the parser.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    /// A token appeared where the grammar does not allow it
    #[error("expected {expected}, found {found} at offset {offset}")]
    UnexpectedToken {
        expected: String,
        found: String,
        offset: usize,
    },

    /// An integer literal does not fit in 64 bits
    #[error("could not parse {literal} as integer at offset {offset}")]
    InvalidInteger { literal: String, offset: usize },

    /// A string literal is missing its closing quote
    #[error("unterminated string at offset {offset}")]
    UnterminatedString { offset: usize },

    /// A character that is not part of the language
    #[error("illegal character {ch:?} at offset {offset}")]
    IllegalCharacter { ch: char, offset: usize },
}

/// Errors raised while encoding or decoding a single instruction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeError {
    /// The byte does not name a registered opcode
    #[error("opcode {0} undefined")]
    UnknownOpcode(u8),

    /// Wrong number of operands supplied for an opcode
    #[error("{op} expects {expected} operand(s), got {got}")]
    OperandCount {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    /// An operand does not fit in its declared width
    #[error("operand {value} of {op} does not fit in {width} byte(s)")]
    OperandOutOfRange {
        op: &'static str,
        value: usize,
        width: usize,
    },

    /// The stream ends in the middle of an instruction
    #[error("instruction at offset {offset} is truncated")]
    Truncated { offset: usize },
}

/// Errors produced by the compiler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A name that no enclosing scope defines
    #[error("undefined variable {0}")]
    UndefinedVariable(String),

    /// An operator the instruction set has no opcode for
    #[error("unknown operator {0}")]
    UnknownOperator(String),

    /// Assignment to something that is not a global or local binding
    #[error("cannot assign to {0}")]
    InvalidAssignment(String),

    /// A hash literal key that can never be hashed
    #[error("unusable as hash key: {0}")]
    UnhashableLiteral(String),

    /// An instruction could not be encoded
    #[error(transparent)]
    Code(#[from] CodeError),
}

/// Errors that abort execution in the VM.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Binary operator applied to operands of different types
    #[error("type mismatch: {left} {op} {right}")]
    TypeMismatch {
        left: &'static str,
        op: &'static str,
        right: &'static str,
    },

    /// Operator not defined for the operand types, e.g. `-BOOLEAN`
    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    /// Integer division by zero
    #[error("division by zero")]
    DivisionByZero,

    /// Call target is neither a closure nor a builtin
    #[error("calling non-function: {0}")]
    NotCallable(&'static str),

    /// Closure called with the wrong number of arguments
    #[error("wrong number of arguments: want={want}, got={got}")]
    WrongArgumentCount { want: usize, got: usize },

    /// Value used as a hash key that cannot be hashed
    #[error("unusable as hash key: {0}")]
    UnhashableKey(&'static str),

    /// Index operator applied to an unsupported pair
    #[error("index operator not supported: {0}")]
    IndexNotSupported(String),

    /// Closure instruction referencing a constant that is not a function
    #[error("not a function: {0}")]
    NotAFunction(String),

    /// Operand referring to a constant, global, builtin or capture that does not exist
    #[error("invalid operand {operand} for {op}")]
    InvalidOperand { op: &'static str, operand: usize },

    /// Value stack capacity exceeded
    #[error("stack overflow")]
    StackOverflow,

    /// Pop from an empty value stack
    #[error("stack underflow")]
    StackUnderflow,

    /// Frame stack capacity exceeded
    #[error("maximum call depth of {0} exceeded")]
    FrameOverflow(usize),

    /// No frame left to execute
    #[error("frame stack underflow")]
    FrameUnderflow,

    /// Return executed by the program's initial frame
    #[error("return outside function")]
    ReturnOutsideFunction,

    /// Instruction byte that names no opcode
    #[error("unknown opcode {0}")]
    UnknownOpcode(u8),

    /// Instruction stream ends inside an operand
    #[error("truncated instruction at offset {0}")]
    TruncatedInstruction(usize),

    /// A builtin rejected its arguments
    #[error("{name}: {message}")]
    Builtin { name: &'static str, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_prefixes() {
        let err: Error = CompileError::UndefinedVariable("x".into()).into();
        assert_eq!(err.to_string(), "CompileError: undefined variable x");

        let err: Error = RuntimeError::DivisionByZero.into();
        assert_eq!(err.to_string(), "RuntimeError: division by zero");

        let err: Error = SyntaxError::UnterminatedString { offset: 4 }.into();
        assert_eq!(err.to_string(), "SyntaxError: unterminated string at offset 4");
    }

    #[test]
    fn test_compile_error_wraps_code_error() {
        let err = CompileError::from(CodeError::UnknownOpcode(200));
        assert_eq!(err.to_string(), "opcode 200 undefined");
    }
}
