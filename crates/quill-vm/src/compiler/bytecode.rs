//! Bytecode definitions.
//!
//! An instruction is one opcode byte followed by zero or more fixed-width,
//! big-endian operands. The width of each operand is given by the opcode's
//! [`Definition`].

use std::fmt;
use std::ops::Deref;

use crate::error::CodeError;
use crate::runtime::value::Value;

/// Operation codes for the VM.
///
/// The byte value of each opcode is its declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Push a constant onto the stack
    Constant,
    /// Add top two values
    Add,
    /// Pop the top value
    Pop,
    /// Subtract
    Sub,
    /// Multiply
    Mul,
    /// Divide
    Div,
    /// Push true
    True,
    /// Push false
    False,
    /// Equal (==)
    Equal,
    /// Not equal (!=)
    NotEqual,
    /// Greater than
    GreaterThan,
    /// Integer negation
    Minus,
    /// Logical not
    Bang,
    /// Pop and jump if falsy
    JumpNotTruthy,
    /// Unconditional jump
    Jump,
    /// Push null
    Null,
    /// Load a global variable
    GetGlobal,
    /// Store to a global variable
    SetGlobal,
    /// Build an array from the top N values
    Array,
    /// Build a hash from the top N values (keys and values interleaved)
    Hash,
    /// Index into an array or hash
    Index,
    /// Call a function
    Call,
    /// Return the top value from a function
    ReturnValue,
    /// Return null from a function
    Return,
    /// Load a local variable
    GetLocal,
    /// Store to a local variable
    SetLocal,
    /// Load a builtin function
    GetBuiltin,
    /// Create a closure
    Closure,
    /// Load a captured variable
    GetFree,
    /// Load the executing closure
    CurrentClosure,
}

/// The name and operand layout of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Definition {
    /// Mnemonic used in disassembly
    pub name: &'static str,
    /// Width in bytes of each operand
    pub operand_widths: &'static [usize],
}

impl Definition {
    /// Total encoded size of an instruction with this definition.
    pub fn size(&self) -> usize {
        1 + self.operand_widths.iter().sum::<usize>()
    }
}

impl Opcode {
    /// Every opcode, indexed by its byte value.
    pub const ALL: [Opcode; 30] = [
        Opcode::Constant,
        Opcode::Add,
        Opcode::Pop,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::True,
        Opcode::False,
        Opcode::Equal,
        Opcode::NotEqual,
        Opcode::GreaterThan,
        Opcode::Minus,
        Opcode::Bang,
        Opcode::JumpNotTruthy,
        Opcode::Jump,
        Opcode::Null,
        Opcode::GetGlobal,
        Opcode::SetGlobal,
        Opcode::Array,
        Opcode::Hash,
        Opcode::Index,
        Opcode::Call,
        Opcode::ReturnValue,
        Opcode::Return,
        Opcode::GetLocal,
        Opcode::SetLocal,
        Opcode::GetBuiltin,
        Opcode::Closure,
        Opcode::GetFree,
        Opcode::CurrentClosure,
    ];

    /// Returns the definition of this opcode.
    pub fn definition(self) -> Definition {
        let (name, operand_widths): (&'static str, &'static [usize]) = match self {
            Opcode::Constant => ("Constant", &[2]),
            Opcode::Add => ("Add", &[]),
            Opcode::Pop => ("Pop", &[]),
            Opcode::Sub => ("Sub", &[]),
            Opcode::Mul => ("Mul", &[]),
            Opcode::Div => ("Div", &[]),
            Opcode::True => ("True", &[]),
            Opcode::False => ("False", &[]),
            Opcode::Equal => ("Equal", &[]),
            Opcode::NotEqual => ("NotEqual", &[]),
            Opcode::GreaterThan => ("GreaterThan", &[]),
            Opcode::Minus => ("Minus", &[]),
            Opcode::Bang => ("Bang", &[]),
            Opcode::JumpNotTruthy => ("JumpNotTruthy", &[2]),
            Opcode::Jump => ("Jump", &[2]),
            Opcode::Null => ("Null", &[]),
            Opcode::GetGlobal => ("GetGlobal", &[2]),
            Opcode::SetGlobal => ("SetGlobal", &[2]),
            Opcode::Array => ("Array", &[2]),
            Opcode::Hash => ("Hash", &[2]),
            Opcode::Index => ("Index", &[]),
            Opcode::Call => ("Call", &[1]),
            Opcode::ReturnValue => ("ReturnValue", &[]),
            Opcode::Return => ("Return", &[]),
            Opcode::GetLocal => ("GetLocal", &[1]),
            Opcode::SetLocal => ("SetLocal", &[1]),
            Opcode::GetBuiltin => ("GetBuiltin", &[1]),
            Opcode::Closure => ("Closure", &[2, 1]),
            Opcode::GetFree => ("GetFree", &[1]),
            Opcode::CurrentClosure => ("CurrentClosure", &[]),
        };
        Definition {
            name,
            operand_widths,
        }
    }

    /// Returns the mnemonic of this opcode.
    pub fn name(self) -> &'static str {
        self.definition().name
    }
}

impl TryFrom<u8> for Opcode {
    type Error = CodeError;

    fn try_from(byte: u8) -> Result<Self, CodeError> {
        Opcode::ALL
            .get(byte as usize)
            .copied()
            .ok_or(CodeError::UnknownOpcode(byte))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Looks up the definition registered for an opcode byte.
pub fn lookup(byte: u8) -> Result<Definition, CodeError> {
    Opcode::try_from(byte).map(Opcode::definition)
}

/// Encodes a single instruction.
///
/// Fails if the operand count does not match the definition or an operand
/// does not fit in its declared width.
pub fn make(op: Opcode, operands: &[usize]) -> Result<Vec<u8>, CodeError> {
    let def = op.definition();
    if operands.len() != def.operand_widths.len() {
        return Err(CodeError::OperandCount {
            op: def.name,
            expected: def.operand_widths.len(),
            got: operands.len(),
        });
    }

    let mut instruction = Vec::with_capacity(def.size());
    instruction.push(op as u8);

    for (&operand, &width) in operands.iter().zip(def.operand_widths) {
        let out_of_range = CodeError::OperandOutOfRange {
            op: def.name,
            value: operand,
            width,
        };
        match width {
            2 => {
                let value = u16::try_from(operand).map_err(|_| out_of_range)?;
                instruction.extend_from_slice(&value.to_be_bytes());
            }
            1 => {
                let value = u8::try_from(operand).map_err(|_| out_of_range)?;
                instruction.push(value);
            }
            _ => return Err(out_of_range),
        }
    }

    Ok(instruction)
}

/// Reads a big-endian u16 at `offset`.
pub fn read_u16(ins: &[u8], offset: usize) -> Result<u16, CodeError> {
    match ins.get(offset..offset + 2) {
        Some(&[hi, lo]) => Ok(u16::from_be_bytes([hi, lo])),
        _ => Err(CodeError::Truncated { offset }),
    }
}

/// Reads a u8 at `offset`.
pub fn read_u8(ins: &[u8], offset: usize) -> Result<u8, CodeError> {
    ins.get(offset)
        .copied()
        .ok_or(CodeError::Truncated { offset })
}

/// Reads the operands described by `def` starting at `offset`.
///
/// Returns the decoded operands and the number of operand bytes consumed.
pub fn read_operands(
    def: &Definition,
    ins: &[u8],
    offset: usize,
) -> Result<(Vec<usize>, usize), CodeError> {
    let mut operands = Vec::with_capacity(def.operand_widths.len());
    let mut read = 0;

    for &width in def.operand_widths {
        let operand = match width {
            2 => read_u16(ins, offset + read)? as usize,
            _ => read_u8(ins, offset + read)? as usize,
        };
        operands.push(operand);
        read += width;
    }

    Ok((operands, read))
}

/// Decodes the instruction starting at `offset`.
///
/// Returns the opcode, its operands and the total instruction size.
pub fn decode(ins: &[u8], offset: usize) -> Result<(Opcode, Vec<usize>, usize), CodeError> {
    let byte = read_u8(ins, offset)?;
    let op = Opcode::try_from(byte)?;
    let (operands, read) = read_operands(&op.definition(), ins, offset + 1)?;
    Ok((op, operands, 1 + read))
}

/// A flat, growable instruction stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Instructions(Vec<u8>);

impl Instructions {
    /// Creates an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an encoded instruction and returns its starting offset.
    pub fn push(&mut self, instruction: &[u8]) -> usize {
        let position = self.0.len();
        self.0.extend_from_slice(instruction);
        position
    }

    /// Drops everything from `len` onwards.
    pub fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    /// Overwrites the bytes starting at `position`.
    ///
    /// Fails with [`CodeError::Truncated`] if the replacement would run past
    /// the end of the stream.
    pub fn replace(&mut self, position: usize, instruction: &[u8]) -> Result<(), CodeError> {
        let end = position
            .checked_add(instruction.len())
            .ok_or(CodeError::Truncated { offset: position })?;
        let target = self
            .0
            .get_mut(position..end)
            .ok_or(CodeError::Truncated { offset: position })?;
        target.copy_from_slice(instruction);
        Ok(())
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for Instructions {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Instructions {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl FromIterator<Vec<u8>> for Instructions {
    fn from_iter<I: IntoIterator<Item = Vec<u8>>>(iter: I) -> Self {
        Self(iter.into_iter().flatten().collect())
    }
}

impl fmt::Display for Instructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut offset = 0;
        while offset < self.0.len() {
            match decode(&self.0, offset) {
                Ok((op, operands, size)) => {
                    write!(f, "{:04} {}", offset, op)?;
                    for operand in operands {
                        write!(f, " {}", operand)?;
                    }
                    writeln!(f)?;
                    offset += size;
                }
                Err(err) => return writeln!(f, "ERROR: {}", err),
            }
        }
        Ok(())
    }
}

/// A compiled program: the main instruction stream and its constant pool.
#[derive(Debug, Clone, Default)]
pub struct Bytecode {
    /// Top-level instructions
    pub instructions: Instructions,
    /// The constant pool, including every nested compiled function
    pub constants: Vec<Value>,
}

impl Bytecode {
    /// Renders the main stream followed by every compiled function in the pool.
    pub fn disassemble(&self) -> String {
        let mut out = self.instructions.to_string();

        for (index, constant) in self.constants.iter().enumerate() {
            if let Value::CompiledFunction(func) = constant {
                out.push_str(&format!(
                    "\nconstant {}: fn/{} locals={}\n{}",
                    index, func.num_parameters, func.num_locals, func.instructions
                ));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make() {
        let cases: [(Opcode, &[usize], &[u8]); 6] = [
            (Opcode::Constant, &[65534], &[Opcode::Constant as u8, 255, 254]),
            (Opcode::Add, &[], &[Opcode::Add as u8]),
            (Opcode::GetLocal, &[255], &[Opcode::GetLocal as u8, 255]),
            (
                Opcode::Closure,
                &[65534, 255],
                &[Opcode::Closure as u8, 255, 254, 255],
            ),
            (Opcode::Call, &[3], &[Opcode::Call as u8, 3]),
            (Opcode::CurrentClosure, &[], &[29]),
        ];

        for (op, operands, expected) in cases {
            assert_eq!(make(op, operands).unwrap(), expected, "{}", op);
        }
    }

    #[test]
    fn test_opcode_byte_values() {
        assert_eq!(Opcode::Constant as u8, 0);
        assert_eq!(Opcode::JumpNotTruthy as u8, 13);
        assert_eq!(Opcode::GetBuiltin as u8, 26);
        for (i, op) in Opcode::ALL.iter().enumerate() {
            assert_eq!(*op as usize, i);
        }
    }

    #[test]
    fn test_make_rejects_bad_operands() {
        assert_eq!(
            make(Opcode::Constant, &[]),
            Err(CodeError::OperandCount {
                op: "Constant",
                expected: 1,
                got: 0
            })
        );
        assert_eq!(
            make(Opcode::Constant, &[65536]),
            Err(CodeError::OperandOutOfRange {
                op: "Constant",
                value: 65536,
                width: 2
            })
        );
        assert!(make(Opcode::Call, &[256]).is_err());
        assert!(make(Opcode::Pop, &[1]).is_err());
    }

    #[test]
    fn test_read_operands() {
        let cases: [(Opcode, &[usize], usize); 4] = [
            (Opcode::Constant, &[65535], 2),
            (Opcode::GetLocal, &[255], 1),
            (Opcode::Closure, &[65535, 255], 3),
            (Opcode::Array, &[0], 2),
        ];

        for (op, operands, bytes_read) in cases {
            let instruction = make(op, operands).unwrap();
            let def = lookup(instruction[0]).unwrap();
            let (decoded, read) = read_operands(&def, &instruction, 1).unwrap();
            assert_eq!(read, bytes_read);
            assert_eq!(decoded, operands);
        }
    }

    #[test]
    fn test_decode_every_opcode_at_max_width() {
        for op in Opcode::ALL {
            let def = op.definition();
            let operands: Vec<usize> = def
                .operand_widths
                .iter()
                .map(|&width| if width == 2 { u16::MAX as usize } else { u8::MAX as usize })
                .collect();

            let instruction = make(op, &operands).unwrap();
            assert_eq!(instruction.len(), def.size(), "{}", op);

            let (decoded_op, decoded, size) = decode(&instruction, 0).unwrap();
            assert_eq!(decoded_op, op);
            assert_eq!(decoded, operands, "{}", op);
            assert_eq!(size, def.size(), "{}", op);
        }
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(lookup(30), Err(CodeError::UnknownOpcode(30)));
        assert_eq!(decode(&[255], 0), Err(CodeError::UnknownOpcode(255)));
        assert_eq!(
            decode(&[Opcode::Constant as u8, 1], 0),
            Err(CodeError::Truncated { offset: 1 })
        );
    }

    #[test]
    fn test_instructions_display() {
        let instructions: Instructions = vec![
            make(Opcode::Add, &[]).unwrap(),
            make(Opcode::GetLocal, &[1]).unwrap(),
            make(Opcode::Constant, &[2]).unwrap(),
            make(Opcode::Constant, &[65535]).unwrap(),
            make(Opcode::Closure, &[65535, 255]).unwrap(),
        ]
        .into_iter()
        .collect();

        let expected = "\
0000 Add
0001 GetLocal 1
0003 Constant 2
0006 Constant 65535
0009 Closure 65535 255
";
        assert_eq!(instructions.to_string(), expected);
    }

    #[test]
    fn test_display_reports_truncation() {
        let instructions = Instructions::from(vec![Opcode::Pop as u8, Opcode::Jump as u8, 0]);
        assert_eq!(
            instructions.to_string(),
            "0000 Pop\nERROR: instruction at offset 2 is truncated\n"
        );
    }

    #[test]
    fn test_replace_in_place() {
        let mut instructions = Instructions::new();
        let pos = instructions.push(&make(Opcode::Jump, &[9999]).unwrap());
        instructions
            .replace(pos, &make(Opcode::Jump, &[4]).unwrap())
            .unwrap();
        assert_eq!(instructions.as_bytes(), &[Opcode::Jump as u8, 0, 4]);
    }

    #[test]
    fn test_replace_past_end_is_truncated() {
        let mut instructions = Instructions::new();
        instructions.push(&make(Opcode::Jump, &[9999]).unwrap());
        let jump = make(Opcode::Jump, &[4]).unwrap();

        assert_eq!(
            instructions.replace(1, &jump),
            Err(CodeError::Truncated { offset: 1 })
        );
        assert_eq!(
            instructions.replace(10, &jump),
            Err(CodeError::Truncated { offset: 10 })
        );
        assert_eq!(instructions.as_bytes(), &[Opcode::Jump as u8, 0x27, 0x0f]);
    }
}
