use crate::error::Error::InvalidInstruction;
use crate::error::{Error, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use std::fmt;
use std::io::Cursor;

/// Bounds-checked reader over a borrowed bytecode stream.
struct SliceReader<'a> {
    code: &'a [u8],
    offset: usize,
}

impl<'a> SliceReader<'a> {
    fn new(code: &'a [u8], offset: usize) -> Self {
        Self { code, offset }
    }

    fn read_u8(&mut self) -> Result<u8> {
        let byte = *self
            .code
            .get(self.offset)
            .ok_or_else(|| Error::IoError("unexpected end of bytecode".to_string()))?;
        self.offset += 1;
        Ok(byte)
    }

    fn read_i16(&mut self) -> Result<i16> {
        let low = self.read_u8()?;
        let high = self.read_u8()?;
        Ok(i16::from_le_bytes([low, high]))
    }
}

/// A single Wyvern bytecode instruction.
///
/// Each instruction is one opcode byte followed by its operands. Word
/// operands are signed 16-bit little-endian; the only byte operand is the
/// message arity of [`Send`](Instruction::Send) and
/// [`SuperSend`](Instruction::SuperSend). Jump targets are absolute byte
/// offsets into the function's bytecode stream.
///
/// The opcode values form a stable enumeration: they are part of the wire
/// format shared with the compiler and must not be reassigned.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Instruction {
    /// No effect.
    Noop,
    /// Load the frame's self value into the accumulator.
    LoadSelf,
    /// Load a constant into the accumulator.
    LoadConst(i16),
    /// Collect the top `n` stack slots into a new array (first pushed is
    /// element 0) and load it into the accumulator.
    LoadArray(i16),
    /// Collect the top `n` stack slots into a new mapping, pairwise
    /// key/value. An odd count drops one slot silently.
    LoadMapping(i16),
    /// Load a funcref binding self to the message symbol at the given
    /// constant index.
    LoadFuncref(i16),
    /// Load a local slot into the accumulator.
    LoadLocal(i16),
    /// Load one of self's instance slots into the accumulator.
    LoadMember(i16),
    /// Store the accumulator into a local slot.
    StoreLocal(i16),
    /// Store the accumulator into one of self's instance slots.
    StoreMember(i16),
    /// Push the frame's self value onto the stack.
    PushSelf,
    /// Push a constant onto the stack.
    PushConst(i16),
    /// Push the accumulator onto the stack.
    Push,
    /// Pop the top of the stack into the accumulator.
    Pop,
    /// Execute an [`Operator`](crate::Operator) identified by its code.
    Op(i16),
    /// Send the message symbol at the given constant index to a receiver
    /// consumed from the stack, with the given arity.
    Send(i16, u8),
    /// Send resolved against the executing method's blueprint's parent.
    SuperSend(i16, u8),
    /// Continue execution at an absolute offset.
    Jump(i16),
    /// Jump when the accumulator is truthy.
    JumpIf(i16),
    /// Jump when the accumulator is falsy.
    JumpIfNot(i16),
    /// Pop the current frame.
    Return,
    /// Crash the fiber unless the accumulator matches the type at the
    /// given index of the function's types table.
    Typecheck(i16),
    /// Convert the accumulator to the type at the given index of the
    /// function's types table, or crash the fiber.
    Typecast(i16),
    /// Arm the current frame's catch address.
    Catch(i16),
}

impl Instruction {
    /// The opcode byte for this instruction.
    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            Instruction::Noop => 0,
            Instruction::LoadSelf => 1,
            Instruction::LoadConst(..) => 2,
            Instruction::LoadArray(..) => 3,
            Instruction::LoadMapping(..) => 4,
            Instruction::LoadFuncref(..) => 5,
            Instruction::LoadLocal(..) => 6,
            Instruction::LoadMember(..) => 7,
            Instruction::StoreLocal(..) => 8,
            Instruction::StoreMember(..) => 9,
            Instruction::PushSelf => 10,
            Instruction::PushConst(..) => 11,
            Instruction::Push => 12,
            Instruction::Pop => 13,
            Instruction::Op(..) => 14,
            Instruction::Send(..) => 15,
            Instruction::SuperSend(..) => 16,
            Instruction::Jump(..) => 17,
            Instruction::JumpIf(..) => 18,
            Instruction::JumpIfNot(..) => 19,
            Instruction::Return => 20,
            Instruction::Typecheck(..) => 21,
            Instruction::Typecast(..) => 22,
            Instruction::Catch(..) => 23,
        }
    }

    /// The encoded width of this instruction in bytes, including the
    /// opcode. Callers use this to compute absolute jump targets.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Instruction::Noop
            | Instruction::LoadSelf
            | Instruction::PushSelf
            | Instruction::Push
            | Instruction::Pop
            | Instruction::Return => 1,
            Instruction::Send(..) | Instruction::SuperSend(..) => 4,
            _ => 3,
        }
    }

    /// Deserialize the `Instruction` from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the opcode byte is outside the stable
    /// enumeration or the stream ends inside an operand.
    pub fn from_bytes(bytes: &mut Cursor<Vec<u8>>) -> Result<Instruction> {
        let offset = usize::try_from(bytes.position())
            .map_err(|error| Error::IoError(error.to_string()))?;
        let (instruction, next) = Self::decode(bytes.get_ref(), offset)?;
        bytes.set_position(next as u64);
        Ok(instruction)
    }

    /// Decode the instruction at `offset` in a bytecode stream without
    /// copying the stream, returning the instruction and the offset just
    /// past it. This is the interpreter's hot path.
    ///
    /// # Errors
    ///
    /// Returns an error if the opcode byte is outside the stable
    /// enumeration or the stream ends inside an operand.
    pub fn decode(code: &[u8], offset: usize) -> Result<(Instruction, usize)> {
        let mut reader = SliceReader::new(code, offset);
        let instruction = Self::read(&mut reader)?;
        Ok((instruction, reader.offset))
    }

    fn read(bytes: &mut SliceReader<'_>) -> Result<Instruction> {
        let code = bytes.read_u8()?;

        let instruction = match code {
            0 => Instruction::Noop,
            1 => Instruction::LoadSelf,
            2 => Instruction::LoadConst(bytes.read_i16()?),
            3 => Instruction::LoadArray(bytes.read_i16()?),
            4 => Instruction::LoadMapping(bytes.read_i16()?),
            5 => Instruction::LoadFuncref(bytes.read_i16()?),
            6 => Instruction::LoadLocal(bytes.read_i16()?),
            7 => Instruction::LoadMember(bytes.read_i16()?),
            8 => Instruction::StoreLocal(bytes.read_i16()?),
            9 => Instruction::StoreMember(bytes.read_i16()?),
            10 => Instruction::PushSelf,
            11 => Instruction::PushConst(bytes.read_i16()?),
            12 => Instruction::Push,
            13 => Instruction::Pop,
            14 => Instruction::Op(bytes.read_i16()?),
            15 => {
                let message = bytes.read_i16()?;
                let arity = bytes.read_u8()?;
                Instruction::Send(message, arity)
            }
            16 => {
                let message = bytes.read_i16()?;
                let arity = bytes.read_u8()?;
                Instruction::SuperSend(message, arity)
            }
            17 => Instruction::Jump(bytes.read_i16()?),
            18 => Instruction::JumpIf(bytes.read_i16()?),
            19 => Instruction::JumpIfNot(bytes.read_i16()?),
            20 => Instruction::Return,
            21 => Instruction::Typecheck(bytes.read_i16()?),
            22 => Instruction::Typecast(bytes.read_i16()?),
            23 => Instruction::Catch(bytes.read_i16()?),
            _ => return Err(InvalidInstruction(code)),
        };
        Ok(instruction)
    }

    /// Serialize the `Instruction` to bytes.
    ///
    /// # Errors
    ///
    /// If an instruction cannot be serialized to bytes.
    pub fn to_bytes(&self, bytes: &mut Cursor<Vec<u8>>) -> Result<()> {
        bytes.write_u8(self.code())?;

        match self {
            Instruction::LoadConst(value)
            | Instruction::LoadArray(value)
            | Instruction::LoadMapping(value)
            | Instruction::LoadFuncref(value)
            | Instruction::LoadLocal(value)
            | Instruction::LoadMember(value)
            | Instruction::StoreLocal(value)
            | Instruction::StoreMember(value)
            | Instruction::PushConst(value)
            | Instruction::Op(value)
            | Instruction::Jump(value)
            | Instruction::JumpIf(value)
            | Instruction::JumpIfNot(value)
            | Instruction::Typecheck(value)
            | Instruction::Typecast(value)
            | Instruction::Catch(value) => bytes.write_i16::<LittleEndian>(*value)?,
            Instruction::Send(message, arity) | Instruction::SuperSend(message, arity) => {
                bytes.write_i16::<LittleEndian>(*message)?;
                bytes.write_u8(*arity)?;
            }
            _ => {}
        }
        Ok(())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Noop => write!(f, "noop"),
            Instruction::LoadSelf => write!(f, "load_self"),
            Instruction::LoadConst(value) => write!(f, "load_const {value}"),
            Instruction::LoadArray(value) => write!(f, "load_array {value}"),
            Instruction::LoadMapping(value) => write!(f, "load_mapping {value}"),
            Instruction::LoadFuncref(value) => write!(f, "load_funcref {value}"),
            Instruction::LoadLocal(value) => write!(f, "load_local {value}"),
            Instruction::LoadMember(value) => write!(f, "load_member {value}"),
            Instruction::StoreLocal(value) => write!(f, "store_local {value}"),
            Instruction::StoreMember(value) => write!(f, "store_member {value}"),
            Instruction::PushSelf => write!(f, "push_self"),
            Instruction::PushConst(value) => write!(f, "push_const {value}"),
            Instruction::Push => write!(f, "push"),
            Instruction::Pop => write!(f, "pop"),
            Instruction::Op(value) => write!(f, "op {value}"),
            Instruction::Send(message, arity) => write!(f, "send {message}, {arity}"),
            Instruction::SuperSend(message, arity) => write!(f, "super_send {message}, {arity}"),
            Instruction::Jump(value) => write!(f, "jump {value}"),
            Instruction::JumpIf(value) => write!(f, "jump_if {value}"),
            Instruction::JumpIfNot(value) => write!(f, "jump_if_not {value}"),
            Instruction::Return => write!(f, "return"),
            Instruction::Typecheck(value) => write!(f, "typecheck {value}"),
            Instruction::Typecast(value) => write!(f, "typecast {value}"),
            Instruction::Catch(value) => write!(f, "catch {value}"),
        }
    }
}

/// Serialize a sequence of instructions into a contiguous bytecode stream.
///
/// This is the surface the compiler's code writer targets; tests use it to
/// hand-assemble functions. Jump operands are absolute byte offsets, so
/// callers combine this with [`Instruction::size`] when resolving labels.
///
/// # Errors
///
/// If an instruction cannot be serialized to bytes.
pub fn assemble(instructions: &[Instruction]) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    for instruction in instructions {
        instruction.to_bytes(&mut cursor)?;
    }
    Ok(cursor.into_inner())
}

/// Deserialize a contiguous bytecode stream into instructions.
///
/// # Errors
///
/// Returns an error if any opcode is invalid or the stream ends inside an
/// operand.
pub fn disassemble(code: &[u8]) -> Result<Vec<Instruction>> {
    let mut cursor = Cursor::new(code.to_vec());
    let mut instructions = Vec::new();
    let length = code.len() as u64;
    while cursor.position() < length {
        instructions.push(Instruction::from_bytes(&mut cursor)?);
    }
    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_invalid_instructions() -> Result<()> {
        for code in 24..=u8::MAX {
            let mut bytes = Vec::new();
            bytes.write_u8(code)?;
            assert_eq!(
                Err(InvalidInstruction(code)),
                Instruction::from_bytes(&mut Cursor::new(bytes))
            );
        }
        Ok(())
    }

    fn test_instruction(instruction: &Instruction, expected_bytes: &[u8], code: u8) -> Result<()> {
        assert_eq!(code, instruction.code());
        assert_eq!(expected_bytes.len(), instruction.size());

        let mut buffer = Cursor::new(Vec::new());
        instruction.to_bytes(&mut buffer)?;
        let mut bytes = Vec::new();
        buffer.set_position(0);
        buffer.read_to_end(&mut bytes)?;
        assert_eq!(expected_bytes, bytes);

        let mut bytes = Cursor::new(expected_bytes.to_vec());
        assert_eq!(*instruction, Instruction::from_bytes(&mut bytes)?);
        Ok(())
    }

    #[test]
    fn test_noop() -> Result<()> {
        let instruction = Instruction::Noop;
        assert_eq!("noop", instruction.to_string());
        test_instruction(&instruction, &[0], 0)
    }

    #[test]
    fn test_load_self() -> Result<()> {
        let instruction = Instruction::LoadSelf;
        assert_eq!("load_self", instruction.to_string());
        test_instruction(&instruction, &[1], 1)
    }

    #[test]
    fn test_load_const() -> Result<()> {
        let instruction = Instruction::LoadConst(258);
        assert_eq!("load_const 258", instruction.to_string());
        test_instruction(&instruction, &[2, 2, 1], 2)
    }

    #[test]
    fn test_load_array() -> Result<()> {
        let instruction = Instruction::LoadArray(3);
        assert_eq!("load_array 3", instruction.to_string());
        test_instruction(&instruction, &[3, 3, 0], 3)
    }

    #[test]
    fn test_load_mapping() -> Result<()> {
        let instruction = Instruction::LoadMapping(4);
        assert_eq!("load_mapping 4", instruction.to_string());
        test_instruction(&instruction, &[4, 4, 0], 4)
    }

    #[test]
    fn test_load_funcref() -> Result<()> {
        let instruction = Instruction::LoadFuncref(1);
        assert_eq!("load_funcref 1", instruction.to_string());
        test_instruction(&instruction, &[5, 1, 0], 5)
    }

    #[test]
    fn test_load_local() -> Result<()> {
        let instruction = Instruction::LoadLocal(2);
        assert_eq!("load_local 2", instruction.to_string());
        test_instruction(&instruction, &[6, 2, 0], 6)
    }

    #[test]
    fn test_load_member() -> Result<()> {
        let instruction = Instruction::LoadMember(0);
        assert_eq!("load_member 0", instruction.to_string());
        test_instruction(&instruction, &[7, 0, 0], 7)
    }

    #[test]
    fn test_store_local() -> Result<()> {
        let instruction = Instruction::StoreLocal(2);
        assert_eq!("store_local 2", instruction.to_string());
        test_instruction(&instruction, &[8, 2, 0], 8)
    }

    #[test]
    fn test_store_member() -> Result<()> {
        let instruction = Instruction::StoreMember(1);
        assert_eq!("store_member 1", instruction.to_string());
        test_instruction(&instruction, &[9, 1, 0], 9)
    }

    #[test]
    fn test_push_self() -> Result<()> {
        let instruction = Instruction::PushSelf;
        assert_eq!("push_self", instruction.to_string());
        test_instruction(&instruction, &[10], 10)
    }

    #[test]
    fn test_push_const() -> Result<()> {
        let instruction = Instruction::PushConst(7);
        assert_eq!("push_const 7", instruction.to_string());
        test_instruction(&instruction, &[11, 7, 0], 11)
    }

    #[test]
    fn test_push() -> Result<()> {
        let instruction = Instruction::Push;
        assert_eq!("push", instruction.to_string());
        test_instruction(&instruction, &[12], 12)
    }

    #[test]
    fn test_pop() -> Result<()> {
        let instruction = Instruction::Pop;
        assert_eq!("pop", instruction.to_string());
        test_instruction(&instruction, &[13], 13)
    }

    #[test]
    fn test_op() -> Result<()> {
        let instruction = Instruction::Op(0);
        assert_eq!("op 0", instruction.to_string());
        test_instruction(&instruction, &[14, 0, 0], 14)
    }

    #[test]
    fn test_send() -> Result<()> {
        let instruction = Instruction::Send(5, 2);
        assert_eq!("send 5, 2", instruction.to_string());
        test_instruction(&instruction, &[15, 5, 0, 2], 15)
    }

    #[test]
    fn test_super_send() -> Result<()> {
        let instruction = Instruction::SuperSend(5, 0);
        assert_eq!("super_send 5, 0", instruction.to_string());
        test_instruction(&instruction, &[16, 5, 0, 0], 16)
    }

    #[test]
    fn test_jump() -> Result<()> {
        let instruction = Instruction::Jump(300);
        assert_eq!("jump 300", instruction.to_string());
        test_instruction(&instruction, &[17, 44, 1], 17)
    }

    #[test]
    fn test_jump_if() -> Result<()> {
        let instruction = Instruction::JumpIf(6);
        assert_eq!("jump_if 6", instruction.to_string());
        test_instruction(&instruction, &[18, 6, 0], 18)
    }

    #[test]
    fn test_jump_if_not() -> Result<()> {
        let instruction = Instruction::JumpIfNot(6);
        assert_eq!("jump_if_not 6", instruction.to_string());
        test_instruction(&instruction, &[19, 6, 0], 19)
    }

    #[test]
    fn test_return() -> Result<()> {
        let instruction = Instruction::Return;
        assert_eq!("return", instruction.to_string());
        test_instruction(&instruction, &[20], 20)
    }

    #[test]
    fn test_typecheck() -> Result<()> {
        let instruction = Instruction::Typecheck(1);
        assert_eq!("typecheck 1", instruction.to_string());
        test_instruction(&instruction, &[21, 1, 0], 21)
    }

    #[test]
    fn test_typecast() -> Result<()> {
        let instruction = Instruction::Typecast(1);
        assert_eq!("typecast 1", instruction.to_string());
        test_instruction(&instruction, &[22, 1, 0], 22)
    }

    #[test]
    fn test_catch() -> Result<()> {
        let instruction = Instruction::Catch(12);
        assert_eq!("catch 12", instruction.to_string());
        test_instruction(&instruction, &[23, 12, 0], 23)
    }

    #[test]
    fn test_negative_word_operand() -> Result<()> {
        let instruction = Instruction::LoadConst(-1);
        test_instruction(&instruction, &[2, 255, 255], 2)
    }

    #[test]
    fn test_assemble_round_trip() -> Result<()> {
        let instructions = vec![
            Instruction::LoadConst(0),
            Instruction::Push,
            Instruction::LoadConst(1),
            Instruction::Op(0),
            Instruction::Return,
        ];
        let code = assemble(&instructions)?;
        assert_eq!(code.len(), 13);
        assert_eq!(instructions, disassemble(&code)?);
        Ok(())
    }

    #[test]
    fn test_disassemble_truncated_operand() {
        // A load_const opcode followed by a single operand byte.
        let result = disassemble(&[2, 1]);
        assert!(matches!(result, Err(crate::Error::IoError(_))));
    }
}
