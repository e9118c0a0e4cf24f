//! Formula VM opcodes
//!
//! Opcodes are grouped by category with contiguous ranges. Multi-byte
//! operands are big-endian.

use std::fmt;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // === Stack (0x00-0x0F) ===
    Nop = 0x00,
    /// Discard top of stack
    Pop = 0x01,
    Dup = 0x02,

    // === Values (0x10-0x1F) ===
    /// Push constant, pool index is next 2 bytes
    PushConst = 0x10,
    PushZero = 0x11,
    PushOne = 0x12,

    // === Variables (0x20-0x2F) ===
    /// Push local slot, index is next byte
    LoadLocal = 0x20,
    /// Pop into local slot, index is next byte
    StoreLocal = 0x21,
    /// Push host variable, host id is next 2 bytes
    LoadHost = 0x22,
    /// Pop into host variable, host id is next 2 bytes
    StoreHost = 0x23,

    // === Arithmetic (0x30-0x3F) ===
    Add = 0x30,
    Sub = 0x31,
    Mul = 0x32,
    Div = 0x33,
    /// Floating remainder, sign of the dividend
    Mod = 0x34,
    Pow = 0x35,
    Neg = 0x36,

    // === Comparison & logic (0x40-0x4F) ===
    Lt = 0x40,
    Le = 0x41,
    Gt = 0x42,
    Ge = 0x43,
    Eq = 0x44,
    Ne = 0x45,
    /// 1 if zero, else 0
    Not = 0x46,
    /// 0 if zero, else 1
    Truth = 0x47,

    // === Control (0x50-0x5F) ===
    /// Relative jump, signed offset is next 2 bytes
    Jump = 0x50,
    /// Pop; jump if zero
    JumpIfFalse = 0x51,
    /// Pop; jump if non-zero
    JumpIfTrue = 0x52,

    // === Host calls (0x60-0x6F) ===
    /// Call host function: 2-byte host id + 1-byte argument count
    CallHost = 0x60,

    /// End of program
    Halt = 0x70,
}

impl Opcode {
    #[inline]
    pub fn from_byte(byte: u8) -> Option<Self> {
        OPCODE_TABLE[byte as usize]
    }

    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Number of operand bytes following the opcode
    #[inline]
    pub fn immediate_size(self) -> usize {
        match self {
            Self::Nop | Self::Pop | Self::Dup | Self::PushZero | Self::PushOne
            | Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod | Self::Pow | Self::Neg
            | Self::Lt | Self::Le | Self::Gt | Self::Ge | Self::Eq | Self::Ne
            | Self::Not | Self::Truth | Self::Halt => 0,

            Self::LoadLocal | Self::StoreLocal => 1,

            Self::PushConst | Self::LoadHost | Self::StoreHost
            | Self::Jump | Self::JumpIfFalse | Self::JumpIfTrue => 2,

            Self::CallHost => 3,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Nop => "nop",
            Self::Pop => "pop",
            Self::Dup => "dup",
            Self::PushConst => "push_const",
            Self::PushZero => "push_zero",
            Self::PushOne => "push_one",
            Self::LoadLocal => "load_local",
            Self::StoreLocal => "store_local",
            Self::LoadHost => "load_host",
            Self::StoreHost => "store_host",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::Pow => "pow",
            Self::Neg => "neg",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Not => "not",
            Self::Truth => "truth",
            Self::Jump => "jump",
            Self::JumpIfFalse => "jump_if_false",
            Self::JumpIfTrue => "jump_if_true",
            Self::CallHost => "call_host",
            Self::Halt => "halt",
        }
    }

    #[inline]
    pub fn is_jump(self) -> bool {
        matches!(self, Self::Jump | Self::JumpIfFalse | Self::JumpIfTrue)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

static OPCODE_TABLE: [Option<Opcode>; 256] = {
    let mut table = [None; 256];

    table[0x00] = Some(Opcode::Nop);
    table[0x01] = Some(Opcode::Pop);
    table[0x02] = Some(Opcode::Dup);

    table[0x10] = Some(Opcode::PushConst);
    table[0x11] = Some(Opcode::PushZero);
    table[0x12] = Some(Opcode::PushOne);

    table[0x20] = Some(Opcode::LoadLocal);
    table[0x21] = Some(Opcode::StoreLocal);
    table[0x22] = Some(Opcode::LoadHost);
    table[0x23] = Some(Opcode::StoreHost);

    table[0x30] = Some(Opcode::Add);
    table[0x31] = Some(Opcode::Sub);
    table[0x32] = Some(Opcode::Mul);
    table[0x33] = Some(Opcode::Div);
    table[0x34] = Some(Opcode::Mod);
    table[0x35] = Some(Opcode::Pow);
    table[0x36] = Some(Opcode::Neg);

    table[0x40] = Some(Opcode::Lt);
    table[0x41] = Some(Opcode::Le);
    table[0x42] = Some(Opcode::Gt);
    table[0x43] = Some(Opcode::Ge);
    table[0x44] = Some(Opcode::Eq);
    table[0x45] = Some(Opcode::Ne);
    table[0x46] = Some(Opcode::Not);
    table[0x47] = Some(Opcode::Truth);

    table[0x50] = Some(Opcode::Jump);
    table[0x51] = Some(Opcode::JumpIfFalse);
    table[0x52] = Some(Opcode::JumpIfTrue);

    table[0x60] = Some(Opcode::CallHost);

    table[0x70] = Some(Opcode::Halt);

    table
};
