//! Bytecode chunk
//!
//! A compiled formula: code bytes, a constant pool, a line table and the
//! names of its local slots. Chunks are immutable once built.

use itertools::Itertools;

use super::opcodes::Opcode;
use crate::backend::host_table::HostTable;

/// Most local slots a chunk can address (1-byte operand)
pub const MAX_LOCALS: usize = u8::MAX as usize + 1;

#[derive(Debug, Clone, Default)]
pub struct Chunk {
    code: Vec<u8>,
    constants: Vec<f64>,
    /// (byte offset, source line), sorted by offset
    line_info: Vec<(usize, u32)>,
    locals: Vec<String>,
}

impl Chunk {
    /// A chunk that only halts
    pub fn noop() -> Self {
        let mut builder = ChunkBuilder::new();
        builder.emit(Opcode::Halt);
        builder.build()
    }

    #[inline]
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    #[inline]
    pub fn read_byte(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    #[inline]
    pub fn read_opcode(&self, offset: usize) -> Option<Opcode> {
        self.read_byte(offset).and_then(Opcode::from_byte)
    }

    /// Big-endian u16 at `offset`
    #[inline]
    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        let hi = self.read_byte(offset)?;
        let lo = self.read_byte(offset + 1)?;
        Some(u16::from_be_bytes([hi, lo]))
    }

    #[inline]
    pub fn read_i16(&self, offset: usize) -> Option<i16> {
        self.read_u16(offset).map(|u| u as i16)
    }

    #[inline]
    pub fn constant(&self, index: u16) -> Option<f64> {
        self.constants.get(index as usize).copied()
    }

    pub fn constants(&self) -> &[f64] {
        &self.constants
    }

    pub fn local_count(&self) -> usize {
        self.locals.len()
    }

    pub fn local_name(&self, slot: u8) -> Option<&str> {
        self.locals.get(slot as usize).map(String::as_str)
    }

    /// Source line of the instruction at `offset`
    pub fn line_at(&self, offset: usize) -> Option<u32> {
        match self.line_info.binary_search_by_key(&offset, |&(o, _)| o) {
            Ok(idx) => Some(self.line_info[idx].1),
            Err(idx) if idx > 0 => Some(self.line_info[idx - 1].1),
            _ => None,
        }
    }

    /// Listing of the whole chunk; host ids are shown with their names
    pub fn disassemble(&self, host: Option<&HostTable>) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "locals: {} [{}]\n",
            self.locals.len(),
            self.locals.iter().join(", ")
        ));
        out.push_str(&format!("constants: {}\n", self.constants.len()));

        let mut offset = 0;
        while offset < self.code.len() {
            let line = self
                .line_at(offset)
                .map_or_else(|| "     ".to_string(), |l| format!("{:4} ", l));
            let (text, next) = self.disassemble_instruction(offset, host);
            out.push_str(&format!("{:04x} {}{}\n", offset, line, text));
            offset = next;
        }
        out
    }

    /// One instruction as text, and the offset of the next one
    pub fn disassemble_instruction(&self, offset: usize, host: Option<&HostTable>) -> (String, usize) {
        let Some(op) = self.read_opcode(offset) else {
            let byte = self.read_byte(offset).unwrap_or(0);
            return (format!("??? (0x{:02x})", byte), offset + 1);
        };
        let next = offset + 1 + op.immediate_size();
        let host_name = |id: u16| {
            host.and_then(|h| h.get_name(id))
                .map_or_else(|| format!("#{}", id), str::to_string)
        };

        let operand = match op {
            Opcode::PushConst => {
                let idx = self.read_u16(offset + 1).unwrap_or(0);
                match self.constant(idx) {
                    Some(v) => format!(" #{} ({})", idx, v),
                    None => format!(" #{} (???)", idx),
                }
            }
            Opcode::LoadLocal | Opcode::StoreLocal => {
                let slot = self.read_byte(offset + 1).unwrap_or(0);
                format!(" {} ({})", slot, self.local_name(slot).unwrap_or("?"))
            }
            Opcode::LoadHost | Opcode::StoreHost => {
                let id = self.read_u16(offset + 1).unwrap_or(0);
                format!(" {}", host_name(id))
            }
            Opcode::Jump | Opcode::JumpIfFalse | Opcode::JumpIfTrue => {
                let rel = self.read_i16(offset + 1).unwrap_or(0);
                let target = next as isize + rel as isize;
                format!(" -> {:04x}", target)
            }
            Opcode::CallHost => {
                let id = self.read_u16(offset + 1).unwrap_or(0);
                let argc = self.read_byte(offset + 3).unwrap_or(0);
                format!(" {}/{}", host_name(id), argc)
            }
            _ => String::new(),
        };

        (format!("{}{}", op.mnemonic(), operand), next)
    }
}

/// Builder for [`Chunk`]
#[derive(Debug, Default)]
pub struct ChunkBuilder {
    code: Vec<u8>,
    constants: Vec<f64>,
    line_info: Vec<(usize, u32)>,
    locals: Vec<String>,
    current_line: u32,
}

/// Forward jump awaiting its target
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct JumpLabel {
    operand: usize,
}

impl ChunkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_line(&mut self, line: u32) {
        self.current_line = line;
    }

    #[inline]
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    pub fn emit(&mut self, op: Opcode) {
        self.emit_line_info();
        self.code.push(op.to_byte());
    }

    pub fn emit_byte(&mut self, op: Opcode, operand: u8) {
        self.emit(op);
        self.code.push(operand);
    }

    pub fn emit_u16(&mut self, op: Opcode, operand: u16) {
        self.emit(op);
        self.code.extend_from_slice(&operand.to_be_bytes());
    }

    pub fn emit_call(&mut self, host_id: u16, argc: u8) {
        self.emit_u16(Opcode::CallHost, host_id);
        self.code.push(argc);
    }

    /// Constant pool index for `value`, or None when the pool is full.
    ///
    /// Equal bit patterns share an entry.
    pub fn add_constant(&mut self, value: f64) -> Option<u16> {
        if let Some(i) = self.constants.iter().position(|c| c.to_bits() == value.to_bits()) {
            return Some(i as u16);
        }
        let index = u16::try_from(self.constants.len()).ok()?;
        self.constants.push(value);
        Some(index)
    }

    /// Slot for local `name`, declaring it on first use; None when out of slots
    pub fn local_slot(&mut self, name: &str) -> Option<u8> {
        if let Some(i) = self.find_local(name) {
            return Some(i);
        }
        let slot = u8::try_from(self.locals.len()).ok()?;
        self.locals.push(name.to_string());
        Some(slot)
    }

    pub fn find_local(&self, name: &str) -> Option<u8> {
        self.locals.iter().position(|l| l == name).map(|i| i as u8)
    }

    /// Emit a forward jump with a placeholder offset
    pub fn emit_jump(&mut self, op: Opcode) -> JumpLabel {
        debug_assert!(op.is_jump());
        self.emit(op);
        let operand = self.code.len();
        self.code.extend_from_slice(&[0xFF, 0xFF]);
        JumpLabel { operand }
    }

    /// Point `label` at the current offset; false when out of i16 range
    pub fn patch_jump(&mut self, label: JumpLabel) -> bool {
        let from = label.operand + 2;
        let Ok(rel) = i16::try_from(self.code.len() as isize - from as isize) else {
            return false;
        };
        let bytes = rel.to_be_bytes();
        self.code[label.operand] = bytes[0];
        self.code[label.operand + 1] = bytes[1];
        true
    }

    /// Emit a backward jump to `target`; false when out of i16 range
    pub fn emit_loop(&mut self, target: usize) -> bool {
        let from = self.code.len() + 3;
        let Ok(rel) = i16::try_from(target as isize - from as isize) else {
            return false;
        };
        self.emit_u16(Opcode::Jump, rel as u16);
        true
    }

    fn emit_line_info(&mut self) {
        let offset = self.code.len();
        if self.line_info.last().map(|&(_, l)| l) != Some(self.current_line) {
            self.line_info.push((offset, self.current_line));
        }
    }

    pub fn build(self) -> Chunk {
        Chunk {
            code: self.code,
            constants: self.constants,
            line_info: self.line_info,
            locals: self.locals,
        }
    }
}
