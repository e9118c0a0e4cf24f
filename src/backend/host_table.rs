//! Host Function Table
//!
//! This module provides the registry of names a compiled formula may refer
//! to. Every entry is either a host function of fixed arity returning one
//! number, or a host-owned mutable variable.
//!
//! # Design
//!
//! Entries are registered by name and assigned sequential 16-bit ids. An
//! engine resolves formula identifiers to ids once at compile time and calls
//! by id afterwards. The table is append-only and immutable once handed to
//! the engine (it is shared behind an `Arc`).
//!
//! # Example
//!
//! ```
//! use drawcalc::backend::host_table::{HostTable, VarCell};
//!
//! let mut table = HostTable::new();
//! let add = table.register_fn("add", 2, |args| args[0] + args[1]);
//! let k = VarCell::new(2.0);
//! let k_id = table.register_var("k", k.clone());
//!
//! assert_eq!(table.call(add, &[1.0, 2.0]).unwrap(), 3.0);
//! table.write_var(k_id, 5.0).unwrap();
//! assert_eq!(k.get(), 5.0);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Signature of a host function
pub type HostFn = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// Error type for host table access
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// No entry with this id
    NotFound(u16),
    /// Wrong number of arguments
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    /// Entry is a variable, not a function
    NotAFunction(String),
    /// Entry is a function, not a variable
    NotAVariable(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "host entry {} not found", id),
            Self::ArityMismatch { name, expected, got } => {
                write!(f, "'{}' expects {} arguments, got {}", name, expected, got)
            }
            Self::NotAFunction(name) => write!(f, "'{}' is a variable, not a function", name),
            Self::NotAVariable(name) => write!(f, "'{}' is a function, not a variable", name),
        }
    }
}

impl std::error::Error for HostError {}

/// Shared mutable number owned by the host.
///
/// Reads and writes are relaxed: a cell carries one value, never a torn one,
/// but no ordering is implied between different cells.
#[derive(Debug, Clone, Default)]
pub struct VarCell(Arc<AtomicU64>);

impl VarCell {
    pub fn new(value: f64) -> Self {
        Self(Arc::new(AtomicU64::new(value.to_bits())))
    }

    #[inline]
    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// What a name is bound to
#[derive(Clone)]
pub enum HostBinding {
    Function { arity: usize, func: HostFn },
    Variable(VarCell),
}

impl HostBinding {
    pub fn is_function(&self) -> bool {
        matches!(self, HostBinding::Function { .. })
    }

    /// Arity of a function binding
    pub fn arity(&self) -> Option<usize> {
        match self {
            HostBinding::Function { arity, .. } => Some(*arity),
            HostBinding::Variable(_) => None,
        }
    }
}

impl fmt::Debug for HostBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostBinding::Function { arity, .. } => write!(f, "Function/{}", arity),
            HostBinding::Variable(cell) => write!(f, "Variable({})", cell.get()),
        }
    }
}

struct HostEntry {
    name: String,
    binding: HostBinding,
}

/// Registry of host functions and variables visible to formulas
pub struct HostTable {
    entries: Vec<HostEntry>,
    name_to_id: HashMap<String, u16>,
}

impl fmt::Debug for HostTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostTable")
            .field("entry_count", &self.entries.len())
            .field("names", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for HostTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HostTable {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            name_to_id: HashMap::new(),
        }
    }

    /// Register a host function, returning its id.
    ///
    /// If the name is already registered, returns the existing id.
    pub fn register_fn<F>(&mut self, name: &str, arity: usize, func: F) -> u16
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        self.register(
            name,
            HostBinding::Function {
                arity,
                func: Arc::new(func),
            },
        )
    }

    /// Register a host variable, returning its id.
    ///
    /// If the name is already registered, returns the existing id.
    pub fn register_var(&mut self, name: &str, cell: VarCell) -> u16 {
        self.register(name, HostBinding::Variable(cell))
    }

    fn register(&mut self, name: &str, binding: HostBinding) -> u16 {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }

        let id = self.entries.len() as u16;
        self.entries.push(HostEntry {
            name: name.to_string(),
            binding,
        });
        self.name_to_id.insert(name.to_string(), id);
        id
    }

    pub fn get_id(&self, name: &str) -> Option<u16> {
        self.name_to_id.get(name).copied()
    }

    pub fn get_name(&self, id: u16) -> Option<&str> {
        self.entries.get(id as usize).map(|e| e.name.as_str())
    }

    pub fn binding(&self, id: u16) -> Option<&HostBinding> {
        self.entries.get(id as usize).map(|e| &e.binding)
    }

    /// Call a host function by id
    pub fn call(&self, id: u16, args: &[f64]) -> Result<f64, HostError> {
        let entry = self.entries.get(id as usize).ok_or(HostError::NotFound(id))?;
        match &entry.binding {
            HostBinding::Function { arity, func } => {
                if args.len() != *arity {
                    return Err(HostError::ArityMismatch {
                        name: entry.name.clone(),
                        expected: *arity,
                        got: args.len(),
                    });
                }
                Ok(func(args))
            }
            HostBinding::Variable(_) => Err(HostError::NotAFunction(entry.name.clone())),
        }
    }

    /// Read a host variable by id
    pub fn read_var(&self, id: u16) -> Result<f64, HostError> {
        Ok(self.var_cell(id)?.get())
    }

    /// Write a host variable by id
    pub fn write_var(&self, id: u16, value: f64) -> Result<(), HostError> {
        self.var_cell(id)?.set(value);
        Ok(())
    }

    fn var_cell(&self, id: u16) -> Result<&VarCell, HostError> {
        let entry = self.entries.get(id as usize).ok_or(HostError::NotFound(id))?;
        match &entry.binding {
            HostBinding::Variable(cell) => Ok(cell),
            HostBinding::Function { .. } => Err(HostError::NotAVariable(entry.name.clone())),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names in id order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }
}
