//! Symbol table for declared constants and variables.

use std::fmt;

use thiserror::Error;

use super::lexer::IDENTIFIER_LEN;
use crate::vm::INT_OFFSET;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Const,
    Var,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Const => write!(f, "const"),
            SymbolKind::Var => write!(f, "var"),
        }
    }
}

/// A declared name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub kind: SymbolKind,
    /// Constant value; zero for variables.
    pub value: i32,
    /// Lexical level of the declaration. Recorded but not yet used for
    /// resolution.
    pub level: usize,
    pub active: bool,
    /// Frame slot of the symbol.
    pub address: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    #[error("duplicate identifier: {0}")]
    Duplicate(String),
    #[error("identifier too large: {0}")]
    NameTooLong(String),
}

/// Declared names in insertion order. Lookups search newest first.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    next_address: i32,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            next_address: INT_OFFSET,
        }
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a name and return its frame address.
    pub fn insert(
        &mut self,
        kind: SymbolKind,
        value: i32,
        level: usize,
        active: bool,
        name: &str,
    ) -> Result<i32, SymbolError> {
        if name.len() > IDENTIFIER_LEN {
            return Err(SymbolError::NameTooLong(name.to_string()));
        }
        if self.symbols.iter().any(|s| s.name == name) {
            return Err(SymbolError::Duplicate(name.to_string()));
        }

        let address = self.next_address;
        self.next_address += 1;
        self.symbols.push(Symbol {
            kind,
            value,
            level,
            active,
            address,
            name: name.to_string(),
        });
        Ok(address)
    }

    /// Find the newest active symbol called `name`.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols
            .iter()
            .rev()
            .find(|s| s.active && s.name == name)
    }

    pub fn size(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbols in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Symbol> {
        self.symbols.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addresses_start_at_offset() {
        let mut table = SymbolTable::new();
        assert_eq!(table.insert(SymbolKind::Const, 7, 0, true, "x"), Ok(INT_OFFSET));
        assert_eq!(table.insert(SymbolKind::Var, 0, 0, true, "y"), Ok(INT_OFFSET + 1));
        assert_eq!(table.size(), 2);
    }

    #[test]
    fn test_duplicate_insert_fails() {
        let mut table = SymbolTable::new();
        table.insert(SymbolKind::Var, 0, 0, true, "x").unwrap();
        assert_eq!(
            table.insert(SymbolKind::Const, 1, 0, true, "x"),
            Err(SymbolError::Duplicate("x".to_string()))
        );
        assert_eq!(table.size(), 1);
    }

    #[test]
    fn test_duplicate_of_inactive_fails() {
        let mut table = SymbolTable::new();
        table.insert(SymbolKind::Var, 0, 0, false, "x").unwrap();
        assert!(table.insert(SymbolKind::Var, 0, 0, true, "x").is_err());
    }

    #[test]
    fn test_lookup_skips_inactive() {
        let mut table = SymbolTable::new();
        table.insert(SymbolKind::Var, 0, 0, false, "hidden").unwrap();
        table.insert(SymbolKind::Const, 3, 0, true, "shown").unwrap();

        assert!(table.lookup("hidden").is_none());
        let symbol = table.lookup("shown").unwrap();
        assert_eq!(symbol.kind, SymbolKind::Const);
        assert_eq!(symbol.value, 3);
        assert_eq!(symbol.address, INT_OFFSET + 1);
    }

    #[test]
    fn test_name_too_long() {
        let mut table = SymbolTable::new();
        assert!(table.insert(SymbolKind::Var, 0, 0, true, "abcdefghijk").is_ok());
        assert_eq!(
            table.insert(SymbolKind::Var, 0, 0, true, "abcdefghijkl"),
            Err(SymbolError::NameTooLong("abcdefghijkl".to_string()))
        );
    }

    #[test]
    fn test_iter_in_declaration_order() {
        let mut table = SymbolTable::new();
        for name in ["a", "b", "c"] {
            table.insert(SymbolKind::Var, 0, 0, true, name).unwrap();
        }
        let names: Vec<&str> = table.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
