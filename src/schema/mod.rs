//! Schema Description
//!
//! The structured result of schema introspection and its canonical text
//! rendering. The rendering is what the generation oracle sees, so its layout
//! is stable:
//!
//! ```text
//! Database Schema:
//!
//! Table: orders
//! Columns:
//!   - id: integer (NOT NULL)
//!   - total: numeric (NULL)
//!
//! ```
//!
//! A description is built once per question cycle and never mutated.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Ordered list of tables in the default schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescription {
    /// Tables ordered by name
    pub tables: Vec<TableDescriptor>,
}

/// A single table and its columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Table name (unique within one description)
    pub name: String,

    /// Columns in physical order
    pub columns: Vec<ColumnDescriptor>,
}

/// A single column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,

    /// Declared type (engine-native name)
    pub data_type: String,

    /// Whether column allows NULL values
    pub nullable: bool,
}

impl SchemaDescription {
    #[must_use]
    pub const fn new(tables: Vec<TableDescriptor>) -> Self {
        Self { tables }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Table names in description order
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    /// Whether a table with exactly this name exists
    #[must_use]
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t.name == name)
    }

    /// Render the canonical textual description fed to the oracle
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::from("Database Schema:\n\n");

        for table in &self.tables {
            // Writing to a String cannot fail
            let _ = writeln!(out, "Table: {}", table.name);
            out.push_str("Columns:\n");
            for column in &table.columns {
                let _ = writeln!(
                    out,
                    "  - {}: {} ({})",
                    column.name,
                    column.data_type,
                    if column.nullable { "NULL" } else { "NOT NULL" }
                );
            }
            out.push('\n');
        }

        out
    }
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self { name: name.into(), columns }
    }
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self { name: name.into(), data_type: data_type.into(), nullable }
    }
}
