//!
//!ToDo List:
//!
//!Per-column ASC/DESC for ORDER BY ( currently one direction for the whole key list ).
//!
//!Operator precedence for WHERE connectives ( currently a left fold ).
//!
//! In-memory SQL database engine.
//! Example program:
//! ```
//!use memdb::{ColType, Database, Row, Table};
//!    let mut db = Database::new();
//!    let mut users = Table::new(
//!        "users",
//!        &[("id", ColType::Int), ("name", ColType::Str), ("age", ColType::Int)],
//!    );
//!    let mut row = Row::new(1);
//!    row.add_int(1).add_str("Ali Veli").add_int(25);
//!    users.insert(row).unwrap();
//!    db.add_table(users);
//!    let result = db.query("SELECT name FROM users WHERE id = 1").unwrap();
//!    assert_eq!(result.row_count(), 1);
//! ```
//!
//!General Design of Database
//!
//!A Table owns its rows in a slot arena ( removed rows leave a tombstone so record
//!locators stay stable ) and keeps two primary indexes over the row id: a separately
//!chained HashIndex for point lookups and a BPlusTree for ordered and range access.
//!Both indexes store arena slots, never owning references; the arena is the single
//!owner of every row, and a row owns its cells.
//!
//!Queries go through parse ( text to Query AST ) and execute ( staged pipeline
//!FROM, JOIN, WHERE, SELECT, ORDER BY, LIMIT ). Each stage is a pure function from
//!a table to a fresh result table; the executor hands ownership down the pipeline
//!and keeps borrowing the stored table until the first stage that materializes.
//!A WHERE predicate on the primary key column is rewritten into a hash index point
//!lookup when the pipeline is still reading the stored table.
//!
//!Joins merge the two schemas ( left columns then right columns, duplicate names
//!allowed ) and compare key cells through one textual canonicalization, so values
//!of different tags join on a common domain. Small inputs use a nested loop; larger
//!ones build a chained hash table over the left rows and probe it with the right.
//!
//!Tables can be exported to and rebuilt from a JSON document holding the schema and
//!the rows as native scalars; loading re-inserts every row, rebuilding both indexes.

use std::{cmp::Ordering, collections::BTreeMap, fmt, rc::Rc};

use thiserror::Error;
use tracing::{debug, trace, warn};

/// Tagged scalar cell values and column type tags.
pub mod value;

/// Table, schema info, rows and record locators.
pub mod table;

/// Dynamic separately chained hash index.
pub mod hashidx;

/// B+ tree index with a linked leaf chain for range scans.
pub mod btree;

/// Query AST types, the result of parsing.
pub mod query;

/// Query parser.
pub mod parse;

/// Physical join operators and join algorithm selection.
pub mod join;

/// Staged query execution.
pub mod exec;

/// Table document save/load.
pub mod stg;

/// Http control surface.
pub mod web;

#[cfg(test)]
mod test;

pub use btree::BPlusTree;
pub use exec::execute;
pub use hashidx::HashIndex;
pub use parse::parse;
pub use query::{CompareOp, Connective, JoinKind, JoinSpec, Predicate, Query};
pub use stg::{load_table, save_table, table_from_doc, table_to_doc, TableDoc};
pub use table::{ColInfo, RecordId, Row, Table};
pub use value::{Cell, ColType};

/// Error reported by the engine.
#[derive(Error, Debug)]
pub enum DbError {
    /// A cell was read at the wrong type tag.
    #[error("cell is not of the requested type")]
    TypeMismatch,
    /// A cell index was past the end of the row.
    #[error("cell index {0} is out of range")]
    IndexOutOfRange(usize),
    /// A name was not present in the table schema.
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
    /// A name was not present in the database.
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    /// The query text could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
    /// A row cell count differed from the table column count.
    #[error("row has {got} cells but the table has {want} columns")]
    SchemaMismatch {
        ///
        got: usize,
        ///
        want: usize,
    },
    /// A row id was already present at insert time.
    #[error("duplicate row id {0}")]
    DuplicateKey(i64),
    /// A table document did not match its declared column types.
    #[error("bad table document: {0}")]
    Document(String),
    ///
    #[error(transparent)]
    Io(#[from] std::io::Error),
    ///
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Shorthand for a result carrying [`DbError`].
pub type Result<T> = std::result::Result<T, DbError>;

/// Container mapping table name to [Table]. Query entry point.
#[derive(Default)]
pub struct Database {
    /// Tables by name.
    pub tables: BTreeMap<String, Table>,
}

impl Database {
    /// Construct an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table under its own name. If the name was already mapped, the new table
    /// replaces it and the displaced table is returned to the caller.
    pub fn add_table(&mut self, t: Table) -> Option<Table> {
        self.tables.insert(t.name().to_string(), t)
    }

    /// Get a table by name.
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Get a table by name for mutation.
    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    /// Names of all present tables, sorted.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Parse and execute a single SELECT statement.
    pub fn query(&self, sql: &str) -> Result<Table> {
        let q = parse(sql)?;
        execute(self, &q)
    }
}
