use crate::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Table document: schema plus rows encoded as native JSON scalars in the
/// declared column types ( INT integer, DOUBLE number, STRING string ).
#[derive(Serialize, Deserialize, Debug)]
pub struct TableDoc {
    ///
    pub table_name: String,
    ///
    pub columns: Vec<String>,
    ///
    pub column_types: Vec<ColType>,
    ///
    pub rows: Vec<Vec<Value>>,
}

/// Encode a table as a document.
pub fn table_to_doc(t: &Table) -> TableDoc {
    TableDoc {
        table_name: t.name().to_string(),
        columns: t.columns().to_vec(),
        column_types: t.types().to_vec(),
        rows: t
            .rows()
            .map(|row| row.values.iter().map(cell_to_json).collect())
            .collect(),
    }
}

/// Rebuild a table from a document, inserting rows in document order so both
/// primary indexes are rebuilt as a side effect.
///
/// The document does not carry row ids: when the schema has an INT column
/// named ID ( any case ) that cell becomes the row id, otherwise ids follow
/// document order.
pub fn table_from_doc(doc: &TableDoc) -> Result<Table> {
    if doc.columns.len() != doc.column_types.len() {
        return Err(DbError::Document(format!(
            "{} columns but {} column types",
            doc.columns.len(),
            doc.column_types.len()
        )));
    }
    let mut info = ColInfo::empty(&doc.table_name);
    for (n, t) in doc.columns.iter().zip(&doc.column_types) {
        info.add(n.clone(), *t);
    }
    let id_col = info
        .get_ci("ID")
        .filter(|&ix| doc.column_types[ix] == ColType::Int);
    let mut table = Table::from_info(info);
    for (ix, cells) in doc.rows.iter().enumerate() {
        if cells.len() != doc.column_types.len() {
            return Err(DbError::Document(format!(
                "row {} has {} cells, schema has {} columns",
                ix,
                cells.len(),
                doc.column_types.len()
            )));
        }
        let id = match id_col {
            Some(c) => cells[c].as_i64().ok_or_else(|| {
                DbError::Document(format!("row {} has a non-integer id cell", ix))
            })?,
            None => ix as i64,
        };
        let mut row = Row::new(id);
        for (val, typ) in cells.iter().zip(&doc.column_types) {
            row.add_cell(json_to_cell(val, *typ)?);
        }
        table.insert(row)?;
    }
    Ok(table)
}

/// Write a table document to a file.
pub fn save_table(t: &Table, path: &Path) -> Result<()> {
    let doc = table_to_doc(t);
    std::fs::write(path, serde_json::to_string_pretty(&doc)?)?;
    debug!("saved table '{}' to {}", t.name(), path.display());
    Ok(())
}

/// Read a table document from a file and rebuild the table.
pub fn load_table(path: &Path) -> Result<Table> {
    let doc: TableDoc = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    let table = table_from_doc(&doc)?;
    debug!(
        "loaded table '{}' from {} ({} rows)",
        table.name(),
        path.display(),
        table.row_count()
    );
    Ok(table)
}

/// One cell as a native JSON scalar.
fn cell_to_json(c: &Cell) -> Value {
    match c {
        Cell::Int(x) => Value::from(*x),
        Cell::Float(x) => Value::from(*x),
        Cell::Str(s) => Value::from(s.as_str()),
    }
}

/// One JSON scalar as a cell of the declared type. An integer number is
/// accepted for a DOUBLE column; anything else must match exactly.
fn json_to_cell(v: &Value, typ: ColType) -> Result<Cell> {
    let cell = match typ {
        ColType::Int => v.as_i64().map(Cell::Int),
        ColType::Double => v.as_f64().map(Cell::Float),
        ColType::Str => v.as_str().map(Cell::str),
    };
    cell.ok_or_else(|| DbError::Document(format!("cell {} does not fit column type {}", v, typ)))
}
