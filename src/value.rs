use crate::*;
use serde::{Deserialize, Serialize};

/// Column type tag ( INT, DOUBLE, STRING ).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ColType {
    ///
    #[serde(rename = "INT")]
    Int,
    ///
    #[serde(rename = "DOUBLE")]
    Double,
    ///
    #[serde(rename = "STRING")]
    Str,
}

impl fmt::Display for ColType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ColType::Int => "INT",
            ColType::Double => "DOUBLE",
            ColType::Str => "STRING",
        })
    }
}

impl std::str::FromStr for ColType {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "INT" => Ok(ColType::Int),
            "DOUBLE" => Ok(ColType::Double),
            "STRING" => Ok(ColType::Str),
            _ => Err(DbError::Document(format!("unknown column type '{}'", s))),
        }
    }
}

/// Tagged scalar value ( Int, Float, Str ) stored in a row.
///
/// Cells are immutable once constructed and totally ordered: tag first
/// ( Int < Float < Str ), then the natural ordering of the payload. Floats
/// compare bitwise via `total_cmp`, so NaN is equal to itself and index
/// behaviour stays deterministic.
#[derive(Clone, Debug)]
pub enum Cell {
    ///
    Int(i64),
    ///
    Float(f64),
    ///
    Str(Rc<String>),
}

impl Cell {
    /// Construct a Str cell.
    pub fn str(s: &str) -> Cell {
        Cell::Str(Rc::new(s.to_string()))
    }

    /// Type tag of the cell.
    pub fn kind(&self) -> ColType {
        match self {
            Cell::Int(_) => ColType::Int,
            Cell::Float(_) => ColType::Double,
            Cell::Str(_) => ColType::Str,
        }
    }

    /// Integer payload.
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Cell::Int(x) => Ok(*x),
            _ => Err(DbError::TypeMismatch),
        }
    }

    /// Float payload.
    pub fn as_float(&self) -> Result<f64> {
        match self {
            Cell::Float(x) => Ok(*x),
            _ => Err(DbError::TypeMismatch),
        }
    }

    /// String payload.
    pub fn as_str(&self) -> Result<&str> {
        match self {
            Cell::Str(s) => Ok(s),
            _ => Err(DbError::TypeMismatch),
        }
    }

    /// Tag rank for the total order.
    fn rank(&self) -> u8 {
        match self {
            Cell::Int(_) => 0,
            Cell::Float(_) => 1,
            Cell::Str(_) => 2,
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::Int(0)
    }
}

impl From<i64> for Cell {
    fn from(x: i64) -> Self {
        Cell::Int(x)
    }
}

impl From<f64> for Cell {
    fn from(x: f64) -> Self {
        Cell::Float(x)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::str(s)
    }
}

/// Display doubles as the join key canonicalization: integers and floats in
/// decimal, text as itself. Both join sides must go through this one place.
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cell::Int(x) => write!(f, "{}", x),
            Cell::Float(x) => write!(f, "{}", x),
            Cell::Str(s) => f.write_str(s),
        }
    }
}

/// Cell comparison: lexicographic on ( tag, payload ).
impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Cell::Int(a), Cell::Int(b)) => a.cmp(b),
            (Cell::Float(a), Cell::Float(b)) => a.total_cmp(b),
            (Cell::Str(a), Cell::Str(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Cell {}
