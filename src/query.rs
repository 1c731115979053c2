/// How two tables are joined.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum JoinKind {
    ///
    Inner,
    ///
    Left,
    ///
    Right,
    ///
    Full,
}

/// Comparison operator of a WHERE predicate.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CompareOp {
    ///
    Equal,
    ///
    NotEqual,
    ///
    Less,
    ///
    LessEqual,
    ///
    Greater,
    ///
    GreaterEqual,
    /// Substring containment, not SQL wildcard matching.
    Like,
}

/// How a predicate combines with the running match of the preceding predicates.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Connective {
    ///
    And,
    ///
    Or,
    /// Tightens like And, with the predicate negated.
    Not,
}

/// One WHERE predicate.
#[derive(Clone, Debug)]
pub struct Predicate {
    /// Column name the predicate reads.
    pub column: String,
    ///
    pub op: CompareOp,
    /// Literal text; numeric interpretation is decided at evaluation time.
    pub value: String,
    ///
    pub connective: Connective,
}

/// Join of the running result with a named table.
#[derive(Clone, Debug)]
pub struct JoinSpec {
    ///
    pub left_table: String,
    ///
    pub left_column: String,
    ///
    pub right_table: String,
    ///
    pub right_column: String,
    ///
    pub kind: JoinKind,
}

/// Parsed query, pure data.
#[derive(Clone, Debug)]
pub struct Query {
    /// Columns to project. Empty means all columns.
    pub select_columns: Vec<String>,
    /// Source tables; execution reads the first.
    pub from_tables: Vec<String>,
    /// Joins, applied in order.
    pub joins: Vec<JoinSpec>,
    /// WHERE predicates, folded in order.
    pub conditions: Vec<Predicate>,
    /// ORDER BY columns.
    pub order_by: Vec<String>,
    /// Sort direction for the whole key list.
    pub ascending: bool,
    /// Maximum row count, -1 for unbounded.
    pub limit: i64,
    /// Rows to skip before emitting.
    pub offset: usize,
}

impl Default for Query {
    fn default() -> Self {
        Query {
            select_columns: Vec::new(),
            from_tables: Vec::new(),
            joins: Vec::new(),
            conditions: Vec::new(),
            order_by: Vec::new(),
            ascending: true,
            limit: -1,
            offset: 0,
        }
    }
}
