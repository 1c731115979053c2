use crate::*;

/// B+ tree degree used for the primary ordered index.
const PRIMARY_DEGREE: usize = 4;

/// Record locator: storage position plus a non-owning handle to the row.
///
/// The page number is a placeholder zero in this in-memory engine; the slot is
/// the row's position in the owning table's arena and doubles as the row handle.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RecordId {
    /// Page number ( always zero for the in-memory arena ).
    pub page: i64,
    /// Arena slot of the row in the owning table.
    pub slot: i64,
}

impl RecordId {
    /// Sentinel locator returned when a key is not present.
    pub const INVALID: RecordId = RecordId { page: -1, slot: -1 };

    /// Locator for an arena slot.
    pub fn new(slot: usize) -> Self {
        Self {
            page: 0,
            slot: slot as i64,
        }
    }

    /// False for the sentinel.
    pub fn valid(&self) -> bool {
        self.page >= 0 && self.slot >= 0
    }
}

/// Table name, column names and types, column name lookup.
#[derive(Clone)]
pub struct ColInfo {
    /// Table name.
    pub name: String,
    /// Column names. Duplicates are allowed ( join results merge two schemas ).
    pub colnames: Vec<String>,
    /// Column types.
    pub types: Vec<ColType>,
    /// Map from column name to the first column number with that name.
    colmap: BTreeMap<String, usize>,
}

impl ColInfo {
    /// Construct an empty ColInfo with no columns.
    pub fn empty(name: &str) -> Self {
        ColInfo {
            name: name.to_string(),
            colnames: Vec::new(),
            types: Vec::new(),
            colmap: BTreeMap::new(),
        }
    }

    /// Construct a ColInfo from a list of column names and types.
    pub fn new(name: &str, ct: &[(&str, ColType)]) -> Self {
        let mut result = Self::empty(name);
        for (n, t) in ct {
            result.add((*n).to_string(), *t);
        }
        result
    }

    /// Add a column. A duplicate name is kept, but lookup keeps resolving to the
    /// first column with that name.
    pub fn add(&mut self, name: String, typ: ColType) {
        let cn = self.colnames.len();
        self.types.push(typ);
        self.colnames.push(name.clone());
        self.colmap.entry(name).or_insert(cn);
    }

    /// Column number for a name ( first match ).
    pub fn get(&self, name: &str) -> Option<usize> {
        self.colmap.get(name).copied()
    }

    /// Column number for a name, compared case-insensitively ( first match ).
    pub fn get_ci(&self, name: &str) -> Option<usize> {
        self.colnames.iter().position(|n| n.eq_ignore_ascii_case(name))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.colnames.len()
    }

    /// True when there are no columns.
    pub fn is_empty(&self) -> bool {
        self.colnames.is_empty()
    }
}

/// Row of cells with an externally supplied id ( the primary key ).
#[derive(Clone, Debug)]
pub struct Row {
    /// Row id.
    pub id: i64,
    /// Cell values in append order.
    pub values: Vec<Cell>,
}

impl Row {
    /// Construct an empty row with the given id.
    pub fn new(id: i64) -> Self {
        Row {
            id,
            values: Vec::new(),
        }
    }

    /// Append an integer cell.
    pub fn add_int(&mut self, x: i64) -> &mut Self {
        self.values.push(Cell::Int(x));
        self
    }

    /// Append a float cell.
    pub fn add_float(&mut self, x: f64) -> &mut Self {
        self.values.push(Cell::Float(x));
        self
    }

    /// Append a text cell.
    pub fn add_str(&mut self, s: &str) -> &mut Self {
        self.values.push(Cell::str(s));
        self
    }

    /// Append a cell.
    pub fn add_cell(&mut self, c: Cell) -> &mut Self {
        self.values.push(c);
        self
    }

    /// Cell by zero-based index.
    pub fn get(&self, ix: usize) -> Result<&Cell> {
        self.values.get(ix).ok_or(DbError::IndexOutOfRange(ix))
    }
}

/// Named table: schema, row arena and the two primary indexes.
///
/// Invariant across every mutating operation: each stored row id is in the hash
/// index ( id to slot ) and in the B+ tree ( id to locator ), no two rows share
/// an id, and the live row count equals the cardinality of both indexes.
#[derive(Clone)]
pub struct Table {
    /// Column names and types, shared with code that interrogates the schema.
    pub info: Rc<ColInfo>,
    /// Slot arena. Removed rows leave a tombstone so locators stay stable.
    rows: Vec<Option<Row>>,
    /// Live row count.
    live: usize,
    /// Row id allocator for derived tables.
    id_gen: i64,
    /// Primary hash index, id to arena slot.
    hash: HashIndex,
    /// Primary ordered index, id to record locator.
    btree: BPlusTree,
}

impl Table {
    /// Construct an empty table from a list of column names and types.
    pub fn new(name: &str, ct: &[(&str, ColType)]) -> Self {
        Self::from_info(ColInfo::new(name, ct))
    }

    /// Construct an empty table with the specified info.
    pub fn from_info(info: ColInfo) -> Self {
        Table {
            info: Rc::new(info),
            rows: Vec::new(),
            live: 0,
            id_gen: 0,
            hash: HashIndex::new(),
            btree: BPlusTree::new(PRIMARY_DEGREE),
        }
    }

    /// Empty table with the same schema, name extended by a suffix.
    pub(crate) fn derived(&self, suffix: &str) -> Table {
        let mut info = (*self.info).clone();
        info.name = format!("{}{}", info.name, suffix);
        Self::from_info(info)
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Column names.
    pub fn columns(&self) -> &[String] {
        &self.info.colnames
    }

    /// Column types.
    pub fn types(&self) -> &[ColType] {
        &self.info.types
    }

    /// Number of live rows.
    pub fn row_count(&self) -> usize {
        self.live
    }

    /// Primary ordered index, for the query planner.
    pub fn btree(&self) -> &BPlusTree {
        &self.btree
    }

    /// Primary hash index, for the query planner.
    pub fn hash(&self) -> &HashIndex {
        &self.hash
    }

    /// Insert a row. The row must match the schema width and carry an id not yet
    /// present; both are checked before anything is mutated, so a failed insert
    /// leaves the row storage and both indexes untouched.
    pub fn insert(&mut self, row: Row) -> Result<()> {
        if row.values.len() != self.info.len() {
            return Err(DbError::SchemaMismatch {
                got: row.values.len(),
                want: self.info.len(),
            });
        }
        if self.hash.search(row.id).is_some() {
            return Err(DbError::DuplicateKey(row.id));
        }
        self.push_row(row);
        Ok(())
    }

    /// Append a row whose id is known to be fresh. Panics if the id is a duplicate.
    pub(crate) fn push_row(&mut self, row: Row) {
        if row.values.len() != self.info.len() {
            warn!(
                "row {} has {} cells, schema of '{}' has {} columns",
                row.id,
                row.values.len(),
                self.info.name,
                self.info.len()
            );
        }
        let id = row.id;
        if id >= self.id_gen {
            self.id_gen = id + 1;
        }
        let slot = self.rows.len();
        self.rows.push(Some(row));
        self.hash.insert(id, slot);
        let added = self.btree.insert(id, RecordId::new(slot));
        assert!(added, "duplicate row id {} reached the indexes", id);
        self.live += 1;
        self.check_counts();
    }

    /// Allocate a fresh row id ( used when building derived result tables ).
    pub fn alloc_id(&mut self) -> i64 {
        let id = self.id_gen;
        self.id_gen += 1;
        id
    }

    /// Row with the specified id, via the hash index.
    pub fn get_by_id(&self, id: i64) -> Option<&Row> {
        let slot = self.hash.search(id)?;
        self.rows[slot].as_ref()
    }

    /// Row behind a record locator.
    pub fn row_at(&self, r: RecordId) -> Option<&Row> {
        if !r.valid() {
            return None;
        }
        self.rows.get(r.slot as usize)?.as_ref()
    }

    /// Remove the row with the specified id from both indexes and the arena.
    /// A no-op when the id is absent.
    pub fn remove(&mut self, id: i64) {
        match self.hash.search(id) {
            None => warn!("remove of absent row id {} in '{}'", id, self.info.name),
            Some(slot) => {
                self.hash.remove(id);
                self.btree.remove(id);
                self.rows[slot] = None;
                self.live -= 1;
                self.check_counts();
            }
        }
    }

    /// Iterate the rows in insertion order.
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter_map(|r| r.as_ref())
    }

    /// Both indexes must stay in step with the row storage.
    fn check_counts(&self) {
        assert!(
            self.live == self.hash.len() && self.live == self.btree.len(),
            "primary indexes out of step with row storage in '{}'",
            self.info.name
        );
    }

    #[cfg(any(feature = "verify", test))]
    /// Verify that both indexes agree with the row storage, and that the tree
    /// structure is sound.
    pub fn verify(&self) {
        self.check_counts();
        self.btree.verify();
        for (slot, row) in self.rows.iter().enumerate() {
            if let Some(row) = row {
                assert_eq!(self.hash.search(row.id), Some(slot));
                assert_eq!(self.btree.search(row.id), RecordId::new(slot));
            }
        }
    }
}

/// Aligned textual dump of the schema and all rows.
impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        const W: usize = 15;
        writeln!(f, "=== TABLE: {} ===", self.info.name)?;
        for col in self.columns() {
            write!(f, "{:<W$}", col)?;
        }
        writeln!(f)?;
        writeln!(f, "{}", "-".repeat(W * self.info.len().max(1)))?;
        for row in self.rows() {
            for cell in &row.values {
                write!(f, "{:<W$}", cell.to_string())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
