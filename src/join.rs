use crate::*;
use rustc_hash::FxHashMap;

/// Inputs with fewer rows than this on both sides use the nested loop.
/// A tuning knob, not semantics: both algorithms agree on the inner multiset.
const NESTED_LOOP_LIMIT: usize = 100;

/// Text used to pad the missing side of an outer join row.
const NULL_TEXT: &str = "NULL";

/// Join two tables. Column names are resolved against each schema; the
/// algorithm is picked from the input sizes.
pub fn execute(left: &Table, right: &Table, spec: &JoinSpec) -> Result<Table> {
    let lcol = left
        .info
        .get(&spec.left_column)
        .ok_or_else(|| DbError::UnknownColumn(spec.left_column.clone()))?;
    let rcol = right
        .info
        .get(&spec.right_column)
        .ok_or_else(|| DbError::UnknownColumn(spec.right_column.clone()))?;
    if left.row_count() < NESTED_LOOP_LIMIT && right.row_count() < NESTED_LOOP_LIMIT {
        debug!(
            "nested loop join {} x {} on {} = {}",
            left.name(),
            right.name(),
            spec.left_column,
            spec.right_column
        );
        Ok(nested_loop(left, right, lcol, rcol, spec.kind))
    } else {
        debug!(
            "hash join {} x {} on {} = {}",
            left.name(),
            right.name(),
            spec.left_column,
            spec.right_column
        );
        Ok(hash(left, right, lcol, rcol, spec.kind))
    }
}

/// Nested loop join: every left row is compared against every right row.
/// Output order is ( left outer order, right inner order ).
pub fn nested_loop(
    left: &Table,
    right: &Table,
    lcol: usize,
    rcol: usize,
    kind: JoinKind,
) -> Table {
    let mut result = Table::from_info(merge_info(left, right, "join_result_nl"));
    let rrows: Vec<&Row> = right.rows().collect();
    let mut rmatched = vec![false; rrows.len()];
    for lrow in left.rows() {
        let Some(lkey) = join_key(lrow, lcol) else {
            continue;
        };
        let mut matched = false;
        for (rix, rrow) in rrows.iter().enumerate() {
            let Some(rkey) = join_key(rrow, rcol) else {
                continue;
            };
            if lkey == rkey {
                push_joined(&mut result, left, right, Some(lrow), Some(rrow));
                matched = true;
                rmatched[rix] = true;
            }
        }
        if !matched && matches!(kind, JoinKind::Left | JoinKind::Full) {
            push_joined(&mut result, left, right, Some(lrow), None);
        }
    }
    if matches!(kind, JoinKind::Right | JoinKind::Full) {
        for (rix, rrow) in rrows.iter().enumerate() {
            if !rmatched[rix] {
                push_joined(&mut result, left, right, None, Some(rrow));
            }
        }
    }
    result
}

/// Hash join: build a chained hash table over the left rows, probe it with the
/// right rows. Output order for matches is ( right outer order, chain order ).
pub fn hash(left: &Table, right: &Table, lcol: usize, rcol: usize, kind: JoinKind) -> Table {
    let lrows: Vec<&Row> = left.rows().collect();
    let mut build: FxHashMap<String, Vec<usize>> = FxHashMap::default();
    for (lix, lrow) in lrows.iter().enumerate() {
        if let Some(key) = join_key(lrow, lcol) {
            build.entry(key).or_default().push(lix);
        }
    }
    let mut lmatched = vec![false; lrows.len()];
    let mut result = Table::from_info(merge_info(left, right, "join_result_hash"));
    for rrow in right.rows() {
        let Some(key) = join_key(rrow, rcol) else {
            continue;
        };
        match build.get(&key) {
            Some(chain) => {
                for &lix in chain {
                    push_joined(&mut result, left, right, Some(lrows[lix]), Some(rrow));
                    lmatched[lix] = true;
                }
            }
            None => {
                if matches!(kind, JoinKind::Right | JoinKind::Full) {
                    push_joined(&mut result, left, right, None, Some(rrow));
                }
            }
        }
    }
    if matches!(kind, JoinKind::Left | JoinKind::Full) {
        for (lix, lrow) in lrows.iter().enumerate() {
            if !lmatched[lix] {
                push_joined(&mut result, left, right, Some(lrow), None);
            }
        }
    }
    result
}

/// Schema of a join result: left columns then right columns. Name collisions
/// are kept; lookups resolve to the first occurrence.
fn merge_info(left: &Table, right: &Table, name: &str) -> ColInfo {
    let mut info = ColInfo::empty(name);
    for (n, t) in left.columns().iter().zip(left.types()) {
        info.add(n.clone(), *t);
    }
    for (n, t) in right.columns().iter().zip(right.types()) {
        info.add(n.clone(), *t);
    }
    info
}

/// Canonical join key text for a row cell, None when the cell is missing.
/// Both sides go through this so equality agrees across tags.
fn join_key(row: &Row, col: usize) -> Option<String> {
    row.values.get(col).map(|c| c.to_string())
}

/// Emit one result row: deep copies of the left and right cells, a missing side
/// padded with NULL text cells of that side's schema width.
fn push_joined(result: &mut Table, left: &Table, right: &Table, lrow: Option<&Row>, rrow: Option<&Row>) {
    let mut row = Row::new(result.alloc_id());
    copy_side(&mut row, lrow, left.columns().len());
    copy_side(&mut row, rrow, right.columns().len());
    result.push_row(row);
}

/// Append width cells from a source row, padding with NULL text.
fn copy_side(row: &mut Row, source: Option<&Row>, width: usize) {
    for ix in 0..width {
        match source.and_then(|r| r.values.get(ix)) {
            Some(cell) => row.add_cell(cell.clone()),
            None => row.add_str(NULL_TEXT),
        };
    }
}
