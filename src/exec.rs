use crate::*;
use std::borrow::Cow;

/// Execute a parsed query: FROM, JOIN, WHERE ( with index push-down ), SELECT,
/// ORDER BY, LIMIT. Each stage is a pure function producing a fresh table; the
/// running result stays borrowed from the database until a stage materializes.
pub fn execute(db: &Database, q: &Query) -> Result<Table> {
    let Some(first) = q.from_tables.first() else {
        return Err(DbError::Parse("query has no FROM table".to_string()));
    };
    let base = db
        .get_table(first)
        .ok_or_else(|| DbError::UnknownTable(first.clone()))?;
    let mut cur: Cow<Table> = Cow::Borrowed(base);
    for spec in &q.joins {
        let right = db
            .get_table(&spec.right_table)
            .ok_or_else(|| DbError::UnknownTable(spec.right_table.clone()))?;
        cur = Cow::Owned(join::execute(&cur, right, spec)?);
    }
    if !q.conditions.is_empty() {
        // Push-down only applies while the result is still the stored table.
        if matches!(cur, Cow::Borrowed(_)) {
            if let Some(narrowed) = index_lookup(&cur, &q.conditions) {
                cur = Cow::Owned(narrowed);
            }
        }
        cur = Cow::Owned(apply_where(&cur, &q.conditions));
    }
    if !q.select_columns.is_empty() {
        if let Some(projected) = apply_select(&cur, &q.select_columns) {
            cur = Cow::Owned(projected);
        }
    }
    if !q.order_by.is_empty() {
        cur = Cow::Owned(apply_order_by(&cur, &q.order_by, q.ascending));
    }
    if q.limit >= 0 || q.offset > 0 {
        cur = Cow::Owned(apply_limit(&cur, q.limit, q.offset));
    }
    Ok(cur.into_owned())
}

/// Index push-down: a predicate `ID = <integer>` with the column present in the
/// schema bypasses the scan and reads the primary hash index directly.
fn index_lookup(table: &Table, conditions: &[Predicate]) -> Option<Table> {
    table.info.get_ci("ID")?;
    for cond in conditions {
        if cond.op != CompareOp::Equal || !cond.column.eq_ignore_ascii_case("ID") {
            continue;
        }
        let Ok(id) = cond.value.parse::<i64>() else {
            continue;
        };
        debug!("index push-down on {} for id {}", table.name(), id);
        let mut result = table.derived("_index_scan");
        if let Some(row) = table.get_by_id(id) {
            result.push_row(row.clone());
        }
        return Some(result);
    }
    None
}

/// WHERE stage: fold the predicates over each row in list order. And tightens,
/// Or loosens, Not tightens with the match negated; there is no precedence.
fn apply_where(table: &Table, conditions: &[Predicate]) -> Table {
    let mut result = table.derived("_filtered");
    for row in table.rows() {
        let mut keep = true;
        for cond in conditions {
            let m = matches_condition(table, row, cond);
            keep = match cond.connective {
                Connective::And => keep && m,
                Connective::Or => keep || m,
                Connective::Not => keep && !m,
            };
        }
        if keep {
            result.push_row(row.clone());
        }
    }
    result
}

/// Evaluate one predicate against a row. An unknown column or a missing cell
/// makes the row non-matching; the query keeps running.
fn matches_condition(table: &Table, row: &Row, cond: &Predicate) -> bool {
    let Some(ix) = table.info.get(&cond.column) else {
        return false;
    };
    let Some(cell) = row.values.get(ix) else {
        return false;
    };
    let cell_text = cell.to_string();
    if cond.op == CompareOp::Like {
        return cell_text.contains(&cond.value);
    }
    // Numeric comparison when both sides parse as numbers, text otherwise.
    let ord = match (cell_text.parse::<f64>(), cond.value.parse::<f64>()) {
        (Ok(a), Ok(b)) => match a.partial_cmp(&b) {
            Some(ord) => ord,
            None => return false,
        },
        _ => cell_text.as_str().cmp(cond.value.as_str()),
    };
    match cond.op {
        CompareOp::Equal => ord == Ordering::Equal,
        CompareOp::NotEqual => ord != Ordering::Equal,
        CompareOp::Less => ord == Ordering::Less,
        CompareOp::LessEqual => ord != Ordering::Greater,
        CompareOp::Greater => ord == Ordering::Greater,
        CompareOp::GreaterEqual => ord != Ordering::Less,
        CompareOp::Like => unreachable!(),
    }
}

/// Projection stage. Unknown names are skipped; when nothing resolves the input
/// passes through unchanged ( None ).
fn apply_select(table: &Table, names: &[String]) -> Option<Table> {
    let mut indices = Vec::new();
    let mut info = ColInfo::empty("projected");
    for name in names {
        match table.info.get(name) {
            Some(ix) => {
                indices.push(ix);
                info.add(name.clone(), table.types()[ix]);
            }
            None => warn!("projection skips unknown column '{}'", name),
        }
    }
    if indices.is_empty() {
        return None;
    }
    let mut result = Table::from_info(info);
    for row in table.rows() {
        let mut nr = Row::new(row.id);
        for &ix in &indices {
            if let Some(cell) = row.values.get(ix) {
                nr.add_cell(cell.clone());
            }
        }
        result.push_row(nr);
    }
    Some(result)
}

/// ORDER BY stage: stable sort on the resolvable order columns in list order,
/// using the cell total order. Unknown columns keep the original order.
fn apply_order_by(table: &Table, names: &[String], ascending: bool) -> Table {
    let cols: Vec<usize> = names
        .iter()
        .filter_map(|name| {
            let ix = table.info.get(name);
            if ix.is_none() {
                warn!("order by skips unknown column '{}'", name);
            }
            ix
        })
        .collect();
    let mut rows: Vec<&Row> = table.rows().collect();
    if !cols.is_empty() {
        rows.sort_by(|a, b| {
            let mut ord = Ordering::Equal;
            for &ix in &cols {
                ord = match (a.values.get(ix), b.values.get(ix)) {
                    (Some(x), Some(y)) => x.cmp(y),
                    (None, None) => Ordering::Equal,
                    (None, _) => Ordering::Less,
                    (_, None) => Ordering::Greater,
                };
                if ord != Ordering::Equal {
                    break;
                }
            }
            if ascending {
                ord
            } else {
                ord.reverse()
            }
        });
    }
    let mut result = table.derived("_sorted");
    for row in rows {
        result.push_row(row.clone());
    }
    result
}

/// LIMIT/OFFSET stage: skip offset rows, then emit up to limit ( -1 unbounded ).
fn apply_limit(table: &Table, limit: i64, offset: usize) -> Table {
    let take = if limit < 0 { usize::MAX } else { limit as usize };
    let mut result = table.derived("_limit");
    for row in table.rows().skip(offset).take(take) {
        result.push_row(row.clone());
    }
    result
}
