use crate::*;

/// Scale factor for the randomized tests, from the TA environment variable.
pub fn test_amount() -> usize {
    str::parse(&std::env::var("TA").unwrap_or("1".to_string())).unwrap()
}

/// Row cells as display text, for order sensitive comparisons.
fn texts(t: &Table) -> Vec<Vec<String>> {
    t.rows()
        .map(|r| r.values.iter().map(|c| c.to_string()).collect())
        .collect()
}

/// Row cells as display text, sorted, for multiset comparisons.
fn sorted_texts(t: &Table) -> Vec<Vec<String>> {
    let mut result = texts(t);
    result.sort();
    result
}

fn users() -> Table {
    let mut t = Table::new(
        "users",
        &[
            ("id", ColType::Int),
            ("name", ColType::Str),
            ("age", ColType::Int),
        ],
    );
    for (id, name, age) in [(1, "Ali Veli", 25), (2, "Zeynep Kaya", 30), (3, "Can", 40)] {
        let mut row = Row::new(id);
        row.add_int(id).add_str(name).add_int(age);
        t.insert(row).unwrap();
    }
    t
}

fn departments() -> Table {
    let mut t = Table::new(
        "departments",
        &[("dept_id", ColType::Int), ("dept_name", ColType::Str)],
    );
    for (id, name) in [(101, "HR"), (102, "IT"), (103, "Sales")] {
        let mut row = Row::new(id);
        row.add_int(id).add_str(name);
        t.insert(row).unwrap();
    }
    t
}

fn employees() -> Table {
    let mut t = Table::new(
        "employees",
        &[
            ("emp_id", ColType::Int),
            ("name", ColType::Str),
            ("dept", ColType::Int),
        ],
    );
    for (id, name, dept) in [
        (1, "Ali", 102),
        (2, "Ayse", 101),
        (3, "Mehmet", 102),
        (4, "Zeynep", 999),
    ] {
        let mut row = Row::new(id);
        row.add_int(id).add_str(name).add_int(dept);
        t.insert(row).unwrap();
    }
    t
}

fn items() -> Table {
    let mut t = Table::new("items", &[("id", ColType::Int), ("price", ColType::Double)]);
    for (id, price) in [(1, 9.0), (2, 3.0), (3, 7.0), (4, 3.0), (5, 5.0)] {
        let mut row = Row::new(id);
        row.add_int(id).add_float(price);
        t.insert(row).unwrap();
    }
    t
}

fn demo_db() -> Database {
    let mut db = Database::new();
    db.add_table(users());
    db.add_table(departments());
    db.add_table(employees());
    db.add_table(items());
    db
}

#[test]
fn cell_total_order() {
    // Tag order Int < Float < Str, natural order within a tag.
    assert!(Cell::Int(5) < Cell::Int(7));
    assert!(Cell::Int(i64::MAX) < Cell::Float(0.0));
    assert!(Cell::Float(2.5) < Cell::Float(2.6));
    assert!(Cell::Float(f64::MAX) < Cell::str(""));
    assert!(Cell::str("a") < Cell::str("b"));
    assert_eq!(Cell::Int(5), Cell::Int(5));
    assert_ne!(Cell::Int(5), Cell::Float(5.0));
    // NaN is equal to itself so index behaviour stays deterministic.
    assert_eq!(Cell::Float(f64::NAN), Cell::Float(f64::NAN));
    assert_eq!(Cell::default(), Cell::Int(0));
}

#[test]
fn cell_accessors() {
    let c = Cell::Int(42);
    assert_eq!(c.kind(), ColType::Int);
    assert_eq!(c.as_int().unwrap(), 42);
    assert!(matches!(c.as_float(), Err(DbError::TypeMismatch)));
    assert!(matches!(c.as_str(), Err(DbError::TypeMismatch)));
    assert_eq!(Cell::Float(2.5).as_float().unwrap(), 2.5);
    assert_eq!(Cell::str("hi").as_str().unwrap(), "hi");
    assert_eq!(Cell::Int(-3).to_string(), "-3");
    assert_eq!(Cell::Float(2.5).to_string(), "2.5");
    assert_eq!(Cell::str("x").to_string(), "x");
}

#[test]
fn row_cells() {
    let mut row = Row::new(7);
    row.add_int(1).add_float(2.5).add_str("three");
    assert_eq!(row.id, 7);
    assert_eq!(row.values.len(), 3);
    assert_eq!(row.get(0).unwrap(), &Cell::Int(1));
    assert_eq!(row.get(2).unwrap(), &Cell::str("three"));
    assert!(matches!(row.get(3), Err(DbError::IndexOutOfRange(3))));
}

#[test]
fn table_invariants() {
    let mut t = users();
    t.verify();
    assert_eq!(t.row_count(), 3);
    assert_eq!(t.hash().len(), 3);
    assert_eq!(t.btree().len(), 3);

    // Duplicate id fails without touching storage or indexes.
    let mut dup = Row::new(2);
    dup.add_int(2).add_str("x").add_int(1);
    assert!(matches!(t.insert(dup), Err(DbError::DuplicateKey(2))));
    assert_eq!(t.row_count(), 3);
    t.verify();

    // Wrong cell count fails at insert time.
    let mut short = Row::new(9);
    short.add_int(9);
    assert!(matches!(
        t.insert(short),
        Err(DbError::SchemaMismatch { got: 1, want: 3 })
    ));

    assert_eq!(t.get_by_id(2).unwrap().values[1], Cell::str("Zeynep Kaya"));
    assert!(t.get_by_id(99).is_none());

    t.remove(2);
    assert_eq!(t.row_count(), 2);
    assert!(t.get_by_id(2).is_none());
    assert!(!t.btree().search(2).valid());
    t.verify();

    // Removing an absent id is a no-op.
    t.remove(2);
    assert_eq!(t.row_count(), 2);
    t.verify();

    // Iteration stays in insertion order after a removal.
    let ids: Vec<i64> = t.rows().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 3]);

    // Locators resolve through the tree.
    let loc = t.btree().search(3);
    assert!(loc.valid());
    assert_eq!(t.row_at(loc).unwrap().id, 3);
}

#[test]
fn hash_index_basic() {
    let mut ix = HashIndex::new();
    assert_eq!(ix.capacity(), 16);
    assert!(ix.is_empty());
    for i in 0..10 {
        ix.insert(i, i as usize * 10);
    }
    assert_eq!(ix.len(), 10);
    assert_eq!(ix.search(7), Some(70));
    assert_eq!(ix.search(99), None);
    ix.remove(7);
    assert_eq!(ix.search(7), None);
    assert_eq!(ix.len(), 9);
    // Removing an absent key is a no-op.
    ix.remove(7);
    assert_eq!(ix.len(), 9);
}

#[test]
fn hash_index_growth() {
    let mut ix = HashIndex::new();
    // 12 entries sit exactly at the load factor; the 13th insert grows first.
    for i in 0..12 {
        ix.insert(i, i as usize);
    }
    assert_eq!(ix.capacity(), 16);
    ix.insert(12, 12);
    assert_eq!(ix.capacity(), 32);
    assert_eq!(ix.len(), 13);
    for i in 0..13 {
        assert_eq!(ix.search(i), Some(i as usize));
    }
    // Negative keys hash fine.
    ix.insert(-5, 500);
    assert_eq!(ix.search(-5), Some(500));
}

/// Build the seven key tree used by the scan and delete tests ( degree 3 ).
fn small_tree() -> (BPlusTree, Vec<(i64, RecordId)>) {
    let mut tree = BPlusTree::new(3);
    let mut entries = Vec::new();
    for (slot, key) in [10, 20, 5, 6, 12, 30, 15].into_iter().enumerate() {
        let val = RecordId::new(slot);
        assert!(tree.insert(key, val));
        entries.push((key, val));
        tree.verify();
    }
    (tree, entries)
}

#[test]
fn btree_ascending_scan() {
    let (tree, entries) = small_tree();
    assert_eq!(tree.len(), 7);
    assert_eq!(tree.keys(), vec![5, 6, 10, 12, 15, 20, 30]);
    for (key, val) in &entries {
        assert_eq!(tree.search(*key), *val);
    }
    assert_eq!(tree.search(99), RecordId::INVALID);
    assert_eq!(tree.search(7), RecordId::INVALID);
}

#[test]
fn btree_ranges() {
    let (tree, entries) = small_tree();
    let val = |key: i64| entries.iter().find(|(k, _)| *k == key).unwrap().1;
    // Between is inclusive at both ends, in ascending key order.
    assert_eq!(
        tree.range_between(6, 20),
        vec![val(6), val(10), val(12), val(15), val(20)]
    );
    assert_eq!(tree.range_between(21, 25), vec![]);
    // Less than and greater than are exclusive.
    assert_eq!(tree.range_less_than(10), vec![val(5), val(6)]);
    assert_eq!(tree.range_greater_than(20), vec![val(30)]);
    assert_eq!(tree.range_greater_than(30), vec![]);
    let empty = BPlusTree::new(3);
    assert_eq!(empty.range_between(0, 100), vec![]);
}

#[test]
fn btree_delete_merge() {
    let (mut tree, _) = small_tree();
    let mut expect = 7;
    for key in [20, 30, 15] {
        tree.remove(key);
        expect -= 1;
        assert_eq!(tree.len(), expect);
        assert_eq!(tree.search(key), RecordId::INVALID);
        tree.verify();
    }
    assert_eq!(tree.keys(), vec![5, 6, 10, 12]);
    // Deleting an absent key is a no-op.
    tree.remove(99);
    assert_eq!(tree.len(), 4);
    tree.verify();
}

#[test]
fn btree_delete_to_empty() {
    let (mut tree, _) = small_tree();
    for key in [10, 20, 5, 6, 12, 30, 15] {
        tree.remove(key);
        tree.verify();
    }
    assert_eq!(tree.len(), 0);
    assert!(tree.is_empty());
    assert_eq!(tree.keys(), Vec::<i64>::new());
    assert_eq!(tree.search(10), RecordId::INVALID);
    // The tree is reusable after being emptied.
    assert!(tree.insert(42, RecordId::new(0)));
    assert_eq!(tree.keys(), vec![42]);
    tree.verify();
}

#[test]
fn btree_update_in_place() {
    let mut tree = BPlusTree::new(4);
    assert!(tree.insert(1, RecordId::new(0)));
    assert!(!tree.insert(1, RecordId::new(5)));
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.search(1), RecordId::new(5));
    tree.verify();
}

#[test]
fn btree_random_ops() {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    for degree in [3, 4, 5, 8] {
        let mut tree = BPlusTree::new(degree);
        let mut model = BTreeMap::new();
        for i in 0..2000 * test_amount() {
            let key = (rng.gen::<u64>() % 200) as i64;
            if rng.gen::<u64>() % 3 == 0 {
                tree.remove(key);
                model.remove(&key);
            } else {
                let val = RecordId::new(i);
                let added = tree.insert(key, val);
                assert_eq!(added, model.insert(key, val).is_none());
            }
            assert_eq!(tree.len(), model.len());
            if i % 7 == 0 {
                tree.verify();
                let keys: Vec<i64> = model.keys().copied().collect();
                assert_eq!(tree.keys(), keys);
            }
        }
        tree.verify();
        for (&k, &v) in &model {
            assert_eq!(tree.search(k), v);
        }
        assert_eq!(tree.search(1000), RecordId::INVALID);
    }
}

#[test]
#[should_panic]
fn btree_degree_too_small() {
    let _ = BPlusTree::new(2);
}

#[test]
fn parse_full_query() {
    let q = parse(
        "SELECT a, b FROM t JOIN u ON x = y WHERE a >= 10 OR b LIKE 'ab' \
         ORDER BY a, b DESC LIMIT 5 OFFSET 2",
    )
    .unwrap();
    assert_eq!(q.select_columns, vec!["a", "b"]);
    assert_eq!(q.from_tables, vec!["t"]);
    assert_eq!(q.joins.len(), 1);
    assert_eq!(q.joins[0].left_table, "t");
    assert_eq!(q.joins[0].left_column, "x");
    assert_eq!(q.joins[0].right_table, "u");
    assert_eq!(q.joins[0].right_column, "y");
    assert_eq!(q.joins[0].kind, JoinKind::Inner);
    assert_eq!(q.conditions.len(), 2);
    assert_eq!(q.conditions[0].column, "a");
    assert_eq!(q.conditions[0].op, CompareOp::GreaterEqual);
    assert_eq!(q.conditions[0].value, "10");
    assert_eq!(q.conditions[0].connective, Connective::And);
    assert_eq!(q.conditions[1].op, CompareOp::Like);
    assert_eq!(q.conditions[1].value, "ab");
    assert_eq!(q.conditions[1].connective, Connective::Or);
    assert_eq!(q.order_by, vec!["a", "b"]);
    assert!(!q.ascending);
    assert_eq!(q.limit, 5);
    assert_eq!(q.offset, 2);
}

#[test]
fn parse_defaults_and_star() {
    let q = parse("SELECT * FROM users").unwrap();
    assert!(q.select_columns.is_empty());
    assert_eq!(q.from_tables, vec!["users"]);
    assert!(q.joins.is_empty());
    assert!(q.conditions.is_empty());
    assert!(q.order_by.is_empty());
    assert!(q.ascending);
    assert_eq!(q.limit, -1);
    assert_eq!(q.offset, 0);
}

#[test]
fn parse_keywords_case_insensitive() {
    let q = parse("select name from users where age > 20 order by name asc limit 1").unwrap();
    assert_eq!(q.select_columns, vec!["name"]);
    assert_eq!(q.conditions[0].op, CompareOp::Greater);
    assert!(q.ascending);
    assert_eq!(q.limit, 1);
}

#[test]
fn parse_operators() {
    // Two character operators must win over their one character prefixes.
    for (text, op) in [
        ("=", CompareOp::Equal),
        ("!=", CompareOp::NotEqual),
        ("<", CompareOp::Less),
        ("<=", CompareOp::LessEqual),
        (">", CompareOp::Greater),
        (">=", CompareOp::GreaterEqual),
        ("LIKE", CompareOp::Like),
    ] {
        let q = parse(&format!("SELECT * FROM t WHERE a {} 5", text)).unwrap();
        assert_eq!(q.conditions[0].op, op, "operator {}", text);
        assert_eq!(q.conditions[0].value, "5");
    }
    // Negative and decimal literals.
    let q = parse("SELECT * FROM t WHERE a < -1.5").unwrap();
    assert_eq!(q.conditions[0].value, "-1.5");
}

#[test]
fn parse_join_kinds() {
    for (text, kind) in [
        ("JOIN", JoinKind::Inner),
        ("INNER JOIN", JoinKind::Inner),
        ("LEFT JOIN", JoinKind::Left),
        ("RIGHT JOIN", JoinKind::Right),
        ("FULL JOIN", JoinKind::Full),
    ] {
        let q = parse(&format!("SELECT * FROM t {} u ON a = b", text)).unwrap();
        assert_eq!(q.joins[0].kind, kind, "join {}", text);
    }
}

#[test]
fn parse_not_connective() {
    let q = parse("SELECT * FROM t WHERE NOT a = 1 AND NOT b = 2 OR c = 3").unwrap();
    assert_eq!(q.conditions[0].connective, Connective::Not);
    assert_eq!(q.conditions[1].connective, Connective::Not);
    assert_eq!(q.conditions[2].connective, Connective::Or);
}

#[test]
fn parse_failures() {
    for text in [
        "",
        "SELECT",
        "SELECT * users",
        "SELECT * FROM",
        "UPDATE t SET a = 1",
        "SELECT * FROM t WHERE",
        "SELECT * FROM t WHERE a ! 1",
        "SELECT * FROM t JOIN u ON a b",
        "SELECT * FROM t ORDER name",
        "SELECT * FROM t LIMIT x",
        "SELECT * FROM t extra garbage",
    ] {
        assert!(
            matches!(parse(text), Err(DbError::Parse(_))),
            "expected parse failure for {:?}",
            text
        );
    }
}

#[test]
fn join_inner_scenario() {
    let db = demo_db();
    let result = db
        .query("SELECT * FROM departments JOIN employees ON dept_id = dept")
        .unwrap();
    let expect = vec![
        vec!["101", "HR", "2", "Ayse", "101"],
        vec!["102", "IT", "1", "Ali", "102"],
        vec!["102", "IT", "3", "Mehmet", "102"],
    ];
    let expect: Vec<Vec<String>> = expect
        .into_iter()
        .map(|r| r.into_iter().map(String::from).collect())
        .collect();
    assert_eq!(sorted_texts(&result), expect);
    // Result schema is left columns then right columns.
    assert_eq!(
        result.columns(),
        ["dept_id", "dept_name", "emp_id", "name", "dept"]
    );
}

#[test]
fn join_algorithms_agree() {
    // Same inner multiset from both physical operators, including duplicate keys.
    let mut left = Table::new("l", &[("k", ColType::Int), ("a", ColType::Str)]);
    for (id, k, a) in [(1, 10, "x"), (2, 20, "y"), (3, 10, "z"), (4, 30, "w")] {
        let mut row = Row::new(id);
        row.add_int(k).add_str(a);
        left.insert(row).unwrap();
    }
    let mut right = Table::new("r", &[("k", ColType::Int), ("b", ColType::Str)]);
    for (id, k, b) in [(1, 10, "p"), (2, 10, "q"), (3, 30, "r"), (4, 40, "s")] {
        let mut row = Row::new(id);
        row.add_int(k).add_str(b);
        right.insert(row).unwrap();
    }
    let nl = join::nested_loop(&left, &right, 0, 0, JoinKind::Inner);
    let h = join::hash(&left, &right, 0, 0, JoinKind::Inner);
    assert_eq!(nl.row_count(), 5);
    assert_eq!(sorted_texts(&nl), sorted_texts(&h));
    // The same holds for the outer kinds.
    for kind in [JoinKind::Left, JoinKind::Right, JoinKind::Full] {
        let nl = join::nested_loop(&left, &right, 0, 0, kind);
        let h = join::hash(&left, &right, 0, 0, kind);
        assert_eq!(sorted_texts(&nl), sorted_texts(&h), "kind {:?}", kind);
    }
}

#[test]
fn join_outer_padding() {
    let db = demo_db();
    // Sales has no employees; the left join pads the right side with NULL text.
    let left = db
        .query("SELECT * FROM departments LEFT JOIN employees ON dept_id = dept")
        .unwrap();
    assert_eq!(left.row_count(), 4);
    let rows = sorted_texts(&left);
    assert!(rows.contains(&vec![
        "103".to_string(),
        "Sales".to_string(),
        "NULL".to_string(),
        "NULL".to_string(),
        "NULL".to_string(),
    ]));

    // Zeynep's department 999 does not exist; the right join pads the left side.
    let right = db
        .query("SELECT * FROM departments RIGHT JOIN employees ON dept_id = dept")
        .unwrap();
    assert_eq!(right.row_count(), 4);
    assert!(sorted_texts(&right).contains(&vec![
        "NULL".to_string(),
        "NULL".to_string(),
        "4".to_string(),
        "Zeynep".to_string(),
        "999".to_string(),
    ]));

    // Full keeps both unmatched sides.
    let full = db
        .query("SELECT * FROM departments FULL JOIN employees ON dept_id = dept")
        .unwrap();
    assert_eq!(full.row_count(), 5);
}

#[test]
fn join_unknown_column() {
    let db = demo_db();
    let result = db.query("SELECT * FROM departments JOIN employees ON nope = dept");
    assert!(matches!(result, Err(DbError::UnknownColumn(c)) if c == "nope"));
}

#[test]
fn exec_basic_select() {
    let db = demo_db();
    let result = db.query("SELECT * FROM users").unwrap();
    assert_eq!(
        texts(&result),
        vec![
            vec!["1".to_string(), "Ali Veli".to_string(), "25".to_string()],
            vec!["2".to_string(), "Zeynep Kaya".to_string(), "30".to_string()],
            vec!["3".to_string(), "Can".to_string(), "40".to_string()],
        ]
    );
}

#[test]
fn exec_point_lookup() {
    let db = demo_db();
    let result = db.query("SELECT name FROM users WHERE id = 2").unwrap();
    assert_eq!(texts(&result), vec![vec!["Zeynep Kaya".to_string()]]);
    assert_eq!(result.columns(), ["name"]);

    let missing = db.query("SELECT name FROM users WHERE id = 42").unwrap();
    assert_eq!(missing.row_count(), 0);
}

#[test]
fn exec_order_limit_offset() {
    let db = demo_db();
    let result = db
        .query("SELECT * FROM items ORDER BY price LIMIT 3 OFFSET 1")
        .unwrap();
    // Ties keep insertion order, the offset drops the first of them.
    assert_eq!(
        texts(&result),
        vec![
            vec!["4".to_string(), "3".to_string()],
            vec!["5".to_string(), "5".to_string()],
            vec!["3".to_string(), "7".to_string()],
        ]
    );
    let desc = db.query("SELECT * FROM items ORDER BY price DESC LIMIT 1").unwrap();
    assert_eq!(texts(&desc), vec![vec!["1".to_string(), "9".to_string()]]);
}

#[test]
fn exec_where_fold() {
    let db = demo_db();
    // The fold has no precedence: connectives combine with the running match.
    let result = db
        .query("SELECT name FROM users WHERE id = 1 OR id = 2")
        .unwrap();
    assert_eq!(result.row_count(), 2);

    let result = db
        .query("SELECT name FROM users WHERE age > 20 AND age < 35")
        .unwrap();
    assert_eq!(result.row_count(), 2);

    let result = db
        .query("SELECT name FROM users WHERE name LIKE 'Kaya'")
        .unwrap();
    assert_eq!(texts(&result), vec![vec!["Zeynep Kaya".to_string()]]);

    let result = db
        .query("SELECT name FROM users WHERE NOT age = 25")
        .unwrap();
    assert_eq!(result.row_count(), 2);

    // String comparison applies when either side is not numeric.
    let result = db
        .query("SELECT name FROM users WHERE name >= 'Can'")
        .unwrap();
    assert_eq!(result.row_count(), 2);
}

#[test]
fn exec_unknown_names() {
    let db = demo_db();
    assert!(matches!(
        db.query("SELECT * FROM missing"),
        Err(DbError::UnknownTable(t)) if t == "missing"
    ));
    assert!(matches!(
        db.query("SELECT * FROM users JOIN missing ON id = id"),
        Err(DbError::UnknownTable(t)) if t == "missing"
    ));
    // Unknown column in WHERE excludes every row but the query still runs.
    let result = db.query("SELECT * FROM users WHERE nope = 1").unwrap();
    assert_eq!(result.row_count(), 0);
    // Unknown column in the select list is skipped.
    let result = db.query("SELECT name, nope FROM users").unwrap();
    assert_eq!(result.columns(), ["name"]);
    // A select list with nothing resolvable passes the input through.
    let result = db.query("SELECT nope FROM users").unwrap();
    assert_eq!(result.columns(), ["id", "name", "age"]);
    // Unknown order column keeps the original order.
    let result = db.query("SELECT * FROM users ORDER BY nope").unwrap();
    assert_eq!(texts(&result), texts(&db.query("SELECT * FROM users").unwrap()));
}

#[test]
fn exec_limit_offset_idempotent() {
    let mut db = demo_db();
    // Splitting offset and limit over two queries matches doing both at once.
    let offset_only = db.query("SELECT * FROM items LIMIT -1 OFFSET 1").unwrap();
    let mut staged = Table::new("staged", &[("id", ColType::Int), ("price", ColType::Double)]);
    for row in offset_only.rows() {
        staged.insert(row.clone()).unwrap();
    }
    db.add_table(staged);
    let split = db.query("SELECT * FROM staged LIMIT 3").unwrap();
    let combined = db.query("SELECT * FROM items LIMIT 3 OFFSET 1").unwrap();
    assert_eq!(texts(&split), texts(&combined));
}

#[test]
fn exec_deterministic() {
    let db = demo_db();
    let sql = "SELECT name FROM departments JOIN employees ON dept_id = dept \
               WHERE dept >= 100 ORDER BY name LIMIT 2";
    let a = db.query(sql).unwrap();
    let b = db.query(sql).unwrap();
    assert_eq!(texts(&a), texts(&b));
}

#[test]
fn exec_multi_column_order() {
    let db = demo_db();
    // The direction applies to the whole key list; the price tie between rows
    // 2 and 4 is broken by the second order column.
    let result = db
        .query("SELECT * FROM items ORDER BY price, id DESC")
        .unwrap();
    assert_eq!(
        texts(&result),
        vec![
            vec!["1".to_string(), "9".to_string()],
            vec!["3".to_string(), "7".to_string()],
            vec!["5".to_string(), "5".to_string()],
            vec!["4".to_string(), "3".to_string()],
            vec!["2".to_string(), "3".to_string()],
        ]
    );
}

#[test]
fn database_tables() {
    let mut db = Database::new();
    assert!(db.add_table(users()).is_none());
    assert!(db.get_table("users").is_some());
    assert!(db.get_table("missing").is_none());
    // Adding under an existing name replaces and hands back the old table.
    let displaced = db.add_table(users());
    assert_eq!(displaced.unwrap().row_count(), 3);
    db.add_table(items());
    assert_eq!(db.table_names(), vec!["items", "users"]);
}

#[test]
fn doc_round_trip() {
    let t = users();
    let doc = table_to_doc(&t);
    assert_eq!(doc.table_name, "users");
    assert_eq!(doc.columns, ["id", "name", "age"]);
    assert_eq!(doc.column_types, [ColType::Int, ColType::Str, ColType::Int]);
    assert_eq!(doc.rows.len(), 3);
    assert_eq!(doc.rows[0][1], serde_json::Value::from("Ali Veli"));

    let back = table_from_doc(&doc).unwrap();
    assert_eq!(texts(&back), texts(&t));
    // Row ids come from the ID column, so the indexes work after a reload.
    assert_eq!(back.get_by_id(2).unwrap().values[1], Cell::str("Zeynep Kaya"));
    back.verify();

    // The JSON text round trips too.
    let json = serde_json::to_string(&doc).unwrap();
    assert!(json.contains("\"INT\""));
    let doc2: TableDoc = serde_json::from_str(&json).unwrap();
    let back2 = table_from_doc(&doc2).unwrap();
    assert_eq!(texts(&back2), texts(&t));
}

#[test]
fn doc_round_trip_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.json");
    let t = items();
    save_table(&t, &path).unwrap();
    let back = load_table(&path).unwrap();
    assert_eq!(back.name(), "items");
    assert_eq!(texts(&back), texts(&t));
    // Point lookups keep working after the reload.
    assert_eq!(back.get_by_id(4).unwrap().values[1], Cell::Float(3.0));
}

#[test]
fn web_dispatch() {
    let mut db = demo_db();

    let mut wq = web::WebQuery::request(
        "GET",
        "/query",
        &[("sql", "SELECT name FROM users WHERE id = 2")],
    );
    web::dispatch(&mut db, &mut wq);
    assert_eq!(wq.status_code, "200 OK");
    let v: serde_json::Value = serde_json::from_slice(&wq.output).unwrap();
    assert_eq!(v["columns"], serde_json::json!(["name"]));
    assert_eq!(v["rows"][0][0], "Zeynep Kaya");

    // Executor failures surface as 4xx.
    let mut wq = web::WebQuery::request("GET", "/query", &[("sql", "SELECT * FROM missing")]);
    web::dispatch(&mut db, &mut wq);
    assert_eq!(wq.status_code, "400 Bad Request");

    let mut wq = web::WebQuery::request("GET", "/tables", &[]);
    web::dispatch(&mut db, &mut wq);
    let v: serde_json::Value = serde_json::from_slice(&wq.output).unwrap();
    assert_eq!(
        v["tables"],
        serde_json::json!(["departments", "employees", "items", "users"])
    );

    let mut wq = web::WebQuery::request(
        "GET",
        "/insert",
        &[("table", "users"), ("id", "4"), ("name", "Deniz"), ("age", "22")],
    );
    web::dispatch(&mut db, &mut wq);
    assert_eq!(wq.status_code, "200 OK");
    assert_eq!(db.get_table("users").unwrap().row_count(), 4);
    assert_eq!(
        db.get_table("users").unwrap().get_by_id(4).unwrap().values[1],
        Cell::str("Deniz")
    );

    let mut wq = web::WebQuery::request("GET", "/delete", &[("table", "users"), ("id", "4")]);
    web::dispatch(&mut db, &mut wq);
    assert_eq!(wq.status_code, "200 OK");
    assert_eq!(db.get_table("users").unwrap().row_count(), 3);

    let mut wq = web::WebQuery::request("GET", "/get_all", &[("table", "items")]);
    web::dispatch(&mut db, &mut wq);
    let v: serde_json::Value = serde_json::from_slice(&wq.output).unwrap();
    assert_eq!(v["table_name"], "items");
    assert_eq!(v["rows"].as_array().unwrap().len(), 5);

    let mut wq = web::WebQuery::request("GET", "/nope", &[]);
    web::dispatch(&mut db, &mut wq);
    assert_eq!(wq.status_code, "404 Not Found");
}

#[test]
fn doc_type_mismatch() {
    let mut doc = table_to_doc(&users());
    doc.rows[0][0] = serde_json::Value::from("not a number");
    assert!(matches!(table_from_doc(&doc), Err(DbError::Document(_))));

    let mut doc = table_to_doc(&users());
    doc.rows[1].pop();
    assert!(matches!(table_from_doc(&doc), Err(DbError::Document(_))));

    // An integer number is accepted for a DOUBLE column.
    let mut doc = table_to_doc(&items());
    doc.rows[0][1] = serde_json::Value::from(4);
    let back = table_from_doc(&doc).unwrap();
    assert_eq!(back.get_by_id(1).unwrap().values[1], Cell::Float(4.0));
}
