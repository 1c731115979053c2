use memdb::{stg, ColType, Database, Row, Table};
use tracing_subscriber::EnvFilter;

/// Seed the demo tables, run a few queries and round-trip a table through the
/// JSON document format. Set RUST_LOG=memdb=debug to watch planner decisions.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut db = Database::new();
    db.add_table(users());
    db.add_table(departments());
    db.add_table(employees());
    db.add_table(items());

    let mut args = std::env::args().skip(1);
    if args.next().as_deref() == Some("serve") {
        let addr = args.next().unwrap_or_else(|| "127.0.0.1:8080".to_string());
        println!("serving on http://{}", addr);
        if let Err(e) = memdb::web::serve(&mut db, &addr) {
            println!("server error: {}", e);
        }
        return;
    }

    let queries = [
        "SELECT * FROM users",
        "SELECT name FROM users WHERE id = 2",
        "SELECT * FROM departments JOIN employees ON dept_id = dept",
        "SELECT * FROM departments LEFT JOIN employees ON dept_id = dept",
        "SELECT * FROM items ORDER BY price LIMIT 3 OFFSET 1",
        "SELECT name FROM users WHERE age >= 25 AND name LIKE 'Veli'",
    ];
    for sql in queries {
        println!("> {}", sql);
        match db.query(sql) {
            Ok(result) => println!("{}", result),
            Err(e) => println!("error: {}", e),
        }
    }

    let path = std::env::temp_dir().join("memdb_users.json");
    if let Err(e) = stg::save_table(db.get_table("users").unwrap(), &path) {
        println!("save failed: {}", e);
        return;
    }
    match stg::load_table(&path) {
        Ok(t) => println!("reloaded {} rows from {}", t.row_count(), path.display()),
        Err(e) => println!("load failed: {}", e),
    }
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
