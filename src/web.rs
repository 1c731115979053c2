use crate::*;
use serde_json::json;
use std::{
    io::{Read, Write},
    net::{TcpListener, TcpStream},
};

/// One http exchange. The request line and query string are parsed from the
/// TCP stream; response content is accumulated in output.
pub struct WebQuery {
    ///
    pub method: String,
    ///
    pub path: String,
    /// Percent-decoded query string parameters.
    pub query: Vec<(String, String)>,
    ///
    pub output: Vec<u8>,
    ///
    pub status_code: String,
}

impl WebQuery {
    /// Reads the http request from the TCP stream into a new WebQuery.
    pub fn new(s: &TcpStream) -> Self {
        let mut hp = HttpRequestParser::new(s);
        let (method, path, query) = hp.read_request();
        hp.read_headers();
        Self {
            method,
            path,
            query,
            output: Vec::new(),
            status_code: "200 OK".to_string(),
        }
    }

    /// Construct a request directly ( used by embedders and tests ).
    pub fn request(method: &str, path: &str, query: &[(&str, &str)]) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            query: query
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
            output: Vec::new(),
            status_code: "200 OK".to_string(),
        }
    }

    /// First query parameter with the given name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Writes the http response to the TCP stream.
    pub fn write(&mut self, tcps: &mut TcpStream) -> Result<()> {
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
            self.status_code,
            self.output.len()
        );
        tcps.write_all(response.as_bytes())?;
        tcps.write_all(&self.output)?;
        tcps.flush()?;
        Ok(())
    }

    fn reply(&mut self, body: serde_json::Value) {
        self.output = body.to_string().into_bytes();
    }

    fn fail(&mut self, status: &str, msg: &str) {
        self.status_code = status.to_string();
        self.reply(json!({ "error": msg }));
    }
}

/// Serve http requests against the database, one at a time, forever.
pub fn serve(db: &mut Database, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr)?;
    debug!("serving on {}", addr);
    for tcps in listener.incoming() {
        let mut tcps = tcps?;
        let mut wq = WebQuery::new(&tcps);
        dispatch(db, &mut wq);
        if let Err(e) = wq.write(&mut tcps) {
            warn!("response write failed: {}", e);
        }
    }
    Ok(())
}

/// Route one request. Per-query failures become 4xx responses; the server
/// keeps running.
pub fn dispatch(db: &mut Database, wq: &mut WebQuery) {
    match wq.path.as_str() {
        "/query" => query(db, wq),
        "/tables" => wq.reply(json!({ "tables": db.table_names() })),
        "/get_all" => get_all(db, wq),
        "/insert" => insert(db, wq),
        "/delete" => delete(db, wq),
        _ => wq.fail("404 Not Found", "no such endpoint"),
    }
}

/// GET /query?sql=... : execute a SELECT and return columns plus row values.
fn query(db: &Database, wq: &mut WebQuery) {
    let Some(sql) = wq.param("sql") else {
        return wq.fail("400 Bad Request", "missing sql parameter");
    };
    match db.query(sql) {
        Ok(result) => {
            let rows: Vec<Vec<serde_json::Value>> = result
                .rows()
                .map(|r| r.values.iter().map(cell_json).collect())
                .collect();
            wq.reply(json!({ "columns": result.columns(), "rows": rows }));
        }
        Err(e) => wq.fail("400 Bad Request", &e.to_string()),
    }
}

/// GET /get_all?table=... : the whole table in the document format.
fn get_all(db: &Database, wq: &mut WebQuery) {
    match wq.param("table").and_then(|name| db.get_table(name)) {
        Some(t) => {
            let doc = table_to_doc(t);
            match serde_json::to_value(&doc) {
                Ok(v) => wq.reply(v),
                Err(e) => wq.fail("500 Internal Server Error", &e.to_string()),
            }
        }
        None => wq.fail("404 Not Found", "no such table"),
    }
}

/// GET /insert?table=...&col=value... : build a row from the parameters in
/// schema order, converting each value to the column type ( defaults apply
/// when a parameter is missing or does not convert ).
fn insert(db: &mut Database, wq: &mut WebQuery) {
    let Some(table) = wq.param("table").map(str::to_string) else {
        return wq.fail("400 Bad Request", "missing table parameter");
    };
    let Some(t) = db.get_table_mut(&table) else {
        return wq.fail("404 Not Found", "no such table");
    };
    let mut row = Row::new(t.alloc_id());
    let info = t.info.clone();
    for (name, typ) in info.colnames.iter().zip(&info.types) {
        let val = wq.param(name).unwrap_or("");
        match typ {
            ColType::Int => row.add_int(val.parse().unwrap_or(0)),
            ColType::Double => row.add_float(val.parse().unwrap_or(0.0)),
            ColType::Str => row.add_str(val),
        };
    }
    let id = row.id;
    match t.insert(row) {
        Ok(()) => wq.reply(json!({ "status": "inserted", "id": id })),
        Err(e) => wq.fail("400 Bad Request", &e.to_string()),
    }
}

/// GET /delete?table=...&id=... : remove a row by primary key.
fn delete(db: &mut Database, wq: &mut WebQuery) {
    let id = match wq.param("id").map(str::parse::<i64>) {
        Some(Ok(id)) => id,
        _ => return wq.fail("400 Bad Request", "missing or bad id parameter"),
    };
    match wq.param("table").map(str::to_string) {
        Some(table) => match db.get_table_mut(&table) {
            Some(t) => {
                t.remove(id);
                wq.reply(json!({ "status": "deleted" }));
            }
            None => wq.fail("404 Not Found", "no such table"),
        },
        None => wq.fail("400 Bad Request", "missing table parameter"),
    }
}

/// One cell as a JSON scalar for the /query response.
fn cell_json(c: &Cell) -> serde_json::Value {
    match c {
        Cell::Int(x) => json!(x),
        Cell::Float(x) => json!(x),
        Cell::Str(s) => json!(s.as_str()),
    }
}

/// Parser for a http request read from a TCP stream.
///
/// A request starts with a line holding the method, target and protocol
/// version, followed by header lines terminated by a blank line. The target
/// query string carries name=value pairs with %HH and '+' encoding.
struct HttpRequestParser<'a> {
    buffer: [u8; 512],
    stream: &'a TcpStream,
    /// Into buffer.
    index: usize,
    /// Number of valid bytes in buffer.
    count: usize,
    eof: bool,
}

impl<'a> HttpRequestParser<'a> {
    fn new(stream: &'a TcpStream) -> Self {
        Self {
            stream,
            buffer: [0; 512],
            index: 0,
            count: 0,
            eof: false,
        }
    }

    fn get_byte(&mut self) -> u8 {
        if self.eof {
            return b' ';
        }
        if self.index >= self.count {
            self.count = self.stream.read(&mut self.buffer).unwrap_or(0);
            self.index = 0;
            if self.count == 0 {
                self.eof = true;
                return b' ';
            }
        }
        let result = self.buffer[self.index];
        self.index += 1;
        result
    }

    fn put_back(&mut self) {
        if !self.eof {
            self.index -= 1;
        }
    }

    fn read_to(&mut self, to: u8) -> String {
        let mut bytes = Vec::new();
        loop {
            let b = self.get_byte();
            if b == to || self.eof {
                break;
            }
            if b == 13 {
                self.put_back();
                break;
            }
            bytes.push(b);
        }
        String::from_utf8_lossy(&bytes).to_string()
    }

    /// Decode one query string byte ( %HH or '+' ).
    fn decode(&mut self, b: u8) -> u8 {
        if b == b'%' {
            let h1 = hex(self.get_byte());
            let h2 = hex(self.get_byte());
            h1 * 16 + h2
        } else if b == b'+' {
            b' '
        } else {
            b
        }
    }

    fn read_coded_str(&mut self, to: u8) -> String {
        let mut bytes = Vec::new();
        loop {
            let b = self.get_byte();
            if b == to || self.eof {
                break;
            }
            if b == b' ' || b == 13 {
                self.put_back();
                break;
            }
            let b = self.decode(b);
            bytes.push(b);
        }
        String::from_utf8_lossy(&bytes).to_string()
    }

    fn read_query(&mut self) -> Vec<(String, String)> {
        let mut result = Vec::new();
        loop {
            let b = self.get_byte();
            if b == b' ' || self.eof {
                break;
            }
            self.put_back();
            if b == 13 {
                break;
            }
            let name = self.read_coded_str(b'=');
            let value = self.read_coded_str(b'&');
            result.push((name, value));
        }
        result
    }

    /// Method, path and decoded query parameters.
    fn read_request(&mut self) -> (String, String, Vec<(String, String)>) {
        let method = self.read_to(b' ');
        let mut path = Vec::new();
        let mut query = Vec::new();
        loop {
            let b = self.get_byte();
            if b == b' ' || self.eof {
                break;
            }
            if b == 13 {
                self.put_back();
                break;
            }
            if b == b'?' {
                query = self.read_query();
                break;
            }
            let b = self.decode(b);
            path.push(b);
        }
        let _version = self.read_to(13);
        (method, String::from_utf8_lossy(&path).to_string(), query)
    }

    /// Skip the header lines; the blank line ends them.
    fn read_headers(&mut self) {
        loop {
            if self.get_byte() != 10 {
                return;
            }
            let name = self.read_to(b':');
            if name.is_empty() {
                return;
            }
            let _value = self.read_to(13);
        }
    }
}

/// Convert a hex digit byte to its value; other bytes count as zero.
fn hex(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'A'..=b'F' => c + 10 - b'A',
        b'a'..=b'f' => c + 10 - b'a',
        _ => 0,
    }
}
