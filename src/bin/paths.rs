//! Path-dump test driver.
//!
//! Reads `A|R <id> <key>` lines from stdin: `A` inserts the item with the
//! given id (its key comes from an id-to-key map built from the whole
//! input, first binding of an id wins), `R` erases it when present. On EOF
//! the condensed path dump of the resulting tree goes to stdout.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use qtrie::Trie;

/// Stored item: the id shown in dumps plus the key bytes it is filed under.
struct PathItem {
    key: String,
    id: i64,
}

impl fmt::Display for PathItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

fn item_key(item: &PathItem) -> &[u8] {
    item.key.as_bytes()
}

enum Op {
    Add(i64),
    Remove(i64),
}

/// One input line: `A|R <id> <key>`, whitespace separated.
fn parse_line(line: &str) -> Option<(Op, String)> {
    let mut fields = line.split_whitespace();
    let action = fields.next()?;
    let id: i64 = fields.next()?.parse().ok()?;
    let key = fields.next()?.to_string();
    if fields.next().is_some() {
        return None;
    }
    match action {
        "A" => Some((Op::Add(id), key)),
        "R" => Some((Op::Remove(id), key)),
        _ => None,
    }
}

fn run() -> Result<(), String> {
    eprintln!("TRIE paths BEGIN");

    let mut lines: Vec<String> = Vec::new();
    for line in io::stdin().lock().lines() {
        lines.push(line.map_err(|e| format!("read error: {e}"))?);
    }
    // Tolerate a trailing empty line.
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }

    let mut input = Vec::with_capacity(lines.len());
    for line in &lines {
        match parse_line(line) {
            Some(parsed) => input.push(parsed),
            None => return Err(format!("syntax error: '{line}'")),
        }
    }

    eprintln!("Creating TRIE...");

    // The first key bound to an id wins, even if a later line repeats the
    // id with a different key.
    let mut keymap: HashMap<i64, &str> = HashMap::new();
    for (op, key) in &input {
        let id = match op {
            Op::Add(id) | Op::Remove(id) => *id,
        };
        keymap.entry(id).or_insert(key.as_str());
    }

    let mut trie = Trie::new(item_key as fn(&PathItem) -> &[u8]);

    eprintln!("Building TRIE...");

    for (op, _) in &input {
        match op {
            Op::Add(id) => {
                trie.insert(PathItem {
                    key: keymap[id].to_string(),
                    id: *id,
                });
            }
            Op::Remove(id) => {
                let cursor = trie.find(keymap[id].as_bytes());
                if cursor.is_end() {
                    continue; // item not inserted, yet
                }
                trie.erase(cursor).map_err(|e| e.to_string())?;
            }
        }
    }

    eprintln!("TRIE paths:");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    trie.serialise_paths(&mut out)
        .and_then(|()| out.flush())
        .map_err(|e| format!("write error: {e}"))?;

    eprintln!("TRIE paths END");
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}
