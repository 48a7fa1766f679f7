//! A tiny JSONL table store.
//!
//! Each table lives in `<store>/<TABLE_NAME>/items.jsonl`, one JSON object per
//! line. Rows keep the order they were inserted in, and a save rewrites the
//! whole file through a temp file so readers never see a half-written table.

use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use serde::de::DeserializeOwned;

const ITEMS_FILE: &str = "items.jsonl";

pub trait TableRow: Clone + Serialize + DeserializeOwned {
    const TABLE_NAME: &'static str;

    fn key(&self) -> &str;
}

pub struct Table<T: TableRow> {
    rows: Vec<T>,
    dir: PathBuf,
}

impl<T: TableRow> Table<T> {
    /// A table below `store` holding exactly `rows`, ignoring anything on disk.
    pub fn with_rows(store: &Path, rows: Vec<T>) -> Self {
        Self {
            rows,
            dir: store.join(T::TABLE_NAME),
        }
    }

    /// Loads the table below `store`. A missing table is an empty table.
    ///
    /// If the same key appears on more than one line, the later line wins but
    /// the row keeps the position of its first appearance.
    pub fn load(store: &Path) -> anyhow::Result<Self> {
        let dir = store.join(T::TABLE_NAME);
        let mut table = Self {
            rows: Vec::new(),
            dir,
        };

        let path = table.items_path();
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(table),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to open {}", path.display()));
            }
        };

        let mut positions: HashMap<String, usize> = HashMap::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_context(|| format!("failed to read {}", path.display()))?;
            if line.trim().is_empty() {
                continue;
            }
            let row: T = serde_json::from_str(&line).with_context(|| {
                format!("failed to parse {} line {}", path.display(), line_no + 1)
            })?;
            match positions.get(row.key()) {
                Some(&pos) => table.rows[pos] = row,
                None => {
                    positions.insert(row.key().to_string(), table.rows.len());
                    table.rows.push(row);
                }
            }
        }
        Ok(table)
    }

    pub fn items(&self) -> &[T] {
        &self.rows
    }

    pub fn into_items(self) -> Vec<T> {
        self.rows
    }

    pub fn save(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;

        let mut out = String::new();
        for row in &self.rows {
            out.push_str(&serde_json::to_string(row).context("failed to serialize row")?);
            out.push('\n');
        }

        let path = self.items_path();
        let tmp = self.dir.join(format!("{ITEMS_FILE}.tmp"));
        fs::write(&tmp, out).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }

    fn items_path(&self) -> PathBuf {
        self.dir.join(ITEMS_FILE)
    }
}
