//! In-memory rectangular tables.
//!
//! A [`Table`] stores rows as vectors of [`Value`]s that share one ordered
//! column list. Cells are JSON values: strings, numbers, booleans and null for
//! flat columns, plus whole objects or arrays for nested values that were not
//! expanded.

use crate::flatten::{ColumnNaming, FlatColumnSet};
use anyhow::{Result, ensure};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::warn;

/// Ordered rows over a shared list of column names.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// An empty table with the given columns.
    ///
    /// If a name repeats, lookups by name resolve to its first position.
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        let mut positions = HashMap::with_capacity(columns.len());
        for (pos, name) in columns.iter().enumerate() {
            positions.entry(name.clone()).or_insert(pos);
        }
        Self {
            columns,
            positions,
            rows: Vec::new(),
        }
    }

    /// Append a row. Its width must match the column count.
    ///
    /// # Errors
    /// Fails on a width mismatch.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        ensure!(
            row.len() == self.columns.len(),
            "row has {} values, table has {} columns",
            row.len(),
            self.columns.len()
        );
        self.rows.push(row);
        Ok(())
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Cell at (`row`, `column`).
    #[must_use]
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let pos = *self.positions.get(column)?;
        self.rows.get(row)?.get(pos)
    }

    #[must_use]
    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|values| Row {
            columns: &self.columns,
            values,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|values| Row {
            columns: &self.columns,
            values,
        })
    }

    /// All values of one column, top to bottom.
    pub fn column<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a Value> + use<'a>> {
        let pos = *self.positions.get(name)?;
        Some(self.rows.iter().map(move |r| &r[pos]))
    }

    /// Append the columns of `set`, row `i` of the set onto row `i` of the
    /// table. Returns the names the new columns received.
    ///
    /// Names follow `naming`; a name already present in the table is replaced
    /// by `source.key`, then by `source.key_2`, `source.key_3`, ...
    ///
    /// # Errors
    /// Fails if `set` does not have exactly as many rows as the table.
    pub fn merge_flat(&mut self, set: FlatColumnSet, naming: ColumnNaming) -> Result<Vec<String>> {
        ensure!(
            set.num_rows() == self.rows.len(),
            "flattened column '{}' has {} rows, table has {}",
            set.source,
            set.num_rows(),
            self.rows.len()
        );

        for row in &mut self.rows {
            row.reserve(set.num_columns());
        }
        let mut names = Vec::with_capacity(set.num_columns());
        for col in set.columns {
            let name = self.free_name(&set.source, &col.key, naming);
            for (row, value) in self.rows.iter_mut().zip(col.values) {
                row.push(value);
            }
            self.positions.insert(name.clone(), self.columns.len());
            self.columns.push(name.clone());
            names.push(name);
        }
        Ok(names)
    }

    fn free_name(&self, source: &str, key: &str, naming: ColumnNaming) -> String {
        let qualified = format!("{source}.{key}");
        let preferred = match naming {
            ColumnNaming::Key => key.to_owned(),
            ColumnNaming::Qualified => qualified.clone(),
        };
        if !self.has_column(&preferred) {
            return preferred;
        }
        let mut candidate = qualified.clone();
        let mut n = 2;
        while self.has_column(&candidate) {
            candidate = format!("{qualified}_{n}");
            n += 1;
        }
        warn!(column = %preferred, renamed = %candidate, "flattened column name already taken");
        candidate
    }
}

/// A borrowed view of one table row.
#[derive(Clone, Copy, Debug)]
pub struct Row<'t> {
    columns: &'t [String],
    values: &'t [Value],
}

impl<'t> Row<'t> {
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&'t Value> {
        let pos = self.columns.iter().position(|c| c == column)?;
        self.values.get(pos)
    }

    #[must_use]
    pub fn values(&self) -> &'t [Value] {
        self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'t str, &'t Value)> + 't {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }

    /// The row as a JSON object, in column order.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .iter()
            .map(|(k, v)| (k.to_owned(), v.clone()))
            .collect();
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten;
    use serde_json::json;

    fn base(rows: &[(&str, i64)]) -> Table {
        let mut t = Table::new(vec!["fullVisitorId".into(), "visitNumber".into()]);
        for (id, n) in rows {
            t.push_row(vec![json!(id), json!(n)]).unwrap();
        }
        t
    }

    fn records(values: &[Value]) -> Vec<crate::decode::NestedRecord> {
        values
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn merge_is_positional() {
        let mut t = base(&[("001", 1), ("002", 2), ("003", 1)]);
        let set = flatten(
            "device",
            &records(&[
                json!({"browser": "Chrome"}),
                json!({"browser": "Safari", "isMobile": true}),
                json!({}),
            ]),
        );
        let names = t.merge_flat(set, ColumnNaming::Key).unwrap();
        assert_eq!(names, vec!["browser", "isMobile"]);
        assert_eq!(t.num_rows(), 3);
        assert_eq!(t.num_columns(), 4);
        assert_eq!(t.get(1, "fullVisitorId"), Some(&json!("002")));
        assert_eq!(t.get(1, "browser"), Some(&json!("Safari")));
        assert_eq!(t.get(2, "browser"), Some(&Value::Null));
        assert_eq!(t.get(0, "isMobile"), Some(&Value::Null));
    }

    #[test]
    fn misaligned_merge_is_rejected() {
        let mut t = base(&[("001", 1)]);
        let set = flatten("device", &records(&[json!({"a": 1}), json!({"a": 2})]));
        assert!(t.merge_flat(set, ColumnNaming::Key).is_err());
        assert_eq!(t.num_columns(), 2);
    }

    #[test]
    fn colliding_names_are_qualified() {
        let mut t = base(&[("001", 1)]);
        let totals = flatten("totals", &records(&[json!({"visitNumber": "1", "hits": "3"})]));
        let names = t.merge_flat(totals, ColumnNaming::Key).unwrap();
        assert_eq!(names, vec!["totals.visitNumber", "hits"]);

        let more = flatten("totals", &records(&[json!({"visitNumber": "9"})]));
        let names = t.merge_flat(more, ColumnNaming::Key).unwrap();
        assert_eq!(names, vec!["totals.visitNumber_2"]);
        assert_eq!(t.get(0, "totals.visitNumber_2"), Some(&json!("9")));
    }

    #[test]
    fn qualified_naming() {
        let mut t = base(&[("001", 1)]);
        let set = flatten("geoNetwork", &records(&[json!({"city": "Paris"})]));
        let names = t.merge_flat(set, ColumnNaming::Qualified).unwrap();
        assert_eq!(names, vec!["geoNetwork.city"]);
    }

    #[test]
    fn row_views() {
        let t = base(&[("001", 1), ("002", 5)]);
        let row = t.row(1).unwrap();
        assert_eq!(row.get("visitNumber"), Some(&json!(5)));
        assert_eq!(row.to_json(), json!({"fullVisitorId": "002", "visitNumber": 5}));
        assert_eq!(
            t.column("visitNumber").unwrap().cloned().collect::<Vec<_>>(),
            vec![json!(1), json!(5)]
        );
        assert!(t.row(2).is_none());
        assert_eq!(t.rows().count(), 2);
    }

    #[test]
    fn width_is_enforced() {
        let mut t = Table::new(vec!["a".into()]);
        assert!(t.push_row(vec![json!(1), json!(2)]).is_err());
        assert!(t.is_empty());
    }
}
