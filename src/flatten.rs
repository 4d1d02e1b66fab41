//! # Schema flattening
//!
//! Turns the decoded records of one nested column into flat, row-aligned
//! columns.
//!
//! Flattening runs in two passes over the records:
//! 1. collect the union of keys, in order of first appearance;
//! 2. fill one column per key, taking row `i` from `records[i]` only and
//!    writing `null` where the record lacks the key.
//!
//! Because the union is complete before any column is filled, a key first seen
//! in a late row never forces a backfill of earlier rows.
//!
//! By default only top-level keys become columns; objects and arrays below them
//! are kept whole. [`FlattenOptions::max_depth`] expands nested objects further
//! into dotted names (`adwordsClickInfo.page`). Arrays are never expanded.

use crate::decode::NestedRecord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// How flattened keys become table column names.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnNaming {
    /// The key itself (`browser`). Collisions fall back to the qualified form.
    #[default]
    Key,
    /// Source column and key (`device.browser`).
    Qualified,
}

/// Flattening knobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlattenOptions {
    /// Object levels expanded into columns. 1 keeps nested values opaque.
    pub max_depth: usize,
    pub naming: ColumnNaming,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            max_depth: 1,
            naming: ColumnNaming::Key,
        }
    }
}

/// One output column.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatColumn {
    /// Dotted key path inside the source record.
    pub key: String,
    pub values: Vec<Value>,
}

/// The flattened form of one nested column.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatColumnSet {
    /// Nested column the records came from.
    pub source: String,
    pub columns: Vec<FlatColumn>,
    rows: usize,
}

impl FlatColumnSet {
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.key.as_str())
    }

    #[must_use]
    pub fn column(&self, key: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|c| c.key == key)
            .map(|c| c.values.as_slice())
    }

    /// Value at (`row`, `key`). `None` if either is out of range.
    #[must_use]
    pub fn value(&self, row: usize, key: &str) -> Option<&Value> {
        self.column(key)?.get(row)
    }
}

/// Flatten the top-level keys of `records`.
#[must_use]
pub fn flatten(column: &str, records: &[NestedRecord]) -> FlatColumnSet {
    flatten_with(column, records, FlattenOptions::default().max_depth)
}

/// Flatten `records`, expanding objects up to `max_depth` levels (0 acts as 1).
#[must_use]
pub fn flatten_with(column: &str, records: &[NestedRecord], max_depth: usize) -> FlatColumnSet {
    let max_depth = max_depth.max(1);

    let mut union = KeyUnion::default();
    let mut prefix = Vec::new();
    for rec in records {
        union.collect(rec, &mut prefix, max_depth);
    }

    let columns = union
        .paths
        .iter()
        .map(|path| FlatColumn {
            key: path.join("."),
            values: records
                .iter()
                .map(|rec| lookup(rec, path, max_depth))
                .collect(),
        })
        .collect();

    FlatColumnSet {
        source: column.to_owned(),
        columns,
        rows: records.len(),
    }
}

#[derive(Default)]
struct KeyUnion<'a> {
    paths: Vec<Vec<&'a str>>,
    seen: HashSet<Vec<&'a str>>,
}

impl<'a> KeyUnion<'a> {
    fn collect(&mut self, obj: &'a Map<String, Value>, prefix: &mut Vec<&'a str>, max_depth: usize) {
        for (key, value) in obj {
            prefix.push(key.as_str());
            match value {
                Value::Object(inner) if prefix.len() < max_depth => {
                    self.collect(inner, prefix, max_depth);
                }
                _ => {
                    if !self.seen.contains(prefix.as_slice()) {
                        self.seen.insert(prefix.clone());
                        self.paths.push(prefix.clone());
                    }
                }
            }
            prefix.pop();
        }
    }
}

// An object above `max_depth` was expanded into deeper columns, so it is not a
// value of its own path.
fn lookup(rec: &NestedRecord, path: &[&str], max_depth: usize) -> Value {
    let Some((last, parents)) = path.split_last() else {
        return Value::Null;
    };
    let mut obj = rec;
    for key in parents {
        match obj.get(*key) {
            Some(Value::Object(inner)) => obj = inner,
            _ => return Value::Null,
        }
    }
    match obj.get(*last) {
        Some(Value::Object(_)) if path.len() < max_depth => Value::Null,
        Some(v) => v.clone(),
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(v: Value) -> NestedRecord {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn heterogeneous_keys_union_in_first_seen_order() {
        let records = vec![
            rec(json!({"a": 1, "b": 2})),
            rec(json!({"b": 3, "c": 4})),
            rec(json!({"a": 5})),
        ];
        let set = flatten("totals", &records);
        assert_eq!(set.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(set.column("a").unwrap(), &[json!(1), Value::Null, json!(5)]);
        assert_eq!(set.column("b").unwrap(), &[json!(2), json!(3), Value::Null]);
        assert_eq!(set.column("c").unwrap(), &[Value::Null, json!(4), Value::Null]);
    }

    #[test]
    fn late_keys_do_not_shift_rows() {
        let mut records: Vec<NestedRecord> = (0..50).map(|i| rec(json!({"hits": i}))).collect();
        records.push(rec(json!({"hits": 50, "transactionRevenue": "1000"})));
        let set = flatten("totals", &records);
        assert_eq!(set.num_rows(), 51);
        let revenue = set.column("transactionRevenue").unwrap();
        assert!(revenue[..50].iter().all(Value::is_null));
        assert_eq!(revenue[50], json!("1000"));
        for i in 0..51usize {
            assert_eq!(set.value(i, "hits"), Some(&json!(i)));
        }
    }

    #[test]
    fn one_level_keeps_nested_values_opaque() {
        let records = vec![rec(json!({
            "source": "google",
            "adwordsClickInfo": {"page": "1", "slot": "Top"},
            "keywords": ["a", "b"]
        }))];
        let set = flatten("trafficSource", &records);
        assert_eq!(
            set.keys().collect::<Vec<_>>(),
            vec!["source", "adwordsClickInfo", "keywords"]
        );
        assert_eq!(set.value(0, "adwordsClickInfo"), Some(&json!({"page": "1", "slot": "Top"})));
        assert_eq!(set.value(0, "keywords"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn deeper_flattening_uses_dotted_keys() {
        let records = vec![
            rec(json!({"source": "google", "adwordsClickInfo": {"page": "1", "gclId": "x"}})),
            rec(json!({"source": "(direct)", "adwordsClickInfo": {}})),
            rec(json!({"adwordsClickInfo": "not available"})),
        ];
        let set = flatten_with("trafficSource", &records, 2);
        assert_eq!(
            set.keys().collect::<Vec<_>>(),
            vec!["source", "adwordsClickInfo.page", "adwordsClickInfo.gclId", "adwordsClickInfo"]
        );
        assert_eq!(
            set.column("adwordsClickInfo.page").unwrap(),
            &[json!("1"), Value::Null, Value::Null]
        );
        assert_eq!(
            set.column("adwordsClickInfo").unwrap(),
            &[Value::Null, Value::Null, json!("not available")]
        );
    }

    #[test]
    fn flattening_is_deterministic() {
        let records = vec![
            rec(json!({"z": 1, "y": {"k": 1}})),
            rec(json!({"x": true, "z": 2})),
        ];
        assert_eq!(flatten("c", &records), flatten("c", &records));
    }

    #[test]
    fn empty_input_has_no_columns() {
        let set = flatten("device", &[]);
        assert_eq!(set.num_rows(), 0);
        assert_eq!(set.num_columns(), 0);

        let set = flatten("device", &[NestedRecord::new(), NestedRecord::new()]);
        assert_eq!(set.num_rows(), 2);
        assert_eq!(set.num_columns(), 0);
    }
}
