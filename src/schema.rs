//! Declared column schema and field coercion.
//!
//! Every column of a source file gets an explicit [`ColumnType`]. Identifier
//! columns are forced to [`ColumnType::Text`] so long digit strings such as
//! visitor ids keep every character; undeclared columns fall back to
//! [`ColumnType::Inferred`].
//!
//! A [`ColumnLayout`] is resolved once per file from its header and then
//! applied to every [`RawRow`], splitting it into coerced base values and the
//! raw text of the nested columns.

use crate::error::LoadError;
use crate::io::csv::RawRow;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::debug;

/// Scalar type of a flat column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Opaque text, never interpreted.
    Text,
    /// 64-bit signed integer.
    Integer,
    /// Finite 64-bit float.
    Float,
    /// `true`/`false` in any of the usual casings.
    Boolean,
    /// Best-effort guess: boolean, then integer, then float, then text.
    #[default]
    Inferred,
}

impl ColumnType {
    /// Lowercase type name used in error messages.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::Inferred => "inferred",
        }
    }

    /// Parse `raw` as this type. `None` means the text does not fit.
    ///
    /// Empty fields are null for every type.
    #[must_use]
    pub fn parse(self, raw: &str) -> Option<Value> {
        if raw.is_empty() {
            return Some(Value::Null);
        }
        match self {
            ColumnType::Text => Some(Value::String(raw.to_owned())),
            ColumnType::Integer => raw.parse::<i64>().ok().map(Value::from),
            ColumnType::Float => parse_float(raw),
            ColumnType::Boolean => parse_bool(raw).map(Value::Bool),
            ColumnType::Inferred => Some(infer(raw)),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

fn parse_float(raw: &str) -> Option<Value> {
    let f = raw.parse::<f64>().ok()?;
    Number::from_f64(f).map(Value::Number)
}

fn infer(raw: &str) -> Value {
    if let Some(b) = parse_bool(raw) {
        return Value::Bool(b);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    parse_float(raw).unwrap_or_else(|| Value::String(raw.to_owned()))
}

/// Coerce one raw field of `column` (at data row `row`) to `ty`.
///
/// # Errors
/// [`LoadError::TypeMismatch`] when the text does not parse as `ty`.
pub fn coerce_field(column: &str, ty: ColumnType, raw: &str, row: u64) -> Result<Value, LoadError> {
    ty.parse(raw).ok_or_else(|| LoadError::TypeMismatch {
        column: column.to_owned(),
        row,
        value: raw.to_owned(),
        expected: ty.name(),
    })
}

/// Which columns are identifiers, which hold nested JSON, and declared types
/// for the rest.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Always loaded as [`ColumnType::Text`]. Absent columns are ignored.
    pub identifier_columns: Vec<String>,
    /// Columns whose text is a serialized JSON object, flattened in this order.
    pub nested_columns: Vec<String>,
    /// Declared types for other flat columns.
    pub column_types: BTreeMap<String, ColumnType>,
}

impl SchemaConfig {
    /// Columns of the Google Analytics customer revenue dataset.
    #[must_use]
    pub fn google_analytics() -> Self {
        Self {
            identifier_columns: ["fullVisitorId", "sessionId", "visitId"]
                .map(String::from)
                .to_vec(),
            nested_columns: ["device", "geoNetwork", "totals", "trafficSource"]
                .map(String::from)
                .to_vec(),
            column_types: BTreeMap::new(),
        }
    }

    /// Type applied to the flat column `name`. Identifiers win over declarations.
    #[must_use]
    pub fn column_type(&self, name: &str) -> ColumnType {
        if self.identifier_columns.iter().any(|c| c == name) {
            return ColumnType::Text;
        }
        self.column_types.get(name).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn is_nested(&self, name: &str) -> bool {
        self.nested_columns.iter().any(|c| c == name)
    }

    /// # Errors
    /// [`LoadError::InvalidConfiguration`] if a nested column is listed twice,
    /// or is also an identifier or declared flat column.
    pub fn validate(&self) -> Result<(), LoadError> {
        let mut seen = HashSet::new();
        for col in &self.nested_columns {
            if !seen.insert(col.as_str()) {
                return Err(LoadError::config(format!(
                    "nested column '{col}' listed twice"
                )));
            }
            if self.identifier_columns.contains(col) || self.column_types.contains_key(col) {
                return Err(LoadError::config(format!(
                    "column '{col}' cannot be both nested and flat"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
enum Role {
    Base { column: String, ty: ColumnType },
    Nested { slot: usize },
}

/// The schema bound to one file's header.
#[derive(Clone, Debug)]
pub struct ColumnLayout {
    roles: Vec<Role>,
    base_columns: Vec<String>,
    nested_columns: Vec<String>,
}

impl ColumnLayout {
    /// Bind `schema` to `headers`.
    ///
    /// Nested columns keep the order of [`SchemaConfig::nested_columns`]; base
    /// columns keep header order.
    ///
    /// # Errors
    /// [`LoadError::MissingColumn`] if a nested column is not in the header.
    pub fn resolve(headers: &[String], schema: &SchemaConfig, file: &Path) -> Result<Self, LoadError> {
        let mut roles = Vec::with_capacity(headers.len());
        let mut base_columns = Vec::new();
        for name in headers {
            match schema.nested_columns.iter().position(|c| c == name) {
                Some(slot) => roles.push(Role::Nested { slot }),
                None => {
                    base_columns.push(name.clone());
                    roles.push(Role::Base {
                        column: name.clone(),
                        ty: schema.column_type(name),
                    });
                }
            }
        }
        for column in &schema.nested_columns {
            if !headers.contains(column) {
                return Err(LoadError::MissingColumn {
                    file: file.to_path_buf(),
                    column: column.clone(),
                });
            }
        }
        for column in &schema.identifier_columns {
            if !headers.contains(column) {
                debug!(file = %file.display(), column, "identifier column absent; nothing to coerce");
            }
        }
        Ok(Self {
            roles,
            base_columns,
            nested_columns: schema.nested_columns.clone(),
        })
    }

    /// Flat columns, in header order.
    #[must_use]
    pub fn base_columns(&self) -> &[String] {
        &self.base_columns
    }

    /// Nested columns, in schema order.
    #[must_use]
    pub fn nested_columns(&self) -> &[String] {
        &self.nested_columns
    }

    /// Coerce the flat fields of `row`, in [`ColumnLayout::base_columns`] order.
    ///
    /// # Errors
    /// [`LoadError::TypeMismatch`] from [`coerce_field`].
    pub fn coerce_row(&self, row: &RawRow) -> Result<Vec<Value>, LoadError> {
        let mut out = Vec::with_capacity(self.base_columns.len());
        for (pos, role) in self.roles.iter().enumerate() {
            if let Role::Base { column, ty } = role {
                out.push(coerce_field(column, *ty, row.field(pos).unwrap_or(""), row.index)?);
            }
        }
        Ok(out)
    }

    /// Raw text of each nested column of `row`, as `(slot, text)` where `slot`
    /// indexes [`ColumnLayout::nested_columns`].
    pub fn nested_fields<'r>(&'r self, row: &'r RawRow) -> impl Iterator<Item = (usize, &'r str)> + 'r {
        self.roles.iter().enumerate().filter_map(|(pos, role)| match role {
            Role::Nested { slot } => Some((*slot, row.field(pos).unwrap_or(""))),
            Role::Base { .. } => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identifiers_stay_text() {
        let schema = SchemaConfig::google_analytics();
        let id = "9674781571160116268";
        assert_eq!(schema.column_type("fullVisitorId"), ColumnType::Text);
        let v = coerce_field("fullVisitorId", schema.column_type("fullVisitorId"), id, 0).unwrap();
        assert_eq!(v, json!(id));

        // the same digits lose precision when inferred
        let inferred = ColumnType::Inferred.parse(id).unwrap();
        assert_ne!(inferred, json!(id));
    }

    #[test]
    fn leading_zeros_survive_as_text() {
        assert_eq!(ColumnType::Text.parse("0000572"), Some(json!("0000572")));
        assert_eq!(ColumnType::Inferred.parse("0000572"), Some(json!(572)));
    }

    #[test]
    fn text_coercion_is_idempotent() {
        let once = ColumnType::Text.parse("1131660440785968503").unwrap();
        let again = ColumnType::Text.parse(once.as_str().unwrap()).unwrap();
        assert_eq!(once, again);
    }

    #[test]
    fn inference_order() {
        assert_eq!(ColumnType::Inferred.parse(""), Some(Value::Null));
        assert_eq!(ColumnType::Inferred.parse("True"), Some(json!(true)));
        assert_eq!(ColumnType::Inferred.parse("42"), Some(json!(42)));
        assert_eq!(ColumnType::Inferred.parse("2.5"), Some(json!(2.5)));
        assert_eq!(ColumnType::Inferred.parse("Organic Search"), Some(json!("Organic Search")));
        assert_eq!(ColumnType::Inferred.parse("NaN"), Some(json!("NaN")));
    }

    #[test]
    fn declared_type_mismatch() {
        let err = coerce_field("visitNumber", ColumnType::Integer, "one", 7).unwrap_err();
        match err {
            LoadError::TypeMismatch { column, row, expected, .. } => {
                assert_eq!(column, "visitNumber");
                assert_eq!(row, 7);
                assert_eq!(expected, "integer");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn nested_and_identifier_overlap_is_invalid() {
        let mut schema = SchemaConfig::google_analytics();
        schema.identifier_columns.push("device".into());
        assert!(matches!(
            schema.validate(),
            Err(LoadError::InvalidConfiguration(_))
        ));
        assert!(SchemaConfig::google_analytics().validate().is_ok());
    }

    #[test]
    fn layout_requires_nested_columns() {
        let headers = vec!["fullVisitorId".to_string(), "device".to_string()];
        let schema = SchemaConfig {
            nested_columns: vec!["device".into(), "totals".into()],
            ..SchemaConfig::default()
        };
        let err = ColumnLayout::resolve(&headers, &schema, Path::new("train.csv")).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { ref column, .. } if column == "totals"));
    }

    #[test]
    fn layout_tolerates_missing_identifiers() {
        let headers = vec!["channelGrouping".to_string(), "device".to_string()];
        let schema = SchemaConfig {
            identifier_columns: vec!["fullVisitorId".into()],
            nested_columns: vec!["device".into()],
            ..SchemaConfig::default()
        };
        let layout = ColumnLayout::resolve(&headers, &schema, Path::new("t.csv")).unwrap();
        assert_eq!(layout.base_columns(), ["channelGrouping".to_string()]);
        assert_eq!(layout.nested_columns(), ["device".to_string()]);
    }
}
