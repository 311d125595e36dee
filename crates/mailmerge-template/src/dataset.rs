//! Dataset model for rendering.
//!
//! A [`Dataset`] maps selection names to ordered sequences of [`Row`]s, and a
//! row maps field names to scalar [`Value`]s. The only operation the renderer
//! ever applies to a value is [`Value::to_display_string`].
//!
//! Datasets are usually loaded from JSON shaped like
//! `{"selection": [{"field": value, ...}, ...], ...}`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use mailmerge_core::error::MergeError;
use serde::Deserialize;

/// A single field value in a row.
#[derive(Debug, Clone)]
pub enum Value {
    /// A string value.
    String(String),
    /// A 64-bit integer.
    Integer(i64),
    /// An unsigned integer above `i64::MAX`.
    Unsigned(u64),
    /// A 64-bit floating point number.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// An absent value. Renders as the empty string.
    Null,
    /// A nested array or object. Renders as compact JSON.
    Compound(serde_json::Value),
}

impl Value {
    /// Converts this value to its textual representation.
    ///
    /// The representation is locale-independent: integers and floats use
    /// Rust's shortest round-trip formatting (`3`, `2.5`), booleans render as
    /// `true`/`false`, and `Null` renders as the empty string.
    pub fn to_display_string(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Unsigned(u) => u.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Null => String::new(),
            Self::Compound(v) => v.to_string(),
        }
    }

    /// Returns `true` if this value is `Null`.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the string contents if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Unsigned(a), Self::Unsigned(b)) => a == b,
            (Self::Integer(a), Self::Unsigned(b)) | (Self::Unsigned(b), Self::Integer(a)) => {
                i128::from(*a) == i128::from(*b)
            }
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Integer(a), Self::Float(b)) | (Self::Float(b), Self::Integer(a)) => {
                integer_eq_float(i128::from(*a), *b)
            }
            (Self::Unsigned(a), Self::Float(b)) | (Self::Float(b), Self::Unsigned(a)) => {
                integer_eq_float(i128::from(*a), *b)
            }
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Null, Self::Null) => true,
            (Self::Compound(a), Self::Compound(b)) => a == b,
            _ => false,
        }
    }
}

/// Compares an integer with a float without rounding either side.
// `f` is integral and inside the i128 range before the cast, so it is exact.
#[allow(clippy::cast_possible_truncation)]
fn integer_eq_float(i: i128, f: f64) -> bool {
    f.fract() == 0.0 && f.abs() < 2_f64.powi(127) && f as i128 == i
}

// -- From implementations --

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        i64::try_from(u).map_or(Self::Unsigned(u), Self::Integer)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(o: Option<T>) -> Self {
        o.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else if let Some(u) = n.as_u64() {
                    Self::Unsigned(u)
                } else if let Some(f) = n.as_f64() {
                    Self::Float(f)
                } else {
                    Self::Null
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            compound @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                Self::Compound(compound)
            }
        }
    }
}

/// One named-field-to-value mapping, supplied to a single expansion of a
/// repeater item.
///
/// # Examples
///
/// ```
/// use mailmerge_template::dataset::Row;
///
/// let row = Row::new().with("name", "Ann").with("age", 41);
/// assert_eq!(row.text("name").as_deref(), Some("Ann"));
/// assert_eq!(row.text("age").as_deref(), Some("41"));
/// assert_eq!(row.text("email"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: HashMap<String, Value>,
}

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field and returns the row, for building rows inline.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Sets a field, replacing any previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Returns the raw value of a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns a field as text, or `None` if it is missing or null.
    pub fn text(&self, field: &str) -> Option<String> {
        self.fields
            .get(field)
            .filter(|v| !v.is_null())
            .map(Value::to_display_string)
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A mapping from selection name to an ordered sequence of rows.
///
/// # Examples
///
/// ```
/// use mailmerge_template::dataset::Dataset;
///
/// let dataset: Dataset = r#"{
///     "variables": [{"name": "BaseUrl", "value": "https://cdn.example.com"}],
///     "products": [{"title": "Lamp"}, {"title": "Chair"}]
/// }"#.parse().unwrap();
///
/// assert_eq!(dataset.selection("products").map(<[_]>::len), Some(2));
/// assert_eq!(dataset.base_url("variables", "baseurl"), "https://cdn.example.com");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct Dataset {
    selections: HashMap<String, Vec<Row>>,
}

impl Dataset {
    /// Creates an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a named selection.
    pub fn insert_selection(&mut self, name: impl Into<String>, rows: Vec<Row>) {
        self.selections.insert(name.into(), rows);
    }

    /// Adds a named selection and returns the dataset.
    #[must_use]
    pub fn with_selection(mut self, name: impl Into<String>, rows: Vec<Row>) -> Self {
        self.insert_selection(name, rows);
        self
    }

    /// Returns the rows of a selection, if present.
    pub fn selection(&self, name: &str) -> Option<&[Row]> {
        self.selections.get(name).map(Vec::as_slice)
    }

    /// Returns `true` if the dataset has a selection with this name.
    pub fn contains_selection(&self, name: &str) -> bool {
        self.selections.contains_key(name)
    }

    /// Returns all selection names, sorted.
    pub fn selection_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.selections.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolves the base URL from the variables selection.
    ///
    /// Scans `variables_selection` for the first row whose `name` field equals
    /// `variable` ignoring ASCII case, and returns that row's `value` as text.
    /// Returns the empty string if the selection, the row, or the value is
    /// missing.
    pub fn base_url(&self, variables_selection: &str, variable: &str) -> String {
        self.selection(variables_selection)
            .and_then(|rows| {
                rows.iter().find(|row| {
                    row.text("name")
                        .is_some_and(|name| name.eq_ignore_ascii_case(variable))
                })
            })
            .and_then(|row| row.text("value"))
            .unwrap_or_default()
    }

    /// Builds a dataset from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError` if the text is not JSON or does not have the
    /// expected shape.
    pub fn from_json_str(json: &str) -> Result<Self, MergeError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::try_from(value)
    }
}

impl FromStr for Dataset {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json_str(s)
    }
}

impl TryFrom<serde_json::Value> for Dataset {
    type Error = MergeError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        let serde_json::Value::Object(map) = value else {
            return Err(MergeError::DatasetError(format!(
                "expected an object of selections, found {}",
                json_kind(&value)
            )));
        };

        let mut selections: HashMap<String, Vec<Row>> = HashMap::with_capacity(map.len());
        for (name, rows) in map {
            let serde_json::Value::Array(items) = rows else {
                return Err(MergeError::DatasetError(format!(
                    "selection '{name}' must be an array of rows, found {}",
                    json_kind(&rows)
                )));
            };

            let mut parsed: Vec<Row> = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let serde_json::Value::Object(fields) = item else {
                    return Err(MergeError::DatasetError(format!(
                        "row {index} of selection '{name}' must be an object, found {}",
                        json_kind(&item)
                    )));
                };
                parsed.push(fields.into_iter().collect());
            }
            selections.insert(name, parsed);
        }

        Ok(Self { selections })
    }
}

const fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
