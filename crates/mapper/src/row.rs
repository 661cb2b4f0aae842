//! # Row sources
//!
//! The forward-only cursor contract the mapper reads from, plus in-memory implementations.

use std::collections::VecDeque;

use crate::value::Value;

/// A positioned result row.
///
/// `close` releases the underlying cursor so a deferred query can reuse the connection. The
/// current row must stay readable after `close`.
pub trait RowSource {
    /// Number of columns.
    fn field_count(&self) -> usize;

    /// Column name at `ordinal`.
    fn name(&self, ordinal: usize) -> &str;

    /// Whether the value at `ordinal` is null (or out of range).
    fn is_null(&self, ordinal: usize) -> bool;

    /// Value at `ordinal`; [`Value::Null`] when out of range.
    fn value(&self, ordinal: usize) -> Value;

    /// Release the cursor.
    fn close(&mut self);
}

/// A named column value.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Column name.
    pub name: String,
    /// Column value.
    pub value: Value,
}

/// A single in-memory row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    /// Columns in result order.
    pub fields: Vec<Field>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push(Field {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

impl RowSource for Row {
    fn field_count(&self) -> usize {
        self.fields.len()
    }

    fn name(&self, ordinal: usize) -> &str {
        self.fields.get(ordinal).map_or("", |f| f.name.as_str())
    }

    fn is_null(&self, ordinal: usize) -> bool {
        self.fields.get(ordinal).is_none_or(|f| f.value.is_null())
    }

    fn value(&self, ordinal: usize) -> Value {
        self.fields.get(ordinal).map_or(Value::Null, |f| f.value.clone())
    }

    fn close(&mut self) {}
}

/// Buffered cursor over rows sharing one set of column names.
///
/// # Examples
///
/// ```ignore
/// let mut rows = RowSet::new(["ProductID", "ProductName"])
///     .row([Value::from(1), Value::from("Chai")])
///     .row([Value::from(2), Value::from("Chang")]);
///
/// while rows.advance() {
///     let product = mapper.map_as::<Product>(&mut rows)?;
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    columns: Vec<String>,
    pending: VecDeque<Vec<Value>>,
    current: Vec<Value>,
    closed: bool,
}

impl RowSet {
    /// Creates an empty cursor with the given columns.
    #[must_use]
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Queues a row. Missing trailing values read as null.
    #[must_use]
    pub fn row(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.pending.push_back(values.into_iter().collect());
        self
    }

    /// Moves to the next row. Returns `false` once exhausted or closed.
    pub fn advance(&mut self) -> bool {
        if self.closed {
            return false;
        }
        match self.pending.pop_front() {
            Some(row) => {
                self.current = row;
                true
            }
            None => {
                self.current.clear();
                false
            }
        }
    }

    /// Whether [`RowSource::close`] has been called.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Rows not yet visited.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl RowSource for RowSet {
    fn field_count(&self) -> usize {
        self.columns.len()
    }

    fn name(&self, ordinal: usize) -> &str {
        self.columns.get(ordinal).map_or("", String::as_str)
    }

    fn is_null(&self, ordinal: usize) -> bool {
        self.current.get(ordinal).is_none_or(Value::is_null)
    }

    fn value(&self, ordinal: usize) -> Value {
        self.current.get(ordinal).cloned().unwrap_or(Value::Null)
    }

    fn close(&mut self) {
        self.pending.clear();
        self.closed = true;
    }
}
