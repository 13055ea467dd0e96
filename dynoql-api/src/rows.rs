/// Tabular cursor over schema-less results
///
/// Items returned by the store do not share a schema, so the column list is
/// the sorted union of attribute names across all rows, computed once on
/// first use. Each column's type is taken from the first row that has it.

use crate::transaction::TxSlot;
use dynoql_core::convert::from_attribute_value;
use dynoql_core::{Error, Item, Result, TypeTag, Value, ValueKind};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

/// One result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    /// Store-native type name: `S`, `N`, `BOOL`... for items; `STRING`,
    /// `NUMBER`, `BOOLEAN`, `ARRAY`, `MAP` for descriptions
    pub type_name: &'static str,
    /// Generic kind of the first value seen in this column
    pub kind: Option<ValueKind>,
}

impl Column {
    fn new(name: impl Into<String>, type_name: &'static str, kind: Option<ValueKind>) -> Self {
        Self {
            name: name.into(),
            type_name,
            kind,
        }
    }
}

/// One row, ordered like [`Rows::columns`]. `None` where the item has no
/// such attribute.
pub type Row = Vec<Option<Value>>;

#[derive(Debug)]
enum Source {
    Items(Vec<Item>),
    Fixed(Vec<Row>),
    /// Result of a statement queued in a transaction
    Pending(Arc<TxSlot>),
}

#[derive(Debug)]
pub struct Rows {
    source: Source,
    columns: OnceLock<Vec<Column>>,
    cursor: usize,
}

impl Rows {
    pub fn from_items(items: Vec<Item>) -> Self {
        Self {
            source: Source::Items(items),
            columns: OnceLock::new(),
            cursor: 0,
        }
    }

    pub fn empty() -> Self {
        Self::from_items(Vec::new())
    }

    pub(crate) fn pending(slot: Arc<TxSlot>) -> Self {
        Self {
            source: Source::Pending(slot),
            columns: OnceLock::new(),
            cursor: 0,
        }
    }

    fn fixed(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        Self {
            source: Source::Fixed(rows),
            columns: OnceLock::from(columns),
            cursor: 0,
        }
    }

    /// Single `$1` column of table names, sorted.
    pub(crate) fn from_table_names(mut names: Vec<String>) -> Self {
        names.sort();
        let rows = names
            .into_iter()
            .map(|name| vec![Some(Value::String(name))])
            .collect();
        Self::fixed(vec![Column::new("$1", "STRING", Some(ValueKind::String))], rows)
    }

    /// One row whose columns are the descriptor's serialized fields, sorted
    /// by name. Absent optional fields produce no column.
    pub(crate) fn from_descriptor<T: Serialize>(descriptor: &T) -> Result<Self> {
        let json = serde_json::to_value(descriptor)
            .map_err(|e| Error::Internal(format!("cannot render description: {}", e)))?;
        let serde_json::Value::Object(fields) = json else {
            return Err(Error::Internal("description is not an object".to_string()));
        };

        let mut fields: Vec<(String, serde_json::Value)> = fields.into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let mut columns = Vec::with_capacity(fields.len());
        let mut row = Vec::with_capacity(fields.len());
        for (name, json) in fields {
            let type_name = json_type_name(&json);
            let value = Value::from(json);
            columns.push(Column::new(name, type_name, Some(value.kind())));
            row.push(Some(value));
        }
        Ok(Self::fixed(columns, vec![row]))
    }

    /// True while this cursor stands for a statement queued in an
    /// unfinished transaction.
    pub fn is_pending(&self) -> bool {
        match &self.source {
            Source::Pending(slot) => slot.is_waiting(),
            _ => false,
        }
    }

    /// Swaps a pending source for the item its transaction produced.
    fn resolve(&mut self) -> Result<()> {
        if let Source::Pending(slot) = &self.source {
            let output = slot.output()?;
            self.source = Source::Items(output.item.into_iter().collect());
        }
        Ok(())
    }

    pub fn columns(&mut self) -> Result<&[Column]> {
        self.resolve()?;
        let source = &self.source;
        Ok(self.columns.get_or_init(|| match source {
            Source::Items(items) => infer_columns(items),
            Source::Fixed(_) | Source::Pending(_) => Vec::new(),
        }))
    }

    pub fn column_names(&mut self) -> Result<Vec<String>> {
        Ok(self.columns()?.iter().map(|c| c.name.clone()).collect())
    }

    /// Rows not yet read.
    pub fn remaining(&mut self) -> Result<usize> {
        self.resolve()?;
        let total = match &self.source {
            Source::Items(items) => items.len(),
            Source::Fixed(rows) => rows.len(),
            Source::Pending(_) => 0,
        };
        Ok(total.saturating_sub(self.cursor))
    }

    pub fn next_row(&mut self) -> Result<Option<Row>> {
        self.columns()?;
        let columns = self.columns.get().map(Vec::as_slice).unwrap_or(&[]);
        let row = match &self.source {
            Source::Items(items) => items.get(self.cursor).map(|item| {
                columns
                    .iter()
                    .map(|c| item.get(&c.name).map(from_attribute_value))
                    .collect()
            }),
            Source::Fixed(rows) => rows.get(self.cursor).cloned(),
            Source::Pending(_) => None,
        };
        if row.is_some() {
            self.cursor += 1;
        }
        Ok(row)
    }
}

fn infer_columns(items: &[Item]) -> Vec<Column> {
    let names: BTreeSet<&str> = items
        .iter()
        .flat_map(|item| item.keys().map(String::as_str))
        .collect();

    names
        .into_iter()
        .map(|name| {
            let first = items.iter().find_map(|item| item.get(name));
            Column::new(
                name,
                TypeTag::of_opt(first).map(|t| t.as_str()).unwrap_or(""),
                first.map(|av| from_attribute_value(av).kind()),
            )
        })
        .collect()
}

fn json_type_name(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "NULL",
        serde_json::Value::Bool(_) => "BOOLEAN",
        serde_json::Value::Number(_) => "NUMBER",
        serde_json::Value::String(_) => "STRING",
        serde_json::Value::Array(_) => "ARRAY",
        serde_json::Value::Object(_) => "MAP",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TxOutput;
    use dynoql_core::schema::{IndexDescriptor, TableDescriptor};
    use dynoql_core::AttributeValue;

    fn item(pairs: &[(&str, AttributeValue)]) -> Item {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_columns_are_sorted_union() {
        let mut rows = Rows::from_items(vec![
            item(&[("id", AttributeValue::string("a")), ("b", AttributeValue::number(1))]),
            item(&[("id", AttributeValue::string("b")), ("active", AttributeValue::Bool(true))]),
        ]);
        assert_eq!(rows.column_names().unwrap(), vec!["active", "b", "id"]);

        let cols = rows.columns().unwrap();
        assert_eq!(cols[0].type_name, "BOOL");
        assert_eq!(cols[1].type_name, "N");
        assert_eq!(cols[1].kind, Some(ValueKind::Int));
        assert_eq!(cols[2].type_name, "S");

        let first = rows.next_row().unwrap().unwrap();
        assert_eq!(first, vec![None, Some(Value::Int(1)), Some(Value::from("a"))]);
        let second = rows.next_row().unwrap().unwrap();
        assert_eq!(second, vec![Some(Value::Bool(true)), None, Some(Value::from("b"))]);
        assert!(rows.next_row().unwrap().is_none());
    }

    #[test]
    fn test_empty_rows() {
        let mut rows = Rows::empty();
        assert!(rows.columns().unwrap().is_empty());
        assert_eq!(rows.remaining().unwrap(), 0);
        assert!(rows.next_row().unwrap().is_none());
    }

    #[test]
    fn test_table_names() {
        let mut rows = Rows::from_table_names(vec!["b".into(), "a".into()]);
        let cols = rows.columns().unwrap();
        assert_eq!(cols.len(), 1);
        assert_eq!(cols[0].name, "$1");
        assert_eq!(cols[0].type_name, "STRING");
        assert_eq!(rows.next_row().unwrap(), Some(vec![Some(Value::from("a"))]));
        assert_eq!(rows.next_row().unwrap(), Some(vec![Some(Value::from("b"))]));
    }

    #[test]
    fn test_table_descriptor_row() {
        let desc = TableDescriptor {
            table_name: "users".into(),
            table_status: Some("ACTIVE".into()),
            item_count: Some(3),
            ..Default::default()
        };
        let mut rows = Rows::from_descriptor(&desc).unwrap();
        let cols: Vec<(String, &str)> = rows
            .columns()
            .unwrap()
            .iter()
            .map(|c| (c.name.clone(), c.type_name))
            .collect();
        assert_eq!(
            cols,
            vec![
                ("ItemCount".to_string(), "NUMBER"),
                ("TableName".to_string(), "STRING"),
                ("TableStatus".to_string(), "STRING"),
            ]
        );
        let row = rows.next_row().unwrap().unwrap();
        assert_eq!(row[0], Some(Value::Int(3)));
        assert!(rows.next_row().unwrap().is_none());
    }

    #[test]
    fn test_index_descriptor_types() {
        let desc = IndexDescriptor {
            index_name: "by_email".into(),
            backfilling: Some(false),
            key_schema: vec![dynoql_core::schema::KeySchemaElement::hash("email")],
            ..Default::default()
        };
        let mut rows = Rows::from_descriptor(&desc).unwrap();
        let types: Vec<&str> = rows.columns().unwrap().iter().map(|c| c.type_name).collect();
        assert_eq!(types, vec!["BOOLEAN", "STRING", "ARRAY"]);
    }

    #[test]
    fn test_pending_rows() {
        let slot = TxSlot::new();
        let mut rows = Rows::pending(slot.clone());
        assert!(rows.is_pending());
        assert!(matches!(rows.columns(), Err(Error::InTransaction)));

        let returned = item(&[("id", AttributeValue::string("x"))]);
        slot.fill(TxOutput {
            item: Some(returned),
            ..Default::default()
        });
        assert!(!rows.is_pending());
        assert_eq!(rows.column_names().unwrap(), vec!["id"]);
        assert_eq!(rows.next_row().unwrap(), Some(vec![Some(Value::from("x"))]));

        let slot = TxSlot::new();
        let mut rows = Rows::pending(slot.clone());
        slot.discard();
        assert!(matches!(rows.next_row(), Err(Error::NoResult)));
    }
}
