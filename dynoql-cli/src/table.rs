/// Result rendering for the CLI using comfy-table

use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use dynoql_api::{Column, Row, Rows, Value};
use dynoql_core::convert::{encode_bytes, value_to_json};

/// A fully drained cursor.
pub struct ResultSet {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn collect(rows: &mut Rows) -> dynoql_core::Result<Self> {
        let columns = rows.columns()?.to_vec();
        let mut collected = Vec::new();
        while let Some(row) = rows.next_row()? {
            collected.push(row);
        }
        Ok(Self {
            columns,
            rows: collected,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Row as a JSON object; absent cells are left out.
    pub fn row_json(&self, row: &Row) -> serde_json::Value {
        serde_json::Value::Object(
            self.columns
                .iter()
                .zip(row)
                .filter_map(|(col, cell)| cell.as_ref().map(|v| (col.name.clone(), value_to_json(v))))
                .collect(),
        )
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.rows.iter().map(|row| self.row_json(row)).collect())
    }
}

/// Formats a result set as a table, one column per attribute.
///
/// Cells an item does not have are shown as "-".
pub fn format_rows_table(set: &ResultSet) -> String {
    if set.rows.is_empty() {
        return "No rows".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(set.columns.iter().map(|col| Cell::new(&col.name)).collect::<Vec<_>>());

    for row in &set.rows {
        let cells = row
            .iter()
            .map(|cell| match cell {
                Some(value) => Cell::new(format_value(value)),
                None => Cell::new("-"),
            })
            .collect::<Vec<_>>();
        table.add_row(cells);
    }

    table.to_string()
}

/// Formats a value for a table cell
fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::UInt(u) => u.to_string(),
        Value::Float(f) => f.to_string(),
        Value::String(s) => s.clone(),
        Value::Bytes(b) => encode_bytes(b),
        Value::List(items) => {
            let items: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Set(items) => {
            let items: Vec<String> = items.iter().map(format_value).collect();
            format!("<<{}>>", items.join(", "))
        }
        Value::Map(map) => {
            let mut pairs: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("\"{}\": {}", k, format_value(v)))
                .collect();
            pairs.sort();
            format!("{{{}}}", pairs.join(", "))
        }
        Value::Attribute(_) | Value::Custom(_) => value_to_json(value).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynoql_core::AttributeValue;
    use std::collections::HashMap;

    fn set(items: Vec<Vec<(&str, AttributeValue)>>) -> ResultSet {
        let items = items
            .into_iter()
            .map(|pairs| {
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect::<HashMap<_, _>>()
            })
            .collect();
        ResultSet::collect(&mut Rows::from_items(items)).unwrap()
    }

    #[test]
    fn test_format_empty_rows() {
        let output = format_rows_table(&set(vec![]));
        assert_eq!(output, "No rows");
    }

    #[test]
    fn test_format_mixed_attributes() {
        let rs = set(vec![
            vec![
                ("name", AttributeValue::string("Alice")),
                ("age", AttributeValue::number(30)),
            ],
            vec![
                ("name", AttributeValue::string("Bob")),
                ("active", AttributeValue::Bool(true)),
            ],
        ]);
        assert_eq!(rs.len(), 2);

        let output = format_rows_table(&rs);
        assert!(output.contains("Alice"));
        assert!(output.contains("Bob"));
        assert!(output.contains("30"));
        assert!(output.contains("true"));
        // Missing attributes
        assert!(output.contains("-"));
    }

    #[test]
    fn test_row_json_skips_missing() {
        let rs = set(vec![
            vec![("id", AttributeValue::string("a")), ("n", AttributeValue::number(1))],
            vec![("id", AttributeValue::string("b"))],
        ]);
        assert_eq!(
            rs.to_json(),
            serde_json::json!([{"id": "a", "n": 1}, {"id": "b"}])
        );
    }

    #[test]
    fn test_format_value_types() {
        assert_eq!(format_value(&Value::from("test")), "test");
        assert_eq!(format_value(&Value::Int(42)), "42");
        assert_eq!(format_value(&Value::Float(1.5)), "1.5");
        assert_eq!(format_value(&Value::Bool(true)), "true");
        assert_eq!(format_value(&Value::Null), "null");
        assert_eq!(
            format_value(&Value::List(vec![Value::from("a"), Value::Int(1)])),
            "[a, 1]"
        );
        assert_eq!(
            format_value(&Value::Set(vec![Value::from("x"), Value::from("y")])),
            "<<x, y>>"
        );
    }
}
