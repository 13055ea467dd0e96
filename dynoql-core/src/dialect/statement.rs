/// Parsed statements: one variant per statement kind
///
/// Each kind is built from the pieces the grammar captured, then parsed
/// (options decoded into typed requests) and validated. Parsing never talks
/// to the store.

use super::dml::{
    count_placeholders, extract_limit, has_returning, split_trailing_options, IMPLICIT_RETURNING,
};
use super::options::Options;
use crate::error::{Error, Result};
use crate::schema::{
    AlterGsiRequest, AlterTableRequest, AttributeDefinition, BillingMode, CreateGsiRequest,
    CreateTableRequest, DropGsiRequest, IndexScope, KeySchemaElement, LocalSecondaryIndex,
    Projection, ProvisionedThroughput, ScalarType, TableClass, ThroughputUpdate,
};
use std::fmt;

/// Which execution modes a statement kind supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// Produces an affected-row count only
    ExecOnly,
    /// Produces a cursor only
    QueryOnly,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    CreateTable,
    ListTables,
    DescribeTable,
    AlterTable,
    DropTable,
    DescribeLsi,
    CreateGsi,
    DescribeGsi,
    AlterGsi,
    DropGsi,
    Insert,
    Select,
    Update,
    Delete,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::CreateTable => "CREATE TABLE",
            StatementKind::ListTables => "LIST TABLES",
            StatementKind::DescribeTable => "DESCRIBE TABLE",
            StatementKind::AlterTable => "ALTER TABLE",
            StatementKind::DropTable => "DROP TABLE",
            StatementKind::DescribeLsi => "DESCRIBE LSI",
            StatementKind::CreateGsi => "CREATE GSI",
            StatementKind::DescribeGsi => "DESCRIBE GSI",
            StatementKind::AlterGsi => "ALTER GSI",
            StatementKind::DropGsi => "DROP GSI",
            StatementKind::Insert => "INSERT",
            StatementKind::Select => "SELECT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
        }
    }

    pub fn mode(&self) -> ExecMode {
        match self {
            StatementKind::CreateTable
            | StatementKind::AlterTable
            | StatementKind::DropTable
            | StatementKind::CreateGsi
            | StatementKind::AlterGsi
            | StatementKind::DropGsi
            | StatementKind::Insert => ExecMode::ExecOnly,
            StatementKind::ListTables
            | StatementKind::DescribeTable
            | StatementKind::DescribeLsi
            | StatementKind::DescribeGsi
            | StatementKind::Select => ExecMode::QueryOnly,
            StatementKind::Update | StatementKind::Delete => ExecMode::Both,
        }
    }

    pub fn is_dml(&self) -> bool {
        matches!(
            self,
            StatementKind::Insert
                | StatementKind::Select
                | StatementKind::Update
                | StatementKind::Delete
        )
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable(CreateTable),
    ListTables,
    DescribeTable(DescribeTable),
    AlterTable(AlterTable),
    DropTable(DropTable),
    DescribeLsi(DescribeIndex),
    CreateGsi(CreateGsi),
    DescribeGsi(DescribeIndex),
    AlterGsi(AlterGsi),
    DropGsi(DropGsi),
    Dml(Dml),
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::CreateTable(_) => StatementKind::CreateTable,
            Statement::ListTables => StatementKind::ListTables,
            Statement::DescribeTable(_) => StatementKind::DescribeTable,
            Statement::AlterTable(_) => StatementKind::AlterTable,
            Statement::DropTable(_) => StatementKind::DropTable,
            Statement::DescribeLsi(_) => StatementKind::DescribeLsi,
            Statement::CreateGsi(_) => StatementKind::CreateGsi,
            Statement::DescribeGsi(_) => StatementKind::DescribeGsi,
            Statement::AlterGsi(_) => StatementKind::AlterGsi,
            Statement::DropGsi(_) => StatementKind::DropGsi,
            Statement::Dml(dml) => dml.kind.into(),
        }
    }

    /// Number of positional parameters the statement expects.
    pub fn num_input(&self) -> usize {
        match self {
            Statement::Dml(dml) => dml.num_input,
            _ => 0,
        }
    }

    pub fn mode(&self) -> ExecMode {
        self.kind().mode()
    }

    pub fn as_dml(&self) -> Option<&Dml> {
        match self {
            Statement::Dml(dml) => Some(dml),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Statement::CreateTable(s) => require_name("table", &s.request.table_name),
            Statement::ListTables => Ok(()),
            Statement::DescribeTable(s) => require_name("table", &s.table_name),
            Statement::AlterTable(s) => require_name("table", &s.request.table_name),
            Statement::DropTable(s) => require_name("table", &s.table_name),
            Statement::DescribeLsi(s) | Statement::DescribeGsi(s) => {
                require_name("table", &s.table_name)?;
                require_name("index", &s.index_name)
            }
            Statement::CreateGsi(s) => {
                require_name("table", &s.request.table_name)?;
                require_name("index", &s.request.index_name)
            }
            Statement::AlterGsi(s) => {
                require_name("table", &s.request.table_name)?;
                require_name("index", &s.request.index_name)
            }
            Statement::DropGsi(s) => {
                require_name("table", &s.request.table_name)?;
                require_name("index", &s.request.index_name)
            }
            Statement::Dml(dml) => {
                if dml.text.is_empty() {
                    return Err(Error::syntax("empty statement"));
                }
                Ok(())
            }
        }
    }
}

fn require_name(what: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Syntax(format!("{} name is missing", what)));
    }
    Ok(())
}

// ============================================================================
// Option decoding helpers
// ============================================================================

/// Decodes `name:type` key definitions. `Ok(None)` when the option is absent
/// or its name part is empty.
fn parse_key_def(options: &Options, key: &str, label: &str) -> Result<Option<(String, ScalarType)>> {
    let Some(raw) = options.first(key) else {
        return Ok(None);
    };
    let (name, type_name) = match raw.split_once(':') {
        Some((name, type_name)) => (name.trim(), type_name.trim()),
        None => (raw.trim(), ""),
    };
    if name.is_empty() {
        return Ok(None);
    }
    let scalar = ScalarType::parse(type_name).ok_or_else(|| {
        Error::Syntax(format!(
            "invalid type <{}> for {}, accepts values are BINARY, NUMBER and STRING",
            type_name.to_uppercase(),
            label
        ))
    })?;
    Ok(Some((name.to_string(), scalar)))
}

fn required_partition_key(options: &Options) -> Result<(String, ScalarType)> {
    parse_key_def(options, "PK", "PartitionKey")?.ok_or_else(|| {
        Error::syntax("no PartitionKey, specify one using WITH pk=pkname:pktype")
    })
}

/// Decodes a non-negative capacity option.
fn parse_capacity(options: &Options, key: &str) -> Result<Option<i64>> {
    let Some(raw) = options.first(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|n| *n >= 0)
        .map(Some)
        .ok_or_else(|| Error::Syntax(format!("invalid {} value: {}", key, raw)))
}

fn parse_table_class(options: &Options) -> Result<Option<TableClass>> {
    let Some(raw) = options.first("CLASS") else {
        return Ok(None);
    };
    TableClass::parse(raw).map(Some).ok_or_else(|| {
        Error::Syntax(format!(
            "invalid table class <{}>, accepts values are STANDARD, STANDARD_IA",
            raw
        ))
    })
}

fn push_attribute(defs: &mut Vec<AttributeDefinition>, name: &str, scalar: ScalarType) {
    if !defs.iter().any(|d| d.attribute_name == name) {
        defs.push(AttributeDefinition::new(name, scalar));
    }
}

// ============================================================================
// Table statements
// ============================================================================

/// `CREATE TABLE [IF NOT EXISTS] name WITH PK=.. [WITH SK=..] [WITH LSI=..]...`
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub if_not_exists: bool,
    pub options: Options,
    pub request: CreateTableRequest,
}

impl CreateTable {
    pub fn parse(table_name: &str, if_not_exists: bool, with_text: &str) -> Result<Self> {
        let options = Options::parse(with_text);

        let (pk_name, pk_type) = required_partition_key(&options)?;
        let sort_key = parse_key_def(&options, "SK", "SortKey")?;

        let mut attribute_definitions = vec![AttributeDefinition::new(&pk_name, pk_type)];
        let mut key_schema = vec![KeySchemaElement::hash(&pk_name)];
        if let Some((sk_name, sk_type)) = &sort_key {
            push_attribute(&mut attribute_definitions, sk_name, *sk_type);
            key_schema.push(KeySchemaElement::range(sk_name));
        }

        let mut local_secondary_indexes = Vec::new();
        for def in options.get("LSI").into_iter().flat_map(|v| v.iter()) {
            let mut parts = def.splitn(4, ':').map(str::trim);
            let index_name = parts.next().unwrap_or("");
            if index_name.is_empty() {
                continue;
            }
            let attr_name = parts.next().unwrap_or("");
            if attr_name.is_empty() {
                return Err(Error::Syntax(format!(
                    "invalid LSI definition <{}>: empty field name",
                    index_name
                )));
            }
            let type_name = parts.next().unwrap_or("");
            let scalar = ScalarType::parse(type_name).ok_or_else(|| {
                Error::Syntax(format!(
                    "invalid type <{}> of LSI <{}>, accepts values are BINARY, NUMBER and STRING",
                    type_name.to_uppercase(),
                    index_name
                ))
            })?;
            push_attribute(&mut attribute_definitions, attr_name, scalar);
            local_secondary_indexes.push(LocalSecondaryIndex {
                index_name: index_name.to_string(),
                key_schema: vec![
                    KeySchemaElement::hash(&pk_name),
                    KeySchemaElement::range(attr_name),
                ],
                projection: Projection::parse(parts.next()),
            });
        }

        let table_class = parse_table_class(&options)?;
        let rcu = parse_capacity(&options, "RCU")?;
        let wcu = parse_capacity(&options, "WCU")?;

        let (billing_mode, provisioned_throughput) =
            match (rcu.unwrap_or(0), wcu.unwrap_or(0)) {
                (0, 0) => (BillingMode::PayPerRequest, None),
                (read, write) => (
                    BillingMode::Provisioned,
                    Some(ProvisionedThroughput {
                        read_capacity_units: read,
                        write_capacity_units: write,
                    }),
                ),
            };

        Ok(Self {
            if_not_exists,
            options,
            request: CreateTableRequest {
                table_name: table_name.to_string(),
                attribute_definitions,
                key_schema,
                local_secondary_indexes,
                billing_mode,
                provisioned_throughput,
                table_class,
            },
        })
    }
}

/// `ALTER TABLE name [WITH RCU=..] [WITH WCU=..] [WITH CLASS=..]`
#[derive(Debug, Clone, PartialEq)]
pub struct AlterTable {
    pub options: Options,
    pub request: AlterTableRequest,
}

impl AlterTable {
    pub fn parse(table_name: &str, with_text: &str) -> Result<Self> {
        let options = Options::parse(with_text);
        let table_class = parse_table_class(&options)?;
        let rcu = parse_capacity(&options, "RCU")?;
        let wcu = parse_capacity(&options, "WCU")?;

        let (billing_mode, provisioned_throughput) = match (rcu, wcu) {
            (None, None) => (None, None),
            // on-demand only when both capacities are given as zero
            (Some(0), Some(0)) => (Some(BillingMode::PayPerRequest), None),
            (read, write) => (
                Some(BillingMode::Provisioned),
                Some(ThroughputUpdate {
                    read_capacity_units: read,
                    write_capacity_units: write,
                }),
            ),
        };

        Ok(Self {
            options,
            request: AlterTableRequest {
                table_name: table_name.to_string(),
                billing_mode,
                provisioned_throughput,
                table_class,
            },
        })
    }
}

/// `(DROP|DELETE) TABLE [IF EXISTS] name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTable {
    pub table_name: String,
    pub if_exists: bool,
}

/// `DESCRIBE TABLE name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeTable {
    pub table_name: String,
}

// ============================================================================
// Index statements
// ============================================================================

/// `DESCRIBE (GSI|LSI) index ON table`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeIndex {
    pub table_name: String,
    pub index_name: String,
    pub scope: IndexScope,
}

/// `CREATE GSI [IF NOT EXISTS] index ON table WITH PK=.. [WITH SK=..] [WITH PROJECTION=..]`
#[derive(Debug, Clone, PartialEq)]
pub struct CreateGsi {
    pub if_not_exists: bool,
    pub options: Options,
    pub request: CreateGsiRequest,
}

impl CreateGsi {
    pub fn parse(
        index_name: &str,
        table_name: &str,
        if_not_exists: bool,
        with_text: &str,
    ) -> Result<Self> {
        let options = Options::parse(with_text);

        let (pk_name, pk_type) = required_partition_key(&options)?;
        let mut attribute_definitions = vec![AttributeDefinition::new(&pk_name, pk_type)];
        let mut key_schema = vec![KeySchemaElement::hash(&pk_name)];
        if let Some((sk_name, sk_type)) = parse_key_def(&options, "SK", "SortKey")? {
            push_attribute(&mut attribute_definitions, &sk_name, sk_type);
            key_schema.push(KeySchemaElement::range(sk_name));
        }

        let rcu = parse_capacity(&options, "RCU")?;
        let wcu = parse_capacity(&options, "WCU")?;
        let provisioned_throughput = match (rcu, wcu) {
            (Some(read), Some(write)) => Some(ProvisionedThroughput {
                read_capacity_units: read,
                write_capacity_units: write,
            }),
            _ => None,
        };

        let projection = Projection::parse(options.first("PROJECTION"));

        Ok(Self {
            if_not_exists,
            options,
            request: CreateGsiRequest {
                table_name: table_name.to_string(),
                index_name: index_name.to_string(),
                attribute_definitions,
                key_schema,
                projection,
                provisioned_throughput,
            },
        })
    }
}

/// `ALTER GSI index ON table WITH RCU=.. WITH WCU=..`
#[derive(Debug, Clone, PartialEq)]
pub struct AlterGsi {
    pub options: Options,
    pub request: AlterGsiRequest,
}

impl AlterGsi {
    pub fn parse(index_name: &str, table_name: &str, with_text: &str) -> Result<Self> {
        let options = Options::parse(with_text);
        let rcu = parse_capacity(&options, "RCU")?;
        let wcu = parse_capacity(&options, "WCU")?;
        let (Some(read), Some(write)) = (rcu, wcu) else {
            return Err(Error::syntax(
                "ALTER GSI needs both capacities, specify them using WITH rcu=<n> WITH wcu=<n>",
            ));
        };

        Ok(Self {
            options,
            request: AlterGsiRequest {
                table_name: table_name.to_string(),
                index_name: index_name.to_string(),
                provisioned_throughput: ProvisionedThroughput {
                    read_capacity_units: read,
                    write_capacity_units: write,
                },
            },
        })
    }
}

/// `(DROP|DELETE) GSI [IF EXISTS] index ON table`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropGsi {
    pub if_exists: bool,
    pub request: DropGsiRequest,
}

// ============================================================================
// Item statements
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DmlKind {
    Insert,
    Select,
    Update,
    Delete,
}

impl From<DmlKind> for StatementKind {
    fn from(kind: DmlKind) -> Self {
        match kind {
            DmlKind::Insert => StatementKind::Insert,
            DmlKind::Select => StatementKind::Select,
            DmlKind::Update => StatementKind::Update,
            DmlKind::Delete => StatementKind::Delete,
        }
    }
}

/// Item statement passed through to the store's query language.
#[derive(Debug, Clone, PartialEq)]
pub struct Dml {
    pub kind: DmlKind,
    /// Text sent when executed on its own
    pub text: String,
    /// Text sent when queued in a transaction (no implicit RETURNING)
    pub tx_text: String,
    pub num_input: usize,
    /// Total row cap for SELECT
    pub limit: Option<i32>,
    pub options: Options,
}

impl Dml {
    pub fn parse(kind: DmlKind, query: &str) -> Result<Self> {
        let (body, with_text) = split_trailing_options(query.trim());
        let options = Options::parse(with_text);

        let (body, limit) = if kind == DmlKind::Select {
            extract_limit(body)?
        } else {
            (body, None)
        };

        let tx_text = body.to_string();
        let needs_returning =
            matches!(kind, DmlKind::Update | DmlKind::Delete) && !has_returning(body);
        let text = if needs_returning {
            format!("{}{}", body, IMPLICIT_RETURNING)
        } else {
            tx_text.clone()
        };

        Ok(Self {
            kind,
            num_input: count_placeholders(body),
            text,
            tx_text,
            limit,
            options,
        })
    }

    /// True when `RETURNING ALL OLD *` was added to `text`.
    pub fn has_implicit_returning(&self) -> bool {
        self.text.len() != self.tx_text.len()
    }

    /// Requested read consistency from `WITH CONSISTENT_READ=..` or
    /// `WITH CONSISTENTREAD=..`.
    pub fn consistent_read(&self) -> Option<bool> {
        self.options
            .get("CONSISTENT_READ")
            .or_else(|| self.options.get("CONSISTENTREAD"))
            .map(|v| v.first_bool())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ProjectionType;

    #[test]
    fn test_create_table_minimal() {
        let stmt = CreateTable::parse("users", false, " WITH pk=id:string").unwrap();
        let req = &stmt.request;
        assert_eq!(req.table_name, "users");
        assert_eq!(req.key_schema, vec![KeySchemaElement::hash("id")]);
        assert_eq!(req.attribute_definitions, vec![AttributeDefinition::new("id", ScalarType::S)]);
        assert_eq!(req.billing_mode, BillingMode::PayPerRequest);
        assert!(req.provisioned_throughput.is_none());
        assert!(req.table_class.is_none());
    }

    #[test]
    fn test_create_table_full() {
        let stmt = CreateTable::parse(
            "orders",
            true,
            " WITH PK=customer:S, WITH SK=created:N WITH LSI=by_total:total:N:* \
             WITH LSI=by_status:status:S:a,b WITH LSI=by_sku:sku:B WITH RCU=5 WITH wcu=0 WITH class=standard_ia",
        )
        .unwrap();
        let req = &stmt.request;
        assert!(stmt.if_not_exists);
        assert_eq!(req.key_schema.len(), 2);
        assert_eq!(req.attribute_definitions.len(), 5);
        assert_eq!(req.local_secondary_indexes.len(), 3);

        let by_total = &req.local_secondary_indexes[0];
        assert_eq!(
            by_total.key_schema,
            vec![KeySchemaElement::hash("customer"), KeySchemaElement::range("total")]
        );
        assert_eq!(by_total.projection.projection_type, ProjectionType::All);
        assert_eq!(req.local_secondary_indexes[1].projection.non_key_attributes, vec!["a", "b"]);
        assert_eq!(
            req.local_secondary_indexes[2].projection.projection_type,
            ProjectionType::KeysOnly
        );

        assert_eq!(req.billing_mode, BillingMode::Provisioned);
        assert_eq!(
            req.provisioned_throughput,
            Some(ProvisionedThroughput { read_capacity_units: 5, write_capacity_units: 0 })
        );
        assert_eq!(req.table_class, Some(TableClass::StandardInfrequentAccess));
    }

    #[test]
    fn test_create_table_option_errors() {
        let cases = [
            ("", "no PartitionKey"),
            (" WITH pk=id", "invalid type"),
            (" WITH pk=id:bool", "for PartitionKey"),
            (" WITH pk=id:S WITH sk=ts:date", "for SortKey"),
            (" WITH pk=id:S WITH lsi=idx", "empty field name"),
            (" WITH pk=id:S WITH lsi=idx:a:X", "of LSI <idx>"),
            (" WITH pk=id:S WITH rcu=-1", "invalid RCU value"),
            (" WITH pk=id:S WITH wcu=lots", "invalid WCU value"),
            (" WITH pk=id:S WITH class=cold", "invalid table class"),
        ];
        for (with_text, fragment) in cases {
            match CreateTable::parse("t", false, with_text) {
                Err(Error::Syntax(msg)) => assert!(msg.contains(fragment), "{}: {}", with_text, msg),
                other => panic!("{}: expected syntax error, got {:?}", with_text, other),
            }
        }
    }

    #[test]
    fn test_alter_table_billing() {
        let stmt = AlterTable::parse("t", " WITH rcu=0 WITH wcu=0").unwrap();
        assert_eq!(stmt.request.billing_mode, Some(BillingMode::PayPerRequest));
        assert!(stmt.request.provisioned_throughput.is_none());

        let stmt = AlterTable::parse("t", " WITH rcu=3").unwrap();
        assert_eq!(stmt.request.billing_mode, Some(BillingMode::Provisioned));
        assert_eq!(
            stmt.request.provisioned_throughput,
            Some(ThroughputUpdate { read_capacity_units: Some(3), write_capacity_units: None })
        );

        // A single zero capacity stays provisioned
        let stmt = AlterTable::parse("t", " WITH RCU=0").unwrap();
        assert_eq!(stmt.request.billing_mode, Some(BillingMode::Provisioned));
        assert_eq!(
            stmt.request.provisioned_throughput,
            Some(ThroughputUpdate { read_capacity_units: Some(0), write_capacity_units: None })
        );

        let stmt = AlterTable::parse("t", " WITH rcu=0 WITH wcu=7").unwrap();
        assert_eq!(stmt.request.billing_mode, Some(BillingMode::Provisioned));
        assert_eq!(
            stmt.request.provisioned_throughput,
            Some(ThroughputUpdate { read_capacity_units: Some(0), write_capacity_units: Some(7) })
        );

        let stmt = AlterTable::parse("t", " WITH class=STANDARD").unwrap();
        assert_eq!(stmt.request.billing_mode, None);
        assert_eq!(stmt.request.table_class, Some(TableClass::Standard));
    }

    #[test]
    fn test_create_gsi() {
        let stmt = CreateGsi::parse(
            "by_email",
            "users",
            false,
            " WITH pk=email:S WITH sk=ts:N WITH projection=name,age WITH rcu=1",
        )
        .unwrap();
        let req = &stmt.request;
        assert_eq!(req.index_name, "by_email");
        assert_eq!(req.table_name, "users");
        assert_eq!(req.key_schema.len(), 2);
        assert_eq!(req.projection.projection_type, ProjectionType::Include);
        // throughput is only set when both capacities are given
        assert!(req.provisioned_throughput.is_none());

        let stmt = CreateGsi::parse("i", "t", false, " WITH pk=a:N WITH rcu=1 WITH wcu=2").unwrap();
        assert_eq!(
            stmt.request.provisioned_throughput,
            Some(ProvisionedThroughput { read_capacity_units: 1, write_capacity_units: 2 })
        );
        assert_eq!(stmt.request.projection, Projection::keys_only());
    }

    #[test]
    fn test_alter_gsi_needs_both_capacities() {
        assert!(AlterGsi::parse("i", "t", " WITH rcu=1").is_err());
        let stmt = AlterGsi::parse("i", "t", " WITH rcu=1 WITH wcu=4").unwrap();
        assert_eq!(stmt.request.provisioned_throughput.write_capacity_units, 4);
    }

    #[test]
    fn test_dml_select_limit_and_options() {
        let dml = Dml::parse(
            DmlKind::Select,
            r#"SELECT * FROM "table" LIMIT 1 WITH CONSISTENTREAD=strong"#,
        )
        .unwrap();
        assert_eq!(dml.text, r#"SELECT * FROM "table""#);
        assert_eq!(dml.limit, Some(1));
        assert_eq!(dml.consistent_read(), Some(true));
        assert_eq!(dml.num_input, 0);
    }

    #[test]
    fn test_dml_delete_appends_returning() {
        let dml = Dml::parse(DmlKind::Delete, r#"DELETE FROM "t" WHERE id=?"#).unwrap();
        assert_eq!(dml.text, r#"DELETE FROM "t" WHERE id=? RETURNING ALL OLD *"#);
        assert_eq!(dml.tx_text, r#"DELETE FROM "t" WHERE id=?"#);
        assert!(dml.has_implicit_returning());
        assert_eq!(dml.num_input, 1);

        let dml = Dml::parse(
            DmlKind::Update,
            r#"UPDATE "t" SET a=1 WHERE id=2 RETURNING ALL NEW *"#,
        )
        .unwrap();
        assert!(!dml.has_implicit_returning());
        assert_eq!(dml.text, dml.tx_text);
    }

    #[test]
    fn test_limit_only_applies_to_select() {
        let dml = Dml::parse(DmlKind::Insert, r#"INSERT INTO "t" VALUE {'LIMIT': 5}"#).unwrap();
        assert_eq!(dml.limit, None);
    }

    #[test]
    fn test_quoted_limit_and_with_are_literal() {
        let query = r#"SELECT * FROM "t" WHERE note = 'no LIMIT x'"#;
        let dml = Dml::parse(DmlKind::Select, query).unwrap();
        assert_eq!(dml.text, query);
        assert_eq!(dml.limit, None);

        let query = r#"SELECT * FROM "t" WHERE note = 'a WITH b=c' LIMIT 3"#;
        let dml = Dml::parse(DmlKind::Select, query).unwrap();
        assert_eq!(dml.text, r#"SELECT * FROM "t" WHERE note = 'a WITH b=c'"#);
        assert_eq!(dml.limit, Some(3));
        assert!(dml.options.is_empty());

        let query = r#"SELECT * FROM "t" WHERE note = 'a WITH b=c'"#;
        let dml = Dml::parse(DmlKind::Select, query).unwrap();
        assert_eq!(dml.text, query);
        assert!(dml.options.is_empty());
    }

    #[test]
    fn test_validate_missing_names() {
        let stmt = Statement::DropTable(DropTable { table_name: " ".into(), if_exists: false });
        assert!(stmt.validate().is_err());

        let stmt = Statement::DescribeGsi(DescribeIndex {
            table_name: "t".into(),
            index_name: "".into(),
            scope: IndexScope::Global,
        });
        match stmt.validate() {
            Err(Error::Syntax(msg)) => assert_eq!(msg, "index name is missing"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_modes() {
        assert_eq!(StatementKind::Insert.mode(), ExecMode::ExecOnly);
        assert_eq!(StatementKind::Select.mode(), ExecMode::QueryOnly);
        assert_eq!(StatementKind::Delete.mode(), ExecMode::Both);
        assert_eq!(StatementKind::DescribeLsi.mode(), ExecMode::QueryOnly);
    }
}
