/// Statement recognition
///
/// An ordered table of anchored, case-insensitive patterns; the first one
/// that matches decides the statement kind. Keywords are case-insensitive,
/// table and index names are kept verbatim.

use super::options::{OPT_SEPARATOR, OPT_VALUE};
use super::statement::{
    AlterGsi, AlterTable, CreateGsi, CreateTable, DescribeIndex, DescribeTable, Dml, DmlKind,
    DropGsi, DropTable, Statement,
};
use crate::error::{Error, Result};
use crate::schema::{DropGsiRequest, IndexScope};
use regex::{Captures, Regex};
use std::sync::OnceLock;
use tracing::debug;

const NAME: &str = r"([\w\-]+)";
const IF_NOT_EXISTS: &str = r"(\s+IF\s+NOT\s+EXISTS)?";
const IF_EXISTS: &str = r"(\s+IF\s+EXISTS)?";

type Build = fn(&Captures<'_>, &str) -> Result<Statement>;

struct Rule {
    pattern: Regex,
    build: Build,
}

/// Optional run of `WITH key=value` fragments, captured as one group.
fn with_clause() -> String {
    let one = format!(r"WITH\s+[\w\-]+\s*=\s*{}", OPT_VALUE);
    format!(r"(\s+{one}(?:{sep}{one})*)?", one = one, sep = OPT_SEPARATOR)
}

fn rule(pattern: String, build: Build) -> Rule {
    let pattern = format!("(?i)^{}$", pattern);
    Rule {
        pattern: Regex::new(&pattern).expect("statement pattern is valid"),
        build,
    }
}

fn prefix_rule(prefix: &str, build: Build) -> Rule {
    Rule {
        pattern: Regex::new(&format!("(?i)^{}", prefix)).expect("statement pattern is valid"),
        build,
    }
}

fn group<'a>(caps: &'a Captures<'_>, i: usize) -> &'a str {
    caps.get(i).map(|m| m.as_str()).unwrap_or("")
}

fn rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        let with = with_clause();
        vec![
            // CREATE TABLE [IF NOT EXISTS] <name> WITH ...
            rule(
                format!(r"CREATE\s+TABLE{}\s+{}{}", IF_NOT_EXISTS, NAME, with),
                |caps, _| {
                    CreateTable::parse(group(caps, 2), caps.get(1).is_some(), group(caps, 3))
                        .map(Statement::CreateTable)
                },
            ),
            rule(r"LIST\s+TABLES?".to_string(), |_, _| Ok(Statement::ListTables)),
            rule(format!(r"DESCRIBE\s+TABLE\s+{}", NAME), |caps, _| {
                Ok(Statement::DescribeTable(DescribeTable {
                    table_name: group(caps, 1).to_string(),
                }))
            }),
            rule(format!(r"ALTER\s+TABLE\s+{}{}", NAME, with), |caps, _| {
                AlterTable::parse(group(caps, 1), group(caps, 2)).map(Statement::AlterTable)
            }),
            rule(
                format!(r"(?:DROP|DELETE)\s+TABLE{}\s+{}", IF_EXISTS, NAME),
                |caps, _| {
                    Ok(Statement::DropTable(DropTable {
                        table_name: group(caps, 2).to_string(),
                        if_exists: caps.get(1).is_some(),
                    }))
                },
            ),
            rule(format!(r"DESCRIBE\s+LSI\s+{}\s+ON\s+{}", NAME, NAME), |caps, _| {
                Ok(Statement::DescribeLsi(DescribeIndex {
                    index_name: group(caps, 1).to_string(),
                    table_name: group(caps, 2).to_string(),
                    scope: IndexScope::Local,
                }))
            }),
            rule(
                format!(r"CREATE\s+GSI{}\s+{}\s+ON\s+{}{}", IF_NOT_EXISTS, NAME, NAME, with),
                |caps, _| {
                    CreateGsi::parse(
                        group(caps, 2),
                        group(caps, 3),
                        caps.get(1).is_some(),
                        group(caps, 4),
                    )
                    .map(Statement::CreateGsi)
                },
            ),
            rule(format!(r"DESCRIBE\s+GSI\s+{}\s+ON\s+{}", NAME, NAME), |caps, _| {
                Ok(Statement::DescribeGsi(DescribeIndex {
                    index_name: group(caps, 1).to_string(),
                    table_name: group(caps, 2).to_string(),
                    scope: IndexScope::Global,
                }))
            }),
            rule(format!(r"ALTER\s+GSI\s+{}\s+ON\s+{}{}", NAME, NAME, with), |caps, _| {
                AlterGsi::parse(group(caps, 1), group(caps, 2), group(caps, 3))
                    .map(Statement::AlterGsi)
            }),
            rule(
                format!(r"(?:DROP|DELETE)\s+GSI{}\s+{}\s+ON\s+{}", IF_EXISTS, NAME, NAME),
                |caps, _| {
                    Ok(Statement::DropGsi(DropGsi {
                        if_exists: caps.get(1).is_some(),
                        request: DropGsiRequest {
                            index_name: group(caps, 2).to_string(),
                            table_name: group(caps, 3).to_string(),
                        },
                    }))
                },
            ),
            prefix_rule(r"INSERT\s+INTO\s+", |_, query| {
                Dml::parse(DmlKind::Insert, query).map(Statement::Dml)
            }),
            prefix_rule(r"SELECT\s+", |_, query| {
                Dml::parse(DmlKind::Select, query).map(Statement::Dml)
            }),
            prefix_rule(r"UPDATE\s+", |_, query| {
                Dml::parse(DmlKind::Update, query).map(Statement::Dml)
            }),
            prefix_rule(r"DELETE\s+FROM\s+", |_, query| {
                Dml::parse(DmlKind::Delete, query).map(Statement::Dml)
            }),
        ]
    })
}

/// Recognizes, parses and validates one statement.
pub fn parse(query: &str) -> Result<Statement> {
    let trimmed = query.trim();
    for rule in rules() {
        if let Some(caps) = rule.pattern.captures(trimmed) {
            let stmt = (rule.build)(&caps, trimmed)?;
            stmt.validate()?;
            debug!(kind = %stmt.kind(), params = stmt.num_input(), "parsed statement");
            return Ok(stmt);
        }
    }
    Err(Error::Syntax(query.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::StatementKind;
    use crate::schema::BillingMode;

    fn kind_of(query: &str) -> StatementKind {
        parse(query)
            .unwrap_or_else(|e| panic!("{}: {}", query, e))
            .kind()
    }

    #[test]
    fn test_ddl_dispatch() {
        let cases = [
            ("CREATE TABLE t WITH pk=id:string", StatementKind::CreateTable),
            ("create table if not exists t with PK=id:S", StatementKind::CreateTable),
            ("LIST TABLES", StatementKind::ListTables),
            ("list table", StatementKind::ListTables),
            ("DESCRIBE TABLE t", StatementKind::DescribeTable),
            ("ALTER TABLE t WITH rcu=1 WITH wcu=2", StatementKind::AlterTable),
            ("DROP TABLE t", StatementKind::DropTable),
            ("delete table if exists t", StatementKind::DropTable),
            ("DESCRIBE LSI idx ON t", StatementKind::DescribeLsi),
            ("CREATE GSI idx ON t WITH pk=a:N", StatementKind::CreateGsi),
            ("DESCRIBE GSI idx ON t", StatementKind::DescribeGsi),
            ("ALTER GSI idx ON t WITH rcu=1, WITH wcu=1", StatementKind::AlterGsi),
            ("DROP GSI IF EXISTS idx ON t", StatementKind::DropGsi),
            ("DELETE GSI idx ON t", StatementKind::DropGsi),
        ];
        for (query, expected) in cases {
            assert_eq!(kind_of(query), expected, "{}", query);
        }
    }

    #[test]
    fn test_dml_dispatch() {
        assert_eq!(kind_of(r#"INSERT INTO "t" VALUE {'id': ?}"#), StatementKind::Insert);
        assert_eq!(kind_of(r#"select * from "t""#), StatementKind::Select);
        assert_eq!(kind_of(r#"UPDATE "t" SET a=1 WHERE id=1"#), StatementKind::Update);
        assert_eq!(kind_of(r#"DELETE FROM "t" WHERE id=1"#), StatementKind::Delete);
    }

    #[test]
    fn test_delete_table_is_not_delete_from() {
        assert_eq!(kind_of("DELETE TABLE orders"), StatementKind::DropTable);
    }

    #[test]
    fn test_names_keep_case() {
        match parse("describe gsi ByEmail on Users").unwrap() {
            Statement::DescribeGsi(d) => {
                assert_eq!(d.index_name, "ByEmail");
                assert_eq!(d.table_name, "Users");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_if_not_exists_flag() {
        match parse("CREATE TABLE IF NOT EXISTS demo WITH pk=id:S").unwrap() {
            Statement::CreateTable(c) => {
                assert!(c.if_not_exists);
                assert_eq!(c.request.table_name, "demo");
                assert_eq!(c.request.billing_mode, BillingMode::PayPerRequest);
            }
            other => panic!("unexpected {:?}", other),
        }
        match parse("DROP TABLE demo").unwrap() {
            Statement::DropTable(d) => assert!(!d.if_exists),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_option_key_case_equivalent() {
        let a = parse("CREATE TABLE t WITH pk=id:S").unwrap();
        let b = parse("CREATE TABLE t WITH PK=id:S").unwrap();
        match (a, b) {
            (Statement::CreateTable(a), Statement::CreateTable(b)) => assert_eq!(a.request, b.request),
            _ => panic!("expected create table statements"),
        }
    }

    #[test]
    fn test_unrecognized_statement() {
        match parse("TRUNCATE TABLE t") {
            Err(e @ Error::Syntax(_)) => assert_eq!(e.to_string(), "invalid query: TRUNCATE TABLE t"),
            other => panic!("unexpected {:?}", other),
        }
        // WITH must be preceded by whitespace
        assert!(parse("CREATE TABLE tWITH pk=id:S").is_err());
    }

    #[test]
    fn test_missing_partition_key_fails_parse() {
        match parse("CREATE TABLE t") {
            Err(Error::Syntax(msg)) => assert!(msg.starts_with("no PartitionKey")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_queued_text_has_no_implicit_returning() {
        let stmt = parse(r#"DELETE FROM "t" WHERE id=?"#).unwrap();
        let dml = stmt.as_dml().unwrap();
        assert_eq!(dml.text, r#"DELETE FROM "t" WHERE id=? RETURNING ALL OLD *"#);
        assert_eq!(dml.tx_text, r#"DELETE FROM "t" WHERE id=?"#);
    }

    #[test]
    fn test_surrounding_whitespace_ignored() {
        assert_eq!(kind_of("  \n LIST TABLES \n"), StatementKind::ListTables);
    }
}
