//! Write guard for read-only providers.
//!
//! When a provider is configured with `allowWrites = false`, every statement
//! is classified before it reaches the server and anything that could modify
//! data, schema or server state is rejected with a permission error.
//!
//! Classification parses the SQL with the sqlparser MySQL dialect. MySQL has
//! syntax sqlparser does not understand, so when parsing fails the leading
//! keyword decides instead. Unrecognized leading keywords are treated as writes.

use crate::error::{DbError, DbResult};
use sqlparser::ast::Statement;
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer};

/// Kind of SQL statement detected by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// SELECT, SHOW, DESCRIBE, EXPLAIN, VALUES
    ReadOnly,
    /// INSERT, UPDATE, DELETE, REPLACE, LOAD DATA
    DmlWrite,
    /// CREATE, DROP, ALTER, TRUNCATE, RENAME
    Ddl,
    /// BEGIN, COMMIT, ROLLBACK, SAVEPOINT
    Transaction,
    /// CALL, EXECUTE, PREPARE
    ProcedureCall,
    /// GRANT, REVOKE, SET, LOCK, KILL, FLUSH
    Administrative,
    Unknown,
}

impl StatementKind {
    /// Whether statements of this kind may run on a read-only provider.
    pub fn permitted_without_writes(&self) -> bool {
        matches!(self, Self::ReadOnly | Self::Transaction)
    }
}

/// Reject `sql` when it is not permitted on a read-only provider.
///
/// With `allow_writes` set, nothing is inspected.
pub fn check_write_permission(sql: &str, allow_writes: bool) -> DbResult<()> {
    if allow_writes {
        return Ok(());
    }

    let (kind, operation) = classify_sql(sql);
    if kind.permitted_without_writes() {
        return Ok(());
    }

    Err(DbError::permission(
        operation,
        "Provider is read-only. Set 'allowWrites' to true to permit statements that modify data or schema.",
    ))
}

/// Classify SQL text.
///
/// For multi-statement text the first statement that is not permitted on a
/// read-only provider determines the result. Text containing MySQL executable
/// comments (`/*! ... */`) is `Unknown`: the server runs their contents but the
/// parser skips them.
pub fn classify_sql(sql: &str) -> (StatementKind, String) {
    if sql.contains("/*!") {
        return (StatementKind::Unknown, "executable comment".to_string());
    }
    if writes_to_file(sql) {
        return (StatementKind::DmlWrite, "SELECT INTO OUTFILE".to_string());
    }

    match Parser::parse_sql(&MySqlDialect {}, sql) {
        Ok(statements) if statements.is_empty() => {
            (StatementKind::Unknown, "empty statement".to_string())
        }
        Ok(statements) => statements
            .iter()
            .map(classify_statement)
            .find(|(kind, _)| !kind.permitted_without_writes())
            .map(|(kind, name)| (kind, name.to_string()))
            .unwrap_or((StatementKind::ReadOnly, "SELECT".to_string())),
        Err(e) => {
            tracing::debug!(error = %e, "SQL not parseable, classifying by leading keyword");
            classify_by_keyword(sql)
        }
    }
}

/// Whether the text has an `INTO OUTFILE` or `INTO DUMPFILE` clause.
///
/// Checked on tokens so string literals and quoted identifiers do not match.
fn writes_to_file(sql: &str) -> bool {
    let tokens = match Tokenizer::new(&MySqlDialect {}, sql).tokenize() {
        Ok(tokens) => tokens,
        Err(_) => {
            let upper = sql.to_ascii_uppercase();
            return upper.contains("OUTFILE") || upper.contains("DUMPFILE");
        }
    };

    let mut after_into = false;
    for token in &tokens {
        match token {
            Token::Whitespace(_) => {}
            Token::Word(word) if word.quote_style.is_none() => {
                let value = word.value.to_ascii_uppercase();
                if after_into && (value == "OUTFILE" || value == "DUMPFILE") {
                    return true;
                }
                after_into = value == "INTO";
            }
            _ => after_into = false,
        }
    }
    false
}

fn classify_by_keyword(sql: &str) -> (StatementKind, String) {
    let keyword = sql
        .trim_start_matches(|c: char| c.is_whitespace() || c == '(')
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();

    let kind = match keyword.as_str() {
        "SELECT" | "SHOW" | "DESCRIBE" | "DESC" | "EXPLAIN" | "WITH" | "VALUES" | "TABLE"
        | "HELP" => StatementKind::ReadOnly,
        "INSERT" | "UPDATE" | "DELETE" | "REPLACE" | "LOAD" | "MERGE" => StatementKind::DmlWrite,
        "CREATE" | "DROP" | "ALTER" | "TRUNCATE" | "RENAME" | "COMMENT" => StatementKind::Ddl,
        "BEGIN" | "START" | "COMMIT" | "ROLLBACK" | "SAVEPOINT" | "RELEASE" => {
            StatementKind::Transaction
        }
        "CALL" | "EXECUTE" | "PREPARE" | "DEALLOCATE" | "DO" | "HANDLER" => {
            StatementKind::ProcedureCall
        }
        "GRANT" | "REVOKE" | "SET" | "USE" | "LOCK" | "UNLOCK" | "KILL" | "FLUSH" | "OPTIMIZE"
        | "ANALYZE" | "REPAIR" | "INSTALL" | "UNINSTALL" | "RESET" | "PURGE" | "SHUTDOWN" => {
            StatementKind::Administrative
        }
        _ => StatementKind::Unknown,
    };

    let operation = if keyword.is_empty() {
        "Unknown".to_string()
    } else {
        keyword
    };
    (kind, operation)
}

fn classify_statement(stmt: &Statement) -> (StatementKind, &'static str) {
    match stmt {
        Statement::Query(_) => (StatementKind::ReadOnly, "SELECT"),
        Statement::ShowTables { .. } => (StatementKind::ReadOnly, "SHOW TABLES"),
        Statement::ShowColumns { .. } => (StatementKind::ReadOnly, "SHOW COLUMNS"),
        Statement::ShowDatabases { .. } => (StatementKind::ReadOnly, "SHOW DATABASES"),
        Statement::ShowCreate { .. } => (StatementKind::ReadOnly, "SHOW CREATE"),
        Statement::ShowVariable { .. } => (StatementKind::ReadOnly, "SHOW VARIABLE"),
        Statement::ShowVariables { .. } => (StatementKind::ReadOnly, "SHOW VARIABLES"),
        Statement::ShowStatus { .. } => (StatementKind::ReadOnly, "SHOW STATUS"),
        Statement::ShowCollation { .. } => (StatementKind::ReadOnly, "SHOW COLLATION"),
        Statement::ExplainTable { .. } => (StatementKind::ReadOnly, "DESCRIBE"),

        // EXPLAIN ANALYZE executes its statement
        Statement::Explain {
            statement, analyze, ..
        } => {
            let (inner_kind, inner_name) = classify_statement(statement);
            if inner_kind == StatementKind::ReadOnly || !*analyze {
                (StatementKind::ReadOnly, "EXPLAIN")
            } else {
                (inner_kind, inner_name)
            }
        }

        Statement::Insert(_) => (StatementKind::DmlWrite, "INSERT"),
        Statement::Update { .. } => (StatementKind::DmlWrite, "UPDATE"),
        Statement::Delete(_) => (StatementKind::DmlWrite, "DELETE"),
        Statement::Merge { .. } => (StatementKind::DmlWrite, "MERGE"),
        Statement::Load { .. } => (StatementKind::DmlWrite, "LOAD"),

        Statement::CreateTable { .. } => (StatementKind::Ddl, "CREATE TABLE"),
        Statement::CreateView { .. } => (StatementKind::Ddl, "CREATE VIEW"),
        Statement::CreateIndex(_) => (StatementKind::Ddl, "CREATE INDEX"),
        Statement::CreateSchema { .. } => (StatementKind::Ddl, "CREATE SCHEMA"),
        Statement::CreateDatabase { .. } => (StatementKind::Ddl, "CREATE DATABASE"),
        Statement::CreateFunction { .. } => (StatementKind::Ddl, "CREATE FUNCTION"),
        Statement::CreateProcedure { .. } => (StatementKind::Ddl, "CREATE PROCEDURE"),
        Statement::CreateTrigger { .. } => (StatementKind::Ddl, "CREATE TRIGGER"),
        Statement::CreateRole { .. } => (StatementKind::Ddl, "CREATE ROLE"),
        Statement::AlterTable { .. } => (StatementKind::Ddl, "ALTER TABLE"),
        Statement::AlterView { .. } => (StatementKind::Ddl, "ALTER VIEW"),
        Statement::AlterIndex { .. } => (StatementKind::Ddl, "ALTER INDEX"),
        Statement::Drop { .. } => (StatementKind::Ddl, "DROP"),
        Statement::DropFunction { .. } => (StatementKind::Ddl, "DROP FUNCTION"),
        Statement::DropProcedure { .. } => (StatementKind::Ddl, "DROP PROCEDURE"),
        Statement::DropTrigger { .. } => (StatementKind::Ddl, "DROP TRIGGER"),
        Statement::Truncate { .. } => (StatementKind::Ddl, "TRUNCATE"),
        Statement::Comment { .. } => (StatementKind::Ddl, "COMMENT"),

        Statement::StartTransaction { .. } => (StatementKind::Transaction, "BEGIN"),
        Statement::Commit { .. } => (StatementKind::Transaction, "COMMIT"),
        Statement::Rollback { .. } => (StatementKind::Transaction, "ROLLBACK"),
        Statement::Savepoint { .. } => (StatementKind::Transaction, "SAVEPOINT"),
        Statement::ReleaseSavepoint { .. } => (StatementKind::Transaction, "RELEASE SAVEPOINT"),

        Statement::Call { .. } => (StatementKind::ProcedureCall, "CALL"),
        Statement::Execute { .. } => (StatementKind::ProcedureCall, "EXECUTE"),
        Statement::Prepare { .. } => (StatementKind::ProcedureCall, "PREPARE"),
        Statement::Deallocate { .. } => (StatementKind::ProcedureCall, "DEALLOCATE"),

        Statement::Grant { .. } => (StatementKind::Administrative, "GRANT"),
        Statement::Revoke { .. } => (StatementKind::Administrative, "REVOKE"),
        Statement::Set(_) => (StatementKind::Administrative, "SET"),
        Statement::Use(_) => (StatementKind::Administrative, "USE"),
        Statement::Kill { .. } => (StatementKind::Administrative, "KILL"),
        Statement::LockTables { .. } => (StatementKind::Administrative, "LOCK"),
        Statement::UnlockTables => (StatementKind::Administrative, "UNLOCK"),
        Statement::Flush { .. } => (StatementKind::Administrative, "FLUSH"),
        Statement::OptimizeTable { .. } => (StatementKind::Administrative, "OPTIMIZE"),
        Statement::Analyze { .. } => (StatementKind::Administrative, "ANALYZE"),

        _ => (StatementKind::Unknown, "Unknown"),
    }
}
