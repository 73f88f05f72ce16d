//! Allow-listed CRM schema
//!
//! The table/column allow-sets used by the validator's whitelist pass, and
//! the hardcoded fallback schema substituted when live introspection is
//! unavailable. Anything not listed here is denied by default.

/// A column in an allow-listed table.
#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub nullable: bool,
}

/// An allow-listed table with its permitted columns.
#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
    pub primary_key: &'static str,
}

const fn col(name: &'static str, sql_type: &'static str, nullable: bool) -> ColumnDef {
    ColumnDef {
        name,
        sql_type,
        nullable,
    }
}

/// The three CRM tables queries may touch.
pub static ALLOWED_TABLES: &[TableDef] = &[
    TableDef {
        name: "customers",
        primary_key: "id",
        columns: &[
            col("id", "BIGINT", false),
            col("name", "VARCHAR(100)", false),
            col("age", "INTEGER", true),
            col("gender", "VARCHAR(10)", true),
            col("phone", "VARCHAR(20)", true),
            col("email", "VARCHAR(255)", true),
            col("address", "VARCHAR(255)", true),
            col("product", "VARCHAR(100)", true),
            col("monthly_fee", "INTEGER", true),
            col("created_at", "TIMESTAMP", false),
            col("updated_at", "TIMESTAMP", true),
        ],
    },
    TableDef {
        name: "memos",
        primary_key: "id",
        columns: &[
            col("id", "BIGINT", false),
            col("customer_id", "BIGINT", false),
            col("content", "TEXT", false),
            col("refined_content", "TEXT", true),
            col("category", "VARCHAR(50)", true),
            col("created_at", "TIMESTAMP", false),
        ],
    },
    TableDef {
        name: "events",
        primary_key: "id",
        columns: &[
            col("id", "BIGINT", false),
            col("customer_id", "BIGINT", false),
            col("title", "VARCHAR(200)", false),
            col("event_type", "VARCHAR(50)", true),
            col("event_date", "DATE", true),
            col("amount", "INTEGER", true),
            col("created_at", "TIMESTAMP", false),
        ],
    },
];

/// Default table for rule-based generation.
pub const DEFAULT_TABLE: &str = "customers";

/// Look up an allow-listed table by name (case-insensitive).
pub fn find_table(name: &str) -> Option<&'static TableDef> {
    ALLOWED_TABLES
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(name))
}

/// Check whether a table name is allow-listed.
pub fn is_allowed_table(name: &str) -> bool {
    find_table(name).is_some()
}

/// Check whether a column is permitted on a given table.
pub fn is_allowed_column(table: &str, column: &str) -> bool {
    find_table(table)
        .map(|t| t.columns.iter().any(|c| c.name.eq_ignore_ascii_case(column)))
        .unwrap_or(false)
}

/// Render the fallback schema as a prompt-ready description.
///
/// Used when live schema introspection fails so LLM generation can still
/// proceed against a known-good snapshot.
pub fn fallback_schema_description() -> String {
    let mut out = String::new();
    for table in ALLOWED_TABLES {
        out.push_str(&format!("### {} (PK: {})\n", table.name, table.primary_key));
        for c in table.columns {
            let null = if c.nullable { "NULL" } else { "NOT NULL" };
            out.push_str(&format!("- {} {} {}\n", c.name, c.sql_type, null));
        }
        out.push('\n');
    }
    out.push_str("Relations: memos.customer_id -> customers.id, events.customer_id -> customers.id\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_table_case_insensitive() {
        assert!(find_table("CUSTOMERS").is_some());
        assert!(find_table("memos").is_some());
        assert!(find_table("admin_users").is_none());
    }

    #[test]
    fn test_is_allowed_column() {
        assert!(is_allowed_column("customers", "name"));
        assert!(is_allowed_column("customers", "CREATED_AT"));
        assert!(!is_allowed_column("customers", "password"));
        assert!(!is_allowed_column("unknown", "name"));
    }

    #[test]
    fn test_fallback_description_mentions_all_tables() {
        let desc = fallback_schema_description();
        for table in ALLOWED_TABLES {
            assert!(desc.contains(table.name));
        }
    }
}
