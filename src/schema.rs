//! Declarative table definitions and idempotent schema creation.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::Result;

/// Schema definition for the SQLite database
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    pub tables: Vec<TableDefinition>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(mut self, table: TableDefinition) -> Self {
        self.tables.push(table);
        self
    }

    pub fn table(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Every DDL statement, tables first (in declaration order) and then indexes.
    pub fn create_statements(&self) -> Vec<String> {
        let tables = self.tables.iter().map(TableDefinition::create_sql);
        let indexes = self
            .tables
            .iter()
            .flat_map(|t| t.indexes.iter().map(move |i| i.create_sql(&t.name)));
        tables.chain(indexes).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    pub foreign_keys: Vec<ForeignKey>,
    pub indexes: Vec<IndexDefinition>,
}

impl TableDefinition {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    pub fn foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn create_sql(&self) -> String {
        let mut parts: Vec<String> = self.columns.iter().map(ColumnDefinition::to_sql).collect();
        parts.extend(self.foreign_keys.iter().map(ForeignKey::to_sql));
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.name,
            parts.join(",\n    ")
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    pub constraints: Vec<ColumnConstraint>,
    pub default_value: Option<DefaultValue>,
}

impl ColumnDefinition {
    pub fn new(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            constraints: Vec::new(),
            default_value: None,
        }
    }

    pub fn primary_key(name: &str) -> Self {
        Self::new(name, DataType::Integer).constraint(ColumnConstraint::PrimaryKey)
    }

    pub fn constraint(mut self, constraint: ColumnConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn not_null(self) -> Self {
        self.constraint(ColumnConstraint::NotNull)
    }

    pub fn max_length(self, len: usize) -> Self {
        self.constraint(ColumnConstraint::MaxLength(len))
    }

    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default_value = Some(value);
        self
    }

    fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.data_type.sql_type());
        for constraint in &self.constraints {
            match constraint {
                ColumnConstraint::PrimaryKey => sql.push_str(" PRIMARY KEY"),
                ColumnConstraint::NotNull => sql.push_str(" NOT NULL"),
                ColumnConstraint::MaxLength(len) => {
                    sql.push_str(&format!(" CHECK (length({}) <= {len})", self.name))
                }
            }
        }
        if let Some(default) = &self.default_value {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default.to_sql());
        }
        sql
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    Integer,
    Text,
    /// 0/1 in an INTEGER column.
    Boolean,
    /// Text timestamp as written by rusqlite's chrono support.
    Timestamp,
    /// NUMERIC(12, 2), stored as canonical text. See [`crate::numeric`].
    Numeric,
}

impl DataType {
    fn sql_type(&self) -> &'static str {
        match self {
            DataType::Integer | DataType::Boolean => "INTEGER",
            DataType::Text | DataType::Timestamp | DataType::Numeric => "TEXT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnConstraint {
    PrimaryKey,
    NotNull,
    MaxLength(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Boolean(bool),
}

impl DefaultValue {
    fn to_sql(&self) -> String {
        match self {
            DefaultValue::Boolean(v) => i64::from(*v).to_string(),
        }
    }
}

/// A column referencing another table's key. Deletes and updates of the
/// referenced row are rejected while references exist.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub column: String,
    pub foreign_table: String,
    pub foreign_column: String,
}

impl ForeignKey {
    pub fn references(column: &str, foreign_table: &str, foreign_column: &str) -> Self {
        Self {
            column: column.to_string(),
            foreign_table: foreign_table.to_string(),
            foreign_column: foreign_column.to_string(),
        }
    }

    fn to_sql(&self) -> String {
        format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            self.column, self.foreign_table, self.foreign_column
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexDefinition {
    pub fn new(name: &str, columns: &[&str], unique: bool) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique,
        }
    }

    pub fn create_sql(&self, table: &str) -> String {
        format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
            if self.unique { "UNIQUE " } else { "" },
            self.name,
            table,
            self.columns.join(", ")
        )
    }
}

/// The four bakery tables: users, orders, cookies and line_items.
pub fn bakery_schema() -> Schema {
    let users = TableDefinition::new("users")
        .column(ColumnDefinition::primary_key("id"))
        .column(ColumnDefinition::new("username", DataType::Text).not_null().max_length(15))
        .column(ColumnDefinition::new("email_addr", DataType::Text).not_null().max_length(255))
        .column(ColumnDefinition::new("phone", DataType::Text).not_null().max_length(20))
        .column(ColumnDefinition::new("password_hash", DataType::Text).not_null())
        .column(ColumnDefinition::new("created_at", DataType::Timestamp).not_null())
        .column(ColumnDefinition::new("updated_at", DataType::Timestamp).not_null())
        .index(IndexDefinition::new("uq_users_username", &["username"], true));

    let orders = TableDefinition::new("orders")
        .column(ColumnDefinition::primary_key("id"))
        .column(ColumnDefinition::new("user_id", DataType::Integer))
        .column(
            ColumnDefinition::new("shipped", DataType::Boolean)
                .not_null()
                .default(DefaultValue::Boolean(false)),
        )
        .foreign_key(ForeignKey::references("user_id", "users", "id"));

    let cookies = TableDefinition::new("cookies")
        .column(ColumnDefinition::primary_key("id"))
        .column(ColumnDefinition::new("cookie_name", DataType::Text).not_null().max_length(50))
        .column(ColumnDefinition::new("cookie_recipe_url", DataType::Text).max_length(255))
        .column(ColumnDefinition::new("cookie_sku", DataType::Text).max_length(55))
        .column(ColumnDefinition::new("quantity", DataType::Integer).not_null())
        .column(ColumnDefinition::new("unit_cost", DataType::Numeric).not_null())
        .column(ColumnDefinition::new("created_at", DataType::Timestamp).not_null())
        .column(ColumnDefinition::new("updated_at", DataType::Timestamp).not_null())
        .index(IndexDefinition::new("ix_cookies_cookie_name", &["cookie_name"], false));

    let line_items = TableDefinition::new("line_items")
        .column(ColumnDefinition::primary_key("id"))
        .column(ColumnDefinition::new("order_id", DataType::Integer))
        .column(ColumnDefinition::new("cookie_id", DataType::Integer))
        .column(ColumnDefinition::new("quantity", DataType::Integer).not_null())
        .column(ColumnDefinition::new("extended_cost", DataType::Numeric).not_null())
        .foreign_key(ForeignKey::references("order_id", "orders", "id"))
        .foreign_key(ForeignKey::references("cookie_id", "cookies", "id"))
        .index(IndexDefinition::new("ix_line_items_order_id", &["order_id"], false));

    Schema::new()
        .add_table(users)
        .add_table(orders)
        .add_table(cookies)
        .add_table(line_items)
}

/// Creates every table and index of `schema` that does not exist yet.
///
/// Runs in a single transaction. Existing tables and their rows are left as
/// they are, so calling this on every start-up is safe.
pub fn initialize_schema(conn: &mut Connection, schema: &Schema) -> Result<()> {
    let tx = conn.transaction()?;
    for statement in schema.create_statements() {
        debug!(%statement, "applying ddl");
        tx.execute_batch(&statement)?;
    }
    tx.commit()?;
    info!(tables = schema.tables.len(), "schema ready");
    Ok(())
}
