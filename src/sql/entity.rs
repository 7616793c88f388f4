use std::fmt;

use super::{quote_ident, quote_string};

/// The object kinds managed through the property-based builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// `DATABASE`
    Database,
    /// `ROLE`
    Role,
    /// `MANAGED ACCOUNT`
    ManagedAccount,
}

impl EntityKind {
    /// The keyword used in DDL.
    pub fn as_sql(&self) -> &'static str {
        match self {
            EntityKind::Database => "DATABASE",
            EntityKind::Role => "ROLE",
            EntityKind::ManagedAccount => "MANAGED ACCOUNT",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Builds statements for account-level objects addressed by a single name.
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    kind: EntityKind,
    name: String,
}

impl EntityBuilder {
    /// Start a builder for `name` of the given kind.
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// Builder for a database.
    pub fn database(name: impl Into<String>) -> Self {
        Self::new(EntityKind::Database, name)
    }

    /// Builder for a role.
    pub fn role(name: impl Into<String>) -> Self {
        Self::new(EntityKind::Role, name)
    }

    /// Builder for a managed (reader) account.
    pub fn managed_account(name: impl Into<String>) -> Self {
        Self::new(EntityKind::ManagedAccount, name)
    }

    /// The object kind.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// The unquoted object name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `SHOW <KIND>S LIKE '<name>'`
    pub fn show(&self) -> String {
        format!("SHOW {}S LIKE {}", self.kind, quote_string(&self.name))
    }

    /// `DROP <KIND> "<name>"`
    pub fn drop(&self) -> String {
        format!("DROP {} {}", self.kind, quote_ident(&self.name))
    }

    /// `ALTER <KIND> "<name>" RENAME TO "<new>"`
    pub fn rename(&self, new_name: &str) -> String {
        format!(
            "ALTER {} {} RENAME TO {}",
            self.kind,
            quote_ident(&self.name),
            quote_ident(new_name)
        )
    }

    /// `ALTER <KIND> "<name>" UNSET <PROPERTY>`
    pub fn unset(&self, property: &str) -> String {
        format!(
            "ALTER {} {} UNSET {}",
            self.kind,
            quote_ident(&self.name),
            property.to_uppercase()
        )
    }

    /// Start a `CREATE` statement.
    pub fn create(&self) -> PropertyBuilder {
        PropertyBuilder::new(format!("CREATE {} {}", self.kind, quote_ident(&self.name)))
    }

    /// Start an `ALTER ... SET` statement.
    pub fn alter(&self) -> PropertyBuilder {
        PropertyBuilder::new(format!(
            "ALTER {} {} SET",
            self.kind,
            quote_ident(&self.name)
        ))
    }
}

/// Accumulates `KEY = value` properties after a statement prefix.
#[derive(Debug, Clone)]
pub struct PropertyBuilder {
    prefix: String,
    properties: Vec<(String, String)>,
}

impl PropertyBuilder {
    fn new(prefix: String) -> Self {
        Self {
            prefix,
            properties: Vec::new(),
        }
    }

    fn push(&mut self, key: &str, rendered: String) -> &mut Self {
        self.properties.push((key.to_uppercase(), rendered));
        self
    }

    /// Add a string property.
    pub fn set_string(&mut self, key: &str, value: &str) -> &mut Self {
        self.push(key, quote_string(value))
    }

    /// Add a boolean property.
    pub fn set_bool(&mut self, key: &str, value: bool) -> &mut Self {
        self.push(key, value.to_string())
    }

    /// Add an integer property.
    pub fn set_int(&mut self, key: &str, value: i64) -> &mut Self {
        self.push(key, value.to_string())
    }

    /// Whether any property was added.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Render the statement with properties in the order they were added.
    pub fn statement(&self) -> String {
        let mut q = self.prefix.clone();
        for (key, value) in &self.properties {
            q.push_str(&format!(" {} = {}", key, value));
        }
        q
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_and_drop() {
        let b = EntityBuilder::managed_account("reader1");
        assert_eq!(b.show(), "SHOW MANAGED ACCOUNTS LIKE 'reader1'");
        assert_eq!(b.drop(), r#"DROP MANAGED ACCOUNT "reader1""#);

        let b = EntityBuilder::database("db");
        assert_eq!(b.show(), "SHOW DATABASES LIKE 'db'");
        assert_eq!(b.rename("db2"), r#"ALTER DATABASE "db" RENAME TO "db2""#);
    }

    #[test]
    fn test_create_with_properties() {
        let mut create = EntityBuilder::managed_account("reader1").create();
        create
            .set_string("admin_name", "admin")
            .set_string("type", "READER")
            .set_string("comment", "o'clock");
        assert_eq!(
            create.statement(),
            r#"CREATE MANAGED ACCOUNT "reader1" ADMIN_NAME = 'admin' TYPE = 'READER' COMMENT = 'o\'clock'"#
        );
    }

    #[test]
    fn test_create_without_properties() {
        let create = EntityBuilder::role("analyst").create();
        assert!(create.is_empty());
        assert_eq!(create.statement(), r#"CREATE ROLE "analyst""#);
    }

    #[test]
    fn test_alter_and_unset() {
        let b = EntityBuilder::database("db");
        let mut alter = b.alter();
        alter
            .set_int("data_retention_time_in_days", 3)
            .set_bool("transient", false);
        assert_eq!(
            alter.statement(),
            r#"ALTER DATABASE "db" SET DATA_RETENTION_TIME_IN_DAYS = 3 TRANSIENT = false"#
        );
        assert_eq!(b.unset("comment"), r#"ALTER DATABASE "db" UNSET COMMENT"#);
    }
}
