use super::{quote_ident, quote_string};

/// Builds statements for a schema, optionally qualified by its database.
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    name: String,
    db: Option<String>,
    comment: Option<String>,
    transient: bool,
    managed_access: bool,
    data_retention_days: Option<i64>,
}

impl SchemaBuilder {
    /// Start a builder for the schema `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// The unquoted schema name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qualify the schema with its database.
    pub fn with_db(mut self, db: impl Into<String>) -> Self {
        let db = db.into();
        self.db = (!db.is_empty()).then_some(db);
        self
    }

    /// Attach a comment. An empty comment renders no clause.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        let comment = comment.into();
        self.comment = (!comment.is_empty()).then_some(comment);
        self
    }

    /// Create the schema as transient.
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    /// Create the schema with managed access.
    pub fn managed(mut self) -> Self {
        self.managed_access = true;
        self
    }

    /// Set the Time Travel retention period.
    pub fn with_data_retention_days(mut self, days: i64) -> Self {
        self.data_retention_days = Some(days);
        self
    }

    /// The quoted, database-qualified schema name.
    pub fn qualified_name(&self) -> String {
        match &self.db {
            Some(db) => format!("{}.{}", quote_ident(db), quote_ident(&self.name)),
            None => quote_ident(&self.name),
        }
    }

    /// `CREATE [TRANSIENT] SCHEMA ...`
    pub fn create(&self) -> String {
        let mut q = String::from("CREATE");
        if self.transient {
            q.push_str(" TRANSIENT");
        }
        q.push_str(" SCHEMA ");
        q.push_str(&self.qualified_name());
        if self.managed_access {
            q.push_str(" WITH MANAGED ACCESS");
        }
        if let Some(days) = self.data_retention_days {
            q.push_str(&format!(" DATA_RETENTION_TIME_IN_DAYS = {}", days));
        }
        if let Some(comment) = &self.comment {
            q.push_str(&format!(" COMMENT = {}", quote_string(comment)));
        }
        q
    }

    /// `SHOW SCHEMAS LIKE ...`, scoped to the database when one is set.
    pub fn show(&self) -> String {
        let mut q = format!("SHOW SCHEMAS LIKE {}", quote_string(&self.name));
        if let Some(db) = &self.db {
            q.push_str(&format!(" IN DATABASE {}", quote_ident(db)));
        }
        q
    }

    /// `DROP SCHEMA ...`
    pub fn drop(&self) -> String {
        format!("DROP SCHEMA {}", self.qualified_name())
    }

    /// `UNDROP SCHEMA ...`
    pub fn undrop(&self) -> String {
        format!("UNDROP SCHEMA {}", self.qualified_name())
    }

    /// `USE SCHEMA ...`
    pub fn use_schema(&self) -> String {
        format!("USE SCHEMA {}", self.qualified_name())
    }

    /// Rename within the same database.
    pub fn rename(&self, new_name: &str) -> String {
        let target = Self::new(new_name).with_db(self.db.clone().unwrap_or_default());
        format!(
            "ALTER SCHEMA {} RENAME TO {}",
            self.qualified_name(),
            target.qualified_name()
        )
    }

    /// Replace the comment.
    pub fn change_comment(&self, comment: &str) -> String {
        format!(
            "ALTER SCHEMA {} SET COMMENT = {}",
            self.qualified_name(),
            quote_string(comment)
        )
    }

    /// Clear the comment.
    pub fn remove_comment(&self) -> String {
        format!("ALTER SCHEMA {} UNSET COMMENT", self.qualified_name())
    }

    /// Change the Time Travel retention period.
    pub fn change_data_retention_days(&self, days: i64) -> String {
        format!(
            "ALTER SCHEMA {} SET DATA_RETENTION_TIME_IN_DAYS = {}",
            self.qualified_name(),
            days
        )
    }

    /// Fall back to the inherited retention period.
    pub fn remove_data_retention_days(&self) -> String {
        format!(
            "ALTER SCHEMA {} UNSET DATA_RETENTION_TIME_IN_DAYS",
            self.qualified_name()
        )
    }

    /// Turn managed access on.
    pub fn manage(&self) -> String {
        format!("ALTER SCHEMA {} ENABLE MANAGED ACCESS", self.qualified_name())
    }

    /// Turn managed access off.
    pub fn unmanage(&self) -> String {
        format!(
            "ALTER SCHEMA {} DISABLE MANAGED ACCESS",
            self.qualified_name()
        )
    }
}
