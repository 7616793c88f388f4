use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use super::generic::{create_entity, delete_entity, entity_exists};
use super::{named_row, Resource, ResourceData};
use crate::error::ProviderError;
use crate::executor::{db_query, Executor};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema, Validator};
use crate::sql::EntityBuilder;

const READER: &str = "READER";

/// Columns returned by `SHOW MANAGED ACCOUNTS`, in order.
const SHOW_COLUMNS: usize = 8;

/// Properties passed to `CREATE MANAGED ACCOUNT`, in statement order.
const PROPERTIES: &[&str] = &["admin_name", "admin_password", "type", "comment"];

fn default_type() -> String {
    READER.to_string()
}

/// Typed attributes of a `snowflake_managed_account`.
///
/// Every field defaults so an imported bag holding only the ID decodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedAccountModel {
    /// Account identifier.
    #[serde(default)]
    pub name: String,
    /// Login name of the account's initial administrator.
    #[serde(default)]
    pub admin_name: String,
    /// Password of the initial administrator. Never read back.
    #[serde(default)]
    pub admin_password: String,
    /// Account type; only `READER` exists today.
    #[serde(rename = "type", default = "default_type")]
    pub account_type: String,
    /// Optional comment.
    #[serde(default)]
    pub comment: Option<String>,
    /// Cloud platform hosting the account.
    #[serde(default)]
    pub cloud: Option<String>,
    /// Region hosting the account.
    #[serde(default)]
    pub region: Option<String>,
    /// Account locator, assigned asynchronously after creation.
    #[serde(default)]
    pub locator: Option<String>,
    /// Creation timestamp.
    #[serde(default)]
    pub created_on: Option<String>,
    /// Login URL.
    #[serde(default)]
    pub url: Option<String>,
}

/// How long to wait for Snowflake to assign a locator to a new account.
///
/// The provider polls with exponential backoff from `initial_delay` up to
/// `max_delay` between attempts and gives up after `deadline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorWait {
    /// Delay before the second poll.
    pub initial_delay: Duration,
    /// Upper bound on the delay between polls.
    pub max_delay: Duration,
    /// Total time allowed for the locator to appear.
    pub deadline: Duration,
}

impl Default for LocatorWait {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            deadline: Duration::from_secs(60),
        }
    }
}

impl LocatorWait {
    /// The delay after `delay`: doubled, capped at `max_delay`.
    fn next_delay(&self, delay: Duration) -> Duration {
        delay.saturating_mul(2).min(self.max_delay)
    }
}

/// Adapter for `snowflake_managed_account`. ID format: the account name.
///
/// Managed accounts cannot be altered, so every attribute forces
/// replacement and [`Resource::update`] keeps its default.
pub struct ManagedAccountResource {
    db: Arc<dyn Executor>,
    wait: LocatorWait,
}

impl ManagedAccountResource {
    /// Bind the adapter to a database handle.
    pub fn new(db: Arc<dyn Executor>) -> Self {
        Self {
            db,
            wait: LocatorWait::default(),
        }
    }

    /// Override the locator polling policy.
    pub fn with_locator_wait(mut self, wait: LocatorWait) -> Self {
        self.wait = wait;
        self
    }

    /// Read until the server reports a locator for the account.
    async fn read_until_located(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let name = data.id().to_string();
        let wait = self.wait;

        let poll = async {
            let mut delay = wait.initial_delay;
            loop {
                match self.read(data).await {
                    Ok(()) if has_locator(data) => return Ok(()),
                    Ok(()) => debug!(account = %name, "locator not assigned yet"),
                    Err(e) if e.is_not_found() => debug!(account = %name, "account not visible yet"),
                    Err(e) => return Err(e),
                }
                tokio::time::sleep(delay).await;
                delay = wait.next_delay(delay);
            }
        };

        match tokio::time::timeout(wait.deadline, poll).await {
            Ok(result) => result,
            Err(_) => {
                warn!(account = %name, deadline = ?wait.deadline, "gave up waiting for locator");
                Err(ProviderError::DeadlineExceeded(format!(
                    "managed account {} was not assigned a locator within {:?}",
                    name, wait.deadline
                )))
            }
        }
    }
}

fn has_locator(data: &ResourceData) -> bool {
    data.get("locator")
        .and_then(|v| v.as_str())
        .is_some_and(|s| !s.is_empty())
}

fn computed(description: &str) -> Attribute {
    Attribute::computed_string().with_description(description)
}

#[async_trait::async_trait]
impl Resource for ManagedAccountResource {
    fn type_name(&self) -> &'static str {
        "snowflake_managed_account"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A reader account managed by the provider account.")
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("Identifier (i.e. name) for the managed account; must be unique for your account.")
                    .with_force_new(),
            )
            .with_attribute(
                "admin_name",
                Attribute::required_string()
                    .with_description("Identifier, as well as login name, for the initial user in the managed account.")
                    .with_force_new(),
            )
            .with_attribute(
                "admin_password",
                Attribute::new(AttributeType::String, AttributeFlags::required().sensitive())
                    .with_validator(Validator::Password)
                    .with_description("Password for the initial user in the managed account.")
                    .with_force_new(),
            )
            .with_attribute(
                "type",
                Attribute::optional_string()
                    .with_default(json!(READER))
                    .with_validator(Validator::string_in_slice([READER], true))
                    .with_description("Specifies the type of managed account.")
                    .with_force_new(),
            )
            .with_attribute(
                "comment",
                Attribute::optional_string()
                    .with_description("Specifies a comment for the managed account.")
                    .with_force_new(),
            )
            .with_attribute("cloud", computed("Cloud in which the managed account is located."))
            .with_attribute("region", computed("Region in which the managed account is located."))
            .with_attribute("locator", computed("Display name of the managed account."))
            .with_attribute("created_on", computed("Date and time when the managed account was created."))
            .with_attribute("url", computed("URL for accessing the managed account, particularly through the web interface."))
    }

    async fn create(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let model: ManagedAccountModel = data.decode()?;
        let builder = EntityBuilder::managed_account(&model.name);
        data.set("type", model.account_type.clone());

        create_entity(
            self.db.as_ref(),
            &builder,
            &model.name,
            PROPERTIES,
            &self.schema(),
            data,
        )
        .await?;

        data.set_id(&model.name);
        info!(account = %model.name, "created managed account");

        // The locator is assigned some time after CREATE returns.
        self.read_until_located(data).await
    }

    async fn read(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let builder = EntityBuilder::managed_account(data.id());
        let rows = db_query(self.db.as_ref(), &builder.show()).await?;
        let row = named_row(rows, builder.name(), || format!("managed account {}", data.id()))?;

        // name, cloud, region, locator, created_on, url, is_reader, comment
        let mut scan = row.scan(SHOW_COLUMNS)?;
        let name = scan.string()?.unwrap_or_default();
        let cloud = scan.string()?;
        let region = scan.string()?;
        let locator = scan.string()?;
        let created_on = scan.string()?;
        let url = scan.string()?;
        let is_reader = scan.boolean()?;
        let comment = scan.string()?.filter(|c| !c.is_empty());

        if !is_reader {
            return Err(ProviderError::InvalidState(format!(
                "unable to determine the account type of {}",
                name
            )));
        }

        let mut model: ManagedAccountModel = data.decode()?;
        model.name = name;
        model.account_type = READER.to_string();
        model.comment = comment;
        model.cloud = cloud;
        model.region = region;
        model.locator = locator;
        model.created_on = created_on;
        model.url = url;

        data.encode(&model)
    }

    async fn delete(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let builder = EntityBuilder::managed_account(data.id());
        delete_entity(self.db.as_ref(), &builder, data).await
    }

    async fn exists(&self, data: &ResourceData) -> Result<bool, ProviderError> {
        entity_exists(self.db.as_ref(), &EntityBuilder::managed_account(data.id())).await
    }
}
