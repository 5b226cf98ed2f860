//! CLI for inspecting and editing datamart configuration.
//!
//! Talks to the REST backend through the repository client, so every edit
//! goes through the same version-token checks as the console.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Map, Value};

use datamart_client::DatamartClient;
use datamart_core::config::ClientConfig;
use datamart_core::filter::ListFilter;
use datamart_core::model::{
    catalog, CalcType, Cube, CubeUser, Cubeset, Customer, CustomerUser, CustomerUserAttributes,
    Dimension, Fact, FactColumn, FactColumnCalcType, RdlGroup, RdlGroupFactColumn, Role, User,
};
use datamart_core::schema::WireCase;
use datamart_core::{DatamartError, KeyPart, Record, RecordKey};

/// Command-line arguments for the datamart tool.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the REST backend
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    base_url: String,

    /// Request timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Field-name casing the backend speaks (snake, camel, pascal)
    #[arg(long, default_value = "camel")]
    wire_case: WireCase,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the administered collections
    Collections,
    /// List records of a collection
    List {
        entity: Entity,
        /// Equality filter, FIELD=VALUE (repeatable)
        #[arg(long = "filter", value_parser = parse_pair)]
        filters: Vec<(String, String)>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Show one record
    Get {
        entity: Entity,
        /// One key part, or two for association records
        #[arg(num_args = 1..=2, required = true)]
        key: Vec<String>,
    },
    /// Delete one record
    Delete {
        entity: Entity,
        #[arg(num_args = 1..=2, required = true)]
        key: Vec<String>,
    },
    /// Change fields of one record using the token read just before
    Set {
        entity: Entity,
        #[arg(num_args = 1..=2, required = true)]
        key: Vec<String>,
        /// New value, FIELD=VALUE (repeatable); values parse as JSON when possible
        #[arg(long = "field", value_parser = parse_pair, required = true)]
        fields: Vec<(String, String)>,
    },
    /// List the users associated with a customer
    Members { customer: String },
    /// Associate a user with a customer
    Associate {
        customer: String,
        user: String,
        #[arg(long)]
        role_id: Option<i64>,
    },
    /// Remove a user from a customer
    Dissociate { customer: String, user: String },
    /// List the customer's users not yet associated
    Available { customer: String },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Entity {
    Customer,
    Cube,
    Cubeset,
    Dimension,
    Fact,
    FactColumn,
    CalcType,
    FactColumnCalcType,
    Role,
    User,
    CustomerUser,
    CubeUser,
    RdlGroup,
    RdlGroupFactColumn,
}

/// Calls `$func::<R>(args..)` for the record type of `$entity`.
macro_rules! dispatch {
    ($entity:expr, $func:ident ( $($arg:expr),* )) => {
        match $entity {
            Entity::Customer => $func::<Customer>($($arg),*).await,
            Entity::Cube => $func::<Cube>($($arg),*).await,
            Entity::Cubeset => $func::<Cubeset>($($arg),*).await,
            Entity::Dimension => $func::<Dimension>($($arg),*).await,
            Entity::Fact => $func::<Fact>($($arg),*).await,
            Entity::FactColumn => $func::<FactColumn>($($arg),*).await,
            Entity::CalcType => $func::<CalcType>($($arg),*).await,
            Entity::FactColumnCalcType => $func::<FactColumnCalcType>($($arg),*).await,
            Entity::Role => $func::<Role>($($arg),*).await,
            Entity::User => $func::<User>($($arg),*).await,
            Entity::CustomerUser => $func::<CustomerUser>($($arg),*).await,
            Entity::CubeUser => $func::<CubeUser>($($arg),*).await,
            Entity::RdlGroup => $func::<RdlGroup>($($arg),*).await,
            Entity::RdlGroupFactColumn => $func::<RdlGroupFactColumn>($($arg),*).await,
        }
    };
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let config = ClientConfig {
        base_url: args.base_url,
        request_timeout_ms: args.timeout_ms,
        wire_case: args.wire_case,
        ..ClientConfig::default()
    };
    let client = DatamartClient::connect(config);
    tracing::debug!(base_url = %client.config().base_url, "client configured");

    if let Err(err) = run(&client, args.command).await {
        if let Some(err) = err.downcast_ref::<DatamartError>() {
            explain(err);
        }
        return Err(err);
    }
    Ok(())
}

async fn run(client: &DatamartClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Collections => {
            for info in catalog() {
                let assigned = if info.server_assigned_key {
                    "server-assigned"
                } else {
                    "client-assigned"
                };
                println!(
                    "{:<22} key=({}) {}",
                    info.name,
                    info.key_fields.join(", "),
                    assigned
                );
            }
            Ok(())
        }
        Command::List {
            entity,
            filters,
            page,
            page_size,
        } => {
            let mut filter = filters
                .iter()
                .fold(ListFilter::new(), |f, (field, value)| f.with(field, value));
            if let Some(page) = page {
                filter = filter.page(page);
            }
            if let Some(size) = page_size {
                filter = filter.page_size(size);
            }
            dispatch!(entity, list_records(client, &filter))
        }
        Command::Get { entity, key } => {
            let key = record_key(&key)?;
            dispatch!(entity, get_record(client, &key))
        }
        Command::Delete { entity, key } => {
            let key = record_key(&key)?;
            dispatch!(entity, delete_record(client, &key))
        }
        Command::Set {
            entity,
            key,
            fields,
        } => {
            let key = record_key(&key)?;
            dispatch!(entity, set_fields(client, &key, &fields))
        }
        Command::Members { customer } => {
            let mut members = client.associations::<CustomerUser>();
            for link in members.load_for_parent(&KeyPart::from(customer)).await? {
                print_record(link)?;
            }
            Ok(())
        }
        Command::Associate {
            customer,
            user,
            role_id,
        } => {
            let mut members = client.associations::<CustomerUser>();
            members.load_for_parent(&KeyPart::from(customer)).await?;
            members
                .add(&KeyPart::from(user), CustomerUserAttributes { role_id })
                .await?;
            for link in members.records() {
                print_record(link)?;
            }
            Ok(())
        }
        Command::Dissociate { customer, user } => {
            let mut members = client.associations::<CustomerUser>();
            members.load_for_parent(&KeyPart::from(customer)).await?;
            members.remove(&KeyPart::from(user)).await?;
            println!("{} association(s) remain", members.records().len());
            Ok(())
        }
        Command::Available { customer } => {
            let parent = KeyPart::from(customer);
            let mut members = client.associations::<CustomerUser>();
            members.load_for_parent(&parent).await?;
            let users = client
                .repository::<User>()
                .list(&ListFilter::for_parent("customer_id", &parent))
                .await?;
            for user in members.available_records(&users.records, |u| {
                KeyPart::from(u.user_id.as_str())
            }) {
                println!("{:<12} {}", user.user_id, user.full_name());
            }
            Ok(())
        }
    }
}

async fn list_records<R: Record>(client: &DatamartClient, filter: &ListFilter) -> anyhow::Result<()> {
    let page = client.repository::<R>().list(filter).await?;
    for record in &page.records {
        print_record(record)?;
    }
    if let Some(info) = page.page_info {
        eprintln!(
            "page {} of {} ({} records)",
            info.page.unwrap_or(1),
            info.page_count(),
            info.total_items
        );
    }
    Ok(())
}

async fn get_record<R: Record>(client: &DatamartClient, key: &RecordKey) -> anyhow::Result<()> {
    let record = client.repository::<R>().get_by_id(key).await?;
    print_record(&record)
}

async fn delete_record<R: Record>(client: &DatamartClient, key: &RecordKey) -> anyhow::Result<()> {
    client.repository::<R>().delete_by_id(key).await?;
    println!("deleted {} from {}", key, R::COLLECTION);
    Ok(())
}

async fn set_fields<R: Record>(
    client: &DatamartClient,
    key: &RecordKey,
    fields: &[(String, String)],
) -> anyhow::Result<()> {
    let repository = client.repository::<R>();
    let current = repository.get_by_id(key).await?;

    let mut value = serde_json::to_value(&current)?;
    let Value::Object(map) = &mut value else {
        bail!("{} records are not JSON objects", R::COLLECTION);
    };
    for (field, raw) in fields {
        if R::KEY_FIELDS.contains(&field.as_str()) {
            bail!("'{}' is an identity field and cannot be changed", field);
        }
        let value = field_value::<R>(map, field, raw);
        map.insert(field.clone(), value);
    }
    let draft: R = serde_json::from_value(value)
        .with_context(|| format!("Fields do not fit a {} record", R::COLLECTION))?;

    let saved = match repository.update(key, &draft, current.version()).await? {
        Some(saved) => saved,
        None => repository.get_by_id(key).await?,
    };
    print_record(&saved)
}

/// Value for `field`: parsed JSON when it fits the record, otherwise the raw text.
fn field_value<R: Record>(map: &Map<String, Value>, field: &str, raw: &str) -> Value {
    let text = Value::String(raw.to_string());
    if matches!(map.get(field), Some(Value::String(_))) {
        return text;
    }
    let Ok(parsed) = serde_json::from_str::<Value>(raw) else {
        return text;
    };
    let mut trial = map.clone();
    trial.insert(field.to_string(), parsed.clone());
    if serde_json::from_value::<R>(Value::Object(trial)).is_ok() {
        parsed
    } else {
        text
    }
}

fn print_record<R: Record>(record: &R) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(record)?);
    Ok(())
}

fn record_key(parts: &[String]) -> anyhow::Result<RecordKey> {
    match parts {
        [one] => Ok(RecordKey::Simple(KeyPart::parse(one))),
        [first, second] => Ok(RecordKey::Composite(
            KeyPart::parse(first),
            KeyPart::parse(second),
        )),
        _ => bail!("expected one or two key parts, got {}", parts.len()),
    }
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(field, value)| (field.trim().to_string(), value.to_string()))
        .filter(|(field, _)| !field.is_empty())
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{}'", raw))
}

fn explain(err: &DatamartError) {
    if let Some(errors) = err.field_errors() {
        for (field, messages) in errors {
            for message in messages {
                eprintln!("  {}: {}", field, message);
            }
        }
    }
    if err.requires_reload() {
        eprintln!("hint: the record changed on the server; read it again and reapply the change");
    }
}
