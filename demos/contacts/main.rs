//! DynaRec Example - Contacts
//!
//! This example demonstrates core DynaRec functionality:
//! - Declaring a record type with indexes, validations and hooks
//! - Index-backed finders, filters and page emulation
//! - Validation failures and hook aborts reported as save outcomes
//!
//! Everything runs against the in-memory client, seeded on startup.
//!
//! Run with: cargo run -p contacts -- list --city paris --page 2

use clap::{Parser, Subcommand, ValueEnum};
use dynarec_core::{
    Collection, Conditions, FindOptions, HookOutcome, Options, Phase, Record, Schema, SchemaBuilder,
    Uniqueness, Value,
};
use dynarec_storage::InMemoryClient;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const FIRST_NAMES: [&str; 6] = ["Ada", "Grace", "Alan", "Edsger", "Barbara", "Donald"];
const LAST_NAMES: [&str; 5] = ["Lovelace", "Hopper", "Turing", "Dijkstra", "Liskov"];
const CITIES: [&str; 3] = ["paris", "oslo", "lima"];

/// Explore DynaRec finders on a seeded in-memory table.
#[derive(Parser)]
#[command(name = "contacts")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of contacts to seed
    #[arg(global = true, short, long, default_value = "12")]
    seed: usize,

    /// Output format
    #[arg(global = true, short, long, value_enum, default_value = "text")]
    format: Format,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List contacts, optionally by city with page emulation
    List {
        /// Only contacts in this city (served by the city/age index)
        #[arg(short, long)]
        city: Option<String>,

        /// 1-based page number
        #[arg(long)]
        page: Option<u32>,

        /// Page size
        #[arg(long)]
        per_page: Option<u32>,

        /// Oldest first
        #[arg(long)]
        desc: bool,

        /// Comma-separated attributes to fetch
        #[arg(long)]
        select: Option<String>,
    },

    /// Count contacts
    Count {
        /// Only contacts in this city
        #[arg(short, long)]
        city: Option<String>,

        /// Minimum age
        #[arg(long)]
        min_age: Option<i64>,
    },

    /// Look a contact up by e-mail
    Find {
        /// E-mail address
        email: String,
    },

    /// Walk one record through create, update and destroy
    Tour,
}

fn contacts_schema() -> Result<Arc<Schema>, dynarec_core::CoreError> {
    SchemaBuilder::new("contacts")
        .auto_id()
        .string_attr("first_name")
        .string_attr("last_name")
        .string_attr("email")
        .string_attr("city")
        .integer_attr("age")
        .timestamps()
        .index(&["city", "age"])
        .index(&["email", "created_at"])
        .validates_presence_of("first_name", Options::new())
        .validates_uniqueness_of(
            "email",
            Uniqueness::new().range(Conditions::new().with("created_at.ge", 0)),
            Options::new().allow_blank(),
        )
        .callback(Phase::BeforeSave, "normalize_email", Options::new().if_method("email"))
        .callback(Phase::BeforeDestroy, "protect_admins", Options::new())
        .hook("normalize_email", |record| {
            let email = record.get("email").ok().and_then(Value::as_str).map(str::to_lowercase);
            if let Some(email) = email {
                if record.set("email", email).is_err() {
                    return HookOutcome::Abort;
                }
            }
            HookOutcome::Continue
        })
        .hook("protect_admins", |record| {
            let email = record.get("email").ok().and_then(Value::as_str).unwrap_or_default();
            if email.starts_with("admin@") {
                HookOutcome::Abort
            } else {
                HookOutcome::Continue
            }
        })
        .build()
}

fn seed(contacts: &Collection<InMemoryClient>, count: usize) -> Result<(), Box<dyn std::error::Error>> {
    for i in 0..count {
        let first = FIRST_NAMES[i % FIRST_NAMES.len()];
        let last = LAST_NAMES[i % LAST_NAMES.len()];
        let age = 18 + (i as i64 * 7) % 60;
        contacts.create_strict([
            ("first_name", Value::from(first)),
            ("last_name", Value::from(last)),
            ("email", Value::from(format!("{first}.{last}{i}@Example.com"))),
            ("city", Value::from(CITIES[i % CITIES.len()])),
            ("age", Value::Integer(age)),
        ])?;
    }
    info!(count, "seeded contacts");
    Ok(())
}

fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::String(s) => json!(s),
        Value::Integer(n) => json!(n),
        Value::Float(f) => json!(f),
        Value::Boolean(b) => json!(b),
        Value::Date(d) => json!(d.to_string()),
        Value::DateTime(t) => json!(t.to_rfc3339()),
        Value::Binary(b) => json!(b),
        Value::Set(members) => serde_json::Value::Array(members.iter().map(to_json).collect()),
    }
}

fn print_records(records: &[Record], format: Format) -> Result<(), serde_json::Error> {
    match format {
        Format::Json => {
            let rows: Vec<_> = records
                .iter()
                .map(|r| {
                    r.attributes()
                        .filter(|(_, v)| !v.is_null())
                        .map(|(k, v)| (k.to_string(), to_json(v)))
                        .collect::<serde_json::Map<_, _>>()
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Format::Text => {
            for record in records {
                let line: Vec<String> = record
                    .attributes()
                    .filter(|(name, v)| !v.is_null() && !name.ends_with("_at"))
                    .map(|(name, v)| format!("{name}={v}"))
                    .collect();
                println!("{}", line.join("  "));
            }
            println!("({} records)", records.len());
        }
    }
    Ok(())
}

fn by_city(city: Option<String>) -> Conditions {
    match city {
        Some(city) => Conditions::new().with("city", city).with("age.ge", 0),
        None => Conditions::new(),
    }
}

fn tour(contacts: &Collection<InMemoryClient>) -> Result<(), Box<dyn std::error::Error>> {
    let (mut admin, outcome) = contacts.create([
        ("first_name", "Root"),
        ("email", "Admin@Example.com"),
        ("city", "oslo"),
    ])?;
    println!("create admin: {outcome} (email stored as {})", admin.get("email")?);

    let (duplicate, outcome) = contacts.create([("first_name", "Copy"), ("email", "admin@example.com")])?;
    println!("create duplicate: {outcome}");
    for message in duplicate.errors().full_messages() {
        println!("  {message}");
    }

    let (nameless, outcome) = contacts.create([("email", "nobody@example.com")])?;
    println!("create nameless: {outcome} {:?}", nameless.errors().full_messages());

    let outcome = contacts.update_attributes(&mut admin, [("age", 41)])?;
    println!("update admin: {outcome} (age {})", admin.get("age")?);

    println!("destroy admin: {:?}", contacts.destroy(&mut admin)?);
    admin.set("email", "former-admin@example.com")?;
    println!("destroy renamed admin: {:?}", contacts.destroy(&mut admin)?);
    println!("state: {:?}", admin.state());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let contacts = Collection::new(contacts_schema()?, Arc::new(InMemoryClient::new()));
    contacts.create_table()?;
    seed(&contacts, cli.seed)?;

    match cli.command {
        Commands::List {
            city,
            page,
            per_page,
            desc,
            select,
        } => {
            let mut options = FindOptions::new();
            if let Some(page) = page {
                options = options.page(page);
            }
            if let Some(per_page) = per_page {
                options = options.per_page(per_page);
            }
            if desc {
                options = options.order("desc");
            }
            if let Some(select) = select {
                options = options.select(&select);
            }
            let records = contacts.find_all_by(&by_city(city), &options)?;
            print_records(&records, cli.format)?;
        }
        Commands::Count { city, min_age } => {
            let mut conditions = by_city(city);
            if let Some(min_age) = min_age {
                conditions.push("age.ge", min_age);
            }
            let count = contacts.count(&conditions, &FindOptions::new())?;
            match cli.format {
                Format::Json => println!("{}", json!({ "count": count })),
                Format::Text => println!("{count}"),
            }
        }
        Commands::Find { email } => {
            let conditions = Conditions::new()
                .with("email", email.to_lowercase())
                .with("created_at.ge", 0);
            let found = contacts.find_by(&conditions, &FindOptions::new())?;
            print_records(found.as_slice(), cli.format)?;
        }
        Commands::Tour => tour(&contacts)?,
    }

    Ok(())
}
