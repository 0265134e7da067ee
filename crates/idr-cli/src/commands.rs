use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use idr_resolver::{IdentityResolver, Resolution};
use idr_server::{validate_identify, IdentifyRequest, IdentifyResponse, IdentityServer, ServerConfig};
use idr_store::{seed_demo, ContactStore, JournalConfig, JournalContactStore};
use idr_types::ContactRecord;
use serde_json::Value;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Identify(args) => cmd_identify(args, &cli.format),
        Command::Seed(args) => cmd_seed(args),
        Command::Show(args) => cmd_show(args, &cli.format),
        Command::Config(args) => cmd_config(args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("reading config {}", path.display())),
        None => Ok(ServerConfig::default()),
    }
}

fn open_journal(path: &Path) -> anyhow::Result<JournalContactStore> {
    JournalContactStore::open(path, JournalConfig::default())
        .with_context(|| format!("opening contact journal {}", path.display()))
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(data) = args.data {
        config.data_path = Some(data);
    }
    if args.sync {
        config.sync_every_write = true;
    }

    let server = IdentityServer::open(config)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn cmd_identify(args: IdentifyArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let request = IdentifyRequest {
        email: args.email.map(Value::String),
        phone_number: args.phone.map(Value::String),
    };
    let identifier = match validate_identify(&request) {
        Ok(identifier) => identifier,
        Err(errors) => {
            let messages: Vec<String> = errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            bail!("invalid input: {}", messages.join("; "));
        }
    };

    let store = Arc::new(open_journal(&args.data)?);
    let resolver = IdentityResolver::new(Arc::clone(&store));
    let resolution = resolver.resolve_detailed(&identifier)?;
    store.close()?;

    match format {
        OutputFormat::Json => {
            let response = IdentifyResponse {
                contact: resolution.contact,
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => print_resolution(&resolution),
    }
    Ok(())
}

fn print_resolution(resolution: &Resolution) {
    let contact = &resolution.contact;
    println!(
        "{} Primary contact {}",
        "✓".green().bold(),
        contact.primary_contact_id.to_string().yellow()
    );
    println!("  Emails:        {}", contact.emails.join(", "));
    println!("  Phone numbers: {}", contact.phone_numbers.join(", "));
    let secondaries: Vec<String> = contact
        .secondary_contact_ids
        .iter()
        .map(|id| id.to_string())
        .collect();
    println!("  Secondaries:   {}", secondaries.join(", "));
    if let Some(created) = &resolution.created {
        println!(
            "  {} {} contact {}",
            "created".green(),
            created.link_precedence,
            created.id.to_string().cyan()
        );
    }
    if resolution.touched_roots.len() > 1 {
        println!(
            "  {} identifier matched {} separate groups",
            "note:".yellow(),
            resolution.touched_roots.len()
        );
    }
}

fn cmd_seed(args: DataArgs) -> anyhow::Result<()> {
    let store = open_journal(&args.data)?;
    if !store.all()?.is_empty() {
        bail!(
            "contact journal {} is not empty; refusing to seed",
            args.data.display()
        );
    }
    let seeded = seed_demo(&store)?;
    store.close()?;
    println!(
        "{} Seeded {} contacts into {}",
        "✓".green().bold(),
        seeded.len(),
        args.data.display().to_string().bold()
    );
    Ok(())
}

fn cmd_show(args: DataArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let store = open_journal(&args.data)?;
    let records = store.all()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Text => {
            if records.is_empty() {
                println!("No contacts.");
            }
            for record in &records {
                println!("{}", format_record(record));
            }
        }
    }
    Ok(())
}

fn format_record(record: &ContactRecord) -> String {
    let link = match record.linked_id {
        Some(id) => format!("-> {id}"),
        None => String::new(),
    };
    let mut line = format!(
        "{:>5}  {:<9} {:<6} {:<28} {:<14} {}",
        record.id.to_string().yellow(),
        record.link_precedence,
        link,
        record.email.as_deref().unwrap_or("-"),
        record.phone_number.as_deref().unwrap_or("-"),
        record.created_at.format("%Y-%m-%d %H:%M:%S%.3f"),
    );
    if record.is_deleted() {
        line.push_str(&format!(" {}", "(deleted)".red()));
    }
    line
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    print!("{}", config.to_toml()?);
    Ok(())
}
