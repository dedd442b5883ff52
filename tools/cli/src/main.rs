//! PassVault CLI - Command line interface for the credential vault.
//!
//! This tool is a thin shell over the vault engine: it opens the vault in
//! a data directory, runs one operation, and prints the result.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;
use zeroize::Zeroizing;

use passvault_common::CategoryKey;
use passvault_storage::LocalProvider;
use passvault_vault::{EntryView, LoadPolicy, Vault, VaultConfig, CONFIG_FILENAME};

#[derive(Parser)]
#[command(name = "passvault")]
#[command(about = "PassVault - Local encrypted credential vault")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Vault directory (default: platform data directory).
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    /// Configuration file (default: passvault.json in the vault directory).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Skip entries that cannot be decrypted instead of refusing to open.
    #[arg(long, global = true)]
    skip_corrupt: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an entry.
    Add {
        /// Entry name.
        name: String,

        /// Account identifier.
        #[arg(short, long)]
        account: String,

        /// Category (default: Uncategorized).
        #[arg(short = 'g', long, default_value = "")]
        category: String,

        /// Secret; prompted without echo when omitted.
        #[arg(short, long)]
        secret: Option<String>,
    },

    /// Edit, rename or move an entry.
    Edit {
        /// Current entry name.
        name: String,

        /// New entry name.
        #[arg(short, long)]
        rename: Option<String>,

        /// New account identifier.
        #[arg(short, long)]
        account: Option<String>,

        /// Move to this category.
        #[arg(short = 'g', long)]
        category: Option<String>,

        /// New secret.
        #[arg(short, long, conflicts_with = "prompt_secret")]
        secret: Option<String>,

        /// Prompt for a new secret.
        #[arg(short, long)]
        prompt_secret: bool,
    },

    /// Remove an entry.
    Rm {
        /// Entry name.
        name: String,
    },

    /// Show one entry.
    Show {
        /// Entry name.
        name: String,

        /// Print the secret instead of masking it.
        #[arg(long)]
        reveal: bool,
    },

    /// List entries in a category (default: All).
    Ls {
        /// Category name.
        #[arg(default_value = "")]
        category: String,
    },

    /// List categories with their entry counts.
    Categories,

    /// Manage categories.
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },

    /// Search entry names and accounts, ignoring case.
    Search {
        /// Text to look for.
        text: String,
    },

    /// Export every entry with its category as JSON.
    Export {
        /// Output file.
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// Create an empty category.
    Add {
        /// Category name.
        name: String,
    },

    /// Rename a category.
    Rename {
        /// Current name.
        old: String,

        /// New name.
        new: String,
    },

    /// Delete a category, moving its entries to Uncategorized.
    Rm {
        /// Category name.
        name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut vault = open_vault(&cli)?;

    match cli.command {
        Commands::Add {
            name,
            account,
            category,
            secret,
        } => cmd_add(&mut vault, &name, &account, &category, secret),

        Commands::Edit {
            name,
            rename,
            account,
            category,
            secret,
            prompt_secret,
        } => cmd_edit(
            &mut vault,
            &name,
            EntryEdit {
                rename,
                account,
                category,
                secret,
                prompt_secret,
            },
        ),

        Commands::Rm { name } => {
            vault
                .delete_entry(&name)
                .with_context(|| format!("Failed to remove '{}'", name))?;
            println!("Entry removed: {}", name);
            Ok(())
        }

        Commands::Show { name, reveal } => cmd_show(&vault, &name, reveal),

        Commands::Ls { category } => cmd_list(&vault, &category),

        Commands::Categories => cmd_categories(&vault),

        Commands::Category { command } => cmd_category(&mut vault, command),

        Commands::Search { text } => cmd_search(&vault, &text),

        Commands::Export { file } => cmd_export(&vault, &file),
    }
}

/// Resolve the vault directory and configuration, then open the vault.
fn open_vault(cli: &Cli) -> Result<Vault> {
    let dir = match &cli.dir {
        Some(dir) => dir.clone(),
        None => dirs::data_dir()
            .context("Cannot determine the platform data directory; pass --dir")?
            .join("passvault"),
    };

    let config_path = cli
        .config
        .clone()
        .or_else(|| Some(dir.join(CONFIG_FILENAME)).filter(|p| p.exists()));

    let mut config = match config_path {
        Some(path) => VaultConfig::load(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => VaultConfig::default(),
    };
    if cli.skip_corrupt {
        config.load_policy = LoadPolicy::SkipCorrupt;
    }

    debug!(dir = %dir.display(), "Opening vault");

    let provider = LocalProvider::new(&dir)
        .with_context(|| format!("Failed to prepare vault directory {}", dir.display()))?;
    let vault = Vault::open(config, Arc::new(provider))
        .with_context(|| format!("Failed to open vault at {}", dir.display()))?;

    for failure in vault.load_failures() {
        eprintln!(
            "warning: entry '{}' could not be read ({}); it is kept unchanged",
            failure.name, failure.kind
        );
    }

    Ok(vault)
}

/// Prompt for a secret without echo.
fn prompt_secret(prompt: &str) -> Result<Zeroizing<String>> {
    let secret = rpassword::prompt_password(prompt).context("Failed to read secret")?;
    Ok(Zeroizing::new(secret))
}

fn secret_or_prompt(secret: Option<String>) -> Result<Zeroizing<String>> {
    match secret {
        Some(secret) => Ok(Zeroizing::new(secret)),
        None => prompt_secret("Secret: "),
    }
}

/// Add an entry.
fn cmd_add(
    vault: &mut Vault,
    name: &str,
    account: &str,
    category: &str,
    secret: Option<String>,
) -> Result<()> {
    let secret = secret_or_prompt(secret)?;

    let resolved = vault
        .add_entry(name, account, &secret, category)
        .context("Failed to add entry")?;

    if resolved == name {
        println!("Entry added: {}", resolved);
    } else {
        println!("Entry added as '{}' ('{}' is taken)", resolved, name);
    }
    println!("  Category: {}", vault.reverse_lookup(&resolved));

    Ok(())
}

/// Requested changes for `edit`; omitted fields keep their current value.
struct EntryEdit {
    rename: Option<String>,
    account: Option<String>,
    category: Option<String>,
    secret: Option<String>,
    prompt_secret: bool,
}

/// Edit, rename or move an entry.
fn cmd_edit(vault: &mut Vault, name: &str, edit: EntryEdit) -> Result<()> {
    let current = vault
        .entry(name)
        .with_context(|| format!("Entry '{}' not found", name))?;

    let new_name = edit.rename.unwrap_or_else(|| name.to_string());
    let account = edit.account.unwrap_or_else(|| current.account.clone());
    let category = match edit.category {
        Some(category) => CategoryKey::parse(&category),
        None => vault.reverse_lookup(name),
    };
    let secret = match edit.secret {
        Some(secret) => Zeroizing::new(secret),
        None if edit.prompt_secret => prompt_secret("New secret: ")?,
        None => Zeroizing::new(current.secret.clone()),
    };

    vault
        .rename_or_update_entry(name, &new_name, &account, &secret, category)
        .context("Failed to update entry")?;

    println!("Entry updated: {}", new_name);
    println!("  Category: {}", vault.reverse_lookup(&new_name));

    Ok(())
}

/// Show one entry.
fn cmd_show(vault: &Vault, name: &str, reveal: bool) -> Result<()> {
    let entry = vault
        .entry(name)
        .with_context(|| format!("Entry '{}' not found", name))?;

    println!("{}", entry.name);
    println!("  Account: {}", entry.account);
    println!("  Secret: {}", mask(&entry, reveal));
    println!("  Category: {}", vault.reverse_lookup(name));

    Ok(())
}

fn mask(entry: &EntryView, reveal: bool) -> String {
    if reveal {
        entry.secret.clone()
    } else {
        "********".to_string()
    }
}

/// List entries in a category.
fn cmd_list(vault: &Vault, category: &str) -> Result<()> {
    let key = CategoryKey::parse(category);
    let entries = vault
        .entries_in(key.clone())
        .with_context(|| format!("Failed to list '{}'", key))?;

    if entries.is_empty() {
        println!("{} is empty.", key);
    } else {
        println!("{} ({}):", key, entries.len());
        for entry in &entries {
            println!("  {}  {}", entry.name, entry.account);
        }
    }

    Ok(())
}

/// List categories.
fn cmd_categories(vault: &Vault) -> Result<()> {
    for key in vault.category_names() {
        let count = vault.entries_in(key.clone())?.len();
        println!("  {} ({})", key, count);
    }
    Ok(())
}

/// Category subcommands.
fn cmd_category(vault: &mut Vault, command: CategoryCommands) -> Result<()> {
    match command {
        CategoryCommands::Add { name } => {
            vault
                .add_category(&name)
                .with_context(|| format!("Failed to add category '{}'", name))?;
            println!("Category added: {}", name);
        }
        CategoryCommands::Rename { old, new } => {
            vault
                .rename_category(&old, &new)
                .with_context(|| format!("Failed to rename category '{}'", old))?;
            println!("Category renamed: {} -> {}", old, new);
        }
        CategoryCommands::Rm { name } => {
            let moved = vault
                .delete_category(&name)
                .with_context(|| format!("Failed to remove category '{}'", name))?;
            println!("Category removed: {} ({} entries moved to Uncategorized)", name, moved);
        }
    }
    Ok(())
}

/// Search entries.
fn cmd_search(vault: &Vault, text: &str) -> Result<()> {
    let mut found = 0;
    for entry in vault.query(text).context("Invalid search")? {
        println!("  {}", search_line(vault, &entry));
        found += 1;
    }

    if found == 0 {
        println!("No entries match '{}'.", text);
    }
    Ok(())
}

/// Write `bytes` to `path` through an owner-only temp file in the same
/// directory, then rename it into place.
fn write_owner_only(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

/// One search result as `category  name  account`.
fn search_line(vault: &Vault, entry: &EntryView) -> String {
    format!(
        "{}  {}  {}",
        vault.reverse_lookup(&entry.name),
        entry.name,
        entry.account
    )
}

/// Export all entries as JSON rows.
fn cmd_export(vault: &Vault, file: &Path) -> Result<()> {
    let rows = vault.export_rows();
    let json = Zeroizing::new(serde_json::to_vec_pretty(&rows).context("Failed to encode export")?);

    write_owner_only(file, &json).with_context(|| format!("Failed to write {}", file.display()))?;

    println!("Exported {} rows to {}", rows.len(), file.display());
    Ok(())
}
