//! `docflow` command-line client.
//!
//! # Responsibility
//! - Act as the external collaborator that supplies identity and drives
//!   `docflow_core` use-cases.
//! - Print results as plain, line-oriented text.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use docflow_core::{
    init_from_config, CoreConfig, DocflowService, Document, DocumentContent, DocumentFilter,
    DocumentId, Identity, NewDocument, Role, WorkflowState,
};
use std::path::PathBuf;
use std::time::Duration;

const NOTIFICATION_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "docflow", about = "Document review workflow client")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Acting username
    #[arg(long, global = true)]
    user: Option<String>,

    /// Acting role (Submitter, Reviewer, Approver)
    #[arg(long, global = true)]
    role: Option<Role>,
}

#[derive(Subcommand)]
enum Commands {
    /// List documents
    List {
        /// Case-insensitive match on title, author or tags
        #[arg(long)]
        search: Option<String>,
        /// Only documents in this state
        #[arg(long)]
        state: Option<WorkflowState>,
    },
    /// Show one document
    Show { id: String },
    /// Create a draft document
    Create {
        #[arg(long)]
        title: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Inline text content (a `file:<name>;type:<mime>;data:<base64>` marker is decoded)
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,
        /// Attach a file as content
        #[arg(long)]
        file: Option<PathBuf>,
        /// MIME type for `--file`
        #[arg(long, requires = "file", default_value = "application/octet-stream")]
        mime: String,
    },
    /// Move a document to another workflow state
    Transition { id: String, state: WorkflowState },
    /// Remove a document
    Remove { id: String },
    /// Show the audit trail of a document
    Audits { id: String },
    /// Show notifications for the acting user
    Notifications,
    /// Documents the acting user can act on
    Inbox,
    /// Workflow totals
    Summary,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    }
    .apply_env_overrides();
    config.validate()?;
    if let Err(err) = init_from_config(&config.logging) {
        eprintln!("warning: file logging disabled: {err}");
    }

    let identity = identity_from(&cli)?;
    let service = DocflowService::open(&config).context("failed to open document store")?;
    service.record_login(&identity)?;

    run(&service, &identity, cli.command)?;
    service.flush_notifications(NOTIFICATION_FLUSH_TIMEOUT);
    Ok(())
}

fn identity_from(cli: &Cli) -> Result<Identity> {
    let Some(user) = cli.user.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
        bail!("--user is required");
    };
    let Some(role) = cli.role else {
        bail!("--role is required");
    };
    Ok(Identity::new(user, role))
}

fn run(service: &DocflowService, identity: &Identity, command: Commands) -> Result<()> {
    match command {
        Commands::List { search, state } => {
            let mut filter = DocumentFilter::recent_first();
            filter.search = search;
            filter.state = state;
            print_documents(&service.list_documents(&filter, identity)?);
        }
        Commands::Show { id } => {
            let document = service.get_document(&DocumentId::new(id), identity)?;
            print_document(&document);
            match &document.content {
                DocumentContent::Text(text) => println!("\n{text}"),
                DocumentContent::File { name, mime, bytes } => {
                    println!("\nfile {name} ({mime}, {} bytes)", bytes.len())
                }
            }
        }
        Commands::Create {
            title,
            tags,
            text,
            file,
            mime,
        } => {
            let content = match (file, text) {
                (Some(path), _) => {
                    let bytes = std::fs::read(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    let name = path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .context("--file must name a file")?;
                    DocumentContent::file(name, mime, bytes)
                }
                (None, Some(text)) => DocumentContent::from_input(&text)?,
                (None, None) => DocumentContent::default(),
            };
            let draft = NewDocument::new(title, identity.username.clone(), tags, content);
            let document = service.create_document(&draft, identity)?;
            println!("created {}", document.id);
        }
        Commands::Transition { id, state } => {
            let document = service.transition_document(&DocumentId::new(id), state, identity)?;
            println!("{} is now {}", document.id, document.workflow_state);
        }
        Commands::Remove { id } => {
            let id = DocumentId::new(id);
            service.remove_document(&id, identity)?;
            println!("removed {id}");
        }
        Commands::Audits { id } => {
            for event in service.list_audits(&DocumentId::new(id))? {
                println!(
                    "{}\t{}\t{}\t{}",
                    event.at, event.actor, event.action, event.details
                );
            }
        }
        Commands::Notifications => {
            for item in service.list_notifications(&identity.username)? {
                let marker = if item.read { " " } else { "*" };
                println!("{marker} {}\t{}", item.created_at, item.message);
            }
        }
        Commands::Inbox => print_documents(&service.list_inbox(identity)?),
        Commands::Summary => {
            let summary = service.workflow_summary(identity, docflow_core::model::now_epoch_ms())?;
            println!("total\t{}", summary.total);
            println!("pending\t{}", summary.pending);
            println!("approved today\t{}", summary.approved_today);
            for (state, count) in &summary.by_state {
                println!("{state}\t{count}");
            }
        }
    }
    Ok(())
}

fn print_documents(documents: &[Document]) {
    if documents.is_empty() {
        println!("No documents");
        return;
    }
    for document in documents {
        print_document(document);
    }
}

fn print_document(document: &Document) {
    println!(
        "{}\t{}\t{}\t{}\t[{}]",
        document.id,
        document.workflow_state,
        document.author,
        document.title,
        document.tags.join(", ")
    );
}
