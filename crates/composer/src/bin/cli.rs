//! Composer CLI - template-driven Jira issue composition.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::disallowed_macros)]
#![allow(clippy::uninlined_format_args)]

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use composer::config::ComposerConfig;
use composer::drafts::DraftDomain;
use composer::issues::{push_plan, IssuePlanner, IssueRequest};
use composer::jira::JiraClient;
use composer::store::{CodeKind, CodeRecord, CodeStore, FileCodeStore};
use composer::template::{BatchComposer, TemplateExpander};
use composer::ui;
use composer::ComposerError;

#[derive(Parser)]
#[command(name = "composer")]
#[command(about = "Compose Jira issues from templates with AI placeholders", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root directory
    #[arg(long, global = true)]
    project: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage project and task codes
    #[command(subcommand)]
    Codes(CodesCommands),

    /// Expand the templates of one or more codes
    Expand {
        /// Codes whose templates to expand, in order
        #[arg(required = true)]
        codes: Vec<String>,

        /// Shared context for AI placeholders
        #[arg(long, conflicts_with = "context_file")]
        context: Option<String>,

        /// Read the shared context from a file
        #[arg(long)]
        context_file: Option<PathBuf>,
    },

    /// Draft an epic and user stories from notes
    Draft {
        /// File containing free-form notes
        #[arg(long)]
        notes_file: PathBuf,

        /// Maximum number of stories (0 lets the model decide)
        #[arg(long, default_value_t = 0)]
        max_stories: usize,
    },

    /// Build an issue with subtasks from codes, optionally pushing it to Jira
    Issue {
        /// Project code for the parent issue
        #[arg(long)]
        project_code: String,

        /// Task codes for subtasks (repeatable)
        #[arg(long = "task-code")]
        task_codes: Vec<String>,

        /// Summary of the parent issue
        #[arg(long)]
        summary: String,

        /// Shared context for AI placeholders
        #[arg(long, conflicts_with = "context_file")]
        context: Option<String>,

        /// Read the shared context from a file
        #[arg(long)]
        context_file: Option<PathBuf>,

        /// Create the issues in Jira
        #[arg(long, requires = "jira_project")]
        push: bool,

        /// Jira project key to create issues in
        #[arg(long)]
        jira_project: Option<String>,
    },
}

#[derive(Subcommand)]
enum CodesCommands {
    /// List all codes
    List,

    /// Show a code and its template
    Show {
        /// Code or id
        code: String,
    },

    /// Add a code
    Add {
        /// Short unique key
        #[arg(long)]
        code: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// project or task
        #[arg(long)]
        kind: String,

        /// Jira issue type created from this code
        #[arg(long)]
        issue_type: Option<String>,

        /// Read the template from a file
        #[arg(long)]
        template_file: Option<PathBuf>,
    },

    /// Replace the template of a code
    SetTemplate {
        /// Code or id
        code: String,

        /// Template file
        #[arg(long)]
        file: PathBuf,
    },

    /// Remove a code
    Remove {
        /// Code or id
        code: String,
    },
}

fn get_project_path(cli_path: Option<PathBuf>) -> PathBuf {
    cli_path.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        ui::print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let project_path = get_project_path(cli.project);
    let store = FileCodeStore::new(&project_path);

    match cli.command {
        Commands::Codes(command) => run_codes(&store, command).await?,

        Commands::Expand {
            codes,
            context,
            context_file,
        } => {
            let context = read_context(context, context_file.as_deref()).await?;
            let expander = expander(&project_path).await?;
            let codes: Vec<&str> = codes.iter().map(String::as_str).collect();
            if !context.trim().is_empty() {
                ui::print_info(&format!("Generating with {}", expander.composer().model()));
            }

            let expansion = expander.expand_codes(&store, &context, &codes).await?;
            for document in &expansion.documents {
                println!("{}", format!("── {} ──", document.owner).cyan().bold());
                println!("{}", document.body);
                println!();
            }
            ui::display_warnings(&expansion.warnings);
            if let Some(usage) = expansion.usage {
                ui::display_usage(usage);
            }
        }

        Commands::Draft {
            notes_file,
            max_stories,
        } => {
            let notes = read_file(&notes_file).await?;
            let expander = expander(&project_path).await?;

            let drafts = DraftDomain::new(expander.composer())
                .draft_all(&notes, max_stories)
                .await?;
            ui::display_drafts(&drafts);
        }

        Commands::Issue {
            project_code,
            task_codes,
            summary,
            context,
            context_file,
            push,
            jira_project,
        } => {
            let context = read_context(context, context_file.as_deref()).await?;
            let config = ComposerConfig::load(&project_path).await?;
            let expander = TemplateExpander::new(BatchComposer::new(&config.ai));

            let plan = IssuePlanner::new(&store, &expander)
                .plan(&IssueRequest {
                    project_code,
                    task_codes,
                    summary,
                    context,
                })
                .await?;
            ui::display_plan(&plan);

            if push {
                let Some(project_key) = jira_project else {
                    bail!("--push needs --jira-project");
                };
                let jira = config.jira.as_ref().ok_or(ComposerError::JiraNotConfigured)?;
                let client = JiraClient::from_config(jira)?;

                let pushed = push_plan(&client, &project_key, &plan).await?;
                ui::print_success(&format!("Created {}", pushed.parent_key));
                for key in &pushed.subtask_keys {
                    ui::print_info(&format!("Created subtask {key}"));
                }
            }
        }
    }

    Ok(())
}

async fn run_codes(store: &FileCodeStore, command: CodesCommands) -> Result<()> {
    match command {
        CodesCommands::List => {
            let records = store.list().await?;
            if records.is_empty() {
                ui::print_info("No codes defined. Add one with 'composer codes add'.");
            } else {
                println!("{}", ui::code_table(&records));
            }
        }

        CodesCommands::Show { code } => {
            let record = store.require(&code).await?;
            ui::display_code_details(&record);
        }

        CodesCommands::Add {
            code,
            name,
            kind,
            issue_type,
            template_file,
        } => {
            if store.get(&code).await?.is_some() {
                return Err(ComposerError::CodeAlreadyExists { code }.into());
            }

            let kind: CodeKind = kind.parse()?;
            let mut record = CodeRecord::new(&code, name, kind);
            if let Some(issue_type) = issue_type {
                record = record.with_issue_type(issue_type);
            }
            if let Some(path) = template_file {
                record = record.with_template(read_file(&path).await?);
            }

            store.save(record).await?;
            ui::print_success(&format!("Added {kind} code {code}"));
        }

        CodesCommands::SetTemplate { code, file } => {
            let template = read_file(&file).await?;
            let record = store.require(&code).await?.with_template(template);
            let code = record.code.clone();
            store.save(record).await?;
            ui::print_success(&format!("Updated template of {code}"));
        }

        CodesCommands::Remove { code } => {
            store.remove(&code).await?;
            ui::print_success(&format!("Removed {code}"));
        }
    }

    Ok(())
}

async fn expander(project_path: &Path) -> Result<TemplateExpander> {
    let config = ComposerConfig::load(project_path).await?;
    Ok(TemplateExpander::new(BatchComposer::new(&config.ai)))
}

async fn read_file(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

async fn read_context(inline: Option<String>, file: Option<&Path>) -> Result<String> {
    match (inline, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => read_file(path).await,
        (None, None) => Ok(String::new()),
    }
}
