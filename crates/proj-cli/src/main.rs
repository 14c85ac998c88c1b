use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::json;

use proj_core::facade::Hub;
use proj_core::render;
use proj_core::report::DEFAULT_LOG_DAYS;

#[derive(Parser)]
#[command(
    name = "proj",
    version,
    about = "Project hub in your terminal: links, time tracking, AI sessions"
)]
struct Cli {
    /// State file path (overrides PROJ_STATE_FILE and the config file)
    #[arg(long, global = true, value_name = "PATH")]
    state_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create, delete and list projects
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },
    /// Start the timer on a project
    Start { slug: String },
    /// Stop the running timer
    Stop,
    /// Show the timer state and elapsed time
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Stop the running timer and start one on another project
    Switch { slug: String },
    /// Manage a project's quick links
    Link {
        #[command(subcommand)]
        command: LinkCommand,
    },
    /// Track AI assistant sessions per project
    Ai {
        #[command(subcommand)]
        command: AiCommand,
    },
    /// Project notes
    Note {
        #[command(subcommand)]
        command: NoteCommand,
    },
    /// The current task on a project
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
    /// Time reports
    Time {
        #[command(subcommand)]
        command: TimeCommand,
    },
    /// Close a timer left running longer than the stale threshold
    Reconcile {
        #[arg(long, value_name = "HOURS")]
        stale_after_hours: Option<u64>,
        #[arg(long)]
        json: bool,
    },
    /// Show recent commands from the audit journal
    Log {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Seed a few sample projects
    Demo,
    /// Import a legacy .conf project file
    Import { slug: String, conf: PathBuf },
    /// Print version information
    Version,
}

#[derive(Subcommand)]
enum ProjectCommand {
    Create {
        slug: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        json: bool,
    },
    Delete {
        slug: String,
        #[arg(long)]
        json: bool,
    },
    List {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum LinkCommand {
    Add {
        slug: String,
        label: String,
        url: String,
    },
    Remove { slug: String, index: usize },
    Move {
        slug: String,
        from: usize,
        to: usize,
    },
    List {
        slug: String,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum AiCommand {
    Start {
        slug: String,
        label: Option<String>,
    },
    Stop { slug: String },
    List {
        slug: String,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum NoteCommand {
    Add { slug: String, text: String },
    List { slug: String },
}

#[derive(Subcommand)]
enum TaskCommand {
    Set { slug: String, text: String },
    Clear { slug: String },
}

#[derive(Subcommand)]
enum TimeCommand {
    Log {
        slug: String,
        #[arg(long, default_value_t = DEFAULT_LOG_DAYS)]
        days: i64,
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_json(value: serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let state_file = cli.state_file.clone();
    let hub = move || -> Result<Hub> { Ok(Hub::resolve(state_file.as_deref())?) };
    let now = Utc::now();

    match cli.command {
        Command::Project { command } => match command {
            ProjectCommand::Create {
                slug,
                name,
                color,
                json,
            } => {
                let summary =
                    hub()?.project_create(&slug, name.as_deref(), color.as_deref(), now)?;
                if json {
                    print_json(json!({ "ok": true, "project": summary }))?;
                } else {
                    println!("Created project {} ({})", summary.slug, summary.name);
                }
            }
            ProjectCommand::Delete { slug, json } => {
                let summary = hub()?.project_delete(&slug, now)?;
                if json {
                    print_json(json!({ "ok": true, "deleted": summary }))?;
                } else {
                    println!("Deleted project {} ({})", summary.slug, summary.name);
                }
            }
            ProjectCommand::List { json } => {
                let projects = hub()?.project_list()?;
                if json {
                    print_json(json!({ "ok": true, "projects": projects }))?;
                } else {
                    println!("{}", render::render_project_list(&projects));
                }
            }
        },
        Command::Start { slug } => {
            let receipt = hub()?.timer_start(&slug, now)?;
            println!("{}", render::render_started(&receipt));
        }
        Command::Stop => {
            let stopped = hub()?.timer_stop(now)?;
            println!("{}", render::render_stopped(&stopped));
        }
        Command::Status { json } => {
            let status = hub()?.timer_status(now)?;
            if json {
                print_json(json!({ "ok": true, "status": status }))?;
            } else {
                println!("{}", render::render_status(&status));
            }
        }
        Command::Switch { slug } => {
            let receipt = hub()?.timer_switch(&slug, now)?;
            println!("{}", render::render_switch(&receipt));
        }
        Command::Link { command } => match command {
            LinkCommand::Add { slug, label, url } => {
                let position = hub()?.link_add(&slug, &label, &url, now)?;
                println!("Added link {} to {} at position {}", label, slug, position);
            }
            LinkCommand::Remove { slug, index } => {
                let removed = hub()?.link_remove(&slug, index, now)?;
                println!("Removed link {} from {}", removed.label, slug);
            }
            LinkCommand::Move { slug, from, to } => {
                hub()?.link_move(&slug, from, to, now)?;
                println!("Moved link {} -> {} on {}", from, to, slug);
            }
            LinkCommand::List { slug, json } => {
                let links = hub()?.link_list(&slug)?;
                if json {
                    print_json(json!({ "ok": true, "slug": slug, "links": links }))?;
                } else {
                    println!("{}", render::render_links(&slug, &links));
                }
            }
        },
        Command::Ai { command } => match command {
            AiCommand::Start { slug, label } => {
                let receipt = hub()?.ai_start(&slug, label.as_deref(), now)?;
                println!("{}", render::render_ai_started(&receipt));
            }
            AiCommand::Stop { slug } => {
                let closed = hub()?.ai_stop(&slug, now)?;
                println!("{}", render::render_ai_stopped(&closed));
            }
            AiCommand::List { slug, json } => {
                let sessions = hub()?.ai_list(&slug)?;
                if json {
                    print_json(json!({ "ok": true, "slug": slug, "sessions": sessions }))?;
                } else {
                    println!("{}", render::render_ai_sessions(&slug, &sessions, now));
                }
            }
        },
        Command::Note { command } => match command {
            NoteCommand::Add { slug, text } => {
                hub()?.note_add(&slug, &text, now)?;
                println!("Added note to {}", slug);
            }
            NoteCommand::List { slug } => {
                let notes = hub()?.note_list(&slug)?;
                println!("{}", render::render_notes(&slug, &notes));
            }
        },
        Command::Task { command } => match command {
            TaskCommand::Set { slug, text } => {
                hub()?.task_set(&slug, &text, now)?;
                println!("Set current task on {}", slug);
            }
            TaskCommand::Clear { slug } => {
                match hub()?.task_clear(&slug, now)? {
                    Some(task) => println!("Cleared task on {}: {}", slug, task),
                    None => println!("No task set on {}", slug),
                }
            }
        },
        Command::Time { command } => match command {
            TimeCommand::Log { slug, days, json } => {
                let report = hub()?.time_log(&slug, days, now)?;
                if json {
                    print_json(json!({ "ok": true, "report": report }))?;
                } else {
                    println!("{}", render::render_time_log(&report));
                }
            }
        },
        Command::Reconcile {
            stale_after_hours,
            json,
        } => {
            let closed = hub()?.reconcile(stale_after_hours, now)?;
            if json {
                print_json(json!({ "ok": true, "closed": closed }))?;
            } else {
                match closed {
                    Some(entry) => println!("{}", render::render_stopped(&entry)),
                    None => println!("Nothing to reconcile"),
                }
            }
        }
        Command::Log { limit } => {
            let events = hub()?.recent_events(limit);
            println!("{}", render::render_audit(&events));
        }
        Command::Demo => {
            let result = hub()?.demo(now)?;
            println!("{}", render::render_demo(&result));
        }
        Command::Import { slug, conf } => {
            let result = hub()?.import(&slug, &conf, now)?;
            println!("{}", render::render_import(&result));
        }
        Command::Version => {
            println!("proj {}", proj_core::version());
        }
    }

    Ok(())
}
