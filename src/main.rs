mod domain;
mod error;
mod store;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use domain::task::{Task, TaskPatch, parse_due_date};
use store::file::JsonFileStore;
use store::memory::InMemoryStore;
use store::{SortKey, TaskStore};

#[derive(Parser, Debug)]
#[command(author, version, about = "kadai — file-backed to-do list", long_about = None)]
struct Args {
    /// Path to the task file (default: OS data dir)
    #[arg(long)]
    file: Option<PathBuf>,

    /// Use an in-memory store instead of the task file
    #[arg(long, default_value_t = false)]
    memory: bool,

    /// Start the in-memory store with demo tasks
    #[arg(long, default_value_t = false)]
    demo: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a new task
    Add {
        /// Title of the task
        title: String,

        #[arg(long)]
        description: Option<String>,

        /// Priority from 0 (lowest) to 5
        #[arg(long, default_value_t = 0)]
        priority: u8,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due_date: Option<String>,
    },
    /// Update fields of the task at an index; omitted fields stay as they are
    Update {
        index: usize,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        priority: Option<u8>,

        /// New due date (YYYY-MM-DD)
        #[arg(long)]
        due_date: Option<String>,
    },
    /// Delete the task at an index
    Delete { index: usize },
    /// Reorder tasks by priority, due_date or creation_date
    Sort { by: SortKey },
    /// Mark the task at an index as complete
    Complete { index: usize },
    /// View all current tasks
    View,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut store: Box<dyn TaskStore> = if args.demo {
        Box::new(InMemoryStore::with_seed(seed_tasks()?))
    } else if args.memory {
        Box::new(InMemoryStore::default())
    } else {
        let path = match args.file {
            Some(path) => path,
            None => default_store_path()?,
        };
        Box::new(JsonFileStore::open(path)?)
    };
    run_command(store.as_mut(), args.command)
}

fn run_command(store: &mut dyn TaskStore, command: Command) -> Result<()> {
    match command {
        Command::Add {
            title,
            description,
            priority,
            due_date,
        } => {
            let due = due_date.as_deref().map(parse_due_date).transpose()?;
            let task = Task::new(title, description, priority, due)?;
            store.add(task)?;
            println!("Added.");
        }
        Command::Update {
            index,
            title,
            description,
            priority,
            due_date,
        } => {
            let due = due_date.as_deref().map(parse_due_date).transpose()?;
            let patch = TaskPatch {
                title,
                description,
                priority,
                due,
            };
            let task = store.update(index, patch)?;
            println!("Updated {:?}.", task.title);
        }
        Command::Delete { index } => {
            let task = store.delete(index)?;
            println!("Deleted {:?}.", task.title);
        }
        Command::Sort { by } => {
            store.sort(by)?;
            println!("Sorted by {by}.");
        }
        Command::Complete { index } => {
            let task = store.mark_complete(index)?;
            println!("Completed {:?}.", task.title);
        }
        Command::View => {
            let tasks = store.list();
            if tasks.is_empty() {
                println!("No tasks.");
            }
            for (index, task) in tasks.iter().enumerate() {
                println!("[{index}] {task}");
            }
        }
    }
    Ok(())
}

fn seed_tasks() -> Result<Vec<Task>> {
    Ok(vec![
        Task::new("Write documentation", None, 1, None)?,
        Task::new("Pay rent", None, 3, Some(parse_due_date("2024-01-01")?))?,
        Task::new("Draft release notes", None, 0, None)?,
    ])
}

fn default_store_path() -> Result<PathBuf> {
    let base = dirs::data_dir().context("failed to resolve data dir")?;
    Ok(base.join("kadai").join("tasks.json"))
}
