//! Task management commands for CLI.

use behavior_scheduler_core::TaskDraft;
use chrono::{Local, NaiveDate};
use clap::Subcommand;
use serde::Serialize;

use super::{print_json, task_line, CmdResult, Session};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task
    Add {
        /// Task title (at most 20 characters)
        title: String,
        /// Deadline (YYYY-MM-DD)
        #[arg(long)]
        deadline: Option<NaiveDate>,
        /// Free-form category
        #[arg(long)]
        genre: Option<String>,
        /// How hard it feels, 1-10 (default: 5)
        #[arg(long, allow_negative_numbers = true)]
        subjective: Option<i64>,
        /// How hard it is, 1-10 (default: 5)
        #[arg(long, allow_negative_numbers = true)]
        objective: Option<i64>,
        /// Estimated minutes (default: 30)
        #[arg(long, allow_negative_numbers = true)]
        duration: Option<f64>,
    },
    /// List tasks
    List {
        #[arg(long)]
        json: bool,
    },
    /// Delete a task by index
    Delete {
        index: usize,
    },
    /// Tasks due on a date
    Due {
        /// Date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct IndexedTask<'a> {
    index: usize,
    #[serde(flatten)]
    task: &'a behavior_scheduler_core::Task,
}

pub async fn run(action: TaskAction) -> CmdResult {
    let session = Session::open()?;

    match action {
        TaskAction::Add {
            title,
            deadline,
            genre,
            subjective,
            objective,
            duration,
        } => {
            let draft = TaskDraft {
                title,
                deadline,
                genre,
                subjective_difficulty: subjective,
                objective_difficulty: objective,
                duration_minutes: duration,
            };
            let index = session.engine.add_task(draft).await?;
            session.persist().await?;
            println!("Task added: {index}");
        }
        TaskAction::List { json } => {
            let tasks = session.engine.tasks().await;
            if json {
                let indexed: Vec<_> = tasks
                    .iter()
                    .enumerate()
                    .map(|(index, task)| IndexedTask { index, task })
                    .collect();
                print_json(&indexed)?;
            } else if tasks.is_empty() {
                println!("No tasks");
            } else {
                for (index, task) in tasks.iter().enumerate() {
                    println!("{}", task_line(index, task));
                }
            }
        }
        TaskAction::Delete { index } => {
            let task = session.engine.delete_task(index).await?;
            session.persist().await?;
            println!("Task deleted: {}", task.title());
        }
        TaskAction::Due { date, json } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let due = session.engine.tasks_due_on(date).await;
            if json {
                let indexed: Vec<_> = due
                    .iter()
                    .map(|(index, task)| IndexedTask {
                        index: *index,
                        task,
                    })
                    .collect();
                print_json(&indexed)?;
            } else if due.is_empty() {
                println!("Nothing due on {date}");
            } else {
                for (index, task) in &due {
                    println!("{}", task_line(*index, task));
                }
            }
        }
    }
    Ok(())
}
