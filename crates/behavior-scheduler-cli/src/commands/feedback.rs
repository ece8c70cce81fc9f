use behavior_scheduler_core::{Feedback, TrainOutcome};
use clap::Subcommand;

use super::{print_json, CmdResult, Session};

#[derive(Subcommand)]
pub enum FeedbackAction {
    /// Report how a task went; retrains the model
    Submit {
        /// Task index (see `task list`)
        index: usize,
        /// 1 if the task was completed, 0 otherwise
        #[arg(long)]
        completed: u8,
        /// Minutes actually spent (default: the estimate)
        #[arg(long, allow_negative_numbers = true)]
        actual_duration: Option<f64>,
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(action: FeedbackAction) -> CmdResult {
    match action {
        FeedbackAction::Submit {
            index,
            completed,
            actual_duration,
            json,
        } => {
            let session = Session::open()?;
            let feedback = Feedback {
                task_index: index,
                actual_duration,
                completed,
            };
            let receipt = session.engine.submit_feedback(feedback).await?;
            session.persist().await?;

            if json {
                print_json(&receipt)?;
            } else {
                println!("Feedback recorded ({} records)", receipt.history_len);
                match receipt.training {
                    TrainOutcome::Trained { examples, final_loss } => {
                        println!("Model retrained on {examples} records, loss {final_loss:.4}")
                    }
                    TrainOutcome::Skipped => println!("Model unchanged: nothing to train on"),
                    TrainOutcome::Discarded => println!("Model unchanged: a newer training won"),
                    TrainOutcome::Refused => {
                        println!("Model unchanged: another training is running")
                    }
                }
            }
        }
    }
    Ok(())
}
