use clap::Subcommand;

use super::{print_json, CmdResult, Session};

#[derive(Subcommand)]
pub enum ModelAction {
    /// Train on the stored history and show the result
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Every task ranked by the learned model
    Priorities {
        #[arg(long)]
        json: bool,
    },
}

// The model lives in memory only; each invocation trains from the stored history.
pub async fn run(action: ModelAction) -> CmdResult {
    let session = Session::open()?;
    session.engine.train().await?;

    match action {
        ModelAction::Status { json } => {
            let status = session.engine.model_status().await;
            if json {
                print_json(&status)?;
            } else if let (true, Some(examples), Some(loss)) =
                (status.trained, status.examples, status.final_loss)
            {
                println!("trained on {examples} records, loss {loss:.4}");
            } else {
                println!("untrained (no usable history)");
            }
        }
        ModelAction::Priorities { json } => match session.engine.learned_priorities().await? {
            Some(ranked) if json => print_json(&ranked)?,
            Some(ranked) => {
                for entry in &ranked {
                    println!("[{}] {:<20} {:.3}", entry.index, entry.task.title(), entry.score);
                }
            }
            None if json => println!("null"),
            None => println!("untrained (no usable history)"),
        },
    }
    Ok(())
}
