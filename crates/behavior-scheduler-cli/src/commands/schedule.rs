use behavior_scheduler_core::{GeneratedSchedule, ScoreSource};
use clap::Subcommand;

use super::{print_json, CmdResult, Session};

const TIMELINE_WIDTH: usize = 48;

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// Score, order and lay out every task
    Generate {
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(action: ScheduleAction) -> CmdResult {
    match action {
        ScheduleAction::Generate { json } => {
            let session = Session::open()?;
            let generated = session.engine.generate_schedule().await?;
            session.persist().await?;
            if json {
                print_json(&generated)?;
            } else {
                print_timeline(&generated);
            }
        }
    }
    Ok(())
}

fn print_timeline(generated: &GeneratedSchedule) {
    let source = match generated.source {
        ScoreSource::Model => "learned model",
        ScoreSource::Fallback => "random fallback (no history yet)",
    };
    println!("Scores from {source}");
    for (rank, seg) in generated.segments.iter().enumerate() {
        let start = (seg.offset * TIMELINE_WIDTH as f64).round() as usize;
        let end = (seg.end() * TIMELINE_WIDTH as f64).round() as usize;
        let bar = format!(
            "{}{}",
            " ".repeat(start.min(TIMELINE_WIDTH)),
            "#".repeat(end.saturating_sub(start).max(1))
        );
        println!(
            "{:>2}. {:<20} {:.3}  |{:<width$}|  {:>5.1}%",
            rank + 1,
            seg.title,
            seg.score,
            bar,
            seg.width * 100.0,
            width = TIMELINE_WIDTH,
        );
    }
}
