use std::{error::Error, fs, path::Path};

use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
use cliffwalk::{algo::ReinforceAgentConfig, gym::CliffWalk, session::Session};
use log::info;

type Backend = Autodiff<NdArray>;

const ROWS: usize = 4;
const COLS: usize = 12;
const NUM_EPISODES: usize = 2000;
const LOG_INTERVAL: usize = 10;
const EVAL_EPISODES: usize = 100;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let path = Path::new("demos/cliff_walk/out");
    fs::create_dir_all(path)?;
    let mut wtr = csv::Writer::from_path(path.join("data.csv"))?;
    wtr.write_record(["episode", "reward", "steps", "epsilon", "success"])?;

    let mut session = Session::<Backend, CliffWalk>::cliff_walk(
        ROWS,
        COLS,
        ReinforceAgentConfig::default(),
        NdArrayDevice::Cpu,
    );

    for _ in 0..NUM_EPISODES {
        let report = session.run_episode()?;
        wtr.write_record(&[
            report.episode.to_string(),
            report.total_reward.to_string(),
            report.steps.to_string(),
            report.epsilon.to_string(),
            report.success.to_string(),
        ])?;

        if report.episode % LOG_INTERVAL == 0 {
            info!(
                "episode {}: reward {:.2}, steps {}, success rate {:.4}",
                report.episode,
                report.total_reward,
                report.steps,
                session.stats().recent_success_rate()
            );
        }
    }
    wtr.flush()?;

    let evaluation = session.evaluate(EVAL_EPISODES)?;
    let stats = session.dispose();
    info!(
        "trained {} episodes: {}/{} successful, best reward {:.1}, average reward {:.2}, converged: {}",
        stats.episodes,
        stats.successes,
        stats.episodes,
        stats.best_reward,
        stats.average_reward(),
        stats.converged
    );
    info!(
        "greedy evaluation: success rate {:.4}, average reward {:.2}, average steps {:.2}",
        evaluation.success_rate, evaluation.avg_reward, evaluation.avg_steps
    );

    Ok(())
}
