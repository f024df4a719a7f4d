use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TestArg {
    /// Multi-cue flanker task
    Attention,
    /// Spatial n-back
    Updating,
    /// Color-word Stroop task
    Interference,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Run a psychometric test against a simulated participant")]
pub struct Args {
    /// Test to run (ignored when --config is given)
    #[arg(value_enum, default_value_t = TestArg::Attention)]
    pub test: TestArg,

    /// Test configuration as JSON
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Counterbalancing repetitions (attention, interference)
    #[arg(long)]
    pub repetitions: Option<usize>,

    /// n-back lag, 1 to 3 (updating)
    #[arg(long)]
    pub lag: Option<usize>,

    /// Sequence length (updating)
    #[arg(long)]
    pub trials: Option<usize>,

    /// Seed for the trial sequence and the participant
    #[arg(long)]
    pub seed: Option<u64>,

    /// Present on the wall clock instead of a virtual one
    #[arg(long, default_value_t = false)]
    pub realtime: bool,

    /// Abort the run once this many trials have finished
    #[arg(long, value_name = "N")]
    pub abort_after: Option<usize>,

    /// Write the session record here instead of stdout
    #[arg(long, short, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Participant mean reaction time in ms
    #[arg(long, default_value_t = 520.0)]
    pub mean_rt: f64,

    /// Participant probability of a correct decision
    #[arg(long, default_value_t = 0.92)]
    pub accuracy: f64,

    /// Participant probability of not responding at all
    #[arg(long, default_value_t = 0.03)]
    pub lapse_rate: f64,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_overrides() {
        let args = Args::try_parse_from([
            "psybattery", "updating", "--lag", "3", "--seed", "9", "--abort-after", "4", "-vv",
        ])
        .unwrap();
        assert_eq!(args.test, TestArg::Updating);
        assert_eq!(args.lag, Some(3));
        assert_eq!(args.seed, Some(9));
        assert_eq!(args.abort_after, Some(4));
        assert!(!args.realtime);
        assert_eq!(args.log_level(), tracing::Level::DEBUG);
    }
}
