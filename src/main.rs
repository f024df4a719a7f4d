use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use psybattery_experiment::{TestConfig, TestDesign};
use psybattery_timing::{MonotonicClock, VirtualClock};
use rand::Rng;

mod cli;
mod participant;
mod session;

use cli::{Args, TestArg};
use participant::{ParticipantProfile, SimulatedParticipant};
use session::{Session, SessionRecord};

fn load_config(args: &Args) -> Result<TestConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("cannot parse config {}", path.display()))?
        }
        None => match args.test {
            TestArg::Attention => TestConfig::attention(),
            TestArg::Updating => TestConfig::updating(2),
            TestArg::Interference => TestConfig::interference(),
        },
    };
    apply_overrides(&mut config.design, args)?;
    Ok(config)
}

fn apply_overrides(design: &mut TestDesign, args: &Args) -> Result<()> {
    match design {
        TestDesign::Attention { repetitions, .. } | TestDesign::Interference { repetitions, .. } => {
            if args.lag.is_some() || args.trials.is_some() {
                bail!("--lag and --trials only apply to the updating test");
            }
            if let Some(r) = args.repetitions {
                *repetitions = r;
            }
        }
        TestDesign::Updating { lag, trials, .. } => {
            if args.repetitions.is_some() {
                bail!("--repetitions does not apply to the updating test");
            }
            if let Some(l) = args.lag {
                *lag = l;
            }
            if let Some(t) = args.trials {
                *trials = t;
            }
        }
    }
    Ok(())
}

fn write_record(record: &SessionRecord, args: &Args) -> Result<()> {
    match &args.out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            let mut w = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut w, record)?;
            w.flush()?;
            tracing::info!(path = %path.display(), "session saved");
        }
        None => {
            let stdout = io::stdout();
            let mut w = stdout.lock();
            serde_json::to_writer_pretty(&mut w, record)?;
            writeln!(w)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level())
        .with_writer(io::stderr)
        .init();

    let config = load_config(&args)?;
    let seed = args.seed.unwrap_or_else(|| rand::rng().random());
    let profile = ParticipantProfile {
        mean_rt_ms: args.mean_rt,
        accuracy: args.accuracy,
        lapse_rate: args.lapse_rate,
        ..ParticipantProfile::default()
    };
    let participant = SimulatedParticipant::new(profile, seed.wrapping_add(1))
        .context("invalid participant parameters")?;

    tracing::info!(
        test = config.kind().id(),
        seed,
        realtime = args.realtime,
        planned_trials = config.design.planned_trials(),
        "starting session"
    );

    let record = if args.realtime {
        let clock = MonotonicClock::new();
        let stats = clock.calibrate(Duration::from_millis(1), 50);
        if stats.mean_overshoot_ns > 1_000_000.0 {
            tracing::warn!(
                mean_overshoot_ms = stats.mean_overshoot_ns / 1_000_000.0,
                "sleep overshoot above 1 ms, phase timing will be late"
            );
        }
        Session::new(config, clock, participant, seed)?
            .abort_after(args.abort_after)
            .run()?
    } else {
        Session::new(config, VirtualClock::new(), participant, seed)?
            .abort_after(args.abort_after)
            .run()?
    };

    if let Some(report) = &record.report {
        tracing::info!(
            accuracy = report.accuracy,
            mean_rt_ms = report.mean_rt_ms,
            "session scored"
        );
    }
    write_record(&record, &args)
}
