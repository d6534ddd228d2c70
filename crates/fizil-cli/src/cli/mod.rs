mod fuzz;

use std::cmp::max;

use anyhow::Context;
use fuzz::FuzzCommand;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, clap::Parser)]
#[command(version, about, styles = clap::builder::Styles::styled())]
pub struct Cli {
    #[clap(flatten)]
    global_options: GlobalOptions,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub(super) fn run(self) -> anyhow::Result<()> {
        self.global_options
            .setup_rayon()
            .context("Setting up rayon")?;
        setup_logger(&self.global_options).context("Setting up logger")?;
        match self.command {
            Command::Fuzz(cmd) => cmd.run(self.global_options),
        }
    }
}

#[derive(Debug, clap::Parser)]
struct GlobalOptions {
    #[clap(long, default_value = "info")]
    default_log_level: LevelFilter,

    /// Worker threads for out-of-process fuzzing.
    #[clap(long)]
    parallel_workers: Option<usize>,
}

impl GlobalOptions {
    pub fn setup_rayon(&self) -> Result<(), rayon::ThreadPoolBuildError> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallel_workers())
            .build_global()
    }

    pub fn parallel_workers(&self) -> usize {
        self.parallel_workers
            .unwrap_or_else(|| max(1, num_cpus::get() / 2))
    }
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    Fuzz(FuzzCommand),
}

fn setup_logger(global_opts: &GlobalOptions) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_timer(fmt::time::ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_owned())))
        .with(
            EnvFilter::builder()
                .with_default_directive(global_opts.default_log_level.into())
                .from_env()
                .context("Constructing log filter from env")?,
        )
        .init();

    Ok(())
}
