use std::{fs::File, io::BufReader, path::PathBuf};

use anyhow::{Context, bail};
use fizil::{
    fuzzing::{self, RunOutcome},
    project::FuzzProject,
    status::LogStatusSink,
};
use tracing::info;

use super::GlobalOptions;

/// Fuzz the target described by a project file.
#[derive(Debug, clap::Parser)]
pub(super) struct FuzzCommand {
    /// Path to the project JSON file.
    #[clap(long, short)]
    project: PathBuf,
}

impl FuzzCommand {
    pub(super) fn run(self, global_options: GlobalOptions) -> anyhow::Result<()> {
        let file = File::open(&self.project)
            .with_context(|| format!("Opening project file {}", self.project.display()))?;
        let project: FuzzProject =
            serde_json::from_reader(BufReader::new(file)).context("Parsing project file")?;

        info!(
            target = %project.target.executable.display(),
            workers = global_options.parallel_workers(),
            "Fuzzing"
        );

        match fuzzing::run(&project, Box::new(LogStatusSink::new()))? {
            RunOutcome::ExamplesNotFound => {
                bail!(
                    "no examples found in {}",
                    project.examples_directory.display()
                )
            }
            RunOutcome::Success(summary) => {
                info!(
                    executions = summary.executions,
                    crashes = summary.crashes,
                    nonzero_exits = summary.nonzero_exits,
                    paths = summary.paths,
                    findings = summary.findings,
                    findings_folder = %summary.findings_folder.display(),
                    "Done"
                );
                Ok(())
            }
        }
    }
}
