//! Generator driver
//!
//! Asks the generator for the test count, then for every test runs the
//! directory, answer, input and arguments steps in that order, each only when
//! the generator provides it. The ledger is written last, so its presence
//! means every test went through every step the generator offers. Any failure
//! aborts the run; artifacts of earlier tests stay on disk.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::components::TestGenerator;
use crate::core::{ledger_path, params, Artifact, TestCase};
use crate::plugin::script::ScriptGenerator;

/// What a generation run left on disk
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub tests_count: u32,
    pub artifacts: Vec<PathBuf>,
}

/// Load a generator plugin and run it in `work_dir`
pub fn run(module: &Path, work_dir: &Path) -> Result<GenerationReport> {
    let generator = ScriptGenerator::load(module, work_dir)?;
    generate_tests(&generator, work_dir)
}

/// Print a progress line around a step, matching what hosts capture
fn step<T>(message: String, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let mut out = io::stdout().lock();
    write!(out, "{}", message)?;
    out.flush()?;
    drop(out);

    let result = f();
    println!("{}", if result.is_ok() { " OK" } else { " FAILED" });
    result
}

/// Produce every artifact for the generator's tests, then the ledger
pub fn generate_tests(generator: &dyn TestGenerator, work_dir: &Path) -> Result<GenerationReport> {
    let tests_count = generator
        .tests_count()
        .context("Failed to get tests count")?;
    info!("Generating {} tests in {:?}", tests_count, work_dir);

    let mut report = GenerationReport {
        tests_count,
        artifacts: Vec::new(),
    };

    for test in TestCase::all(tests_count) {
        if let Some(producer) = generator.directory_content_producer() {
            let dir = test.artifact_path(work_dir, Artifact::Directory);
            if !dir.exists() {
                fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create {:?}", dir))?;
            }
            step(
                format!("Generating test {} directory content in {}", test, dir.display()),
                || producer.directory_content(test, &dir),
            )?;
            report.artifacts.push(dir);
        }

        if let Some(producer) = generator.answer_producer() {
            let path = test.artifact_path(work_dir, Artifact::Answer);
            step(
                format!("Generating test {} answer file {}", test, test.artifact_name(Artifact::Answer)),
                || write_artifact(&path, &producer.answer(test)?),
            )?;
            report.artifacts.push(path);
        }

        if let Some(producer) = generator.input_producer() {
            let path = test.artifact_path(work_dir, Artifact::Input);
            step(
                format!("Generating test {} input file {}", test, test.artifact_name(Artifact::Input)),
                || write_artifact(&path, &producer.input(test)?),
            )?;
            report.artifacts.push(path);
        }

        if let Some(producer) = generator.arguments_producer() {
            let path = test.artifact_path(work_dir, Artifact::Params);
            let written = step(
                format!("Generating test {} params file {}", test, test.artifact_name(Artifact::Params)),
                || {
                    let tokens = producer.arguments(test)?;
                    params::encode_file(&path, &tokens)
                        .with_context(|| format!("Failed to write {:?}", path))
                },
            )?;
            if written {
                report.artifacts.push(path);
            }
        }
    }

    let ledger = ledger_path(work_dir);
    fs::write(&ledger, format!("{}\n", tests_count))
        .with_context(|| format!("Failed to write {:?}", ledger))?;
    info!("Generated {} tests, {} artifacts", tests_count, report.artifacts.len());

    Ok(report)
}

fn write_artifact(path: &Path, data: &[u8]) -> Result<()> {
    fs::write(path, data).with_context(|| format!("Failed to write {:?}", path))
}
