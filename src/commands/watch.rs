use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

use crate::commands::{compiler_for, merge_overrides};
use crate::compiler::Compiler;
use crate::config::Config;
use crate::watcher::InvalidationKind;

const TICK: Duration = Duration::from_millis(200);

/// Recompile `file` every time it changes until ctrl-c
pub fn execute(file: &Path, vars: &[(String, String)], config: &Config) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))
        .context("failed to install ctrl-c handler")?;

    let compiler = compiler_for(config);
    let overrides = merge_overrides(config, vars);
    let invalidations = compiler.subscribe();

    match rebuild(&compiler, file, &overrides) {
        Ok(()) => println!("{}", "   Watching for changes...".green().bold()),
        Err(e) => {
            eprintln!("{} initial build failed: {:#}", "error:".red().bold(), e);
            eprintln!("Watching anyway (will retry on file changes)...");
        }
    }
    compiler
        .watch_file_changes(file)
        .with_context(|| format!("failed to watch {}", file.display()))?;

    while running.load(Ordering::SeqCst) {
        match invalidations.recv_timeout(TICK) {
            Ok(invalidation) => match invalidation.kind {
                InvalidationKind::Modified => {
                    println!("\nChange detected in {}", file.display());
                    report(rebuild(&compiler, file, &overrides));
                }
                InvalidationKind::Removed => {
                    println!(
                        "{} {} was removed, waiting for it to come back",
                        "warning:".yellow().bold(),
                        file.display()
                    );
                }
            },
            Err(RecvTimeoutError::Timeout) => {
                // Editors that save by rename drop the watch; pick the file up again
                if file.exists() && !compiler.is_watching(file) {
                    compiler.watch_file_changes(file)?;
                    println!("\n{} reappeared", file.display());
                    report(rebuild(&compiler, file, &overrides));
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    println!("\n   Exiting watch mode");
    compiler.stop_all_watches();
    Ok(())
}

fn rebuild(
    compiler: &Compiler,
    file: &Path,
    overrides: &std::collections::HashMap<String, String>,
) -> Result<()> {
    let template = if overrides.is_empty() {
        compiler.parse_file(file)?
    } else {
        Arc::new(compiler.parse_file_with(file, overrides)?)
    };
    println!("{}", template.build());
    Ok(())
}

fn report(result: Result<()>) {
    match result {
        Ok(()) => println!("   {}", "Finished".green().bold()),
        Err(e) => eprintln!("{} build failed: {:#}", "error:".red().bold(), e),
    }
}
