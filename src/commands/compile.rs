use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::Path;
use std::time::Instant;

use crate::commands::{compiler_for, merge_overrides};
use crate::config::Config;

/// Compile one template and print (or write) its command string
pub fn execute(
    file: &Path,
    vars: &[(String, String)],
    output: Option<&Path>,
    config: &Config,
) -> Result<()> {
    let start = Instant::now();

    let compiler = compiler_for(config);
    let overrides = merge_overrides(config, vars);
    let template = compiler
        .parse_file_with(file, &overrides)
        .with_context(|| format!("failed to compile {}", file.display()))?;
    let commands = template.build();

    match output {
        Some(path) => {
            fs::write(path, format!("{}\n", commands))
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "   {} {} -> {} in {:.2}s",
                "Compiled".green().bold(),
                file.display(),
                path.display(),
                start.elapsed().as_secs_f64()
            );
        }
        None => println!("{}", commands),
    }

    Ok(())
}
