use anyhow::Result;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

use crate::commands::{compiler_for, has_template_extension, merge_overrides};
use crate::config::Config;

/// Compile every template under `target` (or `target` itself) and report
/// failures without writing output
pub fn execute(target: &Path, config: &Config) -> Result<()> {
    let start = Instant::now();

    let files = find_templates(target, &config.check.extensions)?;
    if files.is_empty() {
        println!(
            "{} no templates ({}) found in {}",
            "warning:".yellow().bold(),
            config.check.extensions.join(", "),
            target.display()
        );
        return Ok(());
    }

    let compiler = compiler_for(config);
    let overrides = merge_overrides(config, &[]);
    let mut errors = Vec::new();
    for file in &files {
        if let Err(e) = compiler.parse_file_with(file, &overrides) {
            errors.push((file.clone(), e.to_string()));
        }
    }

    if !errors.is_empty() {
        eprintln!("{} {} error(s) found:\n", "error:".red().bold(), errors.len());
        for (file, error) in &errors {
            eprintln!("  {} {}", file.display().to_string().yellow(), error);
        }
        anyhow::bail!("Check failed with {} error(s)", errors.len());
    }

    println!(
        "   {} {} file(s) in {:.2}s",
        "Checked".green().bold(),
        files.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Sorted template files under `target`
pub fn find_templates(target: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !target.exists() {
        anyhow::bail!("Path not found: {}", target.display());
    }
    if target.is_file() {
        return Ok(vec![target.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(target).follow_links(true) {
        let entry = entry?;
        if entry.file_type().is_file() && has_template_extension(entry.path(), extensions) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}
