pub mod check;
pub mod compile;
pub mod watch;

use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;

use crate::compiler::{Compiler, CompilerOptions};
use crate::config::Config;

/// Parse a `--var Name=value` argument
pub fn parse_var(arg: &str) -> Result<(String, String)> {
    let Some((name, value)) = arg.split_once('=') else {
        anyhow::bail!("expected NAME=VALUE, got '{}'", arg);
    };
    let name = name.trim().trim_start_matches('@');
    if name.is_empty() {
        anyhow::bail!("variable name is empty in '{}'", arg);
    }
    Ok((name.to_string(), value.to_string()))
}

/// `[variables]` from the config, with command-line values taking precedence
pub fn merge_overrides(config: &Config, vars: &[(String, String)]) -> HashMap<String, String> {
    let mut overrides: HashMap<String, String> = config
        .variables
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    overrides.extend(vars.iter().cloned());
    overrides
}

pub fn compiler_for(config: &Config) -> Compiler {
    Compiler::with_options(CompilerOptions {
        watch_shutdown_timeout: config.watch.shutdown_timeout(),
    })
}

/// Case-insensitive extension match against the configured list
pub fn has_template_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| {
            extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext))
        })
}
