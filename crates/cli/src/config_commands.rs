use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result},
    clap::Args,
    serde_json::json,
    tracing::debug,
    toxconf_config::{ConfigTree, Substitutor, find_config_file, lookup, read_config},
};

/// Options shared by commands that read a configuration.
#[derive(Args)]
pub struct Source {
    /// Directory to search for tox.ini, setup.cfg, pyproject.toml or tox.toml.
    #[arg(long, default_value = ".")]
    pub(crate) dir: PathBuf,
}

/// Positional arguments threaded into `{posargs}`, given after `--`.
#[derive(Args)]
pub struct Posargs {
    #[arg(last = true)]
    pub(crate) posargs: Vec<String>,
}

pub fn find(source: &Source, json_output: bool) -> Result<()> {
    let (path, format) = find_config_file(&source.dir)?;
    if json_output {
        println!("{}", json!({ "path": path.display().to_string(), "format": format }));
    } else {
        println!("{}\t{format}", path.display());
    }
    Ok(())
}

pub fn show(source: &Source, posargs: Posargs, raw: bool, compact: bool) -> Result<()> {
    let config = load(&source.dir, posargs, raw)?;
    let rendered = if compact {
        serde_json::to_string(&config)?
    } else {
        serde_json::to_string_pretty(&config)?
    };
    println!("{rendered}");
    Ok(())
}

pub fn get(source: &Source, posargs: Posargs, key: &str) -> Result<()> {
    let config = load(&source.dir, posargs, false)?;
    let value = lookup(&config, key.split('.'))
        .with_context(|| format!("key `{key}` not found in {}", source.dir.display()))?;
    match value {
        ConfigTree::String(text) => println!("{text}"),
        other => println!("{}", serde_json::to_string_pretty(other)?),
    }
    Ok(())
}

fn load(dir: &Path, posargs: Posargs, raw: bool) -> Result<ConfigTree> {
    let config = read_config(dir)?;
    if raw {
        return Ok(config);
    }
    debug!(posargs = ?posargs.posargs, "substituting configuration");
    let substitutor = Substitutor::new().with_posargs(posargs.posargs);
    Ok(substitutor.substitute_config(&config))
}
