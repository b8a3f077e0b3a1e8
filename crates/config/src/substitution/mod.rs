//! Placeholder substitution over a raw configuration tree.
//!
//! String values may contain `{...}` placeholders (`{env:NAME:default}`,
//! `{posargs}`, `{posargs[1:]}`, `{tty:on:off}`, `{:}`, `{/}`,
//! `{[section]key}`, `{a.b.c}`, `{key}`) and lists or mappings may contain
//! inline tables such as `{ replace = "posargs", extend = true }`.
//! Placeholders that cannot be resolved are left in place verbatim.

pub mod braces;
pub mod expression;
pub mod inline;
mod resolver;
mod string;
mod value;

use std::{collections::HashMap, io::IsTerminal};

pub use {
    inline::{Resolved, SpecKind, SubstitutionSpec},
    string::{MAX_NESTED_DEFAULTS, MAX_ROUNDS, unescape},
    value::MAX_DEPTH,
};

/// A configuration tree as produced by the readers: strings, numbers,
/// booleans, null, ordered lists and ordered mappings.
pub type ConfigTree = serde_json::Value;

/// Environment variable snapshot used for `{env:...}` lookups.
pub type Environ = HashMap<String, String>;

/// Host facts that placeholders may expand to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    /// Whether standard input is an interactive terminal (`{tty:...}`).
    pub interactive: bool,
    /// Path component separator (`{/}`).
    pub path_sep: String,
    /// Separator between entries of a path list (`{:}`).
    pub path_list_sep: String,
}

impl Host {
    /// Capture the facts of the running process.
    pub fn detect() -> Self {
        Self {
            interactive: std::io::stdin().is_terminal(),
            path_sep: std::path::MAIN_SEPARATOR_STR.to_owned(),
            path_list_sep: if cfg!(windows) { ";" } else { ":" }.to_owned(),
        }
    }
}

/// Resolves placeholders against positional arguments, an environment
/// snapshot and the configuration tree being substituted.
///
/// All inputs are captured when the substitutor is built and never change
/// afterwards, so one instance can be shared across threads.
#[derive(Debug, Clone)]
pub struct Substitutor {
    posargs: Vec<String>,
    environ: Environ,
    host: Host,
}

impl Default for Substitutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Substitutor {
    /// No positional arguments, a snapshot of the process environment and
    /// the detected host.
    pub fn new() -> Self {
        Self {
            posargs: Vec::new(),
            environ: snapshot_environ(),
            host: Host::detect(),
        }
    }

    pub fn with_posargs<I, S>(mut self, posargs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.posargs = posargs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_environ(mut self, environ: Environ) -> Self {
        self.environ = environ;
        self
    }

    pub fn with_host(mut self, host: Host) -> Self {
        self.host = host;
        self
    }

    pub fn posargs(&self) -> &[String] {
        &self.posargs
    }

    pub fn environ(&self) -> &Environ {
        &self.environ
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Substitute a whole configuration, using the unmodified input as the
    /// reference context for every lookup.
    pub fn substitute_config(&self, config: &ConfigTree) -> ConfigTree {
        self.substitute_value(config, config)
    }
}

/// Substitute a whole configuration.
///
/// `posargs` defaults to none and `environ` to a snapshot of the process
/// environment.
pub fn substitute_config(
    config: &ConfigTree,
    posargs: Option<&[String]>,
    environ: Option<Environ>,
) -> ConfigTree {
    let substitutor = Substitutor {
        posargs: posargs.map(<[String]>::to_vec).unwrap_or_default(),
        environ: environ.unwrap_or_else(snapshot_environ),
        host: Host::detect(),
    };
    substitutor.substitute_config(config)
}

/// Walk mappings key by key. Any missing key or non-mapping intermediate
/// yields `None`.
pub fn lookup<'a, 'k>(
    tree: &'a ConfigTree,
    path: impl IntoIterator<Item = &'k str>,
) -> Option<&'a ConfigTree> {
    path.into_iter()
        .try_fold(tree, |current, key| current.as_object()?.get(key))
}

/// Variables whose name or value is not valid unicode are skipped.
fn snapshot_environ() -> Environ {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}
