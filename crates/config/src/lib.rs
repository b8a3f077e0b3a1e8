//! Tox configuration: discovery, raw readers and placeholder substitution.
//!
//! ```no_run
//! use std::path::Path;
//!
//! use toxconf_config::{Substitutor, load_resolved};
//!
//! let substitutor = Substitutor::new().with_posargs(["-x", "tests/"]);
//! let config = load_resolved(Path::new("."), &substitutor)?;
//! println!("{}", config["env_run_base"]["commands"]);
//! # Ok::<(), toxconf_config::Error>(())
//! ```

pub mod error;
pub mod ini;
pub mod loader;
pub mod substitution;

pub use {
    error::{Error, Result},
    loader::{CONFIG_FILENAMES, Format, READERS, find_config_file, load_resolved, read_config},
    substitution::{ConfigTree, Environ, Host, Substitutor, lookup, substitute_config},
};
