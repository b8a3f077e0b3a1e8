use std::{
    fmt,
    fs,
    path::{Path, PathBuf},
};

use {
    serde::Serialize,
    serde_json::{Map, Value},
    tracing::{debug, trace},
};

use crate::{
    error::{Error, Result},
    ini,
    substitution::{ConfigTree, Substitutor},
};

/// Standard config file names, checked in order.
pub const CONFIG_FILENAMES: &[&str] = &["tox.ini", "setup.cfg", "pyproject.toml", "tox.toml"];

/// Reader table, highest priority first. Within `pyproject.toml` the
/// embedded INI string wins over the native table.
pub const READERS: &[Format] = &[
    Format::ToxIni,
    Format::SetupCfg,
    Format::PyprojectLegacyIni,
    Format::PyprojectToml,
    Format::ToxToml,
];

/// Where a configuration lives and how it is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// `tox.ini`, `[tox]` plus `[testenv:*]` sections.
    ToxIni,
    /// `setup.cfg` with `[tox:tox]` or `[testenv]` sections.
    SetupCfg,
    /// `pyproject.toml` with an INI document in `tool.tox.legacy_tox_ini`.
    PyprojectLegacyIni,
    /// `pyproject.toml` with a native `[tool.tox]` table.
    PyprojectToml,
    /// `tox.toml`, native TOML at the root.
    ToxToml,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ToxIni => "tox.ini",
            Self::SetupCfg => "setup.cfg",
            Self::PyprojectLegacyIni => "pyproject.toml (legacy_tox_ini)",
            Self::PyprojectToml => "pyproject.toml",
            Self::ToxToml => "tox.toml",
        })
    }
}

impl Format {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::ToxIni => "tox.ini",
            Self::SetupCfg => "setup.cfg",
            Self::PyprojectLegacyIni | Self::PyprojectToml => "pyproject.toml",
            Self::ToxToml => "tox.toml",
        }
    }

    /// Key path of the tox table inside a TOML document.
    fn toml_root(self) -> &'static [&'static str] {
        match self {
            Self::PyprojectLegacyIni | Self::PyprojectToml => &["tool", "tox"],
            Self::ToxIni | Self::SetupCfg | Self::ToxToml => &[],
        }
    }

    /// Whether this reader applies to `path`. A missing file or a foreign
    /// file name is `Ok(false)`; an unreadable or malformed candidate is an
    /// error.
    pub fn can_read(self, path: &Path) -> Result<bool> {
        let name_matches = path.file_name().and_then(|n| n.to_str()) == Some(self.file_name());
        if !name_matches || !path.is_file() {
            return Ok(false);
        }

        Ok(match self {
            Self::ToxIni | Self::ToxToml => true,
            Self::SetupCfg => {
                let raw = read_file(path)?;
                raw.contains("[tox:tox]") || raw.contains("[testenv]")
            },
            Self::PyprojectLegacyIni => {
                tox_table(&parse_toml(path)?).is_some_and(|t| t.contains_key("legacy_tox_ini"))
            },
            Self::PyprojectToml => tox_table(&parse_toml(path)?)
                .is_some_and(|t| !t.is_empty() && !t.contains_key("legacy_tox_ini")),
        })
    }

    /// Read `path` into a raw, unsubstituted tree.
    pub fn read(self, path: &Path) -> Result<ConfigTree> {
        match self {
            Self::ToxIni | Self::SetupCfg => ini_tree(&read_file(path)?, path),
            Self::PyprojectLegacyIni => {
                let doc = parse_toml(path)?;
                let embedded = tox_table(&doc)
                    .and_then(|t| t.get("legacy_tox_ini"))
                    .and_then(toml::Value::as_str)
                    .unwrap_or_default();
                ini_tree(embedded, path)
            },
            Self::PyprojectToml | Self::ToxToml => {
                let doc = parse_toml(path)?;
                let root = self
                    .toml_root()
                    .iter()
                    .try_fold(&doc, |current, key| current.get(*key));
                Ok(match root {
                    Some(table @ toml::Value::Table(_)) => toml_to_tree(table.clone()),
                    _ => Value::Object(Map::new()),
                })
            },
        }
    }
}

/// Find the tox configuration in `dir`, following the priority of
/// [`READERS`].
pub fn find_config_file(dir: &Path) -> Result<(PathBuf, Format)> {
    for &format in READERS {
        let path = dir.join(format.file_name());
        if format.can_read(&path)? {
            debug!(path = %path.display(), %format, "found tox configuration");
            return Ok((path, format));
        }
        trace!(path = %path.display(), %format, "reader does not apply");
    }

    Err(Error::NotFound {
        dir: dir.to_path_buf(),
        searched: CONFIG_FILENAMES.to_vec(),
    })
}

/// Discover and read the raw configuration in `dir`.
pub fn read_config(dir: &Path) -> Result<ConfigTree> {
    let (path, format) = find_config_file(dir)?;
    format.read(&path)
}

/// Discover, read and substitute the configuration in `dir`.
pub fn load_resolved(dir: &Path, substitutor: &Substitutor) -> Result<ConfigTree> {
    let raw = read_config(dir)?;
    Ok(substitutor.substitute_config(&raw))
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_toml(path: &Path) -> Result<toml::Value> {
    let raw = read_file(path)?;
    toml::from_str(&raw).map_err(|source| Error::Toml {
        path: path.to_path_buf(),
        source,
    })
}

fn tox_table(doc: &toml::Value) -> Option<&toml::Table> {
    doc.get("tool")?.get("tox")?.as_table()
}

/// Sections become mappings of key to string.
fn ini_tree(content: &str, path: &Path) -> Result<ConfigTree> {
    let sections = ini::parse(content).map_err(|source| Error::Ini {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Value::Object(
        sections
            .into_iter()
            .map(|section| {
                let entries = section
                    .entries
                    .into_iter()
                    .map(|(key, value)| (key, Value::String(value)))
                    .collect();
                (section.name, Value::Object(entries))
            })
            .collect(),
    ))
}

/// Datetimes become their TOML text; non-finite floats become strings.
fn toml_to_tree(value: toml::Value) -> ConfigTree {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map_or_else(|| Value::String(f.to_string()), Value::Number),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_tree).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, toml_to_tree(value)))
                .collect(),
        ),
    }
}
