use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No tox configuration file found in {}. Searched for: {}", .dir.display(), .searched.join(", "))]
    NotFound {
        dir: PathBuf,
        searched: Vec<&'static str>,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to parse {} at line {}: {}", .path.display(), .source.line, .source.message)]
    Ini {
        path: PathBuf,
        source: crate::ini::ParseError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
