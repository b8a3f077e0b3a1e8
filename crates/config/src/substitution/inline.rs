//! TOML inline substitution tables:
//!
//! ```toml
//! commands = [["pytest", { replace = "posargs", default = ["tests"], extend = true }]]
//! set_env.HOME = { replace = "env", name = "HOME", default = "/tmp" }
//! deps = [{ replace = "ref", of = ["env_run_base", "deps"] }]
//! ```

use serde_json::{Map, Value};

use super::{ConfigTree, Substitutor, lookup};

/// Tag-specific part of an inline table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpecKind<'a> {
    Posargs,
    Env { name: &'a str },
    /// `of` is the raw key path; anything that is not a non-empty list of
    /// strings never matches.
    Ref { of: Option<&'a Value> },
    /// A `replace` tag this engine does not know. The table is kept as is.
    Other,
}

/// A mapping carrying a `replace` key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubstitutionSpec<'a> {
    pub kind: SpecKind<'a>,
    pub default: Option<&'a Value>,
    pub extend: bool,
    pub table: &'a Map<String, Value>,
}

/// The value an inline table resolved to, and whether a list value should be
/// spliced into the surrounding list.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub value: Value,
    pub extend: bool,
}

impl<'a> SubstitutionSpec<'a> {
    /// `None` when the mapping has no `replace` key.
    pub fn from_table(table: &'a Map<String, Value>) -> Option<Self> {
        let kind = match table.get("replace")?.as_str() {
            Some("posargs") => SpecKind::Posargs,
            Some("env") => SpecKind::Env {
                name: table.get("name").and_then(Value::as_str).unwrap_or_default(),
            },
            Some("ref") => SpecKind::Ref {
                of: table.get("of"),
            },
            _ => SpecKind::Other,
        };
        Some(Self {
            kind,
            default: table.get("default").filter(|default| !default.is_null()),
            extend: table.get("extend").and_then(Value::as_bool).unwrap_or(false),
            table,
        })
    }

    pub fn is_known(&self) -> bool {
        !matches!(self.kind, SpecKind::Other)
    }

    /// Key path of a `ref` table whose `of` is a non-empty list of strings.
    pub fn ref_path(&self) -> Option<Vec<&'a str>> {
        let SpecKind::Ref { of: Some(of) } = self.kind else {
            return None;
        };
        let keys = of.as_array().filter(|keys| !keys.is_empty())?;
        keys.iter().map(Value::as_str).collect()
    }
}

impl Substitutor {
    /// Resolve an inline table. The result is not substituted yet.
    pub fn resolve_inline(&self, spec: &SubstitutionSpec<'_>, config: &ConfigTree) -> Resolved {
        self.resolve_inline_within(spec, config, &[])
    }

    /// Like [`Self::resolve_inline`], but a `ref` to a path in `expanding`
    /// counts as missing, so cycles fall back to the default.
    pub(crate) fn resolve_inline_within(
        &self,
        spec: &SubstitutionSpec<'_>,
        config: &ConfigTree,
        expanding: &[Vec<String>],
    ) -> Resolved {
        match spec.kind {
            SpecKind::Posargs => self.resolve_posargs(spec),
            SpecKind::Env { name } => {
                let value = match (self.environ.get(name), spec.default) {
                    (Some(found), _) => Value::String(found.clone()),
                    (None, Some(default)) => default.clone(),
                    (None, None) => Value::String(String::new()),
                };
                Resolved {
                    value,
                    extend: spec.extend,
                }
            },
            SpecKind::Ref { .. } => {
                let target = spec
                    .ref_path()
                    .filter(|path| !expanding.iter().any(|active| active == path))
                    .and_then(|path| lookup(config, path));
                match target.or(spec.default) {
                    Some(value) => Resolved {
                        extend: spec.extend || value.is_array(),
                        value: value.clone(),
                    },
                    None => Resolved {
                        value: Value::String(String::new()),
                        extend: spec.extend,
                    },
                }
            },
            SpecKind::Other => Resolved {
                value: Value::Object(spec.table.clone()),
                extend: false,
            },
        }
    }

    fn resolve_posargs(&self, spec: &SubstitutionSpec<'_>) -> Resolved {
        if !self.posargs.is_empty() {
            let as_list = spec.extend || spec.default.is_some_and(Value::is_array);
            return if as_list {
                Resolved {
                    value: Value::from(self.posargs.clone()),
                    extend: true,
                }
            } else {
                Resolved {
                    value: Value::String(self.posargs.join(" ")),
                    extend: false,
                }
            };
        }

        match spec.default {
            Some(default) => Resolved {
                value: default.clone(),
                extend: spec.extend,
            },
            None if spec.extend => Resolved {
                value: Value::Array(Vec::new()),
                extend: true,
            },
            None => Resolved {
                value: Value::String(String::new()),
                extend: false,
            },
        }
    }
}
