use super::{
    ConfigTree, Substitutor,
    expression::{Expression, Kind},
    lookup,
    string::DefaultBudget,
};

impl Substitutor {
    /// Resolve one placeholder. `None` leaves the placeholder text untouched.
    /// Defaults are substituted only when used, drawing on `budget`.
    pub(crate) fn resolve(
        &self,
        expr: &Expression,
        config: &ConfigTree,
        budget: &mut DefaultBudget,
    ) -> Option<String> {
        let args = &expr.args;
        match &expr.kind {
            Kind::PathSep => Some(self.host.path_list_sep.clone()),
            Kind::Sep => Some(self.host.path_sep.clone()),
            Kind::Env => {
                let name = args.first()?;
                if let Some(value) = self.environ.get(name) {
                    return Some(value.clone());
                }
                match args.get(1) {
                    Some(default) => self.substitute_default(default, config, budget),
                    None => Some(String::new()),
                }
            },
            Kind::Posargs => {
                if !self.posargs.is_empty() {
                    return Some(self.posargs.join(" "));
                }
                match args.first() {
                    Some(default) => self.substitute_default(default, config, budget),
                    None => Some(String::new()),
                }
            },
            Kind::PosargsIndexed(index) => index_posargs(&self.posargs, index),
            Kind::Tty => {
                let choice = if self.host.interactive {
                    args.first()
                } else {
                    args.get(1)
                };
                Some(choice.cloned().unwrap_or_default())
            },
            Kind::SectionRef { section, key } => {
                section_value(config, section, key).map(str::to_owned)
            },
            Kind::DottedRef { path, key } => lookup(config, path.split('.'))
                .and_then(ConfigTree::as_str)
                .or_else(|| top_level_str(config, key))
                .map(str::to_owned),
            Kind::PlainKeyRef(key) => top_level_str(config, key).map(str::to_owned),
            Kind::Unknown => None,
        }
    }
}

fn top_level_str<'a>(config: &'a ConfigTree, key: &str) -> Option<&'a str> {
    config.get(key)?.as_str()
}

/// INI-style `[section]key` lookup against the normalized tree layout.
fn section_value<'a>(config: &'a ConfigTree, section: &str, key: &str) -> Option<&'a str> {
    if let Some(env_name) = section.strip_prefix("testenv:") {
        return lookup(config, ["env", env_name, key])
            .and_then(ConfigTree::as_str)
            .or_else(|| lookup(config, ["env_run_base", key]).and_then(ConfigTree::as_str));
    }

    let table = match section {
        "tox" | "tox:tox" => config,
        "testenv" => config.get("env_run_base")?,
        "pkgenv" => config.get("env_pkg_base")?,
        _ => return None,
    };
    table.get(key)?.as_str()
}

/// `N` picks one argument, `N:M` joins a slice. Negative positions count
/// from the end. A single position out of range is empty; a slice is
/// clamped. Non-numeric bounds are unresolvable.
fn index_posargs(posargs: &[String], index: &str) -> Option<String> {
    if let Some((start, end)) = index.split_once(':') {
        let len = posargs.len();
        let from = parse_bound(start)?.map_or(0, |at| clamp_position(at, len));
        let to = parse_bound(end)?.map_or(len, |at| clamp_position(at, len));
        if from >= to {
            return Some(String::new());
        }
        return Some(posargs[from..to].join(" "));
    }

    let at: i64 = index.trim().parse().ok()?;
    let position = if at < 0 {
        usize::try_from(at.unsigned_abs())
            .ok()
            .and_then(|back| posargs.len().checked_sub(back))
    } else {
        usize::try_from(at).ok()
    };
    Some(
        position
            .and_then(|position| posargs.get(position))
            .cloned()
            .unwrap_or_default(),
    )
}

/// An empty bound is open.
fn parse_bound(raw: &str) -> Option<Option<i64>> {
    if raw.is_empty() {
        return Some(None);
    }
    raw.trim().parse().ok().map(Some)
}

fn clamp_position(at: i64, len: usize) -> usize {
    let magnitude = usize::try_from(at.unsigned_abs()).unwrap_or(usize::MAX);
    if at < 0 {
        len.saturating_sub(magnitude)
    } else {
        magnitude.min(len)
    }
}
