use {
    serde_json::{Map, Value},
    tracing::{trace, warn},
};

use super::{ConfigTree, Substitutor, inline::SubstitutionSpec};

/// Nesting limit for the recursive walk.
pub const MAX_DEPTH: usize = 128;

/// State carried down one walk: nesting depth and the `ref` paths whose
/// values are being substituted right now.
#[derive(Debug, Default)]
struct Walk {
    depth: usize,
    expanding: Vec<Vec<String>>,
}

impl Walk {
    fn enter(&mut self, spec: &SubstitutionSpec<'_>) {
        if let Some(path) = spec.ref_path() {
            trace!(path = ?path, "expanding reference");
            self.expanding.push(path.into_iter().map(str::to_owned).collect());
        }
    }

    fn leave(&mut self, spec: &SubstitutionSpec<'_>) {
        if spec.ref_path().is_some() {
            self.expanding.pop();
        }
    }
}

impl Substitutor {
    /// Substitute every string in `value` and reduce inline tables to plain
    /// values. References are looked up in `config`.
    ///
    /// A `ref` table pointing into a path that is already being expanded
    /// resolves as if the path were missing, so reference cycles end in
    /// the table's default.
    pub fn substitute_value(&self, value: &ConfigTree, config: &ConfigTree) -> ConfigTree {
        self.walk(value, config, &mut Walk::default())
    }

    fn walk(&self, value: &Value, config: &ConfigTree, state: &mut Walk) -> Value {
        if state.depth > MAX_DEPTH {
            warn!(max_depth = MAX_DEPTH, "substitution nesting too deep, value left as is");
            return value.clone();
        }

        state.depth += 1;
        let out = match value {
            Value::String(text) => Value::String(self.substitute_string(text, config)),
            Value::Array(items) => Value::Array(self.walk_list(items, config, state)),
            Value::Object(table) => match SubstitutionSpec::from_table(table) {
                Some(spec) if spec.is_known() => {
                    let resolved = self.resolve_inline_within(&spec, config, &state.expanding);
                    self.walk_resolved(&spec, &resolved.value, config, state)
                },
                _ => Value::Object(self.walk_table(table, config, state)),
            },
            other => other.clone(),
        };
        state.depth -= 1;
        out
    }

    fn walk_list(&self, items: &[Value], config: &ConfigTree, state: &mut Walk) -> Vec<Value> {
        let mut out = Vec::with_capacity(items.len());

        for item in items {
            let Some(spec) = item
                .as_object()
                .and_then(SubstitutionSpec::from_table)
                .filter(SubstitutionSpec::is_known)
            else {
                out.push(self.walk(item, config, state));
                continue;
            };
            let resolved = self.resolve_inline_within(&spec, config, &state.expanding);
            match resolved.value {
                Value::Array(spliced) if resolved.extend => {
                    state.enter(&spec);
                    for value in &spliced {
                        out.push(self.walk(value, config, state));
                    }
                    state.leave(&spec);
                },
                value => out.push(self.walk_resolved(&spec, &value, config, state)),
            }
        }

        out
    }

    fn walk_table(
        &self,
        table: &Map<String, Value>,
        config: &ConfigTree,
        state: &mut Walk,
    ) -> Map<String, Value> {
        table
            .iter()
            .map(|(key, value)| (key.clone(), self.walk(value, config, state)))
            .collect()
    }

    /// Substitute what an inline table resolved to, with its `ref` path
    /// marked as expanding.
    fn walk_resolved(
        &self,
        spec: &SubstitutionSpec<'_>,
        value: &Value,
        config: &ConfigTree,
        state: &mut Walk,
    ) -> Value {
        state.enter(spec);
        let out = self.walk(value, config, state);
        state.leave(spec);
        out
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::substitution::{Environ, Host},
        serde_json::json,
    };

    fn substitutor(posargs: &[&str]) -> Substitutor {
        Substitutor::new()
            .with_posargs(posargs.iter().copied())
            .with_environ(Environ::from([("MY_VAR".to_owned(), "my_value".to_owned())]))
            .with_host(Host {
                interactive: false,
                path_sep: "/".into(),
                path_list_sep: ":".into(),
            })
    }

    fn config_with(posargs: &[&str], config: Value) -> Value {
        substitutor(posargs).substitute_config(&config)
    }

    #[test]
    fn scalars_pass_through() {
        let s = substitutor(&[]);
        let config = json!({});
        for value in [json!(42), json!(3.5), json!(true), Value::Null] {
            assert_eq!(s.substitute_value(&value, &config), value);
        }
    }

    #[test]
    fn strings_in_lists_and_tables() {
        let s = substitutor(&["-v"]);
        let config = json!({});
        assert_eq!(
            s.substitute_value(&json!(["src{/}main", "tests{/}unit"]), &config),
            json!(["src/main", "tests/unit"])
        );
        assert_eq!(
            s.substitute_value(&json!([["pytest", "{posargs}"]]), &config),
            json!([["pytest", "-v"]])
        );
        assert_eq!(
            s.substitute_value(&json!({ "key": "{env:MY_VAR}" }), &config),
            json!({ "key": "my_value" })
        );
    }

    #[test]
    fn key_order_is_preserved() {
        let result = config_with(&[], json!({ "z": "1", "a": "2", "m": "3" }));
        let keys: Vec<&str> = result.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn inline_extend_splices_posargs() {
        let config = json!({ "deps": ["pytest", { "replace": "posargs", "extend": true }] });
        assert_eq!(config_with(&["-v"], config.clone())["deps"], json!(["pytest", "-v"]));
        assert_eq!(config_with(&[], config)["deps"], json!(["pytest"]));
    }

    #[test]
    fn inline_posargs_forms() {
        let basic = json!({ "commands": [["python", { "replace": "posargs" }]] });
        assert_eq!(
            config_with(&["script.py", "--verbose"], basic)["commands"],
            json!([["python", "script.py --verbose"]])
        );

        let default = json!({
            "commands": [["python", { "replace": "posargs", "default": "default.py" }]]
        });
        assert_eq!(config_with(&[], default)["commands"], json!([["python", "default.py"]]));

        let default_list = json!({
            "commands": [["python", { "replace": "posargs", "default": ["a", "b"] }]]
        });
        assert_eq!(
            config_with(&[], default_list)["commands"],
            json!([["python", ["a", "b"]]])
        );

        let extend_default = json!({
            "commands": [["python", { "replace": "posargs", "default": ["a", "b"], "extend": true }]]
        });
        assert_eq!(
            config_with(&[], extend_default)["commands"],
            json!([["python", "a", "b"]])
        );
    }

    #[test]
    fn multiple_inline_tables() {
        let config = json!({
            "commands": [
                ["cmd1", { "replace": "posargs", "extend": true }],
                ["cmd2", { "replace": "posargs", "extend": true }],
            ]
        });
        assert_eq!(
            config_with(&["arg1", "arg2"], config)["commands"],
            json!([["cmd1", "arg1", "arg2"], ["cmd2", "arg1", "arg2"]])
        );
    }

    #[test]
    fn inline_env() {
        let config = json!({
            "commands": [
                ["echo", { "replace": "env", "name": "MY_VAR" }],
                ["echo", { "replace": "env", "name": "NONEXISTENT", "default": "fallback" }],
            ]
        });
        assert_eq!(
            config_with(&[], config)["commands"],
            json!([["echo", "my_value"], ["echo", "fallback"]])
        );
    }

    #[test]
    fn inline_refs() {
        let config = json!({
            "base_python": "python3.11",
            "env_run_base": {
                "deps": ["pytest", "coverage"],
                "base_python": { "replace": "ref", "of": ["base_python"] },
            },
            "env": {
                "lint": {
                    "deps": [
                        { "replace": "ref", "of": ["env_run_base", "deps"], "extend": true },
                        "ruff",
                    ],
                },
                "docs": { "deps": [{ "replace": "ref", "of": ["env_run_base", "deps"] }] },
                "base": { "commands": [["pytest"]] },
                "extended": { "commands": [{ "replace": "ref", "of": ["env", "base", "commands"] }] },
                "fallback": {
                    "deps": [{ "replace": "ref", "of": ["nonexistent", "key"], "default": "dep" }],
                },
            },
        });
        let result = config_with(&[], config);
        assert_eq!(result["env_run_base"]["base_python"], json!("python3.11"));
        assert_eq!(result["env"]["lint"]["deps"], json!(["pytest", "coverage", "ruff"]));
        assert_eq!(result["env"]["docs"]["deps"], json!(["pytest", "coverage"]));
        assert_eq!(result["env"]["extended"]["commands"], json!([["pytest"]]));
        assert_eq!(result["env"]["fallback"]["deps"], json!(["dep"]));
    }

    #[test]
    fn resolved_values_are_substituted_again() {
        let config = json!({
            "tmp": "{env:MY_VAR}/tmp",
            "paths": [{ "replace": "ref", "of": ["tmp"] }],
            "args": [{ "replace": "posargs", "default": ["{env:MY_VAR}"], "extend": true }],
        });
        let result = config_with(&[], config);
        assert_eq!(result["paths"], json!(["my_value/tmp"]));
        assert_eq!(result["args"], json!(["my_value"]));
    }

    #[test]
    fn unknown_inline_tag_is_walked_as_table() {
        let config = json!({
            "value": { "replace": "glob", "pattern": "{env:MY_VAR}" },
            "list": [{ "replace": "glob", "pattern": "{env:MY_VAR}" }],
        });
        let result = config_with(&[], config);
        assert_eq!(result["value"], json!({ "replace": "glob", "pattern": "my_value" }));
        assert_eq!(result["list"], json!([{ "replace": "glob", "pattern": "my_value" }]));
    }

    #[test]
    fn self_referencing_ref_falls_back_to_default() {
        let config = json!({ "a": { "replace": "ref", "of": ["a"] } });
        assert_eq!(config_with(&[], config)["a"], json!(""));

        let with_default = json!({ "a": { "replace": "ref", "of": ["a"], "default": "d" } });
        assert_eq!(config_with(&[], with_default)["a"], json!("d"));
    }

    #[test]
    fn branching_self_references_terminate() {
        let config = json!({
            "x": [
                { "replace": "ref", "of": ["x"] },
                { "replace": "ref", "of": ["x"] },
            ],
        });
        assert_eq!(config_with(&[], config)["x"], json!(["", "", "", ""]));
    }

    #[test]
    fn mutual_references_terminate() {
        let config = json!({
            "a": [{ "replace": "ref", "of": ["b"], "default": "from-a" }, "a1"],
            "b": [{ "replace": "ref", "of": ["a"], "default": "from-b" }, "b1"],
        });
        let result = config_with(&[], config);
        assert_eq!(result["a"], json!([["from-a", "a1"], "b1", "a1"]));
        assert_eq!(result["b"], json!([["from-b", "b1"], "a1", "b1"]));
    }

    #[test]
    fn sibling_refs_to_the_same_path_both_resolve() {
        let config = json!({
            "base": ["pytest"],
            "deps": [
                { "replace": "ref", "of": ["base"] },
                { "replace": "ref", "of": ["base"] },
            ],
        });
        assert_eq!(config_with(&[], config)["deps"], json!(["pytest", "pytest"]));
    }

    #[test]
    fn nesting_past_the_limit_is_left_as_is() {
        let mut value = json!("{env:MY_VAR}");
        for _ in 0..=MAX_DEPTH + 1 {
            value = json!([value]);
        }
        let result = substitutor(&[]).substitute_value(&value, &json!({}));
        let mut innermost = &result;
        while let Value::Array(items) = innermost {
            innermost = &items[0];
        }
        assert_eq!(innermost, &json!("{env:MY_VAR}"));
    }

    #[test]
    fn references_read_the_unsubstituted_tree() {
        let config = json!({
            "base": "{env:MY_VAR}",
            "derived": "{base}-x",
        });
        let result = config_with(&[], config);
        assert_eq!(result["base"], json!("my_value"));
        assert_eq!(result["derived"], json!("my_value-x"));
    }
}
