use tracing::trace;

use super::{ConfigTree, Substitutor, braces, expression};

/// Upper bound on rewrite rounds for a single string.
pub const MAX_ROUNDS: usize = 10;

/// Upper bound on `env` and `posargs` defaults substituted while resolving
/// one string, nested ones included. A default that refers back to the key
/// holding it would otherwise recurse forever.
pub const MAX_NESTED_DEFAULTS: usize = 100;

/// Nested default substitutions still allowed for the current string.
#[derive(Debug)]
pub(crate) struct DefaultBudget(usize);

impl DefaultBudget {
    pub(crate) fn new() -> Self {
        Self(MAX_NESTED_DEFAULTS)
    }

    /// Spend one unit; `false` once exhausted.
    fn take(&mut self) -> bool {
        match self.0.checked_sub(1) {
            Some(left) => {
                self.0 = left;
                true
            },
            None => false,
        }
    }
}

impl Substitutor {
    /// Substitute every placeholder in `text`, rescanning the result until it
    /// stops changing or [`MAX_ROUNDS`] rounds have run, then unescape
    /// `\{ \} \[ \] \:`.
    pub fn substitute_string(&self, text: &str, config: &ConfigTree) -> String {
        self.substitute_within(text, config, &mut DefaultBudget::new())
    }

    /// Substitute an `env` or `posargs` default. `None` once the budget is
    /// spent, which leaves the enclosing placeholder unresolved.
    pub(crate) fn substitute_default(
        &self,
        default: &str,
        config: &ConfigTree,
        budget: &mut DefaultBudget,
    ) -> Option<String> {
        if !budget.take() {
            trace!(default, "nested default limit reached, placeholder left unresolved");
            return None;
        }
        Some(self.substitute_within(default, config, budget))
    }

    fn substitute_within(&self, text: &str, config: &ConfigTree, budget: &mut DefaultBudget) -> String {
        let mut current = text.to_owned();

        for round in 1..=MAX_ROUNDS {
            let next = self.substitute_round(&current, config, budget);
            if next == current {
                return unescape(&current);
            }
            current = next;
            if round == MAX_ROUNDS {
                trace!(text, rounds = MAX_ROUNDS, "substitution stopped at round limit");
            }
        }

        unescape(&current)
    }

    /// Replace spans right to left so earlier offsets stay valid.
    fn substitute_round(&self, text: &str, config: &ConfigTree, budget: &mut DefaultBudget) -> String {
        let mut out = text.to_owned();
        for span in braces::locate(text).iter().rev() {
            match self.resolve(&expression::parse(span.inner), config, budget) {
                Some(resolved) => out.replace_range(span.start..span.end, &resolved),
                None => trace!(placeholder = span.inner, "placeholder left unresolved"),
            }
        }
        out
    }
}

/// Drop the backslash in front of `{`, `}`, `[`, `]` and `:`.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\\'
            && let Some(&next @ ('{' | '}' | '[' | ']' | ':')) = chars.peek()
        {
            out.push(next);
            chars.next();
            continue;
        }
        out.push(ch);
    }

    out
}
