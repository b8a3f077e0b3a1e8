//! Parsing the text inside a placeholder into a kind and its arguments.

/// What a placeholder asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    /// `{:}`
    PathSep,
    /// `{/}`
    Sep,
    /// `{env:NAME}` / `{env:NAME:default}`
    Env,
    /// `{posargs}` / `{posargs:default}`
    Posargs,
    /// `{posargs[N]}` / `{posargs[N:M]}`, holding the text between the brackets.
    PosargsIndexed(String),
    /// `{tty:on:off}`
    Tty,
    /// `{[section]key}`
    SectionRef { section: String, key: String },
    /// `{a.b.c}`. `key` is the first argument part, tried as a plain key
    /// when the dotted path does not resolve.
    DottedRef { path: String, key: String },
    /// `{key}`
    PlainKeyRef(String),
    /// Malformed section or index syntax.
    Unknown,
}

/// A parsed placeholder. Arguments are not substituted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub kind: Kind,
    pub args: Vec<String>,
}

impl Expression {
    fn bare(kind: Kind) -> Self {
        Self {
            kind,
            args: Vec::new(),
        }
    }
}

pub fn parse(inner: &str) -> Expression {
    match inner {
        ":" => return Expression::bare(Kind::PathSep),
        "/" => return Expression::bare(Kind::Sep),
        _ => {},
    }

    if let Some(rest) = inner.strip_prefix('[') {
        return Expression::bare(section_reference(rest));
    }

    let mut parts = split_args(inner).into_iter();
    let head = parts.next().unwrap_or_default();
    Expression {
        kind: classify(head, inner),
        args: parts.collect(),
    }
}

/// `rest` is everything after the opening `[`.
fn section_reference(rest: &str) -> Kind {
    match rest.split_once(']') {
        Some((section, key)) if !section.is_empty() && !key.is_empty() => Kind::SectionRef {
            section: section.to_owned(),
            key: key.to_owned(),
        },
        _ => Kind::Unknown,
    }
}

fn classify(head: String, inner: &str) -> Kind {
    match head.as_str() {
        "env" => return Kind::Env,
        "posargs" => return Kind::Posargs,
        "tty" => return Kind::Tty,
        _ => {},
    }
    if let Some(rest) = head.strip_prefix("posargs[") {
        return rest
            .strip_suffix(']')
            .map_or(Kind::Unknown, |index| Kind::PosargsIndexed(index.to_owned()));
    }

    if inner.contains('.') {
        Kind::DottedRef {
            path: inner.to_owned(),
            key: head,
        }
    } else {
        Kind::PlainKeyRef(head)
    }
}

/// Split on `:` outside nested `{}` and `[]`. A backslash before one of
/// `:{}[]` makes that character literal content.
fn split_args(inner: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut braces = 0i32;
    let mut brackets = 0i32;
    let mut chars = inner.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' if matches!(chars.peek(), Some(':' | '{' | '}' | '[' | ']')) => {
                current.extend(chars.next());
                continue;
            },
            '{' => braces += 1,
            '}' => braces -= 1,
            '[' => brackets += 1,
            ']' => brackets -= 1,
            ':' if braces == 0 && brackets == 0 => {
                parts.push(std::mem::take(&mut current));
                continue;
            },
            _ => {},
        }
        current.push(ch);
    }
    parts.push(current);

    parts
}
