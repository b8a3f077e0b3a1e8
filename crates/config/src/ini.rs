//! INI reader with the conventions tox relies on.
//!
//! - `[section]` headers; `[DEFAULT]` values are inherited by every section.
//! - `key = value` or `key: value`, split at the first delimiter. Keys are
//!   lowercased. No interpolation.
//! - Lines starting with `#` or `;` are comments.
//! - Lines indented deeper than their option continue its value and are
//!   joined with `\n`. Blank lines inside a value are kept, trailing ones
//!   are not.
//! - Duplicate sections or keys, options outside a section and lines
//!   without a delimiter are errors.

const DEFAULT_SECTION: &str = "DEFAULT";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub entries: Vec<(String, String)>,
}

/// Parse INI text into its sections, in file order.
pub fn parse(content: &str) -> Result<Vec<Section>, ParseError> {
    let mut parser = Parser::default();
    for (index, line) in content.lines().enumerate() {
        parser.feed(index + 1, line)?;
    }
    Ok(parser.finish())
}

struct Entry {
    key: String,
    lines: Vec<String>,
}

impl Entry {
    fn value(&self) -> String {
        self.lines.join("\n").trim_end().to_owned()
    }
}

#[derive(Clone, Copy)]
enum Target {
    Defaults,
    Section(usize),
}

struct Cursor {
    target: Target,
    /// Index of the option whose value continuation lines extend.
    option: Option<usize>,
    indent: usize,
}

#[derive(Default)]
struct Parser {
    defaults: Vec<Entry>,
    sections: Vec<(String, Vec<Entry>)>,
    cursor: Option<Cursor>,
}

impl Parser {
    fn feed(&mut self, lineno: usize, line: &str) -> Result<(), ParseError> {
        let trimmed = line.trim();
        if trimmed.starts_with('#') || trimmed.starts_with(';') {
            return Ok(());
        }
        if trimmed.is_empty() {
            if let Some(entry) = self.current_option() {
                entry.lines.push(String::new());
            }
            return Ok(());
        }

        let indent = line.len() - line.trim_start().len();
        let continues = self
            .cursor
            .as_ref()
            .is_some_and(|cursor| cursor.option.is_some() && indent > cursor.indent);
        if continues && let Some(entry) = self.current_option() {
            entry.lines.push(trimmed.to_owned());
            return Ok(());
        }

        if let Some(name) = section_header(trimmed) {
            return self.open_section(lineno, name, indent);
        }
        self.add_option(lineno, trimmed, indent)
    }

    fn open_section(&mut self, lineno: usize, name: &str, indent: usize) -> Result<(), ParseError> {
        let target = if name == DEFAULT_SECTION {
            Target::Defaults
        } else {
            if self.sections.iter().any(|(existing, _)| existing == name) {
                return Err(ParseError::new(
                    lineno,
                    format!("section {name:?} already exists"),
                ));
            }
            self.sections.push((name.to_owned(), Vec::new()));
            Target::Section(self.sections.len() - 1)
        };
        self.cursor = Some(Cursor {
            target,
            option: None,
            indent,
        });
        Ok(())
    }

    fn add_option(&mut self, lineno: usize, trimmed: &str, indent: usize) -> Result<(), ParseError> {
        let Some(target) = self.cursor.as_ref().map(|cursor| cursor.target) else {
            return Err(ParseError::new(lineno, "option outside of any section"));
        };
        let Some(split) = trimmed.find(['=', ':']) else {
            return Err(ParseError::new(
                lineno,
                format!("expected `key = value`, found {trimmed:?}"),
            ));
        };
        let key = trimmed[..split].trim_end().to_lowercase();
        if key.is_empty() {
            return Err(ParseError::new(lineno, "option name is empty"));
        }
        let value = trimmed[split + 1..].trim_start().to_owned();

        let entries = self.entries_mut(target);
        if entries.iter().any(|entry| entry.key == key) {
            return Err(ParseError::new(lineno, format!("option {key:?} already exists")));
        }
        entries.push(Entry {
            key,
            lines: vec![value],
        });
        let option = entries.len() - 1;

        self.cursor = Some(Cursor {
            target,
            option: Some(option),
            indent,
        });
        Ok(())
    }

    fn entries_mut(&mut self, target: Target) -> &mut Vec<Entry> {
        match target {
            Target::Defaults => &mut self.defaults,
            Target::Section(index) => &mut self.sections[index].1,
        }
    }

    fn current_option(&mut self) -> Option<&mut Entry> {
        let cursor = self.cursor.as_ref()?;
        let (target, option) = (cursor.target, cursor.option?);
        self.entries_mut(target).get_mut(option)
    }

    fn finish(self) -> Vec<Section> {
        let defaults = self.defaults;
        self.sections
            .into_iter()
            .map(|(name, entries)| {
                let mut merged: Vec<(String, String)> = entries
                    .iter()
                    .map(|entry| (entry.key.clone(), entry.value()))
                    .collect();
                for default in &defaults {
                    if !merged.iter().any(|(key, _)| *key == default.key) {
                        merged.push((default.key.clone(), default.value()));
                    }
                }
                Section {
                    name,
                    entries: merged,
                }
            })
            .collect()
    }
}

/// `[name]` with a non-empty name; the name runs to the last `]`.
fn section_header(trimmed: &str) -> Option<&str> {
    let rest = trimmed.strip_prefix('[')?;
    let close = rest.rfind(']')?;
    (close > 0).then(|| &rest[..close])
}
