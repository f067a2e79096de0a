//! Static query templates with declared parameters.

use std::collections::BTreeSet;

use crate::error::StoreError;
use crate::value::Params;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryKind {
    /// Idempotent; the transport may retry on connection failure.
    Read,
    /// Never retried implicitly. The engine itself issues none of these;
    /// the kind exists so the transport can refuse to guess.
    Write,
}

#[derive(Clone, Copy, Debug)]
pub struct QueryTemplate {
    pub name: &'static str,
    pub text: &'static str,
    pub parameters: &'static [&'static str],
    pub kind: QueryKind,
}

impl QueryTemplate {
    pub const fn read(
        name: &'static str,
        text: &'static str,
        parameters: &'static [&'static str],
    ) -> Self {
        Self { name, text, parameters, kind: QueryKind::Read }
    }

    pub fn is_read(&self) -> bool {
        self.kind == QueryKind::Read
    }

    /// Check the template text references only declared parameters, and that
    /// the supplied parameters match the declaration exactly. Runs before
    /// any transport work.
    pub fn bind(&self, params: &Params) -> Result<(), StoreError> {
        let declared: BTreeSet<&str> = self.parameters.iter().copied().collect();

        for referenced in placeholders(self.text) {
            if !declared.contains(referenced.as_str()) {
                return Err(StoreError::MalformedQuery {
                    query: self.name,
                    message: format!("template references undeclared parameter `${referenced}`"),
                });
            }
        }

        let provided: BTreeSet<&str> = params.names().collect();
        if let Some(extra) = provided.difference(&declared).next() {
            return Err(StoreError::MalformedQuery {
                query: self.name,
                message: format!("parameter `{extra}` is not declared by the template"),
            });
        }
        if let Some(missing) = declared.difference(&provided).next() {
            return Err(StoreError::MalformedQuery {
                query: self.name,
                message: format!("declared parameter `{missing}` was not supplied"),
            });
        }

        Ok(())
    }
}

/// `$name` placeholders appearing in the query text.
fn placeholders(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            continue;
        }
        let mut name = String::new();
        while let Some(next) = chars.peek() {
            if next.is_ascii_alphanumeric() || *next == '_' {
                name.push(*next);
                chars.next();
            } else {
                break;
            }
        }
        if !name.is_empty() {
            found.push(name);
        }
    }

    found
}
