//! Declaration extraction from raw source text.
//!
//! The pipeline only needs a structural summary of each input — which types
//! it declares and what their public operations are called — so the seam is
//! a plain data-model trait rather than a full syntax-tree API. Any concrete
//! parser can be swapped in behind [`DeclarationExtractor`]; the built-in
//! [`CSharpExtractor`] is a regex and brace-depth heuristic good enough for
//! well-formed C#-shaped sources and for tests.

use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::Declaration;

/// Derives type declarations from one unit's raw text.
///
/// Implementations fail with [`Error::Parse`] on malformed input. Returning
/// an empty list is *not* a failure: a unit that declares no types simply
/// produces no artifacts.
pub trait DeclarationExtractor: Send + Sync {
    /// Extract all declared types, in source order.
    fn extract(&self, text: &str) -> Result<Vec<Declaration>>;
}

/// Heuristic extractor for C#-shaped source text.
///
/// Recognizes `namespace` and `class` declarations plus public method
/// signatures inside each class body. Brace matching is textual — string
/// literals and comments containing braces will confuse it — which is an
/// accepted limitation of a test-oriented extractor.
pub struct CSharpExtractor {
    namespace_re: Regex,
    class_re: Regex,
    method_re: Regex,
}

impl CSharpExtractor {
    /// Build the extractor, compiling its patterns.
    pub fn new() -> Result<Self> {
        // A public method needs at least a return type token and a name
        // before the parameter list; constructors (`public Foo(`) have only
        // one token there and so never match.
        let method_re = Regex::new(
            r"\bpublic\s+(?:(?:static|async|virtual|override|sealed|unsafe)\s+)*([\w<>\[\],\.\?]+)\s+(\w+)\s*\(",
        )
        .map_err(|e| Error::Parse(format!("invalid method pattern: {e}")))?;
        let class_re = Regex::new(r"\bclass\s+(\w+)")
            .map_err(|e| Error::Parse(format!("invalid class pattern: {e}")))?;
        let namespace_re = Regex::new(r"\bnamespace\s+([\w\.]+)")
            .map_err(|e| Error::Parse(format!("invalid namespace pattern: {e}")))?;
        Ok(Self {
            namespace_re,
            class_re,
            method_re,
        })
    }
}

impl DeclarationExtractor for CSharpExtractor {
    fn extract(&self, text: &str) -> Result<Vec<Declaration>> {
        check_balanced(text)?;

        let namespaces: Vec<(usize, &str)> = self
            .namespace_re
            .captures_iter(text)
            .filter_map(|caps| {
                let m = caps.get(1)?;
                Some((m.start(), m.as_str()))
            })
            .collect();

        let mut declarations = Vec::new();
        for caps in self.class_re.captures_iter(text) {
            let Some(name) = caps.get(1) else { continue };
            let body = class_body(text, name.end()).ok_or_else(|| {
                Error::Parse(format!("class '{}' has no body", name.as_str()))
            })?;

            // Innermost enclosing namespace: the last one declared before
            // this class.
            let namespace = namespaces
                .iter()
                .rev()
                .find(|(pos, _)| *pos < name.start())
                .map(|(_, ns)| (*ns).to_string());

            let public_operations: Vec<String> = self
                .method_re
                .captures_iter(body)
                .filter_map(|m| m.get(2))
                .map(|m| m.as_str().to_string())
                .collect();

            debug!(
                class = name.as_str(),
                operations = public_operations.len(),
                "extracted declaration"
            );
            declarations.push(Declaration {
                namespace,
                type_name: name.as_str().to_string(),
                public_operations,
            });
        }
        Ok(declarations)
    }
}

/// Reject text whose braces cannot possibly pair up.
fn check_balanced(text: &str) -> Result<()> {
    let mut depth = 0i64;
    for c in text.chars() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return Err(Error::Parse("unbalanced braces: unexpected '}'".into()));
                }
            },
            _ => {},
        }
    }
    if depth != 0 {
        return Err(Error::Parse(format!(
            "unbalanced braces: {depth} unclosed block(s)"
        )));
    }
    Ok(())
}

/// Slice of `text` between the class's opening brace and its matching close,
/// exclusive. `from` points just past the class name.
fn class_body(text: &str, from: usize) -> Option<&str> {
    let rel_open = text[from..].find('{')?;
    let open = from + rel_open;
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open + 1..open + i]);
                }
            },
            _ => {},
        }
    }
    None
}
