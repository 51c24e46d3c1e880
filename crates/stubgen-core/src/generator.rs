//! Deterministic mapping from one [`Declaration`] to one generated test
//! class artifact.
//!
//! The output layout is fixed: an MSTest-style C# class named
//! `<TypeName>Test` with one `[TestMethod]` stub per public operation, each
//! failing with the literal message `"autogenerated"` so a human knows the
//! body still has to be written. There is no templating language and no
//! style configuration; determinism is the point.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::types::{Declaration, GeneratedArtifact};

const TEST_FRAMEWORK_USING: &str = "using Microsoft.VisualStudio.TestTools.UnitTesting;";
const STUB_MESSAGE: &str = "autogenerated";

/// Generates one test-class artifact per declaration.
pub struct TestClassGenerator {
    output_dir: PathBuf,
}

impl TestClassGenerator {
    /// Create a generator that names artifacts under `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// The configured output location.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Map one declaration to its generated artifact.
    ///
    /// The artifact name is `<output_dir>/<TypeName>Test`; the content is
    /// the rendered test class. Operation order is preserved, with overload
    /// collisions resolved by [`dedup_operation_names`].
    #[must_use]
    pub fn generate(&self, declaration: &Declaration) -> GeneratedArtifact {
        let name = self
            .output_dir
            .join(format!("{}Test", declaration.type_name))
            .to_string_lossy()
            .into_owned();
        let methods = dedup_operation_names(&declaration.public_operations);
        let content = render_test_class(
            declaration.namespace.as_deref(),
            &declaration.type_name,
            &methods,
        );
        GeneratedArtifact { name, content }
    }
}

/// Resolve overload collisions into unique base names, first-seen order.
///
/// The first occurrence of a name keeps it unchanged; the second gets suffix
/// `1`, the third `2`, and so on. The suffix lands on the *base* name — the
/// `Test` literal is appended afterwards by the renderer — so `Foo, Foo`
/// becomes `FooTest, Foo1Test`. A bounded loop over a used-name set rather
/// than recursion: the loop terminates because each iteration tries a suffix
/// not yet in the set of at most `ops.len()` assigned names.
#[must_use]
pub fn dedup_operation_names(ops: &[String]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::with_capacity(ops.len());
    let mut out = Vec::with_capacity(ops.len());
    for op in ops {
        let mut count = 0usize;
        loop {
            let base = if count == 0 {
                op.clone()
            } else {
                format!("{op}{count}")
            };
            if used.insert(base.clone()) {
                out.push(base);
                break;
            }
            count += 1;
        }
    }
    out
}

fn push_line(buf: &mut String, indent: usize, line: &str) {
    for _ in 0..indent {
        buf.push_str("    ");
    }
    buf.push_str(line);
    buf.push('\n');
}

/// Render the fixed test-class layout.
///
/// Member order is the post-dedup input order; a declaration without a
/// namespace produces a top-level class.
fn render_test_class(namespace: Option<&str>, type_name: &str, methods: &[String]) -> String {
    let mut buf = String::new();
    push_line(&mut buf, 0, TEST_FRAMEWORK_USING);
    buf.push('\n');

    let class_indent = usize::from(namespace.is_some());
    if let Some(ns) = namespace {
        push_line(&mut buf, 0, &format!("namespace {ns}.Test"));
        push_line(&mut buf, 0, "{");
    }

    push_line(&mut buf, class_indent, "[TestClass]");
    push_line(&mut buf, class_indent, &format!("public class {type_name}Test"));
    push_line(&mut buf, class_indent, "{");

    for (i, method) in methods.iter().enumerate() {
        if i > 0 {
            buf.push('\n');
        }
        push_line(&mut buf, class_indent + 1, "[TestMethod]");
        push_line(
            &mut buf,
            class_indent + 1,
            &format!("public void {method}Test()"),
        );
        push_line(&mut buf, class_indent + 1, "{");
        push_line(
            &mut buf,
            class_indent + 2,
            &format!("Assert.Fail(\"{STUB_MESSAGE}\");"),
        );
        push_line(&mut buf, class_indent + 1, "}");
    }

    push_line(&mut buf, class_indent, "}");
    if namespace.is_some() {
        push_line(&mut buf, 0, "}");
    }
    buf
}
