//! Best-effort syntactic conversion between the JSX and TSX dialects.
//!
//! These are plain pattern substitutions. They do not understand the code and can
//! produce invalid output for anything beyond a single simple component (multiple
//! components per file, default exports, generic hooks, object literals, ternaries).

use regex::Regex;
use std::sync::LazyLock;

static FUNCTION_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"function\s+(\w+)\s*\(").expect("valid regex"));
static FIRST_COMPONENT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:const|function)\s+(\w+)").expect("valid regex"));
static INTERFACE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"interface\s+\w+\s*\{[^}]*\}\s*").expect("valid regex"));
static FC_ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\s*React\.FC(<[^>]*>)?").expect("valid regex"));
static GENERIC_ARGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w)<[\w\s,.|\[\]]+>(\s*\()").expect("valid regex"));
static TYPE_ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\s*\w+(\[\])?").expect("valid regex"));
static CONST_ARROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"const\s+(\w+)\s*=\s*\(").expect("valid regex"));

/// Derives TSX from JSX.
///
/// Adds a React import when missing, rewrites `function Name(` into
/// `const Name: React.FC = (`, and when the code takes props adds an empty
/// `NameProps` interface and parameterizes the first component with it.
pub fn jsx_to_tsx(jsx: &str) -> String {
    let mut tsx = if jsx.contains("import React") {
        jsx.to_string()
    } else {
        format!("import React from 'react';\n{}", jsx)
    };

    tsx = FUNCTION_DECL
        .replace_all(&tsx, "const $1: React.FC = (")
        .into_owned();

    if tsx.contains("(props") || tsx.contains("({") {
        let name = FIRST_COMPONENT_NAME
            .captures(&tsx)
            .map(|caps| caps[1].to_string());
        if let Some(name) = name {
            let interface = format!("{}Props", name);
            let untyped = format!("const {}: React.FC", name);
            let typed = format!("const {}: React.FC<{}>", name, interface);
            tsx = format!("interface {} {{}}\n\n{}", interface, tsx.replacen(&untyped, &typed, 1));
        }
    }

    tsx
}

/// Derives JSX from TSX.
///
/// Strips interface blocks, `React.FC` annotations, generic arguments on calls,
/// and simple `: Type` annotations, then rewrites `const Name = (` into
/// `function Name(`. Falls back to the input when the stripping leaves nothing.
pub fn tsx_to_jsx(tsx: &str) -> String {
    let mut jsx = INTERFACE_BLOCK.replace_all(tsx, "").into_owned();
    jsx = FC_ANNOTATION.replace_all(&jsx, "").into_owned();
    jsx = GENERIC_ARGS.replace_all(&jsx, "$1$2").into_owned();
    jsx = TYPE_ANNOTATION.replace_all(&jsx, "").into_owned();
    jsx = CONST_ARROW.replace_all(&jsx, "function $1(").into_owned();

    if jsx.trim().is_empty() {
        tsx.to_string()
    } else {
        jsx
    }
}
