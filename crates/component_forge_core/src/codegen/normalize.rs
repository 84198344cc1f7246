//! Turns raw model output into an explanation plus a complete code bundle.
//!
//! Never fails: when nothing structured can be found the output degrades to a
//! synthetic component built from the reply text.

use crate::codegen::convert::{jsx_to_tsx, tsx_to_jsx};
use crate::codegen::preview::render_preview;
use crate::codegen::scan::first_json_object;
use crate::domain::{CodeBundle, Dialect};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

pub const DEFAULT_EXPLANATION: &str = "Component generated successfully.";
const FENCE_DESCRIPTION: &str = "Generated component";
const WRAPPER_NAME: &str = "GeneratedComponent";

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));
static FENCE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[\w+-]*[ \t]*\n?").expect("valid regex"));

/// The structured result of normalizing one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedComponent {
    pub explanation: String,
    pub description: String,
    pub code: CodeBundle,
}

/// Fields pulled out of a reply before cross-derivation.
#[derive(Debug, Default)]
struct Extracted {
    explanation: String,
    jsx: String,
    tsx: String,
    css: String,
    description: String,
}

/// Normalizes `raw` for the requested `dialect`.
pub fn normalize(raw: &str, dialect: Dialect) -> NormalizedComponent {
    let extracted = extract_embedded_json(raw)
        .or_else(|| extract_whole_json(raw))
        .unwrap_or_else(|| extract_fenced(raw, dialect));

    let Extracted {
        explanation,
        mut jsx,
        mut tsx,
        css,
        description,
    } = extracted;

    if !jsx.is_empty() && tsx.is_empty() {
        tsx = jsx_to_tsx(&jsx);
    } else if !tsx.is_empty() && jsx.is_empty() {
        jsx = tsx_to_jsx(&tsx);
    }

    let preview_source = match dialect {
        Dialect::Jsx => &jsx,
        Dialect::Tsx if !tsx.is_empty() => &tsx,
        Dialect::Tsx => &jsx,
    };
    let preview = render_preview(preview_source, &css, dialect);

    let explanation = if explanation.trim().is_empty() {
        DEFAULT_EXPLANATION.to_string()
    } else {
        explanation
    };

    NormalizedComponent {
        explanation,
        description,
        code: CodeBundle {
            jsx,
            tsx,
            css,
            preview,
        },
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn fields_from(map: &Map<String, Value>, explanation: String, description: String) -> Extracted {
    Extracted {
        explanation,
        jsx: string_field(map, Dialect::Jsx.as_str()),
        tsx: string_field(map, Dialect::Tsx.as_str()),
        css: string_field(map, "css"),
        description,
    }
}

fn description_or_explanation(map: &Map<String, Value>) -> String {
    let description = string_field(map, "description");
    if description.is_empty() {
        string_field(map, "explanation")
    } else {
        description
    }
}

/// Stage 1: the first balanced `{...}` region that parses; the text before it
/// is the explanation.
fn extract_embedded_json(raw: &str) -> Option<Extracted> {
    let (span, map) = first_json_object(raw)?;
    let explanation = raw[..span.start].trim().to_string();
    let description = description_or_explanation(&map);
    Some(fields_from(&map, explanation, description))
}

/// Stage 2: the entire reply as one JSON object.
fn extract_whole_json(raw: &str) -> Option<Extracted> {
    let map = match serde_json::from_str::<Value>(raw.trim()) {
        Ok(Value::Object(map)) => map,
        _ => return None,
    };
    let explanation = string_field(&map, "explanation");
    let description = string_field(&map, "description");
    Some(fields_from(&map, explanation, description))
}

/// Stage 3: prose with an optional fenced code block.
fn extract_fenced(raw: &str, dialect: Dialect) -> Extracted {
    let explanation = FENCED_BLOCK.replace_all(raw, "").trim().to_string();

    let mut code = match FENCED_BLOCK.find(raw) {
        Some(block) => strip_fence(block.as_str()),
        None => raw.trim().to_string(),
    };

    if !code.contains("function ") && !code.contains("const ") && !code.contains("export") {
        code = format!(
            "function {}() {{\n  return (\n    {}\n  );\n}}",
            WRAPPER_NAME, code
        );
    }

    let (jsx, tsx) = match dialect {
        Dialect::Jsx => (code, String::new()),
        Dialect::Tsx => (String::new(), code),
    };

    Extracted {
        explanation,
        jsx,
        tsx,
        css: String::new(),
        description: FENCE_DESCRIPTION.to_string(),
    }
}

fn strip_fence(block: &str) -> String {
    let inner = FENCE_OPEN.replace(block, "");
    inner
        .strip_suffix("```")
        .unwrap_or(&inner)
        .to_string()
}
