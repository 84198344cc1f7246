//! Synthesis of the self-contained preview document.
//!
//! The document loads React and Babel from a CDN, inlines the CSS and the generated
//! code, then asks an ordered list of locators for the component to mount. The
//! first locator that yields a function wins. The locators after the declared
//! export are heuristics: they can pick the wrong function when several are
//! declared, and they miss anonymous or default-exported components.

use crate::domain::Dialect;
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// The name the instruction preamble asks the model to give the top-level component.
pub const EXPORT_NAME: &str = "GeneratedComponent";

/// Runtime globals that must never be mistaken for the component.
const RUNTIME_GLOBALS: &[&str] = &["React", "ReactDOM", "Babel", "Tailwind"];

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{(PRESETS|CSS|LOCATORS|CODE)\}\}").expect("valid regex")
});

static FUNCTION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bfunction\s+([A-Za-z_$][\w$]*)").expect("valid regex"));
static BINDING_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:const|let)\s+([A-Za-z_$][\w$]*)\s*=").expect("valid regex"));
static IMPORT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*import\s[^;\n]*;?[ \t]*\n?").expect("valid regex"));
static SCRIPT_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</(script)").expect("valid regex"));
static STYLE_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</(style)").expect("valid regex"));

/// One strategy for finding the component to mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentLocator {
    /// The binding named by the declared export contract.
    DeclaredExport,
    /// The first `function Name` declaration in the code.
    FunctionDeclaration(String),
    /// The first `const Name =` or `let Name =` declaration in the code.
    BindingDeclaration(String),
    /// The first enumerable uppercase function on `window` that is not a runtime global.
    GlobalScan,
}

impl ComponentLocator {
    fn tag(&self) -> &'static str {
        match self {
            ComponentLocator::DeclaredExport => "declared-export",
            ComponentLocator::FunctionDeclaration(_) => "function-declaration",
            ComponentLocator::BindingDeclaration(_) => "binding-declaration",
            ComponentLocator::GlobalScan => "global-scan",
        }
    }

    /// A JavaScript arrow function returning the located component or `undefined`.
    fn to_js(&self) -> String {
        match self {
            ComponentLocator::DeclaredExport => lookup_binding(EXPORT_NAME),
            ComponentLocator::FunctionDeclaration(name)
            | ComponentLocator::BindingDeclaration(name) => lookup_binding(name),
            ComponentLocator::GlobalScan => format!(
                "() => {{ const skip = {}; const key = Object.keys(window).find((k) => /^[A-Z]/.test(k) && !skip.includes(k) && typeof window[k] === 'function'); return key ? window[key] : undefined; }}",
                js_string_array(RUNTIME_GLOBALS)
            ),
        }
    }
}

// `typeof` on an undeclared identifier is safe, so the lookup never throws.
fn lookup_binding(name: &str) -> String {
    format!(
        "() => (typeof {name} === 'function' ? {name} : (typeof window['{name}'] === 'function' ? window['{name}'] : undefined))"
    )
}

fn js_string_array(items: &[&str]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| format!("'{}'", item)).collect();
    format!("[{}]", quoted.join(", "))
}

/// The ordered locators for `code`.
pub fn component_locators(code: &str) -> Vec<ComponentLocator> {
    let mut locators = vec![ComponentLocator::DeclaredExport];
    if let Some(caps) = FUNCTION_NAME.captures(code) {
        locators.push(ComponentLocator::FunctionDeclaration(caps[1].to_string()));
    }
    if let Some(caps) = BINDING_NAME.captures(code) {
        locators.push(ComponentLocator::BindingDeclaration(caps[1].to_string()));
    }
    locators.push(ComponentLocator::GlobalScan);
    locators
}

/// Builds the preview document for `code` and `css`.
///
/// Empty code produces a placeholder document with an explanatory empty state.
pub fn render_preview(code: &str, css: &str, dialect: Dialect) -> String {
    if code.trim().is_empty() {
        return EMPTY_PREVIEW.to_string();
    }

    // The runtime is loaded as globals, so module imports would not evaluate.
    let code = IMPORT_LINE.replace_all(code, "");
    let locators = component_locators(&code)
        .iter()
        .map(|locator| format!("        ['{}', {}],", locator.tag(), locator.to_js()))
        .collect::<Vec<_>>()
        .join("\n");

    let presets = match dialect {
        Dialect::Jsx => "react",
        Dialect::Tsx => "typescript,react",
    };

    let css = STYLE_CLOSE.replace_all(css, r"<\/$1");
    let code = SCRIPT_CLOSE.replace_all(&code, r"<\/$1");

    // One pass, so placeholder text inside user code or CSS is left alone.
    PLACEHOLDER
        .replace_all(PREVIEW_TEMPLATE, |caps: &Captures| match &caps[1] {
            "PRESETS" => presets.to_string(),
            "CSS" => css.to_string(),
            "LOCATORS" => locators.clone(),
            _ => code.to_string(),
        })
        .into_owned()
}

const EMPTY_PREVIEW: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Component Preview</title>
  <script src="https://cdn.tailwindcss.com"></script>
  <style>
    body { margin: 0; padding: 20px; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #f8fafc; display: flex; align-items: center; justify-content: center; min-height: 100vh; }
  </style>
</head>
<body>
  <div class="text-center">
    <h5 class="text-gray-600 text-xl font-semibold">No Component Generated</h5>
    <p class="text-gray-500">Start a conversation to generate your first React component</p>
  </div>
</body>
</html>
"#;

const PREVIEW_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Component Preview</title>
  <script src="https://unpkg.com/react@18/umd/react.development.js"></script>
  <script src="https://unpkg.com/react-dom@18/umd/react-dom.development.js"></script>
  <script src="https://unpkg.com/@babel/standalone/babel.min.js"></script>
  <script src="https://cdn.tailwindcss.com"></script>
  <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css">
  <style>
    body { margin: 0; padding: 20px; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #f8fafc; }
    #root { min-height: 200px; }
{{CSS}}
  </style>
</head>
<body>
  <div id="root"></div>
  <script>
    function showPreviewBlock(kind, text) {
      const root = document.getElementById('root');
      const block = document.createElement('div');
      block.className = kind === 'error'
        ? 'bg-red-100 border border-red-400 text-red-700 px-4 py-3 rounded'
        : 'bg-yellow-100 border border-yellow-400 text-yellow-700 px-4 py-3 rounded';
      if (kind === 'error') {
        const label = document.createElement('strong');
        label.textContent = 'Error: ';
        block.appendChild(label);
      }
      block.appendChild(document.createTextNode(text));
      root.replaceChildren(block);
    }
    window.addEventListener('error', (event) => {
      showPreviewBlock('error', event.message || String(event.error));
    });
  </script>
  <script type="text/babel" data-presets="{{PRESETS}}" data-filename="component.tsx">
    const { useState, useEffect, useCallback, useMemo, useRef, useReducer, useContext, createContext, Fragment } = React;

    try {
{{CODE}}

      const locators = [
{{LOCATORS}}
      ];

      let Component;
      for (const [, locate] of locators) {
        Component = locate();
        if (typeof Component === 'function') break;
      }

      if (typeof Component === 'function') {
        ReactDOM.createRoot(document.getElementById('root')).render(React.createElement(Component));
      } else {
        showPreviewBlock('warning', 'Component not found. Please check the generated code.');
      }
    } catch (error) {
      console.error('Preview error:', error);
      showPreviewBlock('error', error && error.message ? error.message : String(error));
    }
  </script>
</body>
</html>
"#;
