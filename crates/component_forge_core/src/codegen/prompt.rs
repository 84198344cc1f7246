//! Composition of the instruction preamble and the user turn sent upstream.

use crate::codegen::preview::EXPORT_NAME;
use crate::domain::{Attachment, Dialect};

const SYSTEM_TEMPLATE: &str = r#"You are an expert React developer who writes modern, responsive and accessible components from a user's requirements.

RULES:
1. Return valid {DIALECT} code that can be rendered directly in the browser.
2. Use functional components and hooks. React hooks are available as globals, so do not write import or export statements.
3. Declare the top-level component as `function {EXPORT}(...)` (or `const {EXPORT} = ...`); helper components may use other names.
4. Style with Bootstrap 5 or Tailwind CSS classes and put any extra rules in the css field.
5. Add proper TypeScript types in TSX code.
6. Produce both the JSX and the TSX version whenever possible.
7. Never put code in the explanation.

RESPONSE FORMAT:
First write a short, conversational explanation of what the component does, its features and how to use it.
Then write a single JSON object with exactly these keys:
{
  "explanation": "one sentence describing the component",
  "jsx": "the JSX version",
  "tsx": "the TSX version",
  "{KEY}": "the {DIALECT} version",
  "css": "additional CSS, or an empty string",
  "description": "a short description of the component"
}
All code belongs in the JSON object, escaped as JSON strings."#;

/// The fixed instruction preamble for the requested dialect.
pub fn system_prompt(dialect: Dialect) -> String {
    SYSTEM_TEMPLATE
        .replace("{DIALECT}", &dialect.as_str().to_uppercase())
        .replace("{KEY}", dialect.as_str())
        .replace("{EXPORT}", EXPORT_NAME)
}

/// Code from the previous turn, sent back as continuation context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviousCode {
    pub jsx: String,
    pub tsx: String,
    pub css: String,
}

impl PreviousCode {
    fn code_for(&self, dialect: Dialect) -> Option<&str> {
        let preferred = match dialect {
            Dialect::Jsx => &self.jsx,
            Dialect::Tsx => &self.tsx,
        };
        [preferred, &self.jsx, &self.tsx]
            .into_iter()
            .find(|code| !code.is_empty())
            .map(String::as_str)
    }
}

/// The user turn: the prompt, a listing of attachments and the previous code.
pub fn user_prompt(
    prompt: &str,
    attachments: &[Attachment],
    previous: Option<&PreviousCode>,
    dialect: Dialect,
) -> String {
    let mut turn = prompt.to_string();

    if !attachments.is_empty() {
        turn.push_str("\n\nAttached files context:\n");
        for file in attachments {
            turn.push_str(&format!("- {} ({})\n", file.original_name, file.mimetype));
        }
    }

    if let Some(previous) = previous {
        if let Some(code) = previous.code_for(dialect) {
            turn.push_str(&format!("\n\nCurrent component code:\n{}", code));
            if !previous.css.is_empty() {
                turn.push_str(&format!("\n\nCurrent CSS:\n{}", previous.css));
            }
        }
    }

    turn
}
