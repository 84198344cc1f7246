//! services/api/src/archive.rs
//!
//! Packs generated code into a ZIP archive with a package manifest and README.

use serde_json::json;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const DEFAULT_NAME: &str = "component";

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("No code to download")]
    NoCode,
    #[error("Failed to build archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Failed to build archive: {0}")]
    Io(#[from] std::io::Error),
}

/// The files a caller wants exported. Empty strings count as absent.
#[derive(Debug, Clone, Default)]
pub struct ArchiveContents {
    pub jsx: Option<String>,
    pub tsx: Option<String>,
    pub css: Option<String>,
    pub filename: Option<String>,
}

/// A finished archive and the base name its entries were written under.
#[derive(Debug)]
pub struct ComponentArchive {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ComponentArchive {
    pub fn file_name(&self) -> String {
        format!("{}.zip", self.name)
    }
}

/// Reduces a requested name to `[A-Za-z0-9_-]`, falling back to `component`.
pub fn sanitize_archive_name(requested: Option<&str>) -> String {
    let cleaned: String = requested
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        .collect();
    if cleaned.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        cleaned
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}

fn package_manifest(name: &str, main: &str) -> String {
    let manifest = json!({
        "name": name.to_ascii_lowercase(),
        "version": "1.0.0",
        "description": "Generated React component",
        "main": main,
        "dependencies": {
            "react": "^18.2.0",
            "react-dom": "^18.2.0"
        },
        "devDependencies": {
            "@types/react": "^18.2.0",
            "@types/react-dom": "^18.2.0",
            "typescript": "^5.0.0"
        }
    });
    // `json!` values always serialize.
    serde_json::to_string_pretty(&manifest).unwrap_or_default()
}

fn readme(name: &str, main: &str, has_css: bool) -> String {
    let css_import = if has_css {
        format!("import './{}.css';\n", name)
    } else {
        String::new()
    };
    format!(
        "# {name}\n\n\
         Generated React component.\n\n\
         ## Installation\n\n\
         ```bash\nnpm install\n```\n\n\
         ## Usage\n\n\
         ```jsx\nimport {name} from './{main}';\n{css_import}\n\
         function App() {{\n  return <{name} />;\n}}\n```\n",
        name = name,
        main = main,
        css_import = css_import,
    )
}

/// Builds the archive in memory.
pub fn build_archive(contents: &ArchiveContents) -> Result<ComponentArchive, ArchiveError> {
    let jsx = present(&contents.jsx);
    let tsx = present(&contents.tsx);
    let css = present(&contents.css);
    if jsx.is_none() && tsx.is_none() && css.is_none() {
        return Err(ArchiveError::NoCode);
    }
    let name = sanitize_archive_name(contents.filename.as_deref());
    // Manifest and README point at the JSX file unless there is none.
    let main = match jsx {
        Some(_) => format!("{}.jsx", name),
        None => format!("{}.tsx", name),
    };

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    let mut entries: Vec<(String, String)> = Vec::new();
    if let Some(code) = jsx {
        entries.push((format!("{}.jsx", name), code.to_string()));
    }
    if let Some(code) = tsx {
        entries.push((format!("{}.tsx", name), code.to_string()));
    }
    if let Some(style) = css {
        entries.push((format!("{}.css", name), style.to_string()));
    }
    entries.push(("package.json".to_string(), package_manifest(&name, &main)));
    entries.push(("README.md".to_string(), readme(&name, &main, css.is_some())));

    for (path, body) in entries {
        writer.start_file(path, options)?;
        writer.write_all(body.as_bytes())?;
    }

    let bytes = writer.finish()?.into_inner();
    Ok(ComponentArchive { name, bytes })
}
