//! `.docx` template rendering.
//!
//! A `.docx` file is a zip of XML parts. Rendering copies every part and
//! substitutes `{{ KEY }}` placeholders inside `word/*.xml` with the
//! XML-escaped field values. Unknown placeholders are left in place.
//!
//! Word often splits a placeholder across several runs (`<w:r>`). When a
//! paragraph's joined text still holds a known placeholder after the plain
//! pass, the whole paragraph text moves into its first `<w:t>` and the other
//! runs are emptied. Formatting of the merged runs is lost.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::path::PathBuf;
use std::sync::LazyLock;

use auditdesk_core::documents::{placeholder, DocumentTemplate};
use regex::{Captures, Regex};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template file not found: {0}")]
    TemplateMissing(String),

    #[error("template is not a valid document: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("template part {0} is not UTF-8")]
    Encoding(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        AppError::InternalError(format!("Document generation failed: {err}"))
    }
}

/// Turns a template plus a field map into document bytes. Implementations
/// do blocking I/O; call them from `spawn_blocking`.
pub trait DocumentRenderer: Send + Sync {
    fn render(
        &self,
        template: DocumentTemplate,
        fields: &BTreeMap<String, String>,
    ) -> Result<Vec<u8>, RenderError>;
}

/// Reads templates from a directory by [`DocumentTemplate::file_name`].
pub struct DocxTemplateRenderer {
    templates_dir: PathBuf,
}

impl DocxTemplateRenderer {
    pub fn new(templates_dir: impl Into<PathBuf>) -> Self {
        Self {
            templates_dir: templates_dir.into(),
        }
    }
}

impl DocumentRenderer for DocxTemplateRenderer {
    fn render(
        &self,
        template: DocumentTemplate,
        fields: &BTreeMap<String, String>,
    ) -> Result<Vec<u8>, RenderError> {
        let path = self.templates_dir.join(template.file_name());
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RenderError::TemplateMissing(path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        fill_docx(&bytes, fields)
    }
}

fn is_text_part(name: &str) -> bool {
    name.starts_with("word/") && name.ends_with(".xml")
}

fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<w:p[ >].*?</w:p>").expect("valid regex"));

static TEXT_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>").expect("valid regex")
});

fn placeholder_forms(key: &str) -> [String; 2] {
    [placeholder(key), format!("{{{{{key}}}}}")]
}

fn substitute(xml: &str, fields: &BTreeMap<String, String>) -> String {
    fields.iter().fold(xml.to_string(), |acc, (key, value)| {
        let escaped = xml_escape(value);
        placeholder_forms(key)
            .iter()
            .fold(acc, |acc, form| acc.replace(form.as_str(), &escaped))
    })
}

fn holds_placeholder(text: &str, fields: &BTreeMap<String, String>) -> bool {
    fields
        .keys()
        .any(|key| placeholder_forms(key).iter().any(|form| text.contains(form.as_str())))
}

/// Second pass for placeholders split across runs of one paragraph.
fn substitute_split_runs(xml: &str, fields: &BTreeMap<String, String>) -> String {
    PARAGRAPH
        .replace_all(xml, |paragraph: &Captures| {
            let paragraph = &paragraph[0];
            let joined: String = TEXT_RUN
                .captures_iter(paragraph)
                .map(|c| c[1].to_string())
                .collect();
            if !holds_placeholder(&joined, fields) {
                return paragraph.to_string();
            }

            let merged = substitute(&joined, fields);
            let mut first = true;
            TEXT_RUN
                .replace_all(paragraph, |_: &Captures| {
                    if std::mem::take(&mut first) {
                        format!("<w:t xml:space=\"preserve\">{merged}</w:t>")
                    } else {
                        "<w:t></w:t>".to_string()
                    }
                })
                .into_owned()
        })
        .into_owned()
}

/// Render a `.docx` held in memory.
pub fn fill_docx(template: &[u8], fields: &BTreeMap<String, String>) -> Result<Vec<u8>, RenderError> {
    let mut archive = ZipArchive::new(Cursor::new(template))?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for i in 0..archive.len() {
        let mut part = archive.by_index(i)?;
        let name = part.name().to_string();
        if part.is_dir() {
            writer.add_directory(name, options)?;
            continue;
        }

        let mut content = Vec::new();
        part.read_to_end(&mut content)?;
        if is_text_part(&name) {
            let xml = String::from_utf8(content).map_err(|_| RenderError::Encoding(name.clone()))?;
            content = substitute_split_runs(&substitute(&xml, fields), fields).into_bytes();
        }

        writer.start_file(name, options)?;
        writer.write_all(&content)?;
    }

    Ok(writer.finish()?.into_inner())
}
