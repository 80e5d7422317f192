//! Document generation and export.
//!
//! - [`renderer`] -- `.docx` templates with `{{ KEY }}` placeholders.
//! - [`archive`] -- ZIP export of an engagement's documents.

pub mod archive;
pub mod renderer;
