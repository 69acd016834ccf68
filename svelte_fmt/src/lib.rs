#![doc = include_str!("../README.md")]

mod ast;
pub mod config;
mod ctx;
mod doc;
mod doc_helpers;
mod embed;
mod error;
mod helpers;
mod parser;
mod printer;
pub mod snip;
mod state;

use crate::{config::FormatOptions, ctx::Ctx, parser::Parser};
pub use crate::{
    ctx::{EmbeddedLanguage, Hints},
    error::*,
};
use std::{borrow::Cow, path::Path};

/// Result of [`format_text_with_diagnostics`].
#[derive(Debug)]
pub struct Formatted<E> {
    pub code: String,
    /// Failures of the external formatter. Each failed region is kept as it was.
    pub diagnostics: Vec<FormatError<E>>,
}

/// Format the given Svelte component.
///
/// An external formatter is required for formatting script expressions and
/// code inside `<script>` and `<style>` tags.
/// If you don't need to format them or you don't have available formatters,
/// you can pass a closure that returns the original code. (see example below)
///
/// ```
/// use svelte_fmt::format_text;
///
/// let code = r#"<script>const a = 1;</script>
/// <div>
/// <span>{a}</span>
/// </div>"#;
///
/// let formatted = format_text(
///     code,
///     &Default::default(),
///     |code, _| Ok::<_, std::convert::Infallible>(code.into()),
/// ).unwrap();
/// assert_eq!(
///     formatted,
///     "<script>\n  const a = 1;\n</script>\n\n<div>\n  <span>{a}</span>\n</div>\n"
/// );
/// ```
///
/// For the external formatter closure,
///
/// - The first argument is code that needs formatting.
/// - The second argument is hints which contains useful information for external formatters,
///   such as the language of the code and print width.
///
/// When the external formatter fails, the code it was given is kept
/// unchanged and a warning is logged.
/// Use [`format_text_with_diagnostics`] to get those errors.
pub fn format_text<E, F>(
    code: &str,
    options: &FormatOptions,
    external_formatter: F,
) -> Result<String, FormatError<E>>
where
    F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
{
    format_text_with_diagnostics(code, options, external_formatter).map(|formatted| formatted.code)
}

/// Same as [`format_text`], but also returns errors of the external formatter.
pub fn format_text_with_diagnostics<E, F>(
    code: &str,
    options: &FormatOptions,
    external_formatter: F,
) -> Result<Formatted<E>, FormatError<E>>
where
    F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
{
    let (bom, code) = match code.strip_prefix('\u{feff}') {
        Some(code) => ("\u{feff}", code),
        None => ("", code),
    };
    let source = snip::snip(code);
    let mut parser = Parser::new(&source);
    let root = parser.parse_root().map_err(FormatError::Syntax)?;

    let mut ctx = Ctx {
        source: &source,
        indent_width: options.layout.indent_width,
        use_tabs: options.layout.use_tabs,
        print_width: options.layout.print_width,
        options: &options.language,
        indent_level: 0,
        external_formatter,
        diagnostics: vec![],
        ignore_next: false,
        ignore_range: false,
        options_doc: None,
        embed_spans: vec![],
    };

    let doc = printer::print_root(root, &mut ctx);
    let mut code = doc::print(doc, &options.layout);
    if snip::has_snipped_content(&code) {
        code = snip::unsnip(&code).into_owned();
    }
    code.insert_str(0, bom);

    Ok(Formatted {
        code,
        diagnostics: ctx.diagnostics,
    })
}

/// Check if the file is a Svelte component by its extension.
pub fn is_svelte_file(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svelte"))
}
