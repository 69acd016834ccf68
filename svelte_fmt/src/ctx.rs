use crate::{
    ast::Span,
    config::LanguageOptions,
    doc::Doc,
    error::FormatError,
};
use std::borrow::Cow;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Grammar of code handed to the external formatter.
pub enum EmbeddedLanguage {
    /// A single script expression, wrapped in parentheses.
    Expression,
    /// Script without `lang`. It may still be TypeScript,
    /// so it needs a parser that accepts both.
    BabelTs,
    TypeScript,
    Json,
    Css,
    Scss,
    Less,
    Pug,
}

impl EmbeddedLanguage {
    /// Conventional file extension of the language.
    pub fn ext(self) -> &'static str {
        match self {
            EmbeddedLanguage::Expression | EmbeddedLanguage::BabelTs => "js",
            EmbeddedLanguage::TypeScript => "ts",
            EmbeddedLanguage::Json => "json",
            EmbeddedLanguage::Css => "css",
            EmbeddedLanguage::Scss => "scss",
            EmbeddedLanguage::Less => "less",
            EmbeddedLanguage::Pug => "pug",
        }
    }
}

#[derive(Clone, Debug)]
/// Information for the external formatter.
pub struct Hints {
    pub language: EmbeddedLanguage,
    /// Width left at the position where the formatted code will be placed.
    pub print_width: usize,
    /// Columns of indentation in front of the code.
    pub indent_level: usize,
    /// Prefer single quoted strings.
    pub single_quote: bool,
}

pub(crate) struct Ctx<'b, 's, E, F>
where
    F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
{
    /// Snipped source which all spans point into.
    pub(crate) source: &'s str,
    pub(crate) indent_width: usize,
    pub(crate) use_tabs: bool,
    pub(crate) print_width: usize,
    pub(crate) options: &'b LanguageOptions,
    pub(crate) indent_level: usize,
    pub(crate) external_formatter: F,
    pub(crate) diagnostics: Vec<FormatError<E>>,
    /// Print the next non-whitespace node as it is.
    pub(crate) ignore_next: bool,
    /// Print everything as it is until `prettier-ignore-end`.
    pub(crate) ignore_range: bool,
    /// `<svelte:options>` taken out of the markup for sorting.
    pub(crate) options_doc: Option<Doc<'s>>,
    /// Spans of top-level `<script>` and `<style>` taken out of the markup.
    pub(crate) embed_spans: Vec<Span>,
}

impl<'s, E, F> Ctx<'_, 's, E, F>
where
    F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
{
    /// Build a doc one level deeper, keeping track of the indentation.
    pub(crate) fn indented(&mut self, f: impl FnOnce(&mut Self) -> Doc<'s>) -> Doc<'s> {
        self.indent_level += self.indent_width;
        let doc = f(self);
        self.indent_level -= self.indent_width;
        doc.indent()
    }

    pub(crate) fn hints(&self, language: EmbeddedLanguage, single_quote: bool) -> Hints {
        Hints {
            language,
            print_width: self.print_width.saturating_sub(self.indent_level),
            indent_level: self.indent_level,
            single_quote: single_quote || self.options.single_quote,
        }
    }

    /// Run the external formatter. A failure is recorded as a diagnostic
    /// and `None` is returned, so the caller can keep the code unchanged.
    pub(crate) fn format_with_external_formatter(
        &mut self,
        code: &str,
        hints: Hints,
    ) -> Option<String> {
        let language = hints.language;
        match (self.external_formatter)(code, hints) {
            Ok(formatted) => Some(formatted.into_owned()),
            Err(error) => {
                if !self.options.quiet_embedded_errors {
                    log::warn!(
                        "failed to format embedded {} code, it will be kept as is",
                        language.ext()
                    );
                }
                self.diagnostics
                    .push(FormatError::External(error, code.to_owned()));
                None
            }
        }
    }

    /// Clear per-document state once the top-level sections are assembled.
    pub(crate) fn reset(&mut self) {
        self.ignore_next = false;
        self.ignore_range = false;
        self.options_doc = None;
    }
}
