use std::{borrow::Cow, error::Error, fmt};

#[derive(Clone, Debug)]
/// Syntax error when parsing the component template.
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub start: usize,
    pub end: usize,
}

#[derive(Clone, Debug)]
pub enum SyntaxErrorKind {
    DuplicateScript,
    DuplicateStyle,
    ExpectAttrName,
    ExpectAttrValue,
    ExpectChar(char),
    ExpectCloseTag(String),
    ExpectComment,
    ExpectElement,
    ExpectExpression,
    ExpectIdentifier,
    ExpectSelfCloseTag,
    ExpectSvelteBlockEnd(&'static str),
    ExpectTagName,
    ExpectTextNode,
    UnexpectedBlockBranch(String),
    UnexpectedCloseTag(String),
    UnknownSvelteBlock(String),
    UnknownSvelteTag(String),
    UnterminatedExpression,
}

impl SyntaxError {
    /// Convert the start offset into a one-based `(line, column)` pair,
    /// counting columns in characters.
    pub fn location(&self, source: &str) -> (usize, usize) {
        let offset = self.start.min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line = memchr::memchr_iter(b'\n', before.as_bytes()).count() + 1;
        let column = before
            .rfind('\n')
            .map_or(before, |i| &before[i + 1..])
            .chars()
            .count()
            + 1;
        (line, column)
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason: Cow<_> = match &self.kind {
            SyntaxErrorKind::DuplicateScript => {
                "a component can only have one instance-level and one module-level <script>".into()
            }
            SyntaxErrorKind::DuplicateStyle => "a component can only have one <style>".into(),
            SyntaxErrorKind::ExpectAttrName => "expect attribute name".into(),
            SyntaxErrorKind::ExpectAttrValue => "expect attribute value".into(),
            SyntaxErrorKind::ExpectChar(c) => format!("expect char '{c}'").into(),
            SyntaxErrorKind::ExpectCloseTag(name) => format!("expect close tag </{name}>").into(),
            SyntaxErrorKind::ExpectComment => "expect comment".into(),
            SyntaxErrorKind::ExpectElement => "expect element".into(),
            SyntaxErrorKind::ExpectExpression => "expect expression".into(),
            SyntaxErrorKind::ExpectIdentifier => "expect identifier".into(),
            SyntaxErrorKind::ExpectSelfCloseTag => "expect self close tag".into(),
            SyntaxErrorKind::ExpectSvelteBlockEnd(block) => {
                format!("expect end of block '{{/{block}}}'").into()
            }
            SyntaxErrorKind::ExpectTagName => "expect tag name".into(),
            SyntaxErrorKind::ExpectTextNode => "expect text node".into(),
            SyntaxErrorKind::UnexpectedBlockBranch(branch) => {
                format!("unexpected block branch '{{:{branch}}}'").into()
            }
            SyntaxErrorKind::UnexpectedCloseTag(name) => {
                format!("unexpected close tag </{name}>").into()
            }
            SyntaxErrorKind::UnknownSvelteBlock(name) => {
                format!("unknown block '{{#{name}}}'").into()
            }
            SyntaxErrorKind::UnknownSvelteTag(name) => format!("unknown tag '{{@{name}}}'").into(),
            SyntaxErrorKind::UnterminatedExpression => "unterminated expression".into(),
        };

        write!(
            f,
            "syntax error '{reason}' at position {}..{}",
            self.start, self.end
        )
    }
}

impl Error for SyntaxError {}

#[derive(Debug)]
/// The error type for svelte_fmt.
pub enum FormatError<E> {
    /// Syntax error when parsing the template.
    Syntax(SyntaxError),
    /// Error from external formatter, for example,
    /// there're errors when formatting the `<script>` or `<style>` tag.
    ///
    /// This is never returned from [`format_text`](crate::format_text);
    /// it is reported as a diagnostic and the region is kept verbatim.
    External(E, String),
}

impl<E> fmt::Display for FormatError<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::Syntax(e) => e.fmt(f),
            FormatError::External(e, code) => write!(
                f,
                "failed to format code with external formatter: `{code}`:\n{e}"
            ),
        }
    }
}

impl<E> Error for FormatError<E> where E: Error {}

impl<E> From<SyntaxError> for FormatError<E> {
    fn from(value: SyntaxError) -> Self {
        FormatError::Syntax(value)
    }
}
