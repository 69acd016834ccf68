//! Layout IR produced by the printer.
//!
//! The printer needs to look into generated fragments (trimming lines at
//! both ends, checking emptiness), so it builds this tree first and lowers
//! it to [`tiny_pretty::Doc`] once the whole document is done.

use crate::config::LayoutOptions;
use std::borrow::Cow;
use tiny_pretty::{IndentKind, PrintOptions};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Doc<'s> {
    Text(Cow<'s, str>),
    Concat(Vec<Doc<'s>>),
    Group(Box<Doc<'s>>),
    Indent(Box<Doc<'s>>),
    /// Separators in a fill break one by one, only where the next part doesn't fit.
    Fill(Vec<Doc<'s>>),
    Line(LineKind),
    /// Forces all enclosing groups to break.
    BreakParent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LineKind {
    /// Space when the group fits.
    Line,
    /// Nothing when the group fits.
    Soft,
    /// Always breaks, then indents.
    Hard,
    /// Always breaks, without indentation.
    Literal,
}

impl<'s> Doc<'s> {
    pub(crate) fn text(text: impl Into<Cow<'s, str>>) -> Self {
        Doc::Text(text.into())
    }

    pub(crate) fn nil() -> Self {
        Doc::Text(Cow::Borrowed(""))
    }

    pub(crate) fn list(docs: Vec<Doc<'s>>) -> Self {
        Doc::Concat(docs)
    }

    pub(crate) fn fill(docs: Vec<Doc<'s>>) -> Self {
        Doc::Fill(docs)
    }

    pub(crate) fn line() -> Self {
        Doc::Line(LineKind::Line)
    }

    pub(crate) fn soft_line() -> Self {
        Doc::Line(LineKind::Soft)
    }

    pub(crate) fn hard_line() -> Self {
        Doc::Line(LineKind::Hard)
    }

    pub(crate) fn literal_line() -> Self {
        Doc::Line(LineKind::Literal)
    }

    pub(crate) fn group(self) -> Self {
        Doc::Group(Box::new(self))
    }

    pub(crate) fn indent(self) -> Self {
        Doc::Indent(Box::new(self))
    }
}

impl Default for Doc<'_> {
    fn default() -> Self {
        Doc::nil()
    }
}

/// Render the IR to text.
pub(crate) fn print(mut doc: Doc<'_>, options: &LayoutOptions) -> String {
    propagate_breaks(&mut doc);
    // the root is always in break mode
    break_lines(&mut doc);
    mark_blank_lines(&mut doc);

    tiny_pretty::print(
        &lower(doc, options.indent_width, false),
        &PrintOptions {
            indent_kind: if options.use_tabs {
                IndentKind::Tab
            } else {
                IndentKind::Space
            },
            line_break: options.line_break.clone().into(),
            width: options.print_width,
            tab_size: options.indent_width,
        },
    )
}

/// Groups containing a hard line anywhere can never be printed flat.
/// Their own lines become hard lines and the group itself is unwrapped.
fn propagate_breaks(doc: &mut Doc) -> bool {
    match doc {
        Doc::Line(LineKind::Hard | LineKind::Literal) | Doc::BreakParent => true,
        Doc::Line(..) | Doc::Text(..) => false,
        Doc::Concat(docs) | Doc::Fill(docs) => docs
            .iter_mut()
            .fold(false, |broken, doc| propagate_breaks(doc) || broken),
        Doc::Indent(inner) => propagate_breaks(inner),
        Doc::Group(inner) => {
            let broken = propagate_breaks(inner);
            if broken {
                break_lines(inner);
                let inner = std::mem::take(&mut **inner);
                *doc = inner;
            }
            broken
        }
    }
}

fn break_lines(doc: &mut Doc) {
    match doc {
        Doc::Line(kind @ (LineKind::Line | LineKind::Soft)) => *kind = LineKind::Hard,
        Doc::Concat(docs) => docs.iter_mut().for_each(break_lines),
        Doc::Indent(inner) => break_lines(inner),
        // nested groups decide by themselves and fills break per separator
        _ => {}
    }
}

/// A hard line directly followed by another line break would leave
/// indentation on an otherwise blank line.
fn mark_blank_lines(doc: &mut Doc) {
    let mut leaves = Vec::new();
    collect_leaves(doc, &mut leaves);
    for i in 0..leaves.len() {
        let followed_by_break = leaves
            .get(i + 1)
            .is_some_and(|next| matches!(**next, Doc::Line(LineKind::Hard | LineKind::Literal)));
        if followed_by_break && matches!(*leaves[i], Doc::Line(LineKind::Hard)) {
            *leaves[i] = Doc::literal_line();
        }
    }
}

fn collect_leaves<'a, 's>(doc: &'a mut Doc<'s>, leaves: &mut Vec<&'a mut Doc<'s>>) {
    let is_leaf = match doc {
        Doc::Text(text) => !text.is_empty(),
        Doc::Line(..) => true,
        _ => false,
    };
    if is_leaf {
        leaves.push(doc);
        return;
    }
    match doc {
        Doc::Concat(docs) | Doc::Fill(docs) => {
            docs.iter_mut().for_each(|doc| collect_leaves(doc, leaves));
        }
        Doc::Group(inner) | Doc::Indent(inner) => collect_leaves(inner, leaves),
        _ => {}
    }
}

fn lower(doc: Doc<'_>, indent_width: usize, in_fill: bool) -> tiny_pretty::Doc<'_> {
    match doc {
        Doc::Text(text) => tiny_pretty::Doc::text(text),
        Doc::Concat(docs) => tiny_pretty::Doc::list(
            docs.into_iter()
                .map(|doc| lower(doc, indent_width, false))
                .collect(),
        ),
        Doc::Fill(docs) => tiny_pretty::Doc::list(
            docs.into_iter()
                .map(|doc| lower(doc, indent_width, true))
                .collect(),
        ),
        Doc::Group(doc) => lower(*doc, indent_width, false).group(),
        Doc::Indent(doc) => lower(*doc, indent_width, false).nest(indent_width),
        Doc::Line(LineKind::Line) if in_fill => tiny_pretty::Doc::soft_line(),
        Doc::Line(LineKind::Line) => tiny_pretty::Doc::line_or_space(),
        Doc::Line(LineKind::Soft) => tiny_pretty::Doc::line_or_nil(),
        Doc::Line(LineKind::Hard) => tiny_pretty::Doc::hard_line(),
        Doc::Line(LineKind::Literal) => tiny_pretty::Doc::empty_line(),
        Doc::BreakParent => tiny_pretty::Doc::nil(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(doc: Doc, width: usize) -> String {
        print(
            doc,
            &LayoutOptions {
                print_width: width,
                ..Default::default()
            },
        )
    }

    #[test]
    fn group_fits_or_breaks() {
        let doc = || Doc::list(vec![Doc::text("a"), Doc::line(), Doc::text("b")]).group();
        assert_eq!(render(doc(), 80), "a b");
        assert_eq!(render(doc(), 2), "a\nb");
    }

    #[test]
    fn hard_line_breaks_enclosing_group() {
        let doc = Doc::list(vec![
            Doc::text("a"),
            Doc::line(),
            Doc::text("b"),
            Doc::list(vec![Doc::text("c"), Doc::hard_line(), Doc::text("d")]).group(),
        ])
        .group();
        assert_eq!(render(doc, 80), "a\nbc\nd");
    }

    #[test]
    fn break_parent_breaks_enclosing_group() {
        let doc = Doc::list(vec![
            Doc::text("a"),
            Doc::soft_line(),
            Doc::text("b"),
            Doc::BreakParent,
        ])
        .group();
        assert_eq!(render(doc, 80), "a\nb");
    }

    #[test]
    fn blank_lines_have_no_indentation() {
        let doc = Doc::list(vec![
            Doc::text("<div>"),
            Doc::list(vec![
                Doc::hard_line(),
                Doc::text("a"),
                Doc::hard_line(),
                Doc::hard_line(),
                Doc::text("b"),
            ])
            .indent(),
            Doc::hard_line(),
            Doc::text("</div>"),
        ]);
        assert_eq!(render(doc, 80), "<div>\n  a\n\n  b\n</div>");
    }

    #[test]
    fn literal_line_ignores_indentation() {
        let doc = Doc::list(vec![
            Doc::text("<pre>"),
            Doc::list(vec![Doc::text("a"), Doc::literal_line(), Doc::text("  b")]).indent(),
            Doc::text("</pre>"),
        ]);
        assert_eq!(render(doc, 80), "<pre>a\n  b</pre>");
    }

    #[test]
    fn fill_breaks_where_needed() {
        let doc = Doc::fill(vec![
            Doc::text("aaa"),
            Doc::line(),
            Doc::text("bbb"),
            Doc::line(),
            Doc::text("ccc"),
        ]);
        assert_eq!(render(doc, 7), "aaa bbb\nccc");
    }
}
