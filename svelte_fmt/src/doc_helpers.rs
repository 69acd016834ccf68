use crate::{
    config::LanguageOptions,
    doc::{Doc, LineKind},
};

/// Structural check, so a hard line written as `[hard_line, break_parent]`
/// counts too.
pub(crate) fn is_hard_line(doc: &Doc) -> bool {
    match doc {
        Doc::Line(LineKind::Hard) => true,
        Doc::Concat(docs) => matches!(&docs[..], [Doc::Line(LineKind::Hard), Doc::BreakParent]),
        _ => false,
    }
}

pub(crate) fn is_line(doc: &Doc) -> bool {
    matches!(doc, Doc::Line(..))
}

/// Lines which may disappear count as empty. Hard lines don't.
pub(crate) fn is_empty_doc(doc: &Doc) -> bool {
    match doc {
        Doc::Text(text) => text.is_empty(),
        Doc::Line(kind) => matches!(kind, LineKind::Line | LineKind::Soft),
        Doc::Concat(docs) | Doc::Fill(docs) => docs.iter().all(is_empty_doc),
        Doc::Group(doc) | Doc::Indent(doc) => is_empty_doc(doc),
        Doc::BreakParent => false,
    }
}

fn parts_mut<'a, 's>(doc: &'a mut Doc<'s>) -> Option<&'a mut Vec<Doc<'s>>> {
    match doc {
        Doc::Concat(docs) | Doc::Fill(docs) => Some(docs),
        Doc::Group(doc) => parts_mut(doc),
        _ => None,
    }
}

/// Remove leading docs matching the predicate. When the removed run was
/// empty, or nothing could be removed at this level, continue with the
/// parts of the first doc.
pub(crate) fn trim_left(docs: &mut Vec<Doc>, is_whitespace: &dyn Fn(&Doc) -> bool) {
    let first = docs
        .iter()
        .position(|doc| !is_whitespace(doc))
        .unwrap_or(docs.len());
    if first > 0 {
        let all_empty = docs.drain(..first).all(|doc| is_empty_doc(&doc));
        if all_empty {
            trim_left(docs, is_whitespace);
        }
    } else if let Some(parts) = docs.first_mut().and_then(parts_mut) {
        trim_left(parts, is_whitespace);
    }
}

pub(crate) fn trim_right(docs: &mut Vec<Doc>, is_whitespace: &dyn Fn(&Doc) -> bool) {
    let keep = docs
        .iter()
        .rposition(|doc| !is_whitespace(doc))
        .map_or(0, |i| i + 1);
    if keep < docs.len() {
        let all_empty = docs.drain(keep..).all(|doc| is_empty_doc(&doc));
        if all_empty {
            trim_right(docs, is_whitespace);
        }
    } else if let Some(parts) = docs.last_mut().and_then(parts_mut) {
        trim_right(parts, is_whitespace);
    }
}

pub(crate) fn trim(docs: &mut Vec<Doc>, is_whitespace: &dyn Fn(&Doc) -> bool) {
    trim_left(docs, is_whitespace);
    trim_right(docs, is_whitespace);
}

/// Strip a leading `(` and a trailing `)` text doc.
pub(crate) fn remove_parentheses(doc: Doc) -> Doc {
    let mut docs = vec![doc];
    trim(
        &mut docs,
        &|doc: &Doc| matches!(doc, Doc::Text(text) if &**text == "(" || &**text == ")"),
    );
    docs.pop().unwrap_or_default()
}

/// Turn soft and normal lines into nothing and spaces.
pub(crate) fn remove_lines(doc: Doc) -> Doc {
    match doc {
        Doc::Line(LineKind::Line) => Doc::text(" "),
        Doc::Line(LineKind::Soft) => Doc::nil(),
        Doc::Concat(docs) => Doc::Concat(docs.into_iter().map(remove_lines).collect()),
        Doc::Fill(docs) => Doc::Fill(docs.into_iter().map(remove_lines).collect()),
        Doc::Group(doc) => remove_lines(*doc).group(),
        Doc::Indent(doc) => remove_lines(*doc).indent(),
        doc => doc,
    }
}

/// Separator put before each attribute.
pub(crate) fn get_attribute_line<'s>(options: &LanguageOptions, attrs_count: usize) -> Doc<'s> {
    if options.single_attribute_per_line && attrs_count > 1 {
        Doc::hard_line()
    } else {
        Doc::line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_whitespace(doc: &Doc) -> bool {
        is_line(doc) || matches!(doc, Doc::Text(text) if text.trim().is_empty())
    }

    #[test]
    fn hard_line_structural() {
        assert!(is_hard_line(&Doc::hard_line()));
        assert!(is_hard_line(&Doc::list(vec![Doc::hard_line(), Doc::BreakParent])));
        assert!(!is_hard_line(&Doc::line()));
        assert!(!is_hard_line(&Doc::list(vec![Doc::hard_line()])));
    }

    #[test]
    fn empty_docs() {
        assert!(is_empty_doc(&Doc::nil()));
        assert!(is_empty_doc(&Doc::soft_line()));
        assert!(is_empty_doc(&Doc::list(vec![Doc::line(), Doc::nil()]).group()));
        assert!(!is_empty_doc(&Doc::hard_line()));
        assert!(!is_empty_doc(&Doc::text("a")));
        assert!(!is_empty_doc(&Doc::BreakParent));
    }

    #[test]
    fn trim_nested() {
        let mut docs = vec![
            Doc::line(),
            Doc::list(vec![Doc::soft_line(), Doc::text("a"), Doc::line()]),
            Doc::nil(),
        ];
        trim(&mut docs, &is_whitespace);
        assert_eq!(docs, vec![Doc::list(vec![Doc::text("a")])]);
    }

    #[test]
    fn trim_stops_at_hard_line() {
        let mut docs = vec![
            Doc::list(vec![Doc::text("a"), Doc::line()]),
            Doc::hard_line(),
        ];
        trim_right(&mut docs, &is_whitespace);
        assert_eq!(docs, vec![Doc::list(vec![Doc::text("a"), Doc::line()])]);
    }

    #[test]
    fn trim_everything() {
        let mut docs = vec![Doc::line(), Doc::text("")];
        trim_left(&mut docs, &is_whitespace);
        assert!(docs.is_empty());
    }

    #[test]
    fn parentheses() {
        let doc = Doc::list(vec![
            Doc::text("("),
            Doc::hard_line(),
            Doc::text("a = b"),
            Doc::hard_line(),
            Doc::text(")"),
        ]);
        assert_eq!(
            remove_parentheses(doc),
            Doc::list(vec![Doc::hard_line(), Doc::text("a = b"), Doc::hard_line()])
        );
        assert_eq!(remove_parentheses(Doc::text("a")), Doc::text("a"));
    }

    #[test]
    fn single_line() {
        let doc = Doc::list(vec![
            Doc::text("a"),
            Doc::line(),
            Doc::text("b"),
            Doc::soft_line(),
            Doc::hard_line(),
        ])
        .group();
        assert_eq!(
            remove_lines(doc),
            Doc::list(vec![
                Doc::text("a"),
                Doc::text(" "),
                Doc::text("b"),
                Doc::nil(),
                Doc::hard_line(),
            ])
            .group()
        );
    }

    #[test]
    fn attribute_line() {
        let mut options = LanguageOptions::default();
        assert_eq!(get_attribute_line(&options, 3), Doc::line());
        options.single_attribute_per_line = true;
        assert_eq!(get_attribute_line(&options, 1), Doc::line());
        assert_eq!(get_attribute_line(&options, 2), Doc::hard_line());
    }
}
