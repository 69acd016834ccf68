//! Code that is formatted by the external formatter:
//! script expressions inside the template, and bodies of
//! `<script>`, `<style>` and pug `<template>` tags.

use crate::{
    ast::*,
    config::SortOrder,
    ctx::{Ctx, EmbeddedLanguage, Hints},
    doc::Doc,
    doc_helpers,
    helpers,
    printer::DocGen,
    snip,
    state::State,
};
use std::borrow::Cow;

#[derive(Clone, Copy, Default)]
pub(crate) struct ExprFlags {
    pub(crate) force_single_quote: bool,
    /// Used by directives, whose expressions must stay on the tag line.
    pub(crate) force_single_line: bool,
    pub(crate) remove_parentheses: bool,
}

/// Body of a `<script>`, `<style>` or pug `<template>` tag.
pub(crate) struct EmbedTag<'a, 's> {
    pub(crate) name: &'s str,
    pub(crate) attrs: &'a mut [Attribute<'s>],
    /// Text between the tags, used when the body wasn't snipped.
    pub(crate) body: &'s str,
    pub(crate) comments: &'a [RelocatedComment<'s>],
    /// Printed as a top-level section of its own.
    pub(crate) section: bool,
}

impl<'s, E, F> Ctx<'_, 's, E, F>
where
    F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
{
    pub(crate) fn format_expr(&mut self, raw: &str, flags: ExprFlags) -> Doc<'s> {
        let code = snip::unsnip(raw.trim());
        if code.is_empty() {
            return Doc::nil();
        }

        // The line break keeps a trailing line comment from swallowing `)`.
        let wrapped = format!("({code}\n)");
        let hints = self.hints(EmbeddedLanguage::Expression, flags.force_single_quote);
        let formatted = match self.format_with_external_formatter(&wrapped, hints) {
            Some(formatted) => {
                let formatted = formatted.trim().trim_end_matches(';').trim_end();
                strip_wrapping_parentheses(formatted).trim().to_owned()
            }
            None => code.into_owned(),
        };

        let to_doc = |code: &str| {
            if flags.force_single_line {
                doc_helpers::remove_lines(Doc::text(join_lines(code)))
            } else {
                text_to_doc(code.to_owned())
            }
        };
        let inner = strip_wrapping_parentheses(&formatted);
        let doc = if inner.len() < formatted.len() {
            Doc::list(vec![Doc::text("("), to_doc(inner.trim()), Doc::text(")")])
        } else {
            to_doc(&formatted)
        };
        if flags.remove_parentheses {
            doc_helpers::remove_parentheses(doc)
        } else {
            doc
        }
    }

    /// Parameter list of a snippet, without the parentheses.
    pub(crate) fn format_params(&mut self, params: &[Expr<'s>]) -> Doc<'s> {
        let code = params.iter().map(|param| param.raw.trim()).collect::<Vec<_>>().join(", ");
        if code.is_empty() {
            return Doc::nil();
        }

        let wrapped = format!("({code}) => {{}}");
        let hints = self.hints(EmbeddedLanguage::Expression, false);
        let formatted = self
            .format_with_external_formatter(&wrapped, hints)
            .and_then(|formatted| {
                formatted
                    .trim()
                    .trim_end_matches(';')
                    .trim_end()
                    .strip_prefix('(')
                    .and_then(|s| s.strip_suffix(") => {}"))
                    .map(|s| s.trim().to_owned())
            })
            .unwrap_or(code);
        text_to_doc(formatted)
    }

    pub(crate) fn embed_tag(&mut self, tag: EmbedTag<'_, 's>, state: &State<'s>) -> Doc<'s> {
        let EmbedTag {
            name,
            attrs,
            body,
            comments,
            section,
        } = tag;

        let content: Cow<str> = attrs
            .iter()
            .find_map(|attr| match attr {
                Attribute::Attribute(attr) if attr.name == snip::SNIPPED_TAG_CONTENT_ATTRIBUTE => {
                    helpers::attribute_text_value(attr).and_then(snip::snipped_content)
                }
                _ => None,
            })
            .map_or(Cow::from(body), Cow::from);

        let is_template = name == "template";
        let can_format = helpers::is_node_supported_language(attrs)
            && !helpers::is_ignore_directive(comments.last().map(|comment| &comment.comment))
            && (!is_template || self.options.pug_formatter);

        let body = if can_format {
            if !content.trim().is_empty() {
                let language = if is_template {
                    EmbeddedLanguage::Pug
                } else if name == "style" {
                    style_language(attrs)
                } else {
                    script_language(attrs)
                };
                self.format_body_content(&content, language)
            } else if content.is_empty() {
                Doc::nil()
            } else {
                Doc::hard_line()
            }
        } else {
            preformatted_body(&content)
        };

        let attrs_count = attrs
            .iter()
            .filter(|attr| !is_snipped_content_attr(attr))
            .count();
        let attr_line = doc_helpers::get_attribute_line(self.options, attrs_count);
        let attrs = attrs
            .iter_mut()
            .filter(|attr| !is_snipped_content_attr(attr))
            .flat_map(|attr| [attr_line.clone(), attr.doc(self, state)])
            .collect();
        let opening_tag = Doc::list(vec![
            Doc::text("<"),
            Doc::text(name),
            Doc::list(vec![
                Doc::list(attrs).indent(),
                if self.options.bracket_same_line() {
                    Doc::nil()
                } else {
                    Doc::soft_line()
                },
            ])
            .group(),
            Doc::text(">"),
        ])
        .group();

        let result = Doc::list(vec![opening_tag, body, Doc::text(format!("</{name}>"))]).group();

        let mut docs = Vec::with_capacity(comments.len() * 4 + 2);
        comments.iter().for_each(|comment| {
            docs.push(Doc::text("<!--"));
            docs.extend(literal_lines(snip::unsnip(comment.comment.data)));
            docs.push(Doc::text("-->"));
            docs.push(Doc::hard_line());
            if comment.empty_line_after {
                docs.push(Doc::hard_line());
            }
        });
        docs.push(result);
        if section && self.options.sort_order != SortOrder::None {
            docs.push(Doc::hard_line());
        }
        Doc::list(docs)
    }

    fn format_body_content(&mut self, content: &str, language: EmbeddedLanguage) -> Doc<'s> {
        let indent_body = self.options.indent_script_and_style;
        let indent_width = if indent_body { self.indent_width } else { 0 };
        self.indent_level += indent_width;
        let hints = self.hints(language, false);
        let formatted = self.format_with_external_formatter(content, hints);
        self.indent_level -= indent_width;

        let Some(formatted) = formatted else {
            return preformatted_body(content);
        };
        let formatted = formatted.trim_start_matches(['\n', '\r']).trim_end();

        if language == EmbeddedLanguage::Pug {
            // pug is whitespace-sensitive, so its lines can't be reindented
            let unit = if self.use_tabs {
                "\t".to_owned()
            } else {
                " ".repeat(self.indent_width)
            };
            let levels = self.indent_level / self.indent_width.max(1) + usize::from(indent_body);
            let prefix = unit.repeat(levels);
            let mut docs = formatted
                .lines()
                .flat_map(|line| {
                    [
                        Doc::literal_line(),
                        if line.trim().is_empty() {
                            Doc::nil()
                        } else {
                            Doc::text(format!("{prefix}{line}"))
                        },
                    ]
                })
                .collect::<Vec<_>>();
            docs.push(Doc::hard_line());
            return Doc::list(docs);
        }

        let mut docs = vec![Doc::hard_line(), text_to_doc(formatted.to_owned())];
        doc_helpers::trim_right(&mut docs, &doc_helpers::is_line);
        let body = Doc::list(docs);
        Doc::list(vec![
            if indent_body { body.indent() } else { body },
            Doc::hard_line(),
        ])
    }
}

fn is_snipped_content_attr(attr: &Attribute) -> bool {
    matches!(attr, Attribute::Attribute(attr) if attr.name == snip::SNIPPED_TAG_CONTENT_ATTRIBUTE)
}

/// Body kept as it is, because it can't or mustn't be formatted.
pub(crate) fn preformatted_body<'s>(content: &str) -> Doc<'s> {
    if content.is_empty() {
        return Doc::nil();
    }
    let content = strip_leading_blank_line(content);
    let content = strip_trailing_blank_line(content);

    let mut docs = vec![Doc::literal_line()];
    docs.extend(literal_lines(content.to_owned()));
    docs.push(Doc::hard_line());
    Doc::list(docs)
}

fn strip_leading_blank_line(s: &str) -> &str {
    let trimmed = s.trim_start_matches(['\t', '\x0c', '\r', ' ']);
    trimmed.strip_prefix('\n').unwrap_or(s)
}

fn strip_trailing_blank_line(s: &str) -> &str {
    let trimmed = s.trim_end_matches(['\t', '\x0c', '\r', ' ']);
    trimmed.strip_suffix('\n').unwrap_or(s)
}

/// Lines of text joined by literal lines, so they keep their own indentation.
pub(crate) fn literal_lines<'s>(text: impl Into<Cow<'s, str>>) -> Vec<Doc<'s>> {
    fn split(text: &str) -> impl Iterator<Item = &str> {
        text.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line))
    }

    let mut docs = vec![];
    match text.into() {
        Cow::Borrowed(text) => split(text).enumerate().for_each(|(i, line)| {
            if i > 0 {
                docs.push(Doc::literal_line());
            }
            docs.push(Doc::text(line));
        }),
        Cow::Owned(text) => split(&text).enumerate().for_each(|(i, line)| {
            if i > 0 {
                docs.push(Doc::literal_line());
            }
            docs.push(Doc::text(line.to_owned()));
        }),
    }
    docs
}

/// Formatted code as lines that follow the indentation of where they're placed.
pub(crate) fn text_to_doc<'s>(text: String) -> Doc<'s> {
    let mut lines = text.lines();
    let mut docs = vec![];
    if let Some(first) = lines.next() {
        docs.push(Doc::text(first.to_owned()));
    }
    lines.for_each(|line| {
        if line.trim().is_empty() {
            docs.push(Doc::literal_line());
        } else {
            docs.push(Doc::hard_line());
            docs.push(Doc::text(line.to_owned()));
        }
    });
    match docs.len() {
        0 => Doc::nil(),
        1 => docs.pop().unwrap_or_default(),
        _ => Doc::list(docs),
    }
}

/// Lines are joined with spaces, unless a line comment would swallow the rest.
fn join_lines(code: &str) -> String {
    if code.lines().any(|line| line.contains("//")) {
        code.to_owned()
    } else {
        code.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Remove one pair of parentheses wrapping the whole code.
fn strip_wrapping_parentheses(code: &str) -> &str {
    let Some(inner) = code
        .strip_prefix('(')
        .and_then(|code| code.strip_suffix(')'))
    else {
        return code;
    };

    let mut depth = 0usize;
    let mut quote = None;
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if c == '\\' {
                chars.next();
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '(' => depth += 1,
            ')' if depth == 0 => return code,
            ')' => depth -= 1,
            _ => {}
        }
    }
    inner
}

pub(crate) fn script_language(attrs: &[Attribute]) -> EmbeddedLanguage {
    match helpers::lang_attribute(attrs) {
        Some("ts" | "typescript") => EmbeddedLanguage::TypeScript,
        Some("json" | "application/json" | "application/ld+json" | "importmap") => {
            EmbeddedLanguage::Json
        }
        _ => EmbeddedLanguage::BabelTs,
    }
}

pub(crate) fn style_language(attrs: &[Attribute]) -> EmbeddedLanguage {
    match helpers::lang_attribute(attrs) {
        Some("less") => EmbeddedLanguage::Less,
        Some("scss") => EmbeddedLanguage::Scss,
        _ => EmbeddedLanguage::Css,
    }
}

/// Move comments in front of top-level `<script>` and `<style>` tags
/// out of the markup, so they travel with the tag when sections are sorted.
pub(crate) fn assign_comments_to_nodes(root: &mut Root) {
    let Root {
        html,
        instance,
        module,
        css,
    } = root;

    let mut relocated_spans = vec![];
    let targets = module
        .iter_mut()
        .map(|script| (script.span, &mut script.comments))
        .chain(
            instance
                .iter_mut()
                .map(|script| (script.span, &mut script.comments)),
        )
        .chain(css.iter_mut().map(|style| (style.span, &mut style.comments)));
    for (span, target) in targets {
        let Some(index) = html
            .children
            .iter()
            .position(|child| child.span().end == span.start)
        else {
            continue;
        };

        let mut comments = vec![];
        let mut newlines: Vec<&str> = vec![];
        for child in html.children[..=index].iter().rev() {
            match child {
                Node::Comment(comment)
                    if !helpers::is_ignore_start_directive(comment)
                        && !helpers::is_ignore_end_directive(comment) =>
                {
                    comments.push(comment);
                    if comments.len() != newlines.len() {
                        newlines.push("");
                    }
                }
                Node::Text(text) if helpers::is_empty_text(&text.raw) => newlines.push(&text.raw),
                _ => break,
            }
        }
        // both lists are nearest first here
        newlines.truncate(comments.len());
        comments.reverse();
        newlines.reverse();

        *target = comments
            .iter()
            .enumerate()
            .map(|(i, comment)| RelocatedComment {
                comment: (*comment).clone(),
                empty_line_after: newlines
                    .get(i)
                    .is_some_and(|text| text.split('\n').count() > 2),
            })
            .collect();
        relocated_spans.extend(comments.iter().map(|comment| comment.span));
    }

    if !relocated_spans.is_empty() {
        log::debug!("moved {} comment(s) onto top-level tags", relocated_spans.len());
        html.children.retain(|child| {
            !matches!(child, Node::Comment(comment) if relocated_spans.contains(&comment.span))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    #[test]
    fn wrapping_parentheses() {
        assert_eq!(strip_wrapping_parentheses("(a + b)"), "a + b");
        assert_eq!(strip_wrapping_parentheses("(a) + (b)"), "(a) + (b)");
        assert_eq!(strip_wrapping_parentheses("(')')"), "')'");
        assert_eq!(strip_wrapping_parentheses("a"), "a");
    }

    #[test]
    fn single_line_expression() {
        assert_eq!(join_lines("() => {\n  a();\n}"), "() => { a(); }");
        assert_eq!(join_lines("a // b\n+ c"), "a // b\n+ c");
    }

    #[test]
    fn formatted_text_lines() {
        assert_eq!(text_to_doc("a".into()), Doc::text("a"));
        assert_eq!(
            text_to_doc("a\n\n  b".into()),
            Doc::list(vec![
                Doc::text("a"),
                Doc::literal_line(),
                Doc::hard_line(),
                Doc::text("  b"),
            ])
        );
        assert_eq!(text_to_doc(String::new()), Doc::nil());
    }

    #[test]
    fn blank_lines_around_preformatted_body() {
        assert_eq!(
            preformatted_body("\n  a\n"),
            Doc::list(vec![Doc::literal_line(), Doc::text("  a"), Doc::hard_line()])
        );
        assert_eq!(preformatted_body(""), Doc::nil());
    }

    #[test]
    fn grammar_selection() {
        let source = r#"<svelte:head><script type="application/ld+json"></script></svelte:head><script lang="ts"></script><style lang="scss"></style>"#;
        let root = match Parser::new(source).parse_root() {
            Ok(root) => root,
            Err(error) => panic!("{error}"),
        };
        let Node::Element(head) = &root.html.children[0] else {
            panic!("expected svelte:head");
        };
        let Some(Node::Element(json)) = head.children.first() else {
            panic!("expected nested script to stay in markup");
        };
        assert_eq!(script_language(&json.attrs), EmbeddedLanguage::Json);
        assert_eq!(
            root.instance.as_ref().map(|s| script_language(&s.attrs)),
            Some(EmbeddedLanguage::TypeScript)
        );
        assert_eq!(
            root.css.as_ref().map(|s| style_language(&s.attrs)),
            Some(EmbeddedLanguage::Scss)
        );
        assert_eq!(script_language(&[]), EmbeddedLanguage::BabelTs);
        assert_eq!(style_language(&[]), EmbeddedLanguage::Css);
    }

    #[test]
    fn comments_move_onto_script() {
        let source = "<div />\n<!-- a -->\n\n<!-- b -->\n<script>let a;</script>";
        let mut root = match Parser::new(source).parse_root() {
            Ok(root) => root,
            Err(error) => panic!("{error}"),
        };
        assign_comments_to_nodes(&mut root);
        let comments = root
            .instance
            .as_ref()
            .map(|script| {
                script
                    .comments
                    .iter()
                    .map(|c| (c.comment.data, c.empty_line_after))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        assert_eq!(comments, [(" a ", true), (" b ", false)]);
        assert!(
            !root
                .html
                .children
                .iter()
                .any(|child| matches!(child, Node::Comment(..)))
        );
    }

    #[test]
    fn comments_stop_at_content() {
        let source = "<!-- a -->\ntext\n<style></style>";
        let mut root = match Parser::new(source).parse_root() {
            Ok(root) => root,
            Err(error) => panic!("{error}"),
        };
        assign_comments_to_nodes(&mut root);
        assert!(root.css.as_ref().is_some_and(|style| style.comments.is_empty()));
        assert!(matches!(root.html.children[0], Node::Comment(..)));
    }
}
