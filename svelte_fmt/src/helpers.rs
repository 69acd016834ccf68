use crate::{
    ast::*,
    config::{LanguageOptions, WhitespaceSensitivity},
    state::State,
};
use std::borrow::Cow;

static BLOCK_ELEMENTS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "details",
    "dialog",
    "dd",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hgroup",
    "hr",
    "li",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "ul",
];

static VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

static UNSUPPORTED_LANGUAGES: &[&str] = &["coffee", "coffeescript", "styl", "stylus", "sass"];

pub(crate) fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

pub(crate) fn is_doctype(name: &str) -> bool {
    name.eq_ignore_ascii_case("!doctype")
}

pub(crate) fn is_block_element(node: &Node, options: &LanguageOptions) -> bool {
    if let Node::Element(element) = node {
        is_block_element_tag(element, options)
    } else {
        false
    }
}

pub(crate) fn is_block_element_tag(element: &Element, options: &LanguageOptions) -> bool {
    element.kind == ElementKind::Element
        && match options.whitespace_sensitivity {
            WhitespaceSensitivity::Strict => false,
            WhitespaceSensitivity::Ignore => true,
            WhitespaceSensitivity::Css => BLOCK_ELEMENTS.contains(&element.name),
        }
}

pub(crate) fn is_inline_element(state: &State, options: &LanguageOptions, node: &Node) -> bool {
    match node {
        Node::Element(element) => is_inline_element_tag(state, options, element),
        _ => false,
    }
}

pub(crate) fn is_inline_element_tag(
    state: &State,
    options: &LanguageOptions,
    element: &Element,
) -> bool {
    element.kind == ElementKind::Element
        && !is_block_element_tag(element, options)
        && !state.is_pre_tag_content()
}

fn is_linebreak_whitespace(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\x0c' | '\r' | ' ')
}

/// Whether text starts with at least `n` line breaks,
/// with only tabs, spaces, form feeds and carriage returns around them.
pub(crate) fn starts_with_linebreak(text: &str, n: usize) -> bool {
    text.chars()
        .take_while(|c| is_linebreak_whitespace(*c))
        .filter(|c| *c == '\n')
        .count()
        >= n
}

pub(crate) fn ends_with_linebreak(text: &str, n: usize) -> bool {
    text.chars()
        .rev()
        .take_while(|c| is_linebreak_whitespace(*c))
        .filter(|c| *c == '\n')
        .count()
        >= n
}

pub(crate) fn is_empty_text(text: &str) -> bool {
    text.trim().is_empty()
}

pub(crate) fn is_empty_text_node(node: &Node) -> bool {
    node.as_text().is_some_and(|text| is_empty_text(&text.raw))
}

pub(crate) fn is_text_node_starting_with_whitespace(node: &Node) -> bool {
    node.as_text()
        .is_some_and(|text| text.raw.starts_with(char::is_whitespace))
}

pub(crate) fn is_text_node_ending_with_whitespace(node: &Node) -> bool {
    node.as_text()
        .is_some_and(|text| text.raw.ends_with(char::is_whitespace))
}

pub(crate) fn is_text_node_starting_with_linebreak(node: &Node, n: usize) -> bool {
    node.as_text()
        .is_some_and(|text| starts_with_linebreak(&text.raw, n))
}

pub(crate) fn is_text_node_ending_with_linebreak(node: &Node, n: usize) -> bool {
    node.as_text()
        .is_some_and(|text| ends_with_linebreak(&text.raw, n))
}

pub(crate) fn trim_text_node_left(node: &mut Node) {
    if let Node::Text(text) = node {
        text.raw = match std::mem::take(&mut text.raw) {
            Cow::Borrowed(raw) => Cow::Borrowed(raw.trim_start()),
            Cow::Owned(raw) => Cow::Owned(raw.trim_start().to_owned()),
        };
    }
}

pub(crate) fn trim_text_node_right(node: &mut Node) {
    if let Node::Text(text) = node {
        text.raw = match std::mem::take(&mut text.raw) {
            Cow::Borrowed(raw) => Cow::Borrowed(raw.trim_end()),
            Cow::Owned(mut raw) => {
                raw.truncate(raw.trim_end().len());
                Cow::Owned(raw)
            }
        };
    }
}

pub(crate) fn is_ignore_directive(comment: Option<&Comment>) -> bool {
    comment.is_some_and(|comment| comment.data.trim() == "prettier-ignore")
}

pub(crate) fn is_ignore_start_directive(comment: &Comment) -> bool {
    comment.data.trim() == "prettier-ignore-start"
}

pub(crate) fn is_ignore_end_directive(comment: &Comment) -> bool {
    comment.data.trim() == "prettier-ignore-end"
}

/// Text of an attribute value which consists of plain text only.
pub(crate) fn attribute_text_value<'a>(attr: &'a NativeAttribute) -> Option<&'a str> {
    match &attr.value {
        AttributeValue::Parts(parts) => match &parts[..] {
            [] => Some(""),
            [AttributeValuePart::Text(text)] => Some(&text.raw),
            _ => None,
        },
        AttributeValue::True => None,
    }
}

fn find_native_attr<'a, 's>(attrs: &'a [Attribute<'s>], name: &str) -> Option<&'a NativeAttribute<'s>> {
    attrs.iter().find_map(|attr| match attr {
        Attribute::Attribute(native) if native.name == name => Some(native),
        _ => None,
    })
}

/// Value of the `lang` attribute, falling back to `type`, without `text/` prefix.
pub(crate) fn lang_attribute<'a>(attrs: &'a [Attribute]) -> Option<&'a str> {
    let value = find_native_attr(attrs, "lang")
        .or_else(|| find_native_attr(attrs, "type"))
        .and_then(attribute_text_value)?;
    if value.is_empty() {
        None
    } else {
        Some(value.strip_prefix("text/").unwrap_or(value))
    }
}

pub(crate) fn is_node_supported_language(attrs: &[Attribute]) -> bool {
    !lang_attribute(attrs).is_some_and(|lang| UNSUPPORTED_LANGUAGES.contains(&lang))
}

pub(crate) fn is_pug_template(element: &Element) -> bool {
    element.kind == ElementKind::Element
        && element.name == "template"
        && lang_attribute(&element.attrs) == Some("pug")
}

pub(crate) fn is_lone_mustache_tag(value: &AttributeValue) -> bool {
    matches!(value, AttributeValue::Parts(parts) if matches!(&parts[..], [AttributeValuePart::MustacheTag(..)]))
}

/// Whether `name={name}` may be written as `{name}`.
pub(crate) fn is_or_can_be_converted_to_shorthand(name: &str, value: &AttributeValue) -> bool {
    match value {
        AttributeValue::Parts(parts) => match &parts[..] {
            [AttributeValuePart::AttributeShorthand(..)] => true,
            [AttributeValuePart::MustacheTag(tag)] => tag.expr.raw.trim() == name,
            _ => false,
        },
        AttributeValue::True => false,
    }
}

pub(crate) fn should_hug_start(
    element: &Element,
    is_supported_language: bool,
    options: &LanguageOptions,
) -> bool {
    if !is_supported_language {
        return true;
    }
    if is_block_element_tag(element, options) {
        return false;
    }
    match element.children.first() {
        None => true,
        Some(..) if options.whitespace_sensitivity == WhitespaceSensitivity::Ignore => false,
        Some(first) => !is_text_node_starting_with_whitespace(first),
    }
}

pub(crate) fn should_hug_end(
    element: &Element,
    is_supported_language: bool,
    options: &LanguageOptions,
) -> bool {
    if !is_supported_language {
        return true;
    }
    if is_block_element_tag(element, options) {
        return false;
    }
    match element.children.last() {
        None => true,
        Some(..) if options.whitespace_sensitivity == WhitespaceSensitivity::Ignore => false,
        Some(last) => !is_text_node_ending_with_whitespace(last),
    }
}

/// Whether the source right after the node continues without whitespace.
pub(crate) fn hugs_start_of_next_node(span: Span, source: &str) -> bool {
    source
        .get(span.end..)
        .is_some_and(|rest| !rest.is_empty() && !rest.starts_with(char::is_whitespace))
}

pub(crate) fn can_omit_softline_before_closing_tag(
    span: Span,
    source: &str,
    state: &State,
    options: &LanguageOptions,
) -> bool {
    options.bracket_same_line()
        && (!hugs_start_of_next_node(span, source)
            || state.parent_is_block_element && state.is_last_child)
}

/// Whether the document starts with a `@format` or `@prettier` pragma comment.
pub(crate) fn has_pragma(source: &str) -> bool {
    source
        .trim_start()
        .strip_prefix("<!--")
        .map(str::trim_start)
        .and_then(|rest| {
            rest.strip_prefix("@format")
                .or_else(|| rest.strip_prefix("@prettier"))
        })
        .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
}

pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(raw: &str) -> Node<'_> {
        Node::Text(TextNode {
            span: Span::new(0, raw.len()),
            raw: Cow::from(raw),
        })
    }

    fn element<'s>(name: &'s str, children: Vec<Node<'s>>) -> Element<'s> {
        Element {
            span: Span::default(),
            kind: ElementKind::Element,
            name,
            this: None,
            attrs: vec![],
            children,
            self_closing: false,
        }
    }

    fn lang<'s>(name: &'s str, value: &'s str) -> Attribute<'s> {
        Attribute::Attribute(NativeAttribute {
            span: Span::default(),
            name,
            value: AttributeValue::Parts(vec![AttributeValuePart::Text(TextNode {
                span: Span::default(),
                raw: Cow::from(value),
            })]),
        })
    }

    #[test]
    fn linebreaks() {
        assert!(starts_with_linebreak(" \t\n  a", 1));
        assert!(!starts_with_linebreak(" \t\n  a", 2));
        assert!(starts_with_linebreak("\n\r\n a", 2));
        assert!(!starts_with_linebreak("a\n", 1));
        assert!(ends_with_linebreak("a \n\n\t", 2));
        assert!(!ends_with_linebreak("a \n", 2));
        assert!(!ends_with_linebreak("\na", 1));
    }

    #[test]
    fn text_node_predicates() {
        assert!(is_empty_text_node(&text(" \n\t ")));
        assert!(!is_empty_text_node(&text(" a ")));
        assert!(is_text_node_starting_with_whitespace(&text(" a")));
        assert!(!is_text_node_ending_with_whitespace(&text(" a")));
        assert!(is_text_node_starting_with_linebreak(&text("\n a"), 1));
        assert!(is_text_node_ending_with_linebreak(&text("a\n\n"), 2));
    }

    #[test]
    fn trim_text_node() {
        let mut node = text("  a b \n");
        trim_text_node_left(&mut node);
        assert_eq!(node.as_text().map(|t| &*t.raw), Some("a b \n"));
        trim_text_node_right(&mut node);
        assert_eq!(node.as_text().map(|t| &*t.raw), Some("a b"));
    }

    #[test]
    fn block_elements_by_sensitivity() {
        let mut options = LanguageOptions::default();
        let div = Node::Element(element("div", vec![]));
        let span = Node::Element(element("span", vec![]));
        assert!(is_block_element(&div, &options));
        assert!(!is_block_element(&span, &options));
        options.whitespace_sensitivity = WhitespaceSensitivity::Ignore;
        assert!(is_block_element(&span, &options));
        options.whitespace_sensitivity = WhitespaceSensitivity::Strict;
        assert!(!is_block_element(&div, &options));
    }

    #[test]
    fn inline_elements_outside_pre() {
        let options = LanguageOptions::default();
        let span = Node::Element(element("span", vec![]));
        assert!(is_inline_element(&State::default(), &options, &span));
        let in_pre = State {
            in_pre: true,
            ..Default::default()
        };
        assert!(!is_inline_element(&in_pre, &options, &span));
    }

    #[test]
    fn hugging() {
        let options = LanguageOptions::default();
        let span = element("span", vec![text("a ")]);
        assert!(should_hug_start(&span, true, &options));
        assert!(!should_hug_end(&span, true, &options));
        let div = element("div", vec![text("a")]);
        assert!(!should_hug_start(&div, true, &options));
        assert!(should_hug_start(&div, false, &options));
        assert!(should_hug_end(&element("b", vec![]), true, &options));
    }

    #[test]
    fn languages() {
        assert_eq!(lang_attribute(&[lang("type", "text/coffeescript")]), Some("coffeescript"));
        assert!(!is_node_supported_language(&[lang("lang", "sass")]));
        assert!(is_node_supported_language(&[lang("lang", "scss")]));
        assert!(is_node_supported_language(&[]));
        let mut template = element("template", vec![]);
        template.attrs.push(lang("lang", "pug"));
        assert!(is_pug_template(&template));
    }

    #[test]
    fn shorthand() {
        let tag = |raw| {
            AttributeValue::Parts(vec![AttributeValuePart::MustacheTag(Tag {
                span: Span::default(),
                expr: Expr {
                    span: Span::default(),
                    raw,
                },
            })])
        };
        assert!(is_or_can_be_converted_to_shorthand("value", &tag("value")));
        assert!(!is_or_can_be_converted_to_shorthand("value", &tag("other")));
        assert!(is_lone_mustache_tag(&tag("other")));
        assert!(!is_lone_mustache_tag(&AttributeValue::True));
    }

    #[test]
    fn pragma() {
        assert!(has_pragma("<!-- @format -->\n<div />"));
        assert!(has_pragma("  <!--@prettier-->"));
        assert!(!has_pragma("<!-- @formatter -->"));
        assert!(!has_pragma("<div />"));
    }
}
