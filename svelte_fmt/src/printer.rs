use crate::{
    ast::*,
    config::{Section, SortOrder},
    ctx::{Ctx, Hints},
    doc::Doc,
    doc_helpers,
    embed::{self, EmbedTag, ExprFlags},
    helpers,
    snip,
    state::State,
};
use std::borrow::Cow;

pub(crate) trait DocGen<'s> {
    fn doc<E, F>(&mut self, ctx: &mut Ctx<'_, 's, E, F>, state: &State<'s>) -> Doc<'s>
    where
        F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>;
}

pub(crate) fn print_root<'s, E, F>(root: Root<'s>, ctx: &mut Ctx<'_, 's, E, F>) -> Doc<'s>
where
    F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
{
    let state = State {
        is_top_level: true,
        ..Default::default()
    };
    ctx.embed_spans = root.embed_spans().collect();

    let mut docs = match ctx.options.sort_order.clone() {
        SortOrder::None => {
            let Root {
                html,
                instance,
                module,
                css,
            } = root;
            let mut children = html.children;
            children.extend(module.map(Node::Script));
            children.extend(instance.map(Node::Script));
            children.extend(css.map(Node::Style));
            children.sort_by_key(|child| child.span().start);
            vec![print_fragment(&mut children, ctx, &state)]
        }
        SortOrder::Sections(sections) => {
            let mut root = root;
            embed::assign_comments_to_nodes(&mut root);
            let Root {
                mut html,
                instance,
                module,
                css,
            } = root;

            let markup = print_fragment(&mut html.children, ctx, &state);
            let mut scripts = module
                .into_iter()
                .chain(instance)
                .map(|mut script| {
                    ctx.embed_tag(
                        EmbedTag {
                            name: "script",
                            attrs: &mut script.attrs,
                            body: script.content,
                            comments: &script.comments,
                            section: true,
                        },
                        &state,
                    )
                })
                .collect::<Vec<_>>();
            let mut styles = css
                .into_iter()
                .map(|mut style| {
                    ctx.embed_tag(
                        EmbedTag {
                            name: "style",
                            attrs: &mut style.attrs,
                            body: style.content,
                            comments: &style.comments,
                            section: true,
                        },
                        &state,
                    )
                })
                .collect::<Vec<_>>();
            let mut markup = Some(markup).filter(|doc| !doc_helpers::is_empty_doc(doc));
            let mut options = ctx.options_doc.take();

            log::debug!("ordering top-level sections as '{}'", ctx.options.sort_order);
            let mut docs = Vec::with_capacity(4);
            sections.iter().for_each(|section| match section {
                Section::Options => docs.extend(options.take()),
                Section::Scripts => docs.append(&mut scripts),
                Section::Markup => docs.extend(markup.take()),
                Section::Styles => docs.append(&mut styles),
            });
            docs
        }
    };
    ctx.reset();

    if ctx.options.embedded_in_markdown
        && let Some(last) = docs.pop()
    {
        let mut last = vec![last];
        doc_helpers::trim_right(&mut last, &doc_helpers::is_line);
        docs.extend(last);
    }

    let doc = Doc::list(itertools::intersperse(docs, Doc::hard_line()).collect()).group();
    if ctx.options.insert_pragma && !helpers::has_pragma(ctx.source) {
        Doc::list(vec![Doc::text("<!-- @format -->"), Doc::hard_line(), doc])
    } else {
        doc
    }
}

fn print_fragment<'s, E, F>(
    children: &mut Vec<Node<'s>>,
    ctx: &mut Ctx<'_, 's, E, F>,
    state: &State<'s>,
) -> Doc<'s>
where
    F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
{
    if children.iter().all(helpers::is_empty_text_node) {
        return Doc::nil();
    }
    if !state.is_pre_tag_content() {
        trim_children(children, ctx, state);
    }
    let mut docs = print_children(children, ctx, state);
    doc_helpers::trim(&mut docs, &|doc| {
        doc_helpers::is_line(doc)
            // blank lines left behind by a node taken out for sorting
            || matches!(doc, Doc::Concat(lines) if lines.iter().all(doc_helpers::is_line))
            || matches!(doc, Doc::Text(text) if text.trim().is_empty())
            || matches!(doc, Doc::BreakParent)
    });
    if docs.iter().all(doc_helpers::is_empty_doc) {
        Doc::nil()
    } else {
        if !docs.last().is_some_and(doc_helpers::is_hard_line) {
            docs.push(Doc::hard_line());
        }
        Doc::list(docs).group()
    }
}

/// Whether a lifted top-level region starts between the node and its next sibling.
fn does_embed_start_after<E, F>(
    children: &[Node],
    index: usize,
    ctx: &Ctx<'_, '_, E, F>,
    state: &State,
) -> bool
where
    F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
{
    let Some(node) = children.get(index) else {
        return false;
    };
    let end = node.span().end;
    let next_start = children.get(index + 1).map(|next| next.span().start);
    state.is_top_level
        && ctx.embed_spans.iter().any(|embed| {
            embed.start >= end && next_start.is_none_or(|next_start| embed.end <= next_start)
        })
}

fn trim_children<E, F>(children: &mut [Node], ctx: &Ctx<'_, '_, E, F>, state: &State)
where
    F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
{
    let len = children.len();
    let first = (0..len)
        .find(|i| {
            !helpers::is_empty_text_node(&children[*i])
                && !does_embed_start_after(children, *i, ctx, state)
        })
        .unwrap_or(len.saturating_sub(1));
    let last = (0..len)
        .rev()
        .find(|i| {
            !helpers::is_empty_text_node(&children[*i])
                && (*i == len - 1 && !matches!(children[*i], Node::Comment(..))
                    || !does_embed_start_after(children, *i, ctx, state))
        })
        .unwrap_or(0);

    children
        .iter_mut()
        .take(first + 1)
        .for_each(helpers::trim_text_node_left);
    children
        .iter_mut()
        .skip(last)
        .for_each(helpers::trim_text_node_right);
}

fn prepare_children<'s, E, F>(
    children: &mut Vec<Node<'s>>,
    ctx: &mut Ctx<'_, 's, E, F>,
    state: &State<'s>,
) where
    F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
{
    let sorted = ctx.options.sort_order != SortOrder::None;
    let mut options_comment = None;
    let mut kept = Vec::with_capacity(children.len());

    let old = std::mem::take(children);
    let embed_after = (0..old.len())
        .map(|i| does_embed_start_after(&old, i, ctx, state))
        .collect::<Vec<_>>();
    let is_options =
        |node: Option<&Node>| matches!(node, Some(Node::Element(element)) if element.kind == ElementKind::Options);
    let followed_by_options = (0..old.len())
        .map(|i| match old.get(i + 1) {
            Some(next) if helpers::is_empty_text_node(next) => is_options(old.get(i + 2)),
            next => is_options(next),
        })
        .collect::<Vec<_>>();

    let mut skip_next = false;
    for (i, mut child) in old.into_iter().enumerate() {
        if skip_next {
            skip_next = false;
            if helpers::is_empty_text_node(&child) {
                continue;
            }
        }
        if child.as_text().is_some_and(|text| text.raw.is_empty()) {
            continue;
        }
        if helpers::is_empty_text_node(&child) && embed_after[i] {
            continue;
        }
        if sorted {
            let is_options_comment = followed_by_options[i]
                && matches!(&child, Node::Comment(comment)
                    if !helpers::is_ignore_start_directive(comment)
                        && !helpers::is_ignore_end_directive(comment));
            match &mut child {
                Node::Comment(comment) if is_options_comment => {
                    options_comment = Some(comment.doc(ctx, state));
                    skip_next = true;
                    continue;
                }
                Node::Element(element) if element.kind == ElementKind::Options => {
                    let options = Doc::list(vec![element.doc(ctx, state), Doc::hard_line()]).group();
                    ctx.options_doc = Some(match options_comment.take() {
                        Some(comment) => {
                            Doc::list(vec![comment, Doc::hard_line(), options]).group()
                        }
                        None => options,
                    });
                    continue;
                }
                _ => {}
            }
        }
        kept.push(child);
    }

    // a node between them was taken out
    let mut kept = kept.into_iter().peekable();
    while let Some(child) = kept.next() {
        let next_is_text = matches!(kept.peek(), Some(Node::Text(..)));
        match child {
            Node::Text(mut text) if next_is_text => {
                if let Some(Node::Text(next)) = kept.next() {
                    text.raw = Cow::from(format!("{}{}", text.raw, next.raw));
                    text.span.end = next.span.end;
                }
                children.push(Node::Text(text));
            }
            child => children.push(child),
        }
    }
}

fn print_children<'s, E, F>(
    children: &mut Vec<Node<'s>>,
    ctx: &mut Ctx<'_, 's, E, F>,
    state: &State<'s>,
) -> Vec<Doc<'s>>
where
    F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
{
    if state.is_pre_tag_content() {
        return children
            .iter_mut()
            .map(|child| child.doc(ctx, state))
            .collect();
    }

    prepare_children(children, ctx, state);
    let len = children.len();
    if len == 0 {
        return vec![];
    }

    let options = ctx.options;
    let is_block = |node: Option<&Node>| node.is_some_and(|node| helpers::is_block_element(node, options));
    let is_inline =
        |node: Option<&Node>| node.is_some_and(|node| helpers::is_inline_element(state, options, node));

    let mut docs = Vec::with_capacity(len * 2);
    let mut handle_whitespace_of_prev_text = false;
    for i in 0..len {
        let child_state = State {
            is_last_child: i == len - 1,
            ..*state
        };
        let prev = i.checked_sub(1).and_then(|i| children.get(i));
        let next = children.get(i + 1);

        if matches!(children[i], Node::Text(..)) {
            handle_whitespace_of_prev_text = false;
            if i == 0 || i == len - 1 {
                let prev_is_block = is_block(prev);
                let next_is_block = is_block(next);
                let child = &mut children[i];
                // a block neighbour already brings its own line
                if prev_is_block
                    && helpers::is_text_node_starting_with_whitespace(child)
                    && !helpers::is_text_node_starting_with_linebreak(child, 1)
                {
                    helpers::trim_text_node_left(child);
                }
                if next_is_block
                    && helpers::is_text_node_ending_with_whitespace(child)
                    && !helpers::is_text_node_ending_with_linebreak(child, 2)
                {
                    handle_whitespace_of_prev_text = true;
                    helpers::trim_text_node_right(child);
                }
                docs.push(child.doc(ctx, &child_state));
                continue;
            }

            let prev_is_inline = is_inline(prev);
            let prev_is_block = is_block(prev);
            let next_is_inline = is_inline(next);
            let next_is_block = is_block(next);
            let child = &mut children[i];

            if helpers::is_text_node_starting_with_whitespace(child)
                && !helpers::is_empty_text_node(child)
            {
                let starts_with_linebreak = helpers::is_text_node_starting_with_linebreak(child, 1);
                if prev_is_inline && !starts_with_linebreak {
                    helpers::trim_text_node_left(child);
                    let last = docs.pop().unwrap_or_default();
                    docs.push(Doc::list(vec![last, Doc::line()]).group());
                }
                if prev_is_block && !starts_with_linebreak {
                    helpers::trim_text_node_left(child);
                }
            }

            if helpers::is_text_node_ending_with_whitespace(child) {
                if next_is_inline && !helpers::is_text_node_ending_with_linebreak(child, 1) {
                    handle_whitespace_of_prev_text = !prev_is_block;
                    helpers::trim_text_node_right(child);
                }
                if next_is_block && !helpers::is_text_node_ending_with_linebreak(child, 2) {
                    handle_whitespace_of_prev_text = !prev_is_block;
                    helpers::trim_text_node_right(child);
                }
            }

            docs.push(child.doc(ctx, &child_state));
        } else if is_block(Some(&children[i])) {
            if let Some(prev) = prev
                && !is_block(Some(prev))
                && (!matches!(prev, Node::Text(..))
                    || handle_whitespace_of_prev_text
                    || !helpers::is_text_node_ending_with_whitespace(prev))
            {
                docs.push(Doc::soft_line());
            }

            let needs_line_after = next.is_some_and(|next| {
                !matches!(next, Node::Text(..))
                    || (!helpers::is_empty_text_node(next) || is_inline(children.get(i + 2)))
                        && !helpers::is_text_node_starting_with_linebreak(next, 1)
            });

            docs.push(children[i].doc(ctx, &child_state));
            if needs_line_after {
                docs.push(Doc::soft_line());
            }
            handle_whitespace_of_prev_text = false;
        } else if is_inline(Some(&children[i])) {
            let doc = children[i].doc(ctx, &child_state);
            if handle_whitespace_of_prev_text {
                docs.push(Doc::list(vec![Doc::line(), doc]).group());
            } else {
                docs.push(doc);
            }
            handle_whitespace_of_prev_text = false;
        } else {
            docs.push(children[i].doc(ctx, &child_state));
            handle_whitespace_of_prev_text = false;
        }
    }

    if len > 1 && children.iter().any(|child| is_block(Some(child))) {
        docs.push(Doc::BreakParent);
    }
    docs
}

/// Original source of a node, line by line.
fn verbatim<'s>(source: &'s str, span: Span) -> Doc<'s> {
    let text = source.get(span.start..span.end).unwrap_or_default();
    Doc::list(embed::literal_lines(snip::unsnip(text)))
}

impl<'s> DocGen<'s> for Node<'s> {
    fn doc<E, F>(&mut self, ctx: &mut Ctx<'_, 's, E, F>, state: &State<'s>) -> Doc<'s>
    where
        F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
    {
        if ctx.ignore_next && !helpers::is_empty_text_node(self) {
            ctx.ignore_next = false;
            return verbatim(ctx.source, self.span());
        }
        if ctx.ignore_range {
            match self {
                Node::Comment(comment) if helpers::is_ignore_end_directive(comment) => {
                    log::debug!("leaving ignored range at offset {}", comment.span.start);
                    ctx.ignore_range = false;
                }
                // whitespace around ignored nodes may have been trimmed already
                Node::Text(text) => return Doc::list(embed::literal_lines(text.raw.clone())),
                _ => return verbatim(ctx.source, self.span()),
            }
        }

        match self {
            Node::AwaitBlock(block) => block.doc(ctx, state),
            Node::Comment(comment) => comment.doc(ctx, state),
            Node::ConstTag(tag) => Doc::list(vec![
                Doc::text("{@const "),
                ctx.format_expr(
                    tag.expr.raw,
                    ExprFlags {
                        remove_parentheses: true,
                        ..Default::default()
                    },
                ),
                Doc::text("}"),
            ]),
            Node::DebugTag(tag) => {
                let mut docs = vec![Doc::text("{@debug")];
                if !tag.identifiers.is_empty() {
                    docs.push(Doc::text(" "));
                    docs.push(Doc::text(
                        tag.identifiers
                            .iter()
                            .map(|identifier| identifier.raw)
                            .collect::<Vec<_>>()
                            .join(", "),
                    ));
                }
                docs.push(Doc::text("}"));
                Doc::list(docs)
            }
            Node::EachBlock(block) => block.doc(ctx, state),
            Node::Element(element) => element.doc(ctx, state),
            Node::IfBlock(block) => block.doc(ctx, state),
            Node::KeyBlock(block) => block.doc(ctx, state),
            Node::MustacheTag(tag) => Doc::list(vec![
                Doc::text("{"),
                ctx.format_expr(
                    tag.expr.raw,
                    ExprFlags {
                        force_single_quote: state.in_quoted_attr,
                        ..Default::default()
                    },
                ),
                Doc::text("}"),
            ]),
            Node::RawMustacheTag(tag) => Doc::list(vec![
                Doc::text("{@html "),
                ctx.format_expr(tag.expr.raw, ExprFlags::default()),
                Doc::text("}"),
            ]),
            Node::RenderTag(tag) => Doc::list(vec![
                Doc::text("{@render "),
                ctx.format_expr(tag.expr.raw, ExprFlags::default()),
                Doc::text("}"),
            ]),
            Node::Script(script) => ctx.embed_tag(
                EmbedTag {
                    name: "script",
                    attrs: &mut script.attrs,
                    body: script.content,
                    comments: &script.comments,
                    section: false,
                },
                state,
            ),
            Node::SnippetBlock(block) => block.doc(ctx, state),
            Node::Style(style) => ctx.embed_tag(
                EmbedTag {
                    name: "style",
                    attrs: &mut style.attrs,
                    body: style.content,
                    comments: &style.comments,
                    section: false,
                },
                state,
            ),
            Node::Text(text) => text.doc(ctx, state),
        }
    }
}

impl<'s> DocGen<'s> for TextNode<'s> {
    fn doc<E, F>(&mut self, _: &mut Ctx<'_, 's, E, F>, state: &State<'s>) -> Doc<'s>
    where
        F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
    {
        if state.is_pre_tag_content() {
            if state.attr_name == Some("class") && state.attr_on_element {
                // keep the author's line breaks in long class lists
                let lines = self
                    .raw
                    .split('\n')
                    .map(str::trim_end)
                    .collect::<Vec<_>>()
                    .join("\n");
                return Doc::list(embed::literal_lines(lines));
            }
            return Doc::list(embed::literal_lines(self.raw.clone()));
        }

        let raw = &*self.raw;
        if helpers::is_empty_text(raw) {
            return if raw.matches('\n').nth(1).is_some() {
                Doc::list(vec![Doc::hard_line(), Doc::hard_line()])
            } else if raw.contains('\n') {
                Doc::hard_line()
            } else if !raw.is_empty() {
                Doc::line()
            } else {
                Doc::nil()
            };
        }

        Doc::fill(split_text_to_docs(&self.raw))
    }
}

fn is_text_whitespace(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\x0c' | '\r' | ' ')
}

/// Words of text joined by lines, so the text can be filled.
fn split_text_to_docs<'s>(raw: &Cow<'s, str>) -> Vec<Doc<'s>> {
    let words: Vec<Doc<'s>> = match raw {
        Cow::Borrowed(raw) => raw
            .split(is_text_whitespace)
            .filter(|word| !word.is_empty())
            .map(Doc::text)
            .collect(),
        Cow::Owned(raw) => raw
            .split(is_text_whitespace)
            .filter(|word| !word.is_empty())
            .map(|word| Doc::text(word.to_owned()))
            .collect(),
    };

    let mut docs = vec![];
    if raw.starts_with(is_text_whitespace) {
        docs.push(Doc::line());
    }
    words.into_iter().enumerate().for_each(|(i, word)| {
        if i > 0 {
            docs.push(Doc::line());
        }
        docs.push(word);
    });
    if raw.ends_with(is_text_whitespace) {
        docs.push(Doc::line());
    }

    if helpers::starts_with_linebreak(raw, 1)
        && let Some(first) = docs.first_mut()
    {
        *first = Doc::hard_line();
    }
    if helpers::starts_with_linebreak(raw, 2) {
        docs.insert(0, Doc::hard_line());
    }
    if helpers::ends_with_linebreak(raw, 1)
        && let Some(last) = docs.last_mut()
    {
        *last = Doc::hard_line();
    }
    if helpers::ends_with_linebreak(raw, 2) {
        docs.push(Doc::hard_line());
    }
    docs
}

impl<'s> DocGen<'s> for Comment<'s> {
    fn doc<E, F>(&mut self, ctx: &mut Ctx<'_, 's, E, F>, state: &State<'s>) -> Doc<'s>
    where
        F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
    {
        if state.is_top_level && helpers::is_ignore_start_directive(self) {
            log::debug!("entering ignored range at offset {}", self.span.start);
            ctx.ignore_range = true;
        }
        if helpers::is_ignore_directive(Some(self)) {
            ctx.ignore_next = true;
        }

        let mut docs = vec![Doc::text("<!--")];
        docs.extend(embed::literal_lines(snip::unsnip(self.data)));
        docs.push(Doc::text("-->"));
        Doc::list(docs).group()
    }
}

impl<'s> DocGen<'s> for Element<'s> {
    fn doc<E, F>(&mut self, ctx: &mut Ctx<'_, 's, E, F>, state: &State<'s>) -> Doc<'s>
    where
        F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
    {
        if self.kind == ElementKind::Element
            && (self.name == "script" || self.name == "style" || helpers::is_pug_template(self))
        {
            let body = match (self.children.first(), self.children.last()) {
                (Some(first), Some(last)) => ctx
                    .source
                    .get(first.span().start..last.span().end)
                    .unwrap_or_default(),
                _ => "",
            };
            return ctx.embed_tag(
                EmbedTag {
                    name: self.name,
                    attrs: &mut self.attrs,
                    body,
                    comments: &[],
                    section: false,
                },
                state,
            );
        }

        let options = ctx.options;
        let self_state = State {
            in_pre: state.in_pre || self.name.eq_ignore_ascii_case("pre"),
            ..*state
        };
        let is_pre = self_state.is_pre_tag_content();
        let is_inline = helpers::is_inline_element_tag(&self_state, options, self);
        let children_state = State {
            in_pre: self_state.in_pre,
            parent_is_block_element: helpers::is_block_element_tag(self, options),
            ..Default::default()
        };

        let attr_line = doc_helpers::get_attribute_line(options, self.attrs.len());
        let mut attrs = Vec::with_capacity(self.attrs.len() * 2 + 2);
        if let Some(this) = &self.this {
            attrs.push(attr_line.clone());
            attrs.push(Doc::text("this="));
            match this {
                ThisBinding::Static(tag) => attrs.push(Doc::text(format!("\"{tag}\""))),
                ThisBinding::Expr(expr) => {
                    attrs.push(Doc::text("{"));
                    attrs.push(ctx.format_expr(expr.raw, ExprFlags::default()));
                    attrs.push(Doc::text("}"));
                }
            }
        }
        let attr_state = State {
            attr_on_element: self.kind == ElementKind::Element,
            ..self_state
        };
        self.attrs.iter_mut().for_each(|attr| {
            attrs.push(attr_line.clone());
            attrs.push(attr.doc(ctx, &attr_state));
        });

        let name = self.name;
        if helpers::is_doctype(name) {
            return Doc::list(vec![
                Doc::text("<"),
                Doc::text(name),
                Doc::list(attrs).indent().group(),
                Doc::text(">"),
            ])
            .group();
        }

        let is_empty = self.children.iter().all(helpers::is_empty_text_node);
        let is_self_closing_tag = matches!(
            self.kind,
            ElementKind::Options | ElementKind::Body | ElementKind::Document
        ) || is_empty
            && ((self.kind == ElementKind::Element && !options.strict_mode
                || matches!(
                    self.kind,
                    ElementKind::Head
                        | ElementKind::InlineComponent
                        | ElementKind::Slot
                        | ElementKind::SlotTemplate
                        | ElementKind::Title
                ))
                && self.self_closing
                || self.kind == ElementKind::Window
                || helpers::is_void_element(name));

        if is_self_closing_tag {
            return Doc::list(vec![
                Doc::text("<"),
                Doc::text(name),
                Doc::list(vec![
                    Doc::list(attrs).indent(),
                    if options.bracket_new_line {
                        Doc::line()
                    } else {
                        Doc::nil()
                    },
                ])
                .group(),
                Doc::text(if options.bracket_same_line() {
                    " />"
                } else {
                    "/>"
                }),
            ])
            .group();
        }

        let is_supported_language =
            !(name == "template" && !helpers::is_node_supported_language(&self.attrs));
        let hug_start = helpers::should_hug_start(self, is_supported_language, options);
        let hug_end = helpers::should_hug_end(self, is_supported_language, options);

        let opening_tag = Doc::list(vec![
            Doc::text("<"),
            Doc::text(name),
            Doc::list(vec![
                Doc::list(attrs).indent(),
                if hug_start && !is_empty {
                    Doc::nil()
                } else if options.bracket_new_line && !is_pre {
                    Doc::soft_line()
                } else {
                    Doc::nil()
                },
            ])
            .group(),
        ]);
        let closing_tag = format!("</{name}>");

        if !is_supported_language && !is_empty {
            let body = print_raw(&self.children, ctx.source, true);
            return Doc::list(vec![
                opening_tag,
                Doc::text(">"),
                Doc::list(vec![Doc::literal_line(), body, Doc::hard_line()]).group(),
                Doc::text(closing_tag),
            ])
            .group();
        }

        let can_omit_softline =
            helpers::can_omit_softline_before_closing_tag(self.span, ctx.source, state, options);

        if hug_start && hug_end {
            let body = self.print_body(ctx, &children_state, is_empty, is_inline, is_pre);
            let hugged = Doc::list(vec![
                Doc::soft_line(),
                Doc::list(vec![Doc::text(">"), body, Doc::text(format!("</{name}"))]).group(),
            ]);
            let omit_softline = is_empty && !options.bracket_new_line || can_omit_softline;
            return Doc::list(vec![
                opening_tag,
                if is_empty {
                    hugged.group()
                } else {
                    hugged.indent().group()
                },
                if omit_softline {
                    Doc::nil()
                } else {
                    Doc::soft_line()
                },
                Doc::text(">"),
            ])
            .group();
        }

        let mut separator_start = Doc::soft_line();
        let mut separator_end = Doc::soft_line();
        if is_pre {
            separator_start = Doc::nil();
            separator_end = Doc::nil();
        } else {
            let mut did_set_end_separator = false;
            let len = self.children.len();
            if !hug_start && matches!(self.children.first(), Some(Node::Text(..))) {
                let first = &self.children[0];
                if helpers::is_text_node_starting_with_linebreak(first, 1)
                    && len > 1
                    && (!is_inline
                        || self
                            .children
                            .last()
                            .is_some_and(helpers::is_text_node_ending_with_whitespace))
                {
                    separator_start = Doc::hard_line();
                    separator_end = Doc::hard_line();
                    did_set_end_separator = true;
                } else if is_inline {
                    separator_start = Doc::line();
                }
                helpers::trim_text_node_left(&mut self.children[0]);
            }
            if !hug_end && let Some(last @ Node::Text(..)) = self.children.last_mut() {
                if is_inline && !did_set_end_separator {
                    separator_end = Doc::line();
                }
                helpers::trim_text_node_right(last);
            }
        }

        let body = self.print_body(ctx, &children_state, is_empty, is_inline, is_pre);

        if hug_start {
            Doc::list(vec![
                opening_tag,
                Doc::list(vec![
                    Doc::soft_line(),
                    Doc::list(vec![Doc::text(">"), body]).group(),
                ])
                .indent(),
                separator_end,
                Doc::text(closing_tag),
            ])
            .group()
        } else if hug_end {
            Doc::list(vec![
                opening_tag,
                Doc::text(">"),
                Doc::list(vec![
                    separator_start,
                    Doc::list(vec![body, Doc::text(format!("</{name}"))]).group(),
                ])
                .indent(),
                if can_omit_softline {
                    Doc::nil()
                } else {
                    Doc::soft_line()
                },
                Doc::text(">"),
            ])
            .group()
        } else if is_empty {
            Doc::list(vec![opening_tag, Doc::text(">"), body, Doc::text(closing_tag)]).group()
        } else {
            Doc::list(vec![
                opening_tag,
                Doc::text(">"),
                Doc::list(vec![separator_start, body]).indent(),
                separator_end,
                Doc::text(closing_tag),
            ])
            .group()
        }
    }
}

impl<'s> Element<'s> {
    fn print_body<E, F>(
        &mut self,
        ctx: &mut Ctx<'_, 's, E, F>,
        children_state: &State<'s>,
        is_empty: bool,
        is_inline: bool,
        is_pre: bool,
    ) -> Doc<'s>
    where
        F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
    {
        if is_empty {
            if is_inline
                && !is_pre
                && self
                    .children
                    .first()
                    .is_some_and(helpers::is_text_node_starting_with_whitespace)
            {
                Doc::line()
            } else if ctx.options.bracket_new_line {
                Doc::nil()
            } else {
                Doc::soft_line()
            }
        } else if is_pre {
            print_pre(&mut self.children, ctx, children_state)
        } else if self.name == "template" && !helpers::is_node_supported_language(&self.attrs) {
            print_raw(&self.children, ctx.source, true)
        } else {
            ctx.indent_level += ctx.indent_width;
            let docs = print_children(&mut self.children, ctx, children_state);
            ctx.indent_level -= ctx.indent_width;
            Doc::list(docs)
        }
    }
}

/// Text inside `<pre>` is taken from source as it is.
fn print_pre<'s, E, F>(
    children: &mut [Node<'s>],
    ctx: &mut Ctx<'_, 's, E, F>,
    state: &State<'s>,
) -> Doc<'s>
where
    F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
{
    let mut docs = vec![];
    children.iter_mut().for_each(|child| match child {
        Node::Text(text) => {
            let raw = ctx.source.get(text.span.start..text.span.end).unwrap_or_default();
            docs.extend(embed::literal_lines(raw));
        }
        child => docs.push(child.doc(ctx, state)),
    });
    Doc::list(docs)
}

fn print_raw<'s>(children: &[Node<'s>], source: &'s str, strip_linebreaks: bool) -> Doc<'s> {
    let (Some(first), Some(last)) = (children.first(), children.last()) else {
        return Doc::nil();
    };
    let mut raw = source
        .get(first.span().start..last.span().end)
        .unwrap_or_default();
    if strip_linebreaks {
        raw = raw
            .strip_prefix("\r\n")
            .or_else(|| raw.strip_prefix('\n'))
            .unwrap_or(raw);
        raw = raw
            .strip_suffix("\r\n")
            .or_else(|| raw.strip_suffix('\n'))
            .unwrap_or(raw);
    }
    Doc::list(embed::literal_lines(raw))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum BlockWhitespace {
    None,
    Space,
    Line,
}

fn whitespace_at_start_of_block(children: &[Node], source: &str) -> BlockWhitespace {
    let Some(first) = children.first() else {
        return BlockWhitespace::None;
    };
    if helpers::is_text_node_starting_with_linebreak(first, 1) {
        return BlockWhitespace::Line;
    }
    if helpers::is_text_node_starting_with_whitespace(first) {
        return BlockWhitespace::Space;
    }

    let start = first.span().start;
    let before = source.get(..start).unwrap_or_default();
    match before.rfind('}') {
        Some(opening_end) if opening_end > 0 && start > opening_end + 1 => {
            let between = &before[opening_end + 1..];
            if between.trim().is_empty() {
                if helpers::starts_with_linebreak(between, 1) {
                    BlockWhitespace::Line
                } else {
                    BlockWhitespace::Space
                }
            } else {
                BlockWhitespace::None
            }
        }
        _ => BlockWhitespace::None,
    }
}

fn whitespace_at_end_of_block(children: &[Node], source: &str) -> BlockWhitespace {
    let Some(last) = children.last() else {
        return BlockWhitespace::None;
    };
    if helpers::is_text_node_ending_with_linebreak(last, 1) {
        return BlockWhitespace::Line;
    }
    if helpers::is_text_node_ending_with_whitespace(last) {
        return BlockWhitespace::Space;
    }

    let end = last.span().end;
    let after = source.get(end..).unwrap_or_default();
    match after.find('{') {
        Some(closing_start) if closing_start > 0 => {
            let between = &after[..closing_start];
            if between.trim().is_empty() {
                if helpers::ends_with_linebreak(between, 1) {
                    BlockWhitespace::Line
                } else {
                    BlockWhitespace::Space
                }
            } else {
                BlockWhitespace::None
            }
        }
        _ => BlockWhitespace::None,
    }
}

fn print_block_children<'s, E, F>(
    children: &mut Vec<Node<'s>>,
    ctx: &mut Ctx<'_, 's, E, F>,
    state: &State<'s>,
) -> Doc<'s>
where
    F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
{
    if children.is_empty() {
        return Doc::nil();
    }

    let at_start = whitespace_at_start_of_block(children, ctx.source);
    let at_end = whitespace_at_end_of_block(children, ctx.source);
    let has_line = at_start == BlockWhitespace::Line || at_end == BlockWhitespace::Line;
    let boundary = |whitespace| match whitespace {
        BlockWhitespace::None => Doc::nil(),
        _ if has_line => Doc::hard_line(),
        _ => Doc::line(),
    };
    let start_line = boundary(at_start);
    let end_line = boundary(at_end);

    if let Some(first) = children.first_mut()
        && helpers::is_text_node_starting_with_whitespace(first)
    {
        helpers::trim_text_node_left(first);
    }
    if let Some(last) = children.last_mut()
        && helpers::is_text_node_ending_with_whitespace(last)
    {
        helpers::trim_text_node_right(last);
    }

    let state = State {
        in_pre: state.in_pre,
        ..Default::default()
    };
    let docs = ctx.indented(|ctx| {
        Doc::list(vec![
            start_line,
            Doc::list(print_children(children, ctx, &state)).group(),
        ])
    });
    Doc::list(vec![docs, end_line])
}

fn print_else<'s, E, F>(
    block: &mut ElseBlock<'s>,
    ctx: &mut Ctx<'_, 's, E, F>,
    state: &State<'s>,
    parent_is_each: bool,
) -> Doc<'s>
where
    F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
{
    if !parent_is_each && let [Node::IfBlock(if_block)] = &mut block.children[..] {
        let mut docs = vec![
            Doc::text("{:else if "),
            ctx.format_expr(if_block.expr.raw, ExprFlags::default()),
            Doc::text("}"),
            print_block_children(&mut if_block.children, ctx, state),
        ];
        if let Some(else_block) = &mut if_block.else_block {
            docs.push(print_else(else_block, ctx, state, false));
        }
        return Doc::list(docs);
    }
    Doc::list(vec![
        Doc::text("{:else}"),
        print_block_children(&mut block.children, ctx, state),
    ])
}

/// Destructuring patterns are printed as written, on one line.
fn collapse_whitespace(pattern: &str) -> String {
    pattern.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl<'s> DocGen<'s> for IfBlock<'s> {
    fn doc<E, F>(&mut self, ctx: &mut Ctx<'_, 's, E, F>, state: &State<'s>) -> Doc<'s>
    where
        F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
    {
        let mut docs = vec![
            Doc::text("{#if "),
            ctx.format_expr(self.expr.raw, ExprFlags::default()),
            Doc::text("}"),
            print_block_children(&mut self.children, ctx, state),
        ];
        if let Some(else_block) = &mut self.else_block {
            docs.push(print_else(else_block, ctx, state, false));
        }
        docs.push(Doc::text("{/if}"));
        Doc::list(vec![Doc::list(docs).group(), Doc::BreakParent])
    }
}

impl<'s> DocGen<'s> for EachBlock<'s> {
    fn doc<E, F>(&mut self, ctx: &mut Ctx<'_, 's, E, F>, state: &State<'s>) -> Doc<'s>
    where
        F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
    {
        let mut docs = vec![
            Doc::text("{#each "),
            ctx.format_expr(self.expr.raw, ExprFlags::default()),
        ];
        if let Some(context) = self.context {
            docs.push(Doc::text(" as "));
            docs.push(Doc::text(collapse_whitespace(context.raw)));
        }
        if let Some(index) = self.index {
            docs.push(Doc::text(", "));
            docs.push(Doc::text(index));
        }
        if let Some(key) = self.key {
            docs.push(Doc::text(" ("));
            docs.push(ctx.format_expr(key.raw, ExprFlags::default()));
            docs.push(Doc::text(")"));
        }
        docs.push(Doc::text("}"));
        docs.push(print_block_children(&mut self.children, ctx, state));
        if let Some(else_block) = &mut self.else_block {
            docs.push(print_else(else_block, ctx, state, true));
        }
        docs.push(Doc::text("{/each}"));
        Doc::list(vec![Doc::list(docs).group(), Doc::BreakParent])
    }
}

impl<'s> DocGen<'s> for AwaitBlock<'s> {
    fn doc<E, F>(&mut self, ctx: &mut Ctx<'_, 's, E, F>, state: &State<'s>) -> Doc<'s>
    where
        F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
    {
        let has_content = |body: &BlockBody| {
            body.children
                .iter()
                .any(|child| !helpers::is_empty_text_node(child))
        };
        let has_pending = has_content(&self.pending);
        let has_then = has_content(&self.then);
        let has_catch = has_content(&self.catch);
        let binding = |expr: Option<Expr<'s>>| {
            expr.map_or(Doc::nil(), |expr| {
                Doc::text(format!(" {}", collapse_whitespace(expr.raw)))
            })
        };

        let mut docs = vec![];
        let expr = ctx.format_expr(self.expr.raw, ExprFlags::default());
        if !has_pending && has_then {
            docs.push(
                Doc::list(vec![
                    Doc::text("{#await "),
                    expr,
                    Doc::text(" then"),
                    binding(self.value),
                    Doc::text("}"),
                ])
                .group(),
            );
            docs.push(print_block_children(&mut self.then.children, ctx, state));
        } else if !has_pending && has_catch {
            docs.push(
                Doc::list(vec![
                    Doc::text("{#await "),
                    expr,
                    Doc::text(" catch"),
                    binding(self.error),
                    Doc::text("}"),
                ])
                .group(),
            );
            docs.push(print_block_children(&mut self.catch.children, ctx, state));
        } else {
            docs.push(Doc::list(vec![Doc::text("{#await "), expr, Doc::text("}")]).group());
            if has_pending {
                docs.push(print_block_children(&mut self.pending.children, ctx, state));
            }
            if has_then {
                docs.push(
                    Doc::list(vec![Doc::text("{:then"), binding(self.value), Doc::text("}")])
                        .group(),
                );
                docs.push(print_block_children(&mut self.then.children, ctx, state));
            }
        }

        if (has_pending || has_then) && has_catch {
            docs.push(
                Doc::list(vec![Doc::text("{:catch"), binding(self.error), Doc::text("}")]).group(),
            );
            docs.push(print_block_children(&mut self.catch.children, ctx, state));
        }

        docs.push(Doc::text("{/await}"));
        Doc::list(docs).group()
    }
}

impl<'s> DocGen<'s> for KeyBlock<'s> {
    fn doc<E, F>(&mut self, ctx: &mut Ctx<'_, 's, E, F>, state: &State<'s>) -> Doc<'s>
    where
        F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
    {
        let docs = vec![
            Doc::text("{#key "),
            ctx.format_expr(self.expr.raw, ExprFlags::default()),
            Doc::text("}"),
            print_block_children(&mut self.children, ctx, state),
            Doc::text("{/key}"),
        ];
        Doc::list(vec![Doc::list(docs).group(), Doc::BreakParent])
    }
}

impl<'s> DocGen<'s> for SnippetBlock<'s> {
    fn doc<E, F>(&mut self, ctx: &mut Ctx<'_, 's, E, F>, state: &State<'s>) -> Doc<'s>
    where
        F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
    {
        let mut head = vec![Doc::text("{#snippet "), Doc::text(self.name.raw)];
        if let Some(type_params) = self.type_params {
            head.push(Doc::text("<"));
            head.push(Doc::text(type_params));
            head.push(Doc::text(">"));
        }
        head.push(Doc::text("("));
        head.push(ctx.format_params(&self.params));
        head.push(Doc::text(")}"));

        Doc::list(vec![
            Doc::list(head),
            print_block_children(&mut self.children, ctx, state),
            Doc::text("{/snippet}"),
        ])
        .group()
    }
}

impl<'s> DocGen<'s> for Attribute<'s> {
    fn doc<E, F>(&mut self, ctx: &mut Ctx<'_, 's, E, F>, state: &State<'s>) -> Doc<'s>
    where
        F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
    {
        match self {
            Attribute::Attribute(attr) => attr.doc(ctx, state),
            Attribute::Directive(directive) => directive.doc(ctx, state),
            Attribute::Spread(spread) => Doc::list(vec![
                Doc::text("{..."),
                ctx.format_expr(spread.expr.raw, ExprFlags::default()),
                Doc::text("}"),
            ]),
            Attribute::StyleDirective(directive) => directive.doc(ctx, state),
        }
    }
}

/// `name="{name}"`, `{name}` or `name={name}`, by options.
fn print_shorthand<'s>(
    ctx_options: &crate::config::LanguageOptions,
    prefix: Doc<'s>,
    name: &'s str,
    omit_value: bool,
) -> Doc<'s> {
    if ctx_options.strict_mode {
        Doc::list(vec![prefix, Doc::text(format!("=\"{{{name}}}\""))])
    } else if ctx_options.allow_shorthand {
        if omit_value {
            prefix
        } else {
            Doc::text(format!("{{{name}}}"))
        }
    } else {
        Doc::list(vec![prefix, Doc::text(format!("={{{name}}}"))])
    }
}

/// Value of an attribute or style directive, after `=`.
fn print_attr_value<'s, E, F>(
    name: &'s str,
    parts: &mut [AttributeValuePart<'s>],
    quotes: bool,
    ctx: &mut Ctx<'_, 's, E, F>,
    state: &State<'s>,
) -> Doc<'s>
where
    F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
{
    let state = state.in_attr(name, state.attr_on_element, quotes);
    let quote = if parts.iter().any(|part| {
        matches!(part, AttributeValuePart::Text(text) if text.raw.contains('"') && !text.raw.contains('\''))
    }) {
        "'"
    } else {
        "\""
    };

    let mut docs = Vec::with_capacity(parts.len() + 3);
    docs.push(Doc::text("="));
    if quotes {
        docs.push(Doc::text(quote));
    }
    parts.iter_mut().for_each(|part| {
        docs.push(match part {
            AttributeValuePart::Text(text) => text.doc(ctx, &state),
            AttributeValuePart::MustacheTag(tag) => Doc::list(vec![
                Doc::text("{"),
                ctx.format_expr(
                    tag.expr.raw,
                    ExprFlags {
                        force_single_quote: state.in_quoted_attr,
                        ..Default::default()
                    },
                ),
                Doc::text("}"),
            ]),
            AttributeValuePart::AttributeShorthand(expr) => Doc::text(expr.raw),
        });
    });
    if quotes {
        docs.push(Doc::text(quote));
    }
    Doc::list(docs)
}

impl<'s> DocGen<'s> for NativeAttribute<'s> {
    fn doc<E, F>(&mut self, ctx: &mut Ctx<'_, 's, E, F>, state: &State<'s>) -> Doc<'s>
    where
        F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
    {
        let name = self.name;
        if helpers::is_or_can_be_converted_to_shorthand(name, &self.value) {
            return print_shorthand(ctx.options, Doc::text(name), name, false);
        }
        let quotes = !helpers::is_lone_mustache_tag(&self.value) || ctx.options.strict_mode;
        match &mut self.value {
            AttributeValue::True => Doc::text(name),
            AttributeValue::Parts(parts) => Doc::list(vec![
                Doc::text(name),
                print_attr_value(name, parts, quotes, ctx, state),
            ]),
        }
    }
}

impl<'s> DocGen<'s> for StyleDirective<'s> {
    fn doc<E, F>(&mut self, ctx: &mut Ctx<'_, 's, E, F>, state: &State<'s>) -> Doc<'s>
    where
        F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
    {
        let mut prefix = vec![Doc::text("style:"), Doc::text(self.name)];
        if !self.modifiers.is_empty() {
            prefix.push(Doc::text("|"));
            prefix.push(Doc::text(self.modifiers.join("|")));
        }
        let prefix = Doc::list(prefix);

        if matches!(self.value, AttributeValue::True)
            || helpers::is_or_can_be_converted_to_shorthand(self.name, &self.value)
        {
            return print_shorthand(ctx.options, prefix, self.name, true);
        }
        let quotes = !helpers::is_lone_mustache_tag(&self.value) || ctx.options.strict_mode;
        match &mut self.value {
            AttributeValue::True => prefix,
            AttributeValue::Parts(parts) => Doc::list(vec![
                prefix,
                print_attr_value(self.name, parts, quotes, ctx, state),
            ]),
        }
    }
}

impl<'s> DocGen<'s> for Directive<'s> {
    fn doc<E, F>(&mut self, ctx: &mut Ctx<'_, 's, E, F>, _: &State<'s>) -> Doc<'s>
    where
        F: for<'a> FnMut(&'a str, Hints) -> Result<Cow<'a, str>, E>,
    {
        let prefix = match self.kind {
            DirectiveKind::Action => "use:",
            DirectiveKind::Animation => "animate:",
            DirectiveKind::Binding => "bind:",
            DirectiveKind::Class => "class:",
            DirectiveKind::EventHandler => "on:",
            DirectiveKind::Let => "let:",
            DirectiveKind::Ref => "ref:",
            DirectiveKind::Transition {
                intro: true,
                outro: true,
            } => "transition:",
            DirectiveKind::Transition { intro: true, .. } => "in:",
            DirectiveKind::Transition { .. } => "out:",
        };
        let mut docs = vec![Doc::text(prefix), Doc::text(self.name)];
        if !self.modifiers.is_empty() {
            docs.push(Doc::text("|"));
            docs.push(Doc::text(self.modifiers.join("|")));
        }

        let expr = match self.kind {
            DirectiveKind::Ref => None,
            // `bind:value={value}` is the same as `bind:value`
            DirectiveKind::Binding | DirectiveKind::Class | DirectiveKind::Let => {
                self.expr.filter(|expr| expr.raw != self.name)
            }
            _ => self.expr,
        };
        if let Some(expr) = expr {
            let strict = ctx.options.strict_mode;
            docs.push(Doc::text(if strict { "=\"{" } else { "={" }));
            docs.push(ctx.format_expr(
                expr.raw,
                ExprFlags {
                    force_single_quote: strict,
                    force_single_line: true,
                    ..Default::default()
                },
            ));
            docs.push(Doc::text(if strict { "}\"" } else { "}" }));
        }
        Doc::list(docs)
    }
}
