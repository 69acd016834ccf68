//! This parser is designed for internal use,
//! not generating general-purpose AST.
//!
//! It consumes the (snipped) source and produces the tree directly without
//! tokenizing. Script expressions aren't parsed: they're kept as raw slices
//! and only scanned far enough to find where they end.

use crate::{
    ast::*,
    error::{SyntaxError, SyntaxErrorKind},
    helpers,
};
use std::{borrow::Cow, iter::Peekable, str::CharIndices};

pub struct Parser<'s> {
    source: &'s str,
    chars: Peekable<CharIndices<'s>>,
}

impl<'s> Parser<'s> {
    pub fn new(source: &'s str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
        }
    }

    fn try_parse<F, R>(&mut self, f: F) -> PResult<R>
    where
        F: FnOnce(&mut Self) -> PResult<R>,
    {
        let chars = self.chars.clone();
        let result = f(self);
        if result.is_err() {
            self.chars = chars;
        }
        result
    }

    fn pos(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(pos, _)| *pos)
            .unwrap_or(self.source.len())
    }

    fn emit_error(&mut self, kind: SyntaxErrorKind) -> SyntaxError {
        let pos = self.pos();
        SyntaxError {
            kind,
            start: pos,
            end: pos,
        }
    }

    fn skip_ws(&mut self) {
        while self
            .chars
            .next_if(|(_, c)| c.is_ascii_whitespace())
            .is_some()
        {}
    }

    fn starts_with(&mut self, s: &str) -> bool {
        let pos = self.pos();
        self.source[pos..].starts_with(s)
    }

    /// `{/name}`, but not an expression starting with a comment like `{/* */}`.
    fn at_block_end(&mut self) -> bool {
        self.starts_with("{/") && !self.starts_with("{/*") && !self.starts_with("{//")
    }

    /// Consume `s` if the rest of source starts with it.
    fn eat(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            s.chars().for_each(|_| {
                self.chars.next();
            });
            true
        } else {
            false
        }
    }

    fn expect_char(&mut self, c: char) -> PResult<usize> {
        self.chars
            .next_if(|(_, next)| *next == c)
            .map(|(i, _)| i)
            .ok_or_else(|| self.emit_error(SyntaxErrorKind::ExpectChar(c)))
    }

    /// Slice of source, trimmed, as an expression.
    fn make_expr(&self, start: usize, end: usize) -> Expr<'s> {
        let raw = &self.source[start..end];
        let leading = raw.len() - raw.trim_start().len();
        let raw = raw.trim();
        Expr {
            span: Span::new(start + leading, start + leading + raw.len()),
            raw,
        }
    }

    pub fn parse_root(&mut self) -> PResult<Root<'s>> {
        let mut children = vec![];
        let mut instance = None;
        let mut module = None;
        let mut css = None;

        while self.chars.peek().is_some() {
            match self.parse_node()? {
                Node::Element(element)
                    if element.kind == ElementKind::Element && element.name == "script" =>
                {
                    let is_module = element.attrs.iter().any(|attr| match attr {
                        Attribute::Attribute(attr) => {
                            attr.name == "module"
                                || attr.name == "context"
                                    && helpers::attribute_text_value(attr) == Some("module")
                        }
                        _ => false,
                    });
                    let slot = if is_module { &mut module } else { &mut instance };
                    if slot.is_some() {
                        return Err(SyntaxError {
                            kind: SyntaxErrorKind::DuplicateScript,
                            start: element.span.start,
                            end: element.span.end,
                        });
                    }
                    let content = self.raw_content(&element);
                    *slot = Some(Script {
                        span: element.span,
                        attrs: element.attrs,
                        content,
                        comments: vec![],
                    });
                }
                Node::Element(element)
                    if element.kind == ElementKind::Element && element.name == "style" =>
                {
                    if css.is_some() {
                        return Err(SyntaxError {
                            kind: SyntaxErrorKind::DuplicateStyle,
                            start: element.span.start,
                            end: element.span.end,
                        });
                    }
                    let content = self.raw_content(&element);
                    css = Some(Style {
                        span: element.span,
                        attrs: element.attrs,
                        content,
                        comments: vec![],
                    });
                }
                node => children.push(node),
            }
        }

        Ok(Root {
            html: Fragment { children },
            instance,
            module,
            css,
        })
    }

    fn raw_content(&self, element: &Element<'s>) -> &'s str {
        match element.children.first() {
            Some(Node::Text(text)) => &self.source[text.span.start..text.span.end],
            _ => "",
        }
    }

    fn parse_node(&mut self) -> PResult<Node<'s>> {
        match self.chars.peek() {
            Some((_, '<')) => {
                let mut chars = self.chars.clone();
                chars.next();
                match chars.next() {
                    Some((_, c)) if is_tag_name_char(c) => self.parse_element().map(Node::Element),
                    Some((_, '/')) => {
                        let start = self.pos();
                        self.eat("</");
                        let name = self.parse_tag_name().unwrap_or_default();
                        Err(SyntaxError {
                            kind: SyntaxErrorKind::UnexpectedCloseTag(name.to_owned()),
                            start,
                            end: self.pos(),
                        })
                    }
                    Some((_, '!')) => {
                        if self.starts_with("<!--") {
                            self.parse_comment().map(Node::Comment)
                        } else {
                            self.try_parse(Parser::parse_element)
                                .map(Node::Element)
                                .or_else(|_| self.parse_text_node().map(Node::Text))
                        }
                    }
                    _ => self.parse_text_node().map(Node::Text),
                }
            }
            Some((_, '{')) => self.parse_mustache(),
            Some(..) => self.parse_text_node().map(Node::Text),
            None => Err(self.emit_error(SyntaxErrorKind::ExpectElement)),
        }
    }

    fn parse_comment(&mut self) -> PResult<Comment<'s>> {
        let start = self.pos();
        if !self.eat("<!--") {
            return Err(self.emit_error(SyntaxErrorKind::ExpectComment));
        }
        let data_start = self.pos();
        let mut data_end = self.source.len();
        loop {
            match self.chars.next() {
                Some((i, '-')) => {
                    let mut chars = self.chars.clone();
                    if chars
                        .next_if(|(_, c)| *c == '-')
                        .and_then(|_| chars.next_if(|(_, c)| *c == '>'))
                        .is_some()
                    {
                        data_end = i;
                        self.chars = chars;
                        break;
                    }
                }
                Some(..) => continue,
                None => break,
            }
        }

        Ok(Comment {
            span: Span::new(start, self.pos()),
            data: &self.source[data_start..data_end],
        })
    }

    fn parse_element(&mut self) -> PResult<Element<'s>> {
        let start = self.pos();
        if self.chars.next_if(|(_, c)| *c == '<').is_none() {
            return Err(self.emit_error(SyntaxErrorKind::ExpectElement));
        }
        let name = self.parse_tag_name()?;
        let kind = element_kind(name);

        let mut attrs = vec![];
        let mut this = None;
        loop {
            self.skip_ws();
            match self.chars.peek() {
                Some((_, '/')) => {
                    self.chars.next();
                    if self.chars.next_if(|(_, c)| *c == '>').is_some() {
                        return Ok(Element {
                            span: Span::new(start, self.pos()),
                            kind,
                            name,
                            this,
                            attrs,
                            children: vec![],
                            self_closing: true,
                        });
                    }
                    return Err(self.emit_error(SyntaxErrorKind::ExpectSelfCloseTag));
                }
                Some((_, '>')) => {
                    self.chars.next();
                    break;
                }
                Some(..) => {
                    let attr = self.parse_attr()?;
                    match attr {
                        Attribute::Attribute(attr)
                            if attr.name == "this"
                                && matches!(name, "svelte:element" | "svelte:component") =>
                        {
                            this = Some(this_binding(attr)?);
                        }
                        attr => attrs.push(attr),
                    }
                }
                None => return Err(self.emit_error(SyntaxErrorKind::ExpectChar('>'))),
            }
        }

        if helpers::is_void_element(name) || helpers::is_doctype(name) {
            return Ok(Element {
                span: Span::new(start, self.pos()),
                kind,
                name,
                this,
                attrs,
                children: vec![],
                self_closing: false,
            });
        }

        let mut children = vec![];
        let is_raw_text = kind == ElementKind::Element
            && (name == "script"
                || name == "style"
                || name == "template" && helpers::lang_attribute(&attrs).is_some());
        if is_raw_text {
            let text = self.parse_raw_text_node(name);
            if !text.raw.is_empty() {
                children.push(Node::Text(text));
            }
        }

        loop {
            match self.chars.peek().copied() {
                Some((_, '<')) if self.starts_with("</") => {
                    let close_start = self.pos();
                    self.eat("</");
                    let close_name = self.parse_tag_name()?;
                    if !close_name.eq_ignore_ascii_case(name) {
                        return Err(SyntaxError {
                            kind: SyntaxErrorKind::ExpectCloseTag(name.to_owned()),
                            start: close_start,
                            end: self.pos(),
                        });
                    }
                    self.skip_ws();
                    self.expect_char('>')?;
                    break;
                }
                Some(..) => children.push(self.parse_node()?),
                None => {
                    return Err(SyntaxError {
                        kind: SyntaxErrorKind::ExpectCloseTag(name.to_owned()),
                        start,
                        end: self.source.len(),
                    });
                }
            }
        }

        if kind == ElementKind::Head {
            children.iter_mut().for_each(|child| {
                if let Node::Element(element) = child
                    && element.name == "title"
                {
                    element.kind = ElementKind::Title;
                }
            });
        }

        Ok(Element {
            span: Span::new(start, self.pos()),
            kind,
            name,
            this,
            attrs,
            children,
            self_closing: false,
        })
    }

    fn parse_tag_name(&mut self) -> PResult<&'s str> {
        let start = self.pos();
        self.chars.next_if(|(_, c)| *c == '!');
        if self
            .chars
            .next_if(|(_, c)| is_tag_name_char(*c))
            .is_none()
        {
            return Err(self.emit_error(SyntaxErrorKind::ExpectTagName));
        }
        while self
            .chars
            .next_if(|(_, c)| is_tag_name_char(*c))
            .is_some()
        {}
        let end = self.pos();
        Ok(&self.source[start..end])
    }

    fn parse_raw_text_node(&mut self, tag_name: &str) -> TextNode<'s> {
        let start = self.pos();
        let end;
        loop {
            match self.chars.peek() {
                Some((i, '<')) => {
                    let i = *i;
                    let rest = &self.source[i..];
                    if rest
                        .strip_prefix("</")
                        .and_then(|rest| rest.get(..tag_name.len()))
                        .is_some_and(|name| name.eq_ignore_ascii_case(tag_name))
                    {
                        end = i;
                        break;
                    }
                    self.chars.next();
                }
                Some(..) => {
                    self.chars.next();
                }
                None => {
                    end = self.source.len();
                    break;
                }
            }
        }

        TextNode {
            span: Span::new(start, end),
            raw: Cow::from(&self.source[start..end]),
        }
    }

    fn parse_text_node(&mut self) -> PResult<TextNode<'s>> {
        let Some((start, _)) = self.chars.next_if(|(_, c)| *c != '{') else {
            return Err(self.emit_error(SyntaxErrorKind::ExpectTextNode));
        };

        let end;
        loop {
            match self.chars.peek() {
                Some((i, '{')) => {
                    end = *i;
                    break;
                }
                Some((i, '<')) => {
                    let i = *i;
                    let mut chars = self.chars.clone();
                    chars.next();
                    match chars.next() {
                        Some((_, c)) if is_tag_name_char(c) || c == '/' || c == '!' => {
                            end = i;
                            break;
                        }
                        _ => {
                            self.chars.next();
                        }
                    }
                }
                Some(..) => {
                    self.chars.next();
                }
                None => {
                    end = self.source.len();
                    break;
                }
            }
        }

        Ok(TextNode {
            span: Span::new(start, end),
            raw: Cow::from(&self.source[start..end]),
        })
    }

    fn parse_attr_name(&mut self) -> PResult<&'s str> {
        let start = self.pos();
        if self
            .chars
            .next_if(|(_, c)| is_attr_name_char(*c))
            .is_none()
        {
            return Err(self.emit_error(SyntaxErrorKind::ExpectAttrName));
        }
        while self
            .chars
            .next_if(|(_, c)| is_attr_name_char(*c))
            .is_some()
        {}
        let end = self.pos();
        Ok(&self.source[start..end])
    }

    fn parse_attr(&mut self) -> PResult<Attribute<'s>> {
        let start = self.pos();
        if self.chars.next_if(|(_, c)| *c == '{').is_some() {
            self.skip_ws();
            if self.eat("...") {
                let expr = self.parse_expr()?;
                return Ok(Attribute::Spread(Spread { expr }));
            }
            let expr = self.parse_expr()?;
            return Ok(Attribute::Attribute(NativeAttribute {
                span: Span::new(start, self.pos()),
                name: expr.raw,
                value: AttributeValue::Parts(vec![AttributeValuePart::AttributeShorthand(expr)]),
            }));
        }

        let name = self.parse_attr_name()?;
        let mut end = self.pos();
        let mut chars = self.chars.clone();
        while chars.next_if(|(_, c)| c.is_ascii_whitespace()).is_some() {}
        let value = if chars.next_if(|(_, c)| *c == '=').is_some() {
            self.chars = chars;
            self.skip_ws();
            let value = self.parse_attr_value()?;
            end = self.pos();
            value
        } else {
            AttributeValue::True
        };
        let span = Span::new(start, end);

        let Some((prefix, rest)) = name.split_once(':') else {
            return Ok(Attribute::Attribute(NativeAttribute { span, name, value }));
        };
        let kind = match prefix {
            "on" => DirectiveKind::EventHandler,
            "bind" => DirectiveKind::Binding,
            "class" => DirectiveKind::Class,
            "use" => DirectiveKind::Action,
            "animate" => DirectiveKind::Animation,
            "let" => DirectiveKind::Let,
            "ref" => DirectiveKind::Ref,
            "transition" => DirectiveKind::Transition {
                intro: true,
                outro: true,
            },
            "in" => DirectiveKind::Transition {
                intro: true,
                outro: false,
            },
            "out" => DirectiveKind::Transition {
                intro: false,
                outro: true,
            },
            "style" => {
                let mut segments = rest.split('|');
                let name = segments.next().unwrap_or_default();
                return Ok(Attribute::StyleDirective(StyleDirective {
                    name,
                    modifiers: segments.collect(),
                    value,
                }));
            }
            _ => return Ok(Attribute::Attribute(NativeAttribute { span, name, value })),
        };
        let mut segments = rest.split('|');
        let directive_name = segments.next().unwrap_or_default();
        let expr = match value {
            AttributeValue::True => None,
            AttributeValue::Parts(parts) => match &parts[..] {
                [AttributeValuePart::MustacheTag(tag)] => Some(tag.expr),
                _ => {
                    return Err(SyntaxError {
                        kind: SyntaxErrorKind::ExpectExpression,
                        start: span.start,
                        end: span.end,
                    });
                }
            },
        };
        Ok(Attribute::Directive(Directive {
            kind,
            name: directive_name,
            modifiers: segments.collect(),
            expr,
        }))
    }

    fn parse_attr_value(&mut self) -> PResult<AttributeValue<'s>> {
        let quote = self
            .chars
            .next_if(|(_, c)| *c == '"' || *c == '\'')
            .map(|(_, c)| c);

        let mut parts = vec![];
        let mut text_start = self.pos();
        loop {
            let Some((i, c)) = self.chars.peek().copied() else {
                if let Some(quote) = quote {
                    return Err(self.emit_error(SyntaxErrorKind::ExpectChar(quote)));
                }
                self.push_attr_text(&mut parts, text_start, self.source.len());
                break;
            };
            if quote == Some(c) {
                self.push_attr_text(&mut parts, text_start, i);
                self.chars.next();
                break;
            } else if c == '{' {
                self.push_attr_text(&mut parts, text_start, i);
                self.chars.next();
                let expr = self.parse_expr()?;
                parts.push(AttributeValuePart::MustacheTag(Tag {
                    span: Span::new(i, self.pos()),
                    expr,
                }));
                text_start = self.pos();
            } else if quote.is_none()
                && (c.is_ascii_whitespace() || c == '>' || self.starts_with("/>"))
            {
                self.push_attr_text(&mut parts, text_start, i);
                break;
            } else {
                self.chars.next();
            }
        }

        if quote.is_none() && parts.is_empty() {
            Err(self.emit_error(SyntaxErrorKind::ExpectAttrValue))
        } else {
            Ok(AttributeValue::Parts(parts))
        }
    }

    fn push_attr_text(&self, parts: &mut Vec<AttributeValuePart<'s>>, start: usize, end: usize) {
        if start < end {
            parts.push(AttributeValuePart::Text(TextNode {
                span: Span::new(start, end),
                raw: Cow::from(&self.source[start..end]),
            }));
        }
    }

    /// Scan a script expression until the `}` that closes it.
    /// The opening `{` must have been consumed; this consumes the `}`.
    fn parse_expr(&mut self) -> PResult<Expr<'s>> {
        let start = self.pos();
        let end = self.skip_expr(start)?;
        Ok(self.make_expr(start, end))
    }

    fn skip_expr(&mut self, start: usize) -> PResult<usize> {
        let mut depth = 0usize;
        loop {
            let Some((i, c)) = self.chars.next() else {
                return Err(SyntaxError {
                    kind: SyntaxErrorKind::UnterminatedExpression,
                    start,
                    end: self.source.len(),
                });
            };
            match c {
                '\'' | '"' => self.skip_string(c),
                '`' => self.skip_template_literal(start)?,
                '/' if self.chars.next_if(|(_, c)| *c == '/').is_some() => {
                    while self.chars.next_if(|(_, c)| *c != '\n').is_some() {}
                }
                '/' if self.chars.next_if(|(_, c)| *c == '*').is_some() => {
                    while !self.eat("*/") && self.chars.next().is_some() {}
                }
                '{' | '(' | '[' => depth += 1,
                '}' if depth == 0 => return Ok(i),
                '}' | ')' | ']' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
    }

    fn skip_string(&mut self, quote: char) {
        while let Some((_, c)) = self.chars.next() {
            if c == '\\' {
                self.chars.next();
            } else if c == quote || c == '\n' {
                break;
            }
        }
    }

    fn skip_template_literal(&mut self, start: usize) -> PResult<()> {
        loop {
            match self.chars.next() {
                Some((_, '\\')) => {
                    self.chars.next();
                }
                Some((_, '`')) => return Ok(()),
                Some((_, '$')) if self.chars.next_if(|(_, c)| *c == '{').is_some() => {
                    self.skip_expr(start)?;
                }
                Some(..) => {}
                None => {
                    return Err(SyntaxError {
                        kind: SyntaxErrorKind::UnterminatedExpression,
                        start,
                        end: self.source.len(),
                    });
                }
            }
        }
    }

    fn parse_identifier(&mut self) -> PResult<&'s str> {
        fn is_identifier_char(c: char) -> bool {
            c.is_ascii_alphanumeric() || c == '_' || c == '$' || !c.is_ascii()
        }

        let start = self.pos();
        if self
            .chars
            .next_if(|(_, c)| is_identifier_char(*c))
            .is_none()
        {
            return Err(self.emit_error(SyntaxErrorKind::ExpectIdentifier));
        }
        while self
            .chars
            .next_if(|(_, c)| is_identifier_char(*c))
            .is_some()
        {}
        let end = self.pos();
        Ok(&self.source[start..end])
    }

    /// `{expr}`, `{@tag ...}` or `{#block ...}`.
    fn parse_mustache(&mut self) -> PResult<Node<'s>> {
        let start = self.pos();
        let is_block_end = self.at_block_end();
        self.expect_char('{')?;
        match self.chars.peek() {
            Some((_, '#')) => {
                self.chars.next();
                let keyword = self.parse_identifier()?;
                self.skip_ws();
                match keyword {
                    "if" => self
                        .parse_if_block(start)
                        .map(|block| Node::IfBlock(Box::new(block))),
                    "each" => self
                        .parse_each_block(start)
                        .map(|block| Node::EachBlock(Box::new(block))),
                    "await" => self
                        .parse_await_block(start)
                        .map(|block| Node::AwaitBlock(Box::new(block))),
                    "key" => self.parse_key_block(start).map(Node::KeyBlock),
                    "snippet" => self.parse_snippet_block(start).map(Node::SnippetBlock),
                    _ => Err(SyntaxError {
                        kind: SyntaxErrorKind::UnknownSvelteBlock(keyword.to_owned()),
                        start,
                        end: self.pos(),
                    }),
                }
            }
            Some((_, '@')) => {
                self.chars.next();
                let name = self.parse_identifier()?;
                self.skip_ws();
                match name {
                    "debug" => {
                        let header = self.parse_expr()?;
                        let identifiers = split_top_level(header.raw, ',')
                            .into_iter()
                            .map(|(s, e)| self.make_expr(header.span.start + s, header.span.start + e))
                            .filter(|expr| !expr.raw.is_empty())
                            .collect();
                        Ok(Node::DebugTag(DebugTag {
                            span: Span::new(start, self.pos()),
                            identifiers,
                        }))
                    }
                    "html" | "const" | "render" => {
                        let expr = self.parse_expr()?;
                        let tag = Tag {
                            span: Span::new(start, self.pos()),
                            expr,
                        };
                        Ok(match name {
                            "html" => Node::RawMustacheTag(tag),
                            "const" => Node::ConstTag(tag),
                            _ => Node::RenderTag(tag),
                        })
                    }
                    _ => Err(SyntaxError {
                        kind: SyntaxErrorKind::UnknownSvelteTag(name.to_owned()),
                        start,
                        end: self.pos(),
                    }),
                }
            }
            Some((_, c @ (':' | '/'))) if *c == ':' || is_block_end => {
                let c = *c;
                self.chars.next();
                let name = self.parse_identifier().unwrap_or_default();
                Err(SyntaxError {
                    kind: if c == ':' {
                        SyntaxErrorKind::UnexpectedBlockBranch(name.to_owned())
                    } else {
                        SyntaxErrorKind::ExpectElement
                    },
                    start,
                    end: self.pos(),
                })
            }
            _ => {
                let expr = self.parse_expr()?;
                Ok(Node::MustacheTag(Tag {
                    span: Span::new(start, self.pos()),
                    expr,
                }))
            }
        }
    }

    fn parse_block_children(&mut self, block: &'static str) -> PResult<Vec<Node<'s>>> {
        let mut children = vec![];
        loop {
            match self.chars.peek().copied() {
                Some((_, '{')) if self.starts_with("{:") || self.at_block_end() => break,
                Some(..) => children.push(self.parse_node()?),
                None => return Err(self.emit_error(SyntaxErrorKind::ExpectSvelteBlockEnd(block))),
            }
        }
        Ok(children)
    }

    /// Consume `{/name}` and return the end position.
    fn parse_block_end(&mut self, block: &'static str) -> PResult<usize> {
        let matched = self.try_parse(|parser| {
            if parser.eat("{/") && parser.eat(block) {
                parser.skip_ws();
                parser.expect_char('}')
            } else {
                Err(parser.emit_error(SyntaxErrorKind::ExpectSvelteBlockEnd(block)))
            }
        });
        match matched {
            Ok(..) => Ok(self.pos()),
            Err(..) => Err(self.emit_error(SyntaxErrorKind::ExpectSvelteBlockEnd(block))),
        }
    }

    /// Consume `{:name` and return the name of the branch, if any.
    fn parse_branch_start(&mut self) -> Option<&'s str> {
        self.try_parse(|parser| {
            if parser.eat("{:") {
                parser.parse_identifier()
            } else {
                Err(parser.emit_error(SyntaxErrorKind::ExpectChar(':')))
            }
        })
        .ok()
    }

    fn unexpected_branch(&mut self, start: usize, name: &str) -> SyntaxError {
        SyntaxError {
            kind: SyntaxErrorKind::UnexpectedBlockBranch(name.to_owned()),
            start,
            end: self.pos(),
        }
    }

    fn parse_if_block(&mut self, start: usize) -> PResult<IfBlock<'s>> {
        let expr = self.parse_expr()?;
        let mut block = self.parse_if_rest(start, expr)?;
        block.span.end = self.parse_block_end("if")?;
        Ok(block)
    }

    /// Children and branches of an if block, without the closing `{/if}`
    /// which is shared by an `{:else if}` chain.
    fn parse_if_rest(&mut self, start: usize, expr: Expr<'s>) -> PResult<IfBlock<'s>> {
        let children = self.parse_block_children("if")?;
        let branch_start = self.pos();
        let else_block = match self.parse_branch_start() {
            Some("else") => {
                self.skip_ws();
                let is_else_if = self.starts_with("if")
                    && self.source[self.pos() + 2..].starts_with(|c: char| c.is_ascii_whitespace());
                if is_else_if {
                    self.eat("if");
                    self.skip_ws();
                    let expr = self.parse_expr()?;
                    let nested = self.parse_if_rest(branch_start, expr)?;
                    Some(ElseBlock {
                        children: vec![Node::IfBlock(Box::new(nested))],
                    })
                } else {
                    self.expect_char('}')?;
                    let children = self.parse_block_children("if")?;
                    Some(ElseBlock { children })
                }
            }
            Some(name) => return Err(self.unexpected_branch(branch_start, name)),
            None => None,
        };
        Ok(IfBlock {
            span: Span::new(start, self.pos()),
            expr,
            children,
            else_block,
        })
    }

    fn parse_each_block(&mut self, start: usize) -> PResult<EachBlock<'s>> {
        let header = self.parse_expr()?;
        let offset = header.span.start;
        let raw = header.raw;

        let (expr, mut context, mut index, mut key) = match find_keyword(raw, "as") {
            Some(as_pos) => (
                self.make_expr(offset, offset + as_pos),
                Some((as_pos + 2, raw.len())),
                None,
                None,
            ),
            None => (header, None, None, None),
        };
        if let Some((ctx_start, mut ctx_end)) = context {
            let rest = raw[ctx_start..ctx_end].trim_end();
            if rest.ends_with(')')
                && let Some(open) = matching_open_paren(rest)
            {
                let rest_end = ctx_start + rest.len();
                key = Some(self.make_expr(offset + ctx_start + open + 1, offset + rest_end - 1));
                ctx_end = ctx_start + open;
            }
            if let Some((comma, _)) = top_level_chars(&raw[ctx_start..ctx_end])
                .into_iter()
                .rfind(|(_, c)| *c == ',')
            {
                let name = raw[ctx_start + comma + 1..ctx_end].trim();
                if helpers::is_identifier(name) {
                    index = Some(name);
                    ctx_end = ctx_start + comma;
                }
            }
            context = Some((ctx_start, ctx_end));
        }
        let context = context.map(|(s, e)| self.make_expr(offset + s, offset + e));

        let children = self.parse_block_children("each")?;
        let branch_start = self.pos();
        let else_block = match self.parse_branch_start() {
            Some("else") => {
                self.skip_ws();
                self.expect_char('}')?;
                let children = self.parse_block_children("each")?;
                Some(ElseBlock { children })
            }
            Some(name) => return Err(self.unexpected_branch(branch_start, name)),
            None => None,
        };
        let end = self.parse_block_end("each")?;

        Ok(EachBlock {
            span: Span::new(start, end),
            expr,
            context,
            index,
            key,
            children,
            else_block,
        })
    }

    fn parse_await_block(&mut self, start: usize) -> PResult<AwaitBlock<'s>> {
        let header = self.parse_expr()?;
        let offset = header.span.start;
        let raw = header.raw;

        let mut value = None;
        let mut error = None;
        let mut pending = BlockBody::default();
        let mut then = BlockBody::default();
        let mut catch = BlockBody::default();

        let expr = if let Some(pos) = find_keyword(raw, "then") {
            value = Some(self.make_expr(offset + pos + 4, offset + raw.len()))
                .filter(|expr| !expr.raw.is_empty());
            then.children = self.parse_block_children("await")?;
            self.make_expr(offset, offset + pos)
        } else if let Some(pos) = find_keyword(raw, "catch") {
            error = Some(self.make_expr(offset + pos + 5, offset + raw.len()))
                .filter(|expr| !expr.raw.is_empty());
            catch.children = self.parse_block_children("await")?;
            self.make_expr(offset, offset + pos)
        } else {
            pending.children = self.parse_block_children("await")?;
            header
        };

        loop {
            let branch_start = self.pos();
            match self.parse_branch_start() {
                Some(name @ ("then" | "catch")) => {
                    self.skip_ws();
                    let binding = self.parse_expr()?;
                    let binding = Some(binding).filter(|expr| !expr.raw.is_empty());
                    let body = BlockBody {
                        children: self.parse_block_children("await")?,
                    };
                    if name == "then" {
                        value = binding;
                        then = body;
                    } else {
                        error = binding;
                        catch = body;
                    }
                }
                Some(name) => return Err(self.unexpected_branch(branch_start, name)),
                None => break,
            }
        }
        let end = self.parse_block_end("await")?;

        Ok(AwaitBlock {
            span: Span::new(start, end),
            expr,
            value,
            error,
            pending,
            then,
            catch,
        })
    }

    fn parse_key_block(&mut self, start: usize) -> PResult<KeyBlock<'s>> {
        let expr = self.parse_expr()?;
        let children = self.parse_block_children("key")?;
        let branch_start = self.pos();
        if let Some(name) = self.parse_branch_start() {
            return Err(self.unexpected_branch(branch_start, name));
        }
        let end = self.parse_block_end("key")?;
        Ok(KeyBlock {
            span: Span::new(start, end),
            expr,
            children,
        })
    }

    fn parse_snippet_block(&mut self, start: usize) -> PResult<SnippetBlock<'s>> {
        let header = self.parse_expr()?;
        let offset = header.span.start;
        let raw = header.raw;

        let name_end = raw
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
            .unwrap_or(raw.len());
        if name_end == 0 {
            return Err(SyntaxError {
                kind: SyntaxErrorKind::ExpectIdentifier,
                start: offset,
                end: offset,
            });
        }
        let name = self.make_expr(offset, offset + name_end);

        let mut rest_start = name_end;
        let mut type_params = None;
        let after_name = &raw[name_end..];
        if after_name.trim_start().starts_with('<') {
            let open = name_end + (after_name.len() - after_name.trim_start().len());
            let mut depth = 0usize;
            for (i, c) in raw[open..].char_indices() {
                match c {
                    '<' => depth += 1,
                    '>' => {
                        depth -= 1;
                        if depth == 0 {
                            type_params = Some(raw[open + 1..open + i].trim());
                            rest_start = open + i + 1;
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }

        let rest = &raw[rest_start..];
        let params = match (rest.find('('), rest.rfind(')')) {
            (Some(open), Some(close)) if open < close => {
                let inner_start = rest_start + open + 1;
                let inner = &raw[inner_start..rest_start + close];
                split_top_level(inner, ',')
                    .into_iter()
                    .map(|(s, e)| self.make_expr(offset + inner_start + s, offset + inner_start + e))
                    .filter(|expr| !expr.raw.is_empty())
                    .collect()
            }
            _ => {
                return Err(SyntaxError {
                    kind: SyntaxErrorKind::ExpectChar('('),
                    start: offset + rest_start,
                    end: offset + raw.len(),
                });
            }
        };

        let children = self.parse_block_children("snippet")?;
        let end = self.parse_block_end("snippet")?;
        Ok(SnippetBlock {
            span: Span::new(start, end),
            name,
            type_params,
            params,
            children,
        })
    }
}

fn element_kind(name: &str) -> ElementKind {
    match name {
        "svelte:window" => ElementKind::Window,
        "svelte:head" => ElementKind::Head,
        "svelte:body" => ElementKind::Body,
        "svelte:document" => ElementKind::Document,
        "svelte:options" => ElementKind::Options,
        "svelte:fragment" => ElementKind::SlotTemplate,
        "svelte:component" | "svelte:self" => ElementKind::InlineComponent,
        "slot" => ElementKind::Slot,
        _ if name.starts_with(|c: char| c.is_ascii_uppercase()) || name.contains('.') => {
            ElementKind::InlineComponent
        }
        _ => ElementKind::Element,
    }
}

fn this_binding(attr: NativeAttribute) -> PResult<ThisBinding> {
    match attr.value {
        AttributeValue::Parts(parts) => match &parts[..] {
            [AttributeValuePart::MustacheTag(tag)] => Ok(ThisBinding::Expr(tag.expr)),
            [AttributeValuePart::Text(text)] => match text.raw {
                Cow::Borrowed(raw) => Ok(ThisBinding::Static(raw)),
                Cow::Owned(..) => Err(SyntaxError {
                    kind: SyntaxErrorKind::ExpectAttrValue,
                    start: attr.span.start,
                    end: attr.span.end,
                }),
            },
            _ => Err(SyntaxError {
                kind: SyntaxErrorKind::ExpectAttrValue,
                start: attr.span.start,
                end: attr.span.end,
            }),
        },
        AttributeValue::True => Err(SyntaxError {
            kind: SyntaxErrorKind::ExpectAttrValue,
            start: attr.span.start,
            end: attr.span.end,
        }),
    }
}

/// Characters of a script snippet that are outside any brackets,
/// string, template literal or comment.
fn top_level_chars(s: &str) -> Vec<(usize, char)> {
    let mut result = vec![];
    let mut depth = 0usize;
    let mut quote = None;
    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if let Some(q) = quote {
            if c == '\\' {
                chars.next();
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '/' if chars.next_if(|(_, c)| *c == '/').is_some() => {
                while chars.next_if(|(_, c)| *c != '\n').is_some() {}
            }
            '/' if chars.next_if(|(_, c)| *c == '*').is_some() => {
                let mut prev = None;
                for (_, c) in chars.by_ref() {
                    if prev == Some('*') && c == '/' {
                        break;
                    }
                    prev = Some(c);
                }
            }
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ if depth == 0 => result.push((i, c)),
            _ => {}
        }
    }
    result
}

/// Byte ranges of the parts separated by a top-level `separator`.
fn split_top_level(s: &str, separator: char) -> Vec<(usize, usize)> {
    let mut ranges = vec![];
    let mut start = 0;
    for (i, _) in top_level_chars(s)
        .into_iter()
        .filter(|(_, c)| *c == separator)
    {
        ranges.push((start, i));
        start = i + separator.len_utf8();
    }
    ranges.push((start, s.len()));
    ranges
}

/// Position of a top-level keyword surrounded by whitespace.
fn find_keyword(s: &str, keyword: &str) -> Option<usize> {
    top_level_chars(s).into_iter().find_map(|(i, _)| {
        (s[i..].starts_with(keyword)
            && s[..i].ends_with(|c: char| c.is_whitespace())
            && s[i + keyword.len()..].starts_with(|c: char| c.is_whitespace()))
        .then_some(i)
        .or_else(|| {
            // a keyword at the very end, such as `{#await promise then}`
            (s[i..] == *keyword && s[..i].ends_with(|c: char| c.is_whitespace())).then_some(i)
        })
    })
}

/// Position of the `(` matching the `)` which ends the text.
fn matching_open_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn is_tag_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' || c == ':' || !c.is_ascii()
}

fn is_attr_name_char(c: char) -> bool {
    !matches!(c, '"' | '\'' | '>' | '/' | '=' | '{' | '}') && !c.is_ascii_whitespace()
}

pub type PResult<T> = Result<T, SyntaxError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Root<'_> {
        match Parser::new(source).parse_root() {
            Ok(root) => root,
            Err(error) => panic!("failed to parse {source:?}: {error}"),
        }
    }

    fn parse_error(source: &str) -> SyntaxErrorKind {
        match Parser::new(source).parse_root() {
            Ok(..) => panic!("expected {source:?} to fail"),
            Err(error) => error.kind,
        }
    }

    fn first_element<'a, 's>(root: &'a Root<'s>) -> &'a Element<'s> {
        root.html
            .children
            .iter()
            .find_map(|node| match node {
                Node::Element(element) => Some(element),
                _ => None,
            })
            .expect("no element")
    }

    #[test]
    fn top_level_scripts_and_style_are_lifted() {
        let root = parse(
            "<script context=\"module\">export const a = 1;</script>\n<script lang=\"ts\">let b;</script>\n<div />\n<style>p{}</style>",
        );
        assert_eq!(root.module.as_ref().map(|s| s.content), Some("export const a = 1;"));
        assert_eq!(root.instance.as_ref().map(|s| s.content), Some("let b;"));
        assert_eq!(root.css.as_ref().map(|s| s.content), Some("p{}"));
        assert_eq!(root.html.children.len(), 4);
        assert!(matches!(root.html.children[2], Node::Element(..)));
    }

    #[test]
    fn duplicate_top_level_tags() {
        assert!(matches!(
            parse_error("<script>a</script><script>b</script>"),
            SyntaxErrorKind::DuplicateScript
        ));
        assert!(matches!(
            parse_error("<style></style><style></style>"),
            SyntaxErrorKind::DuplicateStyle
        ));
    }

    #[test]
    fn element_kinds() {
        let root = parse(
            "<svelte:head><title>t</title></svelte:head><Foo.Bar /><slot /><svelte:window on:resize={r} /><svelte:element this=\"div\" />",
        );
        let kinds = root
            .html
            .children
            .iter()
            .filter_map(|node| match node {
                Node::Element(element) => Some(element.kind),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            [
                ElementKind::Head,
                ElementKind::InlineComponent,
                ElementKind::Slot,
                ElementKind::Window,
                ElementKind::Element,
            ]
        );
        let Node::Element(head) = &root.html.children[0] else {
            panic!("expected head");
        };
        assert!(matches!(&head.children[0], Node::Element(title) if title.kind == ElementKind::Title));
        let Node::Element(dynamic) = &root.html.children[4] else {
            panic!("expected svelte:element");
        };
        assert!(matches!(dynamic.this, Some(ThisBinding::Static("div"))));
        assert!(dynamic.attrs.is_empty());
    }

    #[test]
    fn void_elements_and_doctype() {
        let root = parse("<!DOCTYPE html><input value=\"a\"><br/>text");
        let Node::Element(doctype) = &root.html.children[0] else {
            panic!("expected doctype");
        };
        assert_eq!(doctype.name, "!DOCTYPE");
        let Node::Element(input) = &root.html.children[1] else {
            panic!("expected input");
        };
        assert!(!input.self_closing);
        assert!(input.children.is_empty());
        let Node::Element(br) = &root.html.children[2] else {
            panic!("expected br");
        };
        assert!(br.self_closing);
    }

    #[test]
    fn attributes_and_directives() {
        let root = parse(
            "<input {value} {...rest} class=\"a {b} c\" disabled on:click|once|preventDefault={handle} bind:value transition:fade={{ duration: 1 }} style:color={c} />",
        );
        let attrs = &first_element(&root).attrs;
        assert_eq!(attrs.len(), 8);
        assert!(matches!(&attrs[0], Attribute::Attribute(NativeAttribute { name: "value", value: AttributeValue::Parts(parts), .. }) if matches!(&parts[..], [AttributeValuePart::AttributeShorthand(..)])));
        assert!(matches!(&attrs[1], Attribute::Spread(spread) if spread.expr.raw == "rest"));
        assert!(matches!(&attrs[2], Attribute::Attribute(NativeAttribute { value: AttributeValue::Parts(parts), .. }) if parts.len() == 3));
        assert!(matches!(&attrs[3], Attribute::Attribute(NativeAttribute { value: AttributeValue::True, .. })));
        let Attribute::Directive(on) = &attrs[4] else {
            panic!("expected directive");
        };
        assert_eq!(on.kind, DirectiveKind::EventHandler);
        assert_eq!(on.name, "click");
        assert_eq!(on.modifiers, ["once", "preventDefault"]);
        assert_eq!(on.expr.map(|expr| expr.raw), Some("handle"));
        assert!(matches!(&attrs[5], Attribute::Directive(Directive { kind: DirectiveKind::Binding, expr: None, .. })));
        assert!(matches!(&attrs[6], Attribute::Directive(Directive { kind: DirectiveKind::Transition { intro: true, outro: true }, expr: Some(expr), .. }) if expr.raw == "{ duration: 1 }"));
        assert!(matches!(&attrs[7], Attribute::StyleDirective(directive) if directive.name == "color"));
    }

    #[test]
    fn braces_inside_strings_and_templates() {
        let root = parse("<p>{'}' + `${a + '}'}}` /* } */}</p>");
        let Node::MustacheTag(tag) = &first_element(&root).children[0] else {
            panic!("expected mustache tag");
        };
        assert_eq!(tag.expr.raw, "'}' + `${a + '}'}}` /* } */");
    }

    #[test]
    fn if_else_if_chain() {
        let root = parse("{#if a}x{:else if b}y{:else}z{/if}");
        let Node::IfBlock(block) = &root.html.children[0] else {
            panic!("expected if block");
        };
        assert_eq!(block.expr.raw, "a");
        let Some(else_block) = &block.else_block else {
            panic!("expected else");
        };
        let [Node::IfBlock(nested)] = &else_block.children[..] else {
            panic!("expected else if");
        };
        assert_eq!(nested.expr.raw, "b");
        assert!(nested.else_block.is_some());
        assert_eq!(block.span.end, "{#if a}x{:else if b}y{:else}z{/if}".len());
    }

    #[test]
    fn each_header() {
        let root = parse("{#each items.filter((i) => i, x) as { id, name }, index (id)}{name}{:else}none{/each}");
        let Node::EachBlock(block) = &root.html.children[0] else {
            panic!("expected each block");
        };
        assert_eq!(block.expr.raw, "items.filter((i) => i, x)");
        assert_eq!(block.context.map(|expr| expr.raw), Some("{ id, name }"));
        assert_eq!(block.index, Some("index"));
        assert_eq!(block.key.map(|expr| expr.raw), Some("id"));
        assert!(block.else_block.is_some());
    }

    #[test]
    fn await_forms() {
        let root = parse("{#await p}wait{:then value}ok{:catch e}err{/await}{#await p then v}ok{/await}");
        let Node::AwaitBlock(full) = &root.html.children[0] else {
            panic!("expected await block");
        };
        assert_eq!(full.expr.raw, "p");
        assert_eq!(full.value.map(|expr| expr.raw), Some("value"));
        assert_eq!(full.error.map(|expr| expr.raw), Some("e"));
        assert_eq!(full.pending.children.len(), 1);
        let Node::AwaitBlock(short) = &root.html.children[1] else {
            panic!("expected await block");
        };
        assert_eq!(short.expr.raw, "p");
        assert_eq!(short.value.map(|expr| expr.raw), Some("v"));
        assert!(short.pending.children.is_empty());
        assert_eq!(short.then.children.len(), 1);
    }

    #[test]
    fn snippet_and_tags() {
        let root = parse("{#snippet row<T>(item: T, i = { a: 1 })}{@render child(item)}{@const x = 1}{@html h}{@debug a, b}{/snippet}");
        let Node::SnippetBlock(block) = &root.html.children[0] else {
            panic!("expected snippet");
        };
        assert_eq!(block.name.raw, "row");
        assert_eq!(block.type_params, Some("T"));
        assert_eq!(
            block.params.iter().map(|expr| expr.raw).collect::<Vec<_>>(),
            ["item: T", "i = { a: 1 }"]
        );
        assert!(matches!(&block.children[0], Node::RenderTag(tag) if tag.expr.raw == "child(item)"));
        assert!(matches!(&block.children[1], Node::ConstTag(..)));
        assert!(matches!(&block.children[2], Node::RawMustacheTag(..)));
        assert!(matches!(&block.children[3], Node::DebugTag(tag) if tag.identifiers.len() == 2));
    }

    #[test]
    fn raw_template_with_lang() {
        let root = parse("<template lang=\"pug\">\ndiv <b>\n</template>");
        let element = first_element(&root);
        assert!(matches!(&element.children[..], [Node::Text(text)] if text.raw == "\ndiv <b>\n"));
    }

    #[test]
    fn syntax_errors() {
        assert!(matches!(parse_error("<div></span>"), SyntaxErrorKind::ExpectCloseTag(name) if name == "div"));
        assert!(matches!(parse_error("{#foo a}{/foo}"), SyntaxErrorKind::UnknownSvelteBlock(name) if name == "foo"));
        assert!(matches!(parse_error("{#if a}b"), SyntaxErrorKind::ExpectSvelteBlockEnd("if")));
        assert!(matches!(parse_error("{#each a as b}{/if}"), SyntaxErrorKind::ExpectSvelteBlockEnd("each")));
        assert!(matches!(parse_error("{a"), SyntaxErrorKind::UnterminatedExpression));
        assert!(matches!(parse_error("{@foo a}"), SyntaxErrorKind::UnknownSvelteTag(..)));
        assert!(matches!(parse_error("</div>"), SyntaxErrorKind::UnexpectedCloseTag(name) if name == "div"));
        assert!(matches!(parse_error("<p>a</p>\ntext </span>"), SyntaxErrorKind::UnexpectedCloseTag(name) if name == "span"));
        assert!(matches!(parse_error("{#if a}</div>{/if}"), SyntaxErrorKind::UnexpectedCloseTag(..)));
    }

    #[test]
    fn expressions_starting_with_comments() {
        let root = parse("{/* } */ a}{// }\n b}");
        let [Node::MustacheTag(first), Node::MustacheTag(second)] = &root.html.children[..] else {
            panic!("expected two mustache tags");
        };
        assert_eq!(first.expr.raw, "/* } */ a");
        assert_eq!(second.expr.raw, "// }\n b");

        let root = parse("{#if a}{/* x */ b}{/if}");
        let Node::IfBlock(block) = &root.html.children[0] else {
            panic!("expected if block");
        };
        assert!(matches!(&block.children[..], [Node::MustacheTag(tag)] if tag.expr.raw == "/* x */ b"));
    }

    #[test]
    fn comments_in_each_header() {
        let root = parse("{#each items /* as, */ as item, i}{item}{/each}");
        let Node::EachBlock(block) = &root.html.children[0] else {
            panic!("expected each block");
        };
        assert_eq!(block.expr.raw, "items /* as, */");
        assert_eq!(block.context.map(|expr| expr.raw), Some("item"));
        assert_eq!(block.index, Some("i"));
    }

    #[test]
    fn error_location() {
        let source = "<div>\n  <p></span>\n</div>";
        let Err(error) = Parser::new(source).parse_root() else {
            panic!("expected error");
        };
        assert_eq!(error.location(source), (2, 6));
    }
}
