use std::borrow::Cow;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Byte range into the source text.
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

pub struct Root<'s> {
    pub html: Fragment<'s>,
    pub instance: Option<Script<'s>>,
    pub module: Option<Script<'s>>,
    pub css: Option<Style<'s>>,
}

impl Root<'_> {
    /// Spans of the lifted top-level `<script>` and `<style>` tags.
    pub fn embed_spans(&self) -> impl Iterator<Item = Span> + '_ {
        self.module
            .iter()
            .map(|script| script.span)
            .chain(self.instance.iter().map(|script| script.span))
            .chain(self.css.iter().map(|style| style.span))
    }
}

pub struct Fragment<'s> {
    pub children: Vec<Node<'s>>,
}

pub enum Node<'s> {
    AwaitBlock(Box<AwaitBlock<'s>>),
    Comment(Comment<'s>),
    ConstTag(Tag<'s>),
    DebugTag(DebugTag<'s>),
    EachBlock(Box<EachBlock<'s>>),
    Element(Element<'s>),
    IfBlock(Box<IfBlock<'s>>),
    KeyBlock(KeyBlock<'s>),
    MustacheTag(Tag<'s>),
    RawMustacheTag(Tag<'s>),
    RenderTag(Tag<'s>),
    /// Top-level `<script>` put back in place when sections are not sorted.
    Script(Script<'s>),
    SnippetBlock(SnippetBlock<'s>),
    /// Top-level `<style>` put back in place when sections are not sorted.
    Style(Style<'s>),
    Text(TextNode<'s>),
}

impl<'s> Node<'s> {
    pub fn span(&self) -> Span {
        match self {
            Node::AwaitBlock(block) => block.span,
            Node::Comment(comment) => comment.span,
            Node::ConstTag(tag)
            | Node::MustacheTag(tag)
            | Node::RawMustacheTag(tag)
            | Node::RenderTag(tag) => tag.span,
            Node::DebugTag(tag) => tag.span,
            Node::EachBlock(block) => block.span,
            Node::Element(element) => element.span,
            Node::IfBlock(block) => block.span,
            Node::KeyBlock(block) => block.span,
            Node::Script(script) => script.span,
            Node::SnippetBlock(block) => block.span,
            Node::Style(style) => style.span,
            Node::Text(text) => text.span,
        }
    }

    pub fn as_text(&self) -> Option<&TextNode<'s>> {
        if let Node::Text(text) = self {
            Some(text)
        } else {
            None
        }
    }
}

#[derive(Clone)]
pub struct TextNode<'s> {
    pub span: Span,
    /// Undecoded text. Whitespace at both ends may be trimmed while printing.
    pub raw: Cow<'s, str>,
}

#[derive(Clone)]
pub struct Comment<'s> {
    pub span: Span,
    /// Text between `<!--` and `-->`.
    pub data: &'s str,
}

#[derive(Clone, Copy)]
/// Raw source of a script expression, pattern or parameter list.
pub struct Expr<'s> {
    pub span: Span,
    pub raw: &'s str,
}

/// `{expr}`, `{@html expr}`, `{@const expr}` or `{@render expr}`.
pub struct Tag<'s> {
    pub span: Span,
    pub expr: Expr<'s>,
}

pub struct DebugTag<'s> {
    pub span: Span,
    pub identifiers: Vec<Expr<'s>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementKind {
    Element,
    InlineComponent,
    Slot,
    SlotTemplate,
    Window,
    Head,
    Title,
    Body,
    Document,
    Options,
}

pub enum ThisBinding<'s> {
    /// `<svelte:element this="div">`
    Static(&'s str),
    /// `<svelte:element this={tag}>` or `<svelte:component this={Component}>`
    Expr(Expr<'s>),
}

pub struct Element<'s> {
    pub span: Span,
    pub kind: ElementKind,
    pub name: &'s str,
    pub this: Option<ThisBinding<'s>>,
    pub attrs: Vec<Attribute<'s>>,
    pub children: Vec<Node<'s>>,
    /// Whether the source wrote `/>`.
    pub self_closing: bool,
}

pub enum Attribute<'s> {
    Attribute(NativeAttribute<'s>),
    Directive(Directive<'s>),
    Spread(Spread<'s>),
    StyleDirective(StyleDirective<'s>),
}

pub struct NativeAttribute<'s> {
    pub span: Span,
    pub name: &'s str,
    pub value: AttributeValue<'s>,
}

pub enum AttributeValue<'s> {
    /// Attribute without value, such as `disabled`.
    True,
    Parts(Vec<AttributeValuePart<'s>>),
}

pub enum AttributeValuePart<'s> {
    Text(TextNode<'s>),
    MustacheTag(Tag<'s>),
    /// `{name}` written in place of `name={name}`.
    AttributeShorthand(Expr<'s>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirectiveKind {
    /// `use:`
    Action,
    /// `animate:`
    Animation,
    /// `bind:`
    Binding,
    /// `class:`
    Class,
    /// `on:`
    EventHandler,
    /// `let:`
    Let,
    /// `ref:`
    Ref,
    /// `transition:`, `in:` or `out:`
    Transition { intro: bool, outro: bool },
}

pub struct Directive<'s> {
    pub kind: DirectiveKind,
    pub name: &'s str,
    pub modifiers: Vec<&'s str>,
    pub expr: Option<Expr<'s>>,
}

pub struct StyleDirective<'s> {
    pub name: &'s str,
    pub modifiers: Vec<&'s str>,
    pub value: AttributeValue<'s>,
}

pub struct Spread<'s> {
    pub expr: Expr<'s>,
}

pub struct IfBlock<'s> {
    pub span: Span,
    pub expr: Expr<'s>,
    pub children: Vec<Node<'s>>,
    pub else_block: Option<ElseBlock<'s>>,
}

/// `{:else}` branch. An `{:else if}` branch is an else block
/// whose only child is an [`IfBlock`].
pub struct ElseBlock<'s> {
    pub children: Vec<Node<'s>>,
}

pub struct EachBlock<'s> {
    pub span: Span,
    pub expr: Expr<'s>,
    pub context: Option<Expr<'s>>,
    pub index: Option<&'s str>,
    pub key: Option<Expr<'s>>,
    pub children: Vec<Node<'s>>,
    pub else_block: Option<ElseBlock<'s>>,
}

pub struct AwaitBlock<'s> {
    pub span: Span,
    pub expr: Expr<'s>,
    pub value: Option<Expr<'s>>,
    pub error: Option<Expr<'s>>,
    pub pending: BlockBody<'s>,
    pub then: BlockBody<'s>,
    pub catch: BlockBody<'s>,
}

#[derive(Default)]
/// Children of `{:then}`, `{:catch}` or the pending part of `{#await}`.
pub struct BlockBody<'s> {
    pub children: Vec<Node<'s>>,
}

pub struct KeyBlock<'s> {
    pub span: Span,
    pub expr: Expr<'s>,
    pub children: Vec<Node<'s>>,
}

pub struct SnippetBlock<'s> {
    pub span: Span,
    pub name: Expr<'s>,
    pub type_params: Option<&'s str>,
    pub params: Vec<Expr<'s>>,
    pub children: Vec<Node<'s>>,
}

#[derive(Clone)]
/// Comment moved in front of a top-level `<script>` or `<style>`.
pub struct RelocatedComment<'s> {
    pub comment: Comment<'s>,
    pub empty_line_after: bool,
}

pub struct Script<'s> {
    pub span: Span,
    pub attrs: Vec<Attribute<'s>>,
    /// Text between the tags; a placeholder once the source is snipped.
    pub content: &'s str,
    pub comments: Vec<RelocatedComment<'s>>,
}

pub struct Style<'s> {
    pub span: Span,
    pub attrs: Vec<Attribute<'s>>,
    pub content: &'s str,
    pub comments: Vec<RelocatedComment<'s>>,
}
