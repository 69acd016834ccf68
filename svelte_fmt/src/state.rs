/// Context of ancestors, passed down while printing.
#[derive(Clone, Copy, Default)]
pub(crate) struct State<'s> {
    /// Inside `<pre>`.
    pub(crate) in_pre: bool,
    /// Name of the attribute whose value is being printed.
    pub(crate) attr_name: Option<&'s str>,
    /// The attribute belongs to a plain element rather than a component.
    pub(crate) attr_on_element: bool,
    /// The attribute value will be wrapped in quotes.
    pub(crate) in_quoted_attr: bool,
    /// Direct child of the markup fragment.
    pub(crate) is_top_level: bool,
    pub(crate) parent_is_block_element: bool,
    pub(crate) is_last_child: bool,
}

impl<'s> State<'s> {
    /// Attribute values are never reformatted, so they count as
    /// preformatted content too.
    pub(crate) fn is_pre_tag_content(&self) -> bool {
        self.in_pre || self.attr_name.is_some()
    }

    pub(crate) fn in_attr(self, name: &'s str, on_element: bool, quoted: bool) -> Self {
        State {
            attr_name: Some(name),
            attr_on_element: on_element,
            in_quoted_attr: quoted,
            ..self
        }
    }
}
