//! Types about configuration.

#[cfg(feature = "config_serde")]
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "config_serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config_serde", serde(rename_all = "camelCase", default))]
/// The whole configuration of svelte_fmt.
pub struct FormatOptions {
    #[cfg_attr(feature = "config_serde", serde(flatten))]
    pub layout: LayoutOptions,
    #[cfg_attr(feature = "config_serde", serde(flatten))]
    pub language: LanguageOptions,
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "config_serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config_serde", serde(rename_all = "camelCase", default))]
/// Configuration related to layout, such as indentation or print width.
pub struct LayoutOptions {
    pub print_width: usize,
    pub use_tabs: bool,
    pub indent_width: usize,
    pub line_break: LineBreak,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            print_width: 80,
            use_tabs: false,
            indent_width: 2,
            line_break: LineBreak::Lf,
        }
    }
}

#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "config_serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config_serde", serde(rename_all = "camelCase"))]
pub enum LineBreak {
    #[default]
    Lf,
    Crlf,
}

impl From<LineBreak> for tiny_pretty::LineBreak {
    fn from(value: LineBreak) -> Self {
        match value {
            LineBreak::Lf => tiny_pretty::LineBreak::Lf,
            LineBreak::Crlf => tiny_pretty::LineBreak::Crlf,
        }
    }
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "config_serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config_serde", serde(rename_all = "camelCase", default))]
/// Configuration related to syntax.
pub struct LanguageOptions {
    /// Order of the top-level sections, or [`SortOrder::None`] to keep them where they are.
    #[cfg_attr(feature = "config_serde", serde(rename = "svelteSortOrder"))]
    pub sort_order: SortOrder,

    /// Quote attribute expressions (`attr="{value}"`) and only self-close
    /// plain elements that are void elements.
    #[cfg_attr(feature = "config_serde", serde(rename = "svelteStrictMode"))]
    pub strict_mode: bool,

    /// Print `{name}` instead of `name={name}`.
    #[cfg_attr(feature = "config_serde", serde(rename = "svelteAllowShorthand"))]
    pub allow_shorthand: bool,

    /// Put the `>` of a multi-line opening tag on its own line.
    #[cfg_attr(feature = "config_serde", serde(rename = "svelteBracketNewLine"))]
    pub bracket_new_line: bool,

    /// Indent the content of `<script>` and `<style>` tags.
    #[cfg_attr(feature = "config_serde", serde(rename = "svelteIndentScriptAndStyle"))]
    pub indent_script_and_style: bool,

    pub single_attribute_per_line: bool,

    #[cfg_attr(feature = "config_serde", serde(rename = "htmlWhitespaceSensitivity"))]
    pub whitespace_sensitivity: WhitespaceSensitivity,

    /// Prefer single quotes in expressions; forwarded to the script formatter.
    pub single_quote: bool,

    /// Insert `<!-- @format -->` at the top of the file if there isn't one.
    pub insert_pragma: bool,

    /// Whether the external formatter can format `<template lang="pug">`.
    pub pug_formatter: bool,

    /// Set when the document is a code block embedded in another document
    /// such as Markdown. The final line break is dropped.
    pub embedded_in_markdown: bool,

    /// Don't log errors of the external formatter.
    /// They're still reported through diagnostics.
    pub quiet_embedded_errors: bool,
}

impl Default for LanguageOptions {
    fn default() -> Self {
        Self {
            sort_order: SortOrder::default(),
            strict_mode: false,
            allow_shorthand: true,
            bracket_new_line: true,
            indent_script_and_style: true,
            single_attribute_per_line: false,
            whitespace_sensitivity: WhitespaceSensitivity::default(),
            single_quote: false,
            insert_pragma: false,
            pug_formatter: false,
            embedded_in_markdown: false,
            quiet_embedded_errors: false,
        }
    }
}

impl LanguageOptions {
    pub(crate) fn bracket_same_line(&self) -> bool {
        !self.bracket_new_line
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config_serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config_serde", serde(rename_all = "camelCase"))]
pub enum WhitespaceSensitivity {
    #[default]
    Css,
    Strict,
    Ignore,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// One top-level section of a component.
pub enum Section {
    Options,
    Scripts,
    Markup,
    Styles,
}

impl Section {
    fn as_str(self) -> &'static str {
        match self {
            Section::Options => "options",
            Section::Scripts => "scripts",
            Section::Markup => "markup",
            Section::Styles => "styles",
        }
    }
}

impl FromStr for Section {
    type Err = ParseSortOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "options" => Ok(Section::Options),
            "scripts" => Ok(Section::Scripts),
            "markup" => Ok(Section::Markup),
            "styles" => Ok(Section::Styles),
            _ => Err(ParseSortOrderError(s.to_owned())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "config_serde",
    derive(Serialize, Deserialize),
    serde(try_from = "String", into = "String")
)]
pub enum SortOrder {
    /// Keep top-level sections where they were written.
    None,
    Sections([Section; 4]),
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Sections([
            Section::Options,
            Section::Scripts,
            Section::Markup,
            Section::Styles,
        ])
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseSortOrderError(String);

impl fmt::Display for ParseSortOrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid sort order '{}'", self.0)
    }
}

impl std::error::Error for ParseSortOrderError {}

impl FromStr for SortOrder {
    type Err = ParseSortOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "none" {
            return Ok(SortOrder::None);
        }

        let mut sections = s
            .split('-')
            .map(Section::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ParseSortOrderError(s.to_owned()))?;
        // orders written before `<svelte:options>` was sortable
        if sections.len() == 3 && !sections.contains(&Section::Options) {
            sections.insert(0, Section::Options);
        }
        match sections[..] {
            [a, b, c, d]
                if [Section::Options, Section::Scripts, Section::Markup, Section::Styles]
                    .iter()
                    .all(|section| [a, b, c, d].contains(section)) =>
            {
                Ok(SortOrder::Sections([a, b, c, d]))
            }
            _ => Err(ParseSortOrderError(s.to_owned())),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::None => f.write_str("none"),
            SortOrder::Sections(sections) => f.write_str(
                &sections
                    .iter()
                    .map(|section| section.as_str())
                    .collect::<Vec<_>>()
                    .join("-"),
            ),
        }
    }
}

impl TryFrom<String> for SortOrder {
    type Error = ParseSortOrderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SortOrder> for String {
    fn from(value: SortOrder) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sort_order() {
        assert_eq!("none".parse::<SortOrder>(), Ok(SortOrder::None));
        assert_eq!(
            "markup-styles-scripts-options".parse::<SortOrder>(),
            Ok(SortOrder::Sections([
                Section::Markup,
                Section::Styles,
                Section::Scripts,
                Section::Options,
            ]))
        );
        assert_eq!(
            "scripts-markup-styles".parse::<SortOrder>(),
            Ok(SortOrder::default())
        );
        assert!("scripts-scripts-markup-styles".parse::<SortOrder>().is_err());
        assert!("scripts-markup".parse::<SortOrder>().is_err());
        assert!("".parse::<SortOrder>().is_err());
    }

    #[test]
    fn sort_order_display() {
        assert_eq!(
            SortOrder::default().to_string(),
            "options-scripts-markup-styles"
        );
        assert_eq!(SortOrder::None.to_string(), "none");
    }
}
