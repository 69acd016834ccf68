//! Bodies of `<script>` and `<style>` tags are moved into an attribute
//! before parsing, so that the template parser never sees script or
//! style syntax. The body is stored base64-encoded in the
//! [`SNIPPED_TAG_CONTENT_ATTRIBUTE`] attribute and replaced with a short
//! placeholder.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use regex::Regex;
use std::{borrow::Cow, sync::LazyLock};

/// Reserved attribute name which carries the snipped body.
pub const SNIPPED_TAG_CONTENT_ATTRIBUTE: &str = "✂prettier:content✂";

const SCRIPT_PLACEHOLDER: &str = "{}";
const STYLE_PLACEHOLDER: &str = "";

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| tag_regex("script"));
static STYLE_RE: LazyLock<Regex> = LazyLock::new(|| tag_regex("style"));
static SNIPPED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#" {SNIPPED_TAG_CONTENT_ATTRIBUTE}="([A-Za-z0-9+/=]*)">"#
    ))
    .unwrap()
});

fn tag_regex(tag_name: &str) -> Regex {
    Regex::new(&format!(
        r#"(?s)<!--.*?-->|<{tag_name}((?:\s+[^=>'"/\s]+=(?:"[^"]*"|'[^']*'|[^>\s]+)|\s+[^=>'"/\s]+)*\s*)>(.*?)</{tag_name}>"#
    ))
    .unwrap()
}

type Spans = Vec<(usize, usize)>;

/// Replace bodies of all `<script>` and `<style>` tags that aren't inside
/// HTML comments with a placeholder.
pub fn snip(source: &str) -> String {
    let mut spans = TagSpans {
        script: match_spans(source, &SCRIPT_RE),
        style: match_spans(source, &STYLE_RE),
    };

    let others = spans.style.clone();
    let source = snip_tag_content(source, "script", SCRIPT_PLACEHOLDER, &others, &mut spans);
    let others = spans.script.clone();
    snip_tag_content(&source, "style", STYLE_PLACEHOLDER, &others, &mut spans)
}

struct TagSpans {
    script: Spans,
    style: Spans,
}

fn match_spans(source: &str, regex: &Regex) -> Spans {
    regex
        .find_iter(source)
        .filter(|m| !m.as_str().starts_with("<!--"))
        .map(|m| (m.start(), m.end()))
        .collect()
}

fn snip_tag_content(
    source: &str,
    tag_name: &str,
    placeholder: &str,
    other_spans: &[(usize, usize)],
    spans: &mut TagSpans,
) -> String {
    let regex = if tag_name == "script" {
        &SCRIPT_RE
    } else {
        &STYLE_RE
    };
    // Span positions are compared against offsets of this pass's input,
    // so keep a copy of them as they were before this pass.
    let old_script = spans.script.clone();
    let old_style = spans.style.clone();

    let mut output = String::with_capacity(source.len());
    let mut last = 0;
    for captures in regex.captures_iter(source) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let index = whole.start();
        if whole.as_str().starts_with("<!--")
            || other_spans
                .iter()
                .any(|(start, end)| index > *start && index < *end)
        {
            continue;
        }

        let attributes = captures.get(1).map_or("", |m| m.as_str());
        let content = captures.get(2).map_or("", |m| m.as_str());
        let replacement = format!(
            r#"<{tag_name}{attributes} {SNIPPED_TAG_CONTENT_ATTRIBUTE}="{}">{placeholder}</{tag_name}>"#,
            BASE64.encode(content)
        );

        let delta = replacement.len() as isize - whole.len() as isize;
        adjust_spans(&old_script, &mut spans.script, index, delta);
        adjust_spans(&old_style, &mut spans.style, index, delta);

        output.push_str(&source[last..index]);
        output.push_str(&replacement);
        last = whole.end();
    }
    output.push_str(&source[last..]);
    output
}

fn adjust_spans(old: &[(usize, usize)], new: &mut [(usize, usize)], index: usize, delta: isize) {
    old.iter()
        .zip(new.iter_mut())
        .for_each(|((old_start, _), (start, end))| {
            if *old_start > index {
                *start = start.saturating_add_signed(delta);
                *end = end.saturating_add_signed(delta);
            } else if *old_start == index {
                *end = end.saturating_add_signed(delta);
            }
        });
}

/// Check if text contains snipped content, which needs [`unsnip`]
/// before handing it to anything else.
pub fn has_snipped_content(text: &str) -> bool {
    text.contains(SNIPPED_TAG_CONTENT_ATTRIBUTE)
}

/// Decode the value of [`SNIPPED_TAG_CONTENT_ATTRIBUTE`].
pub fn snipped_content(encoded: &str) -> Option<String> {
    BASE64
        .decode(encoded)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}

/// Restore every snipped tag body in text. Text without snipped content,
/// or with a payload that can't be decoded, is returned unchanged.
pub fn unsnip(text: &str) -> Cow<'_, str> {
    if !has_snipped_content(text) {
        return Cow::from(text);
    }

    let mut output = String::with_capacity(text.len());
    let mut last = 0;
    for captures in SNIPPED_RE.captures_iter(text) {
        let (Some(whole), Some(encoded)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let Some(content) = snipped_content(encoded.as_str()) else {
            return Cow::from(text);
        };
        // skip the placeholder
        let body_end = text[whole.end()..]
            .find("</")
            .map_or(text.len(), |i| whole.end() + i);

        output.push_str(&text[last..whole.start()]);
        output.push('>');
        output.push_str(&content);
        last = body_end;
    }
    output.push_str(&text[last..]);
    Cow::from(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_without_tags_is_unchanged() {
        let source = "<div>hello</div>\n{#if a}<p>b</p>{/if}";
        assert_eq!(snip(source), source);
        assert_eq!(unsnip(source), source);
    }

    #[test]
    fn snip_script_and_style() {
        let source = "<script lang=\"ts\">let a = 1;</script>\n<style>p { color: red }</style>";
        let snipped = snip(source);
        assert!(!snipped.contains("let a = 1;"));
        assert!(!snipped.contains("color: red"));
        assert!(snipped.contains(&format!(
            "<script lang=\"ts\" {SNIPPED_TAG_CONTENT_ATTRIBUTE}=\"{}\">{{}}</script>",
            BASE64.encode("let a = 1;")
        )));
        assert!(snipped.contains(&format!(
            "<style {SNIPPED_TAG_CONTENT_ATTRIBUTE}=\"{}\"></style>",
            BASE64.encode("p { color: red }")
        )));
        assert_eq!(unsnip(&snipped), source);
    }

    #[test]
    fn tags_inside_comments_are_kept() {
        let source = "<!-- <script>a</script> -->\n<script>b</script>\n<!-- <style>c</style> -->";
        let snipped = snip(source);
        assert!(snipped.starts_with("<!-- <script>a</script> -->"));
        assert!(snipped.ends_with("<!-- <style>c</style> -->"));
        assert!(!snipped.contains("<script>b</script>"));
        assert_eq!(unsnip(&snipped), source);
    }

    #[test]
    fn style_inside_script_is_left_to_script() {
        let source = "<script>const s = '<style>a{}</style>';</script>\n<style>b{}</style>";
        let snipped = snip(source);
        assert_eq!(snipped.matches(SNIPPED_TAG_CONTENT_ATTRIBUTE).count(), 2);
        assert_eq!(unsnip(&snipped), source);
    }

    #[test]
    fn round_trip_keeps_attribute_whitespace() {
        let source = "<script context=\"module\" >\n  export const x = 1;\n</script>\n<script  lang=ts>\n</script><p>{x}</p>";
        assert_eq!(unsnip(&snip(source)), source);
    }

    #[test]
    fn multiple_tags_of_same_kind() {
        let source = "<svelte:head><script src=\"a.js\"></script><style>h1{}</style></svelte:head>\n<script>let a;</script>\n<style>p{}</style>";
        assert_eq!(unsnip(&snip(source)), source);
    }

    #[test]
    fn unsnip_invalid_payload() {
        let text = format!("<script {SNIPPED_TAG_CONTENT_ATTRIBUTE}=\"@@\">{{}}</script>");
        assert_eq!(unsnip(&text), text);
        let text = format!("<script {SNIPPED_TAG_CONTENT_ATTRIBUTE}=\"/w==\">{{}}</script>");
        assert_eq!(unsnip(&text), text);
    }

    #[test]
    fn decode_attribute_value() {
        assert_eq!(
            snipped_content(&BASE64.encode("a < b")).as_deref(),
            Some("a < b")
        );
        assert_eq!(snipped_content("***"), None);
    }
}
