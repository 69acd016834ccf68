use insta::{Settings, assert_snapshot, glob};
use std::{borrow::Cow, collections::HashMap, fs, path::Path};
use svelte_fmt::{
    EmbeddedLanguage, FormatError, Hints, config::FormatOptions, format_text,
    format_text_with_diagnostics, is_svelte_file,
};

/// Stands in for a real script and style formatter: removes indentation,
/// which is enough for the output to be stable.
fn dedent(code: &str, _: Hints) -> Result<Cow<'_, str>, anyhow::Error> {
    Ok(code
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_owned()
        .into())
}

fn format(input: &str, options: &FormatOptions) -> String {
    format_text(input, options, dedent)
        .map_err(|err| format!("failed to format: {err}"))
        .unwrap()
}

#[test]
fn fmt_snapshot() {
    glob!("fmt/**/*.svelte", |path| {
        assert!(is_svelte_file(path));
        let input = fs::read_to_string(path).unwrap();

        let options = fs::read_to_string(path.with_file_name("config.toml"))
            .map(|config_file| {
                toml::from_str::<HashMap<String, FormatOptions>>(&config_file).unwrap()
            })
            .ok();

        if let Some(options) = options {
            options.into_iter().for_each(|(option_name, options)| {
                let output = run_format_test(path, &input, &options);
                build_settings(path).bind(|| {
                    let name = path.file_stem().unwrap().to_str().unwrap();
                    assert_snapshot!(format!("{name}.{option_name}"), output);
                });
            })
        } else {
            let output = run_format_test(path, &input, &Default::default());
            build_settings(path).bind(|| {
                let name = path.file_stem().unwrap().to_str().unwrap();
                assert_snapshot!(name, output);
            });
        }
    });
}

fn run_format_test(path: &Path, input: &str, options: &FormatOptions) -> String {
    let output = format_text(input, options, dedent)
        .map_err(|err| format!("failed to format '{}': {:?}", path.display(), err))
        .unwrap();
    let regression_format = format_text(&output, options, dedent)
        .map_err(|err| {
            format!(
                "syntax error in stability test '{}': {:?}",
                path.display(),
                err
            )
        })
        .unwrap();
    similar_asserts::assert_eq!(
        output,
        regression_format,
        "'{}' format is unstable",
        path.display()
    );

    output
}

fn build_settings(path: &Path) -> Settings {
    let mut settings = Settings::clone_current();
    settings.set_snapshot_path(path.parent().unwrap());
    settings.remove_snapshot_suffix();
    settings.set_prepend_module_to_snapshot(false);
    settings.remove_input_file();
    settings.set_omit_expression(true);
    settings.remove_info();
    settings
}

#[test]
fn inline_text_stays_on_one_line() {
    let output = format("<div>\nfoo,\nbar,\nbaz\n</div>", &Default::default());
    assert_eq!(output, "<div>foo, bar, baz</div>\n");
    assert_eq!(format(&output, &Default::default()), output);
}

#[test]
fn script_without_lang() {
    let mut languages = vec![];
    let output = format_text(
        "<script>\nlet x = 1\n</script>",
        &Default::default(),
        |code, hints: Hints| {
            languages.push((hints.language, hints.indent_level));
            dedent(code, hints)
        },
    )
    .unwrap();
    assert_eq!(output, "<script>\n  let x = 1\n</script>\n");
    assert_eq!(languages, [(EmbeddedLanguage::BabelTs, 2)]);
}

#[test]
fn adjacent_inline_elements() {
    let output = format(
        "<p>\n<b>Apples</b><i>Orange</i>\n</p>",
        &Default::default(),
    );
    assert_eq!(output, "<p>\n  <b>Apples</b><i>Orange</i>\n</p>\n");
}

#[test]
fn comment_before_block_stays() {
    let input = "<script>\nlet x = true;\n</script>\n\n<!-- shown when x -->\n{#if x}\n<p>x</p>\n{/if}\n";
    assert_eq!(
        format(input, &Default::default()),
        "<script>\n  let x = true;\n</script>\n\n<!-- shown when x -->\n{#if x}\n  <p>x</p>\n{/if}\n"
    );
}

#[test]
fn comment_travels_with_script() {
    let input = "<p>hi</p>\n\n<!-- the script -->\n<script>\nlet a = 1;\n</script>\n";
    let output = format(input, &Default::default());
    assert_eq!(
        output,
        "<!-- the script -->\n<script>\n  let a = 1;\n</script>\n\n<p>hi</p>\n"
    );
    assert_eq!(format(&output, &Default::default()), output);
}

#[test]
fn failed_region_is_kept() {
    let input = "<style>\n  p { color: red }\n</style>\n";
    let mut options = FormatOptions::default();
    options.language.quiet_embedded_errors = true;
    let formatted = format_text_with_diagnostics(input, &options, |code, hints: Hints| {
        if hints.language == EmbeddedLanguage::Css {
            anyhow::bail!("unexpected token");
        }
        dedent(code, hints)
    })
    .unwrap();
    assert_eq!(formatted.code, input);
    assert_eq!(formatted.diagnostics.len(), 1);
    match &formatted.diagnostics[0] {
        FormatError::External(error, code) => {
            assert_eq!(error.to_string(), "unexpected token");
            assert!(code.contains("p { color: red }"));
        }
        FormatError::Syntax(error) => panic!("unexpected syntax error: {error}"),
    }
}

#[test]
fn syntax_error() {
    let error = format_text("<div>\n{#if a}\n</div>", &Default::default(), dedent).unwrap_err();
    assert!(matches!(error, FormatError::Syntax(..)));
}

#[test]
fn ignored_range_is_preserved() {
    let ignored = "<!-- prettier-ignore-start -->\n<div   a = \"1\" >x</div>\n<span>  y  </span>\n<!-- prettier-ignore-end -->\n";
    let output = format(&format!("{ignored}<p>\nz\n</p>\n"), &Default::default());
    assert_eq!(output, format!("{ignored}<p>z</p>\n"));
}

#[test]
fn blank_lines_collapse() {
    assert_eq!(
        format("<p>a</p>\n\n\n\n<p>b</p>\n", &Default::default()),
        "<p>a</p>\n\n<p>b</p>\n"
    );
}

#[test]
fn shorthand_equivalence() {
    let options = FormatOptions::default();
    assert_eq!(
        format("<input value={value}>", &options),
        format("<input {value}>", &options)
    );

    let mut options = FormatOptions::default();
    options.language.allow_shorthand = false;
    assert_eq!(format("<input {value}>", &options), "<input value={value} />\n");
}

#[test]
fn keep_section_order() {
    let mut options = FormatOptions::default();
    options.language.sort_order = "none".parse().unwrap();
    assert_eq!(
        format(
            "<style>p{}</style>\n<p>a</p>\n<script>let a;</script>\n",
            &options
        ),
        "<style>\n  p{}\n</style>\n<p>a</p>\n<script>\n  let a;\n</script>\n"
    );
}

#[test]
fn pragma() {
    let mut options = FormatOptions::default();
    options.language.insert_pragma = true;
    let output = format("<p>a</p>\n", &options);
    assert_eq!(output, "<!-- @format -->\n<p>a</p>\n");
    assert_eq!(format(&output, &options), output);
}

#[test]
fn embedded_in_markdown() {
    let mut options = FormatOptions::default();
    options.language.embedded_in_markdown = true;
    assert_eq!(format("<p>a</p>\n", &options), "<p>a</p>");
}

#[test]
fn text_next_to_block_element() {
    let output = format("<div>a <p>b</p> c</div>", &Default::default());
    assert_eq!(output, "<div>\n  a\n  <p>b</p>\n  c\n</div>\n");
    assert_eq!(format(&output, &Default::default()), output);
}

#[test]
fn multi_line_comment_travels_with_script() {
    let input = "<p>hi</p>\n\n<!--\n  the script\n-->\n<script>\nlet a = 1;\n</script>\n";
    let output = format(input, &Default::default());
    assert_eq!(
        output,
        "<!--\n  the script\n-->\n<script>\n  let a = 1;\n</script>\n\n<p>hi</p>\n"
    );
    assert_eq!(format(&output, &Default::default()), output);
}

#[test]
fn byte_order_mark() {
    assert_eq!(
        format("\u{feff}<p>\na\n</p>\n", &Default::default()),
        "\u{feff}<p>a</p>\n"
    );
}

#[test]
fn stray_close_tag() {
    let error = format_text("<p>a</p>\n</div>\n", &Default::default(), dedent).unwrap_err();
    assert!(matches!(error, FormatError::Syntax(..)));
}

#[test]
fn expression_starting_with_comment() {
    let input = "{/* } */ a}\n";
    assert_eq!(format(input, &Default::default()), input);
}
