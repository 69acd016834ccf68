use svelte_fmt::{config::FormatOptions, format_text_with_diagnostics, is_svelte_file};
use std::{convert::Infallible, env, error::Error, fs};

fn main() -> Result<(), Box<dyn Error>> {
    let Some(file_path) = env::args().nth(1) else {
        return Err("usage: fmt <file.svelte>".into());
    };
    if !is_svelte_file(&file_path) {
        return Err(format!("'{file_path}' is not a Svelte component").into());
    }
    let code = fs::read_to_string(&file_path)?;

    let formatted = format_text_with_diagnostics(&code, &FormatOptions::default(), |code, _| {
        Ok::<_, Infallible>(code.into())
    })?;
    print!("{}", formatted.code);
    Ok(())
}
