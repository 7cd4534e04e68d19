//! Wiki markup expansion
//!
//! Finds `{{{#!latex ... }}}` processor blocks and, when enabled,
//! `$...$` / `$$...$$` spans, and replaces each with its rendered fragment.
//! All other text passes through unchanged, including the body of any other
//! `{{{ ... }}}` block.

use crate::html;
use crate::render::{Renderer, MACRO_NAME};

/// A piece of a single line split on dollar delimiters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span<'a> {
    Text(&'a str),
    Inline(&'a str),
    Display(&'a str),
}

/// Split a line into text and math spans
///
/// `$$` is tried before `$`, and spans never cross a line. An unterminated
/// delimiter is kept as text.
pub fn split_math(line: &str) -> Vec<Span<'_>> {
    let mut spans = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while let Some(offset) = line[pos..].find('$') {
        let open = pos + offset;
        let (delim, is_display) = if line[open..].starts_with("$$") {
            ("$$", true)
        } else {
            ("$", false)
        };
        let body_start = open + delim.len();

        match line[body_start..].find(delim) {
            Some(len) => {
                if open > text_start {
                    spans.push(Span::Text(&line[text_start..open]));
                }
                let body = &line[body_start..body_start + len];
                spans.push(if is_display {
                    Span::Display(body)
                } else {
                    Span::Inline(body)
                });
                pos = body_start + len + delim.len();
                text_start = pos;
            }
            None => pos = body_start,
        }
    }

    if text_start < line.len() {
        spans.push(Span::Text(&line[text_start..]));
    }
    spans
}

/// Expand all formulas in `text` through `renderer`
pub async fn expand(text: &str, renderer: &Renderer) -> String {
    let use_dollars = renderer.config().use_dollars;
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        if let Some((content, consumed)) = processor_block(&lines[i..]) {
            out.push(renderer.render_html(MACRO_NAME, &content).await);
            i += consumed;
            continue;
        }

        if let Some(consumed) = verbatim_block(&lines[i..]) {
            out.extend(lines[i..i + consumed].iter().map(|line| line.to_string()));
            i += consumed;
            continue;
        }

        let line = lines[i];
        out.push(if use_dollars {
            expand_line(line, renderer).await
        } else {
            line.to_string()
        });
        i += 1;
    }

    out.join("\n")
}

async fn expand_line(line: &str, renderer: &Renderer) -> String {
    let mut expanded = String::with_capacity(line.len());
    for span in split_math(line) {
        match span {
            Span::Text(text) => expanded.push_str(text),
            Span::Inline(math) => expanded.push_str(&renderer.render_html(MACRO_NAME, math).await),
            Span::Display(math) => expanded.push_str(&html::display_block(
                &renderer.render_html(MACRO_NAME, math).await,
            )),
        }
    }
    expanded
}

/// Match a `{{{` / `#!latex` / ... / `}}}` block at the start of `lines`
///
/// Returns the block content and the number of lines consumed.
fn processor_block(lines: &[&str]) -> Option<(String, usize)> {
    let [open, shebang, rest @ ..] = lines else {
        return None;
    };
    if open.trim() != "{{{" || shebang.trim() != format!("#!{MACRO_NAME}") {
        return None;
    }

    let close = rest.iter().position(|line| line.trim() == "}}}")?;
    Some((rest[..close].join("\n"), close + 3))
}

/// Length of a non-formula `{{{ ... }}}` block at the start of `lines`
///
/// An unclosed block runs to the end of the text.
fn verbatim_block(lines: &[&str]) -> Option<usize> {
    let (open, rest) = lines.split_first()?;
    if open.trim() != "{{{" {
        return None;
    }

    let len = rest
        .iter()
        .position(|line| line.trim() == "}}}")
        .map_or(lines.len(), |close| close + 2);
    Some(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn dollar_renderer(dir: &TempDir) -> Renderer {
        Renderer::new(RenderConfig {
            cache_dir: dir.path().join("cache"),
            latex_cmd: PathBuf::from("latex"),
            dvipng_cmd: PathBuf::from("dvipng"),
            use_dollars: true,
            ..RenderConfig::default()
        })
    }

    #[test]
    fn split_inline_and_display() {
        assert_eq!(
            split_math("a $x$ b $$y$$ c"),
            vec![
                Span::Text("a "),
                Span::Inline("x"),
                Span::Text(" b "),
                Span::Display("y"),
                Span::Text(" c"),
            ]
        );
    }

    #[test]
    fn split_unterminated_is_text() {
        assert_eq!(split_math("costs $5"), vec![Span::Text("costs $5")]);
    }

    #[test]
    fn split_unterminated_display_falls_back_to_text() {
        assert_eq!(
            split_math("$$x and $y$"),
            vec![Span::Text("$$x and "), Span::Inline("y")]
        );
    }

    #[test]
    fn split_no_math() {
        assert_eq!(split_math("plain"), vec![Span::Text("plain")]);
        assert!(split_math("").is_empty());
    }

    #[test]
    fn processor_block_extracts_content() {
        let lines = ["{{{", "#!latex", "a = b", "c = d", "}}}", "after"];
        let (content, consumed) = processor_block(&lines).unwrap();
        assert_eq!(content, "a = b\nc = d");
        assert_eq!(consumed, 5);
    }

    #[test]
    fn processor_block_other_language_ignored() {
        let lines = ["{{{", "#!python", "print(1)", "}}}"];
        assert!(processor_block(&lines).is_none());
    }

    #[test]
    fn verbatim_block_spans_to_close() {
        let lines = ["{{{", "#!python", "x = '$a$'", "}}}", "after"];
        assert_eq!(verbatim_block(&lines), Some(4));
        assert_eq!(verbatim_block(&["{{{", "open"]), Some(2));
        assert_eq!(verbatim_block(&["text"]), None);
    }

    #[tokio::test]
    async fn code_block_bodies_pass_through() {
        let temp = TempDir::new().unwrap();
        let renderer = dollar_renderer(&temp);
        let text = "{{{\n#!python\nprint(\"$a$ and $$b$$\")\n}}}\n{{{\ncost: $5 or $6\n}}}";

        assert_eq!(expand(text, &renderer).await, text);
        assert!(!temp.path().join("cache").exists());
    }

    #[test]
    fn processor_block_unclosed_ignored() {
        let lines = ["{{{", "#!latex", "x"];
        assert!(processor_block(&lines).is_none());
    }
}
