//! HTML fragments returned to the wiki page

use askama::Template;

const ERROR_FALLBACK: &str =
    r#"<div id="content" class="error"><div class="message"><strong>TracMath error</strong></div></div>"#;

#[derive(Template)]
#[template(
    source = r#"{% if let Some(label) = label %}<a name="{{ label }}">({{ label }})</a>&nbsp;{% endif %}<img src="{{ src }}" alt="{{ alt }}" />"#,
    ext = "html"
)]
struct ImageTag<'a> {
    src: &'a str,
    alt: &'a str,
    label: Option<&'a str>,
}

#[derive(Template)]
#[template(
    source = r#"<div id="content" class="error"><div class="message"><strong>TracMath macro processor has detected an error. Please fix the problem before continuing.</strong><pre>{{ message }}</pre></div></div>"#,
    ext = "html"
)]
struct ErrorBox<'a> {
    message: &'a str,
}

/// `<img>` tag for a rendered formula, preceded by a named anchor when labelled
pub fn image_tag(src: &str, alt: &str, label: Option<&str>) -> String {
    ImageTag { src, alt, label }
        .render()
        .unwrap_or_else(|e| error_box(&format!("failed to render image tag: {e}")))
}

/// Error box shown in place of a formula
pub fn error_box(message: &str) -> String {
    ErrorBox { message }
        .render()
        .unwrap_or_else(|_| ERROR_FALLBACK.to_string())
}

/// Display-math wrapper used for `$$...$$`
pub fn display_block(inner: &str) -> String {
    format!("<blockquote>{inner}</blockquote>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_image() {
        let html = image_tag("/tracmath/abc.png", "x^2", None);
        assert_eq!(html, r#"<img src="/tracmath/abc.png" alt="x^2" />"#);
    }

    #[test]
    fn labelled_image_has_anchor() {
        let html = image_tag("/tracmath/abc.png", "x", Some("eq1"));
        assert!(html.starts_with(r#"<a name="eq1">(eq1)</a>&nbsp;<img"#));
    }

    #[test]
    fn alt_text_is_escaped() {
        let html = image_tag("/tracmath/abc.png", r#"a<b & "c""#, None);
        let alt = html
            .split_once(r#"alt=""#)
            .and_then(|(_, rest)| rest.strip_suffix(r#"" />"#))
            .unwrap();
        assert!(!alt.contains(['<', '"']));
        assert!(!alt.replace("&#", "").contains('&'));
        assert_eq!(alt, "a&#60;b &#38; &#34;c&#34;");
    }

    #[test]
    fn error_box_escapes_message() {
        let html = error_box("<script>alert(1)</script>");
        assert!(html.contains("has detected an error"));
        assert!(!html.contains("<script>"));
    }
}
