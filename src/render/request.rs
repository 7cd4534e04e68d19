//! Per-call render input

const LABEL_OPEN: &str = r"\label{";

/// Formula source plus the equation label found in it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Source as written in the wiki page
    pub source: String,
    /// First `\label{...}` argument, if any
    pub label: Option<String>,
}

impl RenderRequest {
    /// Build a request, extracting the label from `source`
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let label = extract_label(&source).map(str::to_string);
        Self { source, label }
    }

    /// Source with surrounding whitespace removed
    pub fn stripped(&self) -> &str {
        self.source.trim()
    }
}

/// Argument of the first complete `\label{...}` in `source`
///
/// The argument ends at the first closing brace and may not span lines; a
/// label left open at the end of its line is skipped.
pub fn extract_label(source: &str) -> Option<&str> {
    source.match_indices(LABEL_OPEN).find_map(|(at, _)| {
        let rest = &source[at + LABEL_OPEN.len()..];
        let line = rest.split('\n').next().unwrap_or_default();
        line.find('}').map(|end| &line[..end])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_found_anywhere() {
        let req = RenderRequest::new("a = b \\label{eq:one}\n c = d");
        assert_eq!(req.label.as_deref(), Some("eq:one"));
    }

    #[test]
    fn first_label_wins() {
        assert_eq!(
            extract_label("\\label{first}\n\\label{second}"),
            Some("first")
        );
    }

    #[test]
    fn no_label() {
        assert_eq!(RenderRequest::new("x^2").label, None);
    }

    #[test]
    fn unterminated_label_ignored() {
        assert_eq!(extract_label("\\label{oops"), None);
    }

    #[test]
    fn label_does_not_span_lines() {
        assert_eq!(extract_label("\\label{a\nb}"), None);
        assert_eq!(
            extract_label("\\label{a\nb} = c \\label{eq2}"),
            Some("eq2")
        );
    }

    #[test]
    fn empty_label_is_kept() {
        assert_eq!(extract_label("\\label{}"), Some(""));
    }

    #[test]
    fn stripped_trims_both_ends() {
        let req = RenderRequest::new("\n  x  \n");
        assert_eq!(req.stripped(), "x");
    }
}
