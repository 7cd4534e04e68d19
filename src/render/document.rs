//! LaTeX document assembly

/// Wraps formula source into a complete document for the typesetting engine
pub trait DocumentBuilder: Send + Sync {
    /// Produce the document text with `content` substituted in
    fn build(&self, content: &str) -> String;
}

/// Preamble + formula + `\end{document}`
#[derive(Debug, Clone)]
pub struct LatexDocument {
    preamble: String,
}

impl LatexDocument {
    /// Create a builder using the given document head
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            preamble: preamble.into(),
        }
    }
}

impl DocumentBuilder for LatexDocument {
    fn build(&self, content: &str) -> String {
        let mut doc = String::with_capacity(self.preamble.len() + content.len() + 16);
        doc.push_str(&self.preamble);
        doc.push_str(content);
        doc.push_str("\n\\end{document}\n");
        doc
    }
}
