/// What the preview pane shows for a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub title: String,
    pub tags: Vec<String>,
    pub word_count: usize,
    pub reading_minutes: usize,
    /// Cover as a URL or data URL.
    pub cover_src: Option<String>,
    /// Serialized body markup.
    pub body_html: String,
}
