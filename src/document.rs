//! In-memory tree for a parsed schema document.

/// One element: tag, attributes in source order, child elements and its own text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    /// Direct text and CDATA content, concatenated, entities resolved.
    pub text: String,
    /// 1-based line of the opening tag.
    pub line: usize,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Child elements with the given tag, in document order.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == tag)
    }

    /// First child element with the given tag.
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == tag)
    }

    /// Text of the first child with the given tag, whitespace-normalized.
    pub fn child_text(&self, tag: &str) -> Option<String> {
        self.child(tag).map(Element::normalized_text)
    }

    /// Own text with line breaks folded to single spaces and ends trimmed.
    pub fn normalized_text(&self) -> String {
        self.text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}
