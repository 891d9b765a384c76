//! Document head metadata collected during a render pass.
//!
//! The app sets a title and adds meta and link tags while rendering; the
//! worker turns them into markup for the template. The last value set in a
//! pass wins for the title; meta and link tags accumulate.

/// Escape text for an HTML text node.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape text for a double-quoted HTML attribute value.
pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render `<tag a="b" ...>` from attribute pairs.
pub(crate) fn void_tag(tag: &str, attrs: &[(String, String)]) -> String {
    let mut out = format!("<{}", tag);
    for (name, value) in attrs {
        out.push_str(&format!(" {}=\"{}\"", name, escape_attr(value)));
    }
    out.push('>');
    out
}

/// Title, meta and link tags for the document head.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Head {
    title: Option<String>,
    meta: Vec<Vec<(String, String)>>,
    links: Vec<Vec<(String, String)>>,
}

impl Head {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Add `<meta name=".." content="..">`.
    pub fn add_meta(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.meta.push(vec![
            ("name".to_string(), name.into()),
            ("content".to_string(), content.into()),
        ]);
    }

    /// Add a meta tag with arbitrary attributes (e.g. `property`, `charset`).
    pub fn add_meta_attrs(&mut self, attrs: Vec<(String, String)>) {
        self.meta.push(attrs);
    }

    /// Add `<link rel=".." href="..">`.
    pub fn add_link(&mut self, rel: impl Into<String>, href: impl Into<String>) {
        self.links.push(vec![
            ("rel".to_string(), rel.into()),
            ("href".to_string(), href.into()),
        ]);
    }

    pub fn title_tag(&self) -> String {
        match &self.title {
            Some(title) => format!("<title>{}</title>", escape_text(title)),
            None => String::new(),
        }
    }

    pub fn meta_tags(&self) -> String {
        self.meta.iter().map(|attrs| void_tag("meta", attrs)).collect()
    }

    pub fn link_tags(&self) -> String {
        self.links.iter().map(|attrs| void_tag("link", attrs)).collect()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// `<base href="..">` for the application's basename.
pub fn base_tag(basename: &str) -> String {
    format!("<base href=\"{}\">", escape_attr(basename))
}
