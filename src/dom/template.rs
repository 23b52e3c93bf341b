//! Template markup parser.
//!
//! Turns component `.html` text into a small node tree that the DOM arena can
//! instantiate any number of times. Parsing is lenient the way `innerHTML`
//! is: it never fails.
//! - Comments, doctypes and processing instructions are dropped
//! - Void elements (`br`, `img`, `input`, ...) never take children
//! - `<style>` / `<script>` bodies are kept as raw text
//! - Stray closing tags are ignored, unclosed tags close at end of input
//! - Whitespace-only text between tags is dropped

// =============================================================================
// Types
// =============================================================================

/// One node of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateNode {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<TemplateNode>,
    },
    Text(String),
}

/// A parsed template, cached once per component name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    nodes: Vec<TemplateNode>,
    source: String,
}

impl Template {
    /// Parse template markup.
    pub fn parse(markup: &str) -> Self {
        Self {
            nodes: Parser::new(markup).parse(),
            source: markup.to_string(),
        }
    }

    /// Top-level nodes.
    pub fn nodes(&self) -> &[TemplateNode] {
        &self.nodes
    }

    /// The markup this template was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

// =============================================================================
// Parser
// =============================================================================

struct OpenElement {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<TemplateNode>,
}

impl OpenElement {
    fn close(self) -> TemplateNode {
        TemplateNode::Element {
            tag: self.tag,
            attributes: self.attributes,
            children: self.children,
        }
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    stack: Vec<OpenElement>,
    root: Vec<TemplateNode>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            stack: Vec::new(),
            root: Vec::new(),
        }
    }

    fn parse(mut self) -> Vec<TemplateNode> {
        while self.pos < self.src.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.skip_past("-->");
            } else if rest.starts_with("</") {
                self.parse_close_tag();
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.skip_past(">");
            } else if is_open_tag_start(rest) {
                self.parse_open_tag();
            } else {
                self.parse_text();
            }
        }

        // Unclosed elements close at end of input
        while let Some(open) = self.stack.pop() {
            self.push_node(open.close());
        }
        self.root
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn push_node(&mut self, node: TemplateNode) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root.push(node),
        }
    }

    fn skip_past(&mut self, marker: &str) {
        match self.rest().find(marker) {
            Some(offset) => self.pos += offset + marker.len(),
            None => self.pos = self.src.len(),
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn read_name(&mut self) -> String {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/' || c == '=')
            .unwrap_or(rest.len());
        self.pos += end;
        rest[..end].to_ascii_lowercase()
    }

    fn parse_text(&mut self) {
        let start = self.pos;
        // A '<' that does not open a tag is literal text
        let mut end = start + self.rest().chars().next().map_or(1, char::len_utf8);
        while end < self.src.len() {
            let rest = &self.src[end..];
            if rest.starts_with('<')
                && (is_open_tag_start(rest) || rest.starts_with("</") || rest.starts_with("<!"))
            {
                break;
            }
            end += rest.chars().next().map_or(1, char::len_utf8);
        }
        self.pos = end;

        let raw = &self.src[start..end];
        if !raw.trim().is_empty() {
            self.push_node(TemplateNode::Text(decode_entities(raw)));
        }
    }

    fn parse_open_tag(&mut self) {
        self.pos += 1; // '<'
        let tag = self.read_name();
        let mut attributes = Vec::new();
        let mut self_closing = false;

        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                break;
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                self_closing = true;
                break;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break;
            }
            if rest.starts_with('/') {
                self.pos += 1;
                continue;
            }

            let name = self.read_name();
            if name.is_empty() {
                // Unparseable byte inside a tag: skip it
                self.pos += rest.chars().next().map_or(1, char::len_utf8);
                continue;
            }
            self.skip_whitespace();
            let value = if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                self.read_attribute_value()
            } else {
                String::new()
            };
            attributes.push((name, value));
        }

        if self_closing || VOID_ELEMENTS.contains(&tag.as_str()) {
            self.push_node(TemplateNode::Element {
                tag,
                attributes,
                children: Vec::new(),
            });
            return;
        }

        if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
            let closing = format!("</{tag}");
            let rest = self.rest();
            let end = find_ascii_case_insensitive(rest, &closing).unwrap_or(rest.len());
            let body = &rest[..end];
            self.pos += end;
            self.skip_past(">");
            let children = if body.is_empty() {
                Vec::new()
            } else {
                vec![TemplateNode::Text(body.to_string())]
            };
            self.push_node(TemplateNode::Element {
                tag,
                attributes,
                children,
            });
            return;
        }

        self.stack.push(OpenElement {
            tag,
            attributes,
            children: Vec::new(),
        });
    }

    fn read_attribute_value(&mut self) -> String {
        let rest = self.rest();
        let quote = rest.chars().next();
        match quote {
            Some(q @ ('"' | '\'')) => {
                let body = &rest[1..];
                let end = body.find(q).unwrap_or(body.len());
                self.pos += 1 + end + usize::from(end < body.len());
                decode_entities(&body[..end])
            }
            _ => {
                let end = rest
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                self.pos += end;
                decode_entities(&rest[..end])
            }
        }
    }

    fn parse_close_tag(&mut self) {
        self.pos += 2; // '</'
        let tag = self.read_name();
        self.skip_past(">");

        let Some(depth) = self.stack.iter().rposition(|open| open.tag == tag) else {
            return;
        };
        while self.stack.len() > depth {
            if let Some(open) = self.stack.pop() {
                self.push_node(open.close());
            }
        }
    }
}

fn is_open_tag_start(rest: &str) -> bool {
    let mut chars = rest.chars();
    chars.next() == Some('<') && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let haystack = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .find(|&i| haystack[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &TemplateNode) -> (&str, &[(String, String)], &[TemplateNode]) {
        match node {
            TemplateNode::Element {
                tag,
                attributes,
                children,
            } => (tag, attributes, children),
            TemplateNode::Text(text) => panic!("expected element, got text {text:?}"),
        }
    }

    #[test]
    fn test_nested_elements_and_attributes() {
        let template = Template::parse(
            r#"<div class="page" data-x='1'>
                 <h1>Hello &amp; welcome</h1>
                 <slice-route path="/settings" component=SettingsPage></slice-route>
               </div>"#,
        );

        assert_eq!(template.nodes().len(), 1);
        let (tag, attrs, children) = element(&template.nodes()[0]);
        assert_eq!(tag, "div");
        assert_eq!(
            attrs,
            &[
                ("class".to_string(), "page".to_string()),
                ("data-x".to_string(), "1".to_string())
            ]
        );
        assert_eq!(children.len(), 2);

        let (h1, _, h1_children) = element(&children[0]);
        assert_eq!(h1, "h1");
        assert_eq!(h1_children, &[TemplateNode::Text("Hello & welcome".to_string())]);

        let (route, route_attrs, _) = element(&children[1]);
        assert_eq!(route, "slice-route");
        assert_eq!(route_attrs[1], ("component".to_string(), "SettingsPage".to_string()));
    }

    #[test]
    fn test_void_and_self_closing() {
        let template = Template::parse("<p>a<br>b<img src=x.png/><slice-icon /></p>");
        let (_, _, children) = element(&template.nodes()[0]);
        assert_eq!(children.len(), 5);
        assert_eq!(element(&children[1]).0, "br");
        assert_eq!(element(&children[3]).0, "img");
        assert_eq!(element(&children[4]).0, "slice-icon");
    }

    #[test]
    fn test_lenient_recovery() {
        // Stray close, comment, unclosed tail
        let template = Template::parse("</span><!-- note --><ul><li>one<li>two</ul><b>tail");
        assert_eq!(template.nodes().len(), 2);
        let (ul, _, items) = element(&template.nodes()[0]);
        assert_eq!(ul, "ul");
        // Second <li> nests in the first: no implied end tags
        assert_eq!(items.len(), 1);
        assert_eq!(element(&template.nodes()[1]).0, "b");
    }

    #[test]
    fn test_raw_text_and_literal_angle() {
        let template = Template::parse("<style>a > b { color: red }</style><p>1 < 2</p>");
        let (_, _, style_children) = element(&template.nodes()[0]);
        assert_eq!(
            style_children,
            &[TemplateNode::Text("a > b { color: red }".to_string())]
        );
        let (_, _, p_children) = element(&template.nodes()[1]);
        assert_eq!(p_children, &[TemplateNode::Text("1 < 2".to_string())]);
    }

    #[test]
    fn test_multibyte_text() {
        let template = Template::parse("<h1>¿Listo?</h1><p>¡Hola, señor! 🎴</p>é");
        let (_, _, heading) = element(&template.nodes()[0]);
        assert_eq!(heading, &[TemplateNode::Text("¿Listo?".to_string())]);
        let (_, _, para) = element(&template.nodes()[1]);
        assert_eq!(para, &[TemplateNode::Text("¡Hola, señor! 🎴".to_string())]);
        assert_eq!(template.nodes()[2], TemplateNode::Text("é".to_string()));
    }

    #[test]
    fn test_empty_template() {
        let template = Template::parse("   \n  ");
        assert!(template.is_empty());
        assert_eq!(template.source(), "   \n  ");
    }
}
