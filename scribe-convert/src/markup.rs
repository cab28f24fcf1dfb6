//! Lenient tokenizer and tree builder for the storage format.
//!
//! This is not an XML parser: it never rejects input. Malformed tags fall
//! back to text, stray end tags are ignored, unclosed elements are closed at
//! end of input. CDATA sections are kept verbatim.
//!
//! A tag never extends past the next `<` (attribute values must escape it),
//! so a failed tag costs at most the distance to the next `<` and scanning
//! stays linear on runs of half-open tags.

use crate::dialect::{CDATA_CLOSE, CDATA_OPEN};
use crate::escape::unescape_entities;

/// Maximum element nesting kept in the tree. Deeper start tags are dropped
/// (their content is kept in the nearest open ancestor).
pub const MAX_DEPTH: usize = 256;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// A node of the parsed storage document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Text with entity references already decoded.
    Text(String),
    /// Verbatim CDATA content.
    CData(String),
}

/// An element with lower-cased name and attribute names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    /// Value of attribute `name`, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Direct child elements.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// First descendant element (depth-first) matching `pred`.
    pub fn find(&self, pred: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        for child in self.child_elements() {
            if pred(child) {
                return Some(child);
            }
            if let Some(found) = child.find(pred) {
                return Some(found);
            }
        }
        None
    }

    /// Concatenated text and CDATA content of all descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(t) | Node::CData(t) => out.push_str(t),
            Node::Element(e) => collect_text(&e.children, out),
        }
    }
}

/// A lexical token of the storage format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Start {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    End {
        name: String,
    },
    /// Raw text, entities not yet decoded.
    Text(&'a str),
    CData(&'a str),
}

/// Iterator over the tokens of a storage-format string.
///
/// Comments, doctype declarations and processing instructions are skipped.
pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let input = self.input;
        loop {
            if self.pos >= input.len() {
                return None;
            }
            let rest = &input[self.pos..];

            if !rest.starts_with('<') {
                let end = rest.find('<').unwrap_or(rest.len());
                self.pos += end;
                return Some(Token::Text(&rest[..end]));
            }

            if let Some(body) = rest.strip_prefix("<!--") {
                match body.find("-->") {
                    Some(i) => {
                        self.pos += 4 + i + 3;
                        continue;
                    }
                    None => {
                        log::debug!("unterminated comment at byte {}; keeping as text", self.pos);
                        self.pos = input.len();
                        return Some(Token::Text(rest));
                    }
                }
            }

            if let Some(body) = rest.strip_prefix(CDATA_OPEN) {
                let content = match body.find(CDATA_CLOSE) {
                    Some(i) => {
                        self.pos += CDATA_OPEN.len() + i + CDATA_CLOSE.len();
                        &body[..i]
                    }
                    None => {
                        log::debug!("unterminated CDATA at byte {}", self.pos);
                        self.pos = input.len();
                        body
                    }
                };
                return Some(Token::CData(content));
            }

            if rest.starts_with("<!") || rest.starts_with("<?") {
                match rest.find('>') {
                    Some(i) => {
                        self.pos += i + 1;
                        continue;
                    }
                    None => {
                        self.pos = input.len();
                        return Some(Token::Text(rest));
                    }
                }
            }

            let window = tag_window(rest);
            if let Some((token, consumed)) = end_tag(window).or_else(|| start_tag(window)) {
                self.pos += consumed;
                return Some(token);
            }

            log::trace!("bare '<' at byte {} treated as text", self.pos);
            self.pos += 1;
            return Some(Token::Text(&rest[..1]));
        }
    }
}

/// The part of `rest` (which starts with `<`) a tag may occupy: everything
/// before the next `<`.
fn tag_window(rest: &str) -> &str {
    match rest.get(1..).and_then(|tail| tail.find('<')) {
        Some(i) => &rest[..i + 1],
        None => rest,
    }
}

/// Length of the complete tag or comment at the start of `s`, if there is
/// one. Used by the encoder to tell hand-written markup from a stray `<`.
pub(crate) fn tag_len(s: &str) -> Option<usize> {
    if !s.starts_with('<') {
        return None;
    }
    let window = tag_window(s);
    if let Some(body) = window.strip_prefix("<!--") {
        return body.find("-->").map(|i| 4 + i + 3);
    }
    end_tag(window)
        .or_else(|| start_tag(window))
        .map(|(_, consumed)| consumed)
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ':' | '-' | '_' | '.')
}

/// Split a tag name off the front of `s`. The name must start with a letter.
fn tag_name(s: &str) -> Option<(&str, &str)> {
    if !s.chars().next()?.is_ascii_alphabetic() {
        return None;
    }
    let end = s.find(|c: char| !is_name_char(c)).unwrap_or(s.len());
    Some((&s[..end], &s[end..]))
}

fn end_tag<'a>(rest: &str) -> Option<(Token<'a>, usize)> {
    let after = rest.strip_prefix("</")?;
    let (name, tail) = tag_name(after)?;
    let trimmed = tail.trim_start();
    trimmed.strip_prefix('>')?;
    let consumed = rest.len() - trimmed.len() + 1;
    Some((
        Token::End {
            name: name.to_ascii_lowercase(),
        },
        consumed,
    ))
}

fn start_tag<'a>(rest: &str) -> Option<(Token<'a>, usize)> {
    let after = rest.strip_prefix('<')?;
    let (name, mut tail) = tag_name(after)?;
    let mut attrs = Vec::new();

    loop {
        tail = tail.trim_start();
        if let Some(t) = tail.strip_prefix("/>") {
            return Some((start(name, attrs, true), rest.len() - t.len()));
        }
        if let Some(t) = tail.strip_prefix('>') {
            return Some((start(name, attrs, false), rest.len() - t.len()));
        }

        let key_end = tail.find(|c: char| c.is_whitespace() || matches!(c, '=' | '>' | '/'))?;
        if key_end == 0 {
            return None;
        }
        let key = &tail[..key_end];
        tail = tail[key_end..].trim_start();

        let value = match tail.strip_prefix('=') {
            Some(t) => {
                let t = t.trim_start();
                let (value, remaining) = attr_value(t)?;
                tail = remaining;
                unescape_entities(value)
            }
            None => String::new(),
        };
        attrs.push((key.to_ascii_lowercase(), value));
    }
}

fn attr_value(s: &str) -> Option<(&str, &str)> {
    let quote = s.chars().next()?;
    if quote == '"' || quote == '\'' {
        let body = &s[1..];
        let end = body.find(quote)?;
        return Some((&body[..end], &body[end + 1..]));
    }
    let end = s.find(|c: char| c.is_whitespace() || c == '>').unwrap_or(s.len());
    Some((&s[..end], &s[end..]))
}

fn start<'a>(name: &str, attrs: Vec<(String, String)>, self_closing: bool) -> Token<'a> {
    Token::Start {
        name: name.to_ascii_lowercase(),
        attrs,
        self_closing,
    }
}

/// Parse a storage-format fragment into a node list.
pub fn parse_fragment(input: &str) -> Vec<Node> {
    // stack[0] is a nameless root that collects top-level nodes.
    let mut stack: Vec<Element> = vec![Element::default()];

    for token in Tokenizer::new(input) {
        match token {
            Token::Text(raw) => push_text(current(&mut stack), unescape_entities(raw)),
            Token::CData(content) => current(&mut stack)
                .children
                .push(Node::CData(content.to_string())),
            Token::Start {
                name,
                attrs,
                self_closing,
            } => {
                let void = self_closing || VOID_ELEMENTS.contains(&name.as_str());
                let element = Element {
                    name,
                    attrs,
                    children: Vec::new(),
                };
                if void {
                    current(&mut stack).children.push(Node::Element(element));
                } else if stack.len() > MAX_DEPTH {
                    log::debug!("nesting deeper than {MAX_DEPTH}; dropping <{}>", element.name);
                } else {
                    stack.push(element);
                }
            }
            Token::End { name } => match stack.iter().rposition(|e| e.name == name) {
                Some(idx) if idx > 0 => {
                    while stack.len() > idx {
                        close_top(&mut stack);
                    }
                }
                _ => log::debug!("ignoring stray </{name}>"),
            },
        }
    }

    while stack.len() > 1 {
        log::debug!("closing unterminated <{}>", stack[stack.len() - 1].name);
        close_top(&mut stack);
    }

    stack.pop().map(|root| root.children).unwrap_or_default()
}

fn current(stack: &mut [Element]) -> &mut Element {
    let last = stack.len() - 1;
    &mut stack[last]
}

fn close_top(stack: &mut Vec<Element>) {
    if let Some(element) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(Node::Element(element));
        }
    }
}

fn push_text(element: &mut Element, text: String) {
    if text.is_empty() {
        return;
    }
    match element.children.last_mut() {
        Some(Node::Text(prev)) => prev.push_str(&text),
        _ => element.children.push(Node::Text(text)),
    }
}
