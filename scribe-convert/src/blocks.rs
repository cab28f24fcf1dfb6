//! Markdown block segmentation.
//!
//! Each line is classified on its own ([`classify_line`]), then a single
//! forward scan groups lines into [`Block`]s using a small [`State`] enum.
//! Nothing here looks further than the current line, so there is no
//! backtracking on adversarial input.

/// Which kind of list marker opened a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// `- item` or `* item`
    Unordered,
    /// `1. item`
    Ordered,
}

/// A fence delimiter: the marker character and how many of it opened the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fence {
    marker: u8,
    len: usize,
}

impl Fence {
    /// True if `line` is a bare marker line that closes this fence.
    pub fn closes(&self, line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.len() >= self.len && trimmed.bytes().all(|b| b == self.marker)
    }
}

/// A block of the input document, borrowing its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block<'a> {
    Heading { level: u8, text: &'a str },
    /// A run of consecutive text lines.
    Paragraph(Vec<&'a str>),
    List { kind: ListKind, items: Vec<&'a str> },
    Code { lang: Option<&'a str>, body: Vec<&'a str> },
    Quote(&'a str),
    Rule,
    /// A line that already starts with markup; passed through untouched.
    Raw(&'a str),
}

/// Classification of a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    Blank,
    FenceOpen { fence: Fence, lang: Option<&'a str> },
    Heading { level: u8, text: &'a str },
    Rule,
    Item { kind: ListKind, text: &'a str },
    Quote(&'a str),
    Raw(&'a str),
    Text(&'a str),
}

/// Classify one line. Checks run in a fixed order: blank, fence, heading,
/// rule, list item, blockquote, raw markup, text.
pub fn classify_line(line: &str) -> Line<'_> {
    let trimmed = line.trim_start();
    if trimmed.trim_end().is_empty() {
        return Line::Blank;
    }
    if let Some((fence, lang)) = fence_open(trimmed) {
        return Line::FenceOpen { fence, lang };
    }
    if let Some((level, text)) = heading(trimmed) {
        return Line::Heading { level, text };
    }
    if is_rule(trimmed) {
        return Line::Rule;
    }
    if let Some((kind, text)) = list_item(trimmed) {
        return Line::Item { kind, text };
    }
    if let Some(rest) = trimmed.strip_prefix('>') {
        let rest = rest.strip_prefix(' ').unwrap_or(rest);
        return Line::Quote(rest.trim_end());
    }
    if starts_with_markup(trimmed) {
        return Line::Raw(line);
    }
    Line::Text(line.trim())
}

fn fence_open(trimmed: &str) -> Option<(Fence, Option<&str>)> {
    let marker = *trimmed.as_bytes().first()?;
    if marker != b'`' && marker != b'~' {
        return None;
    }
    let len = trimmed.bytes().take_while(|&b| b == marker).count();
    if len < 3 {
        return None;
    }
    let info = trimmed[len..].trim();
    if marker == b'`' && info.contains('`') {
        return None;
    }
    let lang = info.split_whitespace().next();
    Some((Fence { marker, len }, lang))
}

fn heading(trimmed: &str) -> Option<(u8, &str)> {
    let level = trimmed.bytes().take_while(|&b| b == b'#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }
    let text = rest.trim();
    // Optional closing sequence: `## Title ##`
    let without_closing = text.trim_end_matches('#');
    let text = if without_closing.is_empty() || without_closing.ends_with([' ', '\t']) {
        without_closing.trim_end()
    } else {
        text
    };
    Some((level as u8, text))
}

fn is_rule(trimmed: &str) -> bool {
    let Some(marker) = trimmed.chars().next() else {
        return false;
    };
    if !matches!(marker, '-' | '*' | '_') {
        return false;
    }
    let mut count = 0;
    for c in trimmed.chars() {
        if c == marker {
            count += 1;
        } else if !c.is_whitespace() {
            return false;
        }
    }
    count >= 3
}

fn list_item(trimmed: &str) -> Option<(ListKind, &str)> {
    if let Some(rest) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
        return Some((ListKind::Unordered, rest.trim()));
    }
    let digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || digits > 9 {
        return None;
    }
    let rest = trimmed[digits..].strip_prefix(". ")?;
    Some((ListKind::Ordered, rest.trim()))
}

fn starts_with_markup(trimmed: &str) -> bool {
    crate::markup::tag_len(trimmed).is_some()
}

/// Scanner state between lines.
enum State<'a> {
    Idle,
    Paragraph(Vec<&'a str>),
    List {
        kind: ListKind,
        items: Vec<&'a str>,
    },
    Fence {
        fence: Fence,
        lang: Option<&'a str>,
        body: Vec<&'a str>,
    },
}

/// Split a Markdown document (frontmatter already removed) into blocks.
///
/// Line endings are normalised: a trailing `\r` is dropped from every line,
/// fence bodies included, so a CRLF file encodes the same as its LF twin.
pub fn segment(text: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let mut state = State::Idle;

    for raw in text.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        state = step(state, line, &mut blocks);
    }
    close(state, &mut blocks);

    blocks
}

fn step<'a>(state: State<'a>, line: &'a str, blocks: &mut Vec<Block<'a>>) -> State<'a> {
    // Fence bodies are opaque: only the closing marker is looked at.
    if let State::Fence { fence, lang, mut body } = state {
        if fence.closes(line) {
            blocks.push(Block::Code { lang, body });
            return State::Idle;
        }
        body.push(line);
        return State::Fence { fence, lang, body };
    }

    match (state, classify_line(line)) {
        (State::List { kind, mut items }, Line::Item { kind: item_kind, text }) if item_kind == kind => {
            items.push(text);
            State::List { kind, items }
        }
        (State::Paragraph(mut lines), Line::Text(text)) => {
            lines.push(text);
            State::Paragraph(lines)
        }
        (state, class) => {
            close(state, blocks);
            open(class, blocks)
        }
    }
}

fn open<'a>(line: Line<'a>, blocks: &mut Vec<Block<'a>>) -> State<'a> {
    match line {
        Line::Blank => State::Idle,
        Line::FenceOpen { fence, lang } => State::Fence {
            fence,
            lang,
            body: Vec::new(),
        },
        Line::Heading { level, text } => {
            blocks.push(Block::Heading { level, text });
            State::Idle
        }
        Line::Rule => {
            blocks.push(Block::Rule);
            State::Idle
        }
        Line::Item { kind, text } => State::List {
            kind,
            items: vec![text],
        },
        Line::Quote(text) => {
            blocks.push(Block::Quote(text));
            State::Idle
        }
        Line::Raw(line) => {
            blocks.push(Block::Raw(line));
            State::Idle
        }
        Line::Text(text) => State::Paragraph(vec![text]),
    }
}

fn close<'a>(state: State<'a>, blocks: &mut Vec<Block<'a>>) {
    match state {
        State::Idle => {}
        State::Paragraph(lines) => blocks.push(Block::Paragraph(lines)),
        State::List { kind, items } => blocks.push(Block::List { kind, items }),
        State::Fence { lang, body, .. } => {
            log::debug!("code fence not closed before end of input; keeping {} body lines", body.len());
            blocks.push(Block::Code { lang, body });
        }
    }
}
