//! Inline span scanner.
//!
//! Splits block text into [`Inline`] spans in one forward pass. At every
//! position the rules are tried in precedence order: backslash escape, code
//! span, image, link, bold, italic. Code spans are claimed before emphasis so
//! their content is never reinterpreted, and bold is tried before italic so a
//! single-asterisk rule cannot eat half of a `**` pair.
//!
//! Closing-delimiter searches are memoised per delimiter kind. Once a search
//! from some position comes up empty, later openers of the same kind fail
//! without rescanning, so long runs of unmatched markers stay linear.

/// Nesting levels below the top at which emphasis and links are still recognised.
const MAX_DEPTH: usize = 2;

/// An inline span borrowed from the block text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline<'a> {
    Text(&'a str),
    Code(&'a str),
    Strong(Vec<Inline<'a>>),
    Emphasis(Vec<Inline<'a>>),
    Link { text: Vec<Inline<'a>>, href: &'a str },
    Image { alt: &'a str, src: &'a str },
}

/// Scan `text` into inline spans.
pub fn parse_inlines(text: &str) -> Vec<Inline<'_>> {
    parse_at_depth(text, 0)
}

fn parse_at_depth(text: &str, depth: usize) -> Vec<Inline<'_>> {
    let mut scanner = Scanner {
        text,
        depth,
        out: Vec::new(),
        text_start: 0,
        memo: Vec::new(),
    };
    scanner.run();
    scanner.out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closer {
    Backticks(usize),
    Byte(u8),
    Emphasis { marker: u8, width: usize },
}

struct Memo {
    closer: Closer,
    from: usize,
    found: Option<usize>,
}

struct Scanner<'a> {
    text: &'a str,
    depth: usize,
    out: Vec<Inline<'a>>,
    text_start: usize,
    memo: Vec<Memo>,
}

impl<'a> Scanner<'a> {
    fn run(&mut self) {
        let bytes = self.text.as_bytes();
        let mut pos = 0;

        while pos < bytes.len() {
            let nesting = self.depth < MAX_DEPTH;
            pos = match bytes[pos] {
                b'\\' => self.escape(pos).unwrap_or(pos + 1),
                b'`' => {
                    let run = run_len(bytes, pos, b'`');
                    self.code_span(pos, run).unwrap_or(pos + run)
                }
                b'!' if bytes.get(pos + 1) == Some(&b'[') => self.image(pos).unwrap_or(pos + 1),
                b'[' if nesting => self.link(pos).unwrap_or(pos + 1),
                marker @ (b'*' | b'_') if nesting => {
                    let run = run_len(bytes, pos, marker);
                    self.emphasis(pos, marker, run).unwrap_or(pos + run)
                }
                _ => pos + 1,
            };
        }

        let text = self.text;
        if self.text_start < text.len() {
            self.out.push(Inline::Text(&text[self.text_start..]));
        }
    }

    fn push(&mut self, start: usize, end: usize, node: Inline<'a>) {
        let text = self.text;
        if self.text_start < start {
            self.out.push(Inline::Text(&text[self.text_start..start]));
        }
        self.out.push(node);
        self.text_start = end;
    }

    fn escape(&mut self, pos: usize) -> Option<usize> {
        let text = self.text;
        let next = *text.as_bytes().get(pos + 1)?;
        if !next.is_ascii_punctuation() {
            return None;
        }
        self.push(pos, pos + 2, Inline::Text(&text[pos + 1..pos + 2]));
        Some(pos + 2)
    }

    fn code_span(&mut self, pos: usize, run: usize) -> Option<usize> {
        let text = self.text;
        let close = self.find_closer(Closer::Backticks(run), pos + run)?;
        let mut inner = &text[pos + run..close];
        if inner.len() >= 2
            && inner.starts_with(' ')
            && inner.ends_with(' ')
            && !inner.bytes().all(|b| b == b' ')
        {
            inner = &inner[1..inner.len() - 1];
        }
        let end = close + run;
        self.push(pos, end, Inline::Code(inner));
        Some(end)
    }

    fn image(&mut self, pos: usize) -> Option<usize> {
        let text = self.text;
        let close = self.find_closer(Closer::Byte(b']'), pos + 2)?;
        let (src, end) = self.destination(close + 1)?;
        let alt = &text[pos + 2..close];
        self.push(pos, end, Inline::Image { alt, src });
        Some(end)
    }

    fn link(&mut self, pos: usize) -> Option<usize> {
        let text = self.text;
        let close = self.find_closer(Closer::Byte(b']'), pos + 1)?;
        let (href, end) = self.destination(close + 1)?;
        let children = parse_at_depth(&text[pos + 1..close], self.depth + 1);
        self.push(pos, end, Inline::Link { text: children, href });
        Some(end)
    }

    /// Parse `(url)`, `(<url with spaces>)` or `(url "title")` at `at`; the
    /// title is dropped.
    fn destination(&mut self, at: usize) -> Option<(&'a str, usize)> {
        let text = self.text;
        if text.as_bytes().get(at) != Some(&b'(') {
            return None;
        }
        let close = self.find_closer(Closer::Byte(b')'), at + 1)?;
        let raw = text[at + 1..close].trim();
        let href = match raw.strip_prefix('<').and_then(|r| r.find('>').map(|end| &r[..end])) {
            Some(bracketed) => bracketed,
            None => raw.split_whitespace().next().unwrap_or(""),
        };
        Some((href, close + 1))
    }

    fn emphasis(&mut self, pos: usize, marker: u8, run: usize) -> Option<usize> {
        let text = self.text;
        // `_` inside a word (snake_case) is not a delimiter.
        if marker == b'_' && text[..pos].chars().next_back().is_some_and(char::is_alphanumeric) {
            return None;
        }
        if run >= 2 {
            if let Some(end) = self.delimited(pos, marker, 2) {
                return Some(end);
            }
        }
        self.delimited(pos, marker, 1)
    }

    fn delimited(&mut self, pos: usize, marker: u8, width: usize) -> Option<usize> {
        let text = self.text;
        let open_end = pos + width;
        if text[open_end..].chars().next()?.is_whitespace() {
            return None;
        }
        let close = self.find_closer(Closer::Emphasis { marker, width }, open_end + 1)?;
        let children = parse_at_depth(&text[open_end..close], self.depth + 1);
        let node = if width == 2 {
            Inline::Strong(children)
        } else {
            Inline::Emphasis(children)
        };
        let end = close + width;
        self.push(pos, end, node);
        Some(end)
    }

    fn find_closer(&mut self, closer: Closer, from: usize) -> Option<usize> {
        if from > self.text.len() {
            return None;
        }
        if let Some(memo) = self.memo.iter().find(|m| m.closer == closer) {
            if memo.from <= from && memo.found.is_none_or(|f| f >= from) {
                return memo.found;
            }
        }

        let found = self.scan_closer(closer, from);
        match self.memo.iter_mut().find(|m| m.closer == closer) {
            Some(memo) => {
                memo.from = from;
                memo.found = found;
            }
            None => self.memo.push(Memo { closer, from, found }),
        }
        found
    }

    fn scan_closer(&self, closer: Closer, from: usize) -> Option<usize> {
        let text = self.text;
        let bytes = text.as_bytes();
        match closer {
            Closer::Byte(b) => text[from..].find(b as char).map(|i| from + i),
            Closer::Backticks(n) => {
                let mut i = from;
                while let Some(off) = text[i..].find('`') {
                    let start = i + off;
                    let run = run_len(bytes, start, b'`');
                    if run == n {
                        return Some(start);
                    }
                    i = start + run;
                }
                None
            }
            Closer::Emphasis { marker, width } => text[from..]
                .match_indices(marker as char)
                .map(|(i, _)| from + i)
                .find(|&i| self.is_closer(i, marker, width)),
        }
    }

    fn is_closer(&self, i: usize, marker: u8, width: usize) -> bool {
        let text = self.text;
        let bytes = text.as_bytes();
        if i == 0 || bytes.len() < i + width || bytes[i..i + width].iter().any(|&b| b != marker) {
            return false;
        }
        let before = bytes[i - 1];
        if before.is_ascii_whitespace() || before == marker {
            return false;
        }
        if width == 1 && bytes.get(i + 1) == Some(&marker) {
            return false;
        }
        if marker == b'_' && text[i + width..].chars().next().is_some_and(char::is_alphanumeric) {
            return false;
        }
        true
    }
}

fn run_len(bytes: &[u8], pos: usize, b: u8) -> usize {
    bytes[pos..].iter().take_while(|&&c| c == b).count()
}
