//! Storage format → Markdown.
//!
//! The input is parsed into a lenient element tree ([`crate::markup`]) and
//! rendered back in one walk. Recognised elements become Markdown syntax;
//! anything else is unwrapped and its text kept.

use crate::dialect::{
    ATTACHMENT_TAG, CODE_MACRO_NAME, FILENAME_ATTR, IMAGE_TAG, LANGUAGE_PARAM, MACRO_TAG,
    NAME_ATTR, NO_LANGUAGE, PARAMETER_TAG, PLAIN_TEXT_BODY_TAG, URL_TAG, URL_VALUE_ATTR,
};
use crate::escape::escape_markup_lookalikes;
use crate::markup::{Element, Node, parse_fragment};

/// Horizontal rule marker. Not `---`, which could be read back as a
/// frontmatter delimiter.
const RULE: &str = "* * *";

/// Elements rendered as blocks. Anything else is inline.
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "blockquote", "pre", "hr",
    "div", "section", "article", "header", "footer", "body", "html", "table", "thead",
    "tbody", "tfoot", "tr", "dl", "dt", "dd", "figure", "ac:rich-text-body", "ac:layout",
    "ac:layout-section", "ac:layout-cell", "ac:task-list", "ac:task",
];

/// Convert a storage-format document to Markdown.
///
/// Never fails. Unknown tags are dropped and their text content kept;
/// malformed markup ends up as literal text.
pub fn decode(storage: &str) -> String {
    let nodes = parse_fragment(storage);
    let mut out = Output::loose();
    render_blocks(&nodes, &mut out);
    out.finish().trim().to_string()
}

/// One rendered line. Lines of a code fence are verbatim: containers may
/// prefix them, but they are never trimmed or collapsed.
struct Line {
    text: String,
    verbatim: bool,
}

impl Line {
    fn prose(text: &str) -> Self {
        Self {
            text: text.to_string(),
            verbatim: false,
        }
    }

    fn verbatim(text: &str) -> Self {
        Self {
            text: text.to_string(),
            verbatim: true,
        }
    }

    /// Prefix the line, leaving empty lines empty.
    fn indented(self, pad: &str) -> Self {
        if self.text.is_empty() {
            return self;
        }
        Self {
            text: format!("{pad}{}", self.text),
            verbatim: self.verbatim,
        }
    }
}

/// Rendered blocks for one container.
struct Output {
    blocks: Vec<Vec<Line>>,
    loose: bool,
}

impl Output {
    /// Blocks separated by a blank line.
    fn loose() -> Self {
        Self {
            blocks: Vec::new(),
            loose: true,
        }
    }

    /// Blocks on consecutive lines, for list items.
    fn tight() -> Self {
        Self {
            blocks: Vec::new(),
            loose: false,
        }
    }

    /// Markdown whose blank lines may be collapsed.
    fn prose(&mut self, text: String) {
        let text = collapse_blank_lines(&text);
        if !text.is_empty() {
            self.blocks.push(text.lines().map(Line::prose).collect());
        }
    }

    /// A fenced code block, kept byte for byte.
    fn verbatim(&mut self, text: String) {
        self.blocks.push(text.split('\n').map(Line::verbatim).collect());
    }

    /// Lines already rendered by a nested container.
    fn lines(&mut self, lines: Vec<Line>) {
        if !lines.is_empty() {
            self.blocks.push(lines);
        }
    }

    fn into_lines(self) -> Vec<Line> {
        let mut out = Vec::new();
        for (i, block) in self.blocks.into_iter().enumerate() {
            if i > 0 && self.loose {
                out.push(Line::prose(""));
            }
            out.extend(block);
        }
        out
    }

    fn finish(self) -> String {
        self.into_lines()
            .into_iter()
            .map(|line| line.text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Drop leading and trailing blank lines and squeeze any run of blank lines
/// down to one.
fn collapse_blank_lines(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut previous_blank = false;
    for line in text.lines() {
        let line = line.trim_end();
        if line.trim_start().is_empty() {
            if !previous_blank && !lines.is_empty() {
                lines.push("");
            }
            previous_blank = true;
        } else {
            lines.push(line);
            previous_blank = false;
        }
    }
    while lines.last() == Some(&"") {
        lines.pop();
    }
    lines.join("\n")
}

fn is_block(element: &Element) -> bool {
    BLOCK_ELEMENTS.contains(&element.name.as_str()) || element.name == MACRO_TAG
}

fn is_code_macro(element: &Element) -> bool {
    element.name == MACRO_TAG && element.attr(NAME_ATTR) == Some(CODE_MACRO_NAME)
}

/// Render a node list as blocks. Runs of inline content between block
/// elements become paragraphs.
fn render_blocks(nodes: &[Node], out: &mut Output) {
    let mut paragraph = String::new();
    for node in nodes {
        match node {
            Node::Element(element) if is_block(element) => {
                flush_paragraph(&mut paragraph, out);
                render_block(element, out);
            }
            other => render_inline(other, &mut paragraph),
        }
    }
    flush_paragraph(&mut paragraph, out);
}

fn flush_paragraph(paragraph: &mut String, out: &mut Output) {
    let lines: Vec<&str> = paragraph.lines().map(str::trim).collect();
    let text = lines.join("\n");
    if !text.trim().is_empty() {
        out.prose(text);
    }
    paragraph.clear();
}

fn render_block(element: &Element, out: &mut Output) {
    match element.name.as_str() {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = usize::from(element.name.as_bytes()[1] - b'0');
            let text = single_line(&inline_children(element));
            if !text.is_empty() {
                out.prose(format!("{} {text}", "#".repeat(level)));
            }
        }
        "ul" => out.lines(render_list(element, false)),
        "ol" => out.lines(render_list(element, true)),
        "li" => out.lines(render_item(element, "- ")),
        "blockquote" => {
            let mut inner = Output::loose();
            render_blocks(&element.children, &mut inner);
            let quoted = inner
                .into_lines()
                .into_iter()
                .map(|line| {
                    if line.text.is_empty() {
                        Line {
                            text: ">".to_string(),
                            verbatim: line.verbatim,
                        }
                    } else {
                        line.indented("> ")
                    }
                })
                .collect();
            out.lines(quoted);
        }
        "pre" => {
            let lang = element
                .find(&|e: &Element| e.name == "code")
                .and_then(|code| code.attr("class"))
                .and_then(|class| {
                    class
                        .split_whitespace()
                        .find_map(|c| c.strip_prefix("language-"))
                });
            let body = element.text();
            let body = body.strip_suffix('\n').unwrap_or(&body);
            out.verbatim(fence(lang, body));
        }
        "hr" => out.prose(RULE.to_string()),
        "tr" => {
            let cells: Vec<String> = element
                .child_elements()
                .map(|cell| single_line(&inline_children(cell)))
                .filter(|cell| !cell.is_empty())
                .collect();
            if !cells.is_empty() {
                out.prose(cells.join(" "));
            }
        }
        _ if is_code_macro(element) => render_code_macro(element, out),
        _ if element.name == MACRO_TAG => {
            log::trace!("unwrapping macro {:?}", element.attr(NAME_ATTR));
            let body: Vec<Node> = element
                .children
                .iter()
                .filter(|n| !matches!(n, Node::Element(e) if e.name == PARAMETER_TAG))
                .cloned()
                .collect();
            render_blocks(&body, out);
        }
        // p and unknown containers: their content is rendered in place.
        _ => render_blocks(&element.children, out),
    }
}

fn render_code_macro(element: &Element, out: &mut Output) {
    let lang = element
        .child_elements()
        .find(|e| e.name == PARAMETER_TAG && e.attr(NAME_ATTR) == Some(LANGUAGE_PARAM))
        .map(|param| param.text().trim().to_string())
        .filter(|lang| !lang.is_empty() && lang != NO_LANGUAGE);
    let body = element
        .child_elements()
        .find(|e| e.name == PLAIN_TEXT_BODY_TAG)
        .map(Element::text)
        .unwrap_or_default();
    out.verbatim(fence(lang.as_deref(), &body));
}

/// Fence `body`, using a fence longer than any backtick fence line inside it.
fn fence(lang: Option<&str>, body: &str) -> String {
    let longest = body
        .lines()
        .map(|line| line.trim_start().bytes().take_while(|&b| b == b'`').count())
        .max()
        .unwrap_or(0);
    let marker = "`".repeat(longest.max(2) + 1);
    format!("{marker}{}\n{body}\n{marker}", lang.unwrap_or(""))
}

fn render_list(list: &Element, ordered: bool) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut number = 0;
    for node in &list.children {
        match node {
            Node::Element(item) if item.name == "li" => {
                number += 1;
                let marker = if ordered {
                    format!("{number}. ")
                } else {
                    "- ".to_string()
                };
                lines.extend(render_item(item, &marker));
            }
            Node::Element(nested) if nested.name == "ul" || nested.name == "ol" => {
                let nested = render_list(nested, nested.name == "ol");
                lines.extend(nested.into_iter().map(|line| line.indented("  ")));
            }
            Node::Element(other) => {
                let mut inner = Output::tight();
                render_block(other, &mut inner);
                lines.extend(inner.into_lines());
            }
            Node::Text(text) | Node::CData(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    lines.push(Line::prose(text));
                }
            }
        }
    }
    lines
}

/// Render a list item: the marker goes on the first line, continuation
/// lines are indented to the marker width.
fn render_item(item: &Element, marker: &str) -> Vec<Line> {
    let mut inner = Output::tight();
    render_blocks(&item.children, &mut inner);
    let pad = " ".repeat(marker.len());
    let mut lines = inner.into_lines().into_iter();
    let first = match lines.next() {
        Some(line) if line.verbatim => Line::verbatim(&format!("{marker}{}", line.text)),
        Some(line) => Line::prose(format!("{marker}{}", line.text).trim_end()),
        None => Line::prose(marker.trim_end()),
    };
    std::iter::once(first)
        .chain(lines.map(|line| line.indented(&pad)))
        .collect()
}

fn inline_children(element: &Element) -> String {
    let mut out = String::new();
    for child in &element.children {
        render_inline(child, &mut out);
    }
    out
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn render_inline(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => push_collapsed(&escape_markup_lookalikes(text), out),
        Node::CData(text) => out.push_str(text),
        Node::Element(element) => render_inline_element(element, out),
    }
}

fn render_inline_element(element: &Element, out: &mut String) {
    match element.name.as_str() {
        "strong" | "b" => wrap(element, "**", out),
        "em" | "i" => wrap(element, "*", out),
        "code" | "tt" => out.push_str(&code_span(&element.text())),
        "a" => {
            let text = single_line(&inline_children(element));
            match element.attr("href").filter(|href| !href.is_empty()) {
                Some(href) if text.is_empty() => out.push_str(&format!("[{href}]({href})")),
                Some(href) => out.push_str(&format!("[{text}]({})", destination(href))),
                None => out.push_str(&text),
            }
        }
        "br" => out.push('\n'),
        "img" => {
            if let Some(src) = element.attr("src") {
                let alt = element.attr("alt").unwrap_or("");
                out.push_str(&format!("![{alt}]({})", destination(src)));
            }
        }
        IMAGE_TAG => {
            if let Some(image) = image_reference(element) {
                out.push_str(&image);
            }
        }
        PARAMETER_TAG => {}
        _ if is_code_macro(element) => {
            let body = element
                .child_elements()
                .find(|e| e.name == PLAIN_TEXT_BODY_TAG)
                .map(Element::text)
                .unwrap_or_default();
            out.push_str(&code_span(&body));
        }
        _ => {
            log::trace!("unwrapping <{}>", element.name);
            for child in &element.children {
                render_inline(child, out);
            }
        }
    }
}

/// `![name](name)` for an attachment, `![url](url)` for an external image.
fn image_reference(image: &Element) -> Option<String> {
    if let Some(name) = image
        .find(&|e: &Element| e.name == ATTACHMENT_TAG)
        .and_then(|a| a.attr(FILENAME_ATTR))
        .filter(|name| !name.is_empty())
    {
        return Some(format!("![{name}]({})", destination(name)));
    }
    image
        .find(&|e: &Element| e.name == URL_TAG)
        .and_then(|u| u.attr(URL_VALUE_ATTR))
        .filter(|url| !url.is_empty())
        .map(|url| format!("![{url}]({})", destination(url)))
}

/// Link destinations containing spaces or parentheses are wrapped in `<>`.
fn destination(target: &str) -> String {
    if target.contains(|c: char| c.is_whitespace() || c == '(' || c == ')') {
        format!("<{target}>")
    } else {
        target.to_string()
    }
}

fn wrap(element: &Element, marker: &str, out: &mut String) {
    let inner = inline_children(element);
    let core = inner.trim();
    if core.is_empty() {
        out.push_str(&inner);
        return;
    }
    let lead = &inner[..inner.len() - inner.trim_start().len()];
    let trail = &inner[inner.trim_end().len()..];
    out.push_str(lead);
    out.push_str(marker);
    out.push_str(core);
    out.push_str(marker);
    out.push_str(trail);
}

fn code_span(text: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in text.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    let ticks = "`".repeat(longest + 1);
    let pad = if text.starts_with('`') || text.ends_with('`') {
        " "
    } else {
        ""
    };
    format!("{ticks}{pad}{text}{pad}{ticks}")
}

/// Collapse whitespace runs: two or more newlines keep a paragraph break, a
/// single newline stays a line break, anything else becomes one space.
fn push_collapsed(text: &str, out: &mut String) {
    let mut newlines = 0;
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            in_space = true;
            if c == '\n' {
                newlines += 1;
            }
            continue;
        }
        if in_space {
            out.push_str(match newlines {
                0 => " ",
                1 => "\n",
                _ => "\n\n",
            });
            in_space = false;
            newlines = 0;
        }
        out.push(c);
    }
    if in_space {
        out.push_str(match newlines {
            0 => " ",
            1 => "\n",
            _ => "\n\n",
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn heading() {
        assert_eq!(decode("<h1>Title</h1>"), "# Title");
        assert_eq!(decode("<h3>  Spaced\n title </h3>"), "### Spaced title");
    }

    #[test]
    fn inline_markup() {
        assert_eq!(
            decode("<p><strong>a</strong> <em>b</em> <code>c</code> <a href=\"https://x.io\">d</a></p>"),
            "**a** *b* `c` [d](https://x.io)"
        );
    }

    #[test]
    fn emphasis_keeps_outer_spaces() {
        assert_eq!(decode("<p>x<strong> bold </strong>y</p>"), "x **bold** y");
    }

    #[test]
    fn code_macro_to_fence() {
        let input = "<ac:structured-macro ac:name=\"code\">\
                     <ac:parameter ac:name=\"language\">python</ac:parameter>\
                     <ac:plain-text-body><![CDATA[if a < b:\n    print(\"<tag>\")]]></ac:plain-text-body>\
                     </ac:structured-macro>";
        assert_eq!(decode(input), "```python\nif a < b:\n    print(\"<tag>\")\n```");
    }

    #[test]
    fn code_macro_without_language() {
        let input = "<ac:structured-macro ac:name=\"code\"><ac:plain-text-body><![CDATA[x]]></ac:plain-text-body></ac:structured-macro>";
        assert_eq!(decode(input), "```\nx\n```");
        let none = "<ac:structured-macro ac:name=\"code\"><ac:parameter ac:name=\"language\">none</ac:parameter><ac:plain-text-body><![CDATA[x]]></ac:plain-text-body></ac:structured-macro>";
        assert_eq!(decode(none), "```\nx\n```");
    }

    #[test]
    fn split_cdata_is_joined() {
        let input = "<ac:structured-macro ac:name=\"code\"><ac:plain-text-body><![CDATA[a]]]]><![CDATA[>b]]></ac:plain-text-body></ac:structured-macro>";
        assert_eq!(decode(input), "```\na]]>b\n```");
    }

    #[test]
    fn fence_lengthened_for_inner_fence() {
        let input = "<ac:structured-macro ac:name=\"code\"><ac:plain-text-body><![CDATA[```\ninner\n```]]></ac:plain-text-body></ac:structured-macro>";
        assert_eq!(decode(input), "````\n```\ninner\n```\n````");
    }

    #[test]
    fn image_attachment() {
        assert_eq!(
            decode("<p><ac:image><ri:attachment ri:filename=\"diagram.png\" /></ac:image></p>"),
            "![diagram.png](diagram.png)"
        );
    }

    #[test]
    fn image_url_and_img() {
        assert_eq!(
            decode("<ac:image><ri:url ri:value=\"https://x.io/a.png\" /></ac:image>"),
            "![https://x.io/a.png](https://x.io/a.png)"
        );
        assert_eq!(decode("<img src=\"a.png\" alt=\"A\" />"), "![A](a.png)");
    }

    #[test]
    fn lists_collapse_containers() {
        assert_eq!(decode("<ul>\n<li>a</li>\n<li>b</li>\n</ul>"), "- a\n- b");
        assert_eq!(decode("<ol><li>a</li><li>b</li></ol>"), "1. a\n2. b");
    }

    #[test]
    fn nested_lists_indent() {
        assert_eq!(
            decode("<ul><li>a<ul><li>b</li></ul></li><li>c</li></ul>"),
            "- a\n  - b\n- c"
        );
        assert_eq!(
            decode("<ol><li><p>one</p><ul><li>x</li></ul></li></ol>"),
            "1. one\n   - x"
        );
    }

    #[test]
    fn blockquote_and_rule() {
        assert_eq!(
            decode("<blockquote><p>q</p></blockquote><hr />"),
            "> q\n\n* * *"
        );
    }

    #[test]
    fn unknown_tags_keep_text() {
        assert_eq!(
            decode("<h2>Data</h2><table><tbody><tr><td>a</td><td>b</td></tr></tbody></table><p><strong>end</strong></p>"),
            "## Data\n\na b\n\n**end**"
        );
        assert_eq!(decode("<p><span style=\"color:red\">red</span> text</p>"), "red text");
    }

    #[test]
    fn other_macros_drop_parameters() {
        let input = "<ac:structured-macro ac:name=\"info\"><ac:parameter ac:name=\"title\">Note</ac:parameter><ac:rich-text-body><p>Body</p></ac:rich-text-body></ac:structured-macro>";
        assert_eq!(decode(input), "Body");
    }

    #[test]
    fn html_pre_code() {
        assert_eq!(
            decode("<pre><code class=\"language-rust\">fn main() {}\n</code></pre>"),
            "```rust\nfn main() {}\n```"
        );
    }

    #[test]
    fn blank_lines_collapse() {
        assert_eq!(decode("<p>a</p>\n\n\n\n\n\n<p>b</p>"), "a\n\nb");
        assert_eq!(decode("a\n\n\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn code_span_with_backticks() {
        assert_eq!(decode("<code>a`b</code>"), "``a`b``");
    }

    #[test]
    fn malformed_markup_is_text() {
        assert_eq!(decode("<p>1 < 2 & 3</p>"), "1 < 2 & 3");
        assert_eq!(decode("<p>open <strong>bold"), "open **bold**");
    }

    #[test]
    fn line_breaks() {
        assert_eq!(decode("<p>a<br/>b</p>"), "a\nb");
    }

    #[test]
    fn code_in_list_item_is_exact() {
        let input = "<ul><li>step<ac:structured-macro ac:name=\"code\">\
                     <ac:plain-text-body><![CDATA[a\n\n\n\nb   ]]></ac:plain-text-body>\
                     </ac:structured-macro></li><li>next</li></ul>";
        assert_eq!(
            decode(input),
            "- step\n  ```\n  a\n\n\n\n  b   \n  ```\n- next"
        );
    }

    #[test]
    fn code_in_blockquote_is_exact() {
        let input = "<blockquote><ac:structured-macro ac:name=\"code\">\
                     <ac:plain-text-body><![CDATA[x = 1   \n\n\n\ny]]></ac:plain-text-body>\
                     </ac:structured-macro></blockquote>";
        assert_eq!(decode(input), "> ```\n> x = 1   \n>\n>\n>\n> y\n> ```");
    }

    #[test]
    fn escaped_markup_stays_text() {
        let storage = "<p>Use &lt;br/&gt; to break &amp;amp; more</p>";
        let markdown = decode(storage);
        assert_eq!(markdown, "Use &lt;br/> to break &amp;amp; more");
        assert_eq!(
            crate::encode(&markdown),
            "<p>Use &lt;br/> to break &amp;amp; more</p>"
        );
    }

    #[test]
    fn long_unclosed_tag_runs_terminate() {
        for unit in ["<a b", "<a x=\""] {
            let input = unit.repeat(40_000);
            assert!(decode(&input) == input, "{unit} run changed");
            assert!(crate::encode(&input).starts_with("<p>&lt;a"), "{unit}");
        }
    }

    #[test]
    fn empty_input() {
        assert_eq!(decode(""), "");
        assert_eq!(decode("   \n  "), "");
    }
}
