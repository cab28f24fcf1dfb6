//! Markdown → storage format.
//!
//! Frontmatter is stripped, the rest is segmented into blocks and each block
//! is rendered once, in document order. Blocks are joined with a newline.

use crate::blocks::{Block, ListKind, segment};
use crate::dialect::{
    ATTACHMENT_TAG, CDATA_CLOSE, CDATA_OPEN, CODE_MACRO_NAME, FILENAME_ATTR, IMAGE_TAG,
    LANGUAGE_PARAM, MACRO_TAG, NAME_ATTR, NO_LANGUAGE, PARAMETER_TAG, PLAIN_TEXT_BODY_TAG,
    URL_TAG, URL_VALUE_ATTR,
};
use crate::escape::{escape_all, escape_text, unescape_code};
use crate::frontmatter::strip_frontmatter;
use crate::inline::{Inline, parse_inlines};

/// Convert a Markdown document to the wiki storage format.
///
/// Never fails. Constructs that do not parse are carried through as escaped
/// text, which the wiki renders literally.
pub fn encode(markdown: &str) -> String {
    let body = strip_frontmatter(markdown);
    segment(body)
        .iter()
        .map(render_block)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_block(block: &Block<'_>) -> String {
    match block {
        Block::Heading { level, text } => format!("<h{level}>{}</h{level}>", render_text(text)),
        Block::Paragraph(lines) => format!("<p>{}</p>", render_text(&lines.join("\n"))),
        Block::List { kind, items } => {
            let tag = match kind {
                ListKind::Unordered => "ul",
                ListKind::Ordered => "ol",
            };
            let mut out = format!("<{tag}>\n");
            for item in items {
                out.push_str(&format!("<li>{}</li>\n", render_text(item)));
            }
            out.push_str(&format!("</{tag}>"));
            out
        }
        Block::Code { lang, body } => code_macro(*lang, &body.join("\n")),
        Block::Quote(text) => format!("<blockquote><p>{}</p></blockquote>", render_text(text)),
        Block::Rule => "<hr />".to_string(),
        Block::Raw(line) => line.to_string(),
    }
}

/// Build the code macro for a fenced block.
///
/// A missing or empty language is written as `none`. Pre-escaped `&lt;`,
/// `&gt;` and `&amp;` in the body are decoded so the literal body is not
/// double-escaped.
pub fn code_macro(lang: Option<&str>, body: &str) -> String {
    let lang = lang.filter(|l| !l.is_empty()).unwrap_or(NO_LANGUAGE);
    let body = unescape_code(body);
    format!(
        "<{MACRO_TAG} {NAME_ATTR}=\"{CODE_MACRO_NAME}\">\
         <{PARAMETER_TAG} {NAME_ATTR}=\"{LANGUAGE_PARAM}\">{lang}</{PARAMETER_TAG}>\
         <{PLAIN_TEXT_BODY_TAG}>{body}</{PLAIN_TEXT_BODY_TAG}>\
         </{MACRO_TAG}>",
        lang = escape_all(lang),
        body = cdata(&body),
    )
}

/// Build the image macro. Bare filenames reference page attachments; anything
/// with a path or scheme is an external URL.
pub fn image_macro(src: &str) -> String {
    let src_attr = escape_all(src);
    if is_attachment(src) {
        format!("<{IMAGE_TAG}><{ATTACHMENT_TAG} {FILENAME_ATTR}=\"{src_attr}\" /></{IMAGE_TAG}>")
    } else {
        format!("<{IMAGE_TAG}><{URL_TAG} {URL_VALUE_ATTR}=\"{src_attr}\" /></{IMAGE_TAG}>")
    }
}

fn is_attachment(src: &str) -> bool {
    !src.is_empty() && !src.contains('/') && !src.contains(':')
}

/// Wrap `body` in CDATA. A literal `]]>` is split across two sections.
fn cdata(body: &str) -> String {
    let split = format!("]]{CDATA_CLOSE}{CDATA_OPEN}>");
    format!("{CDATA_OPEN}{}{CDATA_CLOSE}", body.replace(CDATA_CLOSE, &split))
}

fn render_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    render_inlines(&parse_inlines(text), &mut out);
    out
}

fn render_inlines(spans: &[Inline<'_>], out: &mut String) {
    for span in spans {
        match span {
            Inline::Text(t) => out.push_str(&escape_text(t)),
            Inline::Code(code) => {
                out.push_str("<code>");
                out.push_str(&escape_all(code));
                out.push_str("</code>");
            }
            Inline::Strong(children) => {
                out.push_str("<strong>");
                render_inlines(children, out);
                out.push_str("</strong>");
            }
            Inline::Emphasis(children) => {
                out.push_str("<em>");
                render_inlines(children, out);
                out.push_str("</em>");
            }
            Inline::Link { text, href } => {
                out.push_str(&format!("<a href=\"{}\">", escape_all(href)));
                render_inlines(text, out);
                out.push_str("</a>");
            }
            Inline::Image { src, .. } => out.push_str(&image_macro(src)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn heading() {
        assert_eq!(encode("# Title"), "<h1>Title</h1>");
        assert_eq!(encode("###### Six"), "<h6>Six</h6>");
    }

    #[test]
    fn bold_then_italic() {
        assert_eq!(encode("**a** *b*"), "<p><strong>a</strong> <em>b</em></p>");
    }

    #[test]
    fn inline_code_and_link() {
        assert_eq!(
            encode("Run `a < b` then see [docs](https://x.io/?a=1&b=2)."),
            "<p>Run <code>a &lt; b</code> then see <a href=\"https://x.io/?a=1&amp;b=2\">docs</a>.</p>"
        );
    }

    #[test]
    fn single_list_container() {
        assert_eq!(encode("- a\n- b"), "<ul>\n<li>a</li>\n<li>b</li>\n</ul>");
    }

    #[test]
    fn ordered_list_then_paragraph() {
        assert_eq!(
            encode("1. first\n2. second\nafter"),
            "<ol>\n<li>first</li>\n<li>second</li>\n</ol>\n<p>after</p>"
        );
    }

    #[test]
    fn list_kind_switch_closes_list() {
        assert_eq!(
            encode("- a\n1. b"),
            "<ul>\n<li>a</li>\n</ul>\n<ol>\n<li>b</li>\n</ol>"
        );
    }

    #[test]
    fn blockquote_and_rule() {
        assert_eq!(
            encode("> wise words\n\n---\n"),
            "<blockquote><p>wise words</p></blockquote>\n<hr />"
        );
    }

    #[test]
    fn code_fence_with_language() {
        assert_eq!(
            encode("```python\nprint(1)\n```"),
            "<ac:structured-macro ac:name=\"code\">\
             <ac:parameter ac:name=\"language\">python</ac:parameter>\
             <ac:plain-text-body><![CDATA[print(1)]]></ac:plain-text-body>\
             </ac:structured-macro>"
        );
    }

    #[test]
    fn code_fence_without_language() {
        let out = encode("```\nx\n```");
        assert!(out.contains("<ac:parameter ac:name=\"language\">none</ac:parameter>"), "{out}");
    }

    #[test]
    fn code_body_is_not_marked_up() {
        let out = encode("```\n**bold** <b>&amp;</b>\n```");
        assert!(out.contains("<![CDATA[**bold** <b>&</b>]]>"), "{out}");
        assert!(!out.contains("<strong>"), "{out}");
    }

    #[test]
    fn cdata_terminator_in_body_is_split() {
        let out = encode("```\na]]>b\n```");
        assert!(out.contains("<![CDATA[a]]]]><![CDATA[>b]]>"), "{out}");
    }

    #[test]
    fn raw_markup_passes_through() {
        assert_eq!(
            encode("<ac:structured-macro ac:name=\"toc\" />\n\nText"),
            "<ac:structured-macro ac:name=\"toc\" />\n<p>Text</p>"
        );
    }

    #[test]
    fn frontmatter_is_removed() {
        assert_eq!(encode("---\ntitle: T\n---\n# Body"), "<h1>Body</h1>");
    }

    #[test]
    fn blank_lines_produce_nothing() {
        assert_eq!(encode("a\n\n\n\n\n\nb"), "<p>a</p>\n<p>b</p>");
    }

    #[test]
    fn images() {
        assert_eq!(
            encode("![shot](screen.png)"),
            "<p><ac:image><ri:attachment ri:filename=\"screen.png\" /></ac:image></p>"
        );
        assert_eq!(
            encode("![logo](https://x.io/logo.svg)"),
            "<p><ac:image><ri:url ri:value=\"https://x.io/logo.svg\" /></ac:image></p>"
        );
    }

    #[test]
    fn text_is_escaped() {
        assert_eq!(encode("Tom & Jerry < Spike"), "<p>Tom &amp; Jerry &lt; Spike</p>");
    }

    #[test]
    fn unclosed_tag_is_escaped() {
        assert_eq!(encode("a <b and c"), "<p>a &lt;b and c</p>");
        assert_eq!(encode("<b and c"), "<p>&lt;b and c</p>");
        assert_eq!(encode("a <br/> b"), "<p>a <br/> b</p>");
    }

    #[test]
    fn long_unclosed_tag_runs_terminate() {
        let input = "<a b".repeat(40_000);
        let out = encode(&input);
        assert_eq!(out.len(), input.len() + 3 * 40_000 + "<p></p>".len());
        assert!(encode(&"<a x=\"".repeat(40_000)).starts_with("<p>&lt;a x=\""));
    }

    #[test]
    fn empty_input() {
        assert_eq!(encode(""), "");
    }
}
