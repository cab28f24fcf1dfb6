//! Property-based tests using proptest.
//!
//! Both converters must accept any input without panicking, and the pieces
//! with exact contracts (frontmatter stripping, code bodies) must hold them
//! for arbitrary content.

use proptest::prelude::*;
use scribe_convert::{decode, encode, strip_frontmatter};

proptest! {
    /// Random text through the encoder never panics.
    #[test]
    fn any_markdown_no_panic(input in "\\PC{0,500}") {
        let _ = encode(&input);
    }

    /// Markdown-heavy input exercises the inline scanner's delimiter paths.
    #[test]
    fn marker_soup_no_panic(input in "[*_`\\[\\]()!#>\\- \na-z]{0,300}") {
        let _ = encode(&input);
    }

    /// Random text through the decoder never panics.
    #[test]
    fn any_storage_no_panic(input in "\\PC{0,500}") {
        let _ = decode(&input);
    }

    /// Tag-heavy input exercises the tokenizer's recovery paths.
    #[test]
    fn tag_soup_no_panic(input in "[<>/!\\[\\]\"'=&;a-z \n-]{0,300}") {
        let _ = decode(&input);
    }

    /// A body without leading frontmatter is returned unchanged, so stripping
    /// twice equals stripping once.
    #[test]
    fn strip_is_idempotent_on_plain_bodies(
        title in "[A-Za-z ]{1,20}",
        body in "[A-Za-z0-9 #*\n]{0,100}"
    ) {
        let input = format!("---\ntitle: {title}\n---\n{body}");
        let once = strip_frontmatter(&input);
        prop_assert_eq!(once, body.as_str());
        prop_assert_eq!(strip_frontmatter(once), once);
    }

    /// Code bodies make it through encode then decode byte for byte.
    #[test]
    fn code_round_trip_is_exact(
        lang in "[a-z]{1,8}",
        body in "[a-zA-Z0-9 <>&\\]\\[{}();=\"']{1,40}(\n[a-zA-Z0-9 <>&\\]\\[{}();=\"']{1,40}){0,4}"
    ) {
        // Pre-escaped entities are decoded on the way in by contract.
        prop_assume!(lang != "none");
        prop_assume!(!body.contains("&lt;") && !body.contains("&gt;") && !body.contains("&amp;"));
        let markdown = format!("```{lang}\n{body}\n```");
        prop_assert_eq!(decode(&encode(&markdown)), markdown);
    }

    /// Heading text survives a round trip.
    #[test]
    fn heading_round_trip(level in 1usize..=6, text in "[A-Za-z0-9][A-Za-z0-9 ]{0,30}[A-Za-z0-9]") {
        prop_assume!(!text.contains("  "));
        let markdown = format!("{} {text}", "#".repeat(level));
        prop_assert_eq!(decode(&encode(&markdown)), markdown);
    }
}
