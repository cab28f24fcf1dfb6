//! Leading YAML frontmatter.
//!
//! The wiki service has no notion of frontmatter, so the encoder strips it
//! before converting. The CLI also reads a few keys from it (title, space,
//! parent) to fill in page metadata.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::dialect::FRONTMATTER_DELIMITER;
use crate::error::FrontMatterError;

/// Page metadata read from frontmatter. Unknown keys land in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Space key the page belongs to.
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "string_or_number")]
    pub space: Option<String>,

    /// Parent page id. YAML authors tend to write ids unquoted, so numbers are accepted.
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "string_or_number")]
    pub parent: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_yaml::Value::String(s)) => Some(s),
        Some(serde_yaml::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Remove a leading frontmatter block.
///
/// Returns the text right after the closing `---` line. If the first line is
/// not `---`, the input has fewer than three lines, or no closing delimiter
/// exists, the input is returned unchanged.
pub fn strip_frontmatter(input: &str) -> &str {
    split_front_matter(input).1
}

/// Split `input` into `(raw_yaml, body)`.
///
/// `raw_yaml` is `None` whenever [`strip_frontmatter`] would leave the input
/// untouched, in which case `body` is the whole input.
pub fn split_front_matter(input: &str) -> (Option<&str>, &str) {
    if input.split('\n').nth(2).is_none() {
        return (None, input);
    }

    let mut lines = input.split_inclusive('\n');
    let yaml_start = match lines.next() {
        Some(first) if is_delimiter(first) => first.len(),
        _ => return (None, input),
    };

    let mut offset = yaml_start;
    for line in lines {
        if is_delimiter(line) {
            let body_start = offset + line.len();
            return (Some(&input[yaml_start..offset]), &input[body_start..]);
        }
        offset += line.len();
    }

    (None, input)
}

/// Parse the frontmatter block into [`FrontMatter`].
///
/// `Ok(None)` when there is no complete frontmatter block. An empty block
/// yields the default (all `None`) metadata.
pub fn parse_front_matter(input: &str) -> Result<Option<FrontMatter>, FrontMatterError> {
    let (Some(yaml), _) = split_front_matter(input) else {
        return Ok(None);
    };

    if yaml.trim().is_empty() {
        return Ok(Some(FrontMatter::default()));
    }

    serde_yaml::from_str::<FrontMatter>(yaml)
        .map(Some)
        .map_err(|e| FrontMatterError::InvalidYaml {
            message: e.to_string(),
        })
}

fn is_delimiter(line: &str) -> bool {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line) == FRONTMATTER_DELIMITER
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_complete_block() {
        let input = "---\ntitle: Hello\n---\n# Body\n";
        assert_eq!(strip_frontmatter(input), "# Body\n");
    }

    #[test]
    fn closing_delimiter_on_last_line() {
        assert_eq!(strip_frontmatter("---\ntitle: x\n---"), "");
    }

    #[test]
    fn unclosed_block_is_kept() {
        let input = "---\ntitle: Hello\n# Body\n";
        assert_eq!(strip_frontmatter(input), input);
    }

    #[test]
    fn short_input_is_kept() {
        assert_eq!(strip_frontmatter("---\n---"), "---\n---");
        assert_eq!(strip_frontmatter("---"), "---");
        assert_eq!(strip_frontmatter(""), "");
    }

    #[test]
    fn first_line_must_be_delimiter() {
        let input = "# Title\n---\nx\n---\n";
        assert_eq!(strip_frontmatter(input), input);
        let indented = " ---\nx: 1\n---\nbody";
        assert_eq!(strip_frontmatter(indented), indented);
    }

    #[test]
    fn crlf_delimiters() {
        assert_eq!(strip_frontmatter("---\r\ntitle: x\r\n---\r\nbody"), "body");
    }

    #[test]
    fn stripping_is_idempotent_for_plain_body() {
        let input = "---\ntitle: x\n---\n# Heading\n\ntext\n";
        let once = strip_frontmatter(input);
        assert_eq!(strip_frontmatter(once), once);
    }

    #[test]
    fn split_returns_yaml() {
        let (yaml, body) = split_front_matter("---\na: 1\nb: 2\n---\nrest");
        assert_eq!(yaml, Some("a: 1\nb: 2\n"));
        assert_eq!(body, "rest");
    }

    #[test]
    fn parse_known_and_extra_fields() {
        let input = "---\ntitle: Release notes\nspace: ENG\nparent: 12345\nlabels: [a, b]\nowner: docs\n---\nBody";
        let fm = parse_front_matter(input).unwrap().unwrap();
        assert_eq!(fm.title.as_deref(), Some("Release notes"));
        assert_eq!(fm.space.as_deref(), Some("ENG"));
        assert_eq!(fm.parent.as_deref(), Some("12345"));
        assert_eq!(fm.labels, Some(vec!["a".to_string(), "b".to_string()]));
        assert!(fm.extra.contains_key("owner"));
    }

    #[test]
    fn parse_without_block() {
        assert_eq!(parse_front_matter("# Just markdown").unwrap(), None);
    }

    #[test]
    fn parse_empty_block() {
        let fm = parse_front_matter("---\n\n---\nBody").unwrap().unwrap();
        assert_eq!(fm, FrontMatter::default());
    }

    #[test]
    fn parse_invalid_yaml() {
        let err = parse_front_matter("---\ntitle: [unclosed\n---\nBody").unwrap_err();
        assert!(matches!(err, FrontMatterError::InvalidYaml { .. }));
    }
}
