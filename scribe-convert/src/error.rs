/// Errors from the metadata side of frontmatter handling.
///
/// Conversion itself never fails; this only covers reading the YAML block
/// for page metadata.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrontMatterError {
    #[error("Invalid front matter YAML: {message}")]
    InvalidYaml { message: String },
}
