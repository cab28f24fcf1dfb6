//! Tag and attribute names fixed by the wiki service.
//!
//! These are consumed and produced verbatim; none of them are configurable.

/// Structured macro element (`<ac:structured-macro ac:name="...">`).
pub const MACRO_TAG: &str = "ac:structured-macro";
/// Attribute carrying the macro or parameter name.
pub const NAME_ATTR: &str = "ac:name";
/// Macro name of the code block macro.
pub const CODE_MACRO_NAME: &str = "code";
/// Named parameter child of a macro.
pub const PARAMETER_TAG: &str = "ac:parameter";
/// Parameter name holding the code language.
pub const LANGUAGE_PARAM: &str = "language";
/// Language value written when a fence has no tag.
pub const NO_LANGUAGE: &str = "none";
/// Literal body of the code macro. Its content is never parsed as markup.
pub const PLAIN_TEXT_BODY_TAG: &str = "ac:plain-text-body";

/// Image macro element.
pub const IMAGE_TAG: &str = "ac:image";
/// Attachment reference inside an image macro.
pub const ATTACHMENT_TAG: &str = "ri:attachment";
/// Attachment filename attribute.
pub const FILENAME_ATTR: &str = "ri:filename";
/// External URL reference inside an image macro.
pub const URL_TAG: &str = "ri:url";
/// URL value attribute.
pub const URL_VALUE_ATTR: &str = "ri:value";

/// Frontmatter delimiter line.
pub const FRONTMATTER_DELIMITER: &str = "---";

pub(crate) const CDATA_OPEN: &str = "<![CDATA[";
pub(crate) const CDATA_CLOSE: &str = "]]>";
