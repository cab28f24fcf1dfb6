//! Entity escaping shared by the encoder and decoder.

use crate::markup::tag_len;

/// Escape every markup-significant character. Used for code spans and
/// attribute values, where nothing is allowed through.
pub fn escape_all(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape prose text while letting hand-written markup through.
///
/// `&` is kept when it already starts an entity reference and `<` is kept
/// when a complete tag, closing tag or comment follows. Everything else that
/// would break the storage format is escaped.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, c) in s.char_indices() {
        match c {
            '&' if entity_len(&s[i..]).is_none() => out.push_str("&amp;"),
            '<' if tag_len(&s[i..]).is_none() => out.push_str("&lt;"),
            _ => out.push(c),
        }
    }
    out
}

/// The inverse guard for decoded prose: escape the `&` and `<` that
/// [`escape_text`] would otherwise pass through as markup, so literal text
/// such as `&lt;br/&gt;` survives a decode then encode cycle as text.
pub fn escape_markup_lookalikes(s: &str) -> String {
    if !s.contains(['&', '<']) {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    for (i, c) in s.char_indices() {
        match c {
            '&' if entity_len(&s[i..]).is_some() => out.push_str("&amp;"),
            '<' if tag_len(&s[i..]).is_some() => out.push_str("&lt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Undo the three escapes an HTML renderer puts into code: `&lt;`, `&gt;`,
/// then `&amp;`.
pub fn unescape_code(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Decode named and numeric entity references in one pass.
///
/// Unknown or malformed references are left as written.
pub fn unescape_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match entity_len(rest).and_then(|len| decode_entity(&rest[1..len - 1]).map(|c| (len, c))) {
            Some((len, c)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Length in bytes of an entity reference at the start of `s` (`&...;`),
/// or `None` if `s` does not start with one.
fn entity_len(s: &str) -> Option<usize> {
    let body = s.strip_prefix('&')?;
    let end = body.bytes().take(32).position(|b| b == b';')?;
    let name = &body[..end];
    let valid = if let Some(num) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        !num.is_empty() && num.bytes().all(|b| b.is_ascii_hexdigit())
    } else if let Some(num) = name.strip_prefix('#') {
        !num.is_empty() && num.bytes().all(|b| b.is_ascii_digit())
    } else {
        name.bytes().next().is_some_and(|b| b.is_ascii_alphabetic())
            && name.bytes().all(|b| b.is_ascii_alphanumeric())
    };
    valid.then_some(end + 2)
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        return u32::from_str_radix(num, 16).ok().and_then(char::from_u32);
    }
    if let Some(num) = name.strip_prefix('#') {
        return num.parse::<u32>().ok().and_then(char::from_u32);
    }
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "ndash" => Some('\u{2013}'),
        "mdash" => Some('\u{2014}'),
        "hellip" => Some('\u{2026}'),
        "rsquo" => Some('\u{2019}'),
        "lsquo" => Some('\u{2018}'),
        "rdquo" => Some('\u{201d}'),
        "ldquo" => Some('\u{201c}'),
        _ => None,
    }
}
