use std::{
    borrow::Cow,
    fmt::{self, Display},
};

use facet_core::{Field, FieldAttribute};

/// The metadata bundle attached to a single field.
///
/// A bundle is an ordered list of `key -> value` entries. Lookups return the
/// first entry for a key. A value may carry a comma-separated option list
/// (`"name,omitempty"`), in which case the first segment is the name.
///
/// Bundles come from two places:
///
/// - a struct-tag string, `title:"Value" limit:"5"`, through [`Tags::parse`]
/// - a field's `#[facet(key = "value")]` attributes, through [`Tags::of`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags<'a> {
    entries: Vec<(Cow<'a, str>, Cow<'a, str>)>,
}

impl<'a> Tags<'a> {
    /// Creates an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a struct-tag string made of `key:"value"` pairs separated by whitespace.
    ///
    /// Parsing stops at the first malformed pair; the entries read up to that
    /// point are kept. This never fails.
    pub fn parse(tag: &'a str) -> Self {
        let mut tags = Tags::new();
        let mut rest = tag;

        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }

            let key_len = rest
                .bytes()
                .take_while(|&b| b > b' ' && b != b':' && b != b'"' && b != 0x7f)
                .count();
            if key_len == 0 {
                break;
            }
            let (key, after_key) = rest.split_at(key_len);
            let Some(quoted) = after_key.strip_prefix(":\"") else {
                break;
            };
            let Some(end) = closing_quote(quoted) else {
                break;
            };
            let Some(value) = unquote(&quoted[..end]) else {
                break;
            };

            tags.entries.push((Cow::Borrowed(key), value));
            rest = &quoted[end + 1..];
        }

        if !rest.trim().is_empty() {
            log::trace!("Stopped parsing tag at malformed input {rest:?}");
        }

        tags
    }

    /// Adds an entry, keeping earlier entries for the same key in front.
    pub fn with(mut self, key: impl Into<Cow<'a, str>>, value: impl Into<Cow<'a, str>>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    /// Returns the raw value for `key`, or `None` if the key isn't present.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| &**k == key)
            .map(|(_, v)| &**v)
    }

    /// Returns the raw value for `key`, or an empty string if it isn't present.
    pub fn get(&self, key: &str) -> &str {
        self.lookup(key).unwrap_or_default()
    }

    /// Returns the value for `key` up to its first comma.
    pub fn primary(&self, key: &str) -> &str {
        let value = self.get(key);
        value.split_once(',').map_or(value, |(name, _)| name)
    }

    /// Iterates over the options following the primary value of `key`.
    pub fn options(&self, key: &str) -> impl Iterator<Item = &str> {
        self.lookup(key)
            .into_iter()
            .flat_map(|value| value.split(',').skip(1))
    }

    /// Whether `option` appears after the primary value of `key`.
    pub fn has_option(&self, key: &str, option: &str) -> bool {
        self.options(key).any(|o| o == option)
    }

    /// Iterates over all entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (&**k, &**v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bundle has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Tags<'static> {
    /// Collects the `key = value` attributes of a field.
    ///
    /// Values can be string literals (raw or not) or bare tokens, which are
    /// kept verbatim. Marker attributes such as `flatten` carry no value and
    /// are not part of the bundle.
    pub fn of(field: &Field) -> Self {
        field
            .attributes
            .iter()
            .filter_map(|attr| {
                let FieldAttribute::Arbitrary(content) = attr;
                parse_assignment(*content)
            })
            .collect()
    }
}

impl<'a> FromIterator<(Cow<'a, str>, Cow<'a, str>)> for Tags<'a> {
    fn from_iter<I: IntoIterator<Item = (Cow<'a, str>, Cow<'a, str>)>>(iter: I) -> Self {
        Tags {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Tags<'a> {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(k, v)| (Cow::Borrowed(k), Cow::Borrowed(v)))
            .collect()
    }
}

/// Formats the bundle back into struct-tag syntax.
impl Display for Tags<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{key}:\"{}\"", value.escape_debug())?;
        }
        Ok(())
    }
}

/// Index of the unescaped `"` closing a quoted value.
fn closing_quote(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Resolves backslash escapes in the body of a quoted value.
fn unquote(body: &str) -> Option<Cow<'_, str>> {
    if !body.contains('\\') {
        return Some(Cow::Borrowed(body));
    }

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        let unescaped = match chars.next()? {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            '\\' => '\\',
            '"' => '"',
            '\'' => '\'',
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                if hex.len() != 2 {
                    return None;
                }
                let byte = u8::from_str_radix(&hex, 16).ok()?;
                if !byte.is_ascii() {
                    return None;
                }
                char::from(byte)
            }
            'u' => {
                let digits: String = if chars.as_str().starts_with('{') {
                    chars.next();
                    chars.by_ref().take_while(|&c| c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                char::from_u32(u32::from_str_radix(&digits, 16).ok()?)?
            }
            _ => return None,
        };
        out.push(unescaped);
    }

    Some(Cow::Owned(out))
}

/// Parses an attribute of the form `key = value`.
fn parse_assignment(content: &'static str) -> Option<(Cow<'static, str>, Cow<'static, str>)> {
    let (key, value) = content.split_once('=')?;
    let key = key.trim();
    if key.is_empty()
        || !key
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return None;
    }

    let value = value.trim();
    let value = if let Some(raw) = raw_literal(value) {
        Cow::Borrowed(raw)
    } else if let Some(body) = value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        unquote(body)?
    } else {
        Cow::Borrowed(value)
    };

    Some((Cow::Borrowed(key), value))
}

/// Body of a raw string literal such as `r#"a "quoted" b"#`.
fn raw_literal(value: &str) -> Option<&str> {
    let rest = value.strip_prefix('r')?;
    let hashes = rest.len() - rest.trim_start_matches('#').len();
    let (fence, rest) = rest.split_at(hashes);
    rest.strip_prefix('"')?
        .strip_suffix(fence)?
        .strip_suffix('"')
}
