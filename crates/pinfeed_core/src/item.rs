use std::fmt;

use url::Url;

/// Chat identifier of a consumer.
pub type ConsumerId = i64;

/// Deduplication key of a discovered image.
///
/// Image hosts serve the same picture under several size prefixes
/// (`/236x/ab/cd/h.jpg`, `/originals/ab/cd/h.jpg`), so the key is built from
/// the host and the final path segment only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey(String);

impl ItemKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn for_url(raw: &str) -> Self {
        let trimmed = raw.trim();
        let Ok(mut url) = Url::parse(trimmed) else {
            let without_fragment = trimmed.split('#').next().unwrap_or(trimmed);
            return Self(without_fragment.to_string());
        };

        let leaf = url
            .path_segments()
            .and_then(|segments| segments.last())
            .filter(|leaf| !leaf.is_empty())
            .map(ToOwned::to_owned);

        match leaf {
            Some(leaf) => {
                let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
                Self(format!("{host}/{leaf}"))
            }
            None => {
                url.set_fragment(None);
                Self(url.to_string())
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One discovered image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub key: ItemKey,
    pub url: String,
}

impl Item {
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            key: ItemKey::for_url(&url),
            url,
        }
    }
}

/// Opaque pagination token owned by the fetch strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_variants_share_a_key() {
        let small = ItemKey::for_url("https://i.pinimg.com/236x/ab/cd/0123abcd.jpg");
        let large = ItemKey::for_url("https://i.pinimg.com/originals/ab/cd/0123abcd.jpg");
        assert_eq!(small, large);
        assert_eq!(small.as_str(), "i.pinimg.com/0123abcd.jpg");
    }

    #[test]
    fn host_is_part_of_the_key() {
        let a = ItemKey::for_url("https://a.example.com/img/x.png");
        let b = ItemKey::for_url("https://b.example.com/img/x.png");
        assert_ne!(a, b);
    }

    #[test]
    fn unparsable_url_keys_on_trimmed_text_without_fragment() {
        let key = ItemKey::for_url("  not a url#frag ");
        assert_eq!(key.as_str(), "not a url");
    }

    #[test]
    fn url_without_leaf_keeps_full_url_minus_fragment() {
        let key = ItemKey::for_url("https://example.com/#top");
        assert_eq!(key.as_str(), "https://example.com/");
    }
}
