//! URL normalization and reference splitting.
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::CompileError;

/// Base URL used for resources registered under relative locations.
pub(crate) const DEFAULT_ROOT_URL: &str = "json-schema:///";

pub(crate) static DEFAULT_SCOPE: Lazy<Url> =
    Lazy::new(|| Url::parse(DEFAULT_ROOT_URL).expect("Is a valid URL"));

/// Parse a possibly-relative location into an absolute URL. Relative
/// locations are anchored under the internal `json-schema:///` scope.
pub(crate) fn absolute(location: &str) -> Result<Url, CompileError> {
    match Url::parse(location) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => DEFAULT_SCOPE
            .join(location)
            .map_err(|source| CompileError::invalid_url(location, source)),
        Err(source) => Err(CompileError::invalid_url(location, source)),
    }
}

/// Resolve a reference against a base URL.
pub(crate) fn resolve(base: &Url, reference: &str) -> Result<Url, CompileError> {
    base.join(reference)
        .map_err(|source| CompileError::invalid_url(reference, source))
}

/// The fragment part of a schema reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Fragment {
    /// No fragment, or an empty one: the resource root.
    Root,
    /// A JSON Pointer fragment, starting with `/`.
    Pointer(String),
    /// A plain-name (anchor) fragment.
    Anchor(String),
}

/// Split a URL into its fragmentless base and the decoded fragment.
pub(crate) fn split(url: &Url) -> Result<(Url, Fragment), CompileError> {
    let mut base = url.clone();
    base.set_fragment(None);
    let fragment = match url.fragment() {
        None | Some("") => Fragment::Root,
        Some(encoded) => {
            let decoded = percent_decode_str(encoded).decode_utf8().map_err(|err| {
                CompileError::invalid_keyword_value(
                    url.as_str(),
                    "$ref",
                    format!("invalid percent-encoding in fragment: {err}"),
                )
            })?;
            if decoded.starts_with('/') {
                Fragment::Pointer(decoded.into_owned())
            } else {
                Fragment::Anchor(decoded.into_owned())
            }
        }
    };
    Ok((base, fragment))
}

/// Strip an empty trailing fragment, leaving the URL otherwise untouched.
pub(crate) fn without_empty_fragment(mut url: Url) -> Url {
    if url.fragment() == Some("") {
        url.set_fragment(None);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("http://example.com/schema.json", "http://example.com/schema.json")]
    #[test_case("schema.json", "json-schema:///schema.json")]
    #[test_case("folder/obj.json", "json-schema:///folder/obj.json")]
    fn absolute_urls(location: &str, expected: &str) {
        assert_eq!(absolute(location).expect("Valid URL").as_str(), expected);
    }

    #[test]
    fn split_pointer() {
        let url = Url::parse("http://example.com/s.json#/definitions/a").expect("Valid URL");
        let (base, fragment) = split(&url).expect("Valid fragment");
        assert_eq!(base.as_str(), "http://example.com/s.json");
        assert_eq!(fragment, Fragment::Pointer("/definitions/a".to_string()));
    }

    #[test]
    fn split_anchor() {
        let url = Url::parse("http://example.com/s.json#items").expect("Valid URL");
        let (_, fragment) = split(&url).expect("Valid fragment");
        assert_eq!(fragment, Fragment::Anchor("items".to_string()));
    }

    #[test]
    fn split_empty() {
        let url = Url::parse("http://example.com/s.json#").expect("Valid URL");
        let (base, fragment) = split(&url).expect("Valid fragment");
        assert_eq!(base.as_str(), "http://example.com/s.json");
        assert_eq!(fragment, Fragment::Root);
    }
}
