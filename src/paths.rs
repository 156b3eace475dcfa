//! JSON Pointer handling for schema and instance locations.
use std::borrow::Cow;
use std::fmt::Write;

/// Escape a single JSON Pointer token: `~` becomes `~0`, `/` becomes `~1`.
pub(crate) fn escape_token(token: &str) -> Cow<'_, str> {
    if token.contains(['~', '/']) {
        Cow::Owned(token.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(token)
    }
}

/// Inverse of [`escape_token`]. The `~1` replacement runs first so that
/// `~01` decodes to the literal `~1`.
pub(crate) fn unescape_token(token: &str) -> Cow<'_, str> {
    if token.contains('~') {
        Cow::Owned(token.replace("~1", "/").replace("~0", "~"))
    } else {
        Cow::Borrowed(token)
    }
}

/// A key within a JSON object or an index within a JSON array.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Segment<'a> {
    Property(&'a str),
    Index(usize),
}

/// A linked list of instance path segments, built on the stack during
/// validation so that no allocation happens until an error is reported.
#[derive(Copy, Clone, Debug)]
pub(crate) struct InstancePath<'a> {
    parent: Option<&'a InstancePath<'a>>,
    segment: Option<Segment<'a>>,
}

impl<'a> InstancePath<'a> {
    pub(crate) const fn root() -> Self {
        InstancePath {
            parent: None,
            segment: None,
        }
    }

    pub(crate) fn push(&'a self, segment: Segment<'a>) -> InstancePath<'a> {
        InstancePath {
            parent: Some(self),
            segment: Some(segment),
        }
    }

    /// Render the path as an absolute JSON Pointer (empty string for root).
    pub(crate) fn pointer(&self) -> String {
        let mut segments = Vec::new();
        let mut current = Some(self);
        while let Some(node) = current {
            if let Some(segment) = node.segment {
                segments.push(segment);
            }
            current = node.parent;
        }
        let mut out = String::new();
        for segment in segments.iter().rev() {
            match segment {
                Segment::Property(name) => {
                    out.push('/');
                    out.push_str(&escape_token(name));
                }
                Segment::Index(idx) => {
                    write!(out, "/{idx}").expect("writing to a string never fails");
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("plain", "plain"; "no escaping needed")]
    #[test_case("a/b", "a~1b"; "slash")]
    #[test_case("a~b", "a~0b"; "tilde")]
    #[test_case("~/", "~0~1"; "both")]
    fn escape_roundtrip(raw: &str, escaped: &str) {
        assert_eq!(escape_token(raw), escaped);
        assert_eq!(unescape_token(escaped), raw);
    }

    #[test]
    fn unescape_order() {
        assert_eq!(unescape_token("~01"), "~1");
    }

    #[test]
    fn pointer_rendering() {
        let root = InstancePath::root();
        assert_eq!(root.pointer(), "");
        let foo = root.push(Segment::Property("foo"));
        let idx = foo.push(Segment::Index(2));
        let odd = idx.push(Segment::Property("a/b"));
        assert_eq!(odd.pointer(), "/foo/2/a~1b");
    }
}
