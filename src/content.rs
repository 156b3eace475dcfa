//! Built-in content decoders and media types.
use ahash::AHashMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;
use std::sync::Arc;

use crate::schema::{DecodeFn, MediaTypeFn};

/// The default `contentEncoding` decoders, copied into every compiler.
pub(crate) fn default_decoders() -> AHashMap<String, DecodeFn> {
    let mut decoders: AHashMap<String, DecodeFn> = AHashMap::with_capacity(1);
    decoders.insert(
        "base64".to_string(),
        Arc::new(|text: &str| STANDARD.decode(text).map_err(Into::into)),
    );
    decoders
}

/// The default `contentMediaType` parsers, copied into every compiler.
pub(crate) fn default_media_types() -> AHashMap<String, MediaTypeFn> {
    let mut media_types: AHashMap<String, MediaTypeFn> = AHashMap::with_capacity(1);
    media_types.insert(
        "application/json".to_string(),
        Arc::new(|bytes: &[u8]| {
            serde_json::from_slice::<Value>(bytes)
                .map(|_| ())
                .map_err(Into::into)
        }),
    );
    media_types
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_decoder() {
        let decoders = default_decoders();
        let decode = &decoders["base64"];
        assert_eq!(decode("aGVsbG8=").expect("Valid base64"), b"hello");
        assert!(decode("not base64!").is_err());
    }

    #[test]
    fn json_media_type() {
        let media_types = default_media_types();
        let parse = &media_types["application/json"];
        assert!(parse(br#"{"a": 1}"#).is_ok());
        assert!(parse(b"{").is_err());
    }
}
