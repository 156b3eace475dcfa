//! Loading of remote schema resources.
//!
//! The loader returns raw bytes and never parses JSON; parsing happens in
//! the resource store with number-preserving semantics.
use std::error::Error;

use ahash::AHashMap;
use url::Url;

use crate::error::CompileError;

/// Fetches the bytes behind a URL.
///
/// Implement this to support additional URL schemes:
///
/// ```rust
/// use jsonschema_core::{Compiler, UrlLoader};
/// use url::Url;
///
/// struct MapLoader;
///
/// impl UrlLoader for MapLoader {
///     fn load(&self, url: &Url) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
///         match url.path() {
///             "/obj.json" => Ok(br#"{"type": "object"}"#.to_vec()),
///             path => Err(format!("no entry for {path}").into()),
///         }
///     }
/// }
///
/// let mut compiler = Compiler::new();
/// compiler.register_loader("map", Box::new(MapLoader));
/// ```
pub trait UrlLoader: Send + Sync {
    /// Fetch the byte body behind `url`.
    ///
    /// # Errors
    ///
    /// Any error is wrapped into [`CompileError::Load`] by the compiler.
    fn load(&self, url: &Url) -> Result<Vec<u8>, Box<dyn Error + Send + Sync>>;
}

/// Dispatches loads to the handler registered for the URL scheme.
pub(crate) struct SchemeLoader {
    handlers: AHashMap<String, Box<dyn UrlLoader>>,
}

impl SchemeLoader {
    pub(crate) fn with_defaults() -> SchemeLoader {
        #[allow(unused_mut)]
        let mut handlers: AHashMap<String, Box<dyn UrlLoader>> = AHashMap::new();
        #[cfg(feature = "resolve-file")]
        handlers.insert("file".to_string(), Box::new(FileLoader));
        #[cfg(feature = "resolve-http")]
        {
            handlers.insert("http".to_string(), Box::new(HttpLoader));
            handlers.insert("https".to_string(), Box::new(HttpLoader));
        }
        SchemeLoader { handlers }
    }

    pub(crate) fn register(&mut self, scheme: &str, loader: Box<dyn UrlLoader>) {
        self.handlers.insert(scheme.to_string(), loader);
    }

    pub(crate) fn load(&self, url: &Url) -> Result<Vec<u8>, CompileError> {
        let handler =
            self.handlers
                .get(url.scheme())
                .ok_or_else(|| CompileError::UnsupportedUrlScheme {
                    url: url.to_string(),
                })?;
        handler
            .load(url)
            .map_err(|source| CompileError::load(url.as_str(), source))
    }
}

#[cfg(feature = "resolve-file")]
struct FileLoader;

#[cfg(feature = "resolve-file")]
impl UrlLoader for FileLoader {
    fn load(&self, url: &Url) -> Result<Vec<u8>, Box<dyn Error + Send + Sync>> {
        let path = url
            .to_file_path()
            .map_err(|()| format!("'{url}' is not a valid file path"))?;
        Ok(std::fs::read(path)?)
    }
}

#[cfg(feature = "resolve-http")]
struct HttpLoader;

#[cfg(feature = "resolve-http")]
impl UrlLoader for HttpLoader {
    fn load(&self, url: &Url) -> Result<Vec<u8>, Box<dyn Error + Send + Sync>> {
        let response = reqwest::blocking::get(url.as_str())?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_scheme() {
        let loader = SchemeLoader::with_defaults();
        let url = Url::parse("gopher://example.com/schema.json").expect("Valid URL");
        let error = loader.load(&url).expect_err("Unsupported scheme");
        assert!(matches!(error, CompileError::UnsupportedUrlScheme { .. }));
    }

    #[cfg(feature = "resolve-file")]
    #[test]
    fn file_loading() {
        let dir = std::env::temp_dir().join("jsonschema-core-loader-test");
        std::fs::create_dir_all(&dir).expect("Failed to create a directory");
        let path = dir.join("schema.json");
        std::fs::write(&path, br#"{"type": "object"}"#).expect("Failed to write");
        let url = Url::from_file_path(&path).expect("Valid path");
        let loader = SchemeLoader::with_defaults();
        let bytes = loader.load(&url).expect("Loadable file");
        assert_eq!(bytes, br#"{"type": "object"}"#);
    }
}
