//! Schema compilation: resource loading, reference resolution, cycle
//! detection and keyword normalization.
use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use fancy_regex::Regex;
use serde_json::{Map, Number, Value};
use url::Url;

use crate::{
    cancel::CancelToken,
    content,
    drafts::Draft,
    error::{CompileError, ValidateError},
    extension::{CompilerContext, ExtCompiler},
    formats,
    helpers,
    loader::{SchemeLoader, UrlLoader},
    meta,
    paths::escape_token,
    resource::{locate, Resource},
    schema::{
        ContentEncoding, ContentMediaType, DecodeFn, DynamicRef, FormatCheck, Items, MediaTypeFn,
        Schema, SchemaIndex,
    },
    types::{type_of, JsonType, JsonTypeSet},
    uris::{self, Fragment},
    validate,
};

/// Where a base URL points: the owning resource and the fragment location
/// of the subresource carrying that base.
#[derive(Debug, Clone)]
struct RootLocation {
    url: String,
    floc: String,
}

/// An entry on the active same-instance compilation stack.
#[derive(Debug, Clone)]
pub(crate) struct SchemaRef {
    url: String,
    floc: String,
    /// Keywords traversed from the previous entry to this one.
    chain: String,
}

#[derive(Clone)]
struct Extension {
    meta: Option<SchemaIndex>,
    compiler: Arc<dyn ExtCompiler>,
}

/// Compiles JSON Schema documents into reusable validation graphs.
///
/// A compiler owns every schema it compiles; compiled schemas stay valid
/// for its whole lifetime and validation through `&Compiler` is safe across
/// threads. Mutation (adding resources, registering extensions, compiling)
/// requires `&mut Compiler` and is therefore single-threaded.
///
/// ```rust
/// use serde_json::json;
/// use jsonschema_core::Compiler;
///
/// let mut compiler = Compiler::new();
/// compiler
///     .add_resource("schema.json", br#"{"type": "object"}"#)
///     .expect("Valid JSON");
/// let schema = compiler.compile("schema.json").expect("Valid schema");
/// assert!(compiler.is_valid(schema, &json!({"foo": "bar"})));
/// assert!(!compiler.is_valid(schema, &json!(42)));
/// ```
pub struct Compiler {
    pub(crate) schemas: Vec<Schema>,
    resources: AHashMap<String, Resource>,
    /// Raw documents added up-front, not yet touched by compilation.
    staged: AHashMap<String, Value>,
    /// Base URL -> owning resource and subresource location.
    roots: AHashMap<String, RootLocation>,
    loader: SchemeLoader,
    extensions: Vec<Extension>,
    pub(crate) formats: AHashMap<String, Arc<dyn Fn(&Value) -> bool + Send + Sync>>,
    decoders: AHashMap<String, DecodeFn>,
    media_types: AHashMap<String, MediaTypeFn>,
    default_draft: Draft,
    assert_format: Option<bool>,
    assert_content: bool,
    extract_annotations: bool,
    validate_schema: bool,
    ignore_unknown_formats: bool,
}

impl Default for Compiler {
    fn default() -> Compiler {
        Compiler::new()
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("schemas", &self.schemas.len())
            .field("resources", &self.resources.len())
            .field("default_draft", &self.default_draft)
            .finish_non_exhaustive()
    }
}

impl Compiler {
    #[must_use]
    pub fn new() -> Compiler {
        Compiler {
            schemas: Vec::new(),
            resources: AHashMap::new(),
            staged: AHashMap::new(),
            roots: AHashMap::new(),
            loader: SchemeLoader::with_defaults(),
            extensions: Vec::new(),
            formats: formats::defaults(),
            decoders: content::default_decoders(),
            media_types: content::default_media_types(),
            default_draft: Draft::default(),
            assert_format: None,
            assert_content: false,
            extract_annotations: false,
            validate_schema: true,
            ignore_unknown_formats: true,
        }
    }

    /// The draft assumed for resources without a `$schema` declaration.
    pub fn with_default_draft(&mut self, draft: Draft) -> &mut Compiler {
        self.default_draft = draft;
        self
    }

    /// Force `format` assertions on or off, overriding the per-draft
    /// default (on up to Draft 7, off from 2019-09).
    pub fn assert_format(&mut self, assert: bool) -> &mut Compiler {
        self.assert_format = Some(assert);
        self
    }

    /// Enforce `contentEncoding`/`contentMediaType`/`contentSchema`
    /// instead of treating them as annotations. Off by default.
    pub fn assert_content(&mut self, assert: bool) -> &mut Compiler {
        self.assert_content = assert;
        self
    }

    /// Populate annotation fields (`title`, `description`, ...) on
    /// compiled schemas. Off by default.
    pub fn extract_annotations(&mut self, extract: bool) -> &mut Compiler {
        self.extract_annotations = extract;
        self
    }

    /// Validate every resource against its draft's meta-schema before
    /// compiling it. On by default.
    pub fn validate_schema(&mut self, validate: bool) -> &mut Compiler {
        self.validate_schema = validate;
        self
    }

    /// Ignore `format` values without a registered validator instead of
    /// failing compilation. On by default.
    pub fn ignore_unknown_formats(&mut self, ignore: bool) -> &mut Compiler {
        self.ignore_unknown_formats = ignore;
        self
    }

    /// Register the byte body of a schema resource under `url`.
    ///
    /// # Errors
    ///
    /// Fails if the bytes are not exactly one JSON value, or if a compiled
    /// resource already occupies the URL.
    pub fn add_resource(&mut self, url: &str, bytes: &[u8]) -> Result<(), CompileError> {
        let url = uris::absolute(url)?;
        let doc = serde_json::from_slice(bytes).map_err(|source| CompileError::ParseSchema {
            url: url.to_string(),
            source,
        })?;
        self.stage(url, doc)
    }

    /// Register an already parsed schema document under `url`.
    ///
    /// # Errors
    ///
    /// Fails if a compiled resource already occupies the URL.
    pub fn add_resource_value(&mut self, url: &str, doc: Value) -> Result<(), CompileError> {
        let url = uris::absolute(url)?;
        self.stage(url, doc)
    }

    fn stage(&mut self, url: Url, doc: Value) -> Result<(), CompileError> {
        let (base, _) = uris::split(&url)?;
        if self.resources.contains_key(base.as_str()) {
            return Err(CompileError::ResourceExists {
                url: base.to_string(),
            });
        }
        // A root `$id` is an equally valid address for the document, so
        // references through it resolve without the loader.
        let draft = self.default_draft.detect(&doc).unwrap_or(self.default_draft);
        if let Some(id) = draft.id_of(&doc) {
            if let Ok(mut resolved) = base.join(id) {
                resolved.set_fragment(None);
                if resolved != base && !self.resources.contains_key(resolved.as_str()) {
                    self.staged.insert(resolved.to_string(), doc.clone());
                }
            }
        }
        self.staged.insert(base.to_string(), doc);
        Ok(())
    }

    /// Register a loader for a URL scheme, replacing any previous one.
    pub fn register_loader(&mut self, scheme: &str, loader: Box<dyn UrlLoader>) -> &mut Compiler {
        self.loader.register(scheme, loader);
        self
    }

    /// Register a `format` validator under `name`.
    pub fn register_format(
        &mut self,
        name: &str,
        check: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> &mut Compiler {
        self.formats.insert(name.to_string(), Arc::new(check));
        self
    }

    /// Register a `contentEncoding` decoder under `name`.
    pub fn register_decoder(
        &mut self,
        name: &str,
        decode: impl Fn(&str) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>>
            + Send
            + Sync
            + 'static,
    ) -> &mut Compiler {
        self.decoders.insert(name.to_string(), Arc::new(decode));
        self
    }

    /// Register a `contentMediaType` parser under `name`.
    pub fn register_media_type(
        &mut self,
        name: &str,
        parse: impl Fn(&[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
            + Send
            + Sync
            + 'static,
    ) -> &mut Compiler {
        self.media_types.insert(name.to_string(), Arc::new(parse));
        self
    }

    /// Register an extension compiler.
    ///
    /// When `meta` is given, every raw schema object is validated against
    /// it before the extension's compile hook runs.
    pub fn register_extension(
        &mut self,
        meta: Option<SchemaIndex>,
        compiler: impl ExtCompiler + 'static,
    ) -> &mut Compiler {
        self.extensions.push(Extension {
            meta,
            compiler: Arc::new(compiler),
        });
        self
    }

    /// Compile the schema at `location` (a URL, optionally with a JSON
    /// Pointer or anchor fragment).
    ///
    /// # Errors
    ///
    /// Any [`CompileError`]; on error no partial schema is retained.
    pub fn compile(&mut self, location: &str) -> Result<SchemaIndex, CompileError> {
        self.compile_with(location, &CancelToken::new())
    }

    /// Like [`Compiler::compile`], checking `cancel` between reference
    /// resolutions.
    pub fn compile_with(
        &mut self,
        location: &str,
        cancel: &CancelToken,
    ) -> Result<SchemaIndex, CompileError> {
        let mark = self.schemas.len();
        let result = uris::absolute(location).and_then(|url| {
            let mut stack = Vec::new();
            self.compile_url(&url, &mut stack, String::new(), cancel)
        });
        if result.is_err() {
            self.rollback(mark);
        }
        result
    }

    /// [`Compiler::compile`] for must-compile scenarios.
    ///
    /// # Panics
    ///
    /// Panics on any compilation failure.
    pub fn must_compile(&mut self, location: &str) -> SchemaIndex {
        match self.compile(location) {
            Ok(schema) => schema,
            Err(error) => panic!("failed to compile '{location}': {error}"),
        }
    }

    /// Validate `instance` against a compiled schema.
    ///
    /// # Errors
    ///
    /// See [`ValidateError`].
    pub fn validate(&self, schema: SchemaIndex, instance: &Value) -> Result<(), ValidateError> {
        validate::validate(self, schema, instance, None)
    }

    /// Like [`Compiler::validate`], checking `cancel` between subschema
    /// entries.
    pub fn validate_with(
        &self,
        schema: SchemaIndex,
        instance: &Value,
        cancel: &CancelToken,
    ) -> Result<(), ValidateError> {
        validate::validate(self, schema, instance, Some(cancel))
    }

    #[must_use]
    pub fn is_valid(&self, schema: SchemaIndex, instance: &Value) -> bool {
        self.validate(schema, instance).is_ok()
    }

    /// Access a compiled schema node.
    #[must_use]
    pub fn schema(&self, index: SchemaIndex) -> &Schema {
        &self.schemas[index.0]
    }

    fn rollback(&mut self, mark: usize) {
        self.schemas.truncate(mark);
        for resource in self.resources.values_mut() {
            resource.schemas.retain(|_, idx| idx.0 < mark);
        }
    }

    /// Ensure the resource at `base` is loaded, walked and meta-validated.
    fn prepare_resource(&mut self, base: &Url, cancel: &CancelToken) -> Result<(), CompileError> {
        let key = base.as_str();
        if self.resources.contains_key(key) {
            return Ok(());
        }
        let doc = if let Some(doc) = self.staged.remove(key) {
            doc
        } else if let Some(doc) = meta::standard_resource(key) {
            doc
        } else if self.roots.contains_key(key) {
            // A base established by `$id` inside an already loaded document.
            return Ok(());
        } else {
            if cancel.is_cancelled() {
                return Err(CompileError::Cancelled);
            }
            let bytes = self.loader.load(base)?;
            serde_json::from_slice(&bytes).map_err(|source| CompileError::ParseSchema {
                url: key.to_string(),
                source,
            })?
        };
        let draft = self.default_draft.detect(&doc)?;
        let resource = Resource::new(base.clone(), draft, Arc::new(doc))?;
        if self.validate_schema && !meta::is_meta_url(key) {
            meta::validate_document(draft, &resource.doc).map_err(|cause| {
                CompileError::InvalidMetaSchema {
                    url: key.to_string(),
                    cause,
                }
            })?;
        }
        self.roots.insert(
            key.to_string(),
            RootLocation {
                url: key.to_string(),
                floc: String::new(),
            },
        );
        for sub in resource.subresources.values() {
            self.roots
                .entry(sub.base.as_str().to_string())
                .or_insert_with(|| RootLocation {
                    url: key.to_string(),
                    floc: sub.floc.clone(),
                });
        }
        self.resources.insert(key.to_string(), resource);
        Ok(())
    }

    /// Resolve an absolute URL (with optional fragment) to a compiled
    /// schema, loading resources as needed.
    pub(crate) fn compile_url(
        &mut self,
        url: &Url,
        stack: &mut Vec<SchemaRef>,
        chain: String,
        cancel: &CancelToken,
    ) -> Result<SchemaIndex, CompileError> {
        if cancel.is_cancelled() {
            return Err(CompileError::Cancelled);
        }
        let (base, fragment) = uris::split(url)?;
        self.prepare_resource(&base, cancel)?;
        let root = self
            .roots
            .get(base.as_str())
            .cloned()
            .ok_or_else(|| CompileError::unresolved_reference(url.as_str()))?;
        let floc = {
            let resource = &self.resources[&root.url];
            match fragment {
                Fragment::Root => root.floc.clone(),
                Fragment::Pointer(pointer) => format!("{}{pointer}", root.floc),
                Fragment::Anchor(name) => {
                    let sub = resource
                        .subresources
                        .get(&root.floc)
                        .expect("Registered roots always have a subresource");
                    sub.anchors
                        .get(&name)
                        .map(|anchor| anchor.floc.clone())
                        .ok_or_else(|| CompileError::anchor_not_found(base.as_str(), name))?
                }
            }
        };
        self.compile_at(&root.url, floc, stack, chain, cancel)
    }

    /// Compile the schema at a known `(resource, location)` pair.
    ///
    /// Cycle handling: a location already on the same-instance `stack`
    /// can never terminate at validation time, so it fails compilation;
    /// a location that is merely registered already (possibly mid-compile)
    /// is a legitimate back-edge and returns the shared node.
    pub(crate) fn compile_at(
        &mut self,
        res_url: &str,
        floc: String,
        stack: &mut Vec<SchemaRef>,
        chain: String,
        cancel: &CancelToken,
    ) -> Result<SchemaIndex, CompileError> {
        if let Some(position) = stack
            .iter()
            .position(|entry| entry.url == res_url && entry.floc == floc)
        {
            let keyword_chain = stack[position + 1..]
                .iter()
                .map(|entry| entry.chain.as_str())
                .chain(std::iter::once(chain.as_str()))
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join("/");
            return Err(CompileError::InfiniteLoop { keyword_chain });
        }
        if let Some(&idx) = self.resources[res_url].schemas.get(&floc) {
            return Ok(idx);
        }
        let idx = SchemaIndex(self.schemas.len());
        self.schemas.push(Schema::default());
        self.resources
            .get_mut(res_url)
            .expect("Resource was prepared above")
            .schemas
            .insert(floc.clone(), idx);
        stack.push(SchemaRef {
            url: res_url.to_string(),
            floc: floc.clone(),
            chain,
        });
        let populated = self.populate(idx, res_url, &floc, stack, cancel);
        stack.pop();
        populated.map(|()| idx)
    }

    fn child(
        &mut self,
        res_url: &str,
        parent_floc: &str,
        rel: String,
        same_instance: bool,
        stack: &mut Vec<SchemaRef>,
        cancel: &CancelToken,
    ) -> Result<SchemaIndex, CompileError> {
        let floc = format!("{parent_floc}/{rel}");
        if same_instance {
            self.compile_at(res_url, floc, stack, rel, cancel)
        } else {
            let mut fresh = Vec::new();
            self.compile_at(res_url, floc, &mut fresh, rel, cancel)
        }
    }

    /// Fill in the already allocated node at `idx`. Population completes
    /// before the outer compile call returns, so the validation engine
    /// never observes a half-built node.
    fn populate(
        &mut self,
        idx: SchemaIndex,
        res_url: &str,
        floc: &str,
        stack: &mut Vec<SchemaRef>,
        cancel: &CancelToken,
    ) -> Result<(), CompileError> {
        let (doc, draft, res_base, sub_floc, sub_recursive, dynamic_anchors) = {
            let resource = &self.resources[res_url];
            let sub = resource.subresource_of(floc);
            let dynamic: Vec<(String, String)> = sub
                .anchors
                .iter()
                .filter(|(_, anchor)| anchor.dynamic)
                .map(|(name, anchor)| (name.clone(), anchor.floc.clone()))
                .collect();
            (
                Arc::clone(&resource.doc),
                resource.draft,
                resource.url.clone(),
                sub.floc.clone(),
                sub.recursive_anchor,
                dynamic,
            )
        };
        let location = format!("{res_url}#{floc}");
        let (raw, base) = locate(&doc, draft, &res_base, floc)?;

        let mut sch = Schema {
            idx,
            location: location.clone(),
            draft,
            ..Schema::default()
        };

        if floc == sub_floc {
            sch.resource_root = idx;
            sch.recursive_anchor = sub_recursive;
            for (name, anchor_floc) in dynamic_anchors {
                let mut fresh = Vec::new();
                let target = self.compile_at(res_url, anchor_floc, &mut fresh, String::new(), cancel)?;
                sch.dynamic_anchors.insert(name, target);
            }
        } else {
            let mut fresh = Vec::new();
            sch.resource_root =
                self.compile_at(res_url, sub_floc, &mut fresh, String::new(), cancel)?;
        }

        let obj = match raw {
            Value::Bool(boolean) => {
                sch.boolean = Some(*boolean);
                self.schemas[idx.0] = sch;
                return Ok(());
            }
            Value::Object(obj) => obj,
            other => {
                return Err(CompileError::InvalidSchemaType {
                    location,
                    got: type_of(other),
                })
            }
        };

        if self.extract_annotations {
            extract_annotations(&mut sch, obj, draft);
        }

        // In Draft 4-7, `$ref` replaces every sibling keyword.
        if !draft.honors_ref_siblings() {
            if let Some(reference) = obj.get("$ref") {
                let reference = string_keyword(&location, reference, "$ref")?;
                let target = uris::resolve(&base, reference)?;
                sch.ref_ = Some(self.compile_url(&target, stack, "$ref".to_string(), cancel)?);
                self.schemas[idx.0] = sch;
                return Ok(());
            }
        } else if let Some(reference) = obj.get("$ref") {
            let reference = string_keyword(&location, reference, "$ref")?;
            let target = uris::resolve(&base, reference)?;
            sch.ref_ = Some(self.compile_url(&target, stack, "$ref".to_string(), cancel)?);
        }

        if draft.has_recursive_keywords() {
            if let Some(reference) = obj.get("$recursiveRef") {
                let reference = string_keyword(&location, reference, "$recursiveRef")?;
                if reference != "#" {
                    return Err(CompileError::invalid_keyword_value(
                        &location,
                        "$recursiveRef",
                        "only '#' is allowed",
                    ));
                }
                let target = uris::resolve(&base, "#")?;
                sch.recursive_ref =
                    Some(self.compile_url(&target, stack, "$recursiveRef".to_string(), cancel)?);
            }
        }

        if draft.has_dynamic_keywords() {
            if let Some(reference) = obj.get("$dynamicRef") {
                let reference = string_keyword(&location, reference, "$dynamicRef")?;
                let target = uris::resolve(&base, reference)?;
                let fallback =
                    self.compile_url(&target, stack, "$dynamicRef".to_string(), cancel)?;
                sch.dynamic_ref = Some(DynamicRef {
                    fallback,
                    anchor: self.dynamic_anchor_name(&target)?,
                });
            }
        }

        self.compile_generic(&mut sch, obj, &location)?;
        self.compile_numbers(&mut sch, obj, &location, draft)?;
        self.compile_strings(&mut sch, obj, &location)?;
        self.compile_arrays(&mut sch, obj, &location, res_url, floc, draft, stack, cancel)?;
        self.compile_objects(&mut sch, obj, &location, res_url, floc, draft, stack, cancel)?;
        self.compile_logic(&mut sch, obj, &location, res_url, floc, draft, stack, cancel)?;
        self.compile_content(&mut sch, obj, &location, res_url, floc, draft, stack, cancel)?;
        self.compile_extensions(&mut sch, obj, raw, &location, res_url, floc, &base, draft, stack, cancel)?;

        self.schemas[idx.0] = sch;
        Ok(())
    }

    /// For a statically resolved `$dynamicRef` target, the anchor name to
    /// re-resolve through the dynamic scope, if the target resource
    /// declares it with `$dynamicAnchor`.
    fn dynamic_anchor_name(&self, target: &Url) -> Result<Option<String>, CompileError> {
        let (base, fragment) = uris::split(target)?;
        let Fragment::Anchor(name) = fragment else {
            return Ok(None);
        };
        let Some(root) = self.roots.get(base.as_str()) else {
            return Ok(None);
        };
        let resource = &self.resources[&root.url];
        let declared = resource
            .subresources
            .get(&root.floc)
            .and_then(|sub| sub.anchors.get(&name))
            .is_some_and(|anchor| anchor.dynamic);
        Ok(declared.then_some(name))
    }

    fn compile_generic(
        &mut self,
        sch: &mut Schema,
        obj: &Map<String, Value>,
        location: &str,
    ) -> Result<(), CompileError> {
        match obj.get("type") {
            None => {}
            Some(Value::String(name)) => {
                sch.types = JsonTypeSet::empty().add(parse_type(location, name)?);
            }
            Some(Value::Array(names)) => {
                let mut types = JsonTypeSet::empty();
                for name in names {
                    let name = string_keyword(location, name, "type")?;
                    types = types.add(parse_type(location, name)?);
                }
                sch.types = types;
            }
            Some(other) => {
                return Err(CompileError::invalid_keyword_value(
                    location,
                    "type",
                    format!("expected a string or array, but got {}", type_of(other)),
                ))
            }
        }

        match obj.get("enum") {
            None => {}
            Some(Value::Array(options)) => sch.enum_ = Some(options.clone()),
            Some(other) => {
                return Err(CompileError::invalid_keyword_value(
                    location,
                    "enum",
                    format!("expected an array, but got {}", type_of(other)),
                ))
            }
        }

        if sch.draft >= Draft::Draft6 {
            sch.const_ = obj.get("const").cloned();
        }

        if let Some(format) = obj.get("format") {
            let name = string_keyword(location, format, "format")?;
            match self.formats.get(name) {
                Some(check) => {
                    sch.format = Some(FormatCheck {
                        name: name.to_string(),
                        check: Arc::clone(check),
                        assert: self
                            .assert_format
                            .unwrap_or_else(|| sch.draft.asserts_formats_by_default()),
                    });
                }
                None if self.ignore_unknown_formats => {}
                None => {
                    return Err(CompileError::invalid_keyword_value(
                        location,
                        "format",
                        format!("unknown format '{name}'"),
                    ))
                }
            }
        }
        Ok(())
    }

    fn compile_numbers(
        &mut self,
        sch: &mut Schema,
        obj: &Map<String, Value>,
        location: &str,
        draft: Draft,
    ) -> Result<(), CompileError> {
        let minimum = number_keyword(location, obj, "minimum")?;
        let maximum = number_keyword(location, obj, "maximum")?;
        if draft == Draft::Draft4 {
            // Draft 4 `exclusiveMinimum`/`exclusiveMaximum` are booleans
            // qualifying `minimum`/`maximum`.
            match obj.get("exclusiveMinimum") {
                Some(Value::Bool(true)) => sch.exclusive_minimum = minimum,
                Some(Value::Bool(false)) | None => sch.minimum = minimum,
                Some(other) => {
                    return Err(CompileError::invalid_keyword_value(
                        location,
                        "exclusiveMinimum",
                        format!("expected a boolean, but got {}", type_of(other)),
                    ))
                }
            }
            match obj.get("exclusiveMaximum") {
                Some(Value::Bool(true)) => sch.exclusive_maximum = maximum,
                Some(Value::Bool(false)) | None => sch.maximum = maximum,
                Some(other) => {
                    return Err(CompileError::invalid_keyword_value(
                        location,
                        "exclusiveMaximum",
                        format!("expected a boolean, but got {}", type_of(other)),
                    ))
                }
            }
        } else {
            sch.minimum = minimum;
            sch.maximum = maximum;
            sch.exclusive_minimum = number_keyword(location, obj, "exclusiveMinimum")?;
            sch.exclusive_maximum = number_keyword(location, obj, "exclusiveMaximum")?;
        }

        if let Some(multiple_of) = number_keyword(location, obj, "multipleOf")? {
            if !helpers::is_positive(&multiple_of) {
                return Err(CompileError::invalid_keyword_value(
                    location,
                    "multipleOf",
                    "must be greater than zero",
                ));
            }
            sch.multiple_of = Some(multiple_of);
        }
        Ok(())
    }

    fn compile_strings(
        &mut self,
        sch: &mut Schema,
        obj: &Map<String, Value>,
        location: &str,
    ) -> Result<(), CompileError> {
        sch.min_length = uint_keyword(location, obj, "minLength")?;
        sch.max_length = uint_keyword(location, obj, "maxLength")?;
        if let Some(pattern) = obj.get("pattern") {
            let pattern = string_keyword(location, pattern, "pattern")?;
            let regex = Regex::new(pattern)
                .map_err(|source| CompileError::invalid_regex(location, pattern, source))?;
            sch.pattern = Some(regex);
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn compile_arrays(
        &mut self,
        sch: &mut Schema,
        obj: &Map<String, Value>,
        location: &str,
        res_url: &str,
        floc: &str,
        draft: Draft,
        stack: &mut Vec<SchemaRef>,
        cancel: &CancelToken,
    ) -> Result<(), CompileError> {
        sch.min_items = uint_keyword(location, obj, "minItems")?;
        sch.max_items = uint_keyword(location, obj, "maxItems")?;
        sch.unique_items = obj.get("uniqueItems") == Some(&Value::Bool(true));

        if draft == Draft::Draft202012 {
            if let Some(Value::Array(prefix)) = obj.get("prefixItems") {
                for i in 0..prefix.len() {
                    let item =
                        self.child(res_url, floc, format!("prefixItems/{i}"), false, stack, cancel)?;
                    sch.prefix_items.push(item);
                }
            }
        }

        match obj.get("items") {
            None => {}
            Some(Value::Array(items)) => {
                if draft == Draft::Draft202012 {
                    return Err(CompileError::invalid_keyword_value(
                        location,
                        "items",
                        "the array form moved to 'prefixItems' in Draft 2020-12",
                    ));
                }
                let mut compiled = Vec::with_capacity(items.len());
                for i in 0..items.len() {
                    compiled.push(self.child(
                        res_url,
                        floc,
                        format!("items/{i}"),
                        false,
                        stack,
                        cancel,
                    )?);
                }
                sch.items = Some(Items::Array(compiled));
            }
            Some(_) => {
                let item = self.child(res_url, floc, "items".to_string(), false, stack, cancel)?;
                sch.items = Some(Items::Schema(item));
            }
        }

        if draft < Draft::Draft202012 && obj.contains_key("additionalItems") {
            sch.additional_items =
                Some(self.child(res_url, floc, "additionalItems".to_string(), false, stack, cancel)?);
        }

        if draft >= Draft::Draft6 && obj.contains_key("contains") {
            sch.contains =
                Some(self.child(res_url, floc, "contains".to_string(), false, stack, cancel)?);
            if draft >= Draft::Draft201909 {
                sch.min_contains = uint_keyword(location, obj, "minContains")?;
                sch.max_contains = uint_keyword(location, obj, "maxContains")?;
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn compile_objects(
        &mut self,
        sch: &mut Schema,
        obj: &Map<String, Value>,
        location: &str,
        res_url: &str,
        floc: &str,
        draft: Draft,
        stack: &mut Vec<SchemaRef>,
        cancel: &CancelToken,
    ) -> Result<(), CompileError> {
        sch.min_properties = uint_keyword(location, obj, "minProperties")?;
        sch.max_properties = uint_keyword(location, obj, "maxProperties")?;

        if let Some(required) = obj.get("required") {
            sch.required = strings_keyword(location, required, "required")?;
            let mut seen = sch.required.clone();
            seen.sort_unstable();
            seen.dedup();
            if seen.len() != sch.required.len() {
                return Err(CompileError::invalid_keyword_value(
                    location,
                    "required",
                    "property names must be unique",
                ));
            }
        }

        if let Some(Value::Object(properties)) = obj.get("properties") {
            for name in properties.keys() {
                let rel = format!("properties/{}", escape_token(name));
                let sub = self.child(res_url, floc, rel, false, stack, cancel)?;
                sch.properties.insert(name.clone(), sub);
            }
        }

        if let Some(Value::Object(patterns)) = obj.get("patternProperties") {
            for pattern in patterns.keys() {
                let regex = Regex::new(pattern)
                    .map_err(|source| CompileError::invalid_regex(location, pattern, source))?;
                let rel = format!("patternProperties/{}", escape_token(pattern));
                let sub = self.child(res_url, floc, rel, false, stack, cancel)?;
                sch.pattern_properties.push((regex, sub));
            }
        }

        if obj.contains_key("additionalProperties") {
            sch.additional_properties = Some(self.child(
                res_url,
                floc,
                "additionalProperties".to_string(),
                false,
                stack,
                cancel,
            )?);
        }

        if draft >= Draft::Draft6 && obj.contains_key("propertyNames") {
            sch.property_names =
                Some(self.child(res_url, floc, "propertyNames".to_string(), false, stack, cancel)?);
        }

        if draft >= Draft::Draft201909 {
            if let Some(Value::Object(dependent)) = obj.get("dependentRequired") {
                for (name, value) in dependent {
                    let missing = strings_keyword(location, value, "dependentRequired")?;
                    sch.dependent_required.push((name.clone(), missing));
                }
            }
            if let Some(Value::Object(dependent)) = obj.get("dependentSchemas") {
                for name in dependent.keys() {
                    let rel = format!("dependentSchemas/{}", escape_token(name));
                    let sub = self.child(res_url, floc, rel, true, stack, cancel)?;
                    sch.dependent_schemas.push((name.clone(), sub));
                }
            }
            if obj.contains_key("unevaluatedProperties") {
                sch.unevaluated_properties = Some(self.child(
                    res_url,
                    floc,
                    "unevaluatedProperties".to_string(),
                    false,
                    stack,
                    cancel,
                )?);
            }
            if obj.contains_key("unevaluatedItems") {
                sch.unevaluated_items = Some(self.child(
                    res_url,
                    floc,
                    "unevaluatedItems".to_string(),
                    false,
                    stack,
                    cancel,
                )?);
            }
        } else if let Some(Value::Object(dependencies)) = obj.get("dependencies") {
            // Before 2019-09 `dependencies` mixes both forms; it splits
            // into the dedicated keywords here.
            for (name, value) in dependencies {
                match value {
                    Value::Array(_) => {
                        let missing = strings_keyword(location, value, "dependencies")?;
                        sch.dependent_required.push((name.clone(), missing));
                    }
                    _ => {
                        let rel = format!("dependencies/{}", escape_token(name));
                        let sub = self.child(res_url, floc, rel, true, stack, cancel)?;
                        sch.dependent_schemas.push((name.clone(), sub));
                    }
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn compile_logic(
        &mut self,
        sch: &mut Schema,
        obj: &Map<String, Value>,
        location: &str,
        res_url: &str,
        floc: &str,
        draft: Draft,
        stack: &mut Vec<SchemaRef>,
        cancel: &CancelToken,
    ) -> Result<(), CompileError> {
        for (keyword, target) in [
            ("allOf", &mut sch.all_of),
            ("anyOf", &mut sch.any_of),
            ("oneOf", &mut sch.one_of),
        ] {
            match obj.get(keyword) {
                None => {}
                Some(Value::Array(branches)) => {
                    for i in 0..branches.len() {
                        target.push(self.child(
                            res_url,
                            floc,
                            format!("{keyword}/{i}"),
                            true,
                            stack,
                            cancel,
                        )?);
                    }
                }
                Some(other) => {
                    return Err(CompileError::invalid_keyword_value(
                        location,
                        keyword,
                        format!("expected an array, but got {}", type_of(other)),
                    ))
                }
            }
        }

        if obj.contains_key("not") {
            sch.not = Some(self.child(res_url, floc, "not".to_string(), true, stack, cancel)?);
        }

        if draft >= Draft::Draft7 {
            if obj.contains_key("if") {
                sch.if_ = Some(self.child(res_url, floc, "if".to_string(), false, stack, cancel)?);
            }
            if obj.contains_key("then") {
                sch.then =
                    Some(self.child(res_url, floc, "then".to_string(), true, stack, cancel)?);
            }
            if obj.contains_key("else") {
                sch.else_ =
                    Some(self.child(res_url, floc, "else".to_string(), true, stack, cancel)?);
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn compile_content(
        &mut self,
        sch: &mut Schema,
        obj: &Map<String, Value>,
        location: &str,
        res_url: &str,
        floc: &str,
        draft: Draft,
        stack: &mut Vec<SchemaRef>,
        cancel: &CancelToken,
    ) -> Result<(), CompileError> {
        if draft < Draft::Draft7 {
            return Ok(());
        }
        sch.assert_content = self.assert_content;
        if let Some(encoding) = obj.get("contentEncoding") {
            let name = string_keyword(location, encoding, "contentEncoding")?;
            // Encodings without a registered decoder stay annotations.
            if let Some(decode) = self.decoders.get(name) {
                sch.content_encoding = Some(ContentEncoding {
                    name: name.to_string(),
                    decode: Arc::clone(decode),
                });
            }
        }
        if let Some(media_type) = obj.get("contentMediaType") {
            let name = string_keyword(location, media_type, "contentMediaType")?;
            if let Some(parse) = self.media_types.get(name) {
                sch.content_media_type = Some(ContentMediaType {
                    name: name.to_string(),
                    parse: Arc::clone(parse),
                });
            }
        }
        if draft >= Draft::Draft201909 && obj.contains_key("contentSchema") {
            sch.content_schema =
                Some(self.child(res_url, floc, "contentSchema".to_string(), false, stack, cancel)?);
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn compile_extensions(
        &mut self,
        sch: &mut Schema,
        obj: &Map<String, Value>,
        raw: &Value,
        location: &str,
        res_url: &str,
        floc: &str,
        base: &Url,
        draft: Draft,
        stack: &mut Vec<SchemaRef>,
        cancel: &CancelToken,
    ) -> Result<(), CompileError> {
        if self.extensions.is_empty() {
            return Ok(());
        }
        let extensions = self.extensions.clone();
        for extension in extensions {
            if let Some(meta) = extension.meta {
                match validate::validate(self, meta, raw, None) {
                    Ok(()) => {}
                    Err(ValidateError::Validation(cause)) => {
                        return Err(CompileError::InvalidMetaSchema {
                            url: location.to_string(),
                            cause,
                        })
                    }
                    Err(other) => {
                        return Err(CompileError::invalid_keyword_value(
                            location,
                            "extension",
                            other.to_string(),
                        ))
                    }
                }
            }
            let mut ctx = CompilerContext {
                compiler: self,
                res_url,
                floc,
                base,
                draft,
                stack,
                cancel,
            };
            if let Some(compiled) = extension.compiler.compile(&mut ctx, obj)? {
                sch.extensions.push(compiled);
            }
        }
        Ok(())
    }
}

fn extract_annotations(sch: &mut Schema, obj: &Map<String, Value>, draft: Draft) {
    sch.title = obj.get("title").and_then(Value::as_str).map(str::to_string);
    sch.description = obj
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);
    sch.default = obj.get("default").cloned();
    if draft >= Draft::Draft6 {
        sch.examples = obj
            .get("examples")
            .and_then(Value::as_array)
            .map(|v: &Vec<Value>| v.to_vec());
    }
    if draft >= Draft::Draft7 {
        sch.comment = obj
            .get("$comment")
            .and_then(Value::as_str)
            .map(str::to_string);
        sch.read_only = obj.get("readOnly").and_then(Value::as_bool).unwrap_or(false);
        sch.write_only = obj
            .get("writeOnly")
            .and_then(Value::as_bool)
            .unwrap_or(false);
    }
    if draft >= Draft::Draft201909 {
        sch.deprecated = obj
            .get("deprecated")
            .and_then(Value::as_bool)
            .unwrap_or(false);
    }
}

fn parse_type(location: &str, name: &str) -> Result<JsonType, CompileError> {
    JsonType::from_keyword(name).ok_or_else(|| {
        CompileError::invalid_keyword_value(location, "type", format!("unknown type '{name}'"))
    })
}

fn string_keyword<'a>(
    location: &str,
    value: &'a Value,
    keyword: &'static str,
) -> Result<&'a str, CompileError> {
    value.as_str().ok_or_else(|| {
        CompileError::invalid_keyword_value(
            location,
            keyword,
            format!("expected a string, but got {}", type_of(value)),
        )
    })
}

fn number_keyword(
    location: &str,
    obj: &Map<String, Value>,
    keyword: &'static str,
) -> Result<Option<Number>, CompileError> {
    match obj.get(keyword) {
        None => Ok(None),
        Some(Value::Number(number)) => {
            if helpers::to_fraction(number).is_none() {
                return Err(CompileError::invalid_keyword_value(
                    location,
                    keyword,
                    format!("'{number}' is not a decimal number"),
                ));
            }
            Ok(Some(number.clone()))
        }
        Some(other) => Err(CompileError::invalid_keyword_value(
            location,
            keyword,
            format!("expected a number, but got {}", type_of(other)),
        )),
    }
}

fn uint_keyword(
    location: &str,
    obj: &Map<String, Value>,
    keyword: &'static str,
) -> Result<Option<u64>, CompileError> {
    match obj.get(keyword) {
        None => Ok(None),
        Some(Value::Number(number)) => number
            .as_u64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|value| value.fract() == 0.0 && *value >= 0.0)
                    .map(|value| value as u64)
            })
            .map(Some)
            .ok_or_else(|| {
                CompileError::invalid_keyword_value(
                    location,
                    keyword,
                    format!("'{number}' is not a non-negative integer"),
                )
            }),
        Some(other) => Err(CompileError::invalid_keyword_value(
            location,
            keyword,
            format!("expected a non-negative integer, but got {}", type_of(other)),
        )),
    }
}

fn strings_keyword(
    location: &str,
    value: &Value,
    keyword: &'static str,
) -> Result<Vec<String>, CompileError> {
    let items = value.as_array().ok_or_else(|| {
        CompileError::invalid_keyword_value(
            location,
            keyword,
            format!("expected an array, but got {}", type_of(value)),
        )
    })?;
    items
        .iter()
        .map(|item| {
            string_keyword(location, item, keyword).map(str::to_string)
        })
        .collect()
}
