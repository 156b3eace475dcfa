//! Loaded schema documents and their internal structure.
//!
//! Every loaded document is walked once to discover nested `$id`
//! declarations (subresources) and anchors, so that references can be
//! resolved without re-scanning the document.
use std::sync::Arc;

use ahash::AHashMap;
use serde_json::Value;
use url::Url;

use crate::{
    drafts::{Draft, SubschemaKind},
    error::CompileError,
    paths::{escape_token, unescape_token},
    schema::SchemaIndex,
    uris,
};

/// A named location within a resource.
#[derive(Debug, Clone)]
pub(crate) struct Anchor {
    pub(crate) floc: String,
    pub(crate) dynamic: bool,
}

/// A region of a document with its own base URI, established by `$id`.
#[derive(Debug)]
pub(crate) struct Subresource {
    pub(crate) floc: String,
    pub(crate) base: Url,
    pub(crate) anchors: AHashMap<String, Anchor>,
    pub(crate) recursive_anchor: bool,
}

/// A loaded JSON document at a canonical base URL.
#[derive(Debug)]
pub(crate) struct Resource {
    pub(crate) url: Url,
    pub(crate) draft: Draft,
    pub(crate) doc: Arc<Value>,
    /// Fragment location of each subresource, `""` for the document root.
    pub(crate) subresources: AHashMap<String, Subresource>,
    /// Compiled-location map: one schema node per location, shared by all
    /// references to it.
    pub(crate) schemas: AHashMap<String, SchemaIndex>,
}

impl Resource {
    pub(crate) fn new(url: Url, draft: Draft, doc: Arc<Value>) -> Result<Resource, CompileError> {
        let mut subresources = AHashMap::new();
        subresources.insert(
            String::new(),
            Subresource {
                floc: String::new(),
                base: url.clone(),
                anchors: AHashMap::new(),
                recursive_anchor: false,
            },
        );
        let mut resource = Resource {
            url,
            draft,
            doc: Arc::clone(&doc),
            subresources,
            schemas: AHashMap::new(),
        };
        resource.walk(&doc, String::new(), String::new())?;
        Ok(resource)
    }

    /// The subresource enclosing `floc`: the one with the longest fragment
    /// prefix of it.
    pub(crate) fn subresource_of(&self, floc: &str) -> &Subresource {
        let mut best = self
            .subresources
            .get("")
            .expect("Root subresource always exists");
        for sub in self.subresources.values() {
            if sub.floc.len() > best.floc.len()
                && floc.starts_with(sub.floc.as_str())
                && (floc.len() == sub.floc.len() || floc.as_bytes()[sub.floc.len()] == b'/')
            {
                best = sub;
            }
        }
        best
    }

    fn location(&self, floc: &str) -> String {
        format!("{}#{}", self.url, floc)
    }

    fn walk(&mut self, value: &Value, floc: String, sub_floc: String) -> Result<(), CompileError> {
        let Some(schema) = value.as_object() else {
            return Ok(());
        };

        let mut sub_floc = sub_floc;
        if let Some(id) = self.draft.id_of(value) {
            let base = &self.subresources[&sub_floc].base;
            let joined = uris::without_empty_fragment(
                base.join(id)
                    .map_err(|source| CompileError::invalid_url(id, source))?,
            );
            match joined.fragment().map(str::to_string) {
                Some(anchor) => {
                    if !self.draft.allows_id_fragment() {
                        return Err(CompileError::invalid_keyword_value(
                            self.location(&floc),
                            "$id",
                            "must not contain a fragment",
                        ));
                    }
                    let mut fragmentless = joined;
                    fragmentless.set_fragment(None);
                    if fragmentless != self.subresources[&sub_floc].base {
                        sub_floc = self.add_subresource(floc.clone(), fragmentless);
                    }
                    self.add_anchor(&sub_floc, &floc, anchor, false)?;
                }
                None => {
                    if joined != self.subresources[&sub_floc].base {
                        sub_floc = self.add_subresource(floc.clone(), joined);
                    }
                }
            }
        }

        if self.draft.has_anchor_keyword() {
            if let Some(name) = schema.get("$anchor").and_then(Value::as_str) {
                self.add_anchor(&sub_floc, &floc, name.to_string(), false)?;
            }
        }
        if self.draft.has_dynamic_keywords() {
            if let Some(name) = schema.get("$dynamicAnchor").and_then(Value::as_str) {
                self.add_anchor(&sub_floc, &floc, name.to_string(), true)?;
            }
        }
        if self.draft.has_recursive_keywords()
            && schema.get("$recursiveAnchor") == Some(&Value::Bool(true))
            && floc == sub_floc
        {
            self.subresources
                .get_mut(&sub_floc)
                .expect("Current subresource always exists")
                .recursive_anchor = true;
        }

        for (keyword, value) in schema {
            let Some(kind) = self.draft.subschema_kind(keyword) else {
                continue;
            };
            let child_floc = format!("{floc}/{keyword}");
            match kind {
                SubschemaKind::One => {
                    self.walk(value, child_floc, sub_floc.clone())?;
                }
                SubschemaKind::Many => {
                    if let Some(items) = value.as_array() {
                        for (idx, item) in items.iter().enumerate() {
                            self.walk(item, format!("{child_floc}/{idx}"), sub_floc.clone())?;
                        }
                    }
                }
                SubschemaKind::SchemaOrArray => match value {
                    Value::Array(items) => {
                        for (idx, item) in items.iter().enumerate() {
                            self.walk(item, format!("{child_floc}/{idx}"), sub_floc.clone())?;
                        }
                    }
                    _ => self.walk(value, child_floc, sub_floc.clone())?,
                },
                SubschemaKind::Map => {
                    if let Some(members) = value.as_object() {
                        for (name, member) in members {
                            self.walk(
                                member,
                                format!("{child_floc}/{}", escape_token(name)),
                                sub_floc.clone(),
                            )?;
                        }
                    }
                }
                SubschemaKind::SchemaOrStringsMap => {
                    if let Some(members) = value.as_object() {
                        for (name, member) in members {
                            if member.is_object() || member.is_boolean() {
                                self.walk(
                                    member,
                                    format!("{child_floc}/{}", escape_token(name)),
                                    sub_floc.clone(),
                                )?;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn add_subresource(&mut self, floc: String, base: Url) -> String {
        self.subresources.insert(
            floc.clone(),
            Subresource {
                floc: floc.clone(),
                base,
                anchors: AHashMap::new(),
                recursive_anchor: false,
            },
        );
        floc
    }

    fn add_anchor(
        &mut self,
        sub_floc: &str,
        floc: &str,
        name: String,
        dynamic: bool,
    ) -> Result<(), CompileError> {
        let location = self.location(floc);
        let sub = self
            .subresources
            .get_mut(sub_floc)
            .expect("Current subresource always exists");
        let previous = sub.anchors.insert(
            name.clone(),
            Anchor {
                floc: floc.to_string(),
                dynamic,
            },
        );
        match previous {
            // `$dynamicAnchor` also serves as a plain anchor; the same
            // object may not redeclare the name though.
            Some(prev) if prev.floc != floc => Err(CompileError::invalid_keyword_value(
                location,
                "$anchor",
                format!("duplicate anchor '{name}'"),
            )),
            _ => Ok(()),
        }
    }
}

/// Navigate `floc` from the document root, resolving nested `$id`
/// declarations along the way. Returns the target value and the effective
/// base URL at it.
pub(crate) fn locate<'a>(
    doc: &'a Value,
    draft: Draft,
    url: &Url,
    floc: &str,
) -> Result<(&'a Value, Url), CompileError> {
    let mut value = doc;
    let mut base = url.clone();
    apply_id(value, draft, &mut base)?;
    if floc.is_empty() {
        return Ok((value, base));
    }
    for token in floc.split('/').skip(1) {
        let token = unescape_token(token);
        let next = match value {
            Value::Object(map) => map.get(token.as_ref()),
            Value::Array(items) => token.parse::<usize>().ok().and_then(|idx| items.get(idx)),
            _ => None,
        };
        value = next
            .ok_or_else(|| CompileError::unresolved_reference(format!("{url}#{floc}")))?;
        apply_id(value, draft, &mut base)?;
    }
    Ok((value, base))
}

fn apply_id(value: &Value, draft: Draft, base: &mut Url) -> Result<(), CompileError> {
    if let Some(id) = draft.id_of(value) {
        let mut joined = base
            .join(id)
            .map_err(|source| CompileError::invalid_url(id, source))?;
        joined.set_fragment(None);
        *base = joined;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resource(draft: Draft, doc: Value) -> Resource {
        Resource::new(
            Url::parse("http://example.com/root.json").expect("Valid URL"),
            draft,
            Arc::new(doc),
        )
        .expect("Valid resource")
    }

    #[test]
    fn nested_subresources() {
        let resource = resource(
            Draft::Draft202012,
            json!({
                "$defs": {
                    "node": {
                        "$id": "node.json",
                        "$anchor": "top",
                        "properties": {
                            "next": {"$ref": "#top"}
                        }
                    }
                }
            }),
        );
        assert_eq!(resource.subresources.len(), 2);
        let sub = &resource.subresources["/$defs/node"];
        assert_eq!(sub.base.as_str(), "http://example.com/node.json");
        assert_eq!(sub.anchors["top"].floc, "/$defs/node");
        assert_eq!(
            resource.subresource_of("/$defs/node/properties/next").floc,
            "/$defs/node"
        );
        assert_eq!(resource.subresource_of("/$defs").floc, "");
    }

    #[test]
    fn legacy_fragment_id_becomes_anchor() {
        let resource = resource(
            Draft::Draft7,
            json!({
                "definitions": {
                    "a": {"$id": "#foo", "type": "integer"}
                }
            }),
        );
        let root = &resource.subresources[""];
        assert_eq!(root.anchors["foo"].floc, "/definitions/a");
    }

    #[test]
    fn fragment_id_is_rejected_in_modern_drafts() {
        let error = Resource::new(
            Url::parse("http://example.com/root.json").expect("Valid URL"),
            Draft::Draft202012,
            Arc::new(json!({"$defs": {"a": {"$id": "#foo"}}})),
        )
        .expect_err("Fragment in $id");
        assert!(matches!(error, CompileError::InvalidKeywordValue { .. }));
    }

    #[test]
    fn enum_contents_are_not_schemas() {
        let resource = resource(
            Draft::Draft202012,
            json!({"enum": [{"$id": "http://example.com/not-a-schema"}]}),
        );
        assert_eq!(resource.subresources.len(), 1);
    }

    #[test]
    fn locate_tracks_base_changes() {
        let doc = json!({
            "$id": "http://example.com/root.json",
            "items": {
                "$id": "folder/",
                "items": {"type": "integer"}
            }
        });
        let url = Url::parse("http://example.com/root.json").expect("Valid URL");
        let (value, base) =
            locate(&doc, Draft::Draft202012, &url, "/items/items").expect("Valid pointer");
        assert_eq!(value, &json!({"type": "integer"}));
        assert_eq!(base.as_str(), "http://example.com/folder/");
    }

    #[test]
    fn locate_missing_target() {
        let doc = json!({"type": "object"});
        let url = Url::parse("http://example.com/root.json").expect("Valid URL");
        let error = locate(&doc, Draft::Draft202012, &url, "/definitions/a")
            .expect_err("Missing target");
        assert!(matches!(error, CompileError::UnresolvedReference { .. }));
    }
}
