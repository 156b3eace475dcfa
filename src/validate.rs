//! The validation engine: evaluates a compiled schema against an instance.
use ahash::AHashSet;
use serde_json::Value;

use crate::{
    cancel::CancelToken,
    compiler::Compiler,
    error::{ErrorKind, ValidateError, ValidationError},
    extension::ValidationContext,
    helpers,
    paths::{escape_token, InstancePath, Segment},
    schema::{DynamicRef, Items, Schema, SchemaIndex},
    types::{type_of, JsonType},
};

/// Internal error flow; `InvalidType` and `Cancelled` abort the traversal
/// instead of being collected as keyword failures.
#[derive(Debug)]
pub(crate) enum EngineError {
    Validation(ValidationError),
    InvalidType {
        instance_location: String,
        detail: String,
    },
    Cancelled(Option<Box<ValidationError>>),
}

/// The set of property names and item indices not yet evaluated within one
/// schema frame. In-place applicators merge by set intersection, which
/// keeps annotation collection order-independent.
pub(crate) struct Uneval<'v> {
    pub(crate) props: AHashSet<&'v str>,
    pub(crate) items: AHashSet<usize>,
}

impl<'v> Uneval<'v> {
    fn from(instance: &'v Value) -> Uneval<'v> {
        match instance {
            Value::Object(map) => Uneval {
                props: map.keys().map(String::as_str).collect(),
                items: AHashSet::new(),
            },
            Value::Array(items) => Uneval {
                props: AHashSet::new(),
                items: (0..items.len()).collect(),
            },
            _ => Uneval {
                props: AHashSet::new(),
                items: AHashSet::new(),
            },
        }
    }

    pub(crate) fn intersect(&mut self, other: &Uneval<'v>) {
        self.props.retain(|name| other.props.contains(name));
        self.items.retain(|idx| other.items.contains(idx));
    }
}

pub(crate) fn validate(
    compiler: &Compiler,
    schema: SchemaIndex,
    instance: &Value,
    cancel: Option<&CancelToken>,
) -> Result<(), ValidateError> {
    let mut engine = Engine {
        c: compiler,
        cancel,
        scopes: Vec::new(),
    };
    match engine.eval(schema, instance, &InstancePath::root(), "", false) {
        Ok(_) => Ok(()),
        Err(EngineError::Validation(error)) => Err(ValidateError::Validation(Box::new(error))),
        Err(EngineError::InvalidType {
            instance_location,
            detail,
        }) => Err(ValidateError::InvalidJsonType {
            instance_location,
            detail,
        }),
        Err(EngineError::Cancelled(partial)) => Err(ValidateError::Cancelled { partial }),
    }
}

fn kw_error(sch: &Schema, kloc: &str, iloc: &str, kw: &str, kind: ErrorKind) -> ValidationError {
    ValidationError::new(
        format!("{}{kw}", sch.location),
        format!("{kloc}{kw}"),
        iloc.to_string(),
        kind,
    )
}

fn group_node(sch: &Schema, kloc: &str, iloc: &str) -> ValidationError {
    ValidationError::new(
        sch.location.clone(),
        kloc.to_string(),
        iloc.to_string(),
        ErrorKind::Group,
    )
}

/// On cancellation, keep the error tree gathered so far as the partial
/// result; other errors pass through untouched.
fn attach_partial(
    error: EngineError,
    errors: &mut Vec<ValidationError>,
    sch: &Schema,
    kloc: &str,
    iloc: &str,
) -> EngineError {
    match error {
        EngineError::Cancelled(partial) => {
            let mut causes = std::mem::take(errors);
            if let Some(partial) = partial {
                causes.push(*partial);
            }
            if causes.is_empty() {
                EngineError::Cancelled(None)
            } else {
                EngineError::Cancelled(Some(Box::new(ValidationError::group(
                    group_node(sch, kloc, iloc),
                    causes,
                ))))
            }
        }
        other => other,
    }
}

/// Collect a validation failure from a sub-evaluation, aborting the frame
/// on any non-validation outcome.
macro_rules! sub {
    ($errors:ident, $sch:ident, $kloc:ident, $iloc:ident, $call:expr) => {
        match $call {
            Ok(value) => Some(value),
            Err(EngineError::Validation(error)) => {
                $errors.push(error);
                None
            }
            Err(other) => return Err(attach_partial(other, &mut $errors, $sch, $kloc, &$iloc)),
        }
    };
}

pub(crate) struct Engine<'c> {
    c: &'c Compiler,
    cancel: Option<&'c CancelToken>,
    /// Dynamic scope: every entered schema frame, outermost first.
    scopes: Vec<SchemaIndex>,
}

impl<'c> Engine<'c> {
    /// Evaluate one schema against one instance value. On success, returns
    /// the set of properties/items this frame did NOT evaluate; callers
    /// merge it per draft annotation rules.
    pub(crate) fn eval<'v>(
        &mut self,
        idx: SchemaIndex,
        v: &'v Value,
        vloc: &InstancePath<'_>,
        kloc: &str,
        track: bool,
    ) -> Result<Uneval<'v>, EngineError> {
        if let Some(cancel) = self.cancel {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled(None));
            }
        }
        let c = self.c;
        let sch = &c.schemas[idx.0];
        match sch.boolean {
            // `true` asserts nothing and evaluates nothing.
            Some(true) => return Ok(Uneval::from(v)),
            Some(false) => {
                return Err(EngineError::Validation(ValidationError::new(
                    sch.location.clone(),
                    kloc.to_string(),
                    vloc.pointer(),
                    ErrorKind::FalseSchema,
                )))
            }
            None => {}
        }
        self.scopes.push(idx);
        let result = self.eval_frame(sch, v, vloc, kloc, track);
        self.scopes.pop();
        result
    }

    fn resolve_recursive(&self, fallback: SchemaIndex) -> SchemaIndex {
        let c = self.c;
        let fallback_root = c.schemas[fallback.0].resource_root;
        if !c.schemas[fallback_root.0].recursive_anchor {
            return fallback;
        }
        for frame in &self.scopes {
            let root = c.schemas[frame.0].resource_root;
            if c.schemas[root.0].recursive_anchor {
                return root;
            }
        }
        fallback
    }

    fn resolve_dynamic(&self, dynamic: &DynamicRef) -> SchemaIndex {
        let c = self.c;
        let Some(name) = &dynamic.anchor else {
            return dynamic.fallback;
        };
        for frame in &self.scopes {
            let root = c.schemas[frame.0].resource_root;
            if let Some(&target) = c.schemas[root.0].dynamic_anchors.get(name) {
                return target;
            }
        }
        dynamic.fallback
    }

    #[allow(clippy::too_many_lines)]
    fn eval_frame<'v>(
        &mut self,
        sch: &'c Schema,
        v: &'v Value,
        vloc: &InstancePath<'_>,
        kloc: &str,
        track: bool,
    ) -> Result<Uneval<'v>, EngineError> {
        let track =
            track || sch.unevaluated_properties.is_some() || sch.unevaluated_items.is_some();
        let iloc = vloc.pointer();
        let mut errors: Vec<ValidationError> = Vec::new();
        let mut uneval = Uneval::from(v);

        // References first: in Draft 4-7 `$ref` is the only keyword on the
        // node, in 2019-09+ siblings evaluate regardless of its outcome.
        if let Some(target) = sch.ref_ {
            let child_kloc = format!("{kloc}/$ref");
            let merge = sch.draft.propagates_ref_annotations();
            if let Some(child) = sub!(
                errors,
                sch,
                kloc,
                iloc,
                self.eval(target, v, vloc, &child_kloc, track)
            ) {
                if merge {
                    uneval.intersect(&child);
                }
            }
        }
        if let Some(fallback) = sch.recursive_ref {
            let target = self.resolve_recursive(fallback);
            let child_kloc = format!("{kloc}/$recursiveRef");
            if let Some(child) = sub!(
                errors,
                sch,
                kloc,
                iloc,
                self.eval(target, v, vloc, &child_kloc, track)
            ) {
                uneval.intersect(&child);
            }
        }
        if let Some(dynamic) = &sch.dynamic_ref {
            let target = self.resolve_dynamic(dynamic);
            let child_kloc = format!("{kloc}/$dynamicRef");
            if let Some(child) = sub!(
                errors,
                sch,
                kloc,
                iloc,
                self.eval(target, v, vloc, &child_kloc, track)
            ) {
                uneval.intersect(&child);
            }
        }

        if !sch.types.is_empty() {
            let matched = match v {
                Value::Null => sch.types.contains(JsonType::Null),
                Value::Bool(_) => sch.types.contains(JsonType::Boolean),
                Value::String(_) => sch.types.contains(JsonType::String),
                Value::Array(_) => sch.types.contains(JsonType::Array),
                Value::Object(_) => sch.types.contains(JsonType::Object),
                Value::Number(number) => {
                    sch.types.contains(JsonType::Number)
                        || (sch.types.contains(JsonType::Integer)
                            && helpers::is_integer(number, sch.draft.strict_integers()))
                }
            };
            if !matched {
                errors.push(kw_error(
                    sch,
                    kloc,
                    &iloc,
                    "/type",
                    ErrorKind::Type {
                        got: type_of(v),
                        want: sch.types,
                    },
                ));
            }
        }

        if let Some(want) = &sch.const_ {
            if !helpers::equal(v, want) {
                errors.push(kw_error(
                    sch,
                    kloc,
                    &iloc,
                    "/const",
                    ErrorKind::Const { want: want.clone() },
                ));
            }
        }
        if let Some(options) = &sch.enum_ {
            if !options.iter().any(|option| helpers::equal(v, option)) {
                errors.push(kw_error(
                    sch,
                    kloc,
                    &iloc,
                    "/enum",
                    ErrorKind::Enum {
                        want: options.clone(),
                    },
                ));
            }
        }
        if let Some(format) = &sch.format {
            if format.assert && !(format.check)(v) {
                errors.push(kw_error(
                    sch,
                    kloc,
                    &iloc,
                    "/format",
                    ErrorKind::Format {
                        want: format.name.clone(),
                    },
                ));
            }
        }

        if let Value::Number(number) = v {
            let has_bounds = sch.minimum.is_some()
                || sch.maximum.is_some()
                || sch.exclusive_minimum.is_some()
                || sch.exclusive_maximum.is_some()
                || sch.multiple_of.is_some();
            if has_bounds {
                let Some(value) = helpers::to_fraction(number) else {
                    return Err(EngineError::InvalidType {
                        instance_location: iloc,
                        detail: number.to_string(),
                    });
                };
                let limit =
                    |n: &serde_json::Number| helpers::to_fraction(n).expect("Checked at compile time");
                if let Some(want) = &sch.minimum {
                    if value < limit(want) {
                        errors.push(kw_error(
                            sch,
                            kloc,
                            &iloc,
                            "/minimum",
                            ErrorKind::Minimum {
                                got: number.clone(),
                                want: want.clone(),
                            },
                        ));
                    }
                }
                if let Some(want) = &sch.maximum {
                    if value > limit(want) {
                        errors.push(kw_error(
                            sch,
                            kloc,
                            &iloc,
                            "/maximum",
                            ErrorKind::Maximum {
                                got: number.clone(),
                                want: want.clone(),
                            },
                        ));
                    }
                }
                if let Some(want) = &sch.exclusive_minimum {
                    if value <= limit(want) {
                        errors.push(kw_error(
                            sch,
                            kloc,
                            &iloc,
                            "/exclusiveMinimum",
                            ErrorKind::ExclusiveMinimum {
                                got: number.clone(),
                                want: want.clone(),
                            },
                        ));
                    }
                }
                if let Some(want) = &sch.exclusive_maximum {
                    if value >= limit(want) {
                        errors.push(kw_error(
                            sch,
                            kloc,
                            &iloc,
                            "/exclusiveMaximum",
                            ErrorKind::ExclusiveMaximum {
                                got: number.clone(),
                                want: want.clone(),
                            },
                        ));
                    }
                }
                if let Some(want) = &sch.multiple_of {
                    if !helpers::is_integral(&(value / limit(want))) {
                        errors.push(kw_error(
                            sch,
                            kloc,
                            &iloc,
                            "/multipleOf",
                            ErrorKind::MultipleOf {
                                got: number.clone(),
                                want: want.clone(),
                            },
                        ));
                    }
                }
            }
        }

        if let Value::String(text) = v {
            if sch.min_length.is_some() || sch.max_length.is_some() {
                let count = text.chars().count();
                if let Some(want) = sch.min_length {
                    if (count as u64) < want {
                        errors.push(kw_error(
                            sch,
                            kloc,
                            &iloc,
                            "/minLength",
                            ErrorKind::MinLength { got: count, want },
                        ));
                    }
                }
                if let Some(want) = sch.max_length {
                    if count as u64 > want {
                        errors.push(kw_error(
                            sch,
                            kloc,
                            &iloc,
                            "/maxLength",
                            ErrorKind::MaxLength { got: count, want },
                        ));
                    }
                }
            }
            if let Some(pattern) = &sch.pattern {
                if !pattern.is_match(text).unwrap_or(false) {
                    errors.push(kw_error(
                        sch,
                        kloc,
                        &iloc,
                        "/pattern",
                        ErrorKind::Pattern {
                            got: text.clone(),
                            want: pattern.as_str().to_string(),
                        },
                    ));
                }
            }
            if sch.assert_content {
                self.check_content(sch, text, vloc, kloc, &iloc, &mut errors)?;
            }
        }

        if let Value::Array(items) = v {
            if let Some(want) = sch.min_items {
                if (items.len() as u64) < want {
                    errors.push(kw_error(
                        sch,
                        kloc,
                        &iloc,
                        "/minItems",
                        ErrorKind::MinItems {
                            got: items.len(),
                            want,
                        },
                    ));
                }
            }
            if let Some(want) = sch.max_items {
                if items.len() as u64 > want {
                    errors.push(kw_error(
                        sch,
                        kloc,
                        &iloc,
                        "/maxItems",
                        ErrorKind::MaxItems {
                            got: items.len(),
                            want,
                        },
                    ));
                }
            }
            if sch.unique_items {
                'outer: for i in 0..items.len() {
                    for j in i + 1..items.len() {
                        if helpers::equal(&items[i], &items[j]) {
                            errors.push(kw_error(
                                sch,
                                kloc,
                                &iloc,
                                "/uniqueItems",
                                ErrorKind::UniqueItems {
                                    first: i,
                                    second: j,
                                },
                            ));
                            break 'outer;
                        }
                    }
                }
            }

            let prefix_len = sch.prefix_items.len().min(items.len());
            for i in 0..prefix_len {
                uneval.items.remove(&i);
                let child_vloc = vloc.push(Segment::Index(i));
                let child_kloc = format!("{kloc}/prefixItems/{i}");
                sub!(
                    errors,
                    sch,
                    kloc,
                    iloc,
                    self.eval(sch.prefix_items[i], &items[i], &child_vloc, &child_kloc, false)
                );
            }

            match &sch.items {
                None => {}
                Some(Items::Schema(sub)) => {
                    for (i, item) in items.iter().enumerate().skip(sch.prefix_items.len()) {
                        uneval.items.remove(&i);
                        let child_vloc = vloc.push(Segment::Index(i));
                        let child_kloc = format!("{kloc}/items");
                        sub!(
                            errors,
                            sch,
                            kloc,
                            iloc,
                            self.eval(*sub, item, &child_vloc, &child_kloc, false)
                        );
                    }
                }
                Some(Items::Array(subs)) => {
                    for (i, sub) in subs.iter().enumerate().take(items.len()) {
                        uneval.items.remove(&i);
                        let child_vloc = vloc.push(Segment::Index(i));
                        let child_kloc = format!("{kloc}/items/{i}");
                        sub!(
                            errors,
                            sch,
                            kloc,
                            iloc,
                            self.eval(*sub, &items[i], &child_vloc, &child_kloc, false)
                        );
                    }
                    if items.len() > subs.len() {
                        if let Some(extra) = sch.additional_items {
                            if self.c.schemas[extra.0].boolean == Some(false) {
                                errors.push(kw_error(
                                    sch,
                                    kloc,
                                    &iloc,
                                    "/additionalItems",
                                    ErrorKind::AdditionalItems { limit: subs.len() },
                                ));
                            } else {
                                for (i, item) in items.iter().enumerate().skip(subs.len()) {
                                    uneval.items.remove(&i);
                                    let child_vloc = vloc.push(Segment::Index(i));
                                    let child_kloc = format!("{kloc}/additionalItems");
                                    sub!(
                                        errors,
                                        sch,
                                        kloc,
                                        iloc,
                                        self.eval(extra, item, &child_vloc, &child_kloc, false)
                                    );
                                }
                            }
                        }
                    }
                }
            }

            if let Some(contains) = sch.contains {
                let mut matched = Vec::new();
                let mut failures = Vec::new();
                for (i, item) in items.iter().enumerate() {
                    let child_vloc = vloc.push(Segment::Index(i));
                    let child_kloc = format!("{kloc}/contains");
                    match self.eval(contains, item, &child_vloc, &child_kloc, false) {
                        Ok(_) => {
                            matched.push(i);
                            uneval.items.remove(&i);
                        }
                        Err(EngineError::Validation(error)) => failures.push(error),
                        Err(other) => {
                            return Err(attach_partial(other, &mut errors, sch, kloc, &iloc))
                        }
                    }
                }
                let min = sch.min_contains.unwrap_or(1);
                if (matched.len() as u64) < min {
                    if matched.is_empty() && min == 1 {
                        let mut error =
                            kw_error(sch, kloc, &iloc, "/contains", ErrorKind::Contains);
                        error.causes = failures;
                        errors.push(error);
                    } else {
                        errors.push(kw_error(
                            sch,
                            kloc,
                            &iloc,
                            "/minContains",
                            ErrorKind::MinContains {
                                got: matched.len(),
                                want: min,
                            },
                        ));
                    }
                }
                if let Some(max) = sch.max_contains {
                    if matched.len() as u64 > max {
                        errors.push(kw_error(
                            sch,
                            kloc,
                            &iloc,
                            "/maxContains",
                            ErrorKind::MaxContains {
                                got: matched.len(),
                                want: max,
                            },
                        ));
                    }
                }
            }
        }

        if let Value::Object(map) = v {
            if let Some(want) = sch.min_properties {
                if (map.len() as u64) < want {
                    errors.push(kw_error(
                        sch,
                        kloc,
                        &iloc,
                        "/minProperties",
                        ErrorKind::MinProperties {
                            got: map.len(),
                            want,
                        },
                    ));
                }
            }
            if let Some(want) = sch.max_properties {
                if map.len() as u64 > want {
                    errors.push(kw_error(
                        sch,
                        kloc,
                        &iloc,
                        "/maxProperties",
                        ErrorKind::MaxProperties {
                            got: map.len(),
                            want,
                        },
                    ));
                }
            }
            if !sch.required.is_empty() {
                let missing: Vec<String> = sch
                    .required
                    .iter()
                    .filter(|name| !map.contains_key(*name))
                    .cloned()
                    .collect();
                if !missing.is_empty() {
                    errors.push(kw_error(
                        sch,
                        kloc,
                        &iloc,
                        "/required",
                        ErrorKind::Required { missing },
                    ));
                }
            }
            let dependency_kw = if sch.draft.honors_ref_siblings() {
                "dependentRequired"
            } else {
                "dependencies"
            };
            for (property, needs) in &sch.dependent_required {
                if map.contains_key(property) {
                    let missing: Vec<String> = needs
                        .iter()
                        .filter(|name| !map.contains_key(*name))
                        .cloned()
                        .collect();
                    if !missing.is_empty() {
                        errors.push(kw_error(
                            sch,
                            kloc,
                            &iloc,
                            &format!("/{dependency_kw}/{}", escape_token(property)),
                            ErrorKind::DependentRequired {
                                property: property.clone(),
                                missing,
                            },
                        ));
                    }
                }
            }

            for (name, sub) in &sch.properties {
                if let Some(value) = map.get(name) {
                    uneval.props.remove(name.as_str());
                    let child_vloc = vloc.push(Segment::Property(name));
                    let child_kloc = format!("{kloc}/properties/{}", escape_token(name));
                    sub!(
                        errors,
                        sch,
                        kloc,
                        iloc,
                        self.eval(*sub, value, &child_vloc, &child_kloc, false)
                    );
                }
            }
            for (regex, sub) in &sch.pattern_properties {
                for (name, value) in map {
                    if regex.is_match(name).unwrap_or(false) {
                        uneval.props.remove(name.as_str());
                        let child_vloc = vloc.push(Segment::Property(name));
                        let child_kloc =
                            format!("{kloc}/patternProperties/{}", escape_token(regex.as_str()));
                        sub!(
                            errors,
                            sch,
                            kloc,
                            iloc,
                            self.eval(*sub, value, &child_vloc, &child_kloc, false)
                        );
                    }
                }
            }
            if let Some(extra) = sch.additional_properties {
                let additional: Vec<&String> = map
                    .keys()
                    .filter(|name| {
                        !sch.properties.contains_key(*name)
                            && !sch
                                .pattern_properties
                                .iter()
                                .any(|(regex, _)| regex.is_match(name).unwrap_or(false))
                    })
                    .collect();
                if self.c.schemas[extra.0].boolean == Some(false) {
                    if !additional.is_empty() {
                        let unexpected: Vec<String> =
                            additional.iter().map(|name| (*name).clone()).collect();
                        errors.push(kw_error(
                            sch,
                            kloc,
                            &iloc,
                            "/additionalProperties",
                            ErrorKind::AdditionalProperties { unexpected },
                        ));
                    }
                } else {
                    for name in additional {
                        uneval.props.remove(name.as_str());
                        let value = &map[name];
                        let child_vloc = vloc.push(Segment::Property(name));
                        let child_kloc = format!("{kloc}/additionalProperties");
                        sub!(
                            errors,
                            sch,
                            kloc,
                            iloc,
                            self.eval(extra, value, &child_vloc, &child_kloc, false)
                        );
                    }
                }
            }
            if let Some(names) = sch.property_names {
                for name in map.keys() {
                    uneval.props.remove(name.as_str());
                    let as_value = Value::String(name.clone());
                    let child_vloc = vloc.push(Segment::Property(name));
                    let child_kloc = format!("{kloc}/propertyNames");
                    sub!(
                        errors,
                        sch,
                        kloc,
                        iloc,
                        self.eval(names, &as_value, &child_vloc, &child_kloc, false)
                    );
                }
            }
            let dependency_kw = if sch.draft.honors_ref_siblings() {
                "dependentSchemas"
            } else {
                "dependencies"
            };
            for (property, sub) in &sch.dependent_schemas {
                if map.contains_key(property) {
                    let child_kloc =
                        format!("{kloc}/{dependency_kw}/{}", escape_token(property));
                    if let Some(child) = sub!(
                        errors,
                        sch,
                        kloc,
                        iloc,
                        self.eval(*sub, v, vloc, &child_kloc, track)
                    ) {
                        uneval.intersect(&child);
                    }
                }
            }
        }

        for (i, sub) in sch.all_of.iter().enumerate() {
            let child_kloc = format!("{kloc}/allOf/{i}");
            if let Some(child) = sub!(
                errors,
                sch,
                kloc,
                iloc,
                self.eval(*sub, v, vloc, &child_kloc, track)
            ) {
                uneval.intersect(&child);
            }
        }

        if !sch.any_of.is_empty() {
            let mut any_matched = false;
            let mut failures = Vec::new();
            for (i, sub) in sch.any_of.iter().enumerate() {
                let child_kloc = format!("{kloc}/anyOf/{i}");
                match self.eval(*sub, v, vloc, &child_kloc, track) {
                    Ok(child) => {
                        any_matched = true;
                        uneval.intersect(&child);
                        // Without unevaluated tracking in scope the first
                        // match suffices.
                        if !track {
                            break;
                        }
                    }
                    Err(EngineError::Validation(error)) => failures.push(error),
                    Err(other) => {
                        return Err(attach_partial(other, &mut errors, sch, kloc, &iloc))
                    }
                }
            }
            if !any_matched {
                let mut error = kw_error(sch, kloc, &iloc, "/anyOf", ErrorKind::AnyOf);
                error.causes = failures;
                errors.push(error);
            }
        }

        if !sch.one_of.is_empty() {
            let mut matched = Vec::new();
            let mut winner: Option<Uneval<'v>> = None;
            let mut failures = Vec::new();
            for (i, sub) in sch.one_of.iter().enumerate() {
                let child_kloc = format!("{kloc}/oneOf/{i}");
                match self.eval(*sub, v, vloc, &child_kloc, track) {
                    Ok(child) => {
                        if matched.is_empty() {
                            winner = Some(child);
                        }
                        matched.push(i);
                    }
                    Err(EngineError::Validation(error)) => failures.push(error),
                    Err(other) => {
                        return Err(attach_partial(other, &mut errors, sch, kloc, &iloc))
                    }
                }
            }
            match matched.len() {
                0 => {
                    let mut error = kw_error(sch, kloc, &iloc, "/oneOf", ErrorKind::OneOfNone);
                    error.causes = failures;
                    errors.push(error);
                }
                1 => {
                    if let Some(child) = winner {
                        uneval.intersect(&child);
                    }
                }
                _ => {
                    errors.push(kw_error(
                        sch,
                        kloc,
                        &iloc,
                        "/oneOf",
                        ErrorKind::OneOfMany { matched },
                    ));
                }
            }
        }

        if let Some(not) = sch.not {
            let child_kloc = format!("{kloc}/not");
            match self.eval(not, v, vloc, &child_kloc, false) {
                Ok(_) => errors.push(kw_error(sch, kloc, &iloc, "/not", ErrorKind::Not)),
                Err(EngineError::Validation(_)) => {}
                Err(other) => return Err(attach_partial(other, &mut errors, sch, kloc, &iloc)),
            }
        }

        if let Some(if_) = sch.if_ {
            let child_kloc = format!("{kloc}/if");
            match self.eval(if_, v, vloc, &child_kloc, track) {
                Ok(child) => {
                    uneval.intersect(&child);
                    if let Some(then) = sch.then {
                        let child_kloc = format!("{kloc}/then");
                        if let Some(child) = sub!(
                            errors,
                            sch,
                            kloc,
                            iloc,
                            self.eval(then, v, vloc, &child_kloc, track)
                        ) {
                            uneval.intersect(&child);
                        }
                    }
                }
                Err(EngineError::Validation(_)) => {
                    if let Some(else_) = sch.else_ {
                        let child_kloc = format!("{kloc}/else");
                        if let Some(child) = sub!(
                            errors,
                            sch,
                            kloc,
                            iloc,
                            self.eval(else_, v, vloc, &child_kloc, track)
                        ) {
                            uneval.intersect(&child);
                        }
                    }
                }
                Err(other) => return Err(attach_partial(other, &mut errors, sch, kloc, &iloc)),
            }
        }

        if !sch.extensions.is_empty() {
            for extension in &sch.extensions {
                let mut ctx = ValidationContext {
                    engine: self,
                    uneval: &mut uneval,
                    v,
                    vloc,
                    kloc,
                    iloc: &iloc,
                    sch,
                    track,
                    fatal: None,
                };
                let outcome = extension.validate(&mut ctx, v);
                let fatal = ctx.fatal.take();
                if let Some(fatal) = fatal {
                    return Err(attach_partial(fatal, &mut errors, sch, kloc, &iloc));
                }
                if let Err(error) = outcome {
                    errors.push(error);
                }
            }
        }

        if let Some(extra) = sch.unevaluated_properties {
            if let Value::Object(map) = v {
                let mut remaining: Vec<&str> = uneval.props.iter().copied().collect();
                remaining.sort_unstable();
                if self.c.schemas[extra.0].boolean == Some(false) {
                    if !remaining.is_empty() {
                        let unexpected: Vec<String> =
                            remaining.iter().map(|name| (*name).to_string()).collect();
                        errors.push(kw_error(
                            sch,
                            kloc,
                            &iloc,
                            "/unevaluatedProperties",
                            ErrorKind::UnevaluatedProperties { unexpected },
                        ));
                    }
                } else {
                    for name in remaining {
                        let value = &map[name];
                        let child_vloc = vloc.push(Segment::Property(name));
                        let child_kloc = format!("{kloc}/unevaluatedProperties");
                        if sub!(
                            errors,
                            sch,
                            kloc,
                            iloc,
                            self.eval(extra, value, &child_vloc, &child_kloc, false)
                        )
                        .is_some()
                        {
                            uneval.props.remove(name);
                        }
                    }
                }
            }
        }
        if let Some(extra) = sch.unevaluated_items {
            if let Value::Array(items) = v {
                let mut remaining: Vec<usize> = uneval.items.iter().copied().collect();
                remaining.sort_unstable();
                if self.c.schemas[extra.0].boolean == Some(false) {
                    if !remaining.is_empty() {
                        errors.push(kw_error(
                            sch,
                            kloc,
                            &iloc,
                            "/unevaluatedItems",
                            ErrorKind::UnevaluatedItems {
                                unexpected: remaining,
                            },
                        ));
                    }
                } else {
                    for i in remaining {
                        let child_vloc = vloc.push(Segment::Index(i));
                        let child_kloc = format!("{kloc}/unevaluatedItems");
                        if sub!(
                            errors,
                            sch,
                            kloc,
                            iloc,
                            self.eval(extra, &items[i], &child_vloc, &child_kloc, false)
                        )
                        .is_some()
                        {
                            uneval.items.remove(&i);
                        }
                    }
                }
            }
        }

        match errors.len() {
            0 => Ok(uneval),
            1 => Err(EngineError::Validation(
                errors.pop().expect("Checked above"),
            )),
            _ => Err(EngineError::Validation(ValidationError::group(
                group_node(sch, kloc, &iloc),
                errors,
            ))),
        }
    }

    /// `contentEncoding`/`contentMediaType`/`contentSchema`, asserted only
    /// when the compiler was configured to do so.
    fn check_content(
        &mut self,
        sch: &'c Schema,
        text: &str,
        _vloc: &InstancePath<'_>,
        kloc: &str,
        iloc: &str,
        errors: &mut Vec<ValidationError>,
    ) -> Result<(), EngineError> {
        let mut decoded: Option<Vec<u8>> = None;
        let mut decode_failed = false;
        if let Some(encoding) = &sch.content_encoding {
            match (encoding.decode)(text) {
                Ok(bytes) => decoded = Some(bytes),
                Err(error) => {
                    decode_failed = true;
                    errors.push(kw_error(
                        sch,
                        kloc,
                        iloc,
                        "/contentEncoding",
                        ErrorKind::ContentEncoding {
                            want: encoding.name.clone(),
                            detail: error.to_string(),
                        },
                    ));
                }
            }
        }
        if decode_failed {
            return Ok(());
        }
        let Some(media_type) = &sch.content_media_type else {
            return Ok(());
        };
        let bytes = decoded.as_deref().unwrap_or_else(|| text.as_bytes());
        if let Err(error) = (media_type.parse)(bytes) {
            errors.push(kw_error(
                sch,
                kloc,
                iloc,
                "/contentMediaType",
                ErrorKind::ContentMediaType {
                    want: media_type.name.clone(),
                    detail: error.to_string(),
                },
            ));
            return Ok(());
        }
        if let Some(content_schema) = sch.content_schema {
            if media_type.name == "application/json" {
                if let Ok(document) = serde_json::from_slice::<Value>(bytes) {
                    let child_kloc = format!("{kloc}/contentSchema");
                    match self.eval(content_schema, &document, &InstancePath::root(), &child_kloc, false)
                    {
                        Ok(_) => {}
                        Err(EngineError::Validation(cause)) => {
                            let mut error =
                                kw_error(sch, kloc, iloc, "/contentSchema", ErrorKind::ContentSchema);
                            error.causes.push(cause);
                            errors.push(error);
                        }
                        Err(other) => return Err(other),
                    }
                }
            }
        }
        Ok(())
    }
}
