//! Binding tables: per-type lists of field bindings.
//!
//! A table is plain data built once per target type by
//! [`Bindable::bindings`](super::Bindable::bindings). Each entry names a
//! field, where its raw string lives relative to the bound node, whether it
//! must be present, and an optional transformer to run before parsing.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use cs_common::Result;
use cs_tree::NodeRef;
use dashmap::DashMap;
use serde::Serialize;

use super::processor::{apply_table, BindContext};
use super::Bindable;

/// Where a field reads its raw value from, relative to the bound node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A `Value` child.
    Value,
    /// An entry of the node's attribute section.
    Attribute,
    /// An entry of the parameters section.
    Parameter,
    /// An entry of the properties section.
    Property,
    /// The items of a `ListValue` child.
    List,
    /// A child container bound into a nested [`Bindable`].
    Nested,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::Value => "value",
            SourceKind::Attribute => "attribute",
            SourceKind::Parameter => "parameter",
            SourceKind::Property => "property",
            SourceKind::List => "list",
            SourceKind::Nested => "nested",
        };
        write!(f, "{}", s)
    }
}

type ScalarSetter<T> = Box<dyn Fn(&mut T, &str) -> std::result::Result<(), String> + Send + Sync>;
type ListSetter<T> = Box<dyn Fn(&mut T, &[String]) -> std::result::Result<(), String> + Send + Sync>;

pub(crate) trait NestedBinder<T>: Send + Sync {
    fn bind(&self, target: &mut T, node: NodeRef<'_>, ctx: &BindContext<'_>) -> Result<()>;
}

struct Nested<U, F> {
    set: F,
    _target: PhantomData<fn() -> U>,
}

impl<T, U, F> NestedBinder<T> for Nested<U, F>
where
    U: Bindable,
    F: Fn(&mut T, U) + Send + Sync,
{
    fn bind(&self, target: &mut T, node: NodeRef<'_>, ctx: &BindContext<'_>) -> Result<()> {
        let table = ctx.tables.get::<U>();
        let mut value = U::default();
        apply_table(&*table, &mut value, node, ctx)?;
        (self.set)(target, value);
        Ok(())
    }
}

pub(crate) enum Apply<T> {
    Scalar(ScalarSetter<T>),
    List(ListSetter<T>),
    Nested(Box<dyn NestedBinder<T>>),
}

/// One entry of a [`BindingTable`].
pub struct FieldBinding<T> {
    pub(crate) field: &'static str,
    pub(crate) kind: SourceKind,
    pub(crate) source_name: String,
    pub(crate) required: bool,
    pub(crate) transformer: Option<String>,
    pub(crate) apply: Apply<T>,
}

impl<T: 'static> FieldBinding<T> {
    fn scalar<V, F>(field: &'static str, kind: SourceKind, set: F) -> Self
    where
        V: FromStr,
        V::Err: fmt::Display,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let apply = Apply::Scalar(Box::new(move |target: &mut T, raw: &str| {
            let parsed = raw.parse::<V>().map_err(|e| e.to_string())?;
            set(target, parsed);
            Ok(())
        }));
        FieldBinding {
            field,
            kind,
            source_name: field.to_string(),
            required: false,
            transformer: None,
            apply,
        }
    }

    /// Read a `Value` child named like the field.
    pub fn value<V, F>(field: &'static str, set: F) -> Self
    where
        V: FromStr,
        V::Err: fmt::Display,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        Self::scalar(field, SourceKind::Value, set)
    }

    pub fn attribute<V, F>(field: &'static str, set: F) -> Self
    where
        V: FromStr,
        V::Err: fmt::Display,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        Self::scalar(field, SourceKind::Attribute, set)
    }

    pub fn parameter<V, F>(field: &'static str, set: F) -> Self
    where
        V: FromStr,
        V::Err: fmt::Display,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        Self::scalar(field, SourceKind::Parameter, set)
    }

    pub fn property<V, F>(field: &'static str, set: F) -> Self
    where
        V: FromStr,
        V::Err: fmt::Display,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        Self::scalar(field, SourceKind::Property, set)
    }

    /// Read every item of a `ListValue` child. A transformer runs per item.
    pub fn list<V, F>(field: &'static str, set: F) -> Self
    where
        V: FromStr,
        V::Err: fmt::Display,
        F: Fn(&mut T, Vec<V>) + Send + Sync + 'static,
    {
        let apply = Apply::List(Box::new(move |target: &mut T, raw: &[String]| {
            let parsed = raw
                .iter()
                .map(|item| item.parse::<V>().map_err(|e| format!("item `{}`: {}", item, e)))
                .collect::<std::result::Result<Vec<V>, String>>()?;
            set(target, parsed);
            Ok(())
        }));
        FieldBinding {
            field,
            kind: SourceKind::List,
            source_name: field.to_string(),
            required: false,
            transformer: None,
            apply,
        }
    }

    /// Bind a child container into a nested type. Nested values are built
    /// fresh on every bind and never cached on their own.
    pub fn nested<U, F>(field: &'static str, set: F) -> Self
    where
        U: Bindable,
        F: Fn(&mut T, U) + Send + Sync + 'static,
    {
        FieldBinding {
            field,
            kind: SourceKind::Nested,
            source_name: field.to_string(),
            required: false,
            transformer: None,
            apply: Apply::Nested(Box::new(Nested {
                set,
                _target: PhantomData,
            })),
        }
    }
}

impl<T> FieldBinding<T> {
    /// Read from a source named differently from the field.
    pub fn from(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = source_name.into();
        self
    }

    /// Fail the bind when the source is absent.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Run the raw string through a registered transformer first.
    /// Ignored for nested fields.
    pub fn transform(mut self, transformer_id: impl Into<String>) -> Self {
        self.transformer = Some(transformer_id.into());
        self
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn transformer(&self) -> Option<&str> {
        self.transformer.as_deref()
    }
}

impl<T> fmt::Debug for FieldBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding")
            .field("field", &self.field)
            .field("kind", &self.kind)
            .field("source_name", &self.source_name)
            .field("required", &self.required)
            .field("transformer", &self.transformer)
            .finish()
    }
}

/// The ordered field bindings of one target type.
pub struct BindingTable<T> {
    fields: Vec<FieldBinding<T>>,
}

impl<T> BindingTable<T> {
    pub fn new() -> Self {
        BindingTable { fields: Vec::new() }
    }

    pub fn field(mut self, binding: FieldBinding<T>) -> Self {
        self.fields.push(binding);
        self
    }

    pub fn fields(&self) -> &[FieldBinding<T>] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<T> Default for BindingTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BindingTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.fields).finish()
    }
}

/// Binding tables built so far, one per target type.
#[derive(Default)]
pub(crate) struct TableCache {
    tables: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl TableCache {
    pub(crate) fn get<T: Bindable>(&self) -> Arc<BindingTable<T>> {
        let erased = self
            .tables
            .entry(TypeId::of::<T>())
            .or_insert_with(|| -> Arc<dyn Any + Send + Sync> { Arc::new(T::bindings()) })
            .value()
            .clone();
        erased
            .downcast::<BindingTable<T>>()
            .unwrap_or_else(|_| Arc::new(T::bindings()))
    }

    pub(crate) fn len(&self) -> usize {
        self.tables.len()
    }
}
