//! Applies a binding table to one node.

use cs_common::{Error, Result};
use cs_tree::{Document, NodeKind, NodeRef};

use super::table::{Apply, BindingTable, FieldBinding, SourceKind, TableCache};
use super::transform::TransformerRegistry;

/// What the processor needs besides the node and the target.
pub(crate) struct BindContext<'a> {
    pub document: &'a Document,
    pub transformers: &'a TransformerRegistry,
    pub tables: &'a TableCache,
}

/// Populate `target` from `node`, field by field in table order.
///
/// Absent optional sources leave the field as it was, so an update bind
/// keeps values whose source disappeared.
pub(crate) fn apply_table<T>(
    table: &BindingTable<T>,
    target: &mut T,
    node: NodeRef<'_>,
    ctx: &BindContext<'_>,
) -> Result<()> {
    for binding in table.fields() {
        apply_field(binding, target, node, ctx)?;
    }
    Ok(())
}

fn apply_field<T>(
    binding: &FieldBinding<T>,
    target: &mut T,
    node: NodeRef<'_>,
    ctx: &BindContext<'_>,
) -> Result<()> {
    match &binding.apply {
        Apply::Scalar(set) => {
            let Some(raw) = scalar_source(binding, node, ctx)? else {
                return missing(binding, node);
            };
            let raw = transformed(binding, raw, ctx)?;
            set(target, &raw).map_err(|message| invalid(binding, message))
        }
        Apply::List(set) => {
            let Some(child) = node.child(&binding.source_name) else {
                return missing(binding, node);
            };
            let items = match child.kind() {
                NodeKind::ListValue { .. } => child.values(),
                NodeKind::Value { value } => vec![value.as_str()],
                other => {
                    return Err(invalid(
                        binding,
                        format!("expected a list at {}, found {}", child.path(), other.label()),
                    ))
                }
            };
            let items = items
                .into_iter()
                .map(|item| transformed(binding, item, ctx))
                .collect::<Result<Vec<String>>>()?;
            set(target, &items).map_err(|message| invalid(binding, message))
        }
        Apply::Nested(binder) => {
            let Some(child) = node.child(&binding.source_name) else {
                return missing(binding, node);
            };
            binder.bind(target, child, ctx)
        }
    }
}

fn scalar_source<'a, T>(
    binding: &FieldBinding<T>,
    node: NodeRef<'a>,
    ctx: &BindContext<'_>,
) -> Result<Option<&'a str>> {
    let name = binding.source_name.as_str();
    let settings = ctx.document.settings();
    let raw = match binding.kind {
        SourceKind::Value => match node.child(name) {
            None => None,
            Some(child) => match child.kind() {
                NodeKind::Value { value } => Some(value.as_str()),
                other => {
                    return Err(invalid(
                        binding,
                        format!("expected a value at {}, found {}", child.path(), other.label()),
                    ))
                }
            },
        },
        SourceKind::Attribute => node.attribute(name),
        SourceKind::Parameter => node.entry(&settings.parameters, name),
        SourceKind::Property => node.entry(&settings.properties, name),
        SourceKind::List | SourceKind::Nested => None,
    };
    Ok(raw)
}

fn transformed<T>(binding: &FieldBinding<T>, raw: &str, ctx: &BindContext<'_>) -> Result<String> {
    match &binding.transformer {
        Some(id) => ctx.transformers.forward(id, raw),
        None => Ok(raw.to_string()),
    }
}

fn missing<T>(binding: &FieldBinding<T>, node: NodeRef<'_>) -> Result<()> {
    if !binding.required {
        return Ok(());
    }
    Err(Error::MissingField {
        field: binding.field.to_string(),
        source_name: binding.source_name.clone(),
        path: node.path(),
    })
}

fn invalid<T>(binding: &FieldBinding<T>, message: String) -> Error {
    Error::InvalidValue {
        field: binding.field.to_string(),
        message,
    }
}
