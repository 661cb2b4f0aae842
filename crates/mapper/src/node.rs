//! # Nodes
//!
//! The mapping tree is an arena of nodes. A complex node creates an instance and populates it
//! from its children; a leaf node copies one column into a member. The same nodes serve every
//! row of the shape they were built for.

use std::any::Any;
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::{Map, Value as Json};

use crate::collection::CollectionNode;
use crate::context::MappingContext;
use crate::convert::Conversion;
use crate::error::{Error, Result};
use crate::metadata::{Arg, ComplexMember, Constructor, Instance, ScalarMember};
use crate::row::RowSource;
use crate::tree::Tree;
use crate::value::{Kind, Value};

/// Index of a node in its tree.
pub(crate) type NodeId = usize;

/// Object produced by schema-less mapping.
pub(crate) type Object = Map<String, Json>;

pub(crate) struct Node {
    /// Member, parameter or entry name; `None` for the root.
    pub(crate) property: Option<String>,
    pub(crate) container: Option<NodeId>,
    pub(crate) body: Body,
}

pub(crate) enum Body {
    Leaf(Leaf),
    Complex(Complex),
}

pub(crate) struct Leaf {
    pub(crate) ordinal: usize,
    pub(crate) binding: LeafBinding,
}

pub(crate) enum LeafBinding {
    /// Typed member; the conversion is chosen on the first mismatch and kept.
    Member { member: Rc<ScalarMember>, conversion: OnceCell<Conversion> },
    /// Schema-less object entry.
    Entry,
}

pub(crate) struct Complex {
    pub(crate) properties: Vec<NodeId>,
    pub(crate) shape: Shape,
}

pub(crate) enum Shape {
    Typed(Box<Typed>),
    Dynamic,
}

pub(crate) struct Typed {
    pub(crate) type_name: String,
    /// `None` for the root and for constructor arguments.
    pub(crate) member: Option<Rc<ComplexMember>>,
    pub(crate) constructor: Rc<Constructor>,
    pub(crate) parameters: BTreeMap<usize, Argument>,
    pub(crate) collections: Vec<CollectionNode>,
    pub(crate) discriminator: Option<Discriminator>,
}

pub(crate) enum Argument {
    Column { ordinal: usize, kind: Kind, conversion: OnceCell<Conversion> },
    Object(NodeId),
}

/// Selects a derived constructor from a column value.
pub(crate) struct Discriminator {
    pub(crate) ordinal: usize,
    pub(crate) derived: Vec<(String, Rc<Constructor>)>,
}

impl Discriminator {
    fn select(&self, row: &dyn RowSource) -> Option<&Rc<Constructor>> {
        if row.is_null(self.ordinal) {
            return None;
        }
        let value = row.value(self.ordinal).to_string();
        self.derived.iter().find(|(key, _)| *key == value).map(|(_, constructor)| constructor)
    }
}

impl Complex {
    /// Constructor-bound objects are replaced on load rather than merged into.
    fn is_constructor_bound(&self) -> bool {
        matches!(&self.shape, Shape::Typed(typed) if !typed.parameters.is_empty())
    }
}

impl Node {
    fn name(&self) -> &str {
        self.property.as_deref().unwrap_or("<root>")
    }
}

impl Tree {
    /// Instantiate the object at `id`, or `None` when it is not the root and every column
    /// beneath it is null.
    pub(crate) fn create(
        &self, id: NodeId, row: &mut dyn RowSource, context: &MappingContext<'_>,
    ) -> Result<Option<Instance>> {
        let node = &self.nodes[id];
        let Body::Complex(complex) = &node.body else {
            return Err(Error::Unbound(node.name().to_string()));
        };
        if node.container.is_some() && self.is_null(id, &*row) {
            return Ok(None);
        }

        let typed = match &complex.shape {
            Shape::Dynamic => return Ok(Some(Box::new(Object::new()))),
            Shape::Typed(typed) => typed,
        };

        let mut args = Vec::with_capacity(typed.parameters.len());
        for argument in typed.parameters.values() {
            match argument {
                Argument::Column { ordinal, kind, conversion } => {
                    let value = argument_value(row.value(*ordinal), *kind, conversion)
                        .map_err(|source| Error::Construct {
                            type_name: typed.type_name.clone(),
                            source: Box::new(source),
                        })?;
                    args.push(Arg::Value(value));
                }
                Argument::Object(child) => {
                    args.push(Arg::Object(self.materialize(*child, row, context)?));
                }
            }
        }

        let constructor = typed
            .discriminator
            .as_ref()
            .filter(|_| args.is_empty())
            .and_then(|d| d.select(&*row))
            .unwrap_or(&typed.constructor);

        constructor.construct(&typed.type_name, args).map(Some).map_err(|source| Error::Construct {
            type_name: typed.type_name.clone(),
            source: Box::new(source),
        })
    }

    /// Populate `instance` from the row, then load any deferred collections it owns.
    pub(crate) fn load(
        &self, id: NodeId, instance: &mut dyn Any, row: &mut dyn RowSource,
        context: &MappingContext<'_>,
    ) -> Result<()> {
        let node = &self.nodes[id];
        let Body::Complex(complex) = &node.body else {
            return Err(Error::Unbound(node.name().to_string()));
        };

        for &child in &complex.properties {
            match &self.nodes[child].body {
                Body::Leaf(leaf) => self.assign(child, leaf, instance, &*row)?,
                Body::Complex(nested) if nested.is_constructor_bound() => {
                    let value = self.materialize(child, row, context)?;
                    self.set(child, instance, value)?;
                }
                Body::Complex(_) => {
                    if let Some(existing) = self.get(child, instance)? {
                        self.load(child, existing, row, context)?;
                    } else {
                        let value = self.materialize(child, row, context)?;
                        self.set(child, instance, value)?;
                    }
                }
            }
        }

        if let Shape::Typed(typed) = &complex.shape
            && !typed.collections.is_empty()
        {
            // the deferred query may need the connection this cursor holds
            if context.single_result {
                row.close();
            }
            for collection in &typed.collections {
                collection.load(instance, context)?;
            }
        }
        Ok(())
    }

    /// The current value of the object-valued child `id` within `parent`.
    pub(crate) fn get<'a>(
        &self, id: NodeId, parent: &'a mut dyn Any,
    ) -> Result<Option<&'a mut dyn Any>> {
        let node = &self.nodes[id];
        match &node.body {
            Body::Complex(Complex { shape: Shape::Typed(typed), .. }) => match &typed.member {
                Some(member) => member.get(parent),
                None => Err(Error::Unbound(node.name().to_string())),
            },
            Body::Complex(Complex { shape: Shape::Dynamic, .. }) => {
                let object = as_object(parent)?;
                Ok(object
                    .get_mut(node.name())
                    .and_then(Json::as_object_mut)
                    .map(|nested| nested as &mut dyn Any))
            }
            Body::Leaf(_) => Err(Error::Unbound(node.name().to_string())),
        }
    }

    /// Replace the object-valued child `id` within `parent`.
    pub(crate) fn set(
        &self, id: NodeId, parent: &mut dyn Any, value: Option<Instance>,
    ) -> Result<()> {
        let node = &self.nodes[id];
        match &node.body {
            Body::Complex(Complex { shape: Shape::Typed(typed), .. }) => match &typed.member {
                Some(member) => member.set(parent, value),
                None => Err(Error::Unbound(node.name().to_string())),
            },
            Body::Complex(Complex { shape: Shape::Dynamic, .. }) => {
                let entry = match value {
                    Some(boxed) => Json::Object(*boxed.downcast::<Object>().map_err(|_e| {
                        Error::WrongInstance("object".to_string())
                    })?),
                    None => Json::Null,
                };
                as_object(parent)?.insert(node.name().to_string(), entry);
                Ok(())
            }
            Body::Leaf(_) => Err(Error::Unbound(node.name().to_string())),
        }
    }

    fn materialize(
        &self, id: NodeId, row: &mut dyn RowSource, context: &MappingContext<'_>,
    ) -> Result<Option<Instance>> {
        let mut value = self.create(id, row, context)?;
        if let Some(instance) = value.as_mut() {
            self.load(id, instance.as_mut(), row, context)?;
        }
        Ok(value)
    }

    fn assign(
        &self, id: NodeId, leaf: &Leaf, instance: &mut dyn Any, row: &dyn RowSource,
    ) -> Result<()> {
        let value = row.value(leaf.ordinal);
        let (member, conversion) = match &leaf.binding {
            LeafBinding::Member { member, conversion } => (member, conversion),
            LeafBinding::Entry => {
                let name = self.nodes[id].name().to_string();
                as_object(instance)?.insert(name, Json::from(value));
                return Ok(());
            }
        };

        let kind = member.kind();
        let outcome = if value.is_null() || kind.accepts(&value) {
            member.set(instance, value.clone())
        } else {
            let conversion = conversion.get_or_init(|| {
                tracing::debug!(
                    declaring_type = member.declaring_type(),
                    member = member.name(),
                    from = value.type_name(),
                    to = kind.name(),
                    "using conversion fallback"
                );
                Conversion::for_target(kind)
            });
            conversion
                .apply(&value)
                .map_err(Error::from)
                .and_then(|converted| member.set(instance, converted))
        };

        outcome.map_err(|source| Error::Set {
            declaring_type: member.declaring_type().to_string(),
            member: member.name().to_string(),
            value: value.describe(),
            source: Box::new(source),
        })
    }

    /// Whether every column reachable from `id` is null; object children are checked last.
    fn is_null(&self, id: NodeId, row: &dyn RowSource) -> bool {
        let Body::Complex(complex) = &self.nodes[id].body else {
            return true;
        };

        if let Shape::Typed(typed) = &complex.shape {
            for argument in typed.parameters.values() {
                match argument {
                    Argument::Column { ordinal, .. } if !row.is_null(*ordinal) => return false,
                    Argument::Object(child) if !self.is_null(*child, row) => return false,
                    _ => {}
                }
            }
        }

        let mut nested = Vec::new();
        for &child in &complex.properties {
            match &self.nodes[child].body {
                Body::Leaf(leaf) if !row.is_null(leaf.ordinal) => return false,
                Body::Leaf(_) => {}
                Body::Complex(_) => nested.push(child),
            }
        }
        nested.into_iter().all(|child| self.is_null(child, row))
    }
}

/// Apply the conversion policy to a constructor argument.
fn argument_value(value: Value, kind: Kind, conversion: &OnceCell<Conversion>) -> Result<Value> {
    if value.is_null() || kind.accepts(&value) {
        return Ok(value);
    }
    let conversion = conversion.get_or_init(|| {
        tracing::debug!(
            from = value.type_name(),
            to = kind.name(),
            "using argument conversion fallback"
        );
        Conversion::for_target(kind)
    });
    Ok(conversion.apply(&value)?)
}

fn as_object(instance: &mut dyn Any) -> Result<&mut Object> {
    instance.downcast_mut::<Object>().ok_or_else(|| Error::WrongInstance("object".to_string()))
}
