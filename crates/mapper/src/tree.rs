//! # Tree construction
//!
//! Builds the node tree for one row shape. Each column group is resolved against the target
//! type in three passes: classify every column and child group as a member, a constructor
//! parameter position or unresolved; choose the constructor and its bindings; then emit nodes.
//! Nodes are only emitted once the whole group has been decided, so a column claimed by a
//! constructor never also appears as a property.

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::collection::CollectionNode;
use crate::context::{MappingContext, Warning};
use crate::error::{Error, Result};
use crate::metadata::{ComplexMember, Constructor, Metadata, ParamKind, ScalarMember};
use crate::node::{
    Argument, Body, Complex, Discriminator, Leaf, LeafBinding, Node, NodeId, Shape, Typed,
};
use crate::path::{Group, Groups, parameter_index};
use crate::row::RowSource;

/// What the root of the tree maps to.
#[derive(Clone, Copy)]
pub(crate) enum Target<'a> {
    Typed { metadata: &'a dyn Metadata, root: &'a str },
    Dynamic,
}

/// The mapping tree for one row shape.
pub(crate) struct Tree {
    pub(crate) nodes: Vec<Node>,
    columns: Vec<String>,
}

impl Tree {
    pub(crate) const ROOT: NodeId = 0;

    /// Build the tree for the shape of `row`.
    pub(crate) fn build(
        target: Target<'_>, row: &dyn RowSource, context: &MappingContext<'_>,
    ) -> Result<Self> {
        let columns: Vec<String> =
            (0..row.field_count()).map(|i| row.name(i).to_string()).collect();
        let groups = Groups::parse(columns.iter().map(String::as_str), context.separator);
        let root = groups.root().cloned().unwrap_or_default();

        let mut builder = Builder {
            groups: &groups,
            columns: &columns,
            context,
            nodes: Vec::new(),
            matched: vec![false; context.includes.len()],
        };

        match target {
            Target::Typed { metadata, root: type_name } => {
                builder.typed(metadata, &root, type_name, None, None, None)?;
                for (include, matched) in context.includes.iter().zip(&builder.matched) {
                    if !matched {
                        context.warn(&Warning::UnmatchedInclude {
                            path: include.path().join("."),
                        });
                    }
                }
            }
            Target::Dynamic => {
                builder.dynamic(&root, None, None)?;
            }
        }

        let nodes = builder.nodes;
        tracing::debug!(
            columns = columns.len(),
            groups = groups.iter().count(),
            nodes = nodes.len(),
            "built mapping tree"
        );

        Ok(Self { nodes, columns })
    }

    /// Reject a row whose columns differ from the ones the tree was built for.
    pub(crate) fn check(&self, row: &dyn RowSource) -> Result<()> {
        let count = row.field_count().max(self.columns.len());
        for ordinal in 0..count {
            let expected = self.columns.get(ordinal).map_or("", String::as_str);
            let found = if ordinal < row.field_count() { row.name(ordinal) } else { "" };
            if expected != found {
                return Err(Error::ShapeChanged {
                    ordinal,
                    expected: expected.to_string(),
                    found: found.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// A column or group addressing a constructor parameter.
enum Candidate<'g> {
    Column(usize),
    Group(&'g Group),
}

struct Builder<'a> {
    groups: &'a Groups,
    columns: &'a [String],
    context: &'a MappingContext<'a>,
    nodes: Vec<Node>,
    matched: Vec<bool>,
}

impl<'a> Builder<'a> {
    /// Emit the typed complex node for `group` and its subtree.
    fn typed(
        &mut self, metadata: &dyn Metadata, group: &'a Group, type_name: &str,
        member: Option<Rc<ComplexMember>>, property: Option<String>, container: Option<NodeId>,
    ) -> Result<NodeId> {
        let Some(descriptor) = metadata.descriptor(type_name) else {
            return Err(Error::UnknownType(type_name.to_string()));
        };

        // classify
        let mut leaves: Vec<(usize, Rc<ScalarMember>)> = Vec::new();
        let mut nested: Vec<(&'a Group, Rc<ComplexMember>)> = Vec::new();
        let mut candidates: BTreeMap<usize, Candidate<'a>> = BTreeMap::new();
        let mut unresolved_columns: Vec<usize> = Vec::new();
        let mut unresolved_groups: Vec<&'a Group> = Vec::new();

        for (&ordinal, name) in &group.columns {
            if let Some(scalar) = metadata.resolve_simple_member(type_name, name) {
                leaves.push((ordinal, scalar));
            } else if let Some(index) = parameter_index(name) {
                if candidates.insert(index, Candidate::Column(ordinal)).is_some() {
                    return Err(Error::DuplicateParameter {
                        type_name: type_name.to_string(),
                        index,
                    });
                }
            } else {
                unresolved_columns.push(ordinal);
            }
        }

        let groups = self.groups;
        for child in groups.children(group) {
            if let Some(complex) = metadata.resolve_complex_member(type_name, &child.name) {
                nested.push((child, complex));
            } else if let Some(index) = parameter_index(&child.name) {
                if candidates.insert(index, Candidate::Group(child)).is_some() {
                    return Err(Error::DuplicateParameter {
                        type_name: type_name.to_string(),
                        index,
                    });
                }
            } else {
                unresolved_groups.push(child);
            }
        }

        // choose the constructor
        let constructors = metadata.constructors(type_name);
        let mut bindings: BTreeMap<usize, Candidate<'a>> = BTreeMap::new();

        let constructor = if candidates.is_empty() {
            match constructors {
                [only] if only.arity() > 0 => {
                    for (index, param) in only.params().iter().enumerate() {
                        let claimed = match param.kind() {
                            ParamKind::Scalar(_) => claim_column(
                                group,
                                param.name(),
                                &mut leaves,
                                &mut unresolved_columns,
                            )
                            .map(Candidate::Column),
                            ParamKind::Complex(_) => {
                                claim_group(param.name(), &mut nested, &mut unresolved_groups)
                                    .map(Candidate::Group)
                            }
                        };
                        if let Some(candidate) = claimed {
                            bindings.insert(index, candidate);
                        }
                    }
                    if bindings.len() != only.arity() {
                        return Err(Error::ImplicitBinding {
                            type_name: type_name.to_string(),
                            expected: only.arity(),
                            bound: bindings.len(),
                        });
                    }
                    Rc::clone(only)
                }
                _ => match constructors.iter().find(|c| c.arity() == 0) {
                    Some(default) => Rc::clone(default),
                    None => {
                        return Err(Error::NoConstructor {
                            type_name: type_name.to_string(),
                            arity: 0,
                        });
                    }
                },
            }
        } else {
            let constructor = explicit_constructor(type_name, constructors, &candidates)?;
            bindings = candidates;
            constructor
        };

        // emit
        let id = self.reserve(property, container);

        let mut properties = Vec::with_capacity(leaves.len() + nested.len());
        let mut discriminator = None;
        let discriminator_member = metadata.discriminator_member(type_name);
        for (ordinal, scalar) in leaves {
            if discriminator_member.as_ref().is_some_and(|d| d.name() == scalar.name())
                && !descriptor.derived().is_empty()
            {
                discriminator = Some(Discriminator {
                    ordinal,
                    derived: descriptor.derived().to_vec(),
                });
            }
            properties.push(self.leaf(group, ordinal, Some(scalar), id));
        }
        for (child, complex) in nested {
            let target = complex.target().to_string();
            let name = child.name.clone();
            let nested = self.typed(metadata, child, &target, Some(complex), Some(name), Some(id))?;
            properties.push(nested);
        }

        let mut parameters = BTreeMap::new();
        for (index, candidate) in bindings {
            let param = &constructor.params()[index];
            let argument = match (candidate, param.kind()) {
                (Candidate::Column(ordinal), ParamKind::Scalar(kind)) => Argument::Column {
                    ordinal,
                    kind: *kind,
                    conversion: OnceCell::new(),
                },
                (Candidate::Group(child), ParamKind::Complex(target)) => {
                    let name = child.name.clone();
                    let nested = self.typed(metadata, child, target, None, Some(name), Some(id))?;
                    Argument::Object(nested)
                }
                (Candidate::Column(_), ParamKind::Complex(_)) => {
                    return Err(Error::ParameterShape {
                        type_name: type_name.to_string(),
                        index,
                        found: "column",
                    });
                }
                (Candidate::Group(_), ParamKind::Scalar(_)) => {
                    return Err(Error::ParameterShape {
                        type_name: type_name.to_string(),
                        index,
                        found: "column group",
                    });
                }
            };
            parameters.insert(index, argument);
        }

        for ordinal in unresolved_columns {
            self.context.warn(&Warning::UnresolvedColumn {
                container: type_name.to_string(),
                column: self.columns[ordinal].clone(),
            });
        }
        for child in unresolved_groups {
            self.context.warn(&Warning::UnresolvedGroup {
                container: type_name.to_string(),
                group: child.path(self.context.separator),
            });
        }

        let collections = self.collections(metadata, type_name, id)?;

        tracing::debug!(
            type_name,
            properties = properties.len(),
            parameters = parameters.len(),
            collections = collections.len(),
            "mapped type"
        );

        self.nodes[id].body = Body::Complex(Complex {
            properties,
            shape: Shape::Typed(Box::new(Typed {
                type_name: type_name.to_string(),
                member,
                constructor,
                parameters,
                collections,
                discriminator,
            })),
        });
        Ok(id)
    }

    /// Emit a schema-less object node: every column becomes an entry, every group a nested
    /// object. A column whose entry name is already taken by a group or an earlier column is
    /// dropped with a warning.
    fn dynamic(
        &mut self, group: &'a Group, property: Option<String>, container: Option<NodeId>,
    ) -> Result<NodeId> {
        let target = if group.name.is_empty() {
            "dynamic object".to_string()
        } else {
            group.path(self.context.separator)
        };
        for (&ordinal, name) in &group.columns {
            if parameter_index(name).is_some() {
                return Err(Error::ConstructorMappingDisabled {
                    target,
                    column: self.columns[ordinal].clone(),
                });
            }
        }
        let groups = self.groups;
        let children: Vec<&'a Group> = groups.children(group).collect();
        if let Some(child) = children.iter().find(|c| parameter_index(&c.name).is_some()) {
            return Err(Error::ConstructorMappingDisabled {
                target,
                column: child.path(self.context.separator),
            });
        }

        let id = self.reserve(property, container);
        let mut properties = Vec::new();
        let mut entries: Vec<&'a str> = children.iter().map(|&c| c.name.as_str()).collect();
        for (&ordinal, name) in &group.columns {
            if entries.contains(&name.as_str()) {
                self.context.warn(&Warning::UnresolvedColumn {
                    container: target.clone(),
                    column: self.columns[ordinal].clone(),
                });
                continue;
            }
            entries.push(name);
            properties.push(self.leaf(group, ordinal, None, id));
        }
        for child in children {
            properties.push(self.dynamic(child, Some(child.name.clone()), Some(id))?);
        }

        self.nodes[id].body = Body::Complex(Complex {
            properties,
            shape: Shape::Dynamic,
        });
        Ok(id)
    }

    fn leaf(
        &mut self, group: &Group, ordinal: usize, member: Option<Rc<ScalarMember>>,
        container: NodeId,
    ) -> NodeId {
        let property = group.columns.get(&ordinal).cloned();
        let binding = match member {
            Some(member) => LeafBinding::Member {
                member,
                conversion: OnceCell::new(),
            },
            None => LeafBinding::Entry,
        };
        self.nodes.push(Node {
            property,
            container: Some(container),
            body: Body::Leaf(Leaf { ordinal, binding }),
        });
        self.nodes.len() - 1
    }

    /// Push a placeholder complex node so children can point at it.
    fn reserve(&mut self, property: Option<String>, container: Option<NodeId>) -> NodeId {
        self.nodes.push(Node {
            property,
            container,
            body: Body::Complex(Complex {
                properties: Vec::new(),
                shape: Shape::Dynamic,
            }),
        });
        self.nodes.len() - 1
    }

    /// Attach the includes whose owner path leads to `id`.
    fn collections(
        &mut self, metadata: &dyn Metadata, type_name: &str, id: NodeId,
    ) -> Result<Vec<CollectionNode>> {
        let chain = self.chain(id);
        let context = self.context;
        let mut collections = Vec::new();

        for (key, include) in context.includes.iter().enumerate() {
            let Some((name, owner)) = include.split() else {
                continue;
            };
            if !owner.iter().rev().eq(chain.iter()) {
                continue;
            }
            let Some(member) = metadata.resolve_collection_member(type_name, name) else {
                return Err(Error::UnknownCollection {
                    type_name: type_name.to_string(),
                    member: name.clone(),
                });
            };
            collections.push(CollectionNode {
                member,
                loader: key,
                identity: metadata.identity_members(type_name),
            });
            self.matched[key] = true;
        }
        Ok(collections)
    }

    /// Property names from `id` up to the root.
    fn chain(&self, id: NodeId) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current.map(|id| &self.nodes[id]) {
            if let Some(property) = &node.property {
                chain.push(property.clone());
            }
            current = node.container;
        }
        chain
    }
}

/// Validate numeric bindings and pick the one constructor of matching arity.
fn explicit_constructor(
    type_name: &str, constructors: &[Rc<Constructor>], candidates: &BTreeMap<usize, Candidate<'_>>,
) -> Result<Rc<Constructor>> {
    let arity = candidates.len();
    for index in 0..arity {
        if !candidates.contains_key(&index) {
            return Err(Error::MissingParameter {
                type_name: type_name.to_string(),
                index,
            });
        }
    }

    let mut matching = constructors.iter().filter(|c| c.arity() == arity);
    match (matching.next(), matching.count()) {
        (Some(constructor), 0) => Ok(Rc::clone(constructor)),
        (None, _) => Err(Error::NoConstructor {
            type_name: type_name.to_string(),
            arity,
        }),
        (Some(_), others) => Err(Error::AmbiguousConstructor {
            type_name: type_name.to_string(),
            arity,
            count: others + 1,
        }),
    }
}

/// Take the column named exactly `name` away from the property and unresolved lists.
fn claim_column(
    group: &Group, name: &str, leaves: &mut Vec<(usize, Rc<ScalarMember>)>,
    unresolved: &mut Vec<usize>,
) -> Option<usize> {
    let ordinal =
        group.columns.iter().find(|(_, column)| *column == name).map(|(ordinal, _)| *ordinal)?;
    leaves.retain(|(o, _)| *o != ordinal);
    unresolved.retain(|o| *o != ordinal);
    Some(ordinal)
}

/// Take the child group named exactly `name` away from the property and unresolved lists.
fn claim_group<'g>(
    name: &str, nested: &mut Vec<(&'g Group, Rc<ComplexMember>)>, unresolved: &mut Vec<&'g Group>,
) -> Option<&'g Group> {
    if let Some(pos) = nested.iter().position(|(g, _)| g.name == name) {
        return Some(nested.remove(pos).0);
    }
    let pos = unresolved.iter().position(|g| g.name == name)?;
    Some(unresolved.remove(pos))
}
