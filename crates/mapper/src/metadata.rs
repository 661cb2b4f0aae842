//! # Metadata
//!
//! Type descriptors consulted while building a mapping tree. A descriptor is built once per type
//! and exposes typed member access through boxed accessors, so no introspection happens while
//! rows are mapped.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::value::{FromValue, IntoValue, Kind, TypeMismatch, Value};

/// A materialized object.
pub type Instance = Box<dyn Any>;

/// The metadata collaborator: resolves types and their members by name.
///
/// Only [`Metadata::descriptor`] is required; the remaining operations are derived from the
/// returned [`TypeDescriptor`] but may be overridden, e.g. to apply naming conventions.
pub trait Metadata {
    /// The descriptor registered under `type_name`.
    fn descriptor(&self, type_name: &str) -> Option<&TypeDescriptor>;

    /// A settable scalar member of `container` called `name`.
    fn resolve_simple_member(&self, container: &str, name: &str) -> Option<Rc<ScalarMember>> {
        self.descriptor(container)?.scalar(name).cloned()
    }

    /// A settable nested-object member of `container` called `name`.
    fn resolve_complex_member(&self, container: &str, name: &str) -> Option<Rc<ComplexMember>> {
        self.descriptor(container)?.complex(name).cloned()
    }

    /// A one-to-many member of `container` called `name`, looked up among its
    /// [`associations`](Metadata::associations).
    fn resolve_collection_member(
        &self, container: &str, name: &str,
    ) -> Option<Rc<CollectionMember>> {
        find(self.associations(container), name, |m| &m.name).cloned()
    }

    /// The constructors of `type_name`, in declaration order.
    fn constructors(&self, type_name: &str) -> &[Rc<Constructor>] {
        match self.descriptor(type_name) {
            Some(descriptor) => &descriptor.constructors,
            None => &[],
        }
    }

    /// Members that identify an instance of `type_name`.
    fn identity_members(&self, type_name: &str) -> Vec<Rc<ScalarMember>> {
        let Some(descriptor) = self.descriptor(type_name) else {
            return Vec::new();
        };
        descriptor.identity.iter().filter_map(|name| descriptor.scalar(name).cloned()).collect()
    }

    /// One-to-many associations of `type_name`.
    fn associations(&self, type_name: &str) -> &[Rc<CollectionMember>] {
        match self.descriptor(type_name) {
            Some(descriptor) => &descriptor.collections,
            None => &[],
        }
    }

    /// The member whose value selects a derived constructor.
    fn discriminator_member(&self, type_name: &str) -> Option<Rc<ScalarMember>> {
        let descriptor = self.descriptor(type_name)?;
        descriptor.scalar(descriptor.discriminator.as_deref()?).cloned()
    }
}

/// In-memory metadata provider.
#[derive(Default)]
pub struct Registry {
    types: HashMap<String, TypeDescriptor>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor, replacing any previous one with the same name.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> &mut Self {
        self.types.insert(descriptor.name.clone(), descriptor);
        self
    }

    /// Registers a descriptor (builder form).
    #[must_use]
    pub fn with(mut self, descriptor: TypeDescriptor) -> Self {
        self.register(descriptor);
        self
    }
}

impl Metadata for Registry {
    fn descriptor(&self, type_name: &str) -> Option<&TypeDescriptor> {
        self.types.get(type_name)
    }
}

/// Describes how to construct and populate one type.
pub struct TypeDescriptor {
    name: String,
    scalars: Vec<Rc<ScalarMember>>,
    complexes: Vec<Rc<ComplexMember>>,
    collections: Vec<Rc<CollectionMember>>,
    constructors: Vec<Rc<Constructor>>,
    identity: Vec<String>,
    discriminator: Option<String>,
    derived: Vec<(String, Rc<Constructor>)>,
}

impl TypeDescriptor {
    /// Starts a descriptor for `T`, registered under `name`.
    #[must_use]
    pub fn builder<T: 'static>(name: &str) -> DescriptorBuilder<T> {
        DescriptorBuilder {
            descriptor: Self {
                name: name.to_string(),
                scalars: Vec::new(),
                complexes: Vec::new(),
                collections: Vec::new(),
                constructors: Vec::new(),
                identity: Vec::new(),
                discriminator: None,
                derived: Vec::new(),
            },
            _marker: PhantomData,
        }
    }

    /// The registered type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scalar member by name; exact match first, then ASCII case-insensitive.
    #[must_use]
    pub fn scalar(&self, name: &str) -> Option<&Rc<ScalarMember>> {
        find(&self.scalars, name, |m| &m.name)
    }

    /// Nested-object member by name.
    #[must_use]
    pub fn complex(&self, name: &str) -> Option<&Rc<ComplexMember>> {
        find(&self.complexes, name, |m| &m.name)
    }

    /// Collection member by name.
    #[must_use]
    pub fn collection(&self, name: &str) -> Option<&Rc<CollectionMember>> {
        find(&self.collections, name, |m| &m.name)
    }

    /// Constructors, in declaration order.
    #[must_use]
    pub fn constructors(&self) -> &[Rc<Constructor>] {
        &self.constructors
    }

    /// Constructors selected by discriminator value.
    #[must_use]
    pub fn derived(&self) -> &[(String, Rc<Constructor>)] {
        &self.derived
    }
}

fn find<'a, M>(members: &'a [Rc<M>], name: &str, key: impl Fn(&M) -> &String) -> Option<&'a Rc<M>> {
    members
        .iter()
        .find(|m| key(m) == name)
        .or_else(|| members.iter().find(|m| key(m).eq_ignore_ascii_case(name)))
}

/// Typed builder for [`TypeDescriptor`].
///
/// # Examples
///
/// ```ignore
/// let product = TypeDescriptor::builder::<Product>("Product")
///     .default_constructor()
///     .scalar("ProductID", |p| &mut p.product_id)
///     .scalar("ProductName", |p| &mut p.product_name)
///     .complex("Category", "Category", |p| &mut p.category)
///     .identity(&["ProductID"])
///     .build();
/// ```
pub struct DescriptorBuilder<T> {
    descriptor: TypeDescriptor,
    _marker: PhantomData<T>,
}

impl<T: 'static> DescriptorBuilder<T> {
    /// Adds a scalar member backed by a field.
    #[must_use]
    pub fn scalar<F>(mut self, name: &str, field: fn(&mut T) -> &mut F) -> Self
    where
        F: FromValue + IntoValue + 'static,
    {
        self.descriptor.scalars.push(Rc::new(ScalarMember {
            name: name.to_string(),
            declaring_type: self.descriptor.name.clone(),
            kind: F::KIND,
            access: Box::new(FieldAccess { field }),
        }));
        self
    }

    /// Adds a nested-object member backed by an optional field. `target` is the registered name
    /// of the nested type.
    #[must_use]
    pub fn complex<C: 'static>(
        mut self, name: &str, target: &str, field: fn(&mut T) -> &mut Option<C>,
    ) -> Self {
        self.descriptor.complexes.push(Rc::new(ComplexMember {
            name: name.to_string(),
            declaring_type: self.descriptor.name.clone(),
            target: target.to_string(),
            access: Box::new(FieldAccess { field }),
        }));
        self
    }

    /// Adds a one-to-many member backed by a `Vec`. `element` is the registered name of the
    /// element type.
    #[must_use]
    pub fn collection<C: 'static>(
        self, name: &str, element: &str, field: fn(&mut T) -> &mut Vec<C>,
    ) -> Self {
        self.push_collection(name, element, Box::new(FieldAccess { field }), None)
    }

    /// Adds a one-to-many member with a reverse edge: `fill` runs on every loaded element with
    /// the owner before the element is appended.
    #[must_use]
    pub fn reciprocal<C: 'static>(
        self, name: &str, element: &str, field: fn(&mut T) -> &mut Vec<C>, fill: fn(&mut C, &T),
    ) -> Self {
        self.push_collection(
            name,
            element,
            Box::new(FieldAccess { field }),
            Some(Box::new(Reciprocal { fill })),
        )
    }

    fn push_collection(
        mut self, name: &str, element: &str, access: Box<dyn CollectionAccess>,
        reciprocal: Option<Box<dyn ReciprocalAccess>>,
    ) -> Self {
        self.descriptor.collections.push(Rc::new(CollectionMember {
            name: name.to_string(),
            declaring_type: self.descriptor.name.clone(),
            element: element.to_string(),
            access,
            reciprocal,
        }));
        self
    }

    /// Adds a constructor. `build` reads its arguments from [`Args`] in parameter order.
    #[must_use]
    pub fn constructor(
        mut self, params: Vec<Param>, build: impl Fn(&mut Args) -> Result<T> + 'static,
    ) -> Self {
        self.descriptor.constructors.push(Rc::new(Constructor {
            params,
            build: Box::new(move |args: &mut Args| -> Result<Instance> {
                build(args).map(|value| Box::new(value) as Instance)
            }),
        }));
        self
    }

    /// Adds the zero-argument constructor.
    #[must_use]
    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.constructor(Vec::new(), |_| Ok(T::default()))
    }

    /// Names the members that identify an instance.
    #[must_use]
    pub fn identity(mut self, members: &[&str]) -> Self {
        self.descriptor.identity = members.iter().map(ToString::to_string).collect();
        self
    }

    /// Names the member whose column selects a derived constructor.
    #[must_use]
    pub fn discriminator(mut self, member: &str) -> Self {
        self.descriptor.discriminator = Some(member.to_string());
        self
    }

    /// Instantiates with `build` instead of the default constructor when the discriminator
    /// column holds `value`.
    #[must_use]
    pub fn derived(mut self, value: &str, build: fn() -> T) -> Self {
        let constructor = Constructor {
            params: Vec::new(),
            build: Box::new(move |_: &mut Args| -> Result<Instance> { Ok(Box::new(build())) }),
        };
        self.descriptor.derived.push((value.to_string(), Rc::new(constructor)));
        self
    }

    /// Finishes the descriptor.
    #[must_use]
    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }
}

/// A settable scalar member.
pub struct ScalarMember {
    name: String,
    declaring_type: String,
    kind: Kind,
    access: Box<dyn ScalarAccess>,
}

impl ScalarMember {
    /// Member name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the type declaring the member.
    #[must_use]
    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    /// The member's target kind.
    #[must_use]
    pub const fn kind(&self) -> Kind {
        self.kind
    }

    /// Read the member's current value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongInstance`] when `instance` is not of the declaring type.
    pub fn get(&self, instance: &mut dyn Any) -> Result<Value> {
        self.access.get(instance).ok_or_else(|| Error::WrongInstance(self.declaring_type.clone()))
    }

    /// Assign a value without conversion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Mismatch`] when the value has another type and
    /// [`Error::WrongInstance`] when `instance` is not of the declaring type.
    pub fn set(&self, instance: &mut dyn Any, value: Value) -> Result<()> {
        self.access
            .set(instance, value)
            .ok_or_else(|| Error::WrongInstance(self.declaring_type.clone()))?
            .map_err(Error::from)
    }
}

/// A settable nested-object member.
pub struct ComplexMember {
    name: String,
    declaring_type: String,
    target: String,
    access: Box<dyn ComplexAccess>,
}

impl ComplexMember {
    /// Member name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered name of the nested type.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The nested instance, if one is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongInstance`] when `instance` is not of the declaring type.
    pub fn get<'a>(&self, instance: &'a mut dyn Any) -> Result<Option<&'a mut dyn Any>> {
        self.access.get(instance).ok_or_else(|| Error::WrongInstance(self.declaring_type.clone()))
    }

    /// Replace the nested instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Mismatch`] when `value` is not of the nested type and
    /// [`Error::WrongInstance`] when `instance` is not of the declaring type.
    pub fn set(&self, instance: &mut dyn Any, value: Option<Instance>) -> Result<()> {
        self.access
            .set(instance, value)
            .ok_or_else(|| Error::WrongInstance(self.declaring_type.clone()))?
            .map_err(Error::from)
    }
}

/// A one-to-many member filled by a deferred loader.
pub struct CollectionMember {
    name: String,
    declaring_type: String,
    element: String,
    access: Box<dyn CollectionAccess>,
    reciprocal: Option<Box<dyn ReciprocalAccess>>,
}

impl CollectionMember {
    /// Member name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered name of the element type.
    #[must_use]
    pub fn element(&self) -> &str {
        &self.element
    }

    /// Whether loaded elements are back-filled with their owner.
    #[must_use]
    pub const fn has_reciprocal(&self) -> bool {
        self.reciprocal.is_some()
    }

    /// Back-fill the owner into an element's reverse edge. No-op without a reciprocal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongInstance`] when either instance has an unexpected type.
    pub fn fill(&self, element: &mut dyn Any, owner: &dyn Any) -> Result<()> {
        match &self.reciprocal {
            Some(reciprocal) if !reciprocal.fill(element, owner) => {
                Err(Error::WrongInstance(format!("{} element", self.element)))
            }
            _ => Ok(()),
        }
    }

    /// Append an element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Mismatch`] when `element` is not of the element type and
    /// [`Error::WrongInstance`] when `owner` is not of the declaring type.
    pub fn push(&self, owner: &mut dyn Any, element: Instance) -> Result<()> {
        self.access
            .push(owner, element)
            .ok_or_else(|| Error::WrongInstance(self.declaring_type.clone()))?
            .map_err(Error::from)
    }
}

/// A constructor parameter.
#[derive(Debug, Clone)]
pub struct Param {
    name: String,
    kind: ParamKind,
}

/// What a constructor parameter takes.
#[derive(Debug, Clone)]
pub enum ParamKind {
    /// A single column value.
    Scalar(Kind),
    /// A nested object of the named registered type.
    Complex(String),
}

impl Param {
    /// A scalar parameter of type `F`.
    #[must_use]
    pub fn scalar<F: FromValue>(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ParamKind::Scalar(F::KIND),
        }
    }

    /// A nested-object parameter of the registered type `target`.
    #[must_use]
    pub fn complex(name: &str, target: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ParamKind::Complex(target.to_string()),
        }
    }

    /// Parameter name, matched exactly against column and group names.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// What the parameter takes.
    #[must_use]
    pub const fn kind(&self) -> &ParamKind {
        &self.kind
    }
}

/// A constructor argument.
pub enum Arg {
    /// Column value for a scalar parameter.
    Value(Value),
    /// Nested object for a complex parameter; `None` when all its columns were null.
    Object(Option<Instance>),
}

/// Arguments handed to a constructor, consumed in parameter order.
pub struct Args {
    type_name: String,
    values: std::vec::IntoIter<Arg>,
    count: usize,
    index: usize,
}

impl Args {
    /// The next scalar argument.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Mismatch`] when the argument has another type or is an object, and
    /// [`Error::MissingArgument`] when all arguments have been read.
    pub fn value<F: FromValue>(&mut self) -> Result<F> {
        match self.next()? {
            Arg::Value(value) => F::from_value(value).map_err(Error::from),
            Arg::Object(_) => Err(Error::Mismatch(TypeMismatch {
                expected: F::KIND.name(),
                found: "object",
            })),
        }
    }

    /// The next nested-object argument.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Mismatch`] when the argument is a scalar or an object of another type,
    /// and [`Error::MissingArgument`] when all arguments have been read.
    pub fn object<C: 'static>(&mut self) -> Result<Option<C>> {
        match self.next()? {
            Arg::Object(None) => Ok(None),
            Arg::Object(Some(boxed)) => boxed.downcast::<C>().map(|c| Some(*c)).map_err(|_e| {
                Error::Mismatch(TypeMismatch {
                    expected: type_name::<C>(),
                    found: "object",
                })
            }),
            Arg::Value(value) => Err(Error::Mismatch(TypeMismatch::new(type_name::<C>(), &value))),
        }
    }

    fn next(&mut self) -> Result<Arg> {
        let arg = self.values.next().ok_or_else(|| Error::MissingArgument {
            type_name: self.type_name.clone(),
            index: self.index,
            count: self.count,
        })?;
        self.index += 1;
        Ok(arg)
    }
}

/// A constructor and its parameter list.
pub struct Constructor {
    params: Vec<Param>,
    build: Box<dyn Fn(&mut Args) -> Result<Instance>>,
}

impl Constructor {
    /// Parameters in declaration order.
    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Number of parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Invoke the constructor.
    ///
    /// # Errors
    ///
    /// Returns whatever the constructor body returns, typically [`Error::Mismatch`] when an
    /// argument has the wrong type.
    pub fn construct(&self, type_name: &str, args: Vec<Arg>) -> Result<Instance> {
        let count = args.len();
        let mut args = Args {
            type_name: type_name.to_string(),
            values: args.into_iter(),
            count,
            index: 0,
        };
        (self.build)(&mut args)
    }
}

// Typed accessors behind the member handles. `None` means the instance is of another type.
trait ScalarAccess {
    fn get(&self, instance: &mut dyn Any) -> Option<Value>;
    fn set(&self, instance: &mut dyn Any, value: Value) -> Option<Result<(), TypeMismatch>>;
}

trait ComplexAccess {
    fn get<'a>(&self, instance: &'a mut dyn Any) -> Option<Option<&'a mut dyn Any>>;
    fn set(&self, instance: &mut dyn Any, value: Option<Instance>)
    -> Option<Result<(), TypeMismatch>>;
}

trait CollectionAccess {
    fn push(&self, owner: &mut dyn Any, element: Instance) -> Option<Result<(), TypeMismatch>>;
}

trait ReciprocalAccess {
    fn fill(&self, element: &mut dyn Any, owner: &dyn Any) -> bool;
}

struct FieldAccess<T, F> {
    field: fn(&mut T) -> &mut F,
}

impl<T: 'static, F> FieldAccess<T, F> {
    fn project<'a>(&self, instance: &'a mut dyn Any) -> Option<&'a mut F> {
        instance.downcast_mut::<T>().map(self.field)
    }
}

impl<T, F> ScalarAccess for FieldAccess<T, F>
where
    T: 'static,
    F: FromValue + IntoValue + 'static,
{
    fn get(&self, instance: &mut dyn Any) -> Option<Value> {
        self.project(instance).map(|field| field.to_value())
    }

    fn set(&self, instance: &mut dyn Any, value: Value) -> Option<Result<(), TypeMismatch>> {
        let slot = self.project(instance)?;
        Some(F::from_value(value).map(|value| *slot = value))
    }
}

impl<T: 'static, C: 'static> ComplexAccess for FieldAccess<T, Option<C>> {
    fn get<'a>(&self, instance: &'a mut dyn Any) -> Option<Option<&'a mut dyn Any>> {
        let slot = self.project(instance)?;
        Some(slot.as_mut().map(|nested| nested as &mut dyn Any))
    }

    fn set(
        &self, instance: &mut dyn Any, value: Option<Instance>,
    ) -> Option<Result<(), TypeMismatch>> {
        let slot = self.project(instance)?;
        let Some(boxed) = value else {
            *slot = None;
            return Some(Ok(()));
        };
        Some(boxed.downcast::<C>().map(|nested| *slot = Some(*nested)).map_err(|_e| {
            TypeMismatch {
                expected: type_name::<C>(),
                found: "object",
            }
        }))
    }
}

impl<T: 'static, C: 'static> CollectionAccess for FieldAccess<T, Vec<C>> {
    fn push(&self, owner: &mut dyn Any, element: Instance) -> Option<Result<(), TypeMismatch>> {
        let items = self.project(owner)?;
        Some(element.downcast::<C>().map(|element| items.push(*element)).map_err(|_e| {
            TypeMismatch {
                expected: type_name::<C>(),
                found: "object",
            }
        }))
    }
}

struct Reciprocal<C, T> {
    fill: fn(&mut C, &T),
}

impl<C: 'static, T: 'static> ReciprocalAccess for Reciprocal<C, T> {
    fn fill(&self, element: &mut dyn Any, owner: &dyn Any) -> bool {
        match (element.downcast_mut::<C>(), owner.downcast_ref::<T>()) {
            (Some(element), Some(owner)) => {
                (self.fill)(element, owner);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Category {
        id: i32,
        name: Option<String>,
    }

    #[derive(Debug, Default)]
    struct Product {
        id: i32,
        category: Option<Category>,
        tags: Vec<String>,
    }

    fn registry() -> Registry {
        Registry::new()
            .with(
                TypeDescriptor::builder::<Product>("Product")
                    .default_constructor()
                    .scalar("ProductID", |p| &mut p.id)
                    .complex("Category", "Category", |p| &mut p.category)
                    .collection("Tags", "String", |p| &mut p.tags)
                    .identity(&["ProductID"])
                    .build(),
            )
            .with(
                TypeDescriptor::builder::<Category>("Category")
                    .default_constructor()
                    .constructor(
                        vec![Param::scalar::<i32>("id"), Param::scalar::<Option<String>>("name")],
                        |args| {
                            Ok(Category {
                                id: args.value()?,
                                name: args.value()?,
                            })
                        },
                    )
                    .scalar("CategoryID", |c| &mut c.id)
                    .build(),
            )
    }

    #[test]
    fn resolves_members_case_insensitively() {
        let registry = registry();
        assert!(registry.resolve_simple_member("Product", "ProductID").is_some());
        assert!(registry.resolve_simple_member("Product", "productid").is_some());
        assert!(registry.resolve_simple_member("Product", "Category").is_none());
        let category = registry.resolve_complex_member("Product", "category").unwrap();
        assert_eq!(category.target(), "Category");
        assert!(registry.resolve_collection_member("Product", "Tags").is_some());
        assert!(registry.resolve_simple_member("Missing", "ProductID").is_none());
        assert_eq!(registry.identity_members("Product").len(), 1);
        assert_eq!(registry.constructors("Category").len(), 2);
        assert!(registry.constructors("Missing").is_empty());
    }

    #[test]
    fn typed_access() {
        let registry = registry();
        let id = registry.resolve_simple_member("Product", "ProductID").unwrap();
        let category = registry.resolve_complex_member("Product", "Category").unwrap();

        let mut product: Instance = Box::new(Product::default());
        id.set(product.as_mut(), Value::Int32(5)).unwrap();
        assert_eq!(id.get(product.as_mut()).unwrap(), Value::Int32(5));

        let err = id.set(product.as_mut(), Value::Str("5".into())).unwrap_err();
        assert!(matches!(err, Error::Mismatch(_)));

        assert!(category.get(product.as_mut()).unwrap().is_none());
        category.set(product.as_mut(), Some(Box::new(Category::default()))).unwrap();
        assert!(category.get(product.as_mut()).unwrap().is_some());

        let mut wrong: Instance = Box::new(Category::default());
        assert!(matches!(id.set(wrong.as_mut(), Value::Int32(1)), Err(Error::WrongInstance(_))));
    }

    #[test]
    fn constructor_arguments() {
        let registry = registry();
        let constructor = registry
            .constructors("Category")
            .iter()
            .find(|c| c.arity() == 2)
            .unwrap();

        let instance = constructor
            .construct("Category", vec![Arg::Value(Value::Int32(2)), Arg::Value(Value::Null)])
            .unwrap();
        let category = instance.downcast::<Category>().unwrap();
        assert_eq!(*category, Category { id: 2, name: None });

        let err =
            constructor.construct("Category", vec![Arg::Value(Value::Int32(2))]).err().unwrap();
        assert!(matches!(err, Error::MissingArgument { index: 1, count: 1, .. }));
    }

    #[test]
    fn reciprocal_fills_elements() {
        let descriptor = TypeDescriptor::builder::<Product>("Product")
            .reciprocal(
                "Labels",
                "String",
                |p| &mut p.tags,
                |tag: &mut String, p: &Product| *tag = format!("{}:{tag}", p.id),
            )
            .build();
        let labels = descriptor.collection("labels").unwrap();
        assert!(labels.has_reciprocal());

        let mut product: Instance = Box::new(Product {
            id: 7,
            ..Product::default()
        });
        let mut element: Instance = Box::new("new".to_string());
        labels.fill(element.as_mut(), &*product).unwrap();
        labels.push(product.as_mut(), element).unwrap();
        assert_eq!(product.downcast_ref::<Product>().unwrap().tags, ["7:new"]);

        let mut wrong: Instance = Box::new(1_i32);
        assert!(matches!(labels.fill(wrong.as_mut(), &*product), Err(Error::WrongInstance(_))));

        let plain = registry();
        assert!(!plain.resolve_collection_member("Product", "Tags").unwrap().has_reciprocal());
    }

    /// Hides every association of the wrapped registry.
    struct Flat(Registry);

    impl Metadata for Flat {
        fn descriptor(&self, type_name: &str) -> Option<&TypeDescriptor> {
            self.0.descriptor(type_name)
        }

        fn associations(&self, _type_name: &str) -> &[Rc<CollectionMember>] {
            &[]
        }
    }

    #[test]
    fn collections_resolve_through_associations() {
        let registry = registry();
        assert_eq!(registry.associations("Product").len(), 1);
        assert!(registry.associations("Missing").is_empty());

        let flat = Flat(registry);
        assert!(flat.resolve_collection_member("Product", "Tags").is_none());
        assert!(flat.resolve_simple_member("Product", "ProductID").is_some());
    }
}
