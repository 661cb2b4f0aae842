//! # Deferred collections
//!
//! One-to-many associations are not read from the row. A collection node calls a registered
//! loader with the owner once the owner's columns are populated, then appends what the loader
//! returns.

use std::any::{Any, type_name};
use std::rc::Rc;

use anyhow::anyhow;

use crate::context::MappingContext;
use crate::error::{Error, Result};
use crate::metadata::{CollectionMember, Instance, ScalarMember};
use crate::value::Value;

/// What a loader is asked for.
pub struct LoadRequest<'a> {
    /// The owning instance, fully populated from the current row.
    pub owner: &'a dyn Any,
    /// Values of the owner's identity members, in declaration order.
    pub key: &'a [Value],
    /// The include path that registered the loader.
    pub path: &'a [String],
}

/// Loads the elements of a deferred collection, typically by issuing a key-scoped query.
pub trait CollectionLoader {
    /// Returns the elements to append.
    ///
    /// # Errors
    ///
    /// Any error from the underlying query; it is surfaced as [`Error::Loader`].
    fn load(&self, request: &LoadRequest<'_>) -> anyhow::Result<Vec<Instance>>;
}

impl<F> CollectionLoader for F
where
    F: Fn(&LoadRequest<'_>) -> anyhow::Result<Vec<Instance>>,
{
    fn load(&self, request: &LoadRequest<'_>) -> anyhow::Result<Vec<Instance>> {
        self(request)
    }
}

/// Wraps a typed loader for owners of type `O` yielding elements of type `C`.
///
/// # Examples
///
/// ```ignore
/// let details = loader(|order: &Order, key: &[Value]| {
///     store.order_details(order.order_id)
/// });
/// let mapper = Mapper::new(&registry, "Order")
///     .single_result(true)
///     .include(Include::new(["OrderDetails"], details));
/// ```
pub fn loader<O, C, F>(load: F) -> Rc<dyn CollectionLoader>
where
    O: 'static,
    C: 'static,
    F: Fn(&O, &[Value]) -> anyhow::Result<Vec<C>> + 'static,
{
    Rc::new(move |request: &LoadRequest<'_>| -> anyhow::Result<Vec<Instance>> {
        let owner = request
            .owner
            .downcast_ref::<O>()
            .ok_or_else(|| anyhow!("owner is not a `{}`", type_name::<O>()))?;
        let items = load(owner, request.key)?;
        Ok(items.into_iter().map(|item| Box::new(item) as Instance).collect())
    })
}

/// A deferred collection path and its loader.
///
/// The path names the nested members leading to the owner, ending with the collection member,
/// e.g. `["Customer", "Orders"]` loads `Orders` on the object mapped from `Customer$*` columns.
#[derive(Clone)]
pub struct Include {
    path: Vec<String>,
    loader: Rc<dyn CollectionLoader>,
}

impl Include {
    /// Creates an include.
    pub fn new<I, S>(path: I, loader: Rc<dyn CollectionLoader>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            loader,
        }
    }

    /// Member names, ending with the collection member.
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub(crate) fn loader(&self) -> &dyn CollectionLoader {
        self.loader.as_ref()
    }

    /// The owner's property chain and the collection member name.
    pub(crate) fn split(&self) -> Option<(&String, &[String])> {
        self.path.split_last()
    }
}

/// A collection attached to a complex node.
pub(crate) struct CollectionNode {
    pub(crate) member: Rc<CollectionMember>,
    pub(crate) loader: usize,
    pub(crate) identity: Vec<Rc<ScalarMember>>,
}

impl CollectionNode {
    /// Invoke the loader for `owner` and append every element.
    pub(crate) fn load(&self, owner: &mut dyn Any, context: &MappingContext<'_>) -> Result<()> {
        let Some(include) = context.includes.get(self.loader) else {
            return Err(Error::Unbound(self.member.name().to_string()));
        };
        let key = self.identity.iter().map(|member| member.get(owner)).collect::<Result<Vec<_>>>()?;

        let request = LoadRequest {
            owner: &*owner,
            key: &key,
            path: include.path(),
        };
        let items = include.loader().load(&request).map_err(|source| Error::Loader {
            path: include.path().join("."),
            source,
        })?;

        tracing::debug!(collection = self.member.name(), count = items.len(), "loaded collection");

        for mut item in items {
            self.member.fill(item.as_mut(), owner)?;
            self.member.push(owner, item)?;
        }
        Ok(())
    }
}
