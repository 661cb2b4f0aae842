//! # Mappers
//!
//! Entry points. A mapper builds its tree from the first row it sees and reuses it for every
//! following row, so one mapper serves one query shape.
//!
//! Mappers hold `Rc` and `OnceCell` state and are neither `Send` nor `Sync`. Use one mapper per
//! thread.

use std::any::{Any, type_name};
use std::rc::Rc;

use serde_json::Value as Json;

use crate::collection::Include;
use crate::context::{LogSink, MappingContext, Settings};
use crate::error::{Error, Result};
use crate::metadata::{Instance, Metadata};
use crate::node::Object;
use crate::row::{RowSet, RowSource};
use crate::tree::{Target, Tree};

/// A forward-only cursor of rows.
pub trait Cursor: RowSource {
    /// Moves to the next row; `false` when there is none.
    fn advance(&mut self) -> bool;
}

impl Cursor for RowSet {
    fn advance(&mut self) -> bool {
        Self::advance(self)
    }
}

/// Settings and the cached tree shared by both mapper flavours.
#[derive(Default)]
struct Session {
    settings: Settings,
    tree: Option<Tree>,
}

impl Session {
    /// The tree for `row`'s shape, built on first use.
    fn prepare(
        &mut self, target: Target<'_>, row: &dyn RowSource,
    ) -> Result<(&Tree, MappingContext<'_>)> {
        let tree = match self.tree.take() {
            Some(tree) => {
                if let Err(e) = tree.check(row) {
                    self.tree = Some(tree);
                    return Err(e);
                }
                tree
            }
            None => Tree::build(target, row, &MappingContext::new(&self.settings))?,
        };
        let tree = self.tree.insert(tree);
        Ok((tree, MappingContext::new(&self.settings)))
    }

    fn map(&mut self, target: Target<'_>, row: &mut dyn RowSource) -> Result<Instance> {
        let (tree, context) = self.prepare(target, &*row)?;
        let mut instance = tree
            .create(Tree::ROOT, row, &context)?
            .ok_or_else(|| Error::Unbound("<root>".to_string()))?;
        tree.load(Tree::ROOT, instance.as_mut(), row, &context)?;
        Ok(instance)
    }

    fn load(
        &mut self, target: Target<'_>, instance: &mut dyn Any, row: &mut dyn RowSource,
    ) -> Result<()> {
        let (tree, context) = self.prepare(target, &*row)?;
        tree.load(Tree::ROOT, instance, row, &context)
    }
}

/// Maps rows onto registered types.
///
/// # Examples
///
/// ```ignore
/// let mut mapper = Mapper::new(&registry, "Product");
/// let product: Product = mapper.map_as(&mut row)?;
/// ```
pub struct Mapper<'m> {
    metadata: &'m dyn Metadata,
    root: String,
    session: Session,
}

impl<'m> Mapper<'m> {
    /// Creates a mapper for the registered type `root`.
    #[must_use]
    pub fn new(metadata: &'m dyn Metadata, root: &str) -> Self {
        Self {
            metadata,
            root: root.to_string(),
            session: Session::default(),
        }
    }

    /// Sets the column path separator. Defaults to `$`.
    #[must_use]
    pub fn separator(mut self, separator: &str) -> Self {
        self.session.settings.separator = separator.to_string();
        self
    }

    /// Marks the query as returning at most one row. The cursor is closed before deferred
    /// collections are loaded.
    ///
    /// Without this flag includes still load, once per mapped row, while the cursor stays
    /// open. Loaders must then not need the connection the cursor holds.
    #[must_use]
    pub const fn single_result(mut self, single_result: bool) -> Self {
        self.session.settings.single_result = single_result;
        self
    }

    /// Registers a deferred collection.
    ///
    /// Includes are not restricted to [`single_result`](Mapper::single_result) mappers. On a
    /// multi-row mapper the loader runs for every row with the cursor still open.
    #[must_use]
    pub fn include(mut self, include: Include) -> Self {
        self.session.settings.includes.push(include);
        self
    }

    /// Sets the warning sink. Warnings are always emitted through `tracing` as well.
    #[must_use]
    pub fn log(mut self, sink: impl LogSink + 'static) -> Self {
        self.session.settings.log = Some(Rc::new(sink));
        self
    }

    /// Materializes a new root instance from the current row.
    ///
    /// # Errors
    ///
    /// Configuration errors when the row shape cannot be mapped onto the root type, and
    /// row errors when a value cannot be assigned, a constructor fails or a loader fails.
    pub fn map(&mut self, row: &mut dyn RowSource) -> Result<Instance> {
        let target = Target::Typed {
            metadata: self.metadata,
            root: &self.root,
        };
        self.session.map(target, row)
    }

    /// Materializes the root and downcasts it to `T`.
    ///
    /// # Errors
    ///
    /// As [`Mapper::map`], plus [`Error::WrongInstance`] when the root type is not `T`.
    pub fn map_as<T: 'static>(&mut self, row: &mut dyn RowSource) -> Result<T> {
        let instance = self.map(row)?;
        instance
            .downcast::<T>()
            .map(|t| *t)
            .map_err(|_e| Error::WrongInstance(type_name::<T>().to_string()))
    }

    /// Populates an existing instance from the current row.
    ///
    /// # Errors
    ///
    /// As [`Mapper::map`]; [`Error::WrongInstance`] when `instance` is not of the root type.
    pub fn load(&mut self, instance: &mut dyn Any, row: &mut dyn RowSource) -> Result<()> {
        let target = Target::Typed {
            metadata: self.metadata,
            root: &self.root,
        };
        self.session.load(target, instance, row)
    }

    /// Maps every remaining row of `rows`.
    ///
    /// # Errors
    ///
    /// Stops at the first row that fails, as [`Mapper::map`].
    pub fn map_all(&mut self, rows: &mut impl Cursor) -> Result<Vec<Instance>> {
        let mut mapped = Vec::new();
        while rows.advance() {
            mapped.push(self.map(rows)?);
        }
        Ok(mapped)
    }
}

/// Maps rows onto schema-less JSON objects. Each column becomes an entry, each column group a
/// nested object; an object whose columns are all null becomes `null`.
#[derive(Default)]
pub struct DynamicMapper {
    session: Session,
}

impl DynamicMapper {
    /// Creates a dynamic mapper.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the column path separator. Defaults to `$`.
    #[must_use]
    pub fn separator(mut self, separator: &str) -> Self {
        self.session.settings.separator = separator.to_string();
        self
    }

    /// Sets the warning sink.
    #[must_use]
    pub fn log(mut self, sink: impl LogSink + 'static) -> Self {
        self.session.settings.log = Some(Rc::new(sink));
        self
    }

    /// Maps the current row to a JSON object.
    ///
    /// # Errors
    ///
    /// [`Error::ConstructorMappingDisabled`] when a column or group name is numeric, and
    /// [`Error::ShapeChanged`] when the row differs from the first one mapped.
    pub fn map(&mut self, row: &mut dyn RowSource) -> Result<Json> {
        let instance = self.session.map(Target::Dynamic, row)?;
        let object = instance
            .downcast::<Object>()
            .map_err(|_e| Error::WrongInstance("object".to_string()))?;
        Ok(Json::Object(*object))
    }

    /// Merges the current row into an existing JSON object.
    ///
    /// # Errors
    ///
    /// As [`DynamicMapper::map`], plus [`Error::WrongInstance`] when `value` is not an object.
    pub fn load(&mut self, value: &mut Json, row: &mut dyn RowSource) -> Result<()> {
        let Some(object) = value.as_object_mut() else {
            return Err(Error::WrongInstance("object".to_string()));
        };
        self.session.load(Target::Dynamic, object, row)
    }

    /// Maps every remaining row of `rows`.
    ///
    /// # Errors
    ///
    /// Stops at the first row that fails.
    pub fn map_all(&mut self, rows: &mut impl Cursor) -> Result<Vec<Json>> {
        let mut mapped = Vec::new();
        while rows.advance() {
            mapped.push(self.map(rows)?);
        }
        Ok(mapped)
    }
}
