//! Result-row to object-graph mapping for SQL query results.
//!
//! Reconstructs nested objects from flat result rows using column naming alone. A column named
//! `Category$CategoryName` sets `CategoryName` on the object held by the `Category` member of
//! the root; columns sharing the `Category$` prefix populate the same nested instance. The
//! mapping tree is built from the first row and reused for every following row of the same
//! query.
//!
//! # Quick Start
//!
//! ## Describe types
//!
//! ```ignore
//! #[derive(Debug, Default)]
//! pub struct Product {
//!     pub product_id: i32,
//!     pub product_name: String,
//!     pub category: Option<Category>,
//! }
//!
//! #[derive(Debug, Default)]
//! pub struct Category {
//!     pub category_id: i32,
//!     pub category_name: String,
//! }
//!
//! let registry = Registry::new()
//!     .with(
//!         TypeDescriptor::builder::<Product>("Product")
//!             .default_constructor()
//!             .scalar("ProductID", |p| &mut p.product_id)
//!             .scalar("ProductName", |p| &mut p.product_name)
//!             .complex("Category", "Category", |p| &mut p.category)
//!             .build(),
//!     )
//!     .with(
//!         TypeDescriptor::builder::<Category>("Category")
//!             .default_constructor()
//!             .scalar("CategoryID", |c| &mut c.category_id)
//!             .scalar("CategoryName", |c| &mut c.category_name)
//!             .build(),
//!     );
//! ```
//!
//! ## Map rows
//!
//! ```ignore
//! let mut row = Row::new()
//!     .with("ProductID", 1)
//!     .with("ProductName", "Chai")
//!     .with("Category$CategoryID", 2)
//!     .with("Category$CategoryName", "Beverages");
//!
//! let mut mapper = Mapper::new(&registry, "Product");
//! let product: Product = mapper.map_as(&mut row)?;
//! ```
//!
//! When every `Category$*` column is null, `product.category` is `None`.
//!
//! ## Constructors
//!
//! Types without a zero-argument constructor are built through their constructor. Columns bind
//! to parameters by exact parameter name, or by position when the column name is numeric:
//!
//! ```ignore
//! // Money::new(amount, currency)
//! let columns = ["Price$0", "Price$1"];
//! ```
//!
//! ## Deferred collections
//!
//! ```ignore
//! let mut mapper = Mapper::new(&registry, "Order")
//!     .single_result(true)
//!     .include(Include::new(["OrderDetails"], loader(|order: &Order, _key: &[Value]| {
//!         details_for(order.order_id)
//!     })));
//! ```
//!
//! ## Schema-less mapping
//!
//! ```ignore
//! let json = DynamicMapper::new().map(&mut row)?;
//! assert_eq!(json["Category"]["CategoryName"], "Beverages");
//! ```
//!
//! A mapper is single-threaded: it caches its tree in plain cells and must not be shared
//! across threads.

mod collection;
mod context;
mod convert;
mod error;
mod mapper;
mod metadata;
mod node;
mod path;
mod row;
mod tree;
mod value;

pub use collection::{CollectionLoader, Include, LoadRequest, loader};
pub use context::{LogSink, Warning};
pub use convert::{Conversion, ConversionError};
pub use error::{Error, Result};
pub use mapper::{Cursor, DynamicMapper, Mapper};
pub use metadata::{
    Arg, Args, CollectionMember, ComplexMember, Constructor, DescriptorBuilder, Instance,
    Metadata, Param, ParamKind, Registry, ScalarMember, TypeDescriptor,
};
pub use path::SEPARATOR;
pub use row::{Field, Row, RowSet, RowSource};
pub use value::{EnumKind, FromValue, IntoValue, Kind, TypeMismatch, Value};
