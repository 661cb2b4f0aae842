//! Common test fixtures shared across integration tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use chrono::NaiveDate;
use omnia_mapper::{Param, Registry, TypeDescriptor, Warning, value_enum};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

// Northwind-style types used across multiple test files

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Category {
    pub category_id: i32,
    pub category_name: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Address {
    pub city: String,
    pub country: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Supplier {
    pub supplier_id: i32,
    pub company_name: String,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Money {
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Product {
    pub product_id: i32,
    pub product_name: String,
    pub unit_price: f64,
    pub units_in_stock: i64,
    pub discontinued: bool,
    pub category: Option<Category>,
    pub supplier: Option<Supplier>,
    pub list_price: Option<Money>,
}

value_enum! {
    #[derive(Default)]
    pub enum OrderStatus {
        #[default]
        Pending = 0,
        Shipped = 1,
        Delivered = 2,
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Customer {
    pub customer_id: String,
    pub company_name: String,
    pub orders: Vec<Order>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Order {
    pub order_id: i32,
    pub customer_id: String,
    pub order_date: Option<NaiveDate>,
    pub status: OrderStatus,
    pub freight: f64,
    pub customer: Option<Customer>,
    pub details: Vec<OrderDetail>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct OrderDetail {
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shipment {
    pub destination: Option<Address>,
    pub weight: f64,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Range {
    pub low: i32,
    pub high: i32,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Employee {
    pub employee_id: i32,
    pub last_name: String,
    pub title: String,
    pub manager: bool,
}

/// Registry describing every fixture type.
pub fn northwind() -> Registry {
    Registry::new()
        .with(
            TypeDescriptor::builder::<Category>("Category")
                .default_constructor()
                .scalar("CategoryID", |c| &mut c.category_id)
                .scalar("CategoryName", |c| &mut c.category_name)
                .scalar("Description", |c| &mut c.description)
                .identity(&["CategoryID"])
                .build(),
        )
        .with(
            TypeDescriptor::builder::<Address>("Address")
                .default_constructor()
                .scalar("City", |a| &mut a.city)
                .scalar("Country", |a| &mut a.country)
                .build(),
        )
        .with(
            TypeDescriptor::builder::<Supplier>("Supplier")
                .default_constructor()
                .scalar("SupplierID", |s| &mut s.supplier_id)
                .scalar("CompanyName", |s| &mut s.company_name)
                .complex("Address", "Address", |s| &mut s.address)
                .build(),
        )
        .with(
            TypeDescriptor::builder::<Money>("Money")
                .constructor(
                    vec![Param::scalar::<f64>("amount"), Param::scalar::<String>("currency")],
                    |args| {
                        Ok(Money {
                            amount: args.value()?,
                            currency: args.value()?,
                        })
                    },
                )
                .build(),
        )
        .with(
            TypeDescriptor::builder::<Product>("Product")
                .default_constructor()
                .scalar("ProductID", |p| &mut p.product_id)
                .scalar("ProductName", |p| &mut p.product_name)
                .scalar("UnitPrice", |p| &mut p.unit_price)
                .scalar("UnitsInStock", |p| &mut p.units_in_stock)
                .scalar("Discontinued", |p| &mut p.discontinued)
                .complex("Category", "Category", |p| &mut p.category)
                .complex("Supplier", "Supplier", |p| &mut p.supplier)
                .complex("ListPrice", "Money", |p| &mut p.list_price)
                .identity(&["ProductID"])
                .build(),
        )
        .with(
            TypeDescriptor::builder::<Customer>("Customer")
                .default_constructor()
                .scalar("CustomerID", |c| &mut c.customer_id)
                .scalar("CompanyName", |c| &mut c.company_name)
                .collection("Orders", "Order", |c| &mut c.orders)
                .identity(&["CustomerID"])
                .build(),
        )
        .with(
            TypeDescriptor::builder::<Order>("Order")
                .default_constructor()
                .scalar("OrderID", |o| &mut o.order_id)
                .scalar("CustomerID", |o| &mut o.customer_id)
                .scalar("OrderDate", |o| &mut o.order_date)
                .scalar("Status", |o| &mut o.status)
                .scalar("Freight", |o| &mut o.freight)
                .complex("Customer", "Customer", |o| &mut o.customer)
                .reciprocal(
                    "OrderDetails",
                    "OrderDetail",
                    |o| &mut o.details,
                    |detail: &mut OrderDetail, order: &Order| detail.order_id = order.order_id,
                )
                .identity(&["OrderID"])
                .build(),
        )
        .with(
            TypeDescriptor::builder::<OrderDetail>("OrderDetail")
                .default_constructor()
                .scalar("OrderID", |d| &mut d.order_id)
                .scalar("ProductID", |d| &mut d.product_id)
                .scalar("Quantity", |d| &mut d.quantity)
                .identity(&["OrderID", "ProductID"])
                .build(),
        )
        .with(
            TypeDescriptor::builder::<Point>("Point")
                .constructor(vec![Param::scalar::<i32>("x"), Param::scalar::<i32>("y")], |args| {
                    Ok(Point {
                        x: args.value()?,
                        y: args.value()?,
                    })
                })
                .build(),
        )
        .with(
            TypeDescriptor::builder::<Shipment>("Shipment")
                .constructor(
                    vec![Param::complex("destination", "Address"), Param::scalar::<f64>("weight")],
                    |args| {
                        Ok(Shipment {
                            destination: args.object()?,
                            weight: args.value()?,
                        })
                    },
                )
                .build(),
        )
        .with(
            TypeDescriptor::builder::<Range>("Range")
                .default_constructor()
                .constructor(
                    vec![Param::scalar::<i32>("low"), Param::scalar::<i32>("high")],
                    |args| {
                        Ok(Range {
                            low: args.value()?,
                            high: args.value()?,
                        })
                    },
                )
                .constructor(
                    vec![Param::scalar::<i32>("high"), Param::scalar::<i32>("low")],
                    |args| {
                        let high = args.value()?;
                        Ok(Range { low: args.value()?, high })
                    },
                )
                .scalar("Low", |r| &mut r.low)
                .scalar("High", |r| &mut r.high)
                .build(),
        )
        .with(
            TypeDescriptor::builder::<Employee>("Employee")
                .default_constructor()
                .scalar("EmployeeID", |e| &mut e.employee_id)
                .scalar("LastName", |e| &mut e.last_name)
                .scalar("Title", |e| &mut e.title)
                .discriminator("Title")
                .derived("Manager", || Employee {
                    manager: true,
                    ..Employee::default()
                })
                .build(),
        )
}

/// Collects warnings raised by a mapper.
#[derive(Clone, Default)]
pub struct Warnings(Rc<RefCell<Vec<Warning>>>);

impl Warnings {
    pub fn sink(&self) -> impl Fn(&Warning) + 'static {
        let seen = Rc::clone(&self.0);
        move |warning: &Warning| seen.borrow_mut().push(warning.clone())
    }

    pub fn take(&self) -> Vec<Warning> {
        self.0.borrow_mut().drain(..).collect()
    }
}

/// Routes mapper logs to the test output.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("omnia_mapper=debug"))
        .with(fmt::layer().with_test_writer())
        .try_init();
}
