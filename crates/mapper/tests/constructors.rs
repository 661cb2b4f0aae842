//! Integration tests for constructor binding.

#![allow(missing_docs, clippy::float_cmp)]

mod common;

use common::{Address, Employee, Money, Point, Product, Shipment, northwind};
use omnia_mapper::{Error, Mapper, Row, RowSet, Value};

#[test]
fn binds_by_parameter_name() {
    let registry = northwind();
    let mut mapper = Mapper::new(&registry, "Point");

    let mut row = Row::new().with("y", 2).with("x", 1);
    let point: Point = mapper.map_as(&mut row).unwrap();

    assert_eq!(point, Point { x: 1, y: 2 });
}

#[test]
fn binds_by_position() {
    let registry = northwind();
    let mut mapper = Mapper::new(&registry, "Point");

    let mut row = Row::new().with("1", 20).with("0", 10);
    let point: Point = mapper.map_as(&mut row).unwrap();

    assert_eq!(point, Point { x: 10, y: 20 });
}

#[test]
fn nested_constructor_by_name() {
    let registry = northwind();
    let mut mapper = Mapper::new(&registry, "Product");

    let mut row = Row::new()
        .with("ProductID", 1)
        .with("ListPrice$amount", 18.0)
        .with("ListPrice$currency", "EUR");
    let product: Product = mapper.map_as(&mut row).unwrap();

    assert_eq!(
        product.list_price,
        Some(Money {
            amount: 18.0,
            currency: "EUR".to_string(),
        })
    );
}

#[test]
fn nested_constructor_by_position() {
    let registry = northwind();
    let mut mapper = Mapper::new(&registry, "Product");

    let mut rows = RowSet::new(["ProductID", "ListPrice$0", "ListPrice$1"])
        .row([Value::from(1), Value::from(19.5), Value::from("USD")])
        .row([Value::from(2), Value::Null, Value::Null]);

    let mapped = mapper.map_all(&mut rows).unwrap();
    let products: Vec<Product> =
        mapped.into_iter().map(|p| *p.downcast::<Product>().unwrap()).collect();

    assert_eq!(products[0].list_price.as_ref().unwrap().amount, 19.5);
    assert_eq!(products[0].list_price.as_ref().unwrap().currency, "USD");
    assert_eq!(products[1].list_price, None);
}

#[test]
fn object_parameter() {
    let registry = northwind();
    let mut mapper = Mapper::new(&registry, "Shipment");

    let mut row = Row::new()
        .with("destination$City", "Rotterdam")
        .with("destination$Country", "NL")
        .with("weight", 12.5);
    let shipment: Shipment = mapper.map_as(&mut row).unwrap();

    assert_eq!(
        shipment,
        Shipment {
            destination: Some(Address {
                city: "Rotterdam".to_string(),
                country: Some("NL".to_string()),
            }),
            weight: 12.5,
        }
    );
}

#[test]
fn object_parameter_by_position() {
    let registry = northwind();
    let mut mapper = Mapper::new(&registry, "Shipment");

    let mut rows = RowSet::new(["0$City", "1"])
        .row([Value::from("Lyon"), Value::from(3.0)])
        .row([Value::Null, Value::from(4.0)]);

    let first = mapper.map_all(&mut rows).unwrap();
    let shipments: Vec<Shipment> =
        first.into_iter().map(|s| *s.downcast::<Shipment>().unwrap()).collect();

    assert_eq!(shipments[0].destination.as_ref().unwrap().city, "Lyon");
    assert_eq!(shipments[0].weight, 3.0);
    assert_eq!(shipments[1].destination, None);
    assert_eq!(shipments[1].weight, 4.0);
}

#[test]
fn implicit_binding_count_mismatch() {
    let registry = northwind();
    let mut mapper = Mapper::new(&registry, "Point");

    let mut row = Row::new().with("x", 1).with("z", 2);
    let err = mapper.map(&mut row).unwrap_err();

    assert!(matches!(err, Error::ImplicitBinding { expected: 2, bound: 1, .. }));
    assert!(err.is_configuration());
}

#[test]
fn positional_arity_errors() {
    let registry = northwind();

    let mut row = Row::new().with("0", 1).with("1", 2).with("2", 3);
    let err = Mapper::new(&registry, "Point").map(&mut row).unwrap_err();
    assert!(matches!(err, Error::NoConstructor { arity: 3, .. }));

    let mut row = Row::new().with("0", 1).with("2", 3);
    let err = Mapper::new(&registry, "Point").map(&mut row).unwrap_err();
    assert!(matches!(err, Error::MissingParameter { index: 1, .. }));

    let mut row = Row::new().with("0", 1).with("1", 2);
    let err = Mapper::new(&registry, "Range").map(&mut row).unwrap_err();
    assert!(matches!(err, Error::AmbiguousConstructor { arity: 2, count: 2, .. }));
}

#[test]
fn duplicate_position() {
    let registry = northwind();
    let mut mapper = Mapper::new(&registry, "Shipment");

    let mut row = Row::new().with("0", 1).with("0$City", "Oslo");
    let err = mapper.map(&mut row).unwrap_err();

    assert!(matches!(err, Error::DuplicateParameter { index: 0, .. }));
}

#[test]
fn parameter_shape_mismatch() {
    let registry = northwind();
    let mut mapper = Mapper::new(&registry, "Shipment");

    let mut row = Row::new().with("0", "Oslo").with("1", 2.0);
    let err = mapper.map(&mut row).unwrap_err();

    assert!(matches!(err, Error::ParameterShape { index: 0, found: "column", .. }));
}

#[test]
fn default_constructor_when_names_do_not_bind() {
    let registry = northwind();

    // several constructors: named columns map to properties
    let mut row = Row::new().with("Low", 1).with("High", 9);
    let range: common::Range = Mapper::new(&registry, "Range").map_as(&mut row).unwrap();
    assert_eq!(range, common::Range { low: 1, high: 9 });
}

#[test]
fn argument_conversion() {
    let registry = northwind();
    let mut mapper = Mapper::new(&registry, "Point");

    let mut rows = RowSet::new(["x", "y"])
        .row([Value::from("5"), Value::from(6_i64)])
        .row([Value::from("five"), Value::from(6_i64)]);

    assert!(rows.advance());
    let point: Point = mapper.map_as(&mut rows).unwrap();
    assert_eq!(point, Point { x: 5, y: 6 });

    assert!(rows.advance());
    let err = mapper.map(&mut rows).unwrap_err();
    let Error::Construct { type_name, source } = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(type_name, "Point");
    assert!(matches!(**source, Error::Conversion(_)));
}

#[test]
fn null_argument_fails() {
    let registry = northwind();
    let mut mapper = Mapper::new(&registry, "Point");

    let mut row = Row::new().with("x", Value::Null).with("y", 2);
    let err = mapper.map(&mut row).unwrap_err();

    assert!(matches!(err, Error::Construct { .. }));
    assert!(!err.is_configuration());
}

#[test]
fn discriminator_selects_derived_constructor() {
    let registry = northwind();
    let mut mapper = Mapper::new(&registry, "Employee");

    let mut rows = RowSet::new(["EmployeeID", "LastName", "Title"])
        .row([Value::from(2), Value::from("Fuller"), Value::from("Manager")])
        .row([Value::from(1), Value::from("Davolio"), Value::from("Sales Rep")]);

    let employees: Vec<Employee> = mapper
        .map_all(&mut rows)
        .unwrap()
        .into_iter()
        .map(|e| *e.downcast::<Employee>().unwrap())
        .collect();

    assert_eq!(
        employees[0],
        Employee {
            employee_id: 2,
            last_name: "Fuller".to_string(),
            title: "Manager".to_string(),
            manager: true,
        }
    );
    assert!(!employees[1].manager);
    assert_eq!(employees[1].title, "Sales Rep");
}
