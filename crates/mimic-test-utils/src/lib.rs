//! Testing utilities for the mimic workspace
//!
//! Shared fixtures (sample types with original implementations) and tracing
//! setup for tests.

#![allow(missing_docs)]

use mimic_reflect::{
    bool_type, int_type, string_type, Capability, TypeInfo, TypeRef, Value,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber honouring `RUST_LOG`; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Interface-heavy object graph: a car with an engine, a sealed plate and
/// collection-typed members
#[derive(Debug, Clone)]
pub struct Vehicles {
    pub engine: TypeRef,
    pub car: TypeRef,
    pub plate: TypeRef,
    pub registry: TypeRef,
    pub passengers: TypeRef,
}

pub fn vehicles() -> Vehicles {
    let engine = TypeInfo::interface("IEngine")
        .method("Power", int_type(), |m| m)
        .void_method("Start", |m| m)
        .property("Serial", string_type())
        .build();

    let plate = TypeInfo::class("Plate")
        .method("Number", string_type(), |m| {
            m.original(|_, _| Value::from("XYZ-123"))
        })
        .sealed()
        .build();

    let registry = TypeInfo::interface("IRegistry")
        .capability(Capability::Map {
            key: string_type().clone(),
            value: int_type().clone(),
        })
        .indexer(string_type(), int_type())
        .property("Count", int_type())
        .void_method("Add", |m| m.param(string_type()).param(int_type()))
        .method("ContainsKey", bool_type(), |m| m.param(string_type()))
        .build();

    let passengers = TypeInfo::interface("IPassengers")
        .capability(Capability::Sequence {
            item: string_type().clone(),
        })
        .property("Count", int_type())
        .void_method("Add", |m| m.param(string_type()))
        .build();

    let car = TypeInfo::interface("ICar")
        .property("Engine", &engine)
        .property("Name", string_type())
        .method("Speed", int_type(), |m| m)
        .method("Wheels", &TypeInfo::array_of(int_type(), 1), |m| m)
        .method("Grid", &TypeInfo::array_of(int_type(), 2), |m| m)
        .method("Plate", &plate, |m| m)
        .method("Registry", &registry, |m| m)
        .method("Passengers", &passengers, |m| m)
        .void_method("Honk", |m| m)
        .event("Crashed")
        .build();

    Vehicles {
        engine,
        car,
        plate,
        registry,
        passengers,
    }
}

/// Partially implemented class hierarchy
///
/// `Garage` is abstract: `Open` and `Keeper` have no implementation while
/// `Capacity`, `Name` and `Describe` run real code.
#[derive(Debug, Clone)]
pub struct Garages {
    pub keeper: TypeRef,
    pub garage: TypeRef,
}

pub fn garages() -> Garages {
    let keeper = TypeInfo::interface("IKeeper")
        .method("Shift", int_type(), |m| m)
        .build();

    let garage = TypeInfo::class("Garage")
        .constructor(|c| {
            c.param(string_type()).original(|instance, args| {
                if let (Some(this), Some(name)) = (instance, args.first()) {
                    this.set_field("name", name.clone());
                }
                Value::Null
            })
        })
        .method("Capacity", int_type(), |m| m.original(|_, _| Value::Int(12)))
        .method("Name", string_type(), |m| {
            m.original(|instance, _| {
                instance
                    .and_then(|o| o.field("name"))
                    .unwrap_or(Value::Null)
            })
        })
        .method("Describe", string_type(), |m| {
            m.original(|_, _| Value::from("a garage"))
        })
        .method("Open", bool_type(), |m| m.abstract_member())
        .method("Keeper", &keeper, |m| m.abstract_member())
        .property("Label", string_type())
        .build();

    Garages { keeper, garage }
}

/// Class with static members and a type initializer that counts its runs
#[derive(Debug, Clone)]
pub struct Clock {
    pub ty: TypeRef,
    pub initialized: Arc<AtomicUsize>,
}

impl Clock {
    #[must_use]
    pub fn init_count(&self) -> usize {
        self.initialized.load(Ordering::SeqCst)
    }
}

pub fn clock() -> Clock {
    let initialized = Arc::new(AtomicUsize::new(0));
    let counter = initialized.clone();
    let ty = TypeInfo::class("Clock")
        .static_constructor(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Value::Null
        })
        .method("Now", int_type(), |m| {
            m.static_member().original(|_, _| Value::Int(1_700_000_000))
        })
        .method("Zone", string_type(), |m| {
            m.static_member().original(|_, _| Value::from("UTC"))
        })
        .build();
    Clock { ty, initialized }
}
