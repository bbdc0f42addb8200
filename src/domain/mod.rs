//! Domain model: value objects, aggregates, pricing rules and persistence ports.
pub mod aggregates;
pub mod events;
pub mod pricing;
pub mod repository;
pub mod value_objects;
