//! The dependency graph builder: turns package cache data, installed
//! state, and user requests into the search space the resolver walks
//! (§4.2).

pub mod builder;
pub mod element;
pub mod error;
pub mod graph;

pub use builder::{DependencyGraphBuilder, InitialState, UserRequestSpec};
pub use element::{
    AntiRelationElement, Element, ElementId, Importance, PenaltyKind, RelationElement,
    SynchronisationElement, UnsatisfiedElement, UserRequestElement, VersionChoice, VersionElement,
};
pub use error::{Error, Result};
pub use graph::ElementGraph;
