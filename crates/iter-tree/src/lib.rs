//! The composable lazy iterator tree over quad-store refs.
//!
//! Ten variants (`All`, `Fixed`, `And`, `Or`, `Not`, `HasA`, `LinksTo`,
//! `Comparison`, `Optional`, `Materialize`, `Save`) share one capability
//! set through the [`QIter`] trait: Next/Contains cursor duality, optional
//! `NextPath` multi-binding, tag projection, stats for the optimizer, and
//! an explicit Fresh/Iterating/Exhausted/Closed state machine.
//!
//! This crate knows how to evaluate a tree once one is built; it does not
//! know how to build one from a declarative query — that is `shapes`'
//! job, which depends on this crate and re-exports it.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod all;
mod and;
mod comparison;
mod error;
mod fixed;
mod hasa;
mod iterator;
mod linksto;
mod materialize;
mod not;
mod optional;
mod reference;
mod save;
mod source;
mod state;
mod stats;
mod tags;

pub use all::{All, Relation};
pub use and::And;
pub use comparison::{compare_values, CompOp, Comparison};
pub use error::{IterError, IterResult};
pub use fixed::Fixed;
pub use hasa::HasA;
pub use iterator::{BoxedIter, QIter};
pub use linksto::{LinksTo, FANOUT_ESTIMATE};
pub use materialize::Materialize;
pub use not::Not;
pub use optional::Optional;
pub use reference::Ref;
pub use save::Save;
pub use source::QuadSource;
pub use state::IterState;
pub use stats::{SizeEstimate, Stats};
pub use tags::TagSet;

#[cfg(test)]
mod tests {
    use super::*;
    use quad_store::{InMemoryBackend, QuadStore, StoreOptions};

    #[test]
    fn module_compiles() {
        let store = QuadStore::open(InMemoryBackend::new(), StoreOptions::default()).unwrap();
        let all = All::new(&store, Relation::Nodes).unwrap();
        assert_eq!(all.state(), IterState::Fresh);
    }
}
