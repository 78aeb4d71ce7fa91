//! The capability set every iterator-tree node implements (:
//! "polymorphic over the capability set {Next, Contains, NextPath, Tag,
//! Size, Stats, SubIterators, Optimize, Reset, Close}").

use std::collections::HashMap;

use quad_store::CancellationToken;

use crate::error::IterResult;
use crate::reference::Ref;
use crate::source::QuadSource;
use crate::state::IterState;
use crate::stats::Stats;

/// A node in a lazily-evaluated iterator tree over store refs.
///
/// Every method that can touch a backend takes the same `source` and
/// `cancel` pair; most composite nodes (And, Or, Not,...) never use them
/// directly and just forward to their children, but the signature is
/// uniform across the whole tree so a caller never needs to know which
/// variant sits at a given node (unified lazy evaluation
/// primitives).
pub trait QIter: std::fmt::Debug {
    /// Advance to the next result in "pull" mode (Two-mode
    /// cursor). Returns `Ok(false)` once exhausted; the iterator then
    /// moves to [`IterState::Exhausted`] and further `next` calls keep
    /// returning `Ok(false)` until [`QIter::reset`].
    fn next(&mut self, source: &dyn QuadSource, cancel: &CancellationToken) -> IterResult<bool>;

    /// The result `next` or a successful `contains` most recently set,
    /// or `None` before the first call or after exhaustion.
    fn result(&self) -> Option<Ref>;

    /// Probe mode (Two-mode cursor): test whether `v` is a
    /// member of this iterator's result set without enumerating up to
    /// it. On success, `result` is set to `v` (so a probing `And`
    /// parent can still read back what matched).
    fn contains(&mut self, source: &dyn QuadSource, cancel: &CancellationToken, v: Ref) -> IterResult<bool>;

    /// After a successful `next`, yield an additional tag-binding
    /// combination that produces the *same* top-level `result`. Returns
    /// `false` when no further combinations exist for the current
    /// result; a subsequent `next` moves to the
    /// next result as usual.
    fn next_path(&mut self, source: &dyn QuadSource, cancel: &CancellationToken) -> IterResult<bool> {
        let _ = (source, cancel);
        Ok(false)
    }

    /// Collect this node's tag bindings (Tagging) together
    /// with every descendant's, into `out`.
    fn tag_results(&self, out: &mut HashMap<String, Ref>);

    /// Cost/size self-report (Statistics).
    fn stats(&self, source: &dyn QuadSource) -> Stats;

    /// This node's direct children, for optimizer traversal and
    /// diagnostics (SubIterators).
    fn sub_iterators(&self) -> Vec<&dyn QIter> {
        Vec::new()
    }

    /// Return to [`IterState::Fresh`] as if never advanced.
    fn reset(&mut self);

    /// Release backend resources (Close). Idempotent; must
    /// be safe to call on any exit path, cancellation included.
    fn close(&mut self) -> IterResult<()> {
        Ok(())
    }

    /// The error, if any, that caused the most recent `next`/`contains`
    /// to fail (Iterators expose a terminal `err` reachable
    /// after `next` returns false).
    fn err(&self) -> Option<&crate::error::IterError> {
        None
    }

    /// Current lifecycle state.
    fn state(&self) -> IterState;
}

/// An owned, dynamically-dispatched iterator-tree node. Every combinator
/// (`And`, `Or`,...) is built over `Box<dyn QIter>` children so the tree
/// can mix variants freely.
pub type BoxedIter = Box<dyn QIter>;
