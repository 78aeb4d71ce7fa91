//! Lowers a [`Shape`] tree to a [`BoxedIter`] (Build): the
//! inverse of the Shape DSL's backend independence — this is the one place
//! that actually touches [`QuadSource`].

use std::collections::HashMap;

use iter_tree::{
    And, BoxedIter, Comparison, Fixed as FixedIter, HasA, IterError, IterResult, IterState, LinksTo, Not, Or, QIter,
    QuadSource, Ref, Save as SaveIter, Stats,
};
use quad_store::CancellationToken;
use regex::Regex;

use crate::filter::{glob_to_regex, ValueFilter};
use crate::shape::Shape;

/// Lower `shape` into an evaluable iterator tree against `source`.
///
/// Composites ([`Shape::Composite`]) are simplified (possibly repeatedly)
/// until a plain variant is reached (Simplify composites).
pub fn build_iterator(shape: &Shape, source: &dyn QuadSource) -> IterResult<BoxedIter> {
    match shape {
        Shape::AllNodes => Ok(Box::new(iter_tree::All::new(source, iter_tree::Relation::Nodes)?)),
        Shape::AllQuads => Ok(Box::new(iter_tree::All::new(source, iter_tree::Relation::Quads)?)),
        Shape::Quads(filters) => build_quads(filters, source),
        Shape::NodesFrom { dir, quads } => {
            let quads_iter = build_iterator(quads, source)?;
            Ok(Box::new(HasA::new(quads_iter, *dir)))
        }
        Shape::QuadsAction {
            result_dir,
            save,
            filter,
        } => build_quads_action(*result_dir, save, filter, source),
        Shape::Filter { from, filters } => build_filter(from, filters, source),
        Shape::Save { from, tags } => {
            let from_iter = build_iterator(from, source)?;
            Ok(Box::new(SaveIter::new(from_iter, tags.clone())))
        }
        Shape::Intersect(members) => {
            let children = members
                .iter()
                .map(|m| build_iterator(m, source))
                .collect::<IterResult<Vec<_>>>()?;
            Ok(Box::new(And::new(children, source)))
        }
        Shape::Union(members) => {
            let children = members
                .iter()
                .map(|m| build_iterator(m, source))
                .collect::<IterResult<Vec<_>>>()?;
            Ok(Box::new(Or::new(children)))
        }
        Shape::Except { from, minus } => {
            let universe = build_iterator(from, source)?;
            let child = build_iterator(minus, source)?;
            Ok(Box::new(Not::new(universe, child)))
        }
        Shape::Page { from, skip, limit } => {
            let from_iter = build_iterator(from, source)?;
            Ok(Box::new(PageIter::new(from_iter, *skip, *limit)))
        }
        Shape::Fixed(items) => Ok(Box::new(FixedIter::new(items.clone()))),
        Shape::Composite(c) => build_iterator(&c.simplify(), source),
    }
}

fn build_quads(filters: &[crate::filter::QuadFilter], source: &dyn QuadSource) -> IterResult<BoxedIter> {
    if filters.is_empty() {
        return Ok(Box::new(iter_tree::All::new(source, iter_tree::Relation::Quads)?));
    }
    let mut children = Vec::with_capacity(filters.len());
    for f in filters {
        let values_iter = build_iterator(&f.values, source)?;
        children.push(Box::new(LinksTo::new(values_iter, f.dir)) as BoxedIter);
    }
    if children.len() == 1 {
        Ok(children.into_iter().next().expect("len == 1"))
    } else {
        Ok(Box::new(And::new(children, source)))
    }
}

fn build_quads_action(
    result_dir: quad_model::Direction,
    save: &HashMap<quad_model::Direction, Vec<String>>,
    filter: &HashMap<quad_model::Direction, Ref>,
    source: &dyn QuadSource,
) -> IterResult<BoxedIter> {
    let base: BoxedIter = if filter.is_empty() {
        Box::new(iter_tree::All::new(source, iter_tree::Relation::Quads)?)
    } else {
        let mut children = Vec::with_capacity(filter.len());
        for (dir, r) in filter {
            let values_iter: BoxedIter = Box::new(FixedIter::single(*r));
            children.push(Box::new(LinksTo::new(values_iter, *dir)) as BoxedIter);
        }
        if children.len() == 1 {
            children.into_iter().next().expect("len == 1")
        } else {
            Box::new(And::new(children, source))
        }
    };
    let tagged = if save.is_empty() {
        base
    } else {
        Box::new(ComponentTag::new(base, save.clone()))
    };
    Ok(Box::new(HasA::new(tagged, result_dir)))
}

fn build_filter(from: &Shape, filters: &[ValueFilter], source: &dyn QuadSource) -> IterResult<BoxedIter> {
    let mut iter = build_iterator(from, source)?;
    for f in filters {
        iter = match f {
            ValueFilter::Comparison { op, literal } => Box::new(Comparison::new(iter, *op, literal.clone())),
            ValueFilter::Wildcard { pattern } => {
                let re = Regex::new(&glob_to_regex(pattern)).map_err(|e| IterError::Backend(e.to_string()))?;
                Box::new(RegexFilter::new(iter, re, false))
            }
            ValueFilter::Regexp { re, matches_refs } => {
                let compiled = Regex::new(re).map_err(|e| IterError::Backend(e.to_string()))?;
                Box::new(RegexFilter::new(iter, compiled, *matches_refs))
            }
        };
    }
    Ok(iter)
}

/// Passes a quad-relation child through unchanged but additionally binds,
/// per direction, a set of tag names to that direction's resolved
/// component (`QuadsAction.save`). Sits between the constant
/// filter and the final [`HasA`] projection so non-result directions stay
/// tagged even though only one direction's value is ultimately emitted.
///
/// Not one of the ten canonical iterator-tree variants: it is an
/// implementation detail of lowering `QuadsAction`, not a shape a caller
/// can construct directly.
#[derive(Debug)]
struct ComponentTag {
    child: BoxedIter,
    by_dir: HashMap<quad_model::Direction, Vec<String>>,
}

impl ComponentTag {
    fn new(child: BoxedIter, by_dir: HashMap<quad_model::Direction, Vec<String>>) -> Self {
        ComponentTag { child, by_dir }
    }
}

impl QIter for ComponentTag {
    fn next(&mut self, source: &dyn QuadSource, cancel: &CancellationToken) -> IterResult<bool> {
        self.child.next(source, cancel)
    }

    fn result(&self) -> Option<Ref> {
        self.child.result()
    }

    fn contains(&mut self, source: &dyn QuadSource, cancel: &CancellationToken, v: Ref) -> IterResult<bool> {
        self.child.contains(source, cancel, v)
    }

    fn next_path(&mut self, source: &dyn QuadSource, cancel: &CancellationToken) -> IterResult<bool> {
        self.child.next_path(source, cancel)
    }

    fn tag_results(&self, out: &mut HashMap<String, Ref>) {
        if let Some(quad) = self.result().and_then(|r| r.as_quad()) {
            for (dir, names) in &self.by_dir {
                if let Some(component) = quad.component(*dir) {
                    for name in names {
                        out.insert(name.clone(), Ref::Node(component));
                    }
                }
            }
        }
        self.child.tag_results(out);
    }

    fn stats(&self, source: &dyn QuadSource) -> Stats {
        self.child.stats(source)
    }

    fn sub_iterators(&self) -> Vec<&dyn QIter> {
        vec![self.child.as_ref()]
    }

    fn reset(&mut self) {
        self.child.reset();
    }

    fn close(&mut self) -> IterResult<()> {
        self.child.close()
    }

    fn err(&self) -> Option<&IterError> {
        self.child.err()
    }

    fn state(&self) -> IterState {
        self.child.state()
    }
}

/// A skip/limit window over `child`'s enumeration order (Page
/// application rule). `contains` has no window-aware meaning — pagination
/// is a property of enumeration order, not membership — so it forwards to
/// `child` unchanged.
#[derive(Debug)]
struct PageIter {
    child: BoxedIter,
    skip: u64,
    limit: u64,
    skipped: u64,
    yielded: u64,
    skip_done: bool,
}

impl PageIter {
    fn new(child: BoxedIter, skip: u64, limit: u64) -> Self {
        PageIter {
            child,
            skip,
            limit,
            skipped: 0,
            yielded: 0,
            skip_done: false,
        }
    }
}

impl QIter for PageIter {
    fn next(&mut self, source: &dyn QuadSource, cancel: &CancellationToken) -> IterResult<bool> {
        if !self.skip_done {
            while self.skipped < self.skip {
                cancel.check()?;
                if !self.child.next(source, cancel)? {
                    self.skip_done = true;
                    return Ok(false);
                }
                self.skipped += 1;
            }
            self.skip_done = true;
        }
        if self.yielded >= self.limit {
            return Ok(false);
        }
        cancel.check()?;
        if self.child.next(source, cancel)? {
            self.yielded += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn result(&self) -> Option<Ref> {
        self.child.result()
    }

    fn contains(&mut self, source: &dyn QuadSource, cancel: &CancellationToken, v: Ref) -> IterResult<bool> {
        self.child.contains(source, cancel, v)
    }

    fn tag_results(&self, out: &mut HashMap<String, Ref>) {
        self.child.tag_results(out);
    }

    fn stats(&self, source: &dyn QuadSource) -> Stats {
        let child = self.child.stats(source);
        let size = if child.size.value >= 0 {
            iter_tree::SizeEstimate {
                value: (child.size.value - self.skip as i64).max(0).min(self.limit as i64),
                exact: false,
            }
        } else {
            iter_tree::SizeEstimate::unknown()
        };
        Stats {
            contains_cost: child.contains_cost,
            next_cost: child.next_cost,
            size,
        }
    }

    fn sub_iterators(&self) -> Vec<&dyn QIter> {
        vec![self.child.as_ref()]
    }

    fn reset(&mut self) {
        self.child.reset();
        self.skipped = 0;
        self.yielded = 0;
        self.skip_done = false;
    }

    fn close(&mut self) -> IterResult<()> {
        self.child.close()
    }

    fn err(&self) -> Option<&IterError> {
        self.child.err()
    }

    fn state(&self) -> IterState {
        self.child.state()
    }
}

/// Filters a node-relation child by a compiled regex (`Wildcard`/`Regexp`), matching either the resolved value's lexical form
/// or the ref's opaque string form depending on `matches_refs`.
#[derive(Debug)]
struct RegexFilter {
    child: BoxedIter,
    regex: Regex,
    matches_refs: bool,
}

impl RegexFilter {
    fn new(child: BoxedIter, regex: Regex, matches_refs: bool) -> Self {
        RegexFilter {
            child,
            regex,
            matches_refs,
        }
    }

    fn satisfies(&self, source: &dyn QuadSource, v: Ref) -> IterResult<bool> {
        if self.matches_refs {
            return Ok(self.regex.is_match(&v.to_string()));
        }
        let Some(node) = v.as_node() else {
            return Ok(false);
        };
        let Some(value) = source.name_of(node)? else {
            return Ok(false);
        };
        Ok(value.lexical_form().is_some_and(|s| self.regex.is_match(s)))
    }
}

impl QIter for RegexFilter {
    fn next(&mut self, source: &dyn QuadSource, cancel: &CancellationToken) -> IterResult<bool> {
        loop {
            cancel.check()?;
            if !self.child.next(source, cancel)? {
                return Ok(false);
            }
            let candidate = self.child.result().expect("next just returned true");
            if self.satisfies(source, candidate)? {
                return Ok(true);
            }
        }
    }

    fn result(&self) -> Option<Ref> {
        self.child.result()
    }

    fn contains(&mut self, source: &dyn QuadSource, cancel: &CancellationToken, v: Ref) -> IterResult<bool> {
        cancel.check()?;
        if !self.satisfies(source, v)? {
            return Ok(false);
        }
        self.child.contains(source, cancel, v)
    }

    fn tag_results(&self, out: &mut HashMap<String, Ref>) {
        self.child.tag_results(out);
    }

    fn stats(&self, source: &dyn QuadSource) -> Stats {
        let child = self.child.stats(source);
        let size = if child.size.value >= 0 {
            iter_tree::SizeEstimate::approximate((child.size.value / 2).max(0) as u64)
        } else {
            iter_tree::SizeEstimate::unknown()
        };
        Stats {
            contains_cost: child.contains_cost.saturating_add(1),
            next_cost: child.next_cost.saturating_add(1),
            size,
        }
    }

    fn sub_iterators(&self) -> Vec<&dyn QIter> {
        vec![self.child.as_ref()]
    }

    fn reset(&mut self) {
        self.child.reset();
    }

    fn close(&mut self) -> IterResult<()> {
        self.child.close()
    }

    fn err(&self) -> Option<&IterError> {
        self.child.err()
    }

    fn state(&self) -> IterState {
        self.child.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quad_model::{Direction, Quad, Value};
    use quad_store::{CancellationToken, Delta, InMemoryBackend, NodeRef, QuadStore, StoreOptions};

    fn store() -> QuadStore<InMemoryBackend> {
        let s = QuadStore::open(InMemoryBackend::new(), StoreOptions::default()).unwrap();
        s.apply_deltas(&[
            Delta::add(Quad::new(Value::iri("a"), Value::iri("follows"), Value::iri("b"), None)),
            Delta::add(Quad::new(Value::iri("b"), Value::iri("follows"), Value::iri("c"), None)),
        ])
            .unwrap();
        s
    }

    #[test]
    fn quads_with_single_filter_lowers_to_linksto() {
        let s = store();
        let token = CancellationToken::new();
        let a = Ref::Node(NodeRef::new(Value::iri("a").hash()));
        let shape = Shape::quads_where(Direction::Subject, Shape::Fixed(vec![a]));
        let mut iter = build_iterator(&shape, &s).unwrap();
        let mut count = 0;
        while iter.next(&s, &token).unwrap() {
            count += 1;
        }
        assert_eq!(count, 1);
    }

    #[test]
    fn nodes_from_projects_object_of_matching_quads() {
        let s = store();
        let token = CancellationToken::new();
        let a = Ref::Node(NodeRef::new(Value::iri("a").hash()));
        let quads = Shape::quads_where(Direction::Subject, Shape::Fixed(vec![a]));
        let shape = Shape::NodesFrom {
            dir: Direction::Object,
            quads: Box::new(quads),
        };
        let mut iter = build_iterator(&shape, &s).unwrap();
        assert!(iter.next(&s, &token).unwrap());
        let b = s.value_of(&Value::iri("b")).unwrap().unwrap();
        assert_eq!(iter.result(), Some(Ref::Node(b)));
    }

    #[test]
    fn quads_action_tags_non_result_direction() {
        let s = store();
        let token = CancellationToken::new();
        let mut save = HashMap::new();
        save.insert(Direction::Subject, vec!["who".to_string()]);
        let shape = Shape::QuadsAction {
            result_dir: Direction::Object,
            save,
            filter: HashMap::new(),
        };
        let mut iter = build_iterator(&shape, &s).unwrap();
        let mut seen_tags = 0;
        while iter.next(&s, &token).unwrap() {
            let mut out = HashMap::new();
            iter.tag_results(&mut out);
            if out.contains_key("who") {
                seen_tags += 1;
            }
        }
        assert_eq!(seen_tags, 2);
    }

    #[test]
    fn page_skips_then_limits() {
        let s = store();
        let token = CancellationToken::new();
        let shape = Shape::AllQuads.paged(1, 1);
        let mut iter = build_iterator(&shape, &s).unwrap();
        let mut count = 0;
        while iter.next(&s, &token).unwrap() {
            count += 1;
        }
        assert_eq!(count, 1);
    }

    #[test]
    fn wildcard_filter_matches_lexical_prefix() {
        let s = store();
        let token = CancellationToken::new();
        let shape = Shape::AllNodes.filtered(ValueFilter::Wildcard {
            pattern: "follow*".to_string(),
        });
        let mut iter = build_iterator(&shape, &s).unwrap();
        let mut count = 0;
        while iter.next(&s, &token).unwrap() {
            count += 1;
        }
        assert_eq!(count, 1);
    }
}
