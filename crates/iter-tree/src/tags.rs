//! Query projection bindings (Tagging): "each iterator carries
//! (a) free tags assigned to the current result, (b) fixed tags mapping a
//! name to a constant value".

use std::collections::HashMap;

use crate::reference::Ref;

/// The tag bindings one iterator node contributes. `free` names are bound
/// to whatever `result` currently holds; `fixed` names are bound to a
/// constant regardless of the current result (used by
/// [`crate::optional::Optional`] to record "this tag did not match" as a
/// sentinel, and by any shape that wants to project a constant alongside a
/// live result).
#[derive(Debug, Clone, Default)]
pub struct TagSet {
    /// Names bound to the iterator's current result.
    pub free: Vec<String>,
    /// Names bound to a fixed constant.
    pub fixed: HashMap<String, Ref>,
}

impl TagSet {
    /// An empty tag set.
    pub fn new() -> Self {
        TagSet::default()
    }

    /// A tag set with one free name.
    pub fn single(name: impl Into<String>) -> Self {
        TagSet {
            free: vec![name.into()],
            fixed: HashMap::new(),
        }
    }

    /// Write this node's contribution into `out`, given its current
    /// result (if any). Free tags are skipped while there is no current
    /// result; fixed tags are always written.
    pub fn populate(&self, current: Option<Ref>, out: &mut HashMap<String, Ref>) {
        if let Some(r) = current {
            for name in &self.free {
                out.insert(name.clone(), r);
            }
        }
        for (name, r) in &self.fixed {
            out.insert(name.clone(), *r);
        }
    }
}
