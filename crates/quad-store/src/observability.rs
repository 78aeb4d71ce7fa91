//! Structured logging and metrics for store operations, the ambient
//! observability layer sitting alongside the core quad-store contract.

use std::time::Instant;

/// Every operation on [`crate::QuadStore`]/[`crate::QuadWriter`] worth its
/// own counter and latency histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    /// `QuadStore::value_of`.
    ValueOf,
    /// `QuadStore::name_of`.
    NameOf,
    /// `QuadStore::quad`.
    Quad,
    /// `QuadStore::quad_iterator_size`.
    QuadIteratorSize,
    /// `QuadStore::nodes_all`.
    NodesAll,
    /// `QuadStore::quads_all`.
    QuadsAll,
    /// `QuadStore::apply_deltas`.
    ApplyDeltas,
    /// `QuadStore::stats`.
    Stats,
    /// `QuadWriter::add_quad_set`.
    AddQuadSet,
    /// `QuadWriter::remove_node`.
    RemoveNode,
}

impl OperationType {
    /// The dotted metric namespace for this operation, e.g.
    /// `quad_store.apply_deltas`.
    pub fn metric_name(&self) -> &'static str {
        match self {
            OperationType::ValueOf => "quad_store.value_of",
            OperationType::NameOf => "quad_store.name_of",
            OperationType::Quad => "quad_store.quad",
            OperationType::QuadIteratorSize => "quad_store.quad_iterator_size",
            OperationType::NodesAll => "quad_store.nodes_all",
            OperationType::QuadsAll => "quad_store.quads_all",
            OperationType::ApplyDeltas => "quad_store.apply_deltas",
            OperationType::Stats => "quad_store.stats",
            OperationType::AddQuadSet => "quad_store.add_quad_set",
            OperationType::RemoveNode => "quad_store.remove_node",
        }
    }

    /// Counter name for successful calls.
    pub fn counter_name(&self) -> String {
        format!("{}.count", self.metric_name())
    }

    /// Histogram name for call latency, in milliseconds.
    pub fn latency_name(&self) -> String {
        format!("{}.latency_ms", self.metric_name())
    }

    /// Counter name for failed calls.
    pub fn error_name(&self) -> String {
        format!("{}.errors", self.metric_name())
    }
}

/// Run `f`, recording its latency and outcome under `op`'s metric names,
/// and logging a warning on failure.
pub fn track_operation<T, E>(op: OperationType, f: impl FnOnce() -> Result<T, E>) -> Result<T, E>
where
E: std::fmt::Display,
{
    let start = Instant::now();
    let result = f();
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    metrics::histogram!(op.latency_name()).record(elapsed_ms);

    match &result {
        Ok(_) => {
            metrics::counter!(op.counter_name()).increment(1);
        }
        Err(e) => {
            metrics::counter!(op.error_name()).increment(1);
            tracing::warn!(operation = op.metric_name(), error = %e, "store operation failed");
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_are_namespaced() {
        assert_eq!(OperationType::ApplyDeltas.metric_name(), "quad_store.apply_deltas");
        assert_eq!(OperationType::ApplyDeltas.counter_name(), "quad_store.apply_deltas.count");
        assert_eq!(OperationType::ApplyDeltas.error_name(), "quad_store.apply_deltas.errors");
    }

    #[test]
    fn track_operation_passes_through_ok() {
        let result: Result<i32, String> = track_operation(OperationType::ValueOf, || Ok(42));
        assert_eq!(result, Ok(42));
    }

    #[test]
    fn track_operation_passes_through_err() {
        let result: Result<i32, String> = track_operation(OperationType::ValueOf, || Err("boom".to_string()));
        assert_eq!(result, Err("boom".to_string()));
    }
}
