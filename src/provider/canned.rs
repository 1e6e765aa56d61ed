use super::{DiagnosticsProvider, ProviderError};
use crate::violation::{Violation, ViolationKind};
use std::collections::{HashMap, VecDeque};

/// In-memory provider returning pre-recorded violations.
///
/// Each kind holds a queue of analysis results; every call pops the next one,
/// and an exhausted queue reports no violations (a clean re-analysis).
#[derive(Debug, Default, Clone)]
pub struct CannedProvider {
    passes: HashMap<ViolationKind, VecDeque<Vec<Violation>>>,
    calls: Vec<ViolationKind>,
}

impl CannedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one analysis result. Violations are grouped by their own kind.
    pub fn with(mut self, violations: impl IntoIterator<Item = Violation>) -> Self {
        let mut by_kind: HashMap<ViolationKind, Vec<Violation>> = HashMap::new();
        for violation in violations {
            by_kind.entry(violation.kind).or_default().push(violation);
        }
        for (kind, batch) in by_kind {
            self.passes.entry(kind).or_default().push_back(batch);
        }
        self
    }

    /// Kinds requested so far, in call order.
    pub fn calls(&self) -> &[ViolationKind] {
        &self.calls
    }
}

impl DiagnosticsProvider for CannedProvider {
    fn violations(&mut self, kind: ViolationKind) -> Result<Vec<Violation>, ProviderError> {
        self.calls.push(kind);
        Ok(self
            .passes
            .get_mut(&kind)
            .and_then(VecDeque::pop_front)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passes_are_consumed_in_order() {
        let mut provider = CannedProvider::new()
            .with([Violation::new(ViolationKind::TrailingWhitespace, "A.cs", 1, 1)])
            .with([Violation::new(ViolationKind::TrailingWhitespace, "A.cs", 5, 1)]);

        let first = provider.violations(ViolationKind::TrailingWhitespace).unwrap();
        let second = provider.violations(ViolationKind::TrailingWhitespace).unwrap();
        let third = provider.violations(ViolationKind::TrailingWhitespace).unwrap();

        assert_eq!(first[0].span.start, 1);
        assert_eq!(second[0].span.start, 5);
        assert!(third.is_empty());
        assert_eq!(provider.calls().len(), 3);
    }

    #[test]
    fn test_unknown_kind_is_empty() {
        let mut provider = CannedProvider::new();
        assert!(provider.violations(ViolationKind::UseEmptyConstant).unwrap().is_empty());
    }
}
