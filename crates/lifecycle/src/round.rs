//! Per-round outcome data model.

/// Result of probing a single source during one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn is_failure(self) -> bool {
        matches!(self, Outcome::Failure)
    }
}

/// Ordered per-source outcomes produced by one validation round.
///
/// Sources absent from a round are untouched by that round's ledger update.
#[derive(Debug, Clone, Default)]
pub struct RoundResult {
    outcomes: Vec<(String, Outcome)>,
}

impl RoundResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one source outcome, preserving round order.
    pub fn record(&mut self, source: impl Into<String>, outcome: Outcome) {
        self.outcomes.push((source.into(), outcome));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Outcome)> {
        self.outcomes.iter().map(|(s, o)| (s.as_str(), *o))
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_failure()).count()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.len() - self.failure_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_order() {
        let mut round = RoundResult::new();
        round.record("a", Outcome::Success);
        round.record("b", Outcome::Failure);
        round.record("c", Outcome::Failure);

        assert_eq!(round.len(), 3);
        assert_eq!(round.success_count(), 1);
        assert_eq!(round.failure_count(), 2);
        let order: Vec<&str> = round.iter().map(|(s, _)| s).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_round() {
        let round = RoundResult::new();
        assert!(round.is_empty());
        assert_eq!(round.failure_count(), 0);
    }
}
