//! Decides when an assignment is done from the job results seen so far.
//!
//! Every poll re-fetches the whole assignment, so the same stage result is
//! reported over and over. Results are kept in an append-only list of
//! distinct values. The pipeline always reports an intake result first, so
//! the assignment counts as finished once a second distinct result arrives,
//! and that second result is the outcome. Anything after it is ignored.

use crate::models::job::JobResult;

/// Number of distinct results that marks the assignment as finished.
pub const FINAL_RESULT_COUNT: usize = 2;

#[derive(Debug, Default)]
pub struct ConvergenceDetector {
    observed: Vec<JobResult>,
    outcome: Option<JobResult>,
}

impl ConvergenceDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a result. Returns the final outcome on the one call that
    /// finishes the assignment, `None` on every other call.
    pub fn observe(&mut self, result: Option<&JobResult>) -> Option<JobResult> {
        let result = result?;

        if self.observed.contains(result) {
            return None;
        }
        self.observed.push(result.clone());

        if self.outcome.is_some() || self.observed.len() < FINAL_RESULT_COUNT {
            return None;
        }

        self.outcome = Some(result.clone());
        self.outcome.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn outcome(&self) -> Option<&JobResult> {
        self.outcome.as_ref()
    }

    /// Distinct results in the order they were first seen.
    pub fn observed(&self) -> &[JobResult] {
        &self.observed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(message: &str) -> JobResult {
        JobResult {
            success: true,
            message: Some(message.to_string()),
            next_job_id: None,
        }
    }

    #[test]
    fn test_finalizes_on_second_distinct_result() {
        let (r1, r2) = (result("intake"), result("benign traffic"));
        let mut detector = ConvergenceDetector::new();

        assert_eq!(detector.observe(Some(&r1)), None);
        assert_eq!(detector.observe(Some(&r1)), None);
        assert_eq!(detector.observe(Some(&r2)), Some(r2.clone()));

        assert!(detector.is_finished());
        assert_eq!(detector.outcome(), Some(&r2));
        assert_eq!(detector.observed().len(), 2);
    }

    #[test]
    fn test_repeated_result_never_finalizes() {
        let r1 = result("intake");
        let mut detector = ConvergenceDetector::new();
        for _ in 0..3 {
            assert_eq!(detector.observe(Some(&r1)), None);
        }
        assert!(!detector.is_finished());
        assert_eq!(detector.observed(), &[r1]);
    }

    #[test]
    fn test_absent_results_are_ignored() {
        let mut detector = ConvergenceDetector::new();
        assert_eq!(detector.observe(None), None);
        assert_eq!(detector.observe(None), None);
        assert!(detector.observed().is_empty());
        assert!(!detector.is_finished());
    }

    #[test]
    fn test_reports_outcome_only_once() {
        let (r1, r2, r3) = (result("a"), result("b"), result("c"));
        let mut detector = ConvergenceDetector::new();
        detector.observe(Some(&r1));
        assert!(detector.observe(Some(&r2)).is_some());

        assert_eq!(detector.observe(Some(&r2)), None);
        assert_eq!(detector.observe(Some(&r3)), None);
        assert_eq!(detector.outcome(), Some(&r2));
        assert!(detector.is_finished());
    }

    #[test]
    fn test_fields_all_take_part_in_equality() {
        let base = result("same");
        let mut failed = base.clone();
        failed.success = false;
        let mut detector = ConvergenceDetector::new();
        detector.observe(Some(&base));
        assert_eq!(detector.observe(Some(&failed)), Some(failed));
    }
}
