//! Type definitions for assessment results.
//!
//! These types are what renderers consume: every literal needed for display
//! is already embedded in `note`, so nothing has to be re-derived downstream.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// VERDICT TYPES
// =============================================================================

/// Outcome of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Passed,
    Failed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Passed => "PASSED",
            Status::Failed => "FAILED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity attached to a verdict, independent of pass/fail.
///
/// Ordering puts `High` first, so an ascending sort lists the most
/// important rows at the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "HIGH" => Ok(Priority::High),
            "MEDIUM" => Ok(Priority::Medium),
            "LOW" => Ok(Priority::Low),
            other => Err(format!("unknown priority '{}' (use HIGH, MEDIUM or LOW)", other)),
        }
    }
}

/// Verdict for one parameter or parameter group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Parameter (or `a/b` group) the rule assessed
    pub parameter: String,
    pub status: Status,
    pub priority: Priority,
    /// Explanation with every literal needed for display
    pub note: String,
    /// Normalized current value(s), rendered
    pub current_value: Option<String>,
    /// Recommended value or range, when the rule computes one
    pub recommended_value: Option<String>,
}

impl CheckResult {
    pub fn passed(parameter: &str, priority: Priority, note: impl Into<String>) -> Self {
        Self::new(parameter, Status::Passed, priority, note)
    }

    pub fn failed(parameter: &str, priority: Priority, note: impl Into<String>) -> Self {
        Self::new(parameter, Status::Failed, priority, note)
    }

    fn new(parameter: &str, status: Status, priority: Priority, note: impl Into<String>) -> Self {
        Self {
            parameter: parameter.to_string(),
            status,
            priority,
            note: note.into(),
            current_value: None,
            recommended_value: None,
        }
    }

    pub fn current(mut self, value: impl Into<String>) -> Self {
        self.current_value = Some(value.into());
        self
    }

    pub fn recommended(mut self, value: impl Into<String>) -> Self {
        self.recommended_value = Some(value.into());
        self
    }
}

// =============================================================================
// RESULT SET
// =============================================================================

/// How `filter_by_parameter` compares names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameMatch {
    Exact,
    #[default]
    Substring,
}

/// Ordered results of one run, in catalog declaration order.
///
/// Filters never mutate the set; they return a derived subsequence that
/// keeps the original relative order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    results: Vec<CheckResult>,
}

impl ResultSet {
    pub fn new(results: Vec<CheckResult>) -> Self {
        Self { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CheckResult> {
        self.results.iter()
    }

    /// First result for an exact parameter name.
    pub fn get(&self, parameter: &str) -> Option<&CheckResult> {
        self.results.iter().find(|r| r.parameter == parameter)
    }

    pub fn filter_by_status(&self, status: Status) -> ResultSet {
        self.retain(|r| r.status == status)
    }

    pub fn filter_by_priority(&self, priority: Priority) -> ResultSet {
        self.retain(|r| r.priority == priority)
    }

    /// Keep results whose priority is any of `priorities`.
    pub fn filter_by_priorities(&self, priorities: &[Priority]) -> ResultSet {
        self.retain(|r| priorities.contains(&r.priority))
    }

    pub fn filter_by_parameter(&self, name: &str, matching: NameMatch) -> ResultSet {
        self.retain(|r| name_matches(&r.parameter, name, matching))
    }

    /// Keep results matching any of `names`.
    pub fn filter_by_parameters(&self, names: &[String], matching: NameMatch) -> ResultSet {
        self.retain(|r| names.iter().any(|n| name_matches(&r.parameter, n, matching)))
    }

    /// Only the failures, for `--hide-passed`.
    pub fn without_passed(&self) -> ResultSet {
        self.filter_by_status(Status::Failed)
    }

    /// HIGH first, then MEDIUM, then LOW; catalog order within a priority.
    pub fn sorted_by_priority(&self) -> ResultSet {
        let mut results = self.results.clone();
        results.sort_by_key(|r| r.priority);
        ResultSet { results }
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            total: self.results.len(),
            ..Summary::default()
        };
        for result in &self.results {
            match (result.status, result.priority) {
                (Status::Passed, _) => summary.passed += 1,
                (Status::Failed, Priority::High) => summary.failed_high += 1,
                (Status::Failed, Priority::Medium) => summary.failed_medium += 1,
                (Status::Failed, Priority::Low) => summary.failed_low += 1,
            }
        }
        summary.failed = summary.failed_high + summary.failed_medium + summary.failed_low;
        summary
    }

    fn retain(&self, keep: impl Fn(&CheckResult) -> bool) -> ResultSet {
        ResultSet {
            results: self.results.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a CheckResult;
    type IntoIter = std::slice::Iter<'a, CheckResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

fn name_matches(parameter: &str, name: &str, matching: NameMatch) -> bool {
    match matching {
        NameMatch::Exact => parameter == name,
        NameMatch::Substring => parameter.contains(name),
    }
}

/// Pass/fail counts of a result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub failed_high: usize,
    pub failed_medium: usize,
    pub failed_low: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResultSet {
        ResultSet::new(vec![
            CheckResult::passed("random_page_cost/seq_page_cost", Priority::Low, "ok"),
            CheckResult::failed("shared_buffers", Priority::High, "too big"),
            CheckResult::failed("checkpoint_timeout", Priority::Medium, "slow"),
            CheckResult::failed("work_mem", Priority::High, "too big"),
            CheckResult::failed("statement_timeout", Priority::Low, "unset"),
        ])
    }

    #[test]
    fn test_status_and_priority_serialize_uppercase() {
        let result = CheckResult::failed("work_mem", Priority::High, "note")
            .current("512MB")
            .recommended("<= 327MB");
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains(r#""status":"FAILED""#));
        assert!(json.contains(r#""priority":"HIGH""#));
        assert!(json.contains(r#""current_value":"512MB""#));
        assert!(json.contains(r#""recommended_value":"<= 327MB""#));
    }

    #[test]
    fn test_filter_by_priority_is_ordered_subsequence() {
        let set = sample();
        let high = set.filter_by_priority(Priority::High);

        let names: Vec<_> = high.iter().map(|r| r.parameter.as_str()).collect();
        assert_eq!(names, vec!["shared_buffers", "work_mem"]);
        assert!(high.iter().all(|r| r.priority == Priority::High));
        // original untouched
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn test_filter_by_status() {
        let set = sample();
        assert_eq!(set.filter_by_status(Status::Passed).len(), 1);
        assert_eq!(set.filter_by_status(Status::Failed).len(), 4);
        assert_eq!(set.without_passed(), set.filter_by_status(Status::Failed));
    }

    #[test]
    fn test_filter_by_parameter_exact_and_substring() {
        let set = sample();
        assert_eq!(set.filter_by_parameter("timeout", NameMatch::Substring).len(), 2);
        assert_eq!(set.filter_by_parameter("timeout", NameMatch::Exact).len(), 0);
        assert_eq!(set.filter_by_parameter("work_mem", NameMatch::Exact).len(), 1);
        assert_eq!(
            set.filter_by_parameter("random_page_cost", NameMatch::Substring)
                .len(),
            1
        );
    }

    #[test]
    fn test_filter_by_many() {
        let set = sample();
        let picked = set.filter_by_priorities(&[Priority::High, Priority::Medium]);
        assert_eq!(picked.len(), 3);

        let picked = set.filter_by_parameters(
            &["work_mem".to_string(), "shared_buffers".to_string()],
            NameMatch::Exact,
        );
        let names: Vec<_> = picked.iter().map(|r| r.parameter.as_str()).collect();
        assert_eq!(names, vec!["shared_buffers", "work_mem"]);
    }

    #[test]
    fn test_sorted_by_priority_is_stable() {
        let sorted = sample().sorted_by_priority();
        let names: Vec<_> = sorted.iter().map(|r| r.parameter.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "shared_buffers",
                "work_mem",
                "checkpoint_timeout",
                "random_page_cost/seq_page_cost",
                "statement_timeout",
            ]
        );
    }

    #[test]
    fn test_summary_counts() {
        let summary = sample().summary();
        assert_eq!(summary.total, 5);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 4);
        assert_eq!(summary.failed_high, 2);
        assert_eq!(summary.failed_medium, 1);
        assert_eq!(summary.failed_low, 1);
    }

    #[test]
    fn test_priority_from_str() {
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("Medium".parse::<Priority>().unwrap(), Priority::Medium);
        assert!("urgent".parse::<Priority>().is_err());
    }
}
