use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    fn rank(self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub priority: Priority,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default, alias = "expected_results")]
    pub expected_results: Vec<String>,
    #[serde(default, alias = "validation_table", skip_serializing_if = "Option::is_none")]
    pub validation_table: Option<BTreeMap<String, String>>,
    #[serde(default, alias = "kb_compliant", skip_serializing_if = "Option::is_none")]
    pub kb_compliant: Option<bool>,
    #[serde(default, alias = "kb_references")]
    pub kb_references: Vec<String>,
}

/// Partial edit of a test case; `None` leaves a field untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCasePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_results: Option<Vec<String>>,
}

impl TestCasePatch {
    pub fn apply_to(&self, case: &mut TestCase) {
        if let Some(title) = &self.title {
            case.title = title.clone();
        }
        if let Some(description) = &self.description {
            case.description = description.clone();
        }
        if let Some(category) = &self.category {
            case.category = category.clone();
        }
        if let Some(priority) = self.priority {
            case.priority = priority;
        }
        if let Some(steps) = &self.steps {
            case.steps = steps.clone();
        }
        if let Some(expected) = &self.expected_results {
            case.expected_results = expected.clone();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    Id,
    Priority,
    Category,
    KbCompliance,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TestCaseFilter {
    /// `None` shows every category.
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub kb_compliant_only: bool,
    pub search: String,
}

impl TestCaseFilter {
    pub fn is_active(&self) -> bool {
        self.category.is_some()
            || self.priority.is_some()
            || self.kb_compliant_only
            || !self.search.trim().is_empty()
    }

    fn matches(&self, case: &TestCase) -> bool {
        if let Some(category) = &self.category {
            if &case.category != category {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if case.priority != priority {
                return false;
            }
        }
        if self.kb_compliant_only && case.kb_compliant != Some(true) {
            return false;
        }
        let needle = self.search.trim().to_lowercase();
        needle.is_empty()
            || case.title.to_lowercase().contains(&needle)
            || case.description.to_lowercase().contains(&needle)
    }
}

/// Numeric ids first in numeric order, then the rest lexically.
fn id_sort_key(id: &str) -> (bool, u64, &str) {
    match id.parse::<u64>() {
        Ok(n) => (false, n, id),
        Err(_) => (true, 0, id),
    }
}

/// Review board of generated test cases with filtering and sorting.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TestCaseBoard {
    cases: Vec<TestCase>,
    selected: Option<String>,
    filter: TestCaseFilter,
    sort_by: SortBy,
}

impl TestCaseBoard {
    pub fn all(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&TestCase> {
        self.cases.iter().find(|c| c.id == id)
    }

    pub fn selected(&self) -> Option<&TestCase> {
        self.selected.as_deref().and_then(|id| self.get(id))
    }

    pub fn filter(&self) -> &TestCaseFilter {
        &self.filter
    }

    pub fn sort_by(&self) -> SortBy {
        self.sort_by
    }

    pub fn set_all(&mut self, cases: Vec<TestCase>) {
        self.cases = cases;
        if self.selected().is_none() {
            self.selected = None;
        }
    }

    /// Replaces a case with the same id, otherwise appends.
    pub fn upsert(&mut self, case: TestCase) {
        match self.cases.iter_mut().find(|c| c.id == case.id) {
            Some(existing) => *existing = case,
            None => self.cases.push(case),
        }
    }

    pub fn update(&mut self, id: &str, patch: &TestCasePatch) -> bool {
        match self.cases.iter_mut().find(|c| c.id == id) {
            Some(case) => {
                patch.apply_to(case);
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.cases.len();
        self.cases.retain(|c| c.id != id);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        self.cases.len() != before
    }

    pub fn select(&mut self, id: Option<&str>) {
        self.selected = id.filter(|id| self.get(id).is_some()).map(ToOwned::to_owned);
    }

    pub fn set_category_filter(&mut self, category: Option<String>) {
        self.filter.category = category;
    }

    pub fn set_priority_filter(&mut self, priority: Option<Priority>) {
        self.filter.priority = priority;
    }

    pub fn set_kb_compliant_only(&mut self, only: bool) {
        self.filter.kb_compliant_only = only;
    }

    pub fn set_search(&mut self, search: String) {
        self.filter.search = search;
    }

    pub fn clear_filters(&mut self) {
        self.filter = TestCaseFilter::default();
    }

    pub fn set_sort_by(&mut self, sort_by: SortBy) {
        self.sort_by = sort_by;
    }

    /// Filtered and sorted view. Sorting is stable, so ties keep board order.
    pub fn visible(&self) -> Vec<&TestCase> {
        let mut visible: Vec<&TestCase> =
            self.cases.iter().filter(|c| self.filter.matches(c)).collect();
        match self.sort_by {
            SortBy::Id => visible.sort_by(|a, b| id_sort_key(&a.id).cmp(&id_sort_key(&b.id))),
            SortBy::Priority => {
                visible.sort_by(|a, b| b.priority.rank().cmp(&a.priority.rank()))
            }
            SortBy::Category => visible.sort_by(|a, b| a.category.cmp(&b.category)),
            SortBy::KbCompliance => visible.sort_by_key(|c| match c.kb_compliant {
                Some(true) => 0,
                Some(false) => 1,
                None => 2,
            }),
        }
        visible
    }

    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self.cases.iter().map(|c| c.category.clone()).collect();
        categories.sort();
        categories.dedup();
        categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn case(id: &str, category: &str, priority: Priority, compliant: Option<bool>) -> TestCase {
        TestCase {
            id: id.to_string(),
            title: format!("Case {id}"),
            description: format!("Checks the {category} flow"),
            category: category.to_string(),
            priority,
            steps: Vec::new(),
            expected_results: Vec::new(),
            validation_table: None,
            kb_compliant: compliant,
            kb_references: Vec::new(),
        }
    }

    fn board() -> TestCaseBoard {
        let mut board = TestCaseBoard::default();
        board.set_all(vec![
            case("10", "Search", Priority::Low, None),
            case("2", "Authentication", Priority::High, Some(true)),
            case("1", "Authentication", Priority::Medium, Some(false)),
            case("3", "Export", Priority::High, Some(true)),
        ]);
        board
    }

    fn ids(cases: Vec<&TestCase>) -> Vec<&str> {
        cases.into_iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn sorts_ids_numerically() {
        assert_eq!(ids(board().visible()), vec!["1", "2", "3", "10"]);
    }

    #[test]
    fn mixed_ids_sort_numbers_first_then_text() {
        let mut board = TestCaseBoard::default();
        board.set_all(
            (0..200)
                .rev()
                .flat_map(|n| [format!("{n}"), format!("{n}a"), format!("TC-{n}")])
                .map(|id| case(&id, "Search", Priority::Low, None))
                .collect(),
        );

        let sorted = ids(board.visible());
        assert_eq!(sorted.len(), 600);
        assert_eq!(&sorted[..3], &["0", "1", "2"]);
        assert_eq!(sorted[199], "199");
        assert_eq!(&sorted[200..203], &["0a", "100a", "101a"]);
        assert_eq!(sorted[599], "TC-99");

        let numeric: Vec<u64> = sorted[..200].iter().map(|id| id.parse().unwrap()).collect();
        assert!(numeric.windows(2).all(|w| w[0] < w[1]));
        assert!(sorted[200..].windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn sorts_by_priority_high_first_and_stable() {
        let mut board = board();
        board.set_sort_by(SortBy::Priority);
        assert_eq!(ids(board.visible()), vec!["2", "3", "1", "10"]);
    }

    #[test]
    fn sorts_by_kb_compliance() {
        let mut board = board();
        board.set_sort_by(SortBy::KbCompliance);
        assert_eq!(ids(board.visible()), vec!["2", "3", "1", "10"]);
    }

    #[test]
    fn filters_combine() {
        let mut board = board();
        board.set_category_filter(Some("Authentication".to_string()));
        assert_eq!(ids(board.visible()), vec!["1", "2"]);
        board.set_kb_compliant_only(true);
        assert_eq!(ids(board.visible()), vec!["2"]);
        assert!(board.filter().is_active());

        board.clear_filters();
        board.set_search("EXPORT".to_string());
        assert_eq!(ids(board.visible()), vec!["3"]);
        board.set_priority_filter(Some(Priority::Low));
        assert!(board.visible().is_empty());
    }

    #[test]
    fn categories_are_sorted_and_unique() {
        assert_eq!(
            board().categories(),
            vec!["Authentication", "Export", "Search"]
        );
    }

    #[test]
    fn edits_and_deletes() {
        let mut board = board();
        board.select(Some("3"));
        assert!(board.update(
            "3",
            &TestCasePatch {
                title: Some("Export to Excel".to_string()),
                priority: Some(Priority::Medium),
                ..TestCasePatch::default()
            }
        ));
        let edited = board.get("3").unwrap();
        assert_eq!(edited.title, "Export to Excel");
        assert_eq!(edited.priority, Priority::Medium);
        assert_eq!(edited.category, "Export");

        assert!(board.delete("3"));
        assert!(board.selected().is_none());
        assert!(!board.update("3", &TestCasePatch::default()));
        board.select(Some("missing"));
        assert!(board.selected().is_none());
    }

    #[test]
    fn upsert_replaces_by_id() {
        let mut board = board();
        board.upsert(case("1", "Authentication", Priority::High, Some(true)));
        board.upsert(case("4", "Reports", Priority::Low, None));
        assert_eq!(board.len(), 5);
        assert_eq!(board.get("1").unwrap().priority, Priority::High);
    }

    #[test]
    fn decodes_camel_and_snake_case_payloads() {
        let camel: TestCase = serde_json::from_str(
            r#"{"id":"7","title":"T","priority":"high","expectedResults":["ok"],"kbCompliant":true}"#,
        )
        .unwrap();
        let snake: TestCase = serde_json::from_str(
            r#"{"id":"7","title":"T","priority":"high","expected_results":["ok"],"kb_compliant":true}"#,
        )
        .unwrap();
        assert_eq!(camel, snake);
        assert_eq!(camel.expected_results, vec!["ok".to_string()]);
    }
}
