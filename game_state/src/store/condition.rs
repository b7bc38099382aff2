//! Threshold conditions over named counters.

use serde::{Deserialize, Serialize};

/// A minimum-threshold requirement: counter `id` must be at least `amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub id: String,
    pub amount: i32,
}

impl Condition {
    /// Create a new condition.
    pub fn new(id: impl Into<String>, amount: i32) -> Self {
        Self {
            id: id.into(),
            amount,
        }
    }
}

/// AND-combined conditions. An empty set is always satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ConditionSet {
    conditions: Vec<Condition>,
}

impl ConditionSet {
    /// Create an empty condition set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a condition.
    pub fn with(mut self, id: impl Into<String>, amount: i32) -> Self {
        self.conditions.push(Condition::new(id, amount));
        self
    }

    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.iter()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl FromIterator<Condition> for ConditionSet {
    fn from_iter<I: IntoIterator<Item = Condition>>(iter: I) -> Self {
        Self {
            conditions: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Condition>> for ConditionSet {
    fn from(conditions: Vec<Condition>) -> Self {
        Self { conditions }
    }
}

impl<'a> IntoIterator for &'a ConditionSet {
    type Item = &'a Condition;
    type IntoIter = std::slice::Iter<'a, Condition>;

    fn into_iter(self) -> Self::IntoIter {
        self.conditions.iter()
    }
}
