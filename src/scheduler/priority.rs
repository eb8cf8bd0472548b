//! Request prioritization: three strictly ordered FIFO lanes.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Priority lane for a scheduled request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// All lanes in precedence order.
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    fn lane(self) -> usize {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
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
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" | "normal" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// Lane set for managing ordered requests.
///
/// `pop_next` always serves the highest non-empty lane. `push_front` puts
/// an item back at the head of its lane, ahead of everything queued later.
pub struct LaneSet<T> {
    lanes: [VecDeque<T>; 3],
}

impl<T> LaneSet<T> {
    pub fn new() -> Self {
        Self {
            lanes: [VecDeque::new(), VecDeque::new(), VecDeque::new()],
        }
    }

    pub fn push_back(&mut self, item: T, priority: Priority) {
        self.lanes[priority.lane()].push_back(item);
    }

    pub fn push_front(&mut self, item: T, priority: Priority) {
        self.lanes[priority.lane()].push_front(item);
    }

    /// Take the head of the highest non-empty lane.
    pub fn pop_next(&mut self) -> Option<(Priority, T)> {
        Priority::ALL.into_iter().find_map(|priority| {
            self.lanes[priority.lane()]
                .pop_front()
                .map(|item| (priority, item))
        })
    }

    pub fn len(&self) -> usize {
        self.lanes.iter().map(VecDeque::len).sum()
    }

    pub fn lane_len(&self, priority: Priority) -> usize {
        self.lanes[priority.lane()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.iter().all(VecDeque::is_empty)
    }

    /// Iterate all items in service order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.lanes.iter().flat_map(|lane| lane.iter())
    }

    /// Remove every item matching `pred`, keeping the order of the rest.
    pub fn remove_where<F>(&mut self, mut pred: F) -> Vec<T>
    where
        F: FnMut(&T) -> bool,
    {
        let mut removed = Vec::new();
        for lane in &mut self.lanes {
            if !lane.iter().any(&mut pred) {
                continue;
            }
            let mut kept = VecDeque::with_capacity(lane.len());
            for item in lane.drain(..) {
                if pred(&item) {
                    removed.push(item);
                } else {
                    kept.push_back(item);
                }
            }
            *lane = kept;
        }
        removed
    }

    /// Empty every lane, returning the items in service order.
    pub fn drain(&mut self) -> Vec<T> {
        self.lanes
            .iter_mut()
            .flat_map(|lane| lane.drain(..))
            .collect()
    }
}

impl<T> Default for LaneSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serves_lanes_in_precedence_order() {
        let mut lanes = LaneSet::new();
        lanes.push_back("low", Priority::Low);
        lanes.push_back("high", Priority::High);
        lanes.push_back("medium", Priority::Medium);

        assert_eq!(lanes.pop_next(), Some((Priority::High, "high")));
        assert_eq!(lanes.pop_next(), Some((Priority::Medium, "medium")));
        assert_eq!(lanes.pop_next(), Some((Priority::Low, "low")));
        assert_eq!(lanes.pop_next(), None);
    }

    #[test]
    fn push_front_goes_ahead_of_later_arrivals() {
        let mut lanes = LaneSet::new();
        lanes.push_back(1, Priority::Medium);
        lanes.push_back(2, Priority::Medium);

        let (priority, head) = lanes.pop_next().unwrap();
        lanes.push_back(3, Priority::Medium);
        lanes.push_front(head, priority);

        let order: Vec<_> = std::iter::from_fn(|| lanes.pop_next().map(|(_, v)| v)).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn remove_where_preserves_remaining_order() {
        let mut lanes = LaneSet::new();
        for i in 0..6 {
            lanes.push_back(i, Priority::Low);
        }
        lanes.push_back(10, Priority::High);

        let removed = lanes.remove_where(|v| v % 2 == 0);
        assert_eq!(removed, vec![10, 0, 2, 4]);
        assert_eq!(lanes.iter().copied().collect::<Vec<_>>(), vec![1, 3, 5]);
        assert_eq!(lanes.lane_len(Priority::High), 0);
    }

    #[test]
    fn drain_empties_all_lanes() {
        let mut lanes = LaneSet::new();
        lanes.push_back("a", Priority::Low);
        lanes.push_back("b", Priority::High);
        assert_eq!(lanes.len(), 2);

        assert_eq!(lanes.drain(), vec!["b", "a"]);
        assert!(lanes.is_empty());
    }

    #[test]
    fn parses_priority_names() {
        assert_eq!("HIGH".parse::<Priority>(), Ok(Priority::High));
        assert_eq!("normal".parse::<Priority>(), Ok(Priority::Medium));
        assert_eq!("low".parse::<Priority>(), Ok(Priority::Low));
        assert!("urgent".parse::<Priority>().is_err());
        assert_eq!(Priority::default(), Priority::Medium);
    }
}
