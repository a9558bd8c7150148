//! Client-side filters. They are sent to the backend as query parameters and
//! can also be evaluated locally against a task.

use std::fmt;
use std::str::FromStr;

use crate::task::{Priority, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    Pending,
}

impl StatusFilter {
    pub fn next(self) -> Self {
        match self {
            StatusFilter::All => StatusFilter::Completed,
            StatusFilter::Completed => StatusFilter::Pending,
            StatusFilter::Pending => StatusFilter::All,
        }
    }

    fn completed_param(self) -> Option<bool> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Completed => Some(true),
            StatusFilter::Pending => Some(false),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "completed" | "done" => Ok(StatusFilter::Completed),
            "pending" | "open" => Ok(StatusFilter::Pending),
            other => Err(format!("unknown status filter: {other} (expected all, completed or pending)")),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatusFilter::All => "All Tasks",
            StatusFilter::Completed => "Completed",
            StatusFilter::Pending => "Pending",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriorityFilter {
    #[default]
    All,
    Only(Priority),
}

impl PriorityFilter {
    /// All -> High -> Medium -> Low -> All, the order of the dashboard dropdown.
    pub fn next(self) -> Self {
        match self {
            PriorityFilter::All => PriorityFilter::Only(Priority::High),
            PriorityFilter::Only(Priority::High) => PriorityFilter::Only(Priority::Medium),
            PriorityFilter::Only(Priority::Medium) => PriorityFilter::Only(Priority::Low),
            PriorityFilter::Only(Priority::Low) => PriorityFilter::All,
        }
    }
}

impl FromStr for PriorityFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(PriorityFilter::All);
        }
        s.parse::<Priority>().map(PriorityFilter::Only)
    }
}

impl fmt::Display for PriorityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriorityFilter::All => f.write_str("All Priorities"),
            PriorityFilter::Only(p) => write!(f, "{p}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Filters {
    pub status: StatusFilter,
    pub priority: PriorityFilter,
}

impl Filters {
    pub fn new(status: StatusFilter, priority: PriorityFilter) -> Self {
        Self { status, priority }
    }

    /// Query pairs for `GET /todos`. `All` values omit their parameter.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut q = Vec::new();
        if let Some(completed) = self.status.completed_param() {
            q.push(("completed", completed.to_string()));
        }
        if let PriorityFilter::Only(p) = self.priority {
            q.push(("priority", p.as_u8().to_string()));
        }
        q
    }

    pub fn is_default(&self) -> bool {
        *self == Filters::default()
    }

    /// The same predicate the backend applies, evaluated locally.
    pub fn matches(&self, task: &Task) -> bool {
        let status_ok = match self.status.completed_param() {
            None => true,
            Some(c) => task.completed == c,
        };
        let priority_ok = match self.priority {
            PriorityFilter::All => true,
            PriorityFilter::Only(p) => task.priority == Some(p),
        };
        status_ok && priority_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filters_send_no_params() {
        assert!(Filters::default().query().is_empty());
    }

    #[test]
    fn pending_and_high_serialize_in_order() {
        let f = Filters::new(StatusFilter::Pending, PriorityFilter::Only(Priority::High));
        assert_eq!(
            f.query(),
            vec![("completed", "false".to_string()), ("priority", "3".to_string())]
        );
    }

    #[test]
    fn local_predicate_matches_query_semantics() {
        let done = Task::new(1, "a").with_completed(true).with_priority(Priority::Low);
        let open = Task::new(2, "b");

        let completed = Filters::new(StatusFilter::Completed, PriorityFilter::All);
        assert!(completed.matches(&done));
        assert!(!completed.matches(&open));

        let low = Filters::new(StatusFilter::All, PriorityFilter::Only(Priority::Low));
        assert!(low.matches(&done));
        // a task without priority never matches a specific priority
        assert!(!low.matches(&open));
    }

    #[test]
    fn parses_cli_spellings() {
        assert_eq!("completed".parse::<StatusFilter>().unwrap(), StatusFilter::Completed);
        assert_eq!("all".parse::<PriorityFilter>().unwrap(), PriorityFilter::All);
        assert_eq!(
            "2".parse::<PriorityFilter>().unwrap(),
            PriorityFilter::Only(Priority::Medium)
        );
        assert!("later".parse::<StatusFilter>().is_err());
    }

    #[test]
    fn cycling_returns_to_all() {
        let mut p = PriorityFilter::All;
        for _ in 0..4 {
            p = p.next();
        }
        assert_eq!(p, PriorityFilter::All);
        assert_eq!(StatusFilter::All.next().next().next(), StatusFilter::All);
    }
}
