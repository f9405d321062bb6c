//! Trigger model - which events start a workflow run

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of repository event that can trigger a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Push,
    PullRequest,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Push => write!(f, "push"),
            EventKind::PullRequest => write!(f, "pull_request"),
        }
    }
}

/// A branch filter pattern
///
/// Patterns use glob syntax: `*` matches within one path segment,
/// `**` matches across segments, `?` matches a single character.
#[derive(Debug, Clone)]
pub struct BranchPattern {
    raw: String,
    regex: Regex,
}

impl BranchPattern {
    /// Compile a glob pattern into a branch matcher
    pub fn compile(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&glob_to_regex(pattern))?;
        Ok(Self {
            raw: pattern.to_string(),
            regex,
        })
    }

    /// The original glob pattern
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Check if a branch name matches this pattern
    pub fn matches(&self, branch: &str) -> bool {
        self.regex.is_match(branch)
    }
}

/// Translate a glob pattern into an anchored regex
fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    out.push_str(".*");
                } else {
                    out.push_str("[^/]*");
                }
            }
            '?' => out.push_str("[^/]"),
            c => out.push_str(&regex::escape(&c.to_string())),
        }
    }

    out.push('$');
    out
}

/// The condition set under which a workflow runs
///
/// An empty branch list means the workflow runs for any branch.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub events: Vec<EventKind>,
    pub branches: Vec<BranchPattern>,
}

impl Trigger {
    /// Check whether an incoming event should start a run
    pub fn matches(&self, event: &TriggerEvent) -> bool {
        if !self.events.contains(&event.kind) {
            return false;
        }

        if self.branches.is_empty() {
            return true;
        }

        self.branches.iter().any(|p| p.matches(&event.branch))
    }
}

/// A concrete repository event handed to the engine
#[derive(Debug, Clone)]
pub struct TriggerEvent {
    /// What happened (push, pull_request)
    pub kind: EventKind,

    /// The branch the event refers to
    pub branch: String,

    /// The revision to check out
    pub revision: String,
}

impl TriggerEvent {
    pub fn new(kind: EventKind, branch: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            kind,
            branch: branch.into(),
            revision: revision.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(events: Vec<EventKind>, patterns: &[&str]) -> Trigger {
        Trigger {
            events,
            branches: patterns
                .iter()
                .map(|p| BranchPattern::compile(p).unwrap())
                .collect(),
        }
    }

    #[test]
    fn test_literal_branch_pattern() {
        let pattern = BranchPattern::compile("master").unwrap();
        assert!(pattern.matches("master"));
        assert!(!pattern.matches("master-old"));
        assert!(!pattern.matches("not-master"));
    }

    #[test]
    fn test_glob_branch_pattern() {
        let pattern = BranchPattern::compile("release/*").unwrap();
        assert!(pattern.matches("release/1.0"));
        assert!(!pattern.matches("release/1.0/hotfix"));
        assert!(!pattern.matches("release"));

        let deep = BranchPattern::compile("release/**").unwrap();
        assert!(deep.matches("release/1.0/hotfix"));
    }

    #[test]
    fn test_pattern_escapes_regex_metachars() {
        let pattern = BranchPattern::compile("v1.0").unwrap();
        assert!(pattern.matches("v1.0"));
        assert!(!pattern.matches("v1x0"));
    }

    #[test]
    fn test_trigger_matches_event_kind() {
        let t = trigger(vec![EventKind::Push], &["master"]);
        assert!(t.matches(&TriggerEvent::new(EventKind::Push, "master", "HEAD")));
        assert!(!t.matches(&TriggerEvent::new(EventKind::PullRequest, "master", "HEAD")));
    }

    #[test]
    fn test_trigger_matches_branch() {
        let t = trigger(vec![EventKind::Push, EventKind::PullRequest], &["master", "release/*"]);
        assert!(t.matches(&TriggerEvent::new(EventKind::Push, "release/2.1", "HEAD")));
        assert!(!t.matches(&TriggerEvent::new(EventKind::Push, "feature/foo", "HEAD")));
    }

    #[test]
    fn test_empty_branch_list_matches_all() {
        let t = trigger(vec![EventKind::Push], &[]);
        assert!(t.matches(&TriggerEvent::new(EventKind::Push, "anything", "HEAD")));
    }

    #[test]
    fn test_event_kind_display() {
        assert_eq!(EventKind::Push.to_string(), "push");
        assert_eq!(EventKind::PullRequest.to_string(), "pull_request");
    }
}
