//! Typed identifier definitions for scheduler resources.
//!
//! All of these wrap opaque strings issued by the cluster manager. They
//! exist to prevent an offer id from being handed to an API expecting a
//! task id, not to impose structure on the values themselves.

use crate::define_id;

define_id!(OfferId, "Identifies one resource offer; unique per offer cycle.");
define_id!(AgentId, "Identifies the worker node an offer or task lives on.");
define_id!(FrameworkId, "Identifies this framework's registration with the cluster manager.");
define_id!(
    ResourceId,
    "Identifies a long-lived resource reservation via its reservation label."
);

/// Identifies a task launched by the scheduler.
///
/// Task ids embed the task name ahead of a `__` delimiter followed by a
/// unique suffix (`<task-name>__<uuid>`). The name portion is the only
/// structure the scheduler reads back out of a task id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(String);

/// Delimiter between the task name and the unique suffix in a task id.
const TASK_NAME_DELIMITER: &str = "__";

impl TaskId {
    /// Parses a task id from a cluster-manager-issued string.
    pub fn parse(s: &str) -> Result<Self, crate::IdError> {
        if s.is_empty() {
            return Err(crate::IdError::Empty);
        }
        if s.chars().any(char::is_whitespace) {
            return Err(crate::IdError::Whitespace(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Builds a task id for a named task with the provided unique suffix.
    #[must_use]
    pub fn for_task(task_name: &str, suffix: &str) -> Self {
        Self(format!("{task_name}{TASK_NAME_DELIMITER}{suffix}"))
    }

    /// Returns the task name embedded in this id.
    ///
    /// Ids without the `__` delimiter are treated as bare task names.
    #[must_use]
    pub fn task_name(&self) -> &str {
        match self.0.find(TASK_NAME_DELIMITER) {
            Some(idx) => &self.0[..idx],
            None => &self.0,
        }
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = crate::IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for TaskId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for TaskId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_id_roundtrip() {
        let id: OfferId = "20240101-000001-O12".parse().unwrap();
        let s = id.to_string();
        let parsed: OfferId = s.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_offer_id_empty() {
        let result: Result<OfferId, _> = "".parse();
        assert!(matches!(result.unwrap_err(), crate::IdError::Empty));
    }

    #[test]
    fn test_offer_id_whitespace() {
        let result: Result<OfferId, _> = "offer 1".parse();
        assert!(matches!(result.unwrap_err(), crate::IdError::Whitespace(_)));
    }

    #[test]
    fn test_offer_id_json_roundtrip() {
        let id: OfferId = "offer-a".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"offer-a\"");
        let parsed: OfferId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_task_id_name_extraction() {
        let id = TaskId::for_task("node-0-server", "3d1ab1c2");
        assert_eq!(id.as_str(), "node-0-server__3d1ab1c2");
        assert_eq!(id.task_name(), "node-0-server");
    }

    #[test]
    fn test_task_id_without_delimiter() {
        let id: TaskId = "bare-name".parse().unwrap();
        assert_eq!(id.task_name(), "bare-name");
    }

    #[test]
    fn test_task_id_rejects_empty() {
        let result: Result<TaskId, _> = "".parse();
        assert!(result.is_err());
    }
}
