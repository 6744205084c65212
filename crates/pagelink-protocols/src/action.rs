//! Explicit action metadata table.
//!
//! Controllers attach a label and description to each action they expose.
//! The table is populated once at startup instead of being discovered by
//! reflecting over controller members.

use std::collections::BTreeMap;

use crate::call::HostCall;

/// UI metadata of one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionMetadata {
    pub label: String,
    pub description: String,
}

impl ActionMetadata {
    pub fn new(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
        }
    }
}

/// Name -> metadata registration table.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    actions: BTreeMap<String, ActionMetadata>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with every host function of the dispatch table.
    pub fn with_host_functions() -> Self {
        let mut registry = Self::new();
        for info in HostCall::catalog() {
            registry.register(info.name, ActionMetadata::new(info.name, info.description));
        }
        registry
    }

    /// Register an action, returning the metadata it replaced.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        metadata: ActionMetadata,
    ) -> Option<ActionMetadata> {
        self.actions.insert(name.into(), metadata)
    }

    pub fn get(&self, name: &str) -> Option<&ActionMetadata> {
        self.actions.get(name)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Actions in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ActionMetadata)> {
        self.actions.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_replace() {
        let mut registry = ActionRegistry::new();
        assert!(registry
            .register("summarize", ActionMetadata::new("Summarize", "Summarize the thread"))
            .is_none());
        let previous = registry.register("summarize", ActionMetadata::new("Sum", "Short"));
        assert_eq!(previous.unwrap().label, "Summarize");
        assert_eq!(registry.get("summarize").unwrap().label, "Sum");
    }

    #[test]
    fn test_seeded_with_host_functions() {
        let registry = ActionRegistry::with_host_functions();
        assert_eq!(registry.len(), HostCall::catalog().len());
        assert!(registry.get("click").is_some());
        let first = registry.iter().next().unwrap().0;
        assert_eq!(first, "clearHighlights");
    }
}
