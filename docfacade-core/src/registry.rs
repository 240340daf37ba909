//! The fixed set of collections a connection hands out handles for.

use crate::error::{FacadeError, FacadeResult};

/// Ordered, de-duplicated collection names, built once at connection time.
///
/// Duplicates collapse to their first occurrence. Nothing is added or removed
/// after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionRegistry {
    names: Vec<String>,
}

impl CollectionRegistry {
    /// Builds a registry from `names`.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::Configuration`] if a name is empty.
    pub fn new<I, S>(names: I) -> FacadeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::default();

        for name in names {
            let name = name.into();

            if name.is_empty() {
                return Err(FacadeError::Configuration("collection names must not be empty".into()));
            }
            if !registry.contains(&name) {
                registry.names.push(name);
            }
        }

        Ok(registry)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the registered name equal to `name`, borrowed from the registry.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.names
            .iter()
            .find(|registered| registered.as_str() == name)
            .map(String::as_str)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
