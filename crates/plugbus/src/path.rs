// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error attribution paths.
//!
//! A `Path` names the location inside a nested value or type where a
//! conversion went wrong, rendered as `attrs.list[2]`. Paths exist only
//! for error messages; they are never serialized as data. Index steps
//! hold a full [`DynamicValue`] so non-string map keys can be reported.

use crate::value::{DynamicValue, Number};
use std::fmt;

/// One step into a nested value.
#[derive(Debug, Clone, PartialEq)]
pub enum PathStep {
    /// Descend into a named attribute.
    Attribute(String),
    /// Descend into an indexed element or keyed entry.
    Index(DynamicValue),
}

/// Ordered sequence of steps from the root of a value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    steps: Vec<PathStep>,
}

impl Path {
    /// The empty path.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Extended copy descending into attribute `name`.
    pub fn attribute(&self, name: impl Into<String>) -> Self {
        let mut steps = self.steps.clone();
        steps.push(PathStep::Attribute(name.into()));
        Self { steps }
    }

    /// Extended copy descending into the element at `index`.
    pub fn index(&self, index: usize) -> Self {
        self.index_value(DynamicValue::number(Number::from(index)))
    }

    /// Extended copy descending into the entry keyed by `key`.
    pub fn key(&self, key: impl Into<String>) -> Self {
        self.index_value(DynamicValue::string(key))
    }

    /// Extended copy with an arbitrary index value.
    pub fn index_value(&self, index: DynamicValue) -> Self {
        let mut steps = self.steps.clone();
        steps.push(PathStep::Index(index));
        Self { steps }
    }

    /// Extended copy indexing an element whose position is not known,
    /// rendered as `[*]`.
    pub fn any_index(&self) -> Self {
        self.index_value(DynamicValue::dynamic())
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for step in &self.steps {
            match step {
                PathStep::Attribute(name) => {
                    if !first {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                PathStep::Index(value) => {
                    if value.is_unknown() || value.is_null() {
                        f.write_str("[*]")?;
                    } else if let Some(n) = value.as_number() {
                        write!(f, "[{}]", n)?;
                    } else if let Some(s) = value.as_str() {
                        write!(f, "[{:?}]", s)?;
                    } else {
                        f.write_str("[*]")?;
                    }
                }
            }
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_mixed_steps() {
        let path = Path::root().attribute("field").attribute("list").index(2);
        assert_eq!(path.to_string(), "field.list[2]");
    }

    #[test]
    fn renders_map_keys_quoted() {
        let path = Path::root().attribute("tags").key("env");
        assert_eq!(path.to_string(), "tags[\"env\"]");
    }

    #[test]
    fn renders_wildcard_indexes() {
        let path = Path::root().attribute("items").any_index();
        assert_eq!(path.to_string(), "items[*]");
    }

    #[test]
    fn index_before_attribute() {
        let path = Path::root().index(0).attribute("name");
        assert_eq!(path.to_string(), "[0].name");
    }

    #[test]
    fn empty_path_renders_empty() {
        assert_eq!(Path::root().to_string(), "");
        assert!(Path::root().is_empty());
    }
}
