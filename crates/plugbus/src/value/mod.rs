// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamic values.
//!
//! A [`DynamicValue`] carries its own [`TypeDescriptor`], a body that is
//! either a known payload, null, or unknown (type known, content not yet
//! determined), and a set of taint marks. Values are immutable once
//! built; conversions produce new values.

mod marks;
mod number;

pub use marks::{MarkSet, SENSITIVE};
pub use number::{Number, ParseNumberError};

use crate::types::TypeDescriptor;
use std::collections::BTreeMap;

/// A runtime-typed value exchanged across the plugin boundary.
#[derive(Debug, Clone)]
pub struct DynamicValue {
    ty: TypeDescriptor,
    body: Body,
    marks: MarkSet,
}

#[derive(Debug, Clone)]
enum Body {
    Known(Payload),
    Null,
    Unknown,
}

#[derive(Debug, Clone)]
pub(crate) enum Payload {
    Bool(bool),
    Number(Number),
    String(String),
    /// List, Set, and Tuple contents, in order.
    Elements(Vec<DynamicValue>),
    /// Map and Object contents, keyed by string.
    Entries(BTreeMap<String, DynamicValue>),
}

impl DynamicValue {
    /// Boolean value.
    pub fn bool(value: bool) -> Self {
        Self::known(TypeDescriptor::Bool, Payload::Bool(value))
    }

    /// Number value.
    pub fn number(value: Number) -> Self {
        Self::known(TypeDescriptor::Number, Payload::Number(value))
    }

    /// String value.
    pub fn string(value: impl Into<String>) -> Self {
        Self::known(TypeDescriptor::String, Payload::String(value.into()))
    }

    /// List of `element` type. An empty list is a distinct value from a
    /// null list of the same element type.
    pub fn list(element: TypeDescriptor, items: Vec<DynamicValue>) -> Self {
        Self::known(TypeDescriptor::list(element), Payload::Elements(items))
    }

    /// Set of `element` type. Element order is preserved in memory but
    /// insignificant for equality.
    pub fn set(element: TypeDescriptor, items: Vec<DynamicValue>) -> Self {
        Self::known(TypeDescriptor::set(element), Payload::Elements(items))
    }

    /// Map of string to `element` type.
    pub fn map(element: TypeDescriptor, entries: BTreeMap<String, DynamicValue>) -> Self {
        Self::known(TypeDescriptor::map(element), Payload::Entries(entries))
    }

    /// Object value; the descriptor is derived from the attribute values.
    pub fn object(attributes: BTreeMap<String, DynamicValue>) -> Self {
        let ty = TypeDescriptor::Object(
            attributes
                .iter()
                .map(|(name, value)| (name.clone(), value.ty.clone()))
                .collect(),
        );
        Self::known(ty, Payload::Entries(attributes))
    }

    /// Tuple value; the descriptor is derived from the element values.
    pub fn tuple(elements: Vec<DynamicValue>) -> Self {
        let ty = TypeDescriptor::Tuple(elements.iter().map(|e| e.ty.clone()).collect());
        Self::known(ty, Payload::Elements(elements))
    }

    /// Null of the given type.
    pub fn null(ty: TypeDescriptor) -> Self {
        Self {
            ty,
            body: Body::Null,
            marks: MarkSet::new(),
        }
    }

    /// Unknown of the given type: the type is settled, the content is
    /// not yet determined. Distinct from null.
    pub fn unknown(ty: TypeDescriptor) -> Self {
        Self {
            ty,
            body: Body::Unknown,
            marks: MarkSet::new(),
        }
    }

    /// Unknown of unknown type (fully dynamic placeholder).
    pub fn dynamic() -> Self {
        Self::unknown(TypeDescriptor::Unknown)
    }

    fn known(ty: TypeDescriptor, payload: Payload) -> Self {
        Self {
            ty,
            body: Body::Known(payload),
            marks: MarkSet::new(),
        }
    }

    /// The value's own structural type.
    pub fn ty(&self) -> &TypeDescriptor {
        &self.ty
    }

    pub fn is_null(&self) -> bool {
        matches!(self.body, Body::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.body, Body::Unknown)
    }

    /// True when the value has a concrete payload.
    pub fn is_known(&self) -> bool {
        matches!(self.body, Body::Known(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.payload() {
            Some(Payload::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self.payload() {
            Some(Payload::Number(v)) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.payload() {
            Some(Payload::String(v)) => Some(v),
            _ => None,
        }
    }

    /// Elements of a list, set, or tuple value.
    pub fn elements(&self) -> Option<&[DynamicValue]> {
        match self.payload() {
            Some(Payload::Elements(v)) => Some(v),
            _ => None,
        }
    }

    /// Entries of a map or object value.
    pub fn entries(&self) -> Option<&BTreeMap<String, DynamicValue>> {
        match self.payload() {
            Some(Payload::Entries(v)) => Some(v),
            _ => None,
        }
    }

    /// One attribute of an object (or entry of a map).
    pub fn attribute(&self, name: &str) -> Option<&DynamicValue> {
        self.entries()?.get(name)
    }

    pub(crate) fn payload(&self) -> Option<&Payload> {
        match &self.body {
            Body::Known(payload) => Some(payload),
            _ => None,
        }
    }

    /// The value's marks.
    pub fn marks(&self) -> &MarkSet {
        &self.marks
    }

    pub fn is_marked(&self) -> bool {
        !self.marks.is_empty()
    }

    /// Add a single mark token.
    pub fn mark(mut self, token: impl Into<String>) -> Self {
        self.marks.insert(token);
        self
    }

    /// Replace the mark set.
    pub fn with_marks(mut self, marks: MarkSet) -> Self {
        self.marks = marks;
        self
    }

    /// Union additional marks into the value.
    pub fn add_marks(mut self, marks: &MarkSet) -> Self {
        self.marks.extend(marks);
        self
    }

    /// Split the value into its unmarked form and the removed marks.
    pub fn unmark(mut self) -> (Self, MarkSet) {
        let marks = std::mem::take(&mut self.marks);
        (self, marks)
    }

    /// Content equality, ignoring marks at every depth.
    pub fn content_eq(&self, other: &Self) -> bool {
        self.eq_with(other, true)
    }

    fn eq_with(&self, other: &Self, ignore_marks: bool) -> bool {
        if self.ty != other.ty {
            return false;
        }
        if !ignore_marks && self.marks != other.marks {
            return false;
        }
        match (&self.body, &other.body) {
            (Body::Null, Body::Null) | (Body::Unknown, Body::Unknown) => true,
            (Body::Known(a), Body::Known(b)) => match (a, b) {
                (Payload::Bool(x), Payload::Bool(y)) => x == y,
                (Payload::Number(x), Payload::Number(y)) => x == y,
                (Payload::String(x), Payload::String(y)) => x == y,
                (Payload::Elements(x), Payload::Elements(y)) => {
                    if self.ty.is_set() {
                        multiset_eq(x, y, ignore_marks)
                    } else {
                        x.len() == y.len()
                            && x.iter().zip(y).all(|(l, r)| l.eq_with(r, ignore_marks))
                    }
                }
                (Payload::Entries(x), Payload::Entries(y)) => {
                    x.len() == y.len()
                        && x.iter().all(|(name, l)| {
                            y.get(name).is_some_and(|r| l.eq_with(r, ignore_marks))
                        })
                }
                _ => false,
            },
            _ => false,
        }
    }
}

/// Order-insensitive element comparison for sets.
fn multiset_eq(a: &[DynamicValue], b: &[DynamicValue], ignore_marks: bool) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    'outer: for item in a {
        for (i, candidate) in b.iter().enumerate() {
            if !used[i] && item.eq_with(candidate, ignore_marks) {
                used[i] = true;
                continue 'outer;
            }
        }
        return false;
    }
    true
}

impl PartialEq for DynamicValue {
    fn eq(&self, other: &Self) -> bool {
        self.eq_with(other, false)
    }
}

impl From<bool> for DynamicValue {
    fn from(value: bool) -> Self {
        Self::bool(value)
    }
}

impl From<Number> for DynamicValue {
    fn from(value: Number) -> Self {
        Self::number(value)
    }
}

impl From<i64> for DynamicValue {
    fn from(value: i64) -> Self {
        Self::number(Number::from(value))
    }
}

impl From<u64> for DynamicValue {
    fn from(value: u64) -> Self {
        Self::number(Number::from(value))
    }
}

impl From<&str> for DynamicValue {
    fn from(value: &str) -> Self {
        Self::string(value)
    }
}

impl From<String> for DynamicValue {
    fn from(value: String) -> Self {
        Self::string(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_unknown_known_are_distinct() {
        let null = DynamicValue::null(TypeDescriptor::String);
        let unknown = DynamicValue::unknown(TypeDescriptor::String);
        let known = DynamicValue::string("");
        assert_ne!(null, unknown);
        assert_ne!(null, known);
        assert_ne!(unknown, known);
        assert!(null.is_null() && !null.is_known());
        assert!(unknown.is_unknown() && !unknown.is_known());
    }

    #[test]
    fn empty_list_is_not_null_list() {
        let empty = DynamicValue::list(TypeDescriptor::String, vec![]);
        let null = DynamicValue::null(TypeDescriptor::list(TypeDescriptor::String));
        assert_eq!(empty.ty(), null.ty());
        assert_ne!(empty, null);
        assert_eq!(empty.elements().map(<[_]>::len), Some(0));
    }

    #[test]
    fn object_derives_descriptor() {
        let mut attrs = BTreeMap::new();
        attrs.insert("name".to_string(), DynamicValue::from("zero"));
        attrs.insert("ok".to_string(), DynamicValue::from(true));
        let value = DynamicValue::object(attrs);
        assert_eq!(
            value.ty(),
            &TypeDescriptor::object([
                ("name", TypeDescriptor::String),
                ("ok", TypeDescriptor::Bool),
            ])
        );
        assert_eq!(value.attribute("name").and_then(|v| v.as_str()), Some("zero"));
    }

    #[test]
    fn marks_compare_as_sets_and_content_eq_ignores_them() {
        let plain = DynamicValue::from("secret");
        let marked = DynamicValue::from("secret").mark(SENSITIVE);
        assert_ne!(plain, marked);
        assert!(plain.content_eq(&marked));

        let (stripped, marks) = marked.unmark();
        assert_eq!(stripped, plain);
        assert!(marks.contains(SENSITIVE));
    }

    #[test]
    fn set_equality_is_order_insensitive() {
        let a = DynamicValue::set(
            TypeDescriptor::String,
            vec![DynamicValue::from("x"), DynamicValue::from("y")],
        );
        let b = DynamicValue::set(
            TypeDescriptor::String,
            vec![DynamicValue::from("y"), DynamicValue::from("x")],
        );
        assert_eq!(a, b);

        let list_a = DynamicValue::list(
            TypeDescriptor::String,
            vec![DynamicValue::from("x"), DynamicValue::from("y")],
        );
        let list_b = DynamicValue::list(
            TypeDescriptor::String,
            vec![DynamicValue::from("y"), DynamicValue::from("x")],
        );
        assert_ne!(list_a, list_b);
    }

    #[test]
    fn set_multiset_counts_duplicates() {
        let a = DynamicValue::set(
            TypeDescriptor::String,
            vec![DynamicValue::from("x"), DynamicValue::from("x")],
        );
        let b = DynamicValue::set(
            TypeDescriptor::String,
            vec![DynamicValue::from("x"), DynamicValue::from("y")],
        );
        assert_ne!(a, b);
    }

    #[test]
    fn tuple_descriptor_is_positional() {
        let value = DynamicValue::tuple(vec![DynamicValue::from(true), DynamicValue::from("s")]);
        assert_eq!(
            value.ty(),
            &TypeDescriptor::tuple(vec![TypeDescriptor::Bool, TypeDescriptor::String])
        );
    }
}
