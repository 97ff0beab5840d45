// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire schema.
//!
//! Flat, serde-serializable mirrors of the value model, carried as JSON
//! inside length-prefixed frames. A [`WireValue`] is
//! `{ type?, unknown, marks, payload? }` where the payload is one of
//! boolean, decimal string, list, or string-keyed map; every composite
//! shape (object, tuple, set) rides the list/map payloads and is
//! reconstructed by the type-directed codec in [`codec`].

pub mod codec;

use crate::error::{Error, Result};
use crate::function::{Function, Parameter, ReturnType};
use crate::path::Path;
use crate::types::TypeDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn is_false(v: &bool) -> bool {
    !*v
}

/// A value in transit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireValue {
    /// Embedded concrete type, present only in self-describing mode.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<WireType>,

    /// True when the content is not yet determined; suppresses the
    /// payload entirely.
    #[serde(default, skip_serializing_if = "is_false")]
    pub unknown: bool,

    /// Opaque taint tokens, sorted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<String>,

    /// Absent for null values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<WirePayload>,
}

/// The concrete content of a wire value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WirePayload {
    Boolean(bool),
    /// Strings and exact decimal numbers.
    String(String),
    /// Lists, sets, and tuples.
    List(Vec<WireValue>),
    /// Maps and objects.
    Map(BTreeMap<String, WireValue>),
}

/// Type identifier on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WireTypeId {
    Unknown,
    Boolean,
    Number,
    String,
    List,
    Set,
    Map,
    Object,
    Tuple,
}

/// A type descriptor on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireType {
    pub identifier: WireTypeId,

    /// Element type for List, Set, and Map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<Box<WireType>>,

    /// Attribute types for Object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<BTreeMap<String, WireType>>,

    /// Element types for Tuple, in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuple: Option<Vec<WireType>>,
}

impl WireType {
    fn bare(identifier: WireTypeId) -> Self {
        Self {
            identifier,
            element: None,
            object: None,
            tuple: None,
        }
    }

    /// Lower a descriptor into its wire form.
    pub fn from_descriptor(ty: &TypeDescriptor) -> Self {
        match ty {
            TypeDescriptor::Unknown => Self::bare(WireTypeId::Unknown),
            TypeDescriptor::Bool => Self::bare(WireTypeId::Boolean),
            TypeDescriptor::Number => Self::bare(WireTypeId::Number),
            TypeDescriptor::String => Self::bare(WireTypeId::String),
            TypeDescriptor::List(elem) => Self {
                element: Some(Box::new(Self::from_descriptor(elem))),
                ..Self::bare(WireTypeId::List)
            },
            TypeDescriptor::Set(elem) => Self {
                element: Some(Box::new(Self::from_descriptor(elem))),
                ..Self::bare(WireTypeId::Set)
            },
            TypeDescriptor::Map(elem) => Self {
                element: Some(Box::new(Self::from_descriptor(elem))),
                ..Self::bare(WireTypeId::Map)
            },
            TypeDescriptor::Object(attrs) => Self {
                object: Some(
                    attrs
                        .iter()
                        .map(|(name, ty)| (name.clone(), Self::from_descriptor(ty)))
                        .collect(),
                ),
                ..Self::bare(WireTypeId::Object)
            },
            TypeDescriptor::Tuple(elems) => Self {
                tuple: Some(elems.iter().map(Self::from_descriptor).collect()),
                ..Self::bare(WireTypeId::Tuple)
            },
        }
    }

    /// Recover the descriptor, validating that the required nested
    /// fields are present for the identifier.
    pub fn to_descriptor(&self) -> Result<TypeDescriptor> {
        self.descriptor_at(&Path::root())
    }

    fn descriptor_at(&self, path: &Path) -> Result<TypeDescriptor> {
        let element = |path: &Path| -> Result<TypeDescriptor> {
            self.element
                .as_deref()
                .ok_or_else(|| Error::conversion(path, "collection type missing element"))?
                .descriptor_at(&path.any_index())
        };
        match self.identifier {
            WireTypeId::Unknown => Ok(TypeDescriptor::Unknown),
            WireTypeId::Boolean => Ok(TypeDescriptor::Bool),
            WireTypeId::Number => Ok(TypeDescriptor::Number),
            WireTypeId::String => Ok(TypeDescriptor::String),
            WireTypeId::List => Ok(TypeDescriptor::list(element(path)?)),
            WireTypeId::Set => Ok(TypeDescriptor::set(element(path)?)),
            WireTypeId::Map => Ok(TypeDescriptor::map(element(path)?)),
            WireTypeId::Object => {
                let attrs = self
                    .object
                    .as_ref()
                    .ok_or_else(|| Error::conversion(path, "object type missing attributes"))?;
                let mut out = BTreeMap::new();
                for (name, ty) in attrs {
                    out.insert(name.clone(), ty.descriptor_at(&path.attribute(name))?);
                }
                Ok(TypeDescriptor::Object(out))
            }
            WireTypeId::Tuple => {
                let elems = self
                    .tuple
                    .as_ref()
                    .ok_or_else(|| Error::conversion(path, "tuple type missing elements"))?;
                let mut out = Vec::with_capacity(elems.len());
                for (i, ty) in elems.iter().enumerate() {
                    out.push(ty.descriptor_at(&path.index(i))?);
                }
                Ok(TypeDescriptor::Tuple(out))
            }
        }
    }
}

/// A function parameter on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireParameter {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub ty: WireType,
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_null: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_unknown: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_dynamic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_marked: bool,
}

impl WireParameter {
    pub fn from_parameter(parameter: &Parameter) -> Self {
        Self {
            name: parameter.name.clone(),
            description: parameter.description.clone(),
            ty: WireType::from_descriptor(&parameter.ty),
            allow_null: parameter.allow_null,
            allow_unknown: parameter.allow_unknown,
            allow_dynamic: parameter.allow_dynamic,
            allow_marked: parameter.allow_marked,
        }
    }

    pub fn to_parameter(&self) -> Result<Parameter> {
        Ok(Parameter {
            name: self.name.clone(),
            description: self.description.clone(),
            ty: self.ty.to_descriptor()?,
            allow_null: self.allow_null,
            allow_unknown: self.allow_unknown,
            allow_dynamic: self.allow_dynamic,
            allow_marked: self.allow_marked,
        })
    }
}

/// A function signature on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFunction {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<WireParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variadic: Option<WireParameter>,
    pub return_type: WireType,
}

impl WireFunction {
    /// Lower a registered function into its listable signature. The
    /// return type is evaluated against the declared parameter types.
    pub fn from_function(name: &str, function: &Function) -> Result<Self> {
        let mut declared: Vec<TypeDescriptor> = function
            .parameters()
            .iter()
            .map(|p| p.ty.clone())
            .collect();
        if let Some(variadic) = function.variadic() {
            declared.push(variadic.ty.clone());
        }
        let return_type = match function.return_type() {
            ReturnType::Static(ty) => ty.clone(),
            ReturnType::Computed(_) => function.return_type_for(&declared)?,
        };
        Ok(Self {
            name: name.to_string(),
            description: function.description().to_string(),
            parameters: function
                .parameters()
                .iter()
                .map(WireParameter::from_parameter)
                .collect(),
            variadic: function.variadic().map(WireParameter::from_parameter),
            return_type: WireType::from_descriptor(&return_type),
        })
    }
}
