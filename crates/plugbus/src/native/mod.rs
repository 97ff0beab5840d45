// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Native type and value mapping.
//!
//! Rust has no runtime reflection, so every type that crosses the
//! boundary implements [`Plug`]: it reports a runtime [`NativeType`]
//! mirror of its shape and converts itself to and from a
//! [`DynamicValue`]. `#[derive(Plug)]` generates the impl for structs;
//! primitives, `Option`, `Vec`, string-keyed maps, and small tuples are
//! covered here.
//!
//! [`native_type_to_descriptor`] lowers a `NativeType` into the
//! [`TypeDescriptor`] used in function signatures, applying the
//! boundary rules: optionals unwrap to their pointee, only tagged
//! struct fields are visible, a tagged field that is not `pub` is a
//! fatal registration error, map keys must be strings, and opaque
//! shapes are rejected outright.

mod impls;

use crate::error::{Error, Result};
use crate::path::Path;
use crate::types::TypeDescriptor;
use crate::value::DynamicValue;
use std::collections::BTreeMap;

/// Runtime mirror of a Rust type's shape.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeType {
    Bool,
    /// Signed integers of any width.
    Int,
    /// Unsigned integers of any width.
    Uint,
    Float,
    Str,
    /// `Option<T>`; nullable, unwraps to the pointee.
    Optional(Box<NativeType>),
    /// `Vec<T>`.
    List(Box<NativeType>),
    /// Keyed collection; keys must map to strings.
    Map {
        key: Box<NativeType>,
        value: Box<NativeType>,
    },
    /// Struct with its visible (tagged) fields.
    Struct {
        name: &'static str,
        fields: Vec<NativeField>,
    },
    /// Fixed-arity positional composite.
    Tuple(Vec<NativeType>),
    /// `DynamicValue` passthrough.
    Value,
    /// A shape that cannot cross the boundary (trait objects and
    /// friends); carries the type name for the error message.
    Opaque(&'static str),
}

/// One tagged struct field.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeField {
    /// The wire-visible attribute name from the field tag.
    pub tag: &'static str,
    /// Whether the field is `pub` in its defining type.
    pub public: bool,
    pub ty: NativeType,
}

impl NativeType {
    /// Whether parameters of this shape accept null arguments.
    /// Optionals and collections do; everything else does not.
    pub fn is_nullable(&self) -> bool {
        matches!(
            self,
            Self::Optional(_) | Self::List(_) | Self::Map { .. }
        )
    }
}

/// Derive the structural descriptor for a native type shape.
///
/// Fails with [`Error::UnsupportedType`] when the shape cannot cross
/// the boundary; the error carries the path to the offending piece.
pub fn native_type_to_descriptor(native: &NativeType) -> Result<TypeDescriptor> {
    descriptor_at(native, &Path::root())
}

fn descriptor_at(native: &NativeType, path: &Path) -> Result<TypeDescriptor> {
    match native {
        NativeType::Bool => Ok(TypeDescriptor::Bool),
        NativeType::Int | NativeType::Uint | NativeType::Float => Ok(TypeDescriptor::Number),
        NativeType::Str => Ok(TypeDescriptor::String),
        NativeType::Optional(inner) => descriptor_at(inner, path),
        NativeType::List(elem) => Ok(TypeDescriptor::list(descriptor_at(
            elem,
            &path.any_index(),
        )?)),
        NativeType::Map { key, value } => {
            if **key != NativeType::Str {
                return Err(Error::unsupported(path, "map keys must be strings"));
            }
            Ok(TypeDescriptor::map(descriptor_at(value, &path.any_index())?))
        }
        NativeType::Struct { fields, .. } => {
            let mut attrs = BTreeMap::new();
            for field in fields {
                let field_path = path.attribute(field.tag);
                if !field.public {
                    return Err(Error::unsupported(
                        &field_path,
                        "tagged field is not externally visible",
                    ));
                }
                if attrs
                    .insert(field.tag.to_string(), descriptor_at(&field.ty, &field_path)?)
                    .is_some()
                {
                    return Err(Error::unsupported(
                        &field_path,
                        format!("duplicate attribute {:?}", field.tag),
                    ));
                }
            }
            Ok(TypeDescriptor::Object(attrs))
        }
        NativeType::Tuple(elems) => {
            let mut out = Vec::with_capacity(elems.len());
            for (i, elem) in elems.iter().enumerate() {
                out.push(descriptor_at(elem, &path.index(i))?);
            }
            Ok(TypeDescriptor::Tuple(out))
        }
        NativeType::Value => Ok(TypeDescriptor::Unknown),
        NativeType::Opaque(name) => Err(Error::unsupported(
            path,
            format!("type {} cannot cross the plugin boundary", name),
        )),
    }
}

/// A type that can cross the plugin boundary.
pub trait Plug: Sized {
    /// Runtime mirror of this type's shape.
    fn native_type() -> NativeType;

    /// Convert into a dynamic value.
    fn into_dynamic(self) -> DynamicValue;

    /// Convert back from a dynamic value. `path` locates the value for
    /// error attribution; a null input produces the type's zero value
    /// (`None` for options, empty for collections, defaults for
    /// primitives).
    fn from_dynamic(value: &DynamicValue, path: &Path) -> Result<Self>;
}

/// Descriptor for a `Plug` type, or the registration error.
pub fn descriptor_of<T: Plug>() -> Result<TypeDescriptor> {
    native_type_to_descriptor(&T::native_type())
}

/// Descriptor for values produced by `into_dynamic`, falling back to
/// `Unknown` for shapes that cannot be lowered. Only used where a
/// descriptor is needed for a null or empty value; unsupported shapes
/// never get that far because registration rejects them first.
pub(crate) fn descriptor_or_unknown<T: Plug>() -> TypeDescriptor {
    descriptor_of::<T>().unwrap_or(TypeDescriptor::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_map_to_descriptors() {
        assert_eq!(
            native_type_to_descriptor(&NativeType::Bool).unwrap(),
            TypeDescriptor::Bool
        );
        assert_eq!(
            native_type_to_descriptor(&NativeType::Int).unwrap(),
            TypeDescriptor::Number
        );
        assert_eq!(
            native_type_to_descriptor(&NativeType::Float).unwrap(),
            TypeDescriptor::Number
        );
        assert_eq!(
            native_type_to_descriptor(&NativeType::Str).unwrap(),
            TypeDescriptor::String
        );
    }

    #[test]
    fn optional_unwraps_to_pointee() {
        let native = NativeType::Optional(Box::new(NativeType::Str));
        assert_eq!(
            native_type_to_descriptor(&native).unwrap(),
            TypeDescriptor::String
        );
        assert!(native.is_nullable());
    }

    #[test]
    fn map_keys_must_be_strings() {
        let bad = NativeType::Map {
            key: Box::new(NativeType::Int),
            value: Box::new(NativeType::Str),
        };
        let err = native_type_to_descriptor(&bad).unwrap_err();
        assert!(matches!(err, Error::UnsupportedType { .. }));
        assert!(err.to_string().contains("map keys must be strings"));

        let good = NativeType::Map {
            key: Box::new(NativeType::Str),
            value: Box::new(NativeType::Str),
        };
        assert_eq!(
            native_type_to_descriptor(&good).unwrap(),
            TypeDescriptor::map(TypeDescriptor::String)
        );
    }

    #[test]
    fn opaque_shapes_are_rejected_with_path() {
        let native = NativeType::Struct {
            name: "Holder",
            fields: vec![NativeField {
                tag: "handler",
                public: true,
                ty: NativeType::Opaque("Box<dyn Handler>"),
            }],
        };
        let err = native_type_to_descriptor(&native).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Box<dyn Handler>"), "got: {}", message);
        assert!(message.contains("at handler"), "got: {}", message);
    }

    #[test]
    fn non_public_tagged_field_is_fatal() {
        let native = NativeType::Struct {
            name: "Hidden",
            fields: vec![NativeField {
                tag: "secret",
                public: false,
                ty: NativeType::Str,
            }],
        };
        let err = native_type_to_descriptor(&native).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("not externally visible"));
    }

    #[test]
    fn struct_maps_tagged_fields_only() {
        // Untagged fields never appear in the NativeType at all; the
        // mapper sees only what the derive recorded.
        let native = NativeType::Struct {
            name: "Point",
            fields: vec![
                NativeField {
                    tag: "x",
                    public: true,
                    ty: NativeType::Int,
                },
                NativeField {
                    tag: "y",
                    public: true,
                    ty: NativeType::Int,
                },
            ],
        };
        assert_eq!(
            native_type_to_descriptor(&native).unwrap(),
            TypeDescriptor::object([
                ("x", TypeDescriptor::Number),
                ("y", TypeDescriptor::Number),
            ])
        );
    }

    #[test]
    fn nested_error_path_accumulates() {
        let native = NativeType::Struct {
            name: "Outer",
            fields: vec![NativeField {
                tag: "items",
                public: true,
                ty: NativeType::List(Box::new(NativeType::Opaque("Weird"))),
            }],
        };
        let err = native_type_to_descriptor(&native).unwrap_err();
        assert!(err.to_string().contains("items[*]"), "got: {}", err);
    }
}
