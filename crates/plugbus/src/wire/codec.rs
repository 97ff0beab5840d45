// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type-directed value codec.
//!
//! `encode` and `decode` walk a value and its static descriptor
//! together, recursing through collections, objects, and tuples. When
//! the descriptor is `Unknown` the value's own type travels in the wire
//! form (self-describing mode) and decode recovers it from there, at
//! any depth.
//!
//! Precedence on encode: the unknown flag suppresses the payload
//! entirely; null omits the payload but keeps type information in
//! self-describing mode; marks ride alongside either.

use crate::error::{Error, Result};
use crate::path::Path;
use crate::types::TypeDescriptor;
use crate::value::{DynamicValue, MarkSet, Number};
use crate::wire::{WirePayload, WireType, WireValue};
use std::collections::BTreeMap;

/// Encode a value against a static descriptor.
pub fn encode(value: &DynamicValue, ty: &TypeDescriptor) -> Result<WireValue> {
    encode_at(value, ty, &Path::root())
}

/// Decode a wire value against a static descriptor.
pub fn decode(wire: &WireValue, ty: &TypeDescriptor) -> Result<DynamicValue> {
    decode_at(wire, ty, &Path::root())
}

fn encode_at(value: &DynamicValue, ty: &TypeDescriptor, path: &Path) -> Result<WireValue> {
    if ty.is_unknown() {
        // Self-describing: the concrete type travels with the payload.
        let concrete = value.ty().clone();
        let mut wire = if concrete.is_unknown() {
            // Fully dynamic placeholder, nothing concrete to encode.
            WireValue {
                unknown: value.is_unknown(),
                marks: value.marks().to_vec(),
                ..WireValue::default()
            }
        } else {
            encode_at(value, &concrete, path)?
        };
        wire.ty = Some(WireType::from_descriptor(&concrete));
        return Ok(wire);
    }

    let mut wire = WireValue {
        marks: value.marks().to_vec(),
        ..WireValue::default()
    };

    if value.is_unknown() {
        wire.unknown = true;
        return Ok(wire);
    }
    if value.is_null() {
        return Ok(wire);
    }

    let mismatch = || Error::conversion(path, format!("expected {}, found {}", ty, value.ty()));

    wire.payload = Some(match ty {
        TypeDescriptor::Unknown => unreachable!("handled above"),
        TypeDescriptor::Bool => WirePayload::Boolean(value.as_bool().ok_or_else(mismatch)?),
        TypeDescriptor::Number => {
            WirePayload::String(value.as_number().ok_or_else(mismatch)?.to_string())
        }
        TypeDescriptor::String => {
            WirePayload::String(value.as_str().ok_or_else(mismatch)?.to_string())
        }
        TypeDescriptor::List(elem) | TypeDescriptor::Set(elem) => {
            let items = value.elements().ok_or_else(mismatch)?;
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(encode_at(item, elem, &path.index(i))?);
            }
            WirePayload::List(out)
        }
        TypeDescriptor::Map(elem) => {
            let entries = value.entries().ok_or_else(mismatch)?;
            let mut out = BTreeMap::new();
            for (key, item) in entries {
                out.insert(key.clone(), encode_at(item, elem, &path.key(key))?);
            }
            WirePayload::Map(out)
        }
        TypeDescriptor::Object(attrs) => {
            let entries = value.entries().ok_or_else(mismatch)?;
            let mut out = BTreeMap::new();
            for (name, attr_ty) in attrs {
                let attr = entries.get(name).ok_or_else(|| {
                    Error::conversion(path, format!("missing attribute {:?}", name))
                })?;
                out.insert(name.clone(), encode_at(attr, attr_ty, &path.attribute(name))?);
            }
            WirePayload::Map(out)
        }
        TypeDescriptor::Tuple(elem_types) => {
            let items = value.elements().ok_or_else(mismatch)?;
            if items.len() != elem_types.len() {
                return Err(Error::conversion(
                    path,
                    format!(
                        "tuple length mismatch: expected {}, got {}",
                        elem_types.len(),
                        items.len()
                    ),
                ));
            }
            let mut out = Vec::with_capacity(items.len());
            for (i, (item, elem_ty)) in items.iter().zip(elem_types).enumerate() {
                out.push(encode_at(item, elem_ty, &path.index(i))?);
            }
            WirePayload::List(out)
        }
    });

    Ok(wire)
}

fn decode_at(wire: &WireValue, ty: &TypeDescriptor, path: &Path) -> Result<DynamicValue> {
    if ty.is_unknown() {
        // Recover the concrete type from the wire form.
        let concrete = match &wire.ty {
            Some(wire_ty) => wire_ty.to_descriptor()?,
            None => TypeDescriptor::Unknown,
        };
        if concrete.is_unknown() {
            let marks: MarkSet = wire.marks.iter().map(String::as_str).collect();
            let value = if wire.unknown {
                DynamicValue::dynamic()
            } else {
                DynamicValue::null(TypeDescriptor::Unknown)
            };
            return Ok(value.with_marks(marks));
        }
        return decode_at(wire, &concrete, path);
    }

    let marks: MarkSet = wire.marks.iter().map(String::as_str).collect();

    if wire.unknown {
        return Ok(DynamicValue::unknown(ty.clone()).with_marks(marks));
    }
    let Some(payload) = &wire.payload else {
        return Ok(DynamicValue::null(ty.clone()).with_marks(marks));
    };

    let mismatch = |found: &str| {
        Error::conversion(path, format!("expected {}, found {} payload", ty, found))
    };

    let value = match ty {
        TypeDescriptor::Unknown => unreachable!("handled above"),
        TypeDescriptor::Bool => match payload {
            WirePayload::Boolean(b) => DynamicValue::bool(*b),
            other => return Err(mismatch(payload_name(other))),
        },
        TypeDescriptor::Number => match payload {
            WirePayload::String(text) => {
                let number = Number::parse(text)
                    .map_err(|e| Error::conversion(path, e.to_string()))?;
                DynamicValue::number(number)
            }
            other => return Err(mismatch(payload_name(other))),
        },
        TypeDescriptor::String => match payload {
            WirePayload::String(text) => DynamicValue::string(text.clone()),
            other => return Err(mismatch(payload_name(other))),
        },
        TypeDescriptor::List(elem) => {
            let items = decode_elements(payload, elem, path, || mismatch(payload_name(payload)))?;
            DynamicValue::list((**elem).clone(), items)
        }
        TypeDescriptor::Set(elem) => {
            let items = decode_elements(payload, elem, path, || mismatch(payload_name(payload)))?;
            DynamicValue::set((**elem).clone(), items)
        }
        TypeDescriptor::Map(elem) => match payload {
            WirePayload::Map(entries) => {
                let mut out = BTreeMap::new();
                for (key, item) in entries {
                    out.insert(key.clone(), decode_at(item, elem, &path.key(key))?);
                }
                DynamicValue::map((**elem).clone(), out)
            }
            other => return Err(mismatch(payload_name(other))),
        },
        TypeDescriptor::Object(attrs) => match payload {
            WirePayload::Map(entries) => {
                let mut out = BTreeMap::new();
                for (name, attr_ty) in attrs {
                    let entry = entries.get(name).ok_or_else(|| {
                        Error::conversion(path, format!("missing attribute {:?}", name))
                    })?;
                    out.insert(name.clone(), decode_at(entry, attr_ty, &path.attribute(name))?);
                }
                for name in entries.keys() {
                    if !attrs.contains_key(name) {
                        return Err(Error::conversion(
                            path,
                            format!("unexpected attribute {:?}", name),
                        ));
                    }
                }
                DynamicValue::object(out)
            }
            other => return Err(mismatch(payload_name(other))),
        },
        TypeDescriptor::Tuple(elem_types) => match payload {
            WirePayload::List(items) => {
                if items.len() != elem_types.len() {
                    return Err(Error::conversion(
                        path,
                        format!(
                            "tuple length mismatch: expected {}, got {}",
                            elem_types.len(),
                            items.len()
                        ),
                    ));
                }
                let mut out = Vec::with_capacity(items.len());
                for (i, (item, elem_ty)) in items.iter().zip(elem_types).enumerate() {
                    out.push(decode_at(item, elem_ty, &path.index(i))?);
                }
                DynamicValue::tuple(out)
            }
            other => return Err(mismatch(payload_name(other))),
        },
    };

    Ok(value.with_marks(marks))
}

fn decode_elements(
    payload: &WirePayload,
    elem: &TypeDescriptor,
    path: &Path,
    mismatch: impl Fn() -> Error,
) -> Result<Vec<DynamicValue>> {
    match payload {
        WirePayload::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(decode_at(item, elem, &path.index(i))?);
            }
            Ok(out)
        }
        _ => Err(mismatch()),
    }
}

fn payload_name(payload: &WirePayload) -> &'static str {
    match payload {
        WirePayload::Boolean(_) => "boolean",
        WirePayload::String(_) => "string",
        WirePayload::List(_) => "list",
        WirePayload::Map(_) => "map",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::SENSITIVE;

    fn round_trip(value: &DynamicValue, ty: &TypeDescriptor) -> DynamicValue {
        let wire = encode(value, ty).expect("encode");
        decode(&wire, ty).expect("decode")
    }

    #[test]
    fn primitives_round_trip() {
        let cases = [
            (DynamicValue::bool(true), TypeDescriptor::Bool),
            (DynamicValue::from("hello"), TypeDescriptor::String),
            (DynamicValue::from(""), TypeDescriptor::String),
            (DynamicValue::from(42i64), TypeDescriptor::Number),
        ];
        for (value, ty) in cases {
            assert_eq!(round_trip(&value, &ty), value);
        }
    }

    #[test]
    fn null_and_unknown_round_trip() {
        let ty = TypeDescriptor::String;
        assert_eq!(
            round_trip(&DynamicValue::null(ty.clone()), &ty),
            DynamicValue::null(ty.clone())
        );
        assert_eq!(
            round_trip(&DynamicValue::unknown(ty.clone()), &ty),
            DynamicValue::unknown(ty)
        );
    }

    #[test]
    fn unknown_suppresses_payload() {
        let wire = encode(
            &DynamicValue::unknown(TypeDescriptor::Bool),
            &TypeDescriptor::Bool,
        )
        .unwrap();
        assert!(wire.unknown);
        assert!(wire.payload.is_none());
    }

    #[test]
    fn numbers_stay_exact_on_the_wire() {
        let big = DynamicValue::number(Number::parse("9223372036854775807").unwrap());
        let wire = encode(&big, &TypeDescriptor::Number).unwrap();
        assert_eq!(
            wire.payload,
            Some(WirePayload::String("9223372036854775807".to_string()))
        );
        assert_eq!(decode(&wire, &TypeDescriptor::Number).unwrap(), big);

        let frac = DynamicValue::number(
            Number::parse("0.123456789012345678901234567890").unwrap(),
        );
        assert_eq!(round_trip(&frac, &TypeDescriptor::Number), frac);
    }

    #[test]
    fn marks_survive_encode_decode() {
        let value = DynamicValue::from("secret").mark(SENSITIVE).mark("pii");
        let wire = encode(&value, &TypeDescriptor::String).unwrap();
        assert_eq!(wire.marks, vec!["pii".to_string(), SENSITIVE.to_string()]);
        assert_eq!(decode(&wire, &TypeDescriptor::String).unwrap(), value);
    }

    #[test]
    fn marked_null_and_marked_unknown() {
        let ty = TypeDescriptor::String;
        let null = DynamicValue::null(ty.clone()).mark(SENSITIVE);
        let unknown = DynamicValue::unknown(ty.clone()).mark(SENSITIVE);
        assert_eq!(round_trip(&null, &ty), null);
        assert_eq!(round_trip(&unknown, &ty), unknown);
    }

    #[test]
    fn self_describing_round_trip() {
        let values = [
            DynamicValue::from("hello"),
            DynamicValue::from(42i64),
            DynamicValue::bool(false),
            DynamicValue::list(
                TypeDescriptor::String,
                vec![DynamicValue::from("a"), DynamicValue::from("b")],
            ),
            DynamicValue::tuple(vec![DynamicValue::from(true), DynamicValue::from("s")]),
            DynamicValue::null(TypeDescriptor::String),
            DynamicValue::dynamic(),
        ];
        for value in values {
            let wire = encode(&value, &TypeDescriptor::Unknown).unwrap();
            assert!(wire.ty.is_some(), "self-describing form must embed a type");
            let back = decode(&wire, &TypeDescriptor::Unknown).unwrap();
            assert_eq!(back, value);
        }
    }

    #[test]
    fn nested_dynamic_attribute_keeps_its_payload() {
        let ty = TypeDescriptor::object([("extra", TypeDescriptor::Unknown)]);
        let mut attrs = BTreeMap::new();
        attrs.insert("extra".to_string(), DynamicValue::from(7i64));
        let value = DynamicValue::object(attrs);

        let wire = encode(&value, &ty).unwrap();
        let back = decode(&wire, &ty).unwrap();
        assert_eq!(
            back.attribute("extra").and_then(|v| v.as_number()).cloned(),
            Some(Number::from(7i64))
        );
    }

    #[test]
    fn empty_list_decodes_distinct_from_null() {
        let ty = TypeDescriptor::list(TypeDescriptor::String);
        let empty = DynamicValue::list(TypeDescriptor::String, vec![]);
        let null = DynamicValue::null(ty.clone());

        let empty_back = round_trip(&empty, &ty);
        let null_back = round_trip(&null, &ty);
        assert_eq!(empty_back, empty);
        assert_eq!(null_back, null);
        assert_ne!(empty_back, null_back);

        // Re-encoding an empty list keeps an (empty) payload.
        let wire = encode(&empty_back, &ty).unwrap();
        assert_eq!(wire.payload, Some(WirePayload::List(vec![])));
    }

    #[test]
    fn object_and_map_round_trip() {
        let obj_ty = TypeDescriptor::object([
            ("name", TypeDescriptor::String),
            ("count", TypeDescriptor::Number),
        ]);
        let mut attrs = BTreeMap::new();
        attrs.insert("name".to_string(), DynamicValue::from("zero"));
        attrs.insert("count".to_string(), DynamicValue::from(3i64));
        let obj = DynamicValue::object(attrs);
        assert_eq!(round_trip(&obj, &obj_ty), obj);

        let map_ty = TypeDescriptor::map(TypeDescriptor::Number);
        let mut entries = BTreeMap::new();
        entries.insert("a".to_string(), DynamicValue::from(1i64));
        entries.insert("b".to_string(), DynamicValue::from(2i64));
        let map = DynamicValue::map(TypeDescriptor::Number, entries);
        assert_eq!(round_trip(&map, &map_ty), map);
    }

    #[test]
    fn nested_null_attribute_round_trips() {
        let ty = TypeDescriptor::object([("hello", TypeDescriptor::String)]);
        let mut attrs = BTreeMap::new();
        attrs.insert(
            "hello".to_string(),
            DynamicValue::null(TypeDescriptor::String),
        );
        let value = DynamicValue::object(attrs);
        assert_eq!(round_trip(&value, &ty), value);
    }

    #[test]
    fn set_round_trips_as_multiset() {
        let ty = TypeDescriptor::set(TypeDescriptor::Number);
        let set = DynamicValue::set(
            TypeDescriptor::Number,
            vec![DynamicValue::from(2i64), DynamicValue::from(1i64)],
        );
        assert_eq!(round_trip(&set, &ty), set);
    }

    #[test]
    fn type_mismatch_carries_path() {
        let ty = TypeDescriptor::object([(
            "field",
            TypeDescriptor::object([("list", TypeDescriptor::list(TypeDescriptor::Number))]),
        )]);
        let wire: WireValue = serde_json::from_value(serde_json::json!({
            "payload": {"map": {"field": {"payload": {"map": {"list": {"payload": {"list": [
                {"payload": {"string": "0"}},
                {"payload": {"string": "1"}},
                {"payload": {"boolean": true}},
            ]}}}}}}}
        }))
        .unwrap();

        let err = decode(&wire, &ty).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("field.list[2]"), "got: {}", message);
    }

    #[test]
    fn decode_rejects_undeclared_attribute() {
        let ty = TypeDescriptor::object([("a", TypeDescriptor::String)]);
        let wire: WireValue = serde_json::from_value(serde_json::json!({
            "payload": {"map": {
                "a": {"payload": {"string": "x"}},
                "b": {"payload": {"string": "y"}},
            }}
        }))
        .unwrap();
        assert!(decode(&wire, &ty).is_err());
    }

    #[test]
    fn decode_rejects_bad_number_text() {
        let wire: WireValue = serde_json::from_value(serde_json::json!({
            "payload": {"string": "not-a-number"}
        }))
        .unwrap();
        assert!(decode(&wire, &TypeDescriptor::Number).is_err());
    }
}
