// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `Plug` implementations for standard types.

use crate::error::{Error, Result};
use crate::native::{descriptor_or_unknown, NativeType, Plug};
use crate::path::Path;
use crate::types::TypeDescriptor;
use crate::value::{DynamicValue, Number};
use std::collections::{BTreeMap, HashMap};

fn expected(path: &Path, what: &str, value: &DynamicValue) -> Error {
    if value.is_unknown() {
        Error::conversion(path, format!("cannot convert unknown value to {}", what))
    } else {
        Error::conversion(path, format!("expected {}, found {}", what, value.ty()))
    }
}

impl Plug for bool {
    fn native_type() -> NativeType {
        NativeType::Bool
    }

    fn into_dynamic(self) -> DynamicValue {
        DynamicValue::bool(self)
    }

    fn from_dynamic(value: &DynamicValue, path: &Path) -> Result<Self> {
        if value.is_null() {
            return Ok(false);
        }
        value.as_bool().ok_or_else(|| expected(path, "bool", value))
    }
}

impl Plug for String {
    fn native_type() -> NativeType {
        NativeType::Str
    }

    fn into_dynamic(self) -> DynamicValue {
        DynamicValue::string(self)
    }

    fn from_dynamic(value: &DynamicValue, path: &Path) -> Result<Self> {
        if value.is_null() {
            return Ok(String::new());
        }
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| expected(path, "string", value))
    }
}

fn number_of<'v>(value: &'v DynamicValue, path: &Path) -> Result<&'v Number> {
    value
        .as_number()
        .ok_or_else(|| expected(path, "number", value))
}

macro_rules! impl_plug_signed {
    ($($ty:ty),*) => {
        $(
            impl Plug for $ty {
                fn native_type() -> NativeType {
                    NativeType::Int
                }

                fn into_dynamic(self) -> DynamicValue {
                    DynamicValue::number(Number::from(self))
                }

                fn from_dynamic(value: &DynamicValue, path: &Path) -> Result<Self> {
                    if value.is_null() {
                        return Ok(0);
                    }
                    let number = number_of(value, path)?;
                    let wide = number.to_i64().ok_or_else(|| {
                        Error::conversion(path, format!("{} is not an integer", number))
                    })?;
                    <$ty>::try_from(wide).map_err(|_| {
                        Error::conversion(
                            path,
                            format!("{} does not fit in {}", number, stringify!($ty)),
                        )
                    })
                }
            }
        )*
    };
}

macro_rules! impl_plug_unsigned {
    ($($ty:ty),*) => {
        $(
            impl Plug for $ty {
                fn native_type() -> NativeType {
                    NativeType::Uint
                }

                fn into_dynamic(self) -> DynamicValue {
                    DynamicValue::number(Number::from(self))
                }

                fn from_dynamic(value: &DynamicValue, path: &Path) -> Result<Self> {
                    if value.is_null() {
                        return Ok(0);
                    }
                    let number = number_of(value, path)?;
                    let wide = number.to_u64().ok_or_else(|| {
                        Error::conversion(
                            path,
                            format!("{} is not an unsigned integer", number),
                        )
                    })?;
                    <$ty>::try_from(wide).map_err(|_| {
                        Error::conversion(
                            path,
                            format!("{} does not fit in {}", number, stringify!($ty)),
                        )
                    })
                }
            }
        )*
    };
}

impl_plug_signed!(i8, i16, i32, i64, isize);
impl_plug_unsigned!(u8, u16, u32, u64, usize);

macro_rules! impl_plug_float {
    ($($ty:ty),*) => {
        $(
            impl Plug for $ty {
                fn native_type() -> NativeType {
                    NativeType::Float
                }

                fn into_dynamic(self) -> DynamicValue {
                    match Number::from_f64(self as f64) {
                        Some(number) => DynamicValue::number(number),
                        None => DynamicValue::null(TypeDescriptor::Number),
                    }
                }

                fn from_dynamic(value: &DynamicValue, path: &Path) -> Result<Self> {
                    if value.is_null() {
                        return Ok(0.0);
                    }
                    Ok(number_of(value, path)?.to_f64() as $ty)
                }
            }
        )*
    };
}

impl_plug_float!(f32, f64);

impl<T: Plug> Plug for Option<T> {
    fn native_type() -> NativeType {
        NativeType::Optional(Box::new(T::native_type()))
    }

    fn into_dynamic(self) -> DynamicValue {
        match self {
            Some(inner) => inner.into_dynamic(),
            None => DynamicValue::null(descriptor_or_unknown::<T>()),
        }
    }

    fn from_dynamic(value: &DynamicValue, path: &Path) -> Result<Self> {
        if value.is_null() {
            return Ok(None);
        }
        T::from_dynamic(value, path).map(Some)
    }
}

impl<T: Plug> Plug for Vec<T> {
    fn native_type() -> NativeType {
        NativeType::List(Box::new(T::native_type()))
    }

    fn into_dynamic(self) -> DynamicValue {
        let element = descriptor_or_unknown::<T>();
        DynamicValue::list(element, self.into_iter().map(Plug::into_dynamic).collect())
    }

    fn from_dynamic(value: &DynamicValue, path: &Path) -> Result<Self> {
        if value.is_null() {
            return Ok(Vec::new());
        }
        let items = value
            .elements()
            .ok_or_else(|| expected(path, "list", value))?;
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            out.push(T::from_dynamic(item, &path.index(i))?);
        }
        Ok(out)
    }
}

fn map_native_type<T: Plug>() -> NativeType {
    NativeType::Map {
        key: Box::new(NativeType::Str),
        value: Box::new(T::native_type()),
    }
}

fn map_into_dynamic<T: Plug>(entries: impl Iterator<Item = (String, T)>) -> DynamicValue {
    let element = descriptor_or_unknown::<T>();
    DynamicValue::map(
        element,
        entries.map(|(k, v)| (k, v.into_dynamic())).collect(),
    )
}

fn map_from_dynamic<T: Plug>(
    value: &DynamicValue,
    path: &Path,
) -> Result<BTreeMap<String, T>> {
    if value.is_null() {
        return Ok(BTreeMap::new());
    }
    let entries = value
        .entries()
        .ok_or_else(|| expected(path, "map", value))?;
    let mut out = BTreeMap::new();
    for (key, item) in entries {
        out.insert(key.clone(), T::from_dynamic(item, &path.key(key))?);
    }
    Ok(out)
}

impl<T: Plug> Plug for BTreeMap<String, T> {
    fn native_type() -> NativeType {
        map_native_type::<T>()
    }

    fn into_dynamic(self) -> DynamicValue {
        map_into_dynamic(self.into_iter())
    }

    fn from_dynamic(value: &DynamicValue, path: &Path) -> Result<Self> {
        map_from_dynamic(value, path)
    }
}

impl<T: Plug> Plug for HashMap<String, T> {
    fn native_type() -> NativeType {
        map_native_type::<T>()
    }

    fn into_dynamic(self) -> DynamicValue {
        map_into_dynamic(self.into_iter())
    }

    fn from_dynamic(value: &DynamicValue, path: &Path) -> Result<Self> {
        Ok(map_from_dynamic(value, path)?.into_iter().collect())
    }
}

impl Plug for DynamicValue {
    fn native_type() -> NativeType {
        NativeType::Value
    }

    fn into_dynamic(self) -> DynamicValue {
        self
    }

    fn from_dynamic(value: &DynamicValue, _path: &Path) -> Result<Self> {
        Ok(value.clone())
    }
}

macro_rules! impl_plug_tuple {
    ($(($($name:ident : $idx:tt),+))*) => {
        $(
            impl<$($name: Plug),+> Plug for ($($name,)+) {
                fn native_type() -> NativeType {
                    NativeType::Tuple(vec![$($name::native_type()),+])
                }

                fn into_dynamic(self) -> DynamicValue {
                    DynamicValue::tuple(vec![$(self.$idx.into_dynamic()),+])
                }

                fn from_dynamic(value: &DynamicValue, path: &Path) -> Result<Self> {
                    let items = value
                        .elements()
                        .ok_or_else(|| expected(path, "tuple", value))?;
                    let arity = [$($idx),+].len();
                    if items.len() != arity {
                        return Err(Error::conversion(
                            path,
                            format!(
                                "tuple length mismatch: expected {}, got {}",
                                arity,
                                items.len()
                            ),
                        ));
                    }
                    Ok(($($name::from_dynamic(&items[$idx], &path.index($idx))?,)+))
                }
            }
        )*
    };
}

impl_plug_tuple! {
    (A: 0)
    (A: 0, B: 1)
    (A: 0, B: 1, C: 2)
    (A: 0, B: 1, C: 2, D: 3)
}
