// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Closure-to-function adapters.
//!
//! These traits are the introspection step: a plain Rust closure
//! `Fn(A, B) -> Result<R, E>` becomes a [`Function`] whose signature is
//! derived from the parameter types via [`Plug`]. The `Result` return
//! enforces the value-plus-error shape of a callable at compile time.
//! Optional and collection parameters accept null arguments; a
//! `DynamicValue` parameter is a full passthrough slot.
//!
//! Variadic callables register through [`IntoVariadicFunction`]: the
//! final `Vec<T>` parameter collects every argument past the fixed
//! ones, typed by `T`.

use crate::error::{Error, Result};
use crate::function::{Function, Parameter};
use crate::native::{descriptor_of, native_type_to_descriptor, NativeType, Plug};
use crate::path::Path;
use crate::value::DynamicValue;
use std::fmt::Display;

/// Fixed-arity closures that can become a [`Function`].
///
/// `Args` is a marker for the parameter tuple; it lets one closure type
/// satisfy exactly one instantiation of the trait.
pub trait IntoFunction<Args> {
    fn into_function(self) -> Result<Function>;
}

/// Closures whose trailing `Vec<T>` parameter is variadic.
pub trait IntoVariadicFunction<Args> {
    fn into_function(self) -> Result<Function>;
}

fn parameter_of<T: Plug>() -> Result<Parameter> {
    let native = T::native_type();
    let ty = native_type_to_descriptor(&native)?;
    let mut parameter = Parameter::new("", ty);
    parameter.allow_null = native.is_nullable();
    if native == NativeType::Value {
        parameter.allow_null = true;
        parameter.allow_unknown = true;
        parameter.allow_dynamic = true;
        parameter.allow_marked = true;
    }
    Ok(parameter)
}

macro_rules! impl_into_function {
    ($($arg:ident),*) => {
        impl<Func, $($arg,)* Ret, Err> IntoFunction<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> std::result::Result<Ret, Err> + Send + Sync + 'static,
            $($arg: Plug + 'static,)*
            Ret: Plug + 'static,
            Err: Display,
        {
            fn into_function(self) -> Result<Function> {
                let mut builder = Function::builder().returns(descriptor_of::<Ret>()?);
                $(
                    builder = builder.parameter(parameter_of::<$arg>()?);
                )*
                Ok(builder.build(move |_ctx, args| {
                    #[allow(unused_mut, unused_variables)]
                    let mut index = 0usize;
                    $(
                        #[allow(non_snake_case)]
                        let $arg = $arg::from_dynamic(&args[index], &Path::root().index(index))?;
                        index += 1;
                    )*
                    match (self)($($arg),*) {
                        Ok(value) => Ok(value.into_dynamic()),
                        Err(err) => Err(Error::Call(err.to_string())),
                    }
                }))
            }
        }
    };
}

impl_into_function!();
impl_into_function!(A0);
impl_into_function!(A0, A1);
impl_into_function!(A0, A1, A2);
impl_into_function!(A0, A1, A2, A3);
impl_into_function!(A0, A1, A2, A3, A4);
impl_into_function!(A0, A1, A2, A3, A4, A5);
impl_into_function!(A0, A1, A2, A3, A4, A5, A6);
impl_into_function!(A0, A1, A2, A3, A4, A5, A6, A7);

macro_rules! impl_into_variadic_function {
    ($($arg:ident),*) => {
        impl<Func, $($arg,)* Rest, Ret, Err> IntoVariadicFunction<($($arg,)* Vec<Rest>,)> for Func
        where
            Func: Fn($($arg,)* Vec<Rest>) -> std::result::Result<Ret, Err>
                + Send
                + Sync
                + 'static,
            $($arg: Plug + 'static,)*
            Rest: Plug + 'static,
            Ret: Plug + 'static,
            Err: Display,
        {
            fn into_function(self) -> Result<Function> {
                let mut builder = Function::builder().returns(descriptor_of::<Ret>()?);
                $(
                    builder = builder.parameter(parameter_of::<$arg>()?);
                )*
                builder = builder.variadic(parameter_of::<Rest>()?);
                Ok(builder.build(move |_ctx, args| {
                    #[allow(unused_mut, unused_variables)]
                    let mut index = 0usize;
                    $(
                        #[allow(non_snake_case)]
                        let $arg = $arg::from_dynamic(&args[index], &Path::root().index(index))?;
                        index += 1;
                    )*
                    let mut rest = Vec::with_capacity(args.len() - index);
                    for (offset, arg) in args[index..].iter().enumerate() {
                        rest.push(Rest::from_dynamic(
                            arg,
                            &Path::root().index(index + offset),
                        )?);
                    }
                    match (self)($($arg,)* rest) {
                        Ok(value) => Ok(value.into_dynamic()),
                        Err(err) => Err(Error::Call(err.to_string())),
                    }
                }))
            }
        }
    };
}

impl_into_variadic_function!();
impl_into_variadic_function!(A0);
impl_into_variadic_function!(A0, A1);
impl_into_variadic_function!(A0, A1, A2);
impl_into_variadic_function!(A0, A1, A2, A3);
impl_into_variadic_function!(A0, A1, A2, A3, A4);
impl_into_variadic_function!(A0, A1, A2, A3, A4, A5);
impl_into_variadic_function!(A0, A1, A2, A3, A4, A5, A6);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeDescriptor;
    use std::convert::Infallible;

    fn function_of<Args>(f: impl IntoFunction<Args>) -> Function {
        f.into_function().unwrap()
    }

    #[test]
    fn const_function() {
        let f = function_of(|| Ok::<_, Infallible>("hello".to_string()));
        assert!(f.parameters().is_empty());
        let result = f.call(&[]).unwrap();
        assert_eq!(result, DynamicValue::from("hello"));
    }

    #[test]
    fn signature_derivation() {
        let f = function_of(|_a: String, _b: Option<i64>, _c: Vec<bool>| {
            Ok::<_, Infallible>(true)
        });
        let params = f.parameters();
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].ty, TypeDescriptor::String);
        assert!(!params[0].allow_null);
        assert_eq!(params[1].ty, TypeDescriptor::Number);
        assert!(params[1].allow_null);
        assert_eq!(params[2].ty, TypeDescriptor::list(TypeDescriptor::Bool));
        assert!(params[2].allow_null);
        assert!(matches!(
            f.return_type(),
            crate::function::ReturnType::Static(TypeDescriptor::Bool)
        ));
    }

    #[test]
    fn native_error_becomes_call_error() {
        let f = function_of(|flag: bool| {
            if flag {
                Err("refused".to_string())
            } else {
                Ok(1i64)
            }
        });
        let err = f.call(&[DynamicValue::from(true)]).unwrap_err();
        match err {
            Error::Call(message) => assert_eq!(message, "refused"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn conversion_failure_carries_argument_index() {
        let f = function_of(|_n: i64| Ok::<_, Infallible>(0i64));
        let err = f.call(&[DynamicValue::from("nope")]).unwrap_err();
        assert!(matches!(err, Error::Conversion { .. }));
        assert!(err.to_string().contains("[0]"), "got: {}", err);
    }

    #[test]
    fn variadic_signature_and_dispatch() {
        let f = IntoVariadicFunction::into_function(
            |s: String, ss: Vec<String>| -> std::result::Result<Vec<String>, Infallible> {
                let mut out = ss;
                out.push(s);
                Ok(out)
            },
        )
        .unwrap();

        assert_eq!(f.parameters().len(), 1);
        let variadic = f.variadic().expect("variadic parameter");
        assert_eq!(variadic.ty, TypeDescriptor::String);

        // Zero variadic arguments.
        let result = f.call(&[DynamicValue::from("hello")]).unwrap();
        assert_eq!(
            result,
            vec!["hello".to_string()].into_dynamic()
        );

        // One variadic argument.
        let result = f
            .call(&[DynamicValue::from("hello"), DynamicValue::from("world")])
            .unwrap();
        assert_eq!(
            result,
            vec!["world".to_string(), "hello".to_string()].into_dynamic()
        );

        // Three variadic arguments.
        let result = f
            .call(&[
                DynamicValue::from("a"),
                DynamicValue::from("b"),
                DynamicValue::from("c"),
                DynamicValue::from("d"),
            ])
            .unwrap();
        assert_eq!(
            result,
            vec![
                "b".to_string(),
                "c".to_string(),
                "d".to_string(),
                "a".to_string(),
            ]
            .into_dynamic()
        );
    }

    #[test]
    fn dynamic_parameter_is_full_passthrough() {
        let f = function_of(|v: DynamicValue| Ok::<_, Infallible>(v));
        let param = &f.parameters()[0];
        assert!(param.allow_null && param.allow_unknown && param.allow_dynamic && param.allow_marked);

        let marked = DynamicValue::from("x").mark("m");
        let result = f.call(&[marked.clone()]).unwrap();
        assert_eq!(result, marked);
    }
}
