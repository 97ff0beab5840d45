// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Callable functions.
//!
//! A [`Function`] pairs a signature (parameters, optional variadic
//! parameter, return type) with an invoke adapter. Call-time argument
//! policy lives here: null rejection, unknown short-circuiting, and
//! taint-mark stripping with re-application to the result.

mod adapters;
mod registry;

pub use adapters::{IntoFunction, IntoVariadicFunction};
pub use registry::FunctionRegistry;

use crate::diagnostics::Diagnostic;
use crate::error::{Error, Result};
use crate::types::TypeDescriptor;
use crate::value::{DynamicValue, MarkSet};
use std::fmt;
use std::sync::Arc;

/// One declared parameter of a function.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub description: String,
    pub ty: TypeDescriptor,
    /// Accept null arguments instead of rejecting them.
    pub allow_null: bool,
    /// Pass unknown arguments through instead of short-circuiting the
    /// call to an unknown result.
    pub allow_unknown: bool,
    /// Accept arguments whose own type is dynamic.
    pub allow_dynamic: bool,
    /// Receive marked arguments as-is; otherwise marks are stripped
    /// before the call and re-applied to the result.
    pub allow_marked: bool,
}

impl Parameter {
    /// Parameter with all flags off.
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            ty,
            allow_null: false,
            allow_unknown: false,
            allow_dynamic: false,
            allow_marked: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn allow_null(mut self) -> Self {
        self.allow_null = true;
        self
    }

    pub fn allow_unknown(mut self) -> Self {
        self.allow_unknown = true;
        self
    }

    pub fn allow_dynamic(mut self) -> Self {
        self.allow_dynamic = true;
        self
    }

    pub fn allow_marked(mut self) -> Self {
        self.allow_marked = true;
        self
    }

    fn display_name(&self, index: usize) -> String {
        if self.name.is_empty() {
            format!("argument {}", index)
        } else {
            format!("argument {:?}", self.name)
        }
    }
}

/// How a function's return type is determined.
#[derive(Clone)]
pub enum ReturnType {
    /// Fixed, independent of the arguments.
    Static(TypeDescriptor),
    /// Computed from the actual argument types.
    Computed(Arc<dyn Fn(&[TypeDescriptor]) -> Result<TypeDescriptor> + Send + Sync>),
}

impl ReturnType {
    /// Evaluate against the supplied argument types.
    pub fn for_arguments(&self, args: &[TypeDescriptor]) -> Result<TypeDescriptor> {
        match self {
            Self::Static(ty) => Ok(ty.clone()),
            Self::Computed(f) => f(args),
        }
    }
}

impl fmt::Debug for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(ty) => f.debug_tuple("Static").field(ty).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Side-channel access handed to a function while it runs, resolving
/// lookups against the remote caller mid-call. Local calls carry an
/// empty context.
#[derive(Default, Clone)]
pub struct CallContext {
    fetch: Option<Arc<dyn Fetcher>>,
}

impl CallContext {
    /// Context with no side channel.
    pub fn local() -> Self {
        Self::default()
    }

    pub(crate) fn with_fetcher(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetch: Some(fetcher),
        }
    }

    /// The caller's fetch channel, when one was attached to this call.
    pub fn fetcher(&self) -> Option<&dyn Fetcher> {
        self.fetch.as_deref()
    }
}

impl fmt::Debug for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("fetch", &self.fetch.is_some())
            .finish()
    }
}

/// Mid-call side channel back to the caller.
pub trait Fetcher: Send + Sync {
    /// Ask the caller to resolve a named resource lookup.
    fn fetch(
        &self,
        resource_type: &str,
        name: &str,
        request: &DynamicValue,
    ) -> Result<(DynamicValue, Vec<Diagnostic>)>;

    /// Invoke one of the caller's own functions.
    fn call(&self, name: &str, args: &[DynamicValue]) -> Result<DynamicValue>;
}

type Invoke = dyn Fn(&CallContext, &[DynamicValue]) -> Result<DynamicValue> + Send + Sync;

/// A callable bound into a registry.
#[derive(Clone)]
pub struct Function {
    description: String,
    parameters: Vec<Parameter>,
    variadic: Option<Parameter>,
    return_type: ReturnType,
    invoke: Arc<Invoke>,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("variadic", &self.variadic)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

impl Function {
    pub fn builder() -> FunctionBuilder {
        FunctionBuilder::default()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn variadic(&self) -> Option<&Parameter> {
        self.variadic.as_ref()
    }

    pub fn return_type(&self) -> &ReturnType {
        &self.return_type
    }

    /// The parameter governing argument `index`: the fixed parameter at
    /// that position, else the variadic parameter.
    pub fn parameter_for(&self, index: usize) -> Option<&Parameter> {
        self.parameters.get(index).or(self.variadic.as_ref())
    }

    /// Return type for the given actual argument types.
    pub fn return_type_for(&self, args: &[TypeDescriptor]) -> Result<TypeDescriptor> {
        self.return_type.for_arguments(args)
    }

    /// Invoke with no side channel.
    pub fn call(&self, args: &[DynamicValue]) -> Result<DynamicValue> {
        self.call_with(&CallContext::local(), args)
    }

    /// Invoke with the given call context.
    pub fn call_with(&self, ctx: &CallContext, args: &[DynamicValue]) -> Result<DynamicValue> {
        if args.len() < self.parameters.len() {
            return Err(Error::Call(format!(
                "not enough arguments: expected at least {}, got {}",
                self.parameters.len(),
                args.len()
            )));
        }
        if args.len() > self.parameters.len() && self.variadic.is_none() {
            return Err(Error::TooManyArguments {
                expected: self.parameters.len(),
                given: args.len(),
            });
        }

        let mut effective = Vec::with_capacity(args.len());
        let mut stripped = MarkSet::new();
        for (index, arg) in args.iter().enumerate() {
            let parameter = self
                .parameter_for(index)
                .expect("arity checked above");

            if arg.is_null() && !parameter.allow_null {
                return Err(Error::Call(format!(
                    "{} must not be null",
                    parameter.display_name(index)
                )));
            }

            let arg = if arg.is_marked() && !parameter.allow_marked {
                let (unmarked, marks) = arg.clone().unmark();
                stripped.extend(&marks);
                unmarked
            } else {
                arg.clone()
            };

            // An argument whose content (or whole type) is not settled
            // means the result cannot be computed yet.
            if arg.is_unknown() && !parameter.allow_unknown {
                let arg_types: Vec<TypeDescriptor> =
                    args.iter().map(|a| a.ty().clone()).collect();
                let ty = self
                    .return_type_for(&arg_types)
                    .unwrap_or(TypeDescriptor::Unknown);
                return Ok(DynamicValue::unknown(ty).add_marks(&stripped));
            }
            if arg.ty().is_unknown() && !parameter.allow_dynamic && !arg.is_null() {
                return Ok(DynamicValue::dynamic().add_marks(&stripped));
            }

            effective.push(arg);
        }

        let result = (self.invoke)(ctx, &effective)?;
        Ok(result.add_marks(&stripped))
    }
}

/// Builder for [`Function`], in the style of the other entity builders.
#[derive(Default)]
pub struct FunctionBuilder {
    description: String,
    parameters: Vec<Parameter>,
    variadic: Option<Parameter>,
    return_type: Option<ReturnType>,
}

impl FunctionBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn variadic(mut self, parameter: Parameter) -> Self {
        self.variadic = Some(parameter);
        self
    }

    /// Fixed return type.
    pub fn returns(mut self, ty: TypeDescriptor) -> Self {
        self.return_type = Some(ReturnType::Static(ty));
        self
    }

    /// Return type computed from the actual argument types.
    pub fn returns_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&[TypeDescriptor]) -> Result<TypeDescriptor> + Send + Sync + 'static,
    {
        self.return_type = Some(ReturnType::Computed(Arc::new(f)));
        self
    }

    /// Finish with the invoke adapter. The adapter receives arguments
    /// that already passed the parameter checks.
    pub fn build<F>(self, invoke: F) -> Function
    where
        F: Fn(&CallContext, &[DynamicValue]) -> Result<DynamicValue> + Send + Sync + 'static,
    {
        Function {
            description: self.description,
            parameters: self.parameters,
            variadic: self.variadic,
            return_type: self
                .return_type
                .unwrap_or(ReturnType::Static(TypeDescriptor::Unknown)),
            invoke: Arc::new(invoke),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::SENSITIVE;

    fn upper() -> Function {
        Function::builder()
            .parameter(Parameter::new("s", TypeDescriptor::String))
            .returns(TypeDescriptor::String)
            .build(|_ctx, args| {
                let s = args[0].as_str().unwrap_or_default();
                Ok(DynamicValue::string(s.to_uppercase()))
            })
    }

    #[test]
    fn plain_call() {
        let f = upper();
        let result = f.call(&[DynamicValue::from("abc")]).unwrap();
        assert_eq!(result, DynamicValue::from("ABC"));
    }

    #[test]
    fn too_many_arguments_never_invokes() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let invoked = Arc::new(AtomicBool::new(false));
        let seen = invoked.clone();
        let f = Function::builder()
            .parameter(Parameter::new("a", TypeDescriptor::String))
            .parameter(Parameter::new("b", TypeDescriptor::String))
            .returns(TypeDescriptor::String)
            .build(move |_ctx, _args| {
                seen.store(true, Ordering::SeqCst);
                Ok(DynamicValue::from(""))
            });

        let err = f
            .call(&[
                DynamicValue::from("1"),
                DynamicValue::from("2"),
                DynamicValue::from("3"),
            ])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::TooManyArguments {
                expected: 2,
                given: 3
            }
        ));
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[test]
    fn null_argument_rejected_by_default() {
        let f = upper();
        let err = f.call(&[DynamicValue::null(TypeDescriptor::String)]).unwrap_err();
        assert!(err.to_string().contains("must not be null"));
    }

    #[test]
    fn unknown_argument_short_circuits_to_unknown_result() {
        let f = upper();
        let result = f
            .call(&[DynamicValue::unknown(TypeDescriptor::String)])
            .unwrap();
        assert!(result.is_unknown());
        assert_eq!(result.ty(), &TypeDescriptor::String);
    }

    #[test]
    fn marks_strip_and_propagate_to_result() {
        let f = upper();
        let result = f
            .call(&[DynamicValue::from("abc").mark(SENSITIVE)])
            .unwrap();
        assert!(result.marks().contains(SENSITIVE));
        assert!(result.content_eq(&DynamicValue::from("ABC")));
    }

    #[test]
    fn computed_return_type_sees_argument_types() {
        let f = Function::builder()
            .parameter(
                Parameter::new("v", TypeDescriptor::Unknown)
                    .allow_dynamic()
                    .allow_null(),
            )
            .returns_with(|args| Ok(args[0].clone()))
            .build(|_ctx, args| Ok(args[0].clone()));

        let rt = f.return_type_for(&[TypeDescriptor::Bool]).unwrap();
        assert_eq!(rt, TypeDescriptor::Bool);
    }

    #[test]
    fn not_enough_arguments_is_a_call_error() {
        let f = upper();
        let err = f.call(&[]).unwrap_err();
        assert!(matches!(err, Error::Call(_)));
    }
}
