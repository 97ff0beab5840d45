// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Function registry.
//!
//! An explicitly constructed name-to-function table, owned by the host
//! and handed to the bridge. Registration happens once at startup;
//! after that the table is read concurrently by any number of calls.
//! Registering a name twice is a configuration error, decided on the
//! first conflict.

use crate::error::{Error, Result};
use crate::function::{CallContext, Function, IntoFunction, IntoVariadicFunction};
use crate::value::DynamicValue;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Name-to-function table.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: RwLock<HashMap<String, Arc<Function>>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to a pre-built function.
    pub fn register(&self, name: impl Into<String>, function: Function) -> Result<()> {
        let name = name.into();
        let mut functions = self.functions.write();
        if functions.contains_key(&name) {
            return Err(Error::Configuration(format!(
                "function {:?} already registered",
                name
            )));
        }
        log::debug!("registry: registered function {:?}", name);
        functions.insert(name, Arc::new(function));
        Ok(())
    }

    /// Bind `name` to a native closure, deriving the signature from its
    /// parameter and return types.
    pub fn register_native<F, Args>(&self, name: impl Into<String>, f: F) -> Result<()>
    where
        F: IntoFunction<Args>,
    {
        self.register(name, f.into_function()?)
    }

    /// Bind `name` to a native closure whose final `Vec<T>` parameter
    /// is variadic.
    pub fn register_variadic<F, Args>(&self, name: impl Into<String>, f: F) -> Result<()>
    where
        F: IntoVariadicFunction<Args>,
    {
        self.register(name, f.into_function()?)
    }

    /// Look up one function.
    pub fn get(&self, name: &str) -> Option<Arc<Function>> {
        self.functions.read().get(name).cloned()
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// All entries, sorted by name.
    pub fn entries(&self) -> Vec<(String, Arc<Function>)> {
        let mut entries: Vec<(String, Arc<Function>)> = self
            .functions
            .read()
            .iter()
            .map(|(name, function)| (name.clone(), function.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.functions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.read().is_empty()
    }

    /// Call a registered function by name.
    pub fn call(&self, name: &str, args: &[DynamicValue]) -> Result<DynamicValue> {
        self.call_with(&CallContext::local(), name, args)
    }

    /// Call a registered function by name, with a call context.
    pub fn call_with(
        &self,
        ctx: &CallContext,
        name: &str,
        args: &[DynamicValue],
    ) -> Result<DynamicValue> {
        let function = self
            .get(name)
            .ok_or_else(|| Error::FunctionNotFound(name.to_string()))?;
        function.call_with(ctx, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[test]
    fn register_and_call() {
        let registry = FunctionRegistry::new();
        registry
            .register_native("concat", |a: String, b: String| {
                Ok::<_, Infallible>(a + &b)
            })
            .unwrap();

        let result = registry
            .call("concat", &[DynamicValue::from("foo"), DynamicValue::from("bar")])
            .unwrap();
        assert_eq!(result, DynamicValue::from("foobar"));
        assert!(!result.is_null());
        assert!(!result.is_unknown());
        assert!(result.marks().is_empty());
    }

    #[test]
    fn duplicate_name_is_fatal() {
        let registry = FunctionRegistry::new();
        registry
            .register_native("twice", || Ok::<_, Infallible>(1i64))
            .unwrap();
        let err = registry
            .register_native("twice", || Ok::<_, Infallible>(2i64))
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_name_is_not_found() {
        let registry = FunctionRegistry::new();
        let err = registry.call("missing", &[]).unwrap_err();
        assert!(matches!(err, Error::FunctionNotFound(_)));
    }

    #[test]
    fn names_are_sorted() {
        let registry = FunctionRegistry::new();
        registry
            .register_native("zeta", || Ok::<_, Infallible>(0i64))
            .unwrap();
        registry
            .register_native("alpha", || Ok::<_, Infallible>(0i64))
            .unwrap();
        assert_eq!(registry.names(), vec!["alpha".to_string(), "zeta".to_string()]);
    }

    #[test]
    fn concurrent_registration_under_distinct_names() {
        let registry = Arc::new(FunctionRegistry::new());
        let mut handles = Vec::new();
        for i in 0..8usize {
            let registry = registry.clone();
            handles.push(std::thread::spawn(move || {
                registry
                    .register_native(format!("fn{}", i), move || {
                        Ok::<_, Infallible>(i as i64)
                    })
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 8);
    }

    #[test]
    fn concurrent_reads_while_calling() {
        let registry = Arc::new(FunctionRegistry::new());
        registry
            .register_native("echo", |v: String| Ok::<_, Infallible>(v))
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let registry = registry.clone();
            handles.push(std::thread::spawn(move || {
                let arg = DynamicValue::from(format!("m{}", i));
                for _ in 0..100 {
                    let result = registry.call("echo", &[arg.clone()]).unwrap();
                    assert_eq!(result, arg);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
