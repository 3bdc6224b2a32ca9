use crate::object::Object;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use thiserror::Error;

// --- Environment Error ---
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    #[error("identifier not found: {0}")]
    IdentifierNotFound(String),
}

// --- Environment Definition ---

#[derive(Debug, Default)]
pub struct Environment {
    // Shared so that closures and loop bodies can hold on to their parent scope
    outer: Option<Rc<RefCell<Environment>>>,
    bindings: FxHashMap<String, Object>,
}

impl Environment {
    /// Creates a new, top-level (global) environment.
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Environment::default()))
    }

    /// Creates a new environment enclosed within an outer one.
    pub fn new_enclosed(outer_env: Rc<RefCell<Environment>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Environment {
            outer: Some(outer_env),
            bindings: FxHashMap::default(),
        }))
    }

    /// Defines a variable in the *current* environment frame.
    /// Replaces the value if the variable already exists in this frame.
    pub fn define(&mut self, name: impl Into<String>, value: Object) {
        self.bindings.insert(name.into(), value);
    }

    /// Looks up a variable's value.
    /// Checks the current environment first, then walks up the outer environment chain.
    pub fn get(&self, name: &str) -> Result<Object, EnvError> {
        if let Some(value) = self.bindings.get(name) {
            return Ok(value.clone());
        }
        match &self.outer {
            Some(outer_env) => outer_env.borrow().get(name),
            None => Err(EnvError::IdentifierNotFound(name.to_string())),
        }
    }

    /// Updates the nearest frame that already binds `name`.
    /// Errors if the variable is not defined anywhere in the chain.
    pub fn set(&mut self, name: &str, value: Object) -> Result<(), EnvError> {
        self.update(name, value)
            .map_err(|_| EnvError::IdentifierNotFound(name.to_string()))
    }

    /// Assignment semantics: update the nearest existing binding, or create
    /// one in this frame when the name is unbound.
    pub fn assign(&mut self, name: &str, value: Object) {
        if let Err(value) = self.update(name, value) {
            self.define(name, value);
        }
    }

    // Hands `value` back when no frame binds `name`.
    fn update(&mut self, name: &str, value: Object) -> Result<(), Object> {
        if let Some(slot) = self.bindings.get_mut(name) {
            *slot = value;
            return Ok(());
        }
        match &self.outer {
            Some(outer_env) => outer_env.borrow_mut().update(name, value),
            None => Err(value),
        }
    }

    /// Every name visible from this frame, sorted.
    pub fn identifiers(&self) -> BTreeSet<String> {
        let mut identifiers = match &self.outer {
            Some(outer_env) => outer_env.borrow().identifiers(),
            None => BTreeSet::new(),
        };
        identifiers.extend(self.bindings.keys().cloned());
        identifiers
    }
}
