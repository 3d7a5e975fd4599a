//! # Environment
//!
//! A scope frame: bindings plus an optional enclosing frame. Frames are
//! reference-counted so a closure can keep its defining frame alive after
//! the call that created it has returned.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::parser::ast::Statement;
use crate::value::Value;

pub type EnvRef = Rc<RefCell<Environment>>;

/// Reserved names; they start with `_` so the public projection never
/// shows them.
pub const RESULT_NAME: &str = "___#RESULT#___";
pub const RETURN_NAME: &str = "___#RETURN#___";
pub const BREAK_NAME: &str = "___#BREAK#___";
pub const CONTINUE_NAME: &str = "___#CONTINUE#___";

/// What created a frame. Function frames are the capture points for
/// closures and the barrier control-flow sentinels cannot cross.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Root,
    Function,
    Block,
}

/// A `reference` parameter: the name stands for an access chain resolved
/// in the caller's frame, so writes go through to the caller's object.
#[derive(Debug, Clone)]
pub struct Alias {
    pub members: Vec<Statement>,
    pub environment: EnvRef,
}

#[derive(Debug)]
pub struct Environment {
    variables: IndexMap<String, Value>,
    aliases: IndexMap<String, Alias>,
    enclosing: Option<EnvRef>,
    kind: ScopeKind,
}

impl Environment {
    pub fn new(kind: ScopeKind) -> EnvRef {
        Rc::new(RefCell::new(Self {
            variables: IndexMap::new(),
            aliases: IndexMap::new(),
            enclosing: None,
            kind,
        }))
    }

    pub fn with_enclosing(enclosing: &EnvRef, kind: ScopeKind) -> EnvRef {
        Rc::new(RefCell::new(Self {
            variables: IndexMap::new(),
            aliases: IndexMap::new(),
            enclosing: Some(Rc::clone(enclosing)),
            kind,
        }))
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Look a name up walking root-ward; the first hit wins.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.variables.get(name) {
            return Some(value.clone());
        }
        self.enclosing
            .as_ref()
            .and_then(|enclosing| enclosing.borrow().get(name))
    }

    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.variables.get(name).cloned()
    }

    pub fn has_local(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Update an existing binding walking root-ward. Returns false when the
    /// name is bound nowhere in the chain.
    pub fn modify(&mut self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.variables.get_mut(name) {
            *slot = value;
            return true;
        }
        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().modify(name, value),
            None => false,
        }
    }

    /// Create or update a binding in this frame only. Used for parameters,
    /// `for` variables, and the reserved sentinels.
    pub fn define(&mut self, name: &str, value: Value) {
        self.variables.insert(name.to_string(), value);
    }

    /// Ordinary assignment: modify wherever the name lives, else create it
    /// here.
    pub fn assign(&mut self, name: &str, value: Value) {
        if !self.modify(name, value.clone()) {
            self.define(name, value);
        }
    }

    /// Drop a binding, walking root-ward to the first frame that has it.
    pub fn remove(&mut self, name: &str) -> bool {
        if self.variables.shift_remove(name).is_some() {
            return true;
        }
        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().remove(name),
            None => false,
        }
    }

    /// Take a binding out of this frame only (sentinel handling).
    pub fn take_local(&mut self, name: &str) -> Option<Value> {
        self.variables.shift_remove(name)
    }

    pub fn define_alias(&mut self, name: &str, alias: Alias) {
        self.aliases.insert(name.to_string(), alias);
    }

    pub fn find_alias(&self, name: &str) -> Option<Alias> {
        if let Some(alias) = self.aliases.get(name) {
            return Some(alias.clone());
        }
        self.enclosing
            .as_ref()
            .and_then(|enclosing| enclosing.borrow().find_alias(name))
    }

    /// The part of this frame visible to outside readers: no names
    /// starting with `_`, no callable definitions that were never bound as
    /// references. A present result-value is returned instead.
    pub fn projection(&self) -> Value {
        if let Some(result) = self.variables.get(RESULT_NAME) {
            return result.clone();
        }

        let mut members = IndexMap::new();
        for (name, value) in &self.variables {
            if name.starts_with('_') {
                continue;
            }
            if let Value::Function(function) = value {
                if !function.is_reference {
                    continue;
                }
            }
            members.insert(name.clone(), value.clone());
        }
        Value::Object(members)
    }
}
