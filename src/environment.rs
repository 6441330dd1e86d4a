//! The lexical scope chain.
//!
//! Each [`Environment`] maps names to values and optionally links to the
//! scope that encloses it. The links are `Rc<RefCell<_>>` handles because
//! scopes have multiple owners: the interpreter's current-scope pointer,
//! every nested block, and every closure that captured the scope. A scope
//! therefore outlives block exit exactly as long as some closure still
//! holds it, and the chain is acyclic by construction — a scope can only
//! link to one that already existed when it was created.
//!
//! Two access styles coexist. Name-searched [`get`](Environment::get) /
//! [`assign`](Environment::assign) walk the chain outward and are used for
//! globals. Distance-indexed [`get_at`](Environment::get_at) /
//! [`assign_at`](Environment::assign_at) jump directly to the scope the
//! resolver computed, never re-deriving the search at runtime.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::trace;

use crate::error::{LoxError, Result};
use crate::value::Value;

#[derive(Debug, Default)]
pub struct Environment<'a> {
    values: HashMap<&'a str, Value<'a>>,
    enclosing: Option<Rc<RefCell<Environment<'a>>>>,
}

impl<'a> Environment<'a> {
    /// A root scope with no parent (the globals).
    pub fn new() -> Self {
        Environment::default()
    }

    /// A child scope of `enclosing`.
    pub fn with_enclosing(enclosing: Rc<RefCell<Environment<'a>>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Insert or overwrite `name` in *this* scope only. Redeclaration is
    /// deliberate: `var a = 1; var a = 2;` is legal at the top level.
    pub fn define(&mut self, name: &'a str, value: Value<'a>) {
        trace!("define {:?} = {}", name, value);

        self.values.insert(name, value);
    }

    /// Look `name` up, searching outward. Failing at the outermost scope
    /// is the undefined-variable error.
    pub fn get(&self, name: &str, line: usize) -> Result<Value<'a>> {
        if let Some(value) = self.values.get(name) {
            return Ok(value.clone());
        }

        match &self.enclosing {
            Some(parent) => parent.borrow().get(name, line),
            None => Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            )),
        }
    }

    /// Overwrite the nearest existing binding of `name`, searching
    /// outward. Assignment never creates a binding; a miss at the
    /// outermost scope is the undefined-variable error.
    pub fn assign(&mut self, name: &str, value: Value<'a>, line: usize) -> Result<()> {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            return Ok(());
        }

        match &self.enclosing {
            Some(parent) => parent.borrow_mut().assign(name, value, line),
            None => Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            )),
        }
    }

    /// The scope exactly `distance` links up from `env`; `None` if the
    /// chain is shorter, which only a resolver defect can produce.
    fn ancestor(
        env: &Rc<RefCell<Environment<'a>>>,
        distance: usize,
    ) -> Option<Rc<RefCell<Environment<'a>>>> {
        let mut scope = Rc::clone(env);

        for _ in 0..distance {
            let parent = scope.borrow().enclosing.clone();
            scope = parent?;
        }

        Some(scope)
    }

    /// Read `name` from the scope `distance` links up, with no name
    /// search.
    pub fn get_at(
        env: &Rc<RefCell<Environment<'a>>>,
        distance: usize,
        name: &str,
    ) -> Option<Value<'a>> {
        let scope = Self::ancestor(env, distance)?;
        let value = scope.borrow().values.get(name).cloned();

        value
    }

    /// Overwrite `name` in the scope `distance` links up. `None` if the
    /// binding is missing there.
    pub fn assign_at(
        env: &Rc<RefCell<Environment<'a>>>,
        distance: usize,
        name: &str,
        value: Value<'a>,
    ) -> Option<()> {
        let scope = Self::ancestor(env, distance)?;
        let mut scope = scope.borrow_mut();
        let slot = scope.values.get_mut(name)?;

        *slot = value;

        Some(())
    }
}
