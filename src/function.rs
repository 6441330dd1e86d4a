//! Callable values: host-provided natives and user-defined functions.
//!
//! Both expose the same contract the evaluator relies on — an arity and an
//! invoke operation taking the interpreter plus already-arity-checked
//! arguments. The third callable kind, a class acting as its own
//! constructor, lives in [`crate::class`].

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use crate::class::Instance;
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::interpreter::{Flow, Interpreter};
use crate::stmt::FunctionDecl;
use crate::value::Value;

/// Signature of a host-provided native. Failures surface as a message the
/// evaluator wraps into a runtime error at the call site.
pub type NativeFn = for<'v> fn(&[Value<'v>]) -> std::result::Result<Value<'v>, String>;

/// A function implemented by the host rather than in Lox.
#[derive(Debug)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeFn,
}

/// A user-defined function or method: its declaration plus the scope that
/// was current when it was declared.
///
/// The captured `closure` handle is fixed for the function's lifetime; the
/// scope's *contents* may still change through other handles, which is what
/// makes sibling closures share mutable state.
#[derive(Debug)]
pub struct Function<'a> {
    declaration: Rc<FunctionDecl<'a>>,
    closure: Rc<RefCell<Environment<'a>>>,
    is_initializer: bool,
}

impl<'a> Function<'a> {
    pub fn new(
        declaration: Rc<FunctionDecl<'a>>,
        closure: Rc<RefCell<Environment<'a>>>,
        is_initializer: bool,
    ) -> Self {
        Function {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &'a str {
        self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// A copy of this function whose closure chain gains one extra layer
    /// binding `this` to `instance`.
    ///
    /// The original closure is untouched, so binding the same method to
    /// two instances yields two independent callables.
    pub fn bind(&self, instance: Rc<Instance<'a>>) -> Function<'a> {
        let mut scope = Environment::with_enclosing(Rc::clone(&self.closure));

        scope.define("this", Value::Instance(instance));

        Function {
            declaration: Rc::clone(&self.declaration),
            closure: Rc::new(RefCell::new(scope)),
            is_initializer: self.is_initializer,
        }
    }

    /// Invoke with already-arity-checked arguments.
    ///
    /// Parameters bind positionally in a fresh scope enclosing the
    /// closure. An initializer always evaluates to the instance bound to
    /// `this` in its closure layer — even when its body ran a `return`,
    /// whose carried value is discarded. Any other function evaluates to
    /// the returned value, or `nil` when the body completes normally.
    pub fn call(
        &self,
        interpreter: &mut Interpreter<'a>,
        arguments: &[Value<'a>],
    ) -> Result<Value<'a>> {
        debug!("calling <fn {}>", self.name());

        let scope = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            &self.closure,
        ))));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            scope.borrow_mut().define(param.lexeme, argument.clone());
        }

        let flow = interpreter.execute_block(&self.declaration.body, scope)?;

        if self.is_initializer {
            return Environment::get_at(&self.closure, 0, "this").ok_or_else(|| {
                LoxError::runtime(self.declaration.name.line, "Initializer lost its instance.")
            });
        }

        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }
}
