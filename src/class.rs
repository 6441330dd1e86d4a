//! The class/instance object model.
//!
//! A class is a name plus a method table; invoking the class constructs an
//! instance. An instance is a shared reference to its class plus a mutable
//! field map that starts empty and is populated only by property
//! assignment. Method lookup never mutates the class: binding produces a
//! fresh function value per instance.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::error::{LoxError, Result};
use crate::function::Function;
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

#[derive(Debug)]
pub struct Class<'a> {
    pub name: &'a str,
    methods: HashMap<&'a str, Rc<Function<'a>>>,
}

impl<'a> Class<'a> {
    pub fn new(name: &'a str, methods: HashMap<&'a str, Rc<Function<'a>>>) -> Self {
        Class { name, methods }
    }

    pub fn find_method(&self, name: &str) -> Option<&Rc<Function<'a>>> {
        self.methods.get(name)
    }

    /// Constructor arity: `init`'s arity if the class declares one, else 0.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    /// Invoke the class as a constructor: build an instance with no
    /// fields, then run `init` bound to it (its return value is ignored;
    /// the instance is always the result).
    pub fn instantiate(
        this: &Rc<Class<'a>>,
        interpreter: &mut Interpreter<'a>,
        arguments: &[Value<'a>],
    ) -> Result<Value<'a>> {
        debug!("instantiating class {}", this.name);

        let instance = Rc::new(Instance::new(Rc::clone(this)));

        if let Some(init) = this.find_method("init") {
            init.bind(Rc::clone(&instance)).call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

#[derive(Debug)]
pub struct Instance<'a> {
    pub class: Rc<Class<'a>>,
    fields: RefCell<HashMap<&'a str, Value<'a>>>,
}

impl<'a> Instance<'a> {
    pub fn new(class: Rc<Class<'a>>) -> Self {
        Instance {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    /// Property read: fields shadow methods; a method hit binds `this` to
    /// this instance; a miss on both is an undefined-property error.
    pub fn get(this: &Rc<Instance<'a>>, name: &Token<'a>) -> Result<Value<'a>> {
        if let Some(value) = this.fields.borrow().get(name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = this.class.find_method(name.lexeme) {
            return Ok(Value::Function(Rc::new(method.bind(Rc::clone(this)))));
        }

        Err(LoxError::runtime(
            name.line,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    /// Property write: unconditional — fields need no prior declaration.
    pub fn set(&self, name: &Token<'a>, value: Value<'a>) {
        self.fields.borrow_mut().insert(name.lexeme, value);
    }
}
