//! The runtime evaluation engine.
//!
//! [`Interpreter`] walks the AST depth-first: [`evaluate`](Interpreter::evaluate)
//! produces a value per expression, [`execute`](Interpreter::execute) runs a
//! statement for effect. It owns the scope chain, the globals, and the
//! distance table the resolver filled in.
//!
//! `return` is not an error: `execute` yields a [`Flow`] and a
//! `Flow::Return` rides ordinary control flow up to the nearest function
//! invocation, where it is intercepted. The `Result` channel is reserved
//! for genuine runtime errors, which unwind all the way to
//! [`interpret`](Interpreter::interpret) and stop the program there.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::class::{Class, Instance};
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::expr::{Expr, ExprId, LiteralValue};
use crate::function::{Function, NativeFunction};
use crate::stmt::Stmt;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// How a statement (sequence) finished: fell off the end, or hit a
/// `return` carrying a value.
#[derive(Debug)]
pub enum Flow<'a> {
    Normal,
    Return(Value<'a>),
}

pub struct Interpreter<'a> {
    /// The outermost scope; name-searched fallback for everything the
    /// resolver left unresolved.
    globals: Rc<RefCell<Environment<'a>>>,

    /// The scope currently in effect.
    environment: Rc<RefCell<Environment<'a>>>,

    /// Resolver output: scope hops per variable/assignment/`this` node.
    /// Absent entry means "global, look up by name".
    locals: HashMap<ExprId, usize>,

    /// Where `print` writes. Stdout in the binary; a buffer in tests.
    output: Box<dyn Write>,
}

fn clock<'v>(_args: &[Value<'v>]) -> std::result::Result<Value<'v>, String> {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| format!("clock went backwards: {}", e))?
        .as_secs_f64();

    Ok(Value::Number(seconds))
}

impl<'a> Interpreter<'a> {
    /// An interpreter printing to stdout, with the native globals seeded.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// An interpreter whose `print` statements write to `output`.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        info!("initializing interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        let mut interpreter = Interpreter {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output,
        };

        interpreter.define_native(NativeFunction {
            name: "clock",
            arity: 0,
            func: clock,
        });

        interpreter
    }

    /// Registration point for host capabilities: binds `native` by name in
    /// the globals.
    pub fn define_native(&mut self, native: NativeFunction) {
        debug!("defining native fn '{}'", native.name);

        let name = native.name;

        self.globals
            .borrow_mut()
            .define(name, Value::Native(Rc::new(native)));
    }

    /// Record (or overwrite) the scope distance for a resolvable node.
    /// Called by the resolver, consulted by later lookups on that node.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Execute a program. Stops at the first runtime error and returns it;
    /// the effects of statements already executed persist.
    pub fn interpret(&mut self, statements: &[Stmt<'a>]) -> Result<()> {
        info!("interpreting {} statements", statements.len());

        for statement in statements {
            // A Return surfacing here means a top-level `return` slipped
            // past the resolver; there is no frame to unwind to.
            if let Flow::Return(_) = self.execute(statement)? {
                debug!("top-level return reached interpret; stopping");
                break;
            }
        }

        Ok(())
    }

    /// Execute one statement, reporting how it finished.
    pub fn execute(&mut self, stmt: &Stmt<'a>) -> Result<Flow<'a>> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;

                writeln!(self.output, "{}", value)?;

                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("var {} = {}", name.lexeme, value);

                self.environment.borrow_mut().define(name.lexeme, value);

                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let scope = Environment::with_enclosing(Rc::clone(&self.environment));

                self.execute_block(statements, Rc::new(RefCell::new(scope)))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.evaluate(condition)?;

                if is_truthy(&condition) {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                loop {
                    let condition = self.evaluate(condition)?;

                    if !is_truthy(&condition) {
                        break;
                    }

                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::Function(declaration) => {
                // The closure is the scope current *now*, at declaration.
                let function =
                    Function::new(Rc::clone(declaration), Rc::clone(&self.environment), false);

                self.environment
                    .borrow_mut()
                    .define(declaration.name.lexeme, Value::Function(Rc::new(function)));

                Ok(Flow::Normal)
            }

            Stmt::Return { keyword: _, value } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Ok(Flow::Return(value))
            }

            Stmt::Class { name, methods } => {
                // Pre-bind the name so methods can close over a scope in
                // which the class name already exists.
                self.environment.borrow_mut().define(name.lexeme, Value::Nil);

                let mut table: HashMap<&'a str, Rc<Function<'a>>> = HashMap::new();

                for method in methods {
                    let is_initializer = method.name.lexeme == "init";
                    let function = Function::new(
                        Rc::clone(method),
                        Rc::clone(&self.environment),
                        is_initializer,
                    );

                    table.insert(method.name.lexeme, Rc::new(function));
                }

                let class = Value::Class(Rc::new(Class::new(name.lexeme, table)));

                self.environment
                    .borrow_mut()
                    .assign(name.lexeme, class, name.line)?;

                Ok(Flow::Normal)
            }
        }
    }

    /// Run `statements` inside `scope`, restoring the previous scope on
    /// every exit path: normal completion, runtime error, or return.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt<'a>],
        scope: Rc<RefCell<Environment<'a>>>,
    ) -> Result<Flow<'a>> {
        let previous = Rc::clone(&self.environment);
        self.environment = scope;

        let mut flow = Ok(Flow::Normal);

        for statement in statements {
            match self.execute(statement) {
                Ok(Flow::Normal) => continue,
                interrupted => {
                    flow = interrupted;
                    break;
                }
            }
        }

        self.environment = previous;

        flow
    }

    /// Evaluate an expression to a value.
    pub fn evaluate(&mut self, expr: &Expr<'a>) -> Result<Value<'a>> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(LoxError::runtime(
                            operator.line,
                            "Operand must be a number.",
                        )),
                    },

                    TokenType::BANG => Ok(Value::Bool(!is_truthy(&right))),

                    _ => Err(LoxError::runtime(operator.line, "Invalid unary operator.")),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;

                self.binary_op(operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;

                // Short-circuit: the result is an operand, not a bool.
                match operator.token_type {
                    TokenType::OR if is_truthy(&left) => Ok(left),
                    TokenType::AND if !is_truthy(&left) => Ok(left),
                    _ => self.evaluate(right),
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(name, *id),

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(
                            &self.environment,
                            distance,
                            name.lexeme,
                            value.clone(),
                        )
                        .ok_or_else(|| {
                            LoxError::runtime(
                                name.line,
                                format!("Undefined variable '{}'.", name.lexeme),
                            )
                        })?;
                    }

                    None => {
                        self.globals
                            .borrow_mut()
                            .assign(name.lexeme, value.clone(), name.line)?;
                    }
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut args = Vec::with_capacity(arguments.len());

                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                self.invoke_callable(callee, paren, args)
            }

            Expr::Get { object, name } => {
                let object = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => Instance::get(&instance, name),
                    _ => Err(LoxError::runtime(
                        name.line,
                        "Only instances have properties.",
                    )),
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object = self.evaluate(object)?;

                let Value::Instance(instance) = object else {
                    return Err(LoxError::runtime(name.line, "Only instances have fields."));
                };

                let value = self.evaluate(value)?;

                instance.set(name, value.clone());

                Ok(value)
            }
        }
    }

    /// A variable or `this` read: resolved nodes jump straight to their
    /// scope, unresolved ones fall back to the globals by name.
    fn look_up_variable(&self, name: &Token<'a>, id: ExprId) -> Result<Value<'a>> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, name.lexeme)
                .ok_or_else(|| {
                    LoxError::runtime(
                        name.line,
                        format!("Undefined variable '{}'.", name.lexeme),
                    )
                }),

            None => self.globals.borrow().get(name.lexeme, name.line),
        }
    }

    fn binary_op(
        &mut self,
        operator: &Token<'a>,
        left: Value<'a>,
        right: Value<'a>,
    ) -> Result<Value<'a>> {
        match operator.token_type {
            // `+` is the one overloaded operator; nothing coerces.
            TokenType::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                (Value::String(mut a), Value::String(b)) => {
                    a.push_str(&b);
                    Ok(Value::String(a))
                }

                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::MINUS => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(a * b))
            }

            TokenType::SLASH => {
                let (a, b) = number_operands(operator, &left, &right)?;

                if b == 0.0 {
                    return Err(LoxError::runtime(operator.line, "Division by zero."));
                }

                Ok(Value::Number(a / b))
            }

            TokenType::GREATER => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a > b))
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a >= b))
            }

            TokenType::LESS => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a < b))
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a <= b))
            }

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

            _ => Err(LoxError::runtime(operator.line, "Invalid binary operator.")),
        }
    }

    /// Dispatch a call across the three callable kinds. Arity is checked
    /// here, once, so the callees can assume it.
    fn invoke_callable(
        &mut self,
        callee: Value<'a>,
        paren: &Token<'a>,
        arguments: Vec<Value<'a>>,
    ) -> Result<Value<'a>> {
        match callee {
            Value::Native(native) => {
                check_arity(native.arity, arguments.len(), paren)?;

                (native.func)(&arguments)
                    .map_err(|message| LoxError::runtime(paren.line, message))
            }

            Value::Function(function) => {
                check_arity(function.arity(), arguments.len(), paren)?;

                function.call(self, &arguments)
            }

            Value::Class(class) => {
                check_arity(class.arity(), arguments.len(), paren)?;

                Class::instantiate(&class, self, &arguments)
            }

            _ => Err(LoxError::runtime(
                paren.line,
                "Can only call functions and classes.",
            )),
        }
    }
}

impl Default for Interpreter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// `nil` and `false` are falsy; every other value — `0` and `""`
/// included — is truthy.
pub fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Nil | Value::Bool(false))
}

fn check_arity(expected: usize, got: usize, paren: &Token<'_>) -> Result<()> {
    if expected != got {
        return Err(LoxError::runtime(
            paren.line,
            format!("Expected {} arguments but got {}.", expected, got),
        ));
    }

    Ok(())
}

fn number_operands(operator: &Token<'_>, left: &Value<'_>, right: &Value<'_>) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(LoxError::runtime(
            operator.line,
            "Operands must be numbers.",
        )),
    }
}
