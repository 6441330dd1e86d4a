//! Static resolution pass.
//!
//! One walk over the tree, after parsing and before execution, that does
//! two jobs:
//!
//! 1. For every variable read, assignment, and `this`, count how many
//!    scopes sit between the use and its declaration, and record that
//!    distance with the interpreter ([`Interpreter::resolve`]). Names
//!    found in no lexical scope get no entry and resolve dynamically in
//!    the globals.
//! 2. Reject statically-detectable misuse: reading a local inside its own
//!    initializer, redeclaring a local, `return` outside any function,
//!    and `this` outside any class. The runtime relies on this — in
//!    particular, a `return` can then never escape past a call frame.
//!
//! A value-carrying `return` inside `init` is deliberately *not* an
//! error here: the runtime discards the value and yields the instance.
//!
//! Scopes are a stack of maps; the `bool` tracks declared-but-not-yet-
//! defined, which is what catches `var a = a;`.

use std::collections::HashMap;

use log::{debug, info};

use crate::error::{LoxError, Result};
use crate::expr::{Expr, ExprId};
use crate::interpreter::Interpreter;
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::Token;

/// What kind of function body, if any, we are currently inside.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

/// Whether we are inside a class body (gates `this`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
}

pub struct Resolver<'a, 'i> {
    interpreter: &'i mut Interpreter<'a>,

    /// Innermost scope last. `false` = declared, `true` = defined.
    scopes: Vec<HashMap<&'a str, bool>>,

    current_function: FunctionType,
    current_class: ClassType,
}

impl<'a, 'i> Resolver<'a, 'i> {
    pub fn new(interpreter: &'i mut Interpreter<'a>) -> Self {
        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    /// Resolve a whole program.
    pub fn resolve(&mut self, statements: &[Stmt<'a>]) -> Result<()> {
        info!("resolving {} top-level statements", statements.len());

        for statement in statements {
            self.resolve_stmt(statement)?;
        }

        Ok(())
    }

    fn resolve_stmt(&mut self, stmt: &Stmt<'a>) -> Result<()> {
        match stmt {
            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),

            Stmt::Var { name, initializer } => {
                self.declare(name)?;

                if let Some(expr) = initializer {
                    self.resolve_expr(expr)?;
                }

                self.define(name);

                Ok(())
            }

            Stmt::Block(statements) => {
                self.begin_scope();

                for statement in statements {
                    self.resolve_stmt(statement)?;
                }

                self.end_scope();

                Ok(())
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(then_branch)?;

                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch)?;
                }

                Ok(())
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(body)
            }

            Stmt::Function(declaration) => {
                // The name is defined before the body resolves, so the
                // function can call itself.
                self.declare(declaration.name)?;
                self.define(declaration.name);

                self.resolve_function(declaration, FunctionType::Function)
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    return Err(LoxError::resolve(
                        keyword.line,
                        "Cannot return from top-level code",
                    ));
                }

                if let Some(expr) = value {
                    self.resolve_expr(expr)?;
                }

                Ok(())
            }

            Stmt::Class { name, methods } => {
                let enclosing_class = self.current_class;
                self.current_class = ClassType::Class;

                self.declare(name)?;
                self.define(name);

                // Method bodies see `this` one scope above their
                // parameters, matching the layer `bind` inserts at
                // runtime.
                self.begin_scope();

                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert("this", true);
                }

                for method in methods {
                    let kind = if method.name.lexeme == "init" {
                        FunctionType::Initializer
                    } else {
                        FunctionType::Method
                    };

                    self.resolve_function(method, kind)?;
                }

                self.end_scope();

                self.current_class = enclosing_class;

                Ok(())
            }
        }
    }

    fn resolve_expr(&mut self, expr: &Expr<'a>) -> Result<()> {
        match expr {
            Expr::Literal(_) => Ok(()),

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)
            }

            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(name.lexeme) == Some(&false) {
                        return Err(LoxError::resolve(
                            name.line,
                            "Cannot read local variable in its own initializer",
                        ));
                    }
                }

                self.resolve_local(*id, name);

                Ok(())
            }

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value)?;
                self.resolve_local(*id, name);

                Ok(())
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee)?;

                for argument in arguments {
                    self.resolve_expr(argument)?;
                }

                Ok(())
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object)?;
                self.resolve_expr(value)
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    return Err(LoxError::resolve(
                        keyword.line,
                        "Cannot use 'this' outside of a class",
                    ));
                }

                self.resolve_local(*id, keyword);

                Ok(())
            }
        }
    }

    /// Parameters and body get their own scope; `kind` tracks what
    /// `return` means in here.
    fn resolve_function(
        &mut self,
        declaration: &FunctionDecl<'a>,
        kind: FunctionType,
    ) -> Result<()> {
        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();

        for param in &declaration.params {
            self.declare(param)?;
            self.define(param);
        }

        for statement in &declaration.body {
            self.resolve_stmt(statement)?;
        }

        self.end_scope();

        self.current_function = enclosing;

        Ok(())
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Mark `name` as existing-but-unusable in the innermost scope.
    /// Top level has no scope; globals may redeclare freely.
    fn declare(&mut self, name: &Token<'a>) -> Result<()> {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(name.lexeme) {
                return Err(LoxError::resolve(
                    name.line,
                    "Variable already declared in this scope",
                ));
            }

            scope.insert(name.lexeme, false);
        }

        Ok(())
    }

    fn define(&mut self, name: &Token<'a>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme, true);
        }
    }

    /// Record how many scopes out `name` was found, innermost first.
    /// Found nowhere ⇒ leave no entry; the interpreter will try the
    /// globals by name.
    fn resolve_local(&mut self, id: ExprId, name: &Token<'a>) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name.lexeme) {
                debug!("resolved '{}' at depth {}", name.lexeme, depth);

                self.interpreter.resolve(id, depth);

                return;
            }
        }

        debug!("'{}' not in any lexical scope; treating as global", name.lexeme);
    }
}
