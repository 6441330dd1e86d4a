#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::Write;
    use std::rc::Rc;

    use loxide::error::LoxError;
    use loxide::interpreter::Interpreter;
    use loxide::parser::Parser;
    use loxide::resolver::Resolver;
    use loxide::scanner::Scanner;
    use loxide::token::Token;

    /// `Write` sink the test keeps a handle on after the interpreter
    /// takes ownership of its clone.
    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).expect("interpreter output is UTF-8")
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Scan, parse, resolve, and run `source`, returning everything the
    /// program printed. Output produced before a runtime error is lost
    /// here; use [`run_err`] to inspect failures.
    fn run(source: &str) -> Result<String, LoxError> {
        let tokens: Vec<Token<'_>> = Scanner::new(source.as_bytes()).collect::<Result<_, _>>()?;

        let statements = Parser::new(&tokens).parse()?;

        let buffer = SharedBuffer::default();
        let mut interpreter = Interpreter::with_output(Box::new(buffer.clone()));

        Resolver::new(&mut interpreter).resolve(&statements)?;
        interpreter.interpret(&statements)?;

        Ok(buffer.contents())
    }

    fn run_ok(source: &str) -> String {
        run(source).expect("program should run cleanly")
    }

    fn run_err(source: &str) -> LoxError {
        run(source).expect_err("program should fail")
    }

    // ── operators ─────────────────────────────────────────────────────

    #[test]
    fn arithmetic_and_concatenation() {
        assert_eq!(run_ok("print 2 + 3;"), "5\n");
        assert_eq!(run_ok("print \"a\" + \"b\";"), "ab\n");
        assert_eq!(run_ok("print 10 - 4 * 2;"), "2\n");
        assert_eq!(run_ok("print -(3);"), "-3\n");
    }

    #[test]
    fn plus_never_coerces() {
        let err = run_err("print \"a\" + 1;");
        assert!(err
            .to_string()
            .contains("Operands must be two numbers or two strings"));

        let err = run_err("print 2 + \"a\";");
        assert!(err
            .to_string()
            .contains("Operands must be two numbers or two strings"));
    }

    #[test]
    fn arithmetic_requires_numbers() {
        let err = run_err("print 1 < \"2\";");
        assert!(err.to_string().contains("Operands must be numbers"));

        let err = run_err("print -\"a\";");
        assert!(err.to_string().contains("Operand must be a number"));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let err = run_err("print 1 / 0;");

        assert!(matches!(err, LoxError::Runtime { .. }));
        assert!(err.to_string().contains("Division by zero"));
    }

    #[test]
    fn truthiness() {
        // Only nil and false are falsy; 0 and "" are not.
        assert_eq!(run_ok("print !nil;"), "true\n");
        assert_eq!(run_ok("print !false;"), "true\n");
        assert_eq!(run_ok("print !0;"), "false\n");
        assert_eq!(run_ok("print !\"\";"), "false\n");
        assert_eq!(run_ok("if (0) print \"zero is truthy\";"), "zero is truthy\n");
    }

    #[test]
    fn equality_never_errors() {
        assert_eq!(run_ok("print nil == nil;"), "true\n");
        assert_eq!(run_ok("print nil == false;"), "false\n");
        assert_eq!(run_ok("print 1 == 1.0;"), "true\n");
        assert_eq!(run_ok("print 1 == \"1\";"), "false\n");
        assert_eq!(run_ok("print \"x\" != \"y\";"), "true\n");
    }

    #[test]
    fn logical_operators_return_operands() {
        assert_eq!(run_ok("print \"a\" or \"b\";"), "a\n");
        assert_eq!(run_ok("print nil or \"b\";"), "b\n");
        assert_eq!(run_ok("print nil and 2;"), "nil\n");
        assert_eq!(run_ok("print 1 and 2;"), "2\n");
    }

    #[test]
    fn logical_operators_short_circuit() {
        // The right side must not run when the left decides the result.
        assert_eq!(
            run_ok("fun boom() { missing; } true or boom(); print \"ok\";"),
            "ok\n"
        );
    }

    #[test]
    fn number_formatting() {
        assert_eq!(run_ok("print 2.5;"), "2.5\n");
        assert_eq!(run_ok("print 4 / 2;"), "2\n");
        assert_eq!(run_ok("print 0.5 + 0.25;"), "0.75\n");
    }

    // ── variables and scope ───────────────────────────────────────────

    #[test]
    fn var_defaults_to_nil() {
        assert_eq!(run_ok("var x; print x;"), "nil\n");
    }

    #[test]
    fn global_redeclaration_overwrites() {
        assert_eq!(run_ok("var a = 1; var a = 2; print a;"), "2\n");
    }

    #[test]
    fn block_shadowing() {
        assert_eq!(
            run_ok("var a = 1; { var a = 2; print a; } print a;"),
            "2\n1\n"
        );
    }

    #[test]
    fn assignment_is_an_expression() {
        assert_eq!(run_ok("var a = 1; print a = 3;"), "3\n");
    }

    #[test]
    fn undefined_variable_read() {
        let err = run_err("print missing;");

        assert!(matches!(err, LoxError::Runtime { .. }));
        assert!(err.to_string().contains("Undefined variable 'missing'"));
    }

    #[test]
    fn assignment_cannot_create_a_binding() {
        let err = run_err("missing = 1;");

        assert!(err.to_string().contains("Undefined variable 'missing'"));
    }

    #[test]
    fn effects_before_a_runtime_error_persist() {
        // The first statement prints before the second fails.
        let buffer = SharedBuffer::default();

        let tokens: Vec<Token<'_>> = Scanner::new(b"print \"before\"; missing;")
            .collect::<Result<_, _>>()
            .expect("scans");

        let statements = Parser::new(&tokens).parse().expect("parses");

        let mut interpreter = Interpreter::with_output(Box::new(buffer.clone()));
        Resolver::new(&mut interpreter).resolve(&statements).expect("resolves");

        assert!(interpreter.interpret(&statements).is_err());
        assert_eq!(buffer.contents(), "before\n");
    }

    // ── control flow ──────────────────────────────────────────────────

    #[test]
    fn if_else_branches() {
        assert_eq!(run_ok("if (1 < 2) print \"yes\"; else print \"no\";"), "yes\n");
        assert_eq!(run_ok("if (nil) print \"yes\"; else print \"no\";"), "no\n");
    }

    #[test]
    fn while_loops() {
        assert_eq!(
            run_ok("var i = 3; while (i > 0) { print i; i = i - 1; }"),
            "3\n2\n1\n"
        );
    }

    #[test]
    fn for_loops() {
        assert_eq!(
            run_ok("for (var i = 0; i < 3; i = i + 1) print i;"),
            "0\n1\n2\n"
        );
    }

    // ── functions and closures ────────────────────────────────────────

    #[test]
    fn functions_return_values() {
        assert_eq!(
            run_ok("fun add(a, b) { return a + b; } print add(1, 2);"),
            "3\n"
        );
    }

    #[test]
    fn function_without_return_yields_nil() {
        assert_eq!(run_ok("fun noop() {} print noop();"), "nil\n");
    }

    #[test]
    fn return_unwinds_nested_loops_to_the_call() {
        assert_eq!(
            run_ok("fun find() { while (true) { return \"done\"; } } print find();"),
            "done\n"
        );
    }

    #[test]
    fn recursion() {
        assert_eq!(
            run_ok("fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(10);"),
            "55\n"
        );
    }

    #[test]
    fn closures_share_mutable_captured_state() {
        assert_eq!(
            run_ok(
                "fun make() { var i = 0; fun inc() { i = i + 1; return i; } return inc; }\n\
                 var c = make();\n\
                 print c();\n\
                 print c();"
            ),
            "1\n2\n"
        );
    }

    #[test]
    fn closure_captures_its_declaration_scope() {
        // The closure must keep seeing the binding that was live when it
        // was declared, not a later shadow.
        assert_eq!(
            run_ok(
                "var a = \"global\";\n\
                 {\n\
                   fun show() { print a; }\n\
                   show();\n\
                   var a = \"block\";\n\
                   show();\n\
                 }"
            ),
            "global\nglobal\n"
        );
    }

    #[test]
    fn call_arity_is_exact() {
        let err = run_err("fun zero() {} zero(1);");
        assert!(err.to_string().contains("Expected 0 arguments but got 1"));

        let err = run_err("fun two(a, b) {} two(1);");
        assert!(err.to_string().contains("Expected 2 arguments but got 1"));
    }

    #[test]
    fn only_callables_can_be_called() {
        let err = run_err("\"not a function\"();");

        assert!(err.to_string().contains("Can only call functions and classes"));
    }

    #[test]
    fn function_values_print_by_name() {
        assert_eq!(run_ok("fun greet() {} print greet;"), "<fn greet>\n");
        assert_eq!(run_ok("print clock;"), "<native fn>\n");
    }

    #[test]
    fn native_clock_returns_a_number() {
        assert_eq!(run_ok("print clock() >= 0;"), "true\n");
    }

    // ── classes and instances ─────────────────────────────────────────

    #[test]
    fn class_and_instance_printing() {
        assert_eq!(run_ok("class Cake {} print Cake;"), "Cake\n");
        assert_eq!(run_ok("class Cake {} print Cake();"), "Cake instance\n");
    }

    #[test]
    fn fields_need_no_declaration() {
        assert_eq!(
            run_ok("class Bag {} var b = Bag(); b.x = 7; print b.x;"),
            "7\n"
        );
    }

    #[test]
    fn instances_have_independent_fields() {
        assert_eq!(
            run_ok(
                "class Bag {}\n\
                 var a = Bag();\n\
                 var b = Bag();\n\
                 a.x = 1;\n\
                 b.x = 2;\n\
                 print a.x;\n\
                 print b.x;"
            ),
            "1\n2\n"
        );
    }

    #[test]
    fn methods_bind_this() {
        assert_eq!(
            run_ok(
                "class Counter {\n\
                   init(start) { this.n = start; }\n\
                   bump() { this.n = this.n + 1; return this.n; }\n\
                 }\n\
                 var c = Counter(10);\n\
                 print c.bump();\n\
                 print c.bump();"
            ),
            "11\n12\n"
        );
    }

    #[test]
    fn a_detached_method_remembers_its_instance() {
        assert_eq!(
            run_ok(
                "class Greeter {\n\
                   init(name) { this.name = name; }\n\
                   greet() { print this.name; }\n\
                 }\n\
                 var m = Greeter(\"left\").greet;\n\
                 Greeter(\"right\");\n\
                 m();"
            ),
            "left\n"
        );
    }

    #[test]
    fn binding_is_per_instance() {
        assert_eq!(
            run_ok(
                "class Greeter {\n\
                   init(name) { this.name = name; }\n\
                   greet() { print this.name; }\n\
                 }\n\
                 var a = Greeter(\"a\").greet;\n\
                 var b = Greeter(\"b\").greet;\n\
                 a();\n\
                 b();\n\
                 a();"
            ),
            "a\nb\na\n"
        );
    }

    #[test]
    fn fields_shadow_methods() {
        assert_eq!(
            run_ok(
                "class Thing { label() { return \"method\"; } }\n\
                 var t = Thing();\n\
                 t.label = \"field\";\n\
                 print t.label;"
            ),
            "field\n"
        );
    }

    #[test]
    fn constructor_always_returns_the_instance() {
        // Even an explicit value-carrying return inside init is ignored.
        assert_eq!(
            run_ok("class Foo { init() { return 5; } } print Foo();"),
            "Foo instance\n"
        );

        assert_eq!(
            run_ok("class Foo { init() { this.x = 1; return; this.x = 2; } } print Foo().x;"),
            "1\n"
        );
    }

    #[test]
    fn constructor_arity_comes_from_init() {
        let err = run_err("class Pair { init(a, b) {} } Pair(1);");
        assert!(err.to_string().contains("Expected 2 arguments but got 1"));

        let err = run_err("class Empty {} Empty(1);");
        assert!(err.to_string().contains("Expected 0 arguments but got 1"));
    }

    #[test]
    fn undefined_property() {
        let err = run_err("class Bag {} print Bag().nope;");

        assert!(err.to_string().contains("Undefined property 'nope'"));
    }

    #[test]
    fn only_instances_have_properties() {
        let err = run_err("var x = 1; print x.y;");
        assert!(err.to_string().contains("Only instances have properties"));

        // A class value is not an instance of itself.
        let err = run_err("class C {} print C.y;");
        assert!(err.to_string().contains("Only instances have properties"));

        let err = run_err("var x = 1; x.y = 2;");
        assert!(err.to_string().contains("Only instances have fields"));
    }

    // ── static resolution ─────────────────────────────────────────────

    #[test]
    fn return_outside_a_function_is_rejected() {
        let err = run_err("return 1;");

        assert!(matches!(err, LoxError::Resolve { .. }));
        assert!(err.to_string().contains("Cannot return from top-level code"));
    }

    #[test]
    fn this_outside_a_class_is_rejected() {
        let err = run_err("print this;");

        assert!(matches!(err, LoxError::Resolve { .. }));
        assert!(err.to_string().contains("outside of a class"));
    }

    #[test]
    fn reading_a_local_in_its_own_initializer_is_rejected() {
        let err = run_err("{ var a = a; }");

        assert!(matches!(err, LoxError::Resolve { .. }));
        assert!(err.to_string().contains("own initializer"));
    }

    #[test]
    fn local_redeclaration_is_rejected() {
        let err = run_err("{ var a = 1; var a = 2; }");

        assert!(matches!(err, LoxError::Resolve { .. }));
        assert!(err.to_string().contains("already declared"));
    }
}
