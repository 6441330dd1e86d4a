#[cfg(test)]
mod parser_tests {
    use loxide::ast_printer::AstPrinter;
    use loxide::error::LoxError;
    use loxide::parser::Parser;
    use loxide::scanner::Scanner;
    use loxide::stmt::Stmt;
    use loxide::token::Token;

    fn scan(source: &str) -> Vec<Token<'_>> {
        Scanner::new(source.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .expect("source should scan cleanly")
    }

    fn print_expr(source: &str) -> String {
        let tokens = scan(source);
        let mut parser = Parser::new(&tokens);

        let expr = parser
            .parse_expression()
            .expect("source should parse as an expression");

        AstPrinter::print(&expr)
    }

    #[test]
    fn precedence_shapes_the_tree() {
        assert_eq!(print_expr("1 + 2 * 3"), "(+ 1.0 (* 2.0 3.0))");
        assert_eq!(print_expr("(1 + 2) * 3"), "(* (group (+ 1.0 2.0)) 3.0)");
        assert_eq!(print_expr("1 < 2 == true"), "(== (< 1.0 2.0) true)");
    }

    #[test]
    fn unary_binds_tighter_than_binary() {
        assert_eq!(print_expr("-a + b"), "(+ (- a) b)");
        assert_eq!(print_expr("!!x"), "(! (! x))");
    }

    #[test]
    fn logical_operators_nest_by_precedence() {
        assert_eq!(print_expr("a or b and c"), "(or a (and b c))");
    }

    #[test]
    fn assignment_is_right_associative() {
        assert_eq!(print_expr("a = b = c"), "(= a (= b c))");
    }

    #[test]
    fn calls_and_properties_chain() {
        assert_eq!(print_expr("f(1)(2)"), "(call (call f 1.0) 2.0)");
        assert_eq!(print_expr("a.b.c"), "(. (. a b) c)");
        assert_eq!(print_expr("obj.field = 1"), "(= (. obj field) 1.0)");
        assert_eq!(print_expr("this.x"), "(. this x)");
    }

    #[test]
    fn for_lowers_to_block_and_while() {
        let tokens = scan("for (var i = 0; i < 3; i = i + 1) print i;");
        let statements = Parser::new(&tokens).parse().expect("should parse");

        assert_eq!(statements.len(), 1);

        // { var i; while (cond) { body; incr; } }
        let Stmt::Block(outer) = &statements[0] else {
            panic!("expected for to lower to a block, got {:?}", statements[0]);
        };

        assert_eq!(outer.len(), 2);
        assert!(matches!(outer[0], Stmt::Var { .. }));

        let Stmt::While { body, .. } = &outer[1] else {
            panic!("expected a while after the initializer, got {:?}", outer[1]);
        };

        let Stmt::Block(inner) = body.as_ref() else {
            panic!("expected the while body to be a block");
        };

        assert!(matches!(inner[0], Stmt::Print(_)));
        assert!(matches!(inner[1], Stmt::Expression(_)));
    }

    #[test]
    fn bare_for_lowers_to_infinite_while() {
        let tokens = scan("for (;;) print 1;");
        let statements = Parser::new(&tokens).parse().expect("should parse");

        assert!(matches!(statements[0], Stmt::While { .. }));
    }

    #[test]
    fn invalid_assignment_target_is_rejected() {
        let tokens = scan("1 = 2;");
        let err = Parser::new(&tokens).parse().expect_err("should not parse");

        assert!(matches!(err, LoxError::Parse { .. }));
        assert!(err.to_string().contains("Invalid assignment target"));
    }

    #[test]
    fn parser_recovers_and_reports_the_first_error() {
        // The bad declaration must not hide the rest of the file, and the
        // error handed back is the first one.
        let tokens = scan("var = 1;\nprint 2;");
        let err = Parser::new(&tokens).parse().expect_err("should not parse");

        assert!(err.to_string().contains("[line 1]"));
        assert!(err.to_string().contains("Expected variable name"));
    }

    #[test]
    fn class_declarations_carry_their_methods() {
        let tokens = scan(
            "class Adder {\n  init(start) { this.total = start; }\n  add(n) { this.total = this.total + n; }\n}",
        );
        let statements = Parser::new(&tokens).parse().expect("should parse");

        let Stmt::Class { name, methods } = &statements[0] else {
            panic!("expected a class declaration");
        };

        assert_eq!(name.lexeme, "Adder");
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].name.lexeme, "init");
        assert_eq!(methods[0].params.len(), 1);
        assert_eq!(methods[1].name.lexeme, "add");
    }

    #[test]
    fn argument_limit_is_enforced() {
        let args = (0..256).map(|_| "1").collect::<Vec<_>>().join(", ");
        let source = format!("f({});", args);

        let tokens = scan(&source);
        let err = Parser::new(&tokens).parse().expect_err("should not parse");

        assert!(err.to_string().contains("more than 255 arguments"));
    }
}
