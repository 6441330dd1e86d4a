#[cfg(test)]
mod scanner_tests {
    use loxide::error::LoxError;
    use loxide::scanner::Scanner;
    use loxide::token::{Token, TokenType};

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source.as_bytes());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(
            tokens.len(),
            expected.len(),
            "token count mismatch for {:?}",
            source
        );

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn punctuators() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn two_character_operators() {
        assert_token_sequence(
            "! != = == < <= > >=",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_token_sequence(
            "class fun var forest classy this",
            &[
                (TokenType::CLASS, "class"),
                (TokenType::FUN, "fun"),
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "forest"),
                (TokenType::IDENTIFIER, "classy"),
                (TokenType::THIS, "this"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn super_is_an_ordinary_identifier() {
        // There is no inheritance, so no `super` keyword either.
        assert_token_sequence(
            "super",
            &[(TokenType::IDENTIFIER, "super"), (TokenType::EOF, "")],
        );
    }

    #[test]
    fn number_literals() {
        let scanner = Scanner::new(b"12 3.25 0.5");
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        let values: Vec<f64> = tokens
            .iter()
            .filter_map(|t| match t.token_type {
                TokenType::NUMBER(n) => Some(n),
                _ => None,
            })
            .collect();

        assert_eq!(values, vec![12.0, 3.25, 0.5]);
    }

    #[test]
    fn string_literal_spans_lines() {
        let scanner = Scanner::new(b"\"one\ntwo\" x");
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        match &tokens[0].token_type {
            TokenType::STRING(s) => assert_eq!(s, "one\ntwo"),
            other => panic!("expected string token, got {:?}", other),
        }

        // The identifier after the literal sits on the literal's last line.
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let mut scanner = Scanner::new(b"\"oops");

        let err = scanner
            .find_map(Result::err)
            .expect("expected a lexing error");

        assert!(matches!(err, LoxError::Lex { .. }));
        assert!(err.to_string().contains("Unterminated string"));
    }

    #[test]
    fn comments_and_whitespace_are_trivia() {
        assert_token_sequence(
            "var x // the rest is ignored ;;;\nprint",
            &[
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "x"),
                (TokenType::PRINT, "print"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn errors_interleave_with_tokens() {
        let source = ",.$(#";
        let scanner = Scanner::new(source.as_bytes());

        let results: Vec<_> = scanner.collect();

        // , . <err $> ( <err #> EOF
        assert_eq!(results.len(), 6);

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let errors: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(errors.len(), 2);

        for err in errors {
            assert!(
                err.to_string().contains("Unexpected character"),
                "unexpected message: {}",
                err
            );
        }

        fn assert_token_matches(
            result: &Result<Token<'_>, LoxError>,
            expected_type: TokenType,
            expected_lexeme: &str,
        ) {
            match result {
                Ok(token) => {
                    assert_eq!(token.token_type, expected_type);
                    assert_eq!(token.lexeme, expected_lexeme);
                }
                Err(e) => panic!("expected token but got error: {}", e),
            }
        }
    }

    #[test]
    fn scanner_is_fused_after_eof() {
        let mut scanner = Scanner::new(b"x");

        assert!(scanner.next().is_some()); // identifier
        assert!(scanner.next().is_some()); // EOF
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }
}
