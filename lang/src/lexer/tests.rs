use expect_test::{expect, Expect};

use super::*;

fn render(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| {
            format!(
                "{:?} {:?} {}:{}..{}",
                t.kind, t.literal, t.line, t.start_col, t.end_col
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn check(input: &str, expect: Expect) {
    expect.assert_eq(&render(&lex(input)));
}

fn kinds(input: &str) -> Vec<TokenKind> {
    lex(input).into_iter().map(|t| t.kind).collect()
}

fn literals(input: &str) -> Vec<String> {
    lex(input)
        .into_iter()
        .filter(|t| t.kind != TokenKind::Eof)
        .map(|t| t.literal)
        .collect()
}

#[test]
fn let_statement() {
    check(
        "let x = 5;",
        expect![[r#"
            Let "let" 1:0..3
            Identifier "x" 1:4..5
            Assign "=" 1:6..7
            Integer "5" 1:8..9
            Semicolon ";" 1:9..10
            Eof "" 1:9..9"#]],
    );
}

#[test]
fn operators_punctuation_and_positions() {
    let source = "+-*/
(){}
  !<>
=
== >= <=
!=

// this is a single line comment

/*
this
is
a
multi line
comment
*/

==

// test test

/*
test test
*/

abc
let +
const xyz

2345 3.456
3. ** 4. ** 5.";

    let expected: &[(TokenKind, &str, u32, u32, u32)] = &[
        (TokenKind::Plus, "+", 1, 0, 1),
        (TokenKind::Minus, "-", 1, 1, 2),
        (TokenKind::Star, "*", 1, 2, 3),
        (TokenKind::Slash, "/", 1, 3, 4),
        (TokenKind::LParen, "(", 2, 0, 1),
        (TokenKind::RParen, ")", 2, 1, 2),
        (TokenKind::LBrace, "{", 2, 2, 3),
        (TokenKind::RBrace, "}", 2, 3, 4),
        (TokenKind::Bang, "!", 3, 2, 3),
        (TokenKind::Less, "<", 3, 3, 4),
        (TokenKind::Greater, ">", 3, 4, 5),
        (TokenKind::Assign, "=", 4, 0, 1),
        (TokenKind::Equal, "==", 5, 0, 2),
        (TokenKind::GreaterEqual, ">=", 5, 3, 5),
        (TokenKind::LessEqual, "<=", 5, 6, 8),
        (TokenKind::NotEqual, "!=", 6, 0, 2),
        (TokenKind::Equal, "==", 18, 0, 2),
        (TokenKind::Identifier, "abc", 26, 0, 3),
        (TokenKind::Let, "let", 27, 0, 3),
        (TokenKind::Plus, "+", 27, 4, 5),
        (TokenKind::Const, "const", 28, 0, 5),
        (TokenKind::Identifier, "xyz", 28, 6, 9),
        (TokenKind::Integer, "2345", 30, 0, 4),
        (TokenKind::Float, "3.456", 30, 5, 10),
        (TokenKind::Float, "3.", 31, 0, 2),
        (TokenKind::DoubleStar, "**", 31, 3, 5),
        (TokenKind::Float, "4.", 31, 6, 8),
        (TokenKind::DoubleStar, "**", 31, 9, 11),
        (TokenKind::Float, "5.", 31, 12, 14),
    ];

    let tokens = lex(source);
    assert_eq!(tokens.len(), expected.len() + 1); // + Eof

    for (i, (kind, literal, line, start, end)) in expected.iter().enumerate() {
        let token = &tokens[i];
        assert_eq!(token.kind, *kind, "token {} kind", i);
        assert_eq!(token.literal, *literal, "token {} literal", i);
        assert_eq!(token.line, *line, "token {} line", i);
        assert_eq!(token.start_col, *start, "token {} start column", i);
        assert_eq!(token.end_col, *end, "token {} end column", i);
    }
}

#[test]
fn compound_operators() {
    assert_eq!(
        kinds("++ -- += -= *= /= ** && || == != <= >="),
        vec![
            TokenKind::Increment,
            TokenKind::Decrement,
            TokenKind::PlusEqual,
            TokenKind::MinusEqual,
            TokenKind::StarEqual,
            TokenKind::SlashEqual,
            TokenKind::DoubleStar,
            TokenKind::And,
            TokenKind::Or,
            TokenKind::Equal,
            TokenKind::NotEqual,
            TokenKind::LessEqual,
            TokenKind::GreaterEqual,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn keywords() {
    assert_eq!(
        kinds("let const fn if else true false return while for break continue"),
        vec![
            TokenKind::Let,
            TokenKind::Const,
            TokenKind::Function,
            TokenKind::If,
            TokenKind::Else,
            TokenKind::True,
            TokenKind::False,
            TokenKind::Return,
            TokenKind::While,
            TokenKind::For,
            TokenKind::Break,
            TokenKind::Continue,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn numeric_forms() {
    // a leading or trailing separator is still a float literal
    assert_eq!(literals("3. .5 1.25 7"), vec!["3.", ".5", "1.25", "7"]);
    assert_eq!(
        kinds("3. .5 1.25 7"),
        vec![
            TokenKind::Float,
            TokenKind::Float,
            TokenKind::Float,
            TokenKind::Integer,
            TokenKind::Eof,
        ]
    );

    // a second separator ends the literal and starts a new one
    assert_eq!(literals("1.2.3"), vec!["1.2", ".3"]);
}

#[test]
fn string_literal_keeps_delimiters() {
    check(
        r#"let s = "hi";"#,
        expect![[r#"
            Let "let" 1:0..3
            Identifier "s" 1:4..5
            Assign "=" 1:6..7
            Str "\"hi\"" 1:8..12
            Semicolon ";" 1:12..13
            Eof "" 1:12..12"#]],
    );
}

#[test]
fn string_escapes() {
    let tokens = lex(r#""a\nb\t\"q\"\\""#);
    assert_eq!(tokens[0].kind, TokenKind::Str);
    assert_eq!(tokens[0].literal, "\"a\nb\t\"q\"\\\"");
}

#[test]
fn unterminated_string() {
    let tokens = lex(r#""abc"#);
    assert_eq!(tokens[0].kind, TokenKind::Illegal);
    assert_eq!(tokens[0].literal, "unterminated string");
}

#[test]
fn invalid_escape() {
    let tokens = lex(r#""a\qb""#);
    assert_eq!(tokens[0].kind, TokenKind::Illegal);
    assert_eq!(tokens[0].literal, "invalid escape character");
}

#[test]
fn unterminated_block_comment() {
    let tokens = lex("1 /* never closed");
    assert_eq!(tokens[0].kind, TokenKind::Integer);
    assert_eq!(tokens[1].kind, TokenKind::Illegal);
    assert_eq!(tokens[1].literal, "unterminated comment");
    assert_eq!(tokens[2].kind, TokenKind::Eof);
}

#[test]
fn lone_ampersand_and_pipe_are_illegal() {
    let tokens = lex("& |");
    assert_eq!(tokens[0].kind, TokenKind::Illegal);
    assert_eq!(tokens[0].literal, "&");
    assert_eq!(tokens[1].kind, TokenKind::Illegal);
    assert_eq!(tokens[1].literal, "|");
}

#[test]
fn lone_dot_is_illegal() {
    let tokens = lex(". ");
    assert_eq!(tokens[0].kind, TokenKind::Illegal);
    assert_eq!(tokens[0].literal, ".");
}

#[test]
fn illegal_character() {
    let tokens = lex("let a = 1 # 2;");
    let illegal: Vec<_> = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Illegal)
        .collect();
    assert_eq!(illegal.len(), 1);
    assert_eq!(illegal[0].literal, "#");
}

#[test]
fn lexing_always_terminates_with_eof() {
    let inputs = [
        "",
        "   \t\r\n  ",
        "// only a comment",
        "/* only a block comment */",
        "let x = 1 + 2.5; print(x);",
        "\"unterminated",
        "@#$%^",
        "if (a <= b) { exit(1); } else { exit(2); }",
    ];

    for input in inputs {
        let tokens = lex(input);
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof), "{:?}", input);
    }
}

#[test]
fn relexing_a_token_literal_roundtrips() {
    let source = r#"let x = 1 + 2.5; if (x <= 3.) { print(true); } else { exit(0); } "hi" ** %"#;

    for token in lex(source) {
        if token.kind == TokenKind::Eof {
            continue;
        }

        let relexed = lex(&token.literal);
        assert_eq!(relexed[0].kind, token.kind, "literal {:?}", token.literal);
        assert_eq!(relexed[0].literal, token.literal);
    }
}

#[test]
fn token_positions_are_monotone() {
    let source = "let a = 1;\nlet b = a + 2.5;\nwhile (a < 3) { a = a + 1; }\nprint(a, b);";
    let tokens = lex(source);

    for pair in tokens.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        assert!(
            (prev.line, prev.start_col) <= (next.line, next.start_col),
            "{:?} then {:?}",
            prev,
            next
        );
    }
}
