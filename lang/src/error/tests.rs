use super::*;

#[test]
fn display_includes_phase_and_position() {
    let err = CocoError::lex("unterminated string", 3, 7);
    assert_eq!(err.to_string(), "LexError at 3:7: unterminated string");

    let err = CocoError::Type {
        message: "cannot redeclare variable: a".to_string(),
        line: 2,
        column: 4,
    };
    assert_eq!(err.to_string(), "TypeError at 2:4: cannot redeclare variable: a");
}

#[test]
fn display_without_position() {
    let err = CocoError::Link("clang exited with status 1".to_string());
    assert_eq!(err.to_string(), "LinkError: clang exited with status 1");
    assert_eq!(err.position(), None);
}

#[test]
fn parse_error_conversion() {
    let err: CocoError = ParseError {
        message: "no prefix function found for += token".to_string(),
        line: 1,
        column: 0,
    }
    .into();

    assert_eq!(err.kind(), "ParseError");
    assert_eq!(err.position(), Some((1, 0)));
}

#[test]
fn codegen_error_conversion() {
    let err: CocoError = CodegenError {
        message: "unsupported expression type".to_string(),
        line: 5,
        column: 2,
    }
    .into();

    assert_eq!(err.kind(), "CodegenError");
    assert_eq!(
        err.to_string(),
        "CodegenError at 5:2: unsupported expression type"
    );
}

#[test]
fn io_error_conversion() {
    let err: CocoError = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
    assert_eq!(err.kind(), "IoError");
}
