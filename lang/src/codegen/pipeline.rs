//! Compilation pipeline for ahead-of-time compilation of coco programs.
//!
//! The full path is:
//! 1. Lex the source
//! 2. Parse into an AST
//! 3. Type check (annotating the AST in place)
//! 4. Lower to LLVM IR text
//! 5. Write a `.ll` file and hand it to the system C compiler
//!
//! Each phase gates the next: the pipeline stops at the first phase that
//! records any diagnostic and reports all of that phase's diagnostics.

use std::fs;
use std::path::Path;
use std::process::Command;

use crate::codegen;
use crate::error::CocoError;
use crate::lexer;
use crate::lexer::token::TokenKind;
use crate::parser::Parser;
use crate::typechecker::TypeChecker;

pub struct Compiler;

impl Compiler {
    pub fn new() -> Self {
        Self
    }

    /// Run the front half of the pipeline: source text to LLVM IR text.
    pub fn compile_to_ir(&self, source: &str) -> Result<String, Vec<CocoError>> {
        let tokens = lexer::lex(source);

        let lex_errors: Vec<CocoError> = tokens
            .iter()
            .filter(|token| token.kind == TokenKind::Illegal)
            .map(|token| CocoError::lex(token.literal.clone(), token.line, token.start_col))
            .collect();
        if !lex_errors.is_empty() {
            return Err(lex_errors);
        }

        let mut parser = Parser::new(tokens);
        let mut program = parser.parse_program();
        if parser.has_errors() {
            return Err(parser.errors().iter().cloned().map(CocoError::from).collect());
        }

        let mut checker = TypeChecker::new();
        checker.check(&mut program);
        if checker.has_errors() {
            return Err(checker
                .errors()
                .iter()
                .cloned()
                .map(CocoError::from)
                .collect());
        }

        codegen::lower(&program)
            .map_err(|errors| errors.into_iter().map(CocoError::from).collect())
    }

    /// Compile source text and write the IR to `ll_path`.
    pub fn compile_to_ir_file(&self, source: &str, ll_path: &Path) -> Result<(), Vec<CocoError>> {
        let ir = self.compile_to_ir(source)?;
        fs::write(ll_path, ir).map_err(|err| vec![CocoError::Io(err)])
    }

    /// Assemble and link a textual IR file into a native executable with the
    /// system C compiler. Only `.ll` files are accepted.
    pub fn ir_file_to_binary(&self, ll_path: &Path, output_path: &Path) -> Result<(), CocoError> {
        if ll_path.extension().and_then(|ext| ext.to_str()) != Some("ll") {
            return Err(CocoError::Link("only .ll files are accepted".to_string()));
        }

        let status = Command::new("clang")
            .arg(ll_path)
            .arg("-o")
            .arg(output_path)
            .status()
            .map_err(|err| CocoError::Link(format!("failed to run clang: {}", err)))?;

        if !status.success() {
            return Err(CocoError::Link(format!(
                "clang exited with status {}",
                status
            )));
        }

        Ok(())
    }

    /// Compile source text all the way to a native executable. The
    /// intermediate `.ll` file sits next to the output and is removed once
    /// linking succeeds.
    pub fn compile_to_executable(
        &self,
        source: &str,
        output_path: &Path,
    ) -> Result<(), Vec<CocoError>> {
        let ll_path = output_path.with_extension("ll");

        self.compile_to_ir_file(source, &ll_path)?;
        self.ir_file_to_binary(&ll_path, output_path)
            .map_err(|err| vec![err])?;

        fs::remove_file(&ll_path).ok();
        Ok(())
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
