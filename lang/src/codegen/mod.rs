//! LLVM IR generation.
//!
//! [`context::CodegenContext`] owns the module under construction,
//! [`compiler`] holds the lowering rules, and [`pipeline`] strings the whole
//! compiler together from source text to a native executable.

pub mod compiler;
pub mod context;
pub mod pipeline;


pub use compiler::CodegenError;
pub use context::CodegenContext;

use inkwell::context::Context;

use crate::parser::ast::Program;

/// Lower a type-checked program to LLVM IR text. The program must have
/// passed the type checker; lowering diagnostics here mean either an
/// unsupported construct or a violated phase invariant.
pub fn lower(program: &Program) -> Result<String, Vec<CodegenError>> {
    let context = Context::create();
    let mut codegen = CodegenContext::new(&context, "coco");
    codegen.compile_program(program);

    if codegen.has_errors() {
        return Err(codegen.take_errors());
    }

    Ok(codegen.ir())
}
