//! coco is a small statically-typed scripting language compiled ahead of
//! time to native code through LLVM textual IR.
//!
//! The compiler is a linear pipeline of four phases: [`lexer`] turns source
//! bytes into tokens, [`parser`] builds the AST with a Pratt
//! operator-precedence parser, [`typechecker`] annotates the AST in place
//! (resolving identifiers and applying implicit int-to-float promotion), and
//! [`codegen`] lowers the annotated AST into a single-function LLVM module.
//! [`codegen::pipeline`] drives the phases end to end and hands the emitted
//! `.ll` file to the system C compiler for assembly and linking.

pub mod codegen;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod typechecker;
pub mod types;
