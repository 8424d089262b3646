//! coco CLI - ahead-of-time compiler driver
//!
//! Usage:
//!   coco <FILE.coco>                Compile to an executable next to the source
//!   coco <FILE.coco> -o <OUT>       Compile to a chosen output path
//!   coco <FILE.coco> --emit-ir      Write the LLVM IR (.ll) and stop

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use coco_lang::codegen::pipeline::Compiler;
use coco_lang::error::CocoError;

#[derive(Parser, Debug)]
#[command(name = "coco")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The source file to compile (must end in .coco)
    input: PathBuf,

    /// Output path (defaults to the source path with its extension removed,
    /// or `.ll` appended in --emit-ir mode)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Emit the textual LLVM IR instead of a linked executable
    #[arg(long = "emit-ir")]
    emit_ir: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.input.extension().and_then(|ext| ext.to_str()) != Some("coco") {
        eprintln!("only .coco files are accepted");
        return ExitCode::from(1);
    }

    let source = match std::fs::read_to_string(&args.input) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("failed to read {}: {}", args.input.display(), err);
            return ExitCode::from(1);
        }
    };

    let compiler = Compiler::new();

    if args.emit_ir {
        let ll_path = args
            .output
            .unwrap_or_else(|| args.input.with_extension("ll"));

        if let Err(errors) = compiler.compile_to_ir_file(&source, &ll_path) {
            report(&errors);
            return ExitCode::from(2);
        }

        println!("Wrote IR to: {}", ll_path.display());
        return ExitCode::SUCCESS;
    }

    let output = args.output.unwrap_or_else(|| args.input.with_extension(""));

    if let Err(errors) = compiler.compile_to_executable(&source, &output) {
        report(&errors);
        return ExitCode::from(2);
    }

    println!("Compiled to: {}", output.display());
    ExitCode::SUCCESS
}

fn report(errors: &[CocoError]) {
    for error in errors {
        eprintln!("{}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_args_default_mode() {
        let args = Args::try_parse_from(["coco", "program.coco"]).unwrap();
        assert_eq!(args.input, PathBuf::from("program.coco"));
        assert!(args.output.is_none());
        assert!(!args.emit_ir);
    }

    #[test]
    fn parse_args_output_path() {
        let args = Args::try_parse_from(["coco", "program.coco", "-o", "bin/prog"]).unwrap();
        assert_eq!(args.output, Some(PathBuf::from("bin/prog")));
    }

    #[test]
    fn parse_args_emit_ir() {
        let args = Args::try_parse_from(["coco", "--emit-ir", "program.coco"]).unwrap();
        assert!(args.emit_ir);
    }

    #[test]
    fn parse_args_long_output() {
        let args =
            Args::try_parse_from(["coco", "program.coco", "--output", "out", "--emit-ir"]).unwrap();
        assert_eq!(args.output, Some(PathBuf::from("out")));
        assert!(args.emit_ir);
    }
}
