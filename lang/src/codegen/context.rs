use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::types::{BasicType, BasicTypeEnum};
use inkwell::values::{FunctionValue, PointerValue};
use inkwell::AddressSpace;

use super::compiler::CodegenError;
use crate::lexer::token::Token;
use crate::scope::Scope;
use crate::types::Type;

/// A variable's stack slot together with its source-level type.
#[derive(Debug, Clone, Copy)]
pub struct Slot<'ctx> {
    pub ptr: PointerValue<'ctx>,
    pub ty: Type,
}

/// Branch targets for the innermost loop being lowered.
#[derive(Debug, Clone, Copy)]
pub(super) struct LoopBlocks<'ctx> {
    /// Where `continue` jumps: the condition block of a `while`, the update
    /// block of a `for`.
    pub continue_block: BasicBlock<'ctx>,
    /// Where `break` jumps: the block following the loop.
    pub break_block: BasicBlock<'ctx>,
}

/// Everything the lowering pass threads through a single module: the LLVM
/// context handles, the `main` function under construction, the IR-level
/// scope of stack slots, and the accumulated diagnostics.
pub struct CodegenContext<'ctx> {
    pub context: &'ctx Context,
    pub module: Module<'ctx>,
    pub builder: Builder<'ctx>,
    pub(super) main_fn: FunctionValue<'ctx>,
    pub(super) entry_block: BasicBlock<'ctx>,
    pub(super) scope: Scope<Slot<'ctx>>,
    /// Lazily-created `i32` slot holding the value `exit(..)` stored; absent
    /// when the program never calls `exit`.
    pub(super) exit_slot: Option<PointerValue<'ctx>>,
    pub(super) loop_stack: Vec<LoopBlocks<'ctx>>,
    /// Counter suffix for the per-call `.fmt.N` format-string globals.
    pub(super) fmt_counter: u32,
    pub(super) errors: Vec<CodegenError>,
}

impl<'ctx> CodegenContext<'ctx> {
    pub fn new(context: &'ctx Context, module_name: &str) -> Self {
        let module = context.create_module(module_name);
        let builder = context.create_builder();

        let fn_type = context.i32_type().fn_type(&[], false);
        let main_fn = module.add_function("main", fn_type, None);
        let entry_block = context.append_basic_block(main_fn, "entry");
        builder.position_at_end(entry_block);

        Self {
            context,
            module,
            builder,
            main_fn,
            entry_block,
            scope: Scope::new(),
            exit_slot: None,
            loop_stack: Vec::new(),
            fmt_counter: 0,
            errors: Vec::new(),
        }
    }

    /// The LLVM IR of the module as text.
    pub fn ir(&self) -> String {
        self.module.print_to_string().to_string()
    }

    pub fn errors(&self) -> &[CodegenError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn take_errors(&mut self) -> Vec<CodegenError> {
        std::mem::take(&mut self.errors)
    }

    pub(super) fn error_at(&mut self, token: &Token, message: String) -> CodegenError {
        let err = CodegenError {
            message,
            line: token.line,
            column: token.start_col,
        };
        self.errors.push(err.clone());
        err
    }

    pub(super) fn ptr_type(&self) -> inkwell::types::PointerType<'ctx> {
        self.context.i8_type().ptr_type(AddressSpace::from(0))
    }

    pub(super) fn type_to_llvm(
        &mut self,
        ty: Type,
        token: &Token,
    ) -> Result<BasicTypeEnum<'ctx>, CodegenError> {
        match ty {
            Type::Int => Ok(self.context.i64_type().as_basic_type_enum()),
            Type::Float => Ok(self.context.f64_type().as_basic_type_enum()),
            Type::Bool => Ok(self.context.bool_type().as_basic_type_enum()),
            _ => Err(self.error_at(token, format!("unsupported type - {}", ty))),
        }
    }

    /// Whether the block the builder sits in still needs a terminator.
    pub(super) fn needs_terminator(&self) -> bool {
        self.builder
            .get_insert_block()
            .map(|bb| bb.get_terminator().is_none())
            .unwrap_or(false)
    }

    /// The `i32` slot `exit` stores into, created in the entry block on
    /// first use so the store and the epilogue load dominate correctly no
    /// matter where `exit` appears.
    pub(super) fn exit_code_slot(&mut self) -> PointerValue<'ctx> {
        if let Some(slot) = self.exit_slot {
            return slot;
        }

        let current = self.builder.get_insert_block();

        match self.entry_block.get_first_instruction() {
            Some(first) => self.builder.position_before(&first),
            None => self.builder.position_at_end(self.entry_block),
        }

        let i32_type = self.context.i32_type();
        let slot = self.builder.build_alloca(i32_type, "exit.code").unwrap();
        self.builder.build_store(slot, i32_type.const_zero()).unwrap();

        if let Some(block) = current {
            self.builder.position_at_end(block);
        }

        self.exit_slot = Some(slot);
        slot
    }

    /// Emit the function epilogue: return the stored exit code when one was
    /// recorded, `0` otherwise.
    pub(super) fn finish(&mut self) {
        let i32_type = self.context.i32_type();

        match self.exit_slot {
            Some(slot) => {
                let code = self
                    .builder
                    .build_load(slot, "exit.value")
                    .unwrap()
                    .into_int_value();
                self.builder.build_return(Some(&code)).unwrap();
            }
            None => {
                self.builder
                    .build_return(Some(&i32_type.const_zero()))
                    .unwrap();
            }
        }
    }
}
