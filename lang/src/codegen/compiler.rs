//! IR lowering
//!
//! Translates a type-checked program into LLVM IR inside a single
//! `define i32 @main()`. Every `let` gets an `alloca` slot keyed by name in
//! the IR scope; reads and writes go through the slots and register
//! promotion is left to the back end. Lowering assumes the type checker ran
//! clean: an expression without a resolved type is an invariant violation
//! and reported as a diagnostic.

use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum, FunctionValue, PointerValue};
use inkwell::{FloatPredicate, IntPredicate};

use super::context::{CodegenContext, LoopBlocks, Slot};
use crate::lexer::token::Token;
use crate::parser::ast::{
    Block, BinaryOp, BuiltinKind, Expr, ExprKind, Program, Stmt, UnaryOp,
};
use crate::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub struct CodegenError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl<'ctx> CodegenContext<'ctx> {
    /// Lower a whole program and emit the epilogue. Diagnostics accumulate;
    /// a statement that fails to lower does not stop the ones after it.
    pub fn compile_program(&mut self, program: &Program) {
        for stmt in &program.statements {
            let _ = self.compile_stmt(stmt);
        }

        self.finish();
    }

    pub fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CodegenError> {
        match stmt {
            Stmt::Expr { expr } => {
                self.compile_expr(expr)?;
                Ok(())
            }
            Stmt::Let { name, value, .. } => self.compile_let(name, value.as_ref()),
            Stmt::Assign { name, value } => self.compile_assign(name, value),
            Stmt::Block(block) => self.compile_scoped_block(block),
            Stmt::While {
                token,
                condition,
                body,
            } => self.compile_while(token, condition, body),
            Stmt::For {
                token,
                init,
                condition,
                update,
                body,
            } => self.compile_for(token, init.as_deref(), condition.as_ref(), update.as_deref(), body),
            Stmt::Break { token } => self.compile_break(token),
            Stmt::Continue { token } => self.compile_continue(token),
            // `return` has no lowering in the compiled pipeline; the exit
            // code pathway is the `exit` builtin
            Stmt::Return { .. } => Ok(()),
        }
    }

    fn compile_let(&mut self, name: &Token, value: Option<&Expr>) -> Result<(), CodegenError> {
        let var_name = name.literal.clone();
        if self.scope.has(&var_name) {
            return Err(self.error_at(name, format!("cannot redeclare {} variable", var_name)));
        }

        let Some(value) = value else {
            return Err(self.error_at(name, format!("let statement for {} has no value", var_name)));
        };

        let init = self.compile_operand(value)?;
        let Some(ty) = value.ty else {
            return Err(self.error_at(&value.token, "expression has no type".to_string()));
        };
        let llvm_type = self.type_to_llvm(ty, name)?;

        let ptr = self.builder.build_alloca(llvm_type, &var_name).unwrap();
        self.builder.build_store(ptr, init).unwrap();

        self.scope.set(var_name, Slot { ptr, ty });
        Ok(())
    }

    fn compile_assign(&mut self, name: &Token, value: &Expr) -> Result<(), CodegenError> {
        let Some(slot) = self.scope.get(&name.literal).copied() else {
            return Err(self.error_at(
                name,
                format!("cannot assign to undefined variable: {}", name.literal),
            ));
        };

        let new_value = self.compile_operand(value)?;
        let Some(new_ty) = value.ty else {
            return Err(self.error_at(&value.token, "expression has no type".to_string()));
        };

        if slot.ty != new_ty {
            return Err(self.error_at(
                name,
                format!(
                    "cannot assign {} type to variable of type {}",
                    new_ty, slot.ty
                ),
            ));
        }

        self.builder.build_store(slot.ptr, new_value).unwrap();
        Ok(())
    }

    fn compile_scoped_block(&mut self, block: &Block) -> Result<(), CodegenError> {
        self.scope.enter();
        let result = self.compile_block_statements(block);
        self.scope.exit();
        result
    }

    fn compile_block_statements(&mut self, block: &Block) -> Result<(), CodegenError> {
        for stmt in &block.statements {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    fn compile_while(
        &mut self,
        token: &Token,
        condition: &Expr,
        body: &Block,
    ) -> Result<(), CodegenError> {
        let cond_block = self.context.append_basic_block(self.main_fn, "loop.cond");
        let body_block = self.context.append_basic_block(self.main_fn, "loop.body");
        let end_block = self.context.append_basic_block(self.main_fn, "loop.end");

        self.builder.build_unconditional_branch(cond_block).unwrap();

        self.builder.position_at_end(cond_block);
        let cond = self.compile_bool_operand(token, condition)?;
        self.builder
            .build_conditional_branch(cond, body_block, end_block)
            .unwrap();

        self.builder.position_at_end(body_block);
        self.loop_stack.push(LoopBlocks {
            continue_block: cond_block,
            break_block: end_block,
        });
        let result = self.compile_scoped_block(body);
        self.loop_stack.pop();
        result?;

        if self.needs_terminator() {
            self.builder.build_unconditional_branch(cond_block).unwrap();
        }

        self.builder.position_at_end(end_block);
        Ok(())
    }

    fn compile_for(
        &mut self,
        token: &Token,
        init: Option<&Stmt>,
        condition: Option<&Expr>,
        update: Option<&Stmt>,
        body: &Block,
    ) -> Result<(), CodegenError> {
        // the init clause scopes over the header and the body
        self.scope.enter();
        let result = self.compile_for_inner(token, init, condition, update, body);
        self.scope.exit();
        result
    }

    fn compile_for_inner(
        &mut self,
        token: &Token,
        init: Option<&Stmt>,
        condition: Option<&Expr>,
        update: Option<&Stmt>,
        body: &Block,
    ) -> Result<(), CodegenError> {
        if let Some(init) = init {
            self.compile_stmt(init)?;
        }

        let cond_block = self.context.append_basic_block(self.main_fn, "for.cond");
        let body_block = self.context.append_basic_block(self.main_fn, "for.body");
        let update_block = self.context.append_basic_block(self.main_fn, "for.update");
        let end_block = self.context.append_basic_block(self.main_fn, "for.end");

        self.builder.build_unconditional_branch(cond_block).unwrap();

        self.builder.position_at_end(cond_block);
        match condition {
            Some(condition) => {
                let cond = self.compile_bool_operand(token, condition)?;
                self.builder
                    .build_conditional_branch(cond, body_block, end_block)
                    .unwrap();
            }
            None => {
                self.builder.build_unconditional_branch(body_block).unwrap();
            }
        }

        self.builder.position_at_end(body_block);
        self.loop_stack.push(LoopBlocks {
            continue_block: update_block,
            break_block: end_block,
        });
        let result = self.compile_scoped_block(body);
        self.loop_stack.pop();
        result?;

        if self.needs_terminator() {
            self.builder.build_unconditional_branch(update_block).unwrap();
        }

        self.builder.position_at_end(update_block);
        if let Some(update) = update {
            self.compile_stmt(update)?;
        }
        self.builder.build_unconditional_branch(cond_block).unwrap();

        self.builder.position_at_end(end_block);
        Ok(())
    }

    fn compile_break(&mut self, token: &Token) -> Result<(), CodegenError> {
        let Some(blocks) = self.loop_stack.last().copied() else {
            return Err(self.error_at(token, "break statement outside of a loop".to_string()));
        };

        self.builder
            .build_unconditional_branch(blocks.break_block)
            .unwrap();

        // statements after the jump still lower, into a block of their own
        let dead = self.context.append_basic_block(self.main_fn, "unreachable");
        self.builder.position_at_end(dead);
        Ok(())
    }

    fn compile_continue(&mut self, token: &Token) -> Result<(), CodegenError> {
        let Some(blocks) = self.loop_stack.last().copied() else {
            return Err(self.error_at(token, "continue statement outside of a loop".to_string()));
        };

        self.builder
            .build_unconditional_branch(blocks.continue_block)
            .unwrap();

        let dead = self.context.append_basic_block(self.main_fn, "unreachable");
        self.builder.position_at_end(dead);
        Ok(())
    }

    /// Lower an expression. Value-less expressions (`print`, `exit`, `if`)
    /// produce `None`.
    pub fn compile_expr(
        &mut self,
        expr: &Expr,
    ) -> Result<Option<BasicValueEnum<'ctx>>, CodegenError> {
        if expr.ty.is_none() {
            return Err(self.error_at(&expr.token, "expression has no type".to_string()));
        }

        match &expr.kind {
            ExprKind::Integer(value) => Ok(Some(
                self.context
                    .i64_type()
                    .const_int(*value as u64, false)
                    .into(),
            )),
            ExprKind::Float(value) => {
                Ok(Some(self.context.f64_type().const_float(*value).into()))
            }
            ExprKind::Boolean(value) => Ok(Some(
                self.context
                    .bool_type()
                    .const_int(u64::from(*value), false)
                    .into(),
            )),
            ExprKind::Identifier(name) => self.compile_identifier(&expr.token, name).map(Some),
            ExprKind::Grouped(inner) => self.compile_expr(inner),
            ExprKind::Unary { op, operand } => {
                self.compile_unary(&expr.token, *op, operand).map(Some)
            }
            ExprKind::Binary { op, left, right } => self
                .compile_binary(&expr.token, *op, left, right, expr.ty)
                .map(Some),
            ExprKind::If {
                condition,
                consequence,
                alternative,
            } => {
                self.compile_if(&expr.token, condition, consequence, alternative.as_ref())?;
                Ok(None)
            }
            ExprKind::Call { callee, args, builtin } => {
                self.compile_call(&expr.token, callee, args, *builtin)
            }
            ExprKind::Str(_) | ExprKind::Function { .. } => {
                Err(self.error_at(&expr.token, "unsupported expression type".to_string()))
            }
        }
    }

    /// Lower an expression that must produce a value.
    fn compile_operand(&mut self, expr: &Expr) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        match self.compile_expr(expr)? {
            Some(value) => Ok(value),
            None => Err(self.error_at(&expr.token, "expression produced no value".to_string())),
        }
    }

    /// Lower an expression that must produce an `i1`.
    fn compile_bool_operand(
        &mut self,
        token: &Token,
        expr: &Expr,
    ) -> Result<inkwell::values::IntValue<'ctx>, CodegenError> {
        match self.compile_operand(expr)? {
            BasicValueEnum::IntValue(value) if value.get_type().get_bit_width() == 1 => Ok(value),
            _ => Err(self.error_at(token, "expected boolean condition".to_string())),
        }
    }

    fn compile_identifier(
        &mut self,
        token: &Token,
        name: &str,
    ) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let Some(slot) = self.scope.get(name).copied() else {
            return Err(self.error_at(token, format!("undefined variable {:?}", name)));
        };

        let _llvm_type = self.type_to_llvm(slot.ty, token)?;
        Ok(self
            .builder
            .build_load(slot.ptr, name)
            .unwrap())
    }

    fn compile_unary(
        &mut self,
        token: &Token,
        op: UnaryOp,
        operand: &Expr,
    ) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let value = self.compile_operand(operand)?;

        match (op, value) {
            (UnaryOp::Not, BasicValueEnum::IntValue(v)) => {
                Ok(self.builder.build_not(v, "not").unwrap().into())
            }
            (UnaryOp::Negate, BasicValueEnum::IntValue(v)) => {
                Ok(self.builder.build_int_neg(v, "neg").unwrap().into())
            }
            (UnaryOp::Negate, BasicValueEnum::FloatValue(v)) => {
                Ok(self.builder.build_float_neg(v, "fneg").unwrap().into())
            }
            _ => Err(self.error_at(token, format!("cannot perform {} operation", op))),
        }
    }

    /// Binary lowering is keyed off the resolved result type: `Int` picks the
    /// integer opcodes, `Float` the floating ones, and `Bool` dispatches to a
    /// comparison over whichever operand kind arrived.
    fn compile_binary(
        &mut self,
        token: &Token,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        result_ty: Option<Type>,
    ) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let left_value = self.compile_operand(left)?;
        let right_value = self.compile_operand(right)?;

        match result_ty {
            Some(Type::Int) => {
                let (BasicValueEnum::IntValue(l), BasicValueEnum::IntValue(r)) =
                    (left_value, right_value)
                else {
                    return Err(
                        self.error_at(token, format!("cannot perform {} operation", op))
                    );
                };

                let value = match op {
                    BinaryOp::Add => self.builder.build_int_add(l, r, "add").unwrap(),
                    BinaryOp::Subtract => self.builder.build_int_sub(l, r, "sub").unwrap(),
                    BinaryOp::Multiply => self.builder.build_int_mul(l, r, "mul").unwrap(),
                    BinaryOp::Divide => self.builder.build_int_signed_div(l, r, "div").unwrap(),
                    _ => {
                        return Err(
                            self.error_at(token, format!("cannot perform {} operation", op))
                        )
                    }
                };
                Ok(value.into())
            }
            Some(Type::Float) => {
                let (BasicValueEnum::FloatValue(l), BasicValueEnum::FloatValue(r)) =
                    (left_value, right_value)
                else {
                    return Err(
                        self.error_at(token, format!("cannot perform {} operation", op))
                    );
                };

                let value = match op {
                    BinaryOp::Add => self.builder.build_float_add(l, r, "fadd").unwrap(),
                    BinaryOp::Subtract => self.builder.build_float_sub(l, r, "fsub").unwrap(),
                    BinaryOp::Multiply => self.builder.build_float_mul(l, r, "fmul").unwrap(),
                    BinaryOp::Divide => self.builder.build_float_div(l, r, "fdiv").unwrap(),
                    _ => {
                        return Err(
                            self.error_at(token, format!("cannot perform {} operation", op))
                        )
                    }
                };
                Ok(value.into())
            }
            Some(Type::Bool) => self.compile_comparison(token, op, left_value, right_value),
            _ => Err(self.error_at(token, format!("cannot perform {} operation", op))),
        }
    }

    fn compile_comparison(
        &mut self,
        token: &Token,
        op: BinaryOp,
        left: BasicValueEnum<'ctx>,
        right: BasicValueEnum<'ctx>,
    ) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        match (left, right) {
            (BasicValueEnum::IntValue(l), BasicValueEnum::IntValue(r))
                if l.get_type() == r.get_type() =>
            {
                let predicate = match op {
                    BinaryOp::Less => IntPredicate::SLT,
                    BinaryOp::Greater => IntPredicate::SGT,
                    BinaryOp::LessEqual => IntPredicate::SLE,
                    BinaryOp::GreaterEqual => IntPredicate::SGE,
                    BinaryOp::Equal => IntPredicate::EQ,
                    BinaryOp::NotEqual => IntPredicate::NE,
                    _ => {
                        return Err(
                            self.error_at(token, format!("cannot perform {} operation", op))
                        )
                    }
                };
                Ok(self
                    .builder
                    .build_int_compare(predicate, l, r, "cmp")
                    .unwrap()
                    .into())
            }
            (BasicValueEnum::FloatValue(l), BasicValueEnum::FloatValue(r)) => {
                let predicate = match op {
                    BinaryOp::Less => FloatPredicate::OLT,
                    BinaryOp::Greater => FloatPredicate::OGT,
                    BinaryOp::LessEqual => FloatPredicate::OLE,
                    BinaryOp::GreaterEqual => FloatPredicate::OGE,
                    BinaryOp::Equal => FloatPredicate::OEQ,
                    BinaryOp::NotEqual => FloatPredicate::ONE,
                    _ => {
                        return Err(
                            self.error_at(token, format!("cannot perform {} operation", op))
                        )
                    }
                };
                Ok(self
                    .builder
                    .build_float_compare(predicate, l, r, "fcmp")
                    .unwrap()
                    .into())
            }
            _ => Err(self.error_at(token, format!("cannot perform {} operation", op))),
        }
    }

    /// An `if` lowers to `then`/`else`/`merge` blocks. A missing alternative
    /// still gets an `else` block whose only instruction branches to
    /// `merge`, so the conditional branch always has two real targets.
    fn compile_if(
        &mut self,
        token: &Token,
        condition: &Expr,
        consequence: &Block,
        alternative: Option<&Block>,
    ) -> Result<(), CodegenError> {
        let cond = self.compile_bool_operand(token, condition)?;

        let then_block = self.context.append_basic_block(self.main_fn, "then");
        let else_block = self.context.append_basic_block(self.main_fn, "else");
        let merge_block = self.context.append_basic_block(self.main_fn, "merge");

        self.builder
            .build_conditional_branch(cond, then_block, else_block)
            .unwrap();

        self.builder.position_at_end(then_block);
        self.compile_scoped_block(consequence)?;
        if self.needs_terminator() {
            self.builder.build_unconditional_branch(merge_block).unwrap();
        }

        self.builder.position_at_end(else_block);
        if let Some(alternative) = alternative {
            self.compile_scoped_block(alternative)?;
        }
        if self.needs_terminator() {
            self.builder.build_unconditional_branch(merge_block).unwrap();
        }

        self.builder.position_at_end(merge_block);
        Ok(())
    }

    fn compile_call(
        &mut self,
        token: &Token,
        callee: &str,
        args: &[Expr],
        builtin: Option<BuiltinKind>,
    ) -> Result<Option<BasicValueEnum<'ctx>>, CodegenError> {
        let Some(kind) = builtin else {
            return Err(self.error_at(token, format!("cannot call {:?} identifier", callee)));
        };

        match kind {
            BuiltinKind::Print => self.compile_print(token, args).map(|_| None),
            BuiltinKind::Exit => self.compile_exit(token, args).map(|_| None),
            BuiltinKind::Int => self.compile_int_cast(token, args).map(Some),
            BuiltinKind::Float => self.compile_float_cast(token, args).map(Some),
        }
    }

    /// `print` composes a `printf` format string from the argument types
    /// (`%ld`/`%g`/`%s` joined by spaces, newline-terminated), emits it as a
    /// uniquely-named private global, and passes boolean arguments as a
    /// `select` between pointers to the `true`/`false` string constants.
    fn compile_print(&mut self, token: &Token, args: &[Expr]) -> Result<(), CodegenError> {
        let printf = self.printf_declaration();

        let mut format = String::new();
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                format.push(' ');
            }

            match arg.ty {
                Some(Type::Int) => format.push_str("%ld"),
                Some(Type::Float) => format.push_str("%g"),
                Some(Type::Bool) => format.push_str("%s"),
                Some(other) => {
                    return Err(self.error_at(
                        &arg.token,
                        format!("cannot print value of type {}", other),
                    ))
                }
                None => {
                    return Err(
                        self.error_at(&arg.token, "expression has no type".to_string())
                    )
                }
            }
        }
        format.push('\n');
        format.push('\0');

        let format_ptr = self.format_string_global(&format);

        let mut call_args: Vec<BasicMetadataValueEnum<'ctx>> = vec![format_ptr.into()];
        for arg in args {
            let value = self.compile_operand(arg)?;

            if arg.ty == Some(Type::Bool) {
                let BasicValueEnum::IntValue(flag) = value else {
                    return Err(self.error_at(token, "expected boolean value".to_string()));
                };

                let true_ptr = self.bool_string_global("__coco_true", "true");
                let false_ptr = self.bool_string_global("__coco_false", "false");
                let chosen = self
                    .builder
                    .build_select(flag, true_ptr, false_ptr, "bool.str")
                    .unwrap();
                call_args.push(chosen.into());
            } else {
                call_args.push(value.into());
            }
        }

        self.builder.build_call(printf, &call_args, "").unwrap();
        Ok(())
    }

    /// `exit(n)` records the (i32-truncated) value in the exit-code slot;
    /// statements after it still lower and the epilogue returns the stored
    /// value.
    fn compile_exit(&mut self, token: &Token, args: &[Expr]) -> Result<(), CodegenError> {
        let Some(arg) = args.first() else {
            return Err(self.error_at(token, "exit expects one argument".to_string()));
        };
        let value = self.compile_operand(arg)?;
        let BasicValueEnum::IntValue(value) = value else {
            return Err(self.error_at(token, "expected integer exit code".to_string()));
        };

        let i32_type = self.context.i32_type();
        let code = if value.get_type().get_bit_width() == 64 {
            self.builder
                .build_int_truncate(value, i32_type, "exit.trunc")
                .unwrap()
        } else {
            value
        };

        let slot = self.exit_code_slot();
        self.builder.build_store(slot, code).unwrap();
        Ok(())
    }

    /// `int(x)`: `fptosi` for float operands, identity for int.
    fn compile_int_cast(
        &mut self,
        token: &Token,
        args: &[Expr],
    ) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let Some(arg) = args.first() else {
            return Err(self.error_at(token, "int expects one argument".to_string()));
        };
        let value = self.compile_operand(arg)?;

        match value {
            BasicValueEnum::FloatValue(v) => Ok(self
                .builder
                .build_float_to_signed_int(v, self.context.i64_type(), "fptosi")
                .unwrap()
                .into()),
            BasicValueEnum::IntValue(_) => Ok(value),
            _ => Err(self.error_at(token, "cannot convert value to int".to_string())),
        }
    }

    /// `float(x)`: `sitofp` for int operands, identity for float.
    fn compile_float_cast(
        &mut self,
        token: &Token,
        args: &[Expr],
    ) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let Some(arg) = args.first() else {
            return Err(self.error_at(token, "float expects one argument".to_string()));
        };
        let value = self.compile_operand(arg)?;

        match value {
            BasicValueEnum::IntValue(v) => Ok(self
                .builder
                .build_signed_int_to_float(v, self.context.f64_type(), "sitofp")
                .unwrap()
                .into()),
            BasicValueEnum::FloatValue(_) => Ok(value),
            _ => Err(self.error_at(token, "cannot convert value to float".to_string())),
        }
    }

    /// The variadic `declare i32 @printf(ptr, ...)`, added once per module.
    fn printf_declaration(&mut self) -> FunctionValue<'ctx> {
        if let Some(function) = self.module.get_function("printf") {
            return function;
        }

        let fn_type = self
            .context
            .i32_type()
            .fn_type(&[self.ptr_type().into()], true);
        self.module.add_function("printf", fn_type, None)
    }

    /// Emit a counter-suffixed private format-string global and return a
    /// pointer to its first byte.
    fn format_string_global(&mut self, contents: &str) -> PointerValue<'ctx> {
        let initializer = self.context.const_string(contents.as_bytes(), false);
        let name = format!(".fmt.{}", self.fmt_counter);
        self.fmt_counter += 1;

        let global = self
            .module
            .add_global(initializer.get_type(), None, &name);
        global.set_initializer(&initializer);
        global.set_constant(true);
        global.set_unnamed_addr(true);
        global.set_linkage(inkwell::module::Linkage::Private);

        self.builder
            .build_pointer_cast(global.as_pointer_value(), self.ptr_type(), "fmt.ptr")
            .unwrap()
    }

    /// The `true`/`false` string constants backing boolean printing, created
    /// on first use.
    fn bool_string_global(&mut self, name: &str, contents: &str) -> PointerValue<'ctx> {
        let global = match self.module.get_global(name) {
            Some(global) => global,
            None => {
                let initializer = self.context.const_string(contents.as_bytes(), true);
                let global = self
                    .module
                    .add_global(initializer.get_type(), None, name);
                global.set_initializer(&initializer);
                global.set_constant(true);
                global.set_unnamed_addr(true);
                global.set_linkage(inkwell::module::Linkage::Private);
                global
            }
        };

        self.builder
            .build_pointer_cast(global.as_pointer_value(), self.ptr_type(), name)
            .unwrap()
    }
}
