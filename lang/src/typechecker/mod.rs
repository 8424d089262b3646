//! Type checker
//!
//! Walks the AST in place, attaching a resolved type to every expression and
//! rewriting integer literals into float literals where implicit numeric
//! promotion applies. Identifier resolution runs over a chain of scope
//! frames; entering a block pushes a frame and leaving pops it. Diagnostics
//! accumulate; any diagnostic marks the check as failed and the program must
//! not be lowered.

mod builtins;


use crate::lexer::token::Token;
use crate::parser::ast::{
    BinaryOp, Block, BuiltinKind, Expr, ExprKind, Program, Stmt, UnaryOp,
};
use crate::scope::Scope;
use crate::types::Type;

pub use builtins::lookup_builtin;

#[derive(Debug, Clone, PartialEq)]
pub struct TypeError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

pub struct TypeChecker {
    env: Scope<Type>,
    errors: Vec<TypeError>,
    loop_depth: usize,
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeChecker {
    pub fn new() -> Self {
        Self {
            env: Scope::new(),
            errors: Vec::new(),
            loop_depth: 0,
        }
    }

    /// Check a whole program in place.
    pub fn check(&mut self, program: &mut Program) {
        for stmt in &mut program.statements {
            self.check_statement(stmt);
        }
    }

    pub fn errors(&self) -> &[TypeError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn error(&mut self, token: &Token, message: String) {
        self.errors.push(TypeError {
            message,
            line: token.line,
            column: token.start_col,
        });
    }

    fn check_statement(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Expr { expr } => {
                self.check_expression(expr);
            }
            Stmt::Let { name, value, .. } => {
                let var_name = name.literal.clone();
                if self.env.has(&var_name) {
                    self.error(name, format!("cannot redeclare variable: {}", var_name));
                    return;
                }

                match value {
                    Some(value) => {
                        if let Some(ty) = self.check_expression(value) {
                            self.env.set(var_name, ty);
                        }
                    }
                    None => {
                        self.error(
                            name,
                            format!("cannot declare variable {} without a value", var_name),
                        );
                    }
                }
            }
            Stmt::Assign { name, value } => {
                if self.env.get(&name.literal).is_none() {
                    self.error(name, format!("unknown identifier: {}", name.literal));
                }

                self.check_expression(value);
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.check_expression(value);
                }
            }
            Stmt::While {
                token,
                condition,
                body,
            } => {
                if let Some(ty) = self.check_expression(condition) {
                    if ty != Type::Bool {
                        self.error(
                            token,
                            format!("expected while condition to be of type bool, got {}", ty),
                        );
                    }
                }

                self.loop_depth += 1;
                self.check_block(body);
                self.loop_depth -= 1;
            }
            Stmt::For {
                token,
                init,
                condition,
                update,
                body,
            } => {
                // the init clause declares into a frame that encloses the
                // whole loop header and body
                self.env.enter();

                if let Some(init) = init {
                    self.check_statement(init);
                }

                if let Some(condition) = condition {
                    if let Some(ty) = self.check_expression(condition) {
                        if ty != Type::Bool {
                            self.error(
                                token,
                                format!("expected for condition to be of type bool, got {}", ty),
                            );
                        }
                    }
                }

                if let Some(update) = update {
                    self.check_statement(update);
                }

                self.loop_depth += 1;
                self.check_block(body);
                self.loop_depth -= 1;

                self.env.exit();
            }
            Stmt::Break { token } => {
                if self.loop_depth == 0 {
                    self.error(token, "break statement outside of a loop".to_string());
                }
            }
            Stmt::Continue { token } => {
                if self.loop_depth == 0 {
                    self.error(token, "continue statement outside of a loop".to_string());
                }
            }
            Stmt::Block(block) => self.check_block(block),
        }
    }

    fn check_block(&mut self, block: &mut Block) {
        self.env.enter();
        for stmt in &mut block.statements {
            self.check_statement(stmt);
        }
        self.env.exit();
    }

    /// Check an expression and attach its resolved type. Returns `None` when
    /// a diagnostic was recorded for this expression; the type slot is then
    /// left empty.
    fn check_expression(&mut self, expr: &mut Expr) -> Option<Type> {
        let token = expr.token.clone();

        let ty = match &mut expr.kind {
            ExprKind::Integer(_) => Some(Type::Int),
            ExprKind::Float(_) => Some(Type::Float),
            ExprKind::Boolean(_) => Some(Type::Bool),
            ExprKind::Str(_) => Some(Type::String),
            ExprKind::Identifier(name) => match self.env.get(name) {
                Some(ty) => Some(*ty),
                None => {
                    let name = name.clone();
                    self.error(&token, format!("unknown identifier: {}", name));
                    None
                }
            },
            ExprKind::Grouped(inner) => self.check_expression(inner),
            ExprKind::Unary { op, operand } => {
                let op = *op;
                self.check_unary(&token, op, operand)
            }
            ExprKind::Binary { op, left, right } => {
                let op = *op;
                self.check_binary(&token, op, left, right)
            }
            ExprKind::If {
                condition,
                consequence,
                alternative,
            } => self.check_if(&token, condition, consequence, alternative.as_mut()),
            ExprKind::Call {
                callee,
                args,
                builtin,
            } => {
                let callee = callee.clone();
                self.check_call(&token, &callee, args, builtin)
            }
            ExprKind::Function { .. } => {
                self.error(&token, "function literals are not yet supported".to_string());
                None
            }
        };

        expr.ty = ty;
        ty
    }

    fn check_unary(&mut self, token: &Token, op: UnaryOp, operand: &mut Expr) -> Option<Type> {
        let ty = self.check_expression(operand)?;

        match op {
            UnaryOp::Not => {
                if ty == Type::Bool {
                    Some(Type::Bool)
                } else {
                    self.error(token, format!("cannot perform ! operation on {}", ty));
                    None
                }
            }
            UnaryOp::Negate => {
                if ty.is_numeric() {
                    Some(ty)
                } else {
                    self.error(token, format!("cannot perform - operation on {}", ty));
                    None
                }
            }
        }
    }

    fn check_binary(
        &mut self,
        token: &Token,
        op: BinaryOp,
        left: &mut Expr,
        right: &mut Expr,
    ) -> Option<Type> {
        let left_ty = self.check_expression(left);
        let right_ty = self.check_expression(right);
        let (left_ty, right_ty) = (left_ty?, right_ty?);

        if left_ty.is_numeric() && right_ty.is_numeric() {
            if op.is_arithmetic() {
                // mixed int/float arithmetic widens: the result is float and
                // any direct integer-literal operand is rewritten in place
                if left_ty == Type::Float || right_ty == Type::Float {
                    promote_int_literal(left);
                    promote_int_literal(right);
                    return Some(Type::Float);
                }

                return Some(Type::Int);
            }

            if op.is_comparison() {
                if left_ty != right_ty {
                    promote_int_literal(left);
                    promote_int_literal(right);
                }

                return Some(Type::Bool);
            }
        }

        if left_ty == Type::String && right_ty == Type::String {
            // concatenation and lexicographical comparison
            if op == BinaryOp::Add {
                return Some(Type::String);
            }

            if op.is_comparison() {
                return Some(Type::Bool);
            }
        }

        if left_ty == Type::Bool && right_ty == Type::Bool && op.is_comparison() {
            return Some(Type::Bool);
        }

        self.error(
            token,
            format!(
                "cannot perform {} operation on {} and {}",
                op, left_ty, right_ty
            ),
        );
        None
    }

    fn check_if(
        &mut self,
        token: &Token,
        condition: &mut Expr,
        consequence: &mut Block,
        alternative: Option<&mut Block>,
    ) -> Option<Type> {
        // condition errors should not hide problems in the branches, so the
        // bodies are checked regardless
        if let Some(ty) = self.check_expression(condition) {
            if ty != Type::Bool {
                self.error(
                    token,
                    format!("expected if condition to be of type bool, got {}", ty),
                );
            }
        }

        self.check_block(consequence);
        if let Some(alternative) = alternative {
            self.check_block(alternative);
        }

        Some(Type::Void)
    }

    fn check_call(
        &mut self,
        token: &Token,
        callee: &str,
        args: &mut Vec<Expr>,
        builtin: &mut Option<BuiltinKind>,
    ) -> Option<Type> {
        let Some(kind) = lookup_builtin(callee) else {
            self.error(token, format!("cannot call {} identifier", callee));
            return None;
        };
        *builtin = Some(kind);

        self.check_builtin_args(kind, token, args)
    }
}

/// Rewrite a direct integer literal into a float literal of the same source
/// token. Grouped or computed operands are left alone.
fn promote_int_literal(expr: &mut Expr) {
    if let ExprKind::Integer(value) = expr.kind {
        expr.kind = ExprKind::Float(value as f64);
        expr.ty = Some(Type::Float);
    }
}
