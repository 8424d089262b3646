//! Abstract syntax tree.
//!
//! Statements produce no value; expressions do. Every node keeps the token
//! that introduced it so diagnostics can point at a line and column. Each
//! expression additionally carries a resolved-type slot that starts empty
//! and is filled in place by the type checker.

use std::fmt;

use crate::lexer::token::Token;
use crate::types::Type;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub token: Token,
    pub kind: ExprKind,
    /// Resolved type, attached during type checking. `None` either before
    /// the check has run or when the checker recorded an error here.
    pub ty: Option<Type>,
}

impl Expr {
    pub fn new(token: Token, kind: ExprKind) -> Self {
        Self {
            token,
            kind,
            ty: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Identifier(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Str(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Grouped(Box<Expr>),
    If {
        condition: Box<Expr>,
        consequence: Block,
        alternative: Option<Block>,
    },
    Call {
        callee: String,
        args: Vec<Expr>,
        /// Filled by the type checker when the callee names a builtin.
        builtin: Option<BuiltinKind>,
    },
    /// `fn (a, b) { ... }`: parses, but the later phases reject it.
    Function {
        params: Vec<String>,
        body: Block,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,    // !
    Negate, // -
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,          // +
    Subtract,     // -
    Multiply,     // *
    Divide,       // /
    Modulo,       // %
    Power,        // **
    Less,         // <
    Greater,      // >
    LessEqual,    // <=
    GreaterEqual, // >=
    Equal,        // ==
    NotEqual,     // !=
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Less
                | BinaryOp::Greater
                | BinaryOp::LessEqual
                | BinaryOp::GreaterEqual
                | BinaryOp::Equal
                | BinaryOp::NotEqual
        )
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Subtract
                | BinaryOp::Multiply
                | BinaryOp::Divide
                | BinaryOp::Power
        )
    }
}

/// Tags attached to call expressions that resolve to a builtin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
    Print,
    Exit,
    Int,
    Float,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub token: Token,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let {
        token: Token,
        /// The identifier token; its literal is the variable name.
        name: Token,
        value: Option<Expr>,
    },
    Assign {
        name: Token,
        value: Expr,
    },
    Return {
        token: Token,
        value: Option<Expr>,
    },
    While {
        token: Token,
        condition: Expr,
        body: Block,
    },
    For {
        token: Token,
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        update: Option<Box<Stmt>>,
        body: Block,
    },
    Break {
        token: Token,
    },
    Continue {
        token: Token,
    },
    Block(Block),
    Expr {
        expr: Expr,
    },
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stmt) in self.statements.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Not => write!(f, "!"),
            UnaryOp::Negate => write!(f, "-"),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Power => "**",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Identifier(name) => write!(f, "{}", name),
            ExprKind::Integer(value) => write!(f, "{}", value),
            ExprKind::Float(value) => write!(f, "{:?}", value),
            ExprKind::Boolean(value) => write!(f, "{}", value),
            ExprKind::Str(value) => write!(f, "\"{}\"", value),
            ExprKind::Unary { op, operand } => write!(f, "({}{})", op, operand),
            ExprKind::Binary { op, left, right } => write!(f, "({} {} {})", left, op, right),
            ExprKind::Grouped(inner) => write!(f, "({})", inner),
            ExprKind::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "if ({}) {}", condition, consequence)?;
                if let Some(alternative) = alternative {
                    write!(f, " else {}", alternative)?;
                }
                Ok(())
            }
            ExprKind::Call { callee, args, .. } => {
                let args = args
                    .iter()
                    .map(|arg| arg.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{}({})", callee, args)
            }
            ExprKind::Function { params, body } => {
                write!(f, "fn({}) {}", params.join(", "), body)
            }
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for stmt in &self.statements {
            write!(f, " {}", stmt)?;
        }
        write!(f, " }}")
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Let { name, value, .. } => match value {
                Some(value) => write!(f, "let {} = {};", name.literal, value),
                None => write!(f, "let {};", name.literal),
            },
            Stmt::Assign { name, value } => write!(f, "{} = {};", name.literal, value),
            Stmt::Return { value, .. } => match value {
                Some(value) => write!(f, "return {};", value),
                None => write!(f, "return;"),
            },
            Stmt::While { condition, body, .. } => write!(f, "while ({}) {}", condition, body),
            Stmt::For {
                init,
                condition,
                update,
                body,
                ..
            } => {
                write!(f, "for (")?;
                if let Some(init) = init {
                    write!(f, "{}", init)?;
                } else {
                    write!(f, ";")?;
                }
                if let Some(condition) = condition {
                    write!(f, " {};", condition)?;
                } else {
                    write!(f, " ;")?;
                }
                if let Some(update) = update {
                    write!(f, " {}", update)?;
                }
                write!(f, ") {}", body)
            }
            Stmt::Break { .. } => write!(f, "break;"),
            Stmt::Continue { .. } => write!(f, "continue;"),
            Stmt::Block(block) => write!(f, "{}", block),
            Stmt::Expr { expr } => write!(f, "{}", expr),
        }
    }
}
