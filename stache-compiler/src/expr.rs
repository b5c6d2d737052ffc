//! Expression IR produced by the translator and run by the artifact

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    /// `??`: the right side when the left is null
    Nullish,
}

impl BinaryOp {
    /// Maps a condition helper name (`eq`, `gte`, ...) to its operator
    pub fn from_helper(name: &str) -> Option<Self> {
        Some(match name {
            "eq" => BinaryOp::Eq,
            "neq" => BinaryOp::Ne,
            "gt" => BinaryOp::Gt,
            "gte" => BinaryOp::Ge,
            "lt" => BinaryOp::Lt,
            "lte" => BinaryOp::Le,
            "and" => BinaryOp::And,
            "or" => BinaryOp::Or,
            _ => return None,
        })
    }

    /// Name of the runtime primitive implementing this operator
    pub fn runtime_name(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Rem => "rem",
            BinaryOp::Eq => "strict_eq",
            BinaryOp::Ne => "strict_ne",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Nullish => "nullish",
        }
    }
}

/// A translated expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// The whole render context
    Context,
    /// A loop item/index binding or a lambda parameter
    Binding(String),
    /// Safe nested lookup, never fails
    Lookup { target: Box<Expr>, path: Vec<String> },
    Member { target: Box<Expr>, property: String },
    /// `a?.` link of a member chain: a null value here makes the whole
    /// chain null instead of failing
    Optional(Box<Expr>),
    Index { target: Box<Expr>, index: Box<Expr> },
    Call {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    Lambda { params: Vec<String>, body: Box<Expr> },
    Array(Vec<Expr>),
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `c ? a : b`
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// Boolean coercion of the inner value
    Truthy(Box<Expr>),
}

impl Expr {
    pub fn lookup(target: Expr, path: &str) -> Self {
        Expr::Lookup {
            target: Box::new(target),
            path: path.split('.').map(str::to_string).collect(),
        }
    }

    pub fn truthy(self) -> Self {
        match self {
            truthy @ Expr::Truthy(_) => truthy,
            other => Expr::Truthy(Box::new(other)),
        }
    }
}
