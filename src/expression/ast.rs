use crate::expression::bytecode::{Axis, BuiltinId};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Num(f64),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        func: String,
        args: Vec<Expr>,
        offset: usize,
    },
    /// Unresolved identifier with its byte offset in the source.
    Ident(String, usize),
    /// Resolved surface coordinate.
    Coord(Axis),
    /// Resolved parameter slot.
    Param(u8),
    /// Resolved builtin call.
    Builtin {
        id: BuiltinId,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}
