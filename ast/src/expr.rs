use crate::{Name, Pos};
use std::fmt::{self, Display, Formatter};
use symtab::{SymIndex, VOID_TYPE};

/// Expression node. `ty` is `VOID_TYPE` until semantic analysis fills it
/// in with a nametype index.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub pos: Pos,
    pub ty: SymIndex,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Integer(i64),
    Real(f64),
    Id(SymIndex),
    Indexed {
        id: Name,
        index: Box<Expr>,
    },
    /// Implicit integer-to-real promotion inserted by semantic analysis.
    Cast(Box<Expr>),
    UMinus(Box<Expr>),
    Not(Box<Expr>),
    Binop {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Binrel {
        op: RelOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        id: Name,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub const fn new(pos: Pos, kind: ExprKind) -> Self {
        Expr {
            pos,
            ty: VOID_TYPE,
            kind,
        }
    }

    pub const fn integer(pos: Pos, value: i64) -> Self {
        Self::new(pos, ExprKind::Integer(value))
    }

    pub const fn real(pos: Pos, value: f64) -> Self {
        Self::new(pos, ExprKind::Real(value))
    }

    pub const fn id(pos: Pos, sym: SymIndex) -> Self {
        Self::new(pos, ExprKind::Id(sym))
    }

    pub fn indexed(pos: Pos, id: Name, index: Expr) -> Self {
        Self::new(
            pos,
            ExprKind::Indexed {
                id,
                index: Box::new(index),
            },
        )
    }

    pub fn cast(pos: Pos, inner: Expr) -> Self {
        Self::new(pos, ExprKind::Cast(Box::new(inner)))
    }

    pub fn uminus(pos: Pos, inner: Expr) -> Self {
        Self::new(pos, ExprKind::UMinus(Box::new(inner)))
    }

    pub fn not(pos: Pos, inner: Expr) -> Self {
        Self::new(pos, ExprKind::Not(Box::new(inner)))
    }

    pub fn binop(pos: Pos, op: BinOp, left: Expr, right: Expr) -> Self {
        Self::new(
            pos,
            ExprKind::Binop {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        )
    }

    pub fn binrel(pos: Pos, op: RelOp, left: Expr, right: Expr) -> Self {
        Self::new(
            pos,
            ExprKind::Binrel {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        )
    }

    pub fn call(pos: Pos, id: Name, args: Vec<Expr>) -> Self {
        Self::new(pos, ExprKind::Call { id, args })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mult,
    Divide,
    IDiv,
    Mod,
    And,
    Or,
}

impl BinOp {
    /// Operator spelling for diagnostics.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mult => "*",
            Self::Divide => "/",
            Self::IDiv => "div",
            Self::Mod => "mod",
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

impl Display for BinOp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RelOp {
    Eq,
    Ne,
    Lt,
    Gt,
}

impl RelOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Gt => ">",
        }
    }
}

impl Display for RelOp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
