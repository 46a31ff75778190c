//! Function bodies: a small statement/expression tree.
//!
//! Only the constructs the outliner and the device checks need to see are
//! modelled. Expressions carry their type so that device-type checks can
//! inspect what flows through calls and references.

pub mod fold;
pub mod visit;

use crate::decl::{FuncId, QualType, RecordId, VarId};
use crate::span::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AsmDialect {
    Gcc,
    Ms,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Decl(VarId, Option<Expr>),
    Expr(Expr),
    Compound(Vec<Stmt>),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
    Try {
        body: Box<Stmt>,
        handlers: Vec<Catch>,
    },
    /// Platform structured exception handling (`__try`/`__except`).
    SehTry {
        body: Box<Stmt>,
        handler: Box<Stmt>,
    },
    Asm {
        dialect: AsmDialect,
        text: String,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Catch {
    pub param: Option<VarId>,
    pub body: Stmt,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: QualType,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Eq,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Member {
    Field { record: RecordId, index: usize },
    Static(VarId),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Callee {
    Direct(FuncId),
    /// A call through a function value whose target is not known statically.
    Indirect(Box<Expr>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    IntLit(i64),
    BoolLit(bool),
    VarRef(VarId),
    Member {
        base: Box<Expr>,
        member: Member,
    },
    Assign {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Implicit lvalue-to-rvalue load.
    Load(Box<Expr>),
    Call {
        callee: Callee,
        args: Vec<Expr>,
    },
    MemberCall {
        base: Box<Expr>,
        method: FuncId,
        args: Vec<Expr>,
    },
    Construct {
        ctor: FuncId,
        args: Vec<Expr>,
    },
    /// `new` expression; `operator` is the allocation function selected.
    New {
        operator: Option<FuncId>,
        args: Vec<Expr>,
    },
    Throw(Option<Box<Expr>>),
    Typeid(Option<Box<Expr>>),
    DynamicCast(Box<Expr>),
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn expr(expr: Expr) -> Self {
        let span = expr.span;
        Self::new(StmtKind::Expr(expr), span)
    }

    pub fn compound(stmts: Vec<Stmt>) -> Self {
        Self::new(StmtKind::Compound(stmts), Span::dummy())
    }
}

impl Expr {
    pub fn new(kind: ExprKind, ty: QualType, span: Span) -> Self {
        Self { kind, ty, span }
    }

    pub fn var(var: VarId, ty: QualType) -> Self {
        Self::new(ExprKind::VarRef(var), ty, Span::dummy())
    }

    pub fn field(base: Expr, record: RecordId, index: usize, ty: QualType) -> Self {
        Self::new(
            ExprKind::Member {
                base: Box::new(base),
                member: Member::Field { record, index },
            },
            ty,
            Span::dummy(),
        )
    }

    pub fn load(inner: Expr) -> Self {
        let ty = inner.ty.clone();
        let span = inner.span;
        Self::new(ExprKind::Load(Box::new(inner)), ty, span)
    }

    pub fn assign(lhs: Expr, rhs: Expr) -> Self {
        let ty = lhs.ty.clone();
        Self::new(
            ExprKind::Assign {
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
            Span::dummy(),
        )
    }

    pub fn call(callee: FuncId, args: Vec<Expr>, ret: QualType) -> Self {
        Self::new(
            ExprKind::Call {
                callee: Callee::Direct(callee),
                args,
            },
            ret,
            Span::dummy(),
        )
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}
