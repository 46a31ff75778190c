//! Rebuilding traversal: every `fold_*` returns a fresh tree and leaves the
//! input untouched.

use super::*;

pub trait Fold {
    fn fold_stmt(&mut self, stmt: &Stmt) -> Stmt {
        fold_stmt(self, stmt)
    }

    fn fold_expr(&mut self, expr: &Expr) -> Expr {
        fold_expr(self, expr)
    }

    fn fold_var(&mut self, var: VarId) -> VarId {
        var
    }

    fn fold_type(&mut self, ty: &QualType) -> QualType {
        ty.clone()
    }

    fn fold_span(&mut self, span: Span) -> Span {
        span
    }
}

pub fn fold_stmt<F: Fold + ?Sized>(f: &mut F, stmt: &Stmt) -> Stmt {
    let kind = match &stmt.kind {
        StmtKind::Decl(var, init) => {
            StmtKind::Decl(f.fold_var(*var), init.as_ref().map(|e| f.fold_expr(e)))
        }
        StmtKind::Expr(expr) => StmtKind::Expr(f.fold_expr(expr)),
        StmtKind::Compound(stmts) => {
            StmtKind::Compound(stmts.iter().map(|s| f.fold_stmt(s)).collect())
        }
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => StmtKind::If {
            cond: f.fold_expr(cond),
            then_branch: Box::new(f.fold_stmt(then_branch)),
            else_branch: else_branch.as_ref().map(|s| Box::new(f.fold_stmt(s))),
        },
        StmtKind::While { cond, body } => StmtKind::While {
            cond: f.fold_expr(cond),
            body: Box::new(f.fold_stmt(body)),
        },
        StmtKind::Return(value) => StmtKind::Return(value.as_ref().map(|e| f.fold_expr(e))),
        StmtKind::Try { body, handlers } => StmtKind::Try {
            body: Box::new(f.fold_stmt(body)),
            handlers: handlers
                .iter()
                .map(|h| Catch {
                    param: h.param.map(|p| f.fold_var(p)),
                    body: f.fold_stmt(&h.body),
                    span: f.fold_span(h.span),
                })
                .collect(),
        },
        StmtKind::SehTry { body, handler } => StmtKind::SehTry {
            body: Box::new(f.fold_stmt(body)),
            handler: Box::new(f.fold_stmt(handler)),
        },
        StmtKind::Asm { dialect, text } => StmtKind::Asm {
            dialect: *dialect,
            text: text.clone(),
        },
    };
    Stmt {
        kind,
        span: f.fold_span(stmt.span),
    }
}

pub fn fold_expr<F: Fold + ?Sized>(f: &mut F, expr: &Expr) -> Expr {
    let boxed = |f: &mut F, e: &Expr| Box::new(f.fold_expr(e));
    let kind = match &expr.kind {
        ExprKind::IntLit(v) => ExprKind::IntLit(*v),
        ExprKind::BoolLit(v) => ExprKind::BoolLit(*v),
        ExprKind::VarRef(var) => ExprKind::VarRef(f.fold_var(*var)),
        ExprKind::Member { base, member } => ExprKind::Member {
            base: boxed(f, base),
            member: match member {
                Member::Static(var) => Member::Static(f.fold_var(*var)),
                field => *field,
            },
        },
        ExprKind::Assign { lhs, rhs } => ExprKind::Assign {
            lhs: boxed(f, lhs),
            rhs: boxed(f, rhs),
        },
        ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
            op: *op,
            lhs: boxed(f, lhs),
            rhs: boxed(f, rhs),
        },
        ExprKind::Load(inner) => ExprKind::Load(boxed(f, inner)),
        ExprKind::Call { callee, args } => ExprKind::Call {
            callee: match callee {
                Callee::Direct(id) => Callee::Direct(*id),
                Callee::Indirect(target) => Callee::Indirect(boxed(f, target)),
            },
            args: args.iter().map(|a| f.fold_expr(a)).collect(),
        },
        ExprKind::MemberCall { base, method, args } => ExprKind::MemberCall {
            base: boxed(f, base),
            method: *method,
            args: args.iter().map(|a| f.fold_expr(a)).collect(),
        },
        ExprKind::Construct { ctor, args } => ExprKind::Construct {
            ctor: *ctor,
            args: args.iter().map(|a| f.fold_expr(a)).collect(),
        },
        ExprKind::New { operator, args } => ExprKind::New {
            operator: *operator,
            args: args.iter().map(|a| f.fold_expr(a)).collect(),
        },
        ExprKind::Throw(inner) => ExprKind::Throw(inner.as_ref().map(|e| boxed(f, e))),
        ExprKind::Typeid(inner) => ExprKind::Typeid(inner.as_ref().map(|e| boxed(f, e))),
        ExprKind::DynamicCast(inner) => ExprKind::DynamicCast(boxed(f, inner)),
    };
    Expr {
        kind,
        ty: f.fold_type(&expr.ty),
        span: f.fold_span(expr.span),
    }
}
