//! Read-only traversal. Override a `visit_*` method and call the matching
//! `walk_*` function to keep descending.

use super::*;

pub trait Visitor {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    fn visit_catch(&mut self, handler: &Catch) {
        walk_catch(self, handler);
    }
}

pub fn walk_stmt<V: Visitor + ?Sized>(v: &mut V, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::Decl(_, init) => {
            if let Some(init) = init {
                v.visit_expr(init);
            }
        }
        StmtKind::Expr(expr) => v.visit_expr(expr),
        StmtKind::Compound(stmts) => {
            for s in stmts {
                v.visit_stmt(s);
            }
        }
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            v.visit_expr(cond);
            v.visit_stmt(then_branch);
            if let Some(else_branch) = else_branch {
                v.visit_stmt(else_branch);
            }
        }
        StmtKind::While { cond, body } => {
            v.visit_expr(cond);
            v.visit_stmt(body);
        }
        StmtKind::Return(value) => {
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
        StmtKind::Try { body, handlers } => {
            v.visit_stmt(body);
            for h in handlers {
                v.visit_catch(h);
            }
        }
        StmtKind::SehTry { body, handler } => {
            v.visit_stmt(body);
            v.visit_stmt(handler);
        }
        StmtKind::Asm { .. } => {}
    }
}

pub fn walk_catch<V: Visitor + ?Sized>(v: &mut V, handler: &Catch) {
    v.visit_stmt(&handler.body);
}

pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::IntLit(_) | ExprKind::BoolLit(_) | ExprKind::VarRef(_) => {}
        ExprKind::Member { base, .. } => v.visit_expr(base),
        ExprKind::Assign { lhs, rhs } | ExprKind::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        ExprKind::Load(inner) | ExprKind::DynamicCast(inner) => v.visit_expr(inner),
        ExprKind::Call { callee, args } => {
            if let Callee::Indirect(target) = callee {
                v.visit_expr(target);
            }
            for a in args {
                v.visit_expr(a);
            }
        }
        ExprKind::MemberCall { base, args, .. } => {
            v.visit_expr(base);
            for a in args {
                v.visit_expr(a);
            }
        }
        ExprKind::Construct { args, .. } | ExprKind::New { args, .. } => {
            for a in args {
                v.visit_expr(a);
            }
        }
        ExprKind::Throw(inner) | ExprKind::Typeid(inner) => {
            if let Some(inner) = inner {
                v.visit_expr(inner);
            }
        }
    }
}
