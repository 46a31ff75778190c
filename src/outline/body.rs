//! Field initialization statements for the entry point's local kernel object.

use crate::ast::{Expr, ExprKind, Stmt};
use crate::classify::{init_method, walk_kernel_fields, FieldSite, FieldVisitor, SpecialKind};
use crate::decl::*;
use crate::error::Result;
use crate::span::Span;

/// One statement per top-level field, plus one `__init` call per nested
/// special object, consuming `params` in signature order.
pub(super) fn field_inits(
    program: &Program,
    kernel_obj: RecordId,
    local: VarId,
    params: &[VarId],
) -> Result<Vec<Stmt>> {
    let mut builder = BodyBuilder {
        program,
        local: Expr::var(local, QualType::record(kernel_obj)),
        params,
        next: 0,
        stmts: Vec::new(),
    };
    walk_kernel_fields(program, kernel_obj, &mut builder)?;
    debug_assert_eq!(builder.next, params.len());
    Ok(builder.stmts)
}

struct BodyBuilder<'a> {
    program: &'a Program,
    local: Expr,
    params: &'a [VarId],
    next: usize,
    stmts: Vec<Stmt>,
}

impl BodyBuilder<'_> {
    /// `local.a.b.c` for the site's member path.
    fn member_chain(&self, site: &FieldSite<'_>) -> Expr {
        site.path.iter().fold(self.local.clone(), |base, step| {
            let ty = self.program[step.owner].fields[step.index].ty.clone();
            Expr::field(base, step.owner, step.index, ty)
        })
    }

    /// Loads of the next `count` raw parameters.
    fn take_params(&mut self, count: usize) -> Vec<Expr> {
        let taken = &self.params[self.next..self.next + count];
        self.next += count;
        taken
            .iter()
            .map(|&p| Expr::load(Expr::var(p, self.program[p].ty.clone())))
            .collect()
    }

    fn assign_from_param(&mut self, site: &FieldSite<'_>) {
        let lhs = self.member_chain(site);
        let mut rhs = self.take_params(1);
        if let Some(rhs) = rhs.pop() {
            self.stmts.push(Stmt::expr(Expr::assign(lhs, rhs)));
        }
    }
}

impl FieldVisitor for BodyBuilder<'_> {
    fn special(&mut self, site: &FieldSite<'_>, _: SpecialKind, record: RecordId) -> Result<()> {
        let init = init_method(self.program, record)?;
        let args = self.take_params(self.program[init].params.len());
        let call = Expr::new(
            ExprKind::MemberCall {
                base: Box::new(self.member_chain(site)),
                method: init,
                args,
            },
            self.program[init].ret.clone(),
            Span::dummy(),
        );
        self.stmts.push(Stmt::expr(call));
        Ok(())
    }

    fn wrapper(&mut self, site: &FieldSite<'_>, _: RecordId) -> Result<()> {
        self.assign_from_param(site);
        Ok(())
    }

    fn pointer(&mut self, site: &FieldSite<'_>) -> Result<()> {
        self.assign_from_param(site);
        Ok(())
    }

    fn scalar(&mut self, site: &FieldSite<'_>) -> Result<()> {
        self.assign_from_param(site);
        Ok(())
    }
}
