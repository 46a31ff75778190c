//! Per-site restriction checks over one device function body.

use indexmap::IndexSet;

use crate::ast::visit::{walk_catch, walk_expr, walk_stmt, Visitor};
use crate::ast::{Callee, Catch, Expr, ExprKind, Member, Stmt, StmtKind};
use crate::decl::display::{record_name, type_name};
use crate::decl::*;
use crate::diagnostic::{Category, Diagnostic};
use crate::span::Span;

use super::RestrictKind;

/// Walks a body reporting restricted constructs and collecting the
/// definitions it makes reachable.
pub(super) struct RestrictionChecker<'a> {
    program: &'a Program,
    /// The device function whose body is being walked.
    func: FuncId,
    recursive: &'a IndexSet<FuncId>,
    allow_function_pointers: bool,
    pub diagnostics: Vec<Diagnostic>,
    /// Functions with a body this body calls, constructs or allocates with.
    pub reached: Vec<FuncId>,
}

impl<'a> RestrictionChecker<'a> {
    pub fn new(
        program: &'a Program,
        func: FuncId,
        recursive: &'a IndexSet<FuncId>,
        allow_function_pointers: bool,
    ) -> Self {
        Self {
            program,
            func,
            recursive,
            allow_function_pointers,
            diagnostics: Vec::new(),
            reached: Vec::new(),
        }
    }

    fn restrict(&mut self, kind: RestrictKind, span: Span) {
        let program = self.program;
        let func = &program[self.func];
        self.diagnostics.push(
            Diagnostic::error(
                Category::Restriction(kind),
                format!("kernel cannot {}", kind.description()),
                span,
            )
            .with_note_at(format!("reached in device function '{}'", func.name), func.span),
        );
    }

    fn reach(&mut self, func: FuncId) {
        if self.program[func].body.is_some() {
            self.reached.push(func);
        }
    }

    fn check_callee(&mut self, callee: FuncId, site: Span) {
        let program = self.program;
        let func = &program[callee];
        if self.recursive.contains(&callee) {
            self.diagnostics.push(
                Diagnostic::error(
                    Category::Restriction(RestrictKind::RecursiveCall),
                    format!("kernel cannot {}", RestrictKind::RecursiveCall.description()),
                    site,
                )
                .with_note_at(format!("'{}' declared here", func.name), func.span),
            );
        }
        if func.is_virtual {
            self.restrict(RestrictKind::VirtualCall, site);
        }
        self.check_type(&func.ret, func.span);
        self.reach(callee);
    }

    fn check_args(&mut self, args: &[Expr]) {
        for arg in args {
            self.check_type(&arg.ty, arg.span);
        }
    }

    fn check_var_use(&mut self, var: VarId, span: Span) {
        let program = self.program;
        let var = &program[var];
        if var.ty.non_reference().is_const {
            return;
        }
        match var.storage {
            Storage::StaticMember => self.restrict(RestrictKind::NonConstStaticDataVariable, span),
            Storage::Global => self.restrict(RestrictKind::GlobalVariable, span),
            Storage::Local | Storage::StaticLocal | Storage::Param => {}
        }
    }

    fn check_type(&mut self, ty: &QualType, used_at: Span) {
        let mut visited = IndexSet::new();
        if let Some(diag) = device_type_error(self.program, ty, used_at, &mut visited) {
            self.diagnostics.push(diag);
        }
    }
}

impl Visitor for RestrictionChecker<'_> {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Decl(var, _) => {
                let program = self.program;
                let var = &program[*var];
                self.check_type(&var.ty, var.span);
            }
            StmtKind::Try { .. } | StmtKind::SehTry { .. } => {
                self.restrict(RestrictKind::Exceptions, stmt.span)
            }
            StmtKind::Asm { .. } => self.restrict(RestrictKind::Assembly, stmt.span),
            _ => {}
        }
        walk_stmt(self, stmt);
    }

    fn visit_catch(&mut self, handler: &Catch) {
        self.restrict(RestrictKind::Exceptions, handler.span);
        walk_catch(self, handler);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::VarRef(var) => {
                self.check_type(&expr.ty, expr.span);
                self.check_var_use(*var, expr.span);
            }
            ExprKind::Member {
                member: Member::Static(var),
                ..
            } => {
                if !self.program[*var].ty.non_reference().is_const {
                    self.restrict(RestrictKind::NonConstStaticDataVariable, expr.span);
                }
            }
            ExprKind::Call { callee, args } => {
                self.check_args(args);
                match callee {
                    Callee::Direct(f) => self.check_callee(*f, expr.span),
                    Callee::Indirect(_) if !self.allow_function_pointers => {
                        self.restrict(RestrictKind::FunctionPointer, expr.span)
                    }
                    Callee::Indirect(_) => {}
                }
            }
            ExprKind::MemberCall { method, args, .. } => {
                self.check_args(args);
                self.check_callee(*method, expr.span);
            }
            ExprKind::Construct { ctor, args } => {
                self.check_args(args);
                self.reach(*ctor);
                if let FnKind::Constructor(record) = self.program[*ctor].kind {
                    if let Some(dtor) = self.program[record].destructor {
                        self.reach(dtor);
                    }
                }
            }
            ExprKind::New {
                operator: Some(op), ..
            } => {
                if self.program[*op].is_replaceable_allocator {
                    self.restrict(RestrictKind::AllocateStorage, expr.span);
                } else {
                    self.reach(*op);
                }
            }
            ExprKind::Typeid(_) | ExprKind::DynamicCast(_) => {
                self.restrict(RestrictKind::Rtti, expr.span)
            }
            ExprKind::Throw(_) => self.restrict(RestrictKind::Exceptions, expr.span),
            _ => {}
        }
        walk_expr(self, expr);
    }
}

/// Variable-length arrays anywhere a pointer/array chain leads, and
/// polymorphic records anywhere a field chain leads.
fn device_type_error(
    program: &Program,
    ty: &QualType,
    used_at: Span,
    visited: &mut IndexSet<QualType>,
) -> Option<Diagnostic> {
    let mut ty = ty;
    loop {
        match &ty.ty {
            Type::VariableArray(_) => {
                return Some(Diagnostic::error(
                    Category::DeviceType,
                    format!(
                        "variable length array type '{}' is not supported in device code",
                        type_name(program, ty)
                    ),
                    used_at,
                ));
            }
            Type::Pointer(inner) | Type::Reference(inner) | Type::Array(inner, _) => ty = inner,
            _ => break,
        }
    }

    if !visited.insert(ty.unqualified()) {
        return None;
    }
    match &ty.ty {
        Type::Record(id) => {
            let record = &program[*id];
            if record.is_polymorphic {
                return Some(
                    Diagnostic::error(
                        Category::DeviceType,
                        format!(
                            "type '{}' has virtual functions and cannot be used in device code",
                            record_name(program, *id)
                        ),
                        record.span,
                    )
                    .with_note_at("used here".to_string(), used_at),
                );
            }
            record.fields.iter().find_map(|field| {
                device_type_error(program, &field.ty, field.span, visited)
                    .map(|d| d.with_note_at("used here".to_string(), used_at))
            })
        }
        Type::Function { params, ret } => params
            .iter()
            .chain(std::iter::once(ret.as_ref()))
            .find_map(|p| device_type_error(program, p, used_at, visited)),
        _ => None,
    }
}
