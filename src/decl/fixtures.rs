//! Test programs: the runtime's accessor and sampler types, kernel callers
//! and small function bodies.

use super::*;
use crate::ast::{Callee, Expr, ExprKind, Stmt, StmtKind};

pub(crate) use crate::signature::ACCESS_GLOBAL_BUFFER;

pub(crate) struct Fixture {
    pub program: Program,
    pub sycl: NamespaceId,
    accessor_template: TemplateId,
    range: RecordId,
    id: RecordId,
    next_offset: u32,
}

impl Fixture {
    pub fn new() -> Self {
        let mut program = Program::new();
        let cl = program.add_namespace("cl", Scope::TranslationUnit);
        let sycl = program.add_namespace("sycl", Scope::Namespace(cl));
        let accessor_template = program.add_template(ClassTemplate {
            name: "accessor".to_string(),
            scope: Scope::Namespace(sycl),
            params: vec![
                TemplateParam {
                    name: "dataT".to_string(),
                    kind: TemplateParamKind::Type,
                },
                TemplateParam {
                    name: "dimensions".to_string(),
                    kind: TemplateParamKind::NonType(QualType::scalar(ScalarKind::Int)),
                },
                TemplateParam {
                    name: "accessmode".to_string(),
                    kind: TemplateParamKind::NonType(QualType::scalar(ScalarKind::Int)),
                },
                TemplateParam {
                    name: "accessTarget".to_string(),
                    kind: TemplateParamKind::NonType(QualType::scalar(ScalarKind::Int)),
                },
            ],
            tag: TagKind::Class,
            span: Span::dummy(),
        });
        let size_t = QualType::scalar(ScalarKind::ULong);
        let range = program.add_record(
            Record::new("range", Scope::Namespace(sycl))
                .class()
                .with_field(Field::new("dim0", size_t.clone())),
        );
        let id = program.add_record(
            Record::new("id", Scope::Namespace(sycl))
                .class()
                .with_field(Field::new("dim0", size_t)),
        );
        Self {
            program,
            sycl,
            accessor_template,
            range,
            id,
            next_offset: 100,
        }
    }

    /// A fresh, distinct source span.
    pub fn span(&mut self) -> Span {
        let start = self.next_offset;
        self.next_offset += 10;
        Span::new(0, start, start + 5)
    }

    /// `cl::sycl::accessor<elem, dims, read_write, target>` whose `__init`
    /// takes the first `init_params` of `(elem*, range, range, id)`.
    pub fn accessor(&mut self, elem: ScalarKind, dims: i64, target: i64, init_params: usize) -> RecordId {
        let elem_ptr = QualType::pointer_to(
            QualType::scalar(elem).in_space(AddressSpace::Global),
        );
        let span = self.span();
        let acc = self.program.add_record(
            Record::new("accessor", Scope::Namespace(self.sycl))
                .class()
                .at(span)
                .specializing(
                    self.accessor_template,
                    vec![
                        TemplateArg::Type(QualType::scalar(elem)),
                        TemplateArg::Integral(dims),
                        TemplateArg::Integral(1026),
                        TemplateArg::Integral(target),
                    ],
                )
                .with_field(Field::new("impl", elem_ptr.clone())),
        );
        let all = [
            ("ptr", elem_ptr),
            ("range", QualType::record(self.range)),
            ("mem_range", QualType::record(self.range)),
            ("offset", QualType::record(self.id)),
        ];
        let mut init = Function::new("__init", Scope::Record(acc));
        init.kind = FnKind::Method(acc);
        init.body = Some(Stmt::compound(vec![]));
        let init = self.program.add_function(init);
        for (name, ty) in all.into_iter().take(init_params) {
            self.program.add_param(init, name, ty);
        }
        acc
    }

    /// `cl::sycl::sampler` with a one-argument `__init`.
    pub fn sampler(&mut self) -> RecordId {
        let handle = QualType::scalar(ScalarKind::ULong);
        let sampler = self.program.add_record(
            Record::new("sampler", Scope::Namespace(self.sycl))
                .class()
                .with_field(Field::new("m_sampler", handle.clone())),
        );
        let mut init = Function::new("__init", Scope::Record(sampler));
        init.kind = FnKind::Method(sampler);
        init.body = Some(Stmt::compound(vec![]));
        let init = self.program.add_function(init);
        self.program.add_param(init, "sampler", handle);
        sampler
    }

    /// A forward-declared kernel name class at global scope.
    pub fn kernel_name(&mut self, name: &str) -> QualType {
        let span = self.span();
        let rec = self.program.add_record(
            Record::new(name, Scope::TranslationUnit)
                .class()
                .incomplete()
                .at(span),
        );
        QualType::record(rec)
    }

    /// A closure type with the given captures.
    pub fn closure(&mut self, fields: Vec<Field>) -> RecordId {
        let span = self.span();
        let mut record = Record::new("", Scope::TranslationUnit).closure().at(span);
        record.fields = fields;
        self.program.add_record(record)
    }

    /// Give `kernel_obj` a call operator with `body`.
    pub fn call_operator(&mut self, kernel_obj: RecordId, body: Vec<Stmt>) -> FuncId {
        let mut op = Function::new("operator()", Scope::Record(kernel_obj));
        op.kind = FnKind::Method(kernel_obj);
        op.span = self.span();
        op.body = Some(Stmt::compound(body));
        self.program.add_function(op)
    }

    /// `template <typename Name, typename Func> void kernel_single_task(Func f) { f(); }`
    /// specialized for `name` and `kernel_obj`.
    pub fn kernel_caller(&mut self, name: QualType, kernel_obj: RecordId, op: FuncId) -> FuncId {
        let mut caller = Function::new("kernel_single_task", Scope::TranslationUnit);
        caller.attrs.push(Attr::KernelCaller);
        caller.template_args = vec![
            TemplateArg::Type(name),
            TemplateArg::Type(QualType::record(kernel_obj)),
        ];
        caller.span = self.span();
        let caller = self.program.add_function(caller);
        let obj_ty = QualType::record(kernel_obj);
        let param = self.program.add_param(caller, "KernelFunc", obj_ty.clone());
        let span = self.span();
        let call = Expr::new(
            ExprKind::MemberCall {
                base: Box::new(Expr::var(param, obj_ty)),
                method: op,
                args: vec![],
            },
            QualType::void(),
            span,
        );
        self.program[caller].body = Some(Stmt::new(
            StmtKind::Compound(vec![Stmt::expr(call)]),
            span,
        ));
        caller
    }

    /// A free function with a body.
    pub fn function(&mut self, name: &str, body: Vec<Stmt>) -> FuncId {
        let mut func = Function::new(name, Scope::TranslationUnit);
        func.span = self.span();
        func.body = Some(Stmt::compound(body));
        self.program.add_function(func)
    }

    /// An expression statement calling `callee` directly.
    pub fn call_stmt(&mut self, callee: FuncId) -> Stmt {
        let span = self.span();
        let ret = self.program[callee].ret.clone();
        Stmt::expr(Expr::call(callee, vec![], ret).at(span))
    }

    /// An expression statement calling through a function value.
    pub fn indirect_call_stmt(&mut self, target: VarId) -> Stmt {
        let span = self.span();
        let ty = self.program[target].ty.clone();
        Stmt::expr(
            Expr::new(
                ExprKind::Call {
                    callee: Callee::Indirect(Box::new(Expr::var(target, ty))),
                    args: vec![],
                },
                QualType::void(),
                span,
            ),
        )
    }

    /// Append `stmt` to the compound body of `func`.
    pub fn push_stmt(&mut self, func: FuncId, stmt: Stmt) {
        if let Some(Stmt {
            kind: StmtKind::Compound(stmts),
            ..
        }) = &mut self.program[func].body
        {
            stmts.push(stmt);
        }
    }
}

pub(crate) fn int() -> QualType {
    QualType::scalar(ScalarKind::Int)
}

pub(crate) fn float() -> QualType {
    QualType::scalar(ScalarKind::Float)
}
