use super::*;
use crate::ast::{AsmDialect, Callee, Catch, Expr, ExprKind, Member, Stmt, StmtKind};
use crate::decl::fixtures::*;

fn run(fx: &mut Fixture, kernels: &[FuncId], relaxed: bool) -> (DeviceSummary, Vec<Diagnostic>) {
    let mut diags = Vec::new();
    let summary = mark_device(&mut fx.program, kernels, relaxed, &mut diags);
    (summary, diags)
}

fn restrictions(diags: &[Diagnostic]) -> Vec<RestrictKind> {
    diags
        .iter()
        .filter_map(|d| match d.category {
            Category::Restriction(kind) => Some(kind),
            _ => None,
        })
        .collect()
}

fn count(diags: &[Diagnostic], category: Category) -> usize {
    diags.iter().filter(|d| d.category == category).count()
}

fn expr_stmt(fx: &mut Fixture, kind: ExprKind, ty: QualType) -> Stmt {
    let span = fx.span();
    Stmt::expr(Expr::new(kind, ty, span))
}

fn var_ref(fx: &mut Fixture, var: VarId) -> Stmt {
    let span = fx.span();
    let ty = fx.program[var].ty.clone();
    Stmt::expr(Expr::var(var, ty).at(span))
}

/// kernel -> a -> b -> c -> a
fn cycle(fx: &mut Fixture) -> (FuncId, [FuncId; 3]) {
    let a = fx.function("a", vec![]);
    let b = fx.function("b", vec![]);
    let c = fx.function("c", vec![]);
    for (from, to) in [(a, b), (b, c), (c, a)] {
        let stmt = fx.call_stmt(to);
        fx.push_stmt(from, stmt);
    }
    let call_a = fx.call_stmt(a);
    let kernel = fx.function("kernel", vec![call_a]);
    (kernel, [a, b, c])
}

// ─── Recursion ─────────────────────────────────────────────────────

#[test]
fn test_cycle_is_reported_once_with_frame_notes() {
    let mut fx = Fixture::new();
    let (kernel, [a, b, c]) = cycle(&mut fx);
    let (summary, diags) = run(&mut fx, &[kernel], false);

    assert_eq!(count(&diags, Category::Recursion), 1);
    let diag = diags
        .iter()
        .find(|d| d.category == Category::Recursion)
        .unwrap();
    assert_eq!(diag.span, fx.program[a].span);
    let notes: Vec<&str> = diag.notes.iter().map(|n| n.message.as_str()).collect();
    assert_eq!(notes, vec!["'c' calls 'a'", "'b' calls 'c'", "'a' calls 'b'"]);
    assert!(diag.notes.iter().all(|n| n.span.is_some()));

    assert!(summary.recursive.contains(&a));
    assert!(summary.recursive.contains(&c));
    assert_eq!(summary.device_functions, vec![kernel, a, b, c]);
}

#[test]
fn test_calls_into_recursive_functions_are_restricted() {
    let mut fx = Fixture::new();
    let (kernel, [a, _, _]) = cycle(&mut fx);
    let (_, diags) = run(&mut fx, &[kernel], false);

    let recursive_calls: Vec<&Diagnostic> = diags
        .iter()
        .filter(|d| d.category == Category::Restriction(RestrictKind::RecursiveCall))
        .collect();
    // kernel -> a, b -> c, c -> a
    assert_eq!(recursive_calls.len(), 3);
    let into_a = recursive_calls
        .iter()
        .filter(|d| d.notes[0].message == "'a' declared here")
        .count();
    assert_eq!(into_a, 2);
    assert!(recursive_calls[0].notes[0].span == Some(fx.program[a].span));
}

#[test]
fn test_cycle_through_the_kernel_is_found() {
    let mut fx = Fixture::new();
    let a = fx.function("a", vec![]);
    let call_a = fx.call_stmt(a);
    let kernel = fx.function("kernel", vec![call_a]);
    let back = fx.call_stmt(kernel);
    fx.push_stmt(a, back);

    let (summary, diags) = run(&mut fx, &[kernel], false);
    assert_eq!(count(&diags, Category::Recursion), 1);
    assert!(summary.recursive.contains(&kernel));
}

#[test]
fn test_self_recursion() {
    let mut fx = Fixture::new();
    let f = fx.function("f", vec![]);
    let again = fx.call_stmt(f);
    fx.push_stmt(f, again);
    let call = fx.call_stmt(f);
    let kernel = fx.function("kernel", vec![call]);

    let (summary, diags) = run(&mut fx, &[kernel], false);
    let diag = diags
        .iter()
        .find(|d| d.category == Category::Recursion)
        .unwrap();
    assert_eq!(diag.notes.len(), 1);
    assert_eq!(diag.notes[0].message, "'f' calls 'f'");
    assert_eq!(summary.recursive, vec![f]);
}

#[test]
fn test_shared_callee_is_checked_once() {
    let mut fx = Fixture::new();
    let throw = expr_stmt(&mut fx, ExprKind::Throw(None), QualType::void());
    let shared = fx.function("shared", vec![throw]);
    let call = fx.call_stmt(shared);
    let left = fx.function("left", vec![call]);
    let call = fx.call_stmt(shared);
    let right = fx.function("right", vec![call]);
    let calls = vec![fx.call_stmt(left), fx.call_stmt(right)];
    let kernel = fx.function("kernel", calls);

    let (summary, diags) = run(&mut fx, &[kernel], false);
    assert_eq!(count(&diags, Category::Recursion), 0);
    assert_eq!(restrictions(&diags), vec![RestrictKind::Exceptions]);
    assert_eq!(summary.device_functions, vec![kernel, left, shared, right]);
}

#[test]
fn test_unreachable_functions_stay_host() {
    let mut fx = Fixture::new();
    let used = fx.function("used", vec![]);
    let unused = fx.function("unused", vec![]);
    let call = fx.call_stmt(used);
    let kernel = fx.function("kernel", vec![call]);

    run(&mut fx, &[kernel], false);
    assert!(fx.program[used].is_device());
    assert!(fx.program[kernel].is_device());
    assert!(!fx.program[unused].is_device());
}

// ─── Attribute propagation ─────────────────────────────────────────

fn with_sub_group(fx: &mut Fixture, name: &str, size: u32) -> FuncId {
    let f = fx.function(name, vec![]);
    let span = fx.span();
    fx.program[f]
        .attrs
        .push(Attr::ReqdSubGroupSize { size, span });
    f
}

#[test]
fn test_conflicting_sub_group_sizes() {
    let mut fx = Fixture::new();
    let f = with_sub_group(&mut fx, "f", 16);
    let g = with_sub_group(&mut fx, "g", 32);
    let calls = vec![fx.call_stmt(f), fx.call_stmt(g)];
    let kernel = fx.function("kernel", calls);

    let (summary, diags) = run(&mut fx, &[kernel], false);
    assert_eq!(count(&diags, Category::AttributeConflict), 1);
    let conflict = diags
        .iter()
        .find(|d| d.category == Category::AttributeConflict)
        .unwrap();
    assert_eq!(conflict.span, fx.program[kernel].span);
    assert_eq!(conflict.notes.len(), 2);
    assert_eq!(
        conflict.notes[0].span,
        fx.program[f].reqd_sub_group_size().map(|(_, s)| s)
    );
    assert_eq!(
        conflict.notes[1].span,
        fx.program[g].reqd_sub_group_size().map(|(_, s)| s)
    );
    assert!(fx.program[kernel].is_invalid);
    assert_eq!(summary.invalid_kernels, vec![kernel]);
}

#[test]
fn test_conflict_lists_every_origin_once() {
    let mut fx = Fixture::new();
    let f = with_sub_group(&mut fx, "f", 16);
    let g = with_sub_group(&mut fx, "g", 32);
    let h = with_sub_group(&mut fx, "h", 32);
    let calls = vec![fx.call_stmt(f), fx.call_stmt(g), fx.call_stmt(h)];
    let kernel = fx.function("kernel", calls);

    let (summary, diags) = run(&mut fx, &[kernel], false);
    let conflicts: Vec<&Diagnostic> = diags
        .iter()
        .filter(|d| d.category == Category::AttributeConflict)
        .collect();
    assert_eq!(conflicts.len(), 1);
    let origins: Vec<Option<Span>> = [f, g, h]
        .iter()
        .map(|&func| fx.program[func].reqd_sub_group_size().map(|(_, s)| s))
        .collect();
    let notes: Vec<Option<Span>> = conflicts[0].notes.iter().map(|n| n.span).collect();
    assert_eq!(notes, origins);
    assert_eq!(summary.invalid_kernels, vec![kernel]);
    assert_eq!(fx.program[kernel].reqd_sub_group_size(), None);
}

#[test]
fn test_matching_sub_group_sizes_attach() {
    let mut fx = Fixture::new();
    let f = with_sub_group(&mut fx, "f", 16);
    let g = with_sub_group(&mut fx, "g", 16);
    let call_g = fx.call_stmt(g);
    fx.push_stmt(f, call_g);
    let calls = vec![fx.call_stmt(f), fx.call_stmt(g)];
    let kernel = fx.function("kernel", calls);

    let (summary, diags) = run(&mut fx, &[kernel], false);
    assert_eq!(count(&diags, Category::AttributeConflict), 0);
    assert!(!fx.program[kernel].is_invalid);
    assert_eq!(
        fx.program[kernel].reqd_sub_group_size().map(|(size, _)| size),
        Some(16)
    );
    assert!(summary.invalid_kernels.is_empty());
}

#[test]
fn test_unlisted_attributes_are_not_propagated() {
    let mut fx = Fixture::new();
    let f = fx.function("f", vec![]);
    fx.program[f].attrs.push(Attr::Other("noinline".to_string()));
    let call = fx.call_stmt(f);
    let kernel = fx.function("kernel", vec![call]);

    run(&mut fx, &[kernel], false);
    assert!(!fx.program[kernel].has_attr(|a| matches!(a, Attr::Other(_))));
}

// ─── Restrictions ──────────────────────────────────────────────────

#[test]
fn test_variable_restrictions() {
    let mut fx = Fixture::new();
    let span = fx.span();
    let global = fx.program.add_var("counter", int(), Storage::Global, span);
    let constant = fx
        .program
        .add_var("limit", int().constant(), Storage::Global, span);
    let static_local = fx
        .program
        .add_var("calls", int(), Storage::StaticLocal, span);
    let member = fx
        .program
        .add_var("instances", int(), Storage::StaticMember, span);

    let body = vec![
        var_ref(&mut fx, global),
        var_ref(&mut fx, constant),
        var_ref(&mut fx, static_local),
        var_ref(&mut fx, member),
    ];
    let kernel = fx.function("kernel", body);
    let (_, diags) = run(&mut fx, &[kernel], false);
    assert_eq!(
        restrictions(&diags),
        vec![
            RestrictKind::GlobalVariable,
            RestrictKind::NonConstStaticDataVariable
        ]
    );
}

#[test]
fn test_restriction_names_the_device_function() {
    let mut fx = Fixture::new();
    let span = fx.span();
    let global = fx.program.add_var("counter", int(), Storage::Global, span);
    let read = var_ref(&mut fx, global);
    let helper = fx.function("helper", vec![read]);
    let call = fx.call_stmt(helper);
    let kernel = fx.function("kernel", vec![call]);

    let (_, diags) = run(&mut fx, &[kernel], false);
    let diag = diags
        .iter()
        .find(|d| d.category == Category::Restriction(RestrictKind::GlobalVariable))
        .unwrap();
    assert_eq!(diag.notes.len(), 1);
    assert_eq!(diag.notes[0].message, "reached in device function 'helper'");
    assert_eq!(diag.notes[0].span, Some(fx.program[helper].span));
}

#[test]
fn test_static_member_access() {
    let mut fx = Fixture::new();
    let rec = fx
        .program
        .add_record(Record::new("Config", Scope::TranslationUnit));
    let local = fx
        .program
        .add_var("cfg", QualType::record(rec), Storage::Local, Span::dummy());
    let member = fx
        .program
        .add_var("shared", int(), Storage::StaticMember, Span::dummy());
    let access = ExprKind::Member {
        base: Box::new(Expr::var(local, QualType::record(rec))),
        member: Member::Static(member),
    };
    let stmt = expr_stmt(&mut fx, access, int());
    let kernel = fx.function("kernel", vec![stmt]);

    let (_, diags) = run(&mut fx, &[kernel], false);
    assert_eq!(
        restrictions(&diags),
        vec![RestrictKind::NonConstStaticDataVariable]
    );
}

#[test]
fn test_rtti_virtual_and_assembly() {
    let mut fx = Fixture::new();
    let rec = fx
        .program
        .add_record(Record::new("Shape", Scope::TranslationUnit));
    let mut area = Function::new("area", Scope::Record(rec));
    area.kind = FnKind::Method(rec);
    area.is_virtual = true;
    let area = fx.program.add_function(area);
    let obj = fx
        .program
        .add_var("s", QualType::record(rec), Storage::Local, Span::dummy());

    let typeid = expr_stmt(&mut fx, ExprKind::Typeid(None), int());
    let cast = expr_stmt(
        &mut fx,
        ExprKind::DynamicCast(Box::new(Expr::var(obj, QualType::record(rec)))),
        QualType::record(rec),
    );
    let call = expr_stmt(
        &mut fx,
        ExprKind::MemberCall {
            base: Box::new(Expr::var(obj, QualType::record(rec))),
            method: area,
            args: vec![],
        },
        QualType::void(),
    );
    let asm_span = fx.span();
    let asm = Stmt::new(
        StmtKind::Asm {
            dialect: AsmDialect::Gcc,
            text: "nop".to_string(),
        },
        asm_span,
    );
    let kernel = fx.function("kernel", vec![typeid, cast, call, asm]);

    let (_, diags) = run(&mut fx, &[kernel], false);
    assert_eq!(
        restrictions(&diags),
        vec![
            RestrictKind::Rtti,
            RestrictKind::Rtti,
            RestrictKind::VirtualCall,
            RestrictKind::Assembly
        ]
    );
    let asm_diag = diags
        .iter()
        .find(|d| d.category == Category::Restriction(RestrictKind::Assembly))
        .unwrap();
    assert_eq!(asm_diag.span, asm_span);
}

#[test]
fn test_exception_constructs() {
    let mut fx = Fixture::new();
    let throw = expr_stmt(&mut fx, ExprKind::Throw(None), QualType::void());
    let try_span = fx.span();
    let catch_span = fx.span();
    let try_stmt = Stmt::new(
        StmtKind::Try {
            body: Box::new(Stmt::compound(vec![throw])),
            handlers: vec![Catch {
                param: None,
                body: Stmt::compound(vec![]),
                span: catch_span,
            }],
        },
        try_span,
    );
    let seh = Stmt::new(
        StmtKind::SehTry {
            body: Box::new(Stmt::compound(vec![])),
            handler: Box::new(Stmt::compound(vec![])),
        },
        fx.span(),
    );
    let kernel = fx.function("kernel", vec![try_stmt, seh]);

    let (_, diags) = run(&mut fx, &[kernel], false);
    // try, throw, catch, __try
    assert_eq!(restrictions(&diags), vec![RestrictKind::Exceptions; 4]);
    let spans: Vec<Span> = diags.iter().map(|d| d.span).collect();
    assert!(spans.contains(&try_span));
    assert!(spans.contains(&catch_span));
}

#[test]
fn test_function_pointer_calls_respect_relaxed_mode() {
    let mut fx = Fixture::new();
    let fn_ty = QualType::pointer_to(QualType::new(Type::Function {
        params: vec![],
        ret: Box::new(QualType::void()),
    }));
    let fp = fx
        .program
        .add_var("callback", fn_ty, Storage::Local, Span::dummy());
    let call = fx.indirect_call_stmt(fp);
    let kernel = fx.function("kernel", vec![call]);

    let (_, diags) = run(&mut fx, &[kernel], true);
    assert!(restrictions(&diags).is_empty());

    let (_, diags) = run(&mut fx, &[kernel], false);
    assert_eq!(restrictions(&diags), vec![RestrictKind::FunctionPointer]);
}

#[test]
fn test_allocation_and_placement_new() {
    let mut fx = Fixture::new();
    let mut global_new = Function::new("operator new", Scope::TranslationUnit);
    global_new.is_replaceable_allocator = true;
    global_new.ret = QualType::pointer_to(QualType::void());
    let global_new = fx.program.add_function(global_new);
    let placement = fx.function("operator new", vec![]);
    fx.program[placement].ret = QualType::pointer_to(QualType::void());

    let ptr = QualType::pointer_to(int());
    let alloc = expr_stmt(
        &mut fx,
        ExprKind::New {
            operator: Some(global_new),
            args: vec![],
        },
        ptr.clone(),
    );
    let place = expr_stmt(
        &mut fx,
        ExprKind::New {
            operator: Some(placement),
            args: vec![],
        },
        ptr,
    );
    let kernel = fx.function("kernel", vec![alloc, place]);

    let (summary, diags) = run(&mut fx, &[kernel], false);
    assert_eq!(restrictions(&diags), vec![RestrictKind::AllocateStorage]);
    assert!(summary.device_functions.contains(&placement));
    assert!(fx.program[placement].is_device());
    assert!(!fx.program[global_new].is_device());
}

#[test]
fn test_construction_schedules_constructor_and_destructor() {
    let mut fx = Fixture::new();
    let rec = fx
        .program
        .add_record(Record::new("Guard", Scope::TranslationUnit));
    let mut ctor = Function::new("Guard", Scope::Record(rec));
    ctor.kind = FnKind::Constructor(rec);
    ctor.body = Some(Stmt::compound(vec![]));
    let ctor = fx.program.add_function(ctor);
    let mut dtor = Function::new("~Guard", Scope::Record(rec));
    dtor.kind = FnKind::Destructor(rec);
    dtor.body = Some(Stmt::compound(vec![]));
    let dtor = fx.program.add_function(dtor);

    let construct = expr_stmt(
        &mut fx,
        ExprKind::Construct { ctor, args: vec![] },
        QualType::record(rec),
    );
    let kernel = fx.function("kernel", vec![construct]);

    let (summary, diags) = run(&mut fx, &[kernel], false);
    assert!(diags.is_empty());
    assert_eq!(summary.device_functions, vec![kernel, ctor, dtor]);
}

// ─── Device types ──────────────────────────────────────────────────

#[test]
fn test_variable_length_array() {
    let mut fx = Fixture::new();
    let span = fx.span();
    let vla = fx.program.add_var(
        "buf",
        QualType::new(Type::VariableArray(Box::new(int()))),
        Storage::Local,
        span,
    );
    let decl = Stmt::new(StmtKind::Decl(vla, None), span);
    let kernel = fx.function("kernel", vec![decl]);

    let (_, diags) = run(&mut fx, &[kernel], false);
    assert_eq!(count(&diags, Category::DeviceType), 1);
    assert_eq!(diags[0].span, span);
}

#[test]
fn test_polymorphic_type_through_field() {
    let mut fx = Fixture::new();
    let base_span = fx.span();
    let base = fx.program.add_record(
        Record::new("Base", Scope::TranslationUnit)
            .polymorphic()
            .at(base_span),
    );
    let field_span = fx.span();
    let holder = fx.program.add_record(
        Record::new("Holder", Scope::TranslationUnit)
            .with_field(Field::new("ptr", QualType::pointer_to(QualType::record(base))).at(field_span)),
    );
    let decl_span = fx.span();
    let var = fx
        .program
        .add_var("h", QualType::record(holder), Storage::Local, decl_span);
    let decl = Stmt::new(StmtKind::Decl(var, None), decl_span);
    let kernel = fx.function("kernel", vec![decl]);

    let (_, diags) = run(&mut fx, &[kernel], false);
    assert_eq!(count(&diags, Category::DeviceType), 1);
    let diag = &diags[0];
    assert_eq!(diag.span, base_span);
    let used: Vec<Option<Span>> = diag.notes.iter().map(|n| n.span).collect();
    assert_eq!(used, vec![Some(field_span), Some(decl_span)]);
}

#[test]
fn test_call_arguments_are_type_checked() {
    let mut fx = Fixture::new();
    let poly = fx
        .program
        .add_record(Record::new("Poly", Scope::TranslationUnit).polymorphic());
    let callee = fx.function("take", vec![]);
    let arg_span = fx.span();
    let arg = Expr::new(ExprKind::IntLit(0), QualType::record(poly), arg_span);
    let call = expr_stmt(
        &mut fx,
        ExprKind::Call {
            callee: Callee::Direct(callee),
            args: vec![arg],
        },
        QualType::void(),
    );
    let kernel = fx.function("kernel", vec![call]);

    let (_, diags) = run(&mut fx, &[kernel], false);
    assert_eq!(count(&diags, Category::DeviceType), 1);
    assert_eq!(diags[0].notes[0].span, Some(arg_span));
}
