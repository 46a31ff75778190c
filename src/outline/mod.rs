//! Entry-point synthesis.
//!
//! A kernel caller is a template specialization `caller<Name, Func>(Func f)`
//! whose body invokes `f`. For each one we build a free-standing device entry
//! point that takes the kernel object apart into raw parameters, puts it back
//! together in a local, and runs a copy of the caller body against that local.

mod body;
mod rewrite;

pub use rewrite::ParamSubstitution;

use crate::ast::{Stmt, StmtKind};
use crate::config::PointerSpacePolicy;
use crate::decl::*;
use crate::diagnostic::Diagnostic;
use crate::error::{InternalFault, Result};
use crate::mangle::NameMangler;
use crate::signature::{build_signature, KernelSignature};
use crate::span::Span;

/// What the synthesizer produced for one kernel caller.
#[derive(Clone, Debug)]
pub struct EntryPoint {
    pub func: FuncId,
    /// Mangled name of the kernel name type; also the entry point's symbol.
    pub name: String,
    pub name_type: QualType,
    pub kernel_obj: RecordId,
    pub signature: KernelSignature,
}

/// The parts of a kernel caller the synthesizer consumes.
struct CallerShape {
    param: VarId,
    kernel_obj: RecordId,
    name_type: QualType,
}

fn caller_shape(program: &Program, caller: FuncId) -> Result<CallerShape> {
    let func = &program[caller];
    let malformed = |reason| InternalFault::MalformedKernelCaller {
        caller: func.name.clone(),
        reason,
    };
    if !func.has_attr(|a| matches!(a, Attr::KernelCaller)) {
        return Err(malformed("not a kernel caller"));
    }
    let &param = func.params.first().ok_or_else(|| malformed("no kernel object parameter"))?;
    let kernel_obj = program[param]
        .ty
        .non_reference()
        .as_record()
        .ok_or_else(|| malformed("kernel object parameter is not a record"))?;
    if func.body.is_none() {
        return Err(malformed("no body"));
    }
    let name_type = func
        .template_args
        .first()
        .and_then(TemplateArg::as_type)
        .ok_or_else(|| malformed("first template argument is not a type"))?
        .clone();
    Ok(CallerShape {
        param,
        kernel_obj,
        name_type,
    })
}

/// Build the device entry point for `caller` and add it to `program`.
///
/// The caller itself is left untouched.
pub fn synthesize(
    program: &mut Program,
    caller: FuncId,
    mangler: &dyn NameMangler,
    policy: PointerSpacePolicy,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<EntryPoint> {
    let shape = caller_shape(program, caller)?;
    let signature = build_signature(program, shape.kernel_obj, policy, diagnostics)?;
    let name = mangler.mangle_type_name(program, &shape.name_type);

    let mut entry = Function::new(&name, Scope::TranslationUnit);
    entry.call_conv = CallConv::DeviceKernel;
    entry.attrs = vec![
        Attr::Device,
        Attr::OpenClKernel,
        Attr::AsmLabel(name.clone()),
        Attr::Artificial,
    ];
    entry.span = program[shape.kernel_obj].span;
    let func = program.add_function(entry);
    let params: Vec<VarId> = signature
        .params
        .iter()
        .map(|raw| program.add_param(func, &raw.name, raw.ty.clone()))
        .collect();

    let obj_ty = QualType::record(shape.kernel_obj);
    let local_name = program[shape.kernel_obj].name.clone();
    let local = program.add_var(&local_name, obj_ty, Storage::Local, Span::dummy());

    let mut stmts = vec![Stmt::new(StmtKind::Decl(local, None), Span::dummy())];
    stmts.extend(body::field_inits(program, shape.kernel_obj, local, &params)?);
    if let Some(original) = &program[caller].body {
        let mut subst = ParamSubstitution::new(shape.param, local);
        stmts.push(crate::ast::fold::Fold::fold_stmt(&mut subst, original));
    }
    program[func].body = Some(Stmt::compound(stmts));

    Ok(EntryPoint {
        func,
        name,
        name_type: shape.name_type,
        kernel_obj: shape.kernel_obj,
        signature,
    })
}
