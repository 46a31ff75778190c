//! The integration header: descriptor tables the host runtime compiles in.
//!
//! Kernels accumulate in a [`KernelRegistry`] while the pass runs; the
//! header is rendered from it once, at the end.

mod emit;
mod registry;

pub use emit::IntegrationHeader;
pub use registry::{KernelDesc, KernelRegistry};

use indexmap::IndexSet;
use thiserror::Error;

use crate::decl::display::record_name;
use crate::decl::*;
use crate::diagnostic::{Category, Diagnostic};
use crate::error::{InternalFault, Result};

#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("cannot write integration header: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Internal(#[from] InternalFault),
}

/// A declaration the header has to forward-declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum FwdDecl {
    Record(RecordId),
    Template(TemplateId),
}

impl FwdDecl {
    fn scope(self, program: &Program) -> Scope {
        match self {
            FwdDecl::Record(id) => program[id].scope,
            FwdDecl::Template(id) => program[id].scope,
        }
    }
}

/// Append the declarations `ty` depends on to `out`, template arguments
/// before the template that uses them.
pub(crate) fn collect_fwd_decls(
    program: &Program,
    ty: &QualType,
    out: &mut IndexSet<FwdDecl>,
) -> Result<()> {
    let mut ty = ty;
    while let Some(pointee) = ty.pointee() {
        ty = pointee;
    }
    let Some(id) = ty.as_record() else {
        return Ok(());
    };
    let Some(spec) = &program[id].specialization else {
        out.insert(FwdDecl::Record(id));
        return Ok(());
    };
    for arg in &spec.args {
        match arg {
            TemplateArg::Type(inner) => collect_fwd_decls(program, inner, out)?,
            TemplateArg::Pack(items) => {
                for inner in items.iter().filter_map(TemplateArg::as_type) {
                    collect_fwd_decls(program, inner, out)?;
                }
            }
            TemplateArg::Template(_) => {
                return Err(InternalFault::TemplateTemplateArgument {
                    name: record_name(program, id),
                })
            }
            TemplateArg::Integral(_) => {}
        }
    }
    out.insert(FwdDecl::Template(spec.template));
    Ok(())
}

/// Report kernel name declarations the header could not name.
///
/// A defined class nested in a class or function has no forward declaration
/// that would reach it from the header.
pub fn check_kernel_name(
    program: &Program,
    name_type: &QualType,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<()> {
    let mut decls = IndexSet::new();
    collect_fwd_decls(program, name_type, &mut decls)?;
    for decl in decls {
        let mut scope = decl.scope(program);
        while let Scope::Namespace(ns) = scope {
            scope = program[ns].parent;
        }
        if scope == Scope::TranslationUnit {
            continue;
        }
        let (name, complete, span) = match decl {
            FwdDecl::Record(id) => {
                let record = &program[id];
                (record_name(program, id), record.is_complete, record.span)
            }
            FwdDecl::Template(id) => (program[id].name.clone(), true, program[id].span),
        };
        if complete {
            diagnostics.push(
                Diagnostic::error(
                    Category::Naming,
                    format!("kernel name class '{}' is not declared at namespace scope", name),
                    span,
                )
                .with_help(
                    "declare kernel name types globally or inside a named namespace".to_string(),
                ),
            );
        }
    }
    Ok(())
}
