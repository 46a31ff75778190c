//! Field classification and the one traversal of a kernel object's fields.
//!
//! The signature builder, the entry-point body and the descriptor table all
//! consume raw parameters in the order [`walk_kernel_fields`] produces. They
//! must never walk the fields themselves.

use crate::decl::*;
use crate::error::{InternalFault, Result};
use crate::layout::record_layout;

/// Namespace path, outermost first, that special object types live in.
const SPECIAL_SCOPE: [&str; 2] = ["cl", "sycl"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpecialKind {
    Accessor,
    Sampler,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldClass {
    Special(SpecialKind, RecordId),
    Wrapper(RecordId),
    Pointer,
    Scalar,
}

/// Recognize accessor and sampler types by their declaration context.
pub fn special_kind(program: &Program, ty: &QualType) -> Option<SpecialKind> {
    let id = ty.as_record()?;
    let record = &program[id];
    if !in_namespace_path(program, record.scope, &SPECIAL_SCOPE) {
        return None;
    }
    match (record.name.as_str(), record.specialization.is_some()) {
        ("accessor", true) => Some(SpecialKind::Accessor),
        ("sampler", false) => Some(SpecialKind::Sampler),
        _ => None,
    }
}

/// True when `scope` is exactly the named namespace chain directly under the
/// translation unit.
fn in_namespace_path(program: &Program, scope: Scope, path: &[&str]) -> bool {
    let mut cur = scope;
    for expected in path.iter().rev() {
        match cur {
            Scope::Namespace(ns) if program[ns].name == *expected => cur = program[ns].parent,
            _ => return false,
        }
    }
    cur == Scope::TranslationUnit
}

pub fn classify(program: &Program, field: &Field) -> Result<FieldClass> {
    let ty = &field.ty;
    if let Some(kind) = special_kind(program, ty) {
        // special_kind only answers for records
        let id = ty.as_record().ok_or_else(|| unsupported(program, field))?;
        return Ok(FieldClass::Special(kind, id));
    }
    match &ty.ty {
        Type::Record(id) => Ok(FieldClass::Wrapper(*id)),
        Type::Pointer(_) => Ok(FieldClass::Pointer),
        Type::Scalar(_) => Ok(FieldClass::Scalar),
        _ => Err(unsupported(program, field)),
    }
}

fn unsupported(program: &Program, field: &Field) -> InternalFault {
    InternalFault::UnsupportedFieldType {
        field: field.name.clone(),
        ty: crate::decl::display::type_name(program, &field.ty),
    }
}

/// The `__init` method of a special object, its reconstruction contract.
pub fn init_method(program: &Program, record: RecordId) -> Result<FuncId> {
    program
        .find_method(record, "__init")
        .ok_or_else(|| InternalFault::MissingInitMethod {
            record: program[record].name.clone(),
        })
}

// ─── Traversal ─────────────────────────────────────────────────────

/// One step of a member-access chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldRef {
    pub owner: RecordId,
    pub index: usize,
}

/// A field reached by the traversal.
pub struct FieldSite<'a> {
    /// Member chain from the kernel object down to this field.
    pub path: &'a [FieldRef],
    pub field: &'a Field,
    /// Byte offset from the start of the kernel object.
    pub offset: u64,
}

impl FieldSite<'_> {
    /// `_arg_` followed by every field name along the member chain, so
    /// same-named fields in different wrappers stay distinct.
    pub fn param_name(&self, program: &Program) -> String {
        let names: Vec<&str> = self
            .path
            .iter()
            .map(|step| program[step.owner].fields[step.index].name.as_str())
            .collect();
        format!("_arg_{}", names.join("_"))
    }
}

pub trait FieldVisitor {
    fn special(&mut self, site: &FieldSite<'_>, kind: SpecialKind, record: RecordId)
        -> Result<()>;

    /// A top-level record field. Nested specials inside it follow as
    /// separate `special` calls.
    fn wrapper(&mut self, site: &FieldSite<'_>, record: RecordId) -> Result<()>;

    fn pointer(&mut self, site: &FieldSite<'_>) -> Result<()>;

    fn scalar(&mut self, site: &FieldSite<'_>) -> Result<()>;
}

/// Visit the kernel object's fields depth-first in declaration order.
pub fn walk_kernel_fields(
    program: &Program,
    kernel_obj: RecordId,
    visitor: &mut dyn FieldVisitor,
) -> Result<()> {
    let layout = record_layout(program, kernel_obj)?;
    for (index, field) in program[kernel_obj].fields.iter().enumerate() {
        let path = [FieldRef {
            owner: kernel_obj,
            index,
        }];
        let site = FieldSite {
            path: &path,
            field,
            offset: layout.field_offsets[index],
        };
        match classify(program, field)? {
            FieldClass::Special(kind, record) => visitor.special(&site, kind, record)?,
            FieldClass::Wrapper(record) => {
                visitor.wrapper(&site, record)?;
                let mut chain = path.to_vec();
                walk_nested(program, record, &mut chain, site.offset, visitor)?;
            }
            FieldClass::Pointer => visitor.pointer(&site)?,
            FieldClass::Scalar => visitor.scalar(&site)?,
        }
    }
    Ok(())
}

/// Scan a wrapper for nested special objects. Everything else inside a
/// wrapper travels with the wrapper's own copy.
fn walk_nested(
    program: &Program,
    wrapper: RecordId,
    chain: &mut Vec<FieldRef>,
    base_offset: u64,
    visitor: &mut dyn FieldVisitor,
) -> Result<()> {
    let layout = record_layout(program, wrapper)?;
    for (index, field) in program[wrapper].fields.iter().enumerate() {
        let Some(record) = field.ty.as_record() else {
            continue;
        };
        let offset = base_offset + layout.field_offsets[index];
        chain.push(FieldRef {
            owner: wrapper,
            index,
        });
        if let Some(kind) = special_kind(program, &field.ty) {
            let site = FieldSite {
                path: chain.as_slice(),
                field,
                offset,
            };
            visitor.special(&site, kind, record)?;
        } else {
            walk_nested(program, record, chain, offset, visitor)?;
        }
        chain.pop();
    }
    Ok(())
}
