//! Record layout queries: sizes, alignments and field offsets.
//!
//! Natural C alignment on a 64-bit data model. Offsets are in bytes.

use crate::decl::*;
use crate::error::{InternalFault, Result};

const POINTER_SIZE: u64 = 8;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordLayout {
    pub size: u64,
    pub align: u64,
    /// Byte offset of each field, in declaration order.
    pub field_offsets: Vec<u64>,
}

pub fn size_of(program: &Program, ty: &QualType) -> Result<u64> {
    Ok(match &ty.ty {
        Type::Void | Type::Function { .. } => 1,
        Type::Scalar(kind) => kind.size(),
        Type::Pointer(_) | Type::Reference(_) | Type::VariableArray(_) => POINTER_SIZE,
        Type::Array(inner, n) => size_of(program, inner)? * n,
        Type::Record(id) => record_layout(program, *id)?.size,
    })
}

pub fn align_of(program: &Program, ty: &QualType) -> Result<u64> {
    Ok(match &ty.ty {
        Type::Void | Type::Function { .. } => 1,
        Type::Scalar(kind) => kind.size(),
        Type::Pointer(_) | Type::Reference(_) | Type::VariableArray(_) => POINTER_SIZE,
        Type::Array(inner, _) => align_of(program, inner)?,
        Type::Record(id) => record_layout(program, *id)?.align,
    })
}

/// Compute the layout of `id`. Base subobjects come first, then fields.
pub fn record_layout(program: &Program, id: RecordId) -> Result<RecordLayout> {
    let record = &program[id];
    if !record.is_complete {
        return Err(InternalFault::IncompleteLayout {
            record: record.name.clone(),
        });
    }

    let mut offset = if record.is_polymorphic { POINTER_SIZE } else { 0 };
    let mut align = if record.is_polymorphic { POINTER_SIZE } else { 1 };

    for &base in &record.bases {
        let base_layout = record_layout(program, base)?;
        // Empty bases occupy no storage.
        if base_layout.size > 1 || !base_layout.field_offsets.is_empty() {
            offset = round_up(offset, base_layout.align) + base_layout.size;
        }
        align = align.max(base_layout.align);
    }

    let mut field_offsets = Vec::with_capacity(record.fields.len());
    for field in &record.fields {
        let field_align = align_of(program, &field.ty)?;
        offset = round_up(offset, field_align);
        field_offsets.push(offset);
        offset += size_of(program, &field.ty)?;
        align = align.max(field_align);
    }

    let size = round_up(offset, align).max(1);
    Ok(RecordLayout {
        size,
        align,
        field_offsets,
    })
}

fn round_up(value: u64, align: u64) -> u64 {
    value.div_ceil(align) * align
}

/// Standard-layout check, following the usual C++ rules closely enough for
/// device argument passing.
pub fn is_standard_layout(program: &Program, id: RecordId) -> bool {
    let record = &program[id];
    if record.is_polymorphic {
        return false;
    }
    if let Some(first) = record.fields.first() {
        if record.fields.iter().any(|f| f.access != first.access) {
            return false;
        }
    }
    for field in &record.fields {
        match &field.ty.ty {
            Type::Reference(_) => return false,
            Type::Record(inner) if !is_standard_layout(program, *inner) => return false,
            Type::Array(elem, _) => {
                if let Some(inner) = elem.as_record() {
                    if !is_standard_layout(program, inner) {
                        return false;
                    }
                }
            }
            _ => {}
        }
    }
    if !record.bases.iter().all(|&b| is_standard_layout(program, b)) {
        return false;
    }
    // At most one class in the hierarchy may declare fields.
    let declaring = std::iter::once(id)
        .chain(record.bases.iter().copied())
        .filter(|&r| !program[r].fields.is_empty())
        .count();
    declaring <= 1
}
