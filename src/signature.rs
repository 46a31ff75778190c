//! Kernel signature flattening.
//!
//! Turns a kernel object type into the flat raw parameter list of its device
//! entry point and, in the same pass, the parameter descriptors the host
//! runtime uses to lay out arguments.

use crate::classify::{init_method, walk_kernel_fields, FieldSite, FieldVisitor, SpecialKind};
use crate::config::PointerSpacePolicy;
use crate::decl::display::type_name;
use crate::decl::*;
use crate::diagnostic::{Category, Diagnostic};
use crate::error::{InternalFault, Result};
use crate::layout::{is_standard_layout, size_of};

// ─── Accessor encoding ─────────────────────────────────────────────

/// Accessor target values as the runtime enumerates them.
pub const ACCESS_GLOBAL_BUFFER: i64 = 2014;
pub const ACCESS_LOCAL: i64 = 2016;

/// Template argument positions in an accessor specialization.
const ACCESSOR_DIMS_ARG: usize = 1;
const ACCESSOR_TARGET_ARG: usize = 3;

/// Pack an accessor's target and dimension count into a descriptor `info`.
pub fn accessor_info(target: u32, dims: u32) -> u32 {
    target | (dims << 11)
}

// ─── Descriptors ───────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Accessor,
    StdLayout,
    Sampler,
    Pointer,
}

impl ParamKind {
    /// Enumerator name in the runtime's `kernel_param_kind_t`.
    pub fn as_str(self) -> &'static str {
        match self {
            ParamKind::Accessor => "kind_accessor",
            ParamKind::StdLayout => "kind_std_layout",
            ParamKind::Sampler => "kind_sampler",
            ParamKind::Pointer => "kind_pointer",
        }
    }
}

/// One entry of a kernel's flat signature as the runtime sees it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParamDesc {
    pub kind: ParamKind,
    /// Packed target and dimensions for accessors, byte size otherwise.
    pub info: u32,
    /// Byte offset of the source field inside the kernel object.
    pub offset: u32,
}

/// One parameter of the synthesized entry point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawParam {
    pub name: String,
    pub ty: QualType,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KernelSignature {
    pub params: Vec<RawParam>,
    pub descs: Vec<ParamDesc>,
}

/// Flatten `kernel_obj` into raw parameters and descriptors.
///
/// Layout problems the user can fix are pushed to `diagnostics`; a shape the
/// front-end promised never to produce is an `Err`.
pub fn build_signature(
    program: &Program,
    kernel_obj: RecordId,
    policy: PointerSpacePolicy,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<KernelSignature> {
    let mut builder = SignatureBuilder {
        program,
        policy,
        diagnostics,
        sig: KernelSignature::default(),
    };
    walk_kernel_fields(program, kernel_obj, &mut builder)?;
    Ok(builder.sig)
}

struct SignatureBuilder<'a> {
    program: &'a Program,
    policy: PointerSpacePolicy,
    diagnostics: &'a mut Vec<Diagnostic>,
    sig: KernelSignature,
}

impl SignatureBuilder<'_> {
    fn push_param(&mut self, name: String, ty: QualType) {
        self.sig.params.push(RawParam { name, ty });
    }

    fn push_desc(&mut self, site: &FieldSite<'_>, kind: ParamKind, info: u64) -> Result<()> {
        let narrow = |value: u64| {
            u32::try_from(value).map_err(|_| InternalFault::DescriptorOverflow {
                field: site.field.name.clone(),
                value,
            })
        };
        self.sig.descs.push(ParamDesc {
            kind,
            info: narrow(info)?,
            offset: narrow(site.offset)?,
        });
        Ok(())
    }

    fn accessor_desc_info(&self, record: RecordId) -> Result<u64> {
        let rec = &self.program[record];
        let arg = |index: usize| {
            rec.specialization
                .as_ref()
                .and_then(|s| s.args.get(index))
                .and_then(TemplateArg::as_integral)
                .ok_or_else(|| InternalFault::MalformedAccessor {
                    record: rec.name.clone(),
                    index,
                })
        };
        let narrow = |index: usize| -> Result<u32> {
            let value = arg(index)?;
            u32::try_from(value).map_err(|_| InternalFault::MalformedAccessor {
                record: rec.name.clone(),
                index,
            })
        };
        let dims = narrow(ACCESSOR_DIMS_ARG)?;
        let target = narrow(ACCESSOR_TARGET_ARG)?;
        Ok(u64::from(accessor_info(target, dims)))
    }

    /// The pointer type a device parameter gets for a pointer field.
    fn device_pointer(&mut self, field: &Field) -> QualType {
        let Some(pointee) = field.ty.pointee() else {
            return field.ty.clone();
        };
        let explicit = !matches!(pointee.space, AddressSpace::Default | AddressSpace::Global);
        let retag = match self.policy {
            PointerSpacePolicy::Override => true,
            PointerSpacePolicy::Preserve => !explicit,
            PointerSpacePolicy::Reject => {
                if explicit {
                    self.diagnostics.push(
                        Diagnostic::error(
                            Category::Layout,
                            format!(
                                "pointer kernel parameter '{}' points into a non-global address space",
                                field.name
                            ),
                            field.diagnostic_span(),
                        )
                        .with_note(format!("pointee type is '{}'", type_name(self.program, pointee))),
                    );
                }
                !explicit
            }
        };
        if !retag {
            return field.ty.clone();
        }
        let mut global = pointee.clone();
        global.space = AddressSpace::Global;
        QualType {
            ty: Type::Pointer(Box::new(global)),
            is_const: field.ty.is_const,
            space: field.ty.space,
        }
    }
}

impl FieldVisitor for SignatureBuilder<'_> {
    fn special(&mut self, site: &FieldSite<'_>, kind: SpecialKind, record: RecordId) -> Result<()> {
        let program = self.program;
        let init = init_method(program, record)?;
        let init_params = &program[init].params;
        let base = site.param_name(program);
        for (slot, &param) in init_params.iter().enumerate() {
            self.push_param(format!("{}_{}", base, slot), program[param].ty.clone());
        }
        match kind {
            SpecialKind::Accessor => {
                let info = self.accessor_desc_info(record)?;
                self.push_desc(site, ParamKind::Accessor, info)
            }
            SpecialKind::Sampler => {
                let size = match init_params.first() {
                    Some(&first) => size_of(program, &program[first].ty)?,
                    None => 0,
                };
                self.push_desc(site, ParamKind::Sampler, size)
            }
        }
    }

    fn wrapper(&mut self, site: &FieldSite<'_>, record: RecordId) -> Result<()> {
        if !is_standard_layout(self.program, record) {
            self.diagnostics.push(
                Diagnostic::error(
                    Category::Layout,
                    format!(
                        "kernel parameter '{}' has non-standard layout type '{}'",
                        site.field.name,
                        type_name(self.program, &site.field.ty)
                    ),
                    site.field.diagnostic_span(),
                )
                .with_help("device kernels only accept standard-layout aggregates".to_string()),
            );
        }
        self.push_param(site.param_name(self.program), site.field.ty.clone());
        let size = size_of(self.program, &site.field.ty)?;
        self.push_desc(site, ParamKind::StdLayout, size)
    }

    fn pointer(&mut self, site: &FieldSite<'_>) -> Result<()> {
        let ty = self.device_pointer(site.field);
        self.push_param(site.param_name(self.program), ty);
        let size = size_of(self.program, &site.field.ty)?;
        self.push_desc(site, ParamKind::Pointer, size)
    }

    fn scalar(&mut self, site: &FieldSite<'_>) -> Result<()> {
        self.push_param(site.param_name(self.program), site.field.ty.clone());
        let size = size_of(self.program, &site.field.ty)?;
        self.push_desc(site, ParamKind::StdLayout, size)
    }
}
