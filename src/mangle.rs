//! Kernel names: a stable string for a kernel name type.
//!
//! The scheme itself is opaque to the rest of the pass; everything goes
//! through [`NameMangler`]. The default follows the Itanium type-name
//! encoding closely enough to be unique and stable per type.

use crate::decl::*;

pub trait NameMangler {
    fn mangle_type_name(&self, program: &Program, ty: &QualType) -> String;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ItaniumMangler;

impl NameMangler for ItaniumMangler {
    fn mangle_type_name(&self, program: &Program, ty: &QualType) -> String {
        let mut out = String::from("_ZTS");
        mangle_type(program, ty, &mut out);
        out
    }
}

fn mangle_type(program: &Program, ty: &QualType, out: &mut String) {
    if let Some(space) = address_space_number(ty.space) {
        out.push_str(&format!("U3AS{}", space));
    }
    if ty.is_const {
        out.push('K');
    }
    match &ty.ty {
        Type::Void => out.push('v'),
        Type::Scalar(kind) => out.push_str(scalar_code(*kind)),
        Type::Pointer(inner) => {
            out.push('P');
            mangle_type(program, inner, out);
        }
        Type::Reference(inner) => {
            out.push('R');
            mangle_type(program, inner, out);
        }
        Type::Array(inner, n) => {
            out.push_str(&format!("A{}_", n));
            mangle_type(program, inner, out);
        }
        Type::VariableArray(inner) => {
            out.push_str("A_");
            mangle_type(program, inner, out);
        }
        Type::Function { params, ret } => {
            out.push('F');
            mangle_type(program, ret, out);
            if params.is_empty() {
                out.push('v');
            }
            for p in params {
                mangle_type(program, p, out);
            }
            out.push('E');
        }
        Type::Record(id) => mangle_record(program, *id, out),
    }
}

fn mangle_record(program: &Program, id: RecordId, out: &mut String) {
    let record = &program[id];
    let mut prefix = Vec::new();
    let mut local_to = None;
    let mut scope = record.scope;
    loop {
        match scope {
            Scope::TranslationUnit => break,
            Scope::Namespace(ns) => {
                let ns = &program[ns];
                prefix.push(if ns.is_anonymous() {
                    "_GLOBAL__N_1".to_string()
                } else {
                    ns.name.clone()
                });
                scope = ns.parent;
            }
            Scope::Record(outer) => {
                prefix.push(program[outer].name.clone());
                scope = program[outer].scope;
            }
            Scope::Function(func) => {
                local_to = Some(func);
                break;
            }
        }
    }
    prefix.reverse();

    if let Some(func) = local_to {
        out.push('Z');
        source_name(&program[func].name, out);
        out.push_str("vE");
    }
    let nested = !prefix.is_empty();
    if nested {
        out.push('N');
        for p in &prefix {
            source_name(p, out);
        }
    }
    if record.name.is_empty() {
        out.push_str(if record.is_closure { "UlvE_" } else { "Ut_" });
    } else {
        source_name(&record.name, out);
    }
    if let Some(spec) = &record.specialization {
        out.push('I');
        for arg in &spec.args {
            mangle_template_arg(program, arg, out);
        }
        out.push('E');
    }
    if nested {
        out.push('E');
    }
}

fn mangle_template_arg(program: &Program, arg: &TemplateArg, out: &mut String) {
    match arg {
        TemplateArg::Type(ty) => mangle_type(program, ty, out),
        TemplateArg::Integral(v) if *v < 0 => out.push_str(&format!("Lin{}E", -v)),
        TemplateArg::Integral(v) => out.push_str(&format!("Li{}E", v)),
        TemplateArg::Pack(items) => {
            out.push('J');
            for item in items {
                mangle_template_arg(program, item, out);
            }
            out.push('E');
        }
        TemplateArg::Template(id) => source_name(&program[*id].name, out),
    }
}

fn source_name(name: &str, out: &mut String) {
    out.push_str(&name.len().to_string());
    out.push_str(name);
}

fn address_space_number(space: AddressSpace) -> Option<u32> {
    match space {
        AddressSpace::Default => None,
        AddressSpace::Private => Some(0),
        AddressSpace::Global => Some(1),
        AddressSpace::Constant => Some(2),
        AddressSpace::Local => Some(3),
    }
}

fn scalar_code(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Bool => "b",
        ScalarKind::Char => "c",
        ScalarKind::SChar => "a",
        ScalarKind::UChar => "h",
        ScalarKind::Short => "s",
        ScalarKind::UShort => "t",
        ScalarKind::Int => "i",
        ScalarKind::UInt => "j",
        ScalarKind::Long => "l",
        ScalarKind::ULong => "m",
        ScalarKind::LongLong => "x",
        ScalarKind::ULongLong => "y",
        ScalarKind::Half => "Dh",
        ScalarKind::Float => "f",
        ScalarKind::Double => "d",
    }
}
