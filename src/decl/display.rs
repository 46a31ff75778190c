//! Source-level spelling of types and declarations.

use super::*;

/// Fully qualified spelling of a type, e.g. `ns::Box<int, 3>`.
pub fn type_name(program: &Program, ty: &QualType) -> String {
    let base = match &ty.ty {
        Type::Void => "void".to_string(),
        Type::Scalar(kind) => kind.spelling().to_string(),
        Type::Pointer(inner) => pointer_suffix(type_name(program, inner), "*"),
        Type::Reference(inner) => pointer_suffix(type_name(program, inner), "&"),
        Type::Array(inner, n) => format!("{}[{}]", type_name(program, inner), n),
        Type::VariableArray(inner) => format!("{}[*]", type_name(program, inner)),
        Type::Record(id) => record_name(program, *id),
        Type::Function { params, ret } => {
            let params: Vec<String> = params.iter().map(|p| type_name(program, p)).collect();
            format!("{} ({})", type_name(program, ret), params.join(", "))
        }
    };
    let mut out = String::new();
    if ty.is_const {
        out.push_str("const ");
    }
    if let Some(kw) = ty.space.keyword() {
        out.push_str(kw);
        out.push(' ');
    }
    out.push_str(&base);
    out
}

fn pointer_suffix(inner: String, sigil: &str) -> String {
    if inner.ends_with('*') || inner.ends_with('&') {
        format!("{}{}", inner, sigil)
    } else {
        format!("{} {}", inner, sigil)
    }
}

/// Qualified record name including template arguments.
pub fn record_name(program: &Program, id: RecordId) -> String {
    let record = &program[id];
    let mut name = scope_prefix(program, record.scope);
    if record.name.is_empty() {
        name.push_str(if record.is_closure {
            "(lambda)"
        } else {
            "(anonymous)"
        });
    } else {
        name.push_str(&record.name);
    }
    if let Some(spec) = &record.specialization {
        let args: Vec<String> = spec
            .args
            .iter()
            .map(|a| template_arg_name(program, a))
            .filter(|a| !a.is_empty())
            .collect();
        name.push('<');
        name.push_str(&args.join(", "));
        name.push('>');
    }
    name
}

pub fn template_arg_name(program: &Program, arg: &TemplateArg) -> String {
    match arg {
        TemplateArg::Type(ty) => type_name(program, ty),
        TemplateArg::Integral(v) => v.to_string(),
        TemplateArg::Pack(items) => items
            .iter()
            .map(|a| template_arg_name(program, a))
            .collect::<Vec<_>>()
            .join(", "),
        TemplateArg::Template(id) => {
            let template = &program[*id];
            format!("{}{}", scope_prefix(program, template.scope), template.name)
        }
    }
}

/// `a::b::` for the enclosing contexts of `scope`.
pub fn scope_prefix(program: &Program, scope: Scope) -> String {
    let mut parts = Vec::new();
    let mut cur = scope;
    loop {
        match cur {
            Scope::TranslationUnit => break,
            Scope::Namespace(ns) => {
                let ns = &program[ns];
                parts.push(if ns.is_anonymous() {
                    "(anonymous namespace)".to_string()
                } else {
                    ns.name.clone()
                });
                cur = ns.parent;
            }
            Scope::Record(rec) => {
                parts.push(record_name(program, rec));
                break;
            }
            Scope::Function(func) => {
                let func = &program[func];
                parts.push(format!("{}()", func.name));
                cur = func.scope;
            }
        }
    }
    parts.reverse();
    parts.iter().map(|p| format!("{}::", p)).collect()
}

/// Remove every `(anonymous namespace)::` component.
pub fn erase_anon_namespace(name: &str) -> String {
    name.replace("(anonymous namespace)::", "")
}

/// `class Foo;`
pub fn record_fwd_decl(record: &Record) -> String {
    format!("{} {};", record.tag.keyword(), record.name)
}

/// `template <typename T, int N, typename ...Ts> class Foo;`
pub fn template_fwd_decl(program: &Program, template: &ClassTemplate) -> String {
    let params: Vec<String> = template
        .params
        .iter()
        .map(|p| match &p.kind {
            TemplateParamKind::Type => format!("typename {}", p.name),
            TemplateParamKind::TypePack => format!("typename ...{}", p.name),
            TemplateParamKind::NonType(ty) => format!("{} {}", type_name(program, ty), p.name),
        })
        .collect();
    format!(
        "template <{}> {} {};",
        params.join(", "),
        template.tag.keyword(),
        template.name
    )
}
