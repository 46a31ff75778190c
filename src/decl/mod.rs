//! The declaration/type graph this pass reads.
//!
//! A front-end populates a [`Program`] through the `add_*` methods; the pass
//! then reads it, appends synthesized entry points, and writes back a small
//! set of attributes (device eligibility, propagated kernel attributes,
//! invalidity). Everything is addressed by copyable ids into arenas.

pub mod display;
#[cfg(test)]
pub(crate) mod fixtures;

use std::ops::{Index, IndexMut};

use crate::ast::Stmt;
use crate::span::Span;

// ─── Ids ───────────────────────────────────────────────────────────

macro_rules! id_type {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub u32);

            impl $name {
                pub fn index(self) -> usize {
                    self.0 as usize
                }
            }
        )*
    };
}

id_type!(NamespaceId, TemplateId, RecordId, FuncId, VarId);

// ─── Scopes ────────────────────────────────────────────────────────

/// The declaration context something lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    TranslationUnit,
    Namespace(NamespaceId),
    Record(RecordId),
    Function(FuncId),
}

#[derive(Clone, Debug)]
pub struct Namespace {
    /// Empty for an anonymous namespace.
    pub name: String,
    pub parent: Scope,
}

impl Namespace {
    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty()
    }
}

// ─── Types ─────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AddressSpace {
    #[default]
    Default,
    Global,
    Constant,
    Local,
    Private,
}

impl AddressSpace {
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            AddressSpace::Default => None,
            AddressSpace::Global => Some("__global"),
            AddressSpace::Constant => Some("__constant"),
            AddressSpace::Local => Some("__local"),
            AddressSpace::Private => Some("__private"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Char,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Half,
    Float,
    Double,
}

impl ScalarKind {
    pub fn size(self) -> u64 {
        match self {
            ScalarKind::Bool | ScalarKind::Char | ScalarKind::SChar | ScalarKind::UChar => 1,
            ScalarKind::Short | ScalarKind::UShort | ScalarKind::Half => 2,
            ScalarKind::Int | ScalarKind::UInt | ScalarKind::Float => 4,
            ScalarKind::Long
            | ScalarKind::ULong
            | ScalarKind::LongLong
            | ScalarKind::ULongLong
            | ScalarKind::Double => 8,
        }
    }

    pub fn spelling(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Char => "char",
            ScalarKind::SChar => "signed char",
            ScalarKind::UChar => "unsigned char",
            ScalarKind::Short => "short",
            ScalarKind::UShort => "unsigned short",
            ScalarKind::Int => "int",
            ScalarKind::UInt => "unsigned int",
            ScalarKind::Long => "long",
            ScalarKind::ULong => "unsigned long",
            ScalarKind::LongLong => "long long",
            ScalarKind::ULongLong => "unsigned long long",
            ScalarKind::Half => "half",
            ScalarKind::Float => "float",
            ScalarKind::Double => "double",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Scalar(ScalarKind),
    Pointer(Box<QualType>),
    Reference(Box<QualType>),
    Array(Box<QualType>, u64),
    VariableArray(Box<QualType>),
    Record(RecordId),
    Function {
        params: Vec<QualType>,
        ret: Box<QualType>,
    },
}

/// A type plus the qualifiers this pass cares about.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QualType {
    pub ty: Type,
    pub is_const: bool,
    pub space: AddressSpace,
}

impl QualType {
    pub fn new(ty: Type) -> Self {
        Self {
            ty,
            is_const: false,
            space: AddressSpace::Default,
        }
    }

    pub fn void() -> Self {
        Self::new(Type::Void)
    }

    pub fn scalar(kind: ScalarKind) -> Self {
        Self::new(Type::Scalar(kind))
    }

    pub fn record(id: RecordId) -> Self {
        Self::new(Type::Record(id))
    }

    pub fn pointer_to(pointee: QualType) -> Self {
        Self::new(Type::Pointer(Box::new(pointee)))
    }

    pub fn constant(mut self) -> Self {
        self.is_const = true;
        self
    }

    pub fn in_space(mut self, space: AddressSpace) -> Self {
        self.space = space;
        self
    }

    /// The same type with every qualifier dropped.
    pub fn unqualified(&self) -> QualType {
        QualType::new(self.ty.clone())
    }

    pub fn as_record(&self) -> Option<RecordId> {
        match self.ty {
            Type::Record(id) => Some(id),
            _ => None,
        }
    }

    pub fn pointee(&self) -> Option<&QualType> {
        match &self.ty {
            Type::Pointer(inner) => Some(inner),
            _ => None,
        }
    }

    /// The referenced type for references, the type itself otherwise.
    pub fn non_reference(&self) -> &QualType {
        match &self.ty {
            Type::Reference(inner) => inner,
            _ => self,
        }
    }
}

// ─── Templates ─────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplateParamKind {
    Type,
    NonType(QualType),
    TypePack,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateParam {
    pub name: String,
    pub kind: TemplateParamKind,
}

#[derive(Clone, Debug)]
pub struct ClassTemplate {
    pub name: String,
    pub scope: Scope,
    pub params: Vec<TemplateParam>,
    pub tag: TagKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TemplateArg {
    Type(QualType),
    Integral(i64),
    Pack(Vec<TemplateArg>),
    Template(TemplateId),
}

impl TemplateArg {
    pub fn as_type(&self) -> Option<&QualType> {
        match self {
            TemplateArg::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_integral(&self) -> Option<i64> {
        match self {
            TemplateArg::Integral(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Specialization {
    pub template: TemplateId,
    pub args: Vec<TemplateArg>,
}

// ─── Records ───────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagKind {
    Struct,
    Class,
}

impl TagKind {
    pub fn keyword(self) -> &'static str {
        match self {
            TagKind::Struct => "struct",
            TagKind::Class => "class",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Public,
    Protected,
    Private,
}

#[derive(Clone, Debug)]
pub struct Field {
    pub name: String,
    pub ty: QualType,
    pub access: Access,
    pub span: Span,
    /// Location of the captured variable when the owner is a closure.
    pub capture_span: Option<Span>,
}

impl Field {
    pub fn new(name: &str, ty: QualType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            access: Access::Public,
            span: Span::dummy(),
            capture_span: None,
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn captured_at(mut self, span: Span) -> Self {
        self.capture_span = Some(span);
        self
    }

    /// Where diagnostics about this field should point.
    pub fn diagnostic_span(&self) -> Span {
        self.capture_span.unwrap_or(self.span)
    }
}

#[derive(Clone, Debug)]
pub struct Record {
    /// Empty for unnamed records and closures.
    pub name: String,
    pub scope: Scope,
    pub tag: TagKind,
    pub specialization: Option<Specialization>,
    pub fields: Vec<Field>,
    pub methods: Vec<FuncId>,
    pub bases: Vec<RecordId>,
    pub is_polymorphic: bool,
    pub is_closure: bool,
    pub is_complete: bool,
    pub destructor: Option<FuncId>,
    pub span: Span,
}

impl Record {
    pub fn new(name: &str, scope: Scope) -> Self {
        Self {
            name: name.to_string(),
            scope,
            tag: TagKind::Struct,
            specialization: None,
            fields: Vec::new(),
            methods: Vec::new(),
            bases: Vec::new(),
            is_polymorphic: false,
            is_closure: false,
            is_complete: true,
            destructor: None,
            span: Span::dummy(),
        }
    }

    pub fn class(mut self) -> Self {
        self.tag = TagKind::Class;
        self
    }

    pub fn closure(mut self) -> Self {
        self.is_closure = true;
        self
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn specializing(mut self, template: TemplateId, args: Vec<TemplateArg>) -> Self {
        self.specialization = Some(Specialization { template, args });
        self
    }

    pub fn polymorphic(mut self) -> Self {
        self.is_polymorphic = true;
        self
    }

    pub fn incomplete(mut self) -> Self {
        self.is_complete = false;
        self
    }
}

// ─── Functions and variables ───────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FnKind {
    Free,
    Method(RecordId),
    Constructor(RecordId),
    Destructor(RecordId),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CallConv {
    #[default]
    Host,
    /// Device entry point.
    DeviceKernel,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Attr {
    /// Reachable from a kernel; compiled for the device.
    Device,
    OpenClKernel,
    Artificial,
    AsmLabel(String),
    /// Marks a kernel-caller template whose specializations become kernels.
    KernelCaller,
    ReqdSubGroupSize { size: u32, span: Span },
    /// Anything this pass does not interpret.
    Other(String),
}

#[derive(Clone, Debug)]
pub struct Function {
    pub name: String,
    pub scope: Scope,
    pub kind: FnKind,
    pub params: Vec<VarId>,
    pub ret: QualType,
    pub body: Option<Stmt>,
    pub template_args: Vec<TemplateArg>,
    pub attrs: Vec<Attr>,
    pub call_conv: CallConv,
    pub is_virtual: bool,
    /// A global `operator new` that allocates storage.
    pub is_replaceable_allocator: bool,
    pub is_invalid: bool,
    pub span: Span,
}

impl Function {
    pub fn new(name: &str, scope: Scope) -> Self {
        Self {
            name: name.to_string(),
            scope,
            kind: FnKind::Free,
            params: Vec::new(),
            ret: QualType::void(),
            body: None,
            template_args: Vec::new(),
            attrs: Vec::new(),
            call_conv: CallConv::Host,
            is_virtual: false,
            is_replaceable_allocator: false,
            is_invalid: false,
            span: Span::dummy(),
        }
    }

    pub fn has_attr(&self, pred: impl Fn(&Attr) -> bool) -> bool {
        self.attrs.iter().any(pred)
    }

    pub fn is_device(&self) -> bool {
        self.has_attr(|a| matches!(a, Attr::Device))
    }

    pub fn reqd_sub_group_size(&self) -> Option<(u32, Span)> {
        self.attrs.iter().find_map(|a| match a {
            Attr::ReqdSubGroupSize { size, span } => Some((*size, *span)),
            _ => None,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Storage {
    Local,
    StaticLocal,
    Global,
    StaticMember,
    Param,
}

#[derive(Clone, Debug)]
pub struct Var {
    pub name: String,
    pub ty: QualType,
    pub storage: Storage,
    pub span: Span,
}

// ─── Program ───────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct Program {
    namespaces: Vec<Namespace>,
    templates: Vec<ClassTemplate>,
    records: Vec<Record>,
    functions: Vec<Function>,
    vars: Vec<Var>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_namespace(&mut self, name: &str, parent: Scope) -> NamespaceId {
        self.namespaces.push(Namespace {
            name: name.to_string(),
            parent,
        });
        NamespaceId(self.namespaces.len() as u32 - 1)
    }

    pub fn add_template(&mut self, template: ClassTemplate) -> TemplateId {
        self.templates.push(template);
        TemplateId(self.templates.len() as u32 - 1)
    }

    pub fn add_record(&mut self, record: Record) -> RecordId {
        self.records.push(record);
        RecordId(self.records.len() as u32 - 1)
    }

    pub fn add_function(&mut self, function: Function) -> FuncId {
        let id = FuncId(self.functions.len() as u32);
        match function.kind {
            FnKind::Method(owner) | FnKind::Constructor(owner) => {
                self.records[owner.index()].methods.push(id);
            }
            FnKind::Destructor(owner) => {
                let record = &mut self.records[owner.index()];
                record.methods.push(id);
                record.destructor = Some(id);
            }
            FnKind::Free => {}
        }
        self.functions.push(function);
        id
    }

    pub fn add_var(&mut self, name: &str, ty: QualType, storage: Storage, span: Span) -> VarId {
        self.vars.push(Var {
            name: name.to_string(),
            ty,
            storage,
            span,
        });
        VarId(self.vars.len() as u32 - 1)
    }

    /// Add a parameter variable and append it to `func`'s parameter list.
    pub fn add_param(&mut self, func: FuncId, name: &str, ty: QualType) -> VarId {
        let span = self.functions[func.index()].span;
        let var = self.add_var(name, ty, Storage::Param, span);
        self.functions[func.index()].params.push(var);
        var
    }

    pub fn function_ids(&self) -> impl Iterator<Item = FuncId> {
        (0..self.functions.len() as u32).map(FuncId)
    }

    /// Look up a method of `record` by name.
    pub fn find_method(&self, record: RecordId, name: &str) -> Option<FuncId> {
        self.records[record.index()]
            .methods
            .iter()
            .copied()
            .find(|&m| self.functions[m.index()].name == name)
    }
}

macro_rules! arena_index {
    ($id:ty, $item:ty, $field:ident) => {
        impl Index<$id> for Program {
            type Output = $item;
            fn index(&self, id: $id) -> &$item {
                &self.$field[id.index()]
            }
        }

        impl IndexMut<$id> for Program {
            fn index_mut(&mut self, id: $id) -> &mut $item {
                &mut self.$field[id.index()]
            }
        }
    };
}

arena_index!(NamespaceId, Namespace, namespaces);
arena_index!(TemplateId, ClassTemplate, templates);
arena_index!(RecordId, Record, records);
arena_index!(FuncId, Function, functions);
arena_index!(VarId, Var, vars);
