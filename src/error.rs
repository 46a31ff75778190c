//! Contract violations between the front-end and this pass.
//!
//! These are never user errors: the front-end promised a shape and did not
//! deliver it. They abort the pass; everything user-facing goes through
//! [`crate::diagnostic::Diagnostic`] instead.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, InternalFault>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InternalFault {
    #[error("special object '{record}' has no __init method")]
    MissingInitMethod { record: String },

    #[error("field '{field}' has unsupported kernel parameter type '{ty}'")]
    UnsupportedFieldType { field: String, ty: String },

    #[error("accessor '{record}' is missing template argument {index}")]
    MalformedAccessor { record: String, index: usize },

    #[error("kernel caller '{caller}' is malformed: {reason}")]
    MalformedKernelCaller { caller: String, reason: &'static str },

    #[error("template template argument in kernel name '{name}' is not supported")]
    TemplateTemplateArgument { name: String },

    #[error("descriptor value {value} for field '{field}' does not fit in 32 bits")]
    DescriptorOverflow { field: String, value: u64 },

    #[error("record '{record}' has incomplete layout")]
    IncompleteLayout { record: String },
}
