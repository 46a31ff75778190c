use crate::decl::QualType;
use crate::signature::ParamDesc;

/// Everything the runtime needs to know about one kernel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernelDesc {
    /// Mangled kernel name, as the entry point is labelled.
    pub name: String,
    pub name_type: QualType,
    pub params: Vec<ParamDesc>,
}

/// Append-only list of kernels in registration order.
#[derive(Clone, Debug, Default)]
pub struct KernelRegistry {
    kernels: Vec<KernelDesc>,
}

impl KernelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the kernel's index in registration order.
    pub fn register(&mut self, desc: KernelDesc) -> usize {
        self.kernels.push(desc);
        self.kernels.len() - 1
    }

    pub fn kernels(&self) -> &[KernelDesc] {
        &self.kernels
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&KernelDesc> {
        self.kernels.iter().find(|k| k.name == name)
    }

    /// Index of each kernel's first descriptor in the flattened table. Every
    /// kernel is followed by one sentinel entry.
    pub fn signature_starts(&self) -> Vec<usize> {
        let mut next = 0;
        self.kernels
            .iter()
            .map(|k| {
                let start = next;
                next += k.params.len() + 1;
                start
            })
            .collect()
    }
}
