pub mod ast;
pub mod classify;
pub mod config;
pub mod decl;
pub mod device;
pub mod diagnostic;
pub mod error;
pub mod header;
pub mod layout;
pub mod mangle;
pub mod outline;
pub mod signature;
pub mod span;

use std::io::Write;
use std::path::Path;

use tracing::{debug, instrument};

use config::OutlineOptions;
use decl::{Attr, FuncId, Program};
use device::DeviceSummary;
use diagnostic::Diagnostic;
use error::InternalFault;
use header::{HeaderError, IntegrationHeader, KernelDesc, KernelRegistry};
use mangle::{ItaniumMangler, NameMangler};

/// Everything a finished pass hands back to the front-end.
#[derive(Debug)]
pub struct Outcome {
    pub diagnostics: Vec<Diagnostic>,
    pub registry: KernelRegistry,
    /// Synthesized entry points, in construction order.
    pub kernels: Vec<FuncId>,
    /// Empty unless the device analysis ran.
    pub device: DeviceSummary,
}

/// One outlining session over a program.
///
/// Kernels are constructed one caller at a time, then the device analysis
/// runs once over all of them, then the header is written.
pub struct Outliner<'p> {
    program: &'p mut Program,
    options: OutlineOptions,
    mangler: Box<dyn NameMangler>,
    diagnostics: Vec<Diagnostic>,
    registry: KernelRegistry,
    kernels: Vec<FuncId>,
    device: DeviceSummary,
}

impl<'p> Outliner<'p> {
    pub fn new(program: &'p mut Program, options: OutlineOptions) -> Self {
        Self {
            program,
            options,
            mangler: Box::new(ItaniumMangler),
            diagnostics: Vec::new(),
            registry: KernelRegistry::new(),
            kernels: Vec::new(),
            device: DeviceSummary::default(),
        }
    }

    /// Use a different kernel naming scheme.
    pub fn with_mangler(mut self, mangler: impl NameMangler + 'static) -> Self {
        self.mangler = Box::new(mangler);
        self
    }

    pub fn program(&self) -> &Program {
        self.program
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn registry(&self) -> &KernelRegistry {
        &self.registry
    }

    /// Synthesize the device entry point for one kernel-caller
    /// specialization and register its descriptors.
    #[instrument(skip(self))]
    pub fn construct_kernel(&mut self, caller: FuncId) -> Result<FuncId, InternalFault> {
        let entry = outline::synthesize(
            &mut *self.program,
            caller,
            &*self.mangler,
            self.options.pointer_space,
            &mut self.diagnostics,
        )?;
        header::check_kernel_name(self.program, &entry.name_type, &mut self.diagnostics)?;
        debug!(
            kernel = %entry.name,
            params = entry.signature.params.len(),
            descriptors = entry.signature.descs.len(),
            "constructed kernel"
        );
        self.registry.register(KernelDesc {
            name: entry.name,
            name_type: entry.name_type,
            params: entry.signature.descs,
        });
        self.kernels.push(entry.func);
        Ok(entry.func)
    }

    /// Run the device analysis over every kernel constructed so far.
    #[instrument(skip(self), fields(kernels = self.kernels.len()))]
    pub fn mark_device(&mut self) -> DeviceSummary {
        self.device = device::mark_device(
            &mut *self.program,
            &self.kernels,
            self.options.allow_function_pointers,
            &mut self.diagnostics,
        );
        self.device.clone()
    }

    pub fn header(&self) -> IntegrationHeader<'_> {
        IntegrationHeader::new(self.program, &self.registry, &self.options.header)
    }

    #[instrument(skip_all, fields(kernels = self.registry.len()))]
    pub fn emit_header(&self, out: &mut impl Write) -> Result<(), HeaderError> {
        self.header().emit(out)
    }

    /// Write the header to `path`; a failure is logged and reported as
    /// `false`, the pass itself carries on.
    pub fn write_header(&self, path: &Path) -> bool {
        self.header().write_to(path)
    }

    pub fn finish(self) -> Outcome {
        Outcome {
            diagnostics: self.diagnostics,
            registry: self.registry,
            kernels: self.kernels,
            device: self.device,
        }
    }
}

/// Outline every kernel caller in `program`, run the device analysis and
/// write the integration header if `options` names a target.
pub fn outline_program(
    program: &mut Program,
    options: OutlineOptions,
) -> Result<Outcome, InternalFault> {
    let callers: Vec<FuncId> = program
        .function_ids()
        .filter(|&f| {
            let func = &program[f];
            func.body.is_some() && func.has_attr(|a| matches!(a, Attr::KernelCaller))
        })
        .collect();

    let header_path = options.integration_header.clone();
    let mut outliner = Outliner::new(program, options);
    for caller in callers {
        outliner.construct_kernel(caller)?;
    }
    outliner.mark_device();
    if let Some(path) = header_path {
        outliner.write_header(&path);
    }
    Ok(outliner.finish())
}
