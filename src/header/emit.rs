//! Rendering the integration header text.

use std::io::Write;
use std::path::Path;

use indexmap::IndexSet;
use tracing::{debug, error};

use crate::config::HeaderOptions;
use crate::decl::display::{erase_anon_namespace, record_fwd_decl, template_fwd_decl, type_name};
use crate::decl::*;
use crate::error::Result;

use super::{collect_fwd_decls, FwdDecl, HeaderError, KernelRegistry};

/// Terminates each kernel's run of descriptors in the signature table.
const SENTINEL: &str = "{ kernel_param_kind_t::kind_invalid, -987654321, -987654321 },";

/// A view of the registered kernels ready to be written out.
///
/// Rendering only reads; emitting twice yields the same bytes.
pub struct IntegrationHeader<'a> {
    program: &'a Program,
    registry: &'a KernelRegistry,
    options: &'a HeaderOptions,
}

impl<'a> IntegrationHeader<'a> {
    pub fn new(
        program: &'a Program,
        registry: &'a KernelRegistry,
        options: &'a HeaderOptions,
    ) -> Self {
        Self {
            program,
            registry,
            options,
        }
    }

    pub fn render(&self) -> Result<String> {
        let mut out = String::new();
        out.push_str("// This is auto-generated SYCL integration header.\n\n");
        out.push_str(&format!("#include <{}>\n\n", self.options.include));

        out.push_str("// Forward declarations of templated kernel function types:\n");
        let mut decls = IndexSet::new();
        for kernel in self.registry.kernels() {
            collect_fwd_decls(self.program, &kernel.name_type, &mut decls)?;
        }
        for decl in decls {
            self.fwd_decl(&mut out, decl);
        }
        out.push('\n');

        for ns in &self.options.namespaces {
            out.push_str(&format!("namespace {} {{\n", ns));
        }
        out.push('\n');

        self.kernel_names(&mut out);
        let starts = self.registry.signature_starts();
        self.signatures(&mut out);
        self.signature_starts(&mut out, &starts);
        self.kernel_info(&mut out, &starts);

        for ns in self.options.namespaces.iter().rev() {
            out.push_str(&format!("}} // namespace {}\n", ns));
        }
        out.push('\n');
        Ok(out)
    }

    /// Write the header to `out`.
    pub fn emit(&self, out: &mut impl Write) -> std::result::Result<(), HeaderError> {
        let text = self.render()?;
        out.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Write the header to `path`. Failures are logged, not returned.
    ///
    /// The text is rendered before the file is touched, so a fault leaves
    /// no partial header behind.
    pub fn write_to(&self, path: &Path) -> bool {
        let result = self
            .render()
            .map_err(HeaderError::from)
            .and_then(|text| std::fs::write(path, text).map_err(HeaderError::from));
        match result {
            Ok(()) => {
                debug!(
                    path = %path.display(),
                    kernels = self.registry.len(),
                    "wrote integration header"
                );
                true
            }
            Err(err) => {
                error!(path = %path.display(), %err, "integration header not written");
                false
            }
        }
    }

    // ─── Sections ──────────────────────────────────────────────────

    /// The declaration wrapped in its enclosing namespaces, all opened on
    /// one line. Stops at the first non-namespace context.
    fn fwd_decl(&self, out: &mut String, decl: FwdDecl) {
        let (mut scope, text) = match decl {
            FwdDecl::Record(id) => (self.program[id].scope, record_fwd_decl(&self.program[id])),
            FwdDecl::Template(id) => (
                self.program[id].scope,
                template_fwd_decl(self.program, &self.program[id]),
            ),
        };
        let mut opened = Vec::new();
        while let Scope::Namespace(ns) = scope {
            opened.push(self.program[ns].name.as_str());
            scope = self.program[ns].parent;
        }
        if !opened.is_empty() {
            let open: Vec<String> = opened
                .iter()
                .rev()
                .map(|name| format!("namespace {} {{", name))
                .collect();
            out.push_str(&open.join(" "));
            out.push('\n');
        }
        out.push_str(&text);
        out.push('\n');
        if !opened.is_empty() {
            out.push_str(&"}".repeat(opened.len()));
            out.push('\n');
        }
    }

    fn kernel_names(&self, out: &mut String) {
        out.push_str("// names of all kernels defined in the corresponding source\n");
        out.push_str("static constexpr\n");
        out.push_str("const char* const kernel_names[] = {\n");
        let names: Vec<String> = self
            .registry
            .kernels()
            .iter()
            .map(|k| format!("  \"{}\"", k.name))
            .collect();
        if !names.is_empty() {
            out.push_str(&names.join(",\n"));
            out.push('\n');
        }
        out.push_str("};\n\n");
    }

    fn signatures(&self, out: &mut String) {
        out.push_str("// array representing signatures of all kernels defined in the\n");
        out.push_str("// corresponding source\n");
        out.push_str("static constexpr\n");
        out.push_str("const kernel_param_desc_t kernel_signatures[] = {\n");
        for kernel in self.registry.kernels() {
            out.push_str(&format!("  //--- {}\n", kernel.name));
            for desc in &kernel.params {
                out.push_str(&format!(
                    "  {{ kernel_param_kind_t::{}, {}, {} }},\n",
                    desc.kind.as_str(),
                    desc.info,
                    desc.offset
                ));
            }
            out.push_str(&format!("  {}\n\n", SENTINEL));
        }
        out.push_str("};\n\n");
    }

    fn signature_starts(&self, out: &mut String, starts: &[usize]) {
        out.push_str("// indices into the kernel_signatures array, each representing a start of\n");
        out.push_str("// kernel signature descriptor subarray of the kernel_signatures array;\n");
        out.push_str("// the index order in this array corresponds to the kernel name order in the\n");
        out.push_str("// kernel_names array\n");
        out.push_str("static constexpr\n");
        out.push_str("const unsigned kernel_signature_start[] = {\n");
        let kernels = self.registry.kernels();
        for (i, (kernel, start)) in kernels.iter().zip(starts).enumerate() {
            let sep = if i + 1 < kernels.len() { "," } else { "" };
            out.push_str(&format!("  {}{} // {}\n", start, sep, kernel.name));
        }
        out.push_str("};\n\n");
    }

    fn kernel_info(&self, out: &mut String, starts: &[usize]) {
        out.push_str("// Specializations of this template class encompasses information\n");
        out.push_str("// about a kernel. The kernel is identified by the template\n");
        out.push_str("// parameter type.\n");
        out.push_str("template <class KernelNameType> struct KernelInfo;\n\n");
        out.push_str("// Specializations of KernelInfo for kernel function types:\n");
        for (kernel, start) in self.registry.kernels().iter().zip(starts) {
            let name_type = erase_anon_namespace(&type_name(self.program, &kernel.name_type));
            out.push_str(&format!("template <> struct KernelInfo<{}> {{\n", name_type));
            out.push_str("  DLL_LOCAL\n");
            out.push_str(&format!(
                "  static constexpr const char* getName() {{ return \"{}\"; }}\n",
                kernel.name
            ));
            out.push_str("  DLL_LOCAL\n");
            out.push_str(&format!(
                "  static constexpr unsigned getNumParams() {{ return {}; }}\n",
                kernel.params.len()
            ));
            out.push_str("  DLL_LOCAL\n");
            out.push_str(
                "  static constexpr const kernel_param_desc_t& getParamDesc(unsigned i) {\n",
            );
            out.push_str(&format!("    return kernel_signatures[i+{}];\n", start));
            out.push_str("  }\n");
            out.push_str("};\n");
        }
        out.push('\n');
    }
}
