//! Device reachability and restriction analysis.
//!
//! Runs once after every kernel entry point exists. Starting from each
//! kernel it collects the reachable call-graph closure (reporting recursion
//! on the way), pulls the propagated kernel attributes up to the kernel,
//! and then walks every reachable body exactly once through a work queue,
//! tagging it as device code and reporting restricted constructs.

mod callgraph;
mod restrict;

pub use callgraph::CallGraph;

use std::collections::VecDeque;

use indexmap::IndexSet;
use tracing::{debug, warn};

use crate::ast::visit::Visitor;
use crate::decl::*;
use crate::diagnostic::{Category, Diagnostic};
use crate::span::Span;

use restrict::RestrictionChecker;

/// The constructs device code may not use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RestrictKind {
    GlobalVariable,
    Rtti,
    NonConstStaticDataVariable,
    VirtualCall,
    RecursiveCall,
    FunctionPointer,
    AllocateStorage,
    Exceptions,
    Assembly,
}

impl RestrictKind {
    pub fn description(self) -> &'static str {
        match self {
            RestrictKind::GlobalVariable => "use a global variable",
            RestrictKind::Rtti => "use rtti",
            RestrictKind::NonConstStaticDataVariable => "use a non-const static data variable",
            RestrictKind::VirtualCall => "call a virtual function",
            RestrictKind::RecursiveCall => "call a recursive function",
            RestrictKind::FunctionPointer => "call through a function pointer",
            RestrictKind::AllocateStorage => "allocate storage",
            RestrictKind::Exceptions => "use exceptions",
            RestrictKind::Assembly => "use inline assembly",
        }
    }
}

/// What the analysis found, in discovery order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceSummary {
    /// Every function whose body was checked as device code.
    pub device_functions: Vec<FuncId>,
    pub recursive: Vec<FuncId>,
    /// Kernels marked invalid by an attribute conflict.
    pub invalid_kernels: Vec<FuncId>,
}

/// Run the analysis for `kernels` over the whole program.
pub fn mark_device(
    program: &mut Program,
    kernels: &[FuncId],
    allow_function_pointers: bool,
    diagnostics: &mut Vec<Diagnostic>,
) -> DeviceSummary {
    let graph = CallGraph::build(program);
    debug!(
        kernels = kernels.len(),
        functions = graph.node_count(),
        calls = graph.edge_count(),
        "marking device code"
    );

    let mut reach = Reachability {
        program: &*program,
        graph: &graph,
        kernel_set: IndexSet::new(),
        recursive: IndexSet::new(),
        diagnostics: &mut *diagnostics,
    };
    for &kernel in kernels {
        reach.collect(kernel);
    }
    let Reachability {
        kernel_set,
        recursive,
        ..
    } = reach;

    let mut invalid_kernels = Vec::new();
    for &kernel in kernels {
        if propagate_attributes(program, &graph, kernel, diagnostics) {
            invalid_kernels.push(kernel);
        }
    }

    let device = check_bodies(
        program,
        &kernel_set,
        &recursive,
        allow_function_pointers,
        diagnostics,
    );
    debug!(
        device = device.len(),
        recursive = recursive.len(),
        "device marking done"
    );

    DeviceSummary {
        device_functions: device.into_iter().collect(),
        recursive: recursive.into_iter().collect(),
        invalid_kernels,
    }
}

// ─── Reachability and recursion ────────────────────────────────────

struct Reachability<'a> {
    program: &'a Program,
    graph: &'a CallGraph,
    /// Functions whose callees have been fully explored, across kernels.
    kernel_set: IndexSet<FuncId>,
    recursive: IndexSet<FuncId>,
    diagnostics: &'a mut Vec<Diagnostic>,
}

/// One frame of the explicit depth-first stack.
struct Frame {
    callees: Vec<FuncId>,
    next: usize,
}

impl Reachability<'_> {
    /// Depth-first from `kernel`. `path` holds the functions on the current
    /// stack, the kernel included, so a cycle back into the kernel is found
    /// too. A function explored from an earlier path or kernel is not
    /// descended into again.
    fn collect(&mut self, kernel: FuncId) {
        if !self.kernel_set.insert(kernel) {
            return;
        }
        let mut path: IndexSet<FuncId> = IndexSet::from([kernel]);
        let mut frames = vec![Frame {
            callees: self.graph.callees(kernel),
            next: 0,
        }];
        while let Some(frame) = frames.last_mut() {
            let Some(&callee) = frame.callees.get(frame.next) else {
                frames.pop();
                path.pop();
                continue;
            };
            frame.next += 1;
            if let Some(pos) = path.get_index_of(&callee) {
                if let Some(&current) = path.last() {
                    self.recursive.insert(callee);
                    self.recursive.insert(current);
                }
                self.report_cycle(&path, pos);
            } else if self.kernel_set.insert(callee) {
                path.insert(callee);
                frames.push(Frame {
                    callees: self.graph.callees(callee),
                    next: 0,
                });
            }
        }
    }

    /// `path[pos..]` is the cycle; the top of the path calls back into
    /// `path[pos]`. One note per frame, innermost first.
    fn report_cycle(&mut self, path: &IndexSet<FuncId>, pos: usize) {
        let entered = path[pos];
        let mut diag = Diagnostic::error(
            Category::Recursion,
            format!(
                "function '{}' is called recursively from device code",
                self.program[entered].name
            ),
            self.program[entered].span,
        );
        let mut target = entered;
        for &frame in path.iter().skip(pos).rev() {
            let site = self.graph.call_site(frame, target).unwrap_or_else(Span::dummy);
            diag = diag.with_note_at(
                format!(
                    "'{}' calls '{}'",
                    self.program[frame].name, self.program[target].name
                ),
                site,
            );
            target = frame;
        }
        self.diagnostics.push(diag);
    }
}

// ─── Attribute propagation ─────────────────────────────────────────

/// Pull `reqd_sub_group_size` from everything reachable up to `kernel`.
/// Differing values give one diagnostic at the kernel with a note per
/// origin. Returns true when a conflict made the kernel invalid.
fn propagate_attributes(
    program: &mut Program,
    graph: &CallGraph,
    kernel: FuncId,
    diagnostics: &mut Vec<Diagnostic>,
) -> bool {
    let mut found = Vec::new();
    let mut visited = IndexSet::from([kernel]);
    let mut queue = VecDeque::from([kernel]);
    while let Some(func) = queue.pop_front() {
        if let Some((size, span)) = program[func].reqd_sub_group_size() {
            found.push((size, span));
        }
        for callee in graph.callees(func) {
            if visited.insert(callee) {
                queue.push_back(callee);
            }
        }
    }

    let mut sizes: Vec<u32> = found.iter().map(|&(size, _)| size).collect();
    sizes.sort_unstable();
    sizes.dedup();
    match sizes.as_slice() {
        [] => false,
        [_] => {
            if let (None, Some(&(size, span))) =
                (program[kernel].reqd_sub_group_size(), found.first())
            {
                program[kernel]
                    .attrs
                    .push(Attr::ReqdSubGroupSize { size, span });
            }
            false
        }
        _ => {
            warn!(
                kernel = %program[kernel].name,
                sizes = ?sizes,
                "conflicting reqd_sub_group_size"
            );
            let mut diag = Diagnostic::error(
                Category::AttributeConflict,
                format!(
                    "conflicting reqd_sub_group_size attributes reach kernel '{}'",
                    program[kernel].name
                ),
                program[kernel].span,
            );
            for (size, span) in found {
                diag = diag.with_note_at(
                    format!("reqd_sub_group_size({}) is required here", size),
                    span,
                );
            }
            diagnostics.push(diag);
            program[kernel].is_invalid = true;
            true
        }
    }
}

// ─── Device bodies ─────────────────────────────────────────────────

/// Walk every reachable definition once, tagging it as device code.
/// Definitions first met inside a body are queued behind the rest.
fn check_bodies(
    program: &mut Program,
    kernel_set: &IndexSet<FuncId>,
    recursive: &IndexSet<FuncId>,
    allow_function_pointers: bool,
    diagnostics: &mut Vec<Diagnostic>,
) -> IndexSet<FuncId> {
    let mut device = IndexSet::new();
    let mut queue = VecDeque::new();
    for &func in kernel_set {
        if program[func].body.is_some() && device.insert(func) {
            queue.push_back(func);
        }
    }

    while let Some(func) = queue.pop_front() {
        if !program[func].is_device() {
            program[func].attrs.push(Attr::Device);
        }
        let (found, reached) = {
            let Some(body) = &program[func].body else {
                continue;
            };
            let mut checker = RestrictionChecker::new(
                program,
                func,
                recursive,
                allow_function_pointers,
            );
            checker.visit_stmt(body);
            (checker.diagnostics, checker.reached)
        };
        diagnostics.extend(found);
        for next in reached {
            if device.insert(next) {
                debug!(func = %program[next].name, "scheduled as device code");
                queue.push_back(next);
            }
        }
    }
    device
}

#[cfg(test)]
mod tests;
