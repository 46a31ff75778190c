//! Whole-program call graph over statically resolved call targets.

use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::ast::visit::{walk_expr, Visitor};
use crate::ast::{Callee, Expr, ExprKind};
use crate::decl::*;
use crate::span::Span;

/// Node weight is the function, edge weight the first call site.
pub struct CallGraph {
    graph: DiGraph<FuncId, Span>,
    nodes: IndexMap<FuncId, NodeIndex>,
}

impl CallGraph {
    /// One node per function with a body, plus every function such a body
    /// calls. Indirect calls contribute no edge.
    pub fn build(program: &Program) -> Self {
        let mut cg = CallGraph {
            graph: DiGraph::new(),
            nodes: IndexMap::new(),
        };
        for caller in program.function_ids() {
            let Some(body) = &program[caller].body else {
                continue;
            };
            let from = cg.node(caller);
            let mut sites = CallSites {
                program,
                sites: Vec::new(),
            };
            sites.visit_stmt(body);
            for (callee, span) in sites.sites {
                let to = cg.node(callee);
                if cg.graph.find_edge(from, to).is_none() {
                    cg.graph.add_edge(from, to, span);
                }
            }
        }
        cg
    }

    fn node(&mut self, func: FuncId) -> NodeIndex {
        if let Some(&n) = self.nodes.get(&func) {
            return n;
        }
        let n = self.graph.add_node(func);
        self.nodes.insert(func, n);
        n
    }

    pub fn contains(&self, func: FuncId) -> bool {
        self.nodes.contains_key(&func)
    }

    /// Direct callees of `func` in the order their first call appears.
    pub fn callees(&self, func: FuncId) -> Vec<FuncId> {
        let Some(&n) = self.nodes.get(&func) else {
            return Vec::new();
        };
        // petgraph walks adjacency lists newest first
        let mut edges: Vec<_> = self.graph.edges(n).collect();
        edges.sort_by_key(|e| e.id());
        edges.into_iter().map(|e| self.graph[e.target()]).collect()
    }

    /// Location of the first call from `caller` to `callee`.
    pub fn call_site(&self, caller: FuncId, callee: FuncId) -> Option<Span> {
        let from = *self.nodes.get(&caller)?;
        let to = *self.nodes.get(&callee)?;
        let edge = self.graph.find_edge(from, to)?;
        Some(self.graph[edge])
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

struct CallSites<'a> {
    program: &'a Program,
    sites: Vec<(FuncId, Span)>,
}

impl Visitor for CallSites<'_> {
    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Call {
                callee: Callee::Direct(f),
                ..
            } => self.sites.push((*f, expr.span)),
            ExprKind::MemberCall { method, .. } => self.sites.push((*method, expr.span)),
            ExprKind::Construct { ctor, .. } => {
                self.sites.push((*ctor, expr.span));
                if let FnKind::Constructor(record) = self.program[*ctor].kind {
                    if let Some(dtor) = self.program[record].destructor {
                        self.sites.push((dtor, expr.span));
                    }
                }
            }
            ExprKind::New {
                operator: Some(op), ..
            } if !self.program[*op].is_replaceable_allocator => {
                self.sites.push((*op, expr.span))
            }
            _ => {}
        }
        walk_expr(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::fixtures::*;

    #[test]
    fn test_callees_in_source_order_without_duplicates() {
        let mut fx = Fixture::new();
        let a = fx.function("a", vec![]);
        let b = fx.function("b", vec![]);
        let c = fx.function("c", vec![]);
        let root = fx.function("root", vec![]);
        for callee in [c, a, c, b] {
            let stmt = fx.call_stmt(callee);
            fx.push_stmt(root, stmt);
        }
        let cg = CallGraph::build(&fx.program);
        assert_eq!(cg.callees(root), vec![c, a, b]);
        assert_eq!(cg.edge_count(), 3);
        assert!(cg.callees(a).is_empty());
    }

    #[test]
    fn test_indirect_calls_have_no_edge() {
        let mut fx = Fixture::new();
        let fn_ty = QualType::pointer_to(QualType::new(Type::Function {
            params: vec![],
            ret: Box::new(QualType::void()),
        }));
        let target = fx
            .program
            .add_var("fp", fn_ty, Storage::Local, Span::dummy());
        let stmt = fx.indirect_call_stmt(target);
        let root = fx.function("root", vec![stmt]);
        let cg = CallGraph::build(&fx.program);
        assert!(cg.contains(root));
        assert!(cg.callees(root).is_empty());
    }

    #[test]
    fn test_construction_reaches_destructor() {
        let mut fx = Fixture::new();
        let rec = fx
            .program
            .add_record(Record::new("Guard", Scope::TranslationUnit));
        let mut ctor = Function::new("Guard", Scope::Record(rec));
        ctor.kind = FnKind::Constructor(rec);
        let ctor = fx.program.add_function(ctor);
        let mut dtor = Function::new("~Guard", Scope::Record(rec));
        dtor.kind = FnKind::Destructor(rec);
        let dtor = fx.program.add_function(dtor);

        let span = fx.span();
        let construct = Expr::new(
            ExprKind::Construct { ctor, args: vec![] },
            QualType::record(rec),
            span,
        );
        let root = fx.function("root", vec![crate::ast::Stmt::expr(construct)]);
        let cg = CallGraph::build(&fx.program);
        assert_eq!(cg.callees(root), vec![ctor, dtor]);
        assert_eq!(cg.call_site(root, dtor), Some(span));
    }
}
