use crate::ast::fold::Fold;
use crate::decl::VarId;
use crate::span::Span;

/// Redirects every reference to one variable onto another and drops source
/// positions, so diagnostics never point into the spliced copy.
pub struct ParamSubstitution {
    from: VarId,
    to: VarId,
}

impl ParamSubstitution {
    pub fn new(from: VarId, to: VarId) -> Self {
        Self { from, to }
    }
}

impl Fold for ParamSubstitution {
    fn fold_var(&mut self, var: VarId) -> VarId {
        if var == self.from {
            self.to
        } else {
            var
        }
    }

    fn fold_span(&mut self, _: Span) -> Span {
        Span::dummy()
    }
}
