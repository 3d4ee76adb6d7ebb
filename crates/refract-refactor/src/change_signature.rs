use refract_frontend::{
    AnalysisTool, DeclKind, DeclarationNode, MatchEvent, RawReplacement, SourceLocation,
};

use crate::identity::IdentityResolver;
use crate::refactorings::find_target;
use crate::RefactorError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterChange {
    /// Zero-based position in the parameter list.
    pub index: usize,
    pub new_type: String,
}

/// Retypes parameters of a function at every one of its declarations. Default arguments are
/// left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSignature {
    pub at: SourceLocation,
    pub changes: Vec<ParameterChange>,
}

impl ChangeSignature {
    pub fn new(at: SourceLocation) -> Self {
        Self {
            at,
            changes: Vec::new(),
        }
    }

    pub fn retype(mut self, index: usize, new_type: impl Into<String>) -> Self {
        self.changes.push(ParameterChange {
            index,
            new_type: new_type.into(),
        });
        self
    }

    pub fn compute<T: AnalysisTool>(&self, tool: &mut T) -> Result<Vec<RawReplacement>, RefactorError> {
        if self.changes.is_empty() {
            return Err(RefactorError::Cancelled);
        }
        let target = find_target(tool, &self.at)?;
        if !matches!(target.kind(), DeclKind::Function | DeclKind::Method) {
            return Err(RefactorError::NothingToDo(format!(
                "`{}` is not a function",
                target.qualified_name()
            )));
        }
        let arity = target.parameters().len();
        if let Some(change) = self.changes.iter().find(|c| c.index >= arity) {
            return Err(RefactorError::NothingToDo(format!(
                "`{}` has no parameter #{}",
                target.qualified_name(),
                change.index + 1
            )));
        }

        let mut identity = IdentityResolver::new(&target);
        let mut out = Vec::new();
        tool.run(&mut |event: MatchEvent<'_, T::Decl>| {
            let MatchEvent::Declaration(decl) = event else {
                return;
            };
            if !identity.equivalent_to(decl) {
                return;
            }
            let parameters = decl.parameters();
            for change in &self.changes {
                let Some(parameter) = parameters.get(change.index) else {
                    continue;
                };
                if parameter.type_spelling != change.new_type {
                    out.push(RawReplacement::replace(
                        &parameter.type_range,
                        change.new_type.as_str(),
                    ));
                }
            }
        })?;

        if out.is_empty() {
            return Err(RefactorError::NothingToDo("the signature is unchanged".to_owned()));
        }
        Ok(out)
    }
}
