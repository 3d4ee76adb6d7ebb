use refract_frontend::{AnalysisTool, DeclarationNode, MatchEvent, RawReplacement, SourceLocation};

use crate::identity::IdentityResolver;
use crate::refactorings::find_target;
use crate::RefactorError;

/// Renames the declaration whose name covers `at`, its redeclarations in every translation
/// unit, and every reference to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameDeclaration {
    pub at: SourceLocation,
    pub new_name: String,
}

impl RenameDeclaration {
    pub fn new(at: SourceLocation, new_name: impl Into<String>) -> Self {
        Self {
            at,
            new_name: new_name.into(),
        }
    }

    pub fn compute<T: AnalysisTool>(&self, tool: &mut T) -> Result<Vec<RawReplacement>, RefactorError> {
        // An empty name means the prompt was dismissed.
        if self.new_name.is_empty() {
            return Err(RefactorError::Cancelled);
        }
        let target = find_target(tool, &self.at)?;
        if target.name() == self.new_name {
            return Err(RefactorError::NothingToDo(format!(
                "`{}` already has that name",
                target.qualified_name()
            )));
        }

        let new_name = self.new_name.as_str();
        let mut identity = IdentityResolver::new(&target);
        let mut out = Vec::new();
        tool.run(&mut |event: MatchEvent<'_, T::Decl>| match event {
            MatchEvent::Declaration(decl) => {
                if identity.equivalent_to(decl) {
                    out.push(RawReplacement::replace(&decl.name_range(), new_name));
                }
            }
            MatchEvent::Reference(reference) => {
                if identity.equivalent_to(&reference.referenced) {
                    out.push(RawReplacement::replace(&reference.range, new_name));
                }
            }
        })?;
        Ok(out)
    }
}
