use refract_frontend::{AnalysisTool, RawReplacement, SourceLocation};

use crate::change_signature::ChangeSignature;
use crate::encapsulate::EncapsulateField;
use crate::extract::{ExtractFunction, ExtractVariable};
use crate::rename::RenameDeclaration;
use crate::RefactorError;

/// The closed set of refactorings. Each one computes raw replacements from an analysis tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refactoring {
    Rename(RenameDeclaration),
    ChangeSignature(ChangeSignature),
    ExtractVariable(ExtractVariable),
    ExtractFunction(ExtractFunction),
    EncapsulateField(EncapsulateField),
}

impl Refactoring {
    /// User-facing name.
    pub fn name(&self) -> &'static str {
        match self {
            Refactoring::Rename(_) => "Rename",
            Refactoring::ChangeSignature(_) => "Change signature",
            Refactoring::ExtractVariable(_) => "Extract variable",
            Refactoring::ExtractFunction(_) => "Extract function",
            Refactoring::EncapsulateField(_) => "Encapsulate field",
        }
    }

    /// Runs on the analysis worker.
    pub fn compute<T: AnalysisTool>(&self, tool: &mut T) -> Result<Vec<RawReplacement>, RefactorError> {
        let replacements = match self {
            Refactoring::Rename(r) => r.compute(tool),
            Refactoring::ChangeSignature(r) => r.compute(tool),
            Refactoring::ExtractVariable(r) => r.compute(tool),
            Refactoring::ExtractFunction(r) => r.compute(tool),
            Refactoring::EncapsulateField(r) => r.compute(tool),
        }?;
        tracing::debug!(
            target: "refract.refactor",
            refactoring = self.name(),
            replacements = replacements.len(),
            "replacements computed"
        );
        Ok(replacements)
    }
}

impl From<RenameDeclaration> for Refactoring {
    fn from(r: RenameDeclaration) -> Self {
        Refactoring::Rename(r)
    }
}

impl From<ChangeSignature> for Refactoring {
    fn from(r: ChangeSignature) -> Self {
        Refactoring::ChangeSignature(r)
    }
}

impl From<ExtractVariable> for Refactoring {
    fn from(r: ExtractVariable) -> Self {
        Refactoring::ExtractVariable(r)
    }
}

impl From<ExtractFunction> for Refactoring {
    fn from(r: ExtractFunction) -> Self {
        Refactoring::ExtractFunction(r)
    }
}

impl From<EncapsulateField> for Refactoring {
    fn from(r: EncapsulateField) -> Self {
        Refactoring::EncapsulateField(r)
    }
}

pub(crate) fn find_target<T: AnalysisTool>(
    tool: &mut T,
    at: &SourceLocation,
) -> Result<T::Decl, RefactorError> {
    tool.declaration_at(at)?
        .ok_or_else(|| RefactorError::TargetNotFound(at.clone()))
}

fn accessor_stem(field: &str) -> &str {
    field
        .strip_prefix("m_")
        .or_else(|| field.strip_prefix('_'))
        .filter(|stem| !stem.is_empty())
        .unwrap_or(field)
}

fn capitalized(stem: &str) -> String {
    let mut chars = stem.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `m_count` and `_count` both suggest `getCount`.
pub fn suggest_getter_name(field: &str) -> String {
    format!("get{}", capitalized(accessor_stem(field)))
}

pub fn suggest_setter_name(field: &str) -> String {
    format!("set{}", capitalized(accessor_stem(field)))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn accessor_names_strip_member_prefixes() {
        assert_eq!(suggest_getter_name("m_count"), "getCount");
        assert_eq!(suggest_setter_name("_count"), "setCount");
        assert_eq!(suggest_getter_name("value"), "getValue");
        assert_eq!(suggest_setter_name("m_"), "setM_");
    }
}
