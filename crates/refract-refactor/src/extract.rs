use refract_core::{FileIdentity, TextRange};
use refract_frontend::{AnalysisTool, ExpressionInfo, RawReplacement, SourceLocation};

use crate::RefactorError;

fn expression<T: AnalysisTool>(
    tool: &mut T,
    file: &FileIdentity,
    range: TextRange,
) -> Result<ExpressionInfo, RefactorError> {
    tool.expression_at(file, range)?.ok_or_else(|| {
        RefactorError::ExpressionNotFound(SourceLocation::new(file.clone(), range.start()))
    })
}

/// Replaces an expression with a new local variable declared right before the statement
/// containing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractVariable {
    pub file: FileIdentity,
    pub range: TextRange,
    pub name: String,
}

impl ExtractVariable {
    pub fn new(file: FileIdentity, range: TextRange, name: impl Into<String>) -> Self {
        Self {
            file,
            range,
            name: name.into(),
        }
    }

    pub fn compute<T: AnalysisTool>(&self, tool: &mut T) -> Result<Vec<RawReplacement>, RefactorError> {
        if self.name.is_empty() {
            return Err(RefactorError::Cancelled);
        }
        let info = expression(tool, &self.file, self.range)?;
        let indentation = tool.line_indentation(&info.statement_start)?;
        let declaration = format!(
            "{} {} = {};\n{indentation}",
            info.type_spelling, self.name, info.text
        );
        Ok(vec![
            RawReplacement::insert_at(&info.statement_start, declaration),
            RawReplacement::replace(&info.range, self.name.as_str()),
        ])
    }
}

/// Moves an expression into a new function taking the expression's free variables.
///
/// The new function is defined before every definition of the enclosing function and
/// forward-declared before each of its other declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractFunction {
    pub file: FileIdentity,
    pub range: TextRange,
    pub name: String,
}

impl ExtractFunction {
    pub fn new(file: FileIdentity, range: TextRange, name: impl Into<String>) -> Self {
        Self {
            file,
            range,
            name: name.into(),
        }
    }

    pub fn compute<T: AnalysisTool>(&self, tool: &mut T) -> Result<Vec<RawReplacement>, RefactorError> {
        if self.name.is_empty() {
            return Err(RefactorError::Cancelled);
        }
        let info = expression(tool, &self.file, self.range)?;
        if info.enclosing_function_redeclarations.is_empty() {
            return Err(RefactorError::NothingToDo(
                "the expression is not inside a function".to_owned(),
            ));
        }

        let parameters = info
            .free_variables
            .iter()
            .map(|(ty, name)| format!("{ty} {name}"))
            .collect::<Vec<_>>()
            .join(", ");
        let arguments = info
            .free_variables
            .iter()
            .map(|(_, name)| name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let signature = format!("{} {}({parameters})", info.type_spelling, self.name);

        let mut out = Vec::new();
        for (extent, is_definition) in &info.enclosing_function_redeclarations {
            let start = extent.start();
            let indent = tool.line_indentation(&start)?;
            let text = if *is_definition {
                format!(
                    "{signature}\n{indent}{{\n{indent}    return {};\n{indent}}}\n\n{indent}",
                    info.text
                )
            } else {
                format!("{signature};\n{indent}")
            };
            out.push(RawReplacement::insert_at(&start, text));
        }
        out.push(RawReplacement::replace(
            &info.range,
            format!("{}({arguments})", self.name),
        ));
        Ok(out)
    }
}
