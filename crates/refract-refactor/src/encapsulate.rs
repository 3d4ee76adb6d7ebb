use refract_core::TextSize;
use refract_frontend::{
    Access, AnalysisTool, DeclKind, DeclarationNode, MatchEvent, RawReplacement, ReferenceKind,
    SourceLocation,
};

use crate::identity::IdentityResolver;
use crate::refactorings::{find_target, suggest_getter_name, suggest_setter_name};
use crate::RefactorError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum AccessorStyle {
    /// `const T &getX() const`, `void setX(const T &value)`
    #[default]
    ConstReference,
    /// `T getX() const`, `void setX(T value)`
    Value,
}

/// Generates accessors for a data member and routes its uses through them.
///
/// Reads become getter calls. Plain assignments become setter calls when a setter is
/// generated; other stores are left as they are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncapsulateField {
    pub at: SourceLocation,
    pub getter_name: String,
    /// `None` skips the setter.
    pub setter_name: Option<String>,
    pub getter_access: Access,
    pub setter_access: Access,
    pub style: AccessorStyle,
}

impl EncapsulateField {
    /// Public const-reference accessors named after `field_name`.
    pub fn new(at: SourceLocation, field_name: &str) -> Self {
        Self {
            at,
            getter_name: suggest_getter_name(field_name),
            setter_name: Some(suggest_setter_name(field_name)),
            getter_access: Access::Public,
            setter_access: Access::Public,
            style: AccessorStyle::default(),
        }
    }

    pub fn without_setter(mut self) -> Self {
        self.setter_name = None;
        self
    }

    pub fn style(mut self, style: AccessorStyle) -> Self {
        self.style = style;
        self
    }

    pub fn compute<T: AnalysisTool>(&self, tool: &mut T) -> Result<Vec<RawReplacement>, RefactorError> {
        if self.getter_name.is_empty() {
            return Err(RefactorError::Cancelled);
        }
        let target = find_target(tool, &self.at)?;
        let is_member = match target.kind() {
            DeclKind::Field => true,
            DeclKind::Variable => target.semantic_parent().is_some(),
            _ => false,
        };
        if !is_member {
            return Err(RefactorError::NothingToDo(format!(
                "`{}` is not a data member",
                target.qualified_name()
            )));
        }
        let Some(ty) = target.type_spelling() else {
            return Err(RefactorError::NothingToDo(format!(
                "the type of `{}` is unknown",
                target.qualified_name()
            )));
        };

        let mut identity = IdentityResolver::new(&target);
        let declaration = identity.target().clone();
        let start = declaration.extent().start();
        let indent = tool.line_indentation(&start)?;
        // Access labels line up with the record, members with the field.
        let label_indent = match declaration.semantic_parent() {
            Some(record) => tool.line_indentation(&record.extent().start())?,
            None => indent.clone(),
        };
        let mut text = String::new();
        for line in self.accessors(&ty, &declaration.name(), declaration.is_static(), declaration.access()) {
            let line_indent = match line {
                AccessorLine::Label(_) => &label_indent,
                AccessorLine::Member(_) => &indent,
            };
            text.push_str(line_indent);
            text.push_str(line.text());
            text.push('\n');
        }
        let line_start = SourceLocation::new(
            start.file.clone(),
            start.offset - TextSize::of(indent.as_str()),
        );
        let mut out = vec![RawReplacement::insert_at(&line_start, text)];

        let getter_call = format!("{}()", self.getter_name);
        let mut kept_stores = 0usize;
        tool.run(&mut |event: MatchEvent<'_, T::Decl>| {
            let MatchEvent::Reference(reference) = event else {
                return;
            };
            if !identity.equivalent_to(&reference.referenced) {
                return;
            }
            match (&reference.kind, &self.setter_name) {
                (ReferenceKind::Read | ReferenceKind::Call, _) => {
                    out.push(RawReplacement::replace(&reference.range, getter_call.as_str()));
                }
                (ReferenceKind::Write { assignment: Some(assignment) }, Some(setter)) => {
                    out.push(RawReplacement::replace(
                        &assignment.range,
                        format!("{setter}({})", assignment.value_text),
                    ));
                }
                (ReferenceKind::Write { .. }, _) => kept_stores += 1,
            }
        })?;

        if kept_stores > 0 {
            tracing::debug!(
                target: "refract.refactor",
                field = %declaration.qualified_name(),
                kept_stores,
                "stores without a setter equivalent were left untouched"
            );
        }
        Ok(out)
    }

    /// Lines inserted before the member declaration, ending with its own access label again.
    fn accessors(&self, ty: &str, field: &str, is_static: bool, field_access: Access) -> Vec<AccessorLine> {
        let (storage, qualifier) = if is_static { ("static ", "") } else { ("", " const") };
        let (returned, taken) = match self.style {
            AccessorStyle::ConstReference => (format!("const {ty} &"), format!("const {ty} &value")),
            AccessorStyle::Value => (format!("{ty} "), format!("{ty} value")),
        };

        let mut lines = Vec::new();
        let mut current = field_access;
        let mut label = |lines: &mut Vec<AccessorLine>, access: Access| {
            if access != current {
                if let Some(keyword) = access.keyword() {
                    lines.push(AccessorLine::Label(format!("{keyword}:")));
                }
                current = access;
            }
        };

        label(&mut lines, self.getter_access);
        lines.push(AccessorLine::Member(format!(
            "{storage}{returned}{}(){qualifier} {{ return {field}; }}",
            self.getter_name
        )));
        if let Some(setter) = &self.setter_name {
            label(&mut lines, self.setter_access);
            lines.push(AccessorLine::Member(format!(
                "{storage}void {setter}({taken}) {{ {field} = value; }}"
            )));
        }
        label(&mut lines, field_access);
        lines
    }
}

enum AccessorLine {
    Label(String),
    Member(String),
}

impl AccessorLine {
    fn text(&self) -> &str {
        match self {
            AccessorLine::Label(text) | AccessorLine::Member(text) => text,
        }
    }
}
