//! Utilities shared by refract tests.
//!
//! The centerpiece is a deterministic fixture front-end: declarations, references and
//! expressions are described by text needles, and every tool run locates them in whatever
//! content the tool was seeded with (virtual buffers first, disk second). Offsets reported by
//! the fixture therefore behave exactly like offsets from a real front-end that parsed the
//! seeded view.

mod fixture;
mod frontend;
mod temp;

pub use fixture::{DeclSpec, ExprSpec, FixtureProject, ParamSpec, RefKindSpec, RefSpec};
pub use frontend::{FixtureDecl, FixtureFrontend, FixtureTool, ToolLog};
pub use temp::TempProject;
