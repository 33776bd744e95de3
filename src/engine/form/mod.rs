//! # Connector Form Engine
//!
//! Schema-driven configuration forms for connectors:
//!
//! 1. [`SpecCompiler`] turns a connector specification into a tree of
//!    [`FieldDescriptor`]s, one [`FieldKind`] variant per control type.
//! 2. [`ConnectorForm`] binds the descriptors to a [`FormState`] and exposes
//!    typed edit operations that keep the state shape consistent.
//! 3. [`render`] produces the visible [`Control`] tree.
//! 4. [`validate_form`] reports per-field errors at submit time.

pub mod compiler;
pub mod connector;
pub mod field;
pub mod path;
pub mod render;
pub mod state;
pub mod validation;
pub mod walk;

pub use compiler::SpecCompiler;
pub use connector::ConnectorForm;
pub use field::{
    ConstOption, DiscriminatedField, EnumField, FieldDescriptor, FieldKind, ScalarField,
    ScalarType,
};
pub use path::{FieldPath, PathSegment};
pub use render::{Control, ListItem, RenderOptions, SelectOption, Widget, render};
pub use state::{Change, FormState};
pub use validation::validate_form;
