pub mod config;
pub mod error;
pub mod form;
pub mod poll;
pub mod utils;

// Re-export key types for easier access
pub use config::{ClientConfig, FormflowConfig, PollConfig, SessionContext};
pub use error::{ErrorInfo, FormflowError, Result};
pub use form::{ConnectorForm, FieldDescriptor, FieldKind, FieldPath, FormState, SpecCompiler};
pub use poll::{HttpTaskClient, TaskBackend, TaskPoller};
