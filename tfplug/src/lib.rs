//! tfplug - Terraform Plugin Framework for Rust
//!
//! Provider-side building blocks: async provider/resource/data source traits,
//! a dynamic value model, schemas with validators, plan modifiers and
//! defaults, and the superschema layer that derives resource and data source
//! schemas from one definition.

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod superschema;
pub mod types;

// Provider API modules
pub mod data_source;
pub mod provider;
pub mod resource;

// Helper modules
pub mod defaults;
pub mod import;
pub mod plan_modifier;
pub mod validator;

// Re-exports for convenience
pub use context::Context;
pub use data_source::{DataSource, DataSourceWithConfigure};
pub use error::{Result, TfplugError};
pub use import::import_state_passthrough_id;
pub use provider::{DataSourceFactory, Provider, ResourceFactory};
pub use resource::{Resource, ResourceWithConfigure, ResourceWithImportState};
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use superschema::{AttributeSpec, SchemaError, SuperAttribute, SuperSchema};
pub use types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
