//! Framework-free domain core: workspace aggregate, mutation engine, and the
//! ports driven adapters implement.

pub mod error;
pub mod ports;
pub mod workspace;

pub use error::{EnvelopeError, EnvelopeErrorCode, WorkspaceError};
