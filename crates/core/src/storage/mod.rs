mod error;
mod traits;
mod types;

pub use error::{RepositoryError, Result};
pub use traits::Repository;
pub use types::{apply_field_updates, Entity, FieldUpdates};
