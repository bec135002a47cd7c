//! Form records and the values derived from them

mod projection;
mod record;
mod snapshot;
mod validate;


pub use projection::{FormPatch, SearchProjection};
pub use record::{Answer, FormId, FormRecord, FormSettings, Response};
pub use snapshot::SnapshotCache;
pub use validate::{validate_settings, FieldError, SettingsField};
