//! Entity metadata: typed field accessors and the per-entity column model.

mod entity;
mod field;


pub use entity::{ColumnSpec, EntityModel};
pub use field::{Accessor, Field, FieldId, FieldKind};
