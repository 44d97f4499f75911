//! Pushdown planning: split a query into a store fragment and an
//! in-process residual, and render fragments as parameterized SQL.

mod fragment;
mod optimizer;
mod render;


pub use fragment::{BoundParam, FragmentShape, StoreFragment, Window};
pub use optimizer::{OptimizerInfo, OptimizerOptions, Shortcut, optimize};
pub use render::{PlaceholderStyle, SqlFragment, SqlOptions};
