mod ids;
mod types;
mod view;
pub mod wire;

pub use crate::ids::*;
pub use crate::types::*;
pub use crate::view::*;
pub use crate::wire::WireError;
