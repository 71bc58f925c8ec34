//! Pipeline step implementations.
//!
//! Each step handles a specific phase of a channel export.

mod convert;
mod encode;
mod locate;
mod stage;

pub use convert::ConvertStep;
pub use encode::EncodeStep;
pub use locate::LocateStep;
pub use stage::StageStep;
