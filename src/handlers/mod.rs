pub mod health;
pub mod diagnostics;
pub mod suggest;

pub use health::*;
pub use diagnostics::*;
pub use suggest::*;
