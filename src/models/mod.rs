pub mod participant;
pub mod messages;
pub mod health;
pub mod diagnostics;
pub mod suggestion;
pub mod error;

pub use participant::*;
pub use messages::*;
pub use health::*;
pub use diagnostics::*;
pub use suggestion::*;
pub use error::*;
