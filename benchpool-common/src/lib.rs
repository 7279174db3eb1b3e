pub mod fingerprint;
pub mod messages;
pub mod model;

pub use fingerprint::*;
pub use messages::*;
pub use model::*;
