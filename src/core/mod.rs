pub mod config;
pub mod error;
pub mod interaction;
pub mod notify;
pub mod traits;

pub use config::*;
pub use error::*;
pub use interaction::*;
pub use notify::*;
pub use traits::*;
