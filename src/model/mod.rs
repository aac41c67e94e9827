pub mod association;
pub mod attribute;
pub mod changes;
pub mod channel;
pub mod common;
pub mod error;
pub mod family;
pub mod locale;
pub mod product;
pub mod resolved;

pub use association::*;
pub use attribute::*;
pub use changes::*;
pub use channel::*;
pub use common::*;
pub use error::*;
pub use family::*;
pub use locale::*;
pub use product::*;
pub use resolved::*;
