mod abi;
mod decode;
mod encode;
mod error;
mod event;
mod params;
mod signature;
mod topics;
mod types;
mod values;

pub use abi::*;
pub use decode::*;
pub use encode::*;
pub use error::*;
pub use event::*;
pub use params::*;
pub use signature::*;
pub use topics::*;
pub use types::*;
pub use values::*;
