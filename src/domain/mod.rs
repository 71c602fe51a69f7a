//! Domain types for the AI Gateway.
//!
//! Plain values carried through the safety pipeline and the provider contract.

mod generation;
mod safety;

pub use generation::*;
pub use safety::*;
