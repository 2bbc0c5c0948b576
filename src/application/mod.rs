// Application layer - use cases over the ledger store and the marketplace.
// Transport concerns (status codes, headers) stay in the http module.

pub mod error;

mod balance;
mod items;

pub use balance::*;
pub use error::*;
pub use items::*;
