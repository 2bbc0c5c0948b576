mod item;
mod user;
mod withdrawal;

pub use item::*;
pub use user::*;
pub use withdrawal::*;
