mod account;
mod audit;
mod money;
mod transaction;
mod user;

pub use account::*;
pub use audit::*;
pub use money::*;
pub use transaction::*;
pub use user::*;
