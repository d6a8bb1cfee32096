pub mod account;
pub mod portfolio;

pub use account::Account;
pub use portfolio::Portfolio;
