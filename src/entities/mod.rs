// Entity Models - accounts, transactions and tokens as the store persists them
//
// Each entity is a plain value:
// - Identity assigned by the store on insert
// - Serialized as-is on the wire (password hashes never leave the store)

pub mod account;
pub mod token;
pub mod transaction;

pub use account::{Account, LimitTiers, RegInfo};
pub use token::{Token, TokenInfo};
pub use transaction::{MonthlyReport, Transaction, TransactionRequest};
