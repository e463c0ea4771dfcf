//! Database layer - sessions, account queries and the table reset
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE accounts (
//!     id INT AUTO_INCREMENT PRIMARY KEY,
//!     account_holder VARCHAR(64) NOT NULL,
//!     balance DECIMAL(12, 2) NOT NULL
//! ) ENGINE = InnoDB;
//! ```

pub mod accounts;
pub mod connection;
pub mod reset;

pub use accounts::AccountRepo;
pub use connection::{
    close_session, current_isolation_level, finish, open_session, set_isolation_level,
};
pub use reset::{reset_database, seed_balance, seed_total, SEED_ACCOUNTS};
