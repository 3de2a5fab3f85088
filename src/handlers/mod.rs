pub mod common;
pub mod discrepancies;
pub mod grns;
pub mod health;
pub mod products;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;
