//! Bank adapter implementations.
//!
//! Each bank module is self-contained: its own wire structs, account type
//! table and statement id packing. Nothing bank-specific is shared.

pub mod ally;
pub mod amex;
pub mod citi;
mod common;
pub mod fidelity;
pub mod wellsfargo;

pub use ally::{AllyAdapter, DocumentLocator};
pub use amex::AmexAdapter;
pub use citi::CitiAdapter;
pub use fidelity::FidelityAdapter;
pub use wellsfargo::WellsFargoAdapter;
