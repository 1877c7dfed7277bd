//! Fundamental types for the Concord governance engine.
//!
//! This crate defines what every other crate in the workspace shares:
//! member addresses, block heights, proposal ids, the per-call request
//! context, and the value-transfer trait the host ledger implements.

pub mod address;
pub mod context;
pub mod error;
pub mod height;
pub mod id;
pub mod ledger;

pub use address::Address;
pub use context::RequestContext;
pub use error::TypeError;
pub use height::BlockHeight;
pub use id::ProposalId;
pub use ledger::{LedgerError, NativeLedger};
