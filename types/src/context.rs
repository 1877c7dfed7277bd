//! Per-call request context.

use crate::address::Address;
use crate::height::BlockHeight;
use serde::{Deserialize, Serialize};

/// Who is calling and at which block.
///
/// The host runtime authenticates the caller and supplies the current
/// block height; the engine reads both only through this value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub caller: Address,
    pub block: BlockHeight,
}

impl RequestContext {
    pub fn new(caller: impl Into<Address>, block: impl Into<BlockHeight>) -> Self {
        Self {
            caller: caller.into(),
            block: block.into(),
        }
    }
}
