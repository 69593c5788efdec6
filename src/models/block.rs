use ethers::types::{Block, H256, U256};

/// Snapshot of one fetched block. Immutable once built; heights the
/// upstream cannot produce are simply omitted from a batch, never
/// represented as placeholder records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecord {
    pub number: u64,
    pub base_fee_per_gas: Option<U256>,
    pub gas_used: U256,
    pub gas_limit: U256,
}

impl BlockRecord {
    /// Build from an RPC block. Returns `None` for blocks without a number
    /// (pending blocks), which cannot be placed in a height-ordered window.
    pub fn from_rpc(block: Block<H256>) -> Option<Self> {
        let number = block.number?.as_u64();
        Some(Self {
            number,
            base_fee_per_gas: block.base_fee_per_gas,
            gas_used: block.gas_used,
            gas_limit: block.gas_limit,
        })
    }

    pub fn base_fee_gwei(&self) -> Option<f64> {
        self.base_fee_per_gas.map(|fee| fee.as_u128() as f64 / 1e9)
    }

    pub fn gas_used_ratio(&self) -> f64 {
        self.gas_used.as_u128() as f64 / self.gas_limit.as_u128().max(1) as f64
    }
}
