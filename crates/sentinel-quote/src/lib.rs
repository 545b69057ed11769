//! C2: the quote oracle adapter. Pluggable between an on-chain quoter and a
//! local constant-product AMM, with prioritized fallback (§4.2).

pub mod amm;
pub mod error;
pub mod onchain;
pub mod oracle;
pub mod quote;

pub use amm::ConstantProductAmm;
pub use error::{QuoteError, Result};
pub use onchain::{OnChainQuoter, PoolStateReader};
pub use oracle::{QuoteBackend, QuoteOracle};
pub use quote::Quote;
