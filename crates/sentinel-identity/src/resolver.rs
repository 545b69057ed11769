use async_trait::async_trait;
use ethers::types::Address;

use crate::error::Result;

/// Stands in for a standard naming registry (ENS) lookup (§6): resolve a
/// human-readable name to an address, then read a text record by key under
/// that name's node. A real implementation calls out to an ENS resolver
/// contract; tests supply a fixture.
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn resolve(&self, name: &str) -> Result<Address>;
    async fn text_record(&self, name: &str, key: &str) -> Result<Option<String>>;
}
