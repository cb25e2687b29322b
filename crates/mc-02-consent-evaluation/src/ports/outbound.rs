use crate::domain::ConsentTuple;
use shared_types::{Address, ProviderError};

/// Direct reads of the consent contract's current state.
#[async_trait::async_trait]
pub trait ConsentLedger: Send + Sync {
    /// `getConsent(fileCid, grantee)`. Keys never granted come back as a
    /// zeroed tuple, not an error.
    async fn get_consent(
        &self,
        file_cid: &str,
        grantee: Address,
    ) -> Result<ConsentTuple, ProviderError>;
}
