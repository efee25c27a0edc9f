use log::info;

use crate::abi::{ContractDescriptor, Voting};
use crate::chain::ChainClient;
use crate::error::ChainError;
use crate::models::{Address, VoteTally, B256};

/// The deployed voting contract. Every method is a single pass-through to the
/// chain; duplicate votes and admin gating are enforced by the contract.
#[derive(Clone)]
pub struct VotingContract {
    client: ChainClient,
    address: Address,
}

fn tally_word(name: &str, value: alloy_primitives::U256) -> Result<u64, ChainError> {
    u64::try_from(value)
        .map_err(|_| ChainError::Decode(format!("{} count {} exceeds u64", name, value)))
}

impl VotingContract {
    /// Binds to the descriptor's address once its ABI is known to expose the
    /// voting interface.
    pub fn new(client: ChainClient, descriptor: &ContractDescriptor) -> Result<Self, ChainError> {
        descriptor.require_voting()?;
        Ok(VotingContract {
            client,
            address: descriptor.address,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn client(&self) -> &ChainClient {
        &self.client
    }

    pub async fn has_voted(&self, account: Address) -> Result<bool, ChainError> {
        let call = Voting::hasVotedCall { account };
        Ok(self.client.call(self.address, &call).await?._0)
    }

    pub async fn vote(&self, account: Address, choice: bool) -> Result<B256, ChainError> {
        let call = Voting::voteCall { choice };
        let hash = self.client.transact(self.address, &call, account).await?;
        info!("vote from {} submitted as {}", account, hash);
        Ok(hash)
    }

    pub async fn get_results(&self) -> Result<VoteTally, ChainError> {
        let results = self
            .client
            .call(self.address, &Voting::getResultsCall {})
            .await?;
        Ok(VoteTally {
            yes_votes: tally_word("yes", results.yes)?,
            no_votes: tally_word("no", results.no)?,
            total_votes: tally_word("total", results.total)?,
        })
    }

    pub async fn get_voters(&self) -> Result<Vec<Address>, ChainError> {
        let voters = self
            .client
            .call(self.address, &Voting::getVotersCall {})
            .await?;
        Ok(voters._0)
    }

    pub async fn is_admin(&self, account: Address) -> Result<bool, ChainError> {
        let call = Voting::isAdminCall { account };
        Ok(self.client.call(self.address, &call).await?._0)
    }

    pub async fn reset_voting(&self, admin: Address) -> Result<B256, ChainError> {
        let hash = self
            .client
            .transact(self.address, &Voting::resetVotingCall {}, admin)
            .await?;
        info!("reset by {} submitted as {}", admin, hash);
        Ok(hash)
    }
}
