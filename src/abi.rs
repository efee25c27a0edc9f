//! Voting contract interface and the deployment descriptor it is checked against.

use alloy_primitives::Address;
use alloy_sol_types::{sol, Revert, SolCall, SolError};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::ChainError;

sol! {
    #[derive(Debug)]
    interface Voting {
        function hasVoted(address account) external view returns (bool);
        function vote(bool choice) external;
        function getResults() external view returns (uint256 yes, uint256 no, uint256 total);
        function getVoters() external view returns (address[]);
        function isAdmin(address account) external view returns (bool);
        function resetVoting() external;
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AbiEntry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    #[serde(default)]
    pub outputs: Vec<AbiParam>,
}

/// `{address, abi}` as written by the deployment script.
#[derive(Deserialize, Debug, Clone)]
pub struct ContractDescriptor {
    pub address: Address,
    pub abi: Vec<AbiEntry>,
}

impl ContractDescriptor {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ChainError> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| {
            ChainError::Descriptor(format!("failed to open {}: {}", path.display(), e))
        })?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(|e| {
            ChainError::Descriptor(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, ChainError> {
        serde_json::from_str(contents).map_err(|e| ChainError::Descriptor(e.to_string()))
    }

    /// Checks the ABI declares `C` with the same canonical signature.
    pub fn require<C: SolCall>(&self) -> Result<(), ChainError> {
        let name = C::SIGNATURE.split('(').next().unwrap_or(C::SIGNATURE);
        let entry = self
            .abi
            .iter()
            .find(|e| e.kind == "function" && e.name.as_deref() == Some(name))
            .ok_or_else(|| ChainError::Descriptor(format!("function `{}` not in ABI", name)))?;

        let kinds: Vec<&str> = entry.inputs.iter().map(|p| p.kind.as_str()).collect();
        let signature = format!("{}({})", name, kinds.join(","));
        if signature != C::SIGNATURE {
            return Err(ChainError::Descriptor(format!(
                "ABI declares `{}`, expected `{}`",
                signature,
                C::SIGNATURE
            )));
        }
        Ok(())
    }

    pub fn require_voting(&self) -> Result<(), ChainError> {
        self.require::<Voting::hasVotedCall>()?;
        self.require::<Voting::voteCall>()?;
        self.require::<Voting::getResultsCall>()?;
        self.require::<Voting::getVotersCall>()?;
        self.require::<Voting::isAdminCall>()?;
        self.require::<Voting::resetVotingCall>()
    }
}

pub fn decode_returns<C: SolCall>(data: &[u8]) -> Result<C::Return, ChainError> {
    C::abi_decode_returns(data, true)
        .map_err(|e| ChainError::Decode(format!("{}: {}", C::SIGNATURE, e)))
}

/// Reason string of a solidity `require` failure, if `data` carries one.
pub fn revert_reason(data: &[u8]) -> Option<String> {
    Revert::abi_decode(data, true).ok().map(|revert| revert.reason)
}
