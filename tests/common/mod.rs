//! In-memory JSON-RPC node hosting a voting contract, for driving the relay
//! end to end without a real chain.

use alloy_primitives::U256;
use alloy_sol_types::{Revert, SolCall, SolError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use votechain_relay::abi::{ContractDescriptor, Voting};
use votechain_relay::api::AppState;
use votechain_relay::chain::{parse_response, ChainClient, Transport};
use votechain_relay::contract::VotingContract;
use votechain_relay::error::ChainError;
use votechain_relay::models::{Address, B256};

pub const CONTRACT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
pub const ONE_HUNDRED_ETHER: &str = "0x56bc75e2d63100000";
pub const RECEIPT_TIMEOUT: Duration = Duration::from_millis(200);

pub fn descriptor_json() -> String {
    let function = |name: &str, inputs: &[&str], outputs: &[&str]| {
        json!({
            "type": "function",
            "name": name,
            "inputs": inputs.iter().map(|t| json!({"name": "", "type": t})).collect::<Vec<_>>(),
            "outputs": outputs.iter().map(|t| json!({"name": "", "type": t})).collect::<Vec<_>>(),
            "stateMutability": "view",
        })
    };
    json!({
        "address": CONTRACT,
        "abi": [
            {"type": "constructor", "inputs": [], "stateMutability": "nonpayable"},
            function("hasVoted", &["address"], &["bool"]),
            function("vote", &["bool"], &[]),
            function("getResults", &[], &["uint256", "uint256", "uint256"]),
            function("getVoters", &[], &["address[]"]),
            function("isAdmin", &["address"], &["bool"]),
            function("resetVoting", &[], &[]),
        ],
    })
    .to_string()
}

pub fn account(n: u8) -> Address {
    Address::repeat_byte(n)
}

#[derive(Default)]
struct Ledger {
    admin: Option<Address>,
    accounts: Vec<Address>,
    voted: HashSet<Address>,
    voters: Vec<Address>,
    yes: u64,
    no: u64,
    block: u64,
    receipts: HashMap<String, (u64, bool)>,
    polled: HashSet<String>,
    offline: bool,
    stale_has_voted: bool,
    fail_next_receipt: bool,
    hold_receipts: bool,
    revert_next_vote: Option<String>,
}

pub struct MockNode {
    ledger: Mutex<Ledger>,
    requests: AtomicUsize,
}

fn hex_value(bytes: &[u8]) -> Value {
    json!(format!("0x{}", hex::encode(bytes)))
}

fn ok(result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": 1, "result": result})
}

/// Ganache-style revert: the reason sits in an object keyed by tx hash.
fn ganache_revert(reason: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": {
            "code": -32000,
            "message": format!("VM Exception while processing transaction: revert {}", reason),
            "data": {"0xfeed": {"error": "revert", "reason": reason}},
        }
    })
}

/// Geth-style revert: `data` is the ABI-encoded `Error(string)`.
fn encoded_revert(reason: &str) -> Value {
    let data = Revert {
        reason: reason.to_string(),
    }
    .abi_encode();
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": {"code": 3, "message": "execution reverted", "data": hex_value(&data)},
    })
}

impl MockNode {
    /// `accounts` node accounts; the first one deployed the contract and is admin.
    pub fn new(accounts: u8) -> Arc<Self> {
        let accounts: Vec<Address> = (1..=accounts).map(account).collect();
        Arc::new(MockNode {
            ledger: Mutex::new(Ledger {
                admin: accounts.first().copied(),
                accounts,
                block: 1,
                ..Ledger::default()
            }),
            requests: AtomicUsize::new(0),
        })
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn set_offline(&self, offline: bool) {
        self.ledger.lock().unwrap().offline = offline;
    }

    /// Makes the next `hasVoted` answer `false`, as if another vote landed
    /// between the relay's pre-check and its transaction.
    pub fn stale_next_has_voted(&self) {
        self.ledger.lock().unwrap().stale_has_voted = true;
    }

    /// The next transaction is mined with `status: 0x0` and changes nothing.
    pub fn fail_next_receipt(&self) {
        self.ledger.lock().unwrap().fail_next_receipt = true;
    }

    /// Transactions are accepted but never show up in a block.
    pub fn hold_receipts(&self) {
        self.ledger.lock().unwrap().hold_receipts = true;
    }

    pub fn revert_next_vote(&self, reason: &str) {
        self.ledger.lock().unwrap().revert_next_vote = Some(reason.to_string());
    }

    pub fn record_vote(&self, voter: Address, choice: bool) {
        Self::apply_vote(&mut self.ledger.lock().unwrap(), voter, choice);
    }

    fn apply_vote(ledger: &mut Ledger, voter: Address, choice: bool) {
        ledger.voted.insert(voter);
        ledger.voters.push(voter);
        if choice {
            ledger.yes += 1;
        } else {
            ledger.no += 1;
        }
    }

    fn eth_call(ledger: &mut Ledger, data: &[u8]) -> Value {
        let out = match data.get(..4) {
            Some(sel) if sel == Voting::hasVotedCall::SELECTOR => {
                let call = Voting::hasVotedCall::abi_decode(data, true).unwrap();
                let voted = ledger.voted.contains(&call.account) && !ledger.stale_has_voted;
                ledger.stale_has_voted = false;
                Voting::hasVotedCall::abi_encode_returns(&(voted,))
            }
            Some(sel) if sel == Voting::isAdminCall::SELECTOR => {
                let call = Voting::isAdminCall::abi_decode(data, true).unwrap();
                Voting::isAdminCall::abi_encode_returns(&(ledger.admin == Some(call.account),))
            }
            Some(sel) if sel == Voting::getResultsCall::SELECTOR => {
                Voting::getResultsCall::abi_encode_returns(&(
                    U256::from(ledger.yes),
                    U256::from(ledger.no),
                    U256::from(ledger.yes + ledger.no),
                ))
            }
            Some(sel) if sel == Voting::getVotersCall::SELECTOR => {
                Voting::getVotersCall::abi_encode_returns(&(ledger.voters.clone(),))
            }
            _ => return encoded_revert("unknown selector"),
        };
        ok(hex_value(&out))
    }

    fn mine(ledger: &mut Ledger, succeeded: bool) -> Value {
        ledger.block += 1;
        let hash = hex_value(B256::repeat_byte(ledger.block as u8).as_slice());
        if !ledger.hold_receipts {
            let key = hash.as_str().unwrap().to_string();
            ledger.receipts.insert(key, (ledger.block, succeeded));
        }
        ok(hash)
    }

    fn send_transaction(ledger: &mut Ledger, from: Address, data: &[u8]) -> Value {
        let failing = std::mem::take(&mut ledger.fail_next_receipt);
        match data.get(..4) {
            Some(sel) if sel == Voting::voteCall::SELECTOR => {
                let call = Voting::voteCall::abi_decode(data, true).unwrap();
                if let Some(reason) = ledger.revert_next_vote.take() {
                    return encoded_revert(&reason);
                }
                if ledger.voted.contains(&from) {
                    return ganache_revert("You have already voted");
                }
                if !failing {
                    Self::apply_vote(ledger, from, call.choice);
                }
                Self::mine(ledger, !failing)
            }
            Some(sel) if sel == Voting::resetVotingCall::SELECTOR => {
                if ledger.admin != Some(from) {
                    return ganache_revert("Only admin can reset");
                }
                if !failing {
                    ledger.voted.clear();
                    ledger.voters.clear();
                    ledger.yes = 0;
                    ledger.no = 0;
                }
                Self::mine(ledger, !failing)
            }
            _ => encoded_revert("unknown selector"),
        }
    }

    fn receipt(ledger: &mut Ledger, hash: String) -> Value {
        // The first poll for every transaction finds it still pending.
        if ledger.polled.insert(hash.clone()) {
            return ok(Value::Null);
        }
        match ledger.receipts.get(&hash) {
            Some((block, succeeded)) => {
                let status = if *succeeded { "0x1" } else { "0x0" };
                ok(json!({
                    "transactionHash": hash,
                    "blockNumber": format!("0x{:x}", block),
                    "status": status,
                }))
            }
            None => ok(Value::Null),
        }
    }

    fn latest_block(ledger: &Ledger) -> Value {
        let transactions: Vec<Value> = if ledger.block > 1 {
            vec![hex_value(B256::repeat_byte(ledger.block as u8).as_slice())]
        } else {
            Vec::new()
        };
        ok(json!({
            "number": format!("0x{:x}", ledger.block),
            "hash": hex_value(B256::repeat_byte(0xbb).as_slice()),
            "timestamp": "0x65f0a000",
            "transactions": transactions,
        }))
    }

    fn handle(&self, method: &str, params: &[Value]) -> Value {
        let mut ledger = self.ledger.lock().unwrap();
        let data = |v: &Value| {
            hex::decode(v["data"].as_str().unwrap().trim_start_matches("0x")).unwrap()
        };
        match method {
            "eth_accounts" => ok(json!(ledger.accounts)),
            "eth_chainId" => ok(json!("0x539")),
            "eth_getBalance" => ok(json!(ONE_HUNDRED_ETHER)),
            "eth_call" => Self::eth_call(&mut ledger, &data(&params[0])),
            "eth_sendTransaction" => {
                let from: Address = params[0]["from"].as_str().unwrap().parse().unwrap();
                Self::send_transaction(&mut ledger, from, &data(&params[0]))
            }
            "eth_getTransactionReceipt" => {
                let hash = params[0].as_str().unwrap().to_lowercase();
                Self::receipt(&mut ledger, hash)
            }
            "eth_getBlockByNumber" => Self::latest_block(&ledger),
            _ => json!({
                "jsonrpc": "2.0", "id": 1,
                "error": {"code": -32601, "message": format!("Method {} not supported", method)}
            }),
        }
    }
}

#[async_trait]
impl Transport for MockNode {
    async fn send_raw_request(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, ChainError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.ledger.lock().unwrap().offline {
            return Err(ChainError::Connection("connection refused".into()));
        }
        parse_response(self.handle(method, &params))
    }
}

pub fn contract(node: &Arc<MockNode>) -> VotingContract {
    let descriptor = ContractDescriptor::from_json(&descriptor_json()).unwrap();
    let client = ChainClient::new(node.clone(), Duration::from_millis(1), RECEIPT_TIMEOUT);
    VotingContract::new(client, &descriptor).unwrap()
}

pub fn state(node: &Arc<MockNode>, admin_account: Option<Address>) -> AppState {
    AppState {
        contract: contract(node),
        static_dir: std::env::temp_dir().join("votechain-relay-missing-static"),
        admin_account,
    }
}
