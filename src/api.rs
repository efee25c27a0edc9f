//! HTTP relay: one stateless handler per endpoint.

use actix_web::{web, HttpResponse};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;

use crate::contract::VotingContract;
use crate::error::{ChainError, RelayError};
use crate::models::{checksummed, Address, Receipt, B256};

const WEI_PER_ETHER: f64 = 1e18;

/// Everything a handler needs, built once at start-up.
pub struct AppState {
    pub contract: VotingContract,
    pub static_dir: PathBuf,
    pub admin_account: Option<Address>,
}

#[derive(Deserialize)]
pub struct VoteRequest {
    pub vote: bool,
    #[serde(default)]
    pub account: Option<Address>,
}

#[derive(Serialize)]
struct AccountInfo {
    address: String,
    balance: f64,
    has_voted: bool,
}

type RelayResult = Result<HttpResponse, RelayError>;

/// Rejects malformed bodies with the relay's error shape before any chain call.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        RelayError::BadRequest(format!("Invalid request body: {}", err)).into()
    })
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/", web::get().to(index))
        .route("/api/vote", web::post().to(cast_vote))
        .route("/api/results", web::get().to(get_results))
        .route("/api/accounts", web::get().to(get_accounts))
        .route("/api/blockchain-info", web::get().to(blockchain_info))
        .route("/api/voters", web::get().to(get_voters))
        .route("/api/voting-status", web::get().to(voting_status))
        .route("/api/reset", web::post().to(reset_voting));
}

async fn first_account(contract: &VotingContract) -> Result<Address, RelayError> {
    contract
        .client()
        .accounts()
        .await?
        .first()
        .copied()
        .ok_or_else(|| RelayError::Chain("chain node reports no accounts".to_string()))
}

async fn mined(
    contract: &VotingContract,
    submitted: Result<B256, ChainError>,
) -> Result<Receipt, ChainError> {
    let hash = submitted?;
    contract.client().await_receipt(hash).await
}

fn transaction_response(message: &str, receipt: &Receipt) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": message,
        "transaction_hash": receipt.transaction_hash,
        "block_number": receipt.block_number,
    }))
}

async fn index(data: web::Data<AppState>) -> HttpResponse {
    let path = data.static_dir.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(contents) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(contents),
        Err(err) => {
            warn!("failed to read {}: {}", path.display(), err);
            HttpResponse::NotFound().json(json!({
                "success": false,
                "message": "UI page not found",
            }))
        }
    }
}

async fn cast_vote(data: web::Data<AppState>, request: web::Json<VoteRequest>) -> RelayResult {
    let request = request.into_inner();
    let contract = &data.contract;
    let account = match request.account {
        Some(account) => account,
        None => first_account(contract).await?,
    };

    // Fast path only; the contract rejects duplicates on its own.
    if contract.has_voted(account).await? {
        return Err(RelayError::AlreadyVoted);
    }

    let submitted = contract.vote(account, request.vote).await;
    match mined(contract, submitted).await {
        Ok(receipt) => {
            info!("vote from {} mined in block {}", account, receipt.block_number);
            Ok(transaction_response("Vote cast successfully!", &receipt))
        }
        Err(ChainError::Reverted(reason)) => {
            warn!("vote from {} reverted: {}", account, reason);
            if contract.has_voted(account).await? {
                Err(RelayError::AlreadyVoted)
            } else {
                Err(ChainError::Reverted(reason).into())
            }
        }
        Err(err) => Err(err.into()),
    }
}

async fn get_results(data: web::Data<AppState>) -> RelayResult {
    let tally = data.contract.get_results().await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "yes_votes": tally.yes_votes,
        "no_votes": tally.no_votes,
        "total_votes": tally.total_votes,
    })))
}

async fn get_accounts(data: web::Data<AppState>) -> RelayResult {
    let contract = &data.contract;
    let mut accounts = Vec::new();
    for address in contract.client().accounts().await? {
        let wei = contract.client().balance(address).await?;
        let has_voted = contract.has_voted(address).await?;
        accounts.push(AccountInfo {
            address: checksummed(&address),
            balance: wei as f64 / WEI_PER_ETHER,
            has_voted,
        });
    }
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "accounts": accounts,
    })))
}

async fn blockchain_info(data: web::Data<AppState>) -> RelayResult {
    let block = data.contract.client().latest_block().await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "block_number": block.number,
        "block_hash": block.hash,
        "timestamp": block.timestamp,
        "transactions": block.transactions,
        "contract_address": checksummed(&data.contract.address()),
    })))
}

async fn get_voters(data: web::Data<AppState>) -> RelayResult {
    let voters: Vec<String> = data
        .contract
        .get_voters()
        .await?
        .iter()
        .map(checksummed)
        .collect();
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": voters.len(),
        "voters": voters,
    })))
}

async fn voting_status(data: web::Data<AppState>) -> RelayResult {
    let contract = &data.contract;
    let accounts = contract.client().accounts().await?;
    let mut voted_count = 0usize;
    for account in &accounts {
        if contract.has_voted(*account).await? {
            voted_count += 1;
        }
    }
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "all_voted": voted_count == accounts.len(),
        "voted_count": voted_count,
        "total_accounts": accounts.len(),
    })))
}

async fn reset_voting(data: web::Data<AppState>) -> RelayResult {
    let contract = &data.contract;
    let admin = match data.admin_account {
        Some(admin) => admin,
        None => first_account(contract).await?,
    };

    if !contract.is_admin(admin).await? {
        warn!("reset refused: {} is not admin", admin);
        return Err(RelayError::NotAdmin);
    }

    let submitted = contract.reset_voting(admin).await;
    let receipt = mined(contract, submitted).await?;
    info!("voting reset in block {}", receipt.block_number);
    Ok(transaction_response("Voting has been reset!", &receipt))
}
