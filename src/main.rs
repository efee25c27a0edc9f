use actix_web::{middleware, web, App, HttpServer};
use log::{error, info, warn};
use std::io;
use std::sync::Arc;

use votechain_relay::abi::ContractDescriptor;
use votechain_relay::api::{self, AppState};
use votechain_relay::chain::{ChainClient, HttpTransport};
use votechain_relay::config::Config;
use votechain_relay::contract::VotingContract;

fn startup_error(err: impl std::fmt::Display) -> io::Error {
    error!("{}", err);
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(startup_error)?;
    let descriptor = ContractDescriptor::load(&config.contract_info).map_err(startup_error)?;

    let client = ChainClient::new(
        Arc::new(HttpTransport::new(config.rpc_url.clone())),
        config.receipt_poll,
        config.receipt_timeout,
    );
    let contract = VotingContract::new(client, &descriptor).map_err(startup_error)?;

    info!("VoteChain - Blockchain Voting System");
    info!("Contract address: {}", contract.address());
    match contract.client().chain_id().await {
        Ok(chain_id) => info!("Connected to {} (chain id {})", config.rpc_url, chain_id),
        Err(err) => warn!("Chain node at {} not reachable: {}", config.rpc_url, err),
    }

    let state = web::Data::new(AppState {
        contract,
        static_dir: config.static_dir.clone(),
        admin_account: config.admin_account,
    });

    info!("Listening on {}:{}", config.host, config.port);
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(api::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
