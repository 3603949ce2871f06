pub mod ledger_rpc;
pub mod solana_rpc;
pub mod structures;

pub type AnyhowJoinHandle = tokio::task::JoinHandle<anyhow::Result<()>>;
