use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::rpc::types::Log;
use std::sync::Arc;

use crate::abi::EventKind;
use crate::chains::registry::ChainRegistry;
use crate::tokens::pools::PoolRegistry;
use crate::tokens::registry::TokenRegistry;

/// A decoded send-side bridge event: a user locked or burned an asset on
/// this chain, destined for another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutEvent {
    pub from_tx_hash: B256,
    pub from_address: Address,
    pub to_address: Address,
    pub sent_value: U256,
    pub from_chain_id: u64,
    pub to_chain_id: u64,
    pub sent_time: u64,
    pub sent_token: Address,
    pub received_token: Address,
    pub kappa: B256,
    pub kind: EventKind,
}

/// A decoded receive-side bridge event: a validator minted or released an
/// asset on this chain to complete a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InEvent {
    pub to_tx_hash: B256,
    pub to_address: Address,
    pub received_value: U256,
    pub to_chain_id: u64,
    pub received_time: u64,
    pub received_token: Address,
    pub swap_success: Option<bool>,
    pub kappa: B256,
    pub fee: U256,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    Out(OutEvent),
    In(InEvent),
}

impl BridgeEvent {
    pub fn kappa(&self) -> B256 {
        match self {
            BridgeEvent::Out(ev) => ev.kappa,
            BridgeEvent::In(ev) => ev.kappa,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            BridgeEvent::Out(ev) => ev.kind,
            BridgeEvent::In(ev) => ev.kind,
        }
    }
}

/// Everything the decoder needs about the transaction behind a log. Fetched
/// by the ingestor so that decoding itself stays a pure function.
#[derive(Debug, Clone)]
pub struct TxContext {
    /// Transaction sender.
    pub from: Address,
    /// Transaction input calldata.
    pub input: Bytes,
    /// All logs from the transaction receipt, in emission order.
    pub receipt_logs: Vec<Log>,
    /// Timestamp of the containing block.
    pub timestamp: u64,
}

/// The immutable lookup state built at startup, shared by ingestor, decoder
/// and writer.
#[derive(Clone)]
pub struct Registries {
    pub chains: Arc<ChainRegistry>,
    pub tokens: Arc<TokenRegistry>,
    pub pools: Arc<PoolRegistry>,
}
