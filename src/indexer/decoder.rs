use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;

use crate::abi::{self, EventKind, Transfer};
use crate::chains::registry::{Chain, PoolKind};
use crate::error::IndexerError;
use crate::indexer::types::{BridgeEvent, InEvent, OutEvent, Registries, TxContext};

/// Decode one raw bridge log into a canonical event.
///
/// Pure given the log, its transaction context and the startup registries;
/// the ingestor owns all I/O. `Ok(None)` means the event was deliberately
/// dropped (retired test pools).
pub fn decode_log(
    chain: &Chain,
    log: &Log,
    ctx: &TxContext,
    reg: &Registries,
) -> Result<Option<BridgeEvent>, IndexerError> {
    let topic = log
        .topic0()
        .ok_or_else(|| IndexerError::Invariant("bridge log without topics".into()))?;
    let kind = EventKind::from_topic(topic).ok_or(IndexerError::UnknownTopic(*topic))?;
    let tx_hash = log
        .transaction_hash
        .ok_or_else(|| IndexerError::Invariant("bridge log without transaction hash".into()))?;

    match kind.direction() {
        abi::Direction::Out => {
            decode_out(chain, kind, log, tx_hash, ctx, reg).map(|ev| ev.map(BridgeEvent::Out))
        }
        abi::Direction::In => {
            decode_in(chain, kind, log, tx_hash, ctx, reg).map(|ev| ev.map(BridgeEvent::In))
        }
    }
}

/// Send side. The bridged asset and amount live in the event args for plain
/// redeems and deposits; swap variants reference the destination pool by
/// index, and the true pulled amount sits in the receipt's Transfer logs.
fn decode_out(
    chain: &Chain,
    kind: EventKind,
    log: &Log,
    tx_hash: B256,
    ctx: &TxContext,
    reg: &Registries,
) -> Result<Option<OutEvent>, IndexerError> {
    let args = abi::decode_bridge_event(kind, log)?;

    let to_chain_id = args
        .chain_id
        .and_then(|id| u64::try_from(id).ok())
        .ok_or_else(|| {
            IndexerError::Invariant(format!("{} without destination chain id", kind.name()))
        })?;
    let to_chain = reg
        .chains
        .get(to_chain_id)
        .ok_or(IndexerError::UnknownChain(to_chain_id))?;

    // Destination pool family. Assets whose symbol mentions eth ride the
    // nETH pool; everything else settles through nUSD.
    let mut pool = PoolKind::Nusd;
    if let Some(symbol) = reg.tokens.symbol(chain.chain_id, args.token) {
        if symbol.to_lowercase().contains("eth") {
            pool = PoolKind::Neth;
        }
    }

    let (sent_token, received_token, value_from_receipt) = match kind {
        EventKind::TokenRedeem | EventKind::TokenDeposit => (args.token, args.token, false),
        EventKind::TokenDepositAndSwap => {
            if let Some(meta) = reg.tokens.meta(chain.chain_id, args.token) {
                if meta.name.to_lowercase().contains("eth") {
                    pool = PoolKind::Neth;
                }
            }
            // Wrapped path, same as RedeemAndSwap: the deposited asset is
            // whatever the first receipt log moved, not the event's token.
            let first = ctx.receipt_logs.first().ok_or_else(|| {
                IndexerError::Rpc(format!("receipt for {tx_hash} has no logs"))
            })?;
            let index = args.token_index_to.ok_or_else(|| {
                IndexerError::Invariant(format!("{} without tokenIndexTo", kind.name()))
            })?;
            let received = reg.pools.token_at(to_chain_id, pool, index)?;
            (first.address(), received, true)
        }
        EventKind::TokenRedeemAndRemove => {
            let index = args.swap_token_index.ok_or_else(|| {
                IndexerError::Invariant(format!("{} without swapTokenIndex", kind.name()))
            })?;
            let received = reg.pools.token_at(to_chain_id, pool, index)?;
            (args.token, received, true)
        }
        EventKind::TokenRedeemAndSwap => {
            // The asset before wrapping shows up as the first receipt log.
            let first = ctx.receipt_logs.first().ok_or_else(|| {
                IndexerError::Rpc(format!("receipt for {tx_hash} has no logs"))
            })?;
            let index = args.token_index_to.ok_or_else(|| {
                IndexerError::Invariant(format!("{} without tokenIndexTo", kind.name()))
            })?;
            let received = reg.pools.token_at(to_chain_id, pool, index)?;
            (first.address(), received, true)
        }
        _ => unreachable!("IN event in OUT path"),
    };

    // Transfers routed into a retired destination test pool are not real
    // bridge traffic.
    if let Some(spec) = to_chain.pool(pool) {
        if to_chain.is_ignored_pool(spec.match_address) {
            tracing::debug!(
                chain = %chain.name,
                event = kind.name(),
                tx_hash = %tx_hash,
                "Dropping event routed through ignored pool"
            );
            return Ok(None);
        }
    }

    let sent_value = if value_from_receipt {
        transfer_value_from_receipt(ctx, sent_token, tx_hash)?
    } else {
        args.amount
    };

    Ok(Some(OutEvent {
        from_tx_hash: tx_hash,
        from_address: ctx.from,
        to_address: args.to,
        sent_value,
        from_chain_id: chain.chain_id,
        to_chain_id,
        sent_time: ctx.timestamp,
        sent_token,
        received_token,
        // The receiving chain derives the correlation key from the source
        // transaction hash; mirror it so the IN side can match by kappa.
        kappa: keccak256(tx_hash.as_slice()),
        kind,
    }))
}

/// Receive side. The authoritative args come from the validator
/// transaction's calldata; the emitted event only contributes the swap
/// outcome.
fn decode_in(
    chain: &Chain,
    kind: EventKind,
    log: &Log,
    tx_hash: B256,
    ctx: &TxContext,
    reg: &Registries,
) -> Result<Option<InEvent>, IndexerError> {
    let call = abi::decode_bridge_call(&ctx.input)?;

    let mut pool = PoolKind::Nusd;
    if let Some(address) = call.pool {
        if chain.is_ignored_pool(address) {
            tracing::debug!(
                chain = %chain.name,
                event = kind.name(),
                tx_hash = %tx_hash,
                pool = %address,
                "Dropping event routed through ignored pool"
            );
            return Ok(None);
        }
        pool = chain.pool_kind_of(address).ok_or_else(|| {
            IndexerError::Invariant(format!(
                "{address} is not a known pool on {}",
                chain.name
            ))
        })?;
    }

    // swapSuccess is only knowable at execution time, so it lives in the
    // event rather than the calldata.
    let mut swap_success = None;
    if matches!(
        kind,
        EventKind::TokenMintAndSwap | EventKind::TokenWithdrawAndRemove
    ) {
        let args = abi::decode_bridge_event(kind, log)?;
        swap_success = args.swap_success;
        if let Some(kappa) = args.kappa {
            if kappa != call.kappa {
                return Err(IndexerError::Invariant(format!(
                    "kappa mismatch between calldata and event in {tx_hash}"
                )));
            }
        }
    }

    let (received_token, received_value) = match kind {
        EventKind::TokenMint | EventKind::TokenWithdraw => (call.token, call.amount),
        _ => {
            let index = match kind {
                EventKind::TokenWithdrawAndRemove => call.swap_token_index,
                _ => call.token_index_to,
            }
            .ok_or_else(|| {
                IndexerError::Invariant(format!(
                    "{} calldata without a swap token index",
                    kind.name()
                ))
            })?;
            let target = reg.pools.token_at(chain.chain_id, pool, index)?;

            // A failed swap credits the nexus asset instead of the target.
            let direct = if swap_success == Some(false) {
                None
            } else {
                find_transfer_to(ctx, target, call.to)
            };

            match direct {
                Some(value) => (target, value),
                None => {
                    let nexus = reg.pools.nexus_token(chain, pool).ok_or(
                        IndexerError::DecodeIncomplete {
                            token: target,
                            tx_hash,
                        },
                    )?;
                    let value = find_transfer_to(ctx, nexus, call.to).ok_or(
                        IndexerError::DecodeIncomplete {
                            token: nexus,
                            tx_hash,
                        },
                    )?;
                    (nexus, value)
                }
            }
        }
    };

    Ok(Some(InEvent {
        to_tx_hash: tx_hash,
        to_address: call.to,
        received_value,
        to_chain_id: chain.chain_id,
        received_time: ctx.timestamp,
        received_token,
        swap_success,
        kappa: call.kappa,
        fee: call.fee,
        kind,
    }))
}

/// Amount actually pulled from the user: the first receipt log when it is a
/// Transfer, otherwise the first Transfer emitted by `sent_token`.
fn transfer_value_from_receipt(
    ctx: &TxContext,
    sent_token: Address,
    tx_hash: B256,
) -> Result<U256, IndexerError> {
    if let Some(first) = ctx.receipt_logs.first() {
        if let Ok(transfer) = Transfer::decode_log(&first.inner) {
            return Ok(transfer.data.value);
        }
    }

    ctx.receipt_logs
        .iter()
        .filter(|log| log.address() == sent_token)
        .find_map(|log| Transfer::decode_log(&log.inner).ok())
        .map(|transfer| transfer.data.value)
        .ok_or(IndexerError::DecodeIncomplete {
            token: sent_token,
            tx_hash,
        })
}

/// Find the Transfer of `token` credited to `recipient` in the receipt.
fn find_transfer_to(ctx: &TxContext, token: Address, recipient: Address) -> Option<U256> {
    ctx.receipt_logs
        .iter()
        .filter(|log| log.address() == token)
        .filter_map(|log| Transfer::decode_log(&log.inner).ok())
        .find(|transfer| transfer.data.to == recipient)
        .map(|transfer| transfer.data.value)
}
