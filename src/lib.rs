//! Indexer and reconciliation engine for a cross-chain asset bridge.
//!
//! One ingestion task per chain sweeps bridge contract logs (backfill, then
//! head polling), decodes them against the bridge ABI generations, and writes
//! reconciled transfer rows: outbound sends open a pending row, inbound
//! receipts close it by `kappa`, and unmatched receipts land in `lost_txs`.

pub mod abi;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod rpc;

pub mod chains {
    pub mod registry;
}

pub mod db {
    pub mod repository;
}

pub mod indexer {
    pub mod decoder;
    pub mod ingest;
    pub mod types;
}

pub mod tokens {
    pub mod pools;
    pub mod registry;
}
