//! Bridge contract ABI surface: event definitions across the three deployed
//! contract generations, the topic dispatch table, and the validator calldata
//! shapes used on the receiving side.

use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::Log;
use alloy::sol;
use alloy::sol_types::{SolCall, SolEvent};

use crate::error::IndexerError;

/// Direction of a bridge event relative to the chain it was emitted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// A user locked or burned an asset here; it will surface elsewhere.
    Out,
    /// A validator minted or released an asset here.
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TokenDeposit,
    TokenDepositAndSwap,
    TokenRedeem,
    TokenRedeemAndSwap,
    TokenRedeemAndRemove,
    TokenMint,
    TokenMintAndSwap,
    TokenWithdraw,
    TokenWithdrawAndRemove,
}

impl EventKind {
    pub const ALL: [EventKind; 9] = [
        EventKind::TokenDeposit,
        EventKind::TokenDepositAndSwap,
        EventKind::TokenRedeem,
        EventKind::TokenRedeemAndSwap,
        EventKind::TokenRedeemAndRemove,
        EventKind::TokenMint,
        EventKind::TokenMintAndSwap,
        EventKind::TokenWithdraw,
        EventKind::TokenWithdrawAndRemove,
    ];

    pub fn direction(self) -> Direction {
        match self {
            EventKind::TokenDeposit
            | EventKind::TokenDepositAndSwap
            | EventKind::TokenRedeem
            | EventKind::TokenRedeemAndSwap
            | EventKind::TokenRedeemAndRemove => Direction::Out,
            EventKind::TokenMint
            | EventKind::TokenMintAndSwap
            | EventKind::TokenWithdraw
            | EventKind::TokenWithdrawAndRemove => Direction::In,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::TokenDeposit => "TokenDeposit",
            EventKind::TokenDepositAndSwap => "TokenDepositAndSwap",
            EventKind::TokenRedeem => "TokenRedeem",
            EventKind::TokenRedeemAndSwap => "TokenRedeemAndSwap",
            EventKind::TokenRedeemAndRemove => "TokenRedeemAndRemove",
            EventKind::TokenMint => "TokenMint",
            EventKind::TokenMintAndSwap => "TokenMintAndSwap",
            EventKind::TokenWithdraw => "TokenWithdraw",
            EventKind::TokenWithdrawAndRemove => "TokenWithdrawAndRemove",
        }
    }

    /// Signature hash (topic 0). Identical across generations: indexedness
    /// changes the topic layout, never the signature.
    pub fn topic(self) -> B256 {
        match self {
            EventKind::TokenDeposit => current::TokenDeposit::SIGNATURE_HASH,
            EventKind::TokenDepositAndSwap => current::TokenDepositAndSwap::SIGNATURE_HASH,
            EventKind::TokenRedeem => current::TokenRedeem::SIGNATURE_HASH,
            EventKind::TokenRedeemAndSwap => current::TokenRedeemAndSwap::SIGNATURE_HASH,
            EventKind::TokenRedeemAndRemove => current::TokenRedeemAndRemove::SIGNATURE_HASH,
            EventKind::TokenMint => current::TokenMint::SIGNATURE_HASH,
            EventKind::TokenMintAndSwap => current::TokenMintAndSwap::SIGNATURE_HASH,
            EventKind::TokenWithdraw => current::TokenWithdraw::SIGNATURE_HASH,
            EventKind::TokenWithdrawAndRemove => current::TokenWithdrawAndRemove::SIGNATURE_HASH,
        }
    }

    /// Reverse lookup for topic 0. `None` means the bridge emitted something
    /// this indexer has not learned; callers treat that as fail-closed.
    pub fn from_topic(topic: &B256) -> Option<EventKind> {
        EventKind::ALL.iter().copied().find(|k| k.topic() == *topic)
    }
}

/// Full topic set, used to build log filters for the bridge address.
pub fn bridge_topics() -> Vec<B256> {
    EventKind::ALL.iter().map(|k| k.topic()).collect()
}

/// Current bridge deployment. Receipt-side events index `kappa` so that
/// destination lookups by correlation key stay cheap.
pub mod current {
    use alloy::sol;

    sol! {
        event TokenDeposit(address indexed to, uint256 chainId, address token, uint256 amount);
        event TokenDepositAndSwap(address indexed to, uint256 chainId, address token, uint256 amount, uint8 tokenIndexFrom, uint8 tokenIndexTo, uint256 minDy, uint256 deadline);
        event TokenRedeem(address indexed to, uint256 chainId, address token, uint256 amount);
        event TokenRedeemAndSwap(address indexed to, uint256 chainId, address token, uint256 amount, uint8 tokenIndexFrom, uint8 tokenIndexTo, uint256 minDy, uint256 deadline);
        event TokenRedeemAndRemove(address indexed to, uint256 chainId, address token, uint256 amount, uint8 swapTokenIndex, uint256 swapMinAmount, uint256 swapDeadline);

        event TokenMint(address indexed to, address token, uint256 amount, uint256 fee, bytes32 indexed kappa);
        event TokenMintAndSwap(address indexed to, address token, uint256 amount, uint256 fee, uint8 tokenIndexFrom, uint8 tokenIndexTo, uint256 minDy, uint256 deadline, bool swapSuccess, bytes32 indexed kappa);
        event TokenWithdraw(address indexed to, address token, uint256 amount, uint256 fee, bytes32 indexed kappa);
        event TokenWithdrawAndRemove(address indexed to, address token, uint256 amount, uint256 fee, uint8 swapTokenIndex, uint256 swapMinAmount, uint256 swapDeadline, bool swapSuccess, bytes32 indexed kappa);
    }
}

/// Previous deployment: `kappa` lived in the data section, and send-side
/// events indexed nothing.
pub mod old {
    use alloy::sol;

    sol! {
        event TokenDeposit(address to, uint256 chainId, address token, uint256 amount);
        event TokenDepositAndSwap(address to, uint256 chainId, address token, uint256 amount, uint8 tokenIndexFrom, uint8 tokenIndexTo, uint256 minDy, uint256 deadline);
        event TokenRedeem(address to, uint256 chainId, address token, uint256 amount);
        event TokenRedeemAndSwap(address to, uint256 chainId, address token, uint256 amount, uint8 tokenIndexFrom, uint8 tokenIndexTo, uint256 minDy, uint256 deadline);
        event TokenRedeemAndRemove(address to, uint256 chainId, address token, uint256 amount, uint8 swapTokenIndex, uint256 swapMinAmount, uint256 swapDeadline);

        event TokenMint(address indexed to, address token, uint256 amount, uint256 fee, bytes32 kappa);
        event TokenMintAndSwap(address indexed to, address token, uint256 amount, uint256 fee, uint8 tokenIndexFrom, uint8 tokenIndexTo, uint256 minDy, uint256 deadline, bool swapSuccess, bytes32 kappa);
        event TokenWithdraw(address indexed to, address token, uint256 amount, uint256 fee, bytes32 kappa);
        event TokenWithdrawAndRemove(address indexed to, address token, uint256 amount, uint256 fee, uint8 swapTokenIndex, uint256 swapMinAmount, uint256 swapDeadline, bool swapSuccess, bytes32 kappa);
    }
}

/// First deployment. Only the receipt-side events differ from [`old`]; the
/// send-side shapes never changed between the first two generations.
pub mod older {
    use alloy::sol;

    sol! {
        event TokenMint(address to, address token, uint256 amount, uint256 fee, bytes32 kappa);
        event TokenMintAndSwap(address to, address token, uint256 amount, uint256 fee, uint8 tokenIndexFrom, uint8 tokenIndexTo, uint256 minDy, uint256 deadline, bool swapSuccess, bytes32 kappa);
        event TokenWithdraw(address to, address token, uint256 amount, uint256 fee, bytes32 kappa);
        event TokenWithdrawAndRemove(address to, address token, uint256 amount, uint256 fee, uint8 swapTokenIndex, uint256 swapMinAmount, uint256 swapDeadline, bool swapSuccess, bytes32 kappa);
    }
}

/// Event arguments normalized across kinds and generations. Fields absent
/// from a given event shape stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventArgs {
    pub to: Address,
    pub chain_id: Option<U256>,
    pub token: Address,
    pub amount: U256,
    pub fee: Option<U256>,
    pub token_index_from: Option<u8>,
    pub token_index_to: Option<u8>,
    pub swap_token_index: Option<u8>,
    pub swap_success: Option<bool>,
    pub kappa: Option<B256>,
}

macro_rules! from_out_basic {
    ($($ev:path),+ $(,)?) => {$(
        impl From<$ev> for EventArgs {
            fn from(ev: $ev) -> Self {
                EventArgs {
                    to: ev.to,
                    chain_id: Some(ev.chainId),
                    token: ev.token,
                    amount: ev.amount,
                    ..Default::default()
                }
            }
        }
    )+};
}

macro_rules! from_out_swap {
    ($($ev:path),+ $(,)?) => {$(
        impl From<$ev> for EventArgs {
            fn from(ev: $ev) -> Self {
                EventArgs {
                    to: ev.to,
                    chain_id: Some(ev.chainId),
                    token: ev.token,
                    amount: ev.amount,
                    token_index_from: Some(ev.tokenIndexFrom),
                    token_index_to: Some(ev.tokenIndexTo),
                    ..Default::default()
                }
            }
        }
    )+};
}

macro_rules! from_out_remove {
    ($($ev:path),+ $(,)?) => {$(
        impl From<$ev> for EventArgs {
            fn from(ev: $ev) -> Self {
                EventArgs {
                    to: ev.to,
                    chain_id: Some(ev.chainId),
                    token: ev.token,
                    amount: ev.amount,
                    swap_token_index: Some(ev.swapTokenIndex),
                    ..Default::default()
                }
            }
        }
    )+};
}

macro_rules! from_in_basic {
    ($($ev:path),+ $(,)?) => {$(
        impl From<$ev> for EventArgs {
            fn from(ev: $ev) -> Self {
                EventArgs {
                    to: ev.to,
                    token: ev.token,
                    amount: ev.amount,
                    fee: Some(ev.fee),
                    kappa: Some(ev.kappa),
                    ..Default::default()
                }
            }
        }
    )+};
}

macro_rules! from_in_swap {
    ($($ev:path),+ $(,)?) => {$(
        impl From<$ev> for EventArgs {
            fn from(ev: $ev) -> Self {
                EventArgs {
                    to: ev.to,
                    token: ev.token,
                    amount: ev.amount,
                    fee: Some(ev.fee),
                    token_index_from: Some(ev.tokenIndexFrom),
                    token_index_to: Some(ev.tokenIndexTo),
                    swap_success: Some(ev.swapSuccess),
                    kappa: Some(ev.kappa),
                    ..Default::default()
                }
            }
        }
    )+};
}

macro_rules! from_in_remove {
    ($($ev:path),+ $(,)?) => {$(
        impl From<$ev> for EventArgs {
            fn from(ev: $ev) -> Self {
                EventArgs {
                    to: ev.to,
                    token: ev.token,
                    amount: ev.amount,
                    fee: Some(ev.fee),
                    swap_token_index: Some(ev.swapTokenIndex),
                    swap_success: Some(ev.swapSuccess),
                    kappa: Some(ev.kappa),
                    ..Default::default()
                }
            }
        }
    )+};
}

from_out_basic!(
    current::TokenDeposit,
    current::TokenRedeem,
    old::TokenDeposit,
    old::TokenRedeem,
);
from_out_swap!(
    current::TokenDepositAndSwap,
    current::TokenRedeemAndSwap,
    old::TokenDepositAndSwap,
    old::TokenRedeemAndSwap,
);
from_out_remove!(current::TokenRedeemAndRemove, old::TokenRedeemAndRemove);
from_in_basic!(
    current::TokenMint,
    current::TokenWithdraw,
    old::TokenMint,
    old::TokenWithdraw,
    older::TokenMint,
    older::TokenWithdraw,
);
from_in_swap!(
    current::TokenMintAndSwap,
    old::TokenMintAndSwap,
    older::TokenMintAndSwap,
);
from_in_remove!(
    current::TokenWithdrawAndRemove,
    old::TokenWithdrawAndRemove,
    older::TokenWithdrawAndRemove,
);

/// Ordered ABI generations, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiGeneration {
    Current,
    Old,
    Older,
}

impl AbiGeneration {
    pub const LADDER: [AbiGeneration; 3] =
        [AbiGeneration::Current, AbiGeneration::Old, AbiGeneration::Older];

    /// Decode `log` as `kind` under this generation's indexed layout.
    /// `None` covers both a topic-count mismatch and a shape this generation
    /// never emitted.
    fn decode(self, kind: EventKind, log: &Log) -> Option<EventArgs> {
        macro_rules! ev {
            ($module:ident :: $name:ident) => {
                $module::$name::decode_log(&log.inner).ok().map(|ev| EventArgs::from(ev.data))
            };
        }

        match (self, kind) {
            (AbiGeneration::Current, EventKind::TokenDeposit) => ev!(current::TokenDeposit),
            (AbiGeneration::Current, EventKind::TokenDepositAndSwap) => {
                ev!(current::TokenDepositAndSwap)
            }
            (AbiGeneration::Current, EventKind::TokenRedeem) => ev!(current::TokenRedeem),
            (AbiGeneration::Current, EventKind::TokenRedeemAndSwap) => {
                ev!(current::TokenRedeemAndSwap)
            }
            (AbiGeneration::Current, EventKind::TokenRedeemAndRemove) => {
                ev!(current::TokenRedeemAndRemove)
            }
            (AbiGeneration::Current, EventKind::TokenMint) => ev!(current::TokenMint),
            (AbiGeneration::Current, EventKind::TokenMintAndSwap) => ev!(current::TokenMintAndSwap),
            (AbiGeneration::Current, EventKind::TokenWithdraw) => ev!(current::TokenWithdraw),
            (AbiGeneration::Current, EventKind::TokenWithdrawAndRemove) => {
                ev!(current::TokenWithdrawAndRemove)
            }

            (AbiGeneration::Old, EventKind::TokenDeposit) => ev!(old::TokenDeposit),
            (AbiGeneration::Old, EventKind::TokenDepositAndSwap) => ev!(old::TokenDepositAndSwap),
            (AbiGeneration::Old, EventKind::TokenRedeem) => ev!(old::TokenRedeem),
            (AbiGeneration::Old, EventKind::TokenRedeemAndSwap) => ev!(old::TokenRedeemAndSwap),
            (AbiGeneration::Old, EventKind::TokenRedeemAndRemove) => {
                ev!(old::TokenRedeemAndRemove)
            }
            (AbiGeneration::Old, EventKind::TokenMint) => ev!(old::TokenMint),
            (AbiGeneration::Old, EventKind::TokenMintAndSwap) => ev!(old::TokenMintAndSwap),
            (AbiGeneration::Old, EventKind::TokenWithdraw) => ev!(old::TokenWithdraw),
            (AbiGeneration::Old, EventKind::TokenWithdrawAndRemove) => {
                ev!(old::TokenWithdrawAndRemove)
            }

            (AbiGeneration::Older, EventKind::TokenMint) => ev!(older::TokenMint),
            (AbiGeneration::Older, EventKind::TokenMintAndSwap) => ev!(older::TokenMintAndSwap),
            (AbiGeneration::Older, EventKind::TokenWithdraw) => ev!(older::TokenWithdraw),
            (AbiGeneration::Older, EventKind::TokenWithdrawAndRemove) => {
                ev!(older::TokenWithdrawAndRemove)
            }
            (AbiGeneration::Older, _) => None,
        }
    }
}

/// Decode a bridge event by walking the generation ladder, newest ABI first.
/// The ladder runs event-by-event: a chain can carry logs from several
/// deployments in one block range.
pub fn decode_bridge_event(kind: EventKind, log: &Log) -> Result<EventArgs, IndexerError> {
    for generation in AbiGeneration::LADDER {
        if let Some(args) = generation.decode(kind, log) {
            return Ok(args);
        }
    }

    Err(IndexerError::AbiMismatch {
        event: kind.name(),
        topics: log.inner.data.topics().len(),
    })
}

sol! {
    function mint(address to, address token, uint256 amount, uint256 fee, bytes32 kappa);
    function mintAndSwap(address to, address token, uint256 amount, uint256 fee, address pool, uint8 tokenIndexFrom, uint8 tokenIndexTo, uint256 minDy, uint256 deadline, bytes32 kappa);
    function withdraw(address to, address token, uint256 amount, uint256 fee, bytes32 kappa);
    function withdrawAndRemove(address to, address token, uint256 amount, uint256 fee, address pool, uint8 swapTokenIndex, uint256 swapMinAmount, uint256 swapDeadline, bytes32 kappa);
}

/// Arguments of the validator transaction that produced an IN event,
/// normalized across the four bridge entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallArgs {
    pub to: Address,
    pub token: Address,
    pub amount: U256,
    pub fee: U256,
    pub kappa: B256,
    pub pool: Option<Address>,
    pub token_index_from: Option<u8>,
    pub token_index_to: Option<u8>,
    pub swap_token_index: Option<u8>,
}

/// Decode the input calldata of a validator transaction. All IN events are
/// emitted by one of the four bridge entry points below.
pub fn decode_bridge_call(input: &[u8]) -> Result<CallArgs, IndexerError> {
    let selector: [u8; 4] = input
        .get(..4)
        .and_then(|s| s.try_into().ok())
        .ok_or(IndexerError::UnknownCall([0; 4]))?;

    if selector == mintCall::SELECTOR {
        let call = mintCall::abi_decode(input).map_err(|_| IndexerError::UnknownCall(selector))?;
        return Ok(CallArgs {
            to: call.to,
            token: call.token,
            amount: call.amount,
            fee: call.fee,
            kappa: call.kappa,
            pool: None,
            token_index_from: None,
            token_index_to: None,
            swap_token_index: None,
        });
    }

    if selector == mintAndSwapCall::SELECTOR {
        let call =
            mintAndSwapCall::abi_decode(input).map_err(|_| IndexerError::UnknownCall(selector))?;
        return Ok(CallArgs {
            to: call.to,
            token: call.token,
            amount: call.amount,
            fee: call.fee,
            kappa: call.kappa,
            pool: Some(call.pool),
            token_index_from: Some(call.tokenIndexFrom),
            token_index_to: Some(call.tokenIndexTo),
            swap_token_index: None,
        });
    }

    if selector == withdrawCall::SELECTOR {
        let call =
            withdrawCall::abi_decode(input).map_err(|_| IndexerError::UnknownCall(selector))?;
        return Ok(CallArgs {
            to: call.to,
            token: call.token,
            amount: call.amount,
            fee: call.fee,
            kappa: call.kappa,
            pool: None,
            token_index_from: None,
            token_index_to: None,
            swap_token_index: None,
        });
    }

    if selector == withdrawAndRemoveCall::SELECTOR {
        let call = withdrawAndRemoveCall::abi_decode(input)
            .map_err(|_| IndexerError::UnknownCall(selector))?;
        return Ok(CallArgs {
            to: call.to,
            token: call.token,
            amount: call.amount,
            fee: call.fee,
            kappa: call.kappa,
            pool: Some(call.pool),
            token_index_from: None,
            token_index_to: None,
            swap_token_index: Some(call.swapTokenIndex),
        });
    }

    Err(IndexerError::UnknownCall(selector))
}

sol! {
    event Transfer(address indexed from, address indexed to, uint256 value);
}

sol! {
    #[sol(rpc)]
    contract Erc20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
    }

    #[sol(rpc)]
    contract SwapPool {
        function getToken(uint8 index) external view returns (address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256, LogData};

    fn wrap(address: Address, data: LogData) -> Log {
        Log {
            inner: alloy::primitives::Log { address, data },
            ..Default::default()
        }
    }

    #[test]
    fn test_topic_constants_match_deployed_signatures() {
        // Hashes observed on the deployed bridge contracts.
        let expected = [
            (
                EventKind::TokenRedeemAndSwap,
                b256!("91f25e9be0134ec851830e0e76dc71e06f9dade75a9b84e9524071dbbc319425"),
            ),
            (
                EventKind::TokenMintAndSwap,
                b256!("4f56ec39e98539920503fd54ee56ae0cbebe9eb15aa778f18de67701eeae7c65"),
            ),
            (
                EventKind::TokenRedeemAndRemove,
                b256!("9a7024cde1920aa50cdde09ca396229e8c4d530d5cfdc6233590def70a94408c"),
            ),
            (
                EventKind::TokenRedeem,
                b256!("dc5bad4651c5fbe9977a696aadc65996c468cde1448dd468ec0d83bf61c4b57c"),
            ),
            (
                EventKind::TokenMint,
                b256!("bf14b9fde87f6e1c29a7e0787ad1d0d64b4648d8ae63da21524d9fd0f283dd38"),
            ),
            (
                EventKind::TokenDepositAndSwap,
                b256!("79c15604b92ef54d3f61f0c40caab8857927ca3d5092367163b4562c1699eb5f"),
            ),
            (
                EventKind::TokenWithdrawAndRemove,
                b256!("c1a608d0f8122d014d03cc915a91d98cef4ebaf31ea3552320430cba05211b6d"),
            ),
            (
                EventKind::TokenDeposit,
                b256!("da5273705dbef4bf1b902a131c2eac086b7e1476a8ab0cb4da08af1fe1bd8e3b"),
            ),
            (
                EventKind::TokenWithdraw,
                b256!("8b0afdc777af6946e53045a4a75212769075d30455a212ac51c9b16f9c5c9b26"),
            ),
        ];

        for (kind, topic) in expected {
            assert_eq!(kind.topic(), topic, "{}", kind.name());
            assert_eq!(EventKind::from_topic(&topic), Some(kind));
        }
    }

    #[test]
    fn test_direction_partition() {
        let out = EventKind::ALL.iter().filter(|k| k.direction() == Direction::Out);
        let r#in = EventKind::ALL.iter().filter(|k| k.direction() == Direction::In);
        assert_eq!(out.count(), 5);
        assert_eq!(r#in.count(), 4);
    }

    #[test]
    fn test_unknown_topic_is_rejected() {
        let bogus = b256!("00000000000000000000000000000000000000000000000000000000deadbeef");
        assert_eq!(EventKind::from_topic(&bogus), None);
    }

    #[test]
    fn test_decode_current_generation_round_trip() {
        let event = current::TokenDepositAndSwap {
            to: address!("aaaa701efea3ac6b184628ed104f827014641592"),
            chainId: U256::from(250),
            token: address!("2791bca1f2de4661ed88a30c99a7a9449aa84174"),
            amount: U256::from(20_000_000u64),
            tokenIndexFrom: 1,
            tokenIndexTo: 2,
            minDy: U256::from(19_000_000u64),
            deadline: U256::from(1_640_682_515u64),
        };

        let log = wrap(Address::ZERO, event.encode_log_data());
        let args = decode_bridge_event(EventKind::TokenDepositAndSwap, &log).unwrap();

        assert_eq!(args.to, event.to);
        assert_eq!(args.chain_id, Some(U256::from(250)));
        assert_eq!(args.token, event.token);
        assert_eq!(args.amount, U256::from(20_000_000u64));
        assert_eq!(args.token_index_to, Some(2));
        assert_eq!(args.kappa, None);
    }

    #[test]
    fn test_every_kind_round_trips_through_current_generation() {
        let to = address!("aaaa701efea3ac6b184628ed104f827014641592");
        let token = address!("2791bca1f2de4661ed88a30c99a7a9449aa84174");
        let amount = U256::from(42_000_000u64);
        let fee = U256::from(1_000u64);
        let kappa = b256!("46a556253ee3e16c1f0efddeb6a784b21bfeb2b25a1e2d26bc02e90b0a05e0f6");

        let cases: Vec<(EventKind, LogData)> = vec![
            (
                EventKind::TokenDeposit,
                current::TokenDeposit { to, chainId: U256::from(56), token, amount }
                    .encode_log_data(),
            ),
            (
                EventKind::TokenDepositAndSwap,
                current::TokenDepositAndSwap {
                    to,
                    chainId: U256::from(56),
                    token,
                    amount,
                    tokenIndexFrom: 0,
                    tokenIndexTo: 1,
                    minDy: U256::ZERO,
                    deadline: U256::MAX,
                }
                .encode_log_data(),
            ),
            (
                EventKind::TokenRedeem,
                current::TokenRedeem { to, chainId: U256::from(56), token, amount }
                    .encode_log_data(),
            ),
            (
                EventKind::TokenRedeemAndSwap,
                current::TokenRedeemAndSwap {
                    to,
                    chainId: U256::from(56),
                    token,
                    amount,
                    tokenIndexFrom: 2,
                    tokenIndexTo: 3,
                    minDy: U256::ZERO,
                    deadline: U256::MAX,
                }
                .encode_log_data(),
            ),
            (
                EventKind::TokenRedeemAndRemove,
                current::TokenRedeemAndRemove {
                    to,
                    chainId: U256::from(56),
                    token,
                    amount,
                    swapTokenIndex: 2,
                    swapMinAmount: U256::ZERO,
                    swapDeadline: U256::MAX,
                }
                .encode_log_data(),
            ),
            (
                EventKind::TokenMint,
                current::TokenMint { to, token, amount, fee, kappa }.encode_log_data(),
            ),
            (
                EventKind::TokenMintAndSwap,
                current::TokenMintAndSwap {
                    to,
                    token,
                    amount,
                    fee,
                    tokenIndexFrom: 0,
                    tokenIndexTo: 1,
                    minDy: U256::ZERO,
                    deadline: U256::MAX,
                    swapSuccess: true,
                    kappa,
                }
                .encode_log_data(),
            ),
            (
                EventKind::TokenWithdraw,
                current::TokenWithdraw { to, token, amount, fee, kappa }.encode_log_data(),
            ),
            (
                EventKind::TokenWithdrawAndRemove,
                current::TokenWithdrawAndRemove {
                    to,
                    token,
                    amount,
                    fee,
                    swapTokenIndex: 1,
                    swapMinAmount: U256::ZERO,
                    swapDeadline: U256::MAX,
                    swapSuccess: false,
                    kappa,
                }
                .encode_log_data(),
            ),
        ];

        for (kind, data) in cases {
            assert_eq!(data.topics()[0], kind.topic(), "{}", kind.name());

            let log = wrap(Address::ZERO, data);
            let args = decode_bridge_event(kind, &log).expect(kind.name());

            assert_eq!(args.to, to, "{}", kind.name());
            assert_eq!(args.token, token, "{}", kind.name());
            assert_eq!(args.amount, amount, "{}", kind.name());
            match kind.direction() {
                Direction::Out => {
                    assert_eq!(args.chain_id, Some(U256::from(56)), "{}", kind.name());
                    assert_eq!(args.kappa, None, "{}", kind.name());
                }
                Direction::In => {
                    assert_eq!(args.fee, Some(fee), "{}", kind.name());
                    assert_eq!(args.kappa, Some(kappa), "{}", kind.name());
                }
            }
        }
    }

    #[test]
    fn test_ladder_falls_back_to_old_generation() {
        // kappa in the data section instead of the topics: two topics total.
        let kappa = b256!("a5c27c7983fb0ad29854bba56c868f371a985b15e08d69e9fae9118d5ba57455");
        let event = old::TokenMint {
            to: address!("c89048d9e96f16b3e4a5e9f84caea67517bdb411"),
            token: address!("d8ca34fd379d9ca3c6ee3b3905678320f5b45195"),
            amount: U256::from(120_131_612_094_266_528u64),
            fee: U256::from(60_095_853_974_120u64),
            kappa,
        };

        let log = wrap(Address::ZERO, event.encode_log_data());
        assert_eq!(log.inner.data.topics().len(), 2);

        let args = decode_bridge_event(EventKind::TokenMint, &log).unwrap();
        assert_eq!(args.kappa, Some(kappa));
        assert_eq!(args.fee, Some(U256::from(60_095_853_974_120u64)));
    }

    #[test]
    fn test_ladder_falls_back_to_older_generation() {
        // Nothing indexed at all: a single topic.
        let kappa = b256!("2fc8e3bf128bfd0f66e61c4f1eeb0a1d306e47a27be3b0f0ada439f320b42284");
        let event = older::TokenWithdraw {
            to: address!("734c30744f7204d06ea09c9b3fc94553f755e8d7"),
            token: address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"),
            amount: U256::from(21_886_461_743_816_518_221u128),
            fee: U256::from(30_684_004_047_008_938u64),
            kappa,
        };

        let log = wrap(Address::ZERO, event.encode_log_data());
        assert_eq!(log.inner.data.topics().len(), 1);

        let args = decode_bridge_event(EventKind::TokenWithdraw, &log).unwrap();
        assert_eq!(args.kappa, Some(kappa));
        assert_eq!(args.to, event.to);
    }

    #[test]
    fn test_ladder_exhaustion_is_abi_mismatch() {
        // A TokenRedeem payload presented as TokenMint fails every generation.
        let event = current::TokenRedeem {
            to: Address::ZERO,
            chainId: U256::from(1),
            token: Address::ZERO,
            amount: U256::ZERO,
        };
        let mut log = wrap(Address::ZERO, event.encode_log_data());
        // Force four topics so no Mint layout can accept it.
        let data = log.inner.data.data.clone();
        log.inner.data = LogData::new_unchecked(
            vec![
                EventKind::TokenMint.topic(),
                B256::ZERO,
                B256::ZERO,
                B256::ZERO,
            ],
            data,
        );

        let err = decode_bridge_event(EventKind::TokenMint, &log).unwrap_err();
        assert!(matches!(err, IndexerError::AbiMismatch { event: "TokenMint", .. }));
    }

    #[test]
    fn test_decode_mint_and_swap_calldata() {
        let call = mintAndSwapCall {
            to: address!("f0e4d0d6094d6e13f61013a663b56154546b6c4a"),
            token: address!("b6c473756050de474286bed418b77aeac39b02af"),
            amount: U256::from(199_735_581_750_812_687_939_587u128),
            fee: U256::from(79_894_232_700_325_075_147u128),
            pool: address!("85fcd7dd0a1e1a9fcd5fd886ed522de8221c3ee5"),
            tokenIndexFrom: 0,
            tokenIndexTo: 2,
            minDy: U256::ZERO,
            deadline: U256::from(1_636_284_211u64),
            kappa: b256!("a1ce627f6e70a8939c921e5d5fc7ec0f633b6f5c112c85d1fb3bed46b2f4c83b"),
        };

        let args = decode_bridge_call(&call.abi_encode()).unwrap();
        assert_eq!(args.to, call.to);
        assert_eq!(args.pool, Some(call.pool));
        assert_eq!(args.token_index_to, Some(2));
        assert_eq!(args.swap_token_index, None);
        assert_eq!(args.kappa, call.kappa);
    }

    #[test]
    fn test_decode_withdraw_and_remove_calldata() {
        let call = withdrawAndRemoveCall {
            to: address!("70e09792e94b04cdb76abf7aa24781dcb4d37e2e"),
            token: address!("ed2a7edd7413021d440b09d654f3b87712abab66"),
            amount: U256::from(11_814_203_554_845_343_434_085u128),
            fee: U256::from(4_725_681_421_938_137_373u128),
            pool: address!("2913e812cf0dcca30fb28e6cac3d2dcff4497688"),
            swapTokenIndex: 1,
            swapMinAmount: U256::ZERO,
            swapDeadline: U256::from(1_636_283_005u64),
            kappa: b256!("7e129c6b2bbd9e9e2e02b0a1e1cbbf9e1a3b1e0bb6ff5a1cbded3c5d9c00a496"),
        };

        let args = decode_bridge_call(&call.abi_encode()).unwrap();
        assert_eq!(args.swap_token_index, Some(1));
        assert_eq!(args.pool, Some(call.pool));
        assert_eq!(args.token_index_to, None);
    }

    #[test]
    fn test_unknown_selector_is_rejected() {
        let input = [0xde, 0xad, 0xbe, 0xef, 0x00, 0x00];
        assert!(matches!(
            decode_bridge_call(&input),
            Err(IndexerError::UnknownCall([0xde, 0xad, 0xbe, 0xef]))
        ));
    }
}
