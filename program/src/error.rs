use num_derive::FromPrimitive;
use thiserror::Error;

pub type DexResult<T = ()> = Result<T, DexError>;

#[derive(Clone, Copy, Debug, Error, FromPrimitive, PartialEq, Eq)]
pub enum DexError {
    #[error("Invalid arithmetic operator")]
    InvalidOperator,
    #[error("Invalid request input")]
    InvalidInput,
    #[error("Amount must be greater than zero")]
    ZeroAmount,
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
    #[error("Value out of uint64 range")]
    OutOfRange,
    #[error("Not enough liquidity")]
    NotEnoughLiquidity,
    #[error("Trade input insufficient for trading fee")]
    InsufficientFee,
    #[error("Minimum acceptable amount not reached")]
    MinAmountNotReached,
    #[error("Reserve changes must have opposite signs or both be zero")]
    InvalidReserveChangeSigns,
    #[error("Cannot match a trade with an order of the same direction")]
    SameDirectionOrder,
    #[error("Contributions are not compatible")]
    IncompatibleContribution,
    #[error("Unknown instruction type")]
    UnknownInstructionType,
    #[error("Pool pair not found")]
    PoolNotFound,
    #[error("Order not found")]
    OrderNotFound,
    #[error("Share not found")]
    ShareNotFound,
    #[error("An order with this id already exists")]
    DuplicateOrder,
    #[error("Too many open orders for this identity")]
    TooManyOrders,
    #[error("Invalid trade path")]
    InvalidTradePath,
    #[error("Invalid parameters")]
    InvalidParams,
    #[error("Instruction data could not be decoded")]
    InvalidInstructionData,
    #[error("Instruction does not match the local state")]
    StateDivergence,
    #[error("Storage record could not be encoded or decoded")]
    StorageEncoding,
    #[error("Assertion failed")]
    AssertionError,
}

impl From<serde_json::Error> for DexError {
    fn from(_: serde_json::Error) -> Self {
        DexError::InvalidInstructionData
    }
}

impl From<std::io::Error> for DexError {
    fn from(_: std::io::Error) -> Self {
        DexError::StorageEncoding
    }
}
