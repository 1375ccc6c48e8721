use dexchain_state::block::BlockId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DbError {
    #[error("missing block (id {0})")]
    MissingBlock(BlockId),

    /// Main chain entries go on one at a time right above the tip.
    #[error("tried to insert main chain entry {0} out of order, tip is {1}")]
    OooInsert(u32, u32),

    #[error("codec: {0}")]
    Codec(String),

    #[error("sled: {0}")]
    Sled(String),
}

impl From<sled::Error> for DbError {
    fn from(value: sled::Error) -> Self {
        Self::Sled(value.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
