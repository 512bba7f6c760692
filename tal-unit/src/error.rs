use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("cannot create local variable \"{0}\" outside a procedure body")]
    NotInProcedure(String),

    #[error("auxiliary data index {0} out of range")]
    NoSuchAuxData(u32),

    #[error("out of memory growing {0}")]
    OutOfMemory(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
