use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read events, {0}")]
    Io(#[from] std::io::Error),
    #[error("event router error, {0}")]
    EventRouter(#[from] evr_core::event_router::Error),
}
