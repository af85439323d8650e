use serde::Serialize;

pub mod error;
pub mod time;

/// Helper type used as a return type for HTTP handler.
/// This type helps agregating multiple error types from this crate as well as different external
/// crates which have an error system.
pub type Result<T> = std::result::Result<T, error::ServerError>;

/// Plain acknowledgement body shared by the fire-and-forget endpoints.
#[derive(Serialize)]
pub struct Ack {
    pub status: &'static str,
    pub message: &'static str,
}

impl Ack {
    pub fn success(message: &'static str) -> Self {
        Self { status: "success", message }
    }
}
