mod endpoint;

pub(crate) use self::endpoint::{execute_participants, Endpoint};
pub use self::endpoint::TransportError;
