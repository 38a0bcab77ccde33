//! Call session domain - wire protocol, caller identity and response ids

pub mod caller;
pub mod protocol;
pub mod response_id;

pub use caller::CallerNumber;
pub use protocol::{
    CallMetadata, InboundEvent, OutboundEvent, ResponseRequest, Role, SessionCapabilities,
    Utterance, CONFIG_RESPONSE_ID,
};
pub use response_id::{ResponseTicket, ResponseTracker};
