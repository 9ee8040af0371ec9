pub mod framing;
pub mod protocol;

pub use framing::{CommandReader, EventWriter};
pub use protocol::{
    decode_command, AckPayload, Command, CommandDecodeError, Envelope, ErrorCode, ErrorPayload,
    Event, StatusPayload,
};
