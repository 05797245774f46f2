//! Data Transfer Objects
//!
//! DTOs for service inputs and outputs.

pub mod request;
pub mod response;

pub use request::{SendMessageRequest, ViewMessagesQuery};
pub use response::{
    ConversationDto, MessageDto, MessagePageDto, PaginationDto, RedeliveryReport, ThreadedMessageDto,
};
