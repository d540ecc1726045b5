pub mod request;
pub mod response;
pub mod stream;

pub use request::{ResponsesInput, ResponsesMessage, ResponsesRequest};
pub use response::{
    OutputContent, OutputMessage, OutputMessageType, OutputTextType, ResponseObject,
    ResponseObjectType, ResponseStatus,
};
pub use stream::ResponseStreamEvent;
