pub mod event;
pub mod path;
pub mod request;
pub mod response;
