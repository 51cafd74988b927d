pub mod request;
pub mod template;
