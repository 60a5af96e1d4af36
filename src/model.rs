pub mod block;
pub mod course;
pub mod report;
pub mod request;
