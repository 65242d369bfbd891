pub mod approval;
pub mod directory;
pub mod nullable;
pub mod payment;
pub mod request;
pub mod timestamp;
