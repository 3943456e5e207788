//! Request and response bodies

pub mod invoice;
pub mod notification;
pub mod reminder;
pub mod run;
