pub mod redaction;
pub mod time;
