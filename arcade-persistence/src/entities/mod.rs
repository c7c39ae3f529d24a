pub mod prelude;

pub mod advice_messages;
pub mod advice_threads;
pub mod score_records;
