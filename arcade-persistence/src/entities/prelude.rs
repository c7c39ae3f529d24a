pub use super::advice_messages::Entity as AdviceMessages;
pub use super::advice_threads::Entity as AdviceThreads;
pub use super::score_records::Entity as ScoreRecords;
