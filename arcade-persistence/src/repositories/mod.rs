pub mod advice_repository;
pub mod score_repository;
