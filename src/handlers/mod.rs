//! The four locality-specific handlers selected by [`crate::dispatch`]
//! (spec §4.4-§4.7): WC→WC, Repo→Repo, WC→Repo, Repo→WC.

pub mod repo_to_repo;
pub mod repo_to_wc;
pub mod wc_to_repo;
pub mod wc_to_wc;
