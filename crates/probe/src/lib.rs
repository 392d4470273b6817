//! Source probing: the HTTP validation round.

pub mod fetch;

pub use fetch::HttpFetchRound;
