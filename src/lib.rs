//! # SQL Query Bot Library
//!
//! Natural-language questions in, read-only SQL results out.
//!
//! The reviewable core is small and synchronous: [`validator`] decides
//! whether generated SQL may run, [`ranker`] picks the catalogued tables worth
//! showing to the language model. Everything else delegates to external
//! services through traits: [`llm::LanguageModel`],
//! [`database::DatabaseGateway`], [`catalog::CatalogStore`] and
//! [`messaging::MessageGateway`].

pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod llm;
pub mod messaging;
pub mod output;
pub mod ranker;
pub mod schema;
pub mod server;
pub mod validator;
