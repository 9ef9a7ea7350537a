//! Client for the JCDecaux self-service bike API.

mod client;

pub use client::JcDecauxClient;
