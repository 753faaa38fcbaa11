//! Host provider interface and the stream data model.
//!
//! Hosts plug into the resolver by implementing [`HostProvider`]; the
//! built-in [`DirectProvider`](providers::DirectProvider) wraps plain links.

pub mod provider;
pub mod providers;

pub use provider::{
    Candidate, HostProvider, MediaQuery, MediaType, MetadataLookup, ProviderContext, Resolution,
    SearchHit, Strategy, Stream, TitleInfo,
};
