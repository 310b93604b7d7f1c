//! frost-link: resolve SensorThings API navigation links
//!
//! A FROST server links related entities through
//! `<Relation>@iot.navigationLink` URLs. [`LinkResolver`] follows such a
//! link and returns the `@iot.id`s it points at, whether the server answers
//! with a single entity or with an entity collection.
//!
//! Commands:
//! - resolve: Resolve navigation links to ids
//! - expand: Resolve every navigation link of an entity document

pub mod config;
pub mod envelope;
pub mod error;
pub mod expand;
pub mod extract;
pub mod logging;
pub mod resolve;
pub mod resolver;

pub use config::ResolverConfig;
pub use envelope::{EntityEnvelope, IdentifierList, Resolution};
pub use error::ResolveError;
pub use expand::{expand_document, ExpandedEntity};
pub use resolve::{resolve_links, ResolveReport, ResolveResult, Strictness};
pub use resolver::LinkResolver;
