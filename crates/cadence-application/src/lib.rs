// SPDX-License-Identifier: GPL-3.0-or-later
pub mod assembler;
pub mod error;
pub mod events;
pub mod join;
pub mod registry;
pub mod resolve;
pub mod sources;

#[cfg(test)]
mod test_support;

pub use assembler::ResultAssembler;
pub use error::{ResolveError, ResolveResult};
pub use events::{ChannelSink, InMemoryEventBus, ResolveEvent, ResolveEventSink};
pub use join::JoinStage;
pub use registry::IdentityRegistry;
pub use resolve::Resolver;
pub use sources::{SourceList, SourceRegistry};
