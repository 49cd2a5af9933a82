// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Local assembly of short contigs ("assemblies") around candidate structural
//! variant junctions.
//!
//! Reads are kept in a [`read::ReadStore`] arena and referenced by
//! [`read::ReadId`]. Assemblies record `(read, offset)` support pairs, can be
//! trimmed around their genomic anchor, and can be joined across unresolved
//! gaps into a [`assembly::GappedAssembly`].

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate getset;
#[macro_use]
extern crate derive_new;
#[macro_use]
extern crate derive_builder;

#[macro_use]
pub mod sequence;

pub mod assembler;
pub mod assembly;
pub mod cli;
pub mod config;
pub mod errors;
pub mod filters;
pub mod junction;
pub mod read;
pub mod reference;
pub mod rescue;
pub(crate) mod utils;

pub use crate::assembly::{
    Assembly, ExtendedAssembly, GappedAssembly, PrimaryAssembly, ReadSupport, SupportedAssembly,
};
pub use crate::junction::{Junction, Orientation};
pub use crate::read::{Read, ReadId, ReadStore};
pub use crate::sequence::Sequence;
