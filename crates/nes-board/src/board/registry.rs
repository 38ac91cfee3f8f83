//! Board construction from the static tables.
//!
//! A flat constructor table sits beside the descriptor table; `create`
//! resolves both before allocating anything, so an unknown id fails with
//! no partial construction. `verify` cross-checks the tables against each
//! other and runs in debug builds and tests.

use crate::board::descriptor::{self, BoardDescriptor, DESCRIPTORS, EXT_TAGS};
use crate::board::{Board, Fme7, Mmc3, Nrom, Uxrom};
use crate::context::Context;
use crate::error::Error;
use crate::state::Tag;

type Constructor = fn(&'static BoardDescriptor, Tag, Context) -> Box<dyn Board>;

static CONSTRUCTORS: &[(u16, Constructor)] = &[
    (0, Nrom::boxed),
    (2, Uxrom::boxed),
    (4, Mmc3::boxed),
    (69, Fme7::boxed),
    (descriptor::EXT_SUNSOFT_5B, Fme7::boxed),
];

/// Build the board for `ctx.id`.
pub fn create(ctx: Context) -> Result<Box<dyn Board>, Error> {
    debug_assert!(verify().is_ok(), "{:?}", verify());
    let id = ctx.id;
    let Some(descriptor) = descriptor::find(id) else {
        return Err(Error::UnsupportedMapper(id));
    };
    let Some(tag) = descriptor::board_tag(id) else {
        return Err(Error::UnsupportedMapper(id));
    };
    let Some(&(_, new)) = CONSTRUCTORS.iter().find(|&&(entry, _)| entry == id) else {
        return Err(Error::UnsupportedMapper(id));
    };
    Ok(new(descriptor, tag, ctx))
}

/// Cross-check the static tables: sorted unique descriptor ids, a
/// constructor and a unique save-state tag for every descriptor, and the
/// extension-tag table in bijection with the extension id range.
pub fn verify() -> Result<(), String> {
    for pair in DESCRIPTORS.windows(2) {
        if pair[0].id >= pair[1].id {
            return Err(format!("descriptor table unsorted at id {}", pair[1].id));
        }
    }
    for d in DESCRIPTORS {
        if !CONSTRUCTORS.iter().any(|&(id, _)| id == d.id) {
            return Err(format!("descriptor {} has no constructor", d.id));
        }
        if descriptor::board_tag(d.id).is_none() {
            return Err(format!("descriptor {} has no save-state tag", d.id));
        }
    }
    for &(id, _) in CONSTRUCTORS {
        if descriptor::find(id).is_none() {
            return Err(format!("constructor {id} has no descriptor"));
        }
    }
    for &(id, _) in EXT_TAGS {
        if id < 256 {
            return Err(format!("extension tag assigned to iNES id {id}"));
        }
        if descriptor::find(id).is_none() {
            return Err(format!("extension tag {id} has no descriptor"));
        }
    }
    let mut tags: Vec<[u8; 4]> = DESCRIPTORS
        .iter()
        .filter_map(|d| descriptor::board_tag(d.id))
        .map(Tag::bytes)
        .collect();
    tags.sort_unstable();
    let unique = tags.len();
    tags.dedup();
    if tags.len() != unique {
        return Err("duplicate save-state tags".into());
    }
    Ok(())
}
