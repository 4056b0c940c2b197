//! Embeds git and build metadata so `/health` can report the running commit.
//!
//! Docker builds have no `.git`; they pass `VERGEN_GIT_SHA` as a build arg
//! instead, in which case vergen is skipped.

use std::error::Error;
use vergen_gix::{Build, Emitter, Gix};

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-env-changed=VERGEN_GIT_SHA");

    if std::env::var("VERGEN_GIT_SHA").is_ok() {
        return Ok(());
    }

    Emitter::default()
        .add_instructions(&Build::all_build())?
        .add_instructions(&Gix::all_git())?
        .emit()?;
    Ok(())
}
