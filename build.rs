use anyhow::Result;
use vergen::{vergen, Config};

fn main() -> Result<()> {
    // trigger recompilation when a new migration is added
    println!("cargo:rerun-if-changed=migrations");

    // Builds from a source archive have no git metadata to embed.
    if let Err(error) = vergen(Config::default()) {
        println!("cargo:warning=Skipping git metadata: {}", error);
    }

    Ok(())
}
