//! Server-side protocol commands

use super::config::BlindsetConfig;
use super::io::{read_elements, read_message, write_message};
use super::keygen::KeyFile;
use blindset::psi::{ClientRequest, PsiServer};
use std::path::PathBuf;

/// Mask the server set and write the setup message
pub fn setup(
    config: &BlindsetConfig,
    key: PathBuf,
    input: PathBuf,
    out: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let key = KeyFile::load(&key)?;
    let tag = config.tag(key.group_id()?);
    let cipher = key.cipher(&tag)?;
    let mode = config.match_mode()?;

    let elements = read_elements(&input)?;
    let server = PsiServer::new(cipher, &elements, config.batch_options())?;
    let setup = server.setup(mode)?;
    write_message(&out, &setup.to_bytes()?)?;

    println!(
        "Published {} masked elements ({}) to {}",
        server.set_size(),
        if setup.index.is_filter() {
            "filter"
        } else {
            "exact"
        },
        out.display()
    );
    Ok(())
}

/// Re-mask a client request and write the response
pub fn respond(
    config: &BlindsetConfig,
    key: PathBuf,
    request: PathBuf,
    out: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let key = KeyFile::load(&key)?;
    let tag = config.tag(key.group_id()?);
    let cipher = key.cipher(&tag)?;

    let request = ClientRequest::from_bytes(&read_message(&request)?)?;

    let server = PsiServer::responder(cipher, config.batch_options())?;
    let response = server.respond(&request)?;
    write_message(&out, &response.to_bytes()?)?;

    println!(
        "Re-masked {} client elements to {}",
        response.masked.len(),
        out.display()
    );
    Ok(())
}
