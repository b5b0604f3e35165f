//! Client-side protocol commands

use super::config::BlindsetConfig;
use super::io::{read_elements, read_message, write_message};
use super::keygen::KeyFile;
use blindset::psi::{PsiClient, ServerResponse, ServerSetup};
use serde::Serialize;
use std::path::PathBuf;

/// JSON report printed by `client-finish --json`
#[derive(Debug, Serialize)]
struct Report {
    cardinality: usize,
    client_set_size: usize,
    server_set_size: u64,
    approximate: bool,
    matches: Vec<ReportEntry>,
}

#[derive(Debug, Serialize)]
struct ReportEntry {
    index: usize,
    element: String,
}

/// Mask the client set and write the request message
pub fn request(
    config: &BlindsetConfig,
    key: PathBuf,
    input: PathBuf,
    out: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let key = KeyFile::load(&key)?;
    let tag = config.tag(key.group_id()?);
    let cipher = key.cipher(&tag)?;

    let elements = read_elements(&input)?;
    let client = PsiClient::new(cipher, elements, config.batch_options())?;
    let request = client.request()?;
    write_message(&out, &request.to_bytes()?)?;

    println!(
        "Masked {} client elements to {}",
        client.set_size(),
        out.display()
    );
    Ok(())
}

/// Unmask the server response and print the intersection
pub fn finish(
    config: &BlindsetConfig,
    key: PathBuf,
    input: PathBuf,
    setup: PathBuf,
    response: PathBuf,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let key = KeyFile::load(&key)?;
    let tag = config.tag(key.group_id()?);
    let cipher = key.cipher(&tag)?;

    let elements = read_elements(&input)?;
    let setup = ServerSetup::from_bytes(&read_message(&setup)?)?;
    let response = ServerResponse::from_bytes(&read_message(&response)?)?;

    let client = PsiClient::new(cipher, elements, config.batch_options())?;
    let intersection = client.finish(&setup, &response)?;

    if json {
        let report = Report {
            cardinality: intersection.len(),
            client_set_size: intersection.client_set_size,
            server_set_size: intersection.server_set_size,
            approximate: intersection.approximate,
            matches: intersection
                .iter()
                .map(|(index, element)| ReportEntry {
                    index,
                    element: String::from_utf8_lossy(element).into_owned(),
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for (_, element) in intersection.iter() {
            println!("{}", String::from_utf8_lossy(element));
        }
        eprintln!(
            "{} of {} client elements matched ({} server elements{})",
            intersection.len(),
            intersection.client_set_size,
            intersection.server_set_size,
            if intersection.approximate {
                ", filter: may include false positives"
            } else {
                ""
            }
        );
    }
    Ok(())
}
