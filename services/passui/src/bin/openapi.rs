use anyhow::Result;
use passui::api;

/// Print the OpenAPI document for the passui HTTP API.
fn main() -> Result<()> {
    println!("{}", api::openapi().to_pretty_json()?);

    Ok(())
}
