use anyhow::Result;
use setupui::api;

/// Print the OpenAPI document for the setupui HTTP API.
fn main() -> Result<()> {
    println!("{}", api::openapi().to_pretty_json()?);

    Ok(())
}
