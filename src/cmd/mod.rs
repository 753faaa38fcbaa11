pub mod classify;
pub mod manifest;
pub mod probe;
pub mod resolve;

use std::collections::HashMap;

use anyhow::{bail, Result};

/// Parse repeated `-H "Name: value"` arguments.
pub fn parse_headers(raw: &[String]) -> Result<HashMap<String, String>> {
    let mut headers = HashMap::with_capacity(raw.len());
    for entry in raw {
        let Some((name, value)) = entry.split_once(':') else {
            bail!("Invalid header '{entry}', expected 'Name: value'");
        };
        let name = name.trim();
        if name.is_empty() {
            bail!("Invalid header '{entry}', empty name");
        }
        headers.insert(name.to_string(), value.trim().to_string());
    }
    Ok(headers)
}
