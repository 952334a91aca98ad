use crate::error::Result;
use crate::service::Service;
use serde::Serialize;

#[derive(Serialize)]
struct ConvertOutput {
    converted: Vec<u64>,
}

/// Convert one measurement string and render `{"converted": [...]}`
pub fn convert_input(service: &Service, input: &str) -> Result<String> {
    let converted = service.convert(input)?;
    Ok(serde_json::to_string(&ConvertOutput { converted })?)
}
