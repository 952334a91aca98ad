use crate::config::Config;
use crate::error::Result;
use crate::keystore::KeyStore;

/// Load (or create on first use) the key and describe it
/// The key itself is never printed, only its fingerprint
pub fn show_key(config: &Config) -> Result<String> {
    config.validate()?;
    let existed = config.key_file.exists();
    let key = config.key_store().load_key()?;

    let mut output = String::new();
    output.push_str("Encryption Key\n");
    output.push_str("==============\n\n");
    output.push_str(&format!("Key file: {}\n", config.key_file.display()));
    output.push_str(&format!(
        "Status: {}\n",
        if existed { "loaded" } else { "generated" }
    ));
    output.push_str(&format!("Fingerprint: {}\n", key.fingerprint()));
    Ok(output)
}
