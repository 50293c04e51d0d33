use std::fs;
use std::path::PathBuf;

pub fn init(stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    // Read from samples/sample-config.yml
    let sample_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("samples")
        .join("sample-config.yml");
    let config_content = fs::read_to_string(&sample_path)
        .map_err(|e| format!("Failed to read sample config: {}", e))?;

    write_config(&config_content, stdout)
}

fn write_config(config_content: &str, stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    if stdout {
        print!("{}", config_content);
        return Ok(());
    }

    // Try to write to ~/.config/shardtail/config.yml first
    let config_path = if let Some(home_dir) = dirs::home_dir() {
        let user_config = home_dir.join(".config/shardtail/config.yml");
        match user_config.parent() {
            Some(parent) if fs::create_dir_all(parent).is_ok() => user_config,
            _ => {
                eprintln!("Warning: could not create user config directory");
                eprintln!("Falling back to /etc/shardtail/config.yml");
                PathBuf::from("/etc/shardtail/config.yml")
            }
        }
    } else {
        PathBuf::from("/etc/shardtail/config.yml")
    };

    if config_path.exists() {
        return Err(format!(
            "Config file already exists at {}. Remove it first or use --stdout.",
            config_path.display()
        )
        .into());
    }

    fs::write(&config_path, config_content)?;
    println!("Wrote config to {}", config_path.display());

    Ok(())
}
