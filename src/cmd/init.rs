//! `adsb-relay init` — write the starter configuration file.

use crate::cli::InitArgs;
use crate::config::model::Settings;
use crate::config::source::write_settings;
use crate::config::default_config_path;
use crate::error::RelayError;

pub async fn execute(args: &InitArgs) -> Result<(), RelayError> {
    let output = args.output.clone().unwrap_or_else(default_config_path);

    if !args.force && tokio::fs::try_exists(&output).await.unwrap_or(false) {
        return Err(RelayError::FileExists { path: output });
    }

    write_settings(&output, &Settings::starter()).await?;
    println!("Created {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.conf");
        std::fs::write(&path, "[Output]\nformat = json\n").unwrap();

        let args = InitArgs {
            output: Some(path.clone()),
            force: false,
        };
        assert!(matches!(
            execute(&args).await,
            Err(RelayError::FileExists { .. })
        ));

        let args = InitArgs {
            output: Some(path.clone()),
            force: true,
        };
        execute(&args).await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("format=sbs1"));
    }
}
