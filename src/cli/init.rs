//! Init command implementation
//!
//! Scaffolds `voxa.toml` and `.env.example` for a new dashboard setup.

use super::output::Output;
use std::fs;
use std::path::Path;

/// Result of the init operation
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// voxa.toml already exists
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: std::path::PathBuf,
    /// Overwrite existing files
    pub force: bool,
    /// API endpoint written into voxa.toml
    pub base_url: String,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing Voxa");

    let base_path = &config.path;

    let config_path = base_path.join("voxa.toml");
    if config_path.exists() && !config.force {
        output.warning("voxa.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    if !base_path.exists() {
        if let Err(e) = fs::create_dir_all(base_path) {
            output.error(&format!("Failed to create {}: {}", base_path.display(), e));
            return InitResult::Error(e.to_string());
        }
        output.created_dir(&base_path.display().to_string());
    }

    output.subheader("Creating configuration files");

    let toml_content = generate_voxa_toml(&config);
    if let Err(e) = write_file(&config_path, &toml_content, config.force) {
        output.error(&format!("Failed to create voxa.toml: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", "voxa.toml");

    let env_example_path = base_path.join(".env.example");
    if env_example_path.exists() && !config.force {
        output.skipped(".env.example", "already exists");
    } else if let Err(e) = write_file(&env_example_path, &generate_env_example(), config.force) {
        output.error(&format!("Failed to create .env.example: {}", e));
        return InitResult::Error(e.to_string());
    } else {
        output.created("env", ".env.example");
    }

    output.complete("Voxa initialized successfully!");

    output.header("Next Steps");
    output.newline();
    output.info("1. Sign in:");
    output.command("voxa login --email you@company.com");
    output.newline();
    output.info("2. Watch a company's live metrics:");
    output.command("voxa watch <company-id>");
    output.newline();
    output.hint(&format!("API endpoint: {}", config.base_url));

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

fn generate_voxa_toml(config: &InitConfig) -> String {
    format!(
        r#"# Voxa dashboard configuration

[api]
base_url = "{base_url}"
timeout_secs = 30

[session]
# Where the bearer token is stored after `voxa login`
path = "~/.voxa/session.json"
key = "voxa_token"

[auth]
login_path = "/auth"
# Uncomment to require signed, unexpired JWTs
# jwt_secret_env = "VOXA_JWT_SECRET"

[metrics]
feeds = ["analytics", "agent-stats", "call-reports", "sentiment", "urgency"]
reconnect_initial_ms = 500
reconnect_max_ms = 30000
reconnect_multiplier = 2.0
reconnect_jitter = true

[logging]
level = "info"
json = false
"#,
        base_url = config.base_url
    )
}

fn generate_env_example() -> String {
    r#"# Voxa environment variables
# Copy to .env and fill in

# Secret used to validate session tokens (see [auth] jwt_secret_env)
VOXA_JWT_SECRET=

# Log filter override, e.g. voxa=debug
RUST_LOG=
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::toml_config::VoxaConfig;
    use tempfile::TempDir;

    fn create_test_config(temp_dir: &TempDir) -> InitConfig {
        InitConfig {
            path: temp_dir.path().to_path_buf(),
            force: false,
            base_url: "https://api.voxa.test".to_string(),
        }
    }

    #[test]
    fn test_generated_toml_is_valid_config() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let content = generate_voxa_toml(&create_test_config(&temp_dir));

        let config = VoxaConfig::parse(&content).expect("generated config must parse");
        assert_eq!(config.api.base_url, "https://api.voxa.test");
        assert_eq!(config.metrics.feeds.len(), 5);
        assert!(config.auth.jwt_secret_env.is_none());
    }

    #[test]
    fn test_generate_env_example() {
        let content = generate_env_example();
        assert!(content.contains("VOXA_JWT_SECRET"));
        assert!(content.contains("RUST_LOG"));
    }

    #[test]
    fn test_write_file_skips_existing_without_force() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let file_path = temp_dir.path().join("test.txt");

        fs::write(&file_path, "original").expect("Failed to write");
        write_file(&file_path, "new content", false).expect("skip is ok");

        let content = fs::read_to_string(&file_path).expect("Failed to read file");
        assert_eq!(content, "original");
    }

    #[test]
    fn test_write_file_overwrites_with_force() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let file_path = temp_dir.path().join("test.txt");

        fs::write(&file_path, "original").expect("Failed to write");
        write_file(&file_path, "new content", true).expect("overwrite");

        let content = fs::read_to_string(&file_path).expect("Failed to read file");
        assert_eq!(content, "new content");
    }

    #[test]
    fn test_run_creates_all_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let output = Output::no_color();

        let result = run(create_test_config(&temp_dir), &output);

        assert!(matches!(result, InitResult::Success));
        assert!(temp_dir.path().join("voxa.toml").exists());
        assert!(temp_dir.path().join(".env.example").exists());
    }

    #[test]
    fn test_run_creates_missing_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let nested = temp_dir.path().join("nested/dashboard");
        let config = InitConfig {
            path: nested.clone(),
            force: false,
            base_url: "http://localhost:3000".to_string(),
        };

        let result = run(config, &Output::no_color());

        assert!(matches!(result, InitResult::Success));
        assert!(nested.join("voxa.toml").exists());
    }

    #[test]
    fn test_run_already_exists_without_force() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("voxa.toml"), "existing").expect("Failed to write");

        let result = run(create_test_config(&temp_dir), &Output::no_color());

        assert!(matches!(result, InitResult::AlreadyExists));
        let content = fs::read_to_string(temp_dir.path().join("voxa.toml")).unwrap();
        assert_eq!(content, "existing");
    }

    #[test]
    fn test_run_force_overwrites() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("voxa.toml"), "existing").expect("Failed to write");

        let mut config = create_test_config(&temp_dir);
        config.force = true;
        let result = run(config, &Output::no_color());

        assert!(matches!(result, InitResult::Success));
        let content =
            fs::read_to_string(temp_dir.path().join("voxa.toml")).expect("Failed to read");
        assert!(content.contains("[metrics]"));
        assert!(!content.contains("existing"));
    }
}
