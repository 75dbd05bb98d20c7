use std::{ io, fmt };
use std::io::{ BufRead, BufReader };
use std::fs::File;

/// Longest expansion result, in bytes. Longer results are cut off silently.
pub const EXPAND_CAPACITY: usize = 8191;
/// Longest variable name recognised after `$`.
pub const VAR_NAME_MAX: usize = 4095;
/// Most tokens kept from one input line.
pub const MAX_TOKENS: usize = 4096;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub prompt: String,
    pub farewell: String,
    pub expand_capacity: usize,
    pub var_name_max: usize,
    pub max_tokens: usize,
}

impl Default for Config {
    fn default() -> Self {
        ConfigLoader::default_config()
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn default_config() -> Config {
        Config {
            prompt: "micro shell prompt > ".to_string(),
            farewell: "Good Bye".to_string(),
            expand_capacity: EXPAND_CAPACITY,
            var_name_max: VAR_NAME_MAX,
            max_tokens: MAX_TOKENS,
        }
    }

    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path).map_err(ConfigError::Io)?;
        let mut src = String::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(ConfigError::Io)?;
            src.push_str(&line);
            src.push('\n');
        }
        Self::load_from_str(&src)
    }

    pub fn load_from_str(src: &str) -> Result<Config, ConfigError> {
        let mut config = Self::default_config();

        for (lineno, line) in src.lines().enumerate() {
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Parse(format!("Line {}: No '=' found: {}", lineno + 1, line)));
            };

            // Values are taken verbatim so a prompt may end in a space.
            match key.trim() {
                "prompt" => config.prompt = value.to_string(),
                "farewell" => config.farewell = value.to_string(),
                "expand_capacity" => config.expand_capacity = parse_limit(lineno, line, value)?,
                "var_name_max" => config.var_name_max = parse_limit(lineno, line, value)?,
                "max_tokens" => config.max_tokens = parse_limit(lineno, line, value)?,
                k => return Err(ConfigError::Parse(format!("Line {}: Unknown key: {}", lineno + 1, k))),
            }
        }

        Ok(config)
    }
}

fn parse_limit(lineno: usize, line: &str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Parse(format!("Line {}: Invalid limit: {}", lineno + 1, line))),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
