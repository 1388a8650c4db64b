use std::fs;
use std::path::PathBuf;

use glob::glob;
use serde_json::Value;
use simple_log::error;

use super::trie::{NamedRecord, ValidationError};

impl NamedRecord for Value {
    fn display_name(&self) -> Result<&str, ValidationError> {
        match self.get("name") {
            None | Some(Value::Null) => Err(ValidationError::MissingName),
            Some(Value::String(name)) => Ok(name),
            Some(_) => Err(ValidationError::InvalidKeyType),
        }
    }
}

pub fn record_label(record: &Value) -> String {
    match record.get("id") {
        Some(id) => id.to_string(),
        None => "?".to_string(),
    }
}

pub fn expand_home(folder: &str) -> PathBuf {
    if let Some(rest) = folder.strip_prefix('~') {
        if let Some(home_dir) = home::home_dir() {
            return home_dir.join(rest.trim_start_matches('/'));
        }
    }
    PathBuf::from(folder)
}

pub fn load_record_files(folder: &str) -> Vec<(String, Vec<Value>)> {
    let target = format!("{}/*.json", expand_home(folder).display());
    let mut files = Vec::new();
    if let Ok(paths) = glob(&target) {
        for entry in paths {
            match entry {
                Ok(path) => {
                    let content = match fs::read_to_string(&path) {
                        Ok(content) => content,
                        Err(e) => {
                            error!("cannot read {}: {}", path.display(), e);
                            continue;
                        }
                    };
                    match serde_json::from_str::<Value>(&content) {
                        Ok(Value::Array(records)) => {
                            files.push((path.display().to_string(), records));
                        }
                        Ok(_) => {
                            error!("{} is not a JSON array of records", path.display());
                        }
                        Err(e) => {
                            error!("cannot parse {}: {}", path.display(), e);
                        }
                    }
                }
                Err(e) => {
                    error!("{:?}", e);
                }
            }
        }
    }
    files
}
