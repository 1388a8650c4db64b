use clap::Parser;
use hashbrown::HashMap;
use serde_json::{json, Value};
use simple_log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use super::records::{load_record_files, record_label};
use super::trie::Trie;
use super::util::*;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct ServeArgs {
    #[arg(long)]
    contacts_folder: Option<String>,
    #[arg(long, default_value_t = 0)]
    max_results: usize,
    #[arg(long)]
    pub debug: bool,
}

#[derive(Debug)]
pub struct Backend {
    index: Mutex<Trie<Value>>,
    sources: Mutex<HashMap<String, usize>>,
    args: ServeArgs,
}

impl Backend {
    pub fn new(args: ServeArgs) -> Self {
        Backend {
            index: Mutex::new(Trie::new()),
            sources: Mutex::new(HashMap::new()),
            args,
        }
    }

    pub async fn load_contacts(&self) -> (usize, usize) {
        let folder = match self.args.contacts_folder.clone() {
            Some(folder) => folder,
            None => return (0, 0),
        };
        info!("loading contact folder: {}", folder);

        let mut index = self.index.lock().await;
        let mut sources = self.sources.lock().await;
        let mut files = 0;
        let mut records = 0;
        for (file, file_records) in load_record_files(&folder) {
            let outcome = index.batch_insert(file_records);
            for (record, e) in outcome.rejected.iter() {
                warn!("skipping record {} from {}: {}", record_label(record), file, e);
            }
            info!(
                "{}: {} records indexed, {} rejected",
                file,
                outcome.inserted,
                outcome.rejected.len()
            );
            files += 1;
            records += outcome.inserted;
            sources.insert(file, outcome.inserted);
        }
        (files, records)
    }

    // Full resync: the old tree is dropped wholesale, never diffed.
    pub async fn reload_contacts(&self) -> (usize, usize) {
        {
            let mut index = self.index.lock().await;
            *index = Trie::new();
            let mut sources = self.sources.lock().await;
            sources.clear();
        }
        self.load_contacts().await
    }

    pub async fn handle_request(&self, line: &str) -> Value {
        let request = match parse_request(line) {
            Some(request) => request,
            None => return error_response("request is not valid JSON"),
        };
        match request_field(&request, "op") {
            Some("search") => self.search(&request).await,
            Some("exists") => self.exists(&request).await,
            Some("add") => self.add(&request).await,
            Some("reload") => self.reload().await,
            Some("stats") => self.stats().await,
            Some(op) => error_response(&format!("unknown op: {}", op)),
            None => error_response("request has no op field"),
        }
    }

    async fn search(&self, request: &Value) -> Value {
        let query = request_field(request, "query").unwrap_or("");
        let index = self.index.lock().await;
        let matches = index.find_with_prefix(query);
        results_response(query, matches, self.args.max_results)
    }

    async fn exists(&self, request: &Value) -> Value {
        let name = match request_field(request, "name") {
            Some(name) => name,
            None => return error_response("exists request has no name field"),
        };
        let index = self.index.lock().await;
        json!({ "op": "exists", "name": name, "present": index.contains_exact(name) })
    }

    async fn add(&self, request: &Value) -> Value {
        let record = match request.get("record") {
            Some(record) => record.clone(),
            None => return error_response("add request has no record field"),
        };
        let label = record_label(&record);
        let mut index = self.index.lock().await;
        match index.insert(record) {
            Ok(()) => json!({ "op": "added", "records": index.len() }),
            Err(e) => {
                warn!("rejecting record {}: {}", label, e);
                error_response(&e.to_string())
            }
        }
    }

    async fn reload(&self) -> Value {
        let (files, records) = self.reload_contacts().await;
        json!({ "op": "reloaded", "files": files, "records": records })
    }

    async fn stats(&self) -> Value {
        let index = self.index.lock().await;
        let sources = self.sources.lock().await;
        let mut files = serde_json::Map::new();
        for (file, count) in sources.iter() {
            files.insert(file.clone(), json!(count));
        }
        json!({ "op": "stats", "records": index.len(), "files": Value::Object(files) })
    }
}

pub async fn serve(backend: Backend) {
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(stdin).lines();

    info!("serving typeahead requests on stdio");
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                let response = backend.handle_request(&line).await;
                let mut payload = response.to_string();
                payload.push('\n');
                if let Err(e) = stdout.write_all(payload.as_bytes()).await {
                    error!("cannot write response: {}", e);
                    break;
                }
                if let Err(e) = stdout.flush().await {
                    error!("cannot flush stdout: {}", e);
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!("cannot read request: {}", e);
                break;
            }
        }
    }
    info!("input closed, shutting down");
}

#[cfg(test)]
mod test {
    use super::*;

    fn test_backend(max_results: usize) -> Backend {
        let max_results = max_results.to_string();
        let args =
            ServeArgs::parse_from(["contacts-typeahead", "--max-results", max_results.as_str()]);
        Backend::new(args)
    }

    async fn add_record(backend: &Backend, record: Value) -> Value {
        let request = json!({ "op": "add", "record": record }).to_string();
        backend.handle_request(&request).await
    }

    async fn populated_backend(max_results: usize) -> Backend {
        let backend = test_backend(max_results);
        add_record(&backend, json!({"name": "Bob", "id": 1})).await;
        add_record(&backend, json!({"name": "Bobby", "id": 2})).await;
        add_record(&backend, json!({"name": "Anna", "id": 3})).await;
        backend
    }

    #[tokio::test]
    async fn test_search() {
        let backend = populated_backend(0).await;

        let response = backend
            .handle_request(r#"{"op": "search", "query": "bo"}"#)
            .await;
        assert_eq!("results", response["op"]);
        assert_eq!(2, response["count"]);
        assert_eq!(1, response["records"][0]["id"]);
        assert_eq!(2, response["records"][1]["id"]);

        let response = backend
            .handle_request(r#"{"op": "search", "query": "BO"}"#)
            .await;
        assert_eq!(2, response["count"]);

        let response = backend
            .handle_request(r#"{"op": "search", "query": "xyz"}"#)
            .await;
        assert_eq!(0, response["count"]);
        assert_eq!(0, response["records"].as_array().unwrap().len());

        let response = backend
            .handle_request(r#"{"op": "search", "query": ""}"#)
            .await;
        assert_eq!(3, response["count"]);
        assert_eq!(3, response["records"][0]["id"]);
    }

    #[tokio::test]
    async fn test_search_truncates_to_max_results() {
        let backend = populated_backend(1).await;

        let response = backend
            .handle_request(r#"{"op": "search", "query": ""}"#)
            .await;
        assert_eq!(3, response["count"]);
        assert_eq!(1, response["records"].as_array().unwrap().len());
        assert_eq!("Anna", response["records"][0]["name"]);
    }

    #[tokio::test]
    async fn test_exists() {
        let backend = populated_backend(0).await;

        let response = backend
            .handle_request(r#"{"op": "exists", "name": "BOB"}"#)
            .await;
        assert_eq!("exists", response["op"]);
        assert_eq!(true, response["present"]);

        let response = backend
            .handle_request(r#"{"op": "exists", "name": "bo"}"#)
            .await;
        assert_eq!(false, response["present"]);

        let response = backend.handle_request(r#"{"op": "exists"}"#).await;
        assert_eq!("error", response["op"]);
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_records() {
        let backend = test_backend(0);

        let response = add_record(&backend, json!({"id": 10})).await;
        assert_eq!("error", response["op"]);
        assert_eq!("record is missing a display name", response["message"]);

        let response = add_record(&backend, json!({"name": 42, "id": 11})).await;
        assert_eq!("record display name is not a string", response["message"]);

        // Nothing from the rejected records landed in the index.
        let response = backend
            .handle_request(r#"{"op": "search", "query": ""}"#)
            .await;
        assert_eq!(0, response["count"]);
    }

    #[tokio::test]
    async fn test_add_then_search() {
        let backend = test_backend(0);

        let response = add_record(&backend, json!({"name": "Carol", "id": 12})).await;
        assert_eq!("added", response["op"]);
        assert_eq!(1, response["records"]);

        let response = backend
            .handle_request(r#"{"op": "search", "query": "car"}"#)
            .await;
        assert_eq!(1, response["count"]);
        assert_eq!(12, response["records"][0]["id"]);
    }

    #[tokio::test]
    async fn test_reload_without_folder_clears_index() {
        let backend = populated_backend(0).await;

        let response = backend.handle_request(r#"{"op": "reload"}"#).await;
        assert_eq!("reloaded", response["op"]);
        assert_eq!(0, response["files"]);
        assert_eq!(0, response["records"]);

        let response = backend
            .handle_request(r#"{"op": "search", "query": ""}"#)
            .await;
        assert_eq!(0, response["count"]);
    }

    #[tokio::test]
    async fn test_stats() {
        let backend = populated_backend(0).await;

        let response = backend.handle_request(r#"{"op": "stats"}"#).await;
        assert_eq!("stats", response["op"]);
        assert_eq!(3, response["records"]);
        assert_eq!(0, response["files"].as_object().unwrap().len());
    }

    #[tokio::test]
    async fn test_malformed_requests() {
        let backend = test_backend(0);

        let response = backend.handle_request("{not json").await;
        assert_eq!("error", response["op"]);

        let response = backend.handle_request(r#"{"query": "bo"}"#).await;
        assert_eq!("request has no op field", response["message"]);

        let response = backend.handle_request(r#"{"op": "frobnicate"}"#).await;
        assert_eq!("unknown op: frobnicate", response["message"]);
    }
}
