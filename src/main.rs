mod contacts_typeahead;

use std::env;

use clap::Parser;
use simple_log::error;
use simple_log::LogConfigBuilder;

use contacts_typeahead::backend::{serve, Backend, ServeArgs};

fn setup_debug_logging() {
    let mut temp_dir = env::temp_dir();
    temp_dir.push("contacts-typeahead.log");
    if let Some(log_path) = temp_dir.to_str() {
        let config = LogConfigBuilder::builder()
            .path(log_path)
            .build();
        if let Err(_e) = simple_log::new(config) {
            error!("fail to setup log {}", log_path);
            return;
        }
    }
}

#[tokio::main]
async fn main() {
    let args = ServeArgs::parse();

    if args.debug {
        setup_debug_logging();
    }

    let backend = Backend::new(args);
    backend.load_contacts().await;
    serve(backend).await;
}
