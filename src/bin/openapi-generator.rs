//! Emits the aggregated OpenAPI document, to stdout or to the file
//! given as the first argument.

use std::{env, fs};

use quiz_rush_back::services::documentation::ApiDoc;
use utoipa::OpenApi;

fn main() {
    let json = ApiDoc::openapi()
        .to_pretty_json()
        .expect("serialize OpenAPI document");
    match env::args().nth(1) {
        Some(path) => fs::write(&path, json).expect("write OpenAPI document"),
        None => println!("{json}"),
    }
}
