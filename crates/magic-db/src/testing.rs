//! Shared test fixtures.

use std::collections::VecDeque;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use zip::write::SimpleFileOptions;

use crate::http::{Fetch, HttpError};

pub enum Step {
    Body(Vec<u8>),
    Empty,
    Fail,
    Hang,
}

/// Fetcher that replays a fixed script, failing once the script runs out
pub struct ScriptedFetch {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
}

impl ScriptedFetch {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetch for ScriptedFetch {
    async fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>, HttpError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();

        match step {
            Some(Step::Body(bytes)) => Ok(Some(bytes)),
            Some(Step::Empty) => Ok(None),
            Some(Step::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(None)
            }
            Some(Step::Fail) | None => Err(HttpError::HttpStatus {
                status: 503,
                url: url.to_string(),
            }),
        }
    }
}

/// Build an in-memory zip. Names ending in `/` become directory entries.
pub fn zip_fixture(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for (name, contents) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(contents).unwrap();
        }
    }

    writer.finish().unwrap().into_inner()
}

/// Zip holding a complete database under `base` (which ends in `/` or is empty)
pub fn database_zip(base: &str) -> Vec<u8> {
    let names: Vec<String> = ["magic", "aliases", "subclasses", "packages/freedesktop.org.xml"]
        .iter()
        .map(|name| format!("{}{}", base, name))
        .collect();
    let entries: Vec<(&str, &[u8])> = names
        .iter()
        .map(|name| (name.as_str(), name.as_bytes()))
        .collect();

    zip_fixture(&entries)
}
