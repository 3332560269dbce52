#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use linecmd::Command;
use serde_json::Value;

/// Collects whatever a test hands it, shareable with `Fn` callbacks.
#[derive(Debug)]
pub struct Recorder<T>(Arc<Mutex<Vec<T>>>);

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self(Arc::default())
    }
}

impl<T: Clone> Recorder<T> {
    pub fn record(&self, item: T) {
        self.0.lock().unwrap().push(item);
    }

    pub fn items(&self) -> Vec<T> {
        self.0.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

impl Recorder<String> {
    /// Route `cmd`'s (and its children's) output here.
    pub fn attach<M: 'static>(&self, cmd: &mut Command<M>) {
        let out = self.clone();
        cmd.set_send(move |_: &M, text: &str| {
            out.record(text.to_string());
            Value::Null
        });
    }

    /// Every message followed by a newline, like appending to a log.
    pub fn joined(&self) -> String {
        self.items().iter().map(|m| format!("{m}\n")).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// A root whose send function fails the test if anything is sent.
pub fn strict_root<M: 'static>() -> Command<M> {
    let mut root = Command::new();
    root.set_send(|_: &M, text: &str| -> Value { panic!("unexpected message:\n{text}") })
        .allow_unknown_option(false);
    root
}
