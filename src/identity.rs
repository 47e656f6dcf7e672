use rand::{Rng, distributions::Alphanumeric, thread_rng};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::warn;

const CLIENT_ID_LEN: usize = 24;

/// Source of the opaque client id sent with each guess.
pub trait IdentityStore {
    /// Read at submission time; `None` when no id is stored.
    fn client_id(&self) -> Option<String>;
}

/// Keeps the id in a small file so it survives restarts.
#[derive(Clone, Debug)]
pub struct FileIdentity {
    path: PathBuf,
}

impl FileIdentity {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Like `new`, but writes a fresh id when the file is missing or empty.
    pub fn load_or_create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let store = Self::new(path);
        if store.client_id().is_none() {
            if let Some(parent) = store.path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&store.path, generate_client_id())?;
        }
        Ok(store)
    }
}

impl IdentityStore for FileIdentity {
    fn client_id(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(text) => {
                let id = text.trim();
                (!id.is_empty()).then(|| id.to_string())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!(error = %err, path = %self.path.display(), "failed to read client id");
                None
            }
        }
    }
}

/// In-memory id, or none at all.
#[derive(Clone, Debug, Default)]
pub struct EphemeralIdentity(Option<String>);

impl EphemeralIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(Some(id.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityStore for EphemeralIdentity {
    fn client_id(&self) -> Option<String> {
        self.0.clone()
    }
}

pub fn generate_client_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CLIENT_ID_LEN)
        .map(char::from)
        .collect()
}
