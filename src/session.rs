use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub display_name: String,
    pub role: String,
}

/// Signed-in user state. Lives in `AppState` while the sidecar runs and in
/// `session.json` inside the workspace between runs. The lifecycle is
/// explicit: `hydrate` on open, `persist` on sign-in, `clear` on sign-out;
/// nothing else touches the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
}

fn session_path(workspace: &Path) -> PathBuf {
    workspace.join(SESSION_FILE_NAME)
}

impl Session {
    pub fn hydrate(workspace: &Path) -> anyhow::Result<Option<Session>> {
        let path = session_path(workspace);
        if !path.is_file() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)?;
        let session = serde_json::from_str(&text)?;
        Ok(Some(session))
    }

    pub fn persist(&self, workspace: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(workspace)?;
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(session_path(workspace), text)?;
        Ok(())
    }

    pub fn clear(workspace: &Path) -> anyhow::Result<()> {
        let path = session_path(workspace);
        if path.is_file() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}
