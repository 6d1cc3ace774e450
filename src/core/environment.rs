use anyhow::Result;
use std::fmt;
use tokio::process::Command;
use tracing::debug;

/// Which window manager the session runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WmKind {
    Sway,
    I3,
}

impl WmKind {
    fn binary(self) -> &'static str {
        match self {
            WmKind::Sway => "sway",
            WmKind::I3 => "i3",
        }
    }
}

impl fmt::Display for WmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WmKind::Sway => write!(f, "Sway"),
            WmKind::I3 => write!(f, "i3"),
        }
    }
}

/// Decide from the socket variables alone. SWAYSOCK wins when both are set.
pub fn detect_from_vars(swaysock: Option<&str>, i3sock: Option<&str>) -> Option<WmKind> {
    let set = |v: Option<&str>| v.is_some_and(|s| !s.is_empty());

    if set(swaysock) {
        Some(WmKind::Sway)
    } else if set(i3sock) {
        Some(WmKind::I3)
    } else {
        None
    }
}

/// Detect the running window manager from the environment, then by asking
/// each one for its socket path.
pub async fn detect() -> Result<WmKind> {
    let swaysock = std::env::var("SWAYSOCK").ok();
    let i3sock = std::env::var("I3SOCK").ok();

    if let Some(kind) = detect_from_vars(swaysock.as_deref(), i3sock.as_deref()) {
        debug!("Detected {} from environment", kind);
        return Ok(kind);
    }

    for kind in [WmKind::Sway, WmKind::I3] {
        if query_socket_path(kind).await {
            debug!("Detected {} by socket path query", kind);
            return Ok(kind);
        }
    }

    Err(anyhow::anyhow!(
        "No i3 or Sway session detected (SWAYSOCK and I3SOCK unset, no socket path reported)"
    ))
}

async fn query_socket_path(kind: WmKind) -> bool {
    match Command::new(kind.binary())
        .arg("--get-socketpath")
        .output()
        .await
    {
        Ok(output) => {
            let path = String::from_utf8_lossy(&output.stdout);
            output.status.success() && !path.trim().is_empty()
        }
        Err(e) => {
            debug!("{} --get-socketpath failed: {}", kind.binary(), e);
            false
        }
    }
}
