use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use swayipc_async::Connection;
use tokio::time::{timeout, Duration};
use tracing::{debug, info};

pub mod command;
pub mod tree;

pub use tree::{NodeKind, OutputInfo, Rect, TreeNode, WorkspaceInfo};

/// Timeout duration for window manager IPC calls
const IPC_TIMEOUT: Duration = Duration::from_secs(5);

/// Run an IPC request, failing if it takes longer than [`IPC_TIMEOUT`]
async fn with_ipc_timeout<T, F>(operation: F) -> Result<T>
where
    F: Future<Output = Result<T, swayipc_async::Error>>,
{
    timeout(IPC_TIMEOUT, operation)
        .await
        .map_err(|_| anyhow::anyhow!("IPC call timeout after {:?}", IPC_TIMEOUT))?
        .map_err(|e| anyhow::anyhow!("IPC error: {}", e))
}

/// The window manager operations quickterm needs
#[async_trait]
pub trait WindowManager: Send {
    async fn get_tree(&mut self) -> Result<TreeNode>;

    async fn get_workspaces(&mut self) -> Result<Vec<WorkspaceInfo>>;

    async fn get_outputs(&mut self) -> Result<Vec<OutputInfo>>;

    /// Run a command string; any failed sub-command is an error
    async fn run_command(&mut self, command: &str) -> Result<()>;
}

/// i3/Sway IPC client
pub struct SwayClient {
    connection: Connection,
}

impl SwayClient {
    pub async fn connect() -> Result<Self> {
        debug!("🔌 Connecting to window manager IPC");
        let connection = with_ipc_timeout(Connection::new()).await?;
        info!("✅ Connected to window manager IPC");
        Ok(Self { connection })
    }
}

#[async_trait]
impl WindowManager for SwayClient {
    async fn get_tree(&mut self) -> Result<TreeNode> {
        let tree = with_ipc_timeout(self.connection.get_tree()).await?;
        Ok(tree.into())
    }

    async fn get_workspaces(&mut self) -> Result<Vec<WorkspaceInfo>> {
        let workspaces = with_ipc_timeout(self.connection.get_workspaces()).await?;
        Ok(workspaces.into_iter().map(WorkspaceInfo::from).collect())
    }

    async fn get_outputs(&mut self) -> Result<Vec<OutputInfo>> {
        // i3's GET_OUTPUTS reply lacks fields swayipc requires, so read the tree
        let tree = self.get_tree().await?;
        Ok(tree.outputs())
    }

    async fn run_command(&mut self, command: &str) -> Result<()> {
        debug!("📤 Running command: {}", command);

        let outcomes = with_ipc_timeout(self.connection.run_command(command)).await?;
        check_outcomes(command, outcomes)?;

        debug!("✅ Command succeeded");
        Ok(())
    }
}

/// Turn the per-sub-command results of a command reply into one result that
/// lists every failure.
fn check_outcomes<E>(command: &str, outcomes: Vec<Result<(), E>>) -> Result<()>
where
    E: fmt::Display,
{
    let failures: Vec<String> = outcomes
        .into_iter()
        .filter_map(|outcome| outcome.err())
        .map(|e| e.to_string())
        .collect();

    if !failures.is_empty() {
        return Err(anyhow::anyhow!(
            "Command '{}' failed: {}",
            command,
            failures.join("; ")
        ));
    }
    Ok(())
}
