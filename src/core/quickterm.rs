use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::core::geometry::Placement;
use crate::ipc::command::{self, Criteria};
use crate::ipc::{OutputInfo, Rect, TreeNode, WindowManager, WorkspaceInfo};
use crate::terminal::{TerminalLaunch, TerminalSpec};

/// Mark carried by the quickterm container
pub const MARK: &str = "quickterm_shell";

/// Workspace i3 and Sway keep scratchpad windows on
pub const SCRATCH_WORKSPACE: &str = "__i3_scratch";

pub fn mark_pattern() -> Result<Regex> {
    Regex::new(&format!("^{}$", regex::escape(MARK))).context("Invalid mark pattern")
}

/// What a toggle has to do, given the current tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    Spawn,
    Show,
    Hide { con_id: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Spawned,
    Shown,
    Hidden,
    Unchanged,
}

impl fmt::Display for ToggleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToggleOutcome::Spawned => write!(f, "terminal spawned"),
            ToggleOutcome::Shown => write!(f, "terminal shown"),
            ToggleOutcome::Hidden => write!(f, "terminal hidden"),
            ToggleOutcome::Unchanged => write!(f, "nothing to do"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    pub present: bool,
    pub con_id: Option<i64>,
    pub workspace: Option<String>,
    pub hidden: bool,
}

/// Decide the toggle action: spawn when no marked node exists, hide when it sits
/// on the focused workspace, show otherwise.
pub fn plan_toggle(
    tree: &TreeNode,
    focused_workspace: &str,
    pattern: &Regex,
) -> Result<ToggleAction> {
    let Some(term) = tree.find_marked(pattern) else {
        return Ok(ToggleAction::Spawn);
    };

    let workspace = tree
        .workspace_of(term.id)
        .ok_or_else(|| anyhow::anyhow!("No workspace contains terminal {}", term.id))?;
    let workspace_name = workspace.name.as_deref().unwrap_or_default();

    if workspace_name == focused_workspace {
        Ok(ToggleAction::Hide { con_id: term.id })
    } else {
        debug!(
            "Terminal is on '{}', focused workspace is '{}'",
            workspace_name, focused_workspace
        );
        Ok(ToggleAction::Show)
    }
}

/// Replace the current process with `shell` started as a login shell.
///
/// Only returns if the exec failed.
pub fn exec_login_shell(shell: &str) -> anyhow::Error {
    use std::os::unix::process::CommandExt;

    let name = Path::new(shell)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(shell);

    info!("🐚 Executing login shell: {}", shell);
    let err = std::process::Command::new(shell)
        .arg0(format!("-{name}"))
        .exec();

    anyhow::Error::new(err).context(format!("Failed to exec shell '{shell}'"))
}

/// Arguments the in-place invocation inherits: the config file, made absolute
/// since the terminal may start in another directory, and the log level flag.
pub fn forward_args(config_path: Option<&Path>, log_flag: Option<&str>) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(path) = config_path {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        args.push("--config".to_string());
        args.push(absolute.to_string_lossy().into_owned());
    }
    if let Some(flag) = log_flag {
        args.push(flag.to_string());
    }
    args
}

pub struct Quickterm<W: WindowManager> {
    wm: W,
    config: Config,
    forward_args: Vec<String>,
    pattern: Regex,
}

impl<W: WindowManager> Quickterm<W> {
    /// `forward_args` are appended to `--in-place` when a new terminal is spawned
    pub fn new(wm: W, config: Config, forward_args: Vec<String>) -> Result<Self> {
        Ok(Self {
            wm,
            config,
            forward_args,
            pattern: mark_pattern()?,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn find_marked(&mut self) -> Result<Option<TreeNode>> {
        let tree = self.wm.get_tree().await.context("Failed to get tree")?;
        Ok(tree.find_marked(&self.pattern).cloned())
    }

    pub async fn focused_workspace(&mut self) -> Result<Option<WorkspaceInfo>> {
        Ok(self
            .wm
            .get_workspaces()
            .await
            .context("Failed to get workspaces")?
            .into_iter()
            .find(|ws| ws.focused))
    }

    pub async fn current_workspace(&mut self) -> Result<WorkspaceInfo> {
        self.focused_workspace()
            .await?
            .ok_or_else(|| anyhow::anyhow!("No focused workspace found"))
    }

    pub async fn current_output(&mut self) -> Result<OutputInfo> {
        self.wm
            .get_outputs()
            .await
            .context("Failed to get outputs")?
            .into_iter()
            .find(|output| output.active)
            .ok_or_else(|| anyhow::anyhow!("No active output found"))
    }

    pub async fn toggle(&mut self) -> Result<ToggleOutcome> {
        let tree = self.wm.get_tree().await.context("Failed to get tree")?;
        let focused = self
            .current_workspace()
            .await
            .context("Failed to get current focused workspace")?;

        match plan_toggle(&tree, &focused.name, &self.pattern)? {
            ToggleAction::Spawn => {
                info!("🪟 No terminal found, starting a new one");
                self.spawn_terminal()?;
                Ok(ToggleOutcome::Spawned)
            }
            ToggleAction::Show => {
                info!("🔄 Showing terminal on '{}'", focused.name);
                self.pop_area(focused.rect).await?;
                Ok(ToggleOutcome::Shown)
            }
            ToggleAction::Hide { con_id } => {
                info!("🔄 Hiding terminal {}", con_id);
                self.move_back(&Criteria::ConId(con_id))
                    .await
                    .context("Failed to move terminal back")?;
                Ok(ToggleOutcome::Hidden)
            }
        }
    }

    /// Bring the terminal to the focused workspace, spawning it if needed
    pub async fn show(&mut self) -> Result<ToggleOutcome> {
        if self.find_marked().await?.is_none() {
            self.spawn_terminal()?;
            return Ok(ToggleOutcome::Spawned);
        }
        self.pop().await?;
        Ok(ToggleOutcome::Shown)
    }

    /// Send the terminal to the scratchpad unless it is already there
    pub async fn hide(&mut self) -> Result<ToggleOutcome> {
        let status = self.status().await?;
        match status.con_id {
            Some(con_id) if !status.hidden => {
                self.move_back(&Criteria::ConId(con_id)).await?;
                Ok(ToggleOutcome::Hidden)
            }
            _ => {
                debug!("Terminal absent or already hidden");
                Ok(ToggleOutcome::Unchanged)
            }
        }
    }

    pub async fn status(&mut self) -> Result<Status> {
        let tree = self.wm.get_tree().await.context("Failed to get tree")?;
        let Some(term) = tree.find_marked(&self.pattern) else {
            return Ok(Status {
                present: false,
                con_id: None,
                workspace: None,
                hidden: false,
            });
        };

        let workspace = tree.workspace_of(term.id).and_then(|ws| ws.name.clone());
        let hidden = workspace.as_deref() == Some(SCRATCH_WORKSPACE);

        Ok(Status {
            present: true,
            con_id: Some(term.id),
            workspace,
            hidden,
        })
    }

    /// Show the marked terminal over the focused workspace, or the active output
    /// when no workspace reports focus.
    pub async fn pop(&mut self) -> Result<()> {
        let area = match self.focused_workspace().await? {
            Some(ws) => ws.rect,
            None => {
                warn!("⚠️  No focused workspace, falling back to the active output");
                self.current_output().await?.rect
            }
        };
        self.pop_area(area).await
    }

    async fn pop_area(&mut self, area: Rect) -> Result<()> {
        let placement = Placement::compute(area, self.config.ratio, self.config.position);
        debug!("📐 Placing terminal at {:?}", placement);

        let cmd = command::pop(&Criteria::Mark(MARK.to_string()), &placement);
        self.wm.run_command(&cmd).await.context("Failed to pop terminal")
    }

    pub async fn move_back(&mut self, criteria: &Criteria) -> Result<()> {
        self.wm.run_command(&command::move_back(criteria)).await
    }

    /// Runs inside the freshly spawned terminal: mark the focused window and
    /// place it like a shown scratchpad.
    pub async fn prepare_in_place(&mut self) -> Result<()> {
        let delay = Duration::from_millis(self.config.settle_delay_ms);
        debug!("⏳ Waiting {:?} for the terminal window to settle", delay);
        sleep(delay).await;

        self.wm
            .run_command(&command::mark(MARK))
            .await
            .context("Failed to mark terminal")?;
        self.move_back(&Criteria::Mark(MARK.to_string()))
            .await
            .context("Failed to move terminal to scratchpad")?;
        self.pop().await
    }

    /// Terminal command line that re-runs this binary in in-place mode
    pub fn terminal_launch(&self, program: &str) -> Result<TerminalLaunch> {
        let spec = TerminalSpec::lookup(&self.config.term)
            .ok_or_else(|| anyhow::anyhow!("Unsupported terminal '{}'", self.config.term))?;

        let mut args = vec!["--in-place".to_string()];
        args.extend(self.forward_args.iter().cloned());

        spec.launch(&self.config.title, &self.config.extra_args, program, &args)
    }

    fn spawn_terminal(&self) -> Result<()> {
        let exe = std::env::current_exe().context("Failed to locate the quickterm binary")?;
        let launch = self.terminal_launch(&exe.to_string_lossy())?;
        launch.spawn()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Position;
    use crate::ipc::tree::fixtures::*;
    use crate::ipc::NodeKind;
    use async_trait::async_trait;

    struct FakeWm {
        tree: TreeNode,
        workspaces: Vec<WorkspaceInfo>,
        commands: Vec<String>,
        fail_commands: bool,
        fail_workspaces: bool,
    }

    impl FakeWm {
        fn new(tree: TreeNode, focused: &str) -> Self {
            let rect = Rect {
                x: 0,
                y: 30,
                width: 1920,
                height: 1000,
            };
            let workspaces = ["1", "2"]
                .iter()
                .map(|name| WorkspaceInfo {
                    name: name.to_string(),
                    focused: *name == focused,
                    rect,
                })
                .collect();

            Self {
                tree,
                workspaces,
                commands: Vec::new(),
                fail_commands: false,
                fail_workspaces: false,
            }
        }
    }

    #[async_trait]
    impl WindowManager for FakeWm {
        async fn get_tree(&mut self) -> Result<TreeNode> {
            Ok(self.tree.clone())
        }

        async fn get_workspaces(&mut self) -> Result<Vec<WorkspaceInfo>> {
            if self.fail_workspaces {
                return Err(anyhow::anyhow!("IPC call timeout after 5s"));
            }
            Ok(self.workspaces.clone())
        }

        // Same source as the real client: output nodes of the tree
        async fn get_outputs(&mut self) -> Result<Vec<OutputInfo>> {
            Ok(self.tree.outputs())
        }

        async fn run_command(&mut self, command: &str) -> Result<()> {
            if self.fail_commands {
                return Err(anyhow::anyhow!("No matching window"));
            }
            self.commands.push(command.to_string());
            Ok(())
        }
    }

    fn quickterm(wm: FakeWm) -> Quickterm<FakeWm> {
        let config = Config {
            ratio: 0.25,
            settle_delay_ms: 0,
            ..Config::default()
        };
        Quickterm::new(wm, config, Vec::new()).unwrap()
    }

    const POP_TOP: &str = "[con_mark=\"^quickterm_shell$\"] move scratchpad, scratchpad show, \
                           resize set 1920 px 250 px, move absolute position 0 px 30 px";

    #[test]
    fn test_plan_spawn_when_missing() {
        let tree = tree_with(vec![], vec![], vec![]);
        let action = plan_toggle(&tree, "1", &mark_pattern().unwrap()).unwrap();
        assert_eq!(action, ToggleAction::Spawn);
    }

    #[test]
    fn test_plan_hide_on_focused_workspace() {
        let tree = tree_with(vec![], vec![marked(42, MARK)], vec![]);
        let action = plan_toggle(&tree, "1", &mark_pattern().unwrap()).unwrap();
        assert_eq!(action, ToggleAction::Hide { con_id: 42 });
    }

    #[test]
    fn test_plan_show_from_scratchpad_or_other_workspace() {
        let pattern = mark_pattern().unwrap();

        let hidden = tree_with(vec![marked(42, MARK)], vec![], vec![]);
        assert_eq!(plan_toggle(&hidden, "1", &pattern).unwrap(), ToggleAction::Show);

        let elsewhere = tree_with(vec![], vec![], vec![marked(42, MARK)]);
        assert_eq!(plan_toggle(&elsewhere, "1", &pattern).unwrap(), ToggleAction::Show);
    }

    #[test]
    fn test_plan_marked_node_outside_workspace() {
        let tree = node(1, NodeKind::Root, "root", vec![marked(42, MARK)]);
        assert!(plan_toggle(&tree, "1", &mark_pattern().unwrap()).is_err());
    }

    #[tokio::test]
    async fn test_toggle_hides_visible_terminal() {
        let tree = tree_with(vec![], vec![marked(42, MARK)], vec![]);
        let mut qt = quickterm(FakeWm::new(tree, "1"));

        let outcome = qt.toggle().await.unwrap();
        assert_eq!(outcome, ToggleOutcome::Hidden);
        assert_eq!(qt.wm.commands, vec!["[con_id=42] floating enable, move scratchpad"]);
    }

    #[tokio::test]
    async fn test_toggle_shows_hidden_terminal() {
        let tree = tree_with(vec![marked(42, MARK)], vec![], vec![]);
        let mut qt = quickterm(FakeWm::new(tree, "1"));

        let outcome = qt.toggle().await.unwrap();
        assert_eq!(outcome, ToggleOutcome::Shown);
        assert_eq!(qt.wm.commands, vec![POP_TOP]);
    }

    #[tokio::test]
    async fn test_toggle_without_focused_workspace_fails() {
        let tree = tree_with(vec![marked(42, MARK)], vec![], vec![]);
        let mut qt = quickterm(FakeWm::new(tree, "none"));

        let err = qt.toggle().await.unwrap_err();
        assert!(format!("{err:#}").contains("No focused workspace"));
        assert!(qt.wm.commands.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_reports_command_failure() {
        let tree = tree_with(vec![], vec![marked(42, MARK)], vec![]);
        let mut wm = FakeWm::new(tree, "1");
        wm.fail_commands = true;
        let mut qt = quickterm(wm);

        let err = qt.toggle().await.unwrap_err();
        assert!(format!("{err:#}").contains("No matching window"));
    }

    #[tokio::test]
    async fn test_pop_bottom_position() {
        let tree = tree_with(vec![marked(42, MARK)], vec![], vec![]);
        let config = Config {
            ratio: 0.5,
            position: Position::Bottom,
            ..Config::default()
        };
        let mut qt = Quickterm::new(FakeWm::new(tree, "2"), config, Vec::new()).unwrap();

        qt.pop().await.unwrap();
        assert_eq!(
            qt.wm.commands,
            vec![
                "[con_mark=\"^quickterm_shell$\"] move scratchpad, scratchpad show, \
                 resize set 1920 px 500 px, move absolute position 0 px 524 px"
            ]
        );
    }

    #[tokio::test]
    async fn test_pop_falls_back_to_active_output() {
        let tree = tree_with(vec![marked(42, MARK)], vec![], vec![]);
        let mut qt = quickterm(FakeWm::new(tree, "none"));

        qt.pop().await.unwrap();
        assert_eq!(
            qt.wm.commands,
            vec![
                "[con_mark=\"^quickterm_shell$\"] move scratchpad, scratchpad show, \
                 resize set 1920 px 270 px, move absolute position 0 px 0 px"
            ]
        );
    }

    #[tokio::test]
    async fn test_pop_does_not_fall_back_on_ipc_error() {
        let tree = tree_with(vec![marked(42, MARK)], vec![], vec![]);
        let mut wm = FakeWm::new(tree, "1");
        wm.fail_workspaces = true;
        let mut qt = quickterm(wm);

        let err = qt.pop().await.unwrap_err();
        assert!(format!("{err:#}").contains("IPC call timeout"));
        assert!(qt.wm.commands.is_empty());
    }

    #[tokio::test]
    async fn test_show_pops_existing_terminal() {
        let tree = tree_with(vec![], vec![], vec![marked(42, MARK)]);
        let mut qt = quickterm(FakeWm::new(tree, "1"));

        assert_eq!(qt.show().await.unwrap(), ToggleOutcome::Shown);
        assert_eq!(qt.wm.commands, vec![POP_TOP]);
    }

    #[tokio::test]
    async fn test_hide_is_noop_when_hidden_or_missing() {
        let hidden = tree_with(vec![marked(42, MARK)], vec![], vec![]);
        let mut qt = quickterm(FakeWm::new(hidden, "1"));
        assert_eq!(qt.hide().await.unwrap(), ToggleOutcome::Unchanged);
        assert!(qt.wm.commands.is_empty());

        let missing = tree_with(vec![], vec![], vec![]);
        let mut qt = quickterm(FakeWm::new(missing, "1"));
        assert_eq!(qt.hide().await.unwrap(), ToggleOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_hide_moves_visible_terminal() {
        let tree = tree_with(vec![], vec![], vec![marked(42, MARK)]);
        let mut qt = quickterm(FakeWm::new(tree, "1"));

        assert_eq!(qt.hide().await.unwrap(), ToggleOutcome::Hidden);
        assert_eq!(qt.wm.commands, vec!["[con_id=42] floating enable, move scratchpad"]);
    }

    #[tokio::test]
    async fn test_status() {
        let tree = tree_with(vec![marked(42, MARK)], vec![], vec![]);
        let mut qt = quickterm(FakeWm::new(tree, "1"));

        let status = qt.status().await.unwrap();
        assert!(status.present);
        assert!(status.hidden);
        assert_eq!(status.con_id, Some(42));
        assert_eq!(status.workspace.as_deref(), Some(SCRATCH_WORKSPACE));
    }

    #[tokio::test]
    async fn test_prepare_in_place_sequence() {
        let tree = tree_with(vec![], vec![], vec![]);
        let mut qt = quickterm(FakeWm::new(tree, "1"));

        qt.prepare_in_place().await.unwrap();
        assert_eq!(
            qt.wm.commands,
            vec![
                "mark --replace quickterm_shell".to_string(),
                "[con_mark=\"^quickterm_shell$\"] floating enable, move scratchpad".to_string(),
                POP_TOP.to_string(),
            ]
        );
    }

    #[test]
    fn test_terminal_launch_forwards_config_path() {
        let tree = tree_with(vec![], vec![], vec![]);
        let qt = Quickterm::new(
            FakeWm::new(tree, "1"),
            Config::default(),
            forward_args(Some(Path::new("/etc/quickterm.toml")), Some("--debug")),
        )
        .unwrap();

        let launch = qt.terminal_launch("/usr/bin/quickterm").unwrap();
        assert_eq!(launch.program, "alacritty");
        assert_eq!(
            launch.args,
            vec![
                "-t",
                "quickterm",
                "-e",
                "/usr/bin/quickterm",
                "--in-place",
                "--config",
                "/etc/quickterm.toml",
                "--debug"
            ]
        );
    }

    #[test]
    fn test_forward_args_makes_config_path_absolute() {
        let args = forward_args(Some(Path::new("conf/quickterm.toml")), None);
        assert_eq!(args.len(), 2);
        assert_eq!(args[0], "--config");

        let path = Path::new(&args[1]);
        assert!(path.is_absolute());
        assert!(path.ends_with("conf/quickterm.toml"));
    }

    #[test]
    fn test_forward_args_empty_by_default() {
        assert!(forward_args(None, None).is_empty());
        assert_eq!(forward_args(None, Some("--verbose")), vec!["--verbose"]);
    }

    #[test]
    fn test_mark_pattern() {
        let pattern = mark_pattern().unwrap();
        assert!(pattern.is_match("quickterm_shell"));
        assert!(!pattern.is_match("quickterm_shell2"));
        assert!(!pattern.is_match("my_quickterm_shell"));
    }
}
