//! 命令执行器
//!
//! 在选定的执行环境（容器）内运行 tofu 命令链，提供：
//! - 按到达顺序捕获 stdout/stderr
//! - 路径的 shell 转义
//! - 可选的详细日志回读（硬超时，绝不拖慢主结果）

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::warn;

use crate::config::env::constants::LOG_READ_TIMEOUT_SECS;
use crate::domain::ExecutionResult;
use crate::services::summary;

/// 命令执行器
pub struct TofuRunner;

/// 命令执行错误
///
/// 非零退出码不在此列 —— 它是业务数据，由调用方记录为步骤状态
#[derive(Debug)]
pub enum CommandError {
    /// 进程完全无法启动（运行时缺失、权限失败），致命错误
    SpawnFailed(std::io::Error),
    /// 等待命令完成失败
    WaitFailed(std::io::Error),
    /// 次要操作超时（仅日志回读使用，调用方降级处理）
    Timeout,
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::SpawnFailed(e) => write!(f, "Failed to spawn command: {}", e),
            CommandError::WaitFailed(e) => write!(f, "Failed to wait for command: {}", e),
            CommandError::Timeout => write!(f, "Command timed out"),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::SpawnFailed(e) | CommandError::WaitFailed(e) => Some(e),
            CommandError::Timeout => None,
        }
    }
}

/// 对插入 shell 串的路径做转义
///
/// 集中审计点：`"` 空白 `'` `$` 反引号 `\` 全部加反斜杠前缀。
/// 未转义的路径是正确性和安全双重缺陷
pub fn shell_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '"' || c == '\'' || c == '$' || c == '`' || c == '\\' || c.is_whitespace() {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// 构造 `cd && 链` 形式的 shell 串
///
/// 整条链在子 shell 中执行并把错误流并入成功流，
/// 保证诊断与进度行按真实时间顺序交织；
/// 链中任一命令失败即短路后续命令
pub fn build_chain(workspace_path: &str, commands: &[&str]) -> String {
    format!(
        "( cd {} && {} ) 2>&1",
        shell_escape(workspace_path),
        commands.join(" && ")
    )
}

/// 生成唯一的时间戳日志文件名
fn unique_log_name() -> String {
    let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S%3f");
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("tofu-{}-{}.log", stamp, &suffix[..8])
}

/// 捕获的原始输出
struct Capture {
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
    combined: String,
}

impl TofuRunner {
    /// 在执行环境内运行命令链
    ///
    /// # Arguments
    /// * `environment_id` - 执行环境（容器）id
    /// * `workspace_path` - 工作区绝对路径
    /// * `commands` - 按 AND 语义串联的命令序列
    /// * `enable_logging` - 是否请求详细日志并回读
    ///
    /// 每次调用强制注入两项环境设置：关闭交互提示、关闭彩色输出，
    /// 保证输出确定且日志安全
    pub async fn execute(
        environment_id: &str,
        workspace_path: &str,
        commands: &[&str],
        enable_logging: bool,
    ) -> Result<ExecutionResult, CommandError> {
        // 路径含空白时放弃详细日志，不影响主命令
        let log_path = if enable_logging && !workspace_path.chars().any(char::is_whitespace) {
            Some(format!("{}/{}", workspace_path, unique_log_name()))
        } else {
            None
        };

        let chain = build_chain(workspace_path, commands);

        let mut args: Vec<String> = vec![
            "exec".to_string(),
            "-e".to_string(),
            "TF_IN_AUTOMATION=true".to_string(),
            "-e".to_string(),
            "TF_CLI_ARGS=-no-color".to_string(),
        ];
        if let Some(ref path) = log_path {
            // 结构化参数传递，不经过 shell，无需转义
            args.push("-e".to_string());
            args.push("TF_LOG=INFO".to_string());
            args.push("-e".to_string());
            args.push(format!("TF_LOG_PATH={}", path));
        }
        args.push(environment_id.to_string());
        args.push("sh".to_string());
        args.push("-c".to_string());
        args.push(chain);

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let capture = Self::run_capture("docker", &arg_refs).await?;

        // 回读失败或超时一律降级为空内容，绝不影响主结果
        let log_file_content = match log_path {
            Some(ref path) => Some(Self::read_log_file(environment_id, path).await),
            None => None,
        };

        let summary = summary::extract_summary(&capture.stdout);

        Ok(ExecutionResult {
            exit_code: capture.exit_code,
            stdout: capture.stdout,
            stderr: capture.stderr,
            combined: capture.combined,
            log_file_content,
            summary,
        })
    }

    /// 启动进程并按到达顺序捕获两路输出
    ///
    /// 每路各自顺序读取，到达即追加进共享缓冲，
    /// 任何一路都不会相对自身被重排
    async fn run_capture(program: &str, args: &[&str]) -> Result<Capture, CommandError> {
        let mut child = Command::new(program)
            .args(args)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(CommandError::SpawnFailed)?;

        let combined = Arc::new(Mutex::new(String::new()));

        let stdout = child.stdout.take();
        let stdout_combined = combined.clone();
        let stdout_task = tokio::spawn(async move {
            let mut buffer = String::new();
            if let Some(stdout) = stdout {
                let reader = BufReader::new(stdout);
                let mut lines = reader.lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    buffer.push_str(&line);
                    buffer.push('\n');
                    let mut shared = stdout_combined.lock().await;
                    shared.push_str(&line);
                    shared.push('\n');
                }
            }
            buffer
        });

        let stderr = child.stderr.take();
        let stderr_combined = combined.clone();
        let stderr_task = tokio::spawn(async move {
            let mut buffer = String::new();
            if let Some(stderr) = stderr {
                let reader = BufReader::new(stderr);
                let mut lines = reader.lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    buffer.push_str(&line);
                    buffer.push('\n');
                    let mut shared = stderr_combined.lock().await;
                    shared.push_str(&line);
                    shared.push('\n');
                }
            }
            buffer
        });

        let status = child.wait().await.map_err(CommandError::WaitFailed)?;
        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();
        let combined = combined.lock().await.clone();

        Ok(Capture {
            // 被信号终止时 code() 为 None
            exit_code: status.code(),
            stdout,
            stderr,
            combined,
        })
    }

    /// 回读执行环境内的日志文件
    ///
    /// 独立的第二次调用，硬超时 3 秒；超时后进程被强制终止，
    /// 内容降级为空串
    async fn read_log_file(environment_id: &str, log_path: &str) -> String {
        match Self::run_bounded(
            "docker",
            &["exec", environment_id, "cat", log_path],
            Duration::from_secs(LOG_READ_TIMEOUT_SECS),
        )
        .await
        {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).into_owned()
            }
            Ok(output) => {
                warn!(
                    environment_id = %environment_id,
                    log_path = %log_path,
                    exit_code = ?output.status.code(),
                    "Log read-back exited non-zero, defaulting to empty content"
                );
                String::new()
            }
            Err(e) => {
                warn!(
                    environment_id = %environment_id,
                    log_path = %log_path,
                    error = %e,
                    "Log read-back failed, defaulting to empty content"
                );
                String::new()
            }
        }
    }

    /// 执行带硬超时的简单命令（无流式捕获）
    ///
    /// 超时后随 future 丢弃强制杀死子进程
    async fn run_bounded(
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<std::process::Output, CommandError> {
        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(timeout, output).await {
            Ok(result) => result.map_err(CommandError::SpawnFailed),
            Err(_) => Err(CommandError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_escape_special_characters() {
        assert_eq!(shell_escape("/workspace/plain"), "/workspace/plain");
        assert_eq!(shell_escape("/a b"), "/a\\ b");
        assert_eq!(shell_escape("/a'b"), "/a\\'b");
        assert_eq!(shell_escape("/a\"b"), "/a\\\"b");
        assert_eq!(shell_escape("/a$b"), "/a\\$b");
        assert_eq!(shell_escape("/a`b"), "/a\\`b");
        assert_eq!(shell_escape("/a\\b"), "/a\\\\b");
    }

    #[test]
    fn test_build_chain_joins_with_and() {
        let chain = build_chain("/workspace/p/s", &["tofu init -input=false -no-color"]);
        assert_eq!(
            chain,
            "( cd /workspace/p/s && tofu init -input=false -no-color ) 2>&1"
        );

        let chain = build_chain("/w", &["a", "b"]);
        assert_eq!(chain, "( cd /w && a && b ) 2>&1");
    }

    #[test]
    fn test_build_chain_escapes_path() {
        let chain = build_chain("/work space/it's", &["pwd"]);
        assert_eq!(chain, "( cd /work\\ space/it\\'s && pwd ) 2>&1");
    }

    #[tokio::test]
    async fn test_run_capture_streams_and_exit_code() {
        let capture = TofuRunner::run_capture("sh", &["-c", "printf 'a\\nb\\n'; printf 'c\\n' >&2"])
            .await
            .unwrap();

        assert_eq!(capture.exit_code, Some(0));
        assert_eq!(capture.stdout, "a\nb\n");
        assert_eq!(capture.stderr, "c\n");
        // 各流内部顺序保持
        let a = capture.combined.find("a\n").unwrap();
        let b = capture.combined.find("b\n").unwrap();
        assert!(a < b);
        assert!(capture.combined.contains("c\n"));
    }

    #[tokio::test]
    async fn test_run_capture_nonzero_exit_is_data() {
        let capture = TofuRunner::run_capture("sh", &["-c", "exit 7"]).await.unwrap();
        assert_eq!(capture.exit_code, Some(7));
    }

    #[tokio::test]
    async fn test_run_capture_spawn_failure() {
        let result = TofuRunner::run_capture("nonexistent_command_12345", &[]).await;
        assert!(matches!(result, Err(CommandError::SpawnFailed(_))));
    }

    #[tokio::test]
    async fn test_crafted_path_executes_intended_chain() {
        // 含空格和引号的路径经转义后仍执行预期命令链
        let dir_name = format!("tofu runner's {}", std::process::id());
        let base = std::env::temp_dir().join(&dir_name);
        std::fs::create_dir_all(&base).unwrap();

        let path = base.to_str().unwrap();
        let chain = build_chain(path, &["pwd"]);
        let capture = TofuRunner::run_capture("sh", &["-c", &chain]).await.unwrap();

        assert_eq!(capture.exit_code, Some(0));
        assert!(capture.stdout.trim_end().ends_with(&dir_name));

        let _ = std::fs::remove_dir_all(&base);
    }

    #[tokio::test]
    async fn test_run_bounded_times_out() {
        let started = std::time::Instant::now();
        let result =
            TofuRunner::run_bounded("sh", &["-c", "sleep 30"], Duration::from_millis(200)).await;
        assert!(matches!(result, Err(CommandError::Timeout)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
