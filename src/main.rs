//! Tofu Deploy Agent - OpenTofu 步骤执行代理
//!
//! Usage:
//! - Normal mode: `tofu-deploy-agent`
//! - With custom port: `tofu-deploy-agent --port 9200`

use tofu_deploy_agent::RuntimeConfig;

/// 解析命令行参数
fn parse_args() -> RuntimeConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = RuntimeConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" if i + 1 < args.len() => {
                config.port_override = args[i + 1].parse().ok();
                i += 2;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    config
}

fn print_help() {
    println!("Tofu Deploy Agent - OpenTofu 步骤执行代理");
    println!();
    println!("USAGE:");
    println!("    tofu-deploy-agent [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --port <PORT>    Override the listening port");
    println!("    -h, --help       Print help information");
    println!();
    println!("ENVIRONMENT:");
    println!("    PORT                 Listening port (default 9100)");
    println!("    TOFU_RUNNER_IMAGE    Execution environment image label");
    println!("    WORKSPACE_ROOT       Workspace root directory (default /workspace)");
    println!("    PROJECT_SERVICE_URL  Project directory service base URL");
}

fn main() {
    let config = parse_args();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    rt.block_on(async {
        tofu_deploy_agent::init_and_run(config).await;
    });
}
